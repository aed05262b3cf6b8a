//! # Spec Diagnostics
//!
//! Every problem the loader finds in a specification document is reported as a
//! [`SpecIssue`]. Issues are never raised one at a time: the loader collects
//! them across all documents into a [`SpecReport`], which groups them by source
//! document and then by field path so a root cause stays easy to locate.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Category of a specification error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueKind {
    /// The document is not valid YAML or has the wrong shape.
    ParseError,
    /// A type expression could not be understood.
    TypeGrammarError,
    /// A model is internally inconsistent (empty, or a variant names an unknown field).
    ModelIntegrityError,
    /// A name points at a model, domain, service or operation that does not exist.
    ReferenceError,
    /// An operation's transport bindings are missing or contradictory.
    TransportConfigError,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::ParseError => "parse",
            IssueKind::TypeGrammarError => "type",
            IssueKind::ModelIntegrityError => "model",
            IssueKind::ReferenceError => "reference",
            IssueKind::TransportConfigError => "transport",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found in a specification document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecIssue {
    /// Document the problem was found in.
    pub document: PathBuf,
    /// Dotted field path inside the document, e.g. `models.User.variants.Create`.
    pub path: String,
    /// 1-based line, when the YAML parser could locate the problem.
    pub line: Option<usize>,
    pub kind: IssueKind,
    pub message: String,
}

impl SpecIssue {
    pub fn new(
        document: impl Into<PathBuf>,
        path: impl Into<String>,
        kind: IssueKind,
        message: impl Into<String>,
    ) -> Self {
        SpecIssue {
            document: document.into(),
            path: path.into(),
            line: None,
            kind,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }
}

impl fmt::Display for SpecIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "[{}] {}:{} {}: {}",
                self.kind,
                self.document.display(),
                line,
                self.path,
                self.message
            ),
            None => write!(
                f,
                "[{}] {} {}: {}",
                self.kind,
                self.document.display(),
                self.path,
                self.message
            ),
        }
    }
}

/// Accumulated issues of one load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecReport {
    issues: Vec<SpecIssue>,
}

impl SpecReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: SpecIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = SpecIssue>) {
        self.issues.extend(issues);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[SpecIssue] {
        &self.issues
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Issues grouped by document, each group sorted by field path.
    ///
    /// Sorting is stable, so issues on the same path keep discovery order.
    pub fn by_document(&self) -> BTreeMap<&Path, Vec<&SpecIssue>> {
        let mut grouped: BTreeMap<&Path, Vec<&SpecIssue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped
                .entry(issue.document.as_path())
                .or_default()
                .push(issue);
        }
        for issues in grouped.values_mut() {
            issues.sort_by(|a, b| a.path.cmp(&b.path));
        }
        grouped
    }
}

impl fmt::Display for SpecReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} specification issue(s) found:", self.issues.len())?;
        for (document, issues) in self.by_document() {
            writeln!(f)?;
            writeln!(f, "{}", document.display())?;
            for issue in issues {
                match issue.line {
                    Some(line) => writeln!(
                        f,
                        "  line {line:>4}  [{}] {}: {}",
                        issue.kind, issue.path, issue.message
                    )?,
                    None => writeln!(
                        f,
                        "             [{}] {}: {}",
                        issue.kind, issue.path, issue.message
                    )?,
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for SpecReport {}

pub fn print_issues(report: &SpecReport) {
    eprintln!("\n❌ Spec validation failed.\n");
    eprint!("{report}");
    eprintln!("\nPlease fix the issues in your spec documents before generating.\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_groups_by_document_then_path() {
        let mut report = SpecReport::new();
        report.push(SpecIssue::new(
            "b.yaml",
            "operations.z",
            IssueKind::ReferenceError,
            "z",
        ));
        report.push(SpecIssue::new(
            "a.yaml",
            "models.User",
            IssueKind::ModelIntegrityError,
            "user",
        ));
        report.push(SpecIssue::new(
            "b.yaml",
            "operations.a",
            IssueKind::TransportConfigError,
            "a",
        ));

        let grouped = report.by_document();
        let docs: Vec<_> = grouped.keys().map(|p| p.to_string_lossy().to_string()).collect();
        assert_eq!(docs, vec!["a.yaml", "b.yaml"]);
        let b: Vec<_> = grouped[Path::new("b.yaml")]
            .iter()
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(b, vec!["operations.a", "operations.z"]);
    }

    #[test]
    fn test_display_includes_line_when_known() {
        let issue = SpecIssue::new("m.yaml", "models", IssueKind::ParseError, "Invalid YAML")
            .at_line(Some(3));
        assert_eq!(issue.to_string(), "[parse] m.yaml:3 models: Invalid YAML");

        let mut report = SpecReport::new();
        report.push(issue);
        let rendered = report.to_string();
        assert!(rendered.contains("1 specification issue(s) found"));
        assert!(rendered.contains("line    3"));
    }

    #[test]
    fn test_count_of_kind() {
        let mut report = SpecReport::new();
        report.extend([
            SpecIssue::new("x", "p", IssueKind::ReferenceError, "1"),
            SpecIssue::new("x", "q", IssueKind::ReferenceError, "2"),
            SpecIssue::new("x", "r", IssueKind::ParseError, "3"),
        ]);
        assert_eq!(report.count_of(IssueKind::ReferenceError), 2);
        assert_eq!(report.len(), 3);
        assert!(!report.is_empty());
    }
}
