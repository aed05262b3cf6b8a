//! Helpers shared by the per-document parsers.
//!
//! Parsers walk a `serde_yaml::Value` tree and record problems into a
//! [`DocDiagnostics`] instead of returning early, so one pass over a document
//! yields every issue in it.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use super::types::describe;
use crate::validator::{IssueKind, SpecIssue};

/// Parses a document, mapping syntax errors to a located `ParseError`.
pub(crate) fn parse_yaml(document: &Path, source: &str) -> Result<Value, SpecIssue> {
    match serde_yaml::from_str::<Value>(source) {
        Ok(Value::Null) => Ok(Value::Mapping(Mapping::new())),
        Ok(value) => Ok(value),
        Err(e) => Err(SpecIssue::new(
            document,
            "",
            IssueKind::ParseError,
            format!("Invalid YAML: {e}"),
        )
        .at_line(e.location().map(|l| l.line()))),
    }
}

/// Converts a YAML scalar or tree into its JSON equivalent.
pub(crate) fn yaml_to_json(value: &Value) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

pub(crate) fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        path.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Issue collector for one document.
pub(crate) struct DocDiagnostics<'a> {
    document: PathBuf,
    source: &'a str,
    issues: Vec<SpecIssue>,
}

impl<'a> DocDiagnostics<'a> {
    pub(crate) fn new(document: &Path, source: &'a str) -> Self {
        DocDiagnostics {
            document: document.to_path_buf(),
            source,
            issues: Vec::new(),
        }
    }

    pub(crate) fn document(&self) -> &Path {
        &self.document
    }

    pub(crate) fn report(&mut self, path: &str, kind: IssueKind, message: impl Into<String>) {
        let line = locate_line(self.source, path);
        self.issues
            .push(SpecIssue::new(&self.document, path, kind, message).at_line(line));
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub(crate) fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub(crate) fn into_issues(self) -> Vec<SpecIssue> {
        self.issues
    }

    /// Expects a mapping (null counts as empty); reports and returns `None` otherwise.
    pub(crate) fn mapping<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Mapping> {
        match value {
            Value::Mapping(map) => Some(map),
            other => {
                self.report(
                    path,
                    IssueKind::ParseError,
                    format!("Expected a mapping, got {}", describe(other)),
                );
                None
            }
        }
    }

    /// Reports every key of `map` not listed in `allowed`.
    pub(crate) fn check_keys(&mut self, map: &Mapping, allowed: &[&str], path: &str) {
        for key in map.keys() {
            match key.as_str() {
                Some(k) if allowed.contains(&k) => {}
                Some(k) => self.report(
                    &join(path, k),
                    IssueKind::ParseError,
                    format!("Unknown key '{k}' (expected one of: {})", allowed.join(", ")),
                ),
                None => self.report(path, IssueKind::ParseError, "Keys must be strings"),
            }
        }
    }

    /// Iterates string-keyed entries, reporting non-string keys.
    pub(crate) fn entries<'v>(&mut self, map: &'v Mapping, path: &str) -> Vec<(&'v str, &'v Value)> {
        let mut out = Vec::with_capacity(map.len());
        for (key, value) in map {
            match key.as_str() {
                Some(k) => out.push((k, value)),
                None => self.report(path, IssueKind::ParseError, "Keys must be strings"),
            }
        }
        out
    }

    pub(crate) fn optional_str(&mut self, map: &Mapping, key: &str, path: &str) -> Option<String> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.report(
                    &join(path, key),
                    IssueKind::ParseError,
                    format!("'{key}' must be a string, got {}", describe(other)),
                );
                None
            }
        }
    }

    pub(crate) fn flag(&mut self, map: &Mapping, key: &str, path: &str) -> bool {
        match map.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                self.report(
                    &join(path, key),
                    IssueKind::ParseError,
                    format!("'{key}' must be a boolean, got {}", describe(other)),
                );
                false
            }
        }
    }

    pub(crate) fn string_list(&mut self, map: &Mapping, key: &str, path: &str) -> Vec<String> {
        match map.get(key) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => out.push(s.to_string()),
                        None => self.report(
                            &join(&join(path, key), &i.to_string()),
                            IssueKind::ParseError,
                            format!("Expected a string, got {}", describe(item)),
                        ),
                    }
                }
                out
            }
            Some(other) => {
                self.report(
                    &join(path, key),
                    IssueKind::ParseError,
                    format!("'{key}' must be a list of strings, got {}", describe(other)),
                );
                Vec::new()
            }
        }
    }
}

/// Best-effort line of a dotted field path: each segment is searched for as
/// a `segment:` key below the line where the previous segment was found.
pub(crate) fn locate_line(source: &str, path: &str) -> Option<usize> {
    if path.is_empty() {
        return None;
    }
    let lines: Vec<&str> = source.lines().collect();
    let mut start = 0usize;
    let mut found = None;
    for segment in path.split('.') {
        if segment.parse::<usize>().is_ok() {
            continue;
        }
        let hit = lines[start..].iter().position(|line| {
            let trimmed = line.trim_start().trim_start_matches("- ");
            let key = trimmed
                .trim_start_matches(['"', '\''])
                .strip_prefix(segment)
                .map(|rest| rest.trim_start_matches(['"', '\'']));
            matches!(key, Some(rest) if rest.starts_with(':'))
        });
        match hit {
            Some(offset) => {
                start += offset;
                found = Some(start + 1);
                start += 1;
            }
            None => break,
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "models:\n  User:\n    fields:\n      id: int\n  Post:\n    fields:\n      id: int\n";

    #[test]
    fn test_locate_line_follows_nesting() {
        assert_eq!(locate_line(SOURCE, "models"), Some(1));
        assert_eq!(locate_line(SOURCE, "models.User.fields.id"), Some(4));
        assert_eq!(locate_line(SOURCE, "models.Post.fields.id"), Some(7));
    }

    #[test]
    fn test_locate_line_falls_back_to_deepest_match() {
        assert_eq!(locate_line(SOURCE, "models.Post.variants"), Some(5));
        assert_eq!(locate_line(SOURCE, ""), None);
    }

    #[test]
    fn test_parse_yaml_reports_line() {
        let err = parse_yaml(Path::new("m.yaml"), "models:\n  a: [1\n").unwrap_err();
        assert_eq!(err.kind, IssueKind::ParseError);
        assert!(err.message.starts_with("Invalid YAML"));
        assert!(err.line.is_some());
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let value = parse_yaml(Path::new("m.yaml"), "").unwrap();
        assert!(value.as_mapping().is_some_and(|m| m.is_empty()));
    }

    #[test]
    fn test_check_keys_reports_unknown() {
        let value: Value = serde_yaml::from_str("a: 1\nb: 2\n").unwrap();
        let mut diag = DocDiagnostics::new(Path::new("x.yaml"), "a: 1\nb: 2\n");
        let map = diag.mapping(&value, "").unwrap();
        diag.check_keys(map, &["a"], "");
        let issues = diag.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "b");
        assert_eq!(issues[0].line, Some(2));
    }
}
