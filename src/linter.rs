//! # Linter Module
//!
//! Convention and handler-sync checks that go beyond validation. Specs that
//! pass [`load_specs`](crate::spec::load_specs) can still produce awkward code
//! or drift away from the hand-written handlers; this module reports both.
//!
//! ## Checks Performed
//!
//! 1. **Name casing** - services, domains and operations are snake_case,
//!    models are CamelCase
//! 2. **Handler files** - every domain has `services/<svc>/src/handlers/<domain>.rs`
//! 3. **Handler methods** - every contract operation has an `async fn` in the
//!    handler, and the handler has no methods the contract dropped
//!
//! `fix_handlers` appends "not implemented" stubs for missing methods to the
//! `impl <Contract> for <Handler>` block.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::Layout;
use crate::generator::naming::to_snake_case;
use crate::generator::{contract_name, handler_name, stub_method, OperationContextBuilder};
use crate::spec::{AllSpecs, DomainSpec};

#[cfg(test)]
mod tests;

#[allow(clippy::expect_used)]
static ASYNC_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"async\s+fn\s+(?:r#)?([A-Za-z_][A-Za-z0-9_]*)")
        .expect("async fn regex should be valid")
});

/// Severity level for lint issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Generated code will not compile or behave as declared
    Error,
    /// Works, but should be fixed
    Warning,
    /// Housekeeping
    Info,
}

/// A lint issue found in the specs or the handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    /// Where the issue occurred (e.g. "backend/users:create_user", "model:User")
    pub location: String,
    pub severity: LintSeverity,
    /// e.g. "operation_name_casing", "missing_handler_method"
    pub kind: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl LintIssue {
    pub fn new(
        location: impl Into<String>,
        severity: LintSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LintIssue {
            location: location.into(),
            severity,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Every lint: naming conventions, then handler sync.
pub fn lint_all(specs: &AllSpecs, layout: &Layout) -> anyhow::Result<Vec<LintIssue>> {
    let mut issues = lint_conventions(specs);
    issues.extend(lint_handlers(specs, layout)?);
    debug!(issues = issues.len(), "lint finished");
    Ok(issues)
}

/// Casing of service, domain, operation and model names.
pub fn lint_conventions(specs: &AllSpecs) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    for service in specs.services() {
        if !is_snake_case(service) {
            issues.push(
                LintIssue::new(
                    format!("service:{service}"),
                    LintSeverity::Error,
                    "service_name_casing",
                    format!("Service name '{service}' should be snake_case"),
                )
                .with_suggestion(format!("Rename the directory to '{}'", to_snake_case(service))),
            );
        }
    }

    for domain in specs.domains.values() {
        if !is_snake_case(&domain.name) {
            issues.push(
                LintIssue::new(
                    domain.key(),
                    LintSeverity::Error,
                    "domain_name_casing",
                    format!("Domain name '{}' should be snake_case", domain.name),
                )
                .with_suggestion(format!("Rename to '{}.yaml'", to_snake_case(&domain.name))),
            );
        }
        for op in &domain.operations {
            if !is_snake_case(&op.name) {
                issues.push(
                    LintIssue::new(
                        format!("{}:{}", domain.key(), op.name),
                        LintSeverity::Error,
                        "operation_name_casing",
                        format!("Operation '{}' should be snake_case", op.name),
                    )
                    .with_suggestion(format!("Use '{}'", to_snake_case(&op.name))),
                );
            }
        }
    }

    for model in specs.models.iter() {
        if !is_camel_case(&model.name) {
            issues.push(LintIssue::new(
                format!("model:{}", model.name),
                LintSeverity::Warning,
                "model_name_casing",
                format!("Model name '{}' should be CamelCase", model.name),
            ));
        }
    }

    issues
}

/// Checks every domain's handler file against its contract.
pub fn lint_handlers(specs: &AllSpecs, layout: &Layout) -> anyhow::Result<Vec<LintIssue>> {
    let mut issues = Vec::new();
    for domain in specs.domains.values() {
        let path = handler_path(layout, domain);
        let location = layout.relative(&path).display().to_string();
        if !path.exists() {
            issues.push(
                LintIssue::new(
                    &location,
                    LintSeverity::Warning,
                    "missing_handler_file",
                    format!("No handler for domain '{}'", domain.key()),
                )
                .with_suggestion("Run `specforge generate --only handlers`"),
            );
            continue;
        }
        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let implemented = implemented_methods(&source);

        let builder = OperationContextBuilder::new();
        for op in &domain.operations {
            if !implemented.iter().any(|m| m == &op.name) {
                let ctx = builder.for_contract(op);
                issues.push(
                    LintIssue::new(
                        &location,
                        LintSeverity::Error,
                        "missing_handler_method",
                        format!(
                            "{} does not implement '{}'",
                            handler_name(&domain.name),
                            op.name
                        ),
                    )
                    .with_suggestion(ctx.signature),
                );
            }
        }
        for method in &implemented {
            if domain.operation(method).is_none() {
                issues.push(LintIssue::new(
                    &location,
                    LintSeverity::Info,
                    "stale_handler_method",
                    format!(
                        "'{method}' is not an operation of {}",
                        contract_name(&domain.name)
                    ),
                ));
            }
        }
    }
    Ok(issues)
}

/// Appends stubs for missing operations to each handler's contract impl.
///
/// Returns the files that changed. Handler files that do not exist, or whose
/// impl block cannot be found, are left alone. Imports of model types used
/// only by the new methods are not added.
pub fn fix_handlers(specs: &AllSpecs, layout: &Layout) -> anyhow::Result<Vec<PathBuf>> {
    let builder = OperationContextBuilder::new();
    let mut changed = Vec::new();
    for domain in specs.domains.values() {
        let path = handler_path(layout, domain);
        if !path.exists() {
            continue;
        }
        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let implemented = implemented_methods(&source);
        let stubs: Vec<String> = domain
            .operations
            .iter()
            .filter(|op| !implemented.iter().any(|m| m == &op.name))
            .map(|op| stub_method(&builder.for_contract(op).signature, &op.name))
            .collect();
        if stubs.is_empty() {
            continue;
        }
        let contract = contract_name(&domain.name);
        let handler = handler_name(&domain.name);
        let Some(fixed) = insert_into_impl(&source, &contract, &handler, &stubs) else {
            debug!(path = %path.display(), "impl {contract} for {handler} not found");
            continue;
        };
        fs::write(&path, fixed).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), added = stubs.len(), "added handler stubs");
        changed.push(path);
    }
    Ok(changed)
}

fn handler_path(layout: &Layout, domain: &DomainSpec) -> PathBuf {
    layout
        .service_handlers_dir(&domain.service)
        .join(format!("{}.rs", domain.name))
}

/// Names of every `async fn` in `source`, in order.
pub(crate) fn implemented_methods(source: &str) -> Vec<String> {
    ASYNC_FN
        .captures_iter(source)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// `source` with `stubs` appended to the body of `impl <contract> for <handler>`.
pub(crate) fn insert_into_impl(
    source: &str,
    contract: &str,
    handler: &str,
    stubs: &[String],
) -> Option<String> {
    let header = Regex::new(&format!(
        r"impl\s+{}\s+for\s+{}\s*\{{",
        regex::escape(contract),
        regex::escape(handler)
    ))
    .ok()?;
    let open = header.find(source)?.end();

    let mut depth = 1usize;
    let mut close = None;
    for (i, ch) in source[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close?;

    let body = source[..close].trim_end();
    let extra: usize = stubs.iter().map(String::len).sum();
    let mut out = String::with_capacity(source.len() + extra + 2);
    out.push_str(body);
    out.push('\n');
    if !body.ends_with('{') {
        out.push('\n');
    }
    out.push_str(&stubs.join("\n"));
    out.push_str(&source[close..]);
    Some(out)
}

/// Check if a string is snake_case
pub(crate) fn is_snake_case(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Check if a string is CamelCase
pub(crate) fn is_camel_case(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn print_group(title: &str, issues: &[&LintIssue]) {
    if issues.is_empty() {
        return;
    }
    println!("{title}");
    for issue in issues {
        println!("   [{}] {}", issue.kind, issue.location);
        println!("      {}", issue.message);
        if let Some(suggestion) = &issue.suggestion {
            println!("      💡 Suggestion: {}", suggestion);
        }
    }
    println!();
}

/// Print lint issues in a formatted way
pub fn print_lint_issues(issues: &[LintIssue]) {
    if issues.is_empty() {
        println!("✅ No lint issues found!");
        return;
    }

    let of = |severity| -> Vec<&LintIssue> {
        issues.iter().filter(|i| i.severity == severity).collect()
    };
    let errors = of(LintSeverity::Error);
    let warnings = of(LintSeverity::Warning);
    let infos = of(LintSeverity::Info);

    println!("\n📋 Lint Results:");
    println!(
        "   {} error(s), {} warning(s), {} info(s)\n",
        errors.len(),
        warnings.len(),
        infos.len()
    );
    print_group("❌ Errors (must fix):", &errors);
    print_group("⚠️  Warnings (should fix):", &warnings);
    print_group("ℹ️  Info:", &infos);
}

pub fn has_errors(issues: &[LintIssue]) -> bool {
    issues.iter().any(|i| i.severity == LintSeverity::Error)
}
