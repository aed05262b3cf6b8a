//! Per-service dependency manifests (`services/<service>/spec/manifest.yaml`).

use serde_yaml::Value;

use super::doc::{join, DocDiagnostics};
use super::types::describe;
use crate::validator::IssueKind;

/// One provider domain a service depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeSpec {
    pub service: String,
    pub domain: String,
    /// Empty means every operation of the domain.
    pub operations: Vec<String>,
}

impl ConsumeSpec {
    pub fn domain_key(&self) -> String {
        format!("{}/{}", self.service, self.domain)
    }

    pub fn includes(&self, operation: &str) -> bool {
        self.operations.is_empty() || self.operations.iter().any(|o| o == operation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSpec {
    pub owning_service: String,
    pub consumes: Vec<ConsumeSpec>,
}

impl ManifestSpec {
    /// Distinct provider services, in first-mention order.
    pub fn providers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in &self.consumes {
            if !out.contains(&c.service.as_str()) {
                out.push(&c.service);
            }
        }
        out
    }
}

pub(crate) fn parse_manifest(
    service: &str,
    root: &Value,
    diag: &mut DocDiagnostics<'_>,
) -> Option<ManifestSpec> {
    let map = diag.mapping(root, "")?;
    diag.check_keys(map, &["consumes"], "");
    let mut consumes = Vec::new();
    match map.get("consumes") {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(items)) => {
            for (i, item) in items.iter().enumerate() {
                let path = join("consumes", &i.to_string());
                let Some(entry) = diag.mapping(item, &path) else {
                    continue;
                };
                diag.check_keys(entry, &["service", "domain", "operations"], &path);
                let service_name = diag.optional_str(entry, "service", &path);
                let domain = diag.optional_str(entry, "domain", &path);
                let operations = diag.string_list(entry, "operations", &path);
                match (service_name, domain) {
                    (Some(s), Some(d)) => {
                        if s == service {
                            diag.report(
                                &join(&path, "service"),
                                IssueKind::ReferenceError,
                                format!("Service '{service}' cannot consume its own domain '{d}'"),
                            );
                            continue;
                        }
                        consumes.push(ConsumeSpec {
                            service: s,
                            domain: d,
                            operations,
                        })
                    }
                    _ => diag.report(
                        &path,
                        IssueKind::ParseError,
                        "Consume entry needs both 'service' and 'domain'",
                    ),
                }
            }
        }
        Some(other) => diag.report(
            "consumes",
            IssueKind::ParseError,
            format!("'consumes' must be a list, got {}", describe(other)),
        ),
    }
    Some(ManifestSpec {
        owning_service: service.to_string(),
        consumes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(source: &str) -> (Option<ManifestSpec>, Vec<crate::validator::SpecIssue>) {
        let path = Path::new("manifest.yaml");
        let value = super::super::doc::parse_yaml(path, source).unwrap();
        let mut diag = DocDiagnostics::new(path, source);
        let spec = parse_manifest("tg_bot", &value, &mut diag);
        (spec, diag.into_issues())
    }

    #[test]
    fn test_parse_manifest() {
        let (manifest, issues) = parse(
            r#"
consumes:
  - service: backend
    domain: users
    operations: [create_user, get_user]
  - service: backend
    domain: posts
  - service: billing
    domain: invoices
"#,
        );
        assert!(issues.is_empty(), "{issues:?}");
        let manifest = manifest.unwrap();
        assert_eq!(manifest.providers(), vec!["backend", "billing"]);
        assert!(manifest.consumes[0].includes("get_user"));
        assert!(!manifest.consumes[0].includes("delete_user"));
        assert!(manifest.consumes[1].includes("anything"));
        assert_eq!(manifest.consumes[2].domain_key(), "billing/invoices");
    }

    #[test]
    fn test_manifest_entry_needs_service_and_domain() {
        let (manifest, issues) = parse("consumes:\n  - service: backend\n");
        assert_eq!(issues.len(), 1);
        assert!(manifest.unwrap().consumes.is_empty());
    }

    #[test]
    fn test_self_consumption_is_rejected() {
        let (_, issues) = parse("consumes:\n  - {service: tg_bot, domain: commands}\n");
        assert_eq!(issues[0].kind, IssueKind::ReferenceError);
    }
}
