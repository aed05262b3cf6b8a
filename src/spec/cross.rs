//! Cross-document reference checks.
//!
//! Runs after every document has been validated on its own, in a fixed order:
//!
//! 1. model references of operations (input, output, message override)
//! 2. message models of events
//! 3. manifest references to services, domains and operations
//!
//! Every failure is collected. Names that were declared but failed their own
//! validation still count as known, so a broken model or operation is reported
//! once at its definition and not again at each use.

use std::collections::{BTreeMap, BTreeSet};

use super::doc::{join, DocDiagnostics};
use super::events::EventsSpec;
use super::load::SourceDoc;
use super::manifest::ManifestSpec;
use super::operations::DomainSpec;
use crate::validator::{IssueKind, SpecIssue};

pub(crate) struct CrossInputs<'a> {
    pub known_models: &'a BTreeSet<String>,
    /// False when the models document could not be parsed at all.
    pub check_models: bool,
    pub domains: &'a BTreeMap<String, DomainSpec>,
    pub domain_sources: &'a BTreeMap<String, SourceDoc>,
    pub broken_domains: &'a BTreeSet<String>,
    pub failed_operations: &'a BTreeMap<String, BTreeSet<String>>,
    pub events: &'a EventsSpec,
    pub events_source: Option<&'a SourceDoc>,
    pub manifests: &'a BTreeMap<String, ManifestSpec>,
    pub manifest_sources: &'a BTreeMap<String, SourceDoc>,
}

pub(crate) fn cross_validate(inputs: &CrossInputs<'_>) -> Vec<SpecIssue> {
    let mut issues = Vec::new();
    if inputs.check_models {
        check_operation_models(inputs, &mut issues);
        check_event_models(inputs, &mut issues);
    }
    check_manifests(inputs, &mut issues);
    issues
}

fn check_operation_models(inputs: &CrossInputs<'_>, issues: &mut Vec<SpecIssue>) {
    for (key, domain) in inputs.domains {
        let Some(source) = inputs.domain_sources.get(key) else {
            continue;
        };
        let mut diag = DocDiagnostics::new(&source.path, &source.text);
        for op in &domain.operations {
            let op_path = join("operations", &op.name);
            for (field, model) in op.model_references() {
                if !inputs.known_models.contains(model) {
                    let role = match field {
                        "input" => "input",
                        "output" => "output",
                        _ => "message",
                    };
                    diag.report(
                        &join(&op_path, field),
                        IssueKind::ReferenceError,
                        format!("Unknown {role} model '{model}'"),
                    );
                }
            }
        }
        issues.extend(diag.into_issues());
    }
}

fn check_event_models(inputs: &CrossInputs<'_>, issues: &mut Vec<SpecIssue>) {
    let Some(source) = inputs.events_source else {
        return;
    };
    let mut diag = DocDiagnostics::new(&source.path, &source.text);
    for event in &inputs.events.events {
        if !inputs.known_models.contains(&event.message) {
            diag.report(
                &join(&join("events", &event.name), "message"),
                IssueKind::ReferenceError,
                format!("Event '{}': Unknown message model '{}'", event.name, event.message),
            );
        }
    }
    issues.extend(diag.into_issues());
}

fn check_manifests(inputs: &CrossInputs<'_>, issues: &mut Vec<SpecIssue>) {
    let known_services: BTreeSet<&str> = inputs
        .domains
        .keys()
        .chain(inputs.broken_domains.iter())
        .filter_map(|k| k.split('/').next())
        .collect();

    for (service, manifest) in inputs.manifests {
        let Some(source) = inputs.manifest_sources.get(service) else {
            continue;
        };
        let mut diag = DocDiagnostics::new(&source.path, &source.text);
        for (i, consume) in manifest.consumes.iter().enumerate() {
            let path = join("consumes", &i.to_string());
            let key = consume.domain_key();
            if inputs.broken_domains.contains(&key) {
                continue;
            }
            if !known_services.contains(consume.service.as_str()) {
                diag.report(
                    &join(&path, "service"),
                    IssueKind::ReferenceError,
                    format!("Unknown service '{}'", consume.service),
                );
                continue;
            }
            let Some(domain) = inputs.domains.get(&key) else {
                diag.report(
                    &join(&path, "domain"),
                    IssueKind::ReferenceError,
                    format!("Unknown domain '{key}'"),
                );
                continue;
            };
            let failed = inputs.failed_operations.get(&key);
            for op in &consume.operations {
                let known = domain.operation(op).is_some()
                    || failed.is_some_and(|f| f.contains(op));
                if !known {
                    diag.report(
                        &join(&path, "operations"),
                        IssueKind::ReferenceError,
                        format!("Unknown operation '{op}' in domain '{key}'"),
                    );
                }
            }
        }
        issues.extend(diag.into_issues());
    }
}
