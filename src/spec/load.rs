use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::cross::{cross_validate, CrossInputs};
use super::doc::{parse_yaml, DocDiagnostics};
use super::events::{parse_events, EventsSpec};
use super::manifest::{parse_manifest, ManifestSpec};
use super::models::{parse_models, ModelsSpec};
use super::operations::{parse_domain, DomainSpec};
use super::AllSpecs;
use crate::config::Layout;
use crate::validator::{IssueKind, SpecIssue, SpecReport};

const MANIFEST_STEM: &str = "manifest";

/// Progress of a [`SpecLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStage {
    NotLoaded,
    ModelsLoaded,
    EventsLoaded,
    DomainsAndManifestsLoaded,
    CrossValidated,
    Ready,
    Failed(SpecReport),
}

/// A document's path and text, kept for locating cross-reference issues.
#[derive(Debug, Clone)]
pub(crate) struct SourceDoc {
    pub path: PathBuf,
    pub text: String,
}

/// Loads and validates all specification documents of a repository.
///
/// Each stage validates its documents independently and records issues
/// without stopping, so one run reports every defect.
pub struct SpecLoader<'a> {
    layout: &'a Layout,
    stage: LoadStage,
    report: SpecReport,
    models: ModelsSpec,
    models_source: Option<SourceDoc>,
    /// False when the models document itself could not be parsed.
    models_usable: bool,
    events: EventsSpec,
    events_source: Option<SourceDoc>,
    domains: BTreeMap<String, DomainSpec>,
    domain_sources: BTreeMap<String, SourceDoc>,
    broken_domains: BTreeSet<String>,
    failed_operations: BTreeMap<String, BTreeSet<String>>,
    manifests: BTreeMap<String, ManifestSpec>,
    manifest_sources: BTreeMap<String, SourceDoc>,
}

impl<'a> SpecLoader<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        SpecLoader {
            layout,
            stage: LoadStage::NotLoaded,
            report: SpecReport::new(),
            models: ModelsSpec::default(),
            models_source: None,
            models_usable: true,
            events: EventsSpec::default(),
            events_source: None,
            domains: BTreeMap::new(),
            domain_sources: BTreeMap::new(),
            broken_domains: BTreeSet::new(),
            failed_operations: BTreeMap::new(),
            manifests: BTreeMap::new(),
            manifest_sources: BTreeMap::new(),
        }
    }

    pub fn stage(&self) -> &LoadStage {
        &self.stage
    }

    /// Runs every stage. A repository without a models document yields empty specs.
    pub fn run(&mut self) -> Result<AllSpecs, SpecReport> {
        let models_file = self.layout.models_file();
        if !models_file.exists() {
            info!(path = %models_file.display(), "No specs found, nothing to load");
            self.stage = LoadStage::Ready;
            return Ok(AllSpecs::default());
        }

        self.load_models(&models_file);
        self.load_events();
        self.load_services();
        self.cross_validate();
        self.finish()
    }

    fn advance(&mut self, to: LoadStage) {
        debug!(from = ?self.stage, to = ?to, issues = self.report.len(), "spec loader stage");
        self.stage = to;
    }

    fn load_models(&mut self, path: &Path) {
        let Some(source) = self.read(path) else {
            self.models_usable = false;
            self.advance(LoadStage::ModelsLoaded);
            return;
        };
        match parse_yaml(path, &source.text) {
            Ok(value) => {
                let mut diag = DocDiagnostics::new(path, &source.text);
                self.models = parse_models(&value, &mut diag);
                self.report.extend(diag.into_issues());
            }
            Err(issue) => {
                self.models_usable = false;
                self.report.push(issue);
            }
        }
        info!(models = self.models.len(), "loaded models");
        self.models_source = Some(source);
        self.advance(LoadStage::ModelsLoaded);
    }

    fn load_events(&mut self) {
        let path = self.layout.events_file();
        if path.exists() {
            if let Some(source) = self.read(&path) {
                match parse_yaml(&path, &source.text) {
                    Ok(value) => {
                        let mut diag = DocDiagnostics::new(&path, &source.text);
                        self.events = parse_events(&value, &mut diag);
                        self.report.extend(diag.into_issues());
                    }
                    Err(issue) => self.report.push(issue),
                }
                self.events_source = Some(source);
            }
        }
        info!(events = self.events.len(), "loaded events");
        self.advance(LoadStage::EventsLoaded);
    }

    fn load_services(&mut self) {
        for service in self.service_names() {
            for path in self.spec_files(&service) {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                else {
                    continue;
                };
                let Some(source) = self.read(&path) else {
                    continue;
                };
                let key = format!("{service}/{stem}");
                let value = match parse_yaml(&path, &source.text) {
                    Ok(value) => value,
                    Err(issue) => {
                        self.report.push(issue);
                        if stem != MANIFEST_STEM {
                            self.broken_domains.insert(key);
                        }
                        continue;
                    }
                };
                let mut diag = DocDiagnostics::new(&path, &source.text);
                if stem == MANIFEST_STEM {
                    if let Some(manifest) = parse_manifest(&service, &value, &mut diag) {
                        self.manifests.insert(service.clone(), manifest);
                    }
                    self.manifest_sources.insert(service.clone(), source.clone());
                } else {
                    match parse_domain(&service, &stem, &value, &mut diag) {
                        Some((domain, failed)) => {
                            debug!(domain = %key, operations = domain.operations.len(), "loaded domain");
                            self.domains.insert(key.clone(), domain);
                            if !failed.is_empty() {
                                self.failed_operations.insert(key.clone(), failed);
                            }
                        }
                        None => {
                            self.broken_domains.insert(key.clone());
                        }
                    }
                    self.domain_sources.insert(key, source.clone());
                }
                self.report.extend(diag.into_issues());
            }
        }
        info!(
            domains = self.domains.len(),
            manifests = self.manifests.len(),
            "loaded service specs"
        );
        self.advance(LoadStage::DomainsAndManifestsLoaded);
    }

    fn cross_validate(&mut self) {
        if !self.models_usable {
            warn!("models document unusable, skipping model reference checks");
        }
        let issues = cross_validate(&CrossInputs {
            known_models: self.models.known_model_names(),
            check_models: self.models_usable,
            domains: &self.domains,
            domain_sources: &self.domain_sources,
            broken_domains: &self.broken_domains,
            failed_operations: &self.failed_operations,
            events: &self.events,
            events_source: self.events_source.as_ref(),
            manifests: &self.manifests,
            manifest_sources: &self.manifest_sources,
        });
        self.report.extend(issues);
        self.advance(LoadStage::CrossValidated);
    }

    fn finish(&mut self) -> Result<AllSpecs, SpecReport> {
        if !self.report.is_empty() {
            let report = std::mem::take(&mut self.report);
            self.advance(LoadStage::Failed(report.clone()));
            return Err(report);
        }
        self.advance(LoadStage::Ready);
        Ok(AllSpecs {
            models: std::mem::take(&mut self.models),
            domains: std::mem::take(&mut self.domains),
            events: std::mem::take(&mut self.events),
            manifests: std::mem::take(&mut self.manifests),
        })
    }

    fn read(&mut self, path: &Path) -> Option<SourceDoc> {
        match fs::read_to_string(path) {
            Ok(text) => Some(SourceDoc {
                path: path.to_path_buf(),
                text,
            }),
            Err(e) => {
                self.report.push(SpecIssue::new(
                    path,
                    "",
                    IssueKind::ParseError,
                    format!("Failed to read document: {e}"),
                ));
                None
            }
        }
    }

    fn service_names(&self) -> Vec<String> {
        let dir = self.layout.services_dir();
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().join("spec").is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    fn spec_files(&self, service: &str) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.layout.service_spec_dir(service)) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
            })
            .collect();
        files.sort();
        files
    }
}

/// Loads and cross-validates every document under `layout`.
pub fn load_specs(layout: &Layout) -> Result<AllSpecs, SpecReport> {
    SpecLoader::new(layout).run()
}
