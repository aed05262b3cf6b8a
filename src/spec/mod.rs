//! # Spec Module
//!
//! Parsing, validation and the in-memory representation of the YAML
//! specification documents.
//!
//! ## Documents
//!
//! | document | contents |
//! |---|---|
//! | `shared/spec/models.yaml` | models, fields and variants |
//! | `shared/spec/events.yaml` | event directory (optional) |
//! | `services/<svc>/spec/<domain>.yaml` | one domain of operations |
//! | `services/<svc>/spec/manifest.yaml` | domains the service consumes |
//!
//! [`load_specs`] reads every document, validates each one on its own, then
//! checks the references between them. It returns either a complete
//! [`AllSpecs`] or a [`SpecReport`](crate::validator::SpecReport) with every
//! issue found.

mod cross;
mod doc;
pub mod events;
mod load;
pub mod manifest;
pub mod models;
pub mod operations;
pub mod schema;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};

pub use events::{EventSpec, EventsSpec};
pub use load::{load_specs, LoadStage, SpecLoader};
pub use manifest::{ConsumeSpec, ManifestSpec};
pub use models::{
    auto_exclusion_for, AutoExclusion, Constraints, FieldSpec, FieldView, ModelSpec, ModelView,
    ModelsSpec, VariantSpec, VARIANT_POLICIES,
};
pub use operations::{
    path_placeholders, BusTransport, DomainSpec, ModelRef, OperationSpec, ParamSource, ParamSpec,
    WebDomainConfig, WebTransport,
};
pub use schema::{AdditionalProperties, SchemaNode, SchemaType};
pub use types::{EnumType, PrimitiveKind, TypeSpec, UnknownTypeError};

/// Every validated specification of a repository. Built once per run and
/// only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllSpecs {
    pub models: ModelsSpec,
    /// Keyed by `service/domain`.
    pub domains: BTreeMap<String, DomainSpec>,
    pub events: EventsSpec,
    /// Keyed by owning service.
    pub manifests: BTreeMap<String, ManifestSpec>,
}

impl AllSpecs {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Every service that owns a domain or a manifest.
    pub fn services(&self) -> BTreeSet<&str> {
        self.domains
            .values()
            .map(|d| d.service.as_str())
            .chain(self.manifests.keys().map(String::as_str))
            .collect()
    }

    /// Domains of `service`, ordered by name.
    pub fn domains_of<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a DomainSpec> + 'a {
        self.domains.values().filter(move |d| d.service == service)
    }

    pub fn domain(&self, service: &str, domain: &str) -> Option<&DomainSpec> {
        self.domains.get(&format!("{service}/{domain}"))
    }
}
