//! Generator configuration.
//!
//! A [`GeneratorConfig`] is built once per run and handed to the loader and the
//! generators. Values come from built-in defaults, optionally overridden by a
//! `specforge.toml` at the repository root:
//!
//! ```toml
//! shared_spec_dir = "shared/spec"
//! services_dir = "services"
//! shared_output_dir = "shared/src/generated"
//! runtime_path = "shared::runtime"
//! schemas_path = "shared::generated::schemas"
//! format = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "specforge.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Directory holding `models.yaml` and `events.yaml`.
    pub shared_spec_dir: PathBuf,
    /// Directory with one sub-directory per service.
    pub services_dir: PathBuf,
    /// Where shared schema and event modules are written.
    pub shared_output_dir: PathBuf,
    /// TypeScript declarations of the shared models.
    pub typescript_output: PathBuf,
    /// Rust path of the runtime support module used by generated code.
    pub runtime_path: String,
    /// Rust path of the generated shared schema module, as seen from services.
    pub schemas_path: String,
    /// Run rustfmt over written files.
    pub format: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            shared_spec_dir: PathBuf::from("shared/spec"),
            services_dir: PathBuf::from("services"),
            shared_output_dir: PathBuf::from("shared/src/generated"),
            typescript_output: PathBuf::from("shared/generated/types.ts"),
            runtime_path: "shared::runtime".to_string(),
            schemas_path: "shared::generated::schemas".to_string(),
            format: false,
        }
    }
}

impl GeneratorConfig {
    /// Reads `specforge.toml` under `root`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(root: &Path) -> Result<Option<GeneratorConfig>, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(config = %path.display(), "loaded generator config");
        Ok(Some(config))
    }

    /// The file config if present, else defaults.
    pub fn load_or_default(root: &Path) -> Result<GeneratorConfig, ConfigError> {
        Ok(Self::load(root)?.unwrap_or_default())
    }
}

/// Absolute locations of inputs and outputs for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub config: GeneratorConfig,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, config: GeneratorConfig) -> Self {
        Layout {
            root: root.into(),
            config,
        }
    }

    pub fn models_file(&self) -> PathBuf {
        self.root.join(&self.config.shared_spec_dir).join("models.yaml")
    }

    pub fn events_file(&self) -> PathBuf {
        self.root.join(&self.config.shared_spec_dir).join("events.yaml")
    }

    pub fn services_dir(&self) -> PathBuf {
        self.root.join(&self.config.services_dir)
    }

    pub fn service_spec_dir(&self, service: &str) -> PathBuf {
        self.services_dir().join(service).join("spec")
    }

    pub fn service_src_dir(&self, service: &str) -> PathBuf {
        self.services_dir().join(service).join("src")
    }

    pub fn service_generated_dir(&self, service: &str) -> PathBuf {
        self.service_src_dir(service).join("generated")
    }

    pub fn service_handlers_dir(&self, service: &str) -> PathBuf {
        self.service_src_dir(service).join("handlers")
    }

    pub fn service_doc_dir(&self, service: &str) -> PathBuf {
        self.services_dir().join(service).join("doc")
    }

    pub fn shared_output_dir(&self) -> PathBuf {
        self.root.join(&self.config.shared_output_dir)
    }

    pub fn typescript_file(&self) -> PathBuf {
        self.root.join(&self.config.typescript_output)
    }

    /// `path` relative to the repository root, for display.
    pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
