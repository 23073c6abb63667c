//! Pipeline configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PodiumError, Result};
use crate::input::LoaderConfig;
use crate::schema::{DatasetDefinition, SchemaRegistry};
use crate::store::check_name;
use crate::transform::{Derivation, TransformEngine};

/// Everything a pipeline run needs, read once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Parser and row-error settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Dataset kinds with their schemas, cleaning rules and source files.
    pub datasets: Vec<DatasetDefinition>,

    /// Confirmed-tier derivations, applied in order.
    #[serde(default)]
    pub derivations: Vec<Derivation>,
}

impl PipelineConfig {
    /// Create a configuration without derivations.
    pub fn new(datasets: Vec<DatasetDefinition>) -> Self {
        Self {
            loader: LoaderConfig::default(),
            datasets,
            derivations: Vec::new(),
        }
    }

    /// Add derivations.
    pub fn with_derivations(mut self, derivations: Vec<Derivation>) -> Self {
        self.derivations = derivations;
        self
    }

    /// Set the loader settings.
    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PodiumError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the schema registry.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        SchemaRegistry::new(self.datasets.iter().cloned())
    }

    /// Transform engine for the derivations.
    pub fn engine(&self) -> TransformEngine {
        TransformEngine::new(self.derivations.clone())
    }

    /// Reject inconsistent configurations: duplicate kinds, bad delimiters,
    /// derivations reading unknown datasets or reusing names.
    pub fn validate(&self) -> Result<()> {
        self.loader.parser_config()?;
        let kinds = self.datasets.iter().map(|d| d.kind.as_str());
        for name in kinds.chain(self.derivations.iter().map(|d| d.name.as_str())) {
            check_name(name)?;
        }
        let registry = self.registry()?;
        self.engine().check(registry.kinds())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::olympics()
    }
}
