use crate::{
    error::TranscodeError,
    properties::{GENEALOGY, VM_OR_TEMPLATE},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::Path,
};

/// What the reverse pass does with a resource id that appears in some chain but is not itself a
/// governed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAncestorPolicy {
    /// Create an edge for it, with the chain implied by the referencing resource.
    #[default]
    Synthesize,
    /// Abort with a dangling reference.
    Reject,
}

/// What happens to the flattened column once the reverse pass has rebuilt the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReversePostStep {
    #[default]
    Retain,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Relationship kind of governed edges.
    pub edge_kind: String,
    /// Subject (and resource) type of governed edges.
    pub subject_type: String,
    pub missing_ancestors: MissingAncestorPolicy,
    pub reverse_post_step: ReversePostStep,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        TranscodeConfig {
            edge_kind: GENEALOGY.to_string(),
            subject_type: VM_OR_TEMPLATE.to_string(),
            missing_ancestors: MissingAncestorPolicy::default(),
            reverse_post_step: ReversePostStep::default(),
        }
    }
}

impl TranscodeConfig {
    pub fn new(edge_kind: impl Into<String>, subject_type: impl Into<String>) -> Self {
        TranscodeConfig {
            edge_kind: edge_kind.into(),
            subject_type: subject_type.into(),
            ..Default::default()
        }
    }

    pub fn with_missing_ancestors(mut self, policy: MissingAncestorPolicy) -> Self {
        self.missing_ancestors = policy;
        self
    }

    pub fn with_reverse_post_step(mut self, step: ReversePostStep) -> Self {
        self.reverse_post_step = step;
        self
    }

    /// Load from `path` if given and present, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, TranscodeError> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => {
                tracing::debug!("Config file {:?} not found, using defaults.", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TranscodeError> {
        tracing::debug!("Reading transcode config from: {:?}", path.as_ref());
        let content = read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, TranscodeError> {
        let config: TranscodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TranscodeError> {
        tracing::debug!("Writing transcode config to: {:?}", path.as_ref());
        let toml_string = toml::to_string(self)?;
        write(path, toml_string)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TranscodeError> {
        if self.edge_kind.trim().is_empty() {
            return Err(TranscodeError::Config("edge_kind must not be blank".into()));
        }
        if self.subject_type.trim().is_empty() {
            return Err(TranscodeError::Config(
                "subject_type must not be blank".into(),
            ));
        }
        Ok(())
    }
}
