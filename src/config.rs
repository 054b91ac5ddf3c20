//! Context configuration.
//!
//! [`ContextConfig`] is a small serde document. Every field has a default, so an empty file
//! is a valid configuration:
//!
//! ```toml
//! max_contexts = 4
//! initial_stream_capacity = 8
//! warn_on_leaked_subscriptions = true
//! ```

use crate::context::MAX_CONTEXTS;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for a [`Context`](crate::Context) and the registry it is created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of slots of a registry built from this config.
    pub max_contexts: usize,
    /// Pending-value slots reserved up front for every stream.
    pub initial_stream_capacity: usize,
    /// Log a warning for each observer still attached when a stream context is disposed.
    pub warn_on_leaked_subscriptions: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_contexts: MAX_CONTEXTS,
            initial_stream_capacity: 8,
            warn_on_leaked_subscriptions: true,
        }
    }
}

impl ContextConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a file. `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_documents_use_defaults() {
        assert_eq!(ContextConfig::from_toml_str("").unwrap(), ContextConfig::default());
        assert_eq!(ContextConfig::from_json_str("{}").unwrap(), ContextConfig::default());
    }

    #[test]
    fn partial_documents_override_given_fields() {
        let config = ContextConfig::from_toml_str("max_contexts = 2").unwrap();
        assert_eq!(config.max_contexts, 2);
        assert_eq!(config.initial_stream_capacity, 8);

        let config =
            ContextConfig::from_json_str(r#"{ "warn_on_leaked_subscriptions": false }"#).unwrap();
        assert!(!config.warn_on_leaked_subscriptions);
        assert_eq!(config.max_contexts, MAX_CONTEXTS);
    }

    #[test]
    fn malformed_documents_are_reported() {
        assert!(matches!(
            ContextConfig::from_toml_str("max_contexts = \"many\""),
            Err(Error::Toml(_))
        ));
        assert!(matches!(
            ContextConfig::from_json_str("{"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = std::env::temp_dir().join(format!("stickflow-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let json = dir.join("context.json");
        std::fs::write(&json, r#"{ "initial_stream_capacity": 32 }"#).unwrap();
        assert_eq!(ContextConfig::load(&json).unwrap().initial_stream_capacity, 32);

        let toml = dir.join("context.cfg");
        std::fs::write(&toml, "initial_stream_capacity = 16").unwrap();
        assert_eq!(ContextConfig::load(&toml).unwrap().initial_stream_capacity, 16);

        assert!(matches!(
            ContextConfig::load(dir.join("missing.toml")),
            Err(Error::Io(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
