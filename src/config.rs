//! Compiler configuration.
//!
//! [`CompilerConfig`] has usable defaults; with the `config` feature it can
//! also be loaded from JSON or YAML, and any field can be overridden from
//! prefixed environment variables.

use std::env;
#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use crate::error::{ContainerError, ContainerResult};

/// Settings for one compile run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CompilerConfig {
    /// Name of the generated container struct
    pub container_name: String,
    /// Build non-shared, dependency free services inline instead of through
    /// their accessor
    pub inline_trivial_services: bool,
    /// Analyse closure factories whose source is attached
    pub analyze_closures: bool,
    /// Emit a comment with the service class above each accessor
    pub debug_comments: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            container_name: "CompiledContainer".to_string(),
            inline_trivial_services: true,
            analyze_closures: true,
            debug_comments: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    pub fn with_inlining(mut self, enabled: bool) -> Self {
        self.inline_trivial_services = enabled;
        self
    }

    pub fn with_debug_comments(mut self, enabled: bool) -> Self {
        self.debug_comments = enabled;
        self
    }

    #[cfg(feature = "config")]
    pub fn from_json_str(content: &str) -> ContainerResult<Self> {
        serde_json::from_str(content).map_err(|e| invalid(e.to_string()))
    }

    #[cfg(feature = "config")]
    pub fn from_yaml_str(content: &str) -> ContainerResult<Self> {
        serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))
    }

    /// Loads a `.json`, `.yaml` or `.yml` file.
    #[cfg(feature = "config")]
    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(invalid(format!(
                "unsupported configuration format [{}]",
                path.display()
            ))),
        }
    }

    /// Overrides fields from `<PREFIX>_CONTAINER_NAME`,
    /// `<PREFIX>_INLINE_TRIVIAL_SERVICES`, `<PREFIX>_ANALYZE_CLOSURES` and
    /// `<PREFIX>_DEBUG_COMMENTS`. Unparseable booleans are ignored.
    pub fn with_env_overrides(mut self, prefix: &str) -> Self {
        let key = |name: &str| format!("{}_{}", prefix.to_uppercase(), name);
        let flag = |name: &str| env::var(key(name)).ok().and_then(|value| value.parse::<bool>().ok());

        if let Ok(name) = env::var(key("CONTAINER_NAME")) {
            self.container_name = name;
        }
        if let Some(enabled) = flag("INLINE_TRIVIAL_SERVICES") {
            self.inline_trivial_services = enabled;
        }
        if let Some(enabled) = flag("ANALYZE_CLOSURES") {
            self.analyze_closures = enabled;
        }
        if let Some(enabled) = flag("DEBUG_COMMENTS") {
            self.debug_comments = enabled;
        }

        self
    }
}

#[cfg(feature = "config")]
fn invalid(message: String) -> ContainerError {
    ContainerError::InvalidArgument(format!("Invalid compiler configuration: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.container_name, "CompiledContainer");
        assert!(config.inline_trivial_services);
        assert!(config.analyze_closures);
        assert!(!config.debug_comments);
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("VISERIO_CFG_TEST_CONTAINER_NAME", "AppContainer");
        env::set_var("VISERIO_CFG_TEST_INLINE_TRIVIAL_SERVICES", "false");
        env::set_var("VISERIO_CFG_TEST_DEBUG_COMMENTS", "maybe");

        let config = CompilerConfig::default()
            .with_env_overrides("viserio_cfg_test");

        assert_eq!(config.container_name, "AppContainer");
        assert!(!config.inline_trivial_services);
        assert!(!config.debug_comments);

        env::remove_var("VISERIO_CFG_TEST_CONTAINER_NAME");
        env::remove_var("VISERIO_CFG_TEST_INLINE_TRIVIAL_SERVICES");
        env::remove_var("VISERIO_CFG_TEST_DEBUG_COMMENTS");
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_json_and_yaml() {
        let config = CompilerConfig::from_json_str(r#"{"container_name": "Web", "debug_comments": true}"#).unwrap();
        assert_eq!(config.container_name, "Web");
        assert!(config.debug_comments);
        assert!(config.inline_trivial_services);

        let config = CompilerConfig::from_yaml_str("inline_trivial_services: false\n").unwrap();
        assert!(!config.inline_trivial_services);
        assert_eq!(config.container_name, "CompiledContainer");

        let error = CompilerConfig::from_json_str("{").unwrap_err();
        assert!(error.to_string().starts_with("Invalid compiler configuration"));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compiler.toml");
        std::fs::write(&path, "").unwrap();

        assert!(CompilerConfig::from_file(&path).is_err());

        let path = dir.path().join("compiler.yml");
        std::fs::write(&path, "container_name: Cli\n").unwrap();
        assert_eq!(CompilerConfig::from_file(&path).unwrap().container_name, "Cli");
    }
}
