// ==============================================================================
// infer.toml Configuration
// ==============================================================================
//
// Discovers and loads `infer.toml` project configuration files. Provides:
// - Declaration files loaded into the store, one provenance group each
// - Resolver knobs
//
// Example infer.toml:
//
// ```toml
// declarations = ["decls/core.toml", "decls/app.toml"]
//
// [resolver]
// max_depth = 12
// ```

use std::path::{Path, PathBuf};

use lang_check::ResolverConfig;
use miette::Diagnostic;
use serde::Deserialize;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(infer::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {}", path.display())]
    #[diagnostic(code(infer::config::parse), help("see the example at the top of config.rs"))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level `infer.toml` configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InferConfig {
    /// Declaration files, relative to infer.toml.
    #[serde(default)]
    pub declarations: Vec<String>,

    #[serde(default)]
    pub resolver: ResolverSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverSection {
    pub max_depth: Option<usize>,
}

impl InferConfig {
    pub fn resolver_config(&self) -> ResolverConfig {
        let mut config = ResolverConfig::default();
        if let Some(max_depth) = self.resolver.max_depth {
            config.max_depth = max_depth;
        }
        config
    }

    /// Declaration paths resolved against the config's directory.
    pub fn declaration_paths(&self, config_dir: &Path) -> Vec<PathBuf> {
        self.declarations
            .iter()
            .map(|entry| config_dir.join(entry))
            .collect()
    }
}

/// Walk up from `start_dir` looking for `infer.toml`. Returns the first match.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join("infer.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Read and parse an `infer.toml` file.
pub fn load_config(path: &Path) -> Result<InferConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml_str = r#"
            declarations = ["decls/core.toml"]
        "#;
        let config: InferConfig = toml::from_str(toml_str).expect("parse error");
        assert_eq!(config.declarations, vec!["decls/core.toml"]);
        assert_eq!(config.resolver_config(), ResolverConfig::default());
    }

    #[test]
    fn parse_resolver_section() {
        let toml_str = r#"
            declarations = []

            [resolver]
            max_depth = 3
        "#;
        let config: InferConfig = toml::from_str(toml_str).expect("parse error");
        assert_eq!(config.resolver_config().max_depth, 3);
    }

    #[test]
    fn parse_empty_config() {
        let config: InferConfig = toml::from_str("").expect("parse error");
        assert!(config.declarations.is_empty());
        assert!(config.resolver.max_depth.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<InferConfig>("stubs = []").is_err());
    }

    #[test]
    fn find_config_walks_up() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(tmp.path().join("infer.toml"), "").expect("write config");

        let found = find_config(&nested).expect("config found");
        assert_eq!(found, tmp.path().join("infer.toml"));
        let relative = load_config(&found)
            .expect("config loads")
            .declaration_paths(tmp.path());
        assert!(relative.is_empty());
    }
}
