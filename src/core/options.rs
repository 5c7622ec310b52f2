//! Load options, readable from a YAML file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How module call sources are checked before the call path is joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePolicy {
    /// Reject non-local sources and local sources whose directory does not
    /// match the dotted call path.
    #[default]
    Strict,
    /// Join the dotted call path without looking at the source.
    Permissive,
}

impl fmt::Display for SourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Permissive => write!(f, "permissive"),
        }
    }
}

/// Options for one directory load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    #[serde(default)]
    pub source_policy: SourcePolicy,

    /// Deepest module nesting accepted below the root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Also load `*.tf.json` files
    #[serde(default = "default_true")]
    pub include_json: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            source_policy: SourcePolicy::default(),
            max_depth: default_max_depth(),
            include_json: true,
        }
    }
}

fn default_max_depth() -> usize {
    32
}

fn default_true() -> bool {
    true
}

impl LoadOptions {
    /// Read options from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml_ng::from_str(yaml).map_err(|e| format!("options parse error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = LoadOptions::default();
        assert_eq!(o.source_policy, SourcePolicy::Strict);
        assert_eq!(o.max_depth, 32);
        assert!(o.include_json);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let o = LoadOptions::from_yaml("source_policy: permissive\n").unwrap();
        assert_eq!(o.source_policy, SourcePolicy::Permissive);
        assert_eq!(o.max_depth, 32);
        assert!(o.include_json);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
source_policy: strict
max_depth: 4
include_json: false
"#;
        let o = LoadOptions::from_yaml(yaml).unwrap();
        assert_eq!(o.max_depth, 4);
        assert!(!o.include_json);
    }

    #[test]
    fn test_bad_policy() {
        let err = LoadOptions::from_yaml("source_policy: lenient\n").unwrap_err();
        assert!(err.contains("options parse error"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrawalk.yaml");
        std::fs::write(&path, "max_depth: 3\n").unwrap();
        assert_eq!(LoadOptions::from_file(&path).unwrap().max_depth, 3);
        assert!(LoadOptions::from_file(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(SourcePolicy::Permissive.to_string(), "permissive");
    }
}
