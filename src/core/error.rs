//! Error taxonomy for a directory load.
//!
//! Every variant is fatal to the whole load: nothing is retried and no
//! partial resource list is ever returned alongside an error.

use super::types::{render_diagnostics, Diagnostic};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level failure of a directory load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The directory does not exist or cannot be read.
    #[error("cannot resolve directory '{}': {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory holds no `.tf` / `.tf.json` files.
    #[error("directory '{}' has no terraform config files", .dir.display())]
    NoConfigFiles { dir: PathBuf },

    /// Syntax or semantic errors in the directory's files.
    #[error(
        "failed to load terraform config dir '{}': {}",
        .dir.display(),
        render_diagnostics(.diagnostics)
    )]
    Parse {
        dir: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },

    /// A module call could not be resolved or loaded.
    #[error("failed to build unified config: {0}")]
    GraphBuild(#[from] GraphBuildError),

    /// A managed resource could not be converted to the output schema.
    #[error("failed to convert resource '{id}' in module '{module}': {source}")]
    Conversion {
        id: String,
        module: String,
        #[source]
        source: ConversionError,
    },
}

impl LoadError {
    /// Short name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Path { .. } => "path",
            Self::NoConfigFiles { .. } => "no-config-files",
            Self::Parse { .. } => "parse",
            Self::GraphBuild(_) => "graph-build",
            Self::Conversion { .. } => "conversion",
        }
    }
}

/// Failure while resolving one module call into a child node.
#[derive(Debug, Error)]
pub enum GraphBuildError {
    /// The child directory failed to load.
    #[error("module '{module}' ({}): {source}", .dir.display())]
    ModuleLoad {
        module: String,
        dir: PathBuf,
        #[source]
        source: Box<LoadError>,
    },

    /// The source is not a local path, or does not match the call path.
    #[error("module '{module}' has unsupported source \"{addr}\": {reason}")]
    UnsupportedModuleSource {
        module: String,
        addr: String,
        reason: String,
    },

    /// The child resolves to a directory already on its ancestor chain.
    #[error("module '{module}' re-enters directory '{}'", .dir.display())]
    ModuleCycle { module: String, dir: PathBuf },

    /// Nesting went past the configured limit.
    #[error("module '{module}' exceeds maximum module depth {max_depth}")]
    DepthExceeded { module: String, max_depth: usize },
}

impl GraphBuildError {
    /// Dotted path of the module call that failed.
    pub fn module(&self) -> &str {
        match self {
            Self::ModuleLoad { module, .. }
            | Self::UnsupportedModuleSource { module, .. }
            | Self::ModuleCycle { module, .. }
            | Self::DepthExceeded { module, .. } => module,
        }
    }
}

/// The conversion routine could not express a resource body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_config_files_message() {
        let e = LoadError::NoConfigFiles {
            dir: PathBuf::from("/srv/infra"),
        };
        assert_eq!(
            e.to_string(),
            "directory '/srv/infra' has no terraform config files"
        );
        assert_eq!(e.stage(), "no-config-files");
    }

    #[test]
    fn test_parse_error_lists_diagnostics() {
        let e = LoadError::Parse {
            dir: PathBuf::from("/srv/infra"),
            diagnostics: vec![
                Diagnostic::error("Invalid block", "resource needs 2 labels"),
                Diagnostic::error("Duplicate module call", "vpc"),
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("resource needs 2 labels"));
        assert!(msg.contains("Duplicate module call"));
    }

    #[test]
    fn test_graph_build_wraps_child_failure() {
        let inner = LoadError::NoConfigFiles {
            dir: PathBuf::from("/srv/infra/vpc"),
        };
        let e: LoadError = GraphBuildError::ModuleLoad {
            module: "vpc".to_string(),
            dir: PathBuf::from("/srv/infra/vpc"),
            source: Box::new(inner),
        }
        .into();
        assert_eq!(e.stage(), "graph-build");
        assert!(e.to_string().contains("module 'vpc'"));
        assert!(e.to_string().contains("no terraform config files"));
    }

    #[test]
    fn test_graph_build_module_accessor() {
        let e = GraphBuildError::DepthExceeded {
            module: "a.b.c".to_string(),
            max_depth: 2,
        };
        assert_eq!(e.module(), "a.b.c");
    }
}
