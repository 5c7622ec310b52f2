//! Module call resolution.
//!
//! Local modules carry no address other than their position in the call
//! tree, so the child directory is the root directory joined with each
//! segment of the dotted call path. That only matches reality when every
//! call is declared as `module "x" { source = "./x" }` relative to its
//! parent; [`SourcePolicy::Strict`] rejects calls where it does not.

use super::error::{GraphBuildError, LoadError};
use super::options::SourcePolicy;
use super::parser::ConfigParser;
use super::path::{clean_path, resolve_root};
use super::types::*;
use log::debug;
use std::path::{Path, PathBuf};

/// One module call to resolve into a child unit.
#[derive(Debug, Clone)]
pub struct ModuleRequest<'a> {
    /// Path of the requested child (parent path plus the call name)
    pub path: ModulePath,
    /// The call as declared in the parent
    pub call: &'a ModuleCall,
}

impl ModuleRequest<'_> {
    /// Nesting depth of the requested child (direct children of the root are 1).
    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}

/// A loaded child unit and the version tag issued for it.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub unit: ConfigUnit,
    pub version: SyntheticVersion,
    pub warnings: Vec<Diagnostic>,
}

/// Resolves module calls for the graph builder.
///
/// Implementations are stateful (they own the version counter) and are
/// created once per load.
pub trait ModuleWalker {
    fn load_module(&mut self, req: &ModuleRequest<'_>) -> Result<ResolvedModule, GraphBuildError>;
}

/// Whether a source address is a local relative path.
pub fn is_local_source(addr: &str) -> bool {
    ["./", "../", ".\\", "..\\"]
        .iter()
        .any(|prefix| addr.starts_with(prefix))
}

/// Walker for local filesystem modules.
#[derive(Debug)]
pub struct LocalModuleWalker {
    root_dir: PathBuf,
    parser: ConfigParser,
    policy: SourcePolicy,
    versions: VersionCounter,
}

impl LocalModuleWalker {
    /// `root_dir` must already be absolute (see [`resolve_root`]).
    pub fn new(root_dir: PathBuf, parser: ConfigParser, policy: SourcePolicy) -> Self {
        Self {
            root_dir,
            parser,
            policy,
            versions: VersionCounter::new(),
        }
    }

    /// Directory implied by a dotted call path.
    pub fn call_path_dir(&self, path: &ModulePath) -> PathBuf {
        path.segments()
            .iter()
            .fold(self.root_dir.clone(), |dir, segment| dir.join(segment))
    }

    /// Versions handed out so far in this load.
    pub fn versions_issued(&self) -> u64 {
        self.versions.issued()
    }

    fn check_source(&self, req: &ModuleRequest<'_>, dir: &Path) -> Result<(), GraphBuildError> {
        let addr = req.call.source.as_str();
        let unsupported = |reason: String| GraphBuildError::UnsupportedModuleSource {
            module: req.path.to_string(),
            addr: addr.to_string(),
            reason,
        };

        if !is_local_source(addr) {
            return Err(unsupported(
                "only local paths starting with ./ or ../ are supported".to_string(),
            ));
        }

        let parent = req.path.parent().unwrap_or_default();
        let declared = clean_path(&self.call_path_dir(&parent).join(addr.replace('\\', "/")));
        let expected = clean_path(dir);
        if !expected.starts_with(&self.root_dir) {
            return Err(unsupported(format!(
                "call path resolves to '{}', outside the root '{}'",
                expected.display(),
                self.root_dir.display()
            )));
        }
        if declared != expected {
            return Err(unsupported(format!(
                "source points at '{}' but the call path resolves to '{}'",
                declared.display(),
                expected.display()
            )));
        }
        Ok(())
    }
}

impl ModuleWalker for LocalModuleWalker {
    fn load_module(&mut self, req: &ModuleRequest<'_>) -> Result<ResolvedModule, GraphBuildError> {
        let dir = self.call_path_dir(&req.path);
        if self.policy == SourcePolicy::Strict {
            self.check_source(req, &dir)?;
        }

        let wrap = |e: LoadError| GraphBuildError::ModuleLoad {
            module: req.path.to_string(),
            dir: dir.clone(),
            source: Box::new(e),
        };
        let canonical = resolve_root(&dir).map_err(wrap)?;
        let (unit, warnings) = self.parser.load_config_dir(&canonical).map_err(wrap)?;

        let version = self.versions.allocate();
        debug!(
            "resolved module {} -> {} (version={})",
            req.path,
            canonical.display(),
            version
        );
        Ok(ResolvedModule {
            unit,
            version,
            warnings,
        })
    }
}
