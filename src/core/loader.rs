//! End-to-end directory load: resolve the root, load its unit, build the
//! module graph, collect resources.

use super::collector::collect_resources;
use super::convert::{JsonConverter, ResourceConverter};
use super::error::LoadError;
use super::graph::{build_config, ConfigGraph};
use super::options::LoadOptions;
use super::parser::ConfigParser;
use super::path::{display_relative, resolve_root};
use super::types::{Diagnostic, OutputResourceConfig};
use super::walker::LocalModuleWalker;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A built graph plus what was learned while building it.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub graph: ConfigGraph,
    pub warnings: Vec<Diagnostic>,
    pub versions_issued: u64,
}

/// One module row for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    /// Dotted module path; empty for the root
    pub path: String,
    /// Directory relative to the root (`.` for the root)
    pub dir: String,
    pub source: Option<String>,
    pub version: Option<String>,
    pub depth: usize,
    pub resources: usize,
}

/// Resources, modules and warnings of one load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub root_dir: PathBuf,
    pub resources: Vec<OutputResourceConfig>,
    /// Modules in breadth-first order
    pub modules: Vec<ModuleSummary>,
    pub warnings: Vec<Diagnostic>,
}

/// Loads root directories with fixed options and converter.
pub struct Loader {
    options: LoadOptions,
    converter: Box<dyn ResourceConverter>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}

impl Loader {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            converter: Box::new(JsonConverter),
        }
    }

    /// Replace the resource conversion routine.
    pub fn with_converter(mut self, converter: impl ResourceConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Resolve `dir`, load it and every module it reaches.
    pub fn load_graph(&self, dir: &Path) -> Result<LoadedGraph, LoadError> {
        let root_dir = resolve_root(dir)?;
        let parser = ConfigParser::from_options(&self.options);

        let (root_unit, mut warnings) = parser.load_config_dir(&root_dir)?;

        let mut walker =
            LocalModuleWalker::new(root_dir.clone(), parser, self.options.source_policy);
        let (graph, child_warnings) = build_config(root_unit, &mut walker, self.options.max_depth)?;
        warnings.extend(child_warnings);

        for w in &warnings {
            warn!("{}", w);
        }
        info!(
            "built unified config for {} (modules={}, resources={}, policy={})",
            root_dir.display(),
            graph.len(),
            graph.resource_count(),
            self.options.source_policy
        );

        Ok(LoadedGraph {
            graph,
            warnings,
            versions_issued: walker.versions_issued(),
        })
    }

    /// Load `dir` into the flat resource list.
    pub fn load(&self, dir: &Path) -> Result<Vec<OutputResourceConfig>, LoadError> {
        let loaded = self.load_graph(dir)?;
        collect_resources(&loaded.graph, self.converter.as_ref())
    }

    /// Load `dir` and summarize modules alongside the resource list.
    pub fn load_report(&self, dir: &Path) -> Result<LoadReport, LoadError> {
        let loaded = self.load_graph(dir)?;
        let resources = collect_resources(&loaded.graph, self.converter.as_ref())?;
        let graph = &loaded.graph;
        let root_dir = graph.root().dir().to_path_buf();

        let modules = graph
            .bfs()
            .into_iter()
            .map(|id| {
                let node = graph.node(id);
                let dir = if node.is_root() {
                    ".".to_string()
                } else {
                    display_relative(node.dir(), &root_dir)
                };
                ModuleSummary {
                    path: node.path.to_string(),
                    dir,
                    source: node.source.clone(),
                    version: node.version.map(|v| v.to_string()),
                    depth: graph.depth_of(id),
                    resources: node.unit.resources.len(),
                }
            })
            .collect();

        Ok(LoadReport {
            root_dir,
            resources,
            modules,
            warnings: loaded.warnings,
        })
    }
}

/// Load a root directory with the default converter.
pub fn load_iac_dir(
    dir: &Path,
    options: &LoadOptions,
) -> Result<Vec<OutputResourceConfig>, LoadError> {
    Loader::new(options.clone()).load(dir)
}
