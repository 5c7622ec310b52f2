//! Unified configuration graph: the root unit plus every module reachable
//! from it, stored as an arena of nodes.
//!
//! Children are discovered depth-first in module call declaration order.
//! Once [`build_config`] returns, the graph is read-only.

use super::error::{GraphBuildError, LoadError};
use super::types::*;
use super::walker::{ModuleRequest, ModuleWalker};
use log::debug;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Index of a node inside its [`ConfigGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One module in the graph.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub path: ModulePath,
    /// Declared source of the call that produced this node (None for root)
    pub source: Option<String>,
    /// Synthetic version issued by the walker (None for root)
    pub version: Option<SyntheticVersion>,
    pub unit: ConfigUnit,
    /// One entry per resolved module call, in declaration order
    pub children: Vec<NodeId>,
}

impl ConfigNode {
    pub fn dir(&self) -> &Path {
        &self.unit.dir
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Tree of configuration units rooted at the root module.
#[derive(Debug, Clone)]
pub struct ConfigGraph {
    nodes: Vec<ConfigNode>,
}

impl ConfigGraph {
    pub fn root(&self) -> &ConfigNode {
        &self.nodes[0]
    }

    /// Node by id. Ids are only minted by this graph, so lookup cannot miss.
    pub fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id.0]
    }

    /// Number of nodes, root included. Never zero.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in discovery (depth-first pre-order) order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigNode> {
        self.nodes.iter()
    }

    /// Node ids in breadth-first order from the root.
    pub fn bfs(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root().id]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.node(id).children.iter().copied());
        }
        order
    }

    /// Module nesting depth of a node (root = 0).
    pub fn depth_of(&self, id: NodeId) -> usize {
        self.node(id).path.depth()
    }

    /// Look a module up by its dotted path.
    pub fn find(&self, path: &ModulePath) -> Option<&ConfigNode> {
        self.nodes.iter().find(|n| &n.path == path)
    }

    /// Managed resources declared across every node.
    pub fn resource_count(&self) -> usize {
        self.nodes.iter().map(|n| n.unit.resources.len()).sum()
    }
}

/// Build the unified graph from a root unit, resolving every module call
/// through `walker`. Any failure aborts the whole build.
///
/// Returns the graph and the warnings produced while loading child units.
pub fn build_config<W: ModuleWalker + ?Sized>(
    root: ConfigUnit,
    walker: &mut W,
    max_depth: usize,
) -> Result<(ConfigGraph, Vec<Diagnostic>), LoadError> {
    let root_dir = root.dir.clone();
    let mut builder = Builder {
        walker,
        max_depth,
        nodes: vec![ConfigNode {
            id: NodeId(0),
            parent: None,
            path: ModulePath::root(),
            source: None,
            version: None,
            unit: root,
            children: Vec::new(),
        }],
        warnings: Vec::new(),
    };

    let mut ancestors = vec![root_dir];
    builder.build_children(NodeId(0), &mut ancestors)?;

    debug!("built config graph (nodes={})", builder.nodes.len());
    Ok((
        ConfigGraph {
            nodes: builder.nodes,
        },
        builder.warnings,
    ))
}

struct Builder<'w, W: ModuleWalker + ?Sized> {
    walker: &'w mut W,
    max_depth: usize,
    nodes: Vec<ConfigNode>,
    warnings: Vec<Diagnostic>,
}

impl<W: ModuleWalker + ?Sized> Builder<'_, W> {
    fn build_children(
        &mut self,
        parent: NodeId,
        ancestors: &mut Vec<PathBuf>,
    ) -> Result<(), GraphBuildError> {
        let (parent_path, calls) = {
            let node = &self.nodes[parent.0];
            (
                node.path.clone(),
                node.unit.module_calls.values().cloned().collect::<Vec<_>>(),
            )
        };

        for call in &calls {
            let path = parent_path.child(&call.name);
            if path.depth() > self.max_depth {
                return Err(GraphBuildError::DepthExceeded {
                    module: path.to_string(),
                    max_depth: self.max_depth,
                });
            }

            let resolved = self.walker.load_module(&ModuleRequest {
                path: path.clone(),
                call,
            })?;

            let dir = resolved.unit.dir.clone();
            if ancestors.contains(&dir) {
                return Err(GraphBuildError::ModuleCycle {
                    module: path.to_string(),
                    dir,
                });
            }

            self.warnings.extend(resolved.warnings);
            let id = NodeId(self.nodes.len());
            self.nodes.push(ConfigNode {
                id,
                parent: Some(parent),
                path,
                source: Some(call.source.clone()),
                version: Some(resolved.version),
                unit: resolved.unit,
                children: Vec::new(),
            });
            self.nodes[parent.0].children.push(id);

            ancestors.push(dir);
            self.build_children(id, ancestors)?;
            ancestors.pop();
        }

        Ok(())
    }
}
