//! Flatten a configuration graph into the exported resource list.
//!
//! Breadth-first from the root with a FIFO queue: every managed resource
//! of a node (declaration order) is converted, then the node's children are
//! queued. The first conversion failure discards everything collected so far.

use super::convert::{ConvertContext, ResourceConverter};
use super::error::LoadError;
use super::graph::ConfigGraph;
use super::types::OutputResourceConfig;
use log::debug;
use std::collections::VecDeque;

/// Convert every managed resource in `graph`, level by level.
pub fn collect_resources<C: ResourceConverter + ?Sized>(
    graph: &ConfigGraph,
    converter: &C,
) -> Result<Vec<OutputResourceConfig>, LoadError> {
    let root_dir = graph.root().dir();
    let mut all = Vec::with_capacity(graph.resource_count());
    let mut queue = VecDeque::from([graph.root().id]);

    while let Some(id) = queue.pop_front() {
        let node = graph.node(id);
        let ctx = ConvertContext {
            root_dir,
            module_path: &node.path,
        };

        for resource in node.unit.resources.values() {
            let config = converter
                .convert(resource, &ctx)
                .map_err(|e| LoadError::Conversion {
                    id: resource.address(),
                    module: node.path.to_string(),
                    source: e,
                })?;
            all.push(config);
        }

        queue.extend(node.children.iter().copied());
    }

    debug!(
        "collected resources (nodes={}, resources={})",
        graph.len(),
        all.len()
    );
    Ok(all)
}
