//! Graph assembly: one node per tagged call site, then a merge by event type.
//!
//! Publications and subscriptions are produced by independent passes; the
//! merge unions them without either pass knowing about the other.

use indexmap::IndexMap;

use crate::extractor::TaggedSite;
use crate::graph::{Connection, GraphNode};

/// Turn each tagged call site into a single-connection node.
///
/// The connection direction is the direction carried by the call site.
pub fn build_nodes(tagged: Vec<TaggedSite>) -> Vec<GraphNode> {
    tagged
        .iter()
        .map(|t| GraphNode::new(t.event_type.as_str(), vec![Connection::from_tagged(t)]))
        .collect()
}

/// Concatenate node batches and group them by event type.
///
/// Nodes come out in first-encounter order of their key; each node's
/// connections are the concatenation of the grouped nodes' connections in
/// encounter order.
pub fn merge<I>(batches: I) -> Vec<GraphNode>
where
    I: IntoIterator<Item = Vec<GraphNode>>,
{
    let mut grouped: IndexMap<String, GraphNode> = IndexMap::new();

    for node in batches.into_iter().flatten() {
        match grouped.get_mut(&node.event_type) {
            Some(existing) => existing.connections.extend(node.connections),
            None => {
                grouped.insert(node.event_type.clone(), node);
            }
        }
    }

    grouped.into_values().collect()
}
