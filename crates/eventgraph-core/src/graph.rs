//! Event-type graph: nodes keyed by event-type name, each holding the
//! connections (call sites) that publish or subscribe to it.
//!
//! Event types are identified by name only. Two same-named types from
//! different namespaces share one node.

use serde::{Deserialize, Serialize};

use crate::bus::Direction;
use crate::extractor::TaggedSite;

/// The per-call-site facet attached to a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    pub class_name: String,
    pub method_name: String,
    pub file_path: String,
    /// Rendered line span (`10`, `10-12`).
    pub line_span: String,
    pub assembly_name: String,
    pub direction: Direction,
}

impl Connection {
    pub fn from_tagged(tagged: &TaggedSite) -> Self {
        let site = &tagged.site;
        Self {
            class_name: site.class_name.clone(),
            method_name: site.method_name.clone(),
            file_path: site.file_path.clone(),
            line_span: site.span.to_string(),
            assembly_name: site.assembly_name.clone(),
            direction: site.direction,
        }
    }
}

/// All connections for one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphNode {
    pub event_type: String,
    pub connections: Vec<Connection>,
}

impl GraphNode {
    pub fn new(event_type: impl Into<String>, connections: Vec<Connection>) -> Self {
        Self {
            event_type: event_type.into(),
            connections,
        }
    }

    /// Connections that publish this event.
    pub fn publishers(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(|c| c.direction == Direction::Outgoing)
    }

    /// Connections that subscribe to this event.
    pub fn subscribers(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(|c| c.direction == Direction::Incoming)
    }
}

/// Counts over a built graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub connections: usize,
    pub outgoing: usize,
    pub incoming: usize,
}

/// The merged graph produced by a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventGraph {
    pub nodes: Vec<GraphNode>,
}

impl EventGraph {
    pub fn new(nodes: Vec<GraphNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look a node up by event-type name.
    pub fn node(&self, event_type: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.event_type == event_type)
    }

    /// Event types with publishers but no subscribers.
    pub fn unheard(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|n| n.subscribers().next().is_none())
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            nodes: self.nodes.len(),
            ..Default::default()
        };
        for connection in self.nodes.iter().flat_map(|n| n.connections.iter()) {
            stats.connections += 1;
            match connection.direction {
                Direction::Outgoing => stats.outgoing += 1,
                Direction::Incoming => stats.incoming += 1,
            }
        }
        stats
    }
}
