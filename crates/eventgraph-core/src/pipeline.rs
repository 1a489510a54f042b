//! Pipeline entry operations: build the graph from an index, export it.
//!
//! Stages run strictly in sequence (resolve, collect, extract, assemble),
//! once for publications and once for subscriptions, followed by a single
//! merge. Each stage consumes its input and produces a fresh collection.

use std::path::Path;

use tracing::{info, warn};

use crate::assembler::{build_nodes, merge};
use crate::bus::{BusDefinition, Role};
use crate::collector::find_call_sites;
use crate::error::ExportError;
use crate::exporter::{self, ExportOptions, ExportSummary, to_output_record};
use crate::extractor::extract_event_types;
use crate::graph::{EventGraph, GraphNode};
use crate::index::CodeIndex;
use crate::resolver::resolve_entry_points;

/// Build the merged event graph for `bus` over `index`.
///
/// Never fails: every per-item problem is logged and skipped. A codebase
/// without the bus type produces an empty graph.
pub async fn build_graph(index: &dyn CodeIndex, bus: &BusDefinition) -> EventGraph {
    let mut batches: Vec<Vec<GraphNode>> = Vec::with_capacity(Role::ALL.len());
    let mut bus_found = false;

    for role in Role::ALL {
        let entry_points = resolve_entry_points(index, bus, role).await;
        bus_found |= entry_points.bus_type.is_some();

        let sites = find_call_sites(index, &entry_points).await;
        let tagged = extract_event_types(index, sites).await;
        info!(role = %role, connections = tagged.len(), "Built nodes");
        batches.push(build_nodes(tagged));
    }

    if !bus_found {
        warn!(
            bus = %bus.type_name,
            "Could not find {} in the index. This codebase does not use the expected event-bus type",
            bus.type_name
        );
    }

    let graph = EventGraph::new(merge(batches));
    let stats = graph.stats();
    info!(
        nodes = stats.nodes,
        connections = stats.connections,
        outgoing = stats.outgoing,
        incoming = stats.incoming,
        "Graph assembled"
    );
    graph
}

/// Re-key `nodes` by class name and write the report to `destination`.
pub fn export(
    nodes: &[GraphNode],
    destination: &Path,
    options: ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let record = to_output_record(nodes);
    exporter::write(&record, destination, options)
}
