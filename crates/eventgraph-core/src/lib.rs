//! eventgraph-core: Event-bus usage graph
//!
//! This crate builds a graph linking each event type published or subscribed
//! through an event bus to the call sites that use it:
//! - Entry-point resolution on the bus type
//! - Call-site collection through a [`CodeIndex`]
//! - Event-type extraction from generic type arguments
//! - Graph assembly and merging by event type
//! - Export into a class-keyed JSON report

pub mod assembler;
pub mod bus;
pub mod collector;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod graph;
pub mod index;
pub mod pipeline;
pub mod resolver;
pub mod snapshot;

// Fixture builders - available in test builds and behind the `testing` feature
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use assembler::{build_nodes, merge};
pub use bus::{
    BusDefinition, DEFAULT_BUS_TYPE, DEFAULT_PUBLICATION_MEMBERS, DEFAULT_SUBSCRIPTION_MEMBERS,
    Direction, Role, RoleTable,
};
pub use collector::{CallSite, find_call_sites};
pub use error::{ExportError, IndexError};
pub use exporter::{ExportOptions, ExportSummary, OutputMap, OutputRecord, to_output_record, write};
pub use extractor::{EventType, Extraction, TaggedSite, classify, extract_event_types};
pub use graph::{Connection, EventGraph, GraphNode, GraphStats};
pub use index::{
    CallerInfo, CallingContext, CodeIndex, IndexSummary, LineSpan, Location, ResolvedMethodCall,
    SharedIndex, SymbolId, TypeId,
};
pub use pipeline::{build_graph, export};
pub use resolver::{
    EntryPoints, resolve_entry_points, resolve_publication_entry_points,
    resolve_subscription_entry_points,
};
pub use snapshot::{Snapshot, SnapshotIndex, SnapshotInvocation, SnapshotMember, SnapshotType};
