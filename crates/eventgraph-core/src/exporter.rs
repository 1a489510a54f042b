//! Report export: re-key the event-type graph by class name and write JSON.
//!
//! The written file is a JSON object whose keys are class names and whose
//! values are arrays of `{EventType, MethodName, FilePath, LineSpan,
//! AssemblyName, Direction}` records. Writing overwrites the destination
//! without any atomic-rename guarantee; the report is regenerated on demand.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bus::Direction;
use crate::error::ExportError;
use crate::graph::GraphNode;

/// One flattened connection in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputRecord {
    pub event_type: String,
    pub method_name: String,
    pub file_path: String,
    pub line_span: String,
    pub assembly_name: String,
    pub direction: Direction,
}

/// Class name -> records, in first-discovery order.
pub type OutputMap = IndexMap<String, Vec<OutputRecord>>;

/// Options for writing the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Indent the JSON output.
    pub pretty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub classes: usize,
    pub records: usize,
    pub bytes: usize,
}

/// Re-key graph nodes by the class name of each connection.
pub fn to_output_record(nodes: &[GraphNode]) -> OutputMap {
    let mut output = OutputMap::new();
    for node in nodes {
        for connection in &node.connections {
            output
                .entry(connection.class_name.clone())
                .or_default()
                .push(OutputRecord {
                    event_type: node.event_type.clone(),
                    method_name: connection.method_name.clone(),
                    file_path: connection.file_path.clone(),
                    line_span: connection.line_span.clone(),
                    assembly_name: connection.assembly_name.clone(),
                    direction: connection.direction,
                });
        }
    }
    output
}

/// Serialize a report to JSON bytes.
pub fn to_json_bytes(record: &OutputMap, options: ExportOptions) -> Result<Vec<u8>, ExportError> {
    let bytes = if options.pretty {
        serde_json::to_vec_pretty(record)?
    } else {
        serde_json::to_vec(record)?
    };
    Ok(bytes)
}

/// Serialize `record` and overwrite `destination` with it.
///
/// Missing parent directories are created.
pub fn write(
    record: &OutputMap,
    destination: &Path,
    options: ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let bytes = to_json_bytes(record, options)?;

    let write_err = |source| ExportError::Write {
        path: destination.to_path_buf(),
        source,
    };
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    std::fs::write(destination, &bytes).map_err(write_err)?;

    let summary = ExportSummary {
        path: destination.to_path_buf(),
        classes: record.len(),
        records: record.values().map(Vec::len).sum(),
        bytes: bytes.len(),
    };
    debug!(
        path = %destination.display(),
        classes = summary.classes,
        records = summary.records,
        "Wrote report"
    );
    Ok(summary)
}
