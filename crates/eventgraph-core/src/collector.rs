//! Call-site collection for resolved entry points.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::Direction;
use crate::index::{CodeIndex, LineSpan, Location};
use crate::resolver::EntryPoints;

/// One source location that invokes a bus entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// Simple name of the containing type.
    pub class_name: String,
    /// Name of the containing member.
    pub method_name: String,
    pub file_path: String,
    pub span: LineSpan,
    pub assembly_name: String,
    /// `Outgoing` for publications, `Incoming` for subscriptions.
    pub direction: Direction,
}

impl CallSite {
    /// The index location this site was collected from.
    pub fn location(&self) -> Location {
        Location::in_source(self.file_path.clone(), self.span)
    }
}

/// Collect every call site invoking any symbol in `entry_points`.
///
/// Lookups run concurrently; the result keeps symbol order, then discovery
/// order within each symbol. No deduplication happens here. Locations with
/// no source document are skipped, and a failed lookup only drops that
/// symbol's sites.
pub async fn find_call_sites(index: &dyn CodeIndex, entry_points: &EntryPoints) -> Vec<CallSite> {
    let direction = entry_points.role.direction();

    // join_all yields results in input order regardless of completion order
    let lookups = entry_points
        .symbols
        .iter()
        .map(|symbol| async move { (symbol, index.find_callers_of(symbol).await) });
    let results = join_all(lookups).await;

    let mut sites = Vec::new();
    for (symbol, result) in results {
        let callers = match result {
            Ok(callers) => callers,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Failed to find callers, skipping symbol");
                continue;
            }
        };

        for caller in callers {
            for location in caller.locations {
                let Some(file_path) = location.file_path else {
                    debug!(
                        symbol = %symbol,
                        class = %caller.context.class_name,
                        "Location not attributable to source, skipping"
                    );
                    continue;
                };

                sites.push(CallSite {
                    class_name: caller.context.class_name.clone(),
                    method_name: caller.context.method_name.clone(),
                    file_path,
                    span: location.span,
                    assembly_name: caller.context.assembly_name.clone(),
                    direction,
                });
            }
        }
    }

    debug!(
        role = %entry_points.role,
        symbols = entry_points.symbols.len(),
        sites = sites.len(),
        "Collected call sites"
    );
    sites
}
