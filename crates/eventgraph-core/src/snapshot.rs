//! Precomputed, serialized code index.
//!
//! A [`Snapshot`] stores exactly the answers the pipeline asks for: the bus
//! type, its members, their callers, and the resolved invocation at every
//! caller location. It can be captured from any live [`CodeIndex`] and
//! replayed later through [`SnapshotIndex`] without the original sources.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::{BusDefinition, Role};
use crate::error::IndexError;
use crate::index::{
    CallerInfo, CodeIndex, IndexSummary, Location, ResolvedMethodCall, SymbolId, TypeId,
};

/// A member recorded in a snapshot, with its callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMember {
    pub id: SymbolId,
    pub name: String,
    #[serde(default)]
    pub callers: Vec<CallerInfo>,
}

/// A type recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotType {
    pub id: TypeId,
    pub full_name: String,
    #[serde(default)]
    pub members: Vec<SnapshotMember>,
}

/// The resolved call at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInvocation {
    pub location: Location,
    pub call: ResolvedMethodCall,
}

/// Serializable index contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Summary of the index the snapshot was captured from.
    #[serde(default)]
    pub source: IndexSummary,
    #[serde(default)]
    pub types: Vec<SnapshotType>,
    #[serde(default)]
    pub invocations: Vec<SnapshotInvocation>,
}

impl Snapshot {
    /// Serialize to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Record everything the pipeline needs about `bus` from a live index.
    ///
    /// Caller lookups that fail are logged and recorded as having no callers.
    pub async fn capture(index: &dyn CodeIndex, bus: &BusDefinition) -> Snapshot {
        let mut snapshot = Snapshot {
            source: index.summary(),
            ..Default::default()
        };

        let Some(bus_type) = index.find_type_by_full_name(&bus.type_name).await else {
            debug!(bus = %bus.type_name, "Bus type not in index, capturing empty snapshot");
            return snapshot;
        };

        let mut members: Vec<SnapshotMember> = Vec::new();
        let mut seen_locations: HashSet<Location> = HashSet::new();

        for role in Role::ALL {
            for name in bus.roles.members(role) {
                for symbol in index.members_by_name(&bus_type, name).await {
                    if members.iter().any(|m| m.id == symbol) {
                        continue;
                    }

                    let callers = match index.find_callers_of(&symbol).await {
                        Ok(callers) => callers,
                        Err(e) => {
                            warn!(symbol = %symbol, error = %e, "Caller lookup failed during capture");
                            Vec::new()
                        }
                    };

                    for location in callers.iter().flat_map(|c| c.locations.iter()) {
                        if !seen_locations.insert(location.clone()) {
                            continue;
                        }
                        if let Some(call) = index.resolve_invocation_at(location).await {
                            snapshot.invocations.push(SnapshotInvocation {
                                location: location.clone(),
                                call,
                            });
                        }
                    }

                    members.push(SnapshotMember {
                        id: symbol,
                        name: name.clone(),
                        callers,
                    });
                }
            }
        }

        snapshot.types.push(SnapshotType {
            id: bus_type,
            full_name: bus.type_name.clone(),
            members,
        });
        snapshot
    }
}

/// A [`CodeIndex`] answering from a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotIndex {
    snapshot: Snapshot,
    /// Full type name -> index into `snapshot.types`
    types: HashMap<String, usize>,
    /// Symbol -> (type index, member index)
    members: HashMap<SymbolId, (usize, usize)>,
    /// Location -> index into `snapshot.invocations`
    invocations: HashMap<Location, usize>,
}

impl SnapshotIndex {
    /// Build lookup tables over a snapshot.
    pub fn new(snapshot: Snapshot) -> Self {
        let mut types = HashMap::new();
        let mut members = HashMap::new();
        for (type_idx, ty) in snapshot.types.iter().enumerate() {
            types.entry(ty.full_name.clone()).or_insert(type_idx);
            for (member_idx, member) in ty.members.iter().enumerate() {
                members
                    .entry(member.id.clone())
                    .or_insert((type_idx, member_idx));
            }
        }

        let invocations = snapshot
            .invocations
            .iter()
            .enumerate()
            .map(|(idx, inv)| (inv.location.clone(), idx))
            .collect();

        Self {
            snapshot,
            types,
            members,
            invocations,
        }
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    /// Load a snapshot file written by [`Snapshot::to_json`].
    pub fn from_file(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path).map_err(|e| IndexError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn member(&self, symbol: &SymbolId) -> Option<&SnapshotMember> {
        let (type_idx, member_idx) = *self.members.get(symbol)?;
        self.snapshot.types.get(type_idx)?.members.get(member_idx)
    }
}

#[async_trait]
impl CodeIndex for SnapshotIndex {
    async fn find_type_by_full_name(&self, full_name: &str) -> Option<TypeId> {
        let idx = *self.types.get(full_name)?;
        self.snapshot.types.get(idx).map(|t| t.id.clone())
    }

    async fn members_by_name(&self, ty: &TypeId, member_name: &str) -> Vec<SymbolId> {
        self.snapshot
            .types
            .iter()
            .filter(|t| &t.id == ty)
            .flat_map(|t| t.members.iter())
            .filter(|m| m.name == member_name)
            .map(|m| m.id.clone())
            .collect()
    }

    async fn find_callers_of(&self, symbol: &SymbolId) -> Result<Vec<CallerInfo>, IndexError> {
        Ok(self
            .member(symbol)
            .map(|m| m.callers.clone())
            .unwrap_or_default())
    }

    async fn resolve_invocation_at(&self, location: &Location) -> Option<ResolvedMethodCall> {
        let idx = *self.invocations.get(location)?;
        self.snapshot.invocations.get(idx).map(|inv| inv.call.clone())
    }

    fn summary(&self) -> IndexSummary {
        IndexSummary {
            backend: "snapshot".to_string(),
            documents: self.snapshot.source.documents,
            types: self.snapshot.types.len(),
        }
    }
}
