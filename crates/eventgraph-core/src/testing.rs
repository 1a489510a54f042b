//! Fixture builders for hand-made indexes.
//!
//! # Example
//!
//! ```ignore
//! use eventgraph_core::testing::{CallFixture, SnapshotBuilder};
//!
//! let index = SnapshotBuilder::new()
//!     .with_type("Core.Events.EventBus", &["Publish", "Subscribe"])
//!     .with_call(
//!         "Publish",
//!         CallFixture::new("Checkout", "Complete", "Checkout.cs", 10).type_args(&["OrderCreated"]),
//!     )
//!     .build();
//! ```

use crate::index::{
    CallerInfo, CallingContext, LineSpan, Location, ResolvedMethodCall, SymbolId, TypeId,
};
use crate::snapshot::{Snapshot, SnapshotIndex, SnapshotInvocation, SnapshotMember, SnapshotType};

/// Assembly assigned to fixtures unless overridden.
pub const FIXTURE_ASSEMBLY: &str = "Assembly-CSharp";

/// One call to a bus member.
#[derive(Debug, Clone)]
pub struct CallFixture {
    pub context: CallingContext,
    pub location: Location,
    /// `None` means the invocation cannot be re-resolved.
    pub type_arguments: Option<Vec<String>>,
}

impl CallFixture {
    /// A resolvable, non-generic call on `line` of `file`.
    pub fn new(class_name: &str, method_name: &str, file: &str, line: usize) -> Self {
        Self {
            context: CallingContext::new(class_name, method_name, FIXTURE_ASSEMBLY),
            location: Location::in_source(file, LineSpan::line(line)),
            type_arguments: Some(Vec::new()),
        }
    }

    pub fn type_args(mut self, type_arguments: &[&str]) -> Self {
        self.type_arguments = Some(type_arguments.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn unresolved(mut self) -> Self {
        self.type_arguments = None;
        self
    }

    pub fn outside_source(mut self) -> Self {
        self.location.file_path = None;
        self
    }
}

/// Fluent builder for [`SnapshotIndex`] fixtures.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type with the given member names. Repeated names become overloads.
    pub fn with_type(mut self, full_name: &str, members: &[&str]) -> Self {
        let members = members
            .iter()
            .enumerate()
            .map(|(i, name)| SnapshotMember {
                id: SymbolId::new(format!("{full_name}.{name}#{i}")),
                name: name.to_string(),
                callers: Vec::new(),
            })
            .collect();
        self.snapshot.types.push(SnapshotType {
            id: TypeId::new(full_name),
            full_name: full_name.to_string(),
            members,
        });
        self
    }

    /// Record a call to the first member named `member_name`.
    ///
    /// # Panics
    ///
    /// Panics if no registered type has such a member.
    pub fn with_call(self, member_name: &str, call: CallFixture) -> Self {
        self.with_call_to_overload(member_name, 0, call)
    }

    /// Record a call to the `overload`-th member named `member_name`.
    pub fn with_call_to_overload(
        mut self,
        member_name: &str,
        overload: usize,
        call: CallFixture,
    ) -> Self {
        let member = self
            .snapshot
            .types
            .iter_mut()
            .flat_map(|t| t.members.iter_mut())
            .filter(|m| m.name == member_name)
            .nth(overload)
            .unwrap_or_else(|| panic!("fixture has no member {member_name}#{overload}"));

        match member
            .callers
            .iter_mut()
            .find(|c| c.context == call.context)
        {
            Some(existing) => existing.locations.push(call.location.clone()),
            None => member.callers.push(CallerInfo {
                context: call.context.clone(),
                locations: vec![call.location.clone()],
            }),
        }

        if let Some(type_arguments) = call.type_arguments {
            self.snapshot.invocations.push(SnapshotInvocation {
                location: call.location,
                call: ResolvedMethodCall::new(member_name, type_arguments),
            });
        }
        self
    }

    pub fn snapshot(self) -> Snapshot {
        self.snapshot
    }

    pub fn build(self) -> SnapshotIndex {
        SnapshotIndex::new(self.snapshot)
    }
}
