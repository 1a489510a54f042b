//! Entry-point resolution: find the bus members that publish or subscribe.

use tracing::debug;

use crate::bus::{BusDefinition, Role};
use crate::index::{CodeIndex, SymbolId, TypeId};

/// Symbols resolved for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoints {
    pub role: Role,
    /// The bus type, or `None` if the index does not contain it.
    pub bus_type: Option<TypeId>,
    /// Distinct member symbols, in role-table order then declaration order.
    pub symbols: Vec<SymbolId>,
}

impl EntryPoints {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Resolve every member of the bus type listed under `role`.
///
/// A missing bus type is a legitimate outcome for codebases that do not use
/// the bus; the result is then empty and `bus_type` is `None`.
pub async fn resolve_entry_points(
    index: &dyn CodeIndex,
    bus: &BusDefinition,
    role: Role,
) -> EntryPoints {
    let Some(bus_type) = index.find_type_by_full_name(&bus.type_name).await else {
        return EntryPoints {
            role,
            bus_type: None,
            symbols: Vec::new(),
        };
    };

    let mut symbols: Vec<SymbolId> = Vec::new();
    for member in bus.roles.members(role) {
        for symbol in index.members_by_name(&bus_type, member).await {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }

    debug!(role = %role, count = symbols.len(), "Resolved entry points");

    EntryPoints {
        role,
        bus_type: Some(bus_type),
        symbols,
    }
}

/// Publish-side members (`Publish`, `PublishExclusive` by default).
pub async fn resolve_publication_entry_points(
    index: &dyn CodeIndex,
    bus: &BusDefinition,
) -> EntryPoints {
    resolve_entry_points(index, bus, Role::Publication).await
}

/// Subscribe-side members (`Subscribe`, `SubscribeOnce`, ... by default).
pub async fn resolve_subscription_entry_points(
    index: &dyn CodeIndex,
    bus: &BusDefinition,
) -> EntryPoints {
    resolve_entry_points(index, bus, Role::Subscription).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SnapshotBuilder;

    #[tokio::test]
    async fn test_missing_bus_type_yields_empty_sets() {
        let index = SnapshotBuilder::new()
            .with_type("Other.Bus", &["Publish"])
            .build();
        let bus = BusDefinition::default();

        let publications = resolve_publication_entry_points(&index, &bus).await;
        let subscriptions = resolve_subscription_entry_points(&index, &bus).await;

        assert!(publications.is_empty());
        assert!(publications.bus_type.is_none());
        assert!(subscriptions.is_empty());
        assert!(subscriptions.bus_type.is_none());
    }

    #[tokio::test]
    async fn test_resolves_members_per_role() {
        let index = SnapshotBuilder::new()
            .with_type(
                "Core.Events.EventBus",
                &["Publish", "Publish", "Subscribe", "SetSubscribed", "Dispose"],
            )
            .build();
        let bus = BusDefinition::default();

        let publications = resolve_publication_entry_points(&index, &bus).await;
        assert_eq!(publications.role, Role::Publication);
        assert_eq!(publications.symbols.len(), 2, "both Publish overloads");

        let subscriptions = resolve_subscription_entry_points(&index, &bus).await;
        assert_eq!(subscriptions.symbols.len(), 2);
        assert!(
            subscriptions
                .symbols
                .iter()
                .all(|s| !s.as_str().contains("Dispose"))
        );
    }

    #[tokio::test]
    async fn test_custom_role_table() {
        let index = SnapshotBuilder::new()
            .with_type("Game.Signals", &["Emit", "Listen"])
            .build();
        let bus = BusDefinition::new("Game.Signals")
            .with_members(Role::Publication, &["Emit"])
            .with_members(Role::Subscription, &["Listen", "Missing"]);

        let publications = resolve_publication_entry_points(&index, &bus).await;
        let subscriptions = resolve_subscription_entry_points(&index, &bus).await;
        assert_eq!(publications.symbols.len(), 1);
        assert_eq!(subscriptions.symbols.len(), 1);
    }
}
