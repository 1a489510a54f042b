//! Event-bus description: which type is the bus and which of its members
//! publish or subscribe.
//!
//! The member-name lists are data, not behavior. They deserialize from the
//! `[bus.roles]` config table so other bus layouts can be analyzed without
//! code changes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fully qualified name of the bus type looked up by default.
pub const DEFAULT_BUS_TYPE: &str = "Core.Events.EventBus";

/// Members treated as publish operations by default.
pub const DEFAULT_PUBLICATION_MEMBERS: &[&str] = &["Publish", "PublishExclusive"];

/// Members treated as subscribe operations by default.
pub const DEFAULT_SUBSCRIPTION_MEMBERS: &[&str] = &[
    "Subscribe",
    "SubscribeOnce",
    "SubscribeUntilTrue",
    "SetSubscribed",
];

/// Whether a connection emits or consumes its event.
///
/// Serialized by variant name (`"Outgoing"`, `"Incoming"`), never numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// The call site publishes the event.
    Outgoing,
    /// The call site subscribes to the event.
    Incoming,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "Outgoing",
            Direction::Incoming => "Incoming",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part a bus member plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Publication,
    Subscription,
}

impl Role {
    /// Both roles, publications first.
    pub const ALL: [Role; 2] = [Role::Publication, Role::Subscription];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publication => "publication",
            Role::Subscription => "subscription",
        }
    }

    /// Direction of every connection produced by a member in this role.
    pub fn direction(&self) -> Direction {
        match self {
            Role::Publication => Direction::Outgoing,
            Role::Subscription => Direction::Incoming,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Member names per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTable {
    pub publication: Vec<String>,
    pub subscription: Vec<String>,
}

impl RoleTable {
    /// Member names registered for `role`.
    pub fn members(&self, role: Role) -> &[String] {
        match role {
            Role::Publication => &self.publication,
            Role::Subscription => &self.subscription,
        }
    }

    /// Names listed under both roles.
    pub fn overlapping(&self) -> Vec<&str> {
        self.publication
            .iter()
            .filter(|name| self.subscription.contains(name))
            .map(String::as_str)
            .collect()
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self {
            publication: DEFAULT_PUBLICATION_MEMBERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            subscription: DEFAULT_SUBSCRIPTION_MEMBERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// The bus type to look for and its role table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusDefinition {
    /// Fully qualified type name, e.g. `Core.Events.EventBus`.
    pub type_name: String,
    pub roles: RoleTable,
}

impl BusDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            roles: RoleTable::default(),
        }
    }

    /// Replace the member list for one role.
    pub fn with_members(mut self, role: Role, members: &[&str]) -> Self {
        let members = members.iter().map(|s| s.to_string()).collect();
        match role {
            Role::Publication => self.roles.publication = members,
            Role::Subscription => self.roles.subscription = members,
        }
        self
    }

    /// Simple (unqualified) name of the bus type.
    pub fn simple_name(&self) -> &str {
        self.type_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.type_name)
    }

    /// Namespace part of the bus type name, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.type_name.rsplit_once('.').map(|(ns, _)| ns)
    }
}

impl Default for BusDefinition {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_table() {
        let bus = BusDefinition::default();
        assert_eq!(bus.type_name, "Core.Events.EventBus");
        assert_eq!(
            bus.roles.members(Role::Publication),
            ["Publish", "PublishExclusive"]
        );
        assert_eq!(bus.roles.members(Role::Subscription).len(), 4);
        assert!(bus.roles.overlapping().is_empty());
    }

    #[test]
    fn test_role_direction() {
        assert_eq!(Role::Publication.direction(), Direction::Outgoing);
        assert_eq!(Role::Subscription.direction(), Direction::Incoming);
    }

    #[test]
    fn test_direction_serializes_as_text() {
        let json = serde_json::to_string(&Direction::Incoming).expect("serialize");
        assert_eq!(json, "\"Incoming\"");
        let back: Direction = serde_json::from_str("\"Outgoing\"").expect("deserialize");
        assert_eq!(back, Direction::Outgoing);
    }

    #[test]
    fn test_bus_name_parts() {
        let bus = BusDefinition::new("Core.Events.EventBus");
        assert_eq!(bus.simple_name(), "EventBus");
        assert_eq!(bus.namespace(), Some("Core.Events"));

        let global = BusDefinition::new("Bus");
        assert_eq!(global.simple_name(), "Bus");
        assert_eq!(global.namespace(), None);
    }

    #[test]
    fn test_with_members_replaces_role() {
        let bus = BusDefinition::default().with_members(Role::Subscription, &["Listen"]);
        assert_eq!(bus.roles.members(Role::Subscription), ["Listen"]);
        assert_eq!(bus.roles.members(Role::Publication).len(), 2);
    }

    #[test]
    fn test_partial_role_table_keeps_defaults() {
        let bus: BusDefinition =
            serde_json::from_str(r#"{"roles": {"publication": ["Emit"]}}"#).expect("deserialize");
        assert_eq!(bus.type_name, DEFAULT_BUS_TYPE);
        assert_eq!(bus.roles.members(Role::Publication), ["Emit"]);
        assert_eq!(bus.roles.members(Role::Subscription).len(), 4);
    }
}
