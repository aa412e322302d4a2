//! Role levels and the static (resource, action) permission table
//!
//! The table is built once at startup and only read afterwards. Lookup is a
//! linear scan; the table is small and fixed. Pairs missing from the table
//! are denied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role levels. Higher is more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i32)]
pub enum Role {
    Default = 1,
    Premium = 2,
    Delux = 3,
    Staff = 6,
    Developer = 8,
    Manager = 9,
    Admin = 10,
}

impl Role {
    /// Numeric role level as stored on the user record
    pub fn level(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Default => write!(f, "DEFAULT"),
            Role::Premium => write!(f, "PREMIUM"),
            Role::Delux => write!(f, "DELUX"),
            Role::Staff => write!(f, "STAFF"),
            Role::Developer => write!(f, "DEVELOPER"),
            Role::Manager => write!(f, "MANAGER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Protected resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Users => write!(f, "users"),
        }
    }
}

/// Actions on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// List every instance
    ReadAll,
    /// Read one instance by id
    Read,
    /// Overwrite fields of any instance
    UpdateAll,
    /// Delete an instance
    Delete,
    /// Read the caller's own instance
    ReadOwn,
    /// Update the caller's own instance
    UpdateOwn,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ReadAll => write!(f, "READ_ALL"),
            Action::Read => write!(f, "READ"),
            Action::UpdateAll => write!(f, "UPDATE_ALL"),
            Action::Delete => write!(f, "DELETE"),
            Action::ReadOwn => write!(f, "READ_OWN"),
            Action::UpdateOwn => write!(f, "UPDATE_OWN"),
        }
    }
}

/// One immutable table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionEntry {
    pub resource: Resource,
    pub action: Action,
    pub min_role: Role,
}

/// Static permission table
#[derive(Debug, Clone)]
pub struct PermissionTable {
    entries: Vec<PermissionEntry>,
}

impl PermissionTable {
    /// Build a table from explicit entries
    pub fn new(entries: Vec<PermissionEntry>) -> Self {
        Self { entries }
    }

    /// The table the service runs with
    pub fn standard() -> Self {
        let entry = |resource, action, min_role| PermissionEntry {
            resource,
            action,
            min_role,
        };

        Self::new(vec![
            entry(Resource::Users, Action::ReadAll, Role::Admin),
            entry(Resource::Users, Action::Read, Role::Developer),
            entry(Resource::Users, Action::UpdateAll, Role::Developer),
            entry(Resource::Users, Action::Delete, Role::Admin),
            entry(Resource::Users, Action::ReadOwn, Role::Default),
            entry(Resource::Users, Action::UpdateOwn, Role::Default),
        ])
    }

    /// Minimum role for a (resource, action) pair.
    /// Returns None when the pair is not in the table (which must be denied).
    pub fn required_role(&self, resource: Resource, action: Action) -> Option<Role> {
        self.entries
            .iter()
            .find(|e| e.resource == resource && e.action == action)
            .map(|e| e.min_role)
    }

    /// Check a stored role level against the table
    pub fn is_allowed(&self, role_level: i32, resource: Resource, action: Action) -> bool {
        match self.required_role(resource, action) {
            Some(required) => role_level >= required.level(),
            None => false,
        }
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Developer);
        assert!(Role::Developer > Role::Staff);
        assert!(Role::Staff > Role::Delux);
        assert!(Role::Delux > Role::Premium);
        assert!(Role::Premium > Role::Default);
        assert_eq!(Role::Admin.level(), 10);
        assert_eq!(Role::Default.level(), 1);
    }

    #[test]
    fn test_standard_table() {
        let table = PermissionTable::standard();

        assert_eq!(
            table.required_role(Resource::Users, Action::ReadAll),
            Some(Role::Admin)
        );
        assert_eq!(
            table.required_role(Resource::Users, Action::Read),
            Some(Role::Developer)
        );
        assert_eq!(
            table.required_role(Resource::Users, Action::UpdateAll),
            Some(Role::Developer)
        );
        assert_eq!(
            table.required_role(Resource::Users, Action::Delete),
            Some(Role::Admin)
        );
        assert_eq!(
            table.required_role(Resource::Users, Action::ReadOwn),
            Some(Role::Default)
        );
    }

    #[test]
    fn test_missing_entry_is_denied() {
        let table = PermissionTable::new(vec![PermissionEntry {
            resource: Resource::Users,
            action: Action::Read,
            min_role: Role::Default,
        }]);

        assert_eq!(table.required_role(Resource::Users, Action::Delete), None);
        assert!(!table.is_allowed(i32::MAX, Resource::Users, Action::Delete));
        assert!(table.is_allowed(1, Resource::Users, Action::Read));
    }

    #[test]
    fn test_is_allowed_thresholds() {
        let table = PermissionTable::standard();

        assert!(!table.is_allowed(1, Resource::Users, Action::ReadAll));
        assert!(!table.is_allowed(9, Resource::Users, Action::ReadAll));
        assert!(table.is_allowed(10, Resource::Users, Action::ReadAll));

        assert!(!table.is_allowed(6, Resource::Users, Action::Read));
        assert!(table.is_allowed(8, Resource::Users, Action::Read));

        assert!(table.is_allowed(1, Resource::Users, Action::UpdateOwn));
        assert!(!table.is_allowed(0, Resource::Users, Action::UpdateOwn));
    }

    #[test]
    fn test_display() {
        assert_eq!(Role::Developer.to_string(), "DEVELOPER");
        assert_eq!(Resource::Users.to_string(), "users");
        assert_eq!(Action::UpdateAll.to_string(), "UPDATE_ALL");
    }
}
