//! The employee record.
//!
//! `EmployeeFields` is the attribute set without identity: it is what clients
//! send on create/update and what backends persist. `Employee<I>` attaches the
//! backend-assigned identifier.
//!
//! Every attribute is optional. On the wire an absent key means "not
//! supplied" and is kept distinct from an explicit empty string, so partial
//! updates never clobber stored data with empty values.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Attribute names, in storage column order.
pub const FIELD_NAMES: [&str; 4] = ["name", "department", "level", "description"];

/// Employee attributes (no identity).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EmployeeFields {
    /// True when no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, v)| v.is_none())
    }

    /// Attributes as `(name, value)` pairs, in [`FIELD_NAMES`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        [
            self.name.as_deref(),
            self.department.as_deref(),
            self.level.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .zip(FIELD_NAMES)
        .map(|(value, name)| (name, value))
    }

    /// Only the attributes that are present.
    pub fn present(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.iter().filter_map(|(name, value)| value.map(|v| (name, v)))
    }

    /// Set an attribute by name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let slot = match name {
            "name" => &mut self.name,
            "department" => &mut self.department,
            "level" => &mut self.level,
            "description" => &mut self.description,
            _ => return,
        };
        *slot = Some(value.into());
    }

    /// Overwrite every attribute present in `patch`; absent ones are kept.
    ///
    /// Returns whether any stored value actually changed.
    pub fn apply(&mut self, patch: EmployeeFields) -> bool {
        fn merge(slot: &mut Option<String>, incoming: Option<String>) -> bool {
            match incoming {
                Some(v) if slot.as_deref() != Some(v.as_str()) => {
                    *slot = Some(v);
                    true
                }
                _ => false,
            }
        }

        let mut changed = merge(&mut self.name, patch.name);
        changed |= merge(&mut self.department, patch.department);
        changed |= merge(&mut self.level, patch.level);
        changed |= merge(&mut self.description, patch.description);
        changed
    }

    /// Reject values no backend can store.
    ///
    /// Creation is otherwise permissive: any subset of attributes is accepted.
    pub fn validate(&self) -> DomainResult<()> {
        for (name, value) in self.present() {
            if value.contains('\0') {
                return Err(DomainError::validation(format!(
                    "{name} must not contain NUL characters"
                )));
            }
        }
        Ok(())
    }
}

/// An employee with its backend-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee<I> {
    pub id: I,
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

impl<I> Employee<I> {
    pub fn new(id: I, fields: EmployeeFields) -> Self {
        Self { id, fields }
    }
}
