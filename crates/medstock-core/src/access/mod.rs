//! Role-based access control.
//!
//! Permissions are a static table from [`Role`] to the actions allowed on
//! each [`Resource`]. Services never consult the table directly: they call
//! [`SessionContext::require`], which goes through [`can`].

mod auth;

pub use auth::*;

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, AccessResult};
use crate::models::Role;

/// Something a permission applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Medications,
    Stock,
    Patients,
    Consultations,
    Prescriptions,
    Reports,
    PredictiveAnalysis,
}

/// What may be done to a resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Edit,
    View,
    Delete,
    Export,
    Dispense,
}

use Action::*;

const CRUD: &[Action] = &[Create, Edit, View, Delete];
const CREATE_EDIT_VIEW: &[Action] = &[Create, Edit, View];
const VIEW: &[Action] = &[View];

const ADMINISTRATOR: &[(Resource, &[Action])] = &[
    (Resource::Users, CRUD),
    (Resource::Medications, CRUD),
    (Resource::Stock, CRUD),
    (Resource::Patients, CRUD),
    (Resource::Consultations, CRUD),
    (Resource::Prescriptions, CRUD),
    (Resource::Reports, &[View, Export]),
    (Resource::PredictiveAnalysis, VIEW),
];

const PHARMACIST: &[(Resource, &[Action])] = &[
    (Resource::Medications, CREATE_EDIT_VIEW),
    (Resource::Stock, CREATE_EDIT_VIEW),
    (Resource::Prescriptions, &[View, Dispense]),
    (Resource::Patients, VIEW),
    (Resource::Reports, VIEW),
    (Resource::PredictiveAnalysis, VIEW),
];

const PHYSICIAN: &[(Resource, &[Action])] = &[
    (Resource::Patients, CREATE_EDIT_VIEW),
    (Resource::Consultations, CREATE_EDIT_VIEW),
    (Resource::Prescriptions, CREATE_EDIT_VIEW),
    (Resource::Medications, VIEW),
    (Resource::Reports, VIEW),
];

const NURSE: &[(Resource, &[Action])] = &[
    (Resource::Patients, &[View, Edit]),
    (Resource::Consultations, VIEW),
    (Resource::Medications, VIEW),
    (Resource::Stock, VIEW),
    (Resource::Prescriptions, VIEW),
];

fn permissions(role: Role) -> &'static [(Resource, &'static [Action])] {
    match role {
        Role::Administrator => ADMINISTRATOR,
        Role::Pharmacist => PHARMACIST,
        Role::Physician => PHYSICIAN,
        Role::Nurse => NURSE,
    }
}

/// Whether `role` may perform `action` on `resource`.
pub fn can(role: Role, resource: Resource, action: Action) -> bool {
    permissions(role)
        .iter()
        .any(|(r, actions)| *r == resource && actions.contains(&action))
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

impl SessionContext {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            full_name: full_name.into(),
            role,
        }
    }

    /// Fail with `PermissionDenied` unless the session's role allows the action.
    pub fn require(&self, resource: Resource, action: Action) -> AccessResult<()> {
        if can(self.role, resource, action) {
            Ok(())
        } else {
            tracing::warn!(
                user = %self.username,
                role = ?self.role,
                ?resource,
                ?action,
                "permission denied"
            );
            Err(AccessError::PermissionDenied {
                role: self.role,
                resource,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_administrator_permissions() {
        assert!(can(Role::Administrator, Resource::Users, Delete));
        assert!(can(Role::Administrator, Resource::Stock, Create));
        assert!(can(Role::Administrator, Resource::Reports, Export));
        assert!(can(Role::Administrator, Resource::PredictiveAnalysis, View));
        assert!(!can(Role::Administrator, Resource::Prescriptions, Dispense));
    }

    #[test]
    fn test_pharmacist_permissions() {
        assert!(can(Role::Pharmacist, Resource::Stock, Edit));
        assert!(can(Role::Pharmacist, Resource::Prescriptions, Dispense));
        assert!(!can(Role::Pharmacist, Resource::Prescriptions, Create));
        assert!(!can(Role::Pharmacist, Resource::Stock, Delete));
        assert!(!can(Role::Pharmacist, Resource::Reports, Export));
        assert!(!can(Role::Pharmacist, Resource::Users, View));
    }

    #[test]
    fn test_physician_permissions() {
        assert!(can(Role::Physician, Resource::Prescriptions, Create));
        assert!(can(Role::Physician, Resource::Consultations, Edit));
        assert!(can(Role::Physician, Resource::Medications, View));
        assert!(!can(Role::Physician, Resource::Stock, View));
        assert!(!can(Role::Physician, Resource::PredictiveAnalysis, View));
    }

    #[test]
    fn test_nurse_permissions() {
        assert!(can(Role::Nurse, Resource::Patients, Edit));
        assert!(!can(Role::Nurse, Resource::Patients, Create));
        assert!(can(Role::Nurse, Resource::Stock, View));
        assert!(!can(Role::Nurse, Resource::Stock, Edit));
    }

    #[test]
    fn test_require() {
        let nurse = SessionContext::new("u1", "joana", "Joana", Role::Nurse);
        assert!(nurse.require(Resource::Stock, View).is_ok());

        let err = nurse.require(Resource::Stock, Edit).unwrap_err();
        assert!(matches!(
            err,
            AccessError::PermissionDenied {
                role: Role::Nurse,
                resource: Resource::Stock,
                action: Action::Edit,
            }
        ));
    }
}
