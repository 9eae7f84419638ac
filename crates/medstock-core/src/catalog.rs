//! Medication catalog service.

use crate::access::{Action, Resource, SessionContext};
use crate::db::Database;
use crate::error::{InventoryError, InventoryResult};
use crate::models::{CatalogStats, Medication};

/// Default cap on search results.
pub const SEARCH_LIMIT: usize = 50;

/// Formulary management.
pub struct MedicationCatalog<'a> {
    db: &'a Database,
}

impl<'a> MedicationCatalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a medication. The caller is recorded as `registered_by`.
    pub fn create(&self, ctx: &SessionContext, mut medication: Medication) -> InventoryResult<Medication> {
        ctx.require(Resource::Medications, Action::Create)?;
        medication.name = medication.name.trim().to_string();
        if medication.name.is_empty() {
            return Err(InventoryError::validation("name", "is required"));
        }
        medication.active = true;
        medication.registered_by = Some(ctx.username.clone());

        self.db.insert_medication(&medication)?;
        tracing::info!(by = %ctx.username, id = %medication.id, name = %medication.name, "medication registered");
        Ok(medication)
    }

    /// Overwrite the editable attributes of an existing medication.
    pub fn update(&self, ctx: &SessionContext, medication: &Medication) -> InventoryResult<()> {
        ctx.require(Resource::Medications, Action::Edit)?;
        if medication.name.trim().is_empty() {
            return Err(InventoryError::validation("name", "is required"));
        }
        if !self.db.update_medication(medication)? {
            return Err(InventoryError::NotFound(format!("medication {}", medication.id)));
        }
        tracing::info!(by = %ctx.username, id = %medication.id, "medication updated");
        Ok(())
    }

    /// Soft-delete a medication. Its lots and history stay in place.
    pub fn deactivate(&self, ctx: &SessionContext, id: &str) -> InventoryResult<()> {
        ctx.require(Resource::Medications, Action::Delete)?;
        if !self.db.deactivate_medication(id)? {
            return Err(InventoryError::NotFound(format!("medication {}", id)));
        }
        tracing::info!(by = %ctx.username, %id, "medication deactivated");
        Ok(())
    }

    pub fn get(&self, ctx: &SessionContext, id: &str) -> InventoryResult<Medication> {
        ctx.require(Resource::Medications, Action::View)?;
        self.db
            .get_medication(id)?
            .ok_or_else(|| InventoryError::NotFound(format!("medication {}", id)))
    }

    /// Active medications ordered by name.
    pub fn list(&self, ctx: &SessionContext) -> InventoryResult<Vec<Medication>> {
        ctx.require(Resource::Medications, Action::View)?;
        Ok(self.db.list_medications(true)?)
    }

    /// Active medications whose name or active ingredient contains `query`.
    pub fn search(&self, ctx: &SessionContext, query: &str) -> InventoryResult<Vec<Medication>> {
        ctx.require(Resource::Medications, Action::View)?;
        Ok(self.db.search_medications(query, SEARCH_LIMIT)?)
    }

    pub fn stats(&self, ctx: &SessionContext) -> InventoryResult<CatalogStats> {
        ctx.require(Resource::Medications, Action::View)?;
        Ok(self.db.catalog_stats()?)
    }
}
