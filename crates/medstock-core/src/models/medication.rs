//! Medication catalog models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A medication in the hospital formulary.
///
/// Identity is immutable; every other attribute may be edited by staff.
/// Medications are never hard-deleted, only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Commercial or generic name
    pub name: String,
    /// Active ingredient (e.g., "dipyrone")
    pub active_ingredient: Option<String>,
    /// Concentration (e.g., "500mg/mL")
    pub concentration: Option<String>,
    /// Dosage form (e.g., "tablet", "injectable solution")
    pub dosage_form: Option<String>,
    /// Administration route (e.g., "oral", "IV")
    pub route: Option<String>,
    /// Manufacturer / laboratory
    pub manufacturer: Option<String>,
    /// Therapeutic category (e.g., "Analgesic")
    pub category: Option<String>,
    /// Barcode
    pub barcode: Option<String>,
    /// Subject to special control
    pub controlled: bool,
    /// Requires cold storage
    pub refrigerated: bool,
    /// Requires a prescription to dispense
    pub prescription_required: bool,
    /// Free-form notes
    pub notes: Option<String>,
    /// Soft-delete flag
    pub active: bool,
    /// User who registered the medication
    pub registered_by: Option<String>,
    /// Registration timestamp
    pub created_at: NaiveDateTime,
}

impl Medication {
    /// Create a new active medication with only the required fields set.
    pub fn new(name: String, created_at: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            active_ingredient: None,
            concentration: None,
            dosage_form: None,
            route: None,
            manufacturer: None,
            category: None,
            barcode: None,
            controlled: false,
            refrigerated: false,
            prescription_required: true,
            notes: None,
            active: true,
            registered_by: None,
            created_at,
        }
    }

    /// Builder-style setter for the active ingredient.
    pub fn with_active_ingredient(mut self, ingredient: impl Into<String>) -> Self {
        self.active_ingredient = Some(ingredient.into());
        self
    }

    /// Builder-style setter for the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Aggregate counts over the active catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogStats {
    pub active: i64,
    pub controlled: i64,
    pub refrigerated: i64,
    /// (category, count) pairs ordered by count descending
    pub by_category: Vec<(String, i64)>,
}
