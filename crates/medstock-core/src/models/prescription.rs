//! Prescription and dispensation models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Prescription lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrescriptionStatus {
    /// Issued and not yet fully dispensed
    Active,
    /// Every item has been fully dispensed
    Dispensed,
    Cancelled,
}

/// A prescription issued to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    /// Prescribing physician (user id)
    pub physician_id: String,
    pub consultation_id: Option<String>,
    pub issued_at: NaiveDateTime,
    pub valid_until: Option<NaiveDate>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub items: Vec<PrescriptionItem>,
}

impl Prescription {
    /// Whether every item has been dispensed in full.
    pub fn is_fully_dispensed(&self) -> bool {
        self.items.iter().all(|item| item.remaining() == 0)
    }
}

/// One prescribed medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionItem {
    pub id: String,
    pub prescription_id: String,
    pub medication_id: String,
    pub quantity: i64,
    /// Dosage instructions (posology)
    pub dosage_instructions: Option<String>,
    /// Units dispensed so far
    pub dispensed_quantity: i64,
}

impl PrescriptionItem {
    /// Units still to be dispensed.
    pub fn remaining(&self) -> i64 {
        (self.quantity - self.dispensed_quantity).max(0)
    }
}

/// Input for a prescription item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPrescriptionItem {
    pub medication_id: String,
    pub quantity: i64,
    pub dosage_instructions: Option<String>,
}

/// Input for issuing a prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPrescription {
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<NewPrescriptionItem>,
}

/// Units of one lot handed out against a prescription item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dispensation {
    pub id: String,
    pub prescription_item_id: String,
    pub lot_id: String,
    pub quantity: i64,
    /// Username of the dispensing staff member
    pub dispensed_by: Option<String>,
    pub dispensed_at: NaiveDateTime,
}
