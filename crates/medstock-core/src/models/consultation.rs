//! Consultation models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Consultation lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConsultationStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// A scheduled or completed medical consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consultation {
    pub id: String,
    pub patient_id: String,
    /// Physician (user id)
    pub physician_id: String,
    pub scheduled_at: NaiveDateTime,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub status: ConsultationStatus,
    pub created_at: NaiveDateTime,
}

impl Consultation {
    pub fn new(
        patient_id: String,
        physician_id: String,
        scheduled_at: NaiveDateTime,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            physician_id,
            scheduled_at,
            reason: None,
            symptoms: None,
            diagnosis: None,
            notes: None,
            status: ConsultationStatus::Scheduled,
            created_at,
        }
    }
}
