//! Consultation database operations.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Consultation, ConsultationStatus};

impl Database {
    /// Insert a new consultation.
    pub fn insert_consultation(&self, consultation: &Consultation) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO consultations (
                id, patient_id, physician_id, scheduled_at, reason, symptoms,
                diagnosis, notes, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                consultation.id,
                consultation.patient_id,
                consultation.physician_id,
                consultation.scheduled_at,
                consultation.reason,
                consultation.symptoms,
                consultation.diagnosis,
                consultation.notes,
                status_to_string(&consultation.status),
                consultation.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a consultation by ID.
    pub fn get_consultation(&self, id: &str) -> DbResult<Option<Consultation>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT id, patient_id, physician_id, scheduled_at, reason, symptoms,
                       diagnosis, notes, status, created_at
                FROM consultations
                WHERE id = ?
                "#,
                [id],
                consultation_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// List a patient's consultations, most recent first.
    pub fn list_consultations_for_patient(&self, patient_id: &str) -> DbResult<Vec<Consultation>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_id, physician_id, scheduled_at, reason, symptoms,
                   diagnosis, notes, status, created_at
            FROM consultations
            WHERE patient_id = ?
            ORDER BY scheduled_at DESC
            "#,
        )?;
        let rows = stmt.query_map([patient_id], consultation_row)?;

        let mut consultations = Vec::new();
        for row in rows {
            consultations.push(row?.try_into()?);
        }
        Ok(consultations)
    }

    /// Close a scheduled consultation with its clinical findings.
    ///
    /// Returns `false` when the consultation is missing or not scheduled.
    pub fn complete_consultation(
        &self,
        id: &str,
        symptoms: Option<&str>,
        diagnosis: &str,
        notes: Option<&str>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE consultations SET
                symptoms = COALESCE(?2, symptoms),
                diagnosis = ?3,
                notes = COALESCE(?4, notes),
                status = 'completed'
            WHERE id = ?1 AND status = 'scheduled'
            "#,
            params![id, symptoms, diagnosis, notes],
        )?;
        Ok(rows_affected > 0)
    }

    /// Cancel a scheduled consultation.
    pub fn cancel_consultation(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE consultations SET status = 'cancelled' WHERE id = ? AND status = 'scheduled'",
            [id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct ConsultationRow {
    id: String,
    patient_id: String,
    physician_id: String,
    scheduled_at: NaiveDateTime,
    reason: Option<String>,
    symptoms: Option<String>,
    diagnosis: Option<String>,
    notes: Option<String>,
    status: String,
    created_at: NaiveDateTime,
}

fn consultation_row(row: &Row<'_>) -> rusqlite::Result<ConsultationRow> {
    Ok(ConsultationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        physician_id: row.get(2)?,
        scheduled_at: row.get(3)?,
        reason: row.get(4)?,
        symptoms: row.get(5)?,
        diagnosis: row.get(6)?,
        notes: row.get(7)?,
        status: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl TryFrom<ConsultationRow> for Consultation {
    type Error = DbError;

    fn try_from(row: ConsultationRow) -> Result<Self, Self::Error> {
        Ok(Consultation {
            id: row.id,
            patient_id: row.patient_id,
            physician_id: row.physician_id,
            scheduled_at: row.scheduled_at,
            reason: row.reason,
            symptoms: row.symptoms,
            diagnosis: row.diagnosis,
            notes: row.notes,
            status: string_to_status(&row.status)?,
            created_at: row.created_at,
        })
    }
}

fn status_to_string(status: &ConsultationStatus) -> &'static str {
    match status {
        ConsultationStatus::Scheduled => "scheduled",
        ConsultationStatus::Completed => "completed",
        ConsultationStatus::Cancelled => "cancelled",
    }
}

fn string_to_status(s: &str) -> Result<ConsultationStatus, DbError> {
    match s {
        "scheduled" => Ok(ConsultationStatus::Scheduled),
        "completed" => Ok(ConsultationStatus::Completed),
        "cancelled" => Ok(ConsultationStatus::Cancelled),
        _ => Err(DbError::Constraint(format!("Unknown consultation status: {}", s))),
    }
}
