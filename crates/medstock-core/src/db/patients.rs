//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{Patient, PatientQuery};

const PATIENT_COLUMNS: &str = r#"
    id, full_name, document_number, birth_date, sex, phone, email, city,
    health_plan, allergies, continuous_medications, notes, active, created_at
"#;

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, full_name, document_number, birth_date, sex, phone, email, city,
                health_plan, allergies, continuous_medications, notes, active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                patient.id,
                patient.full_name,
                patient.document_number,
                patient.birth_date,
                patient.sex,
                patient.phone,
                patient.email,
                patient.city,
                patient.health_plan,
                patient.allergies,
                patient.continuous_medications,
                patient.notes,
                patient.active,
                patient.created_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                full_name = ?2,
                document_number = ?3,
                birth_date = ?4,
                sex = ?5,
                phone = ?6,
                email = ?7,
                city = ?8,
                health_plan = ?9,
                allergies = ?10,
                continuous_medications = ?11,
                notes = ?12
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.full_name,
                patient.document_number,
                patient.birth_date,
                patient.sex,
                patient.phone,
                patient.email,
                patient.city,
                patient.health_plan,
                patient.allergies,
                patient.continuous_medications,
                patient.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        let sql = format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS);
        self.conn
            .query_row(&sql, [id], patient_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by document number.
    pub fn get_patient_by_document(&self, document_number: &str) -> DbResult<Option<Patient>> {
        let sql = format!(
            "SELECT {} FROM patients WHERE document_number = ?",
            PATIENT_COLUMNS
        );
        self.conn
            .query_row(&sql, [document_number], patient_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Search patients by name or document number and health plan, then
    /// apply the age bracket relative to `today`.
    pub fn search_patients(&self, query: &PatientQuery, today: NaiveDate) -> DbResult<Vec<Patient>> {
        let text = query
            .text
            .as_ref()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| format!("%{}%", t));
        let sql = format!(
            r#"
            SELECT {} FROM patients
            WHERE (?1 = 1 OR active = 1)
              AND (?2 IS NULL OR full_name LIKE ?2 OR document_number LIKE ?2)
              AND (?3 IS NULL OR health_plan = ?3)
            ORDER BY full_name
            "#,
            PATIENT_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![query.include_inactive, text, query.health_plan],
            patient_from_row,
        )?;

        let mut patients = Vec::new();
        for row in rows {
            let patient = row?;
            if query.matches_age(&patient, today) {
                patients.push(patient);
            }
        }
        Ok(patients)
    }

    /// Mark a patient as inactive (soft delete).
    pub fn deactivate_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("UPDATE patients SET active = 0 WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        document_number: row.get(2)?,
        birth_date: row.get(3)?,
        sex: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        city: row.get(7)?,
        health_plan: row.get(8)?,
        allergies: row.get(9)?,
        continuous_medications: row.get(10)?,
        notes: row.get(11)?,
        active: row.get(12)?,
        created_at: row.get(13)?,
    })
}
