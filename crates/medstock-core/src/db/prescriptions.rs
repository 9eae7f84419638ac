//! Prescription, prescription item and dispensation database operations.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Dispensation, Prescription, PrescriptionItem, PrescriptionStatus};

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.prescription_id, i.medication_id, i.quantity, i.dosage_instructions,
           COALESCE((SELECT SUM(d.quantity) FROM dispensations d
                     WHERE d.prescription_item_id = i.id), 0)
    FROM prescription_items i
"#;

impl Database {
    /// Insert a prescription header and all of its items.
    ///
    /// Callers wanting atomicity wrap this in [`Database::begin`].
    pub fn insert_prescription(&self, rx: &Prescription) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                id, patient_id, physician_id, consultation_id, issued_at,
                valid_until, status, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                rx.id,
                rx.patient_id,
                rx.physician_id,
                rx.consultation_id,
                rx.issued_at,
                rx.valid_until,
                status_to_string(&rx.status),
                rx.notes,
            ],
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO prescription_items (
                id, prescription_id, medication_id, quantity, dosage_instructions
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for item in &rx.items {
            stmt.execute(params![
                item.id,
                rx.id,
                item.medication_id,
                item.quantity,
                item.dosage_instructions,
            ])?;
        }
        Ok(())
    }

    /// Get a prescription with its items.
    pub fn get_prescription(&self, id: &str) -> DbResult<Option<Prescription>> {
        let header = self
            .conn
            .query_row(
                r#"
                SELECT id, patient_id, physician_id, consultation_id, issued_at,
                       valid_until, status, notes
                FROM prescriptions
                WHERE id = ?
                "#,
                [id],
                prescription_row,
            )
            .optional()?;

        match header {
            Some(row) => {
                let items = self.list_prescription_items(&row.id)?;
                Ok(Some(row.into_prescription(items)?))
            }
            None => Ok(None),
        }
    }

    /// List a patient's prescriptions, newest first.
    pub fn list_prescriptions_for_patient(&self, patient_id: &str) -> DbResult<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_id, physician_id, consultation_id, issued_at,
                   valid_until, status, notes
            FROM prescriptions
            WHERE patient_id = ?
            ORDER BY issued_at DESC
            "#,
        )?;
        let headers = stmt
            .query_map([patient_id], prescription_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut prescriptions = Vec::with_capacity(headers.len());
        for row in headers {
            let items = self.list_prescription_items(&row.id)?;
            prescriptions.push(row.into_prescription(items)?);
        }
        Ok(prescriptions)
    }

    /// Items of a prescription with the quantity already dispensed.
    pub fn list_prescription_items(&self, prescription_id: &str) -> DbResult<Vec<PrescriptionItem>> {
        let sql = format!("{} WHERE i.prescription_id = ? ORDER BY i.rowid", ITEM_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([prescription_id], item_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get one prescription item with the quantity already dispensed.
    pub fn get_prescription_item(&self, item_id: &str) -> DbResult<Option<PrescriptionItem>> {
        let sql = format!("{} WHERE i.id = ?", ITEM_SELECT);
        self.conn
            .query_row(&sql, [item_id], item_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Set a prescription's status.
    pub fn set_prescription_status(&self, id: &str, status: PrescriptionStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE prescriptions SET status = ?2 WHERE id = ?1",
            params![id, status_to_string(&status)],
        )?;
        Ok(rows_affected > 0)
    }

    /// Record a dispensation.
    pub fn insert_dispensation(&self, dispensation: &Dispensation) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO dispensations (
                id, prescription_item_id, lot_id, quantity, dispensed_by, dispensed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                dispensation.id,
                dispensation.prescription_item_id,
                dispensation.lot_id,
                dispensation.quantity,
                dispensation.dispensed_by,
                dispensation.dispensed_at,
            ],
        )?;
        Ok(())
    }

    /// Dispensations recorded against an item, oldest first.
    pub fn list_dispensations_for_item(&self, item_id: &str) -> DbResult<Vec<Dispensation>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, prescription_item_id, lot_id, quantity, dispensed_by, dispensed_at
            FROM dispensations
            WHERE prescription_item_id = ?
            ORDER BY dispensed_at, rowid
            "#,
        )?;
        let rows = stmt.query_map([item_id], |row| {
            Ok(Dispensation {
                id: row.get(0)?,
                prescription_item_id: row.get(1)?,
                lot_id: row.get(2)?,
                quantity: row.get(3)?,
                dispensed_by: row.get(4)?,
                dispensed_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Intermediate row struct for the prescription header.
struct PrescriptionRow {
    id: String,
    patient_id: String,
    physician_id: String,
    consultation_id: Option<String>,
    issued_at: NaiveDateTime,
    valid_until: Option<NaiveDate>,
    status: String,
    notes: Option<String>,
}

impl PrescriptionRow {
    fn into_prescription(self, items: Vec<PrescriptionItem>) -> DbResult<Prescription> {
        Ok(Prescription {
            id: self.id,
            patient_id: self.patient_id,
            physician_id: self.physician_id,
            consultation_id: self.consultation_id,
            issued_at: self.issued_at,
            valid_until: self.valid_until,
            status: string_to_status(&self.status)?,
            notes: self.notes,
            items,
        })
    }
}

fn prescription_row(row: &Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        physician_id: row.get(2)?,
        consultation_id: row.get(3)?,
        issued_at: row.get(4)?,
        valid_until: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<PrescriptionItem> {
    Ok(PrescriptionItem {
        id: row.get(0)?,
        prescription_id: row.get(1)?,
        medication_id: row.get(2)?,
        quantity: row.get(3)?,
        dosage_instructions: row.get(4)?,
        dispensed_quantity: row.get(5)?,
    })
}

fn status_to_string(status: &PrescriptionStatus) -> &'static str {
    match status {
        PrescriptionStatus::Active => "active",
        PrescriptionStatus::Dispensed => "dispensed",
        PrescriptionStatus::Cancelled => "cancelled",
    }
}

fn string_to_status(s: &str) -> Result<PrescriptionStatus, DbError> {
    match s {
        "active" => Ok(PrescriptionStatus::Active),
        "dispensed" => Ok(PrescriptionStatus::Dispensed),
        "cancelled" => Ok(PrescriptionStatus::Cancelled),
        _ => Err(DbError::Constraint(format!("Unknown prescription status: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medication, NewLot, Patient, Role, StorageLocation, User};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap()
    }

    struct Fixture {
        db: Database,
        patient: Patient,
        doctor: User,
        med: Medication,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Maria".into(), "111".into(), at(1));
        db.insert_patient(&patient).unwrap();
        let doctor = User::new("dr".into(), "h".into(), "Dr".into(), Role::Physician, at(1));
        db.insert_user(&doctor).unwrap();
        let med = Medication::new("Amoxicillin".into(), at(1));
        db.insert_medication(&med).unwrap();
        Fixture {
            db,
            patient,
            doctor,
            med,
        }
    }

    fn make_rx(f: &Fixture, issued: NaiveDateTime, quantities: &[i64]) -> Prescription {
        let id = uuid::Uuid::new_v4().to_string();
        Prescription {
            id: id.clone(),
            patient_id: f.patient.id.clone(),
            physician_id: f.doctor.id.clone(),
            consultation_id: None,
            issued_at: issued,
            valid_until: Some(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            status: PrescriptionStatus::Active,
            notes: None,
            items: quantities
                .iter()
                .map(|q| PrescriptionItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    prescription_id: id.clone(),
                    medication_id: f.med.id.clone(),
                    quantity: *q,
                    dosage_instructions: Some("1 every 8h".into()),
                    dispensed_quantity: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let f = setup();
        let rx = make_rx(&f, at(2), &[21, 10]);
        f.db.insert_prescription(&rx).unwrap();

        let retrieved = f.db.get_prescription(&rx.id).unwrap().unwrap();
        assert_eq!(retrieved, rx);
    }

    #[test]
    fn test_dispensed_quantity_and_status() {
        let f = setup();
        let rx = make_rx(&f, at(2), &[21]);
        f.db.insert_prescription(&rx).unwrap();

        let lot = NewLot::new(
            f.med.id.clone(),
            "L1",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            100,
            StorageLocation::new("Pharmacy"),
        )
        .into_lot(None, at(1));
        f.db.insert_lot(&lot).unwrap();

        let dispensation = Dispensation {
            id: uuid::Uuid::new_v4().to_string(),
            prescription_item_id: rx.items[0].id.clone(),
            lot_id: lot.id.clone(),
            quantity: 7,
            dispensed_by: Some("ana".into()),
            dispensed_at: at(3),
        };
        f.db.insert_dispensation(&dispensation).unwrap();

        let item = f.db.get_prescription_item(&rx.items[0].id).unwrap().unwrap();
        assert_eq!(item.dispensed_quantity, 7);
        assert_eq!(item.remaining(), 14);
        assert_eq!(
            f.db.list_dispensations_for_item(&item.id).unwrap(),
            vec![dispensation]
        );

        assert!(f
            .db
            .set_prescription_status(&rx.id, PrescriptionStatus::Cancelled)
            .unwrap());
        let retrieved = f.db.get_prescription(&rx.id).unwrap().unwrap();
        assert_eq!(retrieved.status, PrescriptionStatus::Cancelled);
    }

    #[test]
    fn test_list_for_patient_newest_first() {
        let f = setup();
        let older = make_rx(&f, at(2), &[5]);
        let newer = make_rx(&f, at(9), &[5]);
        f.db.insert_prescription(&older).unwrap();
        f.db.insert_prescription(&newer).unwrap();

        let list = f.db.list_prescriptions_for_patient(&f.patient.id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].items.len(), 1);
    }
}
