//! Medication catalog database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{CatalogStats, Medication};

const MEDICATION_COLUMNS: &str = r#"
    id, name, active_ingredient, concentration, dosage_form, route,
    manufacturer, category, barcode, controlled, refrigerated,
    prescription_required, notes, active, registered_by, created_at
"#;

impl Database {
    /// Insert a new medication.
    pub fn insert_medication(&self, med: &Medication) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medications (
                id, name, active_ingredient, concentration, dosage_form, route,
                manufacturer, category, barcode, controlled, refrigerated,
                prescription_required, notes, active, registered_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                med.id,
                med.name,
                med.active_ingredient,
                med.concentration,
                med.dosage_form,
                med.route,
                med.manufacturer,
                med.category,
                med.barcode,
                med.controlled,
                med.refrigerated,
                med.prescription_required,
                med.notes,
                med.active,
                med.registered_by,
                med.created_at,
            ],
        )?;
        Ok(())
    }

    /// Update the editable attributes of a medication. Identity and
    /// registration data are left untouched.
    pub fn update_medication(&self, med: &Medication) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medications SET
                name = ?2,
                active_ingredient = ?3,
                concentration = ?4,
                dosage_form = ?5,
                route = ?6,
                manufacturer = ?7,
                category = ?8,
                barcode = ?9,
                controlled = ?10,
                refrigerated = ?11,
                prescription_required = ?12,
                notes = ?13
            WHERE id = ?1
            "#,
            params![
                med.id,
                med.name,
                med.active_ingredient,
                med.concentration,
                med.dosage_form,
                med.route,
                med.manufacturer,
                med.category,
                med.barcode,
                med.controlled,
                med.refrigerated,
                med.prescription_required,
                med.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a medication by ID.
    pub fn get_medication(&self, id: &str) -> DbResult<Option<Medication>> {
        let sql = format!("SELECT {} FROM medications WHERE id = ?", MEDICATION_COLUMNS);
        self.conn
            .query_row(&sql, [id], medication_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// List medications ordered by name.
    pub fn list_medications(&self, active_only: bool) -> DbResult<Vec<Medication>> {
        let sql = if active_only {
            format!(
                "SELECT {} FROM medications WHERE active = 1 ORDER BY name",
                MEDICATION_COLUMNS
            )
        } else {
            format!("SELECT {} FROM medications ORDER BY name", MEDICATION_COLUMNS)
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], medication_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search active medications by name or active ingredient (case-insensitive substring).
    pub fn search_medications(&self, query: &str, limit: usize) -> DbResult<Vec<Medication>> {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            r#"
            SELECT {} FROM medications
            WHERE active = 1
              AND (name LIKE ?1 OR active_ingredient LIKE ?1)
            ORDER BY name
            LIMIT ?2
            "#,
            MEDICATION_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, limit as i64], medication_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mark a medication as inactive (soft delete).
    pub fn deactivate_medication(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("UPDATE medications SET active = 0 WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Aggregate counts over active medications.
    pub fn catalog_stats(&self) -> DbResult<CatalogStats> {
        let (active, controlled, refrigerated) = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(controlled), 0),
                   COALESCE(SUM(refrigerated), 0)
            FROM medications
            WHERE active = 1
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT COALESCE(category, 'Uncategorized') AS cat, COUNT(*) AS n
            FROM medications
            WHERE active = 1
            GROUP BY cat
            ORDER BY n DESC, cat
            "#,
        )?;
        let by_category = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CatalogStats {
            active,
            controlled,
            refrigerated,
            by_category,
        })
    }
}

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get(0)?,
        name: row.get(1)?,
        active_ingredient: row.get(2)?,
        concentration: row.get(3)?,
        dosage_form: row.get(4)?,
        route: row.get(5)?,
        manufacturer: row.get(6)?,
        category: row.get(7)?,
        barcode: row.get(8)?,
        controlled: row.get(9)?,
        refrigerated: row.get(10)?,
        prescription_required: row.get(11)?,
        notes: row.get(12)?,
        active: row.get(13)?,
        registered_by: row.get(14)?,
        created_at: row.get(15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut med = Medication::new("Dipyrone 500mg".into(), now())
            .with_active_ingredient("dipyrone")
            .with_category("Analgesic");
        med.controlled = true;
        db.insert_medication(&med).unwrap();

        let retrieved = db.get_medication(&med.id).unwrap().unwrap();
        assert_eq!(retrieved, med);
    }

    #[test]
    fn test_update_and_deactivate() {
        let db = setup_db();

        let mut med = Medication::new("Amoxicillin".into(), now());
        db.insert_medication(&med).unwrap();

        med.refrigerated = true;
        med.notes = Some("keep cold".into());
        assert!(db.update_medication(&med).unwrap());

        let retrieved = db.get_medication(&med.id).unwrap().unwrap();
        assert!(retrieved.refrigerated);
        assert_eq!(retrieved.notes, Some("keep cold".into()));

        assert!(db.deactivate_medication(&med.id).unwrap());
        assert!(db.list_medications(true).unwrap().is_empty());
        assert_eq!(db.list_medications(false).unwrap().len(), 1);
    }

    #[test]
    fn test_search_by_name_or_ingredient() {
        let db = setup_db();

        db.insert_medication(
            &Medication::new("Novalgina".into(), now()).with_active_ingredient("dipyrone"),
        )
        .unwrap();
        db.insert_medication(
            &Medication::new("Dipyrone Generic".into(), now()).with_active_ingredient("dipyrone"),
        )
        .unwrap();
        db.insert_medication(
            &Medication::new("Amoxil".into(), now()).with_active_ingredient("amoxicillin"),
        )
        .unwrap();

        let results = db.search_medications("DIPYRONE", 10).unwrap();
        assert_eq!(results.len(), 2);

        let results = db.search_medications("amox", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Amoxil");
    }

    #[test]
    fn test_catalog_stats() {
        let db = setup_db();

        let mut a = Medication::new("A".into(), now()).with_category("Antibiotic");
        a.controlled = true;
        let mut b = Medication::new("B".into(), now()).with_category("Antibiotic");
        b.refrigerated = true;
        let c = Medication::new("C".into(), now());
        let d = Medication::new("D".into(), now()).with_category("Analgesic");
        for med in [&a, &b, &c, &d] {
            db.insert_medication(med).unwrap();
        }
        db.deactivate_medication(&d.id).unwrap();

        let stats = db.catalog_stats().unwrap();
        assert_eq!(stats.active, 3);
        assert_eq!(stats.controlled, 1);
        assert_eq!(stats.refrigerated, 1);
        assert_eq!(stats.by_category[0], ("Antibiotic".to_string(), 2));
        assert!(stats
            .by_category
            .contains(&("Uncategorized".to_string(), 1)));
    }
}
