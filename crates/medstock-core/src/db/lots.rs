//! Lot database operations.
//!
//! `current_quantity` is never written directly by callers; it only moves
//! through [`Database::apply_stock_delta`], which the ledger pairs with a
//! movement row inside one transaction.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{Lot, StorageLocation};

const LOT_COLUMNS: &str = r#"
    id, medication_id, lot_number, manufactured_on, expires_on,
    initial_quantity, current_quantity, unit_price, supplier,
    site, sector, shelf, slot, notes, active, received_by, received_at
"#;

impl Database {
    /// Insert a new lot.
    pub fn insert_lot(&self, lot: &Lot) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO lots (
                id, medication_id, lot_number, manufactured_on, expires_on,
                initial_quantity, current_quantity, unit_price, supplier,
                site, sector, shelf, slot, notes, active, received_by, received_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                lot.id,
                lot.medication_id,
                lot.lot_number,
                lot.manufactured_on,
                lot.expires_on,
                lot.initial_quantity,
                lot.current_quantity,
                lot.unit_price,
                lot.supplier,
                lot.location.site,
                lot.location.sector,
                lot.location.shelf,
                lot.location.slot,
                lot.notes,
                lot.active,
                lot.received_by,
                lot.received_at,
            ],
        )?;
        Ok(())
    }

    /// Get a lot by ID.
    pub fn get_lot(&self, id: &str) -> DbResult<Option<Lot>> {
        let sql = format!("SELECT {} FROM lots WHERE id = ?", LOT_COLUMNS);
        self.conn
            .query_row(&sql, [id], lot_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// List the lots of a medication, earliest expiry first.
    pub fn list_lots_for_medication(
        &self,
        medication_id: &str,
        active_only: bool,
    ) -> DbResult<Vec<Lot>> {
        let sql = format!(
            "SELECT {} FROM lots WHERE medication_id = ?1 AND (?2 = 0 OR active = 1) ORDER BY expires_on, received_at",
            LOT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![medication_id, active_only], lot_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List every active lot.
    pub fn list_active_lots(&self) -> DbResult<Vec<Lot>> {
        let sql = format!(
            "SELECT {} FROM lots WHERE active = 1 ORDER BY expires_on, received_at",
            LOT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], lot_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Apply a signed change to a lot's quantity in a single guarded statement.
    ///
    /// Returns `false` (and changes nothing) when the lot does not exist or the
    /// result would leave `[0, initial_quantity]`.
    pub fn apply_stock_delta(&self, lot_id: &str, delta: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE lots
            SET current_quantity = current_quantity + ?2
            WHERE id = ?1
              AND current_quantity + ?2 BETWEEN 0 AND initial_quantity
            "#,
            params![lot_id, delta],
        )?;
        Ok(rows_affected > 0)
    }

    /// Move a lot to another storage location.
    pub fn relocate_lot(&self, lot_id: &str, location: &StorageLocation) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE lots SET site = ?2, sector = ?3, shelf = ?4, slot = ?5 WHERE id = ?1",
            params![
                lot_id,
                location.site,
                location.sector,
                location.shelf,
                location.slot
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Mark a lot as inactive (soft delete).
    pub fn deactivate_lot(&self, lot_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("UPDATE lots SET active = 0 WHERE id = ?", [lot_id])?;
        Ok(rows_affected > 0)
    }
}

fn lot_from_row(row: &Row<'_>) -> rusqlite::Result<Lot> {
    Ok(Lot {
        id: row.get(0)?,
        medication_id: row.get(1)?,
        lot_number: row.get(2)?,
        manufactured_on: row.get(3)?,
        expires_on: row.get(4)?,
        initial_quantity: row.get(5)?,
        current_quantity: row.get(6)?,
        unit_price: row.get(7)?,
        supplier: row.get(8)?,
        location: StorageLocation {
            site: row.get(9)?,
            sector: row.get(10)?,
            shelf: row.get(11)?,
            slot: row.get(12)?,
        },
        notes: row.get(13)?,
        active: row.get(14)?,
        received_by: row.get(15)?,
        received_at: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medication, NewLot};
    use chrono::{NaiveDate, NaiveDateTime};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn seed_lot(db: &Database, quantity: i64) -> Lot {
        let med = Medication::new("Dipyrone".into(), now());
        db.insert_medication(&med).unwrap();
        let lot = NewLot::new(
            med.id,
            "L001",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            quantity,
            StorageLocation::new("Central Pharmacy"),
        )
        .into_lot(Some("admin".into()), now());
        db.insert_lot(&lot).unwrap();
        lot
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let lot = seed_lot(&db, 100);

        let retrieved = db.get_lot(&lot.id).unwrap().unwrap();
        assert_eq!(retrieved, lot);
    }

    #[test]
    fn test_guarded_delta() {
        let db = setup_db();
        let lot = seed_lot(&db, 100);

        assert!(db.apply_stock_delta(&lot.id, -40).unwrap());
        assert!(!db.apply_stock_delta(&lot.id, -61).unwrap());
        assert!(!db.apply_stock_delta(&lot.id, 41).unwrap());
        assert!(db.apply_stock_delta(&lot.id, 40).unwrap());
        assert!(!db.apply_stock_delta("missing", -1).unwrap());

        let retrieved = db.get_lot(&lot.id).unwrap().unwrap();
        assert_eq!(retrieved.current_quantity, 100);
    }

    #[test]
    fn test_relocate() {
        let db = setup_db();
        let lot = seed_lot(&db, 10);

        let mut destination = StorageLocation::new("ICU");
        destination.shelf = Some("B2".into());
        assert!(db.relocate_lot(&lot.id, &destination).unwrap());

        let retrieved = db.get_lot(&lot.id).unwrap().unwrap();
        assert_eq!(retrieved.location, destination);
        assert_eq!(retrieved.current_quantity, 10);
    }

    #[test]
    fn test_list_for_medication() {
        let db = setup_db();
        let lot = seed_lot(&db, 10);
        db.deactivate_lot(&lot.id).unwrap();

        assert!(db
            .list_lots_for_medication(&lot.medication_id, true)
            .unwrap()
            .is_empty());
        assert_eq!(
            db.list_lots_for_medication(&lot.medication_id, false)
                .unwrap()
                .len(),
            1
        );
        assert!(db.list_active_lots().unwrap().is_empty());
    }
}
