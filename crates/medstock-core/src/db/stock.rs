//! Stock position queries.

use chrono::{Duration, NaiveDate};
use rusqlite::params;

use super::{Database, DbResult};
use crate::alerts::{lot_status, AlertThresholds};
use crate::models::{StockFilter, StockRow};

/// On-hand position of one medication, used to pick forecast candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub medication_id: String,
    pub medication_name: String,
    pub category: Option<String>,
    /// Sum of current quantity over active lots with positive stock
    pub current_stock: i64,
    /// Movements recorded on any lot of the medication
    pub movement_count: i64,
}

impl Database {
    /// Active lots of active medications matching `filter`, ordered by
    /// medication name then expiry.
    pub fn stock_view(
        &self,
        filter: &StockFilter,
        today: NaiveDate,
        thresholds: &AlertThresholds,
    ) -> DbResult<Vec<StockRow>> {
        let sql = r#"
            SELECT l.id, m.id, m.name, m.active_ingredient, m.category, m.controlled,
                   l.lot_number, l.expires_on, l.current_quantity,
                   l.site, l.sector, l.shelf, l.slot
            FROM lots l
            JOIN medications m ON m.id = l.medication_id
            WHERE l.active = 1
              AND m.active = 1
              AND (?1 IS NULL OR m.name LIKE ?1 OR m.active_ingredient LIKE ?1)
              AND (?2 IS NULL OR m.category = ?2)
              AND (?3 IS NULL OR l.site LIKE ?3)
              AND (?4 IS NULL OR l.sector LIKE ?4)
              AND (?5 IS NULL
                   OR (?5 = 'in_stock' AND l.current_quantity > ?6)
                   OR (?5 = 'low_stock' AND l.current_quantity > 0 AND l.current_quantity <= ?6)
                   OR (?5 = 'out_of_stock' AND l.current_quantity = 0)
                   OR (?5 = 'near_expiry' AND l.current_quantity > 0 AND l.expires_on <= ?7))
            ORDER BY m.name, l.expires_on
        "#;

        let search = filter.search_term.as_ref().map(|s| format!("%{}%", s.trim()));
        let location = filter.location.as_ref().map(|s| format!("%{}%", s.trim()));
        let sector = filter.sector.as_ref().map(|s| format!("%{}%", s.trim()));
        let attention_limit = today + Duration::days(thresholds.expiry_attention_days);

        tracing::debug!(?filter, "stock view query");

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(
            params![
                search,
                filter.category,
                location,
                sector,
                filter.status.map(|s| s.as_str()),
                thresholds.low_stock,
                attention_limit,
            ],
            |row| {
                let expires_on: NaiveDate = row.get(7)?;
                let quantity: i64 = row.get(8)?;
                Ok(StockRow {
                    lot_id: row.get(0)?,
                    medication_id: row.get(1)?,
                    medication_name: row.get(2)?,
                    active_ingredient: row.get(3)?,
                    category: row.get(4)?,
                    controlled: row.get(5)?,
                    lot_number: row.get(6)?,
                    expires_on,
                    quantity,
                    site: row.get(9)?,
                    sector: row.get(10)?,
                    shelf: row.get(11)?,
                    slot: row.get(12)?,
                    days_to_expiry: (expires_on - today).num_days(),
                    status: lot_status(quantity, expires_on, today, thresholds),
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Stock levels of active medications that have active lots with
    /// positive stock.
    pub fn stock_levels(&self) -> DbResult<Vec<StockLevel>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.id, m.name, m.category, SUM(l.current_quantity),
                   (SELECT COUNT(*)
                    FROM movements mv
                    JOIN lots l2 ON l2.id = mv.lot_id
                    WHERE l2.medication_id = m.id)
            FROM medications m
            JOIN lots l ON l.medication_id = m.id
            WHERE m.active = 1
              AND l.active = 1
              AND l.current_quantity > 0
            GROUP BY m.id, m.name, m.category
            ORDER BY m.name
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StockLevel {
                medication_id: row.get(0)?,
                medication_name: row.get(1)?,
                category: row.get(2)?,
                current_stock: row.get(3)?,
                movement_count: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Total on-hand quantity of a medication over its active lots.
    pub fn medication_stock(&self, medication_id: &str) -> DbResult<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(current_quantity), 0) FROM lots WHERE medication_id = ?1 AND active = 1",
                params![medication_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
