//! Movement log database operations.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Direction, Movement, MovementFilter, MovementKind, MovementRecord};

impl Database {
    /// Append a movement. Movements are never updated or deleted.
    pub fn insert_movement(&self, movement: &Movement) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO movements (
                id, lot_id, kind, direction, quantity, reason, responsible, occurred_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                movement.id,
                movement.lot_id,
                movement.kind.as_str(),
                movement.direction.as_str(),
                movement.quantity,
                movement.reason,
                movement.responsible,
                movement.occurred_at,
            ],
        )?;
        Ok(())
    }

    /// All movements of a lot in replay order (timestamp, then insertion order).
    pub fn list_movements_for_lot(&self, lot_id: &str) -> DbResult<Vec<Movement>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, lot_id, kind, direction, quantity, reason, responsible, occurred_at
            FROM movements
            WHERE lot_id = ?
            ORDER BY occurred_at, rowid
            "#,
        )?;
        let rows = stmt.query_map([lot_id], movement_row)?;

        let mut movements = Vec::new();
        for row in rows {
            movements.push(row?.try_into()?);
        }
        Ok(movements)
    }

    /// Exit quantities of a medication summed per calendar day within
    /// `[from, to]`, oldest day first. Days without exits are absent.
    pub fn daily_exits(
        &self,
        medication_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> DbResult<Vec<(NaiveDate, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DATE(m.occurred_at) AS day, SUM(m.quantity)
            FROM movements m
            JOIN lots l ON l.id = m.lot_id
            WHERE l.medication_id = ?1
              AND m.kind = 'exit'
              AND m.occurred_at >= ?2
              AND m.occurred_at <= ?3
            GROUP BY day
            ORDER BY day
            "#,
        )?;
        let rows = stmt.query_map(params![medication_id, from, to], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Number of movements recorded on any lot of a medication.
    pub fn count_movements_for_medication(&self, medication_id: &str) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(*)
                FROM movements m
                JOIN lots l ON l.id = m.lot_id
                WHERE l.medication_id = ?
                "#,
                [medication_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Movements within a date range, newest first.
    pub fn movement_history(&self, filter: &MovementFilter) -> DbResult<Vec<MovementRecord>> {
        let from = filter.from.and_hms_opt(0, 0, 0);
        let to = filter
            .to
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0));

        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.id, m.lot_id, m.kind, m.direction, m.quantity, m.reason,
                   m.responsible, m.occurred_at,
                   l.medication_id, med.name, l.lot_number
            FROM movements m
            JOIN lots l ON l.id = m.lot_id
            JOIN medications med ON med.id = l.medication_id
            WHERE m.occurred_at >= ?1
              AND (?2 IS NULL OR m.occurred_at < ?2)
              AND (?3 IS NULL OR m.kind = ?3)
              AND (?4 IS NULL OR l.medication_id = ?4)
            ORDER BY m.occurred_at DESC, m.rowid DESC
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                from,
                to,
                filter.kind.map(|k| k.as_str()),
                filter.medication_id
            ],
            |row| {
                Ok((
                    movement_row(row)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            },
        )?;

        let mut records = Vec::new();
        for row in rows {
            let (movement, medication_id, medication_name, lot_number) = row?;
            records.push(MovementRecord {
                movement: movement.try_into()?,
                medication_id,
                medication_name,
                lot_number,
            });
        }
        Ok(records)
    }
}

/// Intermediate row struct for database mapping.
struct MovementRow {
    id: String,
    lot_id: String,
    kind: String,
    direction: String,
    quantity: i64,
    reason: Option<String>,
    responsible: Option<String>,
    occurred_at: NaiveDateTime,
}

fn movement_row(row: &Row<'_>) -> rusqlite::Result<MovementRow> {
    Ok(MovementRow {
        id: row.get(0)?,
        lot_id: row.get(1)?,
        kind: row.get(2)?,
        direction: row.get(3)?,
        quantity: row.get(4)?,
        reason: row.get(5)?,
        responsible: row.get(6)?,
        occurred_at: row.get(7)?,
    })
}

impl TryFrom<MovementRow> for Movement {
    type Error = DbError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let kind = MovementKind::parse(&row.kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown movement kind: {}", row.kind)))?;
        let direction = Direction::parse(&row.direction).ok_or_else(|| {
            DbError::Constraint(format!("Unknown movement direction: {}", row.direction))
        })?;

        Ok(Movement {
            id: row.id,
            lot_id: row.lot_id,
            kind,
            direction,
            quantity: row.quantity,
            reason: row.reason,
            responsible: row.responsible,
            occurred_at: row.occurred_at,
        })
    }
}
