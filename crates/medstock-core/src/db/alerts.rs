//! Smart alert database operations.

use chrono::NaiveDateTime;
use rusqlite::{params, Row};

use super::{Database, DbError, DbResult};
use crate::models::{AlertPriority, SmartAlert};

impl Database {
    /// Persist a smart alert.
    pub fn insert_smart_alert(&self, alert: &SmartAlert) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO smart_alerts (
                id, category, priority, title, message, medication_id, read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                alert.id,
                alert.category,
                alert.priority.as_str(),
                alert.title,
                alert.message,
                alert.medication_id,
                alert.read,
                alert.created_at,
            ],
        )?;
        Ok(())
    }

    /// List smart alerts, newest first.
    pub fn list_smart_alerts(&self, unread_only: bool) -> DbResult<Vec<SmartAlert>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, category, priority, title, message, medication_id, read, created_at
            FROM smart_alerts
            WHERE (?1 = 0 OR read = 0)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )?;
        let rows = stmt.query_map([unread_only], alert_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?.try_into()?);
        }
        Ok(alerts)
    }

    /// Mark a smart alert as read.
    pub fn mark_alert_read(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("UPDATE smart_alerts SET read = 1 WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct SmartAlertRow {
    id: String,
    category: String,
    priority: String,
    title: String,
    message: String,
    medication_id: Option<String>,
    read: bool,
    created_at: NaiveDateTime,
}

fn alert_row(row: &Row<'_>) -> rusqlite::Result<SmartAlertRow> {
    Ok(SmartAlertRow {
        id: row.get(0)?,
        category: row.get(1)?,
        priority: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        medication_id: row.get(5)?,
        read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl TryFrom<SmartAlertRow> for SmartAlert {
    type Error = DbError;

    fn try_from(row: SmartAlertRow) -> Result<Self, Self::Error> {
        let priority = AlertPriority::parse(&row.priority).ok_or_else(|| {
            DbError::Constraint(format!("Unknown alert priority: {}", row.priority))
        })?;

        Ok(SmartAlert {
            id: row.id,
            category: row.category,
            priority,
            title: row.title,
            message: row.message,
            medication_id: row.medication_id,
            read: row.read,
            created_at: row.created_at,
        })
    }
}
