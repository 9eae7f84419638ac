//! User account database operations.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Role, User};

impl Database {
    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (
                id, username, password_hash, full_name, email, role, active,
                last_login, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                user.id,
                user.username,
                user.password_hash,
                user.full_name,
                user.email,
                user.role.as_str(),
                user.active,
                user.last_login,
                user.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a user by username.
    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT id, username, password_hash, full_name, email, role, active,
                       last_login, created_at
                FROM users
                WHERE username = ?
                "#,
                [username],
                user_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// List users ordered by username.
    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, username, password_hash, full_name, email, role, active,
                   last_login, created_at
            FROM users
            ORDER BY username
            "#,
        )?;
        let rows = stmt.query_map([], user_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok(users)
    }

    /// Number of active users holding `role`.
    pub fn count_active_users_with_role(&self, role: Role) -> DbResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = ? AND active = 1",
                [role.as_str()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Record a successful login.
    pub fn touch_last_login(&self, user_id: &str, at: NaiveDateTime) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE users SET last_login = ?2 WHERE id = ?1",
            params![user_id, at],
        )?;
        Ok(rows_affected > 0)
    }

    /// Enable or disable an account.
    pub fn set_user_active(&self, user_id: &str, active: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE users SET active = ?2 WHERE id = ?1",
            params![user_id, active],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    full_name: String,
    email: Option<String>,
    role: String,
    active: bool,
    last_login: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        email: row.get(4)?,
        role: row.get(5)?,
        active: row.get(6)?,
        last_login: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", row.role)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            full_name: row.full_name,
            email: row.email,
            role,
            active: row.active,
            last_login: row.last_login,
            created_at: row.created_at,
        })
    }
}
