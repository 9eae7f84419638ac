//! Password login and account bootstrap.

use sha2::{Digest, Sha256};

use super::{Action, Resource, SessionContext};
use crate::clock::Clock;
use crate::db::{Database, DbResult};
use crate::error::{AccessError, AccessResult};
use crate::models::{Role, User};

/// Username of the seeded administrator account.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Lowercase hex SHA-256 digest of a password.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Account management and login.
pub struct Authenticator<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> Authenticator<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Check credentials against active accounts and open a session.
    pub fn authenticate(&self, username: &str, password: &str) -> AccessResult<SessionContext> {
        let user = match self.db.get_user_by_username(username)? {
            Some(user) if user.active && user.password_hash == hash_password(password) => user,
            _ => {
                tracing::warn!(%username, "login rejected");
                return Err(AccessError::InvalidCredentials);
            }
        };

        self.db.touch_last_login(&user.id, self.clock.now())?;
        tracing::info!(%username, role = ?user.role, "login");

        Ok(SessionContext::new(
            user.id,
            user.username,
            user.full_name,
            user.role,
        ))
    }

    /// Create the `admin` account when no active administrator exists.
    ///
    /// Returns `true` when an account was created.
    pub fn ensure_default_admin(&self, password: &str) -> DbResult<bool> {
        if self.db.count_active_users_with_role(Role::Administrator)? > 0 {
            return Ok(false);
        }
        if self.db.get_user_by_username(DEFAULT_ADMIN_USERNAME)?.is_some() {
            // An inactive account already holds the name; leave it to an operator.
            tracing::warn!("no active administrator and default admin account is disabled");
            return Ok(false);
        }

        let admin = User::new(
            DEFAULT_ADMIN_USERNAME.to_string(),
            hash_password(password),
            "System Administrator".to_string(),
            Role::Administrator,
            self.clock.now(),
        );
        self.db.insert_user(&admin)?;
        tracing::info!("seeded default administrator account");
        Ok(true)
    }

    /// Create a staff account. Requires `users:create`.
    pub fn create_user(
        &self,
        ctx: &SessionContext,
        username: &str,
        password: &str,
        full_name: &str,
        email: Option<String>,
        role: Role,
    ) -> AccessResult<User> {
        ctx.require(Resource::Users, Action::Create)?;

        let mut user = User::new(
            username.trim().to_string(),
            hash_password(password),
            full_name.trim().to_string(),
            role,
            self.clock.now(),
        );
        user.email = email;
        self.db.insert_user(&user)?;

        tracing::info!(by = %ctx.username, %username, ?role, "user created");
        Ok(user)
    }

    /// List staff accounts. Requires `users:view`.
    pub fn list_users(&self, ctx: &SessionContext) -> AccessResult<Vec<User>> {
        ctx.require(Resource::Users, Action::View)?;
        Ok(self.db.list_users()?)
    }

    /// Enable or disable a staff account. Requires `users:edit`.
    pub fn set_user_active(
        &self,
        ctx: &SessionContext,
        user_id: &str,
        active: bool,
    ) -> AccessResult<bool> {
        ctx.require(Resource::Users, Action::Edit)?;
        let changed = self.db.set_user_active(user_id, active)?;
        tracing::info!(by = %ctx.username, %user_id, active, "user status changed");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
    }

    #[test]
    fn test_hash_password() {
        assert_eq!(
            hash_password("admin123"),
            "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
        );
    }

    #[test]
    fn test_seed_and_login() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let auth = Authenticator::new(&db, &clock);

        assert!(auth.ensure_default_admin("admin123").unwrap());
        assert!(!auth.ensure_default_admin("admin123").unwrap());

        let session = auth.authenticate("admin", "admin123").unwrap();
        assert_eq!(session.role, Role::Administrator);
        assert_eq!(session.username, "admin");

        let user = db.get_user_by_username("admin").unwrap().unwrap();
        assert_eq!(user.last_login, Some(clock.now()));
    }

    #[test]
    fn test_bad_credentials() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let auth = Authenticator::new(&db, &clock);
        auth.ensure_default_admin("admin123").unwrap();

        assert!(matches!(
            auth.authenticate("admin", "wrong"),
            Err(AccessError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate("nobody", "admin123"),
            Err(AccessError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_create_user_requires_permission() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let auth = Authenticator::new(&db, &clock);
        auth.ensure_default_admin("admin123").unwrap();
        let admin = auth.authenticate("admin", "admin123").unwrap();

        auth.create_user(&admin, "ana", "secret", "Ana Lima", None, Role::Pharmacist)
            .unwrap();
        let ana = auth.authenticate("ana", "secret").unwrap();
        assert_eq!(ana.role, Role::Pharmacist);

        let denied = auth.create_user(&ana, "bob", "x", "Bob", None, Role::Nurse);
        assert!(matches!(denied, Err(AccessError::PermissionDenied { .. })));
        assert!(auth.list_users(&ana).is_err());
        assert_eq!(auth.list_users(&admin).unwrap().len(), 2);
    }

    #[test]
    fn test_disabled_user_cannot_login() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let auth = Authenticator::new(&db, &clock);
        auth.ensure_default_admin("admin123").unwrap();
        let admin = auth.authenticate("admin", "admin123").unwrap();

        let nurse = auth
            .create_user(&admin, "joana", "pw", "Joana", None, Role::Nurse)
            .unwrap();
        auth.set_user_active(&admin, &nurse.id, false).unwrap();
        assert!(auth.authenticate("joana", "pw").is_err());
    }
}
