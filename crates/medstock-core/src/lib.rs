//! MedStock Core Library
//!
//! Hospital medication inventory: lot-level stock ledger, consumption
//! forecasting and stock alerts.
//!
//! # Architecture
//!
//! ```text
//!   Lot registration ──► Inventory Ledger ◄── Movements / Transfers / Dispensing
//!                              │
//!                     (append-only movement log)
//!                              │
//!              ┌───────────────┼────────────────┐
//!              ▼               ▼                ▼
//!     Consumption        Alert Classifier    Stock View
//!      Estimator               │
//!              │               │
//!              ▼               ▼
//!     Depletion Forecaster ──► Predictive Analysis ──► Reports (JSON / CSV)
//! ```
//!
//! # Core Principle
//!
//! **A lot's quantity is always its movement log replayed from zero.** Every
//! quantity change writes its movement in the same transaction, and no change
//! may take a lot below zero.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence layer
//! - [`models`]: Domain types (Medication, Lot, Movement, Patient, etc.)
//! - [`ledger`]: Lot registration, movements, transfers and audits
//! - [`analysis`]: Consumption estimation and depletion forecasting
//! - [`alerts`]: Stock and expiry alert classification
//! - [`access`]: Sessions, roles and login
//! - [`clinical`]: Patients, consultations, prescriptions and dispensing
//! - [`export`]: Stock and forecast reports

pub mod access;
pub mod alerts;
pub mod analysis;
pub mod catalog;
pub mod clinical;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ffi;
pub mod ledger;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use access::{can, Action, Authenticator, Resource, SessionContext};
pub use alerts::{classify_lot, AlertCenter, AlertThresholds};
pub use analysis::{forecast, AnalysisPolicy, PredictiveAnalysis, UrgencyTier};
pub use catalog::MedicationCatalog;
pub use clinical::ClinicalRecords;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use db::Database;
pub use error::{AccessError, AnalysisError, InventoryError};
pub use export::{ReportExporter, ReportFormat, ReportKind};
pub use ffi::*;
pub use ledger::{InventoryLedger, TransferOutcome};
pub use models::{
    Lot, Medication, Movement, MovementKind, NewLot, Patient, Prescription, Role, StockChange,
    StorageLocation, User,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::export::ExportError;
use crate::models::{MovementFilter, PatientQuery, StockFilter};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedStockError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Forecast undefined: {0}")]
    UndefinedForecast(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for MedStockError {
    fn from(e: db::DbError) -> Self {
        if e.is_unavailable() {
            return MedStockError::StorageUnavailable(e.to_string());
        }
        match e {
            db::DbError::NotFound(what) => MedStockError::NotFound(what),
            other => MedStockError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AccessError> for MedStockError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::PermissionDenied { .. } => MedStockError::PermissionDenied(e.to_string()),
            AccessError::InvalidCredentials => MedStockError::AuthenticationFailed(e.to_string()),
            AccessError::Storage(db) => db.into(),
        }
    }
}

impl From<InventoryError> for MedStockError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::InsufficientStock { .. } => {
                MedStockError::InsufficientStock(e.to_string())
            }
            InventoryError::Validation { .. } => MedStockError::InvalidInput(e.to_string()),
            InventoryError::NotFound(what) => MedStockError::NotFound(what),
            InventoryError::Access(access) => access.into(),
            InventoryError::StorageUnavailable(msg) => MedStockError::StorageUnavailable(msg),
            InventoryError::Storage(db) => db.into(),
        }
    }
}

impl From<AnalysisError> for MedStockError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::UndefinedForecast { .. } | AnalysisError::NoConsumption(_) => {
                MedStockError::UndefinedForecast(e.to_string())
            }
            AnalysisError::NotFound(what) => MedStockError::NotFound(what),
            AnalysisError::Access(access) => access.into(),
            AnalysisError::StorageUnavailable(msg) => MedStockError::StorageUnavailable(msg),
            AnalysisError::Storage(db) => db.into(),
        }
    }
}

impl From<ExportError> for MedStockError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Access(e) => e.into(),
            ExportError::Inventory(e) => e.into(),
            ExportError::Analysis(e) => e.into(),
            ExportError::Json(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for MedStockError {
    fn from(e: serde_json::Error) -> Self {
        MedStockError::SerializationError(e.to_string())
    }
}

impl From<::config::ConfigError> for MedStockError {
    fn from(e: ::config::ConfigError) -> Self {
        MedStockError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedStockError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedStockError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path with default settings.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<MedStockCore>, MedStockError> {
    let db = Database::open(&path)?;
    MedStockCore::with_clock(db, Config::default(), Arc::new(SystemClock)).map(Arc::new)
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<MedStockCore>, MedStockError> {
    let db = Database::open_in_memory()?;
    MedStockCore::with_clock(db, Config::default(), Arc::new(SystemClock)).map(Arc::new)
}

/// Load configuration (defaults, optional file, `MEDSTOCK_*` environment)
/// and open the database it names.
#[uniffi::export]
pub fn open_with_config(config_path: Option<String>) -> Result<Arc<MedStockCore>, MedStockError> {
    let config = Config::load_from(config_path.as_deref().map(Path::new))?;
    let db = Database::open(&config.database.path)?;
    tracing::info!(path = %config.database.path, environment = %config.environment, "database opened");
    MedStockCore::with_clock(db, config, Arc::new(SystemClock)).map(Arc::new)
}

/// Install the tracing subscriber. Returns `false` if one was already set.
#[uniffi::export]
pub fn init_logging(filter: String) -> bool {
    telemetry::init_logging(&filter)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MedStockCore {
    db: Arc<Mutex<Database>>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl MedStockCore {
    /// Wrap an open database, seeding the default administrator when the
    /// database has none.
    pub fn with_clock(
        db: Database,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MedStockError> {
        config.validate()?;
        Authenticator::new(&db, clock.as_ref())
            .ensure_default_admin(&config.security.default_admin_password)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            clock,
            config,
        })
    }

    /// Rebuild the caller's session from the stored account.
    ///
    /// The account must still exist, be active and carry the session's id;
    /// the role always comes from storage.
    fn resolve(&self, db: &Database, session: &FfiSession) -> Result<SessionContext, MedStockError> {
        let user = db
            .get_user_by_username(&session.username)?
            .filter(|u| u.active && u.id == session.user_id)
            .ok_or_else(|| {
                tracing::warn!(username = %session.username, "stale session rejected");
                MedStockError::AuthenticationFailed("session is no longer valid".into())
            })?;
        Ok(SessionContext::new(user.id, user.username, user.full_name, user.role))
    }

    fn ledger<'a>(&'a self, db: &'a Database) -> InventoryLedger<'a> {
        InventoryLedger::new(db, self.clock.as_ref(), self.config.alert_thresholds())
    }

    fn analysis<'a>(&'a self, db: &'a Database) -> PredictiveAnalysis<'a> {
        PredictiveAnalysis::new(
            db,
            self.clock.as_ref(),
            self.config.analysis_policy(),
            self.config.alert_thresholds(),
        )
    }

    fn clinical<'a>(&'a self, db: &'a Database) -> ClinicalRecords<'a> {
        ClinicalRecords::new(db, self.clock.as_ref(), self.config.alert_thresholds())
    }
}

#[uniffi::export]
impl MedStockCore {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Check credentials and open a session.
    pub fn login(&self, username: String, password: String) -> Result<FfiSession, MedStockError> {
        let db = self.db.lock()?;
        let ctx = Authenticator::new(&db, self.clock.as_ref()).authenticate(&username, &password)?;
        Ok(FfiSession {
            user_id: ctx.user_id,
            username: ctx.username,
            full_name: ctx.full_name,
            role: ctx.role.as_str().to_string(),
        })
    }

    /// Create a staff account. `role` is one of "administrator", "pharmacist",
    /// "physician", "nurse".
    pub fn create_user(
        &self,
        session: FfiSession,
        username: String,
        password: String,
        full_name: String,
        email: Option<String>,
        role: String,
    ) -> Result<FfiUser, MedStockError> {
        let role = Role::parse(&role)
            .ok_or_else(|| MedStockError::InvalidInput(format!("unknown role: {}", role)))?;
        if username.trim().is_empty() || password.is_empty() {
            return Err(MedStockError::InvalidInput(
                "username and password are required".into(),
            ));
        }
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let user = Authenticator::new(&db, self.clock.as_ref())
            .create_user(&ctx, &username, &password, &full_name, email, role)?;
        Ok(user.into())
    }

    pub fn list_users(&self, session: FfiSession) -> Result<Vec<FfiUser>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let users = Authenticator::new(&db, self.clock.as_ref()).list_users(&ctx)?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    pub fn set_user_active(
        &self,
        session: FfiSession,
        user_id: String,
        active: bool,
    ) -> Result<(), MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        if !Authenticator::new(&db, self.clock.as_ref()).set_user_active(&ctx, &user_id, active)? {
            return Err(MedStockError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    pub fn create_medication(
        &self,
        session: FfiSession,
        input: FfiMedicationInput,
    ) -> Result<FfiMedication, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let mut medication = Medication::new(String::new(), self.clock.now());
        input.apply_to(&mut medication);
        let created = MedicationCatalog::new(&db).create(&ctx, medication)?;
        Ok(created.into())
    }

    pub fn update_medication(
        &self,
        session: FfiSession,
        id: String,
        input: FfiMedicationInput,
    ) -> Result<FfiMedication, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let catalog = MedicationCatalog::new(&db);
        let mut medication = catalog.get(&ctx, &id)?;
        input.apply_to(&mut medication);
        catalog.update(&ctx, &medication)?;
        Ok(medication.into())
    }

    pub fn deactivate_medication(&self, session: FfiSession, id: String) -> Result<(), MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(MedicationCatalog::new(&db).deactivate(&ctx, &id)?)
    }

    pub fn get_medication(&self, session: FfiSession, id: String) -> Result<FfiMedication, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(MedicationCatalog::new(&db).get(&ctx, &id)?.into())
    }

    pub fn list_medications(&self, session: FfiSession) -> Result<Vec<FfiMedication>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let meds = MedicationCatalog::new(&db).list(&ctx)?;
        Ok(meds.into_iter().map(Into::into).collect())
    }

    pub fn search_medications(
        &self,
        session: FfiSession,
        query: String,
    ) -> Result<Vec<FfiMedication>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let meds = MedicationCatalog::new(&db).search(&ctx, &query)?;
        Ok(meds.into_iter().map(Into::into).collect())
    }

    pub fn catalog_stats(&self, session: FfiSession) -> Result<FfiCatalogStats, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(MedicationCatalog::new(&db).stats(&ctx)?.into())
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    pub fn register_lot(&self, session: FfiSession, lot: FfiNewLot) -> Result<FfiLot, MedStockError> {
        let new_lot = NewLot::try_from(lot)?;
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.ledger(&db).register_lot(&ctx, new_lot)?.into())
    }

    /// Apply an entry, exit or adjustment. `change` is one of "entry", "exit",
    /// "adjustment_increase", "adjustment_decrease".
    pub fn record_movement(
        &self,
        session: FfiSession,
        lot_id: String,
        change: String,
        quantity: i64,
        reason: Option<String>,
    ) -> Result<FfiLot, MedStockError> {
        let change = StockChange::parse(&change)
            .ok_or_else(|| MedStockError::InvalidInput(format!("unknown movement: {}", change)))?;
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let lot = self
            .ledger(&db)
            .record_movement(&ctx, &lot_id, change, quantity, reason)?;
        Ok(lot.into())
    }

    pub fn transfer(
        &self,
        session: FfiSession,
        lot_id: String,
        destination: FfiStorageLocation,
        quantity: i64,
    ) -> Result<FfiTransferResult, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let outcome = self
            .ledger(&db)
            .transfer(&ctx, &lot_id, destination.into(), quantity)?;
        Ok(outcome.into())
    }

    /// Deactivate an emptied lot.
    pub fn retire_lot(&self, session: FfiSession, lot_id: String) -> Result<FfiLot, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.ledger(&db).retire_lot(&ctx, &lot_id)?.into())
    }

    pub fn audit_lot(&self, session: FfiSession, lot_id: String) -> Result<FfiLotAudit, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.ledger(&db).audit_lot(&ctx, &lot_id)?.into())
    }

    /// Movements between two dates (inclusive, `YYYY-MM-DD`), newest first.
    pub fn movement_history(
        &self,
        session: FfiSession,
        from: String,
        to: String,
        kind: Option<String>,
        medication_id: Option<String>,
    ) -> Result<Vec<FfiMovementRecord>, MedStockError> {
        let kind = match kind.as_deref() {
            None | Some("") => None,
            Some(k) => Some(
                MovementKind::parse(k)
                    .ok_or_else(|| MedStockError::InvalidInput(format!("unknown movement kind: {}", k)))?,
            ),
        };
        let filter = MovementFilter {
            from: ffi::parse_date("from", &from)?,
            to: ffi::parse_date("to", &to)?,
            kind,
            medication_id,
        };
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let records = self.ledger(&db).movement_history(&ctx, &filter)?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    pub fn stock_view(
        &self,
        session: FfiSession,
        filter: FfiStockFilter,
    ) -> Result<Vec<FfiStockRow>, MedStockError> {
        let filter = StockFilter::try_from(filter)?;
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let rows = self.ledger(&db).stock_view(&ctx, &filter)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    pub fn lot_alerts(&self, session: FfiSession) -> Result<Vec<FfiLotAlert>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let alerts = AlertCenter::new(&db, self.clock.as_ref(), self.config.alert_thresholds())
            .lot_alerts(&ctx)?;
        Ok(alerts.into_iter().map(Into::into).collect())
    }

    pub fn quick_alerts(&self, session: FfiSession) -> Result<FfiQuickAlerts, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let counts = AlertCenter::new(&db, self.clock.as_ref(), self.config.alert_thresholds())
            .quick_alerts(&ctx)?;
        Ok(counts.into())
    }

    pub fn smart_alerts(
        &self,
        session: FfiSession,
        unread_only: bool,
    ) -> Result<Vec<FfiSmartAlert>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let alerts = AlertCenter::new(&db, self.clock.as_ref(), self.config.alert_thresholds())
            .smart_alerts(&ctx, unread_only)?;
        Ok(alerts.into_iter().map(Into::into).collect())
    }

    pub fn mark_alert_read(&self, session: FfiSession, alert_id: String) -> Result<bool, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(AlertCenter::new(&db, self.clock.as_ref(), self.config.alert_thresholds())
            .mark_read(&ctx, &alert_id)?)
    }

    // =========================================================================
    // Predictive Analysis
    // =========================================================================

    /// Daily exits of a medication over the configured window.
    pub fn consumption_history(
        &self,
        session: FfiSession,
        medication_id: String,
    ) -> Result<Vec<FfiConsumptionSample>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let estimate = self.analysis(&db).estimate(&ctx, &medication_id)?;
        Ok(estimate.samples.into_iter().map(Into::into).collect())
    }

    pub fn forecast_medication(
        &self,
        session: FfiSession,
        medication_id: String,
    ) -> Result<FfiForecast, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.analysis(&db).forecast_medication(&ctx, &medication_id)?.into())
    }

    /// Forecasts ordered by days remaining. `tiers` holds tier names
    /// ("critical", "attention", "low", "normal"); empty means all.
    pub fn run_analysis(
        &self,
        session: FfiSession,
        category: Option<String>,
        tiers: Vec<String>,
    ) -> Result<Vec<FfiForecast>, MedStockError> {
        let tiers = tiers
            .iter()
            .map(|t| {
                UrgencyTier::parse(t)
                    .ok_or_else(|| MedStockError::InvalidInput(format!("unknown urgency tier: {}", t)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let filter = analysis::ForecastFilter {
            category: category.filter(|c| !c.trim().is_empty()),
            tiers,
        };
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let forecasts = self.analysis(&db).run(&ctx, &filter)?;
        Ok(forecasts.into_iter().map(Into::into).collect())
    }

    pub fn analysis_summary(&self, session: FfiSession) -> Result<FfiAnalysisSummary, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.analysis(&db).summary(&ctx)?.into())
    }

    pub fn forecast_alerts(&self, session: FfiSession) -> Result<Vec<FfiForecastAlert>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let alerts = self.analysis(&db).forecast_alerts(&ctx)?;
        Ok(alerts.into_iter().map(Into::into).collect())
    }

    /// Project current stock against a hypothetical daily rate.
    pub fn simulate_consumption(
        &self,
        session: FfiSession,
        medication_id: String,
        daily_rate: f64,
    ) -> Result<FfiProjection, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.analysis(&db).simulate(&ctx, &medication_id, daily_rate)?.into())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn create_patient(
        &self,
        session: FfiSession,
        input: FfiPatientInput,
    ) -> Result<FfiPatient, MedStockError> {
        let mut patient = Patient::new(String::new(), String::new(), self.clock.now());
        input.apply_to(&mut patient)?;
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).create_patient(&ctx, patient)?.into())
    }

    pub fn update_patient(
        &self,
        session: FfiSession,
        id: String,
        input: FfiPatientInput,
    ) -> Result<FfiPatient, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let records = self.clinical(&db);
        let mut patient = records.get_patient(&ctx, &id)?;
        input.apply_to(&mut patient)?;
        records.update_patient(&ctx, &patient)?;
        Ok(patient.into())
    }

    pub fn get_patient(&self, session: FfiSession, id: String) -> Result<FfiPatient, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).get_patient(&ctx, &id)?.into())
    }

    pub fn deactivate_patient(&self, session: FfiSession, id: String) -> Result<(), MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).deactivate_patient(&ctx, &id)?)
    }

    /// `age_bracket` is one of "child", "adolescent", "adult", "senior".
    pub fn search_patients(
        &self,
        session: FfiSession,
        text: Option<String>,
        health_plan: Option<String>,
        age_bracket: Option<String>,
        include_inactive: bool,
    ) -> Result<Vec<FfiPatient>, MedStockError> {
        let age_bracket = match age_bracket.as_deref() {
            None | Some("") => None,
            Some(b) => Some(
                models::AgeBracket::parse(b)
                    .ok_or_else(|| MedStockError::InvalidInput(format!("unknown age bracket: {}", b)))?,
            ),
        };
        let query = PatientQuery {
            text: text.filter(|t| !t.trim().is_empty()),
            health_plan: health_plan.filter(|p| !p.trim().is_empty()),
            age_bracket,
            include_inactive,
        };
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let patients = self.clinical(&db).search_patients(&ctx, &query)?;
        Ok(patients.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Consultations
    // =========================================================================

    pub fn schedule_consultation(
        &self,
        session: FfiSession,
        patient_id: String,
        scheduled_at: String,
        reason: Option<String>,
    ) -> Result<FfiConsultation, MedStockError> {
        let scheduled_at = ffi::parse_datetime("scheduled_at", &scheduled_at)?;
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let consultation =
            self.clinical(&db)
                .schedule_consultation(&ctx, &patient_id, scheduled_at, reason)?;
        Ok(consultation.into())
    }

    pub fn complete_consultation(
        &self,
        session: FfiSession,
        id: String,
        symptoms: Option<String>,
        diagnosis: String,
        notes: Option<String>,
    ) -> Result<FfiConsultation, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let consultation = self.clinical(&db).complete_consultation(
            &ctx,
            &id,
            symptoms.as_deref(),
            &diagnosis,
            notes.as_deref(),
        )?;
        Ok(consultation.into())
    }

    pub fn cancel_consultation(&self, session: FfiSession, id: String) -> Result<(), MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).cancel_consultation(&ctx, &id)?)
    }

    pub fn list_consultations(
        &self,
        session: FfiSession,
        patient_id: String,
    ) -> Result<Vec<FfiConsultation>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let consultations = self.clinical(&db).list_consultations(&ctx, &patient_id)?;
        Ok(consultations.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Prescriptions and Dispensing
    // =========================================================================

    pub fn issue_prescription(
        &self,
        session: FfiSession,
        prescription: FfiNewPrescription,
    ) -> Result<FfiPrescription, MedStockError> {
        let new_rx = models::NewPrescription::try_from(prescription)?;
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).issue_prescription(&ctx, new_rx)?.into())
    }

    pub fn cancel_prescription(&self, session: FfiSession, id: String) -> Result<(), MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).cancel_prescription(&ctx, &id)?)
    }

    pub fn get_prescription(
        &self,
        session: FfiSession,
        id: String,
    ) -> Result<FfiPrescription, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self.clinical(&db).get_prescription(&ctx, &id)?.into())
    }

    pub fn list_prescriptions(
        &self,
        session: FfiSession,
        patient_id: String,
    ) -> Result<Vec<FfiPrescription>, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let prescriptions = self.clinical(&db).list_prescriptions(&ctx, &patient_id)?;
        Ok(prescriptions.into_iter().map(Into::into).collect())
    }

    pub fn dispense(
        &self,
        session: FfiSession,
        item_id: String,
        lot_id: String,
        quantity: i64,
    ) -> Result<FfiDispensation, MedStockError> {
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        Ok(self
            .clinical(&db)
            .dispense(&ctx, &item_id, &lot_id, quantity)?
            .into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Render a report. `kind` is "stock" or "forecast", `format` is "json"
    /// or "csv".
    pub fn export_report(
        &self,
        session: FfiSession,
        kind: String,
        format: String,
    ) -> Result<String, MedStockError> {
        let kind = match kind.to_ascii_lowercase().as_str() {
            "stock" => ReportKind::Stock,
            "forecast" => ReportKind::Forecast,
            other => return Err(MedStockError::InvalidInput(format!("unknown report: {}", other))),
        };
        let format = match format.to_ascii_lowercase().as_str() {
            "json" => ReportFormat::Json,
            "csv" => ReportFormat::Csv,
            other => return Err(MedStockError::InvalidInput(format!("unknown format: {}", other))),
        };
        let db = self.db.lock()?;
        let ctx = self.resolve(&db, &session)?;
        let exporter = ReportExporter::new(
            &db,
            self.clock.as_ref(),
            self.config.analysis_policy(),
            self.config.alert_thresholds(),
        );
        Ok(exporter.export(&ctx, kind, format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn core() -> MedStockCore {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        MedStockCore::with_clock(
            Database::open_in_memory().unwrap(),
            Config::default(),
            Arc::new(clock),
        )
        .unwrap()
    }

    #[test]
    fn test_default_admin_login() {
        let core = core();
        let session = core.login("admin".into(), "admin123".into()).unwrap();
        assert_eq!(session.role, "administrator");

        assert!(matches!(
            core.login("admin".into(), "wrong".into()),
            Err(MedStockError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_session_role_comes_from_storage() {
        let core = core();
        let admin = core.login("admin".into(), "admin123".into()).unwrap();
        core.create_user(
            admin.clone(),
            "nina".into(),
            "pw".into(),
            "Nina Nurse".into(),
            None,
            "nurse".into(),
        )
        .unwrap();

        let mut nurse = core.login("nina".into(), "pw".into()).unwrap();
        nurse.role = "administrator".into();
        assert!(matches!(
            core.list_users(nurse.clone()),
            Err(MedStockError::PermissionDenied(_))
        ));

        let forged = FfiSession {
            user_id: "someone-else".into(),
            ..nurse
        };
        assert!(matches!(
            core.list_medications(forged),
            Err(MedStockError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_bad_enum_strings_are_invalid_input() {
        let core = core();
        let admin = core.login("admin".into(), "admin123".into()).unwrap();
        assert!(matches!(
            core.record_movement(admin.clone(), "lot".into(), "borrow".into(), 1, None),
            Err(MedStockError::InvalidInput(_))
        ));
        assert!(matches!(
            core.export_report(admin.clone(), "stock".into(), "xml".into()),
            Err(MedStockError::InvalidInput(_))
        ));
        assert!(matches!(
            core.run_analysis(admin, None, vec!["dire".into()]),
            Err(MedStockError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_mapping() {
        let err: MedStockError = InventoryError::InsufficientStock {
            lot_id: "l".into(),
            requested: 5,
            available: 2,
        }
        .into();
        assert!(matches!(err, MedStockError::InsufficientStock(_)));

        let err: MedStockError = AnalysisError::UndefinedForecast { rate: 0.0 }.into();
        assert!(matches!(err, MedStockError::UndefinedForecast(_)));

        let err: MedStockError = db::DbError::NotFound("lot x".into()).into();
        assert!(matches!(err, MedStockError::NotFound(ref s) if s == "lot x"));
    }
}
