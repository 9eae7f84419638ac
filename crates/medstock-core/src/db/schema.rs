//! SQLite schema definition.

/// Complete database schema for medstock.
///
/// Dates are stored as `YYYY-MM-DD` text and timestamps as
/// `YYYY-MM-DD HH:MM:SS[.fff]` text so that SQLite date functions and
/// lexicographic comparison both work.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Users
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,                 -- hex SHA-256
    full_name TEXT NOT NULL,
    email TEXT,
    role TEXT NOT NULL,                          -- administrator | pharmacist | physician | nurse
    active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT,
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Medications
-- ============================================================================

CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    active_ingredient TEXT,
    concentration TEXT,
    dosage_form TEXT,
    route TEXT,
    manufacturer TEXT,
    category TEXT,
    barcode TEXT,
    controlled INTEGER NOT NULL DEFAULT 0,
    refrigerated INTEGER NOT NULL DEFAULT 0,
    prescription_required INTEGER NOT NULL DEFAULT 1,
    notes TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    registered_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_medications_name ON medications(name);
CREATE INDEX IF NOT EXISTS idx_medications_category ON medications(category);

-- ============================================================================
-- Lots
-- ============================================================================

CREATE TABLE IF NOT EXISTS lots (
    id TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL REFERENCES medications(id),
    lot_number TEXT NOT NULL,
    manufactured_on TEXT,
    expires_on TEXT NOT NULL,
    initial_quantity INTEGER NOT NULL CHECK (initial_quantity > 0),
    current_quantity INTEGER NOT NULL,
    unit_price REAL,
    supplier TEXT,
    site TEXT NOT NULL,
    sector TEXT,
    shelf TEXT,
    slot TEXT,
    notes TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    received_by TEXT,
    received_at TEXT NOT NULL,
    CHECK (current_quantity >= 0 AND current_quantity <= initial_quantity)
);

CREATE INDEX IF NOT EXISTS idx_lots_medication ON lots(medication_id);
CREATE INDEX IF NOT EXISTS idx_lots_expires_on ON lots(expires_on);

-- ============================================================================
-- Movements (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS movements (
    id TEXT PRIMARY KEY,
    lot_id TEXT NOT NULL REFERENCES lots(id),
    kind TEXT NOT NULL,                          -- entry | exit | adjustment | transfer
    direction TEXT NOT NULL,                     -- in | out
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    reason TEXT,
    responsible TEXT,
    occurred_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_movements_lot ON movements(lot_id, occurred_at);
CREATE INDEX IF NOT EXISTS idx_movements_occurred_at ON movements(occurred_at);

CREATE TRIGGER IF NOT EXISTS movements_no_update BEFORE UPDATE ON movements BEGIN
    SELECT RAISE(ABORT, 'movements are append-only');
END;

CREATE TRIGGER IF NOT EXISTS movements_no_delete BEFORE DELETE ON movements BEGIN
    SELECT RAISE(ABORT, 'movements are append-only');
END;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    document_number TEXT NOT NULL UNIQUE,
    birth_date TEXT,
    sex TEXT,
    phone TEXT,
    email TEXT,
    city TEXT,
    health_plan TEXT,
    allergies TEXT,
    continuous_medications TEXT,
    notes TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(full_name);

-- ============================================================================
-- Consultations
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultations (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    physician_id TEXT NOT NULL REFERENCES users(id),
    scheduled_at TEXT NOT NULL,
    reason TEXT,
    symptoms TEXT,
    diagnosis TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'scheduled',    -- scheduled | completed | cancelled
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_consultations_patient ON consultations(patient_id);

-- ============================================================================
-- Prescriptions
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    physician_id TEXT NOT NULL REFERENCES users(id),
    consultation_id TEXT REFERENCES consultations(id),
    issued_at TEXT NOT NULL,
    valid_until TEXT,
    status TEXT NOT NULL DEFAULT 'active',       -- active | dispensed | cancelled
    notes TEXT
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);

CREATE TABLE IF NOT EXISTS prescription_items (
    id TEXT PRIMARY KEY,
    prescription_id TEXT NOT NULL REFERENCES prescriptions(id),
    medication_id TEXT NOT NULL REFERENCES medications(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    dosage_instructions TEXT
);

CREATE INDEX IF NOT EXISTS idx_prescription_items_rx ON prescription_items(prescription_id);

CREATE TABLE IF NOT EXISTS dispensations (
    id TEXT PRIMARY KEY,
    prescription_item_id TEXT NOT NULL REFERENCES prescription_items(id),
    lot_id TEXT NOT NULL REFERENCES lots(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    dispensed_by TEXT,
    dispensed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dispensations_item ON dispensations(prescription_item_id);

-- ============================================================================
-- Smart Alerts
-- ============================================================================

CREATE TABLE IF NOT EXISTS smart_alerts (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    priority TEXT NOT NULL,                      -- attention | urgent
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    medication_id TEXT REFERENCES medications(id),
    read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_smart_alerts_unread ON smart_alerts(read, created_at);
"#;
