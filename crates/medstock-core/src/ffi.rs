//! FFI-safe records exchanged with the UI shell.
//!
//! Dates cross the boundary as strings (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`)
//! and enums as their lowercase names.

use chrono::{NaiveDate, NaiveDateTime};

use crate::alerts::{ForecastAlert, LotAlert};
use crate::analysis::{AnalysisSummary, ConsumptionSample, DepletionProjection, Forecast};
use crate::ledger::TransferOutcome;
use crate::models::{
    CatalogStats, Consultation, Dispensation, Lot, LotAudit, Medication, MovementRecord, NewLot,
    NewPrescription, NewPrescriptionItem, Patient, Prescription, PrescriptionItem, QuickAlerts,
    SmartAlert, StockFilter, StockRow, StockStatusFilter, StorageLocation, User,
};
use crate::MedStockError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, MedStockError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        MedStockError::InvalidInput(format!("{}: expected YYYY-MM-DD, got {:?}", field, value))
    })
}

pub(crate) fn parse_optional_date(
    field: &str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, MedStockError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

pub(crate) fn parse_datetime(field: &str, value: &str) -> Result<NaiveDateTime, MedStockError> {
    ACCEPTED_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| {
            MedStockError::InvalidInput(format!(
                "{}: expected YYYY-MM-DD HH:MM[:SS], got {:?}",
                field, value
            ))
        })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_datetime(at: NaiveDateTime) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

// =========================================================================
// Accounts
// =========================================================================

/// An authenticated session held by the UI shell.
///
/// The core re-checks the account on every call, so a stale or edited
/// session cannot raise its own role.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub role: String,
}

/// FFI-safe staff account (never carries the password digest).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl From<User> for FfiUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            role: user.role.as_str().to_string(),
            active: user.active,
            last_login: user.last_login.map(format_datetime),
            created_at: format_datetime(user.created_at),
        }
    }
}

// =========================================================================
// Catalog
// =========================================================================

/// Editable medication attributes.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationInput {
    pub name: String,
    pub active_ingredient: Option<String>,
    pub concentration: Option<String>,
    pub dosage_form: Option<String>,
    pub route: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub controlled: bool,
    pub refrigerated: bool,
    pub prescription_required: bool,
    pub notes: Option<String>,
}

impl FfiMedicationInput {
    /// Copy the editable attributes onto `medication`.
    pub(crate) fn apply_to(self, medication: &mut Medication) {
        medication.name = self.name;
        medication.active_ingredient = self.active_ingredient;
        medication.concentration = self.concentration;
        medication.dosage_form = self.dosage_form;
        medication.route = self.route;
        medication.manufacturer = self.manufacturer;
        medication.category = self.category;
        medication.barcode = self.barcode;
        medication.controlled = self.controlled;
        medication.refrigerated = self.refrigerated;
        medication.prescription_required = self.prescription_required;
        medication.notes = self.notes;
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub name: String,
    pub active_ingredient: Option<String>,
    pub concentration: Option<String>,
    pub dosage_form: Option<String>,
    pub route: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub controlled: bool,
    pub refrigerated: bool,
    pub prescription_required: bool,
    pub notes: Option<String>,
    pub active: bool,
    pub registered_by: Option<String>,
    pub created_at: String,
}

impl From<Medication> for FfiMedication {
    fn from(med: Medication) -> Self {
        Self {
            id: med.id,
            name: med.name,
            active_ingredient: med.active_ingredient,
            concentration: med.concentration,
            dosage_form: med.dosage_form,
            route: med.route,
            manufacturer: med.manufacturer,
            category: med.category,
            barcode: med.barcode,
            controlled: med.controlled,
            refrigerated: med.refrigerated,
            prescription_required: med.prescription_required,
            notes: med.notes,
            active: med.active,
            registered_by: med.registered_by,
            created_at: format_datetime(med.created_at),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCatalogStats {
    pub active: i64,
    pub controlled: i64,
    pub refrigerated: i64,
    pub by_category: Vec<FfiCategoryCount>,
}

impl From<CatalogStats> for FfiCatalogStats {
    fn from(stats: CatalogStats) -> Self {
        Self {
            active: stats.active,
            controlled: stats.controlled,
            refrigerated: stats.refrigerated,
            by_category: stats
                .by_category
                .into_iter()
                .map(|(category, count)| FfiCategoryCount { category, count })
                .collect(),
        }
    }
}

// =========================================================================
// Lots and movements
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStorageLocation {
    pub site: String,
    pub sector: Option<String>,
    pub shelf: Option<String>,
    pub slot: Option<String>,
}

impl From<StorageLocation> for FfiStorageLocation {
    fn from(loc: StorageLocation) -> Self {
        Self {
            site: loc.site,
            sector: loc.sector,
            shelf: loc.shelf,
            slot: loc.slot,
        }
    }
}

impl From<FfiStorageLocation> for StorageLocation {
    fn from(loc: FfiStorageLocation) -> Self {
        StorageLocation {
            site: loc.site,
            sector: loc.sector,
            shelf: loc.shelf,
            slot: loc.slot,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewLot {
    pub medication_id: String,
    pub lot_number: String,
    pub manufactured_on: Option<String>,
    pub expires_on: String,
    pub quantity: i64,
    pub unit_price: Option<f64>,
    pub supplier: Option<String>,
    pub location: FfiStorageLocation,
    pub notes: Option<String>,
}

impl TryFrom<FfiNewLot> for NewLot {
    type Error = MedStockError;

    fn try_from(lot: FfiNewLot) -> Result<Self, Self::Error> {
        Ok(NewLot {
            medication_id: lot.medication_id,
            lot_number: lot.lot_number,
            manufactured_on: parse_optional_date("manufactured_on", lot.manufactured_on)?,
            expires_on: parse_date("expires_on", &lot.expires_on)?,
            quantity: lot.quantity,
            unit_price: lot.unit_price,
            supplier: lot.supplier,
            location: lot.location.into(),
            notes: lot.notes,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLot {
    pub id: String,
    pub medication_id: String,
    pub lot_number: String,
    pub manufactured_on: Option<String>,
    pub expires_on: String,
    pub initial_quantity: i64,
    pub current_quantity: i64,
    pub unit_price: Option<f64>,
    pub supplier: Option<String>,
    pub location: FfiStorageLocation,
    pub notes: Option<String>,
    pub active: bool,
    pub received_by: Option<String>,
    pub received_at: String,
}

impl From<Lot> for FfiLot {
    fn from(lot: Lot) -> Self {
        Self {
            id: lot.id,
            medication_id: lot.medication_id,
            lot_number: lot.lot_number,
            manufactured_on: lot.manufactured_on.map(format_date),
            expires_on: format_date(lot.expires_on),
            initial_quantity: lot.initial_quantity,
            current_quantity: lot.current_quantity,
            unit_price: lot.unit_price,
            supplier: lot.supplier,
            location: lot.location.into(),
            notes: lot.notes,
            active: lot.active,
            received_by: lot.received_by,
            received_at: format_datetime(lot.received_at),
        }
    }
}

/// `destination` is set only when the transfer split the lot.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransferResult {
    pub source: FfiLot,
    pub destination: Option<FfiLot>,
}

impl From<TransferOutcome> for FfiTransferResult {
    fn from(outcome: TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Relocated(lot) => Self {
                source: lot.into(),
                destination: None,
            },
            TransferOutcome::Split {
                source,
                destination,
            } => Self {
                source: source.into(),
                destination: Some(destination.into()),
            },
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLotAudit {
    pub lot_id: String,
    pub stored_quantity: i64,
    pub replayed_quantity: i64,
    pub movement_count: u32,
    pub consistent: bool,
}

impl From<LotAudit> for FfiLotAudit {
    fn from(audit: LotAudit) -> Self {
        Self {
            consistent: audit.is_consistent(),
            lot_id: audit.lot_id,
            stored_quantity: audit.stored_quantity,
            replayed_quantity: audit.replayed_quantity,
            movement_count: audit.movement_count as u32,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMovementRecord {
    pub id: String,
    pub lot_id: String,
    pub lot_number: String,
    pub medication_id: String,
    pub medication_name: String,
    pub kind: String,
    pub direction: String,
    pub quantity: i64,
    pub reason: Option<String>,
    pub responsible: Option<String>,
    pub occurred_at: String,
}

impl From<MovementRecord> for FfiMovementRecord {
    fn from(record: MovementRecord) -> Self {
        let movement = record.movement;
        Self {
            id: movement.id,
            lot_id: movement.lot_id,
            lot_number: record.lot_number,
            medication_id: record.medication_id,
            medication_name: record.medication_name,
            kind: movement.kind.as_str().to_string(),
            direction: movement.direction.as_str().to_string(),
            quantity: movement.quantity,
            reason: movement.reason,
            responsible: movement.responsible,
            occurred_at: format_datetime(movement.occurred_at),
        }
    }
}

// =========================================================================
// Stock view and alerts
// =========================================================================

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiStockFilter {
    pub search_term: Option<String>,
    pub category: Option<String>,
    /// "in_stock", "low_stock", "out_of_stock" or "near_expiry"
    pub status: Option<String>,
    pub location: Option<String>,
    pub sector: Option<String>,
}

impl TryFrom<FfiStockFilter> for StockFilter {
    type Error = MedStockError;

    fn try_from(filter: FfiStockFilter) -> Result<Self, Self::Error> {
        let status = match filter.status.as_deref() {
            None | Some("") => None,
            Some(s) => Some(StockStatusFilter::parse(s).ok_or_else(|| {
                MedStockError::InvalidInput(format!("unknown stock status: {}", s))
            })?),
        };
        Ok(StockFilter {
            search_term: filter.search_term.filter(|s| !s.trim().is_empty()),
            category: filter.category,
            status,
            location: filter.location.filter(|s| !s.trim().is_empty()),
            sector: filter.sector.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStockRow {
    pub lot_id: String,
    pub medication_id: String,
    pub medication_name: String,
    pub active_ingredient: Option<String>,
    pub category: Option<String>,
    pub controlled: bool,
    pub lot_number: String,
    pub expires_on: String,
    pub quantity: i64,
    pub site: String,
    pub sector: Option<String>,
    pub shelf: Option<String>,
    pub slot: Option<String>,
    pub days_to_expiry: i64,
    pub status: String,
}

impl From<StockRow> for FfiStockRow {
    fn from(row: StockRow) -> Self {
        Self {
            lot_id: row.lot_id,
            medication_id: row.medication_id,
            medication_name: row.medication_name,
            active_ingredient: row.active_ingredient,
            category: row.category,
            controlled: row.controlled,
            lot_number: row.lot_number,
            expires_on: format_date(row.expires_on),
            quantity: row.quantity,
            site: row.site,
            sector: row.sector,
            shelf: row.shelf,
            slot: row.slot,
            days_to_expiry: row.days_to_expiry,
            status: row.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQuickAlerts {
    pub near_expiry: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

impl From<QuickAlerts> for FfiQuickAlerts {
    fn from(counts: QuickAlerts) -> Self {
        Self {
            near_expiry: counts.near_expiry,
            low_stock: counts.low_stock,
            out_of_stock: counts.out_of_stock,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLotAlert {
    pub lot_id: String,
    pub medication_id: String,
    pub lot_number: String,
    pub quantity: i64,
    /// "out_of_stock", "low_stock", "near_expiry"
    pub kinds: Vec<String>,
    /// Highest severity among `kinds`
    pub severity: String,
}

impl From<LotAlert> for FfiLotAlert {
    fn from(alert: LotAlert) -> Self {
        let severity = alert
            .kinds
            .iter()
            .map(|k| k.severity())
            .max()
            .map(|s| s.as_str())
            .unwrap_or("warning")
            .to_string();
        Self {
            lot_id: alert.lot_id,
            medication_id: alert.medication_id,
            lot_number: alert.lot_number,
            quantity: alert.quantity,
            kinds: alert.kinds.iter().map(|k| k.label().to_string()).collect(),
            severity,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSmartAlert {
    pub id: String,
    pub category: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub medication_id: Option<String>,
    pub read: bool,
    pub created_at: String,
}

impl From<SmartAlert> for FfiSmartAlert {
    fn from(alert: SmartAlert) -> Self {
        Self {
            id: alert.id,
            category: alert.category,
            priority: alert.priority.as_str().to_string(),
            title: alert.title,
            message: alert.message,
            medication_id: alert.medication_id,
            read: alert.read,
            created_at: format_datetime(alert.created_at),
        }
    }
}

// =========================================================================
// Analysis
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConsumptionSample {
    pub date: String,
    pub quantity: i64,
}

impl From<ConsumptionSample> for FfiConsumptionSample {
    fn from(sample: ConsumptionSample) -> Self {
        Self {
            date: format_date(sample.date),
            quantity: sample.quantity,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiForecast {
    pub medication_id: String,
    pub medication_name: String,
    pub category: Option<String>,
    pub current_stock: i64,
    pub mean_daily_consumption: f64,
    pub days_remaining: f64,
    pub stockout_date: String,
    pub tier: String,
    pub notes: Vec<String>,
}

impl From<Forecast> for FfiForecast {
    fn from(forecast: Forecast) -> Self {
        Self {
            notes: forecast.notes.iter().map(|n| n.describe()).collect(),
            medication_id: forecast.medication_id,
            medication_name: forecast.medication_name,
            category: forecast.category,
            current_stock: forecast.current_stock,
            mean_daily_consumption: forecast.mean_daily_consumption,
            days_remaining: forecast.days_remaining,
            stockout_date: format_date(forecast.stockout_date),
            tier: forecast.tier.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProjection {
    pub days_remaining: f64,
    pub stockout_date: String,
    pub tier: String,
}

impl From<DepletionProjection> for FfiProjection {
    fn from(projection: DepletionProjection) -> Self {
        Self {
            days_remaining: projection.days_remaining,
            stockout_date: format_date(projection.stockout_date),
            tier: projection.tier.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnalysisSummary {
    pub analyzed: i64,
    pub critical_stock: i64,
    pub low_movement: i64,
    pub urgent: i64,
}

impl From<AnalysisSummary> for FfiAnalysisSummary {
    fn from(summary: AnalysisSummary) -> Self {
        Self {
            analyzed: summary.analyzed,
            critical_stock: summary.critical_stock,
            low_movement: summary.low_movement,
            urgent: summary.urgent,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiForecastAlert {
    pub medication_id: String,
    pub severity: String,
    pub title: String,
    pub message: String,
}

impl From<ForecastAlert> for FfiForecastAlert {
    fn from(alert: ForecastAlert) -> Self {
        Self {
            medication_id: alert.medication_id,
            severity: alert.severity.as_str().to_string(),
            title: alert.title,
            message: alert.message,
        }
    }
}

// =========================================================================
// Clinical records
// =========================================================================

/// Editable patient attributes.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub full_name: String,
    pub document_number: String,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub health_plan: Option<String>,
    pub allergies: Option<String>,
    pub continuous_medications: Option<String>,
    pub notes: Option<String>,
}

impl FfiPatientInput {
    /// Copy the editable attributes onto `patient`.
    pub(crate) fn apply_to(self, patient: &mut Patient) -> Result<(), MedStockError> {
        patient.birth_date = parse_optional_date("birth_date", self.birth_date)?;
        patient.full_name = self.full_name;
        patient.document_number = self.document_number;
        patient.sex = self.sex;
        patient.phone = self.phone;
        patient.email = self.email;
        patient.city = self.city;
        patient.health_plan = self.health_plan;
        patient.allergies = self.allergies;
        patient.continuous_medications = self.continuous_medications;
        patient.notes = self.notes;
        Ok(())
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub full_name: String,
    pub document_number: String,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub health_plan: Option<String>,
    pub allergies: Option<String>,
    pub continuous_medications: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            full_name: patient.full_name,
            document_number: patient.document_number,
            birth_date: patient.birth_date.map(format_date),
            sex: patient.sex,
            phone: patient.phone,
            email: patient.email,
            city: patient.city,
            health_plan: patient.health_plan,
            allergies: patient.allergies,
            continuous_medications: patient.continuous_medications,
            notes: patient.notes,
            active: patient.active,
            created_at: format_datetime(patient.created_at),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConsultation {
    pub id: String,
    pub patient_id: String,
    pub physician_id: String,
    pub scheduled_at: String,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<Consultation> for FfiConsultation {
    fn from(c: Consultation) -> Self {
        Self {
            id: c.id,
            patient_id: c.patient_id,
            physician_id: c.physician_id,
            scheduled_at: format_datetime(c.scheduled_at),
            reason: c.reason,
            symptoms: c.symptoms,
            diagnosis: c.diagnosis,
            notes: c.notes,
            status: format!("{:?}", c.status),
            created_at: format_datetime(c.created_at),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPrescriptionItem {
    pub medication_id: String,
    pub quantity: i64,
    pub dosage_instructions: Option<String>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPrescription {
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub valid_until: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<FfiNewPrescriptionItem>,
}

impl TryFrom<FfiNewPrescription> for NewPrescription {
    type Error = MedStockError;

    fn try_from(rx: FfiNewPrescription) -> Result<Self, Self::Error> {
        Ok(NewPrescription {
            patient_id: rx.patient_id,
            consultation_id: rx.consultation_id,
            valid_until: parse_optional_date("valid_until", rx.valid_until)?,
            notes: rx.notes,
            items: rx
                .items
                .into_iter()
                .map(|item| NewPrescriptionItem {
                    medication_id: item.medication_id,
                    quantity: item.quantity,
                    dosage_instructions: item.dosage_instructions,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionItem {
    pub id: String,
    pub medication_id: String,
    pub quantity: i64,
    pub dosage_instructions: Option<String>,
    pub dispensed_quantity: i64,
    pub remaining: i64,
}

impl From<PrescriptionItem> for FfiPrescriptionItem {
    fn from(item: PrescriptionItem) -> Self {
        Self {
            remaining: item.remaining(),
            id: item.id,
            medication_id: item.medication_id,
            quantity: item.quantity,
            dosage_instructions: item.dosage_instructions,
            dispensed_quantity: item.dispensed_quantity,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub id: String,
    pub patient_id: String,
    pub physician_id: String,
    pub consultation_id: Option<String>,
    pub issued_at: String,
    pub valid_until: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub items: Vec<FfiPrescriptionItem>,
}

impl From<Prescription> for FfiPrescription {
    fn from(rx: Prescription) -> Self {
        Self {
            id: rx.id,
            patient_id: rx.patient_id,
            physician_id: rx.physician_id,
            consultation_id: rx.consultation_id,
            issued_at: format_datetime(rx.issued_at),
            valid_until: rx.valid_until.map(format_date),
            status: format!("{:?}", rx.status),
            notes: rx.notes,
            items: rx.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDispensation {
    pub id: String,
    pub prescription_item_id: String,
    pub lot_id: String,
    pub quantity: i64,
    pub dispensed_by: Option<String>,
    pub dispensed_at: String,
}

impl From<Dispensation> for FfiDispensation {
    fn from(d: Dispensation) -> Self {
        Self {
            id: d.id,
            prescription_item_id: d.prescription_item_id,
            lot_id: d.lot_id,
            quantity: d.quantity,
            dispensed_by: d.dispensed_by,
            dispensed_at: format_datetime(d.dispensed_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dates() {
        assert_eq!(
            parse_date("d", "2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(
            parse_date("d", "01/03/2024"),
            Err(MedStockError::InvalidInput(_))
        ));
        assert_eq!(parse_optional_date("d", Some("  ".into())).unwrap(), None);

        let at = parse_datetime("at", "2024-03-01T14:30").unwrap();
        assert_eq!(format_datetime(at), "2024-03-01 14:30:00");
    }

    #[test]
    fn test_stock_filter_status() {
        let filter = FfiStockFilter {
            status: Some("low_stock".into()),
            search_term: Some("  ".into()),
            ..Default::default()
        };
        let parsed = StockFilter::try_from(filter).unwrap();
        assert_eq!(parsed.status, Some(StockStatusFilter::LowStock));
        assert_eq!(parsed.search_term, None);

        let bad = FfiStockFilter {
            status: Some("sold_out".into()),
            ..Default::default()
        };
        assert!(StockFilter::try_from(bad).is_err());
    }
}
