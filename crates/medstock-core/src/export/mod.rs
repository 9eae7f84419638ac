//! Report export in JSON and CSV.

mod report;

pub use report::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::{Action, Resource, SessionContext};
use crate::alerts::AlertThresholds;
use crate::analysis::{AnalysisPolicy, ForecastFilter, PredictiveAnalysis};
use crate::clock::Clock;
use crate::db::Database;
use crate::error::{AccessError, AnalysisError, InventoryError};
use crate::ledger::InventoryLedger;
use crate::models::StockFilter;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format of an exported report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

/// Which report to export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportKind {
    Stock,
    Forecast,
}

/// Builds reports from live stock and forecasts.
pub struct ReportExporter<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    policy: AnalysisPolicy,
    thresholds: AlertThresholds,
}

impl<'a> ReportExporter<'a> {
    pub fn new(
        db: &'a Database,
        clock: &'a dyn Clock,
        policy: AnalysisPolicy,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            db,
            clock,
            policy,
            thresholds,
        }
    }

    /// Stock position of every active lot.
    pub fn stock_report(&self, ctx: &SessionContext) -> ExportResult<StockReport> {
        ctx.require(Resource::Reports, Action::View)?;
        let rows = InventoryLedger::new(self.db, self.clock, self.thresholds)
            .stock_view(ctx, &StockFilter::default())?;
        Ok(StockReport::new(self.exported_at(), ctx.username.clone(), &rows))
    }

    /// Forecast of every medication with consumption history.
    pub fn forecast_report(&self, ctx: &SessionContext) -> ExportResult<ForecastReport> {
        ctx.require(Resource::Reports, Action::View)?;
        let forecasts = PredictiveAnalysis::new(self.db, self.clock, self.policy, self.thresholds)
            .run(ctx, &ForecastFilter::default())?;
        Ok(ForecastReport::new(
            self.exported_at(),
            ctx.username.clone(),
            self.policy.window_days,
            &forecasts,
        ))
    }

    /// Render a report for download. Requires `reports:export`.
    pub fn export(
        &self,
        ctx: &SessionContext,
        kind: ReportKind,
        format: ReportFormat,
    ) -> ExportResult<String> {
        ctx.require(Resource::Reports, Action::Export)?;

        let rendered = match (kind, format) {
            (ReportKind::Stock, ReportFormat::Json) => self.stock_report(ctx)?.to_json()?,
            (ReportKind::Stock, ReportFormat::Csv) => self.stock_report(ctx)?.to_csv(),
            (ReportKind::Forecast, ReportFormat::Json) => self.forecast_report(ctx)?.to_json()?,
            (ReportKind::Forecast, ReportFormat::Csv) => self.forecast_report(ctx)?.to_csv(),
        };

        tracing::info!(by = %ctx.username, ?kind, ?format, bytes = rendered.len(), "report exported");
        Ok(rendered)
    }

    fn exported_at(&self) -> String {
        self.clock.now().format(EXPORTED_AT_FORMAT).to_string()
    }
}

/// Escape a string for CSV output.
pub(crate) fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Medication, NewLot, Role, StorageLocation};
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_export_requires_export_permission() {
        let db = Database::open_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let clock = FixedClock::at_date(today);
        let med = Medication::new("Dipyrone".into(), clock.now());
        db.insert_medication(&med).unwrap();
        let lot = NewLot::new(
            med.id.clone(),
            "L1",
            today + Duration::days(90),
            40,
            StorageLocation::new("Central Pharmacy"),
        )
        .into_lot(None, clock.now());
        db.insert_lot(&lot).unwrap();

        let exporter = ReportExporter::new(
            &db,
            &clock,
            AnalysisPolicy::default(),
            AlertThresholds::default(),
        );

        let pharmacist = SessionContext::new("u1", "ana", "Ana", Role::Pharmacist);
        assert_eq!(exporter.stock_report(&pharmacist).unwrap().lines.len(), 1);
        assert!(matches!(
            exporter.export(&pharmacist, ReportKind::Stock, ReportFormat::Csv),
            Err(ExportError::Access(_))
        ));

        let admin = SessionContext::new("u0", "admin", "Admin", Role::Administrator);
        let csv = exporter
            .export(&admin, ReportKind::Stock, ReportFormat::Csv)
            .unwrap();
        assert_eq!(csv.lines().count(), 2);

        let json = exporter
            .export(&admin, ReportKind::Forecast, ReportFormat::Json)
            .unwrap();
        assert!(json.contains("\"exported_at\": \"2024-09-01 12:00:00\""));
        assert!(json.contains("\"lines\": []"));
    }
}
