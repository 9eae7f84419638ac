//! Predictive stock analysis.
//!
//! Turns the movement log into per-medication consumption estimates, projects
//! when each medication runs out and attaches advisory notes. Nothing here is
//! persisted: forecasts are recomputed on every call.

mod estimator;
mod forecaster;

pub use estimator::*;
pub use forecaster::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::access::{Action, Resource, SessionContext};
use crate::alerts::{forecast_alert, AlertThresholds, ForecastAlert};
use crate::clock::Clock;
use crate::db::{Database, StockLevel};
use crate::error::{AnalysisError, AnalysisResult};

/// Medications with this many movements or fewer count as low-movement.
pub const LOW_MOVEMENT_COUNT: i64 = 2;

/// Tunable parameters of the analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisPolicy {
    pub window_days: i64,
    pub restock_horizon_days: i64,
    pub sparse_history_samples: usize,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            restock_horizon_days: RESTOCK_HORIZON_DAYS,
            sparse_history_samples: SPARSE_HISTORY_SAMPLES,
        }
    }
}

impl AnalysisPolicy {
    fn note_policy(&self) -> NotePolicy {
        NotePolicy {
            restock_horizon_days: self.restock_horizon_days,
            sparse_history_samples: self.sparse_history_samples,
        }
    }
}

/// Depletion forecast for one medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub medication_id: String,
    pub medication_name: String,
    pub category: Option<String>,
    pub current_stock: i64,
    pub mean_daily_consumption: f64,
    pub days_remaining: f64,
    pub stockout_date: NaiveDate,
    pub tier: UrgencyTier,
    pub notes: Vec<ForecastNote>,
}

/// Narrow a forecast run by category and/or urgency tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForecastFilter {
    pub category: Option<String>,
    /// Empty means every tier
    pub tiers: Vec<UrgencyTier>,
}

impl ForecastFilter {
    fn accepts_category(&self, category: Option<&str>) -> bool {
        match &self.category {
            Some(wanted) => category == Some(wanted.as_str()),
            None => true,
        }
    }

    fn accepts_tier(&self, tier: UrgencyTier) -> bool {
        self.tiers.is_empty() || self.tiers.contains(&tier)
    }
}

/// Dashboard figures for the analysis page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Candidates considered, including those without a forecast
    pub analyzed: i64,
    /// Candidates whose stock is at or below the low-stock threshold
    pub critical_stock: i64,
    /// Candidates with at most two recorded movements
    pub low_movement: i64,
    /// Forecasts in the Critical or Attention tier
    pub urgent: i64,
}

/// Estimator and forecaster wired to storage.
pub struct PredictiveAnalysis<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    policy: AnalysisPolicy,
    thresholds: AlertThresholds,
}

impl<'a> PredictiveAnalysis<'a> {
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

    /// Consumption series of one medication over the configured window.
    pub fn estimate(
        &self,
        ctx: &SessionContext,
        medication_id: &str,
    ) -> AnalysisResult<ConsumptionEstimate> {
        ctx.require(Resource::PredictiveAnalysis, Action::View)?;
        ConsumptionEstimator::new(self.db, self.clock).estimate(medication_id, self.policy.window_days)
    }

    /// Forecast of one medication.
    ///
    /// Fails with `NotFound` when the medication has no stock on hand and
    /// with `NoConsumption` when nothing left stock inside the window.
    pub fn forecast_medication(
        &self,
        ctx: &SessionContext,
        medication_id: &str,
    ) -> AnalysisResult<Forecast> {
        ctx.require(Resource::PredictiveAnalysis, Action::View)?;

        let level = self
            .candidates()?
            .into_iter()
            .find(|level| level.medication_id == medication_id)
            .ok_or_else(|| AnalysisError::NotFound(format!("stock for medication {}", medication_id)))?;

        self.forecast_level(&level)
    }

    /// Forecasts of every candidate medication, fewest days remaining first.
    pub fn run(&self, ctx: &SessionContext, filter: &ForecastFilter) -> AnalysisResult<Vec<Forecast>> {
        ctx.require(Resource::PredictiveAnalysis, Action::View)?;

        let mut forecasts = Vec::new();
        for level in self.candidates()? {
            if !filter.accepts_category(level.category.as_deref()) {
                continue;
            }
            match self.forecast_level(&level) {
                Ok(forecast) if filter.accepts_tier(forecast.tier) => forecasts.push(forecast),
                Ok(_) => {}
                Err(AnalysisError::NoConsumption(_)) | Err(AnalysisError::UndefinedForecast { .. }) => {
                    tracing::debug!(medication_id = %level.medication_id, "excluded from forecast");
                }
                Err(e) => return Err(e),
            }
        }

        forecasts.sort_by(|a, b| a.days_remaining.total_cmp(&b.days_remaining));
        tracing::info!(forecasts = forecasts.len(), "predictive analysis run");
        Ok(forecasts)
    }

    /// Counts for the analysis dashboard.
    pub fn summary(&self, ctx: &SessionContext) -> AnalysisResult<AnalysisSummary> {
        let forecasts = self.run(ctx, &ForecastFilter::default())?;
        let candidates = self.candidates()?;

        Ok(AnalysisSummary {
            analyzed: candidates.len() as i64,
            critical_stock: candidates
                .iter()
                .filter(|l| l.current_stock <= self.thresholds.low_stock)
                .count() as i64,
            low_movement: candidates
                .iter()
                .filter(|l| l.movement_count <= LOW_MOVEMENT_COUNT)
                .count() as i64,
            urgent: forecasts.iter().filter(|f| f.tier.is_urgent()).count() as i64,
        })
    }

    /// Alerts raised by Critical and Attention forecasts.
    pub fn forecast_alerts(&self, ctx: &SessionContext) -> AnalysisResult<Vec<ForecastAlert>> {
        Ok(self
            .run(ctx, &ForecastFilter::default())?
            .iter()
            .filter_map(forecast_alert)
            .collect())
    }

    /// Re-run a medication's forecast at a hypothetical daily rate.
    pub fn simulate(
        &self,
        ctx: &SessionContext,
        medication_id: &str,
        hypothetical_rate: f64,
    ) -> AnalysisResult<DepletionProjection> {
        ctx.require(Resource::PredictiveAnalysis, Action::View)?;
        let stock = self.db.medication_stock(medication_id)?;
        simulate(stock, hypothetical_rate, self.clock.today())
    }

    fn candidates(&self) -> AnalysisResult<Vec<StockLevel>> {
        Ok(self
            .db
            .stock_levels()?
            .into_iter()
            .filter(|level| level.movement_count > 0)
            .collect())
    }

    fn forecast_level(&self, level: &StockLevel) -> AnalysisResult<Forecast> {
        let estimate = ConsumptionEstimator::new(self.db, self.clock)
            .estimate(&level.medication_id, self.policy.window_days)?;
        let mean = estimate
            .mean_daily()
            .ok_or_else(|| AnalysisError::NoConsumption(level.medication_id.clone()))?;

        let projection = forecast(level.current_stock, mean, self.clock.today())?;
        let notes = advisory_notes(
            level.current_stock,
            mean,
            projection.days_remaining,
            &estimate.samples,
            &self.policy.note_policy(),
        );

        Ok(Forecast {
            medication_id: level.medication_id.clone(),
            medication_name: level.medication_name.clone(),
            category: level.category.clone(),
            current_stock: level.current_stock,
            mean_daily_consumption: mean,
            days_remaining: projection.days_remaining,
            stockout_date: projection.stockout_date,
            tier: projection.tier,
            notes,
        })
    }
}
