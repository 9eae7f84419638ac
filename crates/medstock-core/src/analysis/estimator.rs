//! Consumption estimation from the movement log.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::db::Database;
use crate::error::AnalysisResult;

/// Default trailing window of consumption history, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Units that left stock on one calendar day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumptionSample {
    pub date: NaiveDate,
    pub quantity: i64,
}

/// Daily exits of one medication over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionEstimate {
    pub medication_id: String,
    pub window_days: i64,
    /// One sample per day with exits, oldest first; days without exits are absent
    pub samples: Vec<ConsumptionSample>,
    /// Sum of all samples
    pub total: i64,
}

impl ConsumptionEstimate {
    /// Mean over the days present in the sequence, `None` when it is empty.
    pub fn mean_daily(&self) -> Option<f64> {
        mean_daily_consumption(&self.samples)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// `sum / number of days present`; zero-exit days are not in the sequence and
/// so do not dilute the mean.
pub fn mean_daily_consumption(samples: &[ConsumptionSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: i64 = samples.iter().map(|s| s.quantity).sum();
    Some(total as f64 / samples.len() as f64)
}

/// Reads exit movements and builds consumption series.
pub struct ConsumptionEstimator<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> ConsumptionEstimator<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Exit quantities per calendar day within `[now - window_days, now]`.
    pub fn estimate(
        &self,
        medication_id: &str,
        window_days: i64,
    ) -> AnalysisResult<ConsumptionEstimate> {
        let now = self.clock.now();
        let from = now - Duration::days(window_days);

        let samples: Vec<ConsumptionSample> = self
            .db
            .daily_exits(medication_id, from, now)?
            .into_iter()
            .map(|(date, quantity)| ConsumptionSample { date, quantity })
            .collect();
        let total: i64 = samples.iter().map(|s| s.quantity).sum();

        tracing::debug!(
            %medication_id,
            window_days,
            days = samples.len(),
            total,
            "consumption estimated"
        );

        Ok(ConsumptionEstimate {
            medication_id: medication_id.to_string(),
            window_days,
            samples,
            total,
        })
    }
}
