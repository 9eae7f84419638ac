//! Depletion forecasting: days of stock left, stockout date, urgency tier and
//! advisory notes.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::estimator::ConsumptionSample;
use crate::error::{AnalysisError, AnalysisResult};

/// Below this many days of stock the forecast is critical.
pub const CRITICAL_DAYS: f64 = 7.0;
/// Below this many days of stock the forecast needs attention.
pub const ATTENTION_DAYS: f64 = 15.0;
/// Below this many days of stock the forecast is low.
pub const LOW_DAYS: f64 = 30.0;

/// Samples compared at each end of the series by the trend heuristic.
pub const TREND_SAMPLES: usize = 7;
/// Recent/older mean ratio above which consumption is increasing.
pub const TREND_INCREASE_RATIO: f64 = 1.2;
/// Recent/older mean ratio below which consumption is decreasing.
pub const TREND_DECREASE_RATIO: f64 = 0.8;
/// Days of consumption a suggested reorder covers.
pub const RESTOCK_HORIZON_DAYS: i64 = 60;
/// A reorder is suggested when fewer days than this remain.
pub const REORDER_BELOW_DAYS: f64 = ATTENTION_DAYS;
/// Consumption faster than `stock / ACCELERATION_DAYS` per day is flagged.
pub const ACCELERATION_DAYS: f64 = 30.0;
/// Fewer samples than this make the history sparse.
pub const SPARSE_HISTORY_SAMPLES: usize = 5;

/// Urgency of a depletion forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrgencyTier {
    Critical,
    Attention,
    Low,
    Normal,
}

impl UrgencyTier {
    /// First matching tier: `< 7` critical, `< 15` attention, `< 30` low.
    pub fn from_days(days_remaining: f64) -> Self {
        if days_remaining < CRITICAL_DAYS {
            UrgencyTier::Critical
        } else if days_remaining < ATTENTION_DAYS {
            UrgencyTier::Attention
        } else if days_remaining < LOW_DAYS {
            UrgencyTier::Low
        } else {
            UrgencyTier::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Critical => "critical",
            UrgencyTier::Attention => "attention",
            UrgencyTier::Low => "low",
            UrgencyTier::Normal => "normal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(UrgencyTier::Critical),
            "attention" => Some(UrgencyTier::Attention),
            "low" => Some(UrgencyTier::Low),
            "normal" => Some(UrgencyTier::Normal),
            _ => None,
        }
    }

    /// Critical and Attention forecasts need action now.
    pub fn is_urgent(&self) -> bool {
        matches!(self, UrgencyTier::Critical | UrgencyTier::Attention)
    }
}

/// Direction of recent consumption compared with the start of the window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Days remaining and stockout date for one stock level and rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DepletionProjection {
    pub days_remaining: f64,
    pub stockout_date: NaiveDate,
    pub tier: UrgencyTier,
}

/// Project when `current_stock` runs out at `mean_daily_consumption` units per day.
///
/// The stockout date is `today` plus the whole days remaining (truncated).
pub fn forecast(
    current_stock: i64,
    mean_daily_consumption: f64,
    today: NaiveDate,
) -> AnalysisResult<DepletionProjection> {
    if !mean_daily_consumption.is_finite() || mean_daily_consumption <= 0.0 {
        return Err(AnalysisError::UndefinedForecast {
            rate: mean_daily_consumption,
        });
    }

    let days_remaining = current_stock as f64 / mean_daily_consumption;
    let stockout_date = today + Duration::days(days_remaining.trunc() as i64);

    Ok(DepletionProjection {
        days_remaining,
        stockout_date,
        tier: UrgencyTier::from_days(days_remaining),
    })
}

/// Re-run the projection for a hypothetical consumption rate.
pub fn simulate(
    current_stock: i64,
    hypothetical_rate: f64,
    today: NaiveDate,
) -> AnalysisResult<DepletionProjection> {
    forecast(current_stock, hypothetical_rate, today)
}

/// Compare the mean of the most recent samples with the oldest ones.
///
/// `samples` must be oldest first. `None` with fewer than seven samples.
pub fn trend(samples: &[ConsumptionSample]) -> Option<Trend> {
    if samples.len() < TREND_SAMPLES {
        return None;
    }

    let mean = |window: &[ConsumptionSample]| {
        window.iter().map(|s| s.quantity as f64).sum::<f64>() / window.len() as f64
    };
    let older = mean(&samples[..TREND_SAMPLES]);
    let recent = mean(&samples[samples.len() - TREND_SAMPLES..]);

    if recent > older * TREND_INCREASE_RATIO {
        Some(Trend::Increasing)
    } else if recent < older * TREND_DECREASE_RATIO {
        Some(Trend::Decreasing)
    } else {
        Some(Trend::Stable)
    }
}

/// Advisory note attached to a forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ForecastNote {
    /// Order this many units to cover the restock horizon
    Reorder { quantity: i64 },
    /// Daily consumption exceeds what the stock sustains for a month
    AcceleratedConsumption,
    /// Too few days of history for a reliable mean
    SparseHistory { samples: usize },
    /// Recent consumption moved relative to the start of the window
    Trend(Trend),
}

impl ForecastNote {
    pub fn describe(&self) -> String {
        match self {
            ForecastNote::Reorder { quantity } => format!("Reorder about {} units", quantity),
            ForecastNote::AcceleratedConsumption => {
                "Consumption is outpacing stock; review usage".to_string()
            }
            ForecastNote::SparseHistory { samples } => format!(
                "Only {} days of consumption history; forecast may be unreliable",
                samples
            ),
            ForecastNote::Trend(Trend::Increasing) => "Consumption is increasing".to_string(),
            ForecastNote::Trend(Trend::Decreasing) => "Consumption is decreasing".to_string(),
            ForecastNote::Trend(Trend::Stable) => "Consumption is stable".to_string(),
        }
    }
}

/// Thresholds used when building advisory notes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotePolicy {
    pub restock_horizon_days: i64,
    pub sparse_history_samples: usize,
}

impl Default for NotePolicy {
    fn default() -> Self {
        Self {
            restock_horizon_days: RESTOCK_HORIZON_DAYS,
            sparse_history_samples: SPARSE_HISTORY_SAMPLES,
        }
    }
}

/// Advisory notes for a forecast, in a fixed order: reorder, acceleration,
/// sparse history, trend.
pub fn advisory_notes(
    current_stock: i64,
    mean_daily_consumption: f64,
    days_remaining: f64,
    samples: &[ConsumptionSample],
    policy: &NotePolicy,
) -> Vec<ForecastNote> {
    let mut notes = Vec::new();

    if days_remaining < REORDER_BELOW_DAYS {
        let quantity = (mean_daily_consumption * policy.restock_horizon_days as f64).round() as i64;
        notes.push(ForecastNote::Reorder { quantity });
    }
    if mean_daily_consumption > current_stock as f64 / ACCELERATION_DAYS {
        notes.push(ForecastNote::AcceleratedConsumption);
    }
    if samples.len() < policy.sparse_history_samples {
        notes.push(ForecastNote::SparseHistory {
            samples: samples.len(),
        });
    }
    match trend(samples) {
        Some(t @ (Trend::Increasing | Trend::Decreasing)) => notes.push(ForecastNote::Trend(t)),
        _ => {}
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn series(quantities: &[i64]) -> Vec<ConsumptionSample> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, q)| ConsumptionSample {
                date: today() + Duration::days(i as i64),
                quantity: *q,
            })
            .collect()
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(UrgencyTier::from_days(6.9), UrgencyTier::Critical);
        assert_eq!(UrgencyTier::from_days(7.0), UrgencyTier::Attention);
        assert_eq!(UrgencyTier::from_days(14.9), UrgencyTier::Attention);
        assert_eq!(UrgencyTier::from_days(15.0), UrgencyTier::Low);
        assert_eq!(UrgencyTier::from_days(29.9), UrgencyTier::Low);
        assert_eq!(UrgencyTier::from_days(30.0), UrgencyTier::Normal);
        assert_eq!(UrgencyTier::from_days(0.0), UrgencyTier::Critical);
    }

    #[test]
    fn test_forecast_example() {
        let projection = forecast(100, 5.0, today()).unwrap();
        assert_eq!(projection.days_remaining, 20.0);
        assert_eq!(projection.tier, UrgencyTier::Low);
        assert_eq!(projection.stockout_date, today() + Duration::days(20));
    }

    #[test]
    fn test_stockout_date_truncates() {
        let projection = forecast(10, 3.0, today()).unwrap();
        assert!((projection.days_remaining - 3.333).abs() < 0.01);
        assert_eq!(projection.stockout_date, today() + Duration::days(3));
        assert_eq!(projection.tier, UrgencyTier::Critical);
    }

    #[test]
    fn test_undefined_rates() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                forecast(100, rate, today()),
                Err(AnalysisError::UndefinedForecast { .. })
            ));
        }
    }

    #[test]
    fn test_forecast_is_pure() {
        let a = forecast(73, 4.5, today()).unwrap();
        let b = forecast(73, 4.5, today()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_simulate_uses_hypothetical_rate() {
        let projection = simulate(100, 10.0, today()).unwrap();
        assert_eq!(projection.days_remaining, 10.0);
        assert_eq!(projection.tier, UrgencyTier::Attention);
    }

    #[test]
    fn test_trend() {
        assert_eq!(trend(&series(&[5; 6])), None);
        assert_eq!(trend(&series(&[5; 7])), Some(Trend::Stable));

        let rising = series(&[2, 2, 2, 2, 2, 2, 2, 10, 10, 10, 10, 10, 10, 10]);
        assert_eq!(trend(&rising), Some(Trend::Increasing));

        let falling = series(&[10, 10, 10, 10, 10, 10, 10, 2, 2, 2, 2, 2, 2, 2]);
        assert_eq!(trend(&falling), Some(Trend::Decreasing));
    }

    #[test]
    fn test_notes_for_urgent_sparse_forecast() {
        let samples = series(&[10, 20]);
        let notes = advisory_notes(100, 15.0, 100.0 / 15.0, &samples, &NotePolicy::default());
        assert_eq!(
            notes,
            vec![
                ForecastNote::Reorder { quantity: 900 },
                ForecastNote::AcceleratedConsumption,
                ForecastNote::SparseHistory { samples: 2 },
            ]
        );
    }

    #[test]
    fn test_reorder_quantity_is_rounded() {
        let samples = series(&[10, 10, 5]);
        let notes = advisory_notes(10, 25.0 / 3.0, 1.2, &samples, &NotePolicy::default());
        assert_eq!(notes[0], ForecastNote::Reorder { quantity: 500 });

        let notes = advisory_notes(1, 2.0 / 7.0, 3.5, &samples, &NotePolicy::default());
        assert_eq!(notes[0], ForecastNote::Reorder { quantity: 17 });
    }

    #[test]
    fn test_no_notes_for_healthy_forecast() {
        let samples = series(&[1; 10]);
        let notes = advisory_notes(100, 1.0, 100.0, &samples, &NotePolicy::default());
        assert!(notes.is_empty());
    }
}
