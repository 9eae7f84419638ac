//! Stateless alert rules.
//!
//! Every function here is pure: same inputs, same output, no storage access.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::{Forecast, UrgencyTier};
use crate::models::{AlertKind, LotStatus, Severity};

/// Default low-stock threshold (units).
pub const LOW_STOCK_THRESHOLD: i64 = 10;
/// Default days-to-expiry at or below which a near-expiry alert is critical.
pub const EXPIRY_CRITICAL_DAYS: i64 = 7;
/// Default days-to-expiry at or below which a lot counts as near expiry.
pub const EXPIRY_ATTENTION_DAYS: i64 = 30;

/// Thresholds applied by the classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertThresholds {
    pub low_stock: i64,
    pub expiry_critical_days: i64,
    pub expiry_attention_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low_stock: LOW_STOCK_THRESHOLD,
            expiry_critical_days: EXPIRY_CRITICAL_DAYS,
            expiry_attention_days: EXPIRY_ATTENTION_DAYS,
        }
    }
}

impl AlertThresholds {
    /// Severity of an expiry `days_to_expiry` days away, or `None` when it is
    /// outside the attention window.
    pub fn expiry_severity(&self, days_to_expiry: i64) -> Option<Severity> {
        if days_to_expiry > self.expiry_attention_days {
            None
        } else if days_to_expiry > self.expiry_critical_days {
            Some(Severity::Warning)
        } else {
            Some(Severity::Critical)
        }
    }
}

/// All alert conditions that hold for a lot, each rule evaluated independently.
///
/// Results come in a fixed order: out of stock, low stock, near expiry. An
/// empty lot close to expiry reports both `OutOfStock` and `NearExpiry`;
/// dashboard counts skip empty lots when counting near-expiry lots.
pub fn classify_lot(
    quantity: i64,
    expires_on: NaiveDate,
    today: NaiveDate,
    thresholds: &AlertThresholds,
) -> Vec<AlertKind> {
    let mut kinds = Vec::new();

    if quantity == 0 {
        kinds.push(AlertKind::OutOfStock);
    }
    if quantity > 0 && quantity <= thresholds.low_stock {
        kinds.push(AlertKind::LowStock);
    }
    let days = (expires_on - today).num_days();
    if let Some(severity) = thresholds.expiry_severity(days) {
        kinds.push(AlertKind::NearExpiry { severity });
    }

    kinds
}

/// Single display status: out of stock > low stock > near expiry > normal.
pub fn lot_status(
    quantity: i64,
    expires_on: NaiveDate,
    today: NaiveDate,
    thresholds: &AlertThresholds,
) -> LotStatus {
    let kinds = classify_lot(quantity, expires_on, today, thresholds);
    if kinds.contains(&AlertKind::OutOfStock) {
        LotStatus::OutOfStock
    } else if kinds.contains(&AlertKind::LowStock) {
        LotStatus::LowStock
    } else if kinds
        .iter()
        .any(|k| matches!(k, AlertKind::NearExpiry { .. }))
    {
        LotStatus::NearExpiry
    } else {
        LotStatus::Normal
    }
}

/// Alert raised from a depletion forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastAlert {
    pub medication_id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Critical forecasts need urgent action; Attention forecasts need a restock plan.
pub fn forecast_alert(forecast: &Forecast) -> Option<ForecastAlert> {
    let (severity, title) = match forecast.tier {
        UrgencyTier::Critical => (Severity::Critical, "Urgent action required"),
        UrgencyTier::Attention => (Severity::Warning, "Plan restock"),
        UrgencyTier::Low | UrgencyTier::Normal => return None,
    };

    Some(ForecastAlert {
        medication_id: forecast.medication_id.clone(),
        severity,
        title: title.to_string(),
        message: format!(
            "{}: stock lasts about {:.1} days (until {})",
            forecast.medication_name, forecast.days_remaining, forecast.stockout_date
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn in_days(days: i64) -> NaiveDate {
        today() + Duration::days(days)
    }

    fn classify(quantity: i64, days: i64) -> Vec<AlertKind> {
        classify_lot(quantity, in_days(days), today(), &AlertThresholds::default())
    }

    #[test]
    fn test_out_of_stock_alone() {
        assert_eq!(classify(0, 400), vec![AlertKind::OutOfStock]);
    }

    #[test]
    fn test_low_stock_boundaries() {
        assert_eq!(classify(10, 400), vec![AlertKind::LowStock]);
        assert_eq!(classify(1, 400), vec![AlertKind::LowStock]);
        assert!(classify(11, 400).is_empty());
    }

    #[test]
    fn test_near_expiry_severity() {
        let warning = AlertKind::NearExpiry {
            severity: Severity::Warning,
        };
        let critical = AlertKind::NearExpiry {
            severity: Severity::Critical,
        };
        assert_eq!(classify(50, 30), vec![warning]);
        assert_eq!(classify(50, 8), vec![warning]);
        assert_eq!(classify(50, 7), vec![critical]);
        assert_eq!(classify(50, 0), vec![critical]);
        assert_eq!(classify(50, -3), vec![critical]);
        assert!(classify(50, 31).is_empty());
    }

    #[test]
    fn test_combined_low_and_near_expiry() {
        assert_eq!(
            classify(3, 5),
            vec![
                AlertKind::LowStock,
                AlertKind::NearExpiry {
                    severity: Severity::Critical
                }
            ]
        );
    }

    #[test]
    fn test_empty_lot_near_expiry_reports_both() {
        assert_eq!(
            classify(0, 5),
            vec![
                AlertKind::OutOfStock,
                AlertKind::NearExpiry {
                    severity: Severity::Critical
                }
            ]
        );
    }

    #[test]
    fn test_healthy_lot_has_no_alerts() {
        assert!(classify(50, 400).is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let thresholds = AlertThresholds {
            low_stock: 20,
            ..Default::default()
        };
        assert_eq!(
            classify_lot(15, in_days(400), today(), &thresholds),
            vec![AlertKind::LowStock]
        );
    }

    #[test]
    fn test_lot_status_precedence() {
        let t = AlertThresholds::default();
        assert_eq!(lot_status(0, in_days(3), today(), &t), LotStatus::OutOfStock);
        assert_eq!(lot_status(5, in_days(3), today(), &t), LotStatus::LowStock);
        assert_eq!(lot_status(50, in_days(3), today(), &t), LotStatus::NearExpiry);
        assert_eq!(lot_status(50, in_days(90), today(), &t), LotStatus::Normal);
    }
}
