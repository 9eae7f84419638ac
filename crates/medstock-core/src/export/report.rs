//! Stock position and forecast reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::escape_csv;
use crate::analysis::Forecast;
use crate::models::StockRow;

/// Timestamp format used in report headers.
pub const EXPORTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line per active lot with its display status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReport {
    /// Export timestamp
    pub exported_at: String,
    /// Exporting user
    pub exported_by: String,
    pub lines: Vec<StockReportLine>,
    /// Sum of quantities over all lines
    pub total_units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReportLine {
    pub medication: String,
    pub active_ingredient: Option<String>,
    pub category: Option<String>,
    pub controlled: bool,
    pub lot_number: String,
    pub expires_on: NaiveDate,
    pub days_to_expiry: i64,
    pub quantity: i64,
    pub location: String,
    pub status: String,
}

impl From<&StockRow> for StockReportLine {
    fn from(row: &StockRow) -> Self {
        let location = [
            Some(row.site.as_str()),
            row.sector.as_deref(),
            row.shelf.as_deref(),
            row.slot.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" / ");

        Self {
            medication: row.medication_name.clone(),
            active_ingredient: row.active_ingredient.clone(),
            category: row.category.clone(),
            controlled: row.controlled,
            lot_number: row.lot_number.clone(),
            expires_on: row.expires_on,
            days_to_expiry: row.days_to_expiry,
            quantity: row.quantity,
            location,
            status: row.status.as_str().to_string(),
        }
    }
}

impl StockReport {
    pub fn new(exported_at: String, exported_by: String, rows: &[StockRow]) -> Self {
        let lines: Vec<StockReportLine> = rows.iter().map(StockReportLine::from).collect();
        let total_units = lines.iter().map(|l| l.quantity).sum();
        Self {
            exported_at,
            exported_by,
            lines,
            total_units,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("medication,active_ingredient,category,controlled,lot_number,expires_on,days_to_expiry,quantity,location,status\n");

        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&line.medication),
                escape_csv(line.active_ingredient.as_deref().unwrap_or("")),
                escape_csv(line.category.as_deref().unwrap_or("")),
                if line.controlled { "yes" } else { "no" },
                escape_csv(&line.lot_number),
                line.expires_on,
                line.days_to_expiry,
                line.quantity,
                escape_csv(&line.location),
                line.status,
            ));
        }

        csv
    }
}

/// One line per medication with a defined forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub exported_at: String,
    pub exported_by: String,
    pub window_days: i64,
    pub lines: Vec<ForecastReportLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReportLine {
    pub medication: String,
    pub category: Option<String>,
    pub current_stock: i64,
    pub mean_daily_consumption: f64,
    pub days_remaining: f64,
    pub stockout_date: NaiveDate,
    pub tier: String,
    pub notes: Vec<String>,
}

impl From<&Forecast> for ForecastReportLine {
    fn from(forecast: &Forecast) -> Self {
        Self {
            medication: forecast.medication_name.clone(),
            category: forecast.category.clone(),
            current_stock: forecast.current_stock,
            mean_daily_consumption: forecast.mean_daily_consumption,
            days_remaining: forecast.days_remaining,
            stockout_date: forecast.stockout_date,
            tier: forecast.tier.as_str().to_string(),
            notes: forecast.notes.iter().map(|n| n.describe()).collect(),
        }
    }
}

impl ForecastReport {
    pub fn new(
        exported_at: String,
        exported_by: String,
        window_days: i64,
        forecasts: &[Forecast],
    ) -> Self {
        Self {
            exported_at,
            exported_by,
            window_days,
            lines: forecasts.iter().map(ForecastReportLine::from).collect(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format. Notes are joined with "; ".
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("medication,category,current_stock,mean_daily_consumption,days_remaining,stockout_date,tier,notes\n");

        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{:.2},{:.1},{},{},{}\n",
                escape_csv(&line.medication),
                escape_csv(line.category.as_deref().unwrap_or("")),
                line.current_stock,
                line.mean_daily_consumption,
                line.days_remaining,
                line.stockout_date,
                line.tier,
                escape_csv(&line.notes.join("; ")),
            ));
        }

        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ForecastNote, UrgencyTier};
    use crate::models::LotStatus;

    fn row() -> StockRow {
        StockRow {
            lot_id: "lot-1".into(),
            medication_id: "med-1".into(),
            medication_name: "Dipyrone, 500mg".into(),
            active_ingredient: Some("metamizole".into()),
            category: Some("Analgesic".into()),
            controlled: false,
            lot_number: "L\"7\"".into(),
            expires_on: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            quantity: 40,
            site: "Central Pharmacy".into(),
            sector: Some("A".into()),
            shelf: None,
            slot: Some("3".into()),
            days_to_expiry: 120,
            status: LotStatus::Normal,
        }
    }

    #[test]
    fn test_stock_report_csv_escapes() {
        let report = StockReport::new("2024-09-01 10:00:00".into(), "admin".into(), &[row()]);
        let csv = report.to_csv();
        let line = csv.lines().nth(1).unwrap();

        assert!(line.starts_with("\"Dipyrone, 500mg\",metamizole,Analgesic,no,\"L\"\"7\"\"\",2024-12-31,120,40,"));
        assert!(line.contains("Central Pharmacy / A / 3"));
        assert!(line.ends_with(",normal"));
        assert_eq!(report.total_units, 40);
    }

    #[test]
    fn test_stock_report_json() {
        let report = StockReport::new("2024-09-01 10:00:00".into(), "admin".into(), &[row()]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"lot_number\": \"L\\\"7\\\"\""));
        assert!(json.contains("\"total_units\": 40"));
    }

    #[test]
    fn test_forecast_report_csv() {
        let forecast = Forecast {
            medication_id: "med-1".into(),
            medication_name: "Amoxicillin".into(),
            category: None,
            current_stock: 100,
            mean_daily_consumption: 10.0,
            days_remaining: 10.0,
            stockout_date: NaiveDate::from_ymd_opt(2024, 9, 11).unwrap(),
            tier: UrgencyTier::Attention,
            notes: vec![
                ForecastNote::Reorder { quantity: 600 },
                ForecastNote::AcceleratedConsumption,
            ],
        };
        let report = ForecastReport::new("2024-09-01 10:00:00".into(), "admin".into(), 30, &[forecast]);
        let csv = report.to_csv();

        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "Amoxicillin,,100,10.00,10.0,2024-09-11,attention,Reorder about 600 units; Consumption is outpacing stock; review usage"
        );
    }
}
