//! Stock view filter and row types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::alert::LotStatus;

/// Stock status filter options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatusFilter {
    /// Quantity above the low-stock threshold
    InStock,
    /// 0 < quantity <= low-stock threshold
    LowStock,
    /// Quantity is zero
    OutOfStock,
    /// Expiry within the attention window
    NearExpiry,
}

impl StockStatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatusFilter::InStock => "in_stock",
            StockStatusFilter::LowStock => "low_stock",
            StockStatusFilter::OutOfStock => "out_of_stock",
            StockStatusFilter::NearExpiry => "near_expiry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_stock" => Some(StockStatusFilter::InStock),
            "low_stock" => Some(StockStatusFilter::LowStock),
            "out_of_stock" => Some(StockStatusFilter::OutOfStock),
            "near_expiry" => Some(StockStatusFilter::NearExpiry),
            _ => None,
        }
    }
}

/// Parameters of the stock position query. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StockFilter {
    /// Substring matched against medication name and active ingredient
    pub search_term: Option<String>,
    pub category: Option<String>,
    pub status: Option<StockStatusFilter>,
    /// Substring matched against the storage site
    pub location: Option<String>,
    /// Substring matched against the storage sector
    pub sector: Option<String>,
}

impl StockFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search_term: Some(term.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: StockStatusFilter) -> Self {
        self.status = Some(status);
        self
    }
}

/// One active lot as shown in the stock view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRow {
    pub lot_id: String,
    pub medication_id: String,
    pub medication_name: String,
    pub active_ingredient: Option<String>,
    pub category: Option<String>,
    pub controlled: bool,
    pub lot_number: String,
    pub expires_on: NaiveDate,
    pub quantity: i64,
    pub site: String,
    pub sector: Option<String>,
    pub shelf: Option<String>,
    pub slot: Option<String>,
    pub days_to_expiry: i64,
    pub status: LotStatus,
}
