//! Alert models: classifier output and persisted smart alerts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Alert severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// A condition detected on a lot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// Quantity is zero (always critical)
    OutOfStock,
    /// Quantity at or below the low-stock threshold (always a warning)
    LowStock,
    /// Expiry inside the attention window, whatever the quantity
    NearExpiry { severity: Severity },
}

impl AlertKind {
    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::OutOfStock => Severity::Critical,
            AlertKind::LowStock => Severity::Warning,
            AlertKind::NearExpiry { severity } => *severity,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::OutOfStock => "out_of_stock",
            AlertKind::LowStock => "low_stock",
            AlertKind::NearExpiry { .. } => "near_expiry",
        }
    }
}

/// Single display status of a lot in the stock view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LotStatus {
    OutOfStock,
    LowStock,
    NearExpiry,
    Normal,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::OutOfStock => "out_of_stock",
            LotStatus::LowStock => "low_stock",
            LotStatus::NearExpiry => "near_expiry",
            LotStatus::Normal => "normal",
        }
    }
}

/// Counts shown on the dashboard alert strip.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickAlerts {
    pub near_expiry: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

/// Priority of a persisted smart alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertPriority {
    Attention,
    Urgent,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Attention => "attention",
            AlertPriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attention" => Some(AlertPriority::Attention),
            "urgent" => Some(AlertPriority::Urgent),
            _ => None,
        }
    }
}

/// A notification persisted for staff (e.g., a lot received close to expiry).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartAlert {
    pub id: String,
    /// Category tag (e.g., "expiry")
    pub category: String,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub medication_id: Option<String>,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

impl SmartAlert {
    pub fn new(
        category: impl Into<String>,
        priority: AlertPriority,
        title: impl Into<String>,
        message: impl Into<String>,
        medication_id: Option<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.into(),
            priority,
            title: title.into(),
            message: message.into(),
            medication_id,
            read: false,
            created_at,
        }
    }
}
