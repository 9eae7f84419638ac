//! Stock movement models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MovementKind {
    /// Goods received
    Entry,
    /// Goods leaving stock (dispensation, consumption)
    Exit,
    /// Manual correction after a count
    Adjustment,
    /// Relocation of part of a lot
    Transfer,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(MovementKind::Entry),
            "exit" => Some(MovementKind::Exit),
            "adjustment" => Some(MovementKind::Adjustment),
            "transfer" => Some(MovementKind::Transfer),
            _ => None,
        }
    }
}

/// Whether a movement adds to or removes from a lot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// A requested change to a lot's quantity.
///
/// Combines the movement kind with its direction so that every variant has
/// an unambiguous sign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockChange {
    Entry,
    Exit,
    AdjustmentIncrease,
    AdjustmentDecrease,
    TransferIn,
    TransferOut,
}

impl StockChange {
    pub fn kind(&self) -> MovementKind {
        match self {
            StockChange::Entry => MovementKind::Entry,
            StockChange::Exit => MovementKind::Exit,
            StockChange::AdjustmentIncrease | StockChange::AdjustmentDecrease => {
                MovementKind::Adjustment
            }
            StockChange::TransferIn | StockChange::TransferOut => MovementKind::Transfer,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            StockChange::Entry | StockChange::AdjustmentIncrease | StockChange::TransferIn => {
                Direction::In
            }
            StockChange::Exit | StockChange::AdjustmentDecrease | StockChange::TransferOut => {
                Direction::Out
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockChange::Entry => "entry",
            StockChange::Exit => "exit",
            StockChange::AdjustmentIncrease => "adjustment_increase",
            StockChange::AdjustmentDecrease => "adjustment_decrease",
            StockChange::TransferIn => "transfer_in",
            StockChange::TransferOut => "transfer_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(StockChange::Entry),
            "exit" => Some(StockChange::Exit),
            "adjustment_increase" => Some(StockChange::AdjustmentIncrease),
            "adjustment_decrease" => Some(StockChange::AdjustmentDecrease),
            "transfer_in" => Some(StockChange::TransferIn),
            "transfer_out" => Some(StockChange::TransferOut),
            _ => None,
        }
    }

    /// Rebuild a change from its stored parts.
    pub fn from_parts(kind: MovementKind, direction: Direction) -> Option<Self> {
        match (kind, direction) {
            (MovementKind::Entry, Direction::In) => Some(StockChange::Entry),
            (MovementKind::Exit, Direction::Out) => Some(StockChange::Exit),
            (MovementKind::Adjustment, Direction::In) => Some(StockChange::AdjustmentIncrease),
            (MovementKind::Adjustment, Direction::Out) => Some(StockChange::AdjustmentDecrease),
            (MovementKind::Transfer, Direction::In) => Some(StockChange::TransferIn),
            (MovementKind::Transfer, Direction::Out) => Some(StockChange::TransferOut),
            _ => None,
        }
    }

    /// Signed effect of `quantity` units of this change.
    pub fn delta(&self, quantity: i64) -> i64 {
        match self.direction() {
            Direction::In => quantity,
            Direction::Out => -quantity,
        }
    }
}

/// An immutable, append-only stock event on one lot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movement {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Lot affected
    pub lot_id: String,
    pub kind: MovementKind,
    pub direction: Direction,
    /// Always positive; the sign comes from `direction`
    pub quantity: i64,
    pub reason: Option<String>,
    /// Username of the staff member responsible
    pub responsible: Option<String>,
    pub occurred_at: NaiveDateTime,
}

impl Movement {
    pub fn new(
        lot_id: impl Into<String>,
        change: StockChange,
        quantity: i64,
        reason: Option<String>,
        responsible: Option<String>,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            lot_id: lot_id.into(),
            kind: change.kind(),
            direction: change.direction(),
            quantity,
            reason,
            responsible,
            occurred_at,
        }
    }

    /// Signed effect of this movement on the lot's quantity.
    pub fn signed_quantity(&self) -> i64 {
        match self.direction {
            Direction::In => self.quantity,
            Direction::Out => -self.quantity,
        }
    }
}

/// Query parameters for the movement history.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementFilter {
    /// First day included
    pub from: NaiveDate,
    /// Last day included
    pub to: NaiveDate,
    pub kind: Option<MovementKind>,
    pub medication_id: Option<String>,
}

/// A movement joined with its lot and medication, for history views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementRecord {
    pub movement: Movement,
    pub medication_id: String,
    pub medication_name: String,
    pub lot_number: String,
}

/// Result of replaying a lot's movements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LotAudit {
    pub lot_id: String,
    pub stored_quantity: i64,
    pub replayed_quantity: i64,
    pub movement_count: usize,
}

impl LotAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored_quantity == self.replayed_quantity
    }
}
