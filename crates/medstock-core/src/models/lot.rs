//! Lot (batch) models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Physical storage location of a lot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageLocation {
    /// Site (e.g., "Central Pharmacy")
    pub site: String,
    /// Sector within the site
    pub sector: Option<String>,
    /// Shelf
    pub shelf: Option<String>,
    /// Slot / position on the shelf
    pub slot: Option<String>,
}

impl StorageLocation {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Default::default()
        }
    }
}

/// A batch of one medication with its own expiry and quantity.
///
/// `current_quantity` is only ever changed through the ledger, and always
/// satisfies `0 <= current_quantity <= initial_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lot {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning medication
    pub medication_id: String,
    /// Manufacturer lot number
    pub lot_number: String,
    /// Manufacture date
    pub manufactured_on: Option<NaiveDate>,
    /// Expiry date
    pub expires_on: NaiveDate,
    /// Quantity received
    pub initial_quantity: i64,
    /// Quantity on hand
    pub current_quantity: i64,
    /// Unit price
    pub unit_price: Option<f64>,
    /// Supplier
    pub supplier: Option<String>,
    /// Storage location
    pub location: StorageLocation,
    /// Free-form notes
    pub notes: Option<String>,
    /// Soft-delete flag
    pub active: bool,
    /// User who received the lot
    pub received_by: Option<String>,
    /// Reception timestamp
    pub received_at: NaiveDateTime,
}

impl Lot {
    /// Signed number of days from `today` until expiry (negative when expired).
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expires_on - today).num_days()
    }

    /// Whether the lot is past its expiry date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on < today
    }
}

/// Input for registering a new lot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLot {
    pub medication_id: String,
    pub lot_number: String,
    pub manufactured_on: Option<NaiveDate>,
    pub expires_on: NaiveDate,
    pub quantity: i64,
    pub unit_price: Option<f64>,
    pub supplier: Option<String>,
    pub location: StorageLocation,
    pub notes: Option<String>,
}

impl NewLot {
    /// Create lot input with only the required fields set.
    pub fn new(
        medication_id: impl Into<String>,
        lot_number: impl Into<String>,
        expires_on: NaiveDate,
        quantity: i64,
        location: StorageLocation,
    ) -> Self {
        Self {
            medication_id: medication_id.into(),
            lot_number: lot_number.into(),
            manufactured_on: None,
            expires_on,
            quantity,
            unit_price: None,
            supplier: None,
            location,
            notes: None,
        }
    }

    /// Materialize the lot record with `current = initial`.
    pub fn into_lot(self, received_by: Option<String>, received_at: NaiveDateTime) -> Lot {
        Lot {
            id: uuid::Uuid::new_v4().to_string(),
            medication_id: self.medication_id,
            lot_number: self.lot_number,
            manufactured_on: self.manufactured_on,
            expires_on: self.expires_on,
            initial_quantity: self.quantity,
            current_quantity: self.quantity,
            unit_price: self.unit_price,
            supplier: self.supplier,
            location: self.location,
            notes: self.notes,
            active: true,
            received_by,
            received_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_to_expiry() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let received = today.and_hms_opt(9, 0, 0).unwrap();
        let lot = NewLot::new(
            "med-1",
            "L001",
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            50,
            StorageLocation::new("Central Pharmacy"),
        )
        .into_lot(None, received);

        assert_eq!(lot.days_to_expiry(today), 10);
        assert!(!lot.is_expired(today));
        assert!(lot.is_expired(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()));
        assert_eq!(lot.initial_quantity, lot.current_quantity);
    }
}
