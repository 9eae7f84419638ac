//! Stock and expiry alerting.

mod classifier;

pub use classifier::*;

use serde::{Deserialize, Serialize};

use crate::access::{Action, Resource, SessionContext};
use crate::clock::Clock;
use crate::db::Database;
use crate::error::InventoryResult;
use crate::models::{AlertKind, QuickAlerts, SmartAlert};

/// Alert conditions found on one active lot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotAlert {
    pub lot_id: String,
    pub medication_id: String,
    pub lot_number: String,
    pub quantity: i64,
    pub kinds: Vec<AlertKind>,
}

/// Runs the classifier over stored lots and serves persisted smart alerts.
pub struct AlertCenter<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    thresholds: AlertThresholds,
}

impl<'a> AlertCenter<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, thresholds: AlertThresholds) -> Self {
        Self {
            db,
            clock,
            thresholds,
        }
    }

    /// Every active lot with at least one alert condition.
    pub fn lot_alerts(&self, ctx: &SessionContext) -> InventoryResult<Vec<LotAlert>> {
        ctx.require(Resource::Stock, Action::View)?;
        let today = self.clock.today();

        let alerts = self
            .db
            .list_active_lots()?
            .into_iter()
            .filter_map(|lot| {
                let kinds =
                    classify_lot(lot.current_quantity, lot.expires_on, today, &self.thresholds);
                if kinds.is_empty() {
                    None
                } else {
                    Some(LotAlert {
                        lot_id: lot.id,
                        medication_id: lot.medication_id,
                        lot_number: lot.lot_number,
                        quantity: lot.current_quantity,
                        kinds,
                    })
                }
            })
            .collect();
        Ok(alerts)
    }

    /// Dashboard counts of near-expiry (with stock left), low-stock and
    /// out-of-stock active lots.
    pub fn quick_alerts(&self, ctx: &SessionContext) -> InventoryResult<QuickAlerts> {
        let mut counts = QuickAlerts::default();
        for alert in self.lot_alerts(ctx)? {
            for kind in &alert.kinds {
                match kind {
                    AlertKind::OutOfStock => counts.out_of_stock += 1,
                    AlertKind::LowStock => counts.low_stock += 1,
                    AlertKind::NearExpiry { .. } if alert.quantity > 0 => {
                        counts.near_expiry += 1
                    }
                    AlertKind::NearExpiry { .. } => {}
                }
            }
        }
        Ok(counts)
    }

    /// Persisted smart alerts, newest first.
    pub fn smart_alerts(
        &self,
        ctx: &SessionContext,
        unread_only: bool,
    ) -> InventoryResult<Vec<SmartAlert>> {
        ctx.require(Resource::Medications, Action::View)?;
        Ok(self.db.list_smart_alerts(unread_only)?)
    }

    /// Mark a smart alert as read.
    pub fn mark_read(&self, ctx: &SessionContext, alert_id: &str) -> InventoryResult<bool> {
        ctx.require(Resource::Medications, Action::View)?;
        Ok(self.db.mark_alert_read(alert_id)?)
    }
}
