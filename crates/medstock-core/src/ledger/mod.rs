//! Inventory ledger.
//!
//! The only writer of `lots.current_quantity`. Each stock change appends an
//! immutable movement and updates the lot in the same transaction, using a
//! guarded single-statement update so the quantity can never leave
//! `[0, initial_quantity]`.

use chrono::NaiveDate;

use crate::access::{Action, Resource, SessionContext};
use crate::alerts::AlertThresholds;
use crate::clock::Clock;
use crate::db::Database;
use crate::error::{InventoryError, InventoryResult};
use crate::models::{
    AlertPriority, Lot, LotAudit, Movement, MovementFilter, MovementRecord, NewLot, SmartAlert,
    StockChange, StockFilter, StockRow, StorageLocation,
};

/// Result of a transfer between storage locations.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The whole lot moved; no quantity changed
    Relocated(Lot),
    /// Part of the lot moved into a new lot at the destination
    Split { source: Lot, destination: Lot },
}

/// Stock ledger service.
pub struct InventoryLedger<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    thresholds: AlertThresholds,
}

impl<'a> InventoryLedger<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, thresholds: AlertThresholds) -> Self {
        Self {
            db,
            clock,
            thresholds,
        }
    }

    // ========================================================================
    // Receiving
    // ========================================================================

    /// Register a received lot and its opening Entry movement.
    ///
    /// Lots expiring inside the attention window also raise a smart alert.
    pub fn register_lot(&self, ctx: &SessionContext, new_lot: NewLot) -> InventoryResult<Lot> {
        ctx.require(Resource::Stock, Action::Create)?;
        let today = self.clock.today();
        validate_new_lot(&new_lot, today)?;

        let medication = self
            .db
            .get_medication(&new_lot.medication_id)?
            .filter(|m| m.active)
            .ok_or_else(|| {
                InventoryError::NotFound(format!("medication {}", new_lot.medication_id))
            })?;

        let now = self.clock.now();
        let lot = new_lot.into_lot(Some(ctx.username.clone()), now);

        let tx = self.db.begin()?;
        self.db.insert_lot(&lot)?;
        self.db.insert_movement(&Movement::new(
            &lot.id,
            StockChange::Entry,
            lot.initial_quantity,
            Some("Lot received".to_string()),
            Some(ctx.username.clone()),
            now,
        ))?;

        let days = lot.days_to_expiry(today);
        if days <= self.thresholds.expiry_attention_days {
            let priority = if days <= self.thresholds.expiry_critical_days {
                AlertPriority::Urgent
            } else {
                AlertPriority::Attention
            };
            self.db.insert_smart_alert(&SmartAlert::new(
                "expiry",
                priority,
                format!("{} lot {} expires soon", medication.name, lot.lot_number),
                format!(
                    "Lot {} of {} was received with {} days to expiry ({})",
                    lot.lot_number, medication.name, days, lot.expires_on
                ),
                Some(medication.id.clone()),
                now,
            ))?;
        }
        tx.commit()?;

        tracing::info!(
            by = %ctx.username,
            lot_id = %lot.id,
            medication = %medication.name,
            quantity = lot.initial_quantity,
            "lot registered"
        );
        Ok(lot)
    }

    // ========================================================================
    // Movements
    // ========================================================================

    /// Apply an entry, exit or adjustment to a lot and return the updated lot.
    ///
    /// Transfers go through [`InventoryLedger::transfer`].
    pub fn record_movement(
        &self,
        ctx: &SessionContext,
        lot_id: &str,
        change: StockChange,
        quantity: i64,
        reason: Option<String>,
    ) -> InventoryResult<Lot> {
        ctx.require(Resource::Stock, Action::Edit)?;
        if matches!(change, StockChange::TransferIn | StockChange::TransferOut) {
            return Err(InventoryError::validation(
                "kind",
                "transfers must be recorded with transfer()",
            ));
        }

        let tx = self.db.begin()?;
        let lot = self.apply_change(lot_id, change, quantity, reason, &ctx.username)?;
        tx.commit()?;

        tracing::info!(
            by = %ctx.username,
            %lot_id,
            ?change,
            quantity,
            current = lot.current_quantity,
            "movement recorded"
        );
        Ok(lot)
    }

    /// Move `quantity` units of a lot to `destination`.
    ///
    /// Moving the whole lot relocates it in place. Moving part of it records
    /// a TransferOut on the source and opens a new lot at the destination with
    /// a TransferIn, all in one transaction.
    pub fn transfer(
        &self,
        ctx: &SessionContext,
        lot_id: &str,
        destination: StorageLocation,
        quantity: i64,
    ) -> InventoryResult<TransferOutcome> {
        ctx.require(Resource::Stock, Action::Edit)?;
        if destination.site.trim().is_empty() {
            return Err(InventoryError::validation("site", "destination site is required"));
        }
        if quantity <= 0 {
            return Err(InventoryError::validation("quantity", "must be positive"));
        }

        let source = self.active_lot(lot_id)?;
        if quantity > source.current_quantity {
            tracing::warn!(%lot_id, quantity, available = source.current_quantity, "transfer rejected");
            return Err(InventoryError::InsufficientStock {
                lot_id: lot_id.to_string(),
                requested: quantity,
                available: source.current_quantity,
            });
        }

        if quantity == source.current_quantity {
            self.db.relocate_lot(lot_id, &destination)?;
            let moved = self.active_lot(lot_id)?;
            tracing::info!(by = %ctx.username, %lot_id, site = %destination.site, "lot relocated");
            return Ok(TransferOutcome::Relocated(moved));
        }

        let now = self.clock.now();
        let reason = format!("Transfer to {}", destination.site);

        let tx = self.db.begin()?;
        let source = self.apply_change(
            lot_id,
            StockChange::TransferOut,
            quantity,
            Some(reason.clone()),
            &ctx.username,
        )?;

        let mut split = NewLot::new(
            source.medication_id.clone(),
            source.lot_number.clone(),
            source.expires_on,
            quantity,
            destination,
        );
        split.manufactured_on = source.manufactured_on;
        split.unit_price = source.unit_price;
        split.supplier = source.supplier.clone();
        let destination = split.into_lot(Some(ctx.username.clone()), now);

        self.db.insert_lot(&destination)?;
        self.db.insert_movement(&Movement::new(
            &destination.id,
            StockChange::TransferIn,
            quantity,
            Some(format!("Transfer from {}", source.location.site)),
            Some(ctx.username.clone()),
            now,
        ))?;
        tx.commit()?;

        tracing::info!(
            by = %ctx.username,
            %lot_id,
            new_lot_id = %destination.id,
            quantity,
            "lot split by transfer"
        );
        Ok(TransferOutcome::Split {
            source,
            destination,
        })
    }

    /// Take an emptied lot out of the active stock.
    ///
    /// Remaining units must be written off with an adjustment first, so the
    /// movement log always explains where they went.
    pub fn retire_lot(&self, ctx: &SessionContext, lot_id: &str) -> InventoryResult<Lot> {
        ctx.require(Resource::Stock, Action::Delete)?;
        let lot = self.active_lot(lot_id)?;
        if lot.current_quantity > 0 {
            return Err(InventoryError::validation(
                "lot",
                format!("lot {} still holds {} units", lot_id, lot.current_quantity),
            ));
        }

        if !self.db.deactivate_lot(lot_id)? {
            return Err(InventoryError::NotFound(format!("lot {}", lot_id)));
        }
        tracing::info!(by = %ctx.username, %lot_id, "lot retired");
        self.db
            .get_lot(lot_id)?
            .ok_or_else(|| InventoryError::NotFound(format!("lot {}", lot_id)))
    }

    /// Guarded update plus movement append, without opening a transaction.
    ///
    /// Callers must hold a transaction from [`Database::begin`].
    pub(crate) fn apply_change(
        &self,
        lot_id: &str,
        change: StockChange,
        quantity: i64,
        reason: Option<String>,
        responsible: &str,
    ) -> InventoryResult<Lot> {
        if quantity <= 0 {
            return Err(InventoryError::validation("quantity", "must be positive"));
        }

        let lot = self.active_lot(lot_id)?;
        let delta = change.delta(quantity);

        if !self.db.apply_stock_delta(lot_id, delta)? {
            if delta < 0 {
                tracing::warn!(%lot_id, quantity, available = lot.current_quantity, "insufficient stock");
                return Err(InventoryError::InsufficientStock {
                    lot_id: lot_id.to_string(),
                    requested: quantity,
                    available: lot.current_quantity,
                });
            }
            tracing::warn!(%lot_id, quantity, initial = lot.initial_quantity, "over-capacity increase");
            return Err(InventoryError::validation(
                "quantity",
                format!(
                    "lot {} would exceed its initial quantity of {}",
                    lot.lot_number, lot.initial_quantity
                ),
            ));
        }

        self.db.insert_movement(&Movement::new(
            lot_id,
            change,
            quantity,
            reason,
            Some(responsible.to_string()),
            self.clock.now(),
        ))?;

        Ok(Lot {
            current_quantity: lot.current_quantity + delta,
            ..lot
        })
    }

    fn active_lot(&self, lot_id: &str) -> InventoryResult<Lot> {
        match self.db.get_lot(lot_id)? {
            Some(lot) if lot.active => Ok(lot),
            Some(_) => Err(InventoryError::validation("lot", format!("lot {} is inactive", lot_id))),
            None => Err(InventoryError::NotFound(format!("lot {}", lot_id))),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Replay a lot's movements from zero and compare with the stored quantity.
    pub fn audit_lot(&self, ctx: &SessionContext, lot_id: &str) -> InventoryResult<LotAudit> {
        ctx.require(Resource::Stock, Action::View)?;
        let lot = self
            .db
            .get_lot(lot_id)?
            .ok_or_else(|| InventoryError::NotFound(format!("lot {}", lot_id)))?;
        let movements = self.db.list_movements_for_lot(lot_id)?;

        let audit = LotAudit {
            lot_id: lot.id,
            stored_quantity: lot.current_quantity,
            replayed_quantity: movements.iter().map(Movement::signed_quantity).sum(),
            movement_count: movements.len(),
        };
        if !audit.is_consistent() {
            tracing::warn!(?audit, "lot replay mismatch");
        }
        Ok(audit)
    }

    /// Movements in a date range, newest first.
    pub fn movement_history(
        &self,
        ctx: &SessionContext,
        filter: &MovementFilter,
    ) -> InventoryResult<Vec<MovementRecord>> {
        ctx.require(Resource::Stock, Action::View)?;
        if filter.from > filter.to {
            return Err(InventoryError::validation("from", "must not be after `to`"));
        }
        Ok(self.db.movement_history(filter)?)
    }

    /// Active lots matching `filter`, with display status.
    pub fn stock_view(&self, ctx: &SessionContext, filter: &StockFilter) -> InventoryResult<Vec<StockRow>> {
        ctx.require(Resource::Stock, Action::View)?;
        Ok(self
            .db
            .stock_view(filter, self.clock.today(), &self.thresholds)?)
    }
}

fn validate_new_lot(new_lot: &NewLot, today: NaiveDate) -> InventoryResult<()> {
    if new_lot.lot_number.trim().is_empty() {
        return Err(InventoryError::validation("lot_number", "is required"));
    }
    if new_lot.location.site.trim().is_empty() {
        return Err(InventoryError::validation("site", "is required"));
    }
    if new_lot.quantity <= 0 {
        return Err(InventoryError::validation("quantity", "must be positive"));
    }
    if new_lot.expires_on <= today {
        return Err(InventoryError::validation(
            "expires_on",
            format!("{} is not after {}", new_lot.expires_on, today),
        ));
    }
    Ok(())
}
