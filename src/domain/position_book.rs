//! Open positions, each evaluated under its own lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info};

use crate::domain::error::TradeguardError;
use crate::domain::evaluator::evaluate;
use crate::domain::position::{Decision, Position};
use crate::domain::risk_policy::RiskPolicy;

pub type PositionId = u64;

/// Ticks on the same position serialize; ticks on different positions do not
/// contend beyond a brief read of the index.
#[derive(Default)]
pub struct PositionBook {
    next_id: AtomicU64,
    positions: RwLock<HashMap<PositionId, Arc<Mutex<Position>>>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, position: Position) -> PositionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            id,
            side = %position.side,
            entry_price = position.entry_price,
            "position opened"
        );
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(position)));
        id
    }

    /// Snapshot of the position's current state.
    pub fn get(&self, id: PositionId) -> Option<Position> {
        self.slot(id)
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Evaluates one price tick and stores the updated trailing state.
    ///
    /// Invalid prices leave the position untouched.
    pub fn on_tick(
        &self,
        id: PositionId,
        current_price: f64,
        policy: &RiskPolicy,
    ) -> Result<Decision, TradeguardError> {
        let slot = self.slot(id).ok_or(TradeguardError::PositionNotFound { id })?;
        let mut position = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let was_open = position.is_open();
        let (decision, updated) = evaluate(&position, current_price, policy)?;
        *position = updated;

        if was_open && decision.is_close() {
            info!(id, price = current_price, decision = %decision, "position closed");
        } else {
            debug!(
                id,
                price = current_price,
                trailing_stop = ?position.trailing_stop_price,
                decision = %decision,
                "position evaluated"
            );
        }
        Ok(decision)
    }

    pub fn remove(&self, id: PositionId) -> Option<Position> {
        let slot = self
            .positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)?;
        let position = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Some(position)
    }

    pub fn open_ids(&self) -> Vec<PositionId> {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<PositionId> = positions
            .iter()
            .filter(|(_, slot)| slot.lock().unwrap_or_else(PoisonError::into_inner).is_open())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: PositionId) -> Option<Arc<Mutex<Position>>> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}
