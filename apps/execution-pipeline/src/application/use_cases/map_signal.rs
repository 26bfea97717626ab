//! Map Signal Use Case
//!
//! Turns a strategy signal into an order intention for the pipeline.

use crate::application::use_cases::SessionContext;
use crate::domain::order_execution::{OrderIntention, OrderSide};
use crate::domain::position::PositionMap;
use crate::domain::shared::{InstrumentKey, Quantity};
use crate::domain::signal::{Signal, SignalAction};

/// Maps strategy signals to intentions.
#[derive(Debug, Clone)]
pub struct IntentionMapper {
    session: SessionContext,
    strategy_id: String,
    default_quantity: Quantity,
}

impl IntentionMapper {
    /// Create a mapper. Buys use `default_quantity`.
    #[must_use]
    pub fn new(
        session: SessionContext,
        strategy_id: impl Into<String>,
        default_quantity: Quantity,
    ) -> Self {
        Self {
            session,
            strategy_id: strategy_id.into(),
            default_quantity,
        }
    }

    /// Map one signal.
    ///
    /// Hold maps to nothing. A sell closes the full long position and maps
    /// to nothing when no long position is held.
    #[must_use]
    pub fn map_signal(
        &self,
        signal: &Signal,
        instrument: InstrumentKey,
        positions: &PositionMap,
    ) -> Option<OrderIntention> {
        let (side, quantity) = match signal.action {
            SignalAction::Hold => return None,
            SignalAction::Buy => (OrderSide::Buy, self.default_quantity),
            SignalAction::Sell => {
                let held = positions
                    .get(&instrument)
                    .filter(|p| p.is_long())
                    .and_then(|p| Quantity::new(p.net_quantity).ok());
                let Some(held) = held else {
                    tracing::debug!(
                        instrument = %instrument,
                        reason = %signal.reason,
                        "Sell signal without a long position, skipping"
                    );
                    return None;
                };
                (OrderSide::Sell, held)
            }
        };

        tracing::debug!(
            instrument = %instrument,
            side = %side,
            quantity = %quantity,
            confidence = ?signal.confidence,
            reason = %signal.reason,
            "Mapped signal to intention"
        );
        Some(
            OrderIntention::market(
                self.session.account_key.clone(),
                self.session.client_key.clone(),
                instrument,
                side,
                quantity,
            )
            .with_strategy_id(self.strategy_id.clone()),
        )
    }
}
