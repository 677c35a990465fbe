//! Lifecycle manager: owns the single position slot.
//!
//! Opening a position means emitting a bracket; the position itself only
//! exists once the venue reports the entry fill. Per managed bar the manager
//! applies, in order: the minimum-hold narrowing, duration escalation, and
//! trailing. Execution reports are applied idempotently: duplicates and
//! reports for positions it no longer tracks are ignored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::risk::RiskLevels;
use crate::config::EngineConfig;
use crate::domain::{
    Bar, BracketRequest, ExecutionEvent, ExitReason, OrderCommand, OrderRole, OrderTag, Position,
    PositionId, PositionOrigin, Side, Timeframe,
};

use super::registry::OrderRegistry;
use super::trailing::TrailingState;

/// Append-only log entry for a finished position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub id: PositionId,
    pub side: Side,
    pub origin: PositionOrigin,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Slot changes the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened(PositionId),
    Closed(PositionId),
    EntryRejected(PositionId),
}

#[derive(Debug, Clone)]
struct DurationRule {
    after: Duration,
    trailing_distance: f64,
    cancel_take_profit: bool,
}

#[derive(Debug, Clone)]
struct MinHoldRule {
    hold: Duration,
    stop_multiplier: f64,
}

#[derive(Debug, Clone)]
enum SlotState {
    AwaitingFill,
    Open {
        position: Position,
        trailing: TrailingState,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    request: BracketRequest,
    levels: RiskLevels,
    state: SlotState,
    /// Stop still widened by the minimum-hold rule.
    widened: bool,
}

impl Slot {
    fn id(&self) -> PositionId {
        self.request.position_id
    }

    fn fill(&mut self, price: f64, size: f64, timestamp: DateTime<Utc>) -> bool {
        if matches!(self.state, SlotState::Open { .. }) {
            return false;
        }
        let position = Position {
            id: self.request.position_id,
            side: self.request.side,
            entry_price: price,
            size,
            opened_at: timestamp,
            managed_on: self.request.managed_on,
            origin: self.request.origin,
        };
        let trailing = TrailingState::new(self.request.side, self.request.stop_price, &self.levels);
        self.state = SlotState::Open { position, trailing };
        true
    }

    fn close(
        &self,
        reason: ExitReason,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<ClosedPosition> {
        let SlotState::Open { position, .. } = &self.state else {
            return None;
        };
        Some(ClosedPosition {
            id: position.id,
            side: position.side,
            origin: position.origin,
            size: position.size,
            entry_price: position.entry_price,
            exit_price: price,
            reason,
            opened_at: position.opened_at,
            closed_at: timestamp,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleManager {
    trade_size: f64,
    trailing_enabled: bool,
    duration: Option<DurationRule>,
    min_hold: Option<MinHoldRule>,
    registry: OrderRegistry,
    next_id: u64,
    slot: Option<Slot>,
    /// Positions asked to close for a reversal, awaiting their exit report.
    closing: Vec<Slot>,
    closed: Vec<ClosedPosition>,
}

impl LifecycleManager {
    pub fn new(config: &EngineConfig) -> Self {
        let dt = &config.duration_trailing;
        let mh = &config.min_hold;
        Self {
            trade_size: config.trade_size,
            trailing_enabled: config.trailing.enabled,
            duration: dt.enabled.then(|| DurationRule {
                after: Duration::minutes(dt.threshold_minutes),
                trailing_distance: config.pips(dt.trailing_distance_pips),
                cancel_take_profit: dt.cancel_take_profit,
            }),
            min_hold: mh.enabled.then(|| MinHoldRule {
                hold: Duration::minutes(mh.duration_minutes),
                stop_multiplier: mh.stop_multiplier,
            }),
            registry: OrderRegistry::new(),
            next_id: 1,
            slot: None,
            closing: Vec::new(),
            closed: Vec::new(),
        }
    }

    /// Side occupying the slot, filled or not.
    pub fn exposure(&self) -> Option<Side> {
        self.slot.as_ref().map(|s| s.request.side)
    }

    pub fn position(&self) -> Option<&Position> {
        match self.slot.as_ref().map(|s| &s.state) {
            Some(SlotState::Open { position, .. }) => Some(position),
            _ => None,
        }
    }

    pub fn trailing(&self) -> Option<&TrailingState> {
        match self.slot.as_ref().map(|s| &s.state) {
            Some(SlotState::Open { trailing, .. }) => Some(trailing),
            _ => None,
        }
    }

    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    pub fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Reserve the slot and build the bracket for a new position.
    pub fn open(
        &mut self,
        side: Side,
        reference_price: f64,
        levels: RiskLevels,
        managed_on: Timeframe,
        origin: PositionOrigin,
    ) -> OrderCommand {
        let position_id = PositionId(self.next_id);
        self.next_id += 1;

        let stop_distance = match &self.min_hold {
            Some(rule) => levels.stop_distance * rule.stop_multiplier,
            None => levels.stop_distance,
        };
        let request = BracketRequest {
            position_id,
            side,
            size: self.trade_size,
            reference_price,
            stop_price: side.stop_from(reference_price, stop_distance),
            take_profit_price: (levels.target_distance > 0.0)
                .then(|| side.target_from(reference_price, levels.target_distance)),
            managed_on,
            origin,
        };
        info!(
            position = %position_id,
            ?side,
            reference_price,
            stop = request.stop_price,
            target = ?request.take_profit_price,
            ?origin,
            "submitting bracket"
        );
        self.slot = Some(Slot {
            request: request.clone(),
            levels,
            state: SlotState::AwaitingFill,
            widened: self.min_hold.is_some(),
        });
        OrderCommand::SubmitBracket(request)
    }

    /// Release the slot for a reversal and ask the venue to flatten it.
    pub fn close_for_reversal(&mut self) -> Option<OrderCommand> {
        let slot = self.slot.take()?;
        let position_id = slot.id();
        info!(position = %position_id, "closing for reversal");
        self.closing.push(slot);
        Some(OrderCommand::ClosePosition {
            position_id,
            reason: ExitReason::Reversal,
        })
    }

    /// Manage the open position on a bar of its managed timeframe.
    pub fn on_bar(&mut self, bar: &Bar) -> Vec<OrderCommand> {
        let mut commands = Vec::new();
        let Some(slot) = self.slot.as_mut() else {
            return commands;
        };
        let SlotState::Open { position, trailing } = &mut slot.state else {
            return commands;
        };
        if bar.timeframe != position.managed_on {
            return commands;
        }
        let held = bar.timestamp - position.opened_at;
        let stop_tag = OrderTag::protective_stop(position.id);

        if slot.widened {
            if let Some(rule) = &self.min_hold {
                // trailing and escalation wait for the hold period to end
                if held < rule.hold {
                    return commands;
                }
            }
            slot.widened = false;
            let normal = position
                .side
                .stop_from(slot.request.reference_price, slot.levels.stop_distance);
            if let Some(stop) = trailing.tighter(normal) {
                info!(position = %position.id, stop, "minimum hold over, narrowing stop");
                commands.extend(move_stop(&self.registry, stop_tag, trailing, stop, bar.close));
            }
        }

        if let Some(rule) = &self.duration {
            if held >= rule.after && trailing.escalate(rule.trailing_distance) {
                info!(
                    position = %position.id,
                    held_minutes = held.num_minutes(),
                    distance = rule.trailing_distance,
                    "long hold, escalating trailing"
                );
                if rule.cancel_take_profit {
                    let tp_tag = OrderTag::take_profit(position.id);
                    if let Ok(order_id) = self.registry.resolve(tp_tag) {
                        commands.push(OrderCommand::CancelOrder {
                            tag: tp_tag,
                            order_id,
                        });
                    }
                }
            }
        }

        if self.trailing_enabled || trailing.is_escalated() {
            let profit = position.profit_distance(bar.close);
            if trailing.activate_on_profit(profit) {
                info!(position = %position.id, profit, "trailing activated");
            }
            if let Some(stop) = trailing.candidate(bar.close) {
                commands.extend(move_stop(&self.registry, stop_tag, trailing, stop, bar.close));
            }
        }
        commands
    }

    /// Apply one execution report.
    pub fn on_event(&mut self, event: &ExecutionEvent) -> Option<Transition> {
        match event {
            ExecutionEvent::OrderAccepted { tag, order_id } => {
                if self.tracks(tag.position_id) {
                    self.registry.record_accepted(*tag, *order_id);
                } else {
                    debug!(%tag, %order_id, "acceptance for untracked position");
                }
                None
            }
            ExecutionEvent::OrderRejected { tag, reason } => self.on_rejected(*tag, reason),
            ExecutionEvent::OrderModified {
                tag,
                new_order_id,
                trigger_price,
                ..
            } => {
                if let Err(err) = self.registry.record_modified(*tag, *new_order_id) {
                    debug!(%err, "modification for untracked order");
                    return None;
                }
                if tag.role == OrderRole::ProtectiveStop {
                    if let Some(Slot {
                        state: SlotState::Open { trailing, .. },
                        ..
                    }) = self.open_slot_mut(tag.position_id)
                    {
                        trailing.confirm(*trigger_price);
                    }
                }
                None
            }
            ExecutionEvent::OrderCancelled { tag, order_id } => {
                self.registry.remove_if(*tag, *order_id);
                if tag.role == OrderRole::Entry {
                    // a reversal caught an unfilled entry
                    self.closing.retain(|s| {
                        s.id() != tag.position_id || matches!(s.state, SlotState::Open { .. })
                    });
                }
                None
            }
            ExecutionEvent::EntryFilled {
                position_id,
                price,
                size,
                timestamp,
                ..
            } => self.on_entry_filled(*position_id, *price, *size, *timestamp),
            ExecutionEvent::ExitFilled {
                position_id,
                reason,
                price,
                timestamp,
            } => self.on_exit_filled(*position_id, *reason, *price, *timestamp),
        }
    }

    fn tracks(&self, position_id: PositionId) -> bool {
        self.slot.as_ref().is_some_and(|s| s.id() == position_id)
            || self.closing.iter().any(|s| s.id() == position_id)
    }

    /// The open slot for `position_id`.
    fn open_slot_mut(&mut self, position_id: PositionId) -> Option<&mut Slot> {
        self.slot
            .as_mut()
            .filter(|s| s.id() == position_id && matches!(s.state, SlotState::Open { .. }))
    }

    /// A refused stop move leaves the venue at the last acknowledged level:
    /// roll the trailing state back so the move is proposed again.
    fn on_stop_rejected(&mut self, tag: OrderTag, reason: &str) {
        let hold_multiplier = self.min_hold.as_ref().map(|r| r.stop_multiplier);
        let Some(slot) = self.open_slot_mut(tag.position_id) else {
            debug!(%tag, reason, "stop rejection for untracked position");
            return;
        };
        let Slot {
            request,
            levels,
            state,
            widened,
        } = slot;
        let SlotState::Open { trailing, .. } = state else {
            return;
        };
        let attempted = trailing.current_stop();
        let last_trail_price = trailing.last_trail_price();
        if !trailing.rollback() {
            warn!(%tag, reason, "stop request rejected");
            return;
        }
        let normal = request
            .side
            .stop_from(request.reference_price, levels.stop_distance);
        if hold_multiplier.is_some() && request.side.is_tighter(normal, trailing.confirmed_stop()) {
            // the minimum-hold narrowing itself was refused
            *widened = true;
        }
        warn!(
            %tag,
            reason,
            ?attempted,
            ?last_trail_price,
            confirmed = trailing.confirmed_stop(),
            "stop move rejected, rolled back to the acknowledged level"
        );
    }

    fn on_rejected(&mut self, tag: OrderTag, reason: &str) -> Option<Transition> {
        if tag.role == OrderRole::ProtectiveStop {
            self.on_stop_rejected(tag, reason);
            return None;
        }
        if tag.role != OrderRole::Entry {
            // the venue still holds the order under its last known identity
            warn!(%tag, reason, "order request rejected");
            return None;
        }
        self.registry.remove(tag);
        let awaiting = self.slot.as_ref().is_some_and(|s| {
            s.id() == tag.position_id && matches!(s.state, SlotState::AwaitingFill)
        });
        if awaiting {
            warn!(%tag, reason, "entry rejected, slot released");
            self.slot = None;
            self.registry.forget_position(tag.position_id);
            return Some(Transition::EntryRejected(tag.position_id));
        }
        self.closing.retain(|s| s.id() != tag.position_id);
        debug!(%tag, reason, "entry rejection for untracked position");
        None
    }

    fn on_entry_filled(
        &mut self,
        position_id: PositionId,
        price: f64,
        size: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<Transition> {
        if let Some(slot) = self.slot.as_mut().filter(|s| s.id() == position_id) {
            if slot.fill(price, size, timestamp) {
                info!(position = %position_id, price, %timestamp, "position opened");
                return Some(Transition::Opened(position_id));
            }
            debug!(position = %position_id, "duplicate entry fill");
            return None;
        }
        if let Some(slot) = self.closing.iter_mut().find(|s| s.id() == position_id) {
            slot.fill(price, size, timestamp);
            return None;
        }
        debug!(position = %position_id, "entry fill for untracked position");
        None
    }

    fn on_exit_filled(
        &mut self,
        position_id: PositionId,
        reason: ExitReason,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<Transition> {
        let slot = if self.slot.as_ref().is_some_and(|s| s.id() == position_id) {
            self.slot.take()
        } else {
            self.closing
                .iter()
                .position(|s| s.id() == position_id)
                .map(|i| self.closing.remove(i))
        };
        let Some(slot) = slot else {
            debug!(position = %position_id, "exit fill for untracked position");
            return None;
        };
        self.registry.forget_position(position_id);
        match slot.close(reason, price, timestamp) {
            Some(closed) => {
                info!(
                    position = %position_id,
                    ?reason,
                    entry_price = closed.entry_price,
                    exit_price = price,
                    "position closed"
                );
                self.closed.push(closed);
            }
            None => warn!(position = %position_id, "exit fill before entry fill"),
        }
        Some(Transition::Closed(position_id))
    }
}

/// Emit a stop modification through the registry; an unresolvable stop resets trailing.
fn move_stop(
    registry: &OrderRegistry,
    tag: OrderTag,
    trailing: &mut TrailingState,
    stop: f64,
    close: f64,
) -> Option<OrderCommand> {
    match registry.resolve(tag) {
        Ok(order_id) => {
            trailing.commit(stop, close);
            Some(OrderCommand::ModifyStop {
                tag,
                order_id,
                trigger_price: stop,
            })
        }
        Err(err) => {
            warn!(%err, "cannot move stop, resetting trailing");
            trailing.reset();
            None
        }
    }
}
