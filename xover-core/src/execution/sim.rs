//! Simulated venue.
//!
//! - Market entries fill immediately at the bracket's reference price.
//! - Stops and targets are checked against each bar of the price timeframe.
//!   Stop before target when both are in range; a gap through the trigger
//!   fills at the open.
//! - Every stop modification replaces the order under a new `OrderId`.
//! - Submissions can be switched to reject, to exercise the flat-revert path.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{
    Bar, BracketRequest, ExecutionEvent, ExitReason, OrderCommand, OrderId, OrderTag, PositionId,
    Side, Timeframe,
};
use crate::engine::StrategyEngine;

use super::OrderExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Stop,
    Target,
}

#[derive(Debug, Clone)]
struct WorkingOrder {
    tag: OrderTag,
    leg: Leg,
    price: f64,
}

#[derive(Debug, Clone, Copy)]
struct SimPosition {
    side: Side,
    entry_price: f64,
}

#[derive(Debug, Clone)]
pub struct SimulatedVenue {
    price_timeframe: Timeframe,
    next_order_id: u64,
    orders: BTreeMap<OrderId, WorkingOrder>,
    positions: BTreeMap<PositionId, SimPosition>,
    last_close: Option<f64>,
    clock: DateTime<Utc>,
    reject_submissions: bool,
}

impl SimulatedVenue {
    /// A venue that reads prices from bars of `price_timeframe` only.
    pub fn new(price_timeframe: Timeframe) -> Self {
        Self {
            price_timeframe,
            next_order_id: 1,
            orders: BTreeMap::new(),
            positions: BTreeMap::new(),
            last_close: None,
            clock: DateTime::<Utc>::default(),
            reject_submissions: false,
        }
    }

    /// A venue priced on the fastest timeframe the engine routes.
    pub fn for_engine(engine: &StrategyEngine) -> Self {
        let fastest = engine
            .router()
            .timeframes()
            .min_by_key(|tf| tf.duration())
            .unwrap_or(engine.config().primary_timeframe);
        Self::new(fastest)
    }

    pub fn set_reject_submissions(&mut self, reject: bool) {
        self.reject_submissions = reject;
    }

    pub fn price_timeframe(&self) -> Timeframe {
        self.price_timeframe
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn working_orders(&self) -> usize {
        self.orders.len()
    }

    /// Current trigger of `position_id`'s protective stop.
    pub fn stop_price(&self, position_id: PositionId) -> Option<f64> {
        self.leg(position_id, Leg::Stop).map(|(_, o)| o.price)
    }

    fn leg(&self, position_id: PositionId, leg: Leg) -> Option<(OrderId, &WorkingOrder)> {
        self.orders
            .iter()
            .find(|(_, o)| o.tag.position_id == position_id && o.leg == leg)
            .map(|(id, o)| (*id, o))
    }

    fn issue_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    fn submit(&mut self, request: &BracketRequest) -> Vec<ExecutionEvent> {
        if self.reject_submissions {
            return vec![ExecutionEvent::OrderRejected {
                tag: request.entry_tag(),
                reason: "submissions disabled".into(),
            }];
        }
        let mut events = Vec::with_capacity(4);
        let entry_id = self.issue_id();
        events.push(ExecutionEvent::OrderAccepted {
            tag: request.entry_tag(),
            order_id: entry_id,
        });
        events.push(ExecutionEvent::EntryFilled {
            position_id: request.position_id,
            side: request.side,
            price: request.reference_price,
            size: request.size,
            timestamp: self.clock,
        });
        self.positions.insert(
            request.position_id,
            SimPosition {
                side: request.side,
                entry_price: request.reference_price,
            },
        );

        let stop_id = self.issue_id();
        self.orders.insert(
            stop_id,
            WorkingOrder {
                tag: request.stop_tag(),
                leg: Leg::Stop,
                price: request.stop_price,
            },
        );
        events.push(ExecutionEvent::OrderAccepted {
            tag: request.stop_tag(),
            order_id: stop_id,
        });

        if let Some(target) = request.take_profit_price {
            let target_id = self.issue_id();
            self.orders.insert(
                target_id,
                WorkingOrder {
                    tag: request.take_profit_tag(),
                    leg: Leg::Target,
                    price: target,
                },
            );
            events.push(ExecutionEvent::OrderAccepted {
                tag: request.take_profit_tag(),
                order_id: target_id,
            });
        }
        events
    }

    fn modify(
        &mut self,
        tag: OrderTag,
        order_id: OrderId,
        trigger_price: f64,
    ) -> Vec<ExecutionEvent> {
        match self.orders.remove(&order_id) {
            Some(mut order) if order.tag == tag => {
                order.price = trigger_price;
                let new_order_id = self.issue_id();
                self.orders.insert(new_order_id, order);
                vec![ExecutionEvent::OrderModified {
                    tag,
                    old_order_id: order_id,
                    new_order_id,
                    trigger_price,
                }]
            }
            other => {
                if let Some(order) = other {
                    self.orders.insert(order_id, order);
                }
                vec![ExecutionEvent::OrderRejected {
                    tag,
                    reason: format!("unknown order {order_id}"),
                }]
            }
        }
    }

    fn cancel(&mut self, tag: OrderTag, order_id: OrderId) -> Vec<ExecutionEvent> {
        match self.orders.get(&order_id) {
            Some(order) if order.tag == tag => {
                self.orders.remove(&order_id);
                vec![ExecutionEvent::OrderCancelled { tag, order_id }]
            }
            _ => vec![ExecutionEvent::OrderRejected {
                tag,
                reason: format!("unknown order {order_id}"),
            }],
        }
    }

    /// Cancel every working leg of `position_id` and report the exit.
    fn flatten(
        &mut self,
        position_id: PositionId,
        reason: ExitReason,
        price: f64,
    ) -> Vec<ExecutionEvent> {
        let legs: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|(_, o)| o.tag.position_id == position_id)
            .map(|(id, _)| *id)
            .collect();
        let mut events = Vec::with_capacity(legs.len() + 1);
        for order_id in legs {
            if let Some(order) = self.orders.remove(&order_id) {
                events.push(ExecutionEvent::OrderCancelled {
                    tag: order.tag,
                    order_id,
                });
            }
        }
        self.positions.remove(&position_id);
        events.push(ExecutionEvent::ExitFilled {
            position_id,
            reason,
            price,
            timestamp: self.clock,
        });
        events
    }

    fn close(&mut self, position_id: PositionId, reason: ExitReason) -> Vec<ExecutionEvent> {
        let Some(position) = self.positions.get(&position_id).copied() else {
            debug!(position = %position_id, "close for unknown position");
            return Vec::new();
        };
        let price = self.last_close.unwrap_or(position.entry_price);
        self.flatten(position_id, reason, price)
    }
}

/// Fill price of a resting leg on `bar`, if the bar reaches it.
fn leg_fill(side: Side, leg: Leg, price: f64, bar: &Bar) -> Option<f64> {
    match (side, leg) {
        // sell stop
        (Side::Long, Leg::Stop) => (bar.low <= price).then(|| bar.open.min(price)),
        // buy stop
        (Side::Short, Leg::Stop) => (bar.high >= price).then(|| bar.open.max(price)),
        // sell limit
        (Side::Long, Leg::Target) => (bar.high >= price).then(|| bar.open.max(price)),
        // buy limit
        (Side::Short, Leg::Target) => (bar.low <= price).then(|| bar.open.min(price)),
    }
}

impl OrderExecutor for SimulatedVenue {
    fn execute(&mut self, command: &OrderCommand) -> Vec<ExecutionEvent> {
        match command {
            OrderCommand::SubmitBracket(request) => self.submit(request),
            OrderCommand::ModifyStop {
                tag,
                order_id,
                trigger_price,
            } => self.modify(*tag, *order_id, *trigger_price),
            OrderCommand::CancelOrder { tag, order_id } => self.cancel(*tag, *order_id),
            OrderCommand::ClosePosition {
                position_id,
                reason,
            } => self.close(*position_id, *reason),
        }
    }

    fn on_bar(&mut self, bar: &Bar) -> Vec<ExecutionEvent> {
        if bar.timeframe != self.price_timeframe || bar.is_void() {
            return Vec::new();
        }
        self.clock = bar.timestamp;
        let mut events = Vec::new();
        let positions: Vec<(PositionId, SimPosition)> =
            self.positions.iter().map(|(id, p)| (*id, *p)).collect();
        for (position_id, position) in positions {
            let hit = [Leg::Stop, Leg::Target].into_iter().find_map(|leg| {
                self.leg(position_id, leg)
                    .and_then(|(_, o)| leg_fill(position.side, leg, o.price, bar))
                    .map(|price| (leg, price))
            });
            if let Some((leg, price)) = hit {
                let reason = match leg {
                    Leg::Stop => ExitReason::StopLoss,
                    Leg::Target => ExitReason::TakeProfit,
                };
                // the filled leg is reported through the exit, only siblings are cancelled
                let filled = self.leg(position_id, leg).map(|(id, _)| id);
                if let Some(filled_id) = filled {
                    self.orders.remove(&filled_id);
                }
                events.extend(self.flatten(position_id, reason, price));
            }
        }
        self.last_close = Some(bar.close);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionOrigin;
    use chrono::TimeZone;

    fn m1() -> Timeframe {
        Timeframe::minutes(1)
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timeframe: m1(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn bracket(side: Side, stop: f64, target: Option<f64>) -> OrderCommand {
        OrderCommand::SubmitBracket(BracketRequest {
            position_id: PositionId(1),
            side,
            size: 1.0,
            reference_price: 100.0,
            stop_price: stop,
            take_profit_price: target,
            managed_on: m1(),
            origin: PositionOrigin::Primary,
        })
    }

    fn exit_of(events: &[ExecutionEvent]) -> Option<(ExitReason, f64)> {
        events.iter().find_map(|e| match e {
            ExecutionEvent::ExitFilled { reason, price, .. } => Some((*reason, *price)),
            _ => None,
        })
    }

    #[test]
    fn bracket_fills_entry_and_rests_legs() {
        let mut venue = SimulatedVenue::new(m1());
        let events = venue.execute(&bracket(Side::Long, 95.0, Some(110.0)));
        assert_eq!(events.len(), 4);
        assert!(matches!(events[1], ExecutionEvent::EntryFilled { price, .. } if price == 100.0));
        assert_eq!(venue.working_orders(), 2);
        assert_eq!(venue.stop_price(PositionId(1)), Some(95.0));
    }

    #[test]
    fn stop_triggers_intrabar_and_gaps_at_open() {
        let mut venue = SimulatedVenue::new(m1());
        venue.execute(&bracket(Side::Long, 95.0, None));
        assert!(venue.on_bar(&bar(99.0, 100.0, 96.0, 97.0)).is_empty());
        let events = venue.on_bar(&bar(96.0, 96.0, 94.0, 95.5));
        assert_eq!(exit_of(&events), Some((ExitReason::StopLoss, 95.0)));

        let mut venue = SimulatedVenue::new(m1());
        venue.execute(&bracket(Side::Long, 95.0, None));
        let events = venue.on_bar(&bar(93.0, 94.0, 92.0, 93.5));
        assert_eq!(exit_of(&events), Some((ExitReason::StopLoss, 93.0)));
        assert_eq!(venue.open_positions(), 0);
        assert_eq!(venue.working_orders(), 0);
    }

    #[test]
    fn short_target_cancels_stop() {
        let mut venue = SimulatedVenue::new(m1());
        venue.execute(&bracket(Side::Short, 105.0, Some(90.0)));
        let events = venue.on_bar(&bar(92.0, 93.0, 89.0, 89.5));
        assert_eq!(exit_of(&events), Some((ExitReason::TakeProfit, 90.0)));
        assert!(events.iter().any(|e| matches!(
            e,
            ExecutionEvent::OrderCancelled { tag, .. } if *tag == OrderTag::protective_stop(PositionId(1))
        )));
    }

    #[test]
    fn modify_issues_new_identity() {
        let mut venue = SimulatedVenue::new(m1());
        venue.execute(&bracket(Side::Long, 95.0, None));
        let tag = OrderTag::protective_stop(PositionId(1));
        let events = venue.execute(&OrderCommand::ModifyStop {
            tag,
            order_id: OrderId(2),
            trigger_price: 98.0,
        });
        assert_eq!(
            events,
            vec![ExecutionEvent::OrderModified {
                tag,
                old_order_id: OrderId(2),
                new_order_id: OrderId(3),
                trigger_price: 98.0,
            }]
        );
        // the old identity is gone
        let stale = venue.execute(&OrderCommand::ModifyStop {
            tag,
            order_id: OrderId(2),
            trigger_price: 99.0,
        });
        assert!(matches!(stale[0], ExecutionEvent::OrderRejected { .. }));
        assert_eq!(venue.stop_price(PositionId(1)), Some(98.0));
    }

    #[test]
    fn reject_mode_rejects_entry() {
        let mut venue = SimulatedVenue::new(m1());
        venue.set_reject_submissions(true);
        let events = venue.execute(&bracket(Side::Long, 95.0, None));
        assert!(matches!(
            events.as_slice(),
            [ExecutionEvent::OrderRejected { tag, .. }] if *tag == OrderTag::entry(PositionId(1))
        ));
        assert_eq!(venue.open_positions(), 0);
    }

    #[test]
    fn close_fills_at_last_close() {
        let mut venue = SimulatedVenue::new(m1());
        venue.on_bar(&bar(100.0, 101.0, 99.0, 100.5));
        venue.execute(&bracket(Side::Long, 95.0, Some(110.0)));
        venue.on_bar(&bar(100.5, 102.0, 100.0, 101.5));
        let events = venue.execute(&OrderCommand::ClosePosition {
            position_id: PositionId(1),
            reason: ExitReason::Reversal,
        });
        assert_eq!(exit_of(&events), Some((ExitReason::Reversal, 101.5)));
        assert_eq!(events.len(), 3);
        assert!(venue
            .execute(&OrderCommand::ClosePosition {
                position_id: PositionId(1),
                reason: ExitReason::Reversal,
            })
            .is_empty());
    }

    #[test]
    fn other_timeframes_do_not_move_prices() {
        let mut venue = SimulatedVenue::new(m1());
        venue.execute(&bracket(Side::Long, 95.0, None));
        let mut b = bar(90.0, 90.0, 80.0, 85.0);
        b.timeframe = Timeframe::minutes(15);
        assert!(venue.on_bar(&b).is_empty());
        assert_eq!(venue.open_positions(), 1);
    }
}
