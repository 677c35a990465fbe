//! Live venue order identities, keyed by logical tag.
//!
//! Venues may replace an order's identity (a stop modification often comes back
//! as a new order), so the lifecycle never caches an `OrderId`. Every use goes
//! through `resolve(tag)`.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{OrderId, OrderTag, PositionId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no live order registered for {0}")]
    Unresolved(OrderTag),
}

#[derive(Debug, Clone, Default)]
pub struct OrderRegistry {
    by_tag: HashMap<OrderTag, OrderId>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&mut self, tag: OrderTag, order_id: OrderId) {
        self.by_tag.insert(tag, order_id);
    }

    /// The venue replaced the order behind `tag`; the new id wins.
    pub fn record_modified(&mut self, tag: OrderTag, new_order_id: OrderId) -> Result<(), RegistryError> {
        match self.by_tag.get_mut(&tag) {
            Some(id) => {
                *id = new_order_id;
                Ok(())
            }
            None => Err(RegistryError::Unresolved(tag)),
        }
    }

    /// Drop `tag` if it still maps to `order_id`. Stale ids leave the entry alone.
    pub fn remove_if(&mut self, tag: OrderTag, order_id: OrderId) -> bool {
        if self.by_tag.get(&tag) == Some(&order_id) {
            self.by_tag.remove(&tag);
            return true;
        }
        false
    }

    pub fn remove(&mut self, tag: OrderTag) -> Option<OrderId> {
        self.by_tag.remove(&tag)
    }

    pub fn resolve(&self, tag: OrderTag) -> Result<OrderId, RegistryError> {
        self.by_tag
            .get(&tag)
            .copied()
            .ok_or(RegistryError::Unresolved(tag))
    }

    /// Forget every order of a closed position.
    pub fn forget_position(&mut self, position_id: PositionId) {
        self.by_tag.retain(|tag, _| tag.position_id != position_id);
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_replaces_identity() {
        let mut reg = OrderRegistry::new();
        let tag = OrderTag::protective_stop(PositionId(1));
        reg.record_accepted(tag, OrderId(10));
        reg.record_modified(tag, OrderId(11)).unwrap();
        assert_eq!(reg.resolve(tag), Ok(OrderId(11)));
        // the old id no longer removes anything
        assert!(!reg.remove_if(tag, OrderId(10)));
        assert!(reg.remove_if(tag, OrderId(11)));
        assert_eq!(reg.resolve(tag), Err(RegistryError::Unresolved(tag)));
    }

    #[test]
    fn modify_of_unknown_tag_is_an_error() {
        let mut reg = OrderRegistry::new();
        let tag = OrderTag::protective_stop(PositionId(3));
        assert_eq!(
            reg.record_modified(tag, OrderId(1)),
            Err(RegistryError::Unresolved(tag))
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn forget_position_keeps_others() {
        let mut reg = OrderRegistry::new();
        reg.record_accepted(OrderTag::protective_stop(PositionId(1)), OrderId(1));
        reg.record_accepted(OrderTag::take_profit(PositionId(1)), OrderId(2));
        reg.record_accepted(OrderTag::protective_stop(PositionId(2)), OrderId(3));
        reg.forget_position(PositionId(1));
        assert_eq!(reg.len(), 1);
        assert!(reg.resolve(OrderTag::protective_stop(PositionId(2))).is_ok());
    }

    #[test]
    fn error_names_the_tag() {
        let err = RegistryError::Unresolved(OrderTag::protective_stop(PositionId(7)));
        assert_eq!(
            err.to_string(),
            "no live order registered for protective-stop-for-position-7"
        );
    }
}
