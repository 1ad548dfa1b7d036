// Delivery validation: exactly once, no gaps, ascending from 1

use super::error::{DomainError, Result};
use super::{Item, ItemId};
use std::collections::HashSet;

/// Ordering and uniqueness state owned by a single consumer
///
/// Not shared between tasks, so it needs no locking.
#[derive(Debug, Default)]
pub struct DeliveryValidator {
    seen: HashSet<ItemId>,
    last_accepted: ItemId,
    accepted: ItemId,
}

impl DeliveryValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate an item and record it when accepted
    ///
    /// Rules are checked in this order:
    /// 1. id must be positive
    /// 2. id must not have been accepted before
    /// 3. id must equal `last_accepted + 1`
    ///
    /// A rejected item leaves the state untouched.
    pub fn validate(&mut self, item: &Item) -> Result<()> {
        if item.id <= 0 {
            return Err(DomainError::InvalidIdentifier(item.id));
        }
        if self.seen.contains(&item.id) {
            return Err(DomainError::DuplicateDelivery(item.id));
        }
        let expected = self.expected_next();
        if item.id != expected {
            return Err(DomainError::OutOfOrderDelivery {
                id: item.id,
                expected,
            });
        }

        self.seen.insert(item.id);
        self.last_accepted = item.id;
        self.accepted += 1;
        Ok(())
    }

    /// Last accepted identifier (0 before the first item)
    pub fn last_accepted(&self) -> ItemId {
        self.last_accepted
    }

    pub fn expected_next(&self) -> ItemId {
        self.last_accepted + 1
    }

    pub fn accepted_count(&self) -> ItemId {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(ids: &[ItemId]) -> (DeliveryValidator, Vec<Result<()>>) {
        let mut validator = DeliveryValidator::new();
        let results = ids
            .iter()
            .map(|id| validator.validate(&Item::new(*id)))
            .collect();
        (validator, results)
    }

    #[test]
    fn test_accepts_contiguous_sequence() {
        let (validator, results) = feed(&[1, 2, 3]);

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(validator.last_accepted(), 3);
        assert_eq!(validator.accepted_count(), 3);
    }

    #[test]
    fn test_rejects_gap() {
        let (validator, results) = feed(&[1, 3]);

        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(DomainError::OutOfOrderDelivery { id: 3, expected: 2 })
        );
        assert_eq!(validator.last_accepted(), 1);
    }

    #[test]
    fn test_rejects_duplicate() {
        let (validator, results) = feed(&[1, 1]);

        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(DomainError::DuplicateDelivery(1)));
        assert_eq!(validator.accepted_count(), 1);
    }

    #[test]
    fn test_rejects_non_positive_id() {
        let (validator, results) = feed(&[0]);
        assert_eq!(results[0], Err(DomainError::InvalidIdentifier(0)));

        let (_, results) = feed(&[-7]);
        assert_eq!(results[0], Err(DomainError::InvalidIdentifier(-7)));

        assert_eq!(validator.last_accepted(), 0);
        assert_eq!(validator.accepted_count(), 0);
    }

    #[test]
    fn test_first_item_must_be_one() {
        let (_, results) = feed(&[2]);
        assert_eq!(
            results[0],
            Err(DomainError::OutOfOrderDelivery { id: 2, expected: 1 })
        );
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let mut validator = DeliveryValidator::new();
        validator.validate(&Item::new(1)).unwrap();
        assert!(validator.validate(&Item::new(5)).is_err());

        // The expected id is still available after a rejection
        validator.validate(&Item::new(2)).unwrap();
        assert_eq!(validator.last_accepted(), 2);
    }

    #[test]
    fn test_error_messages_name_item_and_rule() {
        let err = DomainError::OutOfOrderDelivery { id: 3, expected: 2 };
        assert_eq!(err.item_id(), 3);
        assert_eq!(
            err.to_string(),
            "item 3 is not in the right order, expected item 2"
        );
        assert!(DomainError::DuplicateDelivery(1)
            .to_string()
            .contains("handled already"));
    }
}
