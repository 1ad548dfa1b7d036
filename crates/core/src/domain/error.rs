// Domain Error Types

use super::ItemId;
use thiserror::Error;

/// Delivery contract violations detected by the consumer
///
/// Every variant is fatal for the consumer loop: the producer/queue contract
/// is broken and there is nothing to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("item {0} does not have a valid id")]
    InvalidIdentifier(ItemId),

    #[error("item {0} was handled already")]
    DuplicateDelivery(ItemId),

    #[error("item {id} is not in the right order, expected item {expected}")]
    OutOfOrderDelivery { id: ItemId, expected: ItemId },
}

impl DomainError {
    /// Identifier of the item that was rejected
    pub fn item_id(&self) -> ItemId {
        match self {
            DomainError::InvalidIdentifier(id) | DomainError::DuplicateDelivery(id) => *id,
            DomainError::OutOfOrderDelivery { id, .. } => *id,
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
