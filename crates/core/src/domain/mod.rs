// Domain Layer - Pure business logic and entities

pub mod error;
pub mod item;
pub mod validation;

// Re-exports
pub use error::DomainError;
pub use item::{Item, ItemId};
pub use validation::DeliveryValidator;
