// Item Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Item identifier, assigned by the producer starting at 1
pub type ItemId = i64;

/// Unit of work travelling through the queue
///
/// The identifier is the only field the queue and the consumer inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
}

impl Item {
    pub fn new(id: ItemId) -> Self {
        Self { id }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item #{}", self.id)
    }
}
