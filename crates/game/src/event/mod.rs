mod types;

pub use types::{DeliveryMethod, Direction, EventKind, RelayEvent};
