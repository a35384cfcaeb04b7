//! Shared kernel for the order fulfillment services.
//!
//! Every service (counter, barista, kitchen) depends on this crate for:
//! - Strongly typed identifiers
//! - The enums carried on the wire and in storage
//! - The integration events exchanged over the broker, with their codec

pub mod enums;
pub mod events;
pub mod money;
pub mod types;

pub use enums::{InvalidCode, ItemType, Location, OrderSource, Status};
pub use events::{DomainEvent, EventDecodeError, ItemOrdered, ItemReady, message_types};
pub use money::Money;
pub use types::{LineItemId, LoyaltyMemberId, OrderId};
