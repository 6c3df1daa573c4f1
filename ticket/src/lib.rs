//! Shared arithmetic primitives consumed by both `fair_group` and
//! `fair_queue`: the `(weight, size)` cost pair (`Ticket`), its fixed-point
//! conversion to a scalar `Capacity`, and the wrap-around `Rover` counter
//! used to track capacity issuance across shards.
//!
//! Pure, synchronous, allocation-free — no crate in this workspace should
//! ever need to treat these as fallible.

mod capacity;
mod rover;
mod ticket;

pub use capacity::{ticket_capacity, Capacity, FIXED_POINT_FACTOR};
pub use rover::{wdiff, Rover};
pub use ticket::Ticket;
