//! Data models for the Wishbox backend.
//!
//! Field names are the snake_case wire contract shared by the REST API and
//! the push events.

mod contribution;
pub(crate) mod item;
mod money;
mod reservation;
mod wishlist;

pub use contribution::*;
pub use item::*;
pub use money::*;
pub use reservation::*;
pub use wishlist::*;
