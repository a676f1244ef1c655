//! Shared data structures for the belt engine
//!
//! - `Item` / `ItemStatus`: the tracked object and its lifecycle
//! - `ItemFields`: partial record carried by snapshots and deltas
//! - `BeltEvent`: discrete physical events
//! - `InboundMessage`: the backend message envelope

mod events;
mod item;
mod messages;

pub use events::*;
pub use item::*;
pub use messages::*;
