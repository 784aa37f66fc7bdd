//! Post-commit notifications.
//!
//! The engine APIs publish an event after each committed change that other parts of the system may want to react to
//! (a reservation sweep expiring orders, a product's catalog price moving, and so on). Subscribers register plain async
//! closures as [`EventHooks`]; [`EventHandlers`] turns them into channel-backed handlers and hands out the
//! [`EventProducers`] that the APIs publish through.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
