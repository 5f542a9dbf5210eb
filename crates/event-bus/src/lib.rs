//! Event Bus (C1): single-threaded cooperative scheduling for
//! publish/subscribe between the agent step loop, the browser session,
//! and the watchdogs. Handlers for one event class run sequentially in
//! registration order; `dispatch` never throws, `dispatch_or_throw`
//! aggregates every handler failure (or a timeout) into one error.

#![allow(dead_code)]

pub mod bus;
pub mod errors;
pub mod types;

pub use bus::{EventBus, EventHandler};
pub use errors::{check_name_uniqueness, EventBusError, HandlerError, NameCollisionError};
pub use types::{BusEvent, EventAggregate, EventEnvelope, HandlerResult};
