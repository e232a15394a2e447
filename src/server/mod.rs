//! Single work queue in front of the engine
//!
//! Connections send [`Inbound`] messages into one unbounded queue. The pump
//! task drains it strictly in arrival order, holding the engine lock for the
//! whole of each action, and broadcasts everything the engine produces.
//! While a resolution is suspended on a participant's choice, unrelated
//! messages are held back (in order) until the choice arrives, the
//! participant disconnects or the feedback timeout fires.

pub mod bot;
pub mod messages;
pub mod pump;

pub use bot::run_bot;
pub use messages::Inbound;
pub use pump::{spawn, PumpConfig, ServerHandle};
