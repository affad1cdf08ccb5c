//! The session core: state, events, the latest-wins slots and the reactor
//! that owns them.

pub mod event;
pub mod interim;
pub mod reactor;
pub mod segment;
pub mod slot;
pub mod state;
pub mod store;
pub mod telemetry;
