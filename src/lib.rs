pub mod config;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod recognition;
pub mod services;

pub use config::SessionConfig;
pub use kernel::reactor::{Session, SessionHandle};
