//! Broker connectivity
//!
//! The [`ConnectionSupervisor`] is the only component that creates or
//! destroys the broker client. Everything else reads a snapshot through
//! [`ConnectionSupervisor::client`].

mod factory;
mod health;
mod supervisor;

pub use factory::{ClientFactory, GatewayClientFactory};
pub use health::evaluate;
pub use supervisor::{ConnectionEvent, ConnectionSupervisor};
