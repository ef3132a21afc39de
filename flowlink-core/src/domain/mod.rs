//! Core domain types
//!
//! These types represent what the broker hands to a client: units of work,
//! cluster topology and the results of deployments and instance creation.
//! They are shared between the client (which decodes them) and the worker
//! framework (which consumes them).

pub mod deployment;
pub mod health;
pub mod instance;
pub mod job;
pub mod topology;
