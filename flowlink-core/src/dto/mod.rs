//! Data Transfer Objects for commands sent to the broker
//!
//! Each command the client can issue has one strongly-typed request struct
//! here. Requests are plain data; validation of their arguments happens in the
//! layer that dispatches them.

pub mod deployment;
pub mod instance;
pub mod job;
pub mod message;
