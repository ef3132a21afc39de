//! Flowlink worker runtime
//!
//! Registers typed job handlers against a workflow broker and keeps their
//! subscriptions in step with broker connectivity.
//!
//! - `connection`: owns the broker client and probes cluster health
//! - `registry`: one configuration and at most one live subscription per job type
//! - `binder`: resolves handler arguments from an activated job
//! - `handler`: invokes handlers and reports each job's outcome exactly once
//! - `command`: validated broker commands usable from application code
//!
//! # Example
//!
//! ```no_run
//! use flowlink_worker::binder::{Binding, ParameterSpec, TargetType};
//! use flowlink_worker::handler::WorkerHandler;
//! use flowlink_worker::{BrokerConfig, WorkerRuntime, WorkerSpec};
//!
//! #[tokio::main]
//! async fn main() -> flowlink_worker::Result<()> {
//!     let charge = WorkerSpec::new(
//!         "billing",
//!         "charge",
//!         WorkerHandler::blocking(|args| {
//!             let amount: i64 = args.require("amount")?;
//!             Ok(amount > 0)
//!         }),
//!     )
//!     .job_type("charge-card")
//!     .output_variable("charged")
//!     .parameter(ParameterSpec::new("amount", Binding::variable("amount"), TargetType::Integer));
//!
//!     let runtime = WorkerRuntime::builder(BrokerConfig::from_env()?)
//!         .worker(charge)
//!         .build()?;
//!     runtime.start();
//!
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod binder;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod registry;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use command::{Command, CommandKind, CommandOutput, CommandTable};
pub use config::BrokerConfig;
pub use connection::{ConnectionEvent, ConnectionSupervisor};
pub use error::{Result, WorkerError};
pub use handler::{HandlerError, JobOutcome};
pub use registry::{WorkerConfiguration, WorkerRegistry, WorkerSpec, WorkerSpecification};
pub use runtime::{WorkerRuntime, WorkerRuntimeBuilder};
