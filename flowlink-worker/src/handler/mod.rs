//! Handler invocation and job execution

mod arguments;
mod error;
mod invocation;
mod pipeline;

pub use arguments::Arguments;
pub use error::{HandlerError, short_type_name};
pub use invocation::{HandlerResult, WorkerHandler};
pub use pipeline::{ExecutionPool, JobOutcome, JobPipeline, JobState};
