//! Handler invocation shapes
//!
//! Every shape is adapted into one completion: zero or one output value, or a
//! failure. A stream's items are collected into a list before reporting.

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::{Arguments, HandlerError};

/// Output of one invocation, `None` when the handler produced nothing
pub type HandlerResult = Result<Option<Value>, HandlerError>;

type BlockingFn = dyn Fn(Arguments) -> HandlerResult + Send + Sync;
type AsyncFn = dyn Fn(Arguments) -> BoxFuture<'static, HandlerResult> + Send + Sync;
type StreamFn = dyn Fn(Arguments) -> BoxStream<'static, Result<Value, HandlerError>> + Send + Sync;

/// A user handler in one of the supported shapes
///
/// The output shape is decided by the variant alone. A `Blocking` or `Async`
/// handler that returns a list reports the list as a single value, and a
/// `Stream` handler always reports a list.
#[derive(Clone)]
pub enum WorkerHandler {
    /// Synchronous function, run on the blocking pool
    Blocking(Arc<BlockingFn>),
    /// Future resolving to zero or one value
    Async(Arc<AsyncFn>),
    /// Stream of values collected into a list
    Stream(Arc<StreamFn>),
}

impl WorkerHandler {
    /// Wrap a synchronous handler
    ///
    /// Returning `()`, `None` or JSON `null` counts as no output.
    pub fn blocking<F, R>(handler: F) -> Self
    where
        F: Fn(Arguments) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Serialize,
    {
        Self::Blocking(Arc::new(move |args| handler(args).and_then(|r| to_output(&r))))
    }

    /// Wrap a handler returning a future
    pub fn future<F, Fut, R>(handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Serialize,
    {
        Self::Async(Arc::new(move |args| {
            let fut = handler(args);
            async move { fut.await.and_then(|r| to_output(&r)) }.boxed()
        }))
    }

    /// Wrap a handler returning a stream
    pub fn stream<F, S, R>(handler: F) -> Self
    where
        F: Fn(Arguments) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<R, HandlerError>> + Send + 'static,
        R: Serialize,
    {
        Self::Stream(Arc::new(move |args| {
            handler(args)
                .map(|item| item.and_then(|r| Ok(serde_json::to_value(&r)?)))
                .boxed()
        }))
    }

    /// Name of the shape, for logging
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Blocking(_) => "blocking",
            Self::Async(_) => "async",
            Self::Stream(_) => "stream",
        }
    }

    /// Run the handler to completion
    ///
    /// Panics are caught and reported as wrapped failures.
    pub async fn invoke(&self, args: Arguments) -> HandlerResult {
        match self {
            Self::Blocking(handler) => {
                let handler = Arc::clone(handler);
                match tokio::task::spawn_blocking(move || handler(args)).await {
                    Ok(result) => result,
                    Err(e) => Err(HandlerError::panicked(e.to_string())),
                }
            }
            Self::Async(handler) => {
                // The closure itself may panic before yielding a future
                let handler = Arc::clone(handler);
                match AssertUnwindSafe(async move { handler(args).await })
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => Err(HandlerError::panicked(panic_message(panic.as_ref()))),
                }
            }
            Self::Stream(handler) => {
                let handler = Arc::clone(handler);
                let collected =
                    AssertUnwindSafe(async move { handler(args).try_collect::<Vec<Value>>().await })
                        .catch_unwind()
                        .await;
                match collected {
                    Ok(items) => items.map(|items| Some(Value::Array(items))),
                    Err(panic) => Err(HandlerError::panicked(panic_message(panic.as_ref()))),
                }
            }
        }
    }
}

impl std::fmt::Debug for WorkerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WorkerHandler").field(&self.shape()).finish()
    }
}

fn to_output<R: Serialize>(result: &R) -> HandlerResult {
    match serde_json::to_value(result)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
