//! Completion callbacks
//!
//! Every driver operation is an awaitable returning [`MigrateResult`]. Runners
//! that prefer completion callbacks wrap the same future here; the callback
//! receives exactly the result the await would have produced.

use std::future::Future;

use crate::error::MigrateResult;

/// Await `operation` and hand its result to `callback`
pub async fn notify<T, Fut, F>(operation: Fut, callback: F)
where
    Fut: Future<Output = MigrateResult<T>>,
    F: FnOnce(MigrateResult<T>),
{
    callback(operation.await)
}

/// Callback style for any adapter future
pub trait CompletionExt<T>: Future<Output = MigrateResult<T>> + Sized {
    fn on_complete<F>(self, callback: F) -> impl Future<Output = ()>
    where
        F: FnOnce(MigrateResult<T>),
    {
        notify(self, callback)
    }
}

impl<T, Fut> CompletionExt<T> for Fut where Fut: Future<Output = MigrateResult<T>> {}
