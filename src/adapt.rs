//! Calling-convention adaptation.
//!
//! The core operations are async: the returned future is the deferred value.
//! This layer adapts that surface to a continuation-passing convention for
//! callers that want one, chosen explicitly at build time through
//! [`CallStyle`] rather than inferred from argument shapes. Adaptation wraps
//! the outermost call only; handler dispatch and event ordering are
//! untouched.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::core::Result;
use crate::dispatch::{Collection, Query};
use crate::record::Record;
use crate::schema::ModelType;

/// The calling convention a model declares for its public operations.
///
/// The declaration is advisory: it records intent for the model's consumers
/// and is readable through
/// [`ModelType::call_style`](crate::schema::ModelType::call_style), but both
/// surfaces stay available on every model. Requesting the callback adapter
/// on a deferred-style model only logs the mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallStyle {
    /// Operations return deferred values (futures / [`Thunk`]s).
    #[default]
    Deferred,
    /// Operations accept a terminal continuation; see [`CallbackModel`].
    Callback,
}

/// A deferred operation result: awaitable directly, or resolvable through a
/// single terminal continuation.
pub struct Thunk<T> {
    fut: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> Thunk<T> {
    pub fn new(fut: impl Future<Output = Result<T>> + Send + 'static) -> Self {
        Self { fut: fut.boxed() }
    }

    pub async fn resolve(self) -> Result<T> {
        self.fut.await
    }

    /// Spawn the deferred work on the current tokio runtime and hand the
    /// outcome to `callback`. The callback is invoked exactly once.
    pub fn call(self, callback: impl FnOnce(Result<T>) + Send + 'static) {
        tokio::spawn(async move {
            callback(self.fut.await);
        });
    }
}

impl<T> Future for Thunk<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().fut.as_mut().poll(cx)
    }
}

impl ModelType {
    /// Deferred-value rendition of [`find`](Self::find).
    pub fn find_thunk(self: &Arc<Self>, query: impl Into<Query>) -> Thunk<Option<Record>> {
        let model = self.clone();
        let query = query.into();
        Thunk::new(async move { model.find(query).await })
    }

    /// Deferred-value rendition of [`find_all`](Self::find_all).
    pub fn find_all_thunk(self: &Arc<Self>, query: impl Into<Query>) -> Thunk<Collection> {
        let model = self.clone();
        let query = query.into();
        Thunk::new(async move { model.find_all(query).await })
    }

    /// Deferred-value rendition of [`count`](Self::count).
    pub fn count_thunk(self: &Arc<Self>, query: impl Into<Query>) -> Thunk<u64> {
        let model = self.clone();
        let query = query.into();
        Thunk::new(async move { model.count(query).await })
    }

    /// Continuation-passing wrapper over this model's operations. Available
    /// regardless of the declared [`CallStyle`]; a mismatch with a
    /// deferred-style declaration is logged, not refused.
    pub fn callbacks(self: &Arc<Self>) -> CallbackModel {
        if self.call_style() != CallStyle::Callback {
            debug!(
                "{}: callback adapter requested on a deferred-style model",
                self.name()
            );
        }
        CallbackModel {
            model: self.clone(),
        }
    }
}

/// Continuation-passing rendition of the five public operations. Each call
/// spawns the underlying async operation on the current tokio runtime and
/// invokes the supplied continuation exactly once with the `(err, value)`
/// outcome folded into a `Result`.
///
/// The instance operations take the record by value and hand it back through
/// the continuation, mirroring how an in-flight persistence call owns the
/// record until it settles.
pub struct CallbackModel {
    model: Arc<ModelType>,
}

impl CallbackModel {
    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    pub fn find(
        &self,
        query: impl Into<Query>,
        callback: impl FnOnce(Result<Option<Record>>) + Send + 'static,
    ) {
        self.model.find_thunk(query).call(callback);
    }

    pub fn find_all(
        &self,
        query: impl Into<Query>,
        callback: impl FnOnce(Result<Collection>) + Send + 'static,
    ) {
        self.model.find_all_thunk(query).call(callback);
    }

    pub fn count(
        &self,
        query: impl Into<Query>,
        callback: impl FnOnce(Result<u64>) + Send + 'static,
    ) {
        self.model.count_thunk(query).call(callback);
    }

    pub fn save(&self, mut record: Record, callback: impl FnOnce(Result<Record>) + Send + 'static) {
        tokio::spawn(async move {
            match record.save().await {
                Ok(()) => callback(Ok(record)),
                Err(err) => callback(Err(err)),
            }
        });
    }

    pub fn remove(
        &self,
        mut record: Record,
        callback: impl FnOnce(Result<Record>) + Send + 'static,
    ) {
        tokio::spawn(async move {
            match record.remove().await {
                Ok(()) => callback(Ok(record)),
                Err(err) => callback(Err(err)),
            }
        });
    }
}
