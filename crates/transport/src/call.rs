//! [`Call`] implementations.
//!
//! [`TokioCall`] runs a future on a tokio runtime and reports its outcome to
//! the callback; [`CompletedCall`] wraps an outcome that is already known.

use std::any::type_name;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use adapter::{erase_call, Call, CallError, Callback, Payload};
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::Notify;
use tracing::debug;

type BoxedResponse<T> = Pin<Box<dyn Future<Output = Result<T, CallError>> + Send>>;

/// A call whose response is produced by a future spawned on a tokio runtime.
///
/// `enqueue` spawns and returns immediately. The callback runs on a runtime
/// worker once the future completes, or with [`CallError::Canceled`] if
/// [`CancelHandle::cancel`] fires first. A call still pending when its
/// runtime shuts down also fails with [`CallError::Canceled`].
pub struct TokioCall<T> {
    handle: Handle,
    response: BoxedResponse<T>,
    cancel: Arc<Notify>,
    label: String,
}

impl<T: Send + 'static> TokioCall<T> {
    /// A call that spawns `response` on `handle`.
    pub fn new<F>(handle: Handle, response: F) -> Self
    where
        F: Future<Output = Result<T, CallError>> + Send + 'static,
    {
        Self {
            handle,
            response: Box::pin(response),
            cancel: Arc::new(Notify::new()),
            label: format!("TokioCall<{}>", type_name::<T>()),
        }
    }

    /// A call bound to the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn on_current<F>(response: F) -> Result<Self, TryCurrentError>
    where
        F: Future<Output = Result<T, CallError>> + Send + 'static,
    {
        Ok(Self::new(Handle::try_current()?, response))
    }

    /// Replaces the description used in log fields.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// A handle that cancels this call, before or after it is enqueued.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            notify: Arc::clone(&self.cancel),
        }
    }

    /// Erases the response type so the call can be passed to any adapter.
    pub fn erased(self) -> Box<dyn Call<Payload>> {
        erase_call(Box::new(self))
    }
}

impl<T: Send + 'static> Call<T> for TokioCall<T> {
    fn enqueue(self: Box<Self>, callback: Box<dyn Callback<T>>) {
        let TokioCall {
            handle,
            response,
            cancel,
            label,
        } = *self;

        debug!(call = %label, "Spawning call");
        let guard = CallbackGuard {
            callback: Some(callback),
            label: label.clone(),
        };
        handle.spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = cancel.notified() => Err(CallError::Canceled),
                outcome = response => outcome,
            };
            if let Err(error) = &outcome {
                debug!(call = %label, error = %error, "Call failed");
            }
            guard.deliver(outcome);
        });
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Owns the callback of a spawned call.
///
/// If the task is dropped before the outcome is known, e.g. because the
/// runtime shut down, the callback still fires once with
/// [`CallError::Canceled`].
struct CallbackGuard<T> {
    callback: Option<Box<dyn Callback<T>>>,
    label: String,
}

impl<T> CallbackGuard<T> {
    fn deliver(mut self, outcome: Result<T, CallError>) {
        if let Some(callback) = self.callback.take() {
            match outcome {
                Ok(value) => callback.on_response(value),
                Err(error) => callback.on_failure(error),
            }
        }
    }
}

impl<T> Drop for CallbackGuard<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            debug!(call = %self.label, "Call task dropped before completion");
            callback.on_failure(CallError::Canceled);
        }
    }
}

/// Cancels a [`TokioCall`].
///
/// Cancelling before the call is enqueued makes it fail as soon as it is
/// spawned. Cancelling after completion has no effect.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    notify: Arc<Notify>,
}

impl CancelHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.notify.notify_one();
    }
}

/// A call whose outcome is already known. `enqueue` delivers it on the
/// calling thread.
pub struct CompletedCall<T> {
    outcome: Result<T, CallError>,
}

impl<T: Send + 'static> CompletedCall<T> {
    /// A call that succeeds with `value`.
    pub fn success(value: T) -> Self {
        Self { outcome: Ok(value) }
    }

    /// A call that fails with `error`.
    pub fn failure(error: CallError) -> Self {
        Self {
            outcome: Err(error),
        }
    }

    /// Erases the response type so the call can be passed to any adapter.
    pub fn erased(self) -> Box<dyn Call<Payload>> {
        erase_call(Box::new(self))
    }
}

impl<T: Send + 'static> Call<T> for CompletedCall<T> {
    fn enqueue(self: Box<Self>, callback: Box<dyn Callback<T>>) {
        match self.outcome {
            Ok(value) => callback.on_response(value),
            Err(error) => callback.on_failure(error),
        }
    }

    fn describe(&self) -> String {
        format!("CompletedCall<{}>", type_name::<T>())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use adapter::callback_fn;
    use tokio::sync::oneshot;

    use super::*;

    fn sink<T: Send + 'static>() -> (
        Box<dyn Callback<T>>,
        oneshot::Receiver<Result<T, CallError>>,
    ) {
        let (tx, rx) = oneshot::channel();
        let callback = callback_fn(move |outcome: Result<T, CallError>| {
            let _ = tx.send(outcome);
        });
        (Box::new(callback), rx)
    }

    #[tokio::test]
    async fn enqueue_returns_before_the_response_is_ready() {
        let (release, released) = oneshot::channel::<()>();
        let call = TokioCall::on_current(async move {
            let _ = released.await;
            Ok::<_, CallError>(42_u32)
        })
        .unwrap();
        let (callback, mut outcome) = sink::<u32>();

        Box::new(call).enqueue(callback);
        assert!(outcome.try_recv().is_err());

        release.send(()).unwrap();
        assert_eq!(outcome.await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn transport_failure_reaches_the_callback() {
        let call = TokioCall::on_current(async { Err::<u32, _>(CallError::transport("timed out")) })
            .unwrap();
        let (callback, outcome) = sink::<u32>();

        Box::new(call).enqueue(callback);

        let error = outcome.await.unwrap().unwrap_err();
        assert_eq!(error.to_string(), "call failed: timed out");
    }

    #[tokio::test]
    async fn cancel_before_enqueue_fails_with_canceled() {
        let call = TokioCall::on_current(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CallError>(1_u32)
        })
        .unwrap();
        call.cancel_handle().cancel();
        let (callback, outcome) = sink::<u32>();

        Box::new(call).enqueue(callback);

        assert!(matches!(outcome.await.unwrap(), Err(CallError::Canceled)));
    }

    #[tokio::test]
    async fn cancel_after_enqueue_interrupts_the_response() {
        let call = TokioCall::on_current(std::future::pending::<Result<u32, CallError>>()).unwrap();
        let cancel = call.cancel_handle();
        let (callback, outcome) = sink::<u32>();

        Box::new(call).enqueue(callback);
        cancel.cancel();

        assert!(matches!(outcome.await.unwrap(), Err(CallError::Canceled)));
    }

    #[test]
    fn runtime_shutdown_fails_pending_calls_with_canceled() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let call = TokioCall::new(
            runtime.handle().clone(),
            std::future::pending::<Result<u32, CallError>>(),
        );
        let (tx, rx) = std::sync::mpsc::channel();
        Box::new(call).enqueue(Box::new(callback_fn(
            move |outcome: Result<u32, CallError>| {
                let _ = tx.send(outcome);
            },
        )));

        drop(runtime);

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome, Err(CallError::Canceled)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn on_current_outside_a_runtime_fails() {
        assert!(TokioCall::on_current(async { Ok::<_, CallError>(()) }).is_err());
    }

    #[test]
    fn completed_call_delivers_synchronously() {
        let (callback, mut outcome) = sink::<&'static str>();
        Box::new(CompletedCall::success("done")).enqueue(callback);
        assert_eq!(outcome.try_recv().unwrap().unwrap(), "done");
    }

    #[test]
    fn labels_describe_the_response_type() {
        let call = CompletedCall::success(1_u8);
        assert_eq!(call.describe(), "CompletedCall<u8>");
    }
}
