//! Port traits for the transport collaborator and the erased values that flow
//! through a resolved adapter.
//!
//! The transport supplies [`Call`] implementations; callers supply
//! [`Callback`] implementations. Because adapters are chosen at runtime from a
//! [`DeclaredType`](crate::DeclaredType), the adapter boundary works on erased
//! values: [`Payload`] for response bodies, [`Consumer`] for the caller's
//! result sink and [`Adapted`] for the method's return value. The helpers at
//! the bottom of this module convert typed calls and callbacks to and from
//! that erased form.

use std::any::Any;
use std::marker::PhantomData;

use crate::errors::CallError;

/// An erased response body.
pub type Payload = Box<dyn Any + Send>;

/// An erased consumer value. Its concrete shape is fixed by the adapter that
/// will receive it.
pub type Consumer = Box<dyn Any + Send>;

/// An erased method return value. `None` is the empty sentinel returned by
/// strategies whose declared return type is `()`.
pub type Adapted = Option<Box<dyn Any + Send>>;

/// The consumer shape driven by the built-in `Callback` strategy.
pub type ErasedCallback = Box<dyn Callback<Payload>>;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Receives the outcome of a [`Call`].
///
/// Exactly one of the two hooks is invoked, exactly once.
pub trait Callback<T>: Send {
    /// The call produced a response.
    fn on_response(self: Box<Self>, value: T);

    /// The call failed; `error` is whatever the transport reported.
    fn on_failure(self: Box<Self>, error: CallError);
}

/// A single asynchronous request whose response decodes to `T`.
///
/// Execution, threading, and cancellation are owned by the implementation.
pub trait Call<T>: Send {
    /// Starts the call and arranges for `callback` to receive its outcome.
    ///
    /// Must return without waiting for the outcome.
    fn enqueue(self: Box<Self>, callback: Box<dyn Callback<T>>);

    /// Short description used in log fields.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Closure callbacks
// ---------------------------------------------------------------------------

/// A [`Callback`] backed by a closure over the call's outcome.
pub struct FnCallback<F> {
    on_outcome: F,
}

/// Builds a [`Callback`] from a closure receiving `Ok(value)` or `Err(error)`.
pub fn callback_fn<T, F>(on_outcome: F) -> FnCallback<F>
where
    F: FnOnce(Result<T, CallError>) + Send,
{
    FnCallback { on_outcome }
}

impl<T, F> Callback<T> for FnCallback<F>
where
    F: FnOnce(Result<T, CallError>) + Send,
{
    fn on_response(self: Box<Self>, value: T) {
        (self.on_outcome)(Ok(value))
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        (self.on_outcome)(Err(error))
    }
}

// ---------------------------------------------------------------------------
// Erasure
// ---------------------------------------------------------------------------

/// Erases a typed call so it can be handed to any adapter.
pub fn erase_call<T: Send + 'static>(call: Box<dyn Call<T>>) -> Box<dyn Call<Payload>> {
    Box::new(ErasedCall { inner: call })
}

/// Erases a typed callback into the shape driven by the `Callback` strategy.
///
/// A payload that is not a `T` is reported through `on_failure` as
/// [`CallError::PayloadMismatch`].
pub fn erase_callback<T: Send + 'static>(callback: Box<dyn Callback<T>>) -> ErasedCallback {
    Box::new(DowncastCallback { inner: callback })
}

/// Packs an erased callback as a [`Consumer`] for the `Callback` strategy.
pub fn callback_consumer(callback: ErasedCallback) -> Consumer {
    Box::new(callback)
}

struct ErasedCall<T> {
    inner: Box<dyn Call<T>>,
}

impl<T: Send + 'static> Call<Payload> for ErasedCall<T> {
    fn enqueue(self: Box<Self>, callback: Box<dyn Callback<Payload>>) {
        self.inner.enqueue(Box::new(BoxingCallback {
            inner: callback,
            _marker: PhantomData,
        }));
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

struct BoxingCallback<T> {
    inner: Box<dyn Callback<Payload>>,
    _marker: PhantomData<fn(T)>,
}

impl<T: Send + 'static> Callback<T> for BoxingCallback<T> {
    fn on_response(self: Box<Self>, value: T) {
        self.inner.on_response(Box::new(value))
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        self.inner.on_failure(error)
    }
}

struct DowncastCallback<T> {
    inner: Box<dyn Callback<T>>,
}

impl<T: Send + 'static> Callback<Payload> for DowncastCallback<T> {
    fn on_response(self: Box<Self>, value: Payload) {
        match value.downcast::<T>() {
            Ok(value) => self.inner.on_response(*value),
            Err(_) => self.inner.on_failure(CallError::PayloadMismatch {
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        self.inner.on_failure(error)
    }
}
