//! A strategy that delivers a call's outcome through a tokio oneshot channel.
//!
//! Register [`OneshotAdapterFactory`] to let service methods declare a
//! `oneshot::Sender<T>` consumer instead of a `Callback<T>`. The caller keeps
//! the receiving half (see [`channel`]) and awaits it.

use std::any::type_name;
use std::sync::Arc;

use adapter::{
    raw_type, upper_bound, Adapted, AdapterResolver, AdaptError, Call, CallError, CallSite,
    Callback, CallbackAdapter, CallbackAdapterFactory, ClassId, Consumer, DeclaredType,
    FactoryError, Payload,
};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Raw class of the consumer shape handled by [`OneshotAdapterFactory`].
pub const ONESHOT_SENDER: ClassId = ClassId::from_static("oneshot::Sender");

/// The runtime shape of a consumer passed to a [`OneshotAdapter`].
pub type OneshotSender = oneshot::Sender<Result<Payload, CallError>>;

/// Creates adapters for `oneshot::Sender<T>` consumers on methods returning `()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneshotAdapterFactory;

impl CallbackAdapterFactory for OneshotAdapterFactory {
    fn get(
        &self,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        _call_site: &CallSite,
        _resolver: &AdapterResolver,
    ) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError> {
        if raw_type(callback_type) != ONESHOT_SENDER || !return_type.is_unit() {
            return Ok(None);
        }
        if !callback_type.is_parameterized() {
            return Err(FactoryError::malformed(
                callback_type,
                "oneshot::Sender must be parameterized as oneshot::Sender<Foo>",
            ));
        }

        let response_type = upper_bound(0, callback_type)?;
        Ok(Some(Arc::new(OneshotAdapter { response_type })))
    }
}

/// Enqueues the call and sends its outcome through the consumer's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneshotAdapter {
    response_type: DeclaredType,
}

impl CallbackAdapter for OneshotAdapter {
    fn response_type(&self) -> &DeclaredType {
        &self.response_type
    }

    fn adapt(
        &self,
        call: Box<dyn Call<Payload>>,
        consumer: Consumer,
    ) -> Result<Adapted, AdaptError> {
        let sender = consumer
            .downcast::<OneshotSender>()
            .map_err(|_| AdaptError::ConsumerMismatch {
                adapter: "OneshotAdapter",
                expected: "oneshot::Sender<Result<Payload, CallError>>",
            })?;

        trace!(call = %call.describe(), response_type = %self.response_type, "Enqueueing call");
        call.enqueue(Box::new(SenderCallback { sender: *sender }));
        Ok(None)
    }
}

struct SenderCallback {
    sender: OneshotSender,
}

impl SenderCallback {
    fn deliver(self, outcome: Result<Payload, CallError>) {
        if self.sender.send(outcome).is_err() {
            debug!("Receiver dropped before the call completed; outcome discarded");
        }
    }
}

impl Callback<Payload> for SenderCallback {
    fn on_response(self: Box<Self>, value: Payload) {
        self.deliver(Ok(value))
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        self.deliver(Err(error))
    }
}

/// Creates a consumer for [`OneshotAdapter`] and the half that receives the
/// outcome.
pub fn channel() -> (Consumer, OneshotResponse) {
    let (sender, receiver) = oneshot::channel::<Result<Payload, CallError>>();
    (Box::new(sender), OneshotResponse { receiver })
}

/// Receiving half of [`channel`].
#[derive(Debug)]
pub struct OneshotResponse {
    receiver: oneshot::Receiver<Result<Payload, CallError>>,
}

impl OneshotResponse {
    /// Waits for the outcome and downcasts the payload to `T`.
    ///
    /// # Errors
    ///
    /// - Whatever the call failed with.
    /// - [`CallError::Canceled`] if the call was dropped without completing.
    /// - [`CallError::PayloadMismatch`] if the payload is not a `T`.
    pub async fn recv<T: 'static>(self) -> Result<T, CallError> {
        let payload = self.receiver.await.map_err(|_| CallError::Canceled)??;
        payload
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| CallError::PayloadMismatch {
                expected: type_name::<T>(),
            })
    }
}
