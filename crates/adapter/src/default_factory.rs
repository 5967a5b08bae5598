//! The built-in strategy for `Callback<T>` consumers on methods returning `()`.

use std::sync::Arc;

use tracing::trace;

use crate::call::{Adapted, Call, Consumer, ErasedCallback, Payload};
use crate::contract::{CallbackAdapter, CallbackAdapterFactory};
use crate::errors::{AdaptError, FactoryError};
use crate::metadata::CallSite;
use crate::resolver::AdapterResolver;
use crate::types::{raw_type, upper_bound, ClassId, DeclaredType};

/// Creates adapters for the built-in [`Callback`](crate::Callback) consumer.
///
/// Handles declarations whose consumer is `Callback<T>` (or
/// `Callback<? extends T>`) and whose return type is `()`. The resolved
/// adapter enqueues the call with the caller's callback and returns the empty
/// sentinel.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCallbackAdapterFactory;

impl CallbackAdapterFactory for DefaultCallbackAdapterFactory {
    fn get(
        &self,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        _call_site: &CallSite,
        _resolver: &AdapterResolver,
    ) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError> {
        if raw_type(callback_type) != ClassId::CALLBACK || !return_type.is_unit() {
            return Ok(None);
        }

        if !callback_type.is_parameterized() {
            return Err(FactoryError::malformed(
                callback_type,
                "Callback must be parameterized as Callback<Foo> or Callback<? extends Foo>",
            ));
        }

        let response_type = upper_bound(0, callback_type)?;
        Ok(Some(Arc::new(CallbackEnqueueAdapter { response_type })))
    }
}

/// Enqueues the call with the consumer, which must be an [`ErasedCallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEnqueueAdapter {
    response_type: DeclaredType,
}

impl CallbackEnqueueAdapter {
    /// An adapter delivering responses of `response_type`.
    pub fn new(response_type: DeclaredType) -> Self {
        Self { response_type }
    }
}

impl CallbackAdapter for CallbackEnqueueAdapter {
    fn response_type(&self) -> &DeclaredType {
        &self.response_type
    }

    fn adapt(
        &self,
        call: Box<dyn Call<Payload>>,
        consumer: Consumer,
    ) -> Result<Adapted, AdaptError> {
        let callback = consumer
            .downcast::<ErasedCallback>()
            .map_err(|_| AdaptError::ConsumerMismatch {
                adapter: "CallbackEnqueueAdapter",
                expected: "Box<dyn Callback<Payload>>",
            })?;

        trace!(
            call = %call.describe(),
            response_type = %self.response_type,
            "Enqueueing call"
        );
        call.enqueue(*callback);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;

    use super::*;
    use crate::call::{callback_consumer, callback_fn, erase_callback, Callback};
    use crate::errors::{CallError, ConfigurationError};

    #[derive(Debug, PartialEq)]
    struct Repo {
        name: &'static str,
    }

    /// Holds the callback until the test completes it, like a real transport
    /// waiting on the network.
    #[derive(Clone, Default)]
    struct Pending {
        callback: Arc<Mutex<Option<ErasedCallback>>>,
        enqueued: Arc<Mutex<usize>>,
    }

    impl Pending {
        fn call(&self) -> Box<dyn Call<Payload>> {
            Box::new(self.clone())
        }

        fn succeed(&self, value: Payload) {
            let callback = self.callback.lock().unwrap().take().expect("enqueued");
            callback.on_response(value);
        }

        fn fail(&self, error: CallError) {
            let callback = self.callback.lock().unwrap().take().expect("enqueued");
            callback.on_failure(error);
        }
    }

    impl Call<Payload> for Pending {
        fn enqueue(self: Box<Self>, callback: Box<dyn Callback<Payload>>) {
            *self.enqueued.lock().unwrap() += 1;
            *self.callback.lock().unwrap() = Some(callback);
        }
    }

    fn resolver() -> AdapterResolver {
        AdapterResolver::builder()
            .add_factory(DefaultCallbackAdapterFactory)
            .build()
    }

    fn get(callback_type: &str, return_type: &str) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError> {
        DefaultCallbackAdapterFactory.get(
            &callback_type.parse().unwrap(),
            &return_type.parse().unwrap(),
            &CallSite::new("GitHub", "listRepos"),
            &resolver(),
        )
    }

    #[test]
    fn declines_other_consumer_shapes() {
        assert!(get("Sink<Repo>", "()").unwrap().is_none());
        assert!(get("Repo", "()").unwrap().is_none());
    }

    #[test]
    fn declines_methods_that_return_a_value() {
        assert!(get("Callback<Repo>", "Repo").unwrap().is_none());
        assert!(get("Callback<Repo>", "Call<Repo>").unwrap().is_none());
    }

    #[test]
    fn raw_callback_is_a_configuration_error() {
        let err = get("Callback", "()").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Callback must be parameterized as Callback<Foo> or Callback<? extends Foo>"
        );
    }

    #[test]
    fn response_type_is_the_upper_bound_of_the_argument() {
        for (callback_type, expected) in [
            ("Callback<Repo>", "Repo"),
            ("Callback<? extends Repo>", "Repo"),
            ("Callback<List<Repo>>", "List<Repo>"),
            ("Callback<?>", "Any"),
        ] {
            let adapter = get(callback_type, "()").unwrap().unwrap();
            assert_eq!(adapter.response_type().to_string(), expected);
        }
    }

    #[test]
    fn adapt_enqueues_and_delivers_success() {
        let adapter = resolver()
            .resolve(
                &"Callback<Repo>".parse().unwrap(),
                &DeclaredType::unit(),
                &CallSite::new("GitHub", "getRepo"),
            )
            .unwrap();
        assert_eq!(adapter.response_type(), &"Repo".parse::<DeclaredType>().unwrap());

        let pending = Pending::default();
        let (tx, rx) = mpsc::channel();
        let consumer = callback_consumer(erase_callback::<Repo>(Box::new(callback_fn(
            move |outcome: Result<Repo, CallError>| tx.send(outcome.unwrap()).unwrap(),
        ))));

        let returned = adapter.adapt(pending.call(), consumer).unwrap();

        assert!(returned.is_none());
        assert_eq!(*pending.enqueued.lock().unwrap(), 1);
        assert!(rx.try_recv().is_err(), "nothing delivered before completion");

        pending.succeed(Box::new(Repo { name: "tether" }));
        assert_eq!(rx.recv().unwrap(), Repo { name: "tether" });
    }

    #[test]
    fn adapt_forwards_failure_untouched() {
        let adapter = get("Callback<Repo>", "()").unwrap().unwrap();
        let pending = Pending::default();
        let (tx, rx) = mpsc::channel();
        let consumer = callback_consumer(erase_callback::<Repo>(Box::new(callback_fn(
            move |outcome: Result<Repo, CallError>| tx.send(outcome.unwrap_err()).unwrap(),
        ))));

        adapter.adapt(pending.call(), consumer).unwrap();
        pending.fail(CallError::Canceled);

        assert!(matches!(rx.recv().unwrap(), CallError::Canceled));
    }

    #[test]
    fn adapt_rejects_a_consumer_of_the_wrong_shape() {
        let adapter = get("Callback<Repo>", "()").unwrap().unwrap();
        let pending = Pending::default();

        let err = adapter.adapt(pending.call(), Box::new("not a callback")).unwrap_err();

        assert!(matches!(err, AdaptError::ConsumerMismatch { .. }));
        assert_eq!(*pending.enqueued.lock().unwrap(), 0);
    }

    #[test]
    fn resolving_twice_yields_independent_equivalent_adapters() {
        let resolver = resolver();
        let site = CallSite::new("GitHub", "getRepo");
        let callback_type: DeclaredType = "Callback<Repo>".parse().unwrap();

        let first = resolver
            .resolve(&callback_type, &DeclaredType::unit(), &site)
            .unwrap();
        let second = resolver
            .resolve(&callback_type, &DeclaredType::unit(), &site)
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.response_type(), second.response_type());

        for adapter in [first, second] {
            let pending = Pending::default();
            let (tx, rx) = mpsc::channel();
            let consumer = callback_consumer(erase_callback::<Repo>(Box::new(callback_fn(
                move |outcome: Result<Repo, CallError>| tx.send(outcome.unwrap()).unwrap(),
            ))));
            assert!(adapter.adapt(pending.call(), consumer).unwrap().is_none());
            pending.succeed(Box::new(Repo { name: "same" }));
            assert_eq!(rx.recv().unwrap(), Repo { name: "same" });
        }
    }

    #[test]
    fn raw_callback_fails_resolution_with_method_context() {
        let err = resolver()
            .resolve(
                &"Callback".parse().unwrap(),
                &DeclaredType::unit(),
                &CallSite::new("GitHub", "getRepo"),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Rejected { .. }));
        assert!(err.to_string().starts_with("GitHub.getRepo:"));
        assert!(err.to_string().contains("Callback<? extends Foo>"));
    }
}
