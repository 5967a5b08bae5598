//! The adapter contract and the factory capability that produces it.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::call::{Adapted, Call, Consumer, Payload};
use crate::errors::{AdaptError, FactoryError};
use crate::metadata::CallSite;
use crate::resolver::AdapterResolver;
use crate::types::DeclaredType;

/// Bridges a [`Call`] into a caller-supplied consumer.
///
/// Instances are created once per method by a [`CallbackAdapterFactory`] and
/// are immutable afterwards, so one instance may be used from many threads at
/// once.
pub trait CallbackAdapter: Send + Sync + fmt::Debug {
    /// The type responses are decoded into before they reach the consumer.
    ///
    /// For `Callback<Repo>` this is `Repo`. The binding layer reads it once,
    /// when the method is bound, to prepare the call passed to
    /// [`adapt`](Self::adapt).
    fn response_type(&self) -> &DeclaredType;

    /// Starts `call` and routes its outcome to `consumer`.
    ///
    /// Returns the value the declared method returns: `None` for strategies
    /// whose return type is `()`. Must not block waiting for the outcome.
    ///
    /// # Errors
    ///
    /// [`AdaptError::ConsumerMismatch`] if `consumer` is not the shape this
    /// adapter was resolved for.
    fn adapt(&self, call: Box<dyn Call<Payload>>, consumer: Consumer)
        -> Result<Adapted, AdaptError>;
}

/// A pluggable provider of [`CallbackAdapter`]s, queried in registration order.
///
/// `get` has three outcomes and the resolver treats them differently:
///
/// | Result | Meaning | Resolver reaction |
/// |--------|---------|-------------------|
/// | `Ok(Some(_))` | handled | stop, this adapter wins |
/// | `Ok(None)` | not mine | try the next factory |
/// | `Err(_)` | mine, but malformed | stop, report a configuration error |
///
/// Applicability checks should be cheap; use [`raw_type`](crate::raw_type)
/// on `callback_type` and compare `return_type` before doing anything else.
pub trait CallbackAdapterFactory: Send + Sync + 'static {
    /// Returns an adapter for methods taking `callback_type` and returning
    /// `return_type`, or `None` if this factory does not handle them.
    ///
    /// `resolver` is the chain this factory belongs to; a decorating factory
    /// can pass itself to [`AdapterResolver::next_adapter`] to obtain the
    /// adapter it wraps.
    ///
    /// # Errors
    ///
    /// A [`FactoryError`] when the declaration is recognised but unusable,
    /// e.g. a raw `Callback` with no type argument.
    fn get(
        &self,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        call_site: &CallSite,
        resolver: &AdapterResolver,
    ) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError>;

    /// Name used in diagnostics. Defaults to the implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The implementing type, used to find a factory in a chain without
    /// relying on its name. Not meant to be overridden.
    fn factory_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// A factory backed by a closure.
///
/// ```
/// use adapter::{AdapterResolver, FnFactory};
///
/// let resolver = AdapterResolver::builder()
///     .add_factory(FnFactory::new("never", |_, _, _| Ok(None)))
///     .build();
/// assert_eq!(resolver.factory_names(), ["never"]);
/// ```
pub struct FnFactory<F> {
    name: String,
    get: F,
}

impl<F> FnFactory<F>
where
    F: Fn(
            &DeclaredType,
            &DeclaredType,
            &CallSite,
        ) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError>
        + Send
        + Sync,
{
    /// Wraps `get` under the diagnostic name `name`.
    pub fn new(name: impl Into<String>, get: F) -> Self {
        Self {
            name: name.into(),
            get,
        }
    }
}

impl<F> CallbackAdapterFactory for FnFactory<F>
where
    F: Fn(
            &DeclaredType,
            &DeclaredType,
            &CallSite,
        ) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError>
        + Send
        + Sync
        + 'static,
{
    fn get(
        &self,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        call_site: &CallSite,
        _resolver: &AdapterResolver,
    ) -> Result<Option<Arc<dyn CallbackAdapter>>, FactoryError> {
        (self.get)(callback_type, return_type, call_site)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").field("name", &self.name).finish()
    }
}
