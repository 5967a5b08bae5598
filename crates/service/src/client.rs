//! The service client: owns the factory chain, binds declarations, and
//! dispatches invocations to the bound adapters.

use std::collections::HashMap;
use std::sync::Arc;

use adapter::{
    callback_consumer, erase_call, erase_callback, Adapted, AdaptError, AdapterResolver,
    AdapterResolverBuilder, Call, CallSite, Callback, CallbackAdapter, CallbackAdapterFactory,
    ConfigurationError, Consumer, DeclaredType, DefaultCallbackAdapterFactory, Payload,
};
use tracing::{debug, debug_span, info, trace};

use crate::declaration::ServiceDefinition;
use crate::errors::ServiceError;
use crate::identifiers::{InvocationId, ServiceName};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Top-level client configuration: the ordered callback adapter factories.
///
/// Cheap to clone; clones share the same immutable chain.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    resolver: Arc<AdapterResolver>,
}

impl ServiceClient {
    /// Starts configuring a client.
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::default()
    }

    /// The factory chain used for every binding.
    pub fn resolver(&self) -> &AdapterResolver {
        &self.resolver
    }

    /// Resolves an adapter for one method.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] raised by the factory chain.
    pub fn bind(
        &self,
        call_site: CallSite,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
    ) -> Result<BoundMethod, ConfigurationError> {
        let (factory, adapter) = self
            .resolver
            .resolve_with_factory(callback_type, return_type, &call_site)?;
        Ok(BoundMethod {
            call_site,
            callback_type: callback_type.clone(),
            return_type: return_type.clone(),
            factory: factory.name().to_owned(),
            adapter,
        })
    }

    /// Binds every method of `definition`.
    ///
    /// Resolution is eager: a misdeclared method fails here, before any call
    /// is made, and no part of the service is returned.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Configuration`] for the first method that cannot be bound.
    /// - [`ServiceError::DuplicateMethod`] if two methods share a name.
    pub fn create(&self, definition: &ServiceDefinition) -> Result<Service, ServiceError> {
        let mut methods = HashMap::with_capacity(definition.methods.len());

        for declaration in &definition.methods {
            let name = declaration.name.as_str();
            if methods.contains_key(name) {
                return Err(ServiceError::DuplicateMethod {
                    service: definition.name.to_string(),
                    method: name.to_owned(),
                });
            }

            let bound = self.bind(
                declaration.call_site(&definition.name),
                &declaration.callback_type,
                &declaration.return_type,
            )?;
            methods.insert(name.to_owned(), bound);
        }

        info!(
            service = %definition.name,
            methods = methods.len(),
            "Service bound"
        );
        Ok(Service {
            name: definition.name.clone(),
            methods,
        })
    }
}

/// Builder for [`ServiceClient`].
#[derive(Default)]
pub struct ServiceClientBuilder {
    factories: AdapterResolverBuilder,
}

impl ServiceClientBuilder {
    /// Registers a factory ahead of the built-in one.
    ///
    /// Factories are consulted in registration order, so anything added here
    /// shadows [`DefaultCallbackAdapterFactory`] for the declarations it claims.
    #[must_use]
    pub fn add_callback_adapter_factory(
        mut self,
        factory: impl CallbackAdapterFactory + 'static,
    ) -> Self {
        self.factories = self.factories.add_factory(factory);
        self
    }

    /// Registers a factory shared with other clients.
    #[must_use]
    pub fn add_shared_callback_adapter_factory(
        mut self,
        factory: Arc<dyn CallbackAdapterFactory>,
    ) -> Self {
        self.factories = self.factories.add_shared_factory(factory);
        self
    }

    /// Freezes the configuration.
    ///
    /// [`DefaultCallbackAdapterFactory`] is appended last unless a factory of
    /// that type was registered explicitly. Names play no part in the check.
    pub fn build(self) -> ServiceClient {
        let mut factories = self.factories;
        if !factories.contains_type::<DefaultCallbackAdapterFactory>() {
            factories = factories.add_factory(DefaultCallbackAdapterFactory);
        }
        let resolver = factories.build();
        debug!(factories = ?resolver.factory_names(), "Service client configured");
        ServiceClient {
            resolver: Arc::new(resolver),
        }
    }
}

// ---------------------------------------------------------------------------
// Bound methods
// ---------------------------------------------------------------------------

/// A method declaration together with the adapter resolved for it.
///
/// Immutable; invoke it from as many threads as needed.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    call_site: CallSite,
    callback_type: DeclaredType,
    return_type: DeclaredType,
    factory: String,
    adapter: Arc<dyn CallbackAdapter>,
}

impl BoundMethod {
    /// Where this method was declared.
    pub fn call_site(&self) -> &CallSite {
        &self.call_site
    }

    /// The declared consumer type.
    pub fn callback_type(&self) -> &DeclaredType {
        &self.callback_type
    }

    /// The declared return type.
    pub fn return_type(&self) -> &DeclaredType {
        &self.return_type
    }

    /// The type calls for this method must decode responses into.
    pub fn response_type(&self) -> &DeclaredType {
        self.adapter.response_type()
    }

    /// Name of the factory that produced the adapter.
    pub fn factory_name(&self) -> &str {
        &self.factory
    }

    /// The resolved adapter.
    pub fn adapter(&self) -> &Arc<dyn CallbackAdapter> {
        &self.adapter
    }

    /// Hands a freshly built call and the caller's consumer to the adapter.
    ///
    /// Returns the adapter's result, which is the method's return value.
    ///
    /// # Errors
    ///
    /// [`AdaptError`] if `consumer` does not fit the resolved strategy.
    pub fn invoke(
        &self,
        call: Box<dyn Call<Payload>>,
        consumer: Consumer,
    ) -> Result<Adapted, AdaptError> {
        let invocation_id = InvocationId::new_random();
        let span = debug_span!(
            "invoke",
            method = %self.call_site,
            invocation_id = %invocation_id
        );
        let _entered = span.enter();

        trace!(call = %call.describe(), response_type = %self.response_type(), "Adapting call");
        self.adapter.adapt(call, consumer)
    }

    /// Invokes a method bound to the built-in `Callback` strategy with a typed
    /// call and callback.
    ///
    /// # Errors
    ///
    /// [`AdaptError`] if the method is bound to a different strategy.
    pub fn enqueue_typed<T: Send + 'static>(
        &self,
        call: impl Call<T> + 'static,
        callback: impl Callback<T> + 'static,
    ) -> Result<(), AdaptError> {
        let call = erase_call::<T>(Box::new(call));
        let consumer = callback_consumer(erase_callback::<T>(Box::new(callback)));
        self.invoke(call, consumer).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// A fully bound service: every declared method already has its adapter.
#[derive(Debug, Clone)]
pub struct Service {
    name: ServiceName,
    methods: HashMap<String, BoundMethod>,
}

impl Service {
    /// The service name.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Looks up a bound method.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnknownMethod`] if the service does not declare `method`.
    pub fn method(&self, method: &str) -> Result<&BoundMethod, ServiceError> {
        self.methods
            .get(method)
            .ok_or_else(|| ServiceError::UnknownMethod {
                service: self.name.to_string(),
                method: method.to_owned(),
            })
    }

    /// All bound methods, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &BoundMethod> {
        self.methods.values()
    }

    /// Invokes `method` with a freshly built call and the caller's consumer.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnknownMethod`] or [`ServiceError::Adapt`].
    pub fn invoke(
        &self,
        method: &str,
        call: Box<dyn Call<Payload>>,
        consumer: Consumer,
    ) -> Result<Adapted, ServiceError> {
        Ok(self.method(method)?.invoke(call, consumer)?)
    }
}
