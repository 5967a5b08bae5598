//! The ordered factory chain.
//!
//! [`AdapterResolver`] walks its factories in registration order and returns
//! the first adapter produced. Earlier factories shadow later ones, which is
//! how a host application overrides a built-in strategy: register its own
//! factory first.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::contract::{CallbackAdapter, CallbackAdapterFactory};
use crate::errors::ConfigurationError;
use crate::metadata::CallSite;
use crate::types::DeclaredType;

/// An immutable, ordered chain of [`CallbackAdapterFactory`]s.
///
/// Built once through [`AdapterResolver::builder`] and only read afterwards.
#[derive(Clone)]
pub struct AdapterResolver {
    factories: Vec<Arc<dyn CallbackAdapterFactory>>,
}

impl AdapterResolver {
    /// Starts an empty chain.
    pub fn builder() -> AdapterResolverBuilder {
        AdapterResolverBuilder::default()
    }

    /// The registered factories, in the order they are consulted.
    pub fn factories(&self) -> &[Arc<dyn CallbackAdapterFactory>] {
        &self.factories
    }

    /// The registered factories' diagnostic names, in order.
    pub fn factory_names(&self) -> Vec<String> {
        self.factories.iter().map(|f| f.name().to_owned()).collect()
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Returns the adapter of the first factory that handles the declaration.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::Rejected`] when a factory claims the
    ///   declaration but finds it malformed. Later factories are not tried.
    /// - [`ConfigurationError::NoAdapter`] when every factory declines.
    pub fn resolve(
        &self,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        call_site: &CallSite,
    ) -> Result<Arc<dyn CallbackAdapter>, ConfigurationError> {
        self.next_adapter(None, callback_type, return_type, call_site)
    }

    /// Like [`resolve`](Self::resolve), and also returns the factory that
    /// produced the adapter.
    ///
    /// # Errors
    ///
    /// As for [`resolve`](Self::resolve).
    pub fn resolve_with_factory(
        &self,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        call_site: &CallSite,
    ) -> Result<(Arc<dyn CallbackAdapterFactory>, Arc<dyn CallbackAdapter>), ConfigurationError> {
        let (index, adapter) = self.walk(0, callback_type, return_type, call_site)?;
        Ok((Arc::clone(&self.factories[index]), adapter))
    }

    /// Like [`resolve`](Self::resolve), but starts after `skip_past`.
    ///
    /// A factory that decorates another strategy passes itself here to find
    /// the adapter it wraps. If `skip_past` is not part of this chain the walk
    /// starts from the beginning.
    ///
    /// # Errors
    ///
    /// As for [`resolve`](Self::resolve); a no-match error also lists the
    /// skipped factories.
    pub fn next_adapter(
        &self,
        skip_past: Option<&dyn CallbackAdapterFactory>,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        call_site: &CallSite,
    ) -> Result<Arc<dyn CallbackAdapter>, ConfigurationError> {
        let start = skip_past
            .and_then(|factory| self.position(factory))
            .map_or(0, |index| index + 1);
        self.walk(start, callback_type, return_type, call_site)
            .map(|(_, adapter)| adapter)
    }

    fn walk(
        &self,
        start: usize,
        callback_type: &DeclaredType,
        return_type: &DeclaredType,
        call_site: &CallSite,
    ) -> Result<(usize, Arc<dyn CallbackAdapter>), ConfigurationError> {
        for (index, factory) in self.factories.iter().enumerate().skip(start) {
            match factory.get(callback_type, return_type, call_site, self) {
                Ok(Some(adapter)) => {
                    debug!(
                        method = %call_site,
                        factory = factory.name(),
                        callback_type = %callback_type,
                        response_type = %adapter.response_type(),
                        "Resolved callback adapter"
                    );
                    return Ok((index, adapter));
                }
                Ok(None) => continue,
                Err(source) => {
                    warn!(
                        method = %call_site,
                        factory = factory.name(),
                        callback_type = %callback_type,
                        error = %source,
                        "Callback adapter factory rejected declaration"
                    );
                    return Err(ConfigurationError::Rejected {
                        method: call_site.to_string(),
                        factory: factory.name().to_owned(),
                        callback_type: callback_type.clone(),
                        source,
                    });
                }
            }
        }

        warn!(
            method = %call_site,
            callback_type = %callback_type,
            return_type = %return_type,
            factories = self.factories.len(),
            "No callback adapter factory matched"
        );
        let names = self.factory_names();
        Err(ConfigurationError::NoAdapter {
            method: call_site.to_string(),
            callback_type: callback_type.clone(),
            return_type: return_type.clone(),
            skipped: names[..start].to_vec(),
            tried: names[start..].to_vec(),
        })
    }

    fn position(&self, factory: &dyn CallbackAdapterFactory) -> Option<usize> {
        let target = std::ptr::from_ref(factory).cast::<()>();
        self.factories
            .iter()
            .position(|f| std::ptr::eq(Arc::as_ptr(f).cast::<()>(), target))
    }
}

impl fmt::Debug for AdapterResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterResolver")
            .field("factories", &self.factory_names())
            .finish()
    }
}

/// Append-only builder for an [`AdapterResolver`].
#[derive(Default)]
pub struct AdapterResolverBuilder {
    factories: Vec<Arc<dyn CallbackAdapterFactory>>,
}

impl AdapterResolverBuilder {
    /// Appends a factory. Factories added earlier take precedence.
    #[must_use]
    pub fn add_factory(self, factory: impl CallbackAdapterFactory + 'static) -> Self {
        self.add_shared_factory(Arc::new(factory))
    }

    /// Appends a factory that is shared with other chains.
    #[must_use]
    pub fn add_shared_factory(mut self, factory: Arc<dyn CallbackAdapterFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Returns `true` if a factory called `name` has been added.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|f| f.name() == name)
    }

    /// Returns `true` if a factory of type `F` has been added, whatever its name.
    pub fn contains_type<F: CallbackAdapterFactory>(&self) -> bool {
        self.factories
            .iter()
            .any(|f| f.factory_type() == TypeId::of::<F>())
    }

    /// Freezes the chain.
    pub fn build(self) -> AdapterResolver {
        AdapterResolver {
            factories: self.factories,
        }
    }
}
