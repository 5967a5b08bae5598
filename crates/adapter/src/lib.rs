//! Core of Tether: callback adapter resolution and dispatch.
//!
//! Given an asynchronous [`Call`] and a caller-declared consumer shape, this
//! crate decides, once per method while a service is being bound, which
//! strategy bridges the two, and runs that bridge on every invocation.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no runtime or I/O
//! dependencies. Transports implement [`Call`]; the binding layer in the
//! `service` crate drives [`AdapterResolver`] and the adapters it returns.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`types`] | `DeclaredType` model, parser, and the `upper_bound` / `lower_bound` / `raw_type` helpers |
//! | [`call`] | `Call` / `Callback` ports and the erased `Payload` / `Consumer` / `Adapted` values |
//! | [`contract`] | `CallbackAdapter` contract and `CallbackAdapterFactory` capability |
//! | [`resolver`] | Ordered factory chain with first-match-wins semantics |
//! | [`default_factory`] | Built-in strategy for `Callback<T>` on methods returning `()` |
//! | [`metadata`] | Call-site identity and annotations |
//! | [`errors`] | Configuration, adaptation, and call errors |

pub mod call;
pub mod contract;
pub mod default_factory;
pub mod errors;
pub mod metadata;
pub mod resolver;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use call::{
    callback_consumer, callback_fn, erase_call, erase_callback, Adapted, Call, Callback,
    Consumer, ErasedCallback, FnCallback, Payload,
};
pub use contract::{CallbackAdapter, CallbackAdapterFactory, FnFactory};
pub use default_factory::{CallbackEnqueueAdapter, DefaultCallbackAdapterFactory};
pub use errors::{AdaptError, CallError, ConfigurationError, FactoryError, TypeError};
pub use metadata::{Annotation, CallSite};
pub use resolver::{AdapterResolver, AdapterResolverBuilder};
pub use types::{lower_bound, raw_type, upper_bound, ClassId, DeclaredType};
