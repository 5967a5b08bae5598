//! Service binding for Tether.
//!
//! A [`ServiceDefinition`] names a service and declares its methods. A
//! [`ServiceClient`] holds the ordered callback adapter factories; calling
//! [`ServiceClient::create`] resolves an adapter for every method up front
//! and yields a [`Service`] whose [`BoundMethod`]s dispatch each invocation
//! to the adapter chosen at bind time.
//!
//! ## Architectural Layer
//!
//! **Application layer.** Depends on the `adapter` crate for the resolution
//! contract; transports are supplied by the caller at invocation time.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | `ServiceClient`, its builder, `Service`, and `BoundMethod` |
//! | [`declaration`] | Serde-friendly `ServiceDefinition` and `MethodDeclaration` |
//! | [`identifiers`] | `ServiceName`, `MethodName`, `InvocationId` |
//! | [`errors`] | `ServiceError` |

pub mod client;
pub mod declaration;
pub mod errors;
pub mod identifiers;

pub use adapter::{Annotation, CallSite};
pub use client::{BoundMethod, Service, ServiceClient, ServiceClientBuilder};
pub use declaration::{MethodDeclaration, ServiceDefinition};
pub use errors::ServiceError;
pub use identifiers::{InvocationId, MethodName, ServiceName};
