//! Service and method declarations as handed over by the service definer.
//!
//! Declarations carry exactly what resolution needs: the consumer parameter's
//! full declared type, the declared return type, and the method's annotations.
//! They (de)serialize with serde so a service can be described in JSON:
//!
//! ```json
//! {
//!   "name": "GitHub",
//!   "methods": [
//!     {
//!       "name": "listRepos",
//!       "callback_type": "Callback<List<Repo>>",
//!       "annotations": [{ "name": "GET", "value": "/users/{user}/repos" }]
//!     }
//!   ]
//! }
//! ```
//!
//! `return_type` defaults to `()` and `annotations` to none.

use adapter::{Annotation, CallSite, DeclaredType};
use serde::{Deserialize, Serialize};

use crate::identifiers::{MethodName, ServiceName};

/// One declared method of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    /// Method name, unique within its service.
    pub name: MethodName,

    /// Declared type of the consumer parameter, e.g. `Callback<Repo>`.
    pub callback_type: DeclaredType,

    /// Declared return type. `()` when the method returns nothing.
    #[serde(default = "DeclaredType::unit")]
    pub return_type: DeclaredType,

    /// Method annotations, passed through to every factory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl MethodDeclaration {
    /// A method returning `()` with no annotations.
    pub fn new(name: MethodName, callback_type: DeclaredType) -> Self {
        Self {
            name,
            callback_type,
            return_type: DeclaredType::unit(),
            annotations: Vec::new(),
        }
    }

    /// Replaces the declared return type.
    #[must_use]
    pub fn returning(mut self, return_type: DeclaredType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Appends an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// The call site this method binds to within `service`.
    pub fn call_site(&self, service: &ServiceName) -> CallSite {
        CallSite::new(service.as_str(), self.name.as_str()).with_annotations(self.annotations.clone())
    }
}

/// A named set of method declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Service name, used as the prefix of every call site.
    pub name: ServiceName,

    /// Declared methods, in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDeclaration>,
}

impl ServiceDefinition {
    /// A service with no methods.
    pub fn new(name: ServiceName) -> Self {
        Self {
            name,
            methods: Vec::new(),
        }
    }

    /// Appends a method declaration.
    #[must_use]
    pub fn with_method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }
}
