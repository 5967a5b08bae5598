//! Call-site metadata handed to every factory during resolution.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A method annotation, passed through to factories unchanged.
///
/// The built-in strategy ignores annotations; custom factories may use them
/// to vary behaviour per method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation name without the leading `@`.
    pub name: String,
    /// Optional single value, e.g. the path of `@GET("/repos")`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Annotation {
    /// An annotation without a value.
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// An annotation carrying a value.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "@{}({value:?})", self.name),
            None => write!(f, "@{}", self.name),
        }
    }
}

/// Identity of the method being bound, plus its annotations.
///
/// Displays as `Service.method`; that form is used in every configuration
/// error so a failure points straight at the offending declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    service: String,
    method: String,
    annotations: Vec<Annotation>,
}

impl CallSite {
    /// A call site without annotations.
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            annotations: Vec::new(),
        }
    }

    /// Replaces the annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    /// The declaring service's name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// All annotations, in declaration order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// The first annotation called `name`, if any.
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_site_displays_as_qualified_method() {
        let site = CallSite::new("GitHub", "listRepos");
        assert_eq!(site.to_string(), "GitHub.listRepos");
    }

    #[test]
    fn annotation_lookup_returns_first_match() {
        let site = CallSite::new("GitHub", "listRepos").with_annotations(vec![
            Annotation::with_value("GET", "/users/{user}/repos"),
            Annotation::marker("Streaming"),
        ]);
        assert_eq!(
            site.annotation("GET").and_then(|a| a.value.as_deref()),
            Some("/users/{user}/repos")
        );
        assert!(site.annotation("POST").is_none());
        assert_eq!(site.annotations()[1].to_string(), "@Streaming");
    }
}
