//! Declaration catalog
//!
//! Maps operation names to the method templates generated for every target.

pub mod templates;

use crate::error::{Error, Result};
use templates::{
    COUNT_TEMPLATE, CREATE_TEMPLATE, DELETE_TEMPLATE, GET_ALL_TEMPLATE, GET_BY_ID_TEMPLATE,
    SEARCH_TEMPLATE, SORTED_TEMPLATE, UPDATE_TEMPLATE,
};

/// Named, parameterized source of exactly one declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationTemplate {
    /// Operation name (e.g. `get_by_id`)
    pub name: &'static str,
    /// Handlebars body
    pub body: &'static str,
}

impl DeclarationTemplate {
    /// Create a template
    #[must_use]
    pub const fn new(name: &'static str, body: &'static str) -> Self {
        Self { name, body }
    }
}

/// Registered method templates, in registration order
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<DeclarationTemplate>,
}

impl Catalog {
    /// Catalog with every built-in operation
    #[must_use]
    pub fn builtin() -> Self {
        Self::with_templates(vec![
            DeclarationTemplate::new("create", CREATE_TEMPLATE),
            DeclarationTemplate::new("get_all", GET_ALL_TEMPLATE),
            DeclarationTemplate::new("get_by_id", GET_BY_ID_TEMPLATE),
            DeclarationTemplate::new("update", UPDATE_TEMPLATE),
            DeclarationTemplate::new("delete", DELETE_TEMPLATE),
            DeclarationTemplate::new("count", COUNT_TEMPLATE),
            DeclarationTemplate::new("sorted", SORTED_TEMPLATE),
            DeclarationTemplate::new("search", SEARCH_TEMPLATE),
        ])
    }

    /// Catalog with a custom set of templates
    #[must_use]
    pub const fn with_templates(templates: Vec<DeclarationTemplate>) -> Self {
        Self { templates }
    }

    /// Look up a template by operation name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] if the name is not registered.
    pub fn lookup(&self, name: &str) -> Result<&DeclarationTemplate> {
        self.templates
            .iter()
            .find(|template| template.name == name)
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }

    /// Resolve an ordered list of operation names
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] for the first name that is not registered.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DeclarationTemplate>> {
        names
            .iter()
            .map(|name| self.lookup(name.as_ref()).copied())
            .collect()
    }

    /// Registered templates, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DeclarationTemplate> {
        self.templates.iter()
    }

    /// Registered operation names
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.iter().map(|template| template.name)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
