//! Naming conventions for generated services
//!
//! Every name the templates need is derived from the target model name here,
//! so that the catalog never has to know how a plural or a file name is built.

use inflector::Inflector;
use serde::Serialize;

/// Suffix appended to a target to name its service struct
pub const SERVICE_SUFFIX: &str = "Service";

/// Names derived from one target, as seen by the templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingContext {
    /// Service struct name (e.g. `InvoiceService`)
    pub service_name: String,
    /// Entity type name (e.g. `Invoice`)
    pub entity_type: String,
    /// Plural used for collection bindings (e.g. `invoices`)
    pub entity_plural: String,
}

impl NamingContext {
    /// Derive the naming context for a target
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudgen::naming::NamingContext;
    /// let naming = NamingContext::for_target("Invoice");
    /// assert_eq!(naming.service_name, "InvoiceService");
    /// assert_eq!(naming.entity_type, "Invoice");
    /// assert_eq!(naming.entity_plural, "invoices");
    /// ```
    #[must_use]
    pub fn for_target(target: &str) -> Self {
        Self {
            service_name: service_name(target),
            entity_type: target.to_string(),
            entity_plural: pluralize(&target.to_lowercase()),
        }
    }
}

/// Service struct name for a target
#[must_use]
pub fn service_name(target: &str) -> String {
    format!("{target}{SERVICE_SUFFIX}")
}

/// Pluralize a word
///
/// # Examples
///
/// ```
/// # use crudgen::naming::pluralize;
/// assert_eq!(pluralize("post"), "posts");
/// assert_eq!(pluralize("category"), "categories");
/// ```
///
/// # Note
///
/// The inflector library has known limitations with some irregular plurals.
/// This is acceptable for code generation as model names are typically regular words.
#[must_use]
pub fn pluralize(input: &str) -> String {
    input.to_plural()
}

/// Whether `name` can be used as a target: a `PascalCase` Rust identifier
#[must_use]
pub fn is_valid_target(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(char::is_uppercase)
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && syn::parse_str::<syn::Ident>(name).is_ok()
}
