//! Template rendering and parsing of generated declarations
//!
//! Templates are expanded with Handlebars (strict mode, no escaping) and the
//! resulting text is parsed with `syn` before anything touches a service file.
//! A template that renders to something other than exactly one declaration is
//! a bug in the catalog and is reported as [`Error::MalformedGeneratedCode`].

use crate::catalog::templates::{ALIAS_TEMPLATE, HOLDER_TEMPLATE, IMPORT_TEMPLATE};
use crate::catalog::{Catalog, DeclarationTemplate};
use crate::config::CrudgenConfig;
use crate::document::{bound_paths, receiver_name};
use crate::error::{Error, Result};
use crate::naming::NamingContext;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use syn::{AttrStyle, ImplItem, ImplItemFn, Item, ItemImpl, ItemStruct, ItemType, ItemUse};

const IMPORT_KEY: &str = "service.import";
const ALIAS_KEY: &str = "service.alias";
const HOLDER_KEY: &str = "service.holder";

/// A `use` item binding exactly one path
#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Bound path (e.g. `crate::dal`)
    pub path: String,
    /// Parsed item
    pub item: ItemUse,
}

/// A single function inside an inherent impl block
///
/// Only built by [`parse_declaration`], which checks the block shape.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    receiver: String,
    name: String,
    function: ImplItemFn,
    block: ItemImpl,
}

impl MethodDecl {
    /// Self type of the impl block (e.g. `InvoiceService`)
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Function name (e.g. `get_by_id`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The generated function
    #[must_use]
    pub const fn function(&self) -> &ImplItemFn {
        &self.function
    }

    /// The rendered impl block, holding exactly this function
    #[must_use]
    pub const fn block(&self) -> &ItemImpl {
        &self.block
    }
}

/// One parsed generated declaration
#[derive(Debug, Clone)]
pub enum Declaration {
    /// `use` item
    Import(ImportDecl),
    /// `type` alias
    Alias(ItemType),
    /// Struct definition
    Holder(ItemStruct),
    /// Function inside an inherent impl
    Method(MethodDecl),
}

impl Declaration {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Import(_) => "an import",
            Self::Alias(_) => "a type alias",
            Self::Holder(_) => "a struct",
            Self::Method(_) => "a method",
        }
    }
}

/// Every declaration a service file must contain, rendered and parsed
#[derive(Debug, Clone)]
pub struct ServiceDeclarations {
    /// Header text (inner attributes only)
    pub header: String,
    /// Required imports, in configured order
    pub imports: Vec<ImportDecl>,
    /// Alias of the entity to the external model type
    pub alias: ItemType,
    /// Service struct
    pub holder: ItemStruct,
    /// Required methods, in operation order
    pub methods: Vec<MethodDecl>,
}

/// Handlebars-backed renderer for the catalog and the service templates
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("templates", &self.handlebars.get_templates().len())
            .finish()
    }
}

impl TemplateRenderer {
    /// Compile the service templates and every template of `catalog`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateSyntax`] if a template body does not compile.
    pub fn new(catalog: &Catalog) -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Disable HTML escaping since we're generating code
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        let mut renderer = Self { handlebars };
        renderer.register(IMPORT_KEY, IMPORT_TEMPLATE)?;
        renderer.register(ALIAS_KEY, ALIAS_TEMPLATE)?;
        renderer.register(HOLDER_KEY, HOLDER_TEMPLATE)?;
        for template in catalog.iter() {
            renderer.register(&method_key(template.name), template.body)?;
        }
        Ok(renderer)
    }

    fn register(&mut self, name: &str, body: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, body)
            .map_err(|err| Error::TemplateSyntax {
                name: name.to_string(),
                message: err.to_string(),
            })
    }

    /// Expand a registered template
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateRender`] if the template is unknown or refers
    /// to a value missing from `data`.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.handlebars
            .render(name, data)
            .map_err(|err| Error::TemplateRender {
                name: name.to_string(),
                message: err.to_string(),
            })
    }

    /// Render and parse a method template
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the output is not a single method.
    pub fn render_method(
        &self,
        template: &DeclarationTemplate,
        naming: &NamingContext,
    ) -> Result<MethodDecl> {
        let text = self.render(&method_key(template.name), naming)?;
        match parse_declaration(template.name, &text)? {
            Declaration::Method(method) => Ok(method),
            other => Err(unexpected(template.name, "a method", &other)),
        }
    }

    /// Render and parse the import of `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not form a valid `use` item.
    pub fn render_import(&self, path: &str) -> Result<ImportDecl> {
        let text = self.render(IMPORT_KEY, &json!({ "path": path }))?;
        match parse_declaration(IMPORT_KEY, &text)? {
            Declaration::Import(import) if import.path == path => Ok(import),
            Declaration::Import(import) => Err(Error::MalformedGeneratedCode {
                template: IMPORT_KEY.to_string(),
                message: format!("`{path}` binds `{}` instead", import.path),
            }),
            other => Err(unexpected(IMPORT_KEY, "an import", &other)),
        }
    }

    /// Render and parse the entity alias
    ///
    /// # Errors
    ///
    /// Returns an error if the output is not a type alias.
    pub fn render_alias(&self, naming: &NamingContext, models_module: &str) -> Result<ItemType> {
        let data = json!({
            "entity_type": naming.entity_type,
            "models_module": models_module,
        });
        let text = self.render(ALIAS_KEY, &data)?;
        match parse_declaration(ALIAS_KEY, &text)? {
            Declaration::Alias(alias) => Ok(alias),
            other => Err(unexpected(ALIAS_KEY, "a type alias", &other)),
        }
    }

    /// Render and parse the service struct
    ///
    /// # Errors
    ///
    /// Returns an error if the output is not a struct.
    pub fn render_holder(&self, naming: &NamingContext) -> Result<ItemStruct> {
        let text = self.render(HOLDER_KEY, naming)?;
        match parse_declaration(HOLDER_KEY, &text)? {
            Declaration::Holder(holder) => Ok(holder),
            other => Err(unexpected(HOLDER_KEY, "a struct", &other)),
        }
    }

    /// Render every declaration required for one target
    ///
    /// Nothing is written by this step, so a broken template aborts the target
    /// before its file is touched.
    ///
    /// # Errors
    ///
    /// Returns the first rendering or parsing failure.
    pub fn render_service(
        &self,
        naming: &NamingContext,
        config: &CrudgenConfig,
        operations: &[DeclarationTemplate],
    ) -> Result<ServiceDeclarations> {
        let header = validate_header(&config.header)?;
        let imports = config
            .imports
            .iter()
            .map(|path| self.render_import(path))
            .collect::<Result<Vec<_>>>()?;
        let alias = self.render_alias(naming, &config.models_module)?;
        let holder = self.render_holder(naming)?;
        let methods = operations
            .iter()
            .map(|template| self.render_method(template, naming))
            .collect::<Result<Vec<_>>>()?;

        Ok(ServiceDeclarations {
            header,
            imports,
            alias,
            holder,
            methods,
        })
    }
}

fn method_key(name: &str) -> String {
    format!("method.{name}")
}

fn unexpected(template: &str, expected: &str, found: &Declaration) -> Error {
    Error::MalformedGeneratedCode {
        template: template.to_string(),
        message: format!("expected {expected}, found {}", found.kind()),
    }
}

/// Parse rendered text into exactly one declaration
///
/// # Errors
///
/// Returns [`Error::MalformedGeneratedCode`] if the text does not parse, holds
/// anything other than one supported item, or is a method block with a trait,
/// generics, or not exactly one function.
pub fn parse_declaration(template: &str, text: &str) -> Result<Declaration> {
    let malformed = |message: String| Error::MalformedGeneratedCode {
        template: template.to_string(),
        message,
    };

    let file = syn::parse_file(text).map_err(|err| malformed(err.to_string()))?;
    if !file.attrs.is_empty() {
        return Err(malformed("unexpected inner attributes".to_string()));
    }
    let mut items = file.items.into_iter();
    let (Some(item), None) = (items.next(), items.next()) else {
        return Err(malformed("expected exactly one declaration".to_string()));
    };

    match item {
        Item::Use(item) => {
            let mut paths = bound_paths(&item);
            if paths.len() != 1 {
                return Err(malformed(format!("import binds {} paths", paths.len())));
            }
            Ok(Declaration::Import(ImportDecl {
                path: paths.remove(0),
                item,
            }))
        }
        Item::Type(alias) => Ok(Declaration::Alias(alias)),
        Item::Struct(holder) => Ok(Declaration::Holder(holder)),
        Item::Impl(block) => {
            if block.trait_.is_some() || !block.generics.params.is_empty() {
                return Err(malformed("method block must be a plain inherent impl".to_string()));
            }
            let receiver = receiver_name(&block.self_ty)
                .ok_or_else(|| malformed("method block has no named self type".to_string()))?;
            let function = match block.items.as_slice() {
                [ImplItem::Fn(function)] => function.clone(),
                _ => return Err(malformed("method block must hold exactly one function".to_string())),
            };
            Ok(Declaration::Method(MethodDecl {
                receiver,
                name: function.sig.ident.to_string(),
                function,
                block,
            }))
        }
        _ => Err(malformed("unsupported declaration kind".to_string())),
    }
}

/// Check that a header consists of inner attributes only
///
/// # Errors
///
/// Returns [`Error::MalformedGeneratedCode`] if the text has items, outer
/// attributes, or nothing at all.
pub fn validate_header(header: &str) -> Result<String> {
    let malformed = |message: String| Error::MalformedGeneratedCode {
        template: "header".to_string(),
        message,
    };
    let file = syn::parse_file(header).map_err(|err| malformed(err.to_string()))?;
    if file.attrs.is_empty() || !file.items.is_empty() {
        return Err(malformed("header must consist of inner attributes only".to_string()));
    }
    if file.attrs.iter().any(|attr| !matches!(attr.style, AttrStyle::Inner(_))) {
        return Err(malformed("header must consist of inner attributes only".to_string()));
    }
    Ok(header.trim().to_string())
}
