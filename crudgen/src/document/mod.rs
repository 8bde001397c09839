//! In-memory model of one service file
//!
//! A [`Document`] is the file header (inner attributes), the ordered top-level
//! declarations, and whatever trails the last declaration. Declarations read
//! from disk keep their verbatim text, leading comments and comments on their
//! last line included, so that anything the merge engine does not touch is
//! written back byte for byte. Declarations created during a merge carry no
//! text and are printed with `prettyplease` when the document is serialized.
//!
//! Serialization is two-phase: every declaration is classified into a
//! [`Slot`], then the output is rebuilt slot by slot (imports, service struct,
//! entity alias, untouched items, generated impl blocks). Declarations keep
//! their relative order inside a slot.
//!
//! Every lookup scans the current declarations; no position survives a
//! mutation.

mod source;

pub use source::{line_ending, split_shebang, trailing_comment_end, LineIndex};

use crate::error::{Error, Result};
use crate::render::MethodDecl;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use syn::spanned::Spanned;
use syn::{AttrStyle, ImplItem, Item, ItemImpl, ItemStruct, ItemType, ItemUse, Type, UseTree};

const BOM: char = '\u{feff}';

/// Canonical group of a declaration, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// `use` items
    Import,
    /// Service struct
    Holder,
    /// Entity type alias
    Alias,
    /// Everything the merge engine does not manage
    Untouched,
    /// Impl blocks created during a merge
    Generated,
}

/// One top-level declaration
#[derive(Debug, Clone)]
pub struct Decl {
    item: Item,
    source: Option<String>,
    ordinal: Option<usize>,
    slot: Option<Slot>,
}

impl Decl {
    /// Declaration with verbatim text, placed as if it came from elsewhere
    #[must_use]
    pub const fn from_source(item: Item, source: String) -> Self {
        Self {
            item,
            source: Some(source),
            ordinal: None,
            slot: None,
        }
    }

    /// Declaration created by a merge
    #[must_use]
    pub const fn generated(item: Item) -> Self {
        Self {
            item,
            source: None,
            ordinal: None,
            slot: None,
        }
    }

    const fn loaded(item: Item, source: String, ordinal: usize) -> Self {
        Self {
            item,
            source: Some(source),
            ordinal: Some(ordinal),
            slot: None,
        }
    }

    /// Parsed item
    #[must_use]
    pub const fn item(&self) -> &Item {
        &self.item
    }

    /// Verbatim text, if the declaration came from disk
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether the declaration was created by a merge
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.source.is_none()
    }

    /// Slot the declaration is serialized in
    ///
    /// Service struct and alias are assigned by the merge engine; everything
    /// else is classified by shape.
    #[must_use]
    pub const fn slot(&self) -> Slot {
        if let Some(slot) = self.slot {
            return slot;
        }
        match &self.item {
            Item::Use(_) => Slot::Import,
            Item::Impl(_) if self.is_generated() => Slot::Generated,
            _ => Slot::Untouched,
        }
    }

    /// Name of the type this item defines, for structs, enums, unions and aliases
    #[must_use]
    pub fn type_name(&self) -> Option<String> {
        match &self.item {
            Item::Struct(item) => Some(item.ident.to_string()),
            Item::Enum(item) => Some(item.ident.to_string()),
            Item::Union(item) => Some(item.ident.to_string()),
            Item::Type(item) => Some(item.ident.to_string()),
            _ => None,
        }
    }

    /// Self type name when the item is an inherent impl block
    #[must_use]
    pub fn inherent_receiver(&self) -> Option<String> {
        match &self.item {
            Item::Impl(block) if block.trait_.is_none() => receiver_name(&block.self_ty),
            _ => None,
        }
    }

    const fn is_use(&self) -> bool {
        matches!(self.item, Item::Use(_))
    }

    fn render(&self) -> String {
        match &self.item {
            Item::Impl(block) if block.items.len() > 1 => render_impl(block),
            item => unparse(item),
        }
    }

    /// Remove the `index`-th item of an impl block, with its leading comments
    fn remove_impl_item(&mut self, index: usize, origin: &Path) -> Result<()> {
        let invalid = |message: String| Error::SerializationInvariantViolation {
            path: origin.to_path_buf(),
            message,
        };
        let Some(text) = &self.source else {
            return match &mut self.item {
                Item::Impl(block) if index < block.items.len() => {
                    block.items.remove(index);
                    Ok(())
                }
                _ => Err(invalid(format!("generated declaration has no impl item #{index}"))),
            };
        };

        let file = syn::parse_file(text).map_err(|err| invalid(err.to_string()))?;
        let Some(Item::Impl(block)) = file.items.first() else {
            return Err(invalid("declaration is not an impl block".to_string()));
        };
        let Some(removed) = block.items.get(index) else {
            return Err(invalid(format!("impl block has no item #{index}")));
        };

        let lines = LineIndex::new(text);
        let previous_end = match index.checked_sub(1).and_then(|previous| block.items.get(previous)) {
            Some(previous) => lines.offset(text, previous.span().end()),
            None => block
                .attrs
                .iter()
                .filter(|attr| matches!(attr.style, AttrStyle::Inner(_)))
                .map(|attr| lines.offset(text, attr.span().end()))
                .fold(lines.offset(text, block.brace_token.span.open().end()), usize::max),
        };
        let start = trailing_comment_end(text, previous_end);
        let mut end = trailing_comment_end(text, lines.offset(text, removed.span().end()));
        if index == 0 {
            let rest = &text[end..];
            let blank = &rest[..rest.len() - rest.trim_start().len()];
            if let Some(newline) = blank.rfind('\n') {
                end += blank[..newline].strip_suffix('\r').map_or(newline, str::len);
            }
        }

        let spliced = format!("{}{}", &text[..start], &text[end..]);
        let reparsed = syn::parse_file(&spliced).map_err(|err| invalid(err.to_string()))?;
        let Some(item) = reparsed.items.into_iter().next() else {
            return Err(invalid("impl block vanished".to_string()));
        };
        self.item = item;
        self.source = Some(spliced);
        Ok(())
    }
}

/// Position of a function inside an impl block of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodLocation {
    /// Index of the impl block among the declarations
    pub decl: usize,
    /// Index of the function among the impl block's items
    pub item: usize,
}

/// Parsed service file
#[derive(Debug, Clone)]
pub struct Document {
    origin: PathBuf,
    bom: bool,
    shebang: String,
    header: String,
    header_verbatim: bool,
    eol: &'static str,
    decls: Vec<Decl>,
    trailer: String,
}

impl Document {
    /// Read and parse a file
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist, [`Error::Io`] if
    /// it cannot be read, and [`Error::ParseError`] if it is not valid Rust.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Error::io(path, err)
            }
        })?;
        Self::parse(path, &source)
    }

    /// Parse source text; `origin` is only used in error messages
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if the text is not valid Rust.
    pub fn parse(origin: impl Into<PathBuf>, source: &str) -> Result<Self> {
        let origin = origin.into();
        let (bom, source) = match source.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, source),
        };
        let (shebang, body) = split_shebang(source);
        let file = syn::parse_file(body).map_err(|err| Error::parse(&origin, &err))?;
        let lines = LineIndex::new(body);

        let header_end = file
            .attrs
            .iter()
            .map(|attr| lines.offset(body, attr.span().end()))
            .max()
            .unwrap_or(0);

        let mut cursor = header_end;
        let mut decls = Vec::with_capacity(file.items.len());
        for (ordinal, item) in file.items.into_iter().enumerate() {
            let end = trailing_comment_end(body, lines.offset(body, item.span().end())).max(cursor);
            decls.push(Decl::loaded(item, body[cursor..end].to_string(), ordinal));
            cursor = end;
        }

        Ok(Self {
            origin,
            bom,
            shebang: shebang.to_string(),
            header: body[..header_end].to_string(),
            header_verbatim: true,
            eol: line_ending(source),
            decls,
            trailer: body[cursor..].to_string(),
        })
    }

    /// Path the document was read from
    #[must_use]
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Line terminator used for everything the document prints
    #[must_use]
    pub const fn line_ending(&self) -> &'static str {
        self.eol
    }

    /// Verbatim header text (inner attributes), empty when the file has none
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Whether the file starts with at least one inner attribute
    #[must_use]
    pub fn has_header(&self) -> bool {
        !self.header.trim().is_empty()
    }

    /// Install a header on a file that has none
    ///
    /// Returns `false` and leaves the document alone if a header exists.
    pub fn set_header(&mut self, header: &str) -> bool {
        if self.has_header() {
            return false;
        }
        self.header = header.trim().lines().collect::<Vec<_>>().join(self.eol);
        self.header_verbatim = false;
        true
    }

    /// Top-level declarations in stored order
    #[must_use]
    pub fn decls(&self) -> &[Decl] {
        &self.decls
    }

    /// Number of top-level declarations
    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Whether the document has no declarations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Range of declarations spanned by the top-level `use` items
    #[must_use]
    pub fn find_import_block(&self) -> Option<std::ops::Range<usize>> {
        let first = self.decls.iter().position(Decl::is_use)?;
        let last = self.decls.iter().rposition(Decl::is_use)?;
        Some(first..last + 1)
    }

    /// Every path bound by a top-level `use` item
    #[must_use]
    pub fn import_paths(&self) -> BTreeSet<String> {
        self.decls
            .iter()
            .filter_map(|decl| match &decl.item {
                Item::Use(item) => Some(bound_paths(item)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Indices of structs named `name`
    #[must_use]
    pub fn find_structs(&self, name: &str) -> Vec<usize> {
        self.positions(|decl| matches!(&decl.item, Item::Struct(item) if item.ident == name))
    }

    /// Indices of type definitions (struct, enum, union, alias) named `name`
    #[must_use]
    pub fn find_type_slot(&self, name: &str) -> Vec<usize> {
        self.positions(|decl| decl.type_name().is_some_and(|type_name| type_name == name))
    }

    fn positions(&self, predicate: impl Fn(&Decl) -> bool) -> Vec<usize> {
        self.decls
            .iter()
            .enumerate()
            .filter(|(_, decl)| predicate(decl))
            .map(|(index, _)| index)
            .collect()
    }

    /// Every function named `name` in inherent impl blocks of `receiver`
    #[must_use]
    pub fn find_methods(&self, receiver: &str, name: &str) -> Vec<MethodLocation> {
        let mut found = Vec::new();
        for (decl_index, decl) in self.decls.iter().enumerate() {
            if decl.inherent_receiver().as_deref() != Some(receiver) {
                continue;
            }
            let Item::Impl(block) = &decl.item else {
                continue;
            };
            for (item_index, item) in block.items.iter().enumerate() {
                if matches!(item, ImplItem::Fn(function) if function.sig.ident == name) {
                    found.push(MethodLocation {
                        decl: decl_index,
                        item: item_index,
                    });
                }
            }
        }
        found
    }

    /// Add a generated `use` item to the import slot
    pub fn push_import(&mut self, item: ItemUse) {
        self.decls.push(Decl::generated(Item::Use(item)));
    }

    /// Add a generated service struct
    pub fn set_holder(&mut self, item: ItemStruct) {
        self.push_assigned(Item::Struct(item), Slot::Holder);
    }

    /// Add a generated entity alias
    pub fn set_alias(&mut self, item: ItemType) {
        self.push_assigned(Item::Type(item), Slot::Alias);
    }

    fn push_assigned(&mut self, item: Item, slot: Slot) {
        let mut decl = Decl::generated(item);
        decl.slot = Some(slot);
        self.decls.push(decl);
    }

    /// Move the declaration at `index` into `slot`
    ///
    /// Returns `false` if there is no such declaration.
    pub fn assign(&mut self, index: usize, slot: Slot) -> bool {
        match self.decls.get_mut(index) {
            Some(decl) => {
                decl.slot = Some(slot);
                true
            }
            None => false,
        }
    }

    /// Insert a declaration before `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, decl: Decl) {
        let index = index.min(self.decls.len());
        self.decls.insert(index, decl);
    }

    /// Replace the declaration at `index`, returning the old one
    pub fn replace(&mut self, index: usize, decl: Decl) -> Option<Decl> {
        self.decls
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, decl))
    }

    /// Remove the declaration at `index`
    pub fn remove(&mut self, index: usize) -> Option<Decl> {
        (index < self.decls.len()).then(|| self.decls.remove(index))
    }

    /// Remove a function from its impl block
    ///
    /// The function's leading comments, and comments on its last line, go
    /// with it. An impl block left without items is removed entirely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationInvariantViolation`] if `location` does
    /// not point at an impl item or the block cannot be re-parsed after the
    /// edit.
    pub fn remove_method(&mut self, location: MethodLocation) -> Result<()> {
        let Some(decl) = self.decls.get_mut(location.decl) else {
            return Err(Error::SerializationInvariantViolation {
                path: self.origin.clone(),
                message: format!("no declaration #{}", location.decl),
            });
        };
        decl.remove_impl_item(location.item, &self.origin)?;
        if matches!(&decl.item, Item::Impl(block) if block.items.is_empty()) {
            self.decls.remove(location.decl);
        }
        Ok(())
    }

    /// Append a generated function for its receiver
    ///
    /// Functions generated during one merge share a single impl block at the
    /// end of the document; blocks read from disk are never extended.
    pub fn append_method(&mut self, method: &MethodDecl) {
        let open_block = self.decls.iter_mut().rev().find(|decl| {
            decl.is_generated() && decl.inherent_receiver().as_deref() == Some(method.receiver())
        });
        match open_block {
            Some(Decl {
                item: Item::Impl(block),
                ..
            }) => block.items.push(ImplItem::Fn(method.function().clone())),
            _ => self.decls.push(Decl::generated(Item::Impl(method.block().clone()))),
        }
    }

    /// Declarations in output order: stable by [`Slot`]
    #[must_use]
    pub fn canonical_order(&self) -> Vec<&Decl> {
        let mut order: Vec<&Decl> = self.decls.iter().collect();
        order.sort_by_key(|decl| decl.slot());
        order
    }

    /// Render the document and verify the result parses back
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationInvariantViolation`] if the rendered text
    /// does not parse or does not hold the same number of declarations.
    pub fn serialize(&self) -> Result<String> {
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        let start = out.len();
        out.push_str(&self.shebang);
        out.push_str(&self.header);

        let mut previous: Option<&Decl> = None;
        for decl in self.canonical_order() {
            if out.len() > start && self.needs_separator(previous, decl) {
                let tight = previous.is_some_and(Decl::is_use) && decl.is_use();
                out.push_str(self.eol);
                if !tight {
                    out.push_str(self.eol);
                }
            }
            match &decl.source {
                Some(text) => out.push_str(text),
                None if self.eol == "\n" => out.push_str(&decl.render()),
                None => out.push_str(&decl.render().replace('\n', self.eol)),
            }
            previous = Some(decl);
        }

        if self.trailer.trim().is_empty() {
            out.push_str(self.eol);
        } else {
            out.push_str(&self.trailer);
            if !out.ends_with('\n') {
                out.push_str(self.eol);
            }
        }

        let reparsed = Self::parse(&self.origin, &out).map_err(|err| {
            Error::SerializationInvariantViolation {
                path: self.origin.clone(),
                message: err.to_string(),
            }
        })?;
        if reparsed.len() != self.len() {
            return Err(Error::SerializationInvariantViolation {
                path: self.origin.clone(),
                message: format!(
                    "expected {} declarations, rendered text holds {}",
                    self.len(),
                    reparsed.len()
                ),
            });
        }
        Ok(out)
    }

    /// Whether `decl` needs a blank line in front of it
    ///
    /// Verbatim text that already starts on a new line, or that still follows
    /// its original predecessor, is written as is.
    fn needs_separator(&self, previous: Option<&Decl>, decl: &Decl) -> bool {
        let Some(text) = &decl.source else {
            return true;
        };
        if text.starts_with('\n') || text.starts_with("\r\n") {
            return false;
        }
        let expected = match previous {
            Some(previous) => previous.ordinal.map(|ordinal| ordinal + 1),
            None if self.header_verbatim => Some(0),
            None => None,
        };
        expected.is_none() || decl.ordinal != expected
    }
}

/// Last path segment of a self type (`InvoiceService` for `crate::InvoiceService`)
#[must_use]
pub fn receiver_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            path.path.segments.last().map(|segment| segment.ident.to_string())
        }
        Type::Group(group) => receiver_name(&group.elem),
        Type::Paren(paren) => receiver_name(&paren.elem),
        _ => None,
    }
}

/// Paths bound by a `use` item under their own name
///
/// Groups are flattened and `self` binds its parent path. Renamed and glob
/// imports bind nothing.
#[must_use]
pub fn bound_paths(item: &syn::ItemUse) -> Vec<String> {
    fn walk(tree: &UseTree, prefix: &mut Vec<String>, out: &mut Vec<String>) {
        match tree {
            UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                walk(&path.tree, prefix, out);
                prefix.pop();
            }
            UseTree::Name(name) if name.ident == "self" => {
                if prefix.iter().any(|segment| !segment.is_empty()) {
                    out.push(prefix.join("::"));
                }
            }
            UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                out.push(prefix.join("::"));
                prefix.pop();
            }
            UseTree::Group(group) => {
                for tree in &group.items {
                    walk(tree, prefix, out);
                }
            }
            UseTree::Rename(_) | UseTree::Glob(_) => {}
        }
    }

    let mut prefix = Vec::new();
    if item.leading_colon.is_some() {
        prefix.push(String::new());
    }
    let mut out = Vec::new();
    walk(&item.tree, &mut prefix, &mut out);
    out
}

fn unparse(item: &Item) -> String {
    let file = syn::File {
        shebang: None,
        attrs: Vec::new(),
        items: vec![item.clone()],
    };
    prettyplease::unparse(&file).trim_end().to_string()
}

/// Print an impl block with a blank line between its functions
fn render_impl(block: &ItemImpl) -> String {
    let empty = unparse(&Item::Impl(ItemImpl {
        items: Vec::new(),
        ..block.clone()
    }));
    let head = empty.strip_suffix('}').unwrap_or(&empty).trim_end();
    let body = block
        .items
        .iter()
        .map(|item| {
            let single = unparse(&Item::Impl(ItemImpl {
                items: vec![item.clone()],
                ..block.clone()
            }));
            let inner = single.split_once('\n').map_or("", |(_, rest)| rest);
            inner.strip_suffix('}').unwrap_or(inner).trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{head}\n{body}\n}}")
}
