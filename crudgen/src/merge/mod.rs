//! Idempotent merge policies
//!
//! Each pass looks up the declarations it owns in the current [`Document`],
//! decides, and then mutates. Positions are never carried from one pass to
//! the next.
//!
//! | Declaration | Absent      | Present, default | Present, overwrite |
//! |-------------|-------------|------------------|--------------------|
//! | header      | inserted    | unchanged        | unchanged          |
//! | import      | inserted    | unchanged        | unchanged          |
//! | alias       | inserted    | repaired         | repaired           |
//! | holder      | inserted    | unchanged        | replaced           |
//! | method      | appended    | unchanged        | replaced           |

use crate::document::{Decl, Document, Slot};
use crate::error::{Error, Result};
use crate::render::{ImportDecl, MethodDecl, ServiceDeclarations};
use quote::ToTokens;
use std::fmt;
use syn::{Item, ItemStruct, ItemType};
use tracing::{debug, warn};

/// What a merge did to one declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The declaration was missing and has been added
    Inserted,
    /// An existing declaration was discarded in favor of the generated one
    Replaced,
    /// The document already held an acceptable declaration
    Unchanged,
}

impl MergeOutcome {
    /// Whether the document changed
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inserted => "inserted",
            Self::Replaced => "replaced",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Managed declaration kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// File header
    Header,
    /// `use` item
    Import,
    /// Entity type alias
    Alias,
    /// Service struct
    Holder,
    /// Service method
    Method,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Import => "import",
            Self::Alias => "alias",
            Self::Holder => "holder",
            Self::Method => "method",
        })
    }
}

/// Outcome of one merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    /// Kind of declaration
    pub kind: DeclarationKind,
    /// Name of the declaration
    pub name: String,
    /// What happened to it
    pub outcome: MergeOutcome,
}

/// Every merge outcome for one file, in merge order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    records: Vec<MergeRecord>,
}

impl MergeReport {
    /// Record an outcome
    pub fn push(&mut self, kind: DeclarationKind, name: impl Into<String>, outcome: MergeOutcome) {
        self.records.push(MergeRecord {
            kind,
            name: name.into(),
            outcome,
        });
    }

    /// Recorded outcomes
    #[must_use]
    pub fn records(&self) -> &[MergeRecord] {
        &self.records
    }

    /// Whether any merge changed the document
    #[must_use]
    pub fn modified(&self) -> bool {
        self.records.iter().any(|record| record.outcome.is_change())
    }

    /// Number of merges with the given outcome
    #[must_use]
    pub fn count(&self, outcome: MergeOutcome) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome == outcome)
            .count()
    }

    /// Outcome recorded for a declaration, if it was merged
    #[must_use]
    pub fn outcome(&self, kind: DeclarationKind, name: &str) -> Option<MergeOutcome> {
        self.records
            .iter()
            .find(|record| record.kind == kind && record.name == name)
            .map(|record| record.outcome)
    }
}

/// Applies generated declarations to a [`Document`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    overwrite: bool,
}

impl MergeEngine {
    /// Create an engine; `overwrite` replaces existing holders and methods
    #[must_use]
    pub const fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }

    /// Whether existing holders and methods are replaced
    #[must_use]
    pub const fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Run every pass in order: header, imports, alias, holder, methods
    ///
    /// # Errors
    ///
    /// Returns the first conflict or splice failure. The document may be
    /// partially merged afterwards and must not be written.
    pub fn merge_all(&self, document: &mut Document, service: &ServiceDeclarations) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        let outcome = self.merge_header(document, &service.header);
        report.push(DeclarationKind::Header, "header", outcome);

        for import in &service.imports {
            let outcome = self.merge_import(document, import);
            report.push(DeclarationKind::Import, &import.path, outcome);
        }

        let outcome = self.merge_alias(document, &service.alias);
        report.push(DeclarationKind::Alias, service.alias.ident.to_string(), outcome);

        let outcome = self.merge_holder(document, &service.holder)?;
        report.push(DeclarationKind::Holder, service.holder.ident.to_string(), outcome);

        for method in &service.methods {
            let outcome = self.merge_method(document, method)?;
            report.push(DeclarationKind::Method, method.name(), outcome);
        }

        Ok(report)
    }

    /// Install the header on a file without inner attributes
    pub fn merge_header(&self, document: &mut Document, header: &str) -> MergeOutcome {
        if document.set_header(header) {
            debug!(path = %document.origin().display(), overwrite = self.overwrite, "added file header");
            MergeOutcome::Inserted
        } else {
            MergeOutcome::Unchanged
        }
    }

    /// Append a `use` item unless the path is already bound
    pub fn merge_import(&self, document: &mut Document, import: &ImportDecl) -> MergeOutcome {
        if document.import_paths().contains(&import.path) {
            return MergeOutcome::Unchanged;
        }
        document.push_import(import.item.clone());
        debug!(import = %import.path, overwrite = self.overwrite, "added import");
        MergeOutcome::Inserted
    }

    /// Make sure exactly one correct entity alias exists
    ///
    /// Any other type named like the entity is discarded with a warning.
    /// Among several correct aliases the last one is kept.
    pub fn merge_alias(&self, document: &mut Document, alias: &ItemType) -> MergeOutcome {
        let name = alias.ident.to_string();
        let expected = alias.ty.to_token_stream().to_string();

        let slots = document.find_type_slot(&name);
        let keep = slots
            .iter()
            .rev()
            .copied()
            .find(|&index| matches_alias(document.decls()[index].item(), &expected));

        let discarded: Vec<usize> = slots.into_iter().filter(|&index| Some(index) != keep).collect();
        for &index in discarded.iter().rev() {
            let item = document.decls()[index].item();
            match (item, keep) {
                (Item::Type(found), None) => warn!(
                    alias = %name,
                    found = %found.ty.to_token_stream(),
                    expected = %expected,
                    "type alias points at the wrong model, replacing it"
                ),
                (Item::Type(_), Some(_)) => warn!(alias = %name, "duplicate type alias, keeping the last one"),
                (other, _) => warn!(
                    alias = %name,
                    found = item_kind(other),
                    "expected a type alias, replacing the declaration"
                ),
            }
            document.remove(index);
        }

        if keep.is_some() {
            if let Some(&index) = document.find_type_slot(&name).first() {
                document.assign(index, Slot::Alias);
            }
            return if discarded.is_empty() {
                MergeOutcome::Unchanged
            } else {
                MergeOutcome::Replaced
            };
        }

        document.set_alias(alias.clone());
        debug!(alias = %name, overwrite = self.overwrite, "added type alias");
        if discarded.is_empty() {
            MergeOutcome::Inserted
        } else {
            MergeOutcome::Replaced
        }
    }

    /// Make sure the service struct exists
    ///
    /// Every type named like the service counts. With overwrite on, a single
    /// namesake of another shape is replaced like a struct would be.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTypeConflict`] if the name is declared more
    /// than once, and [`Error::HolderShapeConflict`] if it names something
    /// other than a struct and overwrite is off.
    pub fn merge_holder(&self, document: &mut Document, holder: &ItemStruct) -> Result<MergeOutcome> {
        let name = holder.ident.to_string();
        let found = document.find_type_slot(&name);
        let outcome = match found.as_slice() {
            [] => MergeOutcome::Inserted,
            [index] => {
                let existing = document.decls().get(*index).map(Decl::item);
                let is_struct = matches!(existing, Some(Item::Struct(_)));
                let kind = existing.map_or("an item", item_kind);
                if !self.overwrite {
                    if !is_struct {
                        return Err(Error::HolderShapeConflict {
                            name,
                            found: kind.to_string(),
                        });
                    }
                    document.assign(*index, Slot::Holder);
                    return Ok(MergeOutcome::Unchanged);
                }
                if !is_struct {
                    warn!(holder = %name, found = kind, "expected a struct, replacing the declaration");
                }
                document.remove(*index);
                MergeOutcome::Replaced
            }
            _ => {
                return Err(Error::DuplicateTypeConflict {
                    name,
                    count: found.len(),
                })
            }
        };

        document.set_holder(holder.clone());
        debug!(holder = %name, %outcome, "merged service struct");
        Ok(outcome)
    }

    /// Make sure the method exists on its receiver
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMethodConflict`] if the receiver already
    /// defines the method more than once.
    pub fn merge_method(&self, document: &mut Document, method: &MethodDecl) -> Result<MergeOutcome> {
        let found = document.find_methods(method.receiver(), method.name());
        let outcome = match found.as_slice() {
            [] => MergeOutcome::Inserted,
            [_] if !self.overwrite => return Ok(MergeOutcome::Unchanged),
            [location] => {
                document.remove_method(*location)?;
                MergeOutcome::Replaced
            }
            _ => {
                return Err(Error::DuplicateMethodConflict {
                    receiver: method.receiver().to_string(),
                    method: method.name().to_string(),
                    count: found.len(),
                })
            }
        };

        document.append_method(method);
        debug!(receiver = method.receiver(), method = method.name(), %outcome, "merged method");
        Ok(outcome)
    }
}

fn matches_alias(item: &Item, expected: &str) -> bool {
    match item {
        Item::Type(found) => {
            found.generics.params.is_empty()
                && found.generics.where_clause.is_none()
                && found.ty.to_token_stream().to_string() == expected
        }
        _ => false,
    }
}

const fn item_kind(item: &Item) -> &'static str {
    match item {
        Item::Struct(_) => "a struct",
        Item::Enum(_) => "an enum",
        Item::Union(_) => "a union",
        Item::Type(_) => "a type alias",
        _ => "an item",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::CrudgenConfig;
    use crate::naming::NamingContext;
    use crate::render::TemplateRenderer;

    fn service(target: &str) -> ServiceDeclarations {
        let catalog = Catalog::builtin();
        let config = CrudgenConfig::default();
        let operations = catalog.resolve(&config.operations).unwrap();
        TemplateRenderer::new(&catalog)
            .unwrap()
            .render_service(&NamingContext::for_target(target), &config, &operations)
            .unwrap()
    }

    fn merge(source: &str, overwrite: bool) -> (Result<MergeReport>, Document) {
        let mut document = Document::parse("services/invoice.rs", source).unwrap();
        let report = MergeEngine::new(overwrite).merge_all(&mut document, &service("Invoice"));
        (report, document)
    }

    #[test]
    fn test_fresh_file_gets_everything() {
        let (report, document) = merge("//! Service layer.\n", false);
        let report = report.unwrap();

        assert!(report.modified());
        assert_eq!(report.outcome(DeclarationKind::Header, "header"), Some(MergeOutcome::Unchanged));
        assert_eq!(report.count(MergeOutcome::Inserted), 3 + 1 + 1 + 6);

        let rendered = document.serialize().unwrap();
        assert!(rendered.starts_with(
            "//! Service layer.\n\nuse crate::dal;\nuse crate::dal::field;\nuse crate::models;\n\npub struct InvoiceService;\n\npub type Invoice = models::Invoice;\n\nimpl InvoiceService {\n"
        ));
        assert_eq!(document.find_methods("InvoiceService", "count").len(), 1);
    }

    #[test]
    fn test_second_merge_is_a_no_op() {
        let (report, document) = merge("", false);
        assert!(report.unwrap().modified());
        let first = document.serialize().unwrap();

        let (report, document) = merge(&first, false);
        let report = report.unwrap();
        assert!(!report.modified(), "{report:?}");
        assert_eq!(document.serialize().unwrap(), first);
    }

    #[test]
    fn test_grouped_imports_are_recognized() {
        let (report, _) = merge("use crate::{dal::{self, field}, models};\n", false);
        let report = report.unwrap();
        assert_eq!(report.outcome(DeclarationKind::Import, "crate::dal"), Some(MergeOutcome::Unchanged));
        assert_eq!(report.outcome(DeclarationKind::Import, "crate::dal::field"), Some(MergeOutcome::Unchanged));
        assert_eq!(report.outcome(DeclarationKind::Import, "crate::models"), Some(MergeOutcome::Unchanged));
    }

    #[test]
    fn test_wrong_alias_is_replaced_without_overwrite() {
        let (report, document) = merge("use crate::models;\n\npub type Invoice = legacy::Invoice;\n", false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Alias, "Invoice"),
            Some(MergeOutcome::Replaced)
        );
        let rendered = document.serialize().unwrap();
        assert!(rendered.contains("pub type Invoice = models::Invoice;"));
        assert!(!rendered.contains("legacy"));
    }

    #[test]
    fn test_struct_in_alias_slot_is_replaced() {
        let (report, document) = merge("pub struct Invoice {\n    id: u64,\n}\n", false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Alias, "Invoice"),
            Some(MergeOutcome::Replaced)
        );
        assert_eq!(document.find_type_slot("Invoice").len(), 1);
        assert!(document.find_structs("Invoice").is_empty());
    }

    #[test]
    fn test_last_correct_alias_wins() {
        let source = "// first\npub type Invoice = models::Invoice;\n\n// second\ntype Invoice = models::Invoice;\n";
        let (report, document) = merge(source, false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Alias, "Invoice"),
            Some(MergeOutcome::Replaced)
        );
        let rendered = document.serialize().unwrap();
        assert!(!rendered.contains("// first"));
        assert!(rendered.contains("// second\ntype Invoice = models::Invoice;"));
    }

    #[test]
    fn test_correct_alias_is_left_alone() {
        let (report, _) = merge("/// Entity\npub(crate) type Invoice = models::Invoice;\n", false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Alias, "Invoice"),
            Some(MergeOutcome::Unchanged)
        );
    }

    #[test]
    fn test_holder_respects_overwrite() {
        let source = "#[derive(Debug)]\npub struct InvoiceService;\n";

        let (report, document) = merge(source, false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Holder, "InvoiceService"),
            Some(MergeOutcome::Unchanged)
        );
        assert!(document.serialize().unwrap().contains("#[derive(Debug)]"));

        let (report, document) = merge(source, true);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Holder, "InvoiceService"),
            Some(MergeOutcome::Replaced)
        );
        assert!(!document.serialize().unwrap().contains("#[derive(Debug)]"));
    }

    #[test]
    fn test_duplicate_holder_conflicts() {
        let source = "pub struct InvoiceService;\nmod inner {}\npub struct InvoiceService;\n";
        let (report, _) = merge(source, false);
        assert!(matches!(
            report.unwrap_err(),
            Error::DuplicateTypeConflict { ref name, count: 2 } if name == "InvoiceService"
        ));
    }

    #[test]
    fn test_existing_method_kept_by_default() {
        let source = "impl InvoiceService {\n    // hand tuned\n    pub fn count(&self) -> Result<i64, dal::Error> {\n        Ok(0)\n    }\n}\n";
        let (report, document) = merge(source, false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Method, "count"),
            Some(MergeOutcome::Unchanged)
        );
        let rendered = document.serialize().unwrap();
        assert!(rendered.contains("// hand tuned"));
        assert!(rendered.contains("Ok(0)"));
    }

    #[test]
    fn test_existing_method_replaced_with_overwrite() {
        let source = "impl InvoiceService {\n    // hand tuned\n    pub fn count(&self) -> Result<i64, dal::Error> {\n        Ok(0)\n    }\n\n    pub fn extra(&self) {}\n}\n";
        let (report, document) = merge(source, true);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Method, "count"),
            Some(MergeOutcome::Replaced)
        );
        let rendered = document.serialize().unwrap();
        assert!(!rendered.contains("hand tuned"));
        assert!(rendered.contains("pub fn extra(&self) {}"));
        assert_eq!(document.find_methods("InvoiceService", "count").len(), 1);
    }

    #[test]
    fn test_duplicate_method_conflicts() {
        let source = "impl InvoiceService {\n    pub fn create(&self) {}\n}\n\nimpl InvoiceService {\n    pub fn create(&self) {}\n}\n";
        let (report, _) = merge(source, false);
        let err = report.unwrap_err();
        assert!(matches!(err, Error::DuplicateMethodConflict { count: 2, .. }));
        assert_eq!(
            err.to_string(),
            "`create` method redeclared for struct `InvoiceService` (2 definitions)"
        );
    }

    #[test]
    fn test_methods_of_other_receivers_do_not_match() {
        let source = "struct Other;\nimpl Other {\n    pub fn create(&self) {}\n}\n";
        let (report, _) = merge(source, false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Method, "create"),
            Some(MergeOutcome::Inserted)
        );
    }

    #[test]
    fn test_same_line_comment_survives_alias_repair() {
        let source = "use crate::models; // keep: models re-export\npub type Invoice = legacy::Invoice;\n";
        let (report, document) = merge(source, false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Alias, "Invoice"),
            Some(MergeOutcome::Replaced)
        );
        let rendered = document.serialize().unwrap();
        assert!(rendered.contains("use crate::models; // keep: models re-export\n"), "{rendered}");
        assert!(!rendered.contains("legacy"));
    }

    #[test]
    fn test_same_line_comment_stays_with_its_import() {
        let (report, document) = merge("use crate::dal; // dal\n\nfn helper() {}\n", false);
        report.unwrap();
        let rendered = document.serialize().unwrap();
        assert!(
            rendered.contains("use crate::dal; // dal\nuse crate::dal::field;\nuse crate::models;\n"),
            "{rendered}"
        );
        assert!(rendered.contains("pub type Invoice = models::Invoice;\n\nfn helper() {}\n"));
        assert_eq!(rendered.matches("// dal").count(), 1);
    }

    #[test]
    fn test_output_follows_canonical_order() {
        let (report, document) = merge("//! S.\n\nfn helper() {}\n\nuse crate::dal;\n", false);
        report.unwrap();
        let rendered = document.serialize().unwrap();
        assert!(rendered.starts_with(
            "//! S.\n\nuse crate::dal;\nuse crate::dal::field;\nuse crate::models;\n\npub struct InvoiceService;\n\npub type Invoice = models::Invoice;\n\nfn helper() {}\n\nimpl InvoiceService {\n"
        ), "{rendered}");

        let (report, document) = merge(&rendered, false);
        assert!(!report.unwrap().modified());
        assert_eq!(document.serialize().unwrap(), rendered);
    }

    #[test]
    fn test_existing_holder_moves_above_alias() {
        let source = "//! S.\n\nfn helper() {}\n\n// service\npub struct InvoiceService;\n";
        let (report, document) = merge(source, false);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Holder, "InvoiceService"),
            Some(MergeOutcome::Unchanged)
        );
        let rendered = document.serialize().unwrap();
        assert!(rendered.contains(
            "use crate::models;\n\n// service\npub struct InvoiceService;\n\npub type Invoice = models::Invoice;\n\nfn helper() {}"
        ), "{rendered}");
    }

    #[test]
    fn test_non_struct_holder_namesake() {
        let source = "//! S.\n\npub type InvoiceService = crate::legacy::Service;\n";

        let (report, _) = merge(source, false);
        let err = report.unwrap_err();
        assert!(matches!(err, Error::HolderShapeConflict { ref name, .. } if name == "InvoiceService"));
        assert_eq!(err.to_string(), "`InvoiceService` is declared as a type alias, expected a struct");

        let (report, document) = merge(source, true);
        assert_eq!(
            report.unwrap().outcome(DeclarationKind::Holder, "InvoiceService"),
            Some(MergeOutcome::Replaced)
        );
        assert_eq!(document.find_type_slot("InvoiceService").len(), 1);
        assert_eq!(document.find_structs("InvoiceService").len(), 1);
        assert!(!document.serialize().unwrap().contains("legacy"));
    }

    #[test]
    fn test_enum_and_struct_namesakes_conflict() {
        let source = "pub enum InvoiceService {}\npub struct InvoiceService;\n";
        let (report, _) = merge(source, true);
        assert!(matches!(
            report.unwrap_err(),
            Error::DuplicateTypeConflict { count: 2, .. }
        ));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(MergeOutcome::Inserted.to_string(), "inserted");
        assert_eq!(DeclarationKind::Holder.to_string(), "holder");
        assert!(!MergeOutcome::Unchanged.is_change());
    }
}
