//! Integration tests for service synthesis

use crudgen::prelude::*;
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_service(project: &Path, target: &str, source: &str) {
    let services = project.join("services");
    fs::create_dir_all(&services).unwrap();
    fs::write(services.join(format!("{}.rs", target.to_lowercase())), source).unwrap();
}

fn read_service(project: &Path, target: &str) -> String {
    fs::read_to_string(project.join("services").join(format!("{}.rs", target.to_lowercase()))).unwrap()
}

fn synthesizer(project: &Path) -> ServiceSynthesizer {
    ServiceSynthesizer::new(project, CrudgenConfig::default()).unwrap()
}

const OVERWRITE: SynthesisOptions = SynthesisOptions {
    overwrite: true,
    dry_run: false,
};

/// A fresh `Invoice` service has every managed declaration
#[test]
fn test_fresh_invoice_service() {
    let project = TempDir::new().unwrap();
    let synthesis = synthesizer(project.path())
        .synthesize("Invoice", SynthesisOptions::default())
        .unwrap();
    assert!(synthesis.created);
    assert!(synthesis.modified);

    let source = read_service(project.path(), "Invoice");
    assert!(source.starts_with("//! Service layer.\n"));
    for import in ["use crate::dal;", "use crate::dal::field;", "use crate::models;"] {
        assert!(source.contains(import), "missing `{import}`");
    }
    assert!(source.contains("pub type Invoice = models::Invoice;"));
    assert!(source.contains("pub struct InvoiceService;"));

    let document = Document::parse("invoice.rs", &source).unwrap();
    for method in ["create", "get_all", "get_by_id", "update", "delete", "count"] {
        assert_eq!(
            document.find_methods("InvoiceService", method).len(),
            1,
            "expected exactly one `{method}`"
        );
    }
    assert!(source.contains("let invoices = dal::query::<Invoice>()"));
}

/// Running twice changes the file once
#[test]
fn test_idempotence() {
    let project = TempDir::new().unwrap();
    let synthesizer = synthesizer(project.path());

    let first = synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();
    let after_first = read_service(project.path(), "Invoice");
    let second = synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();

    assert!(first.modified);
    assert!(!second.modified);
    assert_eq!(read_service(project.path(), "Invoice"), after_first);
}

/// Hand-written code survives byte for byte
#[test]
fn test_unrelated_items_are_preserved() {
    let project = TempDir::new().unwrap();
    let helper = "\n\n// Rounds to whole cents.\n/// Used by the invoice views.\nfn round(value: f64) -> f64 {\n    // keep this\n    (value * 100.0).round() / 100.0\n}";
    let custom = "\n\nimpl InvoiceService {\n    /* block comment */\n    pub fn overdue(&self) -> bool {\n        false // never\n    }\n}";
    let original = format!("//! Invoices.\n\nuse crate::dal;{helper}{custom}\n");
    write_service(project.path(), "Invoice", &original);

    synthesizer(project.path())
        .synthesize("Invoice", SynthesisOptions::default())
        .unwrap();

    let source = read_service(project.path(), "Invoice");
    assert!(source.starts_with("//! Invoices.\n\nuse crate::dal;\n"));
    assert!(source.contains(helper));
    assert!(source.contains(custom));
}

/// Default mode keeps a customized method, overwrite mode replaces it
#[test]
fn test_overwrite_replaces_default_preserves() {
    let project = TempDir::new().unwrap();
    let customized = "impl InvoiceService {\n    // tuned by hand\n    pub fn count(&self) -> Result<i64, dal::Error> {\n        Ok(42)\n    }\n}\n";
    write_service(project.path(), "Invoice", customized);
    let synthesizer = synthesizer(project.path());

    let synthesis = synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();
    assert_eq!(
        synthesis.report.outcome(DeclarationKind::Method, "count"),
        Some(MergeOutcome::Unchanged)
    );
    assert!(read_service(project.path(), "Invoice").contains("Ok(42)"));

    let synthesis = synthesizer.synthesize("Invoice", OVERWRITE).unwrap();
    assert_eq!(
        synthesis.report.outcome(DeclarationKind::Method, "count"),
        Some(MergeOutcome::Replaced)
    );
    let source = read_service(project.path(), "Invoice");
    assert!(!source.contains("Ok(42)"));
    assert!(!source.contains("tuned by hand"));
    assert!(source.contains("dal::query::<Invoice>().count()"));
    let document = Document::parse("invoice.rs", &source).unwrap();
    assert_eq!(document.find_methods("InvoiceService", "count").len(), 1);
}

/// A duplicated method aborts the target and leaves the file alone
#[test]
fn test_duplicate_method_leaves_file_untouched() {
    let project = TempDir::new().unwrap();
    let original = "impl InvoiceService {\n    pub fn create(&self) {}\n}\n\nimpl InvoiceService {\n    pub fn create(&self) {}\n}\n";
    write_service(project.path(), "Invoice", original);

    let err = synthesizer(project.path())
        .synthesize("Invoice", SynthesisOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DuplicateMethodConflict { ref receiver, ref method, count: 2 }
            if receiver == "InvoiceService" && method == "create"
    ));
    assert_eq!(read_service(project.path(), "Invoice"), original);
}

/// A wrong alias is corrected even without overwrite
#[test]
fn test_alias_correction() {
    let project = TempDir::new().unwrap();
    write_service(
        project.path(),
        "Invoice",
        "//! Service layer.\n\npub type Invoice = billing::Invoice;\n",
    );

    let synthesis = synthesizer(project.path())
        .synthesize("Invoice", SynthesisOptions::default())
        .unwrap();

    assert_eq!(
        synthesis.report.outcome(DeclarationKind::Alias, "Invoice"),
        Some(MergeOutcome::Replaced)
    );
    let source = read_service(project.path(), "Invoice");
    assert!(source.contains("pub type Invoice = models::Invoice;"));
    assert!(!source.contains("billing"));
}

/// Comments on an item's last line stay with that item
#[test]
fn test_same_line_comments_survive() {
    let project = TempDir::new().unwrap();
    write_service(
        project.path(),
        "Invoice",
        "//! Service layer.\n\nuse crate::models; // re-exported for views\npub type Invoice = legacy::Invoice;\n\nfn helper() {} // tiny\n",
    );
    let synthesizer = synthesizer(project.path());
    synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();

    let source = read_service(project.path(), "Invoice");
    assert!(source.contains("use crate::models; // re-exported for views\n"), "{source}");
    assert!(source.contains("fn helper() {} // tiny\n"), "{source}");
    assert!(!source.contains("legacy"));

    let again = synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();
    assert!(!again.modified);
    assert_eq!(read_service(project.path(), "Invoice"), source);
}

/// A CRLF file with a byte order mark keeps both
#[test]
fn test_crlf_and_bom_are_kept() {
    let project = TempDir::new().unwrap();
    write_service(
        project.path(),
        "Invoice",
        "\u{feff}//! Service layer.\r\n\r\nfn helper() {} // kept\r\n",
    );
    let synthesizer = synthesizer(project.path());
    let first = synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();
    assert!(first.modified);

    let source = read_service(project.path(), "Invoice");
    assert!(source.starts_with("\u{feff}//! Service layer.\r\n\r\nuse crate::dal;\r\n"));
    assert!(source.contains("fn helper() {} // kept\r\n"));
    assert!(!source.replace("\r\n", "").contains('\n'));

    let second = synthesizer.synthesize("Invoice", SynthesisOptions::default()).unwrap();
    assert!(!second.modified);
    assert_eq!(read_service(project.path(), "Invoice"), source);
}

/// An alias squatting on the service name is reported, not duplicated
#[test]
fn test_holder_namesake_is_not_duplicated() {
    let project = TempDir::new().unwrap();
    let original = "//! Service layer.\n\npub type InvoiceService = crate::legacy::Service;\n";
    write_service(project.path(), "Invoice", original);

    let err = synthesizer(project.path())
        .synthesize("Invoice", SynthesisOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::HolderShapeConflict { .. }));
    assert_eq!(read_service(project.path(), "Invoice"), original);
}

/// Three targets, one stale: the hook runs once
#[test]
fn test_batch_aggregation() {
    struct Recorder<'a>(&'a mut Vec<String>);

    impl PostHook for Recorder<'_> {
        fn run(&mut self, project: &Path) -> crudgen::Result<()> {
            self.0.push(project.display().to_string());
            Ok(())
        }

        fn describe(&self) -> String {
            "recorder".to_string()
        }
    }

    let project = TempDir::new().unwrap();
    let synthesizer = synthesizer(project.path());
    let targets: Vec<String> = ["Customer", "Invoice", "Tag"].map(String::from).to_vec();
    for target in ["Customer", "Tag"] {
        synthesizer.synthesize(target, SynthesisOptions::default()).unwrap();
    }

    let mut calls = Vec::new();
    let report = BatchDriver::new(&synthesizer, SynthesisOptions::default())
        .with_hook(Recorder(&mut calls))
        .run(&targets)
        .unwrap();

    assert!(report.modified);
    assert!(report.hook_ran);
    assert_eq!(report.modified_count(), 1);
    assert_eq!(report.unchanged_count(), 2);
    assert_eq!(calls.len(), 1);

    let mut calls = Vec::new();
    let report = BatchDriver::new(&synthesizer, SynthesisOptions::default())
        .with_hook(Recorder(&mut calls))
        .run(&targets)
        .unwrap();

    assert!(!report.modified);
    assert!(!report.hook_ran);
    assert!(calls.is_empty());
}

/// Targets discovered from the models directory drive the batch
#[test]
fn test_discovery_feeds_batch() {
    let project = TempDir::new().unwrap();
    let models = project.path().join("models");
    fs::create_dir_all(&models).unwrap();
    fs::write(models.join("invoice.rs"), "pub struct Invoice {\n    pub id: u64,\n}\n").unwrap();
    fs::write(models.join("tag.rs"), "pub struct Tag {\n    pub label: String,\n}\n").unwrap();

    let config = CrudgenConfig::default();
    let targets = discover_targets(&config.models_path(project.path())).unwrap();
    let synthesizer = ServiceSynthesizer::new(project.path(), config).unwrap();
    let report = BatchDriver::new(&synthesizer, SynthesisOptions::default())
        .run(&targets)
        .unwrap();

    assert_eq!(report.modified_count(), 2);
    assert!(project.path().join("services/invoice.rs").exists());
    assert!(project.path().join("services/tag.rs").exists());
}

fn operation_subset() -> impl Strategy<Value = Vec<String>> {
    let names: Vec<&'static str> = Catalog::builtin().names().collect();
    proptest::sample::subsequence(names.clone(), 0..=names.len())
        .prop_map(|subset| subset.into_iter().map(String::from).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Any set of operations, starting from an existing partial file, converges in one run
    #[test]
    fn prop_synthesis_converges(operations in operation_subset(), overwrite in any::<bool>()) {
        let project = TempDir::new().unwrap();
        write_service(
            project.path(),
            "Order",
            "// orders\nuse crate::dal;\n\nimpl OrderService {\n    pub fn count(&self) -> Result<i64, dal::Error> {\n        Ok(1)\n    }\n}\n",
        );
        let config = CrudgenConfig {
            operations,
            ..CrudgenConfig::default()
        };
        let synthesizer = ServiceSynthesizer::new(project.path(), config).unwrap();

        synthesizer.synthesize("Order", SynthesisOptions::default()).unwrap();
        let first = read_service(project.path(), "Order");
        let again = synthesizer.synthesize("Order", SynthesisOptions { overwrite, dry_run: true }).unwrap();

        prop_assert!(overwrite || !again.modified);
        prop_assert_eq!(again.original, first);
        let document = Document::parse("order.rs", &again.rendered).unwrap();
        prop_assert_eq!(document.find_structs("OrderService").len(), 1);
    }
}
