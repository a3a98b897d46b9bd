//! Integration tests for patch files: parsing, validation and application

use brace_patcher::config::{
    apply_patches, check_patches, discover_patch_files, load_from_path, load_from_str,
    ApplicationError, ConfigError, HeaderStyle, OperationSpec, ValidationIssue,
};
use brace_patcher::{OperationOutcome, RunMode, SessionStatus};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ADMIN_JS: &str = "const API_BASE = '/api';\n\nasync function loadOrdersAdmin(){\
    \n  return JSON.parse(localStorage.getItem('orders') || '[]');\n}\n\
    \nfunction showSection(id) {\n  if (id === 'orders') {\n    loadOrdersAdmin();\n  }\n}\n";

const CHECKOUT_JS: &str = "let orderNumber = '';\nfunction placeOrder() {\
    \n  orderNumber = Date.now();\n}\n";

const PATCH_SET: &str = r#"
[meta]
name = "server-orders"
description = "Move order storage from localStorage to the API"
workspace_relative = true

[[patches]]
id = "load-orders"
file = "frontend/admin.js"

[patches.operation]
type = "replace-block"
name = "loadOrdersAdmin"
style = "async-function"
body = """
  const res = await fetch(`${API_BASE}/orders`);
  return res.json();"""

[[patches]]
id = "place-order"
file = "frontend/checkout.js"

[patches.operation]
type = "replace-block"
name = "placeOrder"
headers = ["function placeOrder(){", "function placeOrder() {"]
body = "  orderNumber = await submitOrder();"

[[patches]]
id = "admin-token"
file = "frontend/admin.js"

[patches.operation]
type = "inject-after"
anchor = "const API_BASE = '/api';"
text = "\nconst ADMIN_TOKEN = '';"
unless_present = "ADMIN_TOKEN"

[[patches]]
id = "order-id"
file = "frontend/checkout.js"

[patches.operation]
type = "substitute"
pattern = "let orderNumber = '';"
replacement = "let orderNumber = ''; let orderId = '';"
literal = true
"#;

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let frontend = dir.path().join("frontend");
    fs::create_dir(&frontend).unwrap();
    fs::write(frontend.join("admin.js"), ADMIN_JS).unwrap();
    fs::write(frontend.join("checkout.js"), CHECKOUT_JS).unwrap();
    dir
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[test]
fn test_parse_patch_set() {
    let config = load_from_str(PATCH_SET).unwrap();

    assert_eq!(config.meta.name, "server-orders");
    assert!(config.meta.workspace_relative);
    assert_eq!(config.patches.len(), 4);

    match &config.patches[0].operation {
        OperationSpec::ReplaceBlock {
            name,
            style,
            required,
            body,
            ..
        } => {
            assert_eq!(name, "loadOrdersAdmin");
            assert_eq!(*style, Some(HeaderStyle::AsyncFunction));
            assert!(*required);
            assert!(body.starts_with("  const res"));
        }
        other => panic!("unexpected operation: {other:?}"),
    }
    match &config.patches[3].operation {
        OperationSpec::Substitute {
            literal, expand, ..
        } => {
            assert!(*literal);
            assert_eq!(*expand, None);
        }
        other => panic!("unexpected operation: {other:?}"),
    }
}

#[test]
fn test_apply_groups_sessions_by_file() {
    let dir = setup_workspace();
    let config = load_from_str(PATCH_SET).unwrap();

    let results = apply_patches(&config, dir.path(), RunMode::Commit);
    assert_eq!(results.len(), 2);
    assert!(results[0].0.ends_with("frontend/admin.js"));
    assert!(results[1].0.ends_with("frontend/checkout.js"));

    for (_, result) in &results {
        let report = result.as_ref().unwrap();
        assert_eq!(report.status, SessionStatus::Committed);
        assert_eq!(report.operations.len(), 2);
    }

    let admin = read(dir.path(), "frontend/admin.js");
    assert!(admin.starts_with("const API_BASE = '/api';\nconst ADMIN_TOKEN = '';\n"));
    assert!(admin.contains(
        "async function loadOrdersAdmin(){\n  const res = await fetch(`${API_BASE}/orders`);\
            \n  return res.json();\n}\n"
    ));

    let checkout = read(dir.path(), "frontend/checkout.js");
    assert_eq!(
        checkout,
        "let orderNumber = ''; let orderId = '';\nfunction placeOrder() {\
            \n  orderNumber = await submitOrder();\n}\n"
    );
}

#[test]
fn test_fatal_in_one_file_does_not_block_another() {
    let dir = setup_workspace();
    fs::write(dir.path().join("frontend/checkout.js"), "// rewritten elsewhere\n").unwrap();
    let config = load_from_str(PATCH_SET).unwrap();

    let results = apply_patches(&config, dir.path(), RunMode::Commit);

    let admin = results[0].1.as_ref().unwrap();
    assert_eq!(admin.status, SessionStatus::Committed);

    let checkout = results[1].1.as_ref().unwrap();
    assert!(checkout.status.is_aborted());
    assert!(checkout.operations[0].outcome.is_fatal());
    assert_eq!(checkout.operations[1].outcome, OperationOutcome::Skipped);
    assert_eq!(read(dir.path(), "frontend/checkout.js"), "// rewritten elsewhere\n");
}

#[test]
fn test_check_reports_without_writing() {
    let dir = setup_workspace();
    let config = load_from_str(PATCH_SET).unwrap();

    let results = check_patches(&config, dir.path());
    for (_, result) in &results {
        assert_eq!(result.as_ref().unwrap().status, SessionStatus::WouldCommit);
    }
    assert_eq!(read(dir.path(), "frontend/admin.js"), ADMIN_JS);
    assert_eq!(read(dir.path(), "frontend/checkout.js"), CHECKOUT_JS);
}

#[test]
fn test_second_apply_is_unchanged() {
    let dir = setup_workspace();
    let config = load_from_str(
        r#"
[meta]
workspace_relative = true

[[patches]]
id = "load-orders"
file = "frontend/admin.js"

[patches.operation]
type = "replace-block"
name = "loadOrdersAdmin"
style = "async-function"
body = "  return [];"

[[patches]]
id = "footer"
file = "frontend/admin.js"

[patches.operation]
type = "append-if-absent"
text = "\nwindow.adminReady = true;\n"
"#,
    )
    .unwrap();

    let first = apply_patches(&config, dir.path(), RunMode::Commit);
    assert_eq!(first[0].1.as_ref().unwrap().status, SessionStatus::Committed);

    let second = apply_patches(&config, dir.path(), RunMode::Commit);
    let report = second[0].1.as_ref().unwrap();
    assert_eq!(report.status, SessionStatus::Unchanged);
    assert_eq!(
        report.operations[1].outcome,
        OperationOutcome::NoOpAlreadyPresent
    );
}

#[test]
fn test_optional_block_is_noop() {
    let dir = setup_workspace();
    let config = load_from_str(
        r#"
[meta]
workspace_relative = true

[[patches]]
id = "legacy-export"
file = "frontend/admin.js"

[patches.operation]
type = "replace-block"
name = "exportOrdersCsv"
style = "function"
body = "  return '';"
required = false
"#,
    )
    .unwrap();

    let results = apply_patches(&config, dir.path(), RunMode::Commit);
    let report = results[0].1.as_ref().unwrap();
    assert_eq!(report.status, SessionStatus::Unchanged);
    assert_eq!(
        report.operations[0].outcome,
        OperationOutcome::NoOpHeaderAbsent
    );
}

#[test]
fn test_path_escape_rejected() {
    let dir = setup_workspace();
    let config = load_from_str(
        r#"
[meta]
workspace_relative = true

[[patches]]
id = "escape"
file = "../outside.js"

[patches.operation]
type = "append-if-absent"
text = "x"
"#,
    )
    .unwrap();

    let results = apply_patches(&config, dir.path(), RunMode::Commit);
    assert!(matches!(
        results[0].1,
        Err(ApplicationError::Safety { .. })
    ));
}

#[test]
fn test_validation_collects_every_issue() {
    let err = load_from_str(
        r#"
[[patches]]
id = "a"
file = "admin.js"

[patches.operation]
type = "replace-block"
name = "load"
body = "x"

[[patches]]
id = "a"
file = ""

[patches.operation]
type = "substitute"
pattern = "(unclosed"
replacement = "y"
"#,
    )
    .unwrap_err();

    let ConfigError::Validation { source, .. } = err else {
        panic!("expected validation error");
    };
    assert_eq!(source.issues.len(), 4);
    assert!(source.issues.iter().any(|i| matches!(
        i,
        ValidationIssue::MissingField {
            field: "operation.headers",
            ..
        }
    )));
    assert!(source.issues.iter().any(|i| matches!(
        i,
        ValidationIssue::MissingField { field: "file", .. }
    )));
    let rendered = source.to_string();
    assert!(rendered.contains("duplicate patch id"));
    assert!(rendered.contains("invalid pattern"));
}

#[test]
fn test_header_must_end_with_brace() {
    let err = load_from_str(
        r#"
[[patches]]
id = "bad-header"
file = "admin.js"

[patches.operation]
type = "replace-block"
name = "load"
headers = ["async function load()"]
body = "x"
"#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("opening brace"));
}

#[test]
fn test_headers_and_style_are_exclusive() {
    let err = load_from_str(
        r#"
[[patches]]
id = "both"
file = "admin.js"

[patches.operation]
type = "replace-block"
name = "load"
headers = ["function load(){"]
style = "function"
body = "x"
"#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("either headers or style"));
}

#[test]
fn test_unknown_operation_type_is_toml_error() {
    let err = load_from_str(
        r#"
[[patches]]
id = "x"
file = "admin.js"

[patches.operation]
type = "rename-everything"
"#,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::Toml { .. }));
}

#[test]
fn test_load_from_path_and_discovery() {
    let dir = TempDir::new().unwrap();
    let patches = dir.path().join("patches");
    fs::create_dir(&patches).unwrap();
    fs::write(patches.join("20-checkout.toml"), PATCH_SET).unwrap();
    fs::write(patches.join("10-admin.toml"), PATCH_SET).unwrap();
    fs::write(patches.join("README.md"), "not a patch").unwrap();

    let files = discover_patch_files(&patches).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("10-admin.toml"));
    assert!(files[1].ends_with("20-checkout.toml"));

    let config = load_from_path(&files[0]).unwrap();
    assert_eq!(config.patches.len(), 4);

    let missing = load_from_path(patches.join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}
