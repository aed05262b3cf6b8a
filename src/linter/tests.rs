#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Unit tests for the convention and handler-sync linter

use crate::config::{GeneratorConfig, Layout};
use crate::generator::{run_pipeline, GenerationScope, GeneratorKind, PipelineOptions};
use crate::linter::*;
use crate::spec::{load_specs, AllSpecs};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MODELS: &str = r#"
models:
  User:
    fields:
      id: {type: int, readonly: true}
      name: string
    variants:
      Create: {}
"#;

const USERS: &str = r#"
operations:
  create_user:
    input: UserCreate
    output: User
    rest: {method: POST, path: ""}
  get_user:
    output: User
    params:
      - {name: user_id, type: int}
    rest: {method: GET, path: "/{user_id}"}
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A repository with one domain, its specs loaded.
fn repo(users: &str) -> (TempDir, Layout, AllSpecs) {
    let dir = tempfile::tempdir().expect("create temp dir");
    write(dir.path(), "shared/spec/models.yaml", MODELS);
    write(dir.path(), "services/backend/spec/users.yaml", users);
    let layout = Layout::new(dir.path(), GeneratorConfig::default());
    let specs = load_specs(&layout).expect("valid specs");
    (dir, layout, specs)
}

fn generate_handlers(specs: &AllSpecs, layout: &Layout) {
    let options = PipelineOptions {
        scope: GenerationScope::only(&[GeneratorKind::Handlers]),
        ..PipelineOptions::default()
    };
    run_pipeline(specs, layout, &options).expect("generate handlers");
}

fn kinds(issues: &[LintIssue]) -> Vec<&str> {
    issues.iter().map(|i| i.kind.as_str()).collect()
}

#[test]
fn test_is_snake_case() {
    assert!(is_snake_case("create_user"));
    assert!(is_snake_case("tg_bot2"));
    assert!(!is_snake_case("createUser"));
    assert!(!is_snake_case("Create"));
    assert!(!is_snake_case("with-dash"));
    assert!(!is_snake_case(""));
}

#[test]
fn test_is_camel_case() {
    assert!(is_camel_case("User"));
    assert!(is_camel_case("UserProfile2"));
    assert!(!is_camel_case("user"));
    assert!(!is_camel_case("User_Profile"));
}

#[test]
fn test_lint_operation_name_casing() {
    let users = r#"
operations:
  getUser:
    output: User
    rest: {method: GET, path: ""}
"#;
    let (_dir, _layout, specs) = repo(users);
    let issues = lint_conventions(&specs);
    assert_eq!(kinds(&issues), vec!["operation_name_casing"]);
    assert_eq!(issues[0].severity, LintSeverity::Error);
    assert_eq!(issues[0].location, "backend/users:getUser");
    assert_eq!(issues[0].suggestion.as_deref(), Some("Use 'get_user'"));
}

#[test]
fn test_lint_clean_conventions() {
    let (_dir, _layout, specs) = repo(USERS);
    assert!(lint_conventions(&specs).is_empty());
}

#[test]
fn test_lint_missing_handler_file() {
    let (_dir, layout, specs) = repo(USERS);
    let issues = lint_handlers(&specs, &layout).unwrap();
    assert_eq!(kinds(&issues), vec!["missing_handler_file"]);
    assert_eq!(issues[0].severity, LintSeverity::Warning);
    assert_eq!(issues[0].location, "services/backend/src/handlers/users.rs");
}

#[test]
fn test_generated_handler_is_in_sync() {
    let (_dir, layout, specs) = repo(USERS);
    generate_handlers(&specs, &layout);
    let issues = lint_all(&specs, &layout).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
    assert!(!has_errors(&issues));
}

#[test]
fn test_lint_detects_missing_and_stale_methods() {
    let (dir, layout, specs) = repo(USERS);
    generate_handlers(&specs, &layout);

    // The domain gains an operation and loses one after the stub was written.
    let changed = r#"
operations:
  get_user:
    output: User
    params:
      - {name: user_id, type: int}
    rest: {method: GET, path: "/{user_id}"}
  delete_user:
    params:
      - {name: user_id, type: int}
    rest: {method: DELETE, path: "/{user_id}"}
"#;
    write(dir.path(), "services/backend/spec/users.yaml", changed);
    let specs = load_specs(&layout).unwrap();

    let issues = lint_handlers(&specs, &layout).unwrap();
    assert_eq!(
        kinds(&issues),
        vec!["missing_handler_method", "stale_handler_method"]
    );
    assert!(has_errors(&issues));
    assert_eq!(
        issues[0].suggestion.as_deref(),
        Some("async fn delete_user(&self, user_id: i64) -> Result<(), HandlerError>")
    );
    assert!(issues[1].message.contains("'create_user'"));
}

#[test]
fn test_fix_handlers_inserts_stubs() {
    let (dir, layout, specs) = repo(USERS);
    generate_handlers(&specs, &layout);

    let grown = format!(
        "{USERS}  delete_user:\n    params:\n      - {{name: user_id, type: int}}\n    rest: {{method: DELETE, path: \"/{{user_id}}\"}}\n"
    );
    write(dir.path(), "services/backend/spec/users.yaml", &grown);
    let specs = load_specs(&layout).unwrap();

    let changed = fix_handlers(&specs, &layout).unwrap();
    assert_eq!(changed.len(), 1);
    let source = fs::read_to_string(&changed[0]).unwrap();
    assert!(source.contains("Err(HandlerError::not_implemented(\"delete_user\"))"));
    assert!(source.trim_end().ends_with("}\n}"));
    assert_eq!(implemented_methods(&source).len(), 3);

    let issues = lint_handlers(&specs, &layout).unwrap();
    assert!(issues.is_empty(), "{issues:?}");

    // Nothing left to fix.
    assert!(fix_handlers(&specs, &layout).unwrap().is_empty());
}

#[test]
fn test_insert_into_impl() {
    let source = "impl FooContract for FooHandler {\n}\n";
    let stub = "    async fn a(&self) {}\n".to_string();
    let out = insert_into_impl(source, "FooContract", "FooHandler", &[stub.clone()]).unwrap();
    assert_eq!(
        out,
        "impl FooContract for FooHandler {\n    async fn a(&self) {}\n}\n"
    );

    let out = insert_into_impl(&out, "FooContract", "FooHandler", &[stub]).unwrap();
    assert_eq!(
        out,
        "impl FooContract for FooHandler {\n    async fn a(&self) {}\n\n    async fn a(&self) {}\n}\n"
    );

    assert!(insert_into_impl("struct X;", "FooContract", "FooHandler", &[]).is_none());
}
