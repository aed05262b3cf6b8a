mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::process::{Command, Output};

use common::repo::FixtureRepo;

fn specforge(repo: &FixtureRepo, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_specforge"))
        .args(args)
        .env("SPECFORGE_ROOT", repo.root())
        .env_remove("SPECFORGE_LOG_LEVEL")
        .env_remove("SPECFORGE_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .output()
        .expect("run cli")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_cli_validate_prints_summary() {
    let repo = FixtureRepo::copy_of("blog");
    let output = specforge(&repo, &["validate"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Models: 3"));
    assert!(out.contains("Domains: 3"));
    assert!(out.contains("Events: 2"));
    assert!(out.contains("Manifests: 1"));
}

#[test]
fn test_cli_validate_reports_issues() {
    let repo = FixtureRepo::copy_of("blog");
    repo.write(
        "shared/spec/events.yaml",
        "events:\n  post_archived: {message: ArchivedPost, publish: true}\n",
    );
    let output = specforge(&repo, &["validate"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Spec validation failed"));
    assert!(err.contains("Unknown message model 'ArchivedPost'"));
}

#[test]
fn test_cli_generate_and_rerun() {
    let repo = FixtureRepo::copy_of("blog");
    let output = specforge(&repo, &["generate"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("✅ Generated"));
    assert!(repo.exists("services/backend/src/generated/registry.rs"));

    let again = specforge(&repo, &["generate"]);
    assert!(again.status.success());
    let out = stdout(&again);
    assert!(out.contains("0 written"));
    assert!(out.contains("⚠️  Skipping existing handler file"));
}

#[test]
fn test_cli_generate_dry_run_and_only() {
    let repo = FixtureRepo::copy_of("blog");
    let output = specforge(&repo, &["generate", "--only", "openapi", "--dry-run"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("services/backend/doc/openapi.yaml"));
    assert!(!out.contains("schemas.rs"));
    assert!(out.contains("(dry run)"));
    assert!(!repo.exists("services/backend/doc"));
}

#[test]
fn test_cli_generate_formats_with_configured_binary() {
    let repo = FixtureRepo::copy_of("blog");
    let log = repo.path("rustfmt.log");
    let stub = repo.path("fake-rustfmt");
    fs::write(
        &stub,
        format!("#!/bin/sh\necho \"$@\" >> {}\nexit 0\n", log.display()),
    )
    .unwrap();
    let mut perms = fs::metadata(&stub).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&stub, perms).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_specforge"))
        .args(["generate", "--only", "events", "--format"])
        .env("SPECFORGE_ROOT", repo.root())
        .env("SPECFORGE_RUSTFMT_BIN", &stub)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{}", stderr(&output));

    let calls = fs::read_to_string(&log).unwrap();
    assert!(calls.contains("--edition 2021"));
    assert!(calls.contains("events.rs"));
}

#[test]
fn test_cli_lint_fix_and_fail_on_error() {
    let repo = FixtureRepo::copy_of("blog");
    assert!(specforge(&repo, &["generate"]).status.success());

    // A new operation leaves the existing handler behind.
    let users = repo.read("services/backend/spec/users.yaml");
    repo.write(
        "services/backend/spec/users.yaml",
        &format!(
            "{users}  ban_user:\n    params:\n      - {{name: user_id, type: int}}\n    rest: {{method: POST, path: \"/{{user_id}}/ban\"}}\n"
        ),
    );

    let lint = specforge(&repo, &["lint", "--fail-on-error"]);
    assert_eq!(lint.status.code(), Some(1));
    assert!(stdout(&lint).contains("ban_user"));

    let fixed = specforge(&repo, &["lint", "--fix", "--fail-on-error"]);
    assert!(fixed.status.success(), "{}", stdout(&fixed));
    assert!(stdout(&fixed).contains("🔧"));
    let handler = repo.read("services/backend/src/handlers/users.rs");
    assert!(handler.contains("async fn ban_user(&self, user_id: i64) -> Result<(), HandlerError>"));
}

#[test]
fn test_cli_rejects_unknown_part() {
    let repo = FixtureRepo::copy_of("blog");
    let output = specforge(&repo, &["generate", "--only", "controllers"]);
    assert_eq!(output.status.code(), Some(2));
}
