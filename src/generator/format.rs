use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use tracing::debug;

/// Runs rustfmt over `files`. Non-Rust paths are ignored.
pub fn format_files(files: &[PathBuf]) -> anyhow::Result<()> {
    let rust_files: Vec<&PathBuf> = files
        .iter()
        .filter(|p| p.extension().is_some_and(|e| e == "rs"))
        .collect();
    if rust_files.is_empty() {
        return Ok(());
    }
    // Tests point this at a stub instead of touching PATH
    let rustfmt = std::env::var("SPECFORGE_RUSTFMT_BIN").unwrap_or_else(|_| "rustfmt".to_string());
    debug!(files = rust_files.len(), bin = %rustfmt, "formatting generated files");

    let status = Command::new(&rustfmt)
        .arg("--edition")
        .arg("2021")
        .args(&rust_files)
        .status()
        .with_context(|| format!("failed to run {rustfmt}"))?;
    if !status.success() {
        anyhow::bail!("rustfmt failed with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn stub(dir: &Path, exit_code: i32) -> PathBuf {
        let stub = dir.join("rustfmt");
        fs::write(&stub, format!("#!/bin/sh\nexit {exit_code}\n")).unwrap();
        let mut perms = fs::metadata(&stub).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&stub, perms).unwrap();
        stub
    }

    fn with_stub(exit_code: i32) -> anyhow::Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub(dir.path(), exit_code);
        let file = dir.path().join("lib.rs");
        fs::write(&file, "fn main() {}\n").unwrap();

        let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let old_bin = env::var("SPECFORGE_RUSTFMT_BIN").ok();
        env::set_var("SPECFORGE_RUSTFMT_BIN", &stub);
        let res = format_files(&[file]);
        match old_bin {
            Some(v) => env::set_var("SPECFORGE_RUSTFMT_BIN", v),
            None => env::remove_var("SPECFORGE_RUSTFMT_BIN"),
        }
        res
    }

    #[test]
    fn test_format_files_ok() {
        assert!(with_stub(0).is_ok());
    }

    #[test]
    fn test_format_files_error() {
        assert!(with_stub(1).is_err());
    }

    #[test]
    fn test_format_skips_non_rust_files() {
        let res = format_files(&[PathBuf::from("schemas.json"), PathBuf::from("openapi.yaml")]);
        assert!(res.is_ok());
    }
}
