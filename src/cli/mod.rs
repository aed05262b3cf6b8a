//! # CLI Module
//!
//! Command-line front end of the `specforge` binary.
//!
//! ## Commands
//!
//! ```bash
//! # Check every spec document and the references between them
//! specforge validate --root .
//!
//! # Generate everything, or only some parts
//! specforge generate --root .
//! specforge generate --only schemas,contracts --dry-run
//!
//! # Check conventions and handler sync, adding missing handler methods
//! specforge lint --fix --fail-on-error
//! ```
//!
//! `--root` falls back to `SPECFORGE_ROOT`. The global `--log-level` and
//! `--log-format` flags fall back to `SPECFORGE_LOG_LEVEL` and
//! `SPECFORGE_LOG_FORMAT`.
//!
//! Exit code 1 means the specs are invalid, or lint found errors with
//! `--fail-on-error`.

mod commands;


pub use commands::{run, run_cli, Cli, Commands, OnlyPart};
