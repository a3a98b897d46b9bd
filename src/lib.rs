//! Brace Patcher: structural source patching without a parser
//!
//! Locates brace-delimited blocks by literal header text, measures their
//! extent by brace depth, and swaps their bodies. Alongside that it offers
//! first-occurrence anchor injection and one-shot pattern substitution.
//!
//! # Architecture
//!
//! All operations compile down to a single primitive: [`Edit`], a byte-span
//! splice over an in-memory document. Span acquisition lives in
//! [`structure`] (brace depth) and [`text`] (literal and regex search).
//! A [`PatchSession`] strings operations together over one file and writes
//! the result only if every required operation succeeded.
//!
//! # Guarantees
//!
//! - Operations are pure `&str -> String` functions; failures produce no output
//! - Sessions are all-or-nothing: an aborted session never writes
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement for config-driven runs
//!
//! # Precondition
//!
//! Brace counting does not skip string or comment literals. A block body
//! containing an unpaired `{` or `}` inside a literal will be mis-measured.
//!
//! # Example
//!
//! ```no_run
//! use brace_patcher::{HeaderSpec, Operation, PatchSession, RunMode};
//!
//! let mut session = PatchSession::load("frontend/admin.js")?;
//! session.push(
//!     "load-orders",
//!     Operation::replace_block(
//!         HeaderSpec::async_function("loadOrdersAdmin"),
//!         "  await loadOrdersAdminServer();",
//!     ),
//! );
//! let report = session.run(RunMode::Commit)?;
//! println!("{:?}", report.status);
//! # Ok::<(), brace_patcher::SessionError>(())
//! ```

pub mod cache;
pub mod config;
pub mod edit;
pub mod safety;
pub mod session;
pub mod structure;
pub mod text;

// Re-exports
pub use config::{
    apply_patches, check_patches, load_from_path, load_from_str, ApplicationError, ConfigError,
    PatchConfig,
};
pub use edit::{Edit, EditError};
pub use safety::{SafetyError, WorkspaceGuard};
pub use session::{
    FatalKind, Operation, OperationOutcome, OperationRecord, PatchSession, RunMode,
    SessionError, SessionReport, SessionState, SessionStatus,
};
pub use structure::{
    find_header, locate_block, match_braces, replace_block, BlockSpan, HeaderSpec,
    StructureError,
};
pub use text::{apply_once, inject_after_anchor, replace_between, SubstitutionRule, TextError};
