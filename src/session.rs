//! Patch session: one read-patch-write cycle over a single document.
//!
//! A session loads the document once, applies its operations in order to an
//! in-memory working copy, and writes the result back only if no operation
//! failed fatally. Either every operation lands on disk or none does.

use crate::edit::{atomic_write, fingerprint};
use crate::structure::{block_edit, HeaderSpec, StructureError};
use crate::text::{
    append_if_absent, inject_after_anchor, region_edit, substitution_edit, SubstitutionRule,
    TextError,
};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A typed patch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Swap the body of a brace-delimited block.
    ReplaceBlock {
        header: HeaderSpec,
        body: String,
        /// Missing header aborts the session when true, is a no-op otherwise
        required: bool,
    },
    /// Insert text right after the first occurrence of an anchor.
    InjectAfter {
        anchor: String,
        text: String,
        /// Skip the injection when the document already contains this text
        unless_present: Option<String>,
    },
    /// One-shot pattern substitution.
    Substitute {
        rule: SubstitutionRule,
        /// Zero matches aborts the session when true
        required: bool,
    },
    /// Replace from a start marker through the next end marker.
    ReplaceBetween {
        start: String,
        end: String,
        text: String,
    },
    /// Append text at end of document unless already present.
    AppendIfAbsent { text: String },
}

impl Operation {
    pub fn replace_block(header: HeaderSpec, body: impl Into<String>) -> Self {
        Operation::ReplaceBlock {
            header,
            body: body.into(),
            required: true,
        }
    }

    pub fn inject_after(anchor: impl Into<String>, text: impl Into<String>) -> Self {
        Operation::InjectAfter {
            anchor: anchor.into(),
            text: text.into(),
            unless_present: None,
        }
    }

    pub fn substitute(rule: SubstitutionRule) -> Self {
        Operation::Substitute {
            rule,
            required: false,
        }
    }

    /// Short human-readable label, used when the caller gives none.
    pub fn describe(&self) -> String {
        match self {
            Operation::ReplaceBlock { header, .. } => format!("replace-block {}", header.name),
            Operation::InjectAfter { anchor, .. } => {
                format!("inject-after {}", abbreviate(anchor))
            }
            Operation::Substitute { rule, .. } => {
                format!("substitute {}", abbreviate(&rule.pattern))
            }
            Operation::ReplaceBetween { start, .. } => {
                format!("replace-between {}", abbreviate(start))
            }
            Operation::AppendIfAbsent { text } => {
                format!("append-if-absent {}", abbreviate(text.trim_start()))
            }
        }
    }

    /// Apply to `doc`. `Ok(None)` document means the step was a no-op.
    pub fn apply(&self, doc: &str) -> Result<Step, OperationError> {
        match self {
            Operation::ReplaceBlock {
                header,
                body,
                required,
            } => match block_edit(doc, header, body) {
                Ok(edit) => Ok(Step::applied(edit.apply_to(doc).map_err(StructureError::from)?)),
                Err(StructureError::HeaderNotFound { .. }) if !required => {
                    Ok(Step::noop(OperationOutcome::NoOpHeaderAbsent))
                }
                Err(e) => Err(e.into()),
            },
            Operation::InjectAfter {
                anchor,
                text,
                unless_present,
            } => {
                if let Some(guard) = unless_present {
                    if doc.contains(guard.as_str()) {
                        return Ok(Step::noop(OperationOutcome::NoOpAlreadyPresent));
                    }
                }
                let injection = inject_after_anchor(doc, anchor, text)?;
                if injection.applied {
                    Ok(Step::applied(injection.document))
                } else {
                    Ok(Step::noop(OperationOutcome::NoOpAnchorAbsent))
                }
            }
            Operation::Substitute { rule, required } => match substitution_edit(doc, rule)? {
                Some(edit) => Ok(Step::applied(edit.apply_to(doc).map_err(TextError::from)?)),
                None if *required => Err(OperationError::PatternAbsent {
                    pattern: rule.pattern.clone(),
                }),
                None => Ok(Step::noop(OperationOutcome::NoOpPatternAbsent)),
            },
            Operation::ReplaceBetween { start, end, text } => {
                let edit = region_edit(doc, start, end, text)?;
                Ok(Step::applied(edit.apply_to(doc).map_err(TextError::from)?))
            }
            Operation::AppendIfAbsent { text } => {
                let injection = append_if_absent(doc, text);
                if injection.applied {
                    Ok(Step::applied(injection.document))
                } else {
                    Ok(Step::noop(OperationOutcome::NoOpAlreadyPresent))
                }
            }
        }
    }
}

fn abbreviate(text: &str) -> String {
    const MAX_CHARS: usize = 40;
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() > MAX_CHARS || first_line.len() < text.len() {
        let cut: String = first_line.chars().take(MAX_CHARS).collect();
        format!("`{cut}…`")
    } else {
        format!("`{first_line}`")
    }
}

/// What one operation did to the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub document: Option<String>,
    pub outcome: OperationOutcome,
}

impl Step {
    fn applied(document: String) -> Self {
        Self {
            document: Some(document),
            outcome: OperationOutcome::Applied,
        }
    }

    fn noop(outcome: OperationOutcome) -> Self {
        Self {
            document: None,
            outcome,
        }
    }
}

/// Fatal operation failures. Any of these aborts the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Text(#[from] TextError),

    #[error("required pattern matched nothing: `{pattern}`")]
    PatternAbsent { pattern: String },
}

impl OperationError {
    pub fn kind(&self) -> FatalKind {
        match self {
            OperationError::Structure(StructureError::HeaderNotFound { .. }) => {
                FatalKind::HeaderNotFound
            }
            OperationError::Structure(StructureError::UnbalancedBraces { .. }) => {
                FatalKind::UnbalancedBraces
            }
            OperationError::Structure(StructureError::Edit(_))
            | OperationError::Text(TextError::Edit(_)) => FatalKind::InvalidEdit,
            OperationError::Text(TextError::InvalidPattern { .. }) => FatalKind::InvalidPattern,
            OperationError::Text(TextError::MarkerNotFound { .. }) => FatalKind::MarkerNotFound,
            OperationError::PatternAbsent { .. } => FatalKind::PatternAbsent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalKind {
    HeaderNotFound,
    UnbalancedBraces,
    PatternAbsent,
    MarkerNotFound,
    InvalidPattern,
    InvalidEdit,
}

/// Per-operation outcome recorded in the session report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    Applied,
    NoOpAnchorAbsent,
    NoOpPatternAbsent,
    NoOpHeaderAbsent,
    NoOpAlreadyPresent,
    /// Not attempted because an earlier operation aborted the session
    Skipped,
    Fatal { kind: FatalKind, message: String },
}

impl OperationOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, OperationOutcome::Fatal { .. })
    }

    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            OperationOutcome::NoOpAnchorAbsent
                | OperationOutcome::NoOpPatternAbsent
                | OperationOutcome::NoOpHeaderAbsent
                | OperationOutcome::NoOpAlreadyPresent
        )
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutcome::Applied => write!(f, "applied"),
            OperationOutcome::NoOpAnchorAbsent => write!(f, "no-op (anchor absent)"),
            OperationOutcome::NoOpPatternAbsent => write!(f, "no-op (pattern absent)"),
            OperationOutcome::NoOpHeaderAbsent => write!(f, "no-op (optional block absent)"),
            OperationOutcome::NoOpAlreadyPresent => write!(f, "no-op (already present)"),
            OperationOutcome::Skipped => write!(f, "skipped"),
            OperationOutcome::Fatal { message, .. } => write!(f, "fatal: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRecord {
    pub id: String,
    #[serde(flatten)]
    pub outcome: OperationOutcome,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    Patching,
    Committed,
    Aborted,
}

/// Whether a successful run writes back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Commit,
    DryRun,
}

/// Final session status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Transformed document was written back
    Committed,
    /// Dry run: the document would have been written
    WouldCommit,
    /// Every operation was a no-op; nothing to write
    Unchanged,
    /// No write happened; the store holds the original content
    Aborted { reason: String },
}

impl SessionStatus {
    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionStatus::Aborted { .. })
    }
}

/// Everything a finished session has to say.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub file: PathBuf,
    #[serde(flatten)]
    pub status: SessionStatus,
    pub operations: Vec<OperationRecord>,
    /// Content as loaded
    #[serde(skip)]
    pub original: String,
    /// Transformed content; equals `original` when aborted
    #[serde(skip)]
    pub document: String,
}

impl SessionReport {
    pub fn count(&self, pred: impl Fn(&OperationOutcome) -> bool) -> usize {
        self.operations.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn changed(&self) -> bool {
        self.original != self.document
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to read {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One read-patch-write cycle over a single document.
#[derive(Debug)]
pub struct PatchSession {
    path: PathBuf,
    snapshot: String,
    fingerprint: u64,
    operations: Vec<(String, Operation)>,
    state: SessionState,
}

impl PatchSession {
    /// Read the document and enter the `Loaded` state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = fs::read_to_string(&path).map_err(|source| SessionError::Load {
            path: path.clone(),
            source,
        })?;
        debug!(file = %path.display(), bytes = snapshot.len(), "loaded document");

        Ok(Self {
            fingerprint: fingerprint(&snapshot),
            path,
            snapshot,
            operations: Vec::new(),
            state: SessionState::Loaded,
        })
    }

    pub fn push(&mut self, id: impl Into<String>, operation: Operation) -> &mut Self {
        self.operations.push((id.into(), operation));
        self
    }

    /// Queue operations labelled by their own description.
    pub fn extend(&mut self, operations: impl IntoIterator<Item = Operation>) -> &mut Self {
        for op in operations {
            let id = op.describe();
            self.operations.push((id, op));
        }
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// Apply all queued operations and, in commit mode, write the result.
    ///
    /// Fatal operation errors are reported through [`SessionStatus::Aborted`],
    /// not as `Err`; `Err` is reserved for I/O on the store itself.
    pub fn run(mut self, mode: RunMode) -> Result<SessionReport, SessionError> {
        self.state = SessionState::Patching;

        let mut working = self.snapshot.clone();
        let mut records = Vec::with_capacity(self.operations.len());
        let mut abort_reason: Option<String> = None;

        for (id, op) in &self.operations {
            if abort_reason.is_some() {
                records.push(OperationRecord {
                    id: id.clone(),
                    outcome: OperationOutcome::Skipped,
                });
                continue;
            }

            match op.apply(&working) {
                Ok(step) => {
                    debug!(operation = %id, outcome = %step.outcome, "operation finished");
                    if let Some(document) = step.document {
                        working = document;
                    }
                    records.push(OperationRecord {
                        id: id.clone(),
                        outcome: step.outcome,
                    });
                }
                Err(e) => {
                    warn!(operation = %id, error = %e, "operation failed, aborting session");
                    abort_reason = Some(format!("{id}: {e}"));
                    records.push(OperationRecord {
                        id: id.clone(),
                        outcome: OperationOutcome::Fatal {
                            kind: e.kind(),
                            message: e.to_string(),
                        },
                    });
                }
            }
        }

        if let Some(reason) = abort_reason {
            return Ok(self.finish_aborted(records, reason));
        }

        if working == self.snapshot {
            self.state = SessionState::Committed;
            return Ok(self.finish(records, SessionStatus::Unchanged, working));
        }

        if mode == RunMode::DryRun {
            self.state = SessionState::Committed;
            return Ok(self.finish(records, SessionStatus::WouldCommit, working));
        }

        // Staleness check: refuse to overwrite a file that moved under us.
        let current = fs::read_to_string(&self.path).map_err(|source| SessionError::Load {
            path: self.path.clone(),
            source,
        })?;
        if fingerprint(&current) != self.fingerprint {
            let reason = format!("{} changed on disk since it was loaded", self.path.display());
            warn!(file = %self.path.display(), "store changed during session, aborting");
            return Ok(self.finish_aborted(records, reason));
        }

        atomic_write(&self.path, working.as_bytes()).map_err(|source| SessionError::Commit {
            path: self.path.clone(),
            source,
        })?;
        self.state = SessionState::Committed;
        info!(
            file = %self.path.display(),
            bytes_before = self.snapshot.len(),
            bytes_after = working.len(),
            "committed patched document"
        );

        Ok(self.finish(records, SessionStatus::Committed, working))
    }

    fn finish_aborted(mut self, records: Vec<OperationRecord>, reason: String) -> SessionReport {
        self.state = SessionState::Aborted;
        info!(file = %self.path.display(), %reason, "session aborted, document left untouched");
        let document = self.snapshot.clone();
        self.finish(records, SessionStatus::Aborted { reason }, document)
    }

    fn finish(
        self,
        operations: Vec<OperationRecord>,
        status: SessionStatus,
        document: String,
    ) -> SessionReport {
        debug_assert!(matches!(
            self.state,
            SessionState::Committed | SessionState::Aborted
        ));
        SessionReport {
            file: self.path,
            status,
            operations,
            original: self.snapshot,
            document,
        }
    }
}
