//! Patch applicator - turns a patch file into one session per target file
//!
//! Patches are grouped by resolved target path (first-appearance order),
//! confined to the workspace, and run as all-or-nothing sessions. A fatal
//! error in one file's session never affects another file.

use crate::config::schema::PatchConfig;
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::session::{PatchSession, RunMode, SessionError, SessionReport};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors that prevent a session from running at all.
#[derive(Debug)]
pub enum ApplicationError {
    /// Workspace root could not be resolved
    Workspace { root: PathBuf, reason: String },
    /// Target path failed workspace checks
    Safety { file: PathBuf, source: SafetyError },
    /// Reading or writing the target failed
    Session(SessionError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Workspace { root, reason } => {
                write!(f, "invalid workspace {}: {}", root.display(), reason)
            }
            ApplicationError::Safety { file, source } => {
                write!(f, "refusing to patch {}: {}", file.display(), source)
            }
            ApplicationError::Session(e) => write!(f, "session error: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Safety { source, .. } => Some(source),
            ApplicationError::Session(e) => Some(e),
            ApplicationError::Workspace { .. } => None,
        }
    }
}

impl From<SessionError> for ApplicationError {
    fn from(e: SessionError) -> Self {
        ApplicationError::Session(e)
    }
}

/// Apply a patch configuration to a workspace.
///
/// Returns one entry per target file, in the order files first appear in
/// the configuration.
pub fn apply_patches(
    config: &PatchConfig,
    workspace_root: &Path,
    mode: RunMode,
) -> Vec<(PathBuf, Result<SessionReport, ApplicationError>)> {
    let guard = match WorkspaceGuard::new(workspace_root) {
        Ok(guard) => guard,
        Err(source) => {
            let reason = source.to_string();
            return config
                .sessions(workspace_root)
                .into_iter()
                .map(|(file, _)| {
                    let err = ApplicationError::Workspace {
                        root: workspace_root.to_path_buf(),
                        reason: reason.clone(),
                    };
                    (file, Err(err))
                })
                .collect();
        }
    };

    info!(
        patch_set = %config.meta.name,
        workspace = %guard.workspace_root().display(),
        ?mode,
        "applying patch set"
    );

    config
        .sessions(workspace_root)
        .into_iter()
        .map(|(file, patches)| {
            let result = guard
                .validate_path(&file)
                .map_err(|source| ApplicationError::Safety {
                    file: file.clone(),
                    source,
                })
                .and_then(|target| {
                    let mut session = PatchSession::load(&target)?;
                    for patch in patches {
                        debug!(patch = %patch.id, kind = patch.operation.kind(), "queued");
                        session.push(patch.id.clone(), patch.operation.to_operation());
                    }
                    Ok(session.run(mode)?)
                });
            (file, result)
        })
        .collect()
}

/// Evaluate patches without writing anything.
pub fn check_patches(
    config: &PatchConfig,
    workspace_root: &Path,
) -> Vec<(PathBuf, Result<SessionReport, ApplicationError>)> {
    apply_patches(config, workspace_root, RunMode::DryRun)
}
