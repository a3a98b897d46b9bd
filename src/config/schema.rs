use crate::cache::get_or_compile;
use crate::session::Operation;
use crate::structure::HeaderSpec;
use crate::text::SubstitutionRule;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl PatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        let mut seen_ids = HashSet::new();
        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            } else if !seen_ids.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::InvalidCombo {
                    patch_id: Some(patch.id.clone()),
                    message: "duplicate patch id".to_string(),
                });
            }
            if patch.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: Some(patch.id.clone()),
                    field: "file",
                });
            }

            patch.operation.collect_issues(&patch.id, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Group patches by target file, in order of first appearance.
    ///
    /// Each group becomes one patch session; patches within a group keep
    /// their declaration order.
    pub fn sessions(&self, workspace_root: &Path) -> Vec<(PathBuf, Vec<&PatchDefinition>)> {
        let mut groups: Vec<(PathBuf, Vec<&PatchDefinition>)> = Vec::new();
        for patch in &self.patches {
            let file = self.meta.resolve(workspace_root, &patch.file);
            match groups.iter_mut().find(|(path, _)| *path == file) {
                Some((_, group)) => group.push(patch),
                None => groups.push((file, vec![patch])),
            }
        }
        groups
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workspace_relative: bool,
}

impl Metadata {
    pub fn resolve(&self, workspace_root: &Path, file: &str) -> PathBuf {
        if self.workspace_relative {
            workspace_root.join(file)
        } else {
            PathBuf::from(file)
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    pub file: String,
    pub operation: OperationSpec,
}

/// Header spellings for a `replace-block` patch that gives a style instead
/// of explicit `headers`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderStyle {
    AsyncFunction,
    Function,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperationSpec {
    ReplaceBlock {
        name: String,
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        style: Option<HeaderStyle>,
        body: String,
        #[serde(default = "default_true")]
        required: bool,
    },
    InjectAfter {
        anchor: String,
        text: String,
        #[serde(default)]
        unless_present: Option<String>,
    },
    Substitute {
        pattern: String,
        replacement: String,
        #[serde(default)]
        literal: bool,
        /// Defaults to true for regex rules and false for literal ones
        #[serde(default)]
        expand: Option<bool>,
        #[serde(default)]
        required: bool,
    },
    ReplaceBetween {
        start: String,
        end: String,
        text: String,
    },
    AppendIfAbsent {
        text: String,
    },
}

impl OperationSpec {
    /// Build the engine operation this descriptor stands for.
    pub fn to_operation(&self) -> Operation {
        match self {
            OperationSpec::ReplaceBlock {
                name,
                headers,
                style,
                body,
                required,
            } => {
                let header = match style {
                    Some(HeaderStyle::AsyncFunction) => HeaderSpec::async_function(name),
                    Some(HeaderStyle::Function) => HeaderSpec::function(name),
                    None => HeaderSpec::new(name.as_str(), headers.iter().cloned()),
                };
                Operation::ReplaceBlock {
                    header,
                    body: body.clone(),
                    required: *required,
                }
            }
            OperationSpec::InjectAfter {
                anchor,
                text,
                unless_present,
            } => Operation::InjectAfter {
                anchor: anchor.clone(),
                text: text.clone(),
                unless_present: unless_present.clone(),
            },
            OperationSpec::Substitute {
                pattern,
                replacement,
                literal,
                expand,
                required,
            } => {
                let rule = if *literal {
                    SubstitutionRule::literal(pattern.as_str(), replacement.as_str())
                } else {
                    SubstitutionRule::new(pattern.as_str(), replacement.as_str())
                };
                Operation::Substitute {
                    rule: rule.with_expand(expand.unwrap_or(!*literal)),
                    required: *required,
                }
            }
            OperationSpec::ReplaceBetween { start, end, text } => Operation::ReplaceBetween {
                start: start.clone(),
                end: end.clone(),
                text: text.clone(),
            },
            OperationSpec::AppendIfAbsent { text } => {
                Operation::AppendIfAbsent { text: text.clone() }
            }
        }
    }

    fn collect_issues(&self, patch_id: &str, issues: &mut Vec<ValidationIssue>) {
        let missing = |field: &'static str| ValidationIssue::MissingField {
            patch_id: Some(patch_id.to_string()),
            field,
        };
        let invalid = |message: String| ValidationIssue::InvalidCombo {
            patch_id: Some(patch_id.to_string()),
            message,
        };

        match self {
            OperationSpec::ReplaceBlock {
                name,
                headers,
                style,
                ..
            } => {
                if name.trim().is_empty() {
                    issues.push(missing("operation.name"));
                }
                match (headers.is_empty(), style) {
                    (true, None) => issues.push(missing("operation.headers")),
                    (false, Some(_)) => issues.push(invalid(
                        "replace-block takes either headers or style, not both".to_string(),
                    )),
                    _ => {}
                }
                for header in headers {
                    if !header.trim_end().ends_with('{') {
                        issues.push(invalid(format!(
                            "header `{header}` must end with the block's opening brace"
                        )));
                    }
                }
            }
            OperationSpec::InjectAfter { anchor, .. } => {
                if anchor.is_empty() {
                    issues.push(missing("operation.anchor"));
                }
            }
            OperationSpec::Substitute {
                pattern, literal, ..
            } => {
                if pattern.is_empty() {
                    issues.push(missing("operation.pattern"));
                } else if !literal {
                    if let Err(e) = get_or_compile(pattern) {
                        issues.push(invalid(format!("invalid pattern: {e}")));
                    }
                }
            }
            OperationSpec::ReplaceBetween { start, end, .. } => {
                if start.is_empty() {
                    issues.push(missing("operation.start"));
                }
                if end.is_empty() {
                    issues.push(missing("operation.end"));
                }
            }
            OperationSpec::AppendIfAbsent { text } => {
                if text.trim().is_empty() {
                    issues.push(missing("operation.text"));
                }
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OperationSpec::ReplaceBlock { .. } => "replace-block",
            OperationSpec::InjectAfter { .. } => "inject-after",
            OperationSpec::Substitute { .. } => "substitute",
            OperationSpec::ReplaceBetween { .. } => "replace-between",
            OperationSpec::AppendIfAbsent { .. } => "append-if-absent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch file contains no patches"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch configuration: {message}"),
            },
        }
    }
}
