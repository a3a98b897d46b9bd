use crate::edit::EditError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("block header not found: {name}{}", format_suggestions(.suggestions))]
    HeaderNotFound {
        name: String,
        /// Header-like lines in the document that resemble the requested spellings
        suggestions: Vec<String>,
    },

    #[error(
        "unbalanced braces{} after byte {open_index} (depth {depth} at end of document)",
        format_block(.block)
    )]
    UnbalancedBraces {
        block: Option<String>,
        open_index: usize,
        depth: usize,
    },

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl StructureError {
    /// Attach the block name to an unbalanced-braces error raised by the matcher.
    pub(crate) fn for_block(self, name: &str) -> Self {
        match self {
            StructureError::UnbalancedBraces {
                block: None,
                open_index,
                depth,
            } => StructureError::UnbalancedBraces {
                block: Some(name.to_string()),
                open_index,
                depth,
            },
            other => other,
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = suggestions.iter().map(|s| format!("`{s}`")).collect();
    format!(" (did you mean {}?)", quoted.join(" or "))
}

fn format_block(block: &Option<String>) -> String {
    match block {
        Some(name) => format!(" in block {name}"),
        None => String::new(),
    }
}
