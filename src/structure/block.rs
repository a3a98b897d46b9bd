use crate::edit::Edit;
use crate::structure::braces::match_braces;
use crate::structure::errors::StructureError;
use crate::structure::header::{find_header, HeaderSpec};
use std::ops::Range;

/// Byte span of a located block: `[header_start, block_end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    /// Offset of the first character of the header
    pub header_start: usize,
    /// Offset immediately after the header's opening brace
    pub body_start: usize,
    /// Offset one past the closing brace
    pub block_end: usize,
}

impl BlockSpan {
    pub fn range(&self) -> Range<usize> {
        self.header_start..self.block_end
    }

    pub fn header<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.header_start..self.body_start]
    }

    /// Text between the opening and closing braces.
    pub fn body<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.body_start..self.block_end - 1]
    }
}

/// Locate the span of the block introduced by `spec`.
pub fn locate_block(doc: &str, spec: &HeaderSpec) -> Result<BlockSpan, StructureError> {
    let header = find_header(doc, spec)?;
    let body_start = header.body_start();
    let block_end = match_braces(doc, body_start).map_err(|e| e.for_block(&spec.name))?;

    Ok(BlockSpan {
        header_start: header.offset,
        body_start,
        block_end,
    })
}

/// Compute the edit that swaps a block's body for `new_body`.
///
/// The header is kept verbatim; the new block reads
/// `header + "\n" + new_body + "\n}"`.
pub fn block_edit(doc: &str, spec: &HeaderSpec, new_body: &str) -> Result<Edit, StructureError> {
    let span = locate_block(doc, spec)?;
    let header = span.header(doc);

    let mut replacement = String::with_capacity(header.len() + new_body.len() + 3);
    replacement.push_str(header);
    replacement.push('\n');
    replacement.push_str(new_body);
    replacement.push_str("\n}");

    Ok(Edit::new(span.header_start, span.block_end, replacement))
}

/// Replace the body of exactly one block, returning the new document.
///
/// On error no output is produced and the input is untouched.
///
/// # Examples
///
/// ```
/// use brace_patcher::structure::{replace_block, HeaderSpec};
///
/// let doc = "async function f(){\n  return 1;\n}\ntail";
/// let out = replace_block(doc, &HeaderSpec::async_function("f"), "  return 2;").unwrap();
/// assert_eq!(out, "async function f(){\n  return 2;\n}\ntail");
/// ```
pub fn replace_block(
    doc: &str,
    spec: &HeaderSpec,
    new_body: &str,
) -> Result<String, StructureError> {
    let edit = block_edit(doc, spec, new_body)?;
    Ok(edit.apply_to(doc)?)
}
