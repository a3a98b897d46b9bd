use crate::structure::errors::StructureError;

/// Find the end of a brace-delimited block.
///
/// `open_index` is the offset immediately after an opening `{` that has
/// already been consumed, so scanning starts at depth 1. Returns the offset
/// one past the `}` that brings depth back to 0.
///
/// This is a pure depth count: braces inside string literals, template
/// literals or comments are counted like any other brace. Bodies scanned
/// here must not contain unpaired braces inside literals.
///
/// # Examples
///
/// ```
/// use brace_patcher::structure::match_braces;
///
/// let doc = "f(){ if (x) { y(); } } tail";
/// let end = match_braces(doc, 4).unwrap();
/// assert_eq!(&doc[end..], " tail");
/// ```
pub fn match_braces(doc: &str, open_index: usize) -> Result<usize, StructureError> {
    let bytes = doc.as_bytes();
    let mut depth: usize = 1;

    // `{` and `}` are ASCII, so they never appear inside a multi-byte
    // UTF-8 sequence and byte scanning is safe.
    for (offset, byte) in bytes.iter().enumerate().skip(open_index) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(offset + 1);
                }
            }
            _ => {}
        }
    }

    Err(StructureError::UnbalancedBraces {
        block: None,
        open_index,
        depth,
    })
}
