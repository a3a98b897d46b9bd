use crate::structure::errors::StructureError;
use crate::structure::suggest::similar_headers;

/// A named block plus the literal header spellings that may introduce it.
///
/// Every spelling must end with the block's opening `{`; the brace matcher
/// starts right after the matched spelling at depth 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    pub name: String,
    pub spellings: Vec<String>,
}

impl HeaderSpec {
    pub fn new<I, S>(name: impl Into<String>, spellings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            spellings: spellings.into_iter().map(Into::into).collect(),
        }
    }

    /// `async function NAME(){` and `async function NAME() {`.
    pub fn async_function(name: &str) -> Self {
        Self::new(
            name,
            [
                format!("async function {name}(){{"),
                format!("async function {name}() {{"),
            ],
        )
    }

    /// `function NAME(){` and `function NAME() {`.
    pub fn function(name: &str) -> Self {
        Self::new(
            name,
            [
                format!("function {name}(){{"),
                format!("function {name}() {{"),
            ],
        )
    }
}

/// Where a header spelling was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch<'s> {
    /// Byte offset of the first character of the header
    pub offset: usize,
    /// The spelling that matched
    pub spelling: &'s str,
}

impl HeaderMatch<'_> {
    /// Offset immediately after the header's opening brace.
    pub fn body_start(&self) -> usize {
        self.offset + self.spelling.len()
    }
}

/// Locate a block header.
///
/// Spellings are tried in order and the first one present anywhere in the
/// document wins, at its first occurrence.
pub fn find_header<'s>(doc: &str, spec: &'s HeaderSpec) -> Result<HeaderMatch<'s>, StructureError> {
    spec.spellings
        .iter()
        .find_map(|spelling| {
            doc.find(spelling.as_str()).map(|offset| HeaderMatch {
                offset,
                spelling: spelling.as_str(),
            })
        })
        .ok_or_else(|| StructureError::HeaderNotFound {
            name: spec.name.clone(),
            suggestions: similar_headers(doc, &spec.spellings),
        })
}
