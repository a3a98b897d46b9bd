use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: a byte-span splice over an in-memory document.
///
/// Every patch operation (block replacement, anchor injection, substitution)
/// compiles down to this single primitive. Intelligence lives in span
/// acquisition, not in application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until apply_to() is called"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Invalid byte range: [{byte_start}, {byte_end}) in document of length {doc_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        doc_len: usize,
    },

    #[error("Byte offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
}

impl Edit {
    pub fn new(byte_start: usize, byte_end: usize, new_text: impl Into<String>) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
        }
    }

    /// Pure insertion at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset, offset, text)
    }

    /// Validate the edit against a document.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    pub fn validate<'a>(&self, doc: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > doc.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                doc_len: doc.len(),
            });
        }

        for offset in [self.byte_start, self.byte_end] {
            if !doc.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }

        Ok(&doc[self.byte_start..self.byte_end])
    }

    /// Apply this edit, producing a new document. The input is never modified.
    pub fn apply_to(&self, doc: &str) -> Result<String, EditError> {
        self.validate(doc)?;

        let mut out = String::with_capacity(
            doc.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&doc[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&doc[self.byte_end..]);
        Ok(out)
    }
}

/// xxh3-64 fingerprint of a document snapshot.
pub fn fingerprint(content: &str) -> u64 {
    xxh3_64(content.as_bytes())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Tempfile must live on the same filesystem for rename to be atomic
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the original file's permissions
    if let Ok(meta) = std::fs::metadata(path) {
        temp.as_file().set_permissions(meta.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
