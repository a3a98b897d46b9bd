use crate::edit::Edit;
use crate::text::errors::TextError;

/// Result of an injection attempt. `applied` is false when nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Injection carries the new document"]
pub struct Injection {
    pub document: String,
    pub applied: bool,
}

impl Injection {
    fn unchanged(doc: &str) -> Self {
        Self {
            document: doc.to_string(),
            applied: false,
        }
    }
}

/// Compute the insertion edit for the first occurrence of `anchor`, if any.
pub fn anchor_edit(doc: &str, anchor: &str, insertion: &str) -> Option<Edit> {
    doc.find(anchor)
        .map(|offset| Edit::insert(offset + anchor.len(), insertion))
}

/// Insert `insertion` right after the first occurrence of `anchor`.
///
/// A missing anchor is not an error: the document comes back unchanged with
/// `applied == false`. Later occurrences of the anchor are never touched.
///
/// # Examples
///
/// ```
/// use brace_patcher::text::inject_after_anchor;
///
/// let hit = inject_after_anchor("aXb", "X", "Y")?;
/// assert_eq!(hit.document, "aXYb");
/// assert!(hit.applied);
///
/// let miss = inject_after_anchor("aXb", "Z", "Y")?;
/// assert_eq!(miss.document, "aXb");
/// assert!(!miss.applied);
/// # Ok::<(), brace_patcher::TextError>(())
/// ```
pub fn inject_after_anchor(
    doc: &str,
    anchor: &str,
    insertion: &str,
) -> Result<Injection, TextError> {
    match anchor_edit(doc, anchor, insertion) {
        Some(edit) => Ok(Injection {
            document: edit.apply_to(doc)?,
            applied: true,
        }),
        None => Ok(Injection::unchanged(doc)),
    }
}

/// Append `text` at the end of the document unless it already occurs.
pub fn append_if_absent(doc: &str, text: &str) -> Injection {
    if doc.contains(text) {
        return Injection::unchanged(doc);
    }
    let mut document = String::with_capacity(doc.len() + text.len());
    document.push_str(doc);
    document.push_str(text);
    Injection {
        document,
        applied: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_inject_hit() {
        let out = inject_after_anchor("aXb", "X", "Y").unwrap();
        assert_eq!(out.document, "aXYb");
        assert!(out.applied);
    }

    #[test]
    fn test_inject_miss() {
        let out = inject_after_anchor("aXb", "Z", "Y").unwrap();
        assert_eq!(out.document, "aXb");
        assert!(!out.applied);
    }

    #[test]
    fn test_inject_first_occurrence_only() {
        let out = inject_after_anchor("X-X-X", "X", "!").unwrap();
        assert_eq!(out.document, "X!-X-X");
    }

    #[test]
    fn test_inject_after_multiline_anchor() {
        let doc = "const payment = pick();\n  submit();\n";
        let anchor = "const payment = pick();";
        let out = inject_after_anchor(doc, anchor, "\n  const email = read();").unwrap();
        assert_eq!(
            out.document,
            "const payment = pick();\n  const email = read();\n  submit();\n"
        );
    }

    #[test]
    fn test_inject_after_multibyte_anchor() {
        let doc = "showMessageBox('¿Eliminar?');ñ";
        let out = inject_after_anchor(doc, "¿Eliminar?');", "\nlog();").unwrap();
        assert_eq!(out.document, "showMessageBox('¿Eliminar?');\nlog();ñ");
        assert!(out.applied);
    }

    #[test]
    fn test_anchor_edit_failure_surfaces() {
        // A stale edit is an error, never a missing anchor
        let edit = anchor_edit("aaaaXb", "X", "Y").unwrap();
        let err = edit.apply_to("ab").map_err(TextError::from).unwrap_err();
        assert!(matches!(err, TextError::Edit(_)));
    }

    #[test]
    fn test_append_if_absent() {
        let out = append_if_absent("a\n", "\nfunction extra(){}\n");
        assert_eq!(out.document, "a\n\nfunction extra(){}\n");
        assert!(out.applied);

        let again = append_if_absent(&out.document, "\nfunction extra(){}\n");
        assert_eq!(again.document, out.document);
        assert!(!again.applied);
    }

    proptest! {
        #[test]
        fn prop_injection_grows_by_insertion_length(
            prefix in "[a-z]{0,10}",
            suffix in "[a-z]{0,10}",
            insertion in "[A-Z]{0,10}",
            repeats in 1usize..4,
        ) {
            let anchor = "@@";
            let doc = format!("{prefix}{}{suffix}", anchor.repeat(repeats));
            let out = inject_after_anchor(&doc, anchor, &insertion).unwrap();

            prop_assert!(out.applied);
            prop_assert_eq!(out.document.len(), doc.len() + insertion.len());

            let at = prefix.len() + anchor.len();
            prop_assert_eq!(&out.document[..at], &doc[..at]);
            prop_assert_eq!(&out.document[at..at + insertion.len()], insertion.as_str());
            prop_assert_eq!(&out.document[at + insertion.len()..], &doc[at..]);
        }
    }
}
