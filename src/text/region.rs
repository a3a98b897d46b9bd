use crate::edit::Edit;
use crate::text::errors::{MarkerRole, TextError};

/// Compute the edit replacing `start ..= end` with `text`.
///
/// `end` is searched from the start marker's offset, so the region ends at
/// the first `end` at or after where `start` begins. Both markers are
/// included in the replaced span.
pub fn region_edit(doc: &str, start: &str, end: &str, text: &str) -> Result<Edit, TextError> {
    let region_start = doc.find(start).ok_or_else(|| TextError::MarkerNotFound {
        role: MarkerRole::Start,
        marker: start.to_string(),
    })?;

    let region_end = doc[region_start..]
        .find(end)
        .map(|rel| region_start + rel + end.len())
        .ok_or_else(|| TextError::MarkerNotFound {
            role: MarkerRole::End,
            marker: end.to_string(),
        })?;

    Ok(Edit::new(region_start, region_end, text))
}

/// Replace the region delimited by two literal markers.
pub fn replace_between(doc: &str, start: &str, end: &str, text: &str) -> Result<String, TextError> {
    let edit = region_edit(doc, start, end, text)?;
    Ok(edit.apply_to(doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLER: &str = "\
form.addEventListener('submit', async (e) => {
  e.preventDefault();
  old();
}, true);
after();
";

    #[test]
    fn test_replaces_inclusive_region() {
        let out = replace_between(
            HANDLER,
            "form.addEventListener('submit', async (e) => {",
            "}, true);",
            "form.addEventListener('submit', async (e) => {\n  fresh();\n}, true);",
        )
        .unwrap();
        assert_eq!(
            out,
            "form.addEventListener('submit', async (e) => {\n  fresh();\n}, true);\nafter();\n"
        );
    }

    #[test]
    fn test_end_searched_after_start() {
        let doc = "END start body END tail";
        let out = replace_between(doc, "start", "END", "X").unwrap();
        assert_eq!(out, "END X tail");
    }

    #[test]
    fn test_missing_start() {
        let err = replace_between(HANDLER, "nope", "}, true);", "").unwrap_err();
        assert!(matches!(
            err,
            TextError::MarkerNotFound {
                role: MarkerRole::Start,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_end() {
        let err = replace_between(HANDLER, "form.", "}, false);", "").unwrap_err();
        assert!(matches!(
            err,
            TextError::MarkerNotFound {
                role: MarkerRole::End,
                ..
            }
        ));
    }
}
