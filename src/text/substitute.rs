use crate::cache::get_or_compile;
use crate::edit::Edit;
use crate::text::errors::TextError;
use regex::Regex;

/// Upper bound on how many matches a rule rewrites.
pub const MAX_APPLICATIONS: usize = 1;

/// A pattern/replacement pair applied at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    pub pattern: String,
    pub replacement: String,
    /// Treat `pattern` as literal text rather than a regex
    pub literal: bool,
    /// Expand `$1` / `${name}` capture references in `replacement`
    pub expand: bool,
}

impl SubstitutionRule {
    /// A regex rule with capture expansion enabled.
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            literal: false,
            expand: true,
        }
    }

    /// A literal search/replace; the replacement is inserted verbatim.
    pub fn literal(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: search.into(),
            replacement: replacement.into(),
            literal: true,
            expand: false,
        }
    }

    pub fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    /// Compile the rule's pattern (cached per thread).
    pub fn compile(&self) -> Result<Regex, TextError> {
        let source = if self.literal {
            regex::escape(&self.pattern)
        } else {
            self.pattern.clone()
        };
        get_or_compile(&source).map_err(|e| TextError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })
    }
}

/// Result of applying a rule: the new document and how many matches were rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Substitution carries the new document"]
pub struct Substitution {
    pub document: String,
    pub count: usize,
}

impl Substitution {
    pub fn applied(&self) -> bool {
        self.count > 0
    }
}

/// Compute the edit for the first match of `rule`, if any.
pub fn substitution_edit(doc: &str, rule: &SubstitutionRule) -> Result<Option<Edit>, TextError> {
    let re = rule.compile()?;
    let Some(caps) = re.captures(doc) else {
        return Ok(None);
    };
    let Some(whole) = caps.get(0) else {
        return Ok(None);
    };

    let replacement = if rule.expand {
        let mut expanded = String::new();
        caps.expand(&rule.replacement, &mut expanded);
        expanded
    } else {
        rule.replacement.clone()
    };

    Ok(Some(Edit::new(whole.start(), whole.end(), replacement)))
}

/// Apply `rule` to the first match only.
///
/// A pattern that does not match yields `count == 0` and the document
/// unchanged; whether that is acceptable is the caller's decision.
///
/// # Examples
///
/// ```
/// use brace_patcher::text::{apply_once, SubstitutionRule};
///
/// let rule = SubstitutionRule::new(r"loadOrdersAdmin\(\);", "loadOrdersAdminServer();");
/// let out = apply_once("loadOrdersAdmin(); loadOrdersAdmin();", &rule).unwrap();
/// assert_eq!(out.document, "loadOrdersAdminServer(); loadOrdersAdmin();");
/// assert_eq!(out.count, 1);
/// ```
pub fn apply_once(doc: &str, rule: &SubstitutionRule) -> Result<Substitution, TextError> {
    match substitution_edit(doc, rule)? {
        Some(edit) => Ok(Substitution {
            document: edit.apply_to(doc)?,
            count: MAX_APPLICATIONS,
        }),
        None => Ok(Substitution {
            document: doc.to_string(),
            count: 0,
        }),
    }
}
