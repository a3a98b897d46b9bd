//! Literal and pattern-based text operations.
//!
//! None of these understand nesting. Anything brace-structured goes through
//! [`crate::structure`] instead.

pub mod anchor;
pub mod errors;
pub mod region;
pub mod substitute;

pub use anchor::{anchor_edit, append_if_absent, inject_after_anchor, Injection};
pub use errors::{MarkerRole, TextError};
pub use region::{region_edit, replace_between};
pub use substitute::{
    apply_once, substitution_edit, Substitution, SubstitutionRule, MAX_APPLICATIONS,
};
