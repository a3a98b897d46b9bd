//! Brace-structured block location and replacement.
//!
//! Blocks are found by literal header text and delimited by brace depth.
//! No language grammar is involved: a block is whatever lies between the
//! header's `{` and the `}` that balances it.

pub mod block;
pub mod braces;
pub mod errors;
pub mod header;
pub mod suggest;

pub use block::{block_edit, locate_block, replace_block, BlockSpan};
pub use braces::match_braces;
pub use errors::StructureError;
pub use header::{find_header, HeaderMatch, HeaderSpec};
