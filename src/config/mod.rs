pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_patches, check_patches, ApplicationError};
pub use loader::{discover_patch_files, load_from_path, load_from_str, ConfigError};
pub use schema::{
    HeaderStyle, Metadata, OperationSpec, PatchConfig, PatchDefinition, ValidationError,
    ValidationIssue,
};
