pub mod mapping_spec;
pub mod path_spec;

pub use mapping_spec::{CanonicalField, MappingSpec};
pub use path_spec::{InvalidPathSpec, PathKind, PathSpec};
