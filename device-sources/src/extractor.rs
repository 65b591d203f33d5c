use serde_json::Value;

use crate::json_path;
use crate::mapping::{CanonicalField, MappingSpec, PathSpec};
use crate::record::CanonicalRecord;

// Order in which fields are resolved. Resolution is independent per field; the order only
// matters for anyone tracing the extractor.
const RESOLUTION_ORDER: [CanonicalField; 9] = [
    CanonicalField::Id,
    CanonicalField::Organization,
    CanonicalField::Reference,
    CanonicalField::Longitude,
    CanonicalField::Latitude,
    CanonicalField::Application,
    CanonicalField::Meta,
    CanonicalField::Types,
    CanonicalField::Categories,
];

/// Resolve one field of one source element.
///
/// A missing rule, an empty path or a path that leads nowhere all yield `None`; this never
/// fails. Constants are returned as-is for every element.
pub fn resolve_field(element: &Value, spec: Option<&PathSpec>) -> Option<Value> {
    match spec? {
        PathSpec::Constant(value) => Some(value.clone()),
        PathSpec::Path(path) => json_path::navigate(element, path).cloned(),
    }
}

pub fn extract_record(element: &Value, mapping: &MappingSpec) -> CanonicalRecord {
    let mut record = CanonicalRecord::default();
    for field in RESOLUTION_ORDER {
        record.set(field, resolve_field(element, mapping.get(field)));
    }
    record
}
