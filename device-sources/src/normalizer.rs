use serde_json::Value;

use crate::error::FetchError;
use crate::extractor::extract_record;
use crate::json_path;
use crate::mapping::MappingSpec;
use crate::record::CanonicalRecord;

/// Turn a raw upstream body into canonical records.
///
/// With an empty `data_path` the body itself must be the element array; otherwise the path
/// is navigated first. Anything other than an array there fails the whole call, so record
/// counts always reflect what the upstream actually returned. Output order is source order.
pub fn normalize(
    raw: &Value,
    data_path: &str,
    mapping: &MappingSpec,
) -> Result<Vec<CanonicalRecord>, FetchError> {
    let located = if data_path.is_empty() {
        Some(raw)
    } else {
        json_path::navigate(raw, data_path)
    };

    match located {
        Some(Value::Array(elements)) => Ok(elements
            .iter()
            .map(|element| extract_record(element, mapping))
            .collect()),
        other => Err(FetchError::MalformedResponseShape {
            data_path: data_path.to_string(),
            found: json_path::kind_of(other),
        }),
    }
}
