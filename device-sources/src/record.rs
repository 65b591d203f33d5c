use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::mapping::CanonicalField;

/// A normalized device, one per upstream element.
///
/// `None` means the field could not be resolved for this element and is left out of the
/// serialized form. A JSON `null` that was actually present upstream is kept as
/// `Some(Value::Null)`, including across the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub organization: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub reference: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub application: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub types: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub categories: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub longitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub meta: Option<Value>,
}

// Only called when the key exists, so an explicit null stays Some(Null).
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl CanonicalRecord {
    pub fn get(&self, field: CanonicalField) -> Option<&Value> {
        self.slot(field).as_ref()
    }

    pub fn set(&mut self, field: CanonicalField, value: Option<Value>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: CanonicalField) -> &Option<Value> {
        match field {
            CanonicalField::Id => &self.id,
            CanonicalField::Organization => &self.organization,
            CanonicalField::Reference => &self.reference,
            CanonicalField::Application => &self.application,
            CanonicalField::Types => &self.types,
            CanonicalField::Categories => &self.categories,
            CanonicalField::Longitude => &self.longitude,
            CanonicalField::Latitude => &self.latitude,
            CanonicalField::Meta => &self.meta,
        }
    }

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<Value> {
        match field {
            CanonicalField::Id => &mut self.id,
            CanonicalField::Organization => &mut self.organization,
            CanonicalField::Reference => &mut self.reference,
            CanonicalField::Application => &mut self.application,
            CanonicalField::Types => &mut self.types,
            CanonicalField::Categories => &mut self.categories,
            CanonicalField::Longitude => &mut self.longitude,
            CanonicalField::Latitude => &mut self.latitude,
            CanonicalField::Meta => &mut self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unresolved_fields_are_omitted() {
        let record = CanonicalRecord {
            id: Some(json!("A1")),
            longitude: Some(json!(12.5)),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": "A1", "longitude": 12.5})
        );
    }

    #[test]
    fn test_explicit_null_survives_round_trip() {
        let record = CanonicalRecord {
            meta: Some(Value::Null),
            ..Default::default()
        };

        let serialized = serde_json::to_string(&record).unwrap();
        assert_eq!(serialized, r#"{"meta":null}"#);

        let back: CanonicalRecord = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back.meta, Some(Value::Null));
        assert_eq!(back.id, None);
        assert_eq!(back, record);
    }

    #[test]
    fn test_field_accessors() {
        let mut record = CanonicalRecord::default();
        record.set(CanonicalField::Latitude, Some(json!(1.5)));

        assert_eq!(record.get(CanonicalField::Latitude), Some(&json!(1.5)));
        assert_eq!(record.latitude, Some(json!(1.5)));
        assert_eq!(record.get(CanonicalField::Types), None);
    }
}
