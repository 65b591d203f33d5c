use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PathSpec;

/// The fixed set of fields every canonical record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Id,
    Organization,
    Reference,
    Application,
    Types,
    Categories,
    Longitude,
    Latitude,
    Meta,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::Id,
        CanonicalField::Organization,
        CanonicalField::Reference,
        CanonicalField::Application,
        CanonicalField::Types,
        CanonicalField::Categories,
        CanonicalField::Longitude,
        CanonicalField::Latitude,
        CanonicalField::Meta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Id => "id",
            CanonicalField::Organization => "organization",
            CanonicalField::Reference => "reference",
            CanonicalField::Application => "application",
            CanonicalField::Types => "types",
            CanonicalField::Categories => "categories",
            CanonicalField::Longitude => "longitude",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Meta => "meta",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source extraction rules, one optional rule per canonical field.
///
/// A field without a rule is unresolved for every element. Keys that are not canonical
/// field names are ignored when a stored mapping is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<PathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PathSpec>,
}

impl MappingSpec {
    /// The placeholder mapping a source gets when it was saved without explicit paths.
    ///
    /// Every path field is present but empty, and `types`/`categories` hold single-element
    /// placeholder constants, so the source reads as "unconfigured" rather than "absent".
    pub fn unconfigured() -> Self {
        MappingSpec {
            id: Some(PathSpec::path("")),
            organization: Some(PathSpec::path("")),
            reference: Some(PathSpec::path("")),
            application: Some(PathSpec::path("")),
            types: Some(PathSpec::constant(json!([
                {"name": "", "application": "", "description": ""}
            ]))),
            categories: Some(PathSpec::constant(json!([""]))),
            longitude: Some(PathSpec::path("")),
            latitude: Some(PathSpec::path("")),
            meta: Some(PathSpec::path("")),
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&PathSpec> {
        self.slot(field).as_ref()
    }

    /// Replace the rule for `field`, returning the previous one.
    pub fn set(&mut self, field: CanonicalField, spec: PathSpec) -> Option<PathSpec> {
        self.slot_mut(field).replace(spec)
    }

    pub fn remove(&mut self, field: CanonicalField) -> Option<PathSpec> {
        self.slot_mut(field).take()
    }

    pub fn with(mut self, field: CanonicalField, spec: PathSpec) -> Self {
        self.set(field, spec);
        self
    }

    /// Configured rules in canonical field order
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &PathSpec)> {
        CanonicalField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|spec| (field, spec)))
    }

    fn slot(&self, field: CanonicalField) -> &Option<PathSpec> {
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

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<PathSpec> {
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
