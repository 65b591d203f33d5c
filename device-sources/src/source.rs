use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::mapping::MappingSpec;

pub const DEFAULT_AUTH_METHOD: &str = "open";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "get"),
            RequestMethod::Post => write!(f, "post"),
        }
    }
}

impl FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "get" => Ok(RequestMethod::Get),
            "post" => Ok(RequestMethod::Post),
            other => Err(format!("unsupported request method: {other}")),
        }
    }
}

// Stored values go through FromStr whether they come from JSON or a database row
impl<'de> Deserialize<'de> for RequestMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_auth_method() -> String {
    DEFAULT_AUTH_METHOD.to_string()
}

/// One configured upstream API and how to map its elements.
///
/// The field names on the wire follow what the administrative flow stores: the mapping
/// is kept under `paths` and the POST body under `requestData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Unique per source; doubles as the cache key.
    pub name: String,
    pub url: String,
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    #[serde(default)]
    pub request_method: RequestMethod,
    #[serde(default, rename = "requestData")]
    pub request_body: String,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
    #[serde(default)]
    pub data_path: String,
    #[serde(default = "MappingSpec::unconfigured", rename = "paths")]
    pub mapping: MappingSpec,
}

impl SourceDescriptor {
    /// A GET source with every optional setting at its default.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        SourceDescriptor {
            id: None,
            name: name.into(),
            url: url.into(),
            auth_method: default_auth_method(),
            request_method: RequestMethod::Get,
            request_body: String::new(),
            custom_headers: HashMap::new(),
            data_path: String::new(),
            mapping: MappingSpec::unconfigured(),
        }
    }

    pub fn with_mapping(mut self, mapping: MappingSpec) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_data_path(mut self, data_path: impl Into<String>) -> Self {
        self.data_path = data_path.into();
        self
    }

    pub fn with_post_body(mut self, body: impl Into<String>) -> Self {
        self.request_method = RequestMethod::Post;
        self.request_body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    /// Key under which normalized records for this source are cached
    pub fn cache_key(&self) -> &str {
        &self.name
    }
}
