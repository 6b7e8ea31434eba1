//! The slice of the FHIR data model the bus inspects.
//!
//! Bundles and resources are kept as raw JSON. Only `Bundle.type`,
//! `Bundle.entry[].resource`, `resourceType` and `id` are ever read; every
//! other field is carried through untouched. Each resource's original text
//! is kept next to its parsed form, so upserts send it byte for byte.

use axum::body::Bytes;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::HsbError;

/// Media type for FHIR JSON payloads.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Bundle types the backend must receive at its root endpoint.
pub const ROOT_BUNDLE_TYPES: [&str; 2] = ["transaction", "batch"];

/// An inbound bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    fields: Map<String, Value>,
    /// Verbatim text of `entry[i].resource`, by entry index.
    raw_resources: Vec<Option<String>>,
}

#[derive(Deserialize)]
struct RawEntries {
    #[serde(default)]
    entry: Option<Vec<Box<RawValue>>>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    resource: Option<Box<RawValue>>,
}

/// A resource found in `Bundle.entry`.
#[derive(Debug, Clone, Copy)]
pub struct EntryResource<'a> {
    /// Index of the entry in `Bundle.entry`.
    pub entry: usize,
    pub value: &'a Value,
    raw: Option<&'a str>,
}

impl EntryResource<'_> {
    /// The resource exactly as the caller sent it.
    pub fn body(&self) -> Bytes {
        match self.raw {
            Some(raw) => Bytes::copy_from_slice(raw.as_bytes()),
            None => Bytes::from(self.value.to_string()),
        }
    }
}

impl Bundle {
    /// Parse an inbound request body. Anything other than a JSON object is rejected.
    pub fn parse(body: &[u8]) -> Result<Self, HsbError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| HsbError::MalformedBundle(format!("body is not valid JSON: {}", e)))?;

        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                raw_resources: raw_resources(body),
            }),
            other => Err(HsbError::MalformedBundle(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The declared `type`, when it is a string.
    pub fn bundle_type(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// Transaction and batch bundles are processed by the backend at its root.
    pub fn posts_to_root(&self) -> bool {
        self.bundle_type()
            .map(|t| ROOT_BUNDLE_TYPES.contains(&t))
            .unwrap_or(false)
    }

    /// Resources carried by the bundle, with the index of their entry.
    ///
    /// A missing or `null` `entry` is an empty bundle. Entries without a
    /// `resource` are passed over.
    pub fn resources(&self) -> Result<Vec<EntryResource<'_>>, HsbError> {
        let entries = match self.fields.get("entry") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(HsbError::MalformedBundle(format!(
                    "'entry' must be an array, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry.get("resource") {
                None | Some(Value::Null) => None,
                Some(value) => Some(EntryResource {
                    entry: index,
                    value,
                    raw: self.raw_resources.get(index).and_then(|r| r.as_deref()),
                }),
            })
            .collect())
    }
}

/// Original text of every `entry[].resource`. Empty when `entry` is not an array.
fn raw_resources(body: &[u8]) -> Vec<Option<String>> {
    let entries = match serde_json::from_slice::<RawEntries>(body) {
        Ok(RawEntries { entry: Some(entries) }) => entries,
        _ => return Vec::new(),
    };

    entries
        .iter()
        .map(|entry| {
            serde_json::from_str::<RawEntry>(entry.get())
                .ok()
                .and_then(|e| e.resource)
                .map(|raw| raw.get().to_string())
        })
        .collect()
}

/// Why a resource could not be routed to an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    MissingResourceType,
    MissingId,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAnObject => write!(f, "resource is not a JSON object"),
            SkipReason::MissingResourceType => write!(f, "resource has no resourceType"),
            SkipReason::MissingId => write!(f, "resource has no id"),
        }
    }
}

/// Type and logical id of a resource: the upsert key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub resource_type: String,
    pub id: String,
}

impl ResourceKey {
    pub fn from_resource(resource: &Value) -> Result<Self, SkipReason> {
        let fields = resource.as_object().ok_or(SkipReason::NotAnObject)?;

        let resource_type = non_empty_str(fields.get("resourceType"))
            .ok_or(SkipReason::MissingResourceType)?;
        let id = non_empty_str(fields.get("id")).ok_or(SkipReason::MissingId)?;

        Ok(Self {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(value: Value) -> Bundle {
        Bundle::parse(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_root_types() {
        assert!(bundle(json!({"type": "transaction"})).posts_to_root());
        assert!(bundle(json!({"type": "batch"})).posts_to_root());
        assert!(!bundle(json!({"type": "collection"})).posts_to_root());
        assert!(!bundle(json!({"type": "Transaction"})).posts_to_root());
        assert!(!bundle(json!({"type": 7})).posts_to_root());
        assert!(!bundle(json!({})).posts_to_root());
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(matches!(Bundle::parse(b"not json"), Err(HsbError::MalformedBundle(_))));
        assert!(matches!(Bundle::parse(b"[1, 2]"), Err(HsbError::MalformedBundle(_))));
        assert!(matches!(Bundle::parse(b""), Err(HsbError::MalformedBundle(_))));
    }

    #[test]
    fn test_resources_skip_empty_entries() {
        let b = bundle(json!({
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "1"}},
                {"fullUrl": "urn:uuid:no-resource"},
                {"resource": null},
                {"resource": {"resourceType": "Observation", "id": "2"}}
            ]
        }));

        let resources = b.resources().unwrap();
        let indexes: Vec<_> = resources.iter().map(|r| r.entry).collect();
        assert_eq!(indexes, vec![0, 3]);
    }

    #[test]
    fn test_resource_body_is_verbatim() {
        let raw = br#"{"entry": [
            "not an entry",
            {"resource": {"resourceType":"Observation","id":"o1","valueQuantity":{"value":1.50,"unit":"mg"}}}
        ]}"#;
        let b = Bundle::parse(raw).unwrap();

        let resources = b.resources().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].entry, 1);
        assert_eq!(
            resources[0].body(),
            Bytes::from_static(
                br#"{"resourceType":"Observation","id":"o1","valueQuantity":{"value":1.50,"unit":"mg"}}"#
            )
        );
    }

    #[test]
    fn test_missing_entry_is_empty() {
        assert!(bundle(json!({"type": "batch"})).resources().unwrap().is_empty());
        assert!(bundle(json!({"entry": null})).resources().unwrap().is_empty());
    }

    #[test]
    fn test_entry_must_be_array() {
        let b = bundle(json!({"entry": {"resource": {}}}));
        assert!(matches!(b.resources(), Err(HsbError::MalformedBundle(_))));
    }

    #[test]
    fn test_resource_key() {
        let key = ResourceKey::from_resource(&json!({"resourceType": "Patient", "id": "123"})).unwrap();
        assert_eq!(key.to_string(), "Patient/123");

        assert_eq!(
            ResourceKey::from_resource(&json!({"id": "123"})),
            Err(SkipReason::MissingResourceType)
        );
        assert_eq!(
            ResourceKey::from_resource(&json!({"resourceType": "Patient"})),
            Err(SkipReason::MissingId)
        );
        assert_eq!(
            ResourceKey::from_resource(&json!({"resourceType": "Patient", "id": 123})),
            Err(SkipReason::MissingId)
        );
        assert_eq!(ResourceKey::from_resource(&json!("Patient")), Err(SkipReason::NotAnObject));
    }
}
