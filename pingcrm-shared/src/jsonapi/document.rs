/// JSON:API document types
///
/// Top-level envelopes for success (`data`, `links`, `meta`) and failure
/// (`errors`) responses, the resource object itself, and the request document
/// accepted by create and update endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::ResourceKind;

/// Media type of every document produced by the API
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Links object (`self`, `first`, ...)
pub type Links = BTreeMap<String, String>;

/// Reference to another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub id: String,
}

/// To-one relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: ResourceIdentifier,
}

/// A serialized record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: ResourceKind,

    /// String form of the primary key
    pub id: String,

    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
}

/// Top-level success document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<D> {
    pub data: D,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Document<ResourceObject> {
    /// Single-resource document with a `self` link
    pub fn single(resource: ResourceObject, self_link: String) -> Self {
        let mut links = Links::new();
        links.insert("self".to_string(), self_link);

        Self {
            data: resource,
            links: Some(links),
            meta: None,
        }
    }
}

impl Document<Vec<ResourceObject>> {
    /// Collection document
    ///
    /// `meta.total` is the number of resources in this page, not the size of
    /// the whole collection.
    pub fn collection(resources: Vec<ResourceObject>, links: Links) -> Self {
        let total = resources.len();

        Self {
            data: resources,
            links: Some(links),
            meta: Some(json!({ "total": total })),
        }
    }
}

/// Body of a create or update request
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDocument<A> {
    pub data: RequestData<A>,
}

/// Primary data of a request document
///
/// `type` is kept as a plain string so a mismatch can be reported as a
/// validation failure instead of a parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestData<A> {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub id: Option<String>,

    pub attributes: A,
}

/// Location of the offending part of a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A single JSON:API error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// HTTP status code as a string
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Top-level failure document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    pub fn single(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> ResourceObject {
        ResourceObject {
            kind: ResourceKind::Accounts,
            id: id.to_string(),
            attributes: Map::new(),
            relationships: None,
        }
    }

    #[test]
    fn test_collection_total_counts_page() {
        let doc = Document::collection(vec![resource("1"), resource("2")], Links::new());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["meta"]["total"], 2);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_single_omits_meta_and_relationships() {
        let doc = Document::single(resource("42"), "/api/v1/accounts/42".to_string());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["data"]["type"], "accounts");
        assert_eq!(json["links"]["self"], "/api/v1/accounts/42");
        assert!(json.get("meta").is_none());
        assert!(json["data"].get("relationships").is_none());
    }

    #[test]
    fn test_error_object_skips_empty_members() {
        let doc = ErrorDocument::single(ErrorObject {
            status: "404".to_string(),
            code: None,
            title: "Account not found".to_string(),
            detail: None,
            source: None,
            meta: None,
        });
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            json,
            json!({ "errors": [{ "status": "404", "title": "Account not found" }] })
        );
    }

    #[test]
    fn test_request_document_parses_without_id() {
        let doc: RequestDocument<Value> = serde_json::from_value(json!({
            "data": { "type": "accounts", "attributes": { "name": "Acme" } }
        }))
        .unwrap();

        assert_eq!(doc.data.kind, "accounts");
        assert!(doc.data.id.is_none());
        assert_eq!(doc.data.attributes["name"], "Acme");
    }
}
