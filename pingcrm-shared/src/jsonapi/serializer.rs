/// Record to JSON:API resource serialization
///
/// Every entity type carries a static [`ResourceDescriptor`] listing the
/// attributes it exposes and the to-one relationships it resolves through
/// its foreign-key columns. [`serialize`] turns any [`Entity`] into a
/// [`ResourceObject`] using that descriptor:
///
/// - declared attributes present on the record are copied verbatim, nulls
///   included; declared attributes the record lacks are left out
/// - a relationship is emitted only when its foreign key is non-null, and the
///   `relationships` member is left out when none is emitted
/// - `id` is the decimal string form of the primary key
///
/// Output depends only on the record and the descriptor.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::jsonapi::document::{Relationship, ResourceIdentifier, ResourceObject};
use crate::models::{Entity, ResourceKind};

/// A to-one relationship resolved through a foreign-key field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    /// Relationship member name
    pub name: &'static str,

    /// Type of the related resource
    pub related: ResourceKind,

    /// Field of the record holding the related id
    pub foreign_key: &'static str,
}

/// How one entity type is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,

    /// Exposed attribute names
    ///
    /// Only membership matters: attributes are collected into a
    /// `serde_json::Map`, which orders keys itself.
    pub attributes: &'static [&'static str],

    pub relationships: &'static [RelationshipDescriptor],
}

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("Failed to serialize {kind} record: {source}")]
    Json {
        kind: ResourceKind,
        source: serde_json::Error,
    },

    #[error("Serialized {kind} record is not a JSON object")]
    NotAnObject { kind: ResourceKind },
}

/// Serializes one record into a resource object
pub fn serialize<E: Entity>(record: &E) -> Result<ResourceObject, SerializeError> {
    serialize_with(E::DESCRIPTOR, record.id(), record)
}

/// Serializes records in input order
pub fn serialize_many<E: Entity>(records: &[E]) -> Result<Vec<ResourceObject>, SerializeError> {
    records.iter().map(serialize).collect()
}

/// Serializes any record shape against an explicit descriptor
pub fn serialize_with<T: Serialize + ?Sized>(
    descriptor: &ResourceDescriptor,
    id: i64,
    record: &T,
) -> Result<ResourceObject, SerializeError> {
    let kind = descriptor.kind;
    let value = serde_json::to_value(record).map_err(|source| SerializeError::Json { kind, source })?;
    let Value::Object(fields) = value else {
        return Err(SerializeError::NotAnObject { kind });
    };

    let mut attributes = Map::new();
    for name in descriptor.attributes {
        if let Some(value) = fields.get(*name) {
            attributes.insert((*name).to_string(), value.clone());
        }
    }

    let mut relationships = BTreeMap::new();
    for rel in descriptor.relationships {
        let related_id = match fields.get(rel.foreign_key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        relationships.insert(
            rel.name.to_string(),
            Relationship {
                data: ResourceIdentifier {
                    kind: rel.related,
                    id: related_id,
                },
            },
        );
    }

    Ok(ResourceObject {
        kind,
        id: id.to_string(),
        attributes,
        relationships: (!relationships.is_empty()).then_some(relationships),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contact::{Contact, ContactFields};
    use crate::models::organization::{Organization, OrganizationFields};
    use crate::models::user::{User, UserFields};
    use crate::models::Account;
    use chrono::Utc;
    use serde_json::json;

    fn contact(organization_id: Option<i64>) -> Contact {
        let now = Utc::now();
        Contact::from_fields(
            42,
            ContactFields {
                account_id: 1,
                organization_id,
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                city: Some("Paris".to_string()),
                ..Default::default()
            },
            now,
            now,
        )
    }

    fn user() -> User {
        let now = Utc::now();
        User::from_fields(
            5,
            UserFields {
                account_id: 1,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                owner: false,
                encrypted_password: "secret-hash".to_string(),
            },
            now,
            now,
        )
    }

    #[test]
    fn test_id_is_stringified() {
        let resource = serialize(&contact(None)).unwrap();
        assert_eq!(resource.id, "42");
        assert_eq!(resource.kind, ResourceKind::Contacts);
    }

    #[test]
    fn test_id_is_stringified_for_every_type() {
        let now = Utc::now();
        let account = Account::from_fields(
            11,
            crate::models::account::AccountFields {
                name: "Acme".to_string(),
            },
            now,
            now,
        );
        let organization = Organization::from_fields(
            12,
            OrganizationFields {
                account_id: 11,
                name: "Globex".to_string(),
                ..Default::default()
            },
            now,
            now,
        );

        assert_eq!(serialize(&account).unwrap().id, "11");
        assert_eq!(serialize(&organization).unwrap().id, "12");
        assert_eq!(serialize(&user()).unwrap().id, "5");
        assert_eq!(serialize(&contact(None)).unwrap().id, "42");
    }

    #[test]
    fn test_attribute_keys_match_descriptor() {
        let resource = serialize(&contact(Some(3))).unwrap();

        let mut emitted: Vec<&str> = resource.attributes.keys().map(String::as_str).collect();
        let mut declared = Contact::DESCRIPTOR.attributes.to_vec();
        emitted.sort_unstable();
        declared.sort_unstable();

        assert_eq!(emitted, declared);
    }

    #[test]
    fn test_null_foreign_key_omits_relationship() {
        let resource = serialize(&contact(None)).unwrap();
        let rels = resource.relationships.unwrap();

        assert!(rels.contains_key("account"));
        assert!(!rels.contains_key("organization"));
        assert_eq!(rels["account"].data.id, "1");
        assert_eq!(rels["account"].data.kind, ResourceKind::Accounts);
    }

    #[test]
    fn test_present_foreign_key_emits_relationship() {
        let resource = serialize(&contact(Some(7))).unwrap();
        let rels = resource.relationships.unwrap();

        assert_eq!(rels["organization"].data.id, "7");
        assert_eq!(rels["organization"].data.kind, ResourceKind::Organizations);
    }

    #[test]
    fn test_attributes_keep_nulls_and_skip_undeclared() {
        let resource = serialize(&contact(None)).unwrap();

        assert_eq!(resource.attributes["city"], "Paris");
        assert!(resource.attributes["phone"].is_null());
        assert!(!resource.attributes.contains_key("account_id"));
        assert!(!resource.attributes.contains_key("organization_id"));
        assert!(!resource.attributes.contains_key("id"));
    }

    #[test]
    fn test_password_hash_never_leaks() {
        let json = serde_json::to_string(&serialize(&user()).unwrap()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("encrypted_password"));
    }

    #[test]
    fn test_absent_attributes_are_omitted() {
        const PARTIAL: ResourceDescriptor = ResourceDescriptor {
            kind: ResourceKind::Accounts,
            attributes: &["name", "deleted_at"],
            relationships: &[],
        };

        let resource = serialize_with(&PARTIAL, 3, &json!({ "name": "Acme" })).unwrap();
        assert_eq!(resource.attributes.len(), 1);
        assert!(resource.relationships.is_none());
    }

    #[test]
    fn test_rejects_non_object_records() {
        let err = serialize_with(Account::DESCRIPTOR, 1, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, SerializeError::NotAnObject { .. }));
    }

    #[test]
    fn test_batch_preserves_order_and_is_deterministic() {
        let records = vec![contact(Some(2)), contact(None)];
        let first = serialize_many(&records).unwrap();
        let second = serialize_many(&records).unwrap();

        assert_eq!(first, second);
        assert!(first[0].relationships.as_ref().unwrap().contains_key("organization"));
        assert!(!first[1].relationships.as_ref().unwrap().contains_key("organization"));
    }
}
