/// Contact endpoints
///
/// Unlike the other resources, contact updates are partial: attributes left
/// out of the document keep their current value and an explicit `null`
/// clears an optional attribute. The merged record is validated as a whole.
/// `account_id` cannot be changed after creation.

use axum::async_trait;
use pingcrm_shared::{
    models::contact::{Contact, ContactFields},
    models::ResourceKind,
    store::{Store, UnitOfWork},
};
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::error::{ApiError, ApiResult, Failure};
use crate::routes::resources::Resource;

/// Full contact attributes, as accepted on create
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactAttributes {
    pub account_id: i64,

    pub organization_id: Option<i64>,

    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

/// Partial contact attributes, as accepted on update
///
/// Outer `None` means the attribute was absent; `Some(None)` means it was
/// sent as `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub organization_id: Option<Option<i64>>,

    #[serde(default, deserialize_with = "double_option")]
    pub first_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub last_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub region: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub country: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub postal_code: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from an absent key
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn merge<T: Clone>(patch: Option<Option<T>>, current: &Option<T>) -> Option<T> {
    match patch {
        Some(value) => value,
        None => current.clone(),
    }
}

fn merge_required(
    field: &str,
    patch: Option<Option<String>>,
    current: &str,
) -> ApiResult<String> {
    match patch {
        None => Ok(current.to_string()),
        Some(Some(value)) => Ok(value),
        Some(None) => Err(ApiError::Validation(
            Failure::titled(format!("{} must not be null", field))
                .code("invalid_attribute")
                .pointer(format!("/data/attributes/{}", field)),
        )),
    }
}

impl ContactPatch {
    /// Applies the patch on top of `current`
    pub fn apply(self, current: &Contact) -> ApiResult<ContactAttributes> {
        Ok(ContactAttributes {
            account_id: current.account_id,
            organization_id: merge(self.organization_id, &current.organization_id),
            first_name: merge_required("first_name", self.first_name, &current.first_name)?,
            last_name: merge_required("last_name", self.last_name, &current.last_name)?,
            email: merge(self.email, &current.email),
            phone: merge(self.phone, &current.phone),
            address: merge(self.address, &current.address),
            city: merge(self.city, &current.city),
            region: merge(self.region, &current.region),
            country: merge(self.country, &current.country),
            postal_code: merge(self.postal_code, &current.postal_code),
        })
    }
}

impl From<ContactAttributes> for ContactFields {
    fn from(attrs: ContactAttributes) -> Self {
        Self {
            account_id: attrs.account_id,
            organization_id: attrs.organization_id,
            first_name: attrs.first_name,
            last_name: attrs.last_name,
            email: attrs.email,
            phone: attrs.phone,
            address: attrs.address,
            city: attrs.city,
            region: attrs.region,
            country: attrs.country,
            postal_code: attrs.postal_code,
        }
    }
}

async fn ensure_organization_exists(
    uow: &mut dyn UnitOfWork,
    fields: &ContactFields,
) -> ApiResult<()> {
    let Some(organization_id) = fields.organization_id else {
        return Ok(());
    };

    if uow.organizations().get(organization_id).await?.is_none() {
        return Err(ApiError::Validation(
            Failure::titled(format!(
                "{} not found",
                ResourceKind::Organizations.label()
            ))
            .detail(format!("No organization with id {}", organization_id))
            .code("invalid_reference")
            .pointer("/data/attributes/organization_id"),
        ));
    }
    Ok(())
}

#[async_trait]
impl Resource for Contact {
    type Create = ContactAttributes;
    type Update = ContactPatch;
    type Staged = ContactPatch;

    fn store(uow: &mut dyn UnitOfWork) -> &mut dyn Store<Self> {
        uow.contacts()
    }

    async fn prepare_create(attrs: ContactAttributes) -> ApiResult<ContactFields> {
        Ok(attrs.into())
    }

    async fn stage_update(patch: ContactPatch) -> ApiResult<ContactPatch> {
        Ok(patch)
    }

    fn prepare_update(current: &Self, patch: ContactPatch) -> ApiResult<ContactFields> {
        let merged = patch.apply(current)?;
        merged.validate()?;
        Ok(merged.into())
    }

    async fn before_insert(uow: &mut dyn UnitOfWork, fields: &ContactFields) -> ApiResult<()> {
        ensure_organization_exists(uow, fields).await
    }

    async fn before_update(
        uow: &mut dyn UnitOfWork,
        _id: i64,
        fields: &ContactFields,
    ) -> ApiResult<()> {
        ensure_organization_exists(uow, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pingcrm_shared::models::Entity;
    use serde_json::json;

    fn current() -> Contact {
        let now = Utc::now();
        Contact::from_fields(
            1,
            ContactFields {
                account_id: 3,
                organization_id: Some(4),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: Some("jane@example.com".to_string()),
                city: Some("Paris".to_string()),
                ..Default::default()
            },
            now,
            now,
        )
    }

    fn patch(value: serde_json::Value) -> ContactPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_absent_attributes_keep_current_values() {
        let merged = patch(json!({ "city": "Lyon" })).apply(&current()).unwrap();

        assert_eq!(merged.city.as_deref(), Some("Lyon"));
        assert_eq!(merged.first_name, "Jane");
        assert_eq!(merged.email.as_deref(), Some("jane@example.com"));
        assert_eq!(merged.organization_id, Some(4));
        assert_eq!(merged.account_id, 3);
    }

    #[test]
    fn test_null_clears_optional_attribute() {
        let merged = patch(json!({ "organization_id": null, "email": null }))
            .apply(&current())
            .unwrap();

        assert_eq!(merged.organization_id, None);
        assert_eq!(merged.email, None);
        assert_eq!(merged.city.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_null_required_attribute_is_rejected() {
        assert!(patch(json!({ "first_name": null })).apply(&current()).is_err());
    }

    #[test]
    fn test_merged_state_is_validated() {
        let merged = patch(json!({ "email": "nope" })).apply(&current()).unwrap();
        assert!(merged.validate().is_err());
    }
}
