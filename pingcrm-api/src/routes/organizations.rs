/// Organization endpoints
///
/// Create and update take the full attribute set; optional contact details
/// left out of an update are cleared.

use axum::async_trait;
use pingcrm_shared::{
    models::organization::{Organization, OrganizationFields},
    store::{Store, UnitOfWork},
};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiResult;
use crate::routes::resources::Resource;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrganizationAttributes {
    pub account_id: i64,

    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl From<OrganizationAttributes> for OrganizationFields {
    fn from(attrs: OrganizationAttributes) -> Self {
        Self {
            account_id: attrs.account_id,
            name: attrs.name,
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

#[async_trait]
impl Resource for Organization {
    type Create = OrganizationAttributes;
    type Update = OrganizationAttributes;
    type Staged = OrganizationFields;

    fn store(uow: &mut dyn UnitOfWork) -> &mut dyn Store<Self> {
        uow.organizations()
    }

    async fn prepare_create(attrs: OrganizationAttributes) -> ApiResult<OrganizationFields> {
        Ok(attrs.into())
    }

    async fn stage_update(attrs: OrganizationAttributes) -> ApiResult<OrganizationFields> {
        attrs.validate()?;
        Ok(attrs.into())
    }

    fn prepare_update(
        _current: &Self,
        fields: OrganizationFields,
    ) -> ApiResult<OrganizationFields> {
        Ok(fields)
    }
}
