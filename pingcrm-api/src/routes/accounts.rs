/// Account endpoints
///
/// Accounts take a single `name` attribute on both create and update.

use axum::async_trait;
use pingcrm_shared::{
    models::account::{Account, AccountFields},
    store::{Store, UnitOfWork},
};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiResult;
use crate::routes::resources::Resource;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AccountAttributes {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
}

#[async_trait]
impl Resource for Account {
    type Create = AccountAttributes;
    type Update = AccountAttributes;
    type Staged = AccountFields;

    fn store(uow: &mut dyn UnitOfWork) -> &mut dyn Store<Self> {
        uow.accounts()
    }

    async fn prepare_create(attrs: AccountAttributes) -> ApiResult<AccountFields> {
        Ok(AccountFields { name: attrs.name })
    }

    async fn stage_update(attrs: AccountAttributes) -> ApiResult<AccountFields> {
        attrs.validate()?;
        Self::prepare_create(attrs).await
    }

    fn prepare_update(_current: &Self, fields: AccountFields) -> ApiResult<AccountFields> {
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_is_rejected() {
        let attrs = AccountAttributes {
            name: String::new(),
        };
        assert!(attrs.validate().is_err());
    }
}
