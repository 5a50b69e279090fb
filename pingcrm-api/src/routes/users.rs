/// User endpoints
///
/// Create and update both take the full attribute set, including a plaintext
/// `password` that is hashed before it reaches the store. Email addresses are
/// unique: a taken address is rejected before the write, and a concurrent
/// insert that slips past the check is caught by the `users_email_key`
/// constraint and reported the same way.

use axum::async_trait;
use pingcrm_shared::{
    models::user::{User, UserFields},
    password::hash_password,
    store::{Store, UnitOfWork},
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult, Failure, DUPLICATE_EMAIL_TITLE};
use crate::routes::resources::Resource;

#[derive(Clone, Deserialize, Validate)]
pub struct UserAttributes {
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,

    pub account_id: i64,

    #[serde(default)]
    pub owner: bool,
}

fn duplicate_email() -> ApiError {
    ApiError::Validation(
        Failure::titled(DUPLICATE_EMAIL_TITLE)
            .code("duplicate")
            .pointer("/data/attributes/email"),
    )
}

#[async_trait]
impl Resource for User {
    type Create = UserAttributes;
    type Update = UserAttributes;
    type Staged = UserFields;

    fn store(uow: &mut dyn UnitOfWork) -> &mut dyn Store<Self> {
        uow.users()
    }

    async fn prepare_create(attrs: UserAttributes) -> ApiResult<UserFields> {
        let password = attrs.password;
        let encrypted_password = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))??;

        Ok(UserFields {
            account_id: attrs.account_id,
            first_name: attrs.first_name,
            last_name: attrs.last_name,
            email: attrs.email,
            owner: attrs.owner,
            encrypted_password,
        })
    }

    /// Hashes the new password before any store work starts
    async fn stage_update(attrs: UserAttributes) -> ApiResult<UserFields> {
        attrs.validate()?;
        Self::prepare_create(attrs).await
    }

    fn prepare_update(_current: &Self, fields: UserFields) -> ApiResult<UserFields> {
        Ok(fields)
    }

    async fn before_insert(uow: &mut dyn UnitOfWork, fields: &UserFields) -> ApiResult<()> {
        if uow.find_user_by_email(&fields.email).await?.is_some() {
            return Err(duplicate_email());
        }
        Ok(())
    }

    async fn before_update(uow: &mut dyn UnitOfWork, id: i64, fields: &UserFields) -> ApiResult<()> {
        match uow.find_user_by_email(&fields.email).await? {
            Some(other) if other.id != id => Err(duplicate_email()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pingcrm_shared::models::Entity;

    fn attrs(email: &str) -> UserAttributes {
        UserAttributes {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
            account_id: 1,
            owner: false,
        }
    }

    #[test]
    fn test_email_must_be_valid() {
        assert!(attrs("ada@example.com").validate().is_ok());
        assert!(attrs("not-an-email").validate().is_err());
    }

    #[test]
    fn test_owner_defaults_to_false() {
        let attrs: UserAttributes = serde_json::from_value(serde_json::json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "password": "secret",
            "account_id": 1
        }))
        .unwrap();
        assert!(!attrs.owner);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let fields = User::prepare_create(attrs("ada@example.com")).await.unwrap();

        assert_ne!(fields.encrypted_password, "secret");
        assert!(fields.encrypted_password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_update_hashes_while_staging() {
        let staged = User::stage_update(attrs("grace@example.com")).await.unwrap();
        assert!(staged.encrypted_password.starts_with("$argon2id$"));

        let current = User::from_fields(
            9,
            UserFields {
                account_id: 1,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                owner: true,
                encrypted_password: "old-hash".to_string(),
            },
            Utc::now(),
            Utc::now(),
        );

        let fields = User::prepare_update(&current, staged.clone()).unwrap();
        assert_eq!(fields.encrypted_password, staged.encrypted_password);
        assert_eq!(fields.email, "grace@example.com");
        assert!(!fields.owner);
    }

    #[tokio::test]
    async fn test_invalid_update_fails_before_hashing() {
        let mut invalid = attrs("not-an-email");
        invalid.password = String::new();

        assert!(matches!(
            User::stage_update(invalid).await,
            Err(ApiError::Validation(_))
        ));
    }
}
