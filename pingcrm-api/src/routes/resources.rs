/// Generic JSON:API resource endpoints
///
/// One set of handlers serves every entity type. Each type plugs in through
/// the [`Resource`] trait, which names its request attribute types, turns
/// them into storable fields and runs type-specific checks. Everything else
/// (unit of work, serialization, envelopes, links, status codes) is shared.
///
/// # Endpoints
///
/// ```text
/// GET    /api/v1/{type}?skip=&limit=   list
/// POST   /api/v1/{type}                create (201 + Location)
/// GET    /api/v1/{type}/{id}           read
/// PUT    /api/v1/{type}/{id}           update
/// DELETE /api/v1/{type}/{id}           delete (returns the deleted record)
/// ```
///
/// Request bodies are JSON:API documents:
///
/// ```json
/// { "data": { "type": "accounts", "attributes": { "name": "Acme" } } }
/// ```

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pingcrm_shared::{
    jsonapi::{
        document::{Links, RequestData, RequestDocument},
        serialize, serialize_many, Document, ResourceObject,
    },
    models::{Entity, ResourceKind},
    store::{Store, UnitOfWork},
};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::info;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, Failure},
    response::JsonApi,
};

/// Mount point of every resource route
pub const API_PREFIX: &str = "/api/v1";

/// An entity type exposed over HTTP
#[async_trait]
pub trait Resource: Entity {
    /// Attributes accepted on create
    type Create: DeserializeOwned + Validate + Send + 'static;

    /// Attributes accepted on update
    type Update: DeserializeOwned + Send + 'static;

    /// Update attributes once everything not needing the stored record is done
    type Staged: Send + 'static;

    /// This type's view of a unit of work
    fn store(uow: &mut dyn UnitOfWork) -> &mut dyn Store<Self>;

    /// Converts validated create attributes into storable fields
    async fn prepare_create(attrs: Self::Create) -> ApiResult<Self::Fields>;

    /// Validates update attributes and does any slow work on them
    ///
    /// Runs before the unit of work is opened, so nothing here may depend on
    /// stored state.
    async fn stage_update(attrs: Self::Update) -> ApiResult<Self::Staged>;

    /// Merges staged attributes into the current record
    fn prepare_update(current: &Self, staged: Self::Staged) -> ApiResult<Self::Fields>;

    /// Checks run inside the unit of work before inserting
    async fn before_insert(_uow: &mut dyn UnitOfWork, _fields: &Self::Fields) -> ApiResult<()> {
        Ok(())
    }

    /// Checks run inside the unit of work before updating record `id`
    async fn before_update(
        _uow: &mut dyn UnitOfWork,
        _id: i64,
        _fields: &Self::Fields,
    ) -> ApiResult<()> {
        Ok(())
    }
}

/// Registers the five endpoints of `R`
pub fn routes<R: Resource>() -> Router<AppState> {
    let kind = R::DESCRIPTOR.kind.as_str();

    Router::new()
        .route(&format!("/{}", kind), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{}/:id", kind),
            get(read::<R>).put(update::<R>).delete(delete::<R>),
        )
}

/// `/api/v1/{type}/{id}`
pub fn self_link(kind: ResourceKind, id: i64) -> String {
    format!("{}/{}/{}", API_PREFIX, kind, id)
}

/// Numeric id from the URL path
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(ResourceId(id))
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Effective list window
///
/// `skip` is clamped to zero or more and `limit` to `1..=max_page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub skip: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn clamped(skip: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit.max(1)),
        }
    }

    /// `self` and `first` links for a list of `kind`
    pub fn links(&self, kind: ResourceKind) -> Links {
        let mut links = Links::new();
        links.insert(
            "self".to_string(),
            format!("{}/{}?skip={}&limit={}", API_PREFIX, kind, self.skip, self.limit),
        );
        links.insert(
            "first".to_string(),
            format!("{}/{}?skip=0&limit={}", API_PREFIX, kind, self.limit),
        );
        links
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageParams {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state).await?;
        let api = &state.config.api;

        Ok(PageParams::clamped(
            query.skip,
            query.limit,
            api.default_page_size,
            api.max_page_size,
        ))
    }
}

/// Primary data of a JSON:API request document
pub struct JsonApiBody<A>(pub RequestData<A>);

#[async_trait]
impl<S, A> FromRequest<S> for JsonApiBody<A>
where
    S: Send + Sync,
    A: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(document) = Json::<RequestDocument<A>>::from_request(req, state).await?;
        Ok(JsonApiBody(document.data))
    }
}

/// Rejects documents whose `type` (or `id`, on update) does not match the URL
fn check_document<A>(kind: ResourceKind, data: &RequestData<A>, id: Option<i64>) -> ApiResult<()> {
    if data.kind != kind.as_str() {
        return Err(ApiError::Validation(
            Failure::titled("Resource type does not match the endpoint")
                .detail(format!("Expected `{}`, got `{}`", kind, data.kind))
                .code("type_mismatch")
                .pointer("/data/type"),
        ));
    }

    if let (Some(path_id), Some(doc_id)) = (id, data.id.as_deref()) {
        if doc_id != path_id.to_string() {
            return Err(ApiError::Validation(
                Failure::titled("Resource id does not match the URL")
                    .detail(format!("Expected `{}`, got `{}`", path_id, doc_id))
                    .code("id_mismatch")
                    .pointer("/data/id"),
            ));
        }
    }

    Ok(())
}

fn single<R: Resource>(record: &R) -> ApiResult<JsonApi<Document<ResourceObject>>> {
    let link = self_link(R::DESCRIPTOR.kind, record.id());
    Ok(JsonApi(Document::single(serialize(record)?, link)))
}

/// `GET /api/v1/{type}`
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    page: PageParams,
) -> ApiResult<JsonApi<Document<Vec<ResourceObject>>>> {
    let mut uow = state.store.begin().await?;
    let records = R::store(uow.as_mut()).list(page.skip, page.limit).await?;
    uow.commit().await?;

    let resources = serialize_many(&records)?;
    Ok(JsonApi(Document::collection(
        resources,
        page.links(R::DESCRIPTOR.kind),
    )))
}

/// `POST /api/v1/{type}`
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    JsonApiBody(data): JsonApiBody<R::Create>,
) -> ApiResult<Response> {
    let kind = R::DESCRIPTOR.kind;
    check_document(kind, &data, None)?;
    data.attributes.validate()?;

    let fields = R::prepare_create(data.attributes).await?;

    let mut uow = state.store.begin().await?;
    R::before_insert(uow.as_mut(), &fields).await?;
    let record = R::store(uow.as_mut()).insert(fields).await?;
    uow.commit().await?;

    info!(resource = %kind, id = record.id(), "Created resource");

    let location = self_link(kind, record.id());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        single(&record)?,
    )
        .into_response())
}

/// `GET /api/v1/{type}/{id}`
pub async fn read<R: Resource>(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<JsonApi<Document<ResourceObject>>> {
    let mut uow = state.store.begin().await?;
    let record = R::store(uow.as_mut())
        .get(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(R::DESCRIPTOR.kind))?;
    uow.commit().await?;

    single(&record)
}

/// `PUT /api/v1/{type}/{id}`
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    JsonApiBody(data): JsonApiBody<R::Update>,
) -> ApiResult<JsonApi<Document<ResourceObject>>> {
    let kind = R::DESCRIPTOR.kind;
    check_document(kind, &data, Some(id))?;
    let staged = R::stage_update(data.attributes).await?;

    let mut uow = state.store.begin().await?;
    let current = R::store(uow.as_mut())
        .get(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(kind))?;

    let fields = R::prepare_update(&current, staged)?;
    R::before_update(uow.as_mut(), id, &fields).await?;

    let record = R::store(uow.as_mut())
        .update(id, fields)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(kind))?;
    uow.commit().await?;

    info!(resource = %kind, id, "Updated resource");
    single(&record)
}

/// `DELETE /api/v1/{type}/{id}`
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<JsonApi<Document<ResourceObject>>> {
    let kind = R::DESCRIPTOR.kind;

    let mut uow = state.store.begin().await?;
    let snapshot = R::store(uow.as_mut())
        .get(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(kind))?;

    let removed = R::store(uow.as_mut())
        .delete(id)
        .await
        .map_err(ApiError::from_delete)?;
    uow.commit().await?;

    info!(resource = %kind, id, "Deleted resource");
    single(&removed.unwrap_or(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_clamping() {
        assert_eq!(
            PageParams::clamped(None, None, 100, 1000),
            PageParams { skip: 0, limit: 100 }
        );
        assert_eq!(
            PageParams::clamped(Some(-3), Some(0), 100, 1000),
            PageParams { skip: 0, limit: 1 }
        );
        assert_eq!(
            PageParams::clamped(Some(20), Some(5000), 100, 1000),
            PageParams { skip: 20, limit: 1000 }
        );
    }

    #[test]
    fn test_links() {
        let links = PageParams { skip: 10, limit: 2 }.links(ResourceKind::Contacts);

        assert_eq!(links["self"], "/api/v1/contacts?skip=10&limit=2");
        assert_eq!(links["first"], "/api/v1/contacts?skip=0&limit=2");
        assert_eq!(self_link(ResourceKind::Users, 7), "/api/v1/users/7");
    }

    #[test]
    fn test_check_document() {
        let data = RequestData {
            kind: "accounts".to_string(),
            id: Some("4".to_string()),
            attributes: (),
        };

        assert!(check_document(ResourceKind::Accounts, &data, Some(4)).is_ok());
        assert!(check_document(ResourceKind::Accounts, &data, None).is_ok());
        assert!(check_document(ResourceKind::Accounts, &data, Some(5)).is_err());
        assert!(check_document(ResourceKind::Users, &data, Some(4)).is_err());
    }
}
