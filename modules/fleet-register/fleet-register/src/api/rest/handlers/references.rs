use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Json, Path, Query};
use axum::http::{StatusCode, Uri};
use fleet_register_sdk::{NewReferenceEntry, Page, ReferenceEntry, ReferenceEntryPatch};
use fleet_security::SecurityContext;
use uuid::Uuid;

use super::problem_at;
use crate::api::rest::dto::ReferenceListQuery;
use crate::api::rest::problem::ApiResult;
use crate::module::ConcreteAppServices;

#[tracing::instrument(skip(svc, ctx, query, uri))]
pub(crate) async fn list_references(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    query: Result<Query<ReferenceListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<ReferenceEntry>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts();
    let entries = svc
        .references
        .list_references(&ctx, &filter, page)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(entries))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(reference.id = %id))]
pub(crate) async fn get_reference(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReferenceEntry>> {
    let entry = svc
        .references
        .get_reference(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(entry))
}

#[tracing::instrument(skip(svc, ctx, body, uri))]
pub(crate) async fn create_reference(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    body: Result<Json<NewReferenceEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReferenceEntry>)> {
    let Json(new) = body?;
    let entry = svc
        .references
        .create_reference(&ctx, new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[tracing::instrument(skip(svc, ctx, body, uri), fields(reference.id = %id))]
pub(crate) async fn update_reference(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
    body: Result<Json<ReferenceEntryPatch>, JsonRejection>,
) -> ApiResult<Json<ReferenceEntry>> {
    let Json(patch) = body?;
    let entry = svc
        .references
        .update_reference(&ctx, id, patch)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(entry))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(reference.id = %id))]
pub(crate) async fn delete_reference(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    svc.references
        .delete_reference(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(StatusCode::NO_CONTENT)
}
