use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Json, Path, Query};
use axum::http::{StatusCode, Uri};
use fleet_register_sdk::{Complaint, ComplaintPatch, NewComplaint, Page};
use fleet_security::SecurityContext;
use uuid::Uuid;

use super::problem_at;
use crate::api::rest::dto::ComplaintListQuery;
use crate::api::rest::problem::ApiResult;
use crate::domain::service::MachineSource;
use crate::module::ConcreteAppServices;

#[tracing::instrument(skip(svc, ctx, query, uri))]
pub(crate) async fn list_complaints(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    query: Result<Query<ComplaintListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Complaint>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts();
    let complaints = svc
        .complaints
        .list_complaints(&ctx, &filter, page)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(complaints))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(complaint.id = %id))]
pub(crate) async fn get_complaint(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Complaint>> {
    let complaint = svc
        .complaints
        .get_complaint(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(complaint))
}

/// Create a complaint whose machine is named in the body.
#[tracing::instrument(skip(svc, ctx, body, uri))]
pub(crate) async fn create_complaint(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    body: Result<Json<NewComplaint>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Complaint>)> {
    let Json(new) = body?;
    let complaint = svc
        .complaints
        .create_complaint(&ctx, MachineSource::Body, new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// Create a complaint about the machine addressed by the path.
#[tracing::instrument(skip(svc, ctx, body, uri), fields(machine.id = %machine_id))]
pub(crate) async fn create_machine_complaint(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(machine_id): Path<Uuid>,
    body: Result<Json<NewComplaint>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Complaint>)> {
    let Json(new) = body?;
    let complaint = svc
        .complaints
        .create_complaint(&ctx, MachineSource::Path(machine_id), new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

#[tracing::instrument(skip(svc, ctx, body, uri), fields(complaint.id = %id))]
pub(crate) async fn update_complaint(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
    body: Result<Json<ComplaintPatch>, JsonRejection>,
) -> ApiResult<Json<Complaint>> {
    let Json(patch) = body?;
    let complaint = svc
        .complaints
        .update_complaint(&ctx, id, patch)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(complaint))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(complaint.id = %id))]
pub(crate) async fn delete_complaint(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    svc.complaints
        .delete_complaint(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(StatusCode::NO_CONTENT)
}
