use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Json, Path, Query};
use axum::http::{StatusCode, Uri};
use fleet_register_sdk::{Maintenance, MaintenancePatch, NewMaintenance, Page};
use fleet_security::SecurityContext;
use uuid::Uuid;

use super::problem_at;
use crate::api::rest::dto::MaintenanceListQuery;
use crate::api::rest::problem::ApiResult;
use crate::domain::service::MachineSource;
use crate::module::ConcreteAppServices;

#[tracing::instrument(skip(svc, ctx, query, uri))]
pub(crate) async fn list_maintenance(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    query: Result<Query<MaintenanceListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Maintenance>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts();
    let records = svc
        .maintenance
        .list_maintenance(&ctx, &filter, page)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(records))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(maintenance.id = %id))]
pub(crate) async fn get_maintenance(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Maintenance>> {
    let record = svc
        .maintenance
        .get_maintenance(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(record))
}

/// Create a record whose machine is named in the body.
#[tracing::instrument(skip(svc, ctx, body, uri))]
pub(crate) async fn create_maintenance(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    body: Result<Json<NewMaintenance>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Maintenance>)> {
    let Json(new) = body?;
    let record = svc
        .maintenance
        .create_maintenance(&ctx, MachineSource::Body, new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Create a record on the machine addressed by the path.
#[tracing::instrument(skip(svc, ctx, body, uri), fields(machine.id = %machine_id))]
pub(crate) async fn create_machine_maintenance(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(machine_id): Path<Uuid>,
    body: Result<Json<NewMaintenance>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Maintenance>)> {
    let Json(new) = body?;
    let record = svc
        .maintenance
        .create_maintenance(&ctx, MachineSource::Path(machine_id), new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[tracing::instrument(skip(svc, ctx, body, uri), fields(maintenance.id = %id))]
pub(crate) async fn update_maintenance(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
    body: Result<Json<MaintenancePatch>, JsonRejection>,
) -> ApiResult<Json<Maintenance>> {
    let Json(patch) = body?;
    let record = svc
        .maintenance
        .update_maintenance(&ctx, id, patch)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(record))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(maintenance.id = %id))]
pub(crate) async fn delete_maintenance(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    svc.maintenance
        .delete_maintenance(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(StatusCode::NO_CONTENT)
}
