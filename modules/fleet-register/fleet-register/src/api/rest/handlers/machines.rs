use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Json, Path, Query};
use axum::http::{StatusCode, Uri};
use fleet_register_sdk::{Machine, MachinePatch, MachinePublic, NewMachine, Page};
use fleet_security::SecurityContext;
use uuid::Uuid;

use super::problem_at;
use crate::api::rest::dto::{MachineListQuery, PublicLookupQuery};
use crate::api::rest::problem::ApiResult;
use crate::module::ConcreteAppServices;

/// Anonymous lookup of a machine's public fields by exact serial number.
#[tracing::instrument(skip(svc, query, uri))]
pub(crate) async fn public_lookup(
    uri: Uri,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    query: Result<Query<PublicLookupQuery>, QueryRejection>,
) -> ApiResult<Json<MachinePublic>> {
    let Query(query) = query?;
    let serial = query.serial.unwrap_or_default();
    let machine = svc
        .machines
        .public_lookup(&serial)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(machine))
}

#[tracing::instrument(skip(svc, ctx, query, uri))]
pub(crate) async fn list_machines(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    query: Result<Query<MachineListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Machine>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts();
    let machines = svc
        .machines
        .list_machines(&ctx, &filter, page)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(machines))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(machine.id = %id))]
pub(crate) async fn get_machine(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Machine>> {
    let machine = svc
        .machines
        .get_machine(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(machine))
}

#[tracing::instrument(skip(svc, ctx, body, uri))]
pub(crate) async fn create_machine(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    body: Result<Json<NewMachine>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Machine>)> {
    let Json(new) = body?;
    let machine = svc
        .machines
        .create_machine(&ctx, new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(machine)))
}

#[tracing::instrument(skip(svc, ctx, body, uri), fields(machine.id = %id))]
pub(crate) async fn update_machine(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
    body: Result<Json<MachinePatch>, JsonRejection>,
) -> ApiResult<Json<Machine>> {
    let Json(patch) = body?;
    let machine = svc
        .machines
        .update_machine(&ctx, id, patch)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(machine))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(machine.id = %id))]
pub(crate) async fn delete_machine(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    svc.machines
        .delete_machine(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(StatusCode::NO_CONTENT)
}
