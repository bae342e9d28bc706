use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Json, Path, Query};
use axum::http::{StatusCode, Uri};
use fleet_register_sdk::{Me, NewParty, Page, Party};
use fleet_security::SecurityContext;
use uuid::Uuid;

use super::problem_at;
use crate::api::rest::dto::PartyListQuery;
use crate::api::rest::problem::ApiResult;
use crate::module::ConcreteAppServices;

/// The caller's party, memberships and effective role.
#[tracing::instrument(skip(svc, ctx, uri))]
pub(crate) async fn me(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
) -> ApiResult<Json<Me>> {
    let me = svc.parties.me(&ctx).await.map_err(problem_at(&uri))?;
    Ok(Json(me))
}

#[tracing::instrument(skip(svc, ctx, query, uri))]
pub(crate) async fn list_parties(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    query: Result<Query<PartyListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Party>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts();
    let parties = svc
        .parties
        .list_parties(&ctx, &filter, page)
        .await
        .map_err(problem_at(&uri))?;
    Ok(Json(parties))
}

#[tracing::instrument(skip(svc, ctx, body, uri))]
pub(crate) async fn create_party(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    body: Result<Json<NewParty>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Party>)> {
    let Json(new) = body?;
    let party = svc
        .parties
        .create_party(&ctx, new)
        .await
        .map_err(problem_at(&uri))?;
    Ok((StatusCode::CREATED, Json(party)))
}

#[tracing::instrument(skip(svc, ctx, uri), fields(party.id = %id))]
pub(crate) async fn delete_party(
    uri: Uri,
    Extension(ctx): Extension<SecurityContext>,
    Extension(svc): Extension<Arc<ConcreteAppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    svc.parties
        .delete_party(&ctx, id)
        .await
        .map_err(problem_at(&uri))?;
    Ok(StatusCode::NO_CONTENT)
}
