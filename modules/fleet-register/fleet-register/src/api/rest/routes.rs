use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use super::handlers::{complaints, machines, maintenance, parties, references};
use crate::module::ConcreteAppServices;

const BASE: &str = "/fleet-register/v1";

fn path(suffix: &str) -> String {
    format!("{BASE}{suffix}")
}

/// Register every fleet register route on `router`.
pub(crate) fn register_routes(mut router: Router, services: Arc<ConcreteAppServices>) -> Router {
    router = router
        .route(&path("/public/machines"), get(machines::public_lookup))
        .route(&path("/me"), get(parties::me));

    router = router
        .route(
            &path("/machines"),
            get(machines::list_machines).post(machines::create_machine),
        )
        .route(
            &path("/machines/{id}"),
            get(machines::get_machine)
                .patch(machines::update_machine)
                .delete(machines::delete_machine),
        )
        .route(
            &path("/machines/{id}/maintenance"),
            post(maintenance::create_machine_maintenance),
        )
        .route(
            &path("/machines/{id}/complaints"),
            post(complaints::create_machine_complaint),
        );

    router = router
        .route(
            &path("/maintenance"),
            get(maintenance::list_maintenance).post(maintenance::create_maintenance),
        )
        .route(
            &path("/maintenance/{id}"),
            get(maintenance::get_maintenance)
                .patch(maintenance::update_maintenance)
                .delete(maintenance::delete_maintenance),
        );

    router = router
        .route(
            &path("/complaints"),
            get(complaints::list_complaints).post(complaints::create_complaint),
        )
        .route(
            &path("/complaints/{id}"),
            get(complaints::get_complaint)
                .patch(complaints::update_complaint)
                .delete(complaints::delete_complaint),
        );

    router = router
        .route(
            &path("/references"),
            get(references::list_references).post(references::create_reference),
        )
        .route(
            &path("/references/{id}"),
            get(references::get_reference)
                .patch(references::update_reference)
                .delete(references::delete_reference),
        );

    router = router
        .route(
            &path("/parties"),
            get(parties::list_parties).post(parties::create_party),
        )
        .route(&path("/parties/{id}"), axum::routing::delete(parties::delete_party));

    router.layer(Extension(services))
}
