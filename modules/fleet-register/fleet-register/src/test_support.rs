#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use fleet_register_sdk::{Machine, NewMachine, NewParty, Party, ReferenceRef};
use fleet_security::{Role, RoleSet, SecurityContext};
use sea_orm::DatabaseConnection;
use time::macros::date;

use crate::domain::service::ServiceConfig;
use crate::infra::storage::db::{ConnectOpts, DbProvider, connect_db, run_migrations};
use crate::infra::storage::{
    OrmComplaintsRepository, OrmMachinesRepository, OrmMaintenanceRepository,
    OrmPartiesRepository, OrmReferencesRepository,
};
use crate::module::ConcreteAppServices;

/// Create an in-memory database for testing.
pub async fn inmem_db() -> DatabaseConnection {
    let opts = ConnectOpts {
        max_conns: Some(1),
        min_conns: Some(1),
        ..Default::default()
    };
    let db = connect_db("sqlite::memory:", opts)
        .await
        .expect("Failed to connect to in-memory database");
    run_migrations(&db).await.expect("Failed to run migrations");
    db
}

pub fn build_services(db: DatabaseConnection, config: ServiceConfig) -> Arc<ConcreteAppServices> {
    Arc::new(ConcreteAppServices::new(
        OrmMachinesRepository,
        OrmMaintenanceRepository,
        OrmComplaintsRepository,
        OrmReferencesRepository,
        OrmPartiesRepository,
        Arc::new(DbProvider::new(db)),
        config,
    ))
}

pub async fn test_services() -> Arc<ConcreteAppServices> {
    build_services(inmem_db().await, ServiceConfig::default())
}

/// Security context of `party`, acting under `hint` when given.
#[must_use]
pub fn ctx_for(party: &Party, hint: Option<&str>) -> SecurityContext {
    SecurityContext::builder()
        .subject_id(party.id)
        .username(&party.username)
        .staff(party.is_staff)
        .memberships(party.roles.clone())
        .role_hint(hint)
        .build()
}

#[must_use]
pub fn manager_ctx() -> SecurityContext {
    SecurityContext::system()
}

pub async fn seed_party(services: &ConcreteAppServices, username: &str, roles: &[Role]) -> Party {
    services
        .parties
        .create_party(
            &manager_ctx(),
            NewParty {
                username: username.to_owned(),
                display_name: username.to_owned(),
                is_staff: false,
                roles: roles.iter().copied().collect::<RoleSet>(),
            },
        )
        .await
        .expect("Failed to seed party")
}

#[must_use]
pub fn new_machine(serial: &str, client: &Party, service_company: &Party) -> NewMachine {
    NewMachine {
        serial_number: serial.to_owned(),
        model_technique: ReferenceRef::name("PD-1"),
        model_engine: ReferenceRef::name("D-245"),
        serial_engine: format!("E-{serial}"),
        model_transmission: ReferenceRef::name("T-10"),
        serial_transmission: format!("T-{serial}"),
        model_drive_bridge: ReferenceRef::name("DB-1"),
        serial_drive_bridge: format!("DB-{serial}"),
        model_steer_bridge: ReferenceRef::name("SB-1"),
        serial_steer_bridge: format!("SB-{serial}"),
        contract_number: format!("C-{serial}"),
        shipment_date: date!(2024 - 03 - 01),
        consignee: "Consignee".to_owned(),
        delivery_address: "Address".to_owned(),
        equipment: "Standard".to_owned(),
        client_id: client.id,
        service_company_id: service_company.id,
    }
}

pub async fn seed_machine(
    services: &ConcreteAppServices,
    serial: &str,
    client: &Party,
    service_company: &Party,
) -> Machine {
    services
        .machines
        .create_machine(&manager_ctx(), new_machine(serial, client, service_company))
        .await
        .expect("Failed to seed machine")
}

/// A world with one machine owned by `client` and serviced by `service`,
/// plus an `outsider` holding both roles on nothing.
pub struct World {
    pub services: Arc<ConcreteAppServices>,
    pub client: Party,
    pub service: Party,
    pub outsider: Party,
    pub machine: Machine,
}

pub async fn world() -> World {
    let services = test_services().await;
    let client = seed_party(&services, "client-a", &[Role::Client]).await;
    let service = seed_party(&services, "service-a", &[Role::Service]).await;
    let outsider = seed_party(&services, "outsider", &[Role::Client, Role::Service]).await;
    let machine = seed_machine(&services, "0017", &client, &service).await;
    World {
        services,
        client,
        service,
        outsider,
        machine,
    }
}
