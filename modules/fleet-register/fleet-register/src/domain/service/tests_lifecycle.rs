#![allow(clippy::unwrap_used, clippy::expect_used)]

use fleet_register_sdk::{
    ComplaintFilter, ComplaintPatch, MachineFilter, MaintenanceFilter, NewComplaint,
    NewMaintenance, NewReferenceEntry, PageRequest, ReferenceCategory, ReferenceFilter,
    ReferenceRef,
};
use fleet_security::{EffectiveRole, Role};
use time::Date;
use time::macros::date;
use uuid::Uuid;

use super::{MachineSource, ServiceConfig};
use crate::domain::error::DomainError;
use crate::infra::storage::db::{ConnectOpts, connect_db, run_migrations};
use crate::test_support::{
    build_services, ctx_for, manager_ctx, new_machine, seed_machine, seed_party, world,
};

/// Listings run newest first by date, ties broken by the larger id.
fn assert_newest_first(keys: &[(Date, Uuid)]) {
    for pair in keys.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        assert!(a.0 > b.0 || (a.0 == b.0 && a.1 > b.1), "{keys:?}");
    }
}

fn complaint(failure: time::Date, recovery: Option<time::Date>) -> NewComplaint {
    NewComplaint {
        machine_id: None,
        failure_date: failure,
        operating_hours: 10,
        failure_node: ReferenceRef::name("Hydraulics"),
        failure_description: String::new(),
        recovery_method: ReferenceRef::name("Repair"),
        parts_used: String::new(),
        recovery_date: recovery,
        service_company_id: None,
    }
}

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let w = world().await;
    let ctx = manager_ctx();
    let refs = &w.services.references;

    let first = refs
        .get_or_create(&ctx, ReferenceCategory::FailureNode, "Gearbox")
        .await
        .unwrap();
    let second = refs
        .get_or_create(&ctx, ReferenceCategory::FailureNode, "Gearbox")
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let page = refs
        .list_references(
            &ctx,
            &ReferenceFilter {
                category: Some(ReferenceCategory::FailureNode),
                name: Some("Gearbox".to_owned()),
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn concurrent_get_or_create_yields_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("refs.db").display());
    let opts = ConnectOpts {
        max_conns: Some(4),
        ..Default::default()
    };
    let db = connect_db(&dsn, opts).await.unwrap();
    run_migrations(&db).await.unwrap();
    let services = build_services(db, ServiceConfig::default());
    let ctx = manager_ctx();
    let refs = &services.references;

    let (first, second) = tokio::join!(
        refs.get_or_create(&ctx, ReferenceCategory::FailureNode, "Gearbox"),
        refs.get_or_create(&ctx, ReferenceCategory::FailureNode, " Gearbox "),
    );
    assert_eq!(first.unwrap().id, second.unwrap().id);

    let page = refs
        .list_references(
            &ctx,
            &ReferenceFilter {
                category: Some(ReferenceCategory::FailureNode),
                name: None,
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn listings_run_newest_first_with_ties_by_id() {
    let w = world().await;
    let ctx = manager_ctx();

    let mut later = new_machine("0020", &w.client, &w.service);
    later.shipment_date = date!(2024 - 06 - 01);
    let later = w.services.machines.create_machine(&ctx, later).await.unwrap();
    seed_machine(&w.services, "0018", &w.client, &w.service).await;
    seed_machine(&w.services, "0019", &w.client, &w.service).await;

    let machines = w
        .services
        .machines
        .list_machines(&ctx, &MachineFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(machines.total, 4);
    assert_eq!(machines.items[0].id, later.id);
    let keys: Vec<_> = machines.items.iter().map(|m| (m.shipment_date, m.id)).collect();
    assert_newest_first(&keys);

    for performed in [date!(2024 - 04 - 01), date!(2024 - 05 - 01), date!(2024 - 05 - 01)] {
        w.services
            .maintenance
            .create_maintenance(
                &ctx,
                MachineSource::Path(w.machine.id),
                NewMaintenance {
                    machine_id: None,
                    kind: ReferenceRef::name("TO-1"),
                    performed_date: performed,
                    operating_hours: 50,
                    work_order_number: "WO-1".to_owned(),
                    work_order_date: None,
                    organization: ReferenceRef::name("Self-service"),
                    service_company_id: None,
                },
            )
            .await
            .unwrap();
    }
    let maintenance = w
        .services
        .maintenance
        .list_maintenance(&ctx, &MaintenanceFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(maintenance.items[0].performed_date, date!(2024 - 05 - 01));
    let keys: Vec<_> = maintenance.items.iter().map(|m| (m.performed_date, m.id)).collect();
    assert_newest_first(&keys);

    for failure in [date!(2024 - 01 - 10), date!(2024 - 02 - 10), date!(2024 - 02 - 10)] {
        w.services
            .complaints
            .create_complaint(&ctx, MachineSource::Path(w.machine.id), complaint(failure, None))
            .await
            .unwrap();
    }
    let complaints = w
        .services
        .complaints
        .list_complaints(&ctx, &ComplaintFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(complaints.items[0].failure_date, date!(2024 - 02 - 10));
    let keys: Vec<_> = complaints.items.iter().map(|c| (c.failure_date, c.id)).collect();
    assert_newest_first(&keys);
}

#[tokio::test]
async fn downtime_is_recomputed_on_every_save() {
    let w = world().await;
    let ctx = manager_ctx();
    let svc = &w.services.complaints;

    let created = svc
        .create_complaint(
            &ctx,
            MachineSource::Path(w.machine.id),
            complaint(date!(2024 - 01 - 10), None),
        )
        .await
        .unwrap();
    assert_eq!(created.downtime_days, 0);

    let recovered = svc
        .update_complaint(
            &ctx,
            created.id,
            ComplaintPatch {
                recovery_date: Some(Some(date!(2024 - 01 - 15))),
                ..ComplaintPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(recovered.downtime_days, 5);

    let cleared = svc
        .update_complaint(
            &ctx,
            created.id,
            ComplaintPatch {
                recovery_date: Some(None),
                ..ComplaintPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.downtime_days, 0);
}

#[tokio::test]
async fn recovery_before_failure_is_rejected_without_saving() {
    let w = world().await;
    let err = w
        .services
        .complaints
        .create_complaint(
            &manager_ctx(),
            MachineSource::Path(w.machine.id),
            complaint(date!(2024 - 01 - 10), Some(date!(2024 - 01 - 05))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "recovery_date"));

    let page = w
        .services
        .complaints
        .list_complaints(&manager_ctx(), &ComplaintFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn deleting_a_machine_cascades_to_its_records() {
    let w = world().await;
    let ctx = manager_ctx();
    w.services
        .maintenance
        .create_maintenance(
            &ctx,
            MachineSource::Path(w.machine.id),
            NewMaintenance {
                machine_id: None,
                kind: ReferenceRef::name("TO-1"),
                performed_date: date!(2024 - 05 - 01),
                operating_hours: 50,
                work_order_number: "WO-1".to_owned(),
                work_order_date: None,
                organization: ReferenceRef::name("Self-service"),
                service_company_id: None,
            },
        )
        .await
        .unwrap();
    w.services
        .complaints
        .create_complaint(
            &ctx,
            MachineSource::Path(w.machine.id),
            complaint(date!(2024 - 02 - 01), None),
        )
        .await
        .unwrap();

    w.services
        .machines
        .delete_machine(&ctx, w.machine.id)
        .await
        .unwrap();

    let maintenance = w
        .services
        .maintenance
        .list_maintenance(&ctx, &MaintenanceFilter::default(), PageRequest::default())
        .await
        .unwrap();
    let complaints = w
        .services
        .complaints
        .list_complaints(&ctx, &ComplaintFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(maintenance.total, 0);
    assert_eq!(complaints.total, 0);
}

#[tokio::test]
async fn parties_and_references_in_use_cannot_be_deleted() {
    let w = world().await;
    let ctx = manager_ctx();

    let err = w
        .services
        .parties
        .delete_party(&ctx, w.client.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InUse { .. }));

    let err = w
        .services
        .references
        .delete_reference(&ctx, w.machine.model_engine_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InUse { .. }));

    let unused = seed_party(&w.services, "nobody", &[]).await;
    w.services.parties.delete_party(&ctx, unused.id).await.unwrap();
}

#[tokio::test]
async fn reference_ids_must_match_the_field_category() {
    let w = world().await;
    let ctx = manager_ctx();
    let engine = w
        .services
        .references
        .create_reference(
            &ctx,
            NewReferenceEntry {
                category: ReferenceCategory::EngineModel,
                name: "D-260".to_owned(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let mut machine = new_machine("0300", &w.client, &w.service);
    machine.model_technique = ReferenceRef::id(engine.id);
    let err = w
        .services
        .machines
        .create_machine(&ctx, machine)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "model_technique"));
}

#[tokio::test]
async fn duplicate_serial_is_a_conflict() {
    let w = world().await;
    let err = w
        .services
        .machines
        .create_machine(&manager_ctx(), new_machine("0017", &w.client, &w.service))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AlreadyExists { .. }));
}

#[tokio::test]
async fn public_lookup_exposes_whitelisted_fields_only() {
    let w = world().await;
    let public = w.services.machines.public_lookup(" 0017 ").await.unwrap();
    assert_eq!(public.serial_number, "0017");
    assert_eq!(public.model_engine_name, "D-245");
    assert_eq!(public.serial_engine, "E-0017");

    let json = serde_json::to_value(&public).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 10);
    assert!(json.get("client_id").is_none());

    assert!(matches!(
        w.services.machines.public_lookup("nope").await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        w.services.machines.public_lookup("  ").await,
        Err(DomainError::Validation { .. })
    ));
}

#[tokio::test]
async fn me_reports_the_effective_role() {
    let w = world().await;
    let me = w
        .services
        .parties
        .me(&ctx_for(&w.outsider, Some("service")))
        .await
        .unwrap();
    assert_eq!(me.party.id, w.outsider.id);
    assert!(me.party.roles.contains(Role::Client));
    assert_eq!(me.effective_role, EffectiveRole::Service);

    let me = w
        .services
        .parties
        .me(&ctx_for(&w.outsider, Some("manager")))
        .await
        .unwrap();
    assert_eq!(me.effective_role, EffectiveRole::Implicit);
}
