#![allow(clippy::unwrap_used, clippy::expect_used)]

use fleet_register_sdk::{
    ComplaintPatch, MachineFilter, MaintenanceFilter, MaintenancePatch, NewComplaint,
    NewMaintenance, PageRequest, ReferenceRef,
};
use fleet_security::{Role, SecurityContext};
use time::macros::date;

use super::MachineSource;
use crate::domain::error::DomainError;
use crate::test_support::{ctx_for, manager_ctx, seed_machine, seed_party, world};

fn maintenance_on(machine_id: Option<uuid::Uuid>) -> NewMaintenance {
    NewMaintenance {
        machine_id,
        kind: ReferenceRef::name("TO-1"),
        performed_date: date!(2024 - 05 - 01),
        operating_hours: 120,
        work_order_number: "WO-1".to_owned(),
        work_order_date: Some(date!(2024 - 04 - 30)),
        organization: ReferenceRef::name("Self-service"),
        service_company_id: None,
    }
}

fn complaint_on(machine_id: Option<uuid::Uuid>) -> NewComplaint {
    NewComplaint {
        machine_id,
        failure_date: date!(2024 - 01 - 10),
        operating_hours: 300,
        failure_node: ReferenceRef::name("Engine"),
        failure_description: "Oil leak".to_owned(),
        recovery_method: ReferenceRef::name("Part replacement"),
        parts_used: "Gasket".to_owned(),
        recovery_date: Some(date!(2024 - 01 - 15)),
        service_company_id: None,
    }
}

#[tokio::test]
async fn each_role_lists_its_slice_of_machines() {
    let w = world().await;
    let other_client = seed_party(&w.services, "client-b", &[Role::Client]).await;
    seed_machine(&w.services, "0099", &other_client, &w.outsider).await;

    let list = |ctx: SecurityContext| {
        let services = w.services.clone();
        async move {
            services
                .machines
                .list_machines(&ctx, &MachineFilter::default(), PageRequest::default())
                .await
                .unwrap()
        }
    };

    assert_eq!(list(manager_ctx()).await.total, 2);
    let client_page = list(ctx_for(&w.client, None)).await;
    assert_eq!(client_page.total, 1);
    assert_eq!(client_page.items[0].id, w.machine.id);
    assert_eq!(list(ctx_for(&w.service, None)).await.total, 1);
    // outsider services machine 0099 only
    assert_eq!(list(ctx_for(&w.outsider, None)).await.total, 1);
    assert_eq!(list(ctx_for(&w.outsider, Some("client"))).await.total, 0);
}

#[tokio::test]
async fn anonymous_callers_must_authenticate() {
    let w = world().await;
    let err = w
        .services
        .machines
        .list_machines(
            &SecurityContext::anonymous(),
            &MachineFilter::default(),
            PageRequest::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthenticated));
}

#[tokio::test]
async fn machine_outside_visibility_is_not_found() {
    let w = world().await;
    let err = w
        .services
        .machines
        .get_machine(&ctx_for(&w.outsider, None), w.machine.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn client_cannot_write_machines_it_sees() {
    let w = world().await;
    let err = w
        .services
        .machines
        .delete_machine(&ctx_for(&w.client, None), w.machine.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
}

#[tokio::test]
async fn service_creates_records_on_serviced_machine_only() {
    let w = world().await;
    let service_ctx = ctx_for(&w.service, Some("service"));

    let record = w
        .services
        .maintenance
        .create_maintenance(&service_ctx, MachineSource::Path(w.machine.id), maintenance_on(None))
        .await
        .unwrap();
    assert_eq!(record.machine_id, w.machine.id);
    assert_eq!(record.service_company_id, w.service.id);

    let complaint = w
        .services
        .complaints
        .create_complaint(&service_ctx, MachineSource::Body, complaint_on(Some(w.machine.id)))
        .await
        .unwrap();
    assert_eq!(complaint.downtime_days, 5);

    let unrelated_client = seed_party(&w.services, "client-c", &[Role::Client]).await;
    let unrelated = seed_machine(&w.services, "0100", &unrelated_client, &w.outsider).await;
    let err = w
        .services
        .maintenance
        .create_maintenance(&service_ctx, MachineSource::Path(unrelated.id), maintenance_on(None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
}

#[tokio::test]
async fn client_writes_maintenance_but_never_complaints() {
    let w = world().await;
    let client_ctx = ctx_for(&w.client, None);

    let record = w
        .services
        .maintenance
        .create_maintenance(&client_ctx, MachineSource::Body, maintenance_on(Some(w.machine.id)))
        .await
        .unwrap();
    let updated = w
        .services
        .maintenance
        .update_maintenance(
            &client_ctx,
            record.id,
            MaintenancePatch {
                operating_hours: Some(150),
                ..MaintenancePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.operating_hours, 150);

    let err = w
        .services
        .complaints
        .create_complaint(&client_ctx, MachineSource::Path(w.machine.id), complaint_on(None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));

    let complaint = w
        .services
        .complaints
        .create_complaint(&manager_ctx(), MachineSource::Path(w.machine.id), complaint_on(None))
        .await
        .unwrap();
    let err = w
        .services
        .complaints
        .update_complaint(
            &client_ctx,
            complaint.id,
            ComplaintPatch {
                parts_used: Some("Nothing".to_owned()),
                ..ComplaintPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
}

#[tokio::test]
async fn moving_maintenance_to_a_foreign_machine_is_denied_and_changes_nothing() {
    let w = world().await;
    let client_ctx = ctx_for(&w.client, None);
    let record = w
        .services
        .maintenance
        .create_maintenance(&client_ctx, MachineSource::Path(w.machine.id), maintenance_on(None))
        .await
        .unwrap();

    let other_client = seed_party(&w.services, "client-b", &[Role::Client]).await;
    let foreign = seed_machine(&w.services, "0200", &other_client, &w.service).await;

    let err = w
        .services
        .maintenance
        .update_maintenance(
            &client_ctx,
            record.id,
            MaintenancePatch {
                machine_id: Some(foreign.id),
                work_order_number: Some("WO-9".to_owned()),
                ..MaintenancePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));

    let unchanged = w
        .services
        .maintenance
        .get_maintenance(&manager_ctx(), record.id)
        .await
        .unwrap();
    assert_eq!(unchanged.machine_id, w.machine.id);
    assert_eq!(unchanged.work_order_number, "WO-1");
}

#[tokio::test]
async fn child_records_follow_parent_machine_visibility() {
    let w = world().await;
    w.services
        .maintenance
        .create_maintenance(&manager_ctx(), MachineSource::Path(w.machine.id), maintenance_on(None))
        .await
        .unwrap();

    let seen_by = |ctx: SecurityContext| {
        let services = w.services.clone();
        async move {
            services
                .maintenance
                .list_maintenance(&ctx, &MaintenanceFilter::default(), PageRequest::default())
                .await
                .unwrap()
                .total
        }
    };
    assert_eq!(seen_by(ctx_for(&w.client, None)).await, 1);
    assert_eq!(seen_by(ctx_for(&w.service, None)).await, 1);
    assert_eq!(seen_by(ctx_for(&w.outsider, None)).await, 0);

    let by_serial = w
        .services
        .maintenance
        .list_maintenance(
            &ctx_for(&w.client, None),
            &MaintenanceFilter {
                machine_serial: Some("001".to_owned()),
                ..MaintenanceFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_serial.total, 1);
}

#[tokio::test]
async fn machine_missing_from_body_and_path_is_a_validation_error() {
    let w = world().await;
    let err = w
        .services
        .maintenance
        .create_maintenance(&manager_ctx(), MachineSource::Body, maintenance_on(None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "machine_id"));
}
