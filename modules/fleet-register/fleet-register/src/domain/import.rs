//! Bulk import of the fleet register from a name-keyed document.
//!
//! Rows address reference entries, parties and machines by name. Every row
//! runs in its own transaction through the same service operations the REST
//! layer uses, so lifecycle rules (downtime, date checks) apply unchanged.
//! Rows that fail validation are rolled back and reported; a datastore
//! failure aborts the job.

use fleet_register_sdk::{
    MachinePatch, NewComplaint, NewMachine, NewMaintenance, NewParty, ReferenceCategory,
    ReferenceRef,
};
use fleet_security::{Role, RoleSet, SecurityContext};
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::authz::Requester;
use crate::domain::error::DomainError;
use crate::domain::lifecycle::required_text;
use crate::domain::repos::{
    ComplaintsRepository, MachinesRepository, MaintenanceRepository, PartiesRepository,
    ReferencesRepository,
};
use crate::domain::service::{AppServices, MachineSource};
use crate::infra::storage::db::DBRunner;

/// The three sheets of an import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDocument {
    #[serde(default)]
    pub machines: Vec<MachineRow>,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceRow>,
    #[serde(default)]
    pub complaints: Vec<ComplaintRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineRow {
    pub serial_number: String,
    pub model_technique: String,
    pub model_engine: String,
    #[serde(default)]
    pub serial_engine: String,
    pub model_transmission: String,
    #[serde(default)]
    pub serial_transmission: String,
    pub model_drive_bridge: String,
    #[serde(default)]
    pub serial_drive_bridge: String,
    pub model_steer_bridge: String,
    #[serde(default)]
    pub serial_steer_bridge: String,
    #[serde(default)]
    pub contract_number: String,
    pub shipment_date: Date,
    #[serde(default)]
    pub consignee: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub equipment: String,
    /// Display name of the owning client.
    pub client: String,
    /// Display name of the service company; falls back to the job default.
    #[serde(default)]
    pub service_company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceRow {
    pub machine_serial: String,
    pub kind: String,
    pub performed_date: Date,
    #[serde(default)]
    pub operating_hours: u32,
    #[serde(default)]
    pub work_order_number: String,
    #[serde(default)]
    pub work_order_date: Option<Date>,
    pub organization: String,
    #[serde(default)]
    pub service_company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplaintRow {
    pub machine_serial: String,
    pub failure_date: Date,
    #[serde(default)]
    pub operating_hours: u32,
    pub failure_node: String,
    #[serde(default)]
    pub failure_description: String,
    pub recovery_method: String,
    #[serde(default)]
    pub parts_used: String,
    #[serde(default)]
    pub recovery_date: Option<Date>,
    #[serde(default)]
    pub service_company: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Service company for machine rows that name none.
    pub default_service_company: Option<String>,
}

/// A row left out of the import, numbered from 1 within its sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: Vec<SkippedRow>,
}

impl SheetSummary {
    fn count(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Record a rejected row. Datastore failures are passed back up.
    fn skip(&mut self, sheet: &str, index: usize, err: DomainError) -> Result<(), DomainError> {
        if matches!(err, DomainError::Database { .. }) {
            return Err(err);
        }
        let row = index + 1;
        tracing::warn!(sheet, row, error = %err, "Skipping import row");
        self.skipped.push(SkippedRow {
            row,
            reason: err.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub machines: SheetSummary,
    pub maintenance: SheetSummary,
    pub complaints: SheetSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Lowercase ASCII slug of `name`: alphanumerics kept, every other run of
/// characters collapsed into one `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Import `doc` with manager authority: machines first, then the records
/// attached to them.
///
/// # Errors
/// Returns `DomainError::Database` if the datastore fails; the rows committed
/// before the failure stay.
#[instrument(skip_all, fields(
    machines = doc.machines.len(),
    maintenance = doc.maintenance.len(),
    complaints = doc.complaints.len(),
))]
pub(crate) async fn run_import<MR, TR, CR, RR, PR>(
    services: &AppServices<MR, TR, CR, RR, PR>,
    doc: ImportDocument,
    opts: &ImportOptions,
) -> Result<ImportSummary, DomainError>
where
    MR: MachinesRepository + 'static,
    TR: MaintenanceRepository + 'static,
    CR: ComplaintsRepository + 'static,
    RR: ReferencesRepository + 'static,
    PR: PartiesRepository + 'static,
{
    tracing::info!("Starting import");
    let importer = Importer {
        services,
        requester: Requester::from_context(&SecurityContext::system()),
        default_service_company: opts.default_service_company.as_deref(),
    };
    let mut summary = ImportSummary::default();

    for (index, row) in doc.machines.into_iter().enumerate() {
        let txn = services.db().begin().await?;
        match importer.machine(&txn, row).await {
            Ok(outcome) => {
                txn.commit().await?;
                summary.machines.count(outcome);
            }
            Err(err) => {
                txn.rollback().await?;
                summary.machines.skip("machines", index, err)?;
            }
        }
    }
    for (index, row) in doc.maintenance.into_iter().enumerate() {
        let txn = services.db().begin().await?;
        match importer.maintenance(&txn, row).await {
            Ok(outcome) => {
                txn.commit().await?;
                summary.maintenance.count(outcome);
            }
            Err(err) => {
                txn.rollback().await?;
                summary.maintenance.skip("maintenance", index, err)?;
            }
        }
    }
    for (index, row) in doc.complaints.into_iter().enumerate() {
        let txn = services.db().begin().await?;
        match importer.complaint(&txn, row).await {
            Ok(outcome) => {
                txn.commit().await?;
                summary.complaints.count(outcome);
            }
            Err(err) => {
                txn.rollback().await?;
                summary.complaints.skip("complaints", index, err)?;
            }
        }
    }

    tracing::info!(
        machines.created = summary.machines.created,
        machines.updated = summary.machines.updated,
        machines.skipped = summary.machines.skipped.len(),
        maintenance.created = summary.maintenance.created,
        maintenance.skipped = summary.maintenance.skipped.len(),
        complaints.created = summary.complaints.created,
        complaints.skipped = summary.complaints.skipped.len(),
        "Import finished"
    );
    Ok(summary)
}

struct Importer<'a, MR, TR, CR, RR, PR>
where
    MR: MachinesRepository + 'static,
    TR: MaintenanceRepository + 'static,
    CR: ComplaintsRepository + 'static,
    RR: ReferencesRepository + 'static,
    PR: PartiesRepository + 'static,
{
    services: &'a AppServices<MR, TR, CR, RR, PR>,
    requester: Requester,
    default_service_company: Option<&'a str>,
}

impl<MR, TR, CR, RR, PR> Importer<'_, MR, TR, CR, RR, PR>
where
    MR: MachinesRepository + 'static,
    TR: MaintenanceRepository + 'static,
    CR: ComplaintsRepository + 'static,
    RR: ReferencesRepository + 'static,
    PR: PartiesRepository + 'static,
{
    /// Upsert a machine by serial number.
    async fn machine<C: DBRunner>(&self, conn: &C, row: MachineRow) -> Result<RowOutcome, DomainError> {
        let serial = required_text("serial_number", &row.serial_number)?;
        let client_id = self.party(conn, "client", &row.client, Role::Client).await?;
        let service_company = row
            .service_company
            .as_deref()
            .or(self.default_service_company)
            .ok_or_else(|| DomainError::validation("service_company", "is required"))?;
        let service_company_id = self
            .party(conn, "service_company", service_company, Role::Service)
            .await?;

        let machines = &self.services.machines;
        if let Some(existing) = machines.find_by_serial_in(conn, &serial).await? {
            let patch = MachinePatch {
                serial_number: None,
                model_technique: Some(ReferenceRef::name(row.model_technique)),
                model_engine: Some(ReferenceRef::name(row.model_engine)),
                serial_engine: Some(row.serial_engine),
                model_transmission: Some(ReferenceRef::name(row.model_transmission)),
                serial_transmission: Some(row.serial_transmission),
                model_drive_bridge: Some(ReferenceRef::name(row.model_drive_bridge)),
                serial_drive_bridge: Some(row.serial_drive_bridge),
                model_steer_bridge: Some(ReferenceRef::name(row.model_steer_bridge)),
                serial_steer_bridge: Some(row.serial_steer_bridge),
                contract_number: Some(row.contract_number),
                shipment_date: Some(row.shipment_date),
                consignee: Some(row.consignee),
                delivery_address: Some(row.delivery_address),
                equipment: Some(row.equipment),
                client_id: Some(client_id),
                service_company_id: Some(service_company_id),
            };
            let updated = machines
                .update_in(conn, &self.requester, existing.clone(), patch)
                .await?;
            return Ok(if updated == existing {
                RowOutcome::Unchanged
            } else {
                RowOutcome::Updated
            });
        }

        let new = NewMachine {
            serial_number: serial,
            model_technique: ReferenceRef::name(row.model_technique),
            model_engine: ReferenceRef::name(row.model_engine),
            serial_engine: row.serial_engine,
            model_transmission: ReferenceRef::name(row.model_transmission),
            serial_transmission: row.serial_transmission,
            model_drive_bridge: ReferenceRef::name(row.model_drive_bridge),
            serial_drive_bridge: row.serial_drive_bridge,
            model_steer_bridge: ReferenceRef::name(row.model_steer_bridge),
            serial_steer_bridge: row.serial_steer_bridge,
            contract_number: row.contract_number,
            shipment_date: row.shipment_date,
            consignee: row.consignee,
            delivery_address: row.delivery_address,
            equipment: row.equipment,
            client_id,
            service_company_id,
        };
        machines.create_in(conn, &self.requester, new).await?;
        Ok(RowOutcome::Created)
    }

    /// Attach a maintenance record unless the same kind was already logged
    /// on that day.
    async fn maintenance<C: DBRunner>(
        &self,
        conn: &C,
        row: MaintenanceRow,
    ) -> Result<RowOutcome, DomainError> {
        let machine_id = self.machine_id(conn, &row.machine_serial).await?;
        let kind = self
            .reference(conn, "kind", ReferenceCategory::MaintenanceKind, &row.kind)
            .await?;

        let service = &self.services.maintenance;
        if service
            .find_same_in(conn, machine_id, kind, row.performed_date)
            .await?
            .is_some()
        {
            return Ok(RowOutcome::Unchanged);
        }

        let service_company_id = self
            .optional_service_company(conn, row.service_company.as_deref())
            .await?;
        let new = NewMaintenance {
            machine_id: Some(machine_id),
            kind: ReferenceRef::id(kind),
            performed_date: row.performed_date,
            operating_hours: row.operating_hours,
            work_order_number: row.work_order_number,
            work_order_date: row.work_order_date,
            organization: ReferenceRef::name(row.organization),
            service_company_id,
        };
        service
            .create_in(conn, &self.requester, MachineSource::Body, new)
            .await?;
        Ok(RowOutcome::Created)
    }

    /// Attach a complaint unless the same failure node already failed on
    /// that day.
    async fn complaint<C: DBRunner>(
        &self,
        conn: &C,
        row: ComplaintRow,
    ) -> Result<RowOutcome, DomainError> {
        let machine_id = self.machine_id(conn, &row.machine_serial).await?;
        let failure_node = self
            .reference(
                conn,
                "failure_node",
                ReferenceCategory::FailureNode,
                &row.failure_node,
            )
            .await?;

        let service = &self.services.complaints;
        if service
            .find_same_in(conn, machine_id, failure_node, row.failure_date)
            .await?
            .is_some()
        {
            return Ok(RowOutcome::Unchanged);
        }

        let service_company_id = self
            .optional_service_company(conn, row.service_company.as_deref())
            .await?;
        let new = NewComplaint {
            machine_id: Some(machine_id),
            failure_date: row.failure_date,
            operating_hours: row.operating_hours,
            failure_node: ReferenceRef::id(failure_node),
            failure_description: row.failure_description,
            recovery_method: ReferenceRef::name(row.recovery_method),
            parts_used: row.parts_used,
            recovery_date: row.recovery_date,
            service_company_id,
        };
        service
            .create_in(conn, &self.requester, MachineSource::Body, new)
            .await?;
        Ok(RowOutcome::Created)
    }

    async fn machine_id<C: DBRunner>(&self, conn: &C, serial: &str) -> Result<Uuid, DomainError> {
        let serial = required_text("machine_serial", serial)?;
        self.services
            .machines
            .find_by_serial_in(conn, &serial)
            .await?
            .map(|machine| machine.id)
            .ok_or_else(|| {
                DomainError::validation("machine_serial", format!("machine {serial} not found"))
            })
    }

    async fn reference<C: DBRunner>(
        &self,
        conn: &C,
        field: &str,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<Uuid, DomainError> {
        let name = required_text(field, name)?;
        Ok(self
            .services
            .references
            .get_or_create_in(conn, category, &name)
            .await?
            .id)
    }

    async fn optional_service_company<C: DBRunner>(
        &self,
        conn: &C,
        name: Option<&str>,
    ) -> Result<Option<Uuid>, DomainError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Ok(Some(
                self.party(conn, "service_company", name, Role::Service)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    /// The party displayed as `name`, holding `role`.
    ///
    /// Known parties are granted the role when they lack it. New parties get
    /// a username slugified from the name, suffixed `-2`, `-3`, … until free.
    async fn party<C: DBRunner>(
        &self,
        conn: &C,
        field: &str,
        name: &str,
        role: Role,
    ) -> Result<Uuid, DomainError> {
        let name = required_text(field, name)?;
        let parties = &self.services.parties;

        if let Some(party) = parties.find_by_display_name_in(conn, &name).await? {
            if !party.roles.contains(role) {
                parties.grant_role_in(conn, party.id, role).await?;
                tracing::info!(party.id = %party.id, role = %role, "Granted role to imported party");
            }
            return Ok(party.id);
        }

        let mut base = slugify(&name);
        if base.is_empty() {
            base = role.as_str().to_owned();
        }
        let mut username = base.clone();
        let mut suffix = 1u32;
        while parties.username_taken_in(conn, &username).await? {
            suffix += 1;
            username = format!("{base}-{suffix}");
        }

        let party = parties
            .create_in(
                conn,
                NewParty {
                    username,
                    display_name: name,
                    is_staff: false,
                    roles: RoleSet::from([role]),
                },
            )
            .await?;
        tracing::info!(party.id = %party.id, party.username = %party.username, "Created imported party");
        Ok(party.id)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::test_support::{manager_ctx, test_services};
    use fleet_register_sdk::{ComplaintFilter, MachineFilter, PageRequest, PartyFilter};
    use time::macros::date;
    use tracing_test::traced_test;

    fn machine_row(serial: &str, client: &str) -> MachineRow {
        MachineRow {
            serial_number: serial.to_owned(),
            model_technique: "PD-1".to_owned(),
            model_engine: "D-245".to_owned(),
            serial_engine: String::new(),
            model_transmission: "T-10".to_owned(),
            serial_transmission: String::new(),
            model_drive_bridge: "DB-1".to_owned(),
            serial_drive_bridge: String::new(),
            model_steer_bridge: "SB-1".to_owned(),
            serial_steer_bridge: String::new(),
            contract_number: String::new(),
            shipment_date: date!(2024 - 03 - 01),
            consignee: String::new(),
            delivery_address: String::new(),
            equipment: String::new(),
            client: client.to_owned(),
            service_company: Some("Acme Service".to_owned()),
        }
    }

    fn complaint_row(serial: &str, recovery: Option<Date>) -> ComplaintRow {
        ComplaintRow {
            machine_serial: serial.to_owned(),
            failure_date: date!(2024 - 01 - 10),
            operating_hours: 120,
            failure_node: "Engine".to_owned(),
            failure_description: String::new(),
            recovery_method: "Repair".to_owned(),
            parts_used: String::new(),
            recovery_date: recovery,
            service_company: None,
        }
    }

    #[test]
    fn slugify_keeps_ascii_alphanumerics() {
        assert_eq!(slugify("Acme Service, LLC"), "acme-service-llc");
        assert_eq!(slugify("  --Farm 7--  "), "farm-7");
        assert_eq!(slugify("ООО Ромашка"), "");
    }

    #[test]
    fn document_rejects_unknown_sheets() {
        let err = serde_json::from_value::<ImportDocument>(serde_json::json!({ "trucks": [] }));
        assert!(err.is_err());
        let empty: ImportDocument = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.machines.is_empty());
    }

    #[tokio::test]
    async fn machines_are_upserted_by_serial() {
        let services = test_services().await;
        let doc = ImportDocument {
            machines: vec![machine_row("0001", "Farm One"), machine_row("0002", "Farm One")],
            ..ImportDocument::default()
        };
        let summary = run_import(&services, doc, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.machines.created, 2);

        let mut changed = machine_row("0001", "Farm One");
        changed.equipment = "Cab heater".to_owned();
        let doc = ImportDocument {
            machines: vec![changed, machine_row("0002", "Farm One")],
            ..ImportDocument::default()
        };
        let summary = run_import(&services, doc, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.machines.created, 0);
        assert_eq!(summary.machines.updated, 1);
        assert_eq!(summary.machines.unchanged, 1);

        let page = services
            .machines
            .list_machines(&manager_ctx(), &MachineFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn parties_get_unique_slugged_usernames() {
        let services = test_services().await;
        crate::test_support::seed_party(&services, "farm-one", &[Role::Client]).await;

        let doc = ImportDocument {
            machines: vec![machine_row("0001", "Farm One"), machine_row("0002", "Farm One")],
            ..ImportDocument::default()
        };
        run_import(&services, doc, &ImportOptions::default())
            .await
            .unwrap();

        let clients = services
            .parties
            .list_parties(
                &manager_ctx(),
                &PartyFilter {
                    role: Some(Role::Client),
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        let usernames: Vec<_> = clients.items.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(usernames, vec!["farm-one", "farm-one-2"]);

        let service = services
            .parties
            .find_by_username("acme-service")
            .await
            .unwrap()
            .unwrap();
        assert!(service.roles.contains(Role::Service));
    }

    #[tokio::test]
    async fn invalid_rows_are_skipped_and_reported() {
        let services = test_services().await;
        let mut no_service = machine_row("0003", "Farm One");
        no_service.service_company = None;
        let doc = ImportDocument {
            machines: vec![machine_row("0001", "Farm One"), machine_row(" ", "Farm One"), no_service],
            complaints: vec![
                complaint_row("0001", Some(date!(2024 - 01 - 15))),
                complaint_row("0001", Some(date!(2024 - 01 - 05))),
                complaint_row("9999", None),
            ],
            ..ImportDocument::default()
        };
        let summary = run_import(&services, doc, &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.machines.created, 1);
        let skipped: Vec<_> = summary.machines.skipped.iter().map(|s| s.row).collect();
        assert_eq!(skipped, vec![2, 3]);

        // The second complaint repeats the first failure and is kept as is.
        assert_eq!(summary.complaints.created, 1);
        assert_eq!(summary.complaints.unchanged, 1);
        assert_eq!(summary.complaints.skipped.len(), 1);
        assert!(summary.complaints.skipped[0].reason.contains("machine_serial"));

        let complaints = services
            .complaints
            .list_complaints(&manager_ctx(), &ComplaintFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(complaints.items[0].downtime_days, 5);
    }

    #[tokio::test]
    #[traced_test]
    async fn bad_recovery_date_rolls_back_the_row() {
        let services = test_services().await;
        let doc = ImportDocument {
            machines: vec![machine_row("0001", "Farm One")],
            complaints: vec![complaint_row("0001", Some(date!(2024 - 01 - 05)))],
            ..ImportDocument::default()
        };
        let summary = run_import(&services, doc, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.complaints.skipped.len(), 1);
        assert!(summary.complaints.skipped[0].reason.contains("recovery_date"));
        assert!(logs_contain("Skipping import row"));

        let complaints = services
            .complaints
            .list_complaints(&manager_ctx(), &ComplaintFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(complaints.total, 0);
    }

    #[tokio::test]
    async fn default_service_company_fills_missing_names() {
        let services = test_services().await;
        let mut row = machine_row("0001", "Farm One");
        row.service_company = None;
        let doc = ImportDocument {
            machines: vec![row],
            maintenance: vec![MaintenanceRow {
                machine_serial: "0001".to_owned(),
                kind: "TO-1".to_owned(),
                performed_date: date!(2024 - 04 - 01),
                operating_hours: 50,
                work_order_number: "WO-7".to_owned(),
                work_order_date: None,
                organization: "Self-service".to_owned(),
                service_company: None,
            }],
            ..ImportDocument::default()
        };
        let opts = ImportOptions {
            default_service_company: Some("Fallback Service".to_owned()),
        };
        let summary = run_import(&services, doc, &opts).await.unwrap();
        assert_eq!(summary.machines.created, 1);
        assert_eq!(summary.maintenance.created, 1);

        let fallback = services
            .parties
            .find_by_username("fallback-service")
            .await
            .unwrap()
            .unwrap();
        let machine = services
            .machines
            .find_by_serial_in(services.db().conn(), "0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(machine.service_company_id, fallback.id);
    }
}
