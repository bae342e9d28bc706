use std::sync::Arc;

use fleet_register_sdk::{
    Machine, Maintenance, MaintenanceFilter, MaintenancePatch, NewMaintenance, Page, PageRequest,
    ReferenceCategory,
};
use fleet_security::{AccessScope, SecurityContext};
use tracing::instrument;
use uuid::Uuid;

use super::{ServiceConfig, require_party, resolve_reference};
use crate::domain::authz::{
    Ownership, Requester, Resource, authorize_write, require_authenticated, scope_for,
};
use crate::domain::error::DomainError;
use crate::domain::lifecycle::service_company_or_machines;
use crate::domain::repos::{
    MachinesRepository, MaintenanceRepository, PartiesRepository, ReferencesRepository,
};
use crate::infra::storage::db::{DBRunner, DbProvider};

/// Where the machine of a new child record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineSource {
    /// Only the request body may name the machine.
    Body,
    /// The machine addressed by the request path; the body may repeat it.
    Path(Uuid),
}

/// Pick the machine of a new child record and load it.
///
/// A machine named in the path that does not exist is not found; one named in
/// the body is a validation error.
pub(super) async fn target_machine<MR: MachinesRepository, C: DBRunner>(
    machines: &MR,
    conn: &C,
    source: MachineSource,
    from_body: Option<Uuid>,
) -> Result<Machine, DomainError> {
    let machine_id = match (source, from_body) {
        (MachineSource::Path(path), Some(body)) if path != body => {
            return Err(DomainError::validation(
                "machine_id",
                "does not match the machine in the path",
            ));
        }
        (MachineSource::Path(id), _) | (MachineSource::Body, Some(id)) => id,
        (MachineSource::Body, None) => {
            return Err(DomainError::validation("machine_id", "is required"));
        }
    };

    match machines.get(conn, &AccessScope::allow_all(), machine_id).await? {
        Some(machine) => Ok(machine),
        None if matches!(source, MachineSource::Path(_)) => {
            Err(DomainError::not_found("machine", machine_id))
        }
        None => Err(DomainError::validation(
            "machine_id",
            format!("machine {machine_id} not found"),
        )),
    }
}

/// The persisted machine of an existing child record.
pub(super) async fn parent_machine<MR: MachinesRepository, C: DBRunner>(
    machines: &MR,
    conn: &C,
    machine_id: Uuid,
) -> Result<Machine, DomainError> {
    machines
        .get(conn, &AccessScope::allow_all(), machine_id)
        .await?
        .ok_or_else(|| DomainError::database(format!("parent machine {machine_id} missing")))
}

/// Load the machine a record moves to and authorize the move.
pub(super) async fn authorize_move<MR: MachinesRepository, C: DBRunner>(
    machines: &MR,
    conn: &C,
    requester: &Requester,
    resource: Resource,
    machine_id: Uuid,
) -> Result<Machine, DomainError> {
    let target = machines
        .get(conn, &AccessScope::allow_all(), machine_id)
        .await?
        .ok_or_else(|| {
            DomainError::validation("machine_id", format!("machine {machine_id} not found"))
        })?;
    authorize_write(requester, resource, Some(&Ownership::from(&target)))?;
    Ok(target)
}

/// Maintenance service.
pub struct MaintenanceService<
    R: MaintenanceRepository,
    MR: MachinesRepository,
    RR: ReferencesRepository,
    PR: PartiesRepository,
> {
    db: Arc<DbProvider>,
    repo: Arc<R>,
    machines: Arc<MR>,
    refs: Arc<RR>,
    parties: Arc<PR>,
    config: ServiceConfig,
}

impl<R, MR, RR, PR> MaintenanceService<R, MR, RR, PR>
where
    R: MaintenanceRepository,
    MR: MachinesRepository,
    RR: ReferencesRepository,
    PR: PartiesRepository,
{
    pub fn new(
        db: Arc<DbProvider>,
        repo: Arc<R>,
        machines: Arc<MR>,
        refs: Arc<RR>,
        parties: Arc<PR>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            repo,
            machines,
            refs,
            parties,
            config,
        }
    }

    #[instrument(skip(self, ctx), fields(maintenance.id = %id))]
    pub async fn get_maintenance(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Maintenance, DomainError> {
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        self.repo
            .get(self.db.conn(), &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("maintenance", id))
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn list_maintenance(
        &self,
        ctx: &SecurityContext,
        filter: &MaintenanceFilter,
        page: PageRequest,
    ) -> Result<Page<Maintenance>, DomainError> {
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let page = self
            .repo
            .list_page(
                self.db.conn(),
                &scope_for(&requester),
                filter,
                self.config.window(page),
            )
            .await?;

        tracing::debug!(count = page.items.len(), total = page.total, "Listed maintenance");
        Ok(page)
    }

    #[instrument(skip(self, ctx, new))]
    pub async fn create_maintenance(
        &self,
        ctx: &SecurityContext,
        source: MachineSource,
        new: NewMaintenance,
    ) -> Result<Maintenance, DomainError> {
        tracing::info!("Creating maintenance record");
        let requester = Requester::from_context(ctx);

        let txn = self.db.begin().await?;
        let record = self.create_in(&txn, &requester, source, new).await?;
        txn.commit().await?;

        tracing::info!(maintenance.id = %record.id, machine.id = %record.machine_id, "Created maintenance record");
        Ok(record)
    }

    pub(crate) async fn create_in<C: DBRunner>(
        &self,
        conn: &C,
        requester: &Requester,
        source: MachineSource,
        new: NewMaintenance,
    ) -> Result<Maintenance, DomainError> {
        require_authenticated(requester)?;
        let machine = target_machine(&*self.machines, conn, source, new.machine_id).await?;
        authorize_write(requester, Resource::Maintenance, Some(&Ownership::from(&machine)))?;

        if let Some(explicit) = new.service_company_id {
            require_party(&*self.parties, conn, "service_company_id", explicit).await?;
        }

        let record = Maintenance {
            id: Uuid::now_v7(),
            machine_id: machine.id,
            kind_id: resolve_reference(
                &*self.refs,
                conn,
                "kind",
                ReferenceCategory::MaintenanceKind,
                &new.kind,
            )
            .await?,
            performed_date: new.performed_date,
            operating_hours: new.operating_hours,
            work_order_number: new.work_order_number.trim().to_owned(),
            work_order_date: new.work_order_date,
            organization_id: resolve_reference(
                &*self.refs,
                conn,
                "organization",
                ReferenceCategory::MaintenanceOrganization,
                &new.organization,
            )
            .await?,
            service_company_id: service_company_or_machines(
                new.service_company_id,
                machine.service_company_id,
            ),
        };

        self.repo.insert(conn, record).await
    }

    #[instrument(skip(self, ctx, patch), fields(maintenance.id = %id))]
    pub async fn update_maintenance(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        patch: MaintenancePatch,
    ) -> Result<Maintenance, DomainError> {
        tracing::info!("Updating maintenance record");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        let mut record = self
            .repo
            .get(&txn, &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("maintenance", id))?;

        let persisted = parent_machine(&*self.machines, &txn, record.machine_id).await?;
        authorize_write(&requester, Resource::Maintenance, Some(&Ownership::from(&persisted)))?;

        if let Some(machine_id) = patch.machine_id
            && machine_id != record.machine_id
        {
            authorize_move(&*self.machines, &txn, &requester, Resource::Maintenance, machine_id)
                .await?;
            record.machine_id = machine_id;
        }

        if let Some(kind) = &patch.kind {
            record.kind_id = resolve_reference(
                &*self.refs,
                &txn,
                "kind",
                ReferenceCategory::MaintenanceKind,
                kind,
            )
            .await?;
        }
        if let Some(organization) = &patch.organization {
            record.organization_id = resolve_reference(
                &*self.refs,
                &txn,
                "organization",
                ReferenceCategory::MaintenanceOrganization,
                organization,
            )
            .await?;
        }
        if let Some(service_company) = patch.service_company_id {
            require_party(&*self.parties, &txn, "service_company_id", service_company).await?;
            record.service_company_id = service_company;
        }
        if let Some(v) = patch.performed_date {
            record.performed_date = v;
        }
        if let Some(v) = patch.operating_hours {
            record.operating_hours = v;
        }
        if let Some(v) = patch.work_order_number {
            record.work_order_number = v.trim().to_owned();
        }
        if let Some(v) = patch.work_order_date {
            record.work_order_date = v;
        }

        let record = self.repo.update(&txn, record).await?;
        txn.commit().await?;

        tracing::info!("Updated maintenance record");
        Ok(record)
    }

    #[instrument(skip(self, ctx), fields(maintenance.id = %id))]
    pub async fn delete_maintenance(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<(), DomainError> {
        tracing::info!("Deleting maintenance record");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        let record = self
            .repo
            .get(&txn, &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("maintenance", id))?;
        let persisted = parent_machine(&*self.machines, &txn, record.machine_id).await?;
        authorize_write(&requester, Resource::Maintenance, Some(&Ownership::from(&persisted)))?;

        self.repo.delete(&txn, id).await?;
        txn.commit().await?;

        tracing::info!("Deleted maintenance record");
        Ok(())
    }

    /// The record of the same kind performed on the same day, if any.
    pub(crate) async fn find_same_in<C: DBRunner>(
        &self,
        conn: &C,
        machine_id: Uuid,
        kind_id: Uuid,
        performed_date: time::Date,
    ) -> Result<Option<Maintenance>, DomainError> {
        self.repo
            .find_same(conn, machine_id, kind_id, performed_date)
            .await
    }
}
