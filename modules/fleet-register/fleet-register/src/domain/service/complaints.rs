use std::sync::Arc;

use fleet_register_sdk::{
    Complaint, ComplaintFilter, ComplaintPatch, NewComplaint, Page, PageRequest, ReferenceCategory,
};
use fleet_security::SecurityContext;
use tracing::instrument;
use uuid::Uuid;

use super::maintenance::{MachineSource, authorize_move, parent_machine, target_machine};
use super::{ServiceConfig, require_party, resolve_reference};
use crate::domain::authz::{
    Ownership, Requester, Resource, authorize_write, require_authenticated, scope_for,
};
use crate::domain::error::DomainError;
use crate::domain::lifecycle::{compute_downtime, service_company_or_machines};
use crate::domain::repos::{
    ComplaintsRepository, MachinesRepository, PartiesRepository, ReferencesRepository,
};
use crate::infra::storage::db::{DBRunner, DbProvider};

/// Complaints service.
///
/// Downtime is derived on every save and never taken from the caller.
pub struct ComplaintsService<
    R: ComplaintsRepository,
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

impl<R, MR, RR, PR> ComplaintsService<R, MR, RR, PR>
where
    R: ComplaintsRepository,
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

    #[instrument(skip(self, ctx), fields(complaint.id = %id))]
    pub async fn get_complaint(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Complaint, DomainError> {
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        self.repo
            .get(self.db.conn(), &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("complaint", id))
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn list_complaints(
        &self,
        ctx: &SecurityContext,
        filter: &ComplaintFilter,
        page: PageRequest,
    ) -> Result<Page<Complaint>, DomainError> {
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

        tracing::debug!(count = page.items.len(), total = page.total, "Listed complaints");
        Ok(page)
    }

    #[instrument(skip(self, ctx, new))]
    pub async fn create_complaint(
        &self,
        ctx: &SecurityContext,
        source: MachineSource,
        new: NewComplaint,
    ) -> Result<Complaint, DomainError> {
        tracing::info!("Creating complaint");
        let requester = Requester::from_context(ctx);

        let txn = self.db.begin().await?;
        let complaint = self.create_in(&txn, &requester, source, new).await?;
        txn.commit().await?;

        tracing::info!(
            complaint.id = %complaint.id,
            machine.id = %complaint.machine_id,
            downtime_days = complaint.downtime_days,
            "Created complaint"
        );
        Ok(complaint)
    }

    pub(crate) async fn create_in<C: DBRunner>(
        &self,
        conn: &C,
        requester: &Requester,
        source: MachineSource,
        new: NewComplaint,
    ) -> Result<Complaint, DomainError> {
        require_authenticated(requester)?;
        let machine = target_machine(&*self.machines, conn, source, new.machine_id).await?;
        authorize_write(requester, Resource::Complaint, Some(&Ownership::from(&machine)))?;

        let downtime_days = compute_downtime(new.failure_date, new.recovery_date)?;
        if let Some(explicit) = new.service_company_id {
            require_party(&*self.parties, conn, "service_company_id", explicit).await?;
        }

        let complaint = Complaint {
            id: Uuid::now_v7(),
            machine_id: machine.id,
            failure_date: new.failure_date,
            operating_hours: new.operating_hours,
            failure_node_id: resolve_reference(
                &*self.refs,
                conn,
                "failure_node",
                ReferenceCategory::FailureNode,
                &new.failure_node,
            )
            .await?,
            failure_description: new.failure_description,
            recovery_method_id: resolve_reference(
                &*self.refs,
                conn,
                "recovery_method",
                ReferenceCategory::RecoveryMethod,
                &new.recovery_method,
            )
            .await?,
            parts_used: new.parts_used,
            recovery_date: new.recovery_date,
            downtime_days,
            service_company_id: service_company_or_machines(
                new.service_company_id,
                machine.service_company_id,
            ),
        };

        self.repo.insert(conn, complaint).await
    }

    #[instrument(skip(self, ctx, patch), fields(complaint.id = %id))]
    pub async fn update_complaint(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        patch: ComplaintPatch,
    ) -> Result<Complaint, DomainError> {
        tracing::info!("Updating complaint");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        let mut complaint = self
            .repo
            .get(&txn, &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("complaint", id))?;

        let persisted = parent_machine(&*self.machines, &txn, complaint.machine_id).await?;
        authorize_write(&requester, Resource::Complaint, Some(&Ownership::from(&persisted)))?;

        if let Some(machine_id) = patch.machine_id
            && machine_id != complaint.machine_id
        {
            authorize_move(&*self.machines, &txn, &requester, Resource::Complaint, machine_id)
                .await?;
            complaint.machine_id = machine_id;
        }

        if let Some(node) = &patch.failure_node {
            complaint.failure_node_id = resolve_reference(
                &*self.refs,
                &txn,
                "failure_node",
                ReferenceCategory::FailureNode,
                node,
            )
            .await?;
        }
        if let Some(method) = &patch.recovery_method {
            complaint.recovery_method_id = resolve_reference(
                &*self.refs,
                &txn,
                "recovery_method",
                ReferenceCategory::RecoveryMethod,
                method,
            )
            .await?;
        }
        if let Some(service_company) = patch.service_company_id {
            require_party(&*self.parties, &txn, "service_company_id", service_company).await?;
            complaint.service_company_id = service_company;
        }
        if let Some(v) = patch.failure_date {
            complaint.failure_date = v;
        }
        if let Some(v) = patch.operating_hours {
            complaint.operating_hours = v;
        }
        if let Some(v) = patch.failure_description {
            complaint.failure_description = v;
        }
        if let Some(v) = patch.parts_used {
            complaint.parts_used = v;
        }
        if let Some(v) = patch.recovery_date {
            complaint.recovery_date = v;
        }
        complaint.downtime_days = compute_downtime(complaint.failure_date, complaint.recovery_date)?;

        let complaint = self.repo.update(&txn, complaint).await?;
        txn.commit().await?;

        tracing::info!(downtime_days = complaint.downtime_days, "Updated complaint");
        Ok(complaint)
    }

    #[instrument(skip(self, ctx), fields(complaint.id = %id))]
    pub async fn delete_complaint(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        tracing::info!("Deleting complaint");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        let complaint = self
            .repo
            .get(&txn, &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("complaint", id))?;
        let persisted = parent_machine(&*self.machines, &txn, complaint.machine_id).await?;
        authorize_write(&requester, Resource::Complaint, Some(&Ownership::from(&persisted)))?;

        self.repo.delete(&txn, id).await?;
        txn.commit().await?;

        tracing::info!("Deleted complaint");
        Ok(())
    }

    /// The complaint about the same failure node on the same day, if any.
    pub(crate) async fn find_same_in<C: DBRunner>(
        &self,
        conn: &C,
        machine_id: Uuid,
        failure_node_id: Uuid,
        failure_date: time::Date,
    ) -> Result<Option<Complaint>, DomainError> {
        self.repo
            .find_same(conn, machine_id, failure_node_id, failure_date)
            .await
    }
}
