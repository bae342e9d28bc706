use std::collections::HashMap;
use std::sync::Arc;

use fleet_register_sdk::{
    Machine, MachineFilter, MachinePatch, MachinePublic, NewMachine, Page, PageRequest,
    ReferenceCategory,
};
use fleet_security::{AccessScope, SecurityContext};
use tracing::instrument;
use uuid::Uuid;

use super::{ServiceConfig, require_party, resolve_reference};
use crate::domain::authz::{Requester, Resource, authorize_write, require_authenticated, scope_for};
use crate::domain::error::DomainError;
use crate::domain::lifecycle::required_text;
use crate::domain::repos::{MachinesRepository, PartiesRepository, ReferencesRepository};
use crate::infra::storage::db::{DBRunner, DbProvider};

/// Machines service.
///
/// Only managers write machines; everybody else reads the slice their role
/// grants.
pub struct MachinesService<R: MachinesRepository, RR: ReferencesRepository, PR: PartiesRepository> {
    db: Arc<DbProvider>,
    repo: Arc<R>,
    refs: Arc<RR>,
    parties: Arc<PR>,
    config: ServiceConfig,
}

impl<R: MachinesRepository, RR: ReferencesRepository, PR: PartiesRepository>
    MachinesService<R, RR, PR>
{
    pub fn new(
        db: Arc<DbProvider>,
        repo: Arc<R>,
        refs: Arc<RR>,
        parties: Arc<PR>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            repo,
            refs,
            parties,
            config,
        }
    }

    #[instrument(skip(self, ctx), fields(machine.id = %id))]
    pub async fn get_machine(&self, ctx: &SecurityContext, id: Uuid) -> Result<Machine, DomainError> {
        tracing::debug!("Getting machine by id");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        self.repo
            .get(self.db.conn(), &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("machine", id))
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn list_machines(
        &self,
        ctx: &SecurityContext,
        filter: &MachineFilter,
        page: PageRequest,
    ) -> Result<Page<Machine>, DomainError> {
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

        tracing::debug!(count = page.items.len(), total = page.total, "Listed machines");
        Ok(page)
    }

    /// Anonymous lookup by exact serial number, reduced to public fields.
    #[instrument(skip(self))]
    pub async fn public_lookup(&self, serial: &str) -> Result<MachinePublic, DomainError> {
        let serial = required_text("serial", serial)?;
        let conn = self.db.conn();

        let machine = self
            .repo
            .find_by_serial(conn, &AccessScope::allow_all(), &serial)
            .await?
            .ok_or_else(|| DomainError::not_found("machine", &serial))?;

        let names: HashMap<Uuid, String> = self
            .refs
            .get_many(
                conn,
                &[
                    machine.model_technique_id,
                    machine.model_engine_id,
                    machine.model_transmission_id,
                    machine.model_drive_bridge_id,
                    machine.model_steer_bridge_id,
                ],
            )
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();
        let name_of = |id: Uuid| names.get(&id).cloned().unwrap_or_default();

        Ok(MachinePublic {
            model_technique_name: name_of(machine.model_technique_id),
            model_engine_name: name_of(machine.model_engine_id),
            model_transmission_name: name_of(machine.model_transmission_id),
            model_drive_bridge_name: name_of(machine.model_drive_bridge_id),
            model_steer_bridge_name: name_of(machine.model_steer_bridge_id),
            serial_number: machine.serial_number,
            serial_engine: machine.serial_engine,
            serial_transmission: machine.serial_transmission,
            serial_drive_bridge: machine.serial_drive_bridge,
            serial_steer_bridge: machine.serial_steer_bridge,
        })
    }

    #[instrument(skip(self, ctx, new), fields(machine.serial = %new.serial_number))]
    pub async fn create_machine(
        &self,
        ctx: &SecurityContext,
        new: NewMachine,
    ) -> Result<Machine, DomainError> {
        tracing::info!("Creating machine");
        let requester = Requester::from_context(ctx);

        let txn = self.db.begin().await?;
        let machine = self.create_in(&txn, &requester, new).await?;
        txn.commit().await?;

        tracing::info!(machine.id = %machine.id, "Created machine");
        Ok(machine)
    }

    /// Create a machine on the caller's connection or transaction.
    pub(crate) async fn create_in<C: DBRunner>(
        &self,
        conn: &C,
        requester: &Requester,
        new: NewMachine,
    ) -> Result<Machine, DomainError> {
        authorize_write(requester, Resource::Machine, None)?;

        let serial_number = required_text("serial_number", &new.serial_number)?;
        if self
            .repo
            .find_by_serial(conn, &AccessScope::allow_all(), &serial_number)
            .await?
            .is_some()
        {
            return Err(DomainError::already_exists("machine", serial_number));
        }
        require_party(&*self.parties, conn, "client_id", new.client_id).await?;
        require_party(&*self.parties, conn, "service_company_id", new.service_company_id).await?;

        let refs = &*self.refs;
        let machine = Machine {
            id: Uuid::now_v7(),
            serial_number,
            model_technique_id: resolve_reference(
                refs,
                conn,
                "model_technique",
                ReferenceCategory::TechniqueModel,
                &new.model_technique,
            )
            .await?,
            model_engine_id: resolve_reference(
                refs,
                conn,
                "model_engine",
                ReferenceCategory::EngineModel,
                &new.model_engine,
            )
            .await?,
            serial_engine: new.serial_engine.trim().to_owned(),
            model_transmission_id: resolve_reference(
                refs,
                conn,
                "model_transmission",
                ReferenceCategory::TransmissionModel,
                &new.model_transmission,
            )
            .await?,
            serial_transmission: new.serial_transmission.trim().to_owned(),
            model_drive_bridge_id: resolve_reference(
                refs,
                conn,
                "model_drive_bridge",
                ReferenceCategory::DriveBridgeModel,
                &new.model_drive_bridge,
            )
            .await?,
            serial_drive_bridge: new.serial_drive_bridge.trim().to_owned(),
            model_steer_bridge_id: resolve_reference(
                refs,
                conn,
                "model_steer_bridge",
                ReferenceCategory::SteerBridgeModel,
                &new.model_steer_bridge,
            )
            .await?,
            serial_steer_bridge: new.serial_steer_bridge.trim().to_owned(),
            contract_number: new.contract_number,
            shipment_date: new.shipment_date,
            consignee: new.consignee,
            delivery_address: new.delivery_address,
            equipment: new.equipment,
            client_id: new.client_id,
            service_company_id: new.service_company_id,
        };

        self.repo.insert(conn, machine).await
    }

    #[instrument(skip(self, ctx, patch), fields(machine.id = %id))]
    pub async fn update_machine(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        patch: MachinePatch,
    ) -> Result<Machine, DomainError> {
        tracing::info!("Updating machine");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        let current = self
            .repo
            .get(&txn, &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("machine", id))?;
        let machine = self.update_in(&txn, &requester, current, patch).await?;
        txn.commit().await?;

        tracing::info!("Updated machine");
        Ok(machine)
    }

    /// Apply `patch` to an already loaded machine.
    pub(crate) async fn update_in<C: DBRunner>(
        &self,
        conn: &C,
        requester: &Requester,
        mut machine: Machine,
        mut patch: MachinePatch,
    ) -> Result<Machine, DomainError> {
        authorize_write(requester, Resource::Machine, None)?;

        if let Some(serial) = patch.serial_number.take() {
            let serial = required_text("serial_number", &serial)?;
            if serial != machine.serial_number
                && self.find_by_serial_in(conn, &serial).await?.is_some()
            {
                return Err(DomainError::already_exists("machine", serial));
            }
            machine.serial_number = serial;
        }

        let model_fields = [
            (
                "model_technique",
                ReferenceCategory::TechniqueModel,
                patch.model_technique.take(),
                &mut machine.model_technique_id,
            ),
            (
                "model_engine",
                ReferenceCategory::EngineModel,
                patch.model_engine.take(),
                &mut machine.model_engine_id,
            ),
            (
                "model_transmission",
                ReferenceCategory::TransmissionModel,
                patch.model_transmission.take(),
                &mut machine.model_transmission_id,
            ),
            (
                "model_drive_bridge",
                ReferenceCategory::DriveBridgeModel,
                patch.model_drive_bridge.take(),
                &mut machine.model_drive_bridge_id,
            ),
            (
                "model_steer_bridge",
                ReferenceCategory::SteerBridgeModel,
                patch.model_steer_bridge.take(),
                &mut machine.model_steer_bridge_id,
            ),
        ];
        for (field, category, reference, slot) in model_fields {
            if let Some(reference) = reference {
                *slot = resolve_reference(&*self.refs, conn, field, category, &reference).await?;
            }
        }

        if let Some(v) = patch.client_id.take() {
            require_party(&*self.parties, conn, "client_id", v).await?;
            machine.client_id = v;
        }
        if let Some(v) = patch.service_company_id.take() {
            require_party(&*self.parties, conn, "service_company_id", v).await?;
            machine.service_company_id = v;
        }
        apply_descriptive_fields(&mut machine, patch);

        self.repo.update(conn, machine).await
    }

    /// Delete a machine together with its maintenance and complaints.
    #[instrument(skip(self, ctx), fields(machine.id = %id))]
    pub async fn delete_machine(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        tracing::info!("Deleting machine");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        self.repo
            .get(&txn, &scope_for(&requester), id)
            .await?
            .ok_or_else(|| DomainError::not_found("machine", id))?;
        authorize_write(&requester, Resource::Machine, None)?;

        if !self.repo.delete(&txn, id).await? {
            return Err(DomainError::not_found("machine", id));
        }
        txn.commit().await?;

        tracing::info!("Deleted machine");
        Ok(())
    }

    /// Machine with `serial` regardless of the caller; used by the import job.
    pub(crate) async fn find_by_serial_in<C: DBRunner>(
        &self,
        conn: &C,
        serial: &str,
    ) -> Result<Option<Machine>, DomainError> {
        self.repo
            .find_by_serial(conn, &AccessScope::allow_all(), serial)
            .await
    }
}

/// Copy the free-text and date fields of `patch` onto `machine`.
fn apply_descriptive_fields(machine: &mut Machine, patch: MachinePatch) {
    for (value, slot) in [
        (patch.serial_engine, &mut machine.serial_engine),
        (patch.serial_transmission, &mut machine.serial_transmission),
        (patch.serial_drive_bridge, &mut machine.serial_drive_bridge),
        (patch.serial_steer_bridge, &mut machine.serial_steer_bridge),
    ] {
        if let Some(v) = value {
            *slot = v.trim().to_owned();
        }
    }
    for (value, slot) in [
        (patch.contract_number, &mut machine.contract_number),
        (patch.consignee, &mut machine.consignee),
        (patch.delivery_address, &mut machine.delivery_address),
        (patch.equipment, &mut machine.equipment),
    ] {
        if let Some(v) = value {
            *slot = v;
        }
    }
    if let Some(v) = patch.shipment_date {
        machine.shipment_date = v;
    }
}
