use async_trait::async_trait;
use fleet_register_sdk::{Machine, MachineFilter, Page};
use fleet_security::AccessScope;
use sea_orm::{ColumnTrait, Condition, EntityTrait, Order, Set};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{MachinesRepository, Window};
use crate::infra::storage::db::DBRunner;
use crate::infra::storage::filters::serial_contains;
use crate::infra::storage::entity::machine::{ActiveModel, Column, Entity as MachineEntity, Model};
use crate::infra::storage::secure::SecureEntityExt;

/// ORM-based implementation of the `MachinesRepository` trait.
#[derive(Clone, Copy, Default)]
pub struct OrmMachinesRepository;

impl From<Model> for Machine {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            serial_number: m.serial_number,
            model_technique_id: m.model_technique_id,
            model_engine_id: m.model_engine_id,
            serial_engine: m.serial_engine,
            model_transmission_id: m.model_transmission_id,
            serial_transmission: m.serial_transmission,
            model_drive_bridge_id: m.model_drive_bridge_id,
            serial_drive_bridge: m.serial_drive_bridge,
            model_steer_bridge_id: m.model_steer_bridge_id,
            serial_steer_bridge: m.serial_steer_bridge,
            contract_number: m.contract_number,
            shipment_date: m.shipment_date,
            consignee: m.consignee,
            delivery_address: m.delivery_address,
            equipment: m.equipment,
            client_id: m.client_id,
            service_company_id: m.service_company_id,
        }
    }
}

fn active_model(m: Machine) -> ActiveModel {
    ActiveModel {
        id: Set(m.id),
        serial_number: Set(m.serial_number),
        model_technique_id: Set(m.model_technique_id),
        model_engine_id: Set(m.model_engine_id),
        serial_engine: Set(m.serial_engine),
        model_transmission_id: Set(m.model_transmission_id),
        serial_transmission: Set(m.serial_transmission),
        model_drive_bridge_id: Set(m.model_drive_bridge_id),
        serial_drive_bridge: Set(m.serial_drive_bridge),
        model_steer_bridge_id: Set(m.model_steer_bridge_id),
        serial_steer_bridge: Set(m.serial_steer_bridge),
        contract_number: Set(m.contract_number),
        shipment_date: Set(m.shipment_date),
        consignee: Set(m.consignee),
        delivery_address: Set(m.delivery_address),
        equipment: Set(m.equipment),
        client_id: Set(m.client_id),
        service_company_id: Set(m.service_company_id),
    }
}

fn filter_condition(filter: &MachineFilter) -> Condition {
    let mut cond = Condition::all();
    let exact = [
        (Column::ModelTechniqueId, filter.model_technique),
        (Column::ModelEngineId, filter.model_engine),
        (Column::ModelTransmissionId, filter.model_transmission),
        (Column::ModelSteerBridgeId, filter.model_steer_bridge),
        (Column::ModelDriveBridgeId, filter.model_drive_bridge),
        (Column::ClientId, filter.client),
        (Column::ServiceCompanyId, filter.service_company),
    ];
    for (col, value) in exact {
        if let Some(id) = value {
            cond = cond.add(col.eq(id));
        }
    }
    if let Some(serial) = filter.serial.as_deref().map(str::trim)
        && !serial.is_empty()
    {
        cond = cond.add(serial_contains(serial));
    }
    cond
}

#[async_trait]
impl MachinesRepository for OrmMachinesRepository {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<Option<Machine>, DomainError> {
        let found = MachineEntity::find()
            .secure()
            .scope_with(scope)
            .and_id(id)?
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn find_by_serial<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        serial: &str,
    ) -> Result<Option<Machine>, DomainError> {
        let found = MachineEntity::find()
            .secure()
            .scope_with(scope)
            .filter(Condition::all().add(Column::SerialNumber.eq(serial)))
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        filter: &MachineFilter,
        window: Window,
    ) -> Result<Page<Machine>, DomainError> {
        let query = MachineEntity::find()
            .secure()
            .scope_with(scope)
            .filter(filter_condition(filter));

        let total = query.clone().count(conn).await?;
        let items = query
            .order_by(Column::ShipmentDate, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(window.limit)
            .offset(window.offset)
            .all(conn)
            .await?;

        Ok(Page {
            items: items.into_iter().map(Into::into).collect(),
            total,
            limit: window.limit,
            offset: window.offset,
        })
    }

    async fn insert<C: DBRunner>(
        &self,
        conn: &C,
        machine: Machine,
    ) -> Result<Machine, DomainError> {
        MachineEntity::insert(active_model(machine.clone()))
            .exec_without_returning(conn)
            .await?;
        Ok(machine)
    }

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        machine: Machine,
    ) -> Result<Machine, DomainError> {
        let updated = MachineEntity::update(active_model(machine)).exec(conn).await?;
        Ok(updated.into())
    }

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let result = MachineEntity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};

    #[test]
    fn serial_filter_is_a_substring_match() {
        let filter = MachineFilter {
            serial: Some(" 0017 ".to_owned()),
            ..MachineFilter::default()
        };
        let sql = MachineEntity::find()
            .filter(filter_condition(&filter))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#""serial_number" LIKE '%0017%'"#), "{sql}");
    }

    #[test]
    fn serial_filter_matches_wildcards_literally() {
        let filter = MachineFilter {
            serial: Some("A_%".to_owned()),
            ..MachineFilter::default()
        };
        let sql = MachineEntity::find()
            .filter(filter_condition(&filter))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains("LIKE '%A!_!%%' ESCAPE '!'"), "{sql}");
    }

    #[test]
    fn blank_serial_filter_is_ignored() {
        let filter = MachineFilter {
            serial: Some("   ".to_owned()),
            ..MachineFilter::default()
        };
        let sql = MachineEntity::find()
            .filter(filter_condition(&filter))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("LIKE"), "{sql}");
    }
}
