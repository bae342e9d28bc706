use async_trait::async_trait;
use fleet_register_sdk::{Maintenance, MaintenanceFilter, Page};
use fleet_security::AccessScope;
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, Condition, EntityTrait, Order, QueryFilter, Set};
use time::Date;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{MaintenanceRepository, Window};
use crate::infra::storage::db::DBRunner;
use crate::infra::storage::filters::serial_contains;
use crate::infra::storage::entity::machine;
use crate::infra::storage::entity::maintenance::{
    ActiveModel, Column, Entity as MaintenanceEntity, Model,
};
use crate::infra::storage::secure::SecureEntityExt;

/// ORM-based implementation of the `MaintenanceRepository` trait.
#[derive(Clone, Copy, Default)]
pub struct OrmMaintenanceRepository;

impl From<Model> for Maintenance {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            machine_id: m.machine_id,
            kind_id: m.kind_id,
            performed_date: m.performed_date,
            operating_hours: u32::try_from(m.operating_hours).unwrap_or_default(),
            work_order_number: m.work_order_number,
            work_order_date: m.work_order_date,
            organization_id: m.organization_id,
            service_company_id: m.service_company_id,
        }
    }
}

fn active_model(r: Maintenance) -> ActiveModel {
    ActiveModel {
        id: Set(r.id),
        machine_id: Set(r.machine_id),
        kind_id: Set(r.kind_id),
        performed_date: Set(r.performed_date),
        operating_hours: Set(i64::from(r.operating_hours)),
        work_order_number: Set(r.work_order_number),
        work_order_date: Set(r.work_order_date),
        organization_id: Set(r.organization_id),
        service_company_id: Set(r.service_company_id),
    }
}

fn filter_condition(filter: &MaintenanceFilter) -> Condition {
    let mut cond = Condition::all();
    let exact = [
        (Column::KindId, filter.kind),
        (Column::MachineId, filter.machine),
        (Column::ServiceCompanyId, filter.service_company),
    ];
    for (col, value) in exact {
        if let Some(id) = value {
            cond = cond.add(col.eq(id));
        }
    }
    if let Some(serial) = filter.machine_serial.as_deref().map(str::trim)
        && !serial.is_empty()
    {
        cond = cond.add(
            Column::MachineId.in_subquery(
                Query::select()
                    .column(machine::Column::Id)
                    .from(machine::Entity)
                    .and_where(serial_contains(serial))
                    .to_owned(),
            ),
        );
    }
    cond
}

#[async_trait]
impl MaintenanceRepository for OrmMaintenanceRepository {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<Option<Maintenance>, DomainError> {
        let found = MaintenanceEntity::find()
            .secure()
            .scope_via_machine(scope)
            .and_id(id)?
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        filter: &MaintenanceFilter,
        window: Window,
    ) -> Result<Page<Maintenance>, DomainError> {
        let query = MaintenanceEntity::find()
            .secure()
            .scope_via_machine(scope)
            .filter(filter_condition(filter));

        let total = query.clone().count(conn).await?;
        let items = query
            .order_by(Column::PerformedDate, Order::Desc)
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
        record: Maintenance,
    ) -> Result<Maintenance, DomainError> {
        MaintenanceEntity::insert(active_model(record.clone()))
            .exec_without_returning(conn)
            .await?;
        Ok(record)
    }

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        record: Maintenance,
    ) -> Result<Maintenance, DomainError> {
        let updated = MaintenanceEntity::update(active_model(record))
            .exec(conn)
            .await?;
        Ok(updated.into())
    }

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let result = MaintenanceEntity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_same<C: DBRunner>(
        &self,
        conn: &C,
        machine_id: Uuid,
        kind_id: Uuid,
        performed_date: Date,
    ) -> Result<Option<Maintenance>, DomainError> {
        let found = MaintenanceEntity::find()
            .filter(Column::MachineId.eq(machine_id))
            .filter(Column::KindId.eq(kind_id))
            .filter(Column::PerformedDate.eq(performed_date))
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn machine_serial_filter_goes_through_machines() {
        let filter = MaintenanceFilter {
            machine_serial: Some("0017".to_owned()),
            ..MaintenanceFilter::default()
        };
        let sql = MaintenanceEntity::find()
            .filter(filter_condition(&filter))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#""machine_id" IN (SELECT "id" FROM "machines""#), "{sql}");
        assert!(sql.contains("LIKE '%0017%'"), "{sql}");
    }
}
