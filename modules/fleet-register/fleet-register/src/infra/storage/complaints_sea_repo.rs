use async_trait::async_trait;
use fleet_register_sdk::{Complaint, ComplaintFilter, Page};
use fleet_security::AccessScope;
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, Condition, EntityTrait, Order, QueryFilter, Set};
use time::Date;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{ComplaintsRepository, Window};
use crate::infra::storage::db::DBRunner;
use crate::infra::storage::filters::serial_contains;
use crate::infra::storage::entity::complaint::{
    ActiveModel, Column, Entity as ComplaintEntity, Model,
};
use crate::infra::storage::entity::machine;
use crate::infra::storage::secure::SecureEntityExt;

/// ORM-based implementation of the `ComplaintsRepository` trait.
#[derive(Clone, Copy, Default)]
pub struct OrmComplaintsRepository;

impl From<Model> for Complaint {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            machine_id: m.machine_id,
            failure_date: m.failure_date,
            operating_hours: u32::try_from(m.operating_hours).unwrap_or_default(),
            failure_node_id: m.failure_node_id,
            failure_description: m.failure_description,
            recovery_method_id: m.recovery_method_id,
            parts_used: m.parts_used,
            recovery_date: m.recovery_date,
            downtime_days: u32::try_from(m.downtime_days).unwrap_or_default(),
            service_company_id: m.service_company_id,
        }
    }
}

fn active_model(c: Complaint) -> ActiveModel {
    ActiveModel {
        id: Set(c.id),
        machine_id: Set(c.machine_id),
        failure_date: Set(c.failure_date),
        operating_hours: Set(i64::from(c.operating_hours)),
        failure_node_id: Set(c.failure_node_id),
        failure_description: Set(c.failure_description),
        recovery_method_id: Set(c.recovery_method_id),
        parts_used: Set(c.parts_used),
        recovery_date: Set(c.recovery_date),
        downtime_days: Set(i64::from(c.downtime_days)),
        service_company_id: Set(c.service_company_id),
    }
}

fn filter_condition(filter: &ComplaintFilter) -> Condition {
    let mut cond = Condition::all();
    let exact = [
        (Column::FailureNodeId, filter.failure_node),
        (Column::RecoveryMethodId, filter.recovery_method),
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
impl ComplaintsRepository for OrmComplaintsRepository {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<Option<Complaint>, DomainError> {
        let found = ComplaintEntity::find()
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
        filter: &ComplaintFilter,
        window: Window,
    ) -> Result<Page<Complaint>, DomainError> {
        let query = ComplaintEntity::find()
            .secure()
            .scope_via_machine(scope)
            .filter(filter_condition(filter));

        let total = query.clone().count(conn).await?;
        let items = query
            .order_by(Column::FailureDate, Order::Desc)
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
        record: Complaint,
    ) -> Result<Complaint, DomainError> {
        ComplaintEntity::insert(active_model(record.clone()))
            .exec_without_returning(conn)
            .await?;
        Ok(record)
    }

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        record: Complaint,
    ) -> Result<Complaint, DomainError> {
        let updated = ComplaintEntity::update(active_model(record)).exec(conn).await?;
        Ok(updated.into())
    }

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let result = ComplaintEntity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_same<C: DBRunner>(
        &self,
        conn: &C,
        machine_id: Uuid,
        failure_node_id: Uuid,
        failure_date: Date,
    ) -> Result<Option<Complaint>, DomainError> {
        let found = ComplaintEntity::find()
            .filter(Column::MachineId.eq(machine_id))
            .filter(Column::FailureNodeId.eq(failure_node_id))
            .filter(Column::FailureDate.eq(failure_date))
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }
}
