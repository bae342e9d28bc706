use async_trait::async_trait;
use fleet_register_sdk::{Page, ReferenceCategory, ReferenceEntry, ReferenceFilter};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{ReferencesRepository, Window};
use crate::infra::storage::db::DBRunner;
use crate::infra::storage::entity::reference::{
    ActiveModel, Column, Entity as ReferenceEntity, Model,
};
use crate::infra::storage::entity::{complaint, machine, maintenance};

/// ORM-based implementation of the `ReferencesRepository` trait.
#[derive(Clone, Copy, Default)]
pub struct OrmReferencesRepository;

fn to_domain(m: Model) -> Result<ReferenceEntry, DomainError> {
    let category = m
        .category
        .parse::<ReferenceCategory>()
        .map_err(DomainError::database)?;
    Ok(ReferenceEntry {
        id: m.id,
        category,
        name: m.name,
        description: m.description,
    })
}

fn active_model(e: ReferenceEntry) -> ActiveModel {
    ActiveModel {
        id: Set(e.id),
        category: Set(e.category.as_str().to_owned()),
        name: Set(e.name),
        description: Set(e.description),
    }
}

#[async_trait]
impl ReferencesRepository for OrmReferencesRepository {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<ReferenceEntry>, DomainError> {
        ReferenceEntity::find_by_id(id)
            .one(conn)
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn get_many<C: DBRunner>(
        &self,
        conn: &C,
        ids: &[Uuid],
    ) -> Result<Vec<ReferenceEntry>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ReferenceEntity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn find<C: DBRunner>(
        &self,
        conn: &C,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<Option<ReferenceEntry>, DomainError> {
        ReferenceEntity::find()
            .filter(Column::Category.eq(category.as_str()))
            .filter(Column::Name.eq(name))
            .one(conn)
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn get_or_create<C: DBRunner>(
        &self,
        conn: &C,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<ReferenceEntry, DomainError> {
        let candidate = ReferenceEntry {
            id: Uuid::now_v7(),
            category,
            name: name.to_owned(),
            description: String::new(),
        };
        // A losing racer inserts nothing; the read below returns the winner.
        ReferenceEntity::insert(active_model(candidate))
            .on_conflict(
                OnConflict::columns([Column::Category, Column::Name])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        self.find(conn, category, name).await?.ok_or_else(|| {
            DomainError::database(format!("reference {category}/{name} vanished after insert"))
        })
    }

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        filter: &ReferenceFilter,
        window: Window,
    ) -> Result<Page<ReferenceEntry>, DomainError> {
        let mut cond = Condition::all();
        if let Some(category) = filter.category {
            cond = cond.add(Column::Category.eq(category.as_str()));
        }
        if let Some(name) = filter.name.as_deref() {
            cond = cond.add(Column::Name.eq(name));
        }
        let query = ReferenceEntity::find().filter(cond);

        let total = query.clone().count(conn).await?;
        let items = query
            .order_by(Column::Category, Order::Asc)
            .order_by(Column::Name, Order::Asc)
            .limit(window.limit)
            .offset(window.offset)
            .all(conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total,
            limit: window.limit,
            offset: window.offset,
        })
    }

    async fn insert<C: DBRunner>(
        &self,
        conn: &C,
        entry: ReferenceEntry,
    ) -> Result<ReferenceEntry, DomainError> {
        ReferenceEntity::insert(active_model(entry.clone()))
            .exec_without_returning(conn)
            .await?;
        Ok(entry)
    }

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        entry: ReferenceEntry,
    ) -> Result<ReferenceEntry, DomainError> {
        let updated = ReferenceEntity::update(active_model(entry)).exec(conn).await?;
        to_domain(updated)
    }

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let result = ReferenceEntity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }

    async fn is_referenced<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let machines = machine::Entity::find()
            .filter(
                Condition::any()
                    .add(machine::Column::ModelTechniqueId.eq(id))
                    .add(machine::Column::ModelEngineId.eq(id))
                    .add(machine::Column::ModelTransmissionId.eq(id))
                    .add(machine::Column::ModelDriveBridgeId.eq(id))
                    .add(machine::Column::ModelSteerBridgeId.eq(id)),
            )
            .count(conn)
            .await?;
        if machines > 0 {
            return Ok(true);
        }

        let maintenance = maintenance::Entity::find()
            .filter(
                Condition::any()
                    .add(maintenance::Column::KindId.eq(id))
                    .add(maintenance::Column::OrganizationId.eq(id)),
            )
            .count(conn)
            .await?;
        if maintenance > 0 {
            return Ok(true);
        }

        let complaints = complaint::Entity::find()
            .filter(
                Condition::any()
                    .add(complaint::Column::FailureNodeId.eq(id))
                    .add(complaint::Column::RecoveryMethodId.eq(id)),
            )
            .count(conn)
            .await?;
        Ok(complaints > 0)
    }
}
