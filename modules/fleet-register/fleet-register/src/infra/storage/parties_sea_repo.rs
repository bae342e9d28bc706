use std::collections::HashMap;

use async_trait::async_trait;
use fleet_register_sdk::{Page, Party, PartyFilter};
use fleet_security::{Role, RoleSet};
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{PartiesRepository, Window};
use crate::infra::storage::db::DBRunner;
use crate::infra::storage::entity::party::{
    ActiveModel, Column, Entity as PartyEntity, Model,
};
use crate::infra::storage::entity::{complaint, machine, maintenance, party_role};

/// ORM-based implementation of the `PartiesRepository` trait.
#[derive(Clone, Copy, Default)]
pub struct OrmPartiesRepository;

/// Load memberships of `ids`. Unknown role names in storage are skipped.
async fn load_roles<C: DBRunner>(
    conn: &C,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, RoleSet>, DomainError> {
    let rows = party_role::Entity::find()
        .filter(party_role::Column::PartyId.is_in(ids.iter().copied()))
        .all(conn)
        .await?;
    let mut roles: HashMap<Uuid, RoleSet> = HashMap::new();
    for row in rows {
        if let Ok(role) = row.role.parse::<Role>() {
            roles.entry(row.party_id).or_default().insert(role);
        }
    }
    Ok(roles)
}

async fn with_roles<C: DBRunner>(conn: &C, models: Vec<Model>) -> Result<Vec<Party>, DomainError> {
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut roles = if ids.is_empty() {
        HashMap::new()
    } else {
        load_roles(conn, &ids).await?
    };
    Ok(models
        .into_iter()
        .map(|m| Party {
            roles: roles.remove(&m.id).unwrap_or_default(),
            id: m.id,
            username: m.username,
            display_name: m.display_name,
            is_staff: m.is_staff,
        })
        .collect())
}

async fn one_with_roles<C: DBRunner>(
    conn: &C,
    model: Option<Model>,
) -> Result<Option<Party>, DomainError> {
    match model {
        Some(m) => Ok(with_roles(conn, vec![m]).await?.pop()),
        None => Ok(None),
    }
}

#[async_trait]
impl PartiesRepository for OrmPartiesRepository {
    async fn get<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<Option<Party>, DomainError> {
        let found = PartyEntity::find_by_id(id).one(conn).await?;
        one_with_roles(conn, found).await
    }

    async fn find_by_username<C: DBRunner>(
        &self,
        conn: &C,
        username: &str,
    ) -> Result<Option<Party>, DomainError> {
        let found = PartyEntity::find()
            .filter(Column::Username.eq(username))
            .one(conn)
            .await?;
        one_with_roles(conn, found).await
    }

    async fn find_by_display_name<C: DBRunner>(
        &self,
        conn: &C,
        display_name: &str,
    ) -> Result<Option<Party>, DomainError> {
        let found = PartyEntity::find()
            .filter(Column::DisplayName.eq(display_name))
            .order_by(Column::Id, Order::Asc)
            .one(conn)
            .await?;
        one_with_roles(conn, found).await
    }

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        filter: &PartyFilter,
        window: Window,
    ) -> Result<Page<Party>, DomainError> {
        let mut cond = Condition::all();
        if let Some(role) = filter.role {
            cond = cond.add(
                Column::Id.in_subquery(
                    Query::select()
                        .column(party_role::Column::PartyId)
                        .from(party_role::Entity)
                        .and_where(party_role::Column::Role.eq(role.as_str()))
                        .to_owned(),
                ),
            );
        }
        let query = PartyEntity::find().filter(cond);

        let total = query.clone().count(conn).await?;
        let models = query
            .order_by(Column::Username, Order::Asc)
            .limit(window.limit)
            .offset(window.offset)
            .all(conn)
            .await?;

        Ok(Page {
            items: with_roles(conn, models).await?,
            total,
            limit: window.limit,
            offset: window.offset,
        })
    }

    async fn insert<C: DBRunner>(&self, conn: &C, party: Party) -> Result<Party, DomainError> {
        PartyEntity::insert(ActiveModel {
            id: Set(party.id),
            username: Set(party.username.clone()),
            display_name: Set(party.display_name.clone()),
            is_staff: Set(party.is_staff),
        })
        .exec_without_returning(conn)
        .await?;

        for role in party.roles.iter() {
            self.grant_role(conn, party.id, role).await?;
        }
        Ok(party)
    }

    async fn grant_role<C: DBRunner>(
        &self,
        conn: &C,
        party_id: Uuid,
        role: Role,
    ) -> Result<(), DomainError> {
        party_role::Entity::insert(party_role::ActiveModel {
            party_id: Set(party_id),
            role: Set(role.as_str().to_owned()),
        })
        .on_conflict(
            OnConflict::columns([party_role::Column::PartyId, party_role::Column::Role])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
        Ok(())
    }

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let result = PartyEntity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }

    async fn is_referenced<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError> {
        let machines = machine::Entity::find()
            .filter(
                Condition::any()
                    .add(machine::Column::ClientId.eq(id))
                    .add(machine::Column::ServiceCompanyId.eq(id)),
            )
            .count(conn)
            .await?;
        if machines > 0 {
            return Ok(true);
        }

        let maintenance = maintenance::Entity::find()
            .filter(maintenance::Column::ServiceCompanyId.eq(id))
            .count(conn)
            .await?;
        if maintenance > 0 {
            return Ok(true);
        }

        let complaints = complaint::Entity::find()
            .filter(complaint::Column::ServiceCompanyId.eq(id))
            .count(conn)
            .await?;
        Ok(complaints > 0)
    }
}
