use fleet_security::Role;
use sea_orm_migration::prelude::*;

use super::m20250601_000001_initial::Roles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert.into_table(Roles::Table).columns([Roles::Name]);
        for role in Role::ALL {
            insert
                .values([role.as_str().into()])
                .map_err(|e| DbErr::Migration(e.to_string()))?;
        }
        insert.on_conflict(OnConflict::column(Roles::Name).do_nothing().to_owned());

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Roles::Table)
            .and_where(Expr::col(Roles::Name).is_in(Role::ALL.map(Role::as_str)))
            .to_owned();
        manager.exec_stmt(delete).await
    }
}
