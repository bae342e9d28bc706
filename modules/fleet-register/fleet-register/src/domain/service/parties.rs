use std::sync::Arc;

use fleet_register_sdk::{Me, NewParty, Page, PageRequest, Party, PartyFilter};
use fleet_security::{Role, SecurityContext};
use tracing::instrument;
use uuid::Uuid;

use super::ServiceConfig;
use crate::domain::authz::{Requester, Resource, authorize_write, require_authenticated};
use crate::domain::error::DomainError;
use crate::domain::lifecycle::required_text;
use crate::domain::repos::PartiesRepository;
use crate::infra::storage::db::{DBRunner, DbProvider};

/// Party directory service.
pub struct PartiesService<R: PartiesRepository> {
    db: Arc<DbProvider>,
    repo: Arc<R>,
    config: ServiceConfig,
}

impl<R: PartiesRepository> PartiesService<R> {
    pub fn new(db: Arc<DbProvider>, repo: Arc<R>, config: ServiceConfig) -> Self {
        Self { db, repo, config }
    }

    /// The caller's own party and the role it acts under.
    #[instrument(skip(self, ctx))]
    pub async fn me(&self, ctx: &SecurityContext) -> Result<Me, DomainError> {
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;
        let id = requester.party_id().ok_or(DomainError::Unauthenticated)?;

        let party = self
            .repo
            .get(self.db.conn(), id)
            .await?
            .ok_or_else(|| DomainError::not_found("party", id))?;
        Ok(Me {
            party,
            effective_role: requester.role(),
        })
    }

    /// Resolve a username for the authentication layer. Not scoped: the
    /// caller is not known yet.
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Party>, DomainError> {
        self.repo.find_by_username(self.db.conn(), username).await
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn list_parties(
        &self,
        ctx: &SecurityContext,
        filter: &PartyFilter,
        page: PageRequest,
    ) -> Result<Page<Party>, DomainError> {
        require_authenticated(&Requester::from_context(ctx))?;
        self.repo
            .list_page(self.db.conn(), filter, self.config.window(page))
            .await
    }

    #[instrument(skip(self, ctx, new), fields(party.username = %new.username))]
    pub async fn create_party(&self, ctx: &SecurityContext, new: NewParty) -> Result<Party, DomainError> {
        tracing::info!("Creating party");
        authorize_write(&Requester::from_context(ctx), Resource::Party, None)?;

        let txn = self.db.begin().await?;
        let party = self.create_in(&txn, new).await?;
        txn.commit().await?;

        tracing::info!(party.id = %party.id, "Created party");
        Ok(party)
    }

    /// Insert a party on the caller's transaction. Authorization is the
    /// caller's concern.
    pub(crate) async fn create_in<C: DBRunner>(
        &self,
        conn: &C,
        new: NewParty,
    ) -> Result<Party, DomainError> {
        let username = required_text("username", &new.username)?;
        if self.repo.find_by_username(conn, &username).await?.is_some() {
            return Err(DomainError::already_exists("party", username));
        }
        let display_name = if new.display_name.trim().is_empty() {
            username.clone()
        } else {
            new.display_name.trim().to_owned()
        };

        self.repo
            .insert(
                conn,
                Party {
                    id: Uuid::now_v7(),
                    username,
                    display_name,
                    is_staff: new.is_staff,
                    roles: new.roles,
                },
            )
            .await
    }

    pub(crate) async fn find_by_display_name_in<C: DBRunner>(
        &self,
        conn: &C,
        display_name: &str,
    ) -> Result<Option<Party>, DomainError> {
        self.repo.find_by_display_name(conn, display_name).await
    }

    pub(crate) async fn username_taken_in<C: DBRunner>(
        &self,
        conn: &C,
        username: &str,
    ) -> Result<bool, DomainError> {
        Ok(self.repo.find_by_username(conn, username).await?.is_some())
    }

    pub(crate) async fn grant_role_in<C: DBRunner>(
        &self,
        conn: &C,
        party_id: Uuid,
        role: Role,
    ) -> Result<(), DomainError> {
        self.repo.grant_role(conn, party_id, role).await
    }

    /// Delete a party no machine or record refers to.
    #[instrument(skip(self, ctx), fields(party.id = %id))]
    pub async fn delete_party(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        tracing::info!("Deleting party");
        authorize_write(&Requester::from_context(ctx), Resource::Party, None)?;

        let txn = self.db.begin().await?;
        self.repo
            .get(&txn, id)
            .await?
            .ok_or_else(|| DomainError::not_found("party", id))?;
        if self.repo.is_referenced(&txn, id).await? {
            return Err(DomainError::in_use("party", id));
        }
        self.repo.delete(&txn, id).await?;
        txn.commit().await?;

        tracing::info!("Deleted party");
        Ok(())
    }
}
