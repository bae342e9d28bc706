use std::sync::Arc;

use fleet_register_sdk::{
    NewReferenceEntry, Page, PageRequest, ReferenceCategory, ReferenceEntry, ReferenceEntryPatch,
    ReferenceFilter,
};
use fleet_security::SecurityContext;
use tracing::instrument;
use uuid::Uuid;

use super::ServiceConfig;
use crate::domain::authz::{Requester, Resource, authorize_write, require_authenticated};
use crate::domain::error::DomainError;
use crate::domain::lifecycle::required_text;
use crate::domain::repos::ReferencesRepository;
use crate::infra::storage::db::{DBRunner, DbProvider};

/// Reference vocabulary service.
///
/// Every authenticated caller reads the vocabulary; only managers curate it.
/// Entries also appear lazily whenever a write names one that does not exist.
pub struct ReferencesService<R: ReferencesRepository> {
    db: Arc<DbProvider>,
    repo: Arc<R>,
    config: ServiceConfig,
}

impl<R: ReferencesRepository> ReferencesService<R> {
    pub fn new(db: Arc<DbProvider>, repo: Arc<R>, config: ServiceConfig) -> Self {
        Self { db, repo, config }
    }

    #[instrument(skip(self, ctx), fields(reference.id = %id))]
    pub async fn get_reference(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<ReferenceEntry, DomainError> {
        require_authenticated(&Requester::from_context(ctx))?;
        self.repo
            .get(self.db.conn(), id)
            .await?
            .ok_or_else(|| DomainError::not_found("reference", id))
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn list_references(
        &self,
        ctx: &SecurityContext,
        filter: &ReferenceFilter,
        page: PageRequest,
    ) -> Result<Page<ReferenceEntry>, DomainError> {
        require_authenticated(&Requester::from_context(ctx))?;
        self.repo
            .list_page(self.db.conn(), filter, self.config.window(page))
            .await
    }

    /// Idempotent lookup of `(category, name)`, creating the entry on first use.
    #[instrument(skip(self, ctx), fields(reference.category = %category))]
    pub async fn get_or_create(
        &self,
        ctx: &SecurityContext,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<ReferenceEntry, DomainError> {
        require_authenticated(&Requester::from_context(ctx))?;
        let name = required_text("name", name)?;

        let txn = self.db.begin().await?;
        let entry = self.get_or_create_in(&txn, category, &name).await?;
        txn.commit().await?;
        Ok(entry)
    }

    pub(crate) async fn get_or_create_in<C: DBRunner>(
        &self,
        conn: &C,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<ReferenceEntry, DomainError> {
        self.repo.get_or_create(conn, category, name).await
    }

    #[instrument(skip(self, ctx, new), fields(reference.category = %new.category))]
    pub async fn create_reference(
        &self,
        ctx: &SecurityContext,
        new: NewReferenceEntry,
    ) -> Result<ReferenceEntry, DomainError> {
        tracing::info!("Creating reference entry");
        authorize_write(&Requester::from_context(ctx), Resource::Reference, None)?;
        let name = required_text("name", &new.name)?;

        let txn = self.db.begin().await?;
        if self.repo.find(&txn, new.category, &name).await?.is_some() {
            return Err(DomainError::already_exists(
                "reference",
                format!("{}/{name}", new.category),
            ));
        }
        let entry = self
            .repo
            .insert(
                &txn,
                ReferenceEntry {
                    id: Uuid::now_v7(),
                    category: new.category,
                    name,
                    description: new.description,
                },
            )
            .await?;
        txn.commit().await?;

        tracing::info!(reference.id = %entry.id, "Created reference entry");
        Ok(entry)
    }

    #[instrument(skip(self, ctx, patch), fields(reference.id = %id))]
    pub async fn update_reference(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        patch: ReferenceEntryPatch,
    ) -> Result<ReferenceEntry, DomainError> {
        tracing::info!("Updating reference entry");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        let mut entry = self
            .repo
            .get(&txn, id)
            .await?
            .ok_or_else(|| DomainError::not_found("reference", id))?;
        authorize_write(&requester, Resource::Reference, None)?;

        if let Some(name) = patch.name {
            let name = required_text("name", &name)?;
            if name != entry.name && self.repo.find(&txn, entry.category, &name).await?.is_some() {
                return Err(DomainError::already_exists(
                    "reference",
                    format!("{}/{name}", entry.category),
                ));
            }
            entry.name = name;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }

        let entry = self.repo.update(&txn, entry).await?;
        txn.commit().await?;
        Ok(entry)
    }

    /// Delete an entry nothing points at.
    #[instrument(skip(self, ctx), fields(reference.id = %id))]
    pub async fn delete_reference(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        tracing::info!("Deleting reference entry");
        let requester = Requester::from_context(ctx);
        require_authenticated(&requester)?;

        let txn = self.db.begin().await?;
        self.repo
            .get(&txn, id)
            .await?
            .ok_or_else(|| DomainError::not_found("reference", id))?;
        authorize_write(&requester, Resource::Reference, None)?;

        if self.repo.is_referenced(&txn, id).await? {
            return Err(DomainError::in_use("reference", id));
        }
        self.repo.delete(&txn, id).await?;
        txn.commit().await?;

        tracing::info!("Deleted reference entry");
        Ok(())
    }
}
