//! Domain service layer - business logic and rules.
//!
//! ## Architecture
//!
//! One service per resource:
//! - `machines` - machine CRUD and the anonymous public lookup
//! - `maintenance` - maintenance records of a machine
//! - `complaints` - failure claims of a machine, with downtime bookkeeping
//! - `references` - the controlled vocabulary and its lazy get-or-create
//! - `parties` - the party directory and the caller's own identity
//!
//! ## Layering Rules
//!
//! The domain layer:
//! - **MAY** import: `fleet_register_sdk` (contract types), `infra` (data access), `fleet_security`
//! - **MUST NOT** import: `api::*` (one-way dependency: API → Domain)
//!
//! ## Security
//!
//! Every operation starts from the caller's [`Requester`]:
//! 1. reads are narrowed by [`scope_for`](crate::domain::authz::scope_for);
//!    a row outside the scope is reported as not found;
//! 2. writes load the target inside the caller's scope, then consult
//!    [`authorize_write`](crate::domain::authz::authorize_write) against the
//!    persisted machine (and the new machine when a record moves).
//!
//! ## Connection Management
//!
//! Services acquire connections internally via [`DbProvider`]. Each write
//! runs in one transaction: authorization, lifecycle hooks and the write
//! commit together or not at all. The `*_in` variants run on a caller's
//! transaction so the import job can batch a whole row.

use std::sync::Arc;

use fleet_register_sdk::{PageRequest, ReferenceCategory, ReferenceRef};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{
    ComplaintsRepository, MachinesRepository, MaintenanceRepository, PartiesRepository,
    ReferencesRepository, Window,
};
use crate::infra::storage::db::{DBRunner, DbProvider};

mod complaints;
mod machines;
mod maintenance;
mod parties;
mod references;

pub use complaints::ComplaintsService;
pub use machines::MachinesService;
pub use maintenance::{MachineSource, MaintenanceService};
pub use parties::PartiesService;
pub use references::ReferencesService;

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 1000,
        }
    }
}

impl ServiceConfig {
    /// Resolve a requested window against the configured limits.
    #[must_use]
    pub fn window(&self, page: PageRequest) -> Window {
        let limit = page
            .limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1));
        Window {
            limit,
            offset: page.offset.unwrap_or(0),
        }
    }
}

/// Resolve a reference given for `field` into an entry id of `category`.
///
/// Ids must name an entry of that category; names are created on first use.
async fn resolve_reference<RR: ReferencesRepository, C: DBRunner>(
    refs: &RR,
    conn: &C,
    field: &str,
    category: ReferenceCategory,
    reference: &ReferenceRef,
) -> Result<Uuid, DomainError> {
    match reference {
        ReferenceRef::Id { id } => match refs.get(conn, *id).await? {
            Some(entry) if entry.category == category => Ok(entry.id),
            Some(entry) => Err(DomainError::validation(
                field,
                format!("expected a {category} entry, got {}", entry.category),
            )),
            None => Err(DomainError::validation(
                field,
                format!("reference entry {id} not found"),
            )),
        },
        ReferenceRef::Name { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation(field, "must not be empty"));
            }
            Ok(refs.get_or_create(conn, category, name).await?.id)
        }
    }
}

/// Fail with a validation error on `field` unless the party exists.
async fn require_party<PR: PartiesRepository, C: DBRunner>(
    parties: &PR,
    conn: &C,
    field: &str,
    id: Uuid,
) -> Result<(), DomainError> {
    if parties.get(conn, id).await?.is_some() {
        Ok(())
    } else {
        Err(DomainError::validation(field, format!("party {id} not found")))
    }
}

// DI Container - aggregates all domain services
pub struct AppServices<MR, TR, CR, RR, PR>
where
    MR: MachinesRepository + 'static,
    TR: MaintenanceRepository + 'static,
    CR: ComplaintsRepository + 'static,
    RR: ReferencesRepository + 'static,
    PR: PartiesRepository + 'static,
{
    pub machines: Arc<MachinesService<MR, RR, PR>>,
    pub maintenance: Arc<MaintenanceService<TR, MR, RR, PR>>,
    pub complaints: Arc<ComplaintsService<CR, MR, RR, PR>>,
    pub references: Arc<ReferencesService<RR>>,
    pub parties: Arc<PartiesService<PR>>,
    pub config: ServiceConfig,
    db: Arc<DbProvider>,
}

#[cfg(test)]
mod tests_scoping;

#[cfg(test)]
mod tests_lifecycle;

impl<MR, TR, CR, RR, PR> AppServices<MR, TR, CR, RR, PR>
where
    MR: MachinesRepository + 'static,
    TR: MaintenanceRepository + 'static,
    CR: ComplaintsRepository + 'static,
    RR: ReferencesRepository + 'static,
    PR: PartiesRepository + 'static,
{
    #[must_use]
    pub fn new(
        machines_repo: MR,
        maintenance_repo: TR,
        complaints_repo: CR,
        references_repo: RR,
        parties_repo: PR,
        db: Arc<DbProvider>,
        config: ServiceConfig,
    ) -> Self {
        let machines_repo = Arc::new(machines_repo);
        let references_repo = Arc::new(references_repo);
        let parties_repo = Arc::new(parties_repo);

        let machines = Arc::new(MachinesService::new(
            Arc::clone(&db),
            Arc::clone(&machines_repo),
            Arc::clone(&references_repo),
            Arc::clone(&parties_repo),
            config.clone(),
        ));
        let maintenance = Arc::new(MaintenanceService::new(
            Arc::clone(&db),
            Arc::new(maintenance_repo),
            Arc::clone(&machines_repo),
            Arc::clone(&references_repo),
            Arc::clone(&parties_repo),
            config.clone(),
        ));
        let complaints = Arc::new(ComplaintsService::new(
            Arc::clone(&db),
            Arc::new(complaints_repo),
            Arc::clone(&machines_repo),
            Arc::clone(&references_repo),
            Arc::clone(&parties_repo),
            config.clone(),
        ));
        let references = Arc::new(ReferencesService::new(
            Arc::clone(&db),
            references_repo,
            config.clone(),
        ));
        let parties = Arc::new(PartiesService::new(
            Arc::clone(&db),
            parties_repo,
            config.clone(),
        ));

        Self {
            machines,
            maintenance,
            complaints,
            references,
            parties,
            config,
            db,
        }
    }

    /// The provider the services run on; the import job opens its row
    /// transactions here.
    #[must_use]
    pub fn db(&self) -> &Arc<DbProvider> {
        &self.db
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn window_applies_defaults_and_clamps() {
        let cfg = ServiceConfig {
            default_page_size: 50,
            max_page_size: 100,
        };
        assert_eq!(
            cfg.window(PageRequest::default()),
            Window {
                limit: 50,
                offset: 0
            }
        );
        assert_eq!(
            cfg.window(PageRequest {
                limit: Some(5000),
                offset: Some(20)
            }),
            Window {
                limit: 100,
                offset: 20
            }
        );
        assert_eq!(cfg.window(PageRequest { limit: Some(0), offset: None }).limit, 1);
    }
}
