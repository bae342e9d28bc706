use std::sync::Arc;

use axum::Router;
use axum::http::HeaderName;
use axum::middleware::from_fn_with_state;
use fleet_register_sdk::{FleetRegisterError, NewParty, Party};
use fleet_security::SecurityContext;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::api::rest::auth::{AuthState, authn_middleware};
use crate::api::rest::routes;
use crate::config::{AuthnConfig, FleetRegisterConfig};
use crate::domain::import::{ImportDocument, ImportOptions, ImportSummary, run_import};
use crate::domain::service::AppServices;
use crate::infra::storage::db::{DbProvider, run_migrations};
use crate::infra::storage::{
    OrmComplaintsRepository, OrmMachinesRepository, OrmMaintenanceRepository,
    OrmPartiesRepository, OrmReferencesRepository,
};

/// Type alias for the concrete `AppServices` type used with ORM repositories.
pub(crate) type ConcreteAppServices = AppServices<
    OrmMachinesRepository,
    OrmMaintenanceRepository,
    OrmComplaintsRepository,
    OrmReferencesRepository,
    OrmPartiesRepository,
>;

/// The fleet register: domain services over one database, served as an axum
/// router and driven by the import job.
#[derive(Clone)]
pub struct FleetRegister {
    services: Arc<ConcreteAppServices>,
    config: FleetRegisterConfig,
}

impl FleetRegister {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: FleetRegisterConfig) -> Self {
        info!("Initializing fleet register module");
        let services = Arc::new(ConcreteAppServices::new(
            OrmMachinesRepository,
            OrmMaintenanceRepository,
            OrmComplaintsRepository,
            OrmReferencesRepository,
            OrmPartiesRepository,
            Arc::new(DbProvider::new(db)),
            config.service_config(),
        ));
        Self { services, config }
    }

    /// Apply pending schema migrations, including the role bootstrap.
    ///
    /// # Errors
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        info!("Running fleet register migrations");
        run_migrations(self.services.db().conn())
            .await
            .map_err(|e| anyhow::anyhow!("fleet register migrations failed: {e}"))
    }

    /// Routes under `/fleet-register/v1`, with bearer authentication and the
    /// role-hint header resolved into a `SecurityContext`.
    ///
    /// # Errors
    /// Returns an error if the configured role header is not a valid header name.
    pub fn router(&self, authn: AuthnConfig) -> anyhow::Result<Router> {
        let role_header = HeaderName::try_from(self.config.role_header.as_str()).map_err(|e| {
            anyhow::anyhow!("invalid role header '{}': {e}", self.config.role_header)
        })?;
        let state = AuthState::new(Arc::clone(&self.services), authn, role_header);

        let router = routes::register_routes(Router::new(), Arc::clone(&self.services))
            .layer(from_fn_with_state(state, authn_middleware));
        info!("Fleet register REST routes registered");
        Ok(router)
    }

    /// Ensure a party with `new.username` exists. An existing party is
    /// returned unchanged.
    ///
    /// # Errors
    /// Returns `FleetRegisterError` if the party cannot be read or created.
    pub async fn bootstrap_party(&self, new: NewParty) -> Result<Party, FleetRegisterError> {
        let parties = &self.services.parties;
        if let Some(existing) = parties.find_by_username(new.username.trim()).await? {
            return Ok(existing);
        }
        let party = parties
            .create_party(&SecurityContext::system(), new)
            .await?;
        info!(party.id = %party.id, party.username = %party.username, "Bootstrapped party");
        Ok(party)
    }

    /// Import a document with manager authority.
    ///
    /// # Errors
    /// Returns `FleetRegisterError::Internal` if the datastore fails mid-import.
    pub async fn import(
        &self,
        doc: ImportDocument,
        opts: &ImportOptions,
    ) -> Result<ImportSummary, FleetRegisterError> {
        Ok(run_import(&self.services, doc, opts).await?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_support::inmem_db;
    use fleet_security::{Role, RoleSet};

    #[tokio::test]
    async fn bootstrap_party_is_idempotent() {
        let register = FleetRegister::new(inmem_db().await, FleetRegisterConfig::default());
        let new = NewParty {
            username: "admin".to_owned(),
            display_name: "Administrator".to_owned(),
            is_staff: true,
            roles: RoleSet::from([Role::Manager]),
        };
        let first = register.bootstrap_party(new.clone()).await.unwrap();
        let second = register.bootstrap_party(new).await.unwrap();
        assert_eq!(first, second);
        assert!(second.is_staff);
    }

    #[tokio::test]
    async fn invalid_role_header_is_rejected() {
        let register = FleetRegister::new(
            inmem_db().await,
            FleetRegisterConfig {
                role_header: "bad header".to_owned(),
                ..FleetRegisterConfig::default()
            },
        );
        assert!(register.router(AuthnConfig::default()).is_err());
    }
}
