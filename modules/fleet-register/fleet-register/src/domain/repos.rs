//! Repository ports of the domain layer.
//!
//! Every method takes the connection to run on, so a service can pass either
//! the pooled connection or an open transaction. Methods that take an
//! [`AccessScope`] return only rows inside it.

use async_trait::async_trait;
use fleet_register_sdk::{
    Complaint, ComplaintFilter, Machine, MachineFilter, Maintenance, MaintenanceFilter, Page,
    Party, PartyFilter, ReferenceCategory, ReferenceEntry, ReferenceFilter,
};
use fleet_security::{AccessScope, Role};
use time::Date;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::infra::storage::db::DBRunner;

/// A resolved `limit`/`offset` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait MachinesRepository: Send + Sync {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<Option<Machine>, DomainError>;

    async fn find_by_serial<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        serial: &str,
    ) -> Result<Option<Machine>, DomainError>;

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        filter: &MachineFilter,
        window: Window,
    ) -> Result<Page<Machine>, DomainError>;

    async fn insert<C: DBRunner>(&self, conn: &C, machine: Machine)
    -> Result<Machine, DomainError>;

    async fn update<C: DBRunner>(&self, conn: &C, machine: Machine)
    -> Result<Machine, DomainError>;

    /// Deletes the machine and, by cascade, its maintenance and complaints.
    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<Option<Maintenance>, DomainError>;

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        filter: &MaintenanceFilter,
        window: Window,
    ) -> Result<Page<Maintenance>, DomainError>;

    async fn insert<C: DBRunner>(
        &self,
        conn: &C,
        record: Maintenance,
    ) -> Result<Maintenance, DomainError>;

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        record: Maintenance,
    ) -> Result<Maintenance, DomainError>;

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;

    /// The record of the same kind performed on the same day, if any.
    async fn find_same<C: DBRunner>(
        &self,
        conn: &C,
        machine_id: Uuid,
        kind_id: Uuid,
        performed_date: Date,
    ) -> Result<Option<Maintenance>, DomainError>;
}

#[async_trait]
pub trait ComplaintsRepository: Send + Sync {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<Option<Complaint>, DomainError>;

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        scope: &AccessScope,
        filter: &ComplaintFilter,
        window: Window,
    ) -> Result<Page<Complaint>, DomainError>;

    async fn insert<C: DBRunner>(
        &self,
        conn: &C,
        record: Complaint,
    ) -> Result<Complaint, DomainError>;

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        record: Complaint,
    ) -> Result<Complaint, DomainError>;

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;

    /// The complaint about the same failure node on the same day, if any.
    async fn find_same<C: DBRunner>(
        &self,
        conn: &C,
        machine_id: Uuid,
        failure_node_id: Uuid,
        failure_date: Date,
    ) -> Result<Option<Complaint>, DomainError>;
}

/// Controlled vocabulary. Shared by every authenticated caller, so no scope.
#[async_trait]
pub trait ReferencesRepository: Send + Sync {
    async fn get<C: DBRunner>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<ReferenceEntry>, DomainError>;

    async fn get_many<C: DBRunner>(
        &self,
        conn: &C,
        ids: &[Uuid],
    ) -> Result<Vec<ReferenceEntry>, DomainError>;

    async fn find<C: DBRunner>(
        &self,
        conn: &C,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<Option<ReferenceEntry>, DomainError>;

    /// Idempotent: concurrent callers for the same `(category, name)` all get
    /// the one row that wins the insert.
    async fn get_or_create<C: DBRunner>(
        &self,
        conn: &C,
        category: ReferenceCategory,
        name: &str,
    ) -> Result<ReferenceEntry, DomainError>;

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        filter: &ReferenceFilter,
        window: Window,
    ) -> Result<Page<ReferenceEntry>, DomainError>;

    async fn insert<C: DBRunner>(
        &self,
        conn: &C,
        entry: ReferenceEntry,
    ) -> Result<ReferenceEntry, DomainError>;

    async fn update<C: DBRunner>(
        &self,
        conn: &C,
        entry: ReferenceEntry,
    ) -> Result<ReferenceEntry, DomainError>;

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;

    /// Whether any machine, maintenance or complaint row points at the entry.
    async fn is_referenced<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;
}

/// Party directory. Shared by every authenticated caller, so no scope.
#[async_trait]
pub trait PartiesRepository: Send + Sync {
    async fn get<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<Option<Party>, DomainError>;

    async fn find_by_username<C: DBRunner>(
        &self,
        conn: &C,
        username: &str,
    ) -> Result<Option<Party>, DomainError>;

    async fn find_by_display_name<C: DBRunner>(
        &self,
        conn: &C,
        display_name: &str,
    ) -> Result<Option<Party>, DomainError>;

    async fn list_page<C: DBRunner>(
        &self,
        conn: &C,
        filter: &PartyFilter,
        window: Window,
    ) -> Result<Page<Party>, DomainError>;

    /// Inserts the party together with its role memberships.
    async fn insert<C: DBRunner>(&self, conn: &C, party: Party) -> Result<Party, DomainError>;

    /// Adds a membership; holding it already is not an error.
    async fn grant_role<C: DBRunner>(
        &self,
        conn: &C,
        party_id: Uuid,
        role: Role,
    ) -> Result<(), DomainError>;

    async fn delete<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;

    /// Whether the party is client or service company of any machine or
    /// responsible for any maintenance or complaint row.
    async fn is_referenced<C: DBRunner>(&self, conn: &C, id: Uuid) -> Result<bool, DomainError>;
}
