//! Fleet Register Module
//!
//! Register of delivered machines with their maintenance history and failure
//! claims, shared between the manufacturer, service companies and clients.
//! Every read is narrowed to the caller's slice of the fleet and every write
//! is checked against the persisted ownership of the machine it touches.
//!
//! ## Architecture
//!
//! ### Contract Layer (`fleet-register-sdk`)
//! - Model types: `Machine`, `Maintenance`, `Complaint`, `ReferenceEntry`, `Party`
//! - Request/patch types and list filters
//! - Error type: `FleetRegisterError`
//!
//! ### API Layer (`fleet_register::api`)
//! - `routes.rs` - route table under `/fleet-register/v1`
//! - `handlers/` - request handlers per resource
//! - `auth.rs` - bearer token and role-hint header → `SecurityContext`
//! - `error.rs` - HTTP error mapping (domain errors → RFC9457 Problem)
//!
//! ### Domain Layer (`fleet_register::domain`)
//! - `authz/` - visibility filter and mutation authorizer
//! - `lifecycle.rs` - invariants applied on every save
//! - `service/` - business operations per resource
//! - `import.rs` - the bulk import job
//! - **Rule:** MUST NOT import `api::*` (one-way dependency only)
//!
//! ### Infrastructure Layer (`fleet_register::infra`)
//! - `entity/` - `SeaORM` entity definitions
//! - `migrations/` - schema migrations and the role bootstrap
//! - `secure/` - scoped selects that cannot run without an access scope
//! - `*_sea_repo.rs` - repository implementations
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// === PUBLIC API (from SDK) ===
pub use fleet_register_sdk::{
    Complaint, FleetRegisterError, Machine, MachinePublic, Maintenance, NewParty, Party,
    ReferenceEntry,
};

// === MODULE DEFINITION ===
pub mod module;
pub use module::FleetRegister;

pub use config::{AuthNMode, AuthnConfig, FleetRegisterConfig, TokenMapping};
pub use domain::import::{ImportDocument, ImportOptions, ImportSummary, SheetSummary};
pub use infra::storage::db::{ConnectOpts, connect_db};

// === INTERNAL MODULES ===
// WARNING: These modules are internal implementation details!
// They are exposed only for comprehensive testing and should NOT be used by external consumers.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

#[cfg(test)]
mod test_support;
