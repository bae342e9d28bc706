#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Fleet register SDK
//!
//! Public contract of the `fleet_register` module:
//!
//! - [`models`] - parties, reference entries, machines and their service records
//! - [`query`] - list filters and pagination
//! - [`FleetRegisterError`] - errors safe to expose to consumers

pub mod errors;
pub mod models;
pub mod query;

pub use errors::FleetRegisterError;
pub use models::{
    Complaint, ComplaintPatch, Machine, MachinePatch, MachinePublic, Maintenance,
    MaintenancePatch, Me, NewComplaint, NewMachine, NewMaintenance, NewParty, NewReferenceEntry,
    Party, ReferenceCategory, ReferenceEntry, ReferenceEntryPatch, ReferenceRef,
};
pub use query::{
    ComplaintFilter, MachineFilter, MaintenanceFilter, Page, PageRequest, PartyFilter,
    ReferenceFilter,
};
