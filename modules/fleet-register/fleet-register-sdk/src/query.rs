//! List filters and offset pagination.
//!
//! Foreign-key filters match exactly; serial filters match by substring.

use fleet_security::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ReferenceCategory;

/// Requested window of a listing. Missing values fall back to module defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of rows matching the filter within the caller's visibility.
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineFilter {
    pub model_technique: Option<Uuid>,
    pub model_engine: Option<Uuid>,
    pub model_transmission: Option<Uuid>,
    pub model_steer_bridge: Option<Uuid>,
    pub model_drive_bridge: Option<Uuid>,
    pub client: Option<Uuid>,
    pub service_company: Option<Uuid>,
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceFilter {
    pub kind: Option<Uuid>,
    pub machine: Option<Uuid>,
    pub service_company: Option<Uuid>,
    pub machine_serial: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintFilter {
    pub failure_node: Option<Uuid>,
    pub recovery_method: Option<Uuid>,
    pub machine: Option<Uuid>,
    pub service_company: Option<Uuid>,
    pub machine_serial: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFilter {
    pub category: Option<ReferenceCategory>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyFilter {
    pub role: Option<Role>,
}
