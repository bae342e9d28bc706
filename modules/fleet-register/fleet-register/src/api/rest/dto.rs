//! Query-string DTOs. Request and response bodies are the SDK models.

use fleet_register_sdk::{
    ComplaintFilter, MachineFilter, MaintenanceFilter, PageRequest, PartyFilter,
    ReferenceCategory, ReferenceFilter,
};
use fleet_security::Role;
use serde::Deserialize;
use uuid::Uuid;

/// `?serial=` of the anonymous lookup.
#[derive(Debug, Default, Deserialize)]
pub struct PublicLookupQuery {
    #[serde(default)]
    pub serial: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MachineListQuery {
    pub model_technique: Option<Uuid>,
    pub model_engine: Option<Uuid>,
    pub model_transmission: Option<Uuid>,
    pub model_steer_bridge: Option<Uuid>,
    pub model_drive_bridge: Option<Uuid>,
    pub client: Option<Uuid>,
    pub service_company: Option<Uuid>,
    pub serial: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl MachineListQuery {
    #[must_use]
    pub fn into_parts(self) -> (MachineFilter, PageRequest) {
        (
            MachineFilter {
                model_technique: self.model_technique,
                model_engine: self.model_engine,
                model_transmission: self.model_transmission,
                model_steer_bridge: self.model_steer_bridge,
                model_drive_bridge: self.model_drive_bridge,
                client: self.client,
                service_company: self.service_company,
                serial: self.serial,
            },
            PageRequest {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceListQuery {
    pub kind: Option<Uuid>,
    pub machine: Option<Uuid>,
    pub service_company: Option<Uuid>,
    pub machine_serial: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl MaintenanceListQuery {
    #[must_use]
    pub fn into_parts(self) -> (MaintenanceFilter, PageRequest) {
        (
            MaintenanceFilter {
                kind: self.kind,
                machine: self.machine,
                service_company: self.service_company,
                machine_serial: self.machine_serial,
            },
            PageRequest {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ComplaintListQuery {
    pub failure_node: Option<Uuid>,
    pub recovery_method: Option<Uuid>,
    pub machine: Option<Uuid>,
    pub service_company: Option<Uuid>,
    pub machine_serial: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ComplaintListQuery {
    #[must_use]
    pub fn into_parts(self) -> (ComplaintFilter, PageRequest) {
        (
            ComplaintFilter {
                failure_node: self.failure_node,
                recovery_method: self.recovery_method,
                machine: self.machine,
                service_company: self.service_company,
                machine_serial: self.machine_serial,
            },
            PageRequest {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferenceListQuery {
    pub category: Option<ReferenceCategory>,
    pub name: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ReferenceListQuery {
    #[must_use]
    pub fn into_parts(self) -> (ReferenceFilter, PageRequest) {
        (
            ReferenceFilter {
                category: self.category,
                name: self.name,
            },
            PageRequest {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PartyListQuery {
    pub role: Option<Role>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PartyListQuery {
    #[must_use]
    pub fn into_parts(self) -> (PartyFilter, PageRequest) {
        (
            PartyFilter { role: self.role },
            PageRequest {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}
