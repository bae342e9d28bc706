//! Contract models of the fleet register.
//!
//! Read models carry foreign keys as ids. Write models address reference
//! entries through [`ReferenceRef`], so callers may pass either an id or a
//! name that is resolved (or created) in the expected category.

use std::fmt;
use std::str::FromStr;

use fleet_security::{EffectiveRole, RoleSet};
use serde::{Deserialize, Deserializer, Serialize};
use time::Date;
use uuid::Uuid;

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// Combine with `#[serde(default)]`: absent → `None`, `null` → `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ── Parties ─────────────────────────────────────────────────────────

/// A user identity: manufacturer staff, a service company or a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub is_staff: bool,
    pub roles: RoleSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParty {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub roles: RoleSet,
}

/// The caller's own identity as seen by the register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Me {
    pub party: Party,
    pub effective_role: EffectiveRole,
}

// ── Reference vocabulary ────────────────────────────────────────────

/// Category of a controlled-vocabulary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceCategory {
    TechniqueModel,
    EngineModel,
    TransmissionModel,
    SteerBridgeModel,
    DriveBridgeModel,
    MaintenanceKind,
    MaintenanceOrganization,
    FailureNode,
    RecoveryMethod,
}

impl ReferenceCategory {
    pub const ALL: [ReferenceCategory; 9] = [
        Self::TechniqueModel,
        Self::EngineModel,
        Self::TransmissionModel,
        Self::SteerBridgeModel,
        Self::DriveBridgeModel,
        Self::MaintenanceKind,
        Self::MaintenanceOrganization,
        Self::FailureNode,
        Self::RecoveryMethod,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TechniqueModel => "technique_model",
            Self::EngineModel => "engine_model",
            Self::TransmissionModel => "transmission_model",
            Self::SteerBridgeModel => "steer_bridge_model",
            Self::DriveBridgeModel => "drive_bridge_model",
            Self::MaintenanceKind => "maintenance_kind",
            Self::MaintenanceOrganization => "maintenance_organization",
            Self::FailureNode => "failure_node",
            Self::RecoveryMethod => "recovery_method",
        }
    }
}

impl fmt::Display for ReferenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown reference category '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: Uuid,
    pub category: ReferenceCategory,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReferenceEntry {
    pub category: ReferenceCategory,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceEntryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A reference entry addressed by id, or by name within the field's category.
///
/// Names that do not exist yet are created on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceRef {
    Id { id: Uuid },
    Name { name: String },
}

impl ReferenceRef {
    #[must_use]
    pub fn id(id: Uuid) -> Self {
        Self::Id { id }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name { name: name.into() }
    }
}

// ── Machines ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Uuid,
    pub serial_number: String,
    pub model_technique_id: Uuid,
    pub model_engine_id: Uuid,
    pub serial_engine: String,
    pub model_transmission_id: Uuid,
    pub serial_transmission: String,
    pub model_drive_bridge_id: Uuid,
    pub serial_drive_bridge: String,
    pub model_steer_bridge_id: Uuid,
    pub serial_steer_bridge: String,
    pub contract_number: String,
    pub shipment_date: Date,
    pub consignee: String,
    pub delivery_address: String,
    pub equipment: String,
    pub client_id: Uuid,
    pub service_company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMachine {
    pub serial_number: String,
    pub model_technique: ReferenceRef,
    pub model_engine: ReferenceRef,
    #[serde(default)]
    pub serial_engine: String,
    pub model_transmission: ReferenceRef,
    #[serde(default)]
    pub serial_transmission: String,
    pub model_drive_bridge: ReferenceRef,
    #[serde(default)]
    pub serial_drive_bridge: String,
    pub model_steer_bridge: ReferenceRef,
    #[serde(default)]
    pub serial_steer_bridge: String,
    #[serde(default)]
    pub contract_number: String,
    pub shipment_date: Date,
    #[serde(default)]
    pub consignee: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub equipment: String,
    pub client_id: Uuid,
    pub service_company_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachinePatch {
    pub serial_number: Option<String>,
    pub model_technique: Option<ReferenceRef>,
    pub model_engine: Option<ReferenceRef>,
    pub serial_engine: Option<String>,
    pub model_transmission: Option<ReferenceRef>,
    pub serial_transmission: Option<String>,
    pub model_drive_bridge: Option<ReferenceRef>,
    pub serial_drive_bridge: Option<String>,
    pub model_steer_bridge: Option<ReferenceRef>,
    pub serial_steer_bridge: Option<String>,
    pub contract_number: Option<String>,
    pub shipment_date: Option<Date>,
    pub consignee: Option<String>,
    pub delivery_address: Option<String>,
    pub equipment: Option<String>,
    pub client_id: Option<Uuid>,
    pub service_company_id: Option<Uuid>,
}

/// The whitelisted subset of a machine served to anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePublic {
    pub serial_number: String,
    pub model_technique_name: String,
    pub model_engine_name: String,
    pub serial_engine: String,
    pub model_transmission_name: String,
    pub serial_transmission: String,
    pub model_drive_bridge_name: String,
    pub serial_drive_bridge: String,
    pub model_steer_bridge_name: String,
    pub serial_steer_bridge: String,
}

// ── Maintenance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintenance {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub kind_id: Uuid,
    pub performed_date: Date,
    pub operating_hours: u32,
    pub work_order_number: String,
    pub work_order_date: Option<Date>,
    pub organization_id: Uuid,
    pub service_company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaintenance {
    /// May be omitted when the machine is given by the request path.
    #[serde(default)]
    pub machine_id: Option<Uuid>,
    pub kind: ReferenceRef,
    pub performed_date: Date,
    #[serde(default)]
    pub operating_hours: u32,
    #[serde(default)]
    pub work_order_number: String,
    #[serde(default)]
    pub work_order_date: Option<Date>,
    pub organization: ReferenceRef,
    /// Defaults to the machine's service company.
    #[serde(default)]
    pub service_company_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenancePatch {
    pub machine_id: Option<Uuid>,
    pub kind: Option<ReferenceRef>,
    pub performed_date: Option<Date>,
    pub operating_hours: Option<u32>,
    pub work_order_number: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub work_order_date: Option<Option<Date>>,
    pub organization: Option<ReferenceRef>,
    pub service_company_id: Option<Uuid>,
}

// ── Complaints ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub failure_date: Date,
    pub operating_hours: u32,
    pub failure_node_id: Uuid,
    pub failure_description: String,
    pub recovery_method_id: Uuid,
    pub parts_used: String,
    pub recovery_date: Option<Date>,
    pub downtime_days: u32,
    pub service_company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComplaint {
    #[serde(default)]
    pub machine_id: Option<Uuid>,
    pub failure_date: Date,
    #[serde(default)]
    pub operating_hours: u32,
    pub failure_node: ReferenceRef,
    #[serde(default)]
    pub failure_description: String,
    pub recovery_method: ReferenceRef,
    #[serde(default)]
    pub parts_used: String,
    #[serde(default)]
    pub recovery_date: Option<Date>,
    /// Defaults to the machine's service company.
    #[serde(default)]
    pub service_company_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintPatch {
    pub machine_id: Option<Uuid>,
    pub failure_date: Option<Date>,
    pub operating_hours: Option<u32>,
    pub failure_node: Option<ReferenceRef>,
    pub failure_description: Option<String>,
    pub recovery_method: Option<ReferenceRef>,
    pub parts_used: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub recovery_date: Option<Option<Date>>,
    pub service_company_id: Option<Uuid>,
}
