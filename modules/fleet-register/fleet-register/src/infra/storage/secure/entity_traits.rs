use sea_orm::EntityTrait;

use crate::infra::storage::entity::{complaint, machine, maintenance};
use fleet_security::pep_properties;

/// Maps authorization property names to columns of an entity.
///
/// Properties an entity cannot resolve make the constraint that uses them
/// fail closed.
pub trait ScopableEntity: EntityTrait {
    #[must_use]
    fn resolve_property(property: &str) -> Option<Self::Column>;
}

/// An entity whose ownership is inherited from its parent machine.
pub trait MachineOwnedEntity: ScopableEntity {
    fn machine_col() -> Self::Column;
}

impl ScopableEntity for machine::Entity {
    fn resolve_property(property: &str) -> Option<machine::Column> {
        match property {
            pep_properties::RESOURCE_ID => Some(machine::Column::Id),
            pep_properties::CLIENT_ID => Some(machine::Column::ClientId),
            pep_properties::SERVICE_COMPANY_ID => Some(machine::Column::ServiceCompanyId),
            _ => None,
        }
    }
}

impl ScopableEntity for maintenance::Entity {
    fn resolve_property(property: &str) -> Option<maintenance::Column> {
        match property {
            pep_properties::RESOURCE_ID => Some(maintenance::Column::Id),
            _ => None,
        }
    }
}

impl MachineOwnedEntity for maintenance::Entity {
    fn machine_col() -> maintenance::Column {
        maintenance::Column::MachineId
    }
}

impl ScopableEntity for complaint::Entity {
    fn resolve_property(property: &str) -> Option<complaint::Column> {
        match property {
            pep_properties::RESOURCE_ID => Some(complaint::Column::Id),
            _ => None,
        }
    }
}

impl MachineOwnedEntity for complaint::Entity {
    fn machine_col() -> complaint::Column {
        complaint::Column::MachineId
    }
}
