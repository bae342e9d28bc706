use sea_orm::entity::prelude::*;
use time::Date;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "machines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::maintenance::Entity")]
    Maintenance,
    #[sea_orm(has_many = "super::complaint::Entity")]
    Complaints,
}

impl Related<super::maintenance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Maintenance.def()
    }
}

impl Related<super::complaint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Complaints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
