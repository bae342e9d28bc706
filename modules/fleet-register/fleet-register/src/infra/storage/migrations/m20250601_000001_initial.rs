use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
pub enum Roles {
    Table,
    Name,
}

#[derive(DeriveIden)]
enum Parties {
    Table,
    Id,
    Username,
    DisplayName,
    IsStaff,
}

#[derive(DeriveIden)]
enum PartyRoles {
    Table,
    PartyId,
    Role,
}

#[derive(DeriveIden)]
enum ReferenceEntries {
    Table,
    Id,
    Category,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Machines {
    Table,
    Id,
    SerialNumber,
    ModelTechniqueId,
    ModelEngineId,
    SerialEngine,
    ModelTransmissionId,
    SerialTransmission,
    ModelDriveBridgeId,
    SerialDriveBridge,
    ModelSteerBridgeId,
    SerialSteerBridge,
    ContractNumber,
    ShipmentDate,
    Consignee,
    DeliveryAddress,
    Equipment,
    ClientId,
    ServiceCompanyId,
}

#[derive(DeriveIden)]
enum MaintenanceRecords {
    Table,
    Id,
    MachineId,
    KindId,
    PerformedDate,
    OperatingHours,
    WorkOrderNumber,
    WorkOrderDate,
    OrganizationId,
    ServiceCompanyId,
}

#[derive(DeriveIden)]
enum Complaints {
    Table,
    Id,
    MachineId,
    FailureDate,
    OperatingHours,
    FailureNodeId,
    FailureDescription,
    RecoveryMethodId,
    PartsUsed,
    RecoveryDate,
    DowntimeDays,
    ServiceCompanyId,
}

/// Foreign key that blocks deletion of the referenced row while in use.
fn restrict_fk(
    from_table: impl IntoIden + 'static,
    from_col: impl IntoIden,
    to_table: impl IntoIden + 'static,
    to_col: impl IntoIden,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .from(from_table, from_col)
        .to(to_table, to_col)
        .on_delete(ForeignKeyAction::Restrict)
        .on_update(ForeignKeyAction::Restrict)
        .to_owned()
}

fn text_col(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).string().not_null().default("").to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Roles::Name).string().not_null().primary_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Parties::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Parties::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Parties::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(text_col(Parties::DisplayName))
                    .col(
                        ColumnDef::new(Parties::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PartyRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PartyRoles::PartyId).uuid().not_null())
                    .col(ColumnDef::new(PartyRoles::Role).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(PartyRoles::PartyId)
                            .col(PartyRoles::Role),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PartyRoles::Table, PartyRoles::PartyId)
                            .to(Parties::Table, Parties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(&mut restrict_fk(
                        PartyRoles::Table,
                        PartyRoles::Role,
                        Roles::Table,
                        Roles::Name,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferenceEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferenceEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReferenceEntries::Category)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferenceEntries::Name).string().not_null())
                    .col(text_col(ReferenceEntries::Description))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_reference_entries_category_name")
                    .table(ReferenceEntries::Table)
                    .col(ReferenceEntries::Category)
                    .col(ReferenceEntries::Name)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Machines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Machines::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Machines::SerialNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Machines::ModelTechniqueId).uuid().not_null())
                    .col(ColumnDef::new(Machines::ModelEngineId).uuid().not_null())
                    .col(text_col(Machines::SerialEngine))
                    .col(
                        ColumnDef::new(Machines::ModelTransmissionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(text_col(Machines::SerialTransmission))
                    .col(
                        ColumnDef::new(Machines::ModelDriveBridgeId)
                            .uuid()
                            .not_null(),
                    )
                    .col(text_col(Machines::SerialDriveBridge))
                    .col(
                        ColumnDef::new(Machines::ModelSteerBridgeId)
                            .uuid()
                            .not_null(),
                    )
                    .col(text_col(Machines::SerialSteerBridge))
                    .col(text_col(Machines::ContractNumber))
                    .col(ColumnDef::new(Machines::ShipmentDate).date().not_null())
                    .col(text_col(Machines::Consignee))
                    .col(text_col(Machines::DeliveryAddress))
                    .col(text_col(Machines::Equipment))
                    .col(ColumnDef::new(Machines::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Machines::ServiceCompanyId).uuid().not_null())
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ModelTechniqueId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ModelEngineId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ModelTransmissionId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ModelDriveBridgeId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ModelSteerBridgeId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ClientId,
                        Parties::Table,
                        Parties::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Machines::Table,
                        Machines::ServiceCompanyId,
                        Parties::Table,
                        Parties::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_machines_shipment_date")
                    .table(Machines::Table)
                    .col(Machines::ShipmentDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MaintenanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaintenanceRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceRecords::MachineId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceRecords::KindId).uuid().not_null())
                    .col(
                        ColumnDef::new(MaintenanceRecords::PerformedDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceRecords::OperatingHours)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(text_col(MaintenanceRecords::WorkOrderNumber))
                    .col(ColumnDef::new(MaintenanceRecords::WorkOrderDate).date().null())
                    .col(
                        ColumnDef::new(MaintenanceRecords::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceRecords::ServiceCompanyId)
                            .uuid()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MaintenanceRecords::Table, MaintenanceRecords::MachineId)
                            .to(Machines::Table, Machines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(&mut restrict_fk(
                        MaintenanceRecords::Table,
                        MaintenanceRecords::KindId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        MaintenanceRecords::Table,
                        MaintenanceRecords::OrganizationId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        MaintenanceRecords::Table,
                        MaintenanceRecords::ServiceCompanyId,
                        Parties::Table,
                        Parties::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_maintenance_machine_performed")
                    .table(MaintenanceRecords::Table)
                    .col(MaintenanceRecords::MachineId)
                    .col(MaintenanceRecords::PerformedDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Complaints::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Complaints::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Complaints::MachineId).uuid().not_null())
                    .col(ColumnDef::new(Complaints::FailureDate).date().not_null())
                    .col(
                        ColumnDef::new(Complaints::OperatingHours)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Complaints::FailureNodeId).uuid().not_null())
                    .col(text_col(Complaints::FailureDescription))
                    .col(ColumnDef::new(Complaints::RecoveryMethodId).uuid().not_null())
                    .col(text_col(Complaints::PartsUsed))
                    .col(ColumnDef::new(Complaints::RecoveryDate).date().null())
                    .col(
                        ColumnDef::new(Complaints::DowntimeDays)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Complaints::ServiceCompanyId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Complaints::Table, Complaints::MachineId)
                            .to(Machines::Table, Machines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(&mut restrict_fk(
                        Complaints::Table,
                        Complaints::FailureNodeId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Complaints::Table,
                        Complaints::RecoveryMethodId,
                        ReferenceEntries::Table,
                        ReferenceEntries::Id,
                    ))
                    .foreign_key(&mut restrict_fk(
                        Complaints::Table,
                        Complaints::ServiceCompanyId,
                        Parties::Table,
                        Parties::Id,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_complaints_machine_failure")
                    .table(Complaints::Table)
                    .col(Complaints::MachineId)
                    .col(Complaints::FailureDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Complaints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Machines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReferenceEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PartyRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await
    }
}
