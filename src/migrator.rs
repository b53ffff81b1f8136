use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_users_and_branches::Migration),
            Box::new(m20240601_000002_create_catalog_tables::Migration),
            Box::new(m20240601_000003_create_appointments_table::Migration),
            Box::new(m20240601_000004_create_orders_tables::Migration),
            Box::new(m20240601_000005_create_payment_transactions_table::Migration),
            Box::new(m20240601_000006_create_loyalty_and_reviews_tables::Migration),
        ]
    }
}

mod m20240601_000001_create_users_and_branches {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_users_and_branches"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::Phone).string().null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string()
                                .not_null()
                                .default("client"),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Branches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Branches::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Branches::Name).string().not_null())
                        .col(ColumnDef::new(Branches::City).string().not_null())
                        .col(ColumnDef::new(Branches::Address).string().null())
                        .col(ColumnDef::new(Branches::Phone).string().null())
                        .col(
                            ColumnDef::new(Branches::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Branches::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Branches::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        Email,
        FullName,
        Phone,
        Role,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Branches {
        Table,
        Id,
        Name,
        City,
        Address,
        Phone,
        IsActive,
        CreatedAt,
    }
}

mod m20240601_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Services::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Services::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Services::BranchId).uuid().not_null())
                        .col(ColumnDef::new(Services::Name).string().not_null())
                        .col(ColumnDef::new(Services::Description).string().null())
                        .col(
                            ColumnDef::new(Services::DurationMinutes)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Services::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(Services::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Services::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_services_branch_id")
                        .table(Services::Table)
                        .col(Services::BranchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Staff::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Staff::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Staff::BranchId).uuid().not_null())
                        .col(ColumnDef::new(Staff::UserId).uuid().not_null())
                        .col(ColumnDef::new(Staff::Title).string().null())
                        .col(
                            ColumnDef::new(Staff::IsAvailable)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Staff::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_staff_branch_id")
                        .table(Staff::Table)
                        .col(Staff::BranchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StaffServices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StaffServices::StaffId).uuid().not_null())
                        .col(ColumnDef::new(StaffServices::ServiceId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(StaffServices::StaffId)
                                .col(StaffServices::ServiceId),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StaffServices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Staff::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Services::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Services {
        Table,
        Id,
        BranchId,
        Name,
        Description,
        DurationMinutes,
        Price,
        IsActive,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Staff {
        Table,
        Id,
        BranchId,
        UserId,
        Title,
        IsAvailable,
        CreatedAt,
    }

    #[derive(Iden)]
    enum StaffServices {
        Table,
        StaffId,
        ServiceId,
    }
}

mod m20240601_000003_create_appointments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_appointments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Appointments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Appointments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::BranchId).uuid().not_null())
                        .col(ColumnDef::new(Appointments::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Appointments::StaffId).uuid().not_null())
                        .col(ColumnDef::new(Appointments::ServiceId).uuid().not_null())
                        .col(
                            ColumnDef::new(Appointments::AppointmentDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::StartTime).time().not_null())
                        .col(ColumnDef::new(Appointments::EndTime).time().not_null())
                        .col(
                            ColumnDef::new(Appointments::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Appointments::TotalPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Appointments::PaymentStatus)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Appointments::Notes).string().null())
                        .col(
                            ColumnDef::new(Appointments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_staff_date")
                        .table(Appointments::Table)
                        .col(Appointments::StaffId)
                        .col(Appointments::AppointmentDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_client_id")
                        .table(Appointments::Table)
                        .col(Appointments::ClientId)
                        .to_owned(),
                )
                .await?;

            // Partial unique index closing the concurrent double-booking
            // window for active statuses. Same syntax on Postgres and SQLite.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS uniq_appointments_staff_slot \
                     ON appointments (staff_id, appointment_date, start_time) \
                     WHERE status IN ('pending', 'confirmed')",
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Appointments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Appointments {
        Table,
        Id,
        BranchId,
        ClientId,
        StaffId,
        ServiceId,
        AppointmentDate,
        StartTime,
        EndTime,
        Status,
        TotalPrice,
        PaymentStatus,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_orders_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Orders::TotalAmount).decimal().not_null())
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::PaymentStatus)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_client_id")
                        .table(Orders::Table)
                        .col(Orders::ClientId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ItemName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        ClientId,
        TotalAmount,
        Currency,
        Status,
        PaymentStatus,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ItemName,
        Quantity,
        UnitPrice,
    }
}

mod m20240601_000005_create_payment_transactions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_payment_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentTransactions::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(PaymentTransactions::AppointmentId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::MerchantReference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::TrackingId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::Currency)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::PaymentStatus)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::PaymentMethod)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(PaymentTransactions::IpnId).string().null())
                        .col(
                            ColumnDef::new(PaymentTransactions::CallbackUrl)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::GatewayResponse)
                                .json()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_transactions_tracking_id")
                        .table(PaymentTransactions::Table)
                        .col(PaymentTransactions::TrackingId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PaymentTransactions {
        Table,
        Id,
        OrderId,
        AppointmentId,
        MerchantReference,
        TrackingId,
        Amount,
        Currency,
        PaymentStatus,
        PaymentMethod,
        IpnId,
        CallbackUrl,
        GatewayResponse,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000006_create_loyalty_and_reviews_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000006_create_loyalty_and_reviews_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LoyaltyPoints::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LoyaltyPoints::UserId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoyaltyPoints::Points)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LoyaltyPoints::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LoyaltyTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LoyaltyTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LoyaltyTransactions::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(LoyaltyTransactions::Points)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LoyaltyTransactions::Kind).string().not_null())
                        .col(
                            ColumnDef::new(LoyaltyTransactions::Description)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(LoyaltyTransactions::ReferenceId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(LoyaltyTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_loyalty_transactions_user_id")
                        .table(LoyaltyTransactions::Table)
                        .col(LoyaltyTransactions::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reviews::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Reviews::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::BranchId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::StaffId).uuid().null())
                        .col(
                            ColumnDef::new(Reviews::AppointmentId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(ColumnDef::new(Reviews::Comment).string().null())
                        .col(ColumnDef::new(Reviews::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_branch_id")
                        .table(Reviews::Table)
                        .col(Reviews::BranchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LoyaltyTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LoyaltyPoints::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum LoyaltyPoints {
        Table,
        UserId,
        Points,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum LoyaltyTransactions {
        Table,
        Id,
        UserId,
        Points,
        Kind,
        Description,
        ReferenceId,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Reviews {
        Table,
        Id,
        ClientId,
        BranchId,
        StaffId,
        AppointmentId,
        Rating,
        Comment,
        CreatedAt,
    }
}
