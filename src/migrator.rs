use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_cart_items_table::Migration),
            Box::new(m20240301_000002_create_orders_table::Migration),
            Box::new(m20240301_000003_create_frame_orders_tables::Migration),
            Box::new(m20240301_000004_create_checkout_intents_table::Migration),
            Box::new(m20240301_000005_create_payment_outbox_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_cart_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_cart_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductRef).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductType).string().not_null())
                        .col(ColumnDef::new(CartItems::Title).string().not_null())
                        .col(ColumnDef::new(CartItems::Size).string().not_null())
                        .col(ColumnDef::new(CartItems::Thickness).string().null())
                        .col(
                            ColumnDef::new(CartItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::Image).string().null())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
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
                        .name("idx_cart_items_user_id")
                        .table(CartItems::Table)
                        .col(CartItems::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        UserId,
        ProductRef,
        ProductType,
        Title,
        Size,
        Thickness,
        UnitPrice,
        Quantity,
        Image,
        CreatedAt,
    }
}

mod m20240301_000002_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_orders_table"
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
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CartItemId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ProductType).string().not_null())
                        .col(ColumnDef::new(Orders::Title).string().not_null())
                        .col(ColumnDef::new(Orders::DeliveryDetails).json().not_null())
                        .col(
                            ColumnDef::new(Orders::Amount)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Image).string().null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentId).string().null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string().null())
                        .col(
                            ColumnDef::new(Orders::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        CartItemId,
        ProductType,
        Title,
        DeliveryDetails,
        Amount,
        Image,
        Status,
        PaymentMethod,
        PaymentId,
        PaymentStatus,
        PaidAt,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240301_000003_create_frame_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_frame_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FrameOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FrameOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FrameOrders::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(FrameOrders::ShippingDetails)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrders::ShippingCharge)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(FrameOrders::GrandTotal)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(FrameOrders::Status).string().not_null())
                        .col(
                            ColumnDef::new(FrameOrders::PaymentMethod)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FrameOrders::PaymentId).string().null())
                        .col(ColumnDef::new(FrameOrders::PaymentStatus).string().null())
                        .col(
                            ColumnDef::new(FrameOrders::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_frame_orders_user_id")
                        .table(FrameOrders::Table)
                        .col(FrameOrders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FrameOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FrameOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrderItems::FrameOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FrameOrderItems::Title).string().not_null())
                        .col(ColumnDef::new(FrameOrderItems::Shape).string().not_null())
                        .col(ColumnDef::new(FrameOrderItems::Color).string().not_null())
                        .col(ColumnDef::new(FrameOrderItems::Size).string().not_null())
                        .col(
                            ColumnDef::new(FrameOrderItems::Price)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrderItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrderItems::Total)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrderItems::FrameImageUrl)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FrameOrderItems::UserImageUrl)
                                .string()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_frame_order_items_order")
                                .from(FrameOrderItems::Table, FrameOrderItems::FrameOrderId)
                                .to(FrameOrders::Table, FrameOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_frame_order_items_order_id")
                        .table(FrameOrderItems::Table)
                        .col(FrameOrderItems::FrameOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FrameOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FrameOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FrameOrders {
        Table,
        Id,
        UserId,
        ShippingDetails,
        ShippingCharge,
        GrandTotal,
        Status,
        PaymentMethod,
        PaymentId,
        PaymentStatus,
        PaidAt,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum FrameOrderItems {
        Table,
        Id,
        FrameOrderId,
        Title,
        Shape,
        Color,
        Size,
        Price,
        Quantity,
        Total,
        FrameImageUrl,
        UserImageUrl,
    }
}

mod m20240301_000004_create_checkout_intents_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_checkout_intents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CheckoutIntents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CheckoutIntents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutIntents::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(CheckoutIntents::GatewayOrderId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutIntents::Kind).string().not_null())
                        .col(ColumnDef::new(CheckoutIntents::Payload).json().not_null())
                        .col(
                            ColumnDef::new(CheckoutIntents::AmountMinor)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutIntents::Currency).string().not_null())
                        .col(ColumnDef::new(CheckoutIntents::Receipt).string().not_null())
                        .col(ColumnDef::new(CheckoutIntents::Status).string().not_null())
                        .col(
                            ColumnDef::new(CheckoutIntents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutIntents::UpdatedAt)
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
                        .name("idx_checkout_intents_gateway_order_id")
                        .table(CheckoutIntents::Table)
                        .col(CheckoutIntents::GatewayOrderId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CheckoutIntents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CheckoutIntents {
        Table,
        Id,
        UserId,
        GatewayOrderId,
        Kind,
        Payload,
        AmountMinor,
        Currency,
        Receipt,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_payment_outbox_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_payment_outbox_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentOutbox::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentOutbox::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOutbox::GatewayOrderId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentOutbox::Payload).json().not_null())
                        .col(
                            ColumnDef::new(PaymentOutbox::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(PaymentOutbox::Attempts)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PaymentOutbox::ErrorMessage).string().null())
                        .col(
                            ColumnDef::new(PaymentOutbox::AvailableAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOutbox::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOutbox::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOutbox::ProcessedAt)
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
                        .name("idx_payment_outbox_gateway_order_id")
                        .table(PaymentOutbox::Table)
                        .col(PaymentOutbox::GatewayOrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_outbox_status")
                        .table(PaymentOutbox::Table)
                        .col(PaymentOutbox::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentOutbox::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentOutbox {
        Table,
        Id,
        GatewayOrderId,
        Payload,
        Status,
        Attempts,
        ErrorMessage,
        AvailableAt,
        CreatedAt,
        UpdatedAt,
        ProcessedAt,
    }
}
