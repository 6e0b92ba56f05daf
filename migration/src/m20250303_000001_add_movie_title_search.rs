use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Movies::Table)
                    .add_column(
                        ColumnDef::new(Movies::TitleSearch).string().not_null().default(""),
                    )
                    .to_owned(),
            )
            .await?;

        // SQLite lower() folds ASCII only; saving a title refolds it fully.
        manager
            .exec_stmt(
                Query::update()
                    .table(Movies::Table)
                    .value(Movies::TitleSearch, Func::lower(Expr::col(Movies::Title)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title_search")
                    .table(Movies::Table)
                    .col(Movies::TitleSearch)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop().name("idx_movies_title_search").table(Movies::Table).to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter().table(Movies::Table).drop_column(Movies::TitleSearch).to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Title,
    TitleSearch,
}
