mod common;

use admin_scaffold::addon::{Addon, AddonContext, AddonRegistry};
use admin_scaffold::config::AppConfig;
use admin_scaffold::controller::Controller;
use admin_scaffold::db::{DbConn, Dialect};
use admin_scaffold::error::AppError;
use admin_scaffold::model::seed::{fill_init_data, INIT_TABLE};
use admin_scaffold::model::{apply_migrations, ModelRegistry};
use admin_scaffold::service::CrudService;
use admin_scaffold::sql::SelectQuery;
use admin_scaffold::{build, IdGenerator};
use common::{default_group, memory_db, time_columns, Goods, GOODS};
use std::path::PathBuf;
use std::sync::Arc;

async fn count(db: &admin_scaffold::Database, table: &str) -> u64 {
    let group = default_group(db);
    let mut pooled = group.pool.acquire().await.unwrap();
    DbConn::new(&mut *pooled, group)
        .fetch_count(&SelectQuery::table(table).to_count(Dialect::Sqlite))
        .await
        .unwrap()
}

fn write_seed(dir: &std::path::Path) {
    std::fs::write(
        dir.join(format!("{GOODS}.json")),
        r#"[{"title": "seeded pen", "price": 1.5}, {"id": "fixed", "title": "seeded ink"}]"#,
    )
    .unwrap();
}

#[tokio::test]
async fn migrations_are_repeatable() {
    let db = memory_db().await;
    let mut models = ModelRegistry::new();
    models.register(Arc::new(Goods));
    models.register(Arc::new(Goods));
    assert_eq!(models.len(), 1);
    apply_migrations(&db, &models, &time_columns(true)).await.unwrap();
    apply_migrations(&db, &models, &time_columns(true)).await.unwrap();
    assert_eq!(count(&db, GOODS).await, 0);
}

#[tokio::test]
async fn init_data_is_written_once_per_module_and_table() {
    let tmp = tempfile::tempdir().unwrap();
    write_seed(tmp.path());
    let db = memory_db().await;
    let mut models = ModelRegistry::new();
    models.register(Arc::new(Goods));
    apply_migrations(&db, &models, &time_columns(false)).await.unwrap();
    let ids = IdGenerator::new(3);

    assert!(fill_init_data(&db, &ids, tmp.path(), "demo", &Goods).await.unwrap());
    assert!(!fill_init_data(&db, &ids, tmp.path(), "demo", &Goods).await.unwrap());
    assert_eq!(count(&db, GOODS).await, 2);
    assert_eq!(count(&db, INIT_TABLE).await, 1);

    let empty = tempfile::tempdir().unwrap();
    assert!(!fill_init_data(&db, &ids, empty.path(), "other", &Goods).await.unwrap());
}

struct SeedingAddon(PathBuf);

impl Addon for SeedingAddon {
    fn name(&self) -> &str {
        "demo"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn init(&self, ctx: &mut AddonContext) -> Result<(), AppError> {
        let goods = Arc::new(Goods);
        ctx.add_controller(Controller::new(
            "/admin/demo/goods",
            CrudService::for_model(goods.clone(), ctx.services().clone()),
        ));
        ctx.seed("demo", self.0.clone(), goods);
        Ok(())
    }
}

#[tokio::test]
async fn build_migrates_and_seeds_registered_models() {
    let tmp = tempfile::tempdir().unwrap();
    write_seed(tmp.path());
    let mut config = AppConfig::default();
    config.core.auto_migrate = true;
    let db = memory_db().await;

    let (_, state) = build(config, db, &AddonRegistry::new().add(SeedingAddon(tmp.path().to_path_buf())))
        .await
        .unwrap();
    assert_eq!(state.models.len(), 1);
    assert!(state.models.get(GOODS).is_some());
    assert!(state.eps.is_empty());
    assert_eq!(count(&state.db, GOODS).await, 2);
}

#[tokio::test]
async fn unknown_database_group_fails_build() {
    struct OtherGroup;
    impl admin_scaffold::Model for OtherGroup {
        fn table_name(&self) -> &str {
            "report"
        }

        fn group_name(&self) -> &str {
            "reporting"
        }

        fn columns(&self) -> Vec<admin_scaffold::ColumnDef> {
            Vec::new()
        }
    }
    struct Reporting;
    impl Addon for Reporting {
        fn name(&self) -> &str {
            "report"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn init(&self, ctx: &mut AddonContext) -> Result<(), AppError> {
            ctx.register_model(Arc::new(OtherGroup));
            Ok(())
        }
    }

    let mut config = AppConfig::default();
    config.core.auto_migrate = true;
    let err = build(config, memory_db().await, &AddonRegistry::new().add(Reporting))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("reporting"), "{err}");
}
