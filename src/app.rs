//! Startup: run addons, migrate, seed, and assemble the router.

use crate::addon::{AddonContext, AddonRegistry};
use crate::config::AppConfig;
use crate::controller::Controller;
use crate::db::Database;
use crate::error::AppError;
use crate::file::{FileRegistry, MODE_LOCAL, PUBLIC_UPLOADS};
use crate::logging;
use crate::model::{apply_migrations, model_info, seed::fill_init_data, EpsInfo};
use crate::routes::{common_routes, crud_routes, upload_routes};
use crate::service::ServiceContext;
use crate::state::{AppContext, AppState};
use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

fn eps_info(controllers: &[Controller], services: &ServiceContext) -> EpsInfo {
    controllers
        .iter()
        .filter_map(|c| {
            let model = c.service.model()?;
            Some((c.prefix.clone(), model_info(model.as_ref(), &services.time)))
        })
        .collect()
}

/// Build the application around an already connected database.
/// Returns the ready-to-serve router and the shared state it carries.
pub async fn build(config: AppConfig, db: Database, addons: &AddonRegistry) -> Result<(Router, AppState), AppError> {
    let services = ServiceContext::from_config(&config);
    let mut ctx = AddonContext::new(services.clone());
    let versions = addons.init_all(&mut ctx)?;
    let AddonContext {
        models,
        controllers,
        simple,
        seeds,
        funcs,
        ..
    } = ctx;
    if !funcs.is_empty() {
        tracing::info!(funcs = %funcs.names().join(","), "functions registered");
    }

    if config.core.auto_migrate {
        apply_migrations(&db, &models, &services.time).await?;
    }
    for task in &seeds {
        let written = fill_init_data(&db, &services.ids, &task.dir, &task.module, task.model.as_ref()).await?;
        if written {
            tracing::info!(module = %task.module, table = %task.model.table_name(), "initial data loaded");
        }
    }

    let eps = if config.core.eps {
        eps_info(&controllers, &services)
    } else {
        EpsInfo::new()
    };
    let files = FileRegistry::from_config(&config.core.file).await?;

    let mut router = Router::new()
        .merge(common_routes(config.core.eps))
        .merge(upload_routes());
    for controller in controllers {
        router = router.merge(crud_routes(controller));
    }
    for s in simple {
        router = router.merge(s.into_router());
    }
    if config.core.file.mode == MODE_LOCAL {
        router = router.nest_service(PUBLIC_UPLOADS, ServeDir::new(&config.core.file.upload_dir));
    }
    router = router.layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.server.client_max_body_size)),
    );
    if config.logger.run_log {
        router = router.layer(middleware::from_fn(logging::run_log));
    }

    let state: AppState = Arc::new(AppContext {
        config,
        db,
        services,
        models,
        files,
        addons: versions,
        funcs,
        eps,
    });
    tracing::info!(models = state.models.len(), "application assembled");
    Ok((router.with_state(state.clone()), state))
}

/// Connect every configured group, then `build`.
pub async fn build_from_config(config: AppConfig, addons: &AddonRegistry) -> Result<(Router, AppState), AppError> {
    let db = Database::connect(&config.database).await?;
    build(config, db, addons).await
}

/// Bind `server.address` and serve until the process stops.
pub async fn serve(router: Router, address: &str) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
