//! Route groups: a CRUD controller over one service, or a plain router under a prefix.

use crate::service::{Api, CrudService};
use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

/// Exposes a subset of the CRUD operations of one service under `prefix`.
#[derive(Clone, Debug)]
pub struct Controller {
    /// Mount point, e.g. `/admin/demo/goods`.
    pub prefix: String,
    /// Allowed operations; anything else answers 404.
    pub api: Vec<Api>,
    pub service: Arc<CrudService>,
}

impl Controller {
    /// All six operations allowed.
    pub fn new(prefix: impl Into<String>, service: CrudService) -> Self {
        Controller {
            prefix: prefix.into(),
            api: Api::ALL.to_vec(),
            service: Arc::new(service),
        }
    }

    pub fn api(mut self, api: impl IntoIterator<Item = Api>) -> Self {
        self.api = api.into_iter().collect();
        self
    }

    pub fn allows(&self, api: Api) -> bool {
        self.api.contains(&api)
    }
}

/// Arbitrary routes an addon mounts next to its CRUD controllers.
pub struct ControllerSimple {
    pub prefix: String,
    pub router: Router<AppState>,
}

impl ControllerSimple {
    pub fn new(prefix: impl Into<String>, router: Router<AppState>) -> Self {
        ControllerSimple {
            prefix: prefix.into(),
            router,
        }
    }

    pub fn into_router(self) -> Router<AppState> {
        mount(&self.prefix, self.router)
    }
}

/// Nest `router` under `prefix`; an empty or `/` prefix merges at the root.
pub(crate) fn mount(prefix: &str, router: Router<AppState>) -> Router<AppState> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        Router::new().merge(router)
    } else if prefix.starts_with('/') {
        Router::new().nest(prefix, router)
    } else {
        Router::new().nest(&format!("/{}", prefix), router)
    }
}
