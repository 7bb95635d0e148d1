//! Addons: self-contained modules that register models, controllers, functions and seed data at startup.

use crate::controller::{Controller, ControllerSimple};
use crate::error::AppError;
use crate::func::{CoreFunc, FuncRegistry};
use crate::model::{Model, ModelRegistry};
use crate::service::ServiceContext;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub trait Addon: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn init(&self, ctx: &mut AddonContext) -> Result<(), AppError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddonVersion {
    pub name: String,
    pub version: String,
}

/// Initial data for one model, read from `<dir>/<table>.json`.
#[derive(Clone)]
pub struct SeedTask {
    pub module: String,
    pub dir: PathBuf,
    pub model: Arc<dyn Model>,
}

/// What addons register into during `init`.
pub struct AddonContext {
    pub(crate) services: ServiceContext,
    pub(crate) models: ModelRegistry,
    pub(crate) controllers: Vec<Controller>,
    pub(crate) simple: Vec<ControllerSimple>,
    pub(crate) seeds: Vec<SeedTask>,
    pub(crate) funcs: FuncRegistry,
}

impl AddonContext {
    pub fn new(services: ServiceContext) -> Self {
        AddonContext {
            services,
            models: ModelRegistry::new(),
            controllers: Vec::new(),
            simple: Vec::new(),
            seeds: Vec::new(),
            funcs: FuncRegistry::new(),
        }
    }

    /// Shared collaborators for building services.
    pub fn services(&self) -> &ServiceContext {
        &self.services
    }

    pub fn register_model(&mut self, model: Arc<dyn Model>) {
        self.models.register(model);
    }

    /// Mount a CRUD controller; its service's model, if any, is registered too.
    pub fn add_controller(&mut self, controller: Controller) {
        if let Some(model) = controller.service.model() {
            self.models.register(model.clone());
        }
        self.controllers.push(controller);
    }

    pub fn add_simple(&mut self, controller: ControllerSimple) {
        self.simple.push(controller);
    }

    pub fn seed(&mut self, module: impl Into<String>, dir: impl Into<PathBuf>, model: Arc<dyn Model>) {
        self.seeds.push(SeedTask {
            module: module.into(),
            dir: dir.into(),
            model,
        });
    }

    /// Expose a named function, callable later as `name(param)`.
    pub fn register_func(&mut self, name: impl Into<String>, func: Arc<dyn CoreFunc>) {
        self.funcs.register(name, func);
    }

    pub fn funcs(&self) -> &FuncRegistry {
        &self.funcs
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }
}

/// Addons in registration order.
#[derive(Default)]
pub struct AddonRegistry {
    addons: Vec<Box<dyn Addon>>,
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, addon: impl Addon + 'static) -> Self {
        self.addons.push(Box::new(addon));
        self
    }

    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Run every addon's `init` in order; stops at the first failure.
    pub fn init_all(&self, ctx: &mut AddonContext) -> Result<Vec<AddonVersion>, AppError> {
        let names: Vec<String> = self
            .addons
            .iter()
            .map(|a| format!("{}-{}", a.name(), a.version()))
            .collect();
        tracing::info!(count = self.addons.len(), addons = %names.join(","), "initializing addons");
        let mut versions = Vec::with_capacity(self.addons.len());
        for addon in &self.addons {
            tracing::debug!(addon = %addon.name(), "addon init");
            addon.init(ctx)?;
            versions.push(AddonVersion {
                name: addon.name().to_string(),
                version: addon.version().to_string(),
            });
        }
        Ok(versions)
    }
}
