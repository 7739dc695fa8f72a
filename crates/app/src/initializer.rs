//! Component initializer: assembles a component from its definition.
//!
//! Resolution and context acquisition are all-or-nothing: the first failure
//! aborts with an [`InitializationError`] naming the stage, and no partially
//! wired component escapes. The initializer never registers anything.

use std::sync::Arc;

use homecore_domain::component::Component;
use homecore_domain::definition::{CodeUnit, ComponentDefinition, PackageRef};
use homecore_domain::error::{DispatchError, HubError, InitializationError};
use homecore_domain::id::ComponentUid;
use homecore_domain::stage::StageId;
use serde_json::{Map, Value, json};

use crate::pipeline::{AdapterStage, Pipeline, ScriptAdapter, ScriptLogic, WiredComponent};
use crate::ports::{PackageResolver, ScriptContext, ScriptError, ScriptHost};

/// Entry point run once when a context is acquired, if the unit defines it.
pub const INITIALIZE: &str = "initialize";

/// Builds [`WiredComponent`]s from [`ComponentDefinition`]s.
pub struct ComponentInitializer<R, H> {
    resolver: R,
    host: Arc<H>,
}

impl<R, H> ComponentInitializer<R, H>
where
    R: PackageResolver,
    H: ScriptHost + 'static,
{
    pub fn new(resolver: R, host: Arc<H>) -> Self {
        Self { resolver, host }
    }

    /// Resolve, load and wire every stage of `definition`.
    ///
    /// `persisted` settings are applied first; declared defaults only fill
    /// keys that are still absent.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for an invalid definition and
    /// [`HubError::Initialization`] when a stage cannot be resolved or loaded.
    pub async fn initialize(
        &self,
        definition: &ComponentDefinition,
        persisted: Option<Map<String, Value>>,
    ) -> Result<WiredComponent, HubError> {
        definition.validate()?;
        let uid = definition.uid.clone();

        let mut adapters = Vec::with_capacity(definition.adapters.len());
        for (index, package) in definition.adapters.iter().enumerate() {
            let unit = self
                .resolve(&uid, StageId::adapter(index, package.to_string()), package)
                .await?;
            adapters.push(unit);
        }
        let logic = self
            .resolve(&uid, StageId::logic(definition.logic.to_string()), &definition.logic)
            .await?;

        let mut builder = Component::builder().uid(uid.clone());
        for (key, value) in persisted.into_iter().flatten() {
            builder = builder.setting(key, value);
        }
        for (key, value) in &definition.settings {
            builder = builder.setting(key.clone(), value.clone());
        }
        let component = builder.build()?;

        let host = Arc::clone(&self.host);
        let settings = component.settings().clone();
        let worker_uid = uid.clone();
        let pipeline = tokio::task::spawn_blocking(move || {
            load_pipeline(host.as_ref(), &worker_uid, adapters, logic, &settings)
        })
        .await
        .map_err(|err| {
            tracing::error!(%uid, error = %err, "initializer worker lost");
            HubError::from(DispatchError::WorkerLost { uid: uid.clone() })
        })??;

        tracing::debug!(%uid, stages = ?pipeline.stages(), "component initialized");
        Ok(WiredComponent::new(component, pipeline))
    }

    async fn resolve(
        &self,
        uid: &ComponentUid,
        stage: StageId,
        package: &PackageRef,
    ) -> Result<CodeUnit, HubError> {
        self.resolver.resolve(package).await.map_err(|err| {
            tracing::warn!(%uid, %stage, error = %err, "package resolution failed");
            InitializationError {
                uid: uid.clone(),
                stage,
                source: Box::new(err),
            }
            .into()
        })
    }
}

fn load_pipeline<H: ScriptHost>(
    host: &H,
    uid: &ComponentUid,
    adapters: Vec<CodeUnit>,
    logic: CodeUnit,
    settings: &Map<String, Value>,
) -> Result<Pipeline, HubError> {
    let payload = json!({ "component_uid": uid.as_str(), "settings": settings });

    let mut stages: Vec<Box<dyn AdapterStage>> = Vec::with_capacity(adapters.len());
    for (index, unit) in adapters.iter().enumerate() {
        let name = unit.package.to_string();
        let context = acquire(host, uid, unit, &payload)
            .map_err(|err| failed(uid, StageId::adapter(index, name.clone()), err))?;
        stages.push(Box::new(ScriptAdapter::new(name, context)));
    }

    let name = logic.package.to_string();
    let context = acquire(host, uid, &logic, &payload)
        .map_err(|err| failed(uid, StageId::logic(name.clone()), err))?;

    Ok(Pipeline::from_parts(
        stages,
        Box::new(ScriptLogic::new(name, context)),
    ))
}

fn acquire<H: ScriptHost>(
    host: &H,
    uid: &ComponentUid,
    unit: &CodeUnit,
    payload: &Value,
) -> Result<H::Context, ScriptError> {
    let mut context = host.create_context(uid, unit)?;
    if context.has_function(INITIALIZE) {
        context.invoke(INITIALIZE, payload.clone())?;
    }
    Ok(context)
}

fn failed(uid: &ComponentUid, stage: StageId, err: ScriptError) -> HubError {
    tracing::warn!(%uid, %stage, error = %err, "script context acquisition failed");
    InitializationError {
        uid: uid.clone(),
        stage,
        source: Box::new(err),
    }
    .into()
}
