//! Message pipeline: an ordered adapter chain in front of one logic unit.
//!
//! A message travels through every adapter's [`on_message`](AdapterStage::on_message)
//! in order, reaches the [`LogicStage`], and the response travels back through
//! every adapter's [`on_response`](AdapterStage::on_response) in reverse. An
//! adapter may answer directly instead of forwarding; that answer is final and
//! skips everything else, unwinding included.
//!
//! Stages are synchronous and may block. The registry runs pipelines on
//! blocking workers and guarantees exclusive access, hence `&mut self`.

mod script_stage;

pub use script_stage::{ON_MESSAGE, ON_RESPONSE, PROCESS_MESSAGE, ScriptAdapter, ScriptLogic};

use homecore_domain::component::Component;
use homecore_domain::error::{CancelledError, HubError, PipelineError, ValidationError};
use homecore_domain::id::ComponentUid;
use homecore_domain::message::{Message, Response};
use homecore_domain::stage::StageId;

use crate::ports::ScriptError;
use crate::shutdown::ShutdownSignal;

/// Failure raised by a single stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The stage returned something the pipeline protocol does not allow.
    #[error("unexpected return value: {0}")]
    Protocol(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What an adapter decided to do with an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterFlow {
    /// Hand this message (original or transformed) to the next stage.
    Forward(Message),
    /// Answer now; no further stage runs.
    Respond(Response),
}

/// A stage wrapped around the logic unit.
pub trait AdapterStage: Send {
    fn name(&self) -> &str;

    /// Inspect an inbound message.
    ///
    /// # Errors
    ///
    /// Any error aborts the pipeline for this message.
    fn on_message(&mut self, message: Message) -> Result<AdapterFlow, StageError>;

    /// Post-process the outgoing response. Passes it through by default.
    ///
    /// # Errors
    ///
    /// Any error aborts the unwind for this message.
    fn on_response(&mut self, response: Response) -> Result<Response, StageError> {
        Ok(response)
    }
}

/// The terminal stage producing the canonical response.
pub trait LogicStage: Send {
    fn name(&self) -> &str;

    /// Produce the response for `message`.
    ///
    /// # Errors
    ///
    /// Any error aborts the pipeline for this message.
    fn process(&mut self, message: Message) -> Result<Response, StageError>;
}

/// Adapter chain plus logic unit of one component.
pub struct Pipeline {
    adapters: Vec<Box<dyn AdapterStage>>,
    logic: Box<dyn LogicStage>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stages()).finish()
    }
}

impl Pipeline {
    /// A pipeline with no adapters.
    #[must_use]
    pub fn new(logic: impl LogicStage + 'static) -> Self {
        Self::from_parts(Vec::new(), Box::new(logic))
    }

    #[must_use]
    pub fn from_parts(adapters: Vec<Box<dyn AdapterStage>>, logic: Box<dyn LogicStage>) -> Self {
        Self { adapters, logic }
    }

    /// Append an adapter at the innermost position (closest to the logic).
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl AdapterStage + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// Identities of all stages, adapters first.
    #[must_use]
    pub fn stages(&self) -> Vec<StageId> {
        self.adapters
            .iter()
            .enumerate()
            .map(|(index, adapter)| StageId::adapter(index, adapter.name()))
            .chain(std::iter::once(StageId::logic(self.logic.name())))
            .collect()
    }

    /// Run `message` through the pipeline of component `uid`.
    ///
    /// `shutdown` is checked before every stage; once it fires the execution
    /// stops with [`HubError::Cancelled`] and nothing is returned.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Pipeline`] naming the failing stage, or
    /// [`HubError::Cancelled`].
    pub fn execute(
        &mut self,
        uid: &ComponentUid,
        message: Message,
        shutdown: &ShutdownSignal,
    ) -> Result<Response, HubError> {
        let mut message = message;

        for (index, adapter) in self.adapters.iter_mut().enumerate() {
            ensure_running(uid, shutdown)?;
            let flow = adapter
                .on_message(message)
                .map_err(|err| stage_failed(uid, StageId::adapter(index, adapter.name()), err))?;
            match flow {
                AdapterFlow::Forward(next) => message = next,
                AdapterFlow::Respond(response) => {
                    tracing::debug!(%uid, stage = index, "adapter answered directly");
                    return Ok(response);
                }
            }
        }

        ensure_running(uid, shutdown)?;
        let mut response = self
            .logic
            .process(message)
            .map_err(|err| stage_failed(uid, StageId::logic(self.logic.name()), err))?;

        for (index, adapter) in self.adapters.iter_mut().enumerate().rev() {
            ensure_running(uid, shutdown)?;
            response = adapter
                .on_response(response)
                .map_err(|err| stage_failed(uid, StageId::adapter(index, adapter.name()), err))?;
        }

        Ok(response)
    }
}

/// A component together with the pipeline that serves it, ready to register.
#[derive(Debug)]
pub struct WiredComponent {
    pub component: Component,
    pub pipeline: Pipeline,
}

impl WiredComponent {
    #[must_use]
    pub fn new(component: Component, pipeline: Pipeline) -> Self {
        Self {
            component,
            pipeline,
        }
    }

    #[must_use]
    pub fn uid(&self) -> &ComponentUid {
        self.component.uid()
    }
}

fn ensure_running(uid: &ComponentUid, shutdown: &ShutdownSignal) -> Result<(), HubError> {
    if shutdown.is_triggered() {
        return Err(CancelledError { uid: uid.clone() }.into());
    }
    Ok(())
}

fn stage_failed(uid: &ComponentUid, stage: StageId, err: StageError) -> HubError {
    tracing::warn!(%uid, %stage, error = %err, "pipeline stage failed");
    PipelineError {
        uid: uid.clone(),
        stage,
        source: Box::new(err),
    }
    .into()
}
