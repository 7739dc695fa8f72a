//! Common error types used across the workspace.
//!
//! [`HubError`] is the single error crossing layer boundaries. Each failure
//! family has its own typed error that converts into it via `#[from]`;
//! adapters box their IO errors into [`HubError::Storage`].

use crate::id::ComponentUid;
use crate::stage::StageId;

/// Boxed cause produced outside the domain (script engines, IO, …).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for every homecore operation.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Input failed a domain invariant.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested component is not registered.
    #[error("component not found")]
    ComponentNotFound(#[from] ComponentNotFoundError),

    /// A component could not be assembled from its packages.
    #[error("component initialization failed")]
    Initialization(#[from] InitializationError),

    /// An adapter or the logic unit failed while processing a message.
    #[error("pipeline execution failed")]
    Pipeline(#[from] PipelineError),

    /// Execution was aborted by the process-wide shutdown signal.
    #[error("execution cancelled")]
    Cancelled(#[from] CancelledError),

    /// The message could not be handed to a pipeline worker.
    #[error("dispatch failed")]
    Dispatch(#[from] DispatchError),

    /// A persistence or package IO failure.
    #[error("storage error")]
    Storage(#[source] BoxError),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("component uid must not be empty")]
    EmptyUid,
    #[error("component `{0}` is already registered")]
    DuplicateUid(ComponentUid),
    #[error("package id must not be empty")]
    EmptyPackageId,
    #[error("a message must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// The requested component uid has no registered component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("component `{uid}` not found")]
pub struct ComponentNotFoundError {
    pub uid: ComponentUid,
}

/// A stage of a component could not be resolved or given an execution context.
#[derive(Debug, thiserror::Error)]
#[error("failed to initialize {stage} of component `{uid}`")]
pub struct InitializationError {
    pub uid: ComponentUid,
    pub stage: StageId,
    #[source]
    pub source: BoxError,
}

/// A stage raised a failure while a message traversed the pipeline.
#[derive(Debug, thiserror::Error)]
#[error("{stage} of component `{uid}` failed")]
pub struct PipelineError {
    pub uid: ComponentUid,
    pub stage: StageId,
    #[source]
    pub source: BoxError,
}

/// The shutdown signal was observed before the execution completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("execution on component `{uid}` cancelled by shutdown")]
pub struct CancelledError {
    pub uid: ComponentUid,
}

/// Failures of the dispatch machinery itself, independent of any stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The target is already executing further up the current call chain.
    #[error("component `{uid}` is already processing a message in this call chain ({})", format_chain(.chain))]
    Reentrant {
        uid: ComponentUid,
        chain: Vec<ComponentUid>,
    },
    /// Waiting for the target would close a cycle of components waiting on
    /// each other's execution gates.
    #[error("waiting for component `{uid}` would deadlock ({})", format_chain(.cycle))]
    Deadlock {
        uid: ComponentUid,
        cycle: Vec<ComponentUid>,
    },
    /// The blocking worker running the pipeline panicked or was aborted.
    #[error("pipeline worker for component `{uid}` was lost")]
    WorkerLost { uid: ComponentUid },
    /// The registry was dropped while a script still held a handle to it.
    #[error("component registry is no longer available")]
    RegistryUnavailable,
}

fn format_chain(chain: &[ComponentUid]) -> String {
    chain
        .iter()
        .map(ComponentUid::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl HubError {
    /// Wrap an adapter-level IO error.
    pub fn storage(err: impl Into<BoxError>) -> Self {
        Self::Storage(err.into())
    }

    /// Whether this error means the target component does not exist.
    #[must_use]
    pub fn is_component_not_found(&self) -> bool {
        matches!(self, Self::ComponentNotFound(_))
    }
}
