//! Component registry: the concurrent set of live components.
//!
//! Every entry owns two independent locks:
//!
//! - a short-lived `std` mutex over the component's tags, settings and status;
//! - an async execution gate owning the pipeline, held for the whole duration
//!   of a message dispatch.
//!
//! The uid map itself is only locked for lookups and structural changes, never
//! while a pipeline runs. Dispatches to distinct uids therefore never contend,
//! while dispatches to the same uid queue on its gate.
//!
//! Pipelines execute on tokio's blocking pool because script stages may block
//! for as long as the script runs.
//!
//! A pipeline dispatching to another component keeps its own gate while it
//! waits. The registry records these waits and refuses a dispatch that would
//! close a cycle, whether the cycle lies within one call chain
//! ([`DispatchError::Reentrant`]) or spans chains started from different
//! components ([`DispatchError::Deadlock`]).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use homecore_domain::component::{Component, ComponentSnapshot};
use homecore_domain::error::{
    CancelledError, ComponentNotFoundError, DispatchError, HubError, ValidationError,
};
use homecore_domain::id::ComponentUid;
use homecore_domain::message::{Message, Response};
use serde_json::{Map, Value};

use crate::pipeline::{Pipeline, WiredComponent};
use crate::shutdown::ShutdownSignal;

struct Entry {
    state: Mutex<Component>,
    gate: Arc<tokio::sync::Mutex<Pipeline>>,
}

impl Entry {
    fn new(wired: WiredComponent) -> Self {
        Self {
            state: Mutex::new(wired.component),
            gate: Arc::new(tokio::sync::Mutex::new(wired.pipeline)),
        }
    }

    fn state(&self) -> MutexGuard<'_, Component> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns every registered component and dispatches messages to them.
pub struct ComponentRegistry {
    entries: RwLock<BTreeMap<ComponentUid, Arc<Entry>>>,
    /// Executing component -> component whose gate it is waiting for.
    waits: Mutex<HashMap<ComponentUid, ComponentUid>>,
    shutdown: ShutdownSignal,
}

impl ComponentRegistry {
    /// Create an empty registry observing `shutdown`.
    #[must_use]
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            waits: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Publish a wired component.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateUid`] if the uid is taken, or
    /// [`ValidationError::EmptyUid`] for a blank uid.
    pub fn register(&self, wired: WiredComponent) -> Result<(), HubError> {
        wired.component.validate()?;
        let uid = wired.uid().clone();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&uid) {
            return Err(ValidationError::DuplicateUid(uid).into());
        }
        tracing::info!(%uid, stages = wired.pipeline.stages().len(), "component registered");
        entries.insert(uid, Arc::new(Entry::new(wired)));
        Ok(())
    }

    /// Remove `uid`, returning whether it was registered.
    ///
    /// A dispatch already holding the entry runs to completion on the
    /// removed pipeline.
    pub fn unregister(&self, uid: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uid)
            .is_some();
        if removed {
            tracing::info!(uid, "component unregistered");
        }
        removed
    }

    /// Swap the pipeline of a registered component.
    ///
    /// Waits for the in-flight dispatch to finish. Tags and status survive;
    /// existing settings win over the new component's defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered
    /// or was unregistered while waiting, or [`HubError::Cancelled`] if
    /// shutdown fires while waiting.
    pub async fn replace(&self, wired: WiredComponent) -> Result<(), HubError> {
        let WiredComponent {
            component,
            pipeline,
        } = wired;
        let uid = component.uid().clone();
        let entry = self.entry(uid.as_str())?;

        let mut gate = tokio::select! {
            biased;
            () = self.shutdown.triggered() => return Err(CancelledError { uid }.into()),
            gate = entry.gate.lock() => gate,
        };
        if !self.is_current(&uid, &entry) {
            return Err(ComponentNotFoundError { uid }.into());
        }

        {
            let mut state = entry.state();
            let previous = std::mem::replace(&mut *state, component);
            state.inherit(previous);
        }
        *gate = pipeline;

        tracing::info!(%uid, "component pipeline replaced");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.read().contains_key(uid)
    }

    /// Uids of all registered components, sorted.
    #[must_use]
    pub fn get_uids(&self) -> Vec<ComponentUid> {
        self.read().keys().cloned().collect()
    }

    /// Uids of all components carrying `tag`, sorted.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Vec<ComponentUid> {
        let entries: Vec<(ComponentUid, Arc<Entry>)> = self
            .read()
            .iter()
            .map(|(uid, entry)| (uid.clone(), Arc::clone(entry)))
            .collect();
        entries
            .into_iter()
            .filter(|(_, entry)| entry.state().has_tag(tag))
            .map(|(uid, _)| uid)
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn snapshot(&self, uid: &str) -> Result<ComponentSnapshot, HubError> {
        self.with_component(uid, |component| component.snapshot())
    }

    /// Copy of all settings of `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn settings(&self, uid: &str) -> Result<Map<String, Value>, HubError> {
        self.with_component(uid, |component| component.settings().clone())
    }

    /// Add `tag`; returns whether it was absent.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn set_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.with_component(uid, |component| component.set_tag(tag))
    }

    /// Remove `tag`; returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn remove_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.with_component(uid, |component| component.remove_tag(tag))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn has_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.with_component(uid, |component| component.has_tag(tag))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn has_status_value(&self, uid: &str, key: &str) -> Result<bool, HubError> {
        self.with_component(uid, |component| component.has_status(key))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn get_status_value(&self, uid: &str, key: &str, default: Value) -> Result<Value, HubError> {
        self.with_component(uid, |component| component.status_or(key, default))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn set_status_value(&self, uid: &str, key: &str, value: Value) -> Result<(), HubError> {
        self.with_component(uid, |component| component.set_status(key, value))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn has_setting(&self, uid: &str, key: &str) -> Result<bool, HubError> {
        self.with_component(uid, |component| component.has_setting(key))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn get_setting(&self, uid: &str, key: &str, default: Value) -> Result<Value, HubError> {
        self.with_component(uid, |component| component.setting_or(key, default))
    }

    /// Store `value` unless `key` is already set; returns whether it was stored.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn register_setting(&self, uid: &str, key: &str, value: Value) -> Result<bool, HubError> {
        self.with_component(uid, |component| component.register_setting(key, value))
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if the uid is not registered.
    pub fn set_setting(&self, uid: &str, key: &str, value: Value) -> Result<(), HubError> {
        self.with_component(uid, |component| component.set_setting(key, value))
    }

    /// Dispatch `message` to the pipeline of `uid`.
    ///
    /// # Errors
    ///
    /// - [`HubError::ComponentNotFound`] before any pipeline work if `uid` is unknown
    /// - [`HubError::Pipeline`] when a stage fails
    /// - [`HubError::Cancelled`] once shutdown has been requested
    /// - [`HubError::Dispatch`] when the worker is lost, or when a nested
    ///   dispatch would wait on itself
    pub async fn process_message(&self, uid: &str, message: Message) -> Result<Response, HubError> {
        self.process_message_within(uid, message, Vec::new()).await
    }

    /// Dispatch on behalf of a pipeline already running for every uid in `chain`.
    pub(crate) async fn process_message_within(
        &self,
        uid: &str,
        message: Message,
        chain: Vec<ComponentUid>,
    ) -> Result<Response, HubError> {
        let entry = self.entry(uid)?;
        let uid = ComponentUid::from(uid);

        if chain.contains(&uid) {
            let mut chain = chain;
            chain.push(uid.clone());
            return Err(DispatchError::Reentrant { uid, chain }.into());
        }
        if self.shutdown.is_triggered() {
            return Err(CancelledError { uid }.into());
        }
        let _waiting = self.wait_for(&chain, &uid)?;

        let mut pipeline = tokio::select! {
            biased;
            () = self.shutdown.triggered() => {
                tracing::debug!(%uid, "shutdown while waiting for execution gate");
                return Err(CancelledError { uid }.into());
            }
            pipeline = Arc::clone(&entry.gate).lock_owned() => pipeline,
        };

        tracing::debug!(%uid, kind = ?message.message_type(), "dispatching message");
        let shutdown = self.shutdown.clone();
        let worker_uid = uid.clone();
        let mut scope = chain;
        scope.push(uid.clone());

        tokio::task::spawn_blocking(move || {
            let _scope = call_chain::enter(scope);
            pipeline.execute(&worker_uid, message, &shutdown)
        })
        .await
        .map_err(|err| {
            tracing::error!(%uid, error = %err, "pipeline worker lost");
            HubError::from(DispatchError::WorkerLost { uid })
        })?
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, BTreeMap<ComponentUid, Arc<Entry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, uid: &ComponentUid, entry: &Arc<Entry>) -> bool {
        self.read()
            .get(uid)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    /// Record that the innermost component of `chain` waits for `uid`.
    ///
    /// Fails if `uid` is itself (transitively) waiting for a component of
    /// `chain`, since every component of the chain holds its gate.
    fn wait_for(
        &self,
        chain: &[ComponentUid],
        uid: &ComponentUid,
    ) -> Result<Option<Waiting<'_>>, HubError> {
        let Some(waiter) = chain.last() else {
            return Ok(None);
        };
        let mut waits = self.waits.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cycle = vec![waiter.clone(), uid.clone()];
        let mut current = uid;
        while let Some(next) = waits.get(current) {
            cycle.push(next.clone());
            if chain.contains(next) {
                tracing::warn!(%uid, ?cycle, "refusing dispatch that would deadlock");
                return Err(DispatchError::Deadlock {
                    uid: uid.clone(),
                    cycle,
                }
                .into());
            }
            if cycle.len() > waits.len() + 2 {
                break;
            }
            current = next;
        }
        waits.insert(waiter.clone(), uid.clone());
        Ok(Some(Waiting {
            waits: &self.waits,
            waiter: waiter.clone(),
        }))
    }

    fn entry(&self, uid: &str) -> Result<Arc<Entry>, HubError> {
        self.read().get(uid).cloned().ok_or_else(|| {
            ComponentNotFoundError {
                uid: ComponentUid::from(uid),
            }
            .into()
        })
    }

    fn with_component<T>(
        &self,
        uid: &str,
        f: impl FnOnce(&mut Component) -> T,
    ) -> Result<T, HubError> {
        let entry = self.entry(uid)?;
        let mut component = entry.state();
        Ok(f(&mut component))
    }
}

/// Removes a wait recorded by [`ComponentRegistry::wait_for`] when dropped.
#[derive(Debug)]
struct Waiting<'a> {
    waits: &'a Mutex<HashMap<ComponentUid, ComponentUid>>,
    waiter: ComponentUid,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.waiter);
    }
}

/// Uids whose pipelines are executing on the current thread, outermost first.
pub mod call_chain {
    use std::cell::RefCell;

    use homecore_domain::id::ComponentUid;

    thread_local! {
        static CHAIN: RefCell<Vec<ComponentUid>> = const { RefCell::new(Vec::new()) };
    }

    /// The chain of the pipeline running on this thread; empty outside one.
    #[must_use]
    pub fn current() -> Vec<ComponentUid> {
        CHAIN.with(|chain| chain.borrow().clone())
    }

    /// Restores the previous chain when dropped.
    pub(crate) struct Scope {
        previous: Vec<ComponentUid>,
    }

    pub(crate) fn enter(chain: Vec<ComponentUid>) -> Scope {
        let previous = CHAIN.with(|current| current.replace(chain));
        Scope { previous }
    }

    impl Drop for Scope {
        fn drop(&mut self) {
            let previous = std::mem::take(&mut self.previous);
            CHAIN.with(|current| current.replace(previous));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::pipeline::testing::{TraceAdapter, TraceLogic, entries, trace};
    use crate::pipeline::{LogicStage, StageError};
    use crate::shutdown;
    use serde_json::json;

    fn wired(uid: &str, logic: impl LogicStage + 'static) -> WiredComponent {
        WiredComponent::new(
            Component::builder().uid(uid).build().unwrap(),
            Pipeline::new(logic),
        )
    }

    fn echo(uid: &str) -> WiredComponent {
        wired(uid, TraceLogic::new("echo", &trace()))
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new(ShutdownSignal::never())
    }

    /// Logic recording how many executions overlap.
    struct OverlapCounter {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl LogicStage for OverlapCounter {
        fn name(&self) -> &str {
            "overlap"
        }

        fn process(&mut self, _message: Message) -> Result<Response, StageError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Response::new("done"))
        }
    }

    #[test]
    fn should_list_uids_sorted() {
        let registry = registry();
        registry.register(echo("b")).unwrap();
        registry.register(echo("a")).unwrap();
        registry.register(echo("c")).unwrap();

        let uids: Vec<String> = registry.get_uids().into_iter().map(String::from).collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
    }

    #[test]
    fn should_reject_duplicate_uid() {
        let registry = registry();
        registry.register(echo("lamp")).unwrap();

        let err = registry.register(echo("lamp")).unwrap_err();
        assert!(matches!(
            err,
            HubError::Validation(ValidationError::DuplicateUid(uid)) if uid.as_str() == "lamp"
        ));
    }

    #[test]
    fn should_report_not_found_for_state_operations() {
        let registry = registry();
        assert!(registry.set_tag("ghost", "x").unwrap_err().is_component_not_found());
        assert!(registry.has_setting("ghost", "x").unwrap_err().is_component_not_found());
        assert!(
            registry
                .get_status_value("", "x", Value::Null)
                .unwrap_err()
                .is_component_not_found()
        );
    }

    #[test]
    fn should_toggle_tags_idempotently() {
        let registry = registry();
        registry.register(echo("lamp")).unwrap();

        assert!(registry.set_tag("lamp", "light").unwrap());
        assert!(!registry.set_tag("lamp", "light").unwrap());
        assert!(registry.has_tag("lamp", "light").unwrap());
        assert!(registry.remove_tag("lamp", "light").unwrap());
        assert!(!registry.remove_tag("lamp", "light").unwrap());
        assert!(!registry.has_tag("lamp", "light").unwrap());
    }

    #[test]
    fn should_keep_first_registered_setting_until_set() {
        let registry = registry();
        registry.register(echo("lamp")).unwrap();

        assert!(registry.register_setting("lamp", "level", json!(1)).unwrap());
        assert!(!registry.register_setting("lamp", "level", json!(2)).unwrap());
        assert_eq!(registry.get_setting("lamp", "level", Value::Null).unwrap(), json!(1));

        registry.set_setting("lamp", "level", json!(2)).unwrap();
        assert_eq!(registry.get_setting("lamp", "level", Value::Null).unwrap(), json!(2));
        assert_eq!(registry.settings("lamp").unwrap().len(), 1);
    }

    #[test]
    fn should_round_trip_status_values() {
        let registry = registry();
        registry.register(echo("lamp")).unwrap();

        for value in [
            Value::Null,
            json!(true),
            json!(42),
            json!(-1.5),
            json!("on"),
            json!([1, "two", {"three": 3}]),
            json!({"nested": {"list": [false, null]}}),
        ] {
            registry.set_status_value("lamp", "power", value.clone()).unwrap();
            assert!(registry.has_status_value("lamp", "power").unwrap());
            assert_eq!(
                registry.get_status_value("lamp", "power", json!("default")).unwrap(),
                value
            );
        }
        assert_eq!(
            registry.get_status_value("lamp", "missing", json!("default")).unwrap(),
            json!("default")
        );
    }

    #[test]
    fn should_find_components_by_tag() {
        let registry = registry();
        for uid in ["a", "b", "c"] {
            registry.register(echo(uid)).unwrap();
        }
        registry.set_tag("c", "light").unwrap();
        registry.set_tag("a", "light").unwrap();

        let uids: Vec<String> = registry
            .find_by_tag("light")
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(uids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn should_fail_fast_for_unknown_uid() {
        let registry = registry();
        let err = registry
            .process_message("ghost", Message::new("ping"))
            .await
            .unwrap_err();
        assert!(err.is_component_not_found());
    }

    #[tokio::test]
    async fn should_run_pipeline_in_order() {
        let trace = trace();
        let registry = registry();
        registry
            .register(WiredComponent::new(
                Component::builder().uid("lamp").build().unwrap(),
                Pipeline::new(TraceLogic::new("L", &trace))
                    .with_adapter(TraceAdapter::new("A", &trace))
                    .with_adapter(TraceAdapter::new("B", &trace)),
            ))
            .unwrap();

        let response = registry
            .process_message("lamp", Message::new("ping"))
            .await
            .unwrap();

        assert_eq!(response.get("handled_by"), Some(&json!("L")));
        assert_eq!(entries(&trace), vec!["A-pre", "B-pre", "L", "B-post", "A-post"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_run_distinct_components_in_parallel() {
        let registry = Arc::new(registry());
        for uid in ["a", "b", "c", "d"] {
            let mut logic = TraceLogic::new(uid, &trace());
            logic.delay = Duration::from_millis(300);
            registry.register(wired(uid, logic)).unwrap();
        }

        let started = Instant::now();
        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|uid| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.process_message(uid, Message::new("ping")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_serialize_messages_to_the_same_component() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(registry());
        registry
            .register(wired(
                "lamp",
                OverlapCounter {
                    active: Arc::clone(&active),
                    peak: Arc::clone(&peak),
                    delay: Duration::from_millis(20),
                },
            ))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.process_message("lamp", Message::new("ping")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_cancel_new_dispatch_after_shutdown() {
        let (trigger, signal) = shutdown::channel();
        let registry = ComponentRegistry::new(signal);
        registry.register(echo("lamp")).unwrap();
        trigger.trigger();

        let err = registry
            .process_message("lamp", Message::new("ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Cancelled(CancelledError { uid }) if uid.as_str() == "lamp"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_cancel_dispatch_queued_behind_gate() {
        let (trigger, signal) = shutdown::channel();
        let registry = Arc::new(ComponentRegistry::new(signal));
        let mut slow = TraceLogic::new("slow", &trace());
        slow.delay = Duration::from_millis(300);
        registry.register(wired("lamp", slow)).unwrap();

        let first = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.process_message("lamp", Message::new("first")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let queued = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.process_message("lamp", Message::new("second")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.trigger();

        let err = queued.await.unwrap().unwrap_err();
        assert!(matches!(err, HubError::Cancelled(_)));
        let _ = first.await.unwrap();
    }

    #[tokio::test]
    async fn should_reject_reentrant_dispatch() {
        let registry = registry();
        registry.register(echo("a")).unwrap();

        let err = registry
            .process_message_within(
                "a",
                Message::new("ping"),
                vec![ComponentUid::from("a"), ComponentUid::from("b")],
            )
            .await
            .unwrap_err();

        match err {
            HubError::Dispatch(DispatchError::Reentrant { uid, chain }) => {
                assert_eq!(uid.as_str(), "a");
                assert_eq!(chain.len(), 3);
            }
            other => panic!("expected reentrant dispatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_miss_after_unregister() {
        let registry = registry();
        registry.register(echo("lamp")).unwrap();

        assert!(registry.unregister("lamp"));
        assert!(!registry.unregister("lamp"));
        assert!(!registry.contains("lamp"));
        let err = registry
            .process_message("lamp", Message::new("ping"))
            .await
            .unwrap_err();
        assert!(err.is_component_not_found());
    }

    #[tokio::test]
    async fn should_keep_state_when_replacing_pipeline() {
        let registry = registry();
        registry.register(echo("lamp")).unwrap();
        registry.set_tag("lamp", "light").unwrap();
        registry.set_status_value("lamp", "power", json!("on")).unwrap();
        registry.set_setting("lamp", "level", json!(70)).unwrap();

        let component = Component::builder()
            .uid("lamp")
            .setting("level", 50)
            .setting("fade_ms", 100)
            .build()
            .unwrap();
        registry
            .replace(WiredComponent::new(
                component,
                Pipeline::new(TraceLogic::new("v2", &trace())),
            ))
            .await
            .unwrap();

        let snapshot = registry.snapshot("lamp").unwrap();
        assert_eq!(snapshot.tags, vec!["light"]);
        assert_eq!(snapshot.status.get("power"), Some(&json!("on")));
        assert_eq!(snapshot.settings.get("level"), Some(&json!(70)));
        assert_eq!(snapshot.settings.get("fade_ms"), Some(&json!(100)));

        let response = registry
            .process_message("lamp", Message::new("ping"))
            .await
            .unwrap();
        assert_eq!(response.get("handled_by"), Some(&json!("v2")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_not_replace_component_unregistered_while_waiting() {
        let registry = Arc::new(registry());
        let mut slow = TraceLogic::new("slow", &trace());
        slow.delay = Duration::from_millis(300);
        registry.register(wired("lamp", slow)).unwrap();

        let running = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.process_message("lamp", Message::new("ping")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let replacing = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.replace(echo("lamp")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.unregister("lamp"));

        let err = replacing.await.unwrap().unwrap_err();
        assert!(err.is_component_not_found());
        running.await.unwrap().unwrap();
        assert!(!registry.contains("lamp"));
    }

    #[tokio::test]
    async fn should_not_replace_unknown_component() {
        let registry = registry();
        let err = registry.replace(echo("ghost")).await.unwrap_err();
        assert!(err.is_component_not_found());
    }

    #[test]
    fn should_refuse_wait_closing_a_cycle_across_chains() {
        let registry = registry();
        let a = ComponentUid::from("a");
        let b = ComponentUid::from("b");
        let c = ComponentUid::from("c");

        let a_waits_for_b = registry.wait_for(&[a.clone()], &b).unwrap();
        let b_waits_for_c = registry.wait_for(&[b.clone()], &c).unwrap();

        match registry.wait_for(&[c.clone()], &a) {
            Err(HubError::Dispatch(DispatchError::Deadlock { uid, cycle })) => {
                assert_eq!(uid, a);
                assert_eq!(cycle, vec![c.clone(), a.clone(), b.clone(), c.clone()]);
            }
            other => panic!("expected deadlock, got {other:?}"),
        }

        drop(b_waits_for_c);
        assert!(registry.wait_for(&[c.clone()], &a).unwrap().is_some());
        drop(a_waits_for_b);
    }

    #[test]
    fn should_not_record_waits_for_top_level_dispatch() {
        let registry = registry();
        assert!(registry.wait_for(&[], &ComponentUid::from("a")).unwrap().is_none());
    }

    #[test]
    fn should_restore_call_chain_after_scope() {
        assert!(call_chain::current().is_empty());
        {
            let _outer = call_chain::enter(vec![ComponentUid::from("a")]);
            {
                let _inner =
                    call_chain::enter(vec![ComponentUid::from("a"), ComponentUid::from("b")]);
                assert_eq!(call_chain::current().len(), 2);
            }
            assert_eq!(call_chain::current(), vec![ComponentUid::from("a")]);
        }
        assert!(call_chain::current().is_empty());
    }
}
