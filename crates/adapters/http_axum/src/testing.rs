//! In-memory fakes and a request helper shared by the handler tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use homecore_app::initializer::ComponentInitializer;
use homecore_app::pipeline::PROCESS_MESSAGE;
use homecore_app::ports::{
    KeyValueStore, PackageError, PackageResolver, ScriptContext, ScriptError, ScriptHost,
};
use homecore_app::registry::ComponentRegistry;
use homecore_app::services::component_service::ComponentService;
use homecore_app::services::settings_persister::SettingsPersister;
use homecore_app::shutdown::ShutdownSignal;
use homecore_domain::definition::{CodeUnit, ComponentDefinition, PackageRef};
use homecore_domain::error::HubError;
use homecore_domain::id::ComponentUid;

use crate::router;
use crate::state::AppState;

pub(crate) struct StubResolver;

impl PackageResolver for StubResolver {
    fn resolve(
        &self,
        package: &PackageRef,
    ) -> impl Future<Output = Result<CodeUnit, PackageError>> + Send {
        let unit = CodeUnit::new(PackageRef::new(package.id.clone()).with_version("1.0"), "");
        async { Ok(unit) }
    }
}

/// Logic answering `{ "type": "echo", "message": … }`, failing on `fail`.
pub(crate) struct EchoContext;

impl ScriptContext for EchoContext {
    fn has_function(&self, function: &str) -> bool {
        function == PROCESS_MESSAGE
    }

    fn invoke(&mut self, function: &str, payload: Value) -> Result<Value, ScriptError> {
        if function != PROCESS_MESSAGE {
            return Ok(Value::Null);
        }
        if payload["type"] == "fail" {
            return Err(ScriptError::Runtime("boom".to_string()));
        }
        Ok(json!({ "type": "echo", "message": payload }))
    }
}

pub(crate) struct EchoHost;

impl ScriptHost for EchoHost {
    type Context = EchoContext;

    fn create_context(
        &self,
        _uid: &ComponentUid,
        _unit: &CodeUnit,
    ) -> Result<Self::Context, ScriptError> {
        Ok(EchoContext)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl KeyValueStore for InMemoryStore {
    fn read(&self, path: &[&str]) -> impl Future<Output = Result<Option<Value>, HubError>> + Send {
        let value = self.values.lock().unwrap().get(&path.join("/")).cloned();
        async { Ok(value) }
    }

    fn write(&self, path: &[&str], value: Value) -> impl Future<Output = Result<(), HubError>> + Send {
        self.values.lock().unwrap().insert(path.join("/"), value);
        async { Ok(()) }
    }

    fn delete(&self, path: &[&str]) -> impl Future<Output = Result<(), HubError>> + Send {
        let prefix = path.join("/");
        self.values
            .lock()
            .unwrap()
            .retain(|key, _| key != &prefix && !key.starts_with(&format!("{prefix}/")));
        async { Ok(()) }
    }
}

pub(crate) type TestService = ComponentService<StubResolver, EchoHost, Arc<InMemoryStore>>;

pub(crate) fn lamp(uid: &str) -> ComponentDefinition {
    ComponentDefinition::new(uid, PackageRef::new("lamp")).setting("level", 50)
}

pub(crate) struct TestApp {
    router: Router,
    service: Arc<TestService>,
    store: Arc<InMemoryStore>,
}

impl TestApp {
    pub(crate) async fn with(definitions: Vec<ComponentDefinition>) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let registry = Arc::new(ComponentRegistry::new(ShutdownSignal::never()));
        let initializer = ComponentInitializer::new(StubResolver, Arc::new(EchoHost));
        let settings = Arc::new(SettingsPersister::new(Arc::clone(&store)));
        let service = Arc::new(ComponentService::new(registry, initializer, settings));
        for definition in definitions {
            service.load(definition).await.unwrap();
        }
        Self {
            router: router::build(AppState::from_arc(Arc::clone(&service))),
            service,
            store,
        }
    }

    pub(crate) fn router(&self) -> Router {
        self.router.clone()
    }

    pub(crate) fn registry(&self) -> &Arc<ComponentRegistry> {
        self.service.registry()
    }

    pub(crate) fn stored(&self, path: &str) -> Option<Value> {
        self.store.values.lock().unwrap().get(path).cloned()
    }

    pub(crate) async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub(crate) async fn send(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}
