//! Lua implementation of the [`ScriptHost`] / [`ScriptContext`] ports.

use homecore_app::bridge::RegistryBridge;
use homecore_app::ports::{ScriptContext, ScriptError, ScriptHost};
use homecore_domain::definition::CodeUnit;
use homecore_domain::id::ComponentUid;
use mlua::{Function, Lua, LuaOptions, StdLib, Value};

use crate::convert::{to_json, to_lua};
use crate::error::LuaHostError;
use crate::modules;

/// Standard libraries available to scripts. `io`, `os`, `package`,
/// `coroutine` and `debug` are never loaded.
fn libraries() -> StdLib {
    StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8
}

/// Creates one fresh Lua state per code unit and component.
#[derive(Debug, Clone)]
pub struct LuaScriptHost {
    bridge: RegistryBridge,
}

impl LuaScriptHost {
    #[must_use]
    pub fn new(bridge: RegistryBridge) -> Self {
        Self { bridge }
    }

    fn prepare(&self, uid: &ComponentUid, package: &str) -> Result<Lua, LuaHostError> {
        let lua = Lua::new_with(libraries(), LuaOptions::default())?;
        modules::sandbox(&lua)?;
        modules::install_log(&lua, uid, package)?;
        modules::install_registry(&lua, &self.bridge)?;
        lua.globals().set("component_uid", uid.as_str())?;
        Ok(lua)
    }
}

impl ScriptHost for LuaScriptHost {
    type Context = LuaScriptContext;

    fn create_context(
        &self,
        uid: &ComponentUid,
        unit: &CodeUnit,
    ) -> Result<Self::Context, ScriptError> {
        let package = unit.package.to_string();
        let lua = self.prepare(uid, &package)?;

        lua.load(unit.source.as_str())
            .set_name(format!("={package}"))
            .exec()
            .map_err(|err| ScriptError::Load(err.to_string()))?;

        tracing::debug!(%uid, %package, "lua context created");
        Ok(LuaScriptContext { lua })
    }
}

/// An isolated Lua state holding one loaded code unit.
pub struct LuaScriptContext {
    lua: Lua,
}

impl std::fmt::Debug for LuaScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaScriptContext")
            .field("used_memory", &self.lua.used_memory())
            .finish()
    }
}

impl LuaScriptContext {
    fn function(&self, name: &str) -> Option<Function> {
        match self.lua.globals().get::<Value>(name) {
            Ok(Value::Function(function)) => Some(function),
            _ => None,
        }
    }
}

impl ScriptContext for LuaScriptContext {
    fn has_function(&self, function: &str) -> bool {
        self.function(function).is_some()
    }

    fn invoke(
        &mut self,
        function: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, ScriptError> {
        let Some(entry) = self.function(function) else {
            return Err(ScriptError::MissingFunction(function.to_string()));
        };
        let argument =
            to_lua(&self.lua, &payload).map_err(|err| ScriptError::Conversion(err.to_string()))?;
        let result: Value = entry
            .call(argument)
            .map_err(|err| ScriptError::Runtime(err.to_string()))?;
        to_json(&self.lua, result).map_err(|err| ScriptError::Conversion(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use homecore_app::registry::ComponentRegistry;
    use homecore_app::shutdown::ShutdownSignal;
    use homecore_domain::definition::PackageRef;
    use serde_json::json;
    use tokio::runtime::Handle;

    fn host(registry: &Arc<ComponentRegistry>) -> LuaScriptHost {
        LuaScriptHost::new(RegistryBridge::new(registry, Handle::current()))
    }

    fn unit(source: &str) -> CodeUnit {
        CodeUnit::new(PackageRef::new("test").with_version("1.0"), source)
    }

    async fn context(source: &'static str) -> Result<LuaScriptContext, ScriptError> {
        let registry = Arc::new(ComponentRegistry::new(ShutdownSignal::never()));
        let host = host(&registry);
        tokio::task::spawn_blocking(move || {
            host.create_context(&ComponentUid::from("lamp"), &unit(source))
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_call_defined_function_with_json_payload() {
        let mut context = context(
            r#"
            function process_message(message)
                return { type = "reply", echo = message.value, uid = component_uid }
            end
            "#,
        )
        .await
        .unwrap();

        assert!(context.has_function("process_message"));
        assert!(!context.has_function("on_message"));
        let result = context
            .invoke("process_message", json!({ "type": "ping", "value": [1, 2] }))
            .unwrap();
        assert_eq!(result, json!({ "type": "reply", "echo": [1, 2], "uid": "lamp" }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_report_missing_function() {
        let mut context = context("x = 1").await.unwrap();
        let err = context.invoke("process_message", json!({})).unwrap_err();
        assert!(matches!(err, ScriptError::MissingFunction(name) if name == "process_message"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_fail_to_load_invalid_source() {
        let err = context("function (").await.unwrap_err();
        assert!(matches!(err, ScriptError::Load(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_surface_script_errors_as_runtime_failures() {
        let mut context = context(r#"function process_message() error("boom") end"#)
            .await
            .unwrap();
        let err = context.invoke("process_message", json!({})).unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(msg) if msg.contains("boom")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_not_expose_host_libraries() {
        let mut context = context(
            r"
            function libraries()
                return {
                    io = io == nil,
                    os = os == nil,
                    require = require == nil,
                    debug = debug == nil,
                    dofile = dofile == nil,
                    load = load == nil,
                    string = string ~= nil,
                }
            end
            ",
        )
        .await
        .unwrap();

        let result = context.invoke("libraries", json!({})).unwrap();
        for (name, ok) in result.as_object().unwrap() {
            assert_eq!(ok, &json!(true), "unexpected availability of `{name}`");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_keep_state_between_calls_but_not_between_contexts() {
        let source = r"
            count = 0
            function bump() count = count + 1; return { count = count } end
        ";
        let mut first = context(source).await.unwrap();
        let mut second = context(source).await.unwrap();

        first.invoke("bump", json!({})).unwrap();
        assert_eq!(first.invoke("bump", json!({})).unwrap(), json!({ "count": 2 }));
        assert_eq!(second.invoke("bump", json!({})).unwrap(), json!({ "count": 1 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_map_null_to_nil_and_keep_empty_arrays() {
        let mut context = context(
            r"
            function inspect(payload)
                return { missing_is_nil = payload.missing == nil, list = payload.list }
            end
            ",
        )
        .await
        .unwrap();

        let result = context
            .invoke("inspect", json!({ "missing": null, "list": [] }))
            .unwrap();
        assert_eq!(result, json!({ "missing_is_nil": true, "list": [] }));
    }
}
