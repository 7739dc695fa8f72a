//! Globals installed into every Lua state.

use std::error::Error as _;

use homecore_app::bridge::{MODULE_NAME, RegistryBridge};
use homecore_domain::error::HubError;
use homecore_domain::id::ComponentUid;
use mlua::{Lua, Table, Value, Variadic};

use crate::convert::{to_json, to_lua};

/// Globals removed from the base library; they reach the filesystem or
/// compile arbitrary strings.
const STRIPPED_GLOBALS: [&str; 4] = ["dofile", "loadfile", "load", "collectgarbage"];

pub(crate) fn sandbox(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    for name in STRIPPED_GLOBALS {
        globals.set(name, Value::Nil)?;
    }
    Ok(())
}

/// Render `err` with its whole source chain, the only form a Lua caller sees.
fn describe(err: &HubError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn lua_error(err: &HubError) -> mlua::Error {
    mlua::Error::RuntimeError(describe(err))
}

/// Install `log.debug/info/warning/error` and route `print` to `log.info`.
pub(crate) fn install_log(lua: &Lua, uid: &ComponentUid, package: &str) -> mlua::Result<()> {
    let log = lua.create_table()?;

    macro_rules! level {
        ($name:literal, $macro:ident) => {{
            let uid = uid.clone();
            let package = package.to_string();
            let function = lua.create_function(move |_, message: String| {
                tracing::$macro!(target: "homecore::script", %uid, package = %package, "{message}");
                Ok(())
            })?;
            log.set($name, function)?;
        }};
    }

    level!("debug", debug);
    level!("info", info);
    level!("warning", warn);
    level!("error", error);

    let uid = uid.clone();
    let package = package.to_string();
    let print = lua.create_function(move |_, parts: Variadic<Value>| {
        let message = parts
            .iter()
            .map(|part| match part {
                Value::Nil => "nil".to_string(),
                Value::Boolean(value) => value.to_string(),
                Value::Integer(value) => value.to_string(),
                Value::Number(value) => value.to_string(),
                Value::String(value) => value.to_string_lossy().to_string(),
                other => other.type_name().to_string(),
            })
            .collect::<Vec<_>>()
            .join("\t");
        tracing::info!(target: "homecore::script", %uid, package = %package, "{message}");
        Ok(())
    })?;

    let globals = lua.globals();
    globals.set("log", log)?;
    globals.set("print", print)?;
    Ok(())
}

/// Install the `component_registry` module.
pub(crate) fn install_registry(lua: &Lua, bridge: &RegistryBridge) -> mlua::Result<()> {
    let module: Table = lua.create_table()?;

    let b = bridge.clone();
    module.set(
        "get_uids",
        lua.create_function(move |lua, ()| {
            let uids = b.get_uids().map_err(|err| lua_error(&err))?;
            to_lua(lua, &serde_json::Value::from(uids))
        })?,
    )?;

    let b = bridge.clone();
    let set_tag = lua.create_function(move |_, (uid, tag): (String, String)| {
        b.set_tag(&uid, &tag).map_err(|err| lua_error(&err))
    })?;
    module.set("set_tag", set_tag.clone())?;
    module.set("add_tag", set_tag)?;

    let b = bridge.clone();
    module.set(
        "remove_tag",
        lua.create_function(move |_, (uid, tag): (String, String)| {
            b.remove_tag(&uid, &tag).map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "has_tag",
        lua.create_function(move |_, (uid, tag): (String, String)| {
            b.has_tag(&uid, &tag).map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "has_status",
        lua.create_function(move |_, (uid, key): (String, String)| {
            b.has_status(&uid, &key).map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "get_status",
        lua.create_function(move |lua, (uid, key, default): (String, String, Value)| {
            let default = to_json(lua, default)?;
            let value = b
                .get_status(&uid, &key, default)
                .map_err(|err| lua_error(&err))?;
            to_lua(lua, &value)
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "set_status",
        lua.create_function(move |lua, (uid, key, value): (String, String, Value)| {
            let value = to_json(lua, value)?;
            b.set_status(&uid, &key, value).map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "has_setting",
        lua.create_function(move |_, (uid, key): (String, String)| {
            b.has_setting(&uid, &key).map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "get_setting",
        lua.create_function(move |lua, (uid, key, default): (String, String, Value)| {
            let default = to_json(lua, default)?;
            let value = b
                .get_setting(&uid, &key, default)
                .map_err(|err| lua_error(&err))?;
            to_lua(lua, &value)
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "register_setting",
        lua.create_function(move |lua, (uid, key, value): (String, String, Value)| {
            let value = to_json(lua, value)?;
            b.register_setting(&uid, &key, value)
                .map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "set_setting",
        lua.create_function(move |lua, (uid, key, value): (String, String, Value)| {
            let value = to_json(lua, value)?;
            b.set_setting(&uid, &key, value).map_err(|err| lua_error(&err))
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "process_message",
        lua.create_function(move |lua, (uid, message): (String, Value)| {
            let message = to_json(lua, message)?;
            let result = b
                .process_message(&uid, message)
                .map_err(|err| lua_error(&err))?;
            to_lua(lua, &result)
        })?,
    )?;

    let b = bridge.clone();
    module.set(
        "execute_command",
        lua.create_function(move |lua, (uid, message): (String, Value)| {
            let message = to_json(lua, message)?;
            #[allow(deprecated)]
            let result = b
                .execute_command(&uid, message)
                .map_err(|err| lua_error(&err))?;
            to_lua(lua, &result)
        })?,
    )?;

    lua.globals().set(MODULE_NAME, module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use homecore_domain::error::{DispatchError, HubError};

    #[test]
    fn should_describe_error_with_its_causes() {
        let err = HubError::from(DispatchError::WorkerLost {
            uid: ComponentUid::from("lamp"),
        });
        assert_eq!(
            describe(&err),
            "dispatch failed: pipeline worker for component `lamp` was lost"
        );
    }

    #[test]
    fn should_strip_unsafe_globals() {
        let lua = Lua::new();
        sandbox(&lua).unwrap();
        for name in STRIPPED_GLOBALS {
            let value: Value = lua.globals().get(name).unwrap();
            assert!(value.is_nil(), "{name} is still reachable");
        }
    }
}
