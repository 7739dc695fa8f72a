//! Lua ⇄ JSON marshalling.
//!
//! `null` maps to `nil` in both directions. Sequences keep mlua's array
//! metatable so an empty JSON array comes back as an array, not an object.

use mlua::{DeserializeOptions, Lua, LuaSerdeExt, SerializeOptions};
use serde_json::Value;

pub(crate) fn to_lua(lua: &Lua, value: &Value) -> mlua::Result<mlua::Value> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

pub(crate) fn to_json(lua: &Lua, value: mlua::Value) -> mlua::Result<Value> {
    lua.from_value_with(value, DeserializeOptions::new())
}
