//! Pipeline stages backed by a [`ScriptContext`].
//!
//! Adapter scripts define `on_message(message)` and optionally
//! `on_response(result)`. `on_message` returns nothing to pass the message
//! through, `{ forward = message }` to pass a transformed one, or
//! `{ respond = result }` to answer directly. `on_response` returns nothing
//! to keep the result or a new result table.
//!
//! Logic scripts define `process_message(message)`; returning nothing yields
//! an empty result.

use homecore_domain::message::{Message, Response, json_kind};
use serde_json::Value;

use super::{AdapterFlow, AdapterStage, LogicStage, StageError};
use crate::ports::ScriptContext;

pub const ON_MESSAGE: &str = "on_message";
pub const ON_RESPONSE: &str = "on_response";
pub const PROCESS_MESSAGE: &str = "process_message";

const FORWARD_KEY: &str = "forward";
const RESPOND_KEY: &str = "respond";

/// Adapter stage delegating to a script's `on_message` / `on_response`.
pub struct ScriptAdapter<C> {
    name: String,
    context: C,
}

impl<C: ScriptContext> ScriptAdapter<C> {
    pub fn new(name: impl Into<String>, context: C) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }
}

impl<C: ScriptContext> AdapterStage for ScriptAdapter<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_message(&mut self, message: Message) -> Result<AdapterFlow, StageError> {
        let payload = message.clone().into_value();
        match self.context.invoke(ON_MESSAGE, payload)? {
            Value::Null => Ok(AdapterFlow::Forward(message)),
            Value::Object(mut fields) => {
                if let Some(result) = fields.remove(RESPOND_KEY) {
                    return Ok(AdapterFlow::Respond(Response::from_value(result)?));
                }
                if let Some(next) = fields.remove(FORWARD_KEY) {
                    return Ok(AdapterFlow::Forward(Message::from_value(next)?));
                }
                Err(StageError::Protocol(format!(
                    "{ON_MESSAGE} must return nil, {{{FORWARD_KEY} = ...}} or {{{RESPOND_KEY} = ...}}"
                )))
            }
            other => Err(StageError::Protocol(format!(
                "{ON_MESSAGE} returned a {}",
                json_kind(&other)
            ))),
        }
    }

    fn on_response(&mut self, response: Response) -> Result<Response, StageError> {
        if !self.context.has_function(ON_RESPONSE) {
            return Ok(response);
        }
        match self.context.invoke(ON_RESPONSE, response.clone().into_value())? {
            Value::Null => Ok(response),
            other => Ok(Response::from_value(other)?),
        }
    }
}

/// Logic stage delegating to a script's `process_message`.
pub struct ScriptLogic<C> {
    name: String,
    context: C,
}

impl<C: ScriptContext> ScriptLogic<C> {
    pub fn new(name: impl Into<String>, context: C) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }
}

impl<C: ScriptContext> LogicStage for ScriptLogic<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, message: Message) -> Result<Response, StageError> {
        match self.context.invoke(PROCESS_MESSAGE, message.into_value())? {
            Value::Null => Ok(Response::default()),
            other => Ok(Response::from_value(other)?),
        }
    }
}
