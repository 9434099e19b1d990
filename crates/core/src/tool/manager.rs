use std::collections::HashMap;
use std::future::ready;

use lookout_model::{ModelTool, ToolCallRequest};

use crate::tool::object::{ToolFuture, ToolObject, ToolObjectImpl};
use crate::tool::{Error, Tool};

/// An object that owns the toolset and dispatches requests from the model.
#[derive(Default)]
pub(crate) struct Manager {
    tools: HashMap<String, Box<dyn ToolObject>>,
}

impl Manager {
    /// Registers a tool, replacing any tool with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self
            .tools
            .insert(name.clone(), Box::new(ToolObjectImpl(tool)))
            .is_some()
        {
            warn!("tool `{name}` registered twice, keeping the last one");
        }
    }

    /// Returns tool definitions sorted by name, so requests are stable.
    pub fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions: Vec<_> = self
            .tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Turns each request into a future yielding its result.
    ///
    /// Every request gets a future, requests for unknown tools resolve to
    /// a [`NotFound`](crate::tool::ErrorKind::NotFound) error so the model
    /// still receives an answer for each call it made.
    pub fn handle_requests<S>(&self, requests: Vec<ToolCallRequest>, spawner: S)
    where
        S: FnMut(ToolCallRequest, ToolFuture),
    {
        let mut spawner = spawner;

        let span = debug_span!("tool manager");
        let _enter = span.enter();

        for req in requests {
            let Some(tool) = self.tools.get(&req.name) else {
                warn!("tool not found: {}", req.name);
                let reason = format!(
                    "`{}` is not a valid tool, try one of [{}]",
                    req.name,
                    self.tool_names().join(", ")
                );
                let err = Error::not_found().with_reason(reason);
                spawner(req, Box::pin(ready(Err(err))));
                continue;
            };

            trace!("spawning a tool ({}) with args: {}", req.id, req.arguments);
            let fut = tool.execute(&req.arguments);
            spawner(req, fut);
        }
    }

    fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
