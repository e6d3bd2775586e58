use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ParleyError, Result};

/// Named arguments supplied to a tool.
pub type ToolArguments = Map<String, Value>;

/// Static description of a tool: what it is called, what it does and which
/// parameters it accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: BTreeMap<String, String>,
    required_parameters: BTreeSet<String>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            required_parameters: BTreeSet::new(),
        }
    }

    /// Build a descriptor from raw parts, rejecting required parameters that
    /// are not declared.
    pub fn from_parts(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: BTreeMap<String, String>,
        required_parameters: BTreeSet<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ParleyError::InvalidDescriptor(
                "tool name must not be empty".into(),
            ));
        }
        if let Some(undeclared) = required_parameters
            .iter()
            .find(|param| !parameters.contains_key(*param))
        {
            return Err(ParleyError::InvalidDescriptor(format!(
                "required parameter `{undeclared}` of tool `{name}` is not declared"
            )));
        }
        Ok(Self {
            name,
            description: description.into(),
            parameters,
            required_parameters,
        })
    }

    /// Declare an optional parameter.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.insert(name.into(), description.into());
        self
    }

    /// Declare a parameter that every call must supply.
    pub fn with_required_parameter(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.required_parameters.insert(name.clone());
        self.parameters.insert(name, description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn required_parameters(&self) -> &BTreeSet<String> {
        &self.required_parameters
    }

    pub fn is_required(&self, parameter: &str) -> bool {
        self.required_parameters.contains(parameter)
    }

    /// First required parameter absent from `arguments`. Explicit nulls count
    /// as absent.
    pub fn missing_parameter(&self, arguments: &ToolArguments) -> Option<&str> {
        self.required_parameters
            .iter()
            .find(|param| matches!(arguments.get(param.as_str()), None | Some(Value::Null)))
            .map(String::as_str)
    }

    /// Text block used when listing tools inside a prompt.
    pub fn prompt_entry(&self) -> String {
        let params = self
            .parameters
            .keys()
            .map(|param| {
                if self.is_required(param) {
                    format!("{param} (required)")
                } else {
                    param.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut entry = String::new();
        let _ = writeln!(entry, "Tool: {}", self.name);
        let _ = writeln!(entry, "Description: {}", self.description);
        let _ = writeln!(entry, "Parameters: {params}");
        entry
    }
}

/// A request to run one tool with named arguments.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: ToolArguments::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// The callable behind a registered tool. Handlers are synchronous and are
/// expected to return quickly.
pub trait ToolHandler: Send + Sync {
    fn call(&self, arguments: &ToolArguments) -> Result<Value>;
}

impl<F> ToolHandler for F
where
    F: Fn(&ToolArguments) -> Result<Value> + Send + Sync,
{
    fn call(&self, arguments: &ToolArguments) -> Result<Value> {
        self(arguments)
    }
}

#[derive(Clone)]
struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<H: ToolHandler + 'static>(
        &mut self,
        descriptor: ToolDescriptor,
        handler: H,
    ) -> Result<()> {
        if self.tools.contains_key(descriptor.name()) {
            return Err(ParleyError::DuplicateTool(descriptor.name().to_string()));
        }
        debug!(tool = descriptor.name(), "registered tool");
        self.tools.insert(
            descriptor.name().to_string(),
            RegisteredTool {
                descriptor,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<(&dyn ToolHandler, &ToolDescriptor)> {
        self.tools
            .get(name)
            .map(|tool| (tool.handler.as_ref(), &tool.descriptor))
            .ok_or_else(|| ParleyError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut descriptors: Vec<&ToolDescriptor> =
            self.tools.values().map(|tool| &tool.descriptor).collect();
        descriptors.sort_by(|a, b| a.name().cmp(b.name()));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn invoke(&self, name: &str, arguments: &ToolArguments) -> Result<Value> {
        let (handler, descriptor) = self.resolve(name)?;
        if let Some(parameter) = descriptor.missing_parameter(arguments) {
            return Err(ParleyError::MissingParameter {
                tool: name.to_string(),
                parameter: parameter.to_string(),
            });
        }
        debug!(tool = name, ?arguments, "invoking tool");
        handler
            .call(arguments)
            .map_err(|source| ParleyError::ToolExecution {
                name: name.to_string(),
                source: Box::new(source),
            })
    }

    pub fn dispatch(&self, call: &ToolCall) -> Result<Value> {
        self.invoke(&call.name, &call.arguments)
    }
}
