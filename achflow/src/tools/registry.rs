//! Tool trait and the per-stage tool set.

use super::{ToolCall, ToolDefinition, ToolResult};
use crate::errors::ToolError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Trait for tool implementations.
///
/// A tool takes a single string argument and returns a string. Failures are
/// reported as [`ToolError`]s and abort the invoking stage.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> &ToolDefinition;

    /// Returns the tool's name.
    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Invokes the tool.
    async fn invoke(&self, argument: &str) -> Result<String, ToolError>;
}

/// An ordered set of uniquely named tools.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, rejecting duplicate names.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::Duplicate {
                name: tool.name().to_string(),
            });
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`ToolSet::register`].
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Returns the definitions, in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition().clone()).collect()
    }

    /// Returns the tool names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Executes a single call against the matching tool.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::not_found(&call.name))?;
        tracing::debug!(tool = %call.name, call_id = %call.id, "Invoking tool");
        let output = tool.invoke(&call.argument).await?;
        Ok(ToolResult::for_call(call, output))
    }
}

impl Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

/// A simple function-based tool.
pub struct FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    definition: ToolDefinition,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    /// Creates a new function-based tool.
    pub fn new(definition: ToolDefinition, func: F) -> Self {
        Self { definition, func }
    }
}

impl<F> Debug for FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.name)
            .finish()
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, argument: &str) -> Result<String, ToolError> {
        (self.func)(argument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Arc<dyn Tool> {
        Arc::new(FnTool::new(ToolDefinition::new("echo", "Echoes"), |arg| {
            Ok(arg.to_uppercase())
        }))
    }

    #[test]
    fn test_empty_set() {
        let set = ToolSet::new();
        assert!(set.is_empty());
        assert!(set.definitions().is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = ToolSet::new();
        set.register(echo()).unwrap();
        let err = set.register(echo()).unwrap_err();
        assert!(matches!(err, ToolError::Duplicate { ref name } if name == "echo"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_order_preserved() {
        let other: Arc<dyn Tool> = Arc::new(FnTool::new(ToolDefinition::new("other", ""), |_| {
            Ok(String::new())
        }));
        let set = ToolSet::new().with_tool(other).unwrap().with_tool(echo()).unwrap();
        assert_eq!(set.names(), vec!["other", "echo"]);
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let set = ToolSet::new().with_tool(echo()).unwrap();
        let result = set.execute(&ToolCall::new("c1", "echo", "hi")).await.unwrap();
        assert_eq!(result.output, "HI");
        assert_eq!(result.call_id, "c1");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let set = ToolSet::new();
        let err = set.execute(&ToolCall::new("c1", "missing", "")).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
