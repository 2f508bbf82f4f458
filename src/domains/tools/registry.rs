//! Tool Registry - the in-memory index of invocable tools.
//!
//! Entries are immutable `Arc<LoadedTool>` slots. Registering an identifier
//! again swaps the slot, so a reader either gets the old tool or the new one,
//! never a mix of handler and schema from different versions. A call that
//! already holds the old `Arc` finishes on the old handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rmcp::model::Tool;
use tracing::info;

use super::handlers::ToolHandler;
use super::schema::ToolSchema;

/// The invocable form of a tool.
pub struct LoadedTool {
    pub id: String,
    pub description: String,
    pub schema: ToolSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl LoadedTool {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            schema,
            handler,
        }
    }

    /// Tool metadata as advertised to MCP clients.
    pub fn to_tool(&self) -> Tool {
        Tool::new(
            self.id.clone(),
            self.description.clone(),
            self.schema.to_json_schema(),
        )
    }
}

impl fmt::Debug for LoadedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedTool")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slots {
    next_seq: u64,
    entries: HashMap<String, (u64, Arc<LoadedTool>)>,
}

/// Tool registry - manages all currently invocable tools.
#[derive(Default)]
pub struct ToolRegistry {
    slots: RwLock<Slots>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool, replacing any entry with the same identifier.
    ///
    /// Returns the replaced entry. A replaced entry moves to the end of the
    /// listing order.
    pub fn register(&self, tool: LoadedTool) -> Option<Arc<LoadedTool>> {
        let id = tool.id.clone();
        let mut slots = self.slots.write();
        let seq = slots.next_seq;
        slots.next_seq += 1;
        let previous = slots.entries.insert(id.clone(), (seq, Arc::new(tool)));
        drop(slots);

        if previous.is_some() {
            info!("Replaced tool: {}", id);
        } else {
            info!("Registered tool: {}", id);
        }
        previous.map(|(_, tool)| tool)
    }

    /// Remove a tool. Removing an unknown identifier is a no-op.
    pub fn unregister(&self, id: &str) -> Option<Arc<LoadedTool>> {
        let removed = self.slots.write().entries.remove(id).map(|(_, tool)| tool);
        if removed.is_some() {
            info!("Unregistered tool: {}", id);
        }
        removed
    }

    /// Look up a tool by identifier.
    pub fn get(&self, id: &str) -> Option<Arc<LoadedTool>> {
        self.slots.read().entries.get(id).map(|(_, tool)| tool.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.read().entries.contains_key(id)
    }

    /// All tools in registration order.
    pub fn list(&self) -> Vec<Arc<LoadedTool>> {
        let slots = self.slots.read();
        let mut entries: Vec<_> = slots.entries.values().cloned().collect();
        drop(slots);
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, tool)| tool).collect()
    }

    /// Get all tools as Tool models (metadata).
    pub fn tools(&self) -> Vec<Tool> {
        self.list().iter().map(|tool| tool.to_tool()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domains::tools::error::ToolError;
    use async_trait::async_trait;
    use rmcp::model::{CallToolResult, Content};
    use serde_json::{Map, Value};

    /// Handler answering with a fixed text.
    pub(crate) struct FixedHandler(pub &'static str);

    #[async_trait]
    impl ToolHandler for FixedHandler {
        async fn call(
            &self,
            _tool_id: &str,
            _arguments: Map<String, Value>,
        ) -> Result<CallToolResult, ToolError> {
            Ok(CallToolResult::success(vec![Content::text(self.0)]))
        }
    }

    pub(crate) fn fixed_tool(id: &str, answer: &'static str) -> LoadedTool {
        LoadedTool::new(id, answer, ToolSchema::unchecked(), Arc::new(FixedHandler(answer)))
    }

    async fn answer(registry: &ToolRegistry, id: &str) -> String {
        let tool = registry.get(id).unwrap();
        let result = tool.handler.call(id, Map::new()).await.unwrap();
        result.content[0].as_text().unwrap().text.clone()
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new();
        assert!(registry.register(fixed_tool("calc", "v1")).is_none());
        assert!(registry.contains("calc"));
        assert_eq!(registry.get("calc").unwrap().description, "v1");
        assert!(registry.get("other").is_none());
    }

    #[tokio::test]
    async fn test_second_registration_replaces_first() {
        let registry = ToolRegistry::new();
        registry.register(fixed_tool("calc", "v1"));
        let previous = registry.register(fixed_tool("calc", "v2")).unwrap();

        assert_eq!(previous.description, "v1");
        assert_eq!(registry.len(), 1);
        assert_eq!(answer(&registry, "calc").await, "v2");
    }

    #[tokio::test]
    async fn test_held_entry_survives_replacement() {
        let registry = ToolRegistry::new();
        registry.register(fixed_tool("calc", "v1"));
        let held = registry.get("calc").unwrap();

        registry.register(fixed_tool("calc", "v2"));

        let result = held.handler.call("calc", Map::new()).await.unwrap();
        assert_eq!(result.content[0].as_text().unwrap().text, "v1");
        assert_eq!(answer(&registry, "calc").await, "v2");
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ToolRegistry::new();
        registry.register(fixed_tool("calc", "v1"));
        assert!(registry.unregister("calc").is_some());
        assert!(registry.unregister("calc").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_in_registration_order() {
        let registry = ToolRegistry::new();
        registry.register(fixed_tool("b", "1"));
        registry.register(fixed_tool("a", "2"));
        registry.register(fixed_tool("c", "3"));
        registry.register(fixed_tool("b", "4"));

        let ids: Vec<_> = registry.list().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_tools_metadata() {
        let registry = ToolRegistry::new();
        registry.register(fixed_tool("calc", "Calculates"));
        let tools = registry.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "calc");
        assert_eq!(tools[0].input_schema.get("type"), Some(&serde_json::json!("object")));
    }
}
