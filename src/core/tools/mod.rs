mod ticket;
mod wiki;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use ticket::TicketCreateMany;
pub use wiki::WikiCreatePage;

use crate::core::error::{OpsError, OpsResult};
use crate::core::store::WorkStore;

/// Public description of a capability, handed to the planner as part of the
/// allow-listed catalog. `args_schema` is an example value shape, not a JSON
/// schema, so the model copies values instead of schema keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub args_schema: Value,
}

/// A named unit of work with a durable side effect. Tools never touch request
/// status; only the execution engine transitions the lifecycle.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn spec(&self) -> ToolSpec;
    async fn run(&self, request_id: i64, args: &Value) -> Result<Value>;
}

/// Immutable tool catalog, built once at startup and shared by reference.
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let tools = tools.into_iter().map(|t| (t.name(), t)).collect();
        Self { tools }
    }

    /// The built-in capability set: ticket and wiki creation.
    pub fn builtin(store: WorkStore) -> Self {
        Self::new(vec![
            Arc::new(TicketCreateMany::new(store.clone())),
            Arc::new(WikiCreatePage::new(store)),
        ])
    }

    pub fn get(&self, name: &str) -> OpsResult<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| OpsError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Catalog offered to the planner; also the allow-list for validation.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_registry() -> (tempfile::TempDir, ToolRegistry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = WorkStore::open(dir.path().join("ops.db")).expect("open store");
        (dir, ToolRegistry::builtin(store))
    }

    #[test]
    fn lookup_fails_loudly_on_unknown_names() {
        let (_dir, registry) = scratch_registry();
        assert!(registry.get("ticket.createMany").is_ok());
        match registry.get("shell.exec") {
            Err(OpsError::UnknownTool(name)) => assert_eq!(name, "shell.exec"),
            other => panic!("expected UnknownTool, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn catalog_lists_builtin_specs() {
        let (_dir, registry) = scratch_registry();
        let names: Vec<String> = registry.catalog().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["ticket.createMany", "wiki.createPage"]);
    }
}
