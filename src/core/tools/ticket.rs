use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use super::{Tool, ToolSpec};
use crate::core::store::WorkStore;

const DEFAULT_COUNT: u64 = 3;
const DEFAULT_TITLE: &str = "Work ticket";
const DEFAULT_PREFIX: &str = "Ops task";
const DEFAULT_DESC: &str = "Task details";

/// Creates tickets for a request, either from an explicit item list or by
/// generating `count` numbered tickets from a title prefix.
pub struct TicketCreateMany {
    store: WorkStore,
}

impl TicketCreateMany {
    pub fn new(store: WorkStore) -> Self {
        Self { store }
    }

    async fn create_items(&self, request_id: i64, items: &[Value]) -> Result<u64> {
        let mut created = 0u64;
        for item in items {
            let Some(obj) = item.as_object() else {
                continue;
            };
            let title = obj
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_TITLE);
            let desc = obj.get("desc").and_then(Value::as_str).unwrap_or("");
            self.store.insert_ticket(request_id, title, desc).await?;
            created += 1;
        }
        Ok(created)
    }

    async fn create_numbered(&self, request_id: i64, args: &Value) -> Result<u64> {
        let count = args
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_COUNT);
        let prefix = args
            .get("titlePrefix")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PREFIX);
        let desc = args
            .get("desc")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DESC);

        // Numbering continues after tickets from earlier steps of the same
        // request instead of restarting at #1.
        let base = self.store.tickets(request_id).await?.len() as u64;
        for i in 1..=count {
            let n = base + i;
            self.store
                .insert_ticket(
                    request_id,
                    &format!("{prefix} #{n}"),
                    &format!("{desc} (step {n})"),
                )
                .await?;
        }
        Ok(count)
    }
}

#[async_trait]
impl Tool for TicketCreateMany {
    fn name(&self) -> &'static str {
        "ticket.createMany"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: "Creates multiple tickets. Write args in one of two forms.\n\
                A) items form (distinct tickets): {\"items\":[{\"title\":\"...\",\"desc\":\"...\"}, ...]}\n\
                B) count form (N similar tickets): {\"count\":5,\"titlePrefix\":\"...\",\"desc\":\"...\"}\n\
                Never put schema keywords like type/properties/required into args."
                .to_string(),
            args_schema: json!({
                "mode": "string (items | count) - optional",
                "items": [{
                    "title": "string (e.g. Deployment incident - root cause analysis)",
                    "desc": "string (e.g. Collect logs, metrics and reproduction steps)"
                }],
                "count": "number (e.g. 5)",
                "titlePrefix": "string (e.g. Weekly safety check)",
                "desc": "string (e.g. Verify checklist item)"
            }),
        }
    }

    async fn run(&self, request_id: i64, args: &Value) -> Result<Value> {
        let created = match args.get("items").and_then(Value::as_array) {
            Some(items) if !items.is_empty() => self.create_items(request_id, items).await?,
            _ => self.create_numbered(request_id, args).await?,
        };
        info!("Created {} tickets for request {}", created, request_id);
        Ok(json!({ "created": created }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch() -> (tempfile::TempDir, WorkStore, TicketCreateMany, i64) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = WorkStore::open(dir.path().join("ops.db")).expect("open store");
        let id = store.create("alice", "T", "x").await.expect("create");
        let tool = TicketCreateMany::new(store.clone());
        (dir, store, tool, id)
    }

    #[tokio::test]
    async fn numbered_mode_is_additive_across_calls() {
        let (_dir, store, tool, id) = scratch().await;

        let r = tool
            .run(id, &json!({"count": 5, "titlePrefix": "P", "desc": "D"}))
            .await
            .unwrap();
        assert_eq!(r["created"], 5);

        let r = tool
            .run(id, &json!({"count": 2, "titlePrefix": "P", "desc": "D"}))
            .await
            .unwrap();
        assert_eq!(r["created"], 2);

        let titles: Vec<String> = store
            .tickets(id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["P #1", "P #2", "P #3", "P #4", "P #5", "P #6", "P #7"]);
    }

    #[tokio::test]
    async fn items_mode_creates_one_ticket_per_object() {
        let (_dir, store, tool, id) = scratch().await;

        let r = tool
            .run(
                id,
                &json!({"items": [
                    {"title": "A", "desc": "first"},
                    {"desc": "no title"},
                    "not-an-object",
                    {"title": "B"}
                ]}),
            )
            .await
            .unwrap();
        assert_eq!(r["created"], 3);

        let tickets = store.tickets(id).await.unwrap();
        assert_eq!(tickets[0].title, "A");
        assert_eq!(tickets[1].title, "Work ticket");
        assert_eq!(tickets[2].title, "B");
        assert_eq!(tickets[2].description, "");
    }

    #[tokio::test]
    async fn missing_args_fall_back_to_defaults() {
        let (_dir, store, tool, id) = scratch().await;
        let r = tool.run(id, &json!({})).await.unwrap();
        assert_eq!(r["created"], 3);
        let tickets = store.tickets(id).await.unwrap();
        assert_eq!(tickets[0].title, "Ops task #1");
        assert_eq!(tickets[0].description, "Task details (step 1)");
    }
}
