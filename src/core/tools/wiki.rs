use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use super::{Tool, ToolSpec};
use crate::core::store::WorkStore;

const DEFAULT_TITLE: &str = "Ops summary";

/// Creates one wiki page for a request. When no body is supplied the page is
/// synthesized from the tickets created so far.
pub struct WikiCreatePage {
    store: WorkStore,
}

impl WikiCreatePage {
    pub fn new(store: WorkStore) -> Self {
        Self { store }
    }

    async fn synthesize_body(&self, request_id: i64) -> Result<String> {
        let tickets = self.store.tickets(request_id).await?;
        let ticket_lines = if tickets.is_empty() {
            "- (none)".to_string()
        } else {
            tickets
                .iter()
                .map(|t| format!("- {}", t.title))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(format!(
            "## Summary\n\
             - Work proceeds from the tickets generated for this request.\n\n\
             ## Work tickets\n\
             {ticket_lines}\n\n\
             ## Rollback / cautions\n\
             - Changes only run after approval\n\
             - No deployment sign-off before verification completes\n"
        ))
    }
}

#[async_trait]
impl Tool for WikiCreatePage {
    fn name(&self) -> &'static str {
        "wiki.createPage"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: "Creates a wiki page. args must contain plain values only, \
                shaped as {\"title\":\"...\",\"body\":\"...\"}. Never put schema keywords \
                like type/properties/required into args. The body should cover change \
                background, impact and rollback steps."
                .to_string(),
            args_schema: json!({
                "title": "string (e.g. Deployment incident - follow-up notes)",
                "body": "string (e.g. Background, impact and rollback procedure)"
            }),
        }
    }

    async fn run(&self, request_id: i64, args: &Value) -> Result<Value> {
        let title = args
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TITLE);

        let supplied = args
            .get("body")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        let body = if supplied.is_empty() {
            self.synthesize_body(request_id).await?
        } else {
            supplied.to_string()
        };

        self.store.insert_wiki(request_id, title, &body).await?;
        info!("Created wiki page '{}' for request {}", title, request_id);
        Ok(json!({ "created": 1, "title": title }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch() -> (tempfile::TempDir, WorkStore, WikiCreatePage, i64) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = WorkStore::open(dir.path().join("ops.db")).expect("open store");
        let id = store.create("alice", "T", "x").await.expect("create");
        let tool = WikiCreatePage::new(store.clone());
        (dir, store, tool, id)
    }

    #[tokio::test]
    async fn blank_body_synthesizes_from_ticket_titles() {
        let (_dir, store, tool, id) = scratch().await;
        store.insert_ticket(id, "A", "").await.unwrap();
        store.insert_ticket(id, "B", "").await.unwrap();

        let r = tool.run(id, &json!({"title": "Notes", "body": "  "})).await.unwrap();
        assert_eq!(r["created"], 1);
        assert_eq!(r["title"], "Notes");

        let pages = store.wiki_pages(id).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].body.contains("- A"));
        assert!(pages[0].body.contains("- B"));
        assert!(pages[0].body.contains("## Rollback / cautions"));
    }

    #[tokio::test]
    async fn synthesized_body_marks_absent_tickets() {
        let (_dir, store, tool, id) = scratch().await;
        tool.run(id, &json!({})).await.unwrap();
        let pages = store.wiki_pages(id).await.unwrap();
        assert!(pages[0].body.contains("- (none)"));
        assert_eq!(pages[0].title, "Ops summary");
    }

    #[tokio::test]
    async fn supplied_body_is_stored_verbatim() {
        let (_dir, store, tool, id) = scratch().await;
        store.insert_ticket(id, "A", "").await.unwrap();
        tool.run(id, &json!({"title": "Notes", "body": "custom text"}))
            .await
            .unwrap();
        let pages = store.wiki_pages(id).await.unwrap();
        assert_eq!(pages[0].body, "custom text");
        assert!(!pages[0].body.contains("- A"));
    }
}
