use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};

use super::{PlanRequest, PlannerClient};
use crate::core::error::OpsResult;

const DEFAULT_COUNT: u64 = 5;
const MAX_COUNT: u64 = 50;

/// Deterministic fallback planner used when no AI service is configured.
/// Reads a ticket count out of the request text and always proposes the same
/// two-step plan: create tickets, then write a summary page.
pub struct BuiltinPlanner {
    count_re: Regex,
}

impl BuiltinPlanner {
    pub fn new() -> Self {
        Self {
            count_re: Regex::new(r"(\d+)\s*(?:items?|tickets?|tasks?)").expect("static regex"),
        }
    }

    fn extract_count(&self, text: &str) -> u64 {
        self.count_re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .map(|v| v.clamp(1, MAX_COUNT))
            .unwrap_or(DEFAULT_COUNT)
    }
}

impl Default for BuiltinPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlannerClient for BuiltinPlanner {
    async fn create_plan(&self, payload: &PlanRequest) -> OpsResult<Value> {
        let count = self.extract_count(&payload.input_text);
        let body = format!(
            "Request summary:\n- {}\n\nGenerated work:\n- {} checklist tickets\n- this summary page\n\nCaution:\n- no execution before approval\n- unverified content requires follow-up\n",
            payload.input_text, count
        );

        Ok(json!({
            "plan": {
                "goal": payload.title,
                "steps": [
                    {
                        "id": 1,
                        "tool": "ticket.createMany",
                        "args": {
                            "count": count,
                            "titlePrefix": payload.title,
                            "desc": "Checklist item derived from the request"
                        }
                    },
                    {
                        "id": 2,
                        "tool": "wiki.createPage",
                        "args": { "title": format!("{} summary", payload.title), "body": body }
                    }
                ],
                "riskNotes": [
                    "No execution before approval",
                    "Generated content needs human review"
                ]
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_extraction_clamps_and_defaults() {
        let p = BuiltinPlanner::new();
        assert_eq!(p.extract_count("create 10 tickets for the audit"), 10);
        assert_eq!(p.extract_count("fix 3 items today"), 3);
        assert_eq!(p.extract_count("create 999 tasks"), 50);
        assert_eq!(p.extract_count("just clean things up"), 5);
    }

    #[tokio::test]
    async fn builtin_plan_uses_both_tools() {
        let p = BuiltinPlanner::new();
        let payload = PlanRequest {
            request_id: 1,
            requester: "alice".into(),
            title: "Audit fix".into(),
            input_text: "fix 10 items".into(),
            tools: Vec::new(),
            top_k: 4,
        };
        let res = p.create_plan(&payload).await.unwrap();
        let steps = res["plan"]["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["tool"], "ticket.createMany");
        assert_eq!(steps[0]["args"]["count"], 10);
        assert_eq!(steps[1]["tool"], "wiki.createPage");
    }
}
