pub mod builtin;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::OpsResult;
use crate::core::tools::ToolSpec;

/// Body POSTed to the planning service. Field names are that service's wire
/// contract, so they stay as-is rather than following Rust naming.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub request_id: i64,
    pub requester: String,
    pub title: String,
    #[serde(rename = "inputText")]
    pub input_text: String,
    pub tools: Vec<ToolSpec>,
    pub top_k: u32,
}

/// A validated plan: ordered tool invocations plus a goal and optional risk
/// notes. Step order is execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default)]
    pub goal: String,
    pub steps: Vec<PlanStep>,
    #[serde(rename = "riskNotes", default, skip_serializing_if = "Option::is_none")]
    pub risk_notes: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub tool: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Seam to the external planner. The coordinator only depends on this trait;
/// tests substitute a stub.
#[async_trait]
pub trait PlannerClient: Send + Sync {
    /// Returns the planner's raw response object. The caller extracts and
    /// validates its `plan` field.
    async fn create_plan(&self, payload: &PlanRequest) -> OpsResult<Value>;
}
