use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::core::error::{OpsError, OpsResult};
use crate::core::planner::{PlanDocument, PlanRequest, PlannerClient};
use crate::core::request::AuditAction;
use crate::core::store::WorkStore;
use crate::core::tools::{ToolRegistry, ToolSpec};

/// Result-size hint forwarded to the planner's retrieval step.
const PLANNER_TOP_K: u32 = 4;

/// Structural validation of a candidate plan against the allow-listed
/// catalog. Argument values are deliberately not schema-checked; argument
/// shape problems surface when the tool runs.
pub fn validate_plan(plan: &Value, allowed: &[ToolSpec]) -> OpsResult<PlanDocument> {
    if !plan.get("steps").is_some_and(Value::is_array) {
        return Err(OpsError::MalformedPlan("plan has no steps array".to_string()));
    }

    let doc: PlanDocument = serde_json::from_value(plan.clone())
        .map_err(|e| OpsError::MalformedPlan(e.to_string()))?;

    if doc.steps.is_empty() {
        return Err(OpsError::MalformedPlan(
            "plan must contain at least one step".to_string(),
        ));
    }

    for (idx, step) in doc.steps.iter().enumerate() {
        if step.tool.trim().is_empty() {
            return Err(OpsError::MalformedPlan(format!(
                "step {} has no tool",
                idx + 1
            )));
        }
        if !allowed.iter().any(|t| t.name == step.tool) {
            return Err(OpsError::MalformedPlan(format!(
                "tool not allowed: {}",
                step.tool
            )));
        }
    }

    Ok(doc)
}

/// Drives a request from DRAFT to PLANNED: asks the external planner for a
/// plan over the allow-listed catalog, validates it, persists it.
pub struct PlanningCoordinator {
    store: WorkStore,
    registry: Arc<ToolRegistry>,
    planner: Arc<dyn PlannerClient>,
}

impl PlanningCoordinator {
    pub fn new(
        store: WorkStore,
        registry: Arc<ToolRegistry>,
        planner: Arc<dyn PlannerClient>,
    ) -> Self {
        Self {
            store,
            registry,
            planner,
        }
    }

    pub async fn plan(&self, actor: &str, request_id: i64) -> OpsResult<String> {
        let started = Instant::now();
        match self.plan_inner(actor, request_id).await {
            Ok(plan_json) => {
                self.store
                    .audit(
                        request_id,
                        actor,
                        AuditAction::Plan,
                        "plan created",
                        true,
                        started.elapsed().as_millis() as u64,
                    )
                    .await?;
                info!("Plan stored for request {}", request_id);
                Ok(plan_json)
            }
            Err(OpsError::NotFound) => Err(OpsError::NotFound),
            Err(e) => {
                warn!("Planning failed for request {}: {}", request_id, e);
                self.store
                    .audit(
                        request_id,
                        actor,
                        AuditAction::Plan,
                        &format!("plan failed: {e}"),
                        false,
                        started.elapsed().as_millis() as u64,
                    )
                    .await?;
                Err(e)
            }
        }
    }

    async fn plan_inner(&self, actor: &str, request_id: i64) -> OpsResult<String> {
        let request = self.store.find(request_id).await?;
        let catalog = self.registry.catalog();

        let payload = PlanRequest {
            request_id,
            requester: actor.to_string(),
            title: request.title,
            input_text: request.input_text,
            tools: catalog.clone(),
            top_k: PLANNER_TOP_K,
        };

        let response = self.planner.create_plan(&payload).await?;
        let plan_node = match response.get("plan") {
            Some(node) if !node.is_null() => node,
            _ => {
                return Err(OpsError::UpstreamInvalid(
                    "response has no plan field".to_string(),
                ));
            }
        };

        let doc = validate_plan(plan_node, &catalog)?;
        let plan_json = serde_json::to_string(&doc)?;

        // Persisting is the DRAFT -> PLANNED transition; an invalid plan never
        // gets this far, so nothing partial is ever stored.
        self.store.save_plan(request_id, &plan_json).await?;
        Ok(plan_json)
    }
}
