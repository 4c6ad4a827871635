use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::core::error::{OpsError, OpsResult};
use crate::core::planner::PlanDocument;
use crate::core::request::{AuditAction, RequestStatus, TicketRecord, WikiPageRecord};
use crate::core::store::WorkStore;
use crate::core::tools::ToolRegistry;

/// What an execute call hands back: the artifacts now owned by the request.
#[derive(Debug, Serialize)]
pub struct ExecutionResult {
    pub request_id: i64,
    pub tickets: Vec<TicketRecord>,
    #[serde(rename = "wikiPages")]
    pub wiki_pages: Vec<WikiPageRecord>,
}

/// Runs an approved request's stored plan: steps strictly in order, one TOOL
/// audit entry per step, first failure aborts the rest. Artifacts already
/// created by earlier steps are durable and are not rolled back.
pub struct ExecutionEngine {
    store: WorkStore,
    registry: Arc<ToolRegistry>,
}

impl ExecutionEngine {
    pub fn new(store: WorkStore, registry: Arc<ToolRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn execute(&self, actor: &str, request_id: i64) -> OpsResult<ExecutionResult> {
        let started = Instant::now();

        let request = self.store.find(request_id).await?;
        if RequestStatus::from_status(&request.status) != Some(RequestStatus::Approved) {
            return Err(OpsError::InvalidState {
                status: request.status,
            });
        }

        // Atomic APPROVED -> EXECUTING write. Persisted before any tool runs,
        // so a concurrent execute loses the race here and a crash mid-run
        // leaves the request visibly in progress.
        self.store.mark_executing(request_id).await?;

        let plan_json = request
            .plan_json
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let Some(plan_json) = plan_json else {
            self.fail(actor, request_id, "no stored plan", started).await?;
            return Err(OpsError::MissingPlan);
        };

        match self.run_steps(actor, request_id, plan_json).await {
            Ok(tool_results) => {
                let result_json = serde_json::to_string(&json!({ "toolResults": tool_results }))?;
                self.store.finish(request_id, true, &result_json).await?;
                self.store
                    .audit(
                        request_id,
                        actor,
                        AuditAction::Execute,
                        "done",
                        true,
                        started.elapsed().as_millis() as u64,
                    )
                    .await?;
                info!("Request {} executed to DONE", request_id);

                Ok(ExecutionResult {
                    request_id,
                    tickets: self.store.tickets(request_id).await?,
                    wiki_pages: self.store.wiki_pages(request_id).await?,
                })
            }
            Err(e) => {
                self.fail(actor, request_id, &e.to_string(), started).await?;
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        actor: &str,
        request_id: i64,
        plan_json: &str,
    ) -> OpsResult<Vec<Value>> {
        let doc: PlanDocument = serde_json::from_str(plan_json)
            .map_err(|e| OpsError::MalformedPlan(format!("stored plan unreadable: {e}")))?;

        let mut results = Vec::with_capacity(doc.steps.len());
        for step in &doc.steps {
            let step_started = Instant::now();
            let outcome = match self.registry.get(&step.tool) {
                Ok(tool) => tool
                    .run(request_id, &step.args)
                    .await
                    .map_err(|e| OpsError::ToolFailed(format!("{}: {}", step.tool, e))),
                Err(e) => Err(e),
            };
            let elapsed = step_started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    self.store
                        .audit(
                            request_id,
                            actor,
                            AuditAction::Tool,
                            &format!("{} ok", step.tool),
                            true,
                            elapsed,
                        )
                        .await?;
                    results.push(json!({ "tool": step.tool, "result": result }));
                }
                Err(e) => {
                    // Record the failing step, then abort the remaining ones.
                    self.store
                        .audit(
                            request_id,
                            actor,
                            AuditAction::Tool,
                            &format!("{} fail: {}", step.tool, e),
                            false,
                            elapsed,
                        )
                        .await?;
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    async fn fail(
        &self,
        actor: &str,
        request_id: i64,
        message: &str,
        started: Instant,
    ) -> OpsResult<()> {
        warn!("Request {} execution failed: {}", request_id, message);
        let result_json = serde_json::to_string(&json!({ "error": message }))?;
        self.store.finish(request_id, false, &result_json).await?;
        self.store
            .audit(
                request_id,
                actor,
                AuditAction::Execute,
                &format!("failed: {message}"),
                false,
                started.elapsed().as_millis() as u64,
            )
            .await?;
        Ok(())
    }
}
