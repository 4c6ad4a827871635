use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use opsagent::core::config::AgentConfig;
use opsagent::core::executor::ExecutionEngine;
use opsagent::core::planner::{PlannerClient, builtin::BuiltinPlanner, http::HttpPlannerClient};
use opsagent::core::planning::PlanningCoordinator;
use opsagent::core::store::WorkStore;
use opsagent::core::tools::ToolRegistry;
use opsagent::interfaces::web::{ApiServer, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    opsagent::logging::init();

    let config = AgentConfig::from_env();
    let store = WorkStore::open(&config.db_path)?;
    let registry = Arc::new(ToolRegistry::builtin(store.clone()));

    let planner: Arc<dyn PlannerClient> = match &config.ai_service_base_url {
        Some(url) => {
            info!("Using planning service at {}", url);
            Arc::new(HttpPlannerClient::new(url)?)
        }
        None => {
            info!("AI_SERVICE_BASE_URL not set, using builtin planner");
            Arc::new(BuiltinPlanner::new())
        }
    };

    let planning = Arc::new(PlanningCoordinator::new(
        store.clone(),
        registry.clone(),
        planner,
    ));
    let executor = Arc::new(ExecutionEngine::new(store.clone(), registry));

    let state = AppState {
        store,
        planning,
        executor,
    };
    ApiServer::new(state, config.api_host.clone(), config.api_port)
        .serve()
        .await
}
