mod handlers;
mod router;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::core::executor::ExecutionEngine;
use crate::core::planning::PlanningCoordinator;
use crate::core::store::WorkStore;

#[derive(Clone)]
pub struct AppState {
    pub store: WorkStore,
    pub planning: Arc<PlanningCoordinator>,
    pub executor: Arc<ExecutionEngine>,
}

pub struct ApiServer {
    state: AppState,
    api_host: String,
    api_port: u16,
}

impl ApiServer {
    pub fn new(state: AppState, api_host: String, api_port: u16) -> Self {
        Self {
            state,
            api_host,
            api_port,
        }
    }

    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.api_host, self.api_port);
        let app = router::build_api_router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API server running at http://{addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}
