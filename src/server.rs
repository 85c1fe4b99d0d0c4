//! MCP surface of the goal engine.
//!
//! Every transport shares one [`ServerState`]. Mutating tools hold the store lock
//! across the mutation and the write-through save, so concurrent callers are
//! serialized and a caller never observes a state that is not yet on disk.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cli::ServerArgs;
use crate::date::today_key;
use crate::error::{GoalError, ServiceError, ServiceResult};
use crate::metadata::{PKG_DESCRIPTION, PKG_VERSION};
use crate::storage::Storage;
use crate::store::GoalStore;
use crate::tools::health::{HealthParams, health_summary};
use crate::types::DailyLogInput;

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalArgs {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<f64>,
    /// YYYY-MM-DD; defaults to today
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SettleDayArgs {
    pub energy: f64,
    pub progress: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Transports {
    pub stdio: bool,
    pub http: Option<String>,
}

impl Transports {
    pub fn active_endpoints(&self) -> Vec<String> {
        let mut endpoints = Vec::new();
        if self.stdio {
            endpoints.push("stdio".to_string());
        }
        if let Some(addr) = &self.http {
            endpoints.push(format!("http://{addr}/mcp"));
        }
        endpoints
    }
}

pub struct ServerState {
    pub store: Mutex<GoalStore>,
    pub storage: Storage,
    pub transports: Transports,
    pub version: &'static str,
    started_at: Instant,
}

impl ServerState {
    pub fn new(store: GoalStore, storage: Storage, transports: Transports) -> Self {
        Self {
            store: Mutex::new(store),
            storage,
            transports,
            version: PKG_VERSION,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Run `f` against the store and persist the result before releasing the lock.
    /// If the save fails the store is rolled back, so an error means nothing changed.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut GoalStore) -> T) -> ServiceResult<T> {
        let mut store = self.store.lock().await;
        let before = store.clone();
        let out = f(&mut *store);
        if let Err(e) = self.storage.save_async(store.snapshot()).await {
            tracing::warn!("failed to persist goal store, rolling back: {e}");
            *store = before;
            return Err(e.into());
        }
        Ok(out)
    }
}

pub fn rejection(err: GoalError) -> Value {
    json!({ "ok": false, "reason": err.to_string(), "code": err.code() })
}

pub fn create_goal_response(store: &mut GoalStore, args: CreateGoalArgs) -> Value {
    match store.create_goal(&args.title, args.total_days, args.start_date) {
        Ok(goal) => json!({ "ok": true, "goal": goal }),
        Err(err) => rejection(err),
    }
}

pub fn add_daily_log_response(store: &mut GoalStore, input: DailyLogInput) -> Value {
    let outcome = store.add_daily_log(input);
    json!({ "result": outcome, "activeGoal": store.active_goal() })
}

pub fn update_goal_response(store: &mut GoalStore, args: UpdateGoalArgs) -> Value {
    let updated = store.update_goal(args.title.as_deref(), args.total_days);
    json!({ "updated": updated, "activeGoal": store.active_goal() })
}

pub fn state_response(store: &GoalStore) -> Value {
    json!({
        "hasHydrated": store.has_hydrated(),
        "activeGoal": store.active_goal(),
        "archivedGoals": store.archived_goals(),
        "stabilityScore": store.stability_score(),
    })
}

pub fn summary_response(store: &GoalStore, today: &str) -> Value {
    json!({ "hasHydrated": store.has_hydrated(), "summary": store.summary(today) })
}

fn respond(value: Value) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn persist_failed(err: ServiceError) -> ErrorData {
    ErrorData::internal_error(format!("Failed to persist goal store: {err}"), None)
}

#[derive(Clone)]
pub struct GoalServer {
    state: Arc<ServerState>,
    pub tool_router: ToolRouter<GoalServer>,
}

#[tool_router]
impl GoalServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Start a new goal. Fails if the title is blank or a goal is already active")]
    async fn create_goal(
        &self,
        Parameters(args): Parameters<CreateGoalArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self
            .state
            .mutate(|store| create_goal_response(store, args))
            .await
            .map_err(persist_failed)?;
        respond(value)
    }

    #[tool(description = "Record or replace the log for a day on the active goal")]
    async fn add_daily_log(
        &self,
        Parameters(input): Parameters<DailyLogInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self
            .state
            .mutate(|store| add_daily_log_response(store, input))
            .await
            .map_err(persist_failed)?;
        respond(value)
    }

    #[tool(description = "Quick end-of-day entry from an energy level and a 0-100 progress value")]
    async fn settle_day(
        &self,
        Parameters(args): Parameters<SettleDayArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self
            .state
            .mutate(|store| {
                let outcome = store.settle_day(args.energy, args.progress);
                json!({ "result": outcome, "activeGoal": store.active_goal() })
            })
            .await
            .map_err(persist_failed)?;
        respond(value)
    }

    #[tool(description = "Edit the active goal's title or duration")]
    async fn update_goal(
        &self,
        Parameters(args): Parameters<UpdateGoalArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let value = self
            .state
            .mutate(|store| update_goal_response(store, args))
            .await
            .map_err(persist_failed)?;
        respond(value)
    }

    #[tool(description = "Mark the active goal completed and archive it")]
    async fn complete_goal(&self) -> Result<CallToolResult, ErrorData> {
        let archived = self
            .state
            .mutate(|store| store.complete_active_goal())
            .await
            .map_err(persist_failed)?;
        respond(json!({ "archived": archived }))
    }

    #[tool(description = "Mark the active goal abandoned and archive it")]
    async fn abandon_goal(&self) -> Result<CallToolResult, ErrorData> {
        let archived = self
            .state
            .mutate(|store| store.abandon_active_goal())
            .await
            .map_err(persist_failed)?;
        respond(json!({ "archived": archived }))
    }

    #[tool(description = "Erase the active goal and the whole archive")]
    async fn clear_store(&self) -> Result<CallToolResult, ErrorData> {
        self.state
            .mutate(|store| store.clear_store())
            .await
            .map_err(persist_failed)?;
        respond(json!({ "ok": true }))
    }

    #[tool(description = "Current store contents and whether persisted state has loaded")]
    async fn get_state(&self) -> Result<CallToolResult, ErrorData> {
        let store = self.state.store.lock().await;
        respond(state_response(&store))
    }

    #[tool(description = "Derived metrics for the active goal: completion, stability, phase")]
    async fn goal_summary(&self) -> Result<CallToolResult, ErrorData> {
        let store = self.state.store.lock().await;
        respond(summary_response(&store, &today_key()))
    }

    #[tool(description = "Server health")]
    async fn health(
        &self,
        Parameters(params): Parameters<HealthParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let store = self.state.store.lock().await;
        let text = health_summary(&self.state, &store, params.verbose);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for GoalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "{PKG_DESCRIPTION}. One goal is active at a time; log energy and output daily."
            )),
            ..Default::default()
        }
    }
}

/// Serve the enabled transports until stdio closes or ctrl-c arrives.
pub async fn start_server(args: ServerArgs, state: Arc<ServerState>) -> ServiceResult<()> {
    args.validate().map_err(ServiceError::Config)?;
    let shutdown = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    if args.enable_stdio {
        let service = GoalServer::new(state.clone())
            .serve(stdio())
            .await
            .map_err(|e| ServiceError::FromString(format!("Stdio server error: {e}")))?;
        let token = shutdown.clone();
        tasks.spawn(async move {
            tokio::select! {
                _ = service.waiting() => tracing::info!("stdio session closed"),
                _ = token.cancelled() => {}
            }
        });
    }

    if args.enable_http {
        let addr: SocketAddr = args
            .http_addr
            .parse()
            .map_err(|e| ServiceError::Config(format!("Invalid YOH_HTTP_ADDR: {e}")))?;
        let http_state = state.clone();
        let http_service = TowerToHyperService::new(StreamableHttpService::new(
            move || Ok(GoalServer::new(http_state.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        ));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("streamable HTTP listening on http://{}/mcp", listener.local_addr()?);
        let token = shutdown.clone();
        tasks.spawn(async move {
            loop {
                let stream = tokio::select! {
                    _ = token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(e) => {
                            tracing::warn!("HTTP accept error: {e}");
                            continue;
                        }
                    },
                };
                let io = TokioIo::new(stream);
                let service = http_service.clone();
                tokio::spawn(async move {
                    let _ = Builder::new(TokioExecutor::default())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
        _ = tasks.join_next() => {}
    }
    shutdown.cancel();
    while tasks.join_next().await.is_some() {}
    Ok(())
}
