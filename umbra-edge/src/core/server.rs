//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::time::Duration;

use crate::api;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// 注册后台任务：启动时清一次队列，之后定时扫描
    fn start_background_tasks(state: &ServerState) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let coordinator = state.coordinator.clone();
        tasks.spawn("resend_warmup", TaskKind::Warmup, async move {
            if coordinator.trigger() {
                tracing::info!("Startup drain of pending deliveries started");
            }
        });

        let interval_secs = state.config.resend.sweep_interval_secs;
        if interval_secs > 0 {
            let coordinator = state.coordinator.clone();
            let shutdown = tasks.shutdown_token();
            tasks.spawn("resend_sweep", TaskKind::Periodic, async move {
                let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
                interval.tick().await; // skip immediate tick
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = interval.tick() => {
                            coordinator.trigger();
                        }
                    }
                }
            });
        }

        tasks.log_summary();
        tasks
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        let tasks = Self::start_background_tasks(&state);
        let app = api::build_app(state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Umbra Edge listening on {}", addr);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        tasks.shutdown().await;
        state.coordinator.shutdown().await;
        served?;
        Ok(())
    }
}
