use anyhow::Context;
use umbra_edge::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment().context("failed to set up environment")?;

    print_banner();
    tracing::info!("Umbra Edge starting...");

    // 2. 加载配置
    let config = Config::from_env();
    tracing::info!(
        store_code = %config.store.store_code,
        terminal = config.store.terminal,
        environment = %config.environment,
        transport = ?config.transport_mode,
        "Configuration loaded"
    );

    // 3. 初始化服务器状态
    let state = ServerState::initialize(&config)
        .await
        .context("failed to initialize server state")?;

    // 4. 启动 HTTP 服务器 (Server::run 会自动启动后台任务)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
