//! Umbra Edge - 商场认证报表同步节点
//!
//! # 架构概述
//!
//! 每台收银终端运行一个 Edge 节点。日结 (Z-read) 完成后，节点把快照整理成
//! 商场要求的认证文件，先写本地，再合并到商场共享的远程目录：
//!
//! - **Ayala** (SMB): Z-read / 小时 / 日结 CSV + "new requirements" 宽表
//! - **Robinson** (SFTP): 30 行定宽批次文件
//!
//! 多台终端写同一个远程文件，每台只追加自己的那一份 (按终端号幂等)。
//! 远程失败的投递落入重发队列，由单实例 worker 反复清空。
//!
//! # 模块结构
//!
//! ```text
//! umbra-edge/src/
//! ├── core/          # 配置、状态、后台任务、HTTP 服务
//! ├── db/            # redb 存储 (快照、账本、投递记录、租约)
//! ├── sequence/      # 小时段序号与批次号分配
//! ├── report/        # 报表构建 (纯函数)
//! ├── artifact/      # 本地文件写入与幂等合并
//! ├── transport/     # SMB / SFTP / 内存远程客户端
//! ├── resend/        # 重发队列协调器
//! ├── sync/          # 生成 → 写本地 → 推远程 编排
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod artifact;
pub mod core;
pub mod db;
pub mod report;
pub mod resend;
pub mod sequence;
pub mod sync;
pub mod transport;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use db::ReportStorage;
pub use resend::ResendCoordinator;
pub use sequence::SequenceAllocator;
pub use sync::{AccreditationService, GenerationReport};

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 加载 `.env`、准备日志目录并初始化日志
pub fn setup_environment() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)?;
    }

    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  __  __           __
 / / / /___ ___  / /_  _________ _
/ / / / __ `__ \/ __ \/ ___/ __ `/
/ /_/ / / / / / / /_/ / /  / /_/ /
\____/_/ /_/ /_/_.___/_/   \__,_/
    ______    __
   / ____/___/ /___ ____
  / __/ / __  / __ `/ _ \
 / /___/ /_/ / /_/ /  __/
/_____/\__,_/\__, /\___/
            /____/
    "#
    );
}
