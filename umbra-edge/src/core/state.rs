use std::path::PathBuf;
use std::sync::Arc;

use crate::artifact::{LocalArtifactStore, RemoteLock};
use crate::core::Config;
use crate::core::config::TransportMode;
use crate::core::error::Result;
use crate::db::ReportStorage;
use crate::resend::{DrainSettings, ResendCoordinator};
use crate::sequence::SequenceAllocator;
use crate::sync::AccreditationService;
use crate::transport::{ConfiguredTransports, MemoryTransports, TransportProvider};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | storage | ReportStorage | redb 存储 |
/// | sequence | SequenceAllocator | 序号分配 |
/// | artifacts | LocalArtifactStore | 本地报表文件 |
/// | coordinator | ResendCoordinator | 重发队列 |
/// | service | Arc<AccreditationService> | 报表生成与投递 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: ReportStorage,
    pub sequence: SequenceAllocator,
    pub artifacts: LocalArtifactStore,
    pub coordinator: ResendCoordinator,
    pub service: Arc<AccreditationService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 创建工作目录与报表根目录
    /// 2. 打开 redb 数据库
    /// 3. 按 TRANSPORT_MODE 选择远程传输
    /// 4. 组装各服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.work_dir).await?;
        tokio::fs::create_dir_all(&config.reports_root).await?;

        let storage = ReportStorage::open(config.database_path())?;
        let transports: Arc<dyn TransportProvider> = match config.transport_mode {
            TransportMode::Remote => {
                if config.smb.share_root().is_none() {
                    tracing::error!(
                        host = %config.smb.host,
                        share = %config.smb.share,
                        "SMB share has no usable root (set SMB_MOUNT_ROOT); Ayala deliveries will queue"
                    );
                }
                Arc::new(ConfiguredTransports::new(
                    config.smb.clone(),
                    config.sftp.clone(),
                ))
            }
            TransportMode::Memory => {
                tracing::warn!("TRANSPORT_MODE=memory: remote deliveries stay in process");
                Arc::new(MemoryTransports::default())
            }
        };

        tracing::info!(
            db = %config.database_path().display(),
            reports_root = %config.reports_root.display(),
            terminal = config.store.terminal,
            "Server state initialized"
        );
        Ok(Self::with_parts(config.clone(), storage, transports))
    }

    /// 用现成的存储与传输组装 (测试 / 内存模式)
    pub fn with_parts(
        config: Config,
        storage: ReportStorage,
        transports: Arc<dyn TransportProvider>,
    ) -> Self {
        let sequence = SequenceAllocator::new(storage.clone());
        let artifacts = LocalArtifactStore::new(config.reports_root.clone(), storage.clone());
        let remote_lock = RemoteLock {
            owner: config.instance_id.clone(),
            stale_after: config.resend.remote_lock_stale(),
        };

        let coordinator = ResendCoordinator::new(
            storage.clone(),
            artifacts.clone(),
            transports.clone(),
            DrainSettings {
                owner: config.instance_id.clone(),
                retry_delay: config.resend.retry_delay(),
                connect_timeout: config.resend.connect_timeout(),
                lease_ttl_ms: config.resend.lease_ttl_ms,
                remote_lock: remote_lock.clone(),
            },
        );

        let service = Arc::new(AccreditationService::new(
            storage.clone(),
            sequence.clone(),
            artifacts.clone(),
            transports,
            coordinator.clone(),
            config.store.clone(),
            config.resend.connect_timeout(),
            remote_lock,
        ));

        Self {
            config,
            storage,
            sequence,
            artifacts,
            coordinator,
            service,
        }
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
