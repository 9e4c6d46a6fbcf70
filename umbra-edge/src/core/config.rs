use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shared::models::StoreSettings;

/// SMB 共享目录配置 (Ayala)
///
/// 凭据由挂载共享的系统会话持有，这里只记录共享的位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbConfig {
    pub host: String,
    pub share: String,
    /// 已挂载的共享目录；未设置时使用 UNC 路径 `\\host\share` (仅 Windows)
    pub mount_root: Option<PathBuf>,
}

impl SmbConfig {
    /// Usable share root: the mount point, else the UNC path on Windows
    pub fn share_root(&self) -> Option<PathBuf> {
        if let Some(mount) = &self.mount_root {
            return Some(mount.clone());
        }
        if cfg!(windows) && !self.host.is_empty() && !self.share.is_empty() {
            return Some(PathBuf::from(format!(r"\\{}\{}", self.host, self.share)));
        }
        None
    }
}

/// SFTP 服务器配置 (Robinson)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// 远程上传根目录
    pub root_path: String,
}

/// 重发队列配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendConfig {
    /// 部分失败后到下一轮的等待 (毫秒)
    pub retry_delay_ms: u64,
    /// 数据库租约有效期 (毫秒)
    pub lease_ttl_ms: u64,
    /// 远程连接超时 (毫秒)
    pub connect_timeout_ms: u64,
    /// 远程锁文件过期时间 (秒)
    pub remote_lock_stale_secs: u64,
    /// 定时扫描未发送记录的间隔 (秒)，0 表示关闭
    pub sweep_interval_secs: u64,
}

impl ResendConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn remote_lock_stale(&self) -> Duration {
        Duration::from_secs(self.remote_lock_stale_secs)
    }
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 30_000,
            lease_ttl_ms: 120_000,
            connect_timeout_ms: 10_000,
            remote_lock_stale_secs: 300,
            sweep_interval_secs: 600,
        }
    }
}

/// 远程传输模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// 真实 SMB / SFTP
    Remote,
    /// 进程内存储，不触网 (本地演练)
    Memory,
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "memory" | "dry-run" => Ok(Self::Memory),
            other => Err(format!("unknown transport mode: {other}")),
        }
    }
}

/// 服务配置 - 边缘节点的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./umbra-data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | INSTANCE_ID | hostname-terminal | 本实例标识 (租约 / 锁文件持有者) |
/// | REPORTS_ROOT | ~/Documents/UMBRA_POS_REPORTS | 本地报表根目录 |
/// | STORE_CODE | STORE01 | 门店编码 |
/// | TENANT_NAME | UMBRA POS | 商户名称 |
/// | TERMINAL_NO | 1 | 本机终端号 |
/// | AYALA_CONTRACT_NO | (空) | Ayala 合同号 |
/// | AYALA_COMPANY_CODE | (空) | Ayala 公司编码 |
/// | ROBINSON_TENANT_CODE | (空) | Robinson 租户编码 |
/// | SMB_HOST / SMB_SHARE | (空) | SMB 共享地址 (Windows UNC) |
/// | SMB_MOUNT_ROOT | (无) | 已挂载的共享目录 (非 Windows 必填) |
/// | SFTP_HOST / SFTP_PORT | (空) / 22 | SFTP 服务器 |
/// | SFTP_USERNAME / SFTP_PASSWORD | (空) | SFTP 凭据 |
/// | SFTP_ROOT | / | SFTP 上传目录 |
/// | TRANSPORT_MODE | remote | remote \| memory |
/// | RESEND_RETRY_DELAY_MS | 30000 | 重发间隔 |
/// | RESEND_LEASE_TTL_MS | 120000 | 重发租约有效期 |
/// | REMOTE_CONNECT_TIMEOUT_MS | 10000 | 远程连接超时 |
/// | REMOTE_LOCK_STALE_SECS | 300 | 远程锁过期时间 |
/// | RESEND_SWEEP_INTERVAL_SECS | 600 | 定时扫描间隔 (0 关闭) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志文件目录 |
///
/// # 示例
///
/// ```ignore
/// REPORTS_ROOT=/data/reports TERMINAL_NO=2 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 本实例标识
    pub instance_id: String,
    /// 本地报表根目录
    pub reports_root: PathBuf,
    /// 门店静态配置
    pub store: StoreSettings,
    pub smb: SmbConfig,
    pub sftp: SftpConfig,
    pub transport_mode: TransportMode,
    pub resend: ResendConfig,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `~/Documents/UMBRA_POS_REPORTS`
fn default_reports_root() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join("Documents").join("UMBRA_POS_REPORTS")
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let terminal: u16 = env_parse("TERMINAL_NO", 1);
        let store = StoreSettings {
            store_code: env_or("STORE_CODE", "STORE01"),
            tenant_name: env_or("TENANT_NAME", "UMBRA POS"),
            terminal,
            contract_number: env_or("AYALA_CONTRACT_NO", ""),
            company_code: env_or("AYALA_COMPANY_CODE", ""),
            robinson_tenant_code: env_or("ROBINSON_TENANT_CODE", ""),
        };

        let instance_id = std::env::var("INSTANCE_ID").unwrap_or_else(|_| {
            let host = std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("COMPUTERNAME"))
                .unwrap_or_else(|_| "edge".to_string());
            format!("{host}-{terminal:03}")
        });

        let defaults = ResendConfig::default();

        Self {
            work_dir: env_or("WORK_DIR", "./umbra-data"),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: env_or("ENVIRONMENT", "development"),
            instance_id,
            reports_root: std::env::var("REPORTS_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_reports_root()),
            store,
            smb: SmbConfig {
                host: env_or("SMB_HOST", ""),
                share: env_or("SMB_SHARE", ""),
                mount_root: std::env::var("SMB_MOUNT_ROOT").ok().map(PathBuf::from),
            },
            sftp: SftpConfig {
                host: env_or("SFTP_HOST", ""),
                port: env_parse("SFTP_PORT", 22),
                username: env_or("SFTP_USERNAME", ""),
                password: env_or("SFTP_PASSWORD", ""),
                root_path: env_or("SFTP_ROOT", "/"),
            },
            transport_mode: env_parse("TRANSPORT_MODE", TransportMode::Remote),
            resend: ResendConfig {
                retry_delay_ms: env_parse("RESEND_RETRY_DELAY_MS", defaults.retry_delay_ms),
                lease_ttl_ms: env_parse("RESEND_LEASE_TTL_MS", defaults.lease_ttl_ms),
                connect_timeout_ms: env_parse(
                    "REMOTE_CONNECT_TIMEOUT_MS",
                    defaults.connect_timeout_ms,
                ),
                remote_lock_stale_secs: env_parse(
                    "REMOTE_LOCK_STALE_SECS",
                    defaults.remote_lock_stale_secs,
                ),
                sweep_interval_secs: env_parse(
                    "RESEND_SWEEP_INTERVAL_SECS",
                    defaults.sweep_interval_secs,
                ),
            },
            log_level: env_or("LOG_LEVEL", "info"),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 测试用配置：内存传输，报表写到 `reports_root`
    pub fn for_testing(reports_root: impl Into<PathBuf>, store: StoreSettings) -> Self {
        let work_dir = reports_root.into();
        Self {
            work_dir: work_dir.display().to_string(),
            http_port: 0,
            environment: "test".into(),
            instance_id: format!("test-{:03}", store.terminal),
            reports_root: work_dir,
            store,
            smb: SmbConfig {
                host: String::new(),
                share: String::new(),
                mount_root: None,
            },
            sftp: SftpConfig {
                host: String::new(),
                port: 22,
                username: String::new(),
                password: String::new(),
                root_path: "/".into(),
            },
            transport_mode: TransportMode::Memory,
            resend: ResendConfig {
                retry_delay_ms: 20,
                ..ResendConfig::default()
            },
            log_level: "debug".into(),
            log_dir: None,
        }
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("reports.redb")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
