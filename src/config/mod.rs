use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::core::error::DownloadError;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 临时下载根目录，每个 URL 在其下占用一个子目录
    pub temp_root: String,
    /// 最大并发下载数
    pub max_concurrent_downloads: usize,
    /// 速率采样间隔（毫秒）
    pub sample_interval_ms: u64,
    /// 网络超时时间（秒）
    pub timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 最多跟随的重定向次数
    pub max_redirects: u8,
    /// 写文件缓冲区大小（字节）
    pub write_buffer_size: usize,
    /// 事件日志文件，空字符串表示不记录
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("mediadown").display().to_string(),
            max_concurrent_downloads: 3,
            sample_interval_ms: 1500,
            timeout: 30,
            user_agent: format!("MediaDown/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            write_buffer_size: 256 * 1024,
            log_file: String::new(),
        }
    }
}

impl Config {
    /// 加载配置文件，不存在时写入带说明的默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("配置文件格式错误: {}，将使用默认配置", e);
                    Ok(Config::default())
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Unknown(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    /// 生成配置文件教程内容（静态方法）
    fn generate_tutorial_content() -> String {
        r#"# MediaDown 配置文件
# ====================
#
# 这是一个 TOML 格式的配置文件，文件末尾是当前生效的配置项。
#
# 配置文件位置：
# - Windows: %APPDATA%/mediadown/mediadown.conf
# - macOS: ~/Library/Application Support/mediadown/mediadown.conf
# - Linux: ~/.config/mediadown/mediadown.conf
#
# 命令行参数会覆盖配置文件中的设置，优先级：命令行 > 配置文件 > 默认值
#
# 使用示例：
#   mediadown https://example.com/ep1.mp3                 # 使用默认配置
#   mediadown -j 5 -f feed.txt                             # 5 个并发任务下载列表中的文件
#   mediadown -d /path/to/tmp https://example.com/ep1.mp3  # 指定临时根目录

# ==================== 配置项说明 ====================
#
# temp_root
#   临时下载根目录。文件保存为 <temp_root>/<URL 的 SHA-256>/<文件名>，
#   同一 URL 再次下载时会从已有的部分文件续传。
#
# max_concurrent_downloads
#   同时进行的下载任务数。建议值：1-5
#
# sample_interval_ms
#   下载速率采样间隔（毫秒），默认 1500
#
# timeout
#   单次请求超时（秒）
#
# user_agent
#   请求使用的 User-Agent 字符串
#
# max_redirects
#   最多跟随的重定向次数
#
# write_buffer_size
#   写文件缓冲区大小（字节）。暂停或停止时缓冲区会落盘。
#
# log_file
#   下载事件日志文件路径，留空表示不记录
#
# ==================== 故障排除 ====================
#
# 问题：续传总是从头开始
# 解决：服务器可能不支持 Range 请求，或者远端文件已经被修改
#
# 问题：经常超时
# 解决：增大 timeout 或减小 max_concurrent_downloads
"#
        .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_concurrent_downloads == 0 {
            return Err(DownloadError::InvalidConfig("并发下载数必须大于0".to_string()));
        }
        if self.sample_interval_ms == 0 {
            return Err(DownloadError::InvalidConfig("采样间隔必须大于0".to_string()));
        }
        if self.timeout == 0 {
            return Err(DownloadError::InvalidConfig("超时时间必须大于0".to_string()));
        }
        if self.temp_root.trim().is_empty() {
            return Err(DownloadError::InvalidConfig("临时目录不能为空".to_string()));
        }
        if self.write_buffer_size == 0 {
            return Err(DownloadError::InvalidConfig("写缓冲区大小必须大于0".to_string()));
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(temp_root) = &args.temp_root {
            self.temp_root = temp_root.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.max_concurrent_downloads = concurrency;
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 临时目录: {}\n\
            - 并发数: {}\n\
            - 采样间隔: {} 毫秒\n\
            - 超时时间: {} 秒\n\
            - 最大重定向: {}\n\
            - 事件日志: {}",
            self.temp_root,
            self.max_concurrent_downloads,
            self.sample_interval_ms,
            self.timeout,
            self.max_redirects,
            if self.log_file.is_empty() { "不记录" } else { self.log_file.as_str() }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.sample_interval_ms, 1500);
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.starts_with("MediaDown/"));
        assert!(config.log_file.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.max_concurrent_downloads = 0;
        assert!(matches!(config.validate(), Err(DownloadError::InvalidConfig(_))));

        config = Config::default();
        config.temp_root = "  ".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.sample_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediadown.conf");
        let path = path.to_str().unwrap();

        let config = Config {
            max_concurrent_downloads: 5,
            log_file: "events.log".to_string(),
            ..Config::default()
        };
        config.save_with_tutorial(path).expect("保存带教程的配置失败");
        let loaded = Config::load(path).expect("加载配置失败");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mediadown.conf");
        let path = path.to_str().unwrap();

        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("MediaDown 配置文件"));
        assert!(content.contains("故障排除"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.conf");
        fs::write(&path, "max_concurrent_downloads = 7\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.max_concurrent_downloads, 7);
        assert_eq!(config.sample_interval_ms, 1500);
    }

    #[test]
    fn test_config_summary() {
        let summary = Config::default().get_summary();
        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("临时目录"));
        assert!(summary.contains("不记录"));
    }
}
