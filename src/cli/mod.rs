//! CLI: 命令行接口和参数解析模块
//!
//! ## 主要功能
//!
//! - 命令行参数解析和验证
//! - 配置文件路径管理
//! - URL 列表处理（命令行参数和文件）
//! - 配置文件编辑器集成
//!
//! ## 支持的命令
//!
//! - 基本下载：`mediadown <url>`
//! - 批量下载：`mediadown -f feed.txt`
//! - 编辑配置：`mediadown -e`
//! - 指定配置：`mediadown -c config.conf <url>`
//! - 并发数：`mediadown -j 5 <url>`

use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;
use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/mediadown/mediadown.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/mediadown/mediadown.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/mediadown/mediadown.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// 版本号附带构建时间
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (构建于 ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    ")"
);

/// MediaDown 命令行参数
///
/// 示例用法：
///   mediadown https://example.com/ep1.mp3
///   mediadown -e  # 编辑配置文件
///   mediadown -j 4 -f feed.txt
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mediadown",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about = "一个用 Rust 编写的可续传并发媒体下载器",
    long_about = "有界并发调度、断点续传、实时速率显示的媒体文件下载器。\n\
    同一 URL 总是下载到同一个临时文件，中断后再次运行即可续传。\n\n示例：\n  mediadown https://example.com/ep1.mp3\n  mediadown -e\n  mediadown -j 4 -f feed.txt\n"
)]
pub struct Args {
    /// 要下载的URL列表（可同时指定多个）
    #[arg(required = false, help = "要下载的URL列表，可以同时指定多个URL。")]
    pub urls: Vec<String>,

    /// 包含URL列表的文件路径
    #[arg(short, long, help = "包含URL列表的文件路径，每行一个URL，# 开头为注释。")]
    pub file: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 临时下载根目录
    #[arg(long, short = 'd', help = "临时下载根目录，覆盖配置文件中的设置。")]
    pub temp_root: Option<String>,

    /// 最大并发下载数
    #[arg(long, short = 'j', help = "最大并发下载数，覆盖配置文件中的设置。")]
    pub concurrency: Option<usize>,

    /// 输出调试日志
    #[arg(long, short = 'v', help = "在控制台输出调试日志。")]
    pub verbose: bool,
}

impl Args {
    /// 解析命令行参数并加载、合并、校验配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, Config), DownloadError> {
        if args.edit_config {
            // 先确保文件存在再打开编辑器
            Config::load(&args.config)?;
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        let mut config = Config::load(&args.config)?;
        config.merge_from_args(&args);
        if let Some(concurrency) = args.concurrency {
            validator::validate_concurrency(concurrency)
                .map_err(|e| DownloadError::InvalidConfig(e.to_string()))?;
        }
        config.validate()?;

        Ok((args, config))
    }

    /// 合并命令行和文件中的URL，校验后返回
    pub fn get_urls(&self) -> Result<Vec<String>, DownloadError> {
        let mut urls = Vec::new();
        urls.extend_from_slice(&self.urls);

        if let Some(file_path) = &self.file {
            if !Path::new(file_path).exists() {
                return Err(DownloadError::InvalidConfig(format!("URL文件不存在: {}", file_path)));
            }
            let content = fs::read_to_string(file_path)?;

            // 按行读取URL，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    urls.push(line.to_string());
                }
            }
        }

        validator::validate_urls(&urls).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        Ok(urls)
    }
}
