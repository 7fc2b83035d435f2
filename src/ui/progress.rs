use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::group::GroupStatus;
use super::{format_rate, format_size};

/// 调度组整体进度：完成数 / 总数 + 当前速率
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { bar }
    }

    /// 隐藏的进度条，用于非交互输出
    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    pub fn update(&self, status: &GroupStatus, bytes_received: u64) {
        self.bar.set_position(status.completed as u64);
        self.bar.set_message(status_line(status, bytes_received));
    }

    /// 在进度条上方输出一行，不打断进度条
    pub fn println(&self, line: &str) {
        self.bar.println(line);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// 状态栏文字
pub fn status_line(status: &GroupStatus, bytes_received: u64) -> String {
    format!(
        "运行 {} | 等待 {} | {} | 已接收 {}",
        status.running,
        status.remaining,
        format_rate(status.bytes_per_second),
        format_size(bytes_received)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let status = GroupStatus {
            remaining: 2,
            running: 1,
            completed: 3,
            bytes_per_second: 2048.0,
        };
        assert_eq!(status_line(&status, 1536), "运行 1 | 等待 2 | 2.00 KB/s | 已接收 1.50 KB");
    }

    #[test]
    fn test_hidden_progress_accepts_updates() {
        let progress = ProgressManager::hidden();
        progress.update(&GroupStatus::default(), 0);
        progress.finish();
    }
}
