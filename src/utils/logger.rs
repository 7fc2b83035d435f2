use chrono::Local; // 用于获取本地时间
use log::LevelFilter; // 用于设置日志级别
use std::io::{self, Write, BufWriter};
use std::fs::{File, OpenOptions};
use std::path::Path;
use actix::prelude::*;

use crate::core::group::DownloadEvent;
use crate::core::task::TaskState;

/// 初始化控制台日志，`RUST_LOG` 优先
pub fn init_console_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

/// 记录一条下载事件
pub struct RecordEvent(pub DownloadEvent);
impl Message for RecordEvent { type Result = (); }

/// 下载事件日志 Actor，超过大小上限时轮转为 `.backup`
pub struct JournalActor {
    writer: BufWriter<File>,
    file_path: String,
    max_size: u64, // 最大文件大小 (bytes)
    current_size: u64,
}

impl JournalActor {
    pub fn new(file_path: &str, max_size: u64) -> io::Result<Self> {
        // 确保日志目录存在
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(file_path)?;
        let current_size = file.metadata()?.len();

        Ok(Self {
            writer: BufWriter::new(file),
            file_path: file_path.to_string(),
            max_size,
            current_size,
        })
    }

    /// 检查并执行日志轮转
    fn check_rotation(&mut self) -> io::Result<()> {
        if self.current_size > self.max_size {
            self.writer.flush()?;

            let backup_path = format!("{}.backup", self.file_path);
            if Path::new(&backup_path).exists() {
                std::fs::remove_file(&backup_path)?;
            }
            std::fs::rename(&self.file_path, &backup_path)?;

            let file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
            self.writer = BufWriter::new(file);
            self.current_size = 0;
        }
        Ok(())
    }

    fn write_entry(&mut self, level: LevelFilter, message: &str) -> io::Result<()> {
        let entry = format!(
            "{} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );
        self.check_rotation()?;
        self.writer.write_all(entry.as_bytes())?;
        self.writer.flush()?;
        self.current_size += entry.len() as u64;
        Ok(())
    }
}

/// 把事件转成日志行；状态变化过于频繁，不记录
fn describe(event: &DownloadEvent) -> Option<(LevelFilter, String)> {
    match event {
        DownloadEvent::TaskStarted { id, remote_uri } => {
            Some((LevelFilter::Info, format!("开始 {} {}", id, remote_uri)))
        }
        DownloadEvent::TaskStopped { id, state, error } => {
            let level = if *state == TaskState::Failed { LevelFilter::Error } else { LevelFilter::Info };
            let message = match error {
                Some(kind) => format!("结束 {} {:?} ({:?})", id, state, kind),
                None => format!("结束 {} {:?}", id, state),
            };
            Some((level, message))
        }
        DownloadEvent::StatusChanged(_) => None,
    }
}

impl Actor for JournalActor {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let _ = self.writer.flush();
    }
}

impl Handler<RecordEvent> for JournalActor {
    type Result = ();
    fn handle(&mut self, msg: RecordEvent, _ctx: &mut Self::Context) {
        if let Some((level, message)) = describe(&msg.0) {
            if let Err(e) = self.write_entry(level, &message) {
                log::error!("事件日志写入失败: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::group::GroupStatus;
    use url::Url;
    use uuid::Uuid;

    #[actix_rt::test]
    async fn test_journal_records_task_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("events.log");
        let path = path.to_str().unwrap();
        let journal = JournalActor::new(path, 1024 * 1024).unwrap().start();

        let id = Uuid::new_v4();
        let remote_uri = Url::parse("https://example.com/ep1.mp3").unwrap();
        journal.send(RecordEvent(DownloadEvent::TaskStarted { id, remote_uri })).await.unwrap();
        journal.send(RecordEvent(DownloadEvent::StatusChanged(GroupStatus::default()))).await.unwrap();
        journal
            .send(RecordEvent(DownloadEvent::TaskStopped {
                id,
                state: TaskState::Failed,
                error: Some(ErrorKind::HttpError),
            }))
            .await
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO]") && lines[0].contains("https://example.com/ep1.mp3"));
        assert!(lines[1].contains("[ERROR]") && lines[1].contains("HttpError"));
    }

    #[actix_rt::test]
    async fn test_journal_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let path = path.to_str().unwrap();
        let journal = JournalActor::new(path, 16).unwrap().start();

        for _ in 0..2 {
            let event = DownloadEvent::TaskStopped { id: Uuid::new_v4(), state: TaskState::Succeeded, error: None };
            journal.send(RecordEvent(event)).await.unwrap();
        }

        let backup = format!("{}.backup", path);
        assert!(Path::new(&backup).exists());
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 1);
        assert_eq!(std::fs::read_to_string(&backup).unwrap().lines().count(), 1);
    }
}
