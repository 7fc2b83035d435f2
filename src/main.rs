use actix::prelude::*;
use log::{info, warn};
use std::time::Instant;
use tokio::sync::broadcast::{self, error::RecvError};

use mediadown::cli;
use mediadown::core::{DownloadEvent, DownloadManager, DownloadTask, TaskState};
use mediadown::ui::{self, DownloadSummary, ProgressManager};
use mediadown::utils::logger::{init_console_logger, JournalActor, RecordEvent};

const JOURNAL_MAX_SIZE: u64 = 10 * 1024 * 1024;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("参数解析失败: {}", e);
            std::process::exit(1);
        }
    };
    init_console_logger(args.verbose);

    // 获取下载URL列表
    let urls = match args.get_urls() {
        Ok(urls) => urls,
        Err(e) => {
            eprintln!("获取URL列表失败: {}", e);
            std::process::exit(1);
        }
    };

    println!("配置加载成功");
    println!("{}", config.get_summary());
    info!("配置文件路径: {}", args.config);

    let journal = if config.log_file.is_empty() {
        None
    } else {
        Some(JournalActor::new(&config.log_file, JOURNAL_MAX_SIZE)?.start())
    };

    let manager = DownloadManager::with_defaults(config);
    let mut events = manager.subscribe();

    let mut tasks = Vec::new();
    for url in &urls {
        match manager.create_task(url, None) {
            Ok(task) => {
                ui::print_success(&format!("创建下载任务: {}", task.local_path().display()));
                tasks.push(task);
            }
            Err(e) => ui::print_error(&format!("创建下载任务失败: {} - {}", url, e)),
        }
    }
    if tasks.is_empty() {
        eprintln!("没有可下载的任务");
        return Ok(());
    }

    println!("\n开始下载... (按 Ctrl-C 停止，已下载的部分会保留用于续传)");
    let started = Instant::now();
    let progress = ProgressManager::new(tasks.len() as u64);
    manager.queue_downloads(tasks.clone());

    let interrupted = run_event_loop(&tasks, &mut events, &progress, journal.as_ref()).await;
    if interrupted {
        warn!("用户中断下载");
    }
    progress.finish();
    manager.dispose().await?;

    let summary = summarize(&tasks, started);
    println!("{}", summary);
    Ok(())
}

/// 消费下载事件直到全部任务结束或收到 Ctrl-C；返回是否被中断
async fn run_event_loop(
    tasks: &[DownloadTask],
    events: &mut broadcast::Receiver<DownloadEvent>,
    progress: &ProgressManager,
    journal: Option<&Addr<JournalActor>>,
) -> bool {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                progress.println("收到中断信号，正在停止...");
                return true;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(journal) = journal {
                        journal.do_send(RecordEvent(event.clone()));
                    }
                    match &event {
                        DownloadEvent::StatusChanged(status) => {
                            let received = tasks.iter().map(|t| t.bytes_received()).sum();
                            progress.update(status, received);
                        }
                        DownloadEvent::TaskStopped { id, state, error } => {
                            if let Some(task) = tasks.iter().find(|t| t.id() == *id) {
                                progress.println(&stopped_line(task, *state, error.map(|k| format!("{:?}", k))));
                            }
                        }
                        DownloadEvent::TaskStarted { .. } => {}
                    }
                    if tasks.iter().all(|t| t.state().is_terminal()) {
                        return false;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("进度事件积压，跳过 {} 条", skipped),
                Err(RecvError::Closed) => return false,
            }
        }
    }
}

fn stopped_line(task: &DownloadTask, state: TaskState, error: Option<String>) -> String {
    let name = task
        .local_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| task.remote_uri().to_string());
    match (state, error) {
        (TaskState::Succeeded, _) => format!("✓ {} ({})", name, ui::format_size(task.bytes_received())),
        (_, Some(kind)) => format!("✗ {} {:?}: {}", name, state, kind),
        _ => format!("- {} {:?}", name, state),
    }
}

fn summarize(tasks: &[DownloadTask], started: Instant) -> DownloadSummary {
    let mut summary = DownloadSummary {
        total_files: tasks.len(),
        elapsed_time: started.elapsed(),
        ..DownloadSummary::default()
    };
    for task in tasks {
        match task.state() {
            TaskState::Succeeded => {
                summary.success_count += 1;
                summary.total_size += task.bytes_received();
            }
            TaskState::Failed | TaskState::Cancelled => summary.failed_count += 1,
            TaskState::Stopped | TaskState::Paused => summary.interrupted_count += 1,
            TaskState::Ready | TaskState::Running => {}
        }
    }
    summary
}
