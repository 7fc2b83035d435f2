use actix::prelude::*;
use log::{debug, info};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use crate::core::task::{DownloadTask, TaskEvent, TaskState};
use super::messages::*;
use super::sampler::RateSampler;
use super::status::{DownloadEvent, StatusAggregator};

const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// 调度组 Actor：有界并发执行器 + 吞吐量采样
///
/// 邮箱串行化了对任务集合、运行集合和计数的所有修改。
pub struct DownloadGroupActor {
    tasks: Vec<DownloadTask>,
    /// 已派发且尚未收到落定通知的任务；数量不超过 max_concurrent
    running: HashMap<Uuid, DownloadTask>,
    max_concurrent: usize,
    sample_interval: Duration,
    sampler: RateSampler,
    status: StatusAggregator,
    events: broadcast::Sender<DownloadEvent>,
    started: bool,
    timer: Option<SpawnHandle>,
    drain_waiters: Vec<oneshot::Sender<()>>,
}

impl Actor for DownloadGroupActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Context<Self>) {
        self.attach_all(&self.tasks, ctx);
        self.refresh_counts();
    }
}

impl DownloadGroupActor {
    pub fn new(
        tasks: Vec<DownloadTask>,
        max_concurrent: usize,
        sample_interval: Duration,
        events: broadcast::Sender<DownloadEvent>,
    ) -> Self {
        Self {
            tasks,
            running: HashMap::new(),
            max_concurrent: max_concurrent.max(1),
            sample_interval: sample_interval.max(MIN_SAMPLE_INTERVAL),
            sampler: RateSampler::new(Instant::now()),
            status: StatusAggregator::new(events.clone()),
            events,
            started: false,
            timer: None,
            drain_waiters: Vec::new(),
        }
    }

    fn attach_all(&self, tasks: &[DownloadTask], ctx: &mut Context<Self>) {
        let observer = ctx.address().recipient::<TaskEvent>();
        for task in tasks {
            task.attach(observer.clone());
        }
    }

    /// 调度一步：按集合顺序启动就绪任务，直到运行数达到上限
    fn execute(&mut self) {
        if self.started {
            for task in &self.tasks {
                if self.running.len() >= self.max_concurrent {
                    break;
                }
                if self.running.contains_key(&task.id()) || task.state() != TaskState::Ready {
                    continue;
                }
                self.running.insert(task.id(), task.clone());
                debug!("派发任务: {} ({}/{})", task.remote_uri(), self.running.len(), self.max_concurrent);
                task.start();
                let _ = self.events.send(DownloadEvent::TaskStarted {
                    id: task.id(),
                    remote_uri: task.remote_uri().clone(),
                });
            }
        }
        self.refresh_counts();
    }

    fn refresh_counts(&mut self) {
        let mut remaining = 0;
        let mut completed = 0;
        for task in &self.tasks {
            if self.running.contains_key(&task.id()) {
                continue;
            }
            match task.state() {
                state if state.is_terminal() => completed += 1,
                TaskState::Running => {}
                _ => remaining += 1,
            }
        }
        self.status.set_counts(remaining, self.running.len(), completed);
    }

    /// 任务离开运行集合：并入最后的增量，空闲时速率归零并唤醒等待者
    fn release(&mut self, id: Uuid, bytes_received: u64) {
        if self.running.remove(&id).is_none() {
            return;
        }
        self.sampler.untrack(id, bytes_received);
        if self.running.is_empty() {
            self.sampler.reset(Instant::now());
            self.status.set_transfer_rate(0.0);
            for waiter in self.drain_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    fn sample_rate(&mut self) {
        if self.running.is_empty() {
            self.sampler.reset(Instant::now());
            self.status.set_transfer_rate(0.0);
            return;
        }
        let running = self.running.values().map(|task| (task.id(), task.bytes_received()));
        if let Some(rate) = self.sampler.sample(Instant::now(), running) {
            self.status.set_transfer_rate(rate);
        }
    }
}

impl Handler<StartGroup> for DownloadGroupActor {
    type Result = ();
    fn handle(&mut self, _msg: StartGroup, ctx: &mut Context<Self>) {
        if self.started {
            return;
        }
        self.started = true;
        self.sampler.reset(Instant::now());
        self.timer = Some(ctx.run_interval(self.sample_interval, |act, _ctx| act.sample_rate()));
        info!("调度组已启动 (并发上限 {})", self.max_concurrent);
        self.execute();
    }
}

impl Handler<StopGroup> for DownloadGroupActor {
    type Result = ResponseFuture<()>;
    fn handle(&mut self, msg: StopGroup, ctx: &mut Context<Self>) -> Self::Result {
        self.started = false;
        if let Some(timer) = self.timer.take() {
            ctx.cancel_future(timer);
        }
        if msg.stop_running {
            for task in self.running.values() {
                task.stop();
            }
        }
        info!("调度组已停止，在途任务 {} 个", self.running.len());

        let (tx, rx) = oneshot::channel();
        if self.running.is_empty() {
            let _ = tx.send(());
        } else {
            self.drain_waiters.push(tx);
        }
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

impl Handler<AddTasks> for DownloadGroupActor {
    type Result = ();
    fn handle(&mut self, msg: AddTasks, ctx: &mut Context<Self>) {
        let fresh: Vec<DownloadTask> = msg
            .0
            .into_iter()
            .filter(|task| !self.tasks.contains(task))
            .collect();
        self.attach_all(&fresh, ctx);
        self.tasks.extend(fresh);
        self.execute();
    }
}

impl Handler<RemoveTasks> for DownloadGroupActor {
    type Result = ();
    fn handle(&mut self, msg: RemoveTasks, _ctx: &mut Context<Self>) {
        self.tasks.retain(|task| !msg.0.contains(task));
        self.refresh_counts();
    }
}

impl Handler<ReplaceTasks> for DownloadGroupActor {
    type Result = ();
    fn handle(&mut self, msg: ReplaceTasks, ctx: &mut Context<Self>) {
        self.attach_all(&msg.0, ctx);
        self.tasks = msg.0;
        self.status.reset();
        self.execute();
    }
}

impl Handler<Execute> for DownloadGroupActor {
    type Result = ();
    fn handle(&mut self, _msg: Execute, _ctx: &mut Context<Self>) {
        self.execute();
    }
}

impl Handler<QueryStatus> for DownloadGroupActor {
    type Result = MessageResult<QueryStatus>;
    fn handle(&mut self, _msg: QueryStatus, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.status.status())
    }
}

impl Handler<ListTasks> for DownloadGroupActor {
    type Result = MessageResult<ListTasks>;
    fn handle(&mut self, _msg: ListTasks, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.tasks.clone())
    }
}

impl Handler<TaskEvent> for DownloadGroupActor {
    type Result = ();
    fn handle(&mut self, msg: TaskEvent, _ctx: &mut Context<Self>) {
        match msg {
            TaskEvent::Started { id, bytes_received } => {
                if self.running.contains_key(&id) {
                    self.sampler.track(id, bytes_received);
                }
                return;
            }
            TaskEvent::Stopped { id, state, bytes_received, error } => {
                debug!("任务落定: {} -> {:?}", id, state);
                self.release(id, bytes_received);
                let _ = self.events.send(DownloadEvent::TaskStopped { id, state, error });
            }
            TaskEvent::Declined { id } => {
                let bytes = self.running.get(&id).map(|task| task.bytes_received()).unwrap_or(0);
                self.release(id, bytes);
            }
            TaskEvent::Resumed { .. } => {}
        }
        self.execute();
    }
}
