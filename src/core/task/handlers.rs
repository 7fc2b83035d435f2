use actix::{Context, Handler};
use log::{debug, info};

use super::actor::{DownloadTaskActor, StopIntent};
use super::messages::*;
use super::state::TaskState;

impl Handler<StartTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: StartTask, ctx: &mut Context<Self>) {
        let state = self.shared.state();
        if state != TaskState::Ready {
            debug!("任务不是就绪态 ({:?})，忽略启动请求: {}", state, self.remote_uri);
            self.notify(TaskEvent::Declined { id: self.id });
            return;
        }
        self.begin(ctx);
    }
}

impl Handler<PauseTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: PauseTask, _ctx: &mut Context<Self>) {
        self.request_halt(StopIntent::Pause);
    }
}

impl Handler<ResumeTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: ResumeTask, _ctx: &mut Context<Self>) {
        if self.shared.state() != TaskState::Paused {
            return;
        }
        self.shared.update(|info| info.state = TaskState::Ready);
        info!("任务已恢复为就绪: {}", self.remote_uri);
        self.notify(TaskEvent::Resumed { id: self.id });
    }
}

impl Handler<StopTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: StopTask, _ctx: &mut Context<Self>) {
        self.request_halt(StopIntent::Stop);
    }
}

impl Handler<CancelTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: CancelTask, _ctx: &mut Context<Self>) {
        self.request_halt(StopIntent::Cancel);
    }
}

impl Handler<AttachObserver> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, msg: AttachObserver, _ctx: &mut Context<Self>) {
        self.set_observer(msg.0);
    }
}
