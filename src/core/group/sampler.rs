use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// 间隔过短时不计算速率
const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// 吞吐量采样器
///
/// 每个运行中的任务记录一个字节数基线；任务停止时把增量并入本周期累计，
/// 定时采样时把运行中任务的增量也并入，再与上一次的平滑值取平均。
#[derive(Debug)]
pub struct RateSampler {
    baselines: HashMap<Uuid, u64>,
    interval_bytes: u64,
    last_tick: Instant,
    smoothed: Option<f64>,
}

impl RateSampler {
    pub fn new(now: Instant) -> Self {
        Self {
            baselines: HashMap::new(),
            interval_bytes: 0,
            last_tick: now,
            smoothed: None,
        }
    }

    /// 任务打开本地文件、确定起始偏移后记录基线；重新开始时覆盖旧基线
    pub fn track(&mut self, id: Uuid, bytes: u64) {
        self.baselines.insert(id, bytes);
    }

    /// 任务停止时并入最后的增量并移除基线
    pub fn untrack(&mut self, id: Uuid, bytes: u64) {
        if let Some(baseline) = self.baselines.remove(&id) {
            self.interval_bytes += bytes.saturating_sub(baseline);
        }
    }

    /// 计算平滑速率 (B/s)；间隔近似为零时返回 None，不改变状态
    pub fn sample<I>(&mut self, now: Instant, running: I) -> Option<f64>
    where
        I: IntoIterator<Item = (Uuid, u64)>,
    {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed < MIN_ELAPSED {
            return None;
        }

        for (id, bytes) in running {
            // 尚未报告起始偏移的任务不计入
            let Some(baseline) = self.baselines.get_mut(&id) else {
                continue;
            };
            // 重试时字节数会归零，此时只重置基线
            self.interval_bytes += bytes.saturating_sub(*baseline);
            *baseline = bytes;
        }

        let instantaneous = self.interval_bytes as f64 / elapsed.as_secs_f64();
        let smoothed = match self.smoothed {
            Some(previous) => (instantaneous + previous) / 2.0,
            None => instantaneous,
        };
        self.smoothed = Some(smoothed);
        self.interval_bytes = 0;
        self.last_tick = now;
        Some(smoothed)
    }

    /// 没有运行中任务时清空累计与平滑历史
    pub fn reset(&mut self, now: Instant) {
        self.interval_bytes = 0;
        self.smoothed = None;
        self.last_tick = now;
    }

    #[cfg(test)]
    pub fn is_tracking(&self, id: &Uuid) -> bool {
        self.baselines.contains_key(id)
    }
}
