use serde::{Deserialize, Serialize};

/// 自动重试的触发原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// 服务器返回 416，删除本地文件后完整重下
    RangeNotSatisfiable,
    /// 远端资源比本地部分文件新
    ModifiedSinceLocalCopy,
}

/// 重试策略：每种原因允许的自动重试次数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_range_retries: u32,
    pub max_modified_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_range_retries: 1,
            max_modified_retries: 1,
        }
    }
}

/// 重试上下文，随任务生命周期累计
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    pub policy: RetryPolicy,
    pub range_retries: u32,
    pub modified_retries: u32,
}

impl RetryContext {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            range_retries: 0,
            modified_retries: 0,
        }
    }

    /// 预算未耗尽时记录一次重试并返回 true
    pub fn try_retry(&mut self, reason: RetryReason) -> bool {
        let (used, max) = match reason {
            RetryReason::RangeNotSatisfiable => (&mut self.range_retries, self.policy.max_range_retries),
            RetryReason::ModifiedSinceLocalCopy => (&mut self.modified_retries, self.policy.max_modified_retries),
        };
        if *used >= max {
            return false;
        }
        *used += 1;
        true
    }
}
