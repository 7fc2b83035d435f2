use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::task::{DownloadTask, PostProcessor, TaskSpec};
use super::paths::extension_of;

/// 按扩展名注册的任务构造函数
pub type TaskConstructor = Arc<dyn Fn(TaskSpec) -> DownloadTask + Send + Sync>;

/// 扩展名 -> 任务构造函数的注册表
///
/// 在构造下载管理器时传入；通常启动时一次性填充。
#[derive(Default, Clone)]
pub struct TaskRegistry {
    constructors: Arc<RwLock<HashMap<String, TaskConstructor>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册构造函数；扩展名不区分大小写，可带前导点
    pub fn register<F>(&self, extension: &str, constructor: F)
    where
        F: Fn(TaskSpec) -> DownloadTask + Send + Sync + 'static,
    {
        let key = normalize(extension);
        let mut constructors = self.constructors.write().unwrap_or_else(|e| e.into_inner());
        constructors.insert(key, Arc::new(constructor));
    }

    /// 为扩展名注册下载完成后的后处理
    pub fn register_post_processor(&self, extension: &str, processor: Arc<dyn PostProcessor>) {
        self.register(extension, move |spec: TaskSpec| {
            DownloadTask::spawn(spec.with_post_processor(processor.clone()))
        });
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        let constructors = self.constructors.read().unwrap_or_else(|e| e.into_inner());
        constructors.contains_key(&normalize(extension))
    }

    /// 按文件名的扩展名构造任务，未注册时使用通用任务
    pub fn create(&self, file_name: &str, spec: TaskSpec) -> DownloadTask {
        let constructor = extension_of(file_name).and_then(|ext| {
            let constructors = self.constructors.read().unwrap_or_else(|e| e.into_inner());
            constructors.get(&ext).cloned()
        });
        match constructor {
            Some(constructor) => constructor(spec),
            None => DownloadTask::spawn(spec),
        }
    }
}

fn normalize(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}
