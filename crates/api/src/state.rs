use dashmap::DashMap;
use services::Database;
use std::sync::Arc;
use strategies::{EngineControl, EngineSnapshot, EngineState};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<EngineRegistry>,
    /// 未配置数据库时为 None
    pub database: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(engines: Arc<EngineRegistry>, database: Option<Arc<Database>>) -> Self {
        Self { engines, database }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Spawned,
    /// 引擎不是 Idle，未重复启动
    AlreadyActive(EngineState),
}

/// 按名称管理引擎及其后台任务
#[derive(Default)]
pub struct EngineRegistry {
    engines: Vec<Arc<dyn EngineControl>>,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, engine: Arc<dyn EngineControl>) -> Self {
        self.engines.push(engine);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EngineControl>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn snapshots(&self) -> Vec<EngineSnapshot> {
        self.engines.iter().map(|e| e.snapshot()).collect()
    }

    pub fn running_count(&self) -> usize {
        self.engines
            .iter()
            .filter(|e| e.state() == EngineState::Running)
            .count()
    }

    /// 在后台任务中启动引擎；未知名称返回 None
    pub fn spawn_start(&self, name: &str) -> Option<StartOutcome> {
        let engine = self.get(name)?;
        let state = engine.state();
        if state != EngineState::Idle {
            return Some(StartOutcome::AlreadyActive(state));
        }

        let engine_name = engine.name().to_string();
        let task_name = engine_name.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = engine.start().await {
                error!("❌ 引擎 {} 启动失败: {}", task_name, e);
            }
        });

        info!("▶️ 引擎 {} 已在后台启动", engine_name);
        self.tasks.insert(engine_name, handle);
        Some(StartOutcome::Spawned)
    }

    /// 请求停止；未知名称返回 false
    pub fn stop(&self, name: &str) -> bool {
        match self.get(name) {
            Some(engine) => {
                engine.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        for engine in &self.engines {
            engine.stop();
        }
    }

    /// 等待所有后台任务退出 (需先 stop_all)
    pub async fn join_all(&self) {
        let names: Vec<String> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        for name in names {
            if let Some((_, handle)) = self.tasks.remove(&name) {
                if let Err(e) = handle.await {
                    error!("引擎 {} 任务异常退出: {}", name, e);
                }
            }
        }
    }
}
