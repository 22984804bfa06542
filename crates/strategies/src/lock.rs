//! 基于文件的咨询锁
//!
//! 同一策略的多个进程共享一个锁路径。锁文件以 create_new 原子创建，
//! 内容记录持有者 pid、获取时间与本次获取的唯一标识。

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use utils::TARGET_STRATEGY;

static ACQUISITIONS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }

    /// 尝试获取锁，已被占用时返回 None
    pub fn try_acquire(&self) -> std::io::Result<Option<LockGuard>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        };

        let token = format!(
            "pid={} seq={} acquired_at={}",
            std::process::id(),
            ACQUISITIONS.fetch_add(1, Ordering::Relaxed),
            Utc::now().to_rfc3339()
        );
        if let Err(e) = file.write_all(token.as_bytes()).and_then(|_| file.sync_all()) {
            let _ = fs::remove_file(&self.path);
            return Err(e);
        }

        debug!(target: TARGET_STRATEGY, "🔒 获取锁 {} ({})", self.path.display(), token);
        Ok(Some(LockGuard {
            path: self.path.clone(),
            token,
        }))
    }

    /// 无条件删除锁文件 (不存在时忽略)
    pub fn force_release(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(target: TARGET_STRATEGY, "🔓 强制释放锁 {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// 持有锁期间存在，drop 时释放
///
/// 只删除自己创建的锁文件；若锁已被强制释放并被他人重新获取则不动
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    token: String,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(content) if content == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    if e.kind() != ErrorKind::NotFound {
                        warn!(target: TARGET_STRATEGY, "释放锁 {} 失败: {}", self.path.display(), e);
                    }
                } else {
                    debug!(target: TARGET_STRATEGY, "🔓 释放锁 {}", self.path.display());
                }
            }
            Ok(_) => debug!(target: TARGET_STRATEGY, "锁 {} 已被其他持有者占用，跳过释放", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(target: TARGET_STRATEGY, "读取锁 {} 失败: {}", self.path.display(), e),
        }
    }
}
