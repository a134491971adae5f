//! 调度器（Scheduler）
//!
//! 宿主提供的并发底座：事件只用它来运行处理器返回的异步续体（不等待其完成）。
//! 事件在构造时捕获调度器句柄，之后不再查找环境中的运行时。
//!
use tokio::runtime::Handle;

use super::handler::Task;
use crate::error::{EventError, EventResult};

/// 运行“发出即不管”的异步任务
pub trait Scheduler: Send + Sync {
    fn spawn(&self, task: Task);
}

impl Scheduler for Handle {
    fn spawn(&self, task: Task) {
        // JoinHandle 直接丢弃：任务独立运行到结束
        drop(Handle::spawn(self, task.into_inner()));
    }
}

/// 捕获当前线程所在的 tokio 运行时
pub(crate) fn current() -> EventResult<Handle> {
    Handle::try_current().map_err(|e| EventError::no_scheduler(e.to_string()))
}
