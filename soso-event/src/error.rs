//! 统一错误定义
//!
//! 只有两类错误会传播给调用方：构造时缺少调度器、分发前的参数校验失败；
//! 处理器失败（`HandlerFailure`）在分发内部被记录并吞掉，不会向外传播。
//!
use std::any::Any;
use std::fmt::{Debug, Display};

use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    #[error("no scheduler available: {reason}")]
    NoScheduler { reason: String },

    #[error("argument validation failed: event={event}, reason={source}")]
    Validation {
        event: String,
        #[source]
        source: ValidationError,
    },

    #[error("event closed before emission: event={event}")]
    Closed { event: String },
}

impl EventError {
    pub fn no_scheduler(reason: impl Into<String>) -> Self {
        Self::NoScheduler {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;

/// 参数校验失败（由 `ArgsValidator` 产生）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// 处理器失败：一行摘要 + 完整诊断信息
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerFailure {
    message: String,
    detail: String,
}

impl HandlerFailure {
    /// 由处理器返回的错误构造；`Debug` 输出作为诊断信息（anyhow 会附带错误链）
    pub fn from_error<E: Display + Debug>(err: E) -> Self {
        Self {
            message: err.to_string(),
            detail: format!("{err:?}"),
        }
    }

    /// 由 panic 载荷构造
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            detail: format!("handler panicked: {message}"),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}
