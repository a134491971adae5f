//! 事件配置
//!
use serde::{Deserialize, Serialize};

/// 事件分发配置
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// 连续失败次数不超过该值时，以 error 级别输出完整诊断信息；之后降为 debug
    pub full_trace_failures: usize,
    /// 是否捕获处理器 panic 并按处理器失败处理
    pub catch_panics: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            full_trace_failures: 1,
            catch_panics: true,
        }
    }
}
