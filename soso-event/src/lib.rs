//! 轻量的发布/订阅原语（soso-event）
//!
//! 核心是 `Event` 与 `SubscriptionToken` 这一对：
//! - 连接处理器得到令牌，令牌的所有克隆被丢弃即自动退订；
//! - 发射时按 STORE → PROCESS 的分组顺序同步调用处理器快照，重入发射被忽略；
//! - 处理器失败被隔离并记录（连续失败时降低日志级别），不会影响调用方；
//! - 处理器可以返回 `Task`，由事件绑定的调度器独立运行；
//! - 事件本身可以被 `await`，得到下一次发射的参数。
//!
//! 典型用法：
//! ```rust
//! use soso_event::{Event, Group};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> soso_event::EventResult<()> {
//! let event = Event::<(String, u32)>::new("OrderFilled")?;
//! let token = event.connect_fn(|(symbol, qty): &(String, u32)| {
//!     println!("{symbol} x{qty}");
//! }, Group::Process);
//!
//! event.emit(("AAPL".to_string(), 100))?;
//! assert_eq!(event.count(), 1);
//!
//! drop(token);
//! assert_eq!(event.count(), 0);
//! # Ok(())
//! # }
//! ```
//!
pub mod args;
pub mod config;
pub mod error;
pub mod eventing;

pub use args::{ArgKind, ArgSpec, DynArgs, ShapeValidator};
pub use config::EventConfig;
pub use error::{EventError, EventResult, HandlerFailure, ValidationError};
pub use eventing::{
    ArgsValidator, Event, EventOptions, Group, Handler, IntoOutcome, NextEmission, Outcome,
    Scheduler, SubscriptionToken, Task, TokenId,
};
