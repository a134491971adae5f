//! 事件子系统（eventing）
//!
//! - `Event`：具名广播器，按分组顺序同步分发；
//! - `SubscriptionToken`：订阅令牌，丢弃即断开；
//! - `Handler` / `Task`：处理器与其返回的异步续体；
//! - `Scheduler`：运行异步续体的宿主底座；
//! - `ArgsValidator`：分发前的参数校验钩子；
//! - `NextEmission`：把事件当作单次 future 等待。
//!
pub mod event;
pub mod handler;
pub mod scheduler;
pub mod token;
pub mod validator;
pub mod wait;

pub use event::{Event, EventOptions, Group};
pub use handler::{Handler, IntoOutcome, Outcome, Task};
pub use scheduler::Scheduler;
pub use token::{SubscriptionToken, TokenId};
pub use validator::ArgsValidator;
pub use wait::NextEmission;
