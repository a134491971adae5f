//! 事件处理器（Handler）
//!
//! 处理器是可共享的回调，身份由内部回调指针决定：同一个 `Handler`（及其克隆）
//! 重复连接到同一事件时只会得到同一个订阅。
//!
//! 处理器的返回值通过 `IntoOutcome` 显式声明能力：
//! - `()`：同步完成；
//! - `Task`：异步续体，交给调度器独立运行，分发不等待；
//! - `Result<T, E>`：`Err` 视为处理器失败。
//!
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_core::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::HandlerFailure;

/// 处理器返回的异步续体
pub struct Task(BoxFuture<'static, ()>);

impl Task {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(fut.boxed())
    }

    pub fn into_inner(self) -> BoxFuture<'static, ()> {
        self.0
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

/// 单次处理器调用的结果
#[derive(Debug)]
pub enum Outcome {
    Done,
    Spawn(Task),
    Failed(HandlerFailure),
}

/// 处理器返回值到 `Outcome` 的转换
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Done
    }
}

impl IntoOutcome for Task {
    fn into_outcome(self) -> Outcome {
        Outcome::Spawn(self)
    }
}

impl IntoOutcome for Option<Task> {
    fn into_outcome(self) -> Outcome {
        match self {
            Some(task) => Outcome::Spawn(task),
            None => Outcome::Done,
        }
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: fmt::Display + fmt::Debug,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(v) => v.into_outcome(),
            Err(e) => Outcome::Failed(HandlerFailure::from_error(e)),
        }
    }
}

type HandlerFn<A> = dyn Fn(&A) -> Outcome + Send + Sync;

/// 可订阅事件的处理器
pub struct Handler<A> {
    f: Arc<HandlerFn<A>>,
    name: &'static str,
}

impl<A> Handler<A> {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        Self {
            f: Arc::new(move |args: &A| f(args).into_outcome()),
            name: std::any::type_name::<F>(),
        }
    }

    /// 指定日志中展示的处理器名称
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(&self, args: &A) -> Outcome {
        (self.f)(args)
    }

    /// 是否为同一处理器（回调指针相同）
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            name: self.name,
        }
    }
}

impl<A> PartialEq for Handler<A> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<A> Eq for Handler<A> {}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}
