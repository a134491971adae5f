//! 等待适配器
//!
//! 事件可以直接被 `await`：在等待点连接一个内部 PROCESS 处理器，
//! 第一次发射的参数即为结果，随后内部订阅被断开。
//!
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::task::{Context, Poll, ready};

use futures_util::FutureExt;
use tokio::sync::oneshot;

use super::event::{Event, Group};
use super::handler::Handler;
use super::token::{SubscriptionToken, TokenCell};
use crate::error::{EventError, EventResult};

/// 等待下一次发射的 future
///
/// 丢弃该 future 会一并断开内部订阅。
#[must_use = "futures do nothing unless polled"]
pub struct NextEmission<A> {
    event: String,
    rx: oneshot::Receiver<A>,
    token: Option<SubscriptionToken>,
}

impl<A> NextEmission<A> {
    /// 内部订阅是否仍然存在
    pub fn is_pending(&self) -> bool {
        self.token.as_ref().is_some_and(SubscriptionToken::is_connected)
    }
}

impl<A> Future for NextEmission<A> {
    type Output = EventResult<A>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let res = ready!(self.rx.poll_unpin(cx));
        if let Some(token) = self.token.take() {
            token.disconnect();
        }
        Poll::Ready(res.map_err(|_| EventError::Closed {
            event: self.event.clone(),
        }))
    }
}

impl<A: Clone + Send + 'static> Event<A> {
    /// 立即连接内部处理器，返回等待下一次发射的 future
    pub fn next_emission(&self) -> NextEmission<A> {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        let own: Arc<OnceLock<Weak<TokenCell>>> = Arc::default();
        let handler = Handler::new({
            let own = own.clone();
            move |args: &A| {
                let tx = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(tx) = tx {
                    let _ = tx.send(args.clone());
                    // 结果一旦送出即退订，不等待 future 被轮询
                    if let Some(token) = own.get().and_then(SubscriptionToken::upgrade) {
                        token.disconnect();
                    }
                }
            }
        })
        .named("next_emission");

        let token = self.connect(&handler, Group::Process);
        let _ = own.set(token.downgrade());

        NextEmission {
            event: self.name().to_string(),
            rx,
            token: Some(token),
        }
    }
}

impl<A: Clone + Send + 'static> IntoFuture for &Event<A> {
    type Output = EventResult<A>;
    type IntoFuture = NextEmission<A>;

    fn into_future(self) -> Self::IntoFuture {
        self.next_emission()
    }
}
