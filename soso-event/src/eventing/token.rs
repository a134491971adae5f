//! 订阅令牌（SubscriptionToken）
//!
//! 令牌标识一次订阅，持有指向所属事件的弱引用：
//! - 令牌不会延长事件的生命周期；
//! - 最后一个令牌克隆被丢弃时自动断开订阅（RAII，确定性）；
//! - 断开是单向、幂等的：弱引用一旦清除就不会恢复。
//!
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// 令牌标识值，同一事件内严格递增、不复用
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(u64);

impl TokenId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 令牌所属方（事件）需要提供的能力，用于擦除事件的参数类型
pub(crate) trait TokenOwner: Send + Sync {
    fn disconnect_token(&self, id: TokenId);
    fn retain_token(&self, token: SubscriptionToken);
}

pub(crate) struct TokenCell {
    id: TokenId,
    owner: Mutex<Option<Weak<dyn TokenOwner>>>,
}

impl TokenCell {
    fn take_owner(&self) -> Option<Weak<dyn TokenOwner>> {
        self.owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// 由事件一侧调用：订阅已被移除，清除回指
    pub(crate) fn clear_owner(&self) {
        drop(self.take_owner());
    }
}

impl Drop for TokenCell {
    fn drop(&mut self) {
        let owner = self
            .owner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(event) = owner.and_then(|w| w.upgrade()) {
            event.disconnect_token(self.id);
        }
    }
}

/// 订阅令牌
///
/// 克隆开销很小；所有克隆共享同一个订阅。相等性与哈希只取决于标识值。
#[derive(Clone)]
#[must_use = "dropping the last clone of a token disconnects the subscription"]
pub struct SubscriptionToken {
    cell: Arc<TokenCell>,
}

impl SubscriptionToken {
    pub(crate) fn new(id: TokenId, owner: Weak<dyn TokenOwner>) -> Self {
        Self {
            cell: Arc::new(TokenCell {
                id,
                owner: Mutex::new(Some(owner)),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<TokenCell> {
        Arc::downgrade(&self.cell)
    }

    pub(crate) fn is_cell(&self, cell: &Weak<TokenCell>) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.cell), cell.as_ptr())
    }

    pub(crate) fn from_cell(cell: Arc<TokenCell>) -> Self {
        Self { cell }
    }

    pub(crate) fn upgrade(cell: &Weak<TokenCell>) -> Option<Self> {
        cell.upgrade().map(Self::from_cell)
    }

    pub fn id(&self) -> TokenId {
        self.cell.id
    }

    /// 订阅是否仍然有效（未断开且事件仍存活）
    pub fn is_connected(&self) -> bool {
        self.cell
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|w| w.strong_count() > 0)
    }

    /// 显式断开订阅；重复调用或事件已销毁时为空操作
    pub fn disconnect(&self) {
        if let Some(event) = self.cell.take_owner().and_then(|w| w.upgrade()) {
            event.disconnect_token(self.cell.id);
        }
    }

    /// 放弃令牌但保留订阅：订阅随事件存活，直到事件销毁
    pub fn detach(self) {
        let owner = self
            .cell
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(event) = owner {
            event.retain_token(self);
        }
    }
}

impl PartialEq for SubscriptionToken {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SubscriptionToken {}

impl Hash for SubscriptionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &self.id())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token {}", self.id())
    }
}
