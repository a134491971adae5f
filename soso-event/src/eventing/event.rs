//! 事件（Event）
//!
//! 具名广播器：持有按优先级分组的订阅，被调用时同步地把参数分发给每个处理器。
//! - 分发顺序：STORE 组全部先于 PROCESS 组，组内按连接顺序；
//! - 分发前对处理器列表做快照，分发期间的连接/断开只影响后续发射；
//! - 同一事件在分发过程中被再次发射（重入）时直接跳过；
//! - 单个处理器失败只记录日志，不影响调用方和其它处理器。
//!
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bon::Builder;
use tracing::{debug, error};

use super::handler::{Handler, IntoOutcome, Outcome};
use super::scheduler::{self, Scheduler};
use super::token::{SubscriptionToken, TokenCell, TokenId, TokenOwner};
use super::validator::ArgsValidator;
use crate::config::EventConfig;
use crate::error::{EventError, EventResult, HandlerFailure};

/// 优先级分组
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Store,
    Process,
}

type DisconnectObserver<A> = Arc<dyn Fn(&Event<A>) + Send + Sync>;

struct Subscription<A> {
    handler: Handler<A>,
    group: Group,
    token: Weak<TokenCell>,
    // detach 后由事件持有的令牌
    retained: Option<SubscriptionToken>,
}

struct Registry<A> {
    groups: BTreeMap<Group, Vec<TokenId>>,
    subscriptions: HashMap<TokenId, Subscription<A>>,
    next_id: u64,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            subscriptions: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<A> Registry<A> {
    fn allocate_id(&mut self) -> TokenId {
        self.next_id += 1;
        TokenId::new(self.next_id)
    }

    fn existing_token(&self, handler: &Handler<A>) -> Option<SubscriptionToken> {
        self.subscriptions
            .values()
            .find(|sub| sub.handler.same_as(handler))
            .and_then(|sub| sub.token.upgrade())
            .map(SubscriptionToken::from_cell)
    }

    fn insert(&mut self, id: TokenId, sub: Subscription<A>) {
        self.groups.entry(sub.group).or_default().push(id);
        self.subscriptions.insert(id, sub);
    }

    fn remove(&mut self, id: TokenId) -> Option<Subscription<A>> {
        let sub = self.subscriptions.remove(&id)?;
        if let Some(ids) = self.groups.get_mut(&sub.group) {
            ids.retain(|other| *other != id);
        }
        Some(sub)
    }

    fn ordered_ids(&self) -> Vec<TokenId> {
        self.groups.values().flatten().copied().collect()
    }

    fn snapshot(&self) -> Vec<Handler<A>> {
        self.groups
            .values()
            .flatten()
            .filter_map(|id| self.subscriptions.get(id))
            .map(|sub| sub.handler.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.subscriptions.len()
    }
}

/// 创建事件的参数
#[derive(Builder)]
pub struct EventOptions<A: 'static> {
    #[builder(into)]
    name: String,
    /// 未指定时捕获当前 tokio 运行时
    scheduler: Option<Arc<dyn Scheduler>>,
    validator: Option<Arc<dyn ArgsValidator<A>>>,
    #[builder(default)]
    config: EventConfig,
}

impl<A: 'static> EventOptions<A> {
    pub fn create(self) -> EventResult<Arc<Event<A>>> {
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(s) => s,
            None => Arc::new(scheduler::current()?),
        };

        Ok(Arc::new_cyclic(|this| Event {
            name: self.name,
            this: this.clone(),
            scheduler,
            validator: self.validator,
            config: self.config,
            registry: Mutex::new(Registry::default()),
            on_disconnect: Mutex::new(None),
            failures: AtomicUsize::new(0),
            dispatching: AtomicBool::new(false),
        }))
    }
}

/// 事件：参数类型 `A` 在创建时确定，处理器接收 `&A`
pub struct Event<A: 'static> {
    name: String,
    this: Weak<Event<A>>,
    scheduler: Arc<dyn Scheduler>,
    validator: Option<Arc<dyn ArgsValidator<A>>>,
    config: EventConfig,
    registry: Mutex<Registry<A>>,
    on_disconnect: Mutex<Option<DisconnectObserver<A>>>,
    failures: AtomicUsize,
    dispatching: AtomicBool,
}

impl<A: 'static> Event<A> {
    /// 以默认配置创建事件，绑定当前 tokio 运行时
    pub fn new(name: impl Into<String>) -> EventResult<Arc<Self>> {
        EventOptions::builder().name(name).build().create()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, Registry<A>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 连接处理器；同一处理器重复连接返回已有令牌
    pub fn connect(&self, handler: &Handler<A>, group: Group) -> SubscriptionToken {
        let mut registry = self.registry();
        if let Some(token) = registry.existing_token(handler) {
            return token;
        }

        let id = registry.allocate_id();
        let owner: Weak<dyn TokenOwner> = self.this.clone();
        let token = SubscriptionToken::new(id, owner);
        registry.insert(
            id,
            Subscription {
                handler: handler.clone(),
                group,
                token: token.downgrade(),
                retained: None,
            },
        );
        drop(registry);

        debug!(event = %self.name, handler = handler.name(), token = %id, ?group, "connected");
        token
    }

    /// 以闭包直接连接，每次调用都会产生新的订阅
    pub fn connect_fn<F, R>(&self, f: F, group: Group) -> SubscriptionToken
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.connect(&Handler::new(f), group)
    }

    /// 断开令牌；令牌不属于本事件或已断开时为空操作
    pub fn disconnect(&self, token: &SubscriptionToken) {
        let owned = self
            .registry()
            .subscriptions
            .get(&token.id())
            .is_some_and(|sub| token.is_cell(&sub.token));
        if owned {
            token.disconnect();
        }
    }

    /// 注册断开观察者（替换之前的），每次成功断开后以事件本身回调
    pub fn on_disconnect<F>(&self, observer: F)
    where
        F: Fn(&Event<A>) + Send + Sync + 'static,
    {
        let previous = {
            let mut slot = self
                .on_disconnect
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, Some(Arc::new(observer)))
        };
        // 旧观察者可能持有本事件的最后一个令牌，必须在释放锁之后丢弃
        drop(previous);
    }

    fn observer(&self) -> Option<DisconnectObserver<A>> {
        self.on_disconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 当前订阅总数
    pub fn count(&self) -> usize {
        self.registry().len()
    }

    pub fn len(&self) -> usize {
        self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// 按分发顺序返回当前处理器的快照
    pub fn handlers(&self) -> Vec<Handler<A>> {
        self.registry().snapshot()
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::Acquire)
    }

    /// 发射事件
    ///
    /// 校验失败时返回错误且不调用任何处理器；处理器失败不会传播。
    /// 在本事件的分发过程中再次发射为空操作。
    pub fn emit(&self, args: A) -> EventResult<()> {
        debug!(event = %self.name, subscribers = self.count(), "emitting");

        if let Some(validator) = &self.validator {
            validator
                .validate(&args)
                .map_err(|source| EventError::Validation {
                    event: self.name.clone(),
                    source,
                })?;
        }

        let handlers = self.handlers();

        let Some(_guard) = DispatchGuard::enter(&self.dispatching) else {
            debug!(event = %self.name, "reentrant emission suppressed");
            return Ok(());
        };

        for handler in &handlers {
            self.call_handler(handler, &args);
        }

        Ok(())
    }

    fn call_handler(&self, handler: &Handler<A>, args: &A) {
        let outcome = if self.config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| handler.call(args)))
                .unwrap_or_else(|payload| Outcome::Failed(HandlerFailure::from_panic(payload)))
        } else {
            handler.call(args)
        };

        match outcome {
            Outcome::Done => {
                self.failures.store(0, Ordering::Relaxed);
            }
            Outcome::Spawn(task) => {
                self.scheduler.spawn(task);
                self.failures.store(0, Ordering::Relaxed);
            }
            Outcome::Failed(failure) => self.report_failure(handler, &failure),
        }
    }

    fn report_failure(&self, handler: &Handler<A>, failure: &HandlerFailure) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;

        error!(
            event = %self.name,
            handler = handler.name(),
            failures,
            "error calling handler: {}",
            failure.message()
        );
        if failures <= self.config.full_trace_failures {
            error!(event = %self.name, handler = handler.name(), "handler failure detail: {}", failure.detail());
        } else {
            debug!(event = %self.name, handler = handler.name(), "handler failure detail: {}", failure.detail());
        }
    }

    /// 连续失败次数，任一处理器成功即清零
    pub fn consecutive_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl<A: 'static> TokenOwner for Event<A> {
    fn disconnect_token(&self, id: TokenId) {
        let removed = self.registry().remove(id);
        let Some(sub) = removed else {
            return;
        };

        // 先清除回指，再释放订阅（可能持有最后一个令牌克隆）
        if let Some(cell) = sub.token.upgrade() {
            cell.clear_owner();
        }
        drop(sub);

        debug!(event = %self.name, token = %id, "disconnected");
        if let Some(observer) = self.observer() {
            observer(self);
        }
    }

    fn retain_token(&self, token: SubscriptionToken) {
        let rejected = {
            let mut registry = self.registry();
            match registry.subscriptions.get_mut(&token.id()) {
                Some(sub) if token.is_cell(&sub.token) => {
                    sub.retained = Some(token);
                    None
                }
                _ => Some(token),
            }
        };
        drop(rejected);
    }
}

impl<A: 'static> Drop for Event<A> {
    fn drop(&mut self) {
        let observer = self
            .on_disconnect
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let ids = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered_ids();

        for id in ids {
            let removed = self
                .registry
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id);
            let Some(sub) = removed else {
                continue;
            };
            if let Some(cell) = sub.token.upgrade() {
                cell.clear_owner();
            }
            drop(sub);

            if let Some(observer) = &observer {
                observer(&*self);
            }
        }
    }
}

impl<A: 'static> fmt::Display for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({}, subscribers={})", self.name, self.count())
    }
}

impl<A: 'static> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("subscribers", &self.count())
            .field("dispatching", &self.is_dispatching())
            .field("config", &self.config)
            .finish()
    }
}

/// 分发标记守卫：离开作用域（包括 panic 展开）时复位
struct DispatchGuard<'a>(&'a AtomicBool);

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
