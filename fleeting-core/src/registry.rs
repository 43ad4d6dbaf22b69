//! 监听器注册表（ListenerRegistry）
//!
//! `ListenerId → 监听器` 的并发映射，是核心中唯一的共享可变状态：
//! - `register`：先布置超时再插入，条目可见时其超时必然已在排队；
//! - `try_claim`：原子地条件删除，决定匹配路径 / 过期路径 / 取消三者中谁胜出；
//! - `snapshot_active`：复制当前活动监听器，迭代期间不持有任何分片锁。
//!
use crate::error::{ListenerError, ListenerResult};
use crate::expiry::ExpiryScheduler;
use crate::listener::{AnyListener, ListenerId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::error;

/// 注册表中保存的类型擦除监听器
pub type SharedListener = Arc<dyn AnyListener>;

pub struct ListenerRegistry {
    entries: DashMap<ListenerId, SharedListener>,
    expiry: ExpiryScheduler,
    max_pending: usize,
}

impl ListenerRegistry {
    pub fn new(expiry: ExpiryScheduler, max_pending: usize) -> Self {
        Self {
            entries: DashMap::new(),
            expiry,
            max_pending,
        }
    }

    /// 插入监听器并布置其超时
    ///
    /// `max_pending` 为软上限：并发注册时可能短暂超出若干个。
    pub fn register(&self, listener: SharedListener) -> ListenerResult<ListenerId> {
        if self.entries.len() >= self.max_pending {
            return Err(ListenerError::CapacityExceeded {
                limit: self.max_pending,
            });
        }

        let id = listener.id();
        let ttl = listener.ttl();
        match self.entries.entry(id) {
            Entry::Occupied(_) => {
                // 同一 id 出现两次意味着 id 生成或调用方复用了同一监听器
                error!(listener_id = %id, "duplicate temporary listener registration");
                Err(ListenerError::DuplicateListener { id })
            }
            Entry::Vacant(slot) => {
                // 布置失败时条目从未可见，不会有分发者先行回收
                self.expiry.arm(id, ttl)?;
                slot.insert(listener);
                Ok(id)
            }
        }
    }

    /// 原子回收：删除 `id` 对应条目并完成 `claimed` 转换，同时撤销其超时
    ///
    /// 并发调用同一 `id` 时恰有一个调用方得到 `Some`。
    pub fn try_claim(&self, id: &ListenerId) -> Option<SharedListener> {
        let listener = self.claim_expired(id)?;
        self.expiry.disarm(*id);
        Some(listener)
    }

    /// 过期路径的回收：超时已从队列弹出，无需撤销
    pub(crate) fn claim_expired(&self, id: &ListenerId) -> Option<SharedListener> {
        let (_, listener) = self.entries.remove(id)?;
        listener.claim().then_some(listener)
    }

    pub fn snapshot_active(&self) -> Vec<SharedListener> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// 回收全部条目而不执行任何回调，返回被丢弃的数量
    pub fn discard_all(&self) -> usize {
        let ids: Vec<ListenerId> = self.entries.iter().map(|e| *e.key()).collect();
        ids.iter().filter(|id| self.try_claim(id).is_some()).count()
    }

    pub fn contains(&self, id: &ListenerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
