use crate::domain::model::{DetailLevel, DutySheetRow, MapData, MapEndpoint};
use crate::utils::error::{DashboardError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 地圖資料的快取鍵：endpoint + 細節等級 + 年 + 月
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: MapEndpoint,
    pub detail: DetailLevel,
    pub year: i32,
    pub month: u32,
}

impl CacheKey {
    pub fn new(endpoint: MapEndpoint, detail: DetailLevel, year: i32, month: u32) -> Self {
        Self {
            endpoint,
            detail,
            year,
            month,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.endpoint, self.detail, self.year, self.month
        )
    }
}

/// 值班表只有一份，用單一鍵
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DutySheetKey;

impl fmt::Display for DutySheetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("duty-sheet")
    }
}

pub type MapCache = RequestCache<CacheKey, MapData>;
pub type DutySheetCache = RequestCache<DutySheetKey, Vec<DutySheetRow>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// 本次呼叫發出了請求
    Fetched,
    /// 搭上了同一個鍵正在進行中的請求
    Coalesced,
    /// 直接取自已完成的快取
    Cached,
}

#[derive(Debug, Clone)]
pub struct Lookup<V> {
    pub value: Arc<V>,
    pub source: CacheSource,
}

impl<V> Lookup<V> {
    pub fn from_cache(&self) -> bool {
        self.source != CacheSource::Fetched
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub coalesced: u64,
    pub misses: u64,
    pub entries: usize,
    pub in_flight: usize,
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<Arc<V>>>>;

enum Slot<V> {
    Ready(Arc<V>),
    InFlight { id: u64, fetch: SharedFetch<V> },
}

struct CacheInner<K, V> {
    name: &'static str,
    slots: Mutex<HashMap<K, Slot<V>>>,
    next_id: AtomicU64,
    hits: AtomicU64,
    coalesced: AtomicU64,
    misses: AtomicU64,
}

impl<K: Eq + Hash, V> CacheInner<K, V> {
    /// 請求完成後寫回。只有仍是同一個請求（id 相同）時才寫入，
    /// reload 清空後才完成的舊請求不會把資料塞回去。
    fn settle(&self, key: &K, id: u64, result: &Result<Arc<V>>) {
        let mut slots = self.slots.lock();
        let still_current = matches!(slots.get(key), Some(Slot::InFlight { id: current, .. }) if *current == id);
        if !still_current {
            return;
        }
        match result {
            Ok(value) => {
                if let Some(slot) = slots.get_mut(key) {
                    *slot = Slot::Ready(Arc::clone(value));
                }
            }
            Err(_) => {
                // 失敗不快取，下一次請求會重新發出
                slots.remove(key);
            }
        }
    }
}

/// 合併重複請求的共享快取。
///
/// 同一個鍵在請求進行中時，後來的呼叫會等待同一個請求並拿到同一個 `Arc`。
/// 成功的結果永久保存（沒有過期也沒有淘汰），唯一的失效方式是 [`RequestCache::clear`]。
/// 請求在背景 task 中執行，呼叫端放棄等待也不會中止請求。
pub struct RequestCache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for RequestCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> RequestCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                name,
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                hits: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<Lookup<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (shared, source) = {
            let mut slots = self.inner.slots.lock();
            match slots.get(&key) {
                Some(Slot::Ready(value)) => {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("⚡ [{}] cache hit: {}", self.inner.name, key);
                    return Ok(Lookup {
                        value: Arc::clone(value),
                        source: CacheSource::Cached,
                    });
                }
                Some(Slot::InFlight { fetch, .. }) => {
                    self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("🔗 [{}] joining in-flight request: {}", self.inner.name, key);
                    (fetch.clone(), CacheSource::Coalesced)
                }
                None => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("📡 [{}] cache miss, fetching: {}", self.inner.name, key);

                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                    let shared = self.spawn_fetch(key.clone(), id, fetch());
                    slots.insert(
                        key.clone(),
                        Slot::InFlight {
                            id,
                            fetch: shared.clone(),
                        },
                    );
                    (shared, CacheSource::Fetched)
                }
            }
        };

        let value = shared.await?;
        Ok(Lookup { value, source })
    }

    fn spawn_fetch<Fut>(&self, key: K, id: u64, fetch: Fut) -> SharedFetch<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = fetch.await.map(Arc::new);
            if let Err(e) = &result {
                tracing::warn!("❌ [{}] fetch failed for {}: {}", inner.name, key, e);
            }
            inner.settle(&key, id, &result);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(DashboardError::TaskError {
                    message: e.to_string(),
                }),
            }
        }
        .boxed()
        .shared()
    }

    /// 只回傳已完成的值
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match self.inner.slots.lock().get(key) {
            Some(Slot::Ready(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        matches!(self.inner.slots.lock().get(key), Some(Slot::InFlight { .. }))
    }

    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.inner.slots.lock();
        let entries = slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count();
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            entries,
            in_flight: slots.len() - entries,
        }
    }

    /// 整頁重新載入時使用
    pub fn clear(&self) {
        let mut slots = self.inner.slots.lock();
        tracing::info!("🧹 [{}] clearing {} cache slots", self.inner.name, slots.len());
        slots.clear();
    }
}
