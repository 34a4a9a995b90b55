use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Outcome of a single `try_consume` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    pub allowed: bool,
    pub remaining: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Distributed token-bucket evaluator backed by a key-value store. One
/// operation, atomic across all callers of the same key, even across
/// processes.
#[async_trait]
pub trait TokenBucketStore: Send + Sync {
    async fn try_consume(
        &self,
        key: &str,
        rate: f64,
        burst: f64,
        n: f64,
        now_ms: i64,
    ) -> Result<Admission, RateLimitError>;
}

/// Idle window after which an unused bucket record may be reclaimed by the
/// backing store. Applied to every write as an expiry/TTL extension.
pub const IDLE_EXPIRY_SECS: u64 = 3600;

/// Pure refill/consume arithmetic shared by every store implementation:
///
/// 1. `tokens := min(burst, tokens + elapsed_ms * rate / 1000)`
/// 2. if `tokens >= n`: admit, `tokens -= n`
/// 3. else: reject, tokens stay at the refilled (un-deducted) value
///
/// `last_refill_ms` defaults to `now_ms` and `tokens` to `burst` when the key
/// has no prior record, per the spec's read step.
pub fn advance(
    tokens: f64,
    last_refill_ms: i64,
    rate: f64,
    burst: f64,
    n: f64,
    now_ms: i64,
) -> (Admission, f64, i64) {
    let elapsed_ms = (now_ms - last_refill_ms).max(0) as f64;
    let refilled = (tokens + elapsed_ms * rate / 1000.0).min(burst);
    if refilled >= n {
        let remaining = refilled - n;
        (
            Admission {
                allowed: true,
                remaining,
            },
            remaining,
            now_ms,
        )
    } else {
        (
            Admission {
                allowed: false,
                remaining: refilled,
            },
            refilled,
            now_ms,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct BucketRecord {
    tokens: f64,
    last_refill_ms: i64,
}

/// In-process token bucket store. Used standalone (no Redis configured) and
/// by the property tests so the algorithm can be exercised without a live
/// store.
#[derive(Debug, Default)]
pub struct MemoryTokenBucketStore {
    buckets: DashMap<String, BucketRecord>,
}

impl MemoryTokenBucketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenBucketStore for MemoryTokenBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        rate: f64,
        burst: f64,
        n: f64,
        now_ms: i64,
    ) -> Result<Admission, RateLimitError> {
        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert(BucketRecord {
                tokens: burst,
                last_refill_ms: now_ms,
            });

        let (admission, tokens, last_refill_ms) = advance(
            entry.tokens,
            entry.last_refill_ms,
            rate,
            burst,
            n,
            now_ms,
        );
        entry.tokens = tokens;
        entry.last_refill_ms = last_refill_ms;
        Ok(admission)
    }
}

/// Redis-backed token bucket store. The read-compute-write-expire sequence
/// runs as a single Lua script so it is atomic across every instance of the
/// gateway sharing the same Redis, not just within one process.
pub struct RedisTokenBucketStore {
    manager: redis::aio::ConnectionManager,
    script: redis::Script,
}

const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local rate = tonumber(ARGV[1])
local burst = tonumber(ARGV[2])
local n = tonumber(ARGV[3])
local now_ms = tonumber(ARGV[4])
local ttl_secs = tonumber(ARGV[5])

local tokens = tonumber(redis.call("HGET", key, "tokens"))
local last_refill_ms = tonumber(redis.call("HGET", key, "last_refill"))
if tokens == nil or last_refill_ms == nil then
    tokens = burst
    last_refill_ms = now_ms
end

local elapsed_ms = now_ms - last_refill_ms
if elapsed_ms < 0 then elapsed_ms = 0 end
local refilled = tokens + elapsed_ms * rate / 1000.0
if refilled > burst then refilled = burst end

local allowed
if refilled >= n then
    allowed = 1
    refilled = refilled - n
else
    allowed = 0
end

redis.call("HSET", key, "tokens", refilled, "last_refill", now_ms)
redis.call("EXPIRE", key, ttl_secs)

return {allowed, tostring(refilled)}
"#;

impl RedisTokenBucketStore {
    pub async fn connect(addr: &str, password: Option<&str>, db: i64) -> Result<Self, RateLimitError> {
        let mut url = format!("redis://{addr}/{db}");
        if let Some(password) = password {
            url = format!("redis://:{password}@{addr}/{db}");
        }
        let client = redis::Client::open(url)
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;
        Ok(Self {
            manager,
            script: redis::Script::new(TOKEN_BUCKET_SCRIPT),
        })
    }
}

#[async_trait]
impl TokenBucketStore for RedisTokenBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        rate: f64,
        burst: f64,
        n: f64,
        now_ms: i64,
    ) -> Result<Admission, RateLimitError> {
        let mut conn = self.manager.clone();
        let (allowed, remaining): (i64, String) = self
            .script
            .key(key)
            .arg(rate)
            .arg(burst)
            .arg(n)
            .arg(now_ms)
            .arg(IDLE_EXPIRY_SECS)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;

        let remaining: f64 = remaining
            .parse()
            .map_err(|e: std::num::ParseFloatError| RateLimitError::StoreUnavailable(e.to_string()))?;
        Ok(Admission {
            allowed: allowed == 1,
            remaining,
        })
    }
}

/// `{ rate, burst, store_ref }` for one agent. Immutable after creation;
/// lives for the process.
pub struct LimiterHandle {
    pub rate: f64,
    pub burst: f64,
    store: Arc<dyn TokenBucketStore>,
    key_prefix: String,
}

impl LimiterHandle {
    pub async fn check(&self, agent_id: &str, now_ms: i64) -> Result<Admission, RateLimitError> {
        let key = format!("{}:{}", self.key_prefix, agent_id);
        self.store
            .try_consume(&key, self.rate, self.burst, 1.0, now_ms)
            .await
    }
}

/// Per-agent lazy-initialized limiter handles with a stable configuration.
/// Concurrent first uses of the same agent never create duplicate handles.
pub struct LimiterRegistry {
    handles: DashMap<String, Arc<LimiterHandle>>,
    store: Arc<dyn TokenBucketStore>,
    key_prefix: String,
}

impl LimiterRegistry {
    pub fn new(store: Arc<dyn TokenBucketStore>, key_prefix: String) -> Self {
        Self {
            handles: DashMap::new(),
            store,
            key_prefix,
        }
    }

    fn handle_for(&self, agent_id: &str, qps: u32) -> Arc<LimiterHandle> {
        Arc::clone(
            &self
                .handles
                .entry(agent_id.to_string())
                .or_insert_with(|| {
                    Arc::new(LimiterHandle {
                        rate: qps as f64,
                        burst: (qps as f64) * 2.0,
                        store: Arc::clone(&self.store),
                        key_prefix: self.key_prefix.clone(),
                    })
                }),
        )
    }

    /// Fail-closed on store outage: the error propagates to the caller,
    /// which surfaces a 500. Fail-open is not offered here because this is
    /// the sole admission mechanism.
    pub async fn check(
        &self,
        agent_id: &str,
        qps: u32,
        now_ms: i64,
    ) -> Result<Admission, RateLimitError> {
        self.handle_for(agent_id, qps).check(agent_id, now_ms).await
    }
}
