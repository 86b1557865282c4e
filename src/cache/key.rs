//! Cache key generation
//!
//! Short payloads are embedded verbatim (`namespace:data`); longer ones are
//! reduced to a 64-bit FNV-1a hash with the byte length appended, so two
//! payloads only share a key if both hash and length collide.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Payloads up to this many bytes are embedded in the key verbatim.
pub const INLINE_KEY_LIMIT: usize = 32;

/// Maximum number of memoized context hashes.
pub const MAX_CONTEXT_MEMO: usize = 100;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Turns `(namespace, payload)` into a short cache key.
///
/// Not a cache itself; only the memo of context hashes is stateful.
#[derive(Debug, Default)]
pub struct CacheKeyCodec {
    context_memo: RwLock<HashMap<String, u64>>,
}

impl CacheKeyCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// `namespace:data` for short data, `namespace:h<hash>:<len>` otherwise.
    pub fn key(&self, namespace: &str, data: &str) -> String {
        if data.len() <= INLINE_KEY_LIMIT {
            format!("{}:{}", namespace, data)
        } else {
            format!("{}:h{:016x}:{}", namespace, fnv1a64(data.as_bytes()), data.len())
        }
    }

    /// Key for `data` under a two-part context, e.g. `(engine, type)`.
    ///
    /// The context is prefixed with the byte lengths of both parts, so
    /// colons inside `a` or `b` cannot make two contexts collide. Its hash
    /// is memoized and XORed with the data hash.
    pub fn key_with_context(&self, a: &str, b: &str, data: &str) -> String {
        if data.len() <= INLINE_KEY_LIMIT {
            return format!("{}:{}", context_string(a, b), data);
        }
        let context = self.context_hash(a, b);
        format!(
            "x{:016x}:{}",
            context ^ fnv1a64(data.as_bytes()),
            data.len()
        )
    }

    /// Number of memoized context hashes.
    pub fn memo_len(&self) -> usize {
        self.context_memo.read().len()
    }

    fn context_hash(&self, a: &str, b: &str) -> u64 {
        let context = context_string(a, b);
        if let Some(hash) = self.context_memo.read().get(&context) {
            return *hash;
        }
        let hash = fnv1a64(context.as_bytes());
        let mut memo = self.context_memo.write();
        if memo.len() < MAX_CONTEXT_MEMO {
            memo.insert(context, hash);
        }
        hash
    }
}

fn context_string(a: &str, b: &str) -> String {
    format!("{}.{}:{}:{}", a.len(), b.len(), a, b)
}
