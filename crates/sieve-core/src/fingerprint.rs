//! Content hashing and cache-key derivation.
//!
//! `hash_bytes` is MD5 via the `md-5` crate, as the specification calls
//! for explicitly: it is used purely as a cache key, never for security.

use md5::{Digest, Md5};

/// Hash arbitrary bytes to a 128-bit hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Join parts with a NUL separator and hash the result.
///
/// Used both for `compose_key` (joining opaque string parts) and for
/// `file_cache_key` (joining file contents with a relative path).
pub fn compose_key(parts: &[&str]) -> String {
    let mut buf = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buf.push(0u8);
        }
        buf.extend_from_slice(part.as_bytes());
    }
    hash_bytes(&buf)
}

/// `md5(contents ++ 0x00 ++ relative_path)` — the default `file_cache_key`.
pub fn file_cache_key(contents: &[u8], relative_path: &str) -> String {
    let mut buf = Vec::with_capacity(contents.len() + 1 + relative_path.len());
    buf.extend_from_slice(contents);
    buf.push(0u8);
    buf.extend_from_slice(relative_path.as_bytes());
    hash_bytes(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bytes_is_stable_and_128_bit() {
        let a = hash_bytes(b"hello world");
        let b = hash_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_bytes_is_sensitive_to_content() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }

    #[test]
    fn file_cache_key_differs_by_path() {
        let a = file_cache_key(b"same bytes", "a.js");
        let b = file_cache_key(b"same bytes", "b.js");
        assert_ne!(a, b);
    }

    #[test]
    fn compose_key_is_order_sensitive() {
        let a = compose_key(&["a", "b"]);
        let b = compose_key(&["b", "a"]);
        assert_ne!(a, b);
    }
}
