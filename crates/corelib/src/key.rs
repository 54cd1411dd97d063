//! Typed-key conveniences.
//!
//! The ring's primitive lookup operations take raw bytes. [`HashKey`]
//! provides deterministic byte encodings for the common key types callers
//! actually have on hand, so `ring.get_server("user:42")` and
//! `ring.get_server(42u32)` don't require the caller to think about
//! encoding. The same key value under the same typed overload always
//! produces the same bytes.

use std::borrow::Cow;

/// A value that can be deterministically converted to ring-lookup key bytes.
pub trait HashKey {
    fn key_bytes(&self) -> Cow<'_, [u8]>;
}

impl HashKey for [u8] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl<const N: usize> HashKey for [u8; N] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl HashKey for Vec<u8> {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl HashKey for str {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl HashKey for String {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl HashKey for u32 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_be_bytes().to_vec())
    }
}

impl HashKey for i32 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_be_bytes().to_vec())
    }
}

impl HashKey for i64 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_be_bytes().to_vec())
    }
}

impl HashKey for uuid::Uuid {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.as_bytes().to_vec())
    }
}

impl<T: HashKey + ?Sized> HashKey for &T {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        (**self).key_bytes()
    }
}
