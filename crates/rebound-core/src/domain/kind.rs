//! Error kinds - リトライ対象の判定
//!
//! 失敗を「種類（kind）」で分類し、ポリシー側は kind の集合だけを見る。
//! 実行時の型比較ではなく、呼び出し側が事前に列挙した kind のタグ比較で判定する。

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Classify は error を kind に写す
///
/// # 使用例
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum FetchKind { Connection, Decode }
///
/// impl Classify for FetchError {
///     type Kind = FetchKind;
///     fn kind(&self) -> FetchKind { ... }
/// }
/// ```
pub trait Classify {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

impl Classify for std::io::Error {
    type Kind = std::io::ErrorKind;

    fn kind(&self) -> std::io::ErrorKind {
        std::io::Error::kind(self)
    }
}

/// RetryOn はリトライ対象となる kind の集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOn<K: Eq + Hash> {
    /// すべての kind をリトライ対象にする
    Any,
    /// 列挙した kind だけをリトライ対象にする
    Only(HashSet<K>),
}

impl<K: Copy + Eq + Hash + Debug> RetryOn<K> {
    pub fn any() -> Self {
        RetryOn::Any
    }

    pub fn only(kinds: impl IntoIterator<Item = K>) -> Self {
        RetryOn::Only(kinds.into_iter().collect())
    }

    pub fn matches(&self, kind: &K) -> bool {
        match self {
            RetryOn::Any => true,
            RetryOn::Only(kinds) => kinds.contains(kind),
        }
    }

    /// `Only` with no kinds would never retry anything.
    pub fn is_empty(&self) -> bool {
        matches!(self, RetryOn::Only(kinds) if kinds.is_empty())
    }
}

impl<K: Copy + Eq + Hash + Debug> Default for RetryOn<K> {
    fn default() -> Self {
        RetryOn::Any
    }
}
