//! # quickdic
//!
//! A reader and writer for QuickDic binary dictionary files: large,
//! write-once collections of lexical entries stored in a single
//! random-access file and decoded lazily on demand.
//!
//! The engine is built from three layers:
//! - [`engine::raf::RafList`]: an offset-indexed, lazily-decoded list
//!   format giving O(1) random access into variable-length payloads
//! - [`engine::cache::CachingList`]: bounded (LRU) or fully-cached decode
//!   memoization over such a list
//! - [`engine::Dictionary`]: the versioned container composing the typed
//!   sections plus lookup indices, with sentinel-based integrity checking

pub mod engine;

// Re-export the main types for convenience
pub use engine::{
    cache::CachingList,
    entry::{Entry, EntryKind, EntryRef, EntrySource, HtmlEntry, PairEntry, TextEntry, TokenPair},
    error::{DictError, Result},
    index::{Index, IndexInfo, IndexToken},
    info::DictionaryInfo,
    raf::{RafCodec, RafList},
    Dictionary, DictionaryBuilder, HtmlSection, CURRENT_VERSION, END_OF_DICTIONARY, HTML_VERSION,
};
