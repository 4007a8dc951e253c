//! Core dictionary storage engine.
//!
//! A dictionary file is written once by a building tool, then only ever
//! read. The container format is a header, five lazily-decoded list
//! sections in a fixed order, and a trailing sentinel string:
//!
//! ```text
//! [4 bytes]  format version (big-endian i32)
//! [8 bytes]  creation time, millis since epoch (big-endian i64)
//! [string]   description
//! <list>     EntrySource[]
//! <list>     PairEntry[]
//! <list>     TextEntry[]
//! <list>     HtmlEntry[]          only present since format version 5
//! <list>     Index[]
//! [string]   "END OF DICTIONARY"
//! ```

pub mod cache;
pub mod entry;
pub mod error;
pub mod index;
pub mod info;
pub mod raf;
mod utils;

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use parking_lot::Mutex;

use self::cache::{CachingList, CACHE_SIZE};
use self::entry::{Entry, EntryKind, EntryRef, EntrySource, HtmlEntry, PairEntry, TextEntry};
use self::error::{DictError, Result};
use self::index::Index;
use self::info::DictionaryInfo;
use self::raf::RafList;

/// The format version this engine writes.
pub const CURRENT_VERSION: i32 = 6;
/// The first format version that carries an html-entries section.
pub const HTML_VERSION: i32 = 5;
/// Trailing sentinel; an exact match is required on open.
pub const END_OF_DICTIONARY: &str = "END OF DICTIONARY";

/// The html-entries section, which is structurally absent in files
/// written before format version 5.
pub enum HtmlSection<F> {
    /// Pre-v5 file: no bytes exist for this section.
    Absent,
    Present(CachingList<F, HtmlEntry>),
}

impl<F: Read + Seek> HtmlSection<F> {
    pub fn len(&self) -> usize {
        match self {
            HtmlSection::Absent => 0,
            HtmlSection::Present(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, position: usize) -> Result<HtmlEntry> {
        match self {
            HtmlSection::Absent => Err(DictError::Corrupt(format!(
                "html entry reference {} in a dictionary without an html section",
                position
            ))),
            HtmlSection::Present(list) => list.get(position),
        }
    }
}

impl<F: Read + Seek> fmt::Debug for HtmlSection<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlSection::Absent => f.write_str("Absent"),
            HtmlSection::Present(list) => f.debug_tuple("Present").field(list).finish(),
        }
    }
}

/// An opened, read-only dictionary file.
///
/// Bulk entry sections are decoded lazily through bounded caches; the
/// indices are small and hot and stay fully resident. The shared file
/// handle is mutex-guarded, so a `Dictionary` can serve concurrent
/// lookups from independent search threads.
pub struct Dictionary<F> {
    pub version: i32,
    pub creation_millis: i64,
    pub description: String,
    /// Provenance metadata, small and materialized eagerly.
    pub sources: Vec<EntrySource>,
    pub pair_entries: CachingList<F, PairEntry>,
    pub text_entries: CachingList<F, TextEntry>,
    pub html_entries: HtmlSection<F>,
    pub indices: CachingList<F, Index>,
}

impl<F: Read + Seek> Dictionary<F> {
    /// Open a dictionary from a seekable byte source.
    ///
    /// Reads the header, attaches each section lazily in the fixed order,
    /// and verifies the trailing sentinel. Faults raised while
    /// constructing the lazy sections are re-signaled uniformly as
    /// [`DictError::Load`] with the original cause attached.
    ///
    /// # Errors
    /// - [`DictError::UnsupportedVersion`] if the version is negative or
    ///   newer than this engine understands (no further parsing happens)
    /// - [`DictError::Corrupt`] for truncation, a bad offset table, or a
    ///   sentinel mismatch
    /// - [`DictError::Io`] for faults external to the format
    pub fn open(file: F) -> Result<Self> {
        let file = Arc::new(Mutex::new(file));

        let (version, creation_millis, description, header_end) = {
            let mut guard = file.lock();
            let reader = &mut *guard;
            reader.seek(SeekFrom::Start(0))?;

            let version = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
            if version < 0 || version > CURRENT_VERSION {
                return Err(DictError::UnsupportedVersion(version));
            }
            let creation_millis = reader.read_i64::<BigEndian>().map_err(utils::decode_err)?;
            let description = utils::read_string(reader)?;
            let header_end = reader.stream_position()?;
            debug!(
                "Header parsed: version={}, description='{}'",
                version, description
            );
            (version, creation_millis, description, header_end)
        };

        let load = |e: DictError| DictError::Load(Box::new(e));

        // Sources are materialized before the later sections are touched,
        // then the cursor resumes at the section's end offset; later
        // sections do not redundantly store where they begin.
        let source_list: RafList<F, EntrySource> =
            RafList::attach(Arc::clone(&file), header_end).map_err(load)?;
        let sources = source_list.read_all().map_err(load)?;
        let mut offset = source_list.end_offset();

        let pair_list: RafList<F, PairEntry> =
            RafList::attach(Arc::clone(&file), offset).map_err(load)?;
        offset = pair_list.end_offset();
        let pair_entries = CachingList::bounded(pair_list, CACHE_SIZE);

        let text_list: RafList<F, TextEntry> =
            RafList::attach(Arc::clone(&file), offset).map_err(load)?;
        offset = text_list.end_offset();
        let text_entries = CachingList::bounded(text_list, CACHE_SIZE);

        let html_entries = if version >= HTML_VERSION {
            let html_list: RafList<F, HtmlEntry> =
                RafList::attach(Arc::clone(&file), offset).map_err(load)?;
            offset = html_list.end_offset();
            HtmlSection::Present(CachingList::bounded(html_list, CACHE_SIZE))
        } else {
            debug!("Format version {} predates html entries, section absent", version);
            HtmlSection::Absent
        };

        let index_list: RafList<F, Index> =
            RafList::attach(Arc::clone(&file), offset).map_err(load)?;
        offset = index_list.end_offset();
        let indices = CachingList::fully_cached(index_list);

        {
            let mut guard = file.lock();
            let reader = &mut *guard;
            reader.seek(SeekFrom::Start(offset))?;
            let end = utils::read_string(reader)?;
            if end != END_OF_DICTIONARY {
                return Err(DictError::Corrupt(format!(
                    "bad end-of-dictionary marker: '{}'",
                    end
                )));
            }
        }

        info!(
            "Dictionary opened: version={}, {} sources, {} pair entries, {} text entries, {} html entries, {} indices",
            version,
            sources.len(),
            pair_entries.len(),
            text_entries.len(),
            html_entries.len(),
            indices.len()
        );

        Ok(Self {
            version,
            creation_millis,
            description,
            sources,
            pair_entries,
            text_entries,
            html_entries,
            indices,
        })
    }

    /// Resolve a positional entry reference into a live entry.
    pub fn resolve(&self, entry_ref: EntryRef) -> Result<Entry> {
        let position = entry_ref.position as usize;
        match entry_ref.kind {
            EntryKind::Pair => Ok(Entry::Pair(self.pair_entries.get(position)?)),
            EntryKind::Text => Ok(Entry::Text(self.text_entries.get(position)?)),
            EntryKind::Html => Ok(Entry::Html(self.html_entries.get(position)?)),
        }
    }

    /// Produce the lightweight descriptor for this dictionary without
    /// materializing the entry sections.
    pub fn info(&self) -> Result<DictionaryInfo> {
        let mut index_infos = Vec::with_capacity(self.indices.len());
        for i in 0..self.indices.len() {
            index_infos.push(self.indices.get(i)?.info());
        }
        Ok(DictionaryInfo {
            creation_millis: self.creation_millis,
            description: self.description.clone(),
            index_infos,
            filename: None,
            uncompressed_bytes: None,
        })
    }
}

impl<F: Read + Seek> fmt::Debug for Dictionary<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary")
            .field("version", &self.version)
            .field("creation_millis", &self.creation_millis)
            .field("description", &self.description)
            .field("sources", &self.sources.len())
            .field("pair_entries", &self.pair_entries.len())
            .field("text_entries", &self.text_entries.len())
            .field("html_entries", &self.html_entries)
            .field("indices", &self.indices.len())
            .finish()
    }
}

impl Dictionary<File> {
    /// Open a dictionary file from disk.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening dictionary file: {}", path.display());
        let file = File::open(path)?;
        Self::open(file)
    }
}

/// In-memory dictionary under construction by a building tool.
///
/// Sections are plain vectors; nothing touches a file until [`write`]
/// (`DictionaryBuilder::write`).
pub struct DictionaryBuilder {
    pub version: i32,
    pub creation_millis: i64,
    pub description: String,
    pub sources: Vec<EntrySource>,
    pub pair_entries: Vec<PairEntry>,
    pub text_entries: Vec<TextEntry>,
    pub html_entries: Vec<HtmlEntry>,
    pub indices: Vec<Index>,
}

impl DictionaryBuilder {
    /// Start a fresh dictionary with the current format version and
    /// creation timestamp.
    pub fn new(description: impl Into<String>) -> Self {
        let creation_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            version: CURRENT_VERSION,
            creation_millis,
            description: description.into(),
            sources: Vec::new(),
            pair_entries: Vec::new(),
            text_entries: Vec::new(),
            html_entries: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn add_source(&mut self, source: EntrySource) {
        self.sources.push(source);
    }

    /// Append a pair entry, returning its position within the section.
    pub fn add_pair_entry(&mut self, entry: PairEntry) -> u32 {
        self.pair_entries.push(entry);
        (self.pair_entries.len() - 1) as u32
    }

    /// Append a text entry, returning its position within the section.
    pub fn add_text_entry(&mut self, entry: TextEntry) -> u32 {
        self.text_entries.push(entry);
        (self.text_entries.len() - 1) as u32
    }

    /// Append an html entry, assigning it its position within the
    /// section. References to the entry may only be persisted after this
    /// call.
    pub fn add_html_entry(&mut self, mut entry: HtmlEntry) -> u32 {
        let position = self.html_entries.len() as u32;
        entry.set_index(position as i32);
        self.html_entries.push(entry);
        position
    }

    pub fn add_index(&mut self, index: Index) {
        self.indices.push(index);
    }

    /// Serialize the whole dictionary to `writer`: header, the five
    /// sections in fixed order, then the sentinel marker.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.version)?;
        writer.write_i64::<BigEndian>(self.creation_millis)?;
        utils::write_string(writer, &self.description)?;
        raf::write(writer, &self.sources)?;
        raf::write(writer, &self.pair_entries)?;
        raf::write(writer, &self.text_entries)?;
        raf::write(writer, &self.html_entries)?;
        raf::write(writer, &self.indices)?;
        utils::write_string(writer, END_OF_DICTIONARY)?;
        info!(
            "Dictionary written: version={}, {} sources, {} pair entries, {} text entries, {} html entries, {} indices",
            self.version,
            self.sources.len(),
            self.pair_entries.len(),
            self.text_entries.len(),
            self.html_entries.len(),
            self.indices.len()
        );
        Ok(())
    }
}
