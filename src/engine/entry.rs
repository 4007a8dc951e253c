//! Entry types: the record payloads stored in the dictionary sections.
//!
//! Three entry variants carry content (pair, text, html); `EntrySource`
//! carries provenance metadata. Entries reference each other by integer
//! position into their owning section, never by direct reference, so an
//! index can point at an entry without owning it.

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::error::{DictError, Result};
use super::raf::RafCodec;
use super::utils;

/// Provenance metadata: a named source and how many entries it contributed.
///
/// Used for attribution and reporting, not for lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySource {
    pub name: String,
    pub num_entries: i32,
}

impl EntrySource {
    pub fn new(name: impl Into<String>, num_entries: i32) -> Self {
        Self {
            name: name.into(),
            num_entries,
        }
    }
}

impl RafCodec for EntrySource {
    fn read<R: Read + Seek>(reader: &mut R, _index: u32) -> Result<Self> {
        let name = utils::read_string(reader)?;
        let num_entries = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
        Ok(Self { name, num_entries })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        utils::write_string(writer, &self.name)?;
        writer.write_i32::<BigEndian>(self.num_entries)?;
        Ok(())
    }
}

/// One token per side of a language pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub lang1: String,
    pub lang2: String,
}

impl TokenPair {
    pub fn new(lang1: impl Into<String>, lang2: impl Into<String>) -> Self {
        Self {
            lang1: lang1.into(),
            lang2: lang2.into(),
        }
    }
}

/// A translation entry: an ordered set of token pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEntry {
    pub pairs: Vec<TokenPair>,
}

impl PairEntry {
    pub fn new(pairs: Vec<TokenPair>) -> Self {
        Self { pairs }
    }
}

impl RafCodec for PairEntry {
    fn read<R: Read + Seek>(reader: &mut R, _index: u32) -> Result<Self> {
        let count = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
        if count < 0 {
            return Err(DictError::Corrupt(format!(
                "negative pair count: {}",
                count
            )));
        }
        // The declared count is untrusted; cap the pre-allocation and let
        // the vec grow, so a corrupt count fails on its first short read
        // instead of reserving gigabytes up front.
        let mut pairs = Vec::with_capacity((count as usize).min(256));
        for _ in 0..count {
            let lang1 = utils::read_string(reader)?;
            let lang2 = utils::read_string(reader)?;
            pairs.push(TokenPair { lang1, lang2 });
        }
        Ok(Self { pairs })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.pairs.len() as i32)?;
        for pair in &self.pairs {
            utils::write_string(writer, &pair.lang1)?;
            utils::write_string(writer, &pair.lang2)?;
        }
        Ok(())
    }
}

/// A free-form annotation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub text: String,
}

impl TextEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl RafCodec for TextEntry {
    fn read<R: Read + Seek>(reader: &mut R, _index: u32) -> Result<Self> {
        Ok(Self {
            text: utils::read_string(reader)?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        utils::write_string(writer, &self.text)
    }
}

/// A rich-content entry. The html body is stored deflate-compressed.
///
/// An html entry tracks its own position within the html section so other
/// structures can reference it positionally; the position is -1 until the
/// entry has been attached to its owning list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlEntry {
    pub title: String,
    pub html: String,
    index: i32,
}

impl HtmlEntry {
    pub fn new(title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            html: html.into(),
            index: -1,
        }
    }

    /// This entry's position within the html section, or -1 if it has not
    /// been assigned one yet.
    pub fn index(&self) -> i32 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: i32) {
        self.index = index;
    }
}

impl RafCodec for HtmlEntry {
    fn read<R: Read + Seek>(reader: &mut R, index: u32) -> Result<Self> {
        let title = utils::read_string(reader)?;
        let compressed_len = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
        if compressed_len < 0 {
            return Err(DictError::Corrupt(format!(
                "negative html payload length: {}",
                compressed_len
            )));
        }
        let mut compressed = vec![0u8; compressed_len as usize];
        reader.read_exact(&mut compressed).map_err(utils::decode_err)?;

        let mut html_bytes = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut html_bytes)
            .map_err(|e| DictError::Corrupt(format!("html payload decompression failed: {}", e)))?;
        let html = String::from_utf8(html_bytes)
            .map_err(|e| DictError::Corrupt(format!("invalid UTF-8 in html payload: {}", e)))?;

        Ok(Self {
            title,
            html,
            index: index as i32,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        utils::write_string(writer, &self.title)?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(self.html.as_bytes())?;
        let compressed = encoder.finish()?;
        writer.write_i32::<BigEndian>(compressed.len() as i32)?;
        writer.write_all(&compressed)?;
        Ok(())
    }
}

/// Which section an [`EntryRef`] points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Pair = 0,
    Text = 1,
    Html = 2,
}

impl EntryKind {
    pub(crate) fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for EntryKind {
    type Error = DictError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Pair),
            1 => Ok(Self::Text),
            2 => Ok(Self::Html),
            _ => Err(DictError::Corrupt(format!(
                "unknown entry kind tag: {}",
                value
            ))),
        }
    }
}

/// A positional reference to an entry in one of the content sections.
///
/// Persisted as a kind tag plus an integer position; resolved back into a
/// live entry through the owning [`Dictionary`](super::Dictionary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    pub kind: EntryKind,
    pub position: u32,
}

impl EntryRef {
    pub fn to_pair(position: u32) -> Self {
        Self {
            kind: EntryKind::Pair,
            position,
        }
    }

    pub fn to_text(position: u32) -> Self {
        Self {
            kind: EntryKind::Text,
            position,
        }
    }

    /// Reference an html entry by its own reported position.
    ///
    /// # Panics
    /// Panics if the entry has not been assigned a position yet. That is
    /// a defect in the building tool (indices constructed before entry
    /// positions were finalized), not a recoverable data error.
    pub fn to_html(entry: &HtmlEntry) -> Self {
        let index = entry.index();
        assert!(
            index >= 0,
            "html entry '{}' referenced before being assigned a position",
            entry.title
        );
        Self {
            kind: EntryKind::Html,
            position: index as u32,
        }
    }
}

/// A resolved entry, polymorphic over the content variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Pair(PairEntry),
    Text(TextEntry),
    Html(HtmlEntry),
}
