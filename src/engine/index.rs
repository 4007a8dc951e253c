//! Lookup indices: named, ordered token tables over the entry sections.

use std::io::{Read, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::entry::{EntryKind, EntryRef};
use super::error::{DictError, Result};
use super::raf::RafCodec;
use super::utils;

/// One lookup token and the entries it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexToken {
    pub token: String,
    pub refs: Vec<EntryRef>,
}

impl IndexToken {
    pub fn new(token: impl Into<String>, refs: Vec<EntryRef>) -> Self {
        Self {
            token: token.into(),
            refs,
        }
    }
}

/// A per-language/per-ordering view over the entry collections.
///
/// Tokens are stored in the index's own sort order; each maps to one or
/// more positional entry references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub short_name: String,
    pub long_name: String,
    pub tokens: Vec<IndexToken>,
}

impl Index {
    pub fn new(
        short_name: impl Into<String>,
        long_name: impl Into<String>,
        tokens: Vec<IndexToken>,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            long_name: long_name.into(),
            tokens,
        }
    }

    /// Lightweight summary for catalog listings.
    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            short_name: self.short_name.clone(),
            long_name: self.long_name.clone(),
            num_tokens: self.tokens.len(),
        }
    }
}

impl RafCodec for Index {
    fn read<R: Read + Seek>(reader: &mut R, _index: u32) -> Result<Self> {
        let short_name = utils::read_string(reader)?;
        let long_name = utils::read_string(reader)?;
        let token_count = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
        if token_count < 0 {
            return Err(DictError::Corrupt(format!(
                "negative token count in index '{}': {}",
                short_name, token_count
            )));
        }
        // Counts are untrusted; cap pre-allocations so a corrupt count
        // fails on its first short read instead of reserving gigabytes.
        let mut tokens = Vec::with_capacity((token_count as usize).min(4096));
        for _ in 0..token_count {
            let token = utils::read_string(reader)?;
            let ref_count = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
            if ref_count < 0 {
                return Err(DictError::Corrupt(format!(
                    "negative reference count for token '{}': {}",
                    token, ref_count
                )));
            }
            let mut refs = Vec::with_capacity((ref_count as usize).min(256));
            for _ in 0..ref_count {
                let tag = reader.read_u8().map_err(utils::decode_err)?;
                let position = reader.read_u32::<BigEndian>().map_err(utils::decode_err)?;
                refs.push(EntryRef {
                    kind: EntryKind::try_from(tag)?,
                    position,
                });
            }
            tokens.push(IndexToken { token, refs });
        }
        Ok(Self {
            short_name,
            long_name,
            tokens,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        utils::write_string(writer, &self.short_name)?;
        utils::write_string(writer, &self.long_name)?;
        writer.write_i32::<BigEndian>(self.tokens.len() as i32)?;
        for token in &self.tokens {
            utils::write_string(writer, &token.token)?;
            writer.write_i32::<BigEndian>(token.refs.len() as i32)?;
            for entry_ref in &token.refs {
                writer.write_u8(entry_ref.kind.tag())?;
                writer.write_u32::<BigEndian>(entry_ref.position)?;
            }
        }
        Ok(())
    }
}

/// Summary of one index: its name pair and token cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub short_name: String,
    pub long_name: String,
    pub num_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn index_round_trip() {
        let index = Index::new(
            "en",
            "German index",
            vec![
                IndexToken::new("run", vec![EntryRef::to_pair(0), EntryRef::to_text(3)]),
                IndexToken::new("walk", vec![]),
            ],
        );
        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let read_back = Index::read(&mut Cursor::new(&buf), 0).unwrap();
        assert_eq!(index, read_back);
    }

    #[test]
    fn huge_token_count_fails_without_exhausting_memory() {
        let mut buf = Vec::new();
        utils::write_string(&mut buf, "en").unwrap();
        utils::write_string(&mut buf, "German index").unwrap();
        buf.extend_from_slice(&i32::MAX.to_be_bytes());
        let err = Index::read(&mut Cursor::new(&buf), 0).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn unknown_kind_tag_is_corruption() {
        let index = Index::new(
            "en",
            "German index",
            vec![IndexToken::new("run", vec![EntryRef::to_pair(0)])],
        );
        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        // The kind tag is the 5th byte from the end (tag + u32 position).
        let tag_pos = buf.len() - 5;
        buf[tag_pos] = 0x7f;
        let err = Index::read(&mut Cursor::new(&buf), 0).unwrap_err();
        assert!(err.is_corruption());
    }
}
