//! Random-access list: the on-disk building block for every section.
//!
//! A `RafList` region encodes an ordered sequence of variable-length
//! elements so that any element can be located and decoded without
//! touching the others:
//!
//! ```text
//! [4 bytes]        element count (big-endian i32)
//! [8 × (count+1)]  absolute file offsets (big-endian u64);
//!                  offsets[i] is the start of element i's payload,
//!                  offsets[count] is the first byte after the section
//! [N bytes]        concatenated element payloads
//! ```
//!
//! Attaching reads only the count and the offset table (O(count) memory),
//! then hands out `get(i)` calls that seek and decode on demand.

use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::trace;
use parking_lot::Mutex;

use super::error::{DictError, Result};
use super::utils;

/// Encode/decode contract for one element of a [`RafList`].
///
/// `read` receives the element's own position within its list, which is
/// how positional entries (html) learn where they live without a second
/// pass over the section.
pub trait RafCodec: Sized {
    fn read<R: Read + Seek>(reader: &mut R, index: u32) -> Result<Self>;
    fn write<W: Write>(&self, writer: &mut W) -> Result<()>;
}

/// A lazily-decoded, index-addressable sequence backed by a file region.
///
/// The file handle is shared behind a mutex so one opened dictionary can
/// serve concurrent lookups; each `get` holds the lock for a single
/// seek-and-decode.
#[derive(Debug)]
pub struct RafList<F, T> {
    file: Arc<Mutex<F>>,
    /// `len() + 1` absolute offsets; the final entry is the end offset.
    offsets: Vec<u64>,
    _marker: PhantomData<T>,
}

impl<F: Read + Seek, T: RafCodec> RafList<F, T> {
    /// Attach to an existing list region starting at `start_offset`.
    ///
    /// Reads the count and offset table, validates them, and leaves the
    /// reader positioned at the section's end offset so the next section
    /// can be read sequentially. No payload is decoded.
    pub fn attach(file: Arc<Mutex<F>>, start_offset: u64) -> Result<Self> {
        let offsets = {
            let mut guard = file.lock();
            let reader = &mut *guard;
            reader.seek(SeekFrom::Start(start_offset))?;

            let count = reader.read_i32::<BigEndian>().map_err(utils::decode_err)?;
            if count < 0 {
                return Err(DictError::Corrupt(format!(
                    "negative element count: {}",
                    count
                )));
            }

            // The count is untrusted; reject one whose offset table alone
            // would overrun the file before allocating anything for it.
            let file_len = reader.seek(SeekFrom::End(0))?;
            let table_end = start_offset + 4 + 8 * (count as u64 + 1);
            if table_end > file_len {
                return Err(DictError::Corrupt(format!(
                    "declared count {} needs {} table bytes but file ends at {}",
                    count, table_end, file_len
                )));
            }
            reader.seek(SeekFrom::Start(start_offset + 4))?;

            let mut offsets = Vec::with_capacity(count as usize + 1);
            for _ in 0..=count {
                offsets.push(reader.read_u64::<BigEndian>().map_err(utils::decode_err)?);
            }

            // The first payload must begin exactly where the table ends.
            if offsets[0] != table_end {
                return Err(DictError::Corrupt(format!(
                    "offset table misaligned: first payload at {}, table ends at {}",
                    offsets[0], table_end
                )));
            }
            for window in offsets.windows(2) {
                if window[1] < window[0] {
                    return Err(DictError::Corrupt(format!(
                        "offset table not monotonic: {} after {}",
                        window[1], window[0]
                    )));
                }
            }
            if offsets[count as usize] > file_len {
                return Err(DictError::Corrupt(format!(
                    "section end offset {} beyond file length {}",
                    offsets[count as usize], file_len
                )));
            }

            reader.seek(SeekFrom::Start(offsets[count as usize]))?;
            trace!(
                "Attached list: {} elements, bytes [{}, {})",
                count,
                start_offset,
                offsets[count as usize]
            );
            offsets
        };

        Ok(Self {
            file,
            offsets,
            _marker: PhantomData,
        })
    }

    /// Number of elements in the list.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The offset immediately following this section's last byte.
    pub fn end_offset(&self) -> u64 {
        *self.offsets.last().unwrap_or(&0)
    }

    /// Seek to element `index` and decode it.
    pub fn get(&self, index: usize) -> Result<T> {
        if index >= self.len() {
            return Err(DictError::Corrupt(format!(
                "element index {} out of range (count {})",
                index,
                self.len()
            )));
        }
        let mut guard = self.file.lock();
        let reader = &mut *guard;
        reader.seek(SeekFrom::Start(self.offsets[index]))?;
        T::read(reader, index as u32)
    }

    /// Decode every element front to back. Used for small sections that
    /// are materialized eagerly; bulk sections go through the cache.
    pub fn read_all(&self) -> Result<Vec<T>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

/// Write `items` as a list region at the writer's current position,
/// leaving the writer positioned immediately after the section.
pub fn write<W: Write + Seek, T: RafCodec>(writer: &mut W, items: &[T]) -> Result<()> {
    let start = writer.stream_position()?;
    writer.write_i32::<BigEndian>(items.len() as i32)?;

    // Reserve the offset table; it is backfilled once payload offsets
    // are known.
    let table_pos = writer.stream_position()?;
    for _ in 0..=items.len() {
        writer.write_u64::<BigEndian>(0)?;
    }

    let mut offsets = Vec::with_capacity(items.len() + 1);
    for item in items {
        offsets.push(writer.stream_position()?);
        item.write(writer)?;
    }
    let end = writer.stream_position()?;
    offsets.push(end);

    writer.seek(SeekFrom::Start(table_pos))?;
    for offset in &offsets {
        writer.write_u64::<BigEndian>(*offset)?;
    }
    writer.seek(SeekFrom::Start(end))?;
    trace!("Wrote list: {} elements, bytes [{}, {})", items.len(), start, end);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    impl RafCodec for String {
        fn read<R: Read + Seek>(reader: &mut R, _index: u32) -> Result<Self> {
            utils::read_string(reader)
        }

        fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
            utils::write_string(writer, self)
        }
    }

    fn sample() -> Vec<String> {
        vec![
            String::new(),
            "a".to_string(),
            "x".repeat(4000),
            "mixed päyload 多语言".to_string(),
        ]
    }

    #[test]
    fn random_access_matches_written_elements() {
        let items = sample();
        let mut cursor = Cursor::new(Vec::new());
        write(&mut cursor, &items).unwrap();

        let file = Arc::new(Mutex::new(cursor));
        let list: RafList<_, String> = RafList::attach(file, 0).unwrap();
        assert_eq!(items.len(), list.len());
        // Out-of-order access, repeated access.
        for &i in &[3usize, 0, 2, 1, 2, 0] {
            assert_eq!(items[i], list.get(i).unwrap());
        }
    }

    #[test]
    fn attach_leaves_reader_at_end_offset() {
        let mut cursor = Cursor::new(Vec::new());
        write(&mut cursor, &sample()).unwrap();
        let section_end = cursor.stream_position().unwrap();
        utils::write_string(&mut cursor, "next section").unwrap();

        let file = Arc::new(Mutex::new(cursor));
        let list: RafList<_, String> = RafList::attach(Arc::clone(&file), 0).unwrap();
        assert_eq!(section_end, list.end_offset());
        let next = utils::read_string(&mut *file.lock()).unwrap();
        assert_eq!("next section", next);
    }

    #[test]
    fn empty_list_round_trips() {
        let mut cursor = Cursor::new(Vec::new());
        write::<_, String>(&mut cursor, &[]).unwrap();
        let list: RafList<_, String> =
            RafList::attach(Arc::new(Mutex::new(cursor)), 0).unwrap();
        assert_eq!(0, list.len());
        assert!(list.get(0).is_err());
    }

    #[test]
    fn negative_count_is_corruption() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(-2i32).to_be_bytes());
        let err = RafList::<_, String>::attach(Arc::new(Mutex::new(Cursor::new(buf))), 0)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn misaligned_offset_table_is_corruption() {
        let mut cursor = Cursor::new(Vec::new());
        write(&mut cursor, &sample()).unwrap();
        let mut bytes = cursor.into_inner();
        // Shift the first payload offset forward by one byte.
        let first = u64::from_be_bytes(bytes[4..12].try_into().unwrap());
        bytes[4..12].copy_from_slice(&(first + 1).to_be_bytes());

        let err = RafList::<_, String>::attach(Arc::new(Mutex::new(Cursor::new(bytes))), 0)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn decreasing_offsets_are_corruption() {
        let mut cursor = Cursor::new(Vec::new());
        write(&mut cursor, &sample()).unwrap();
        let mut bytes = cursor.into_inner();
        // Swap the second and third offsets.
        let (a, b) = (12usize, 20usize);
        let second: [u8; 8] = bytes[a..a + 8].try_into().unwrap();
        let third: [u8; 8] = bytes[b..b + 8].try_into().unwrap();
        bytes[a..a + 8].copy_from_slice(&third);
        bytes[b..b + 8].copy_from_slice(&second);

        let err = RafList::<_, String>::attach(Arc::new(Mutex::new(Cursor::new(bytes))), 0)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn huge_declared_count_fails_before_allocating() {
        // A count near i32::MAX would need a multi-GiB offset table; the
        // length cross-check must reject it from the 68 bytes on hand.
        let mut buf = Vec::new();
        buf.extend_from_slice(&i32::MAX.to_be_bytes());
        buf.extend_from_slice(&[0u8; 64]);
        let err = RafList::<_, String>::attach(Arc::new(Mutex::new(Cursor::new(buf))), 0)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn end_offset_beyond_file_length_is_corruption() {
        let mut cursor = Cursor::new(Vec::new());
        write(&mut cursor, &sample()).unwrap();
        let mut bytes = cursor.into_inner();
        // Point the final offset (section end) far past the file.
        let last_offset_pos = 4 + 8 * sample().len();
        bytes[last_offset_pos..last_offset_pos + 8]
            .copy_from_slice(&(1u64 << 40).to_be_bytes());
        let err = RafList::<_, String>::attach(Arc::new(Mutex::new(Cursor::new(bytes))), 0)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn truncated_table_is_corruption() {
        let mut cursor = Cursor::new(Vec::new());
        write(&mut cursor, &sample()).unwrap();
        let mut bytes = cursor.into_inner();
        bytes.truncate(10);
        let err = RafList::<_, String>::attach(Arc::new(Mutex::new(Cursor::new(bytes))), 0)
            .unwrap_err();
        assert!(err.is_corruption());
    }
}
