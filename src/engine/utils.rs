//! Low-level byte reading and writing utilities.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::error::{DictError, Result};

/// Classify an I/O error raised while decoding the format.
///
/// Every size in the format is declared before the bytes it governs, so a
/// short read always means the file is truncated or misaligned rather than
/// that the medium failed. Genuine external faults keep their `Io` identity.
pub fn decode_err(e: io::Error) -> DictError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DictError::Corrupt("unexpected end of file".to_string())
    } else {
        DictError::Io(e)
    }
}

/// Read a length-prefixed UTF-8 string: `u16` big-endian byte length,
/// then that many bytes.
pub fn read_string(reader: &mut impl Read) -> Result<String> {
    let len = reader.read_u16::<BigEndian>().map_err(decode_err)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).map_err(decode_err)?;
    String::from_utf8(bytes)
        .map_err(|e| DictError::Corrupt(format!("invalid UTF-8 in string field: {}", e)))
}

/// Write a length-prefixed UTF-8 string.
///
/// Strings longer than `u16::MAX` bytes cannot be represented by the
/// length prefix and fail with an I/O fault instead of being truncated.
pub fn write_string(writer: &mut impl Write, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string too long for u16 length prefix: {} bytes", bytes.len()),
        )
        .into());
    }
    writer.write_u16::<BigEndian>(bytes.len() as u16)?;
    writer.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn string_round_trip() {
        for s in ["", "run", "läufen", "多语言"] {
            let mut buf = Vec::new();
            write_string(&mut buf, s).unwrap();
            let got = read_string(&mut Cursor::new(&buf)).unwrap();
            assert_eq!(s, got);
        }
    }

    #[test]
    fn oversize_string_is_rejected() {
        let long = "x".repeat(u16::MAX as usize + 1);
        let err = write_string(&mut Vec::new(), &long).unwrap_err();
        assert!(matches!(err, DictError::Io(_)));
    }

    #[test]
    fn truncated_string_is_corruption() {
        let mut buf = Vec::new();
        write_string(&mut buf, "dictionary").unwrap();
        buf.truncate(buf.len() - 3);
        let err = read_string(&mut Cursor::new(&buf)).unwrap_err();
        assert!(err.is_corruption());
    }
}
