use std::io::{self, Cursor, Read, Seek, SeekFrom};

fn ensure_remaining(cursor: &Cursor<&[u8]>, needed: u64, what: &str) -> io::Result<()> {
    let len = cursor.get_ref().len() as u64;
    if cursor.position() + needed > len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "Not enough bytes for {} at {:#x} (buffer length: {:#x})",
                what,
                cursor.position(),
                len
            ),
        ));
    }
    Ok(())
}

pub fn read_u8(cursor: &mut Cursor<&[u8]>) -> io::Result<u8> {
    ensure_remaining(cursor, 1, "u8")?;

    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16_le(cursor: &mut Cursor<&[u8]>) -> io::Result<u16> {
    ensure_remaining(cursor, 2, "u16")?;

    let mut buf = [0u8; 2];
    cursor.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_i16_le(cursor: &mut Cursor<&[u8]>) -> io::Result<i16> {
    ensure_remaining(cursor, 2, "i16")?;

    let mut buf = [0u8; 2];
    cursor.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

pub fn read_u32_le(cursor: &mut Cursor<&[u8]>) -> io::Result<u32> {
    ensure_remaining(cursor, 4, "u32")?;

    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads a word of `width` bytes (2 or 4) and widens it to u32.
pub fn read_word_le(cursor: &mut Cursor<&[u8]>, width: usize) -> io::Result<u32> {
    match width {
        2 => read_u16_le(cursor).map(u32::from),
        4 => read_u32_le(cursor),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Unsupported word width {}", width),
        )),
    }
}

pub fn seek_to(cursor: &mut Cursor<&[u8]>, position: u64) -> io::Result<()> {
    if position > cursor.get_ref().len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Cannot seek to position {:#x} (buffer length: {:#x})",
                position,
                cursor.get_ref().len()
            ),
        ));
    }

    cursor.seek(SeekFrom::Start(position))?;
    Ok(())
}

/// Moves the cursor forward by `count` bytes without reading them.
pub fn skip(cursor: &mut Cursor<&[u8]>, count: u64) -> io::Result<()> {
    let target = cursor.position() + count;
    seek_to(cursor, target)
}

/// Advances to the next multiple of `alignment`. Returns the number of bytes skipped.
pub fn align_to(cursor: &mut Cursor<&[u8]>, alignment: u64) -> io::Result<u64> {
    let misalignment = cursor.position() % alignment;
    if misalignment == 0 {
        return Ok(0);
    }
    let padding = alignment - misalignment;
    skip(cursor, padding)?;
    Ok(padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_words() {
        let data = [0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(read_u16_le(&mut cursor).unwrap(), 0x1234);
        assert_eq!(read_i16_le(&mut cursor).unwrap(), -2);
        assert_eq!(read_u32_le(&mut cursor).unwrap(), 0x1234_5678);
        assert!(read_u8(&mut cursor).is_err());
    }

    #[test]
    fn short_reads_do_not_move_the_cursor() {
        let data = [0x01];
        let mut cursor = Cursor::new(&data[..]);
        assert!(read_u16_le(&mut cursor).is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn align_skips_to_boundary() {
        let data = [0u8; 16];
        let mut cursor = Cursor::new(&data[..]);
        skip(&mut cursor, 6).unwrap();
        assert_eq!(align_to(&mut cursor, 4).unwrap(), 2);
        assert_eq!(cursor.position(), 8);
        assert_eq!(align_to(&mut cursor, 4).unwrap(), 0);
    }
}
