use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

use super::MAX_BUFFS;

/// Writes a string as length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    let bytes = s.as_bytes();
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

/// Reads a length-prefixed UTF-8 string, rejecting anything longer than `max_len`.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

pub fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

pub fn write_buffs(buffs: &[u32], writer: &mut impl BufMut) {
    buffs.to_vec().write(writer);
}

pub fn read_buffs(reader: &mut impl Buf) -> Result<Vec<u32>, Error> {
    Vec::<u32>::read_range(reader, 0..=MAX_BUFFS)
}

pub fn buffs_encode_size(buffs: &[u32]) -> usize {
    buffs.to_vec().encode_size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn read_string_rejects_too_long() {
        let mut buf = BytesMut::new();
        (5u32).write(&mut buf);
        buf.extend_from_slice(b"hello");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("should reject too-long string");
        assert!(matches!(err, Error::Invalid("String", "too long")));
    }

    #[test]
    fn read_string_rejects_truncated_buffers() {
        let mut buf = BytesMut::new();
        (3u32).write(&mut buf);
        buf.extend_from_slice(b"ab");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 10).expect_err("should reject truncated buffer");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn read_buffs_rejects_oversized_lists() {
        let mut buf = BytesMut::new();
        write_buffs(&vec![1u32; MAX_BUFFS + 1], &mut buf);

        let mut reader = buf.as_ref();
        assert!(read_buffs(&mut reader).is_err());
    }

    #[test]
    fn buffs_encode_size_matches_written_bytes() {
        let buffs = vec![0u32, 7, 1_000_000];
        let mut buf = BytesMut::new();
        write_buffs(&buffs, &mut buf);
        assert_eq!(buf.len(), buffs_encode_size(&buffs));

        let mut reader = buf.as_ref();
        assert_eq!(read_buffs(&mut reader).unwrap(), buffs);
    }
}
