//! Cursor over a packet payload.
//!
//! All reads are bounds-checked and return `None` on truncation; turning
//! that into a [`ProtocolError`](mariadb_core::error::ProtocolError) is left
//! to the codec, which knows what it was trying to decode.

#![allow(clippy::cast_possible_truncation)]

use crate::protocol::{EndOfResults, OkStatus, ServerErrorPacket};

/// Marker byte for a NULL cell in a text row.
pub const NULL_MARKER: u8 = 0xFB;

#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes: [u8; N] = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn read_u16_le(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    pub fn read_u24_le(&mut self) -> Option<u32> {
        self.take::<3>().map(|[a, b, c]| u32::from_le_bytes([a, b, c, 0]))
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    pub fn read_u64_le(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    /// Read a length-encoded integer.
    ///
    /// - `0x00..=0xFA`: the byte itself
    /// - `0xFC` / `0xFD` / `0xFE`: 2, 3 or 8 little-endian bytes follow
    ///
    /// `0xFB` (NULL) and `0xFF` are not integers and yield `None`.
    pub fn read_lenenc_int(&mut self) -> Option<u64> {
        match self.read_u8()? {
            b @ 0x00..=0xFA => Some(u64::from(b)),
            0xFC => self.read_u16_le().map(u64::from),
            0xFD => self.read_u24_le().map(u64::from),
            0xFE => self.read_u64_le(),
            _ => None,
        }
    }

    pub fn read_lenenc_bytes(&mut self) -> Option<&'a [u8]> {
        let len = usize::try_from(self.read_lenenc_int()?).ok()?;
        self.read_bytes(len)
    }

    pub fn read_lenenc_string(&mut self) -> Option<String> {
        self.read_lenenc_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Read one cell of a text-protocol row.
    ///
    /// Returns `Some(None)` for NULL, `Some(Some(bytes))` for a value and
    /// `None` if the payload is truncated.
    pub fn read_text_cell(&mut self) -> Option<Option<&'a [u8]>> {
        if self.peek()? == NULL_MARKER {
            self.pos += 1;
            return Some(None);
        }
        self.read_lenenc_bytes().map(Some)
    }

    /// Read a NUL-terminated string; a missing terminator consumes the rest.
    pub fn read_null_string(&mut self) -> Option<String> {
        let rest = self.data.get(self.pos..)?;
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let s = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += (end + 1).min(rest.len());
        Some(s)
    }

    pub fn read_string(&mut self, len: usize) -> Option<String> {
        self.read_bytes(len)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn read_rest_string(&mut self) -> String {
        String::from_utf8_lossy(self.read_rest()).into_owned()
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.data.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(bytes)
    }

    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        self.pos = self.data.len();
        rest
    }

    pub fn skip(&mut self, n: usize) -> bool {
        self.read_bytes(n).is_some()
    }

    /// Parse an OK packet (leading `0x00` or `0xFE` marker optional).
    ///
    /// Layout: affected rows (lenenc), last insert id (lenenc), status flags
    /// (2), warnings (2), info (rest).
    pub fn parse_ok_packet(&mut self) -> Option<OkStatus> {
        if matches!(self.peek(), Some(0x00 | 0xFE)) {
            self.pos += 1;
        }
        let affected_rows = self.read_lenenc_int()?;
        let last_insert_id = self.read_lenenc_int()?;
        let status_flags = self.read_u16_le()?;
        let warnings = self.read_u16_le()?;
        let info = self.read_rest_string();
        Some(OkStatus {
            affected_rows,
            last_insert_id,
            status_flags,
            warnings,
            info,
        })
    }

    /// Parse an ERR packet (leading `0xFF` marker optional).
    ///
    /// Layout: code (2), then optionally `#` and a five-byte SQLSTATE, then
    /// the message.
    pub fn parse_err_packet(&mut self) -> Option<ServerErrorPacket> {
        if self.peek() == Some(0xFF) {
            self.pos += 1;
        }
        let code = self.read_u16_le()?;
        let sqlstate = if self.peek() == Some(b'#') {
            self.pos += 1;
            self.read_string(5)?
        } else {
            String::new()
        };
        let message = self.read_rest_string();
        Some(ServerErrorPacket {
            code,
            sqlstate,
            message,
        })
    }

    /// Parse a classic EOF packet: `0xFE`, warnings (2), status flags (2).
    pub fn parse_eof_packet(&mut self) -> Option<EndOfResults> {
        if self.peek() == Some(0xFE) {
            self.pos += 1;
        }
        let warnings = self.read_u16_le()?;
        let status_flags = self.read_u16_le()?;
        Some(EndOfResults {
            status_flags,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_integers() {
        let data = [
            0x42, 0x34, 0x12, 0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 1, 2, 3, 4, 5, 6, 7, 8,
        ];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_u8(), Some(0x42));
        assert_eq!(reader.read_u16_le(), Some(0x1234));
        assert_eq!(reader.read_u24_le(), Some(0x0012_3456));
        assert_eq!(reader.read_u32_le(), Some(0x1234_5678));
        assert_eq!(reader.read_u64_le(), Some(0x0807_0605_0403_0201));
        assert!(reader.is_empty());
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn truncated_reads_do_not_advance() {
        let mut reader = PacketReader::new(&[0x01]);
        assert_eq!(reader.read_u16_le(), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_bytes(2), None);
        assert_eq!(reader.read_u8(), Some(1));
    }

    #[test]
    fn lenenc_int_forms() {
        assert_eq!(PacketReader::new(&[0xFA]).read_lenenc_int(), Some(250));
        assert_eq!(
            PacketReader::new(&[0xFC, 0x34, 0x12]).read_lenenc_int(),
            Some(0x1234)
        );
        assert_eq!(
            PacketReader::new(&[0xFD, 0x56, 0x34, 0x12]).read_lenenc_int(),
            Some(0x0012_3456)
        );
        assert_eq!(
            PacketReader::new(&[0xFE, 1, 2, 3, 4, 5, 6, 7, 8]).read_lenenc_int(),
            Some(0x0807_0605_0403_0201)
        );
        assert_eq!(PacketReader::new(&[0xFB]).read_lenenc_int(), None);
        assert_eq!(PacketReader::new(&[0xFF]).read_lenenc_int(), None);
    }

    #[test]
    fn text_cells_distinguish_null_from_empty() {
        let data = [0xFB, 0x00, 0x02, b'h', b'i', 0x05, b'x'];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_text_cell(), Some(None));
        assert_eq!(reader.read_text_cell(), Some(Some(&b""[..])));
        assert_eq!(reader.read_text_cell(), Some(Some(&b"hi"[..])));
        // Declared length 5 but only one byte left.
        assert_eq!(reader.read_text_cell(), None);
    }

    #[test]
    fn null_terminated_strings() {
        let mut reader = PacketReader::new(b"hello\0world");
        assert_eq!(reader.read_null_string(), Some("hello".to_string()));
        assert_eq!(reader.read_null_string(), Some("world".to_string()));
        assert!(reader.is_empty());
    }

    #[test]
    fn ok_packet() {
        let mut data = vec![0x00, 0x01, 0x2A, 0x02, 0x00, 0x01, 0x00];
        data.extend_from_slice(b"Rows matched: 1");
        let ok = PacketReader::new(&data).parse_ok_packet().unwrap();
        assert_eq!(ok.affected_rows, 1);
        assert_eq!(ok.last_insert_id, 42);
        assert_eq!(ok.status_flags, 2);
        assert_eq!(ok.warnings, 1);
        assert_eq!(ok.info, "Rows matched: 1");
    }

    #[test]
    fn err_packet_with_and_without_sqlstate() {
        let mut data = vec![0xFF, 0xEF, 0x03, b'#'];
        data.extend_from_slice(b"HY000");
        data.extend_from_slice(b"database exists");
        let err = PacketReader::new(&data).parse_err_packet().unwrap();
        assert_eq!(err.code, 1007);
        assert_eq!(err.sqlstate, "HY000");
        assert_eq!(err.message, "database exists");

        let data = [0xFF, 0x10, 0x04, b'T', b'o', b'o'];
        let err = PacketReader::new(&data).parse_err_packet().unwrap();
        assert_eq!(err.code, 1040);
        assert!(err.sqlstate.is_empty());
        assert_eq!(err.message, "Too");
    }

    #[test]
    fn eof_packet() {
        let data = [0xFE, 0x03, 0x00, 0x22, 0x00];
        let eof = PacketReader::new(&data).parse_eof_packet().unwrap();
        assert_eq!(eof.warnings, 3);
        assert_eq!(eof.status_flags, 0x22);
    }
}
