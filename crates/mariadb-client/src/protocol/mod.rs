//! Wire-level vocabulary of the client/server protocol.
//!
//! Every message travels in a packet with a 4-byte header:
//! - 3 bytes: payload length (little-endian)
//! - 1 byte: sequence id
//!
//! A payload of 2^24 - 1 bytes or more is split across several packets; a
//! packet whose length is exactly 2^24 - 1 is always followed by another one
//! (possibly empty).

pub mod reader;
pub mod writer;

pub use reader::PacketReader;
pub use writer::{PacketWriter, frame_packet};

use mariadb_core::error::ServerError;

/// Maximum payload carried by a single packet (2^24 - 1 bytes).
pub const MAX_PACKET_SIZE: usize = 0xFF_FF_FF;

/// Capability flags exchanged during the handshake.
///
/// Bits the client does not know about are kept in the negotiated set but
/// never acted upon.
pub mod capabilities {
    pub const CLIENT_LONG_PASSWORD: u32 = 1;
    pub const CLIENT_FOUND_ROWS: u32 = 1 << 1;
    pub const CLIENT_LONG_FLAG: u32 = 1 << 2;
    pub const CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
    pub const CLIENT_COMPRESS: u32 = 1 << 5;
    pub const CLIENT_LOCAL_FILES: u32 = 1 << 7;
    pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
    pub const CLIENT_INTERACTIVE: u32 = 1 << 10;
    pub const CLIENT_SSL: u32 = 1 << 11;
    pub const CLIENT_TRANSACTIONS: u32 = 1 << 13;
    pub const CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
    pub const CLIENT_MULTI_STATEMENTS: u32 = 1 << 16;
    pub const CLIENT_MULTI_RESULTS: u32 = 1 << 17;
    pub const CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
    pub const CLIENT_CONNECT_ATTRS: u32 = 1 << 20;
    pub const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 1 << 21;
    pub const CLIENT_SESSION_TRACK: u32 = 1 << 23;
    pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

    /// Capabilities requested on every connection.
    ///
    /// Multi-statement and multi-result support are left out: a single
    /// command yields exactly one response.
    pub const DEFAULT_CLIENT_FLAGS: u32 = CLIENT_PROTOCOL_41
        | CLIENT_SECURE_CONNECTION
        | CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_TRANSACTIONS
        | CLIENT_PLUGIN_AUTH
        | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
        | CLIENT_DEPRECATE_EOF;
}

/// Command bytes (`COM_xxx`) the session can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Close the connection
    Quit = 0x01,
    /// Change the default schema
    InitDb = 0x02,
    /// Text protocol statement
    Query = 0x03,
    /// Liveness check
    Ping = 0x0e,
}

impl Command {
    pub const fn name(self) -> &'static str {
        match self {
            Command::Quit => "COM_QUIT",
            Command::InitDb => "COM_INIT_DB",
            Command::Query => "COM_QUERY",
            Command::Ping => "COM_PING",
        }
    }
}

/// Server status flags reported in OK and EOF packets.
pub mod server_status {
    pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
    pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;
    pub const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;
    pub const SERVER_STATUS_NO_BACKSLASH_ESCAPES: u16 = 0x0200;
    pub const SERVER_SESSION_STATE_CHANGED: u16 = 0x4000;
}

/// Character set / collation ids.
pub mod charset {
    pub const LATIN1_SWEDISH_CI: u8 = 8;
    pub const UTF8_GENERAL_CI: u8 = 33;
    pub const UTF8MB4_GENERAL_CI: u8 = 45;
    pub const BINARY: u8 = 63;
    pub const UTF8MB4_UNICODE_CI: u8 = 224;

    /// `utf8mb4_general_ci` is understood by both MariaDB and MySQL servers.
    pub const DEFAULT_CHARSET: u8 = UTF8MB4_GENERAL_CI;
}

/// Header of a single packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Payload length (3 bytes on the wire)
    pub payload_length: u32,
    /// Sequence id (wraps at 255)
    pub sequence_id: u8,
}

impl PacketHeader {
    pub const SIZE: usize = 4;

    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        Self {
            payload_length: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]),
            sequence_id: bytes[3],
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let len = self.payload_length.to_le_bytes();
        [len[0], len[1], len[2], self.sequence_id]
    }
}

/// Status carried by an OK packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkStatus {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
    /// Human-readable info string (e.g. "Rows matched: 1  Changed: 1")
    pub info: String,
}

/// Payload of an ERR packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerErrorPacket {
    pub code: u16,
    /// Five-character SQLSTATE, empty when the server omitted it
    pub sqlstate: String,
    pub message: String,
}

impl ServerErrorPacket {
    /// Convert into the error type surfaced to callers.
    pub fn into_server_error(self) -> ServerError {
        ServerError::new(self.code, self.sqlstate, self.message)
    }
}

/// Trailing status of a result set (classic EOF or OK-as-EOF).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndOfResults {
    pub status_flags: u16,
    pub warnings: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_little_endian() {
        let header = PacketHeader {
            payload_length: 0x0012_3456,
            sequence_id: 7,
        };
        assert_eq!(header.to_bytes(), [0x56, 0x34, 0x12, 7]);
        assert_eq!(PacketHeader::from_bytes(&header.to_bytes()), header);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn header_max_size() {
        let header = PacketHeader {
            payload_length: MAX_PACKET_SIZE as u32,
            sequence_id: 255,
        };
        assert_eq!(header.to_bytes(), [0xFF, 0xFF, 0xFF, 255]);
    }

    #[test]
    fn default_flags_exclude_multi_results() {
        use capabilities::*;
        assert_ne!(DEFAULT_CLIENT_FLAGS & CLIENT_PROTOCOL_41, 0);
        assert_eq!(DEFAULT_CLIENT_FLAGS & CLIENT_MULTI_STATEMENTS, 0);
        assert_eq!(DEFAULT_CLIENT_FLAGS & CLIENT_MULTI_RESULTS, 0);
        assert_eq!(DEFAULT_CLIENT_FLAGS & CLIENT_LOCAL_FILES, 0);
    }

    #[test]
    fn err_packet_converts_to_server_error() {
        let packet = ServerErrorPacket {
            code: 1007,
            sqlstate: "HY000".to_string(),
            message: "Can't create database 'testdb'; database exists".to_string(),
        };
        let err = packet.into_server_error();
        assert_eq!(err.code, 1007);
        assert_eq!(err.sqlstate, "HY000");
    }
}
