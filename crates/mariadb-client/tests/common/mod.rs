//! In-memory server double for session tests.
//!
//! A [`Script`] lays out the exact bytes a server would send, with the
//! sequence ids a real server would use. The resulting [`ScriptedStream`]
//! replays them and reports end-of-stream once they run out, which the
//! session sees as a dropped connection.

#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use mariadb_client::protocol::capabilities::{
    CLIENT_CONNECT_ATTRS, CLIENT_CONNECT_WITH_DB, CLIENT_DEPRECATE_EOF, DEFAULT_CLIENT_FLAGS,
};
use mariadb_client::protocol::{PacketWriter, charset, frame_packet, server_status};
use mariadb_client::types::column_flags;
use mariadb_client::{ClientConfig, FieldType, Session};

/// Capabilities of a current MariaDB server.
pub const SERVER_CAPS: u32 = DEFAULT_CLIENT_FLAGS | CLIENT_CONNECT_WITH_DB | CLIENT_CONNECT_ATTRS;

/// Same server, but without `CLIENT_DEPRECATE_EOF`.
pub const LEGACY_SERVER_CAPS: u32 = SERVER_CAPS & !CLIENT_DEPRECATE_EOF;

pub const SCRAMBLE: &[u8; 20] = b"abcdefghijklmnopqrst";

/// Bytes written by the client, shared with the test.
#[derive(Clone, Default)]
pub struct Written(Arc<Mutex<Vec<u8>>>);

impl Written {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    /// Split the recorded bytes back into `(sequence id, payload)` packets.
    pub fn packets(&self) -> Vec<(u8, Vec<u8>)> {
        let bytes = self.bytes();
        let mut out = Vec::new();
        let mut rest = bytes.as_slice();
        while rest.len() >= 4 {
            let len = usize::from(rest[0]) | usize::from(rest[1]) << 8 | usize::from(rest[2]) << 16;
            out.push((rest[3], rest[4..4 + len].to_vec()));
            rest = &rest[4 + len..];
        }
        out
    }
}

pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    written: Written,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builder for the server side of a conversation.
pub struct Script {
    bytes: Vec<u8>,
    seq: u8,
    caps: u32,
}

impl Script {
    /// Greeting announcing `plugin`, with the given server capabilities.
    pub fn greeting(plugin: &str, caps: u32) -> Self {
        let mut w = PacketWriter::new();
        w.write_u8(10);
        w.write_null_string("11.4.2-MariaDB");
        w.write_u32_le(7);
        w.write_bytes(&SCRAMBLE[..8]);
        w.write_u8(0);
        w.write_u16_le((caps & 0xFFFF) as u16);
        w.write_u8(charset::UTF8MB4_GENERAL_CI);
        w.write_u16_le(server_status::SERVER_STATUS_AUTOCOMMIT);
        w.write_u16_le((caps >> 16) as u16);
        w.write_u8(21);
        w.write_zeros(10);
        w.write_bytes(&SCRAMBLE[8..]);
        w.write_u8(0);
        w.write_null_string(plugin);

        let script = Self {
            bytes: Vec::new(),
            seq: 0,
            caps,
        };
        script.packet(w.as_bytes())
    }

    /// Greeting plus a successful native-password login.
    pub fn connected() -> Self {
        Self::connected_with(SERVER_CAPS)
    }

    pub fn connected_with(caps: u32) -> Self {
        Self::greeting("mysql_native_password", caps).client().ok()
    }

    /// Append one server packet with the next sequence id.
    pub fn packet(mut self, payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&frame_packet(payload, self.seq));
        self.seq = self.seq.wrapping_add(1);
        self
    }

    /// The client sends one packet here.
    pub fn client(mut self) -> Self {
        self.seq = self.seq.wrapping_add(1);
        self
    }

    /// The client starts a new command here.
    pub fn command(mut self) -> Self {
        self.seq = 1;
        self
    }

    pub fn ok(self) -> Self {
        self.ok_with(0, 0)
    }

    pub fn ok_with(self, affected_rows: u64, last_insert_id: u64) -> Self {
        let mut w = PacketWriter::new();
        w.write_u8(0x00);
        w.write_lenenc_int(affected_rows);
        w.write_lenenc_int(last_insert_id);
        w.write_u16_le(server_status::SERVER_STATUS_AUTOCOMMIT);
        w.write_u16_le(0);
        self.packet(w.as_bytes())
    }

    pub fn err(self, code: u16, sqlstate: &str, message: &str) -> Self {
        let mut w = PacketWriter::new();
        w.write_u8(0xFF);
        w.write_u16_le(code);
        w.write_u8(b'#');
        w.write_bytes(sqlstate.as_bytes());
        w.write_bytes(message.as_bytes());
        self.packet(w.as_bytes())
    }

    /// Column count, column definitions and (for legacy servers) the EOF
    /// that follows them.
    pub fn columns(mut self, columns: &[(&str, FieldType)]) -> Self {
        let mut count = PacketWriter::new();
        count.write_lenenc_int(columns.len() as u64);
        self = self.packet(count.as_bytes());
        for (name, ty) in columns {
            self = self.column(name, *ty);
        }
        if self.caps & CLIENT_DEPRECATE_EOF == 0 {
            self = self.eof();
        }
        self
    }

    fn column(self, name: &str, ty: FieldType) -> Self {
        let mut w = PacketWriter::new();
        for part in ["def", "", "", "", name, ""] {
            w.write_lenenc_string(part);
        }
        w.write_u8(0x0c);
        w.write_u16_le(u16::from(charset::UTF8MB4_GENERAL_CI));
        w.write_u32_le(21);
        w.write_u8(ty as u8);
        let flags = if ty == FieldType::LongLong {
            column_flags::NOT_NULL | column_flags::BINARY | column_flags::NUM
        } else {
            0
        };
        w.write_u16_le(flags);
        w.write_u8(0);
        w.write_zeros(2);
        self.packet(w.as_bytes())
    }

    /// One text-protocol row; `None` is SQL NULL.
    pub fn row(self, cells: &[Option<&str>]) -> Self {
        let mut w = PacketWriter::new();
        for cell in cells {
            match cell {
                Some(text) => w.write_lenenc_string(text),
                None => w.write_null(),
            }
        }
        self.packet(w.as_bytes())
    }

    /// End of a row stream, in whichever form the capabilities call for.
    pub fn end(self) -> Self {
        if self.caps & CLIENT_DEPRECATE_EOF == 0 {
            return self.eof();
        }
        let mut w = PacketWriter::new();
        w.write_u8(0xFE);
        w.write_lenenc_int(0);
        w.write_lenenc_int(0);
        w.write_u16_le(server_status::SERVER_STATUS_AUTOCOMMIT);
        w.write_u16_le(0);
        self.packet(w.as_bytes())
    }

    fn eof(self) -> Self {
        let mut w = PacketWriter::new();
        w.write_u8(0xFE);
        w.write_u16_le(0);
        w.write_u16_le(server_status::SERVER_STATUS_AUTOCOMMIT);
        self.packet(w.as_bytes())
    }

    pub fn into_stream(self) -> (ScriptedStream, Written) {
        let written = Written::default();
        let stream = ScriptedStream {
            input: Cursor::new(self.bytes),
            written: written.clone(),
        };
        (stream, written)
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new().user("root").password("root_pswd")
}

/// A session connected through `script`.
pub fn session(script: Script) -> (Session<ScriptedStream>, Written) {
    let (stream, written) = script.into_stream();
    let mut session = Session::with_config(config());
    session.connect_with(stream).unwrap();
    (session, written)
}
