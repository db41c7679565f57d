//! Message codec: bytes to typed protocol messages and back.
//!
//! Everything here is a pure function of its inputs; reading and writing
//! packets is the session's job. Payloads passed in are complete packet
//! payloads with the 4-byte header already stripped and continuation
//! packets already joined.

use mariadb_core::Result;
use mariadb_core::Value;
use mariadb_core::error::{ConnectionError, ConnectionErrorKind, Error, ProtocolError};

use crate::auth::plugins;
use crate::config::ClientConfig;
use crate::protocol::capabilities::{
    CLIENT_CONNECT_ATTRS, CLIENT_CONNECT_WITH_DB, CLIENT_DEPRECATE_EOF, CLIENT_PLUGIN_AUTH,
    CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA, CLIENT_SECURE_CONNECTION,
};
use crate::protocol::{
    Command, EndOfResults, MAX_PACKET_SIZE, OkStatus, PacketReader, PacketWriter,
    ServerErrorPacket, charset,
};
use crate::types::{ColumnDef, FieldType, decode_text_value};

pub use crate::protocol::frame_packet;

/// The only handshake protocol version the client speaks.
pub const PROTOCOL_VERSION: u8 = 10;

const OK_HEADER: u8 = 0x00;
const EOF_HEADER: u8 = 0xFE;
const ERR_HEADER: u8 = 0xFF;
const LOCAL_INFILE_HEADER: u8 = 0xFB;

/// What the server told us in its greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub capabilities: u32,
    pub charset: u8,
    pub status_flags: u16,
    /// Plugin the server expects the first auth response to come from
    pub auth_plugin: String,
    /// Challenge for that plugin (trailing NUL removed)
    pub scramble: Vec<u8>,
}

impl ServerInfo {
    pub fn has_capability(&self, flag: u32) -> bool {
        self.capabilities & flag != 0
    }

    pub fn is_mariadb(&self) -> bool {
        self.server_version.contains("MariaDB")
    }
}

/// Server reply to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok(OkStatus),
    Err(ServerErrorPacket),
    /// A result set follows: column definitions, then rows
    ResultSet(ResultSetHeader),
    /// The server asks the client to upload a local file
    LocalInfile(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSetHeader {
    pub column_count: u64,
}

/// One packet of a text result-set row stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    Row(Vec<Value>),
    End(EndOfResults),
    Err(ServerErrorPacket),
}

/// Server reply during authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthReply {
    Ok(OkStatus),
    Err(ServerErrorPacket),
    /// Restart authentication with another plugin
    Switch { plugin: String, challenge: Vec<u8> },
    /// Plugin-specific continuation (`0x01` prefix stripped)
    MoreData(Vec<u8>),
}

pub(crate) fn protocol_error(message: impl Into<String>, raw: &[u8]) -> Error {
    Error::Protocol(ProtocolError {
        message: message.into(),
        raw_data: Some(raw.to_vec()),
        source: None,
    })
}

fn err_packet(payload: &[u8]) -> Result<ServerErrorPacket> {
    PacketReader::new(payload)
        .parse_err_packet()
        .ok_or_else(|| protocol_error("truncated ERR packet", payload))
}

fn ok_packet(payload: &[u8]) -> Result<OkStatus> {
    PacketReader::new(payload)
        .parse_ok_packet()
        .ok_or_else(|| protocol_error("truncated OK packet", payload))
}

/// Is this a classic EOF packet (`0xFE`, shorter than 9 bytes)?
pub fn is_eof_packet(payload: &[u8]) -> bool {
    payload.first() == Some(&EOF_HEADER) && payload.len() < 9
}

/// Decode the initial handshake packet (protocol version 10).
pub fn decode_greeting(payload: &[u8]) -> Result<ServerInfo> {
    if payload.first() == Some(&ERR_HEADER) {
        let err = err_packet(payload)?;
        return Err(Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Handshake,
            message: format!("server refused the connection: {}", err.message),
            server: Some(err.into_server_error()),
            source: None,
        }));
    }

    let truncated = |what: &str| protocol_error(format!("greeting truncated at {}", what), payload);
    let mut reader = PacketReader::new(payload);

    let protocol_version = reader.read_u8().ok_or_else(|| truncated("protocol version"))?;
    if protocol_version != PROTOCOL_VERSION {
        return Err(protocol_error(
            format!("unsupported protocol version {}", protocol_version),
            payload,
        ));
    }
    let server_version = reader.read_null_string().ok_or_else(|| truncated("server version"))?;
    let connection_id = reader.read_u32_le().ok_or_else(|| truncated("connection id"))?;
    let mut scramble = reader
        .read_bytes(8)
        .ok_or_else(|| truncated("auth data"))?
        .to_vec();
    if !reader.skip(1) {
        return Err(truncated("filler"));
    }
    let caps_lower = reader.read_u16_le().ok_or_else(|| truncated("capability flags"))?;

    let mut info = ServerInfo {
        protocol_version,
        server_version,
        connection_id,
        capabilities: u32::from(caps_lower),
        charset: charset::DEFAULT_CHARSET,
        status_flags: 0,
        auth_plugin: plugins::MYSQL_NATIVE_PASSWORD.to_string(),
        scramble: Vec::new(),
    };

    if !reader.is_empty() {
        info.charset = reader.read_u8().ok_or_else(|| truncated("charset"))?;
        info.status_flags = reader.read_u16_le().ok_or_else(|| truncated("status flags"))?;
        let caps_upper = reader.read_u16_le().ok_or_else(|| truncated("capability flags"))?;
        info.capabilities |= u32::from(caps_upper) << 16;
        let auth_data_len = usize::from(reader.read_u8().ok_or_else(|| truncated("auth data length"))?);
        if !reader.skip(10) {
            return Err(truncated("reserved bytes"));
        }

        if info.has_capability(CLIENT_SECURE_CONNECTION) {
            let len = auth_data_len.saturating_sub(8).max(13);
            let part2 = reader
                .read_bytes(len.min(reader.remaining()))
                .unwrap_or_default();
            scramble.extend_from_slice(part2.strip_suffix(&[0]).unwrap_or(part2));
        }
        if info.has_capability(CLIENT_PLUGIN_AUTH) {
            let name = reader.read_null_string().unwrap_or_default();
            if !name.is_empty() {
                info.auth_plugin = name;
            }
        }
    }

    info.scramble = scramble;
    Ok(info)
}

/// Payload of a command packet: the command byte followed by its argument.
pub fn encode_command(command: Command, argument: &[u8]) -> Vec<u8> {
    let mut writer = PacketWriter::with_capacity(1 + argument.len());
    writer.write_u8(command as u8);
    writer.write_bytes(argument);
    writer.into_bytes()
}

/// `COM_QUERY` payload for a statement.
pub fn encode_query(sql: &str) -> Vec<u8> {
    encode_command(Command::Query, sql.as_bytes())
}

/// Build the handshake response (protocol 4.1 layout).
pub fn encode_handshake_response(
    server: &ServerInfo,
    config: &ClientConfig,
    client_caps: u32,
    plugin_name: &str,
    auth_response: &[u8],
) -> Vec<u8> {
    let mut writer = PacketWriter::new();
    writer.write_u32_le(client_caps);
    writer.write_u32_le(config.max_packet_size);
    writer.write_u8(config.charset);
    writer.write_zeros(23);
    writer.write_null_string(&config.user);

    if client_caps & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
        writer.write_lenenc_bytes(auth_response);
    } else if client_caps & CLIENT_SECURE_CONNECTION != 0 {
        let len = u8::try_from(auth_response.len()).unwrap_or(u8::MAX);
        writer.write_u8(len);
        writer.write_bytes(&auth_response[..usize::from(len)]);
    } else {
        writer.write_bytes(auth_response);
        writer.write_u8(0);
    }

    if client_caps & CLIENT_CONNECT_WITH_DB != 0 {
        writer.write_null_string(config.database.as_deref().unwrap_or_default());
    }
    if client_caps & CLIENT_PLUGIN_AUTH != 0 {
        writer.write_null_string(plugin_name);
    }
    if client_caps & CLIENT_CONNECT_ATTRS != 0 {
        let mut attrs = PacketWriter::new();
        for (key, value) in &config.attributes {
            attrs.write_lenenc_string(key);
            attrs.write_lenenc_string(value);
        }
        writer.write_lenenc_bytes(attrs.as_bytes());
    }

    tracing::trace!(
        server_version = %server.server_version,
        caps = %format!("{:#010x}", client_caps),
        plugin = plugin_name,
        "encoded handshake response"
    );
    writer.into_bytes()
}

/// Classify a reply received during authentication.
pub fn decode_auth_reply(payload: &[u8]) -> Result<AuthReply> {
    match payload.first() {
        Some(&OK_HEADER) => ok_packet(payload).map(AuthReply::Ok),
        Some(&ERR_HEADER) => err_packet(payload).map(AuthReply::Err),
        Some(&EOF_HEADER) => {
            let mut reader = PacketReader::new(&payload[1..]);
            let plugin = reader.read_null_string().unwrap_or_default();
            let challenge = reader.read_rest();
            let challenge = challenge.strip_suffix(&[0]).unwrap_or(challenge).to_vec();
            Ok(AuthReply::Switch { plugin, challenge })
        }
        Some(&crate::auth::caching_sha2::MORE_DATA) => Ok(AuthReply::MoreData(payload[1..].to_vec())),
        _ => Err(protocol_error("unexpected packet during authentication", payload)),
    }
}

/// Classify the first reply to a command.
pub fn decode_response(payload: &[u8]) -> Result<Response> {
    match payload.first() {
        None => Err(protocol_error("empty response packet", payload)),
        Some(&OK_HEADER) => ok_packet(payload).map(Response::Ok),
        Some(&ERR_HEADER) => err_packet(payload).map(Response::Err),
        Some(&LOCAL_INFILE_HEADER) => Ok(Response::LocalInfile(
            String::from_utf8_lossy(&payload[1..]).into_owned(),
        )),
        Some(_) => {
            let mut reader = PacketReader::new(payload);
            match reader.read_lenenc_int() {
                Some(column_count) if column_count > 0 && reader.is_empty() => {
                    Ok(Response::ResultSet(ResultSetHeader { column_count }))
                }
                _ => Err(protocol_error("malformed result set header", payload)),
            }
        }
    }
}

/// Decode a column definition packet (protocol 4.1 layout).
pub fn decode_column_definition(payload: &[u8]) -> Result<ColumnDef> {
    let truncated = |what: &str| {
        protocol_error(format!("column definition truncated at {}", what), payload)
    };
    let mut reader = PacketReader::new(payload);

    let catalog = reader.read_lenenc_string().ok_or_else(|| truncated("catalog"))?;
    let schema = reader.read_lenenc_string().ok_or_else(|| truncated("schema"))?;
    let table = reader.read_lenenc_string().ok_or_else(|| truncated("table"))?;
    let org_table = reader.read_lenenc_string().ok_or_else(|| truncated("org_table"))?;
    let name = reader.read_lenenc_string().ok_or_else(|| truncated("name"))?;
    let org_name = reader.read_lenenc_string().ok_or_else(|| truncated("org_name"))?;
    // Length of the fixed-size block that follows (always 0x0c).
    reader.read_lenenc_int().ok_or_else(|| truncated("fixed length"))?;
    let charset = reader.read_u16_le().ok_or_else(|| truncated("charset"))?;
    let column_length = reader.read_u32_le().ok_or_else(|| truncated("column length"))?;
    let tag = reader.read_u8().ok_or_else(|| truncated("column type"))?;
    let column_type = FieldType::try_from(tag).map_err(|tag| {
        protocol_error(
            format!("unknown column type 0x{:02x} for column '{}'", tag, name),
            payload,
        )
    })?;
    let flags = reader.read_u16_le().ok_or_else(|| truncated("flags"))?;
    let decimals = reader.read_u8().ok_or_else(|| truncated("decimals"))?;

    Ok(ColumnDef {
        catalog,
        schema,
        table,
        org_table,
        name,
        org_name,
        charset,
        column_length,
        column_type,
        flags,
        decimals,
    })
}

/// Does this row-stream packet end the result set?
///
/// A leading `0xFE` is never a length prefix of a short row: it marks a
/// classic EOF (under 9 bytes) or, with `CLIENT_DEPRECATE_EOF`, an OK packet
/// that is necessarily shorter than a full-size packet.
fn is_end_marker(payload: &[u8], capabilities: u32) -> bool {
    payload.first() == Some(&EOF_HEADER)
        && (payload.len() < 9
            || (capabilities & CLIENT_DEPRECATE_EOF != 0 && payload.len() < MAX_PACKET_SIZE))
}

/// Is this row-stream packet a data row (neither ERR nor end of results)?
pub fn is_row_packet(payload: &[u8], capabilities: u32) -> bool {
    payload.first() != Some(&ERR_HEADER) && !is_end_marker(payload, capabilities)
}

/// Decode one packet of the row stream.
///
/// A packet starting with `0x00` is a row whose first cell is the empty
/// string; it is never an OK packet here.
pub fn decode_row(payload: &[u8], columns: &[ColumnDef], capabilities: u32) -> Result<RowEvent> {
    if payload.first() == Some(&ERR_HEADER) {
        return err_packet(payload).map(RowEvent::Err);
    }
    if is_end_marker(payload, capabilities) {
        let end = if payload.len() < 9 && capabilities & CLIENT_DEPRECATE_EOF == 0 {
            PacketReader::new(payload).parse_eof_packet()
        } else {
            PacketReader::new(payload).parse_ok_packet().map(|ok| EndOfResults {
                status_flags: ok.status_flags,
                warnings: ok.warnings,
            })
        };
        return end
            .map(RowEvent::End)
            .ok_or_else(|| protocol_error("truncated end-of-results packet", payload));
    }

    let mut reader = PacketReader::new(payload);
    let mut values = Vec::with_capacity(columns.len());
    for col in columns {
        let cell = reader.read_text_cell().ok_or_else(|| {
            protocol_error(format!("row truncated at column '{}'", col.name), payload)
        })?;
        values.push(match cell {
            None => Value::Null,
            Some(data) => decode_text_value(col, data)?,
        });
    }
    if !reader.is_empty() {
        return Err(protocol_error(
            format!("row has {} unread bytes after {} columns", reader.remaining(), columns.len()),
            payload,
        ));
    }
    Ok(RowEvent::Row(values))
}
