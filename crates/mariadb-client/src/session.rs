//! Client session: connection handshake, command execution and the state
//! machine that keeps the two sides of the wire in step.
//!
//! ```text
//! Disconnected -> Connecting -> Ready -> Executing -> Ready
//!                                                  -> ResultPending -> Ready
//! (any) -> Closed
//! ```
//!
//! A connection, I/O or protocol failure anywhere drops the transport and
//! leaves the session `Disconnected`; server-reported errors and state
//! errors leave it usable.

// Packet lengths are bounded by MAX_PACKET_SIZE and fit in u32.
#![allow(clippy::cast_possible_truncation)]

use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use mariadb_core::error::{
    ConnectionError, ConnectionErrorKind, Error, ErrorState, StateError,
};
use mariadb_core::{Result, Row, Value};

use crate::auth::{caching_sha2, plugins};
use crate::codec::{self, AuthReply, ResultSetHeader, Response, RowEvent, ServerInfo};
use crate::config::ClientConfig;
use crate::cursor::{CursorKey, CursorState, ResultCursor};
use crate::protocol::capabilities::{CLIENT_DEPRECATE_EOF, CLIENT_PROTOCOL_41};
use crate::protocol::writer::packet_count;
use crate::protocol::{
    Command, EndOfResults, MAX_PACKET_SIZE, OkStatus, PacketHeader, frame_packet, server_status,
};
use crate::transport::{NetStream, Transport};
use crate::types::interpolate_params;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport; `connect` is the only useful call
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Idle and able to accept a command
    Ready,
    /// A command has been sent and its response is being read
    Executing,
    /// A result set is open; rows must be fetched or discarded first
    ResultPending,
    /// Closed by the caller; terminal
    Closed,
}

impl SessionState {
    pub const fn name(self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connecting => "Connecting",
            SessionState::Ready => "Ready",
            SessionState::Executing => "Executing",
            SessionState::ResultPending => "ResultPending",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of [`Session::query`].
#[derive(Debug)]
pub enum QueryResult {
    /// The statement produced rows; fetch them through the cursor
    Rows(ResultCursor),
    /// The statement completed without a result set
    Done(OkStatus),
}

impl QueryResult {
    pub fn is_rows(&self) -> bool {
        matches!(self, QueryResult::Rows(_))
    }

    pub fn into_cursor(self) -> Option<ResultCursor> {
        match self {
            QueryResult::Rows(cursor) => Some(cursor),
            QueryResult::Done(_) => None,
        }
    }
}

/// Source of process-unique session ids; cursors carry the id of the session
/// that issued them.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One client connection to a MariaDB/MySQL server.
///
/// `S` is the byte stream; [`Session::connect`] dials TCP or a Unix socket,
/// while [`Session::connect_with`] accepts any `Read + Write` stream (a TLS
/// wrapper, a test double).
pub struct Session<S = NetStream> {
    id: u64,
    config: ClientConfig,
    transport: Option<Transport<S>>,
    state: SessionState,
    server: Option<ServerInfo>,
    /// Negotiated capabilities (client request intersected with server offer)
    capabilities: u32,
    sequence_id: u8,
    status: OkStatus,
    active_cursor: Option<CursorKey>,
    cursor_serial: u64,
    last_error: Option<ErrorState>,
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .field("connection_id", &self.server.as_ref().map(|s| s.connection_id))
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl Session<NetStream> {
    /// Create a disconnected session for `config`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_config(config)
    }

    /// Create a session and connect it.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.connect()?;
        Ok(session)
    }

    /// Dial the configured endpoint and authenticate.
    #[tracing::instrument(level = "debug", skip(self), fields(endpoint = %self.config.endpoint))]
    pub fn connect(&mut self) -> Result<()> {
        if let Err(e) = self.expect_state("connect", SessionState::Disconnected) {
            return self.finish(Err(e));
        }
        self.set_state(SessionState::Connecting);
        let result = Transport::open(&self.config).and_then(|t| self.establish(t));
        if result.is_err() {
            self.teardown();
        }
        self.finish(result)
    }
}

impl<S> Session<S> {
    /// Create a disconnected session over any stream type.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            transport: None,
            state: SessionState::Disconnected,
            server: None,
            capabilities: 0,
            sequence_id: 0,
            status: OkStatus::default(),
            active_cursor: None,
            cursor_serial: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Greeting of the connected server.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server.as_ref()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.server_version.as_str())
    }

    pub fn connection_id(&self) -> Option<u32> {
        self.server.as_ref().map(|s| s.connection_id)
    }

    /// Capabilities in effect for this connection.
    pub fn capabilities(&self) -> u32 {
        self.capabilities
    }

    /// Rows changed by the last statement (rows read, for a drained result).
    pub fn affected_rows(&self) -> u64 {
        self.status.affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.status.last_insert_id
    }

    pub fn warning_count(&self) -> u16 {
        self.status.warnings
    }

    /// Info string of the last OK packet.
    pub fn info(&self) -> &str {
        &self.status.info
    }

    pub fn status_flags(&self) -> u16 {
        self.status.status_flags
    }

    pub fn in_transaction(&self) -> bool {
        self.status.status_flags & server_status::SERVER_STATUS_IN_TRANS != 0
    }

    /// Error recorded by the most recent operation, `None` after a success.
    pub fn last_error(&self) -> Option<&ErrorState> {
        self.last_error.as_ref()
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = self.state.name(), to = next.name(), "session state");
            self.state = next;
        }
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::State(StateError::new(
                operation,
                self.state.name(),
                format!(
                    "{} requires a {} session, but it is {}",
                    operation, expected, self.state
                ),
            )))
        }
    }

    /// Drop the transport after a failure that leaves the stream unusable.
    fn teardown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.active_cursor = None;
        self.server = None;
        self.capabilities = 0;
        if self.state != SessionState::Closed {
            self.set_state(SessionState::Disconnected);
        }
    }

    /// Record the outcome of a public operation.
    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => {
                if e.is_terminal() {
                    self.teardown();
                }
                let state = e.error_state();
                tracing::debug!(
                    code = state.code,
                    sqlstate = %state.sqlstate,
                    session = self.state.name(),
                    "operation failed: {}",
                    state.message
                );
                self.last_error = Some(state);
            }
        }
        result
    }

    fn record_status(&mut self, ok: &OkStatus) {
        self.status = ok.clone();
    }

    fn record_end(&mut self, end: EndOfResults, rows: u64) {
        self.status = OkStatus {
            affected_rows: rows,
            last_insert_id: 0,
            status_flags: end.status_flags,
            warnings: end.warnings,
            info: String::new(),
        };
    }
}

impl<S: Read + Write> Session<S> {
    /// Run the handshake over an already-connected stream.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn connect_with(&mut self, stream: S) -> Result<()> {
        if let Err(e) = self.expect_state("connect", SessionState::Disconnected) {
            return self.finish(Err(e));
        }
        self.set_state(SessionState::Connecting);
        let result = self.establish(Transport::new(stream));
        if result.is_err() {
            self.teardown();
        }
        self.finish(result)
    }

    fn establish(&mut self, transport: Transport<S>) -> Result<()> {
        self.transport = Some(transport);
        self.sequence_id = 0;
        self.status = OkStatus::default();

        let greeting = self.read_packet()?;
        let server = codec::decode_greeting(&greeting)?;
        tracing::debug!(
            server_version = %server.server_version,
            connection_id = server.connection_id,
            auth_plugin = %server.auth_plugin,
            "server greeting"
        );
        if !server.has_capability(CLIENT_PROTOCOL_41) {
            return Err(handshake_error(format!(
                "server {} does not support protocol 4.1",
                server.server_version
            )));
        }

        let caps = self.config.capability_flags() & server.capabilities;
        let credentials = self.config.credentials();
        let (plugin_name, plugin) = match self.config.auth.get(&server.auth_plugin) {
            Some(plugin) => (server.auth_plugin.clone(), plugin),
            None => {
                // The server will ask for a switch if it insists on its plugin.
                let fallback = self
                    .config
                    .auth
                    .get(plugins::MYSQL_NATIVE_PASSWORD)
                    .ok_or_else(|| unsupported_plugin(&server.auth_plugin))?;
                (plugins::MYSQL_NATIVE_PASSWORD.to_string(), fallback)
            }
        };
        let auth_response = plugin.negotiate(&server.scramble, &credentials);
        let response =
            codec::encode_handshake_response(&server, &self.config, caps, &plugin_name, &auth_response);
        self.write_packet(&response)?;

        let ok = self.authenticate(plugin_name)?;
        self.record_status(&ok);
        self.capabilities = caps;
        self.server = Some(server);
        self.set_state(SessionState::Ready);
        tracing::debug!(
            connection_id = self.connection_id(),
            caps = %format!("{:#010x}", caps),
            "session ready"
        );
        Ok(())
    }

    /// Read auth replies until the server accepts or rejects the login.
    fn authenticate(&mut self, mut plugin: String) -> Result<OkStatus> {
        let credentials = self.config.credentials();
        let mut switched = false;
        loop {
            let packet = self.read_packet()?;
            match codec::decode_auth_reply(&packet)? {
                AuthReply::Ok(ok) => return Ok(ok),
                AuthReply::Err(err) => {
                    return Err(Error::Connection(ConnectionError {
                        kind: ConnectionErrorKind::Authentication,
                        message: format!(
                            "access denied for user '{}': {}",
                            credentials.user, err.message
                        ),
                        server: Some(err.into_server_error()),
                        source: None,
                    }));
                }
                AuthReply::Switch {
                    plugin: requested,
                    challenge,
                } => {
                    if switched {
                        return Err(codec::protocol_error(
                            "server requested a second authentication switch",
                            &packet,
                        ));
                    }
                    switched = true;
                    let handler = self
                        .config
                        .auth
                        .get(&requested)
                        .ok_or_else(|| unsupported_plugin(&requested))?;
                    tracing::debug!(from = %plugin, to = %requested, "authentication switch");
                    let response = handler.negotiate(&challenge, &credentials);
                    self.write_packet(&response)?;
                    plugin = requested;
                }
                AuthReply::MoreData(data) if plugin == plugins::CACHING_SHA2_PASSWORD => {
                    match data.first() {
                        Some(&caching_sha2::FAST_AUTH_SUCCESS) => {
                            tracing::debug!("caching_sha2_password fast authentication accepted");
                        }
                        Some(&caching_sha2::PERFORM_FULL_AUTH) => {
                            return Err(Error::Connection(ConnectionError {
                                kind: ConnectionErrorKind::Authentication,
                                message: "caching_sha2_password full authentication requires \
                                          a secure channel"
                                    .to_string(),
                                server: None,
                                source: None,
                            }));
                        }
                        _ => {
                            return Err(codec::protocol_error(
                                "unexpected caching_sha2_password status",
                                &packet,
                            ));
                        }
                    }
                }
                AuthReply::MoreData(_) => {
                    return Err(codec::protocol_error(
                        format!("unexpected auth continuation for plugin {}", plugin),
                        &packet,
                    ));
                }
            }
        }
    }

    /// Read one logical packet, joining continuation packets.
    fn read_packet(&mut self) -> Result<Vec<u8>> {
        let transport = self.transport.as_mut().ok_or_else(not_connected)?;
        let mut payload = Vec::new();
        loop {
            let raw = transport.receive(PacketHeader::SIZE)?;
            let bytes: [u8; 4] = raw
                .as_slice()
                .try_into()
                .map_err(|_| codec::protocol_error("short packet header", &raw))?;
            let header = PacketHeader::from_bytes(&bytes);
            if header.sequence_id != self.sequence_id {
                return Err(codec::protocol_error(
                    format!(
                        "packets out of order: expected sequence {}, got {}",
                        self.sequence_id, header.sequence_id
                    ),
                    &raw,
                ));
            }
            self.sequence_id = header.sequence_id.wrapping_add(1);

            let len = header.payload_length as usize;
            if payload.len() + len > self.config.max_packet_size as usize {
                return Err(codec::protocol_error(
                    format!(
                        "packet exceeds max_packet_size ({} bytes)",
                        self.config.max_packet_size
                    ),
                    &raw,
                ));
            }
            payload.extend_from_slice(&transport.receive(len)?);
            tracing::trace!(len, seq = header.sequence_id, "packet received");
            if len < MAX_PACKET_SIZE {
                return Ok(payload);
            }
        }
    }

    fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        let transport = self.transport.as_mut().ok_or_else(not_connected)?;
        let packet = frame_packet(payload, self.sequence_id);
        transport.send(&packet)?;
        tracing::trace!(len = payload.len(), seq = self.sequence_id, "packet sent");
        self.sequence_id = self
            .sequence_id
            .wrapping_add(packet_count(payload.len()) as u8);
        Ok(())
    }

    fn send_command(&mut self, command: Command, argument: &[u8]) -> Result<()> {
        self.sequence_id = 0;
        tracing::trace!(command = command.name(), "sending command");
        self.write_packet(&codec::encode_command(command, argument))
    }

    /// Send a statement and read the server's first response.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let result = self.run_query(sql);
        self.finish(result)
    }

    fn run_query(&mut self, sql: &str) -> Result<QueryResult> {
        self.expect_state("query", SessionState::Ready)?;
        self.set_state(SessionState::Executing);
        self.send_command(Command::Query, sql.as_bytes())?;

        let packet = self.read_packet()?;
        match codec::decode_response(&packet)? {
            Response::Ok(ok) => {
                self.record_status(&ok);
                self.set_state(SessionState::Ready);
                Ok(QueryResult::Done(ok))
            }
            Response::Err(err) => {
                self.set_state(SessionState::Ready);
                Err(Error::Server(err.into_server_error().with_sql(sql)))
            }
            Response::ResultSet(header) => self.open_result(header).map(QueryResult::Rows),
            Response::LocalInfile(file) => {
                tracing::warn!(file = %file, "declining LOCAL INFILE request");
                self.write_packet(&[])?;
                let reply = self.read_packet()?;
                match codec::decode_response(&reply)? {
                    Response::Ok(ok) => self.record_status(&ok),
                    Response::Err(err) => {
                        tracing::debug!(code = err.code, "server acknowledged declined upload");
                    }
                    _ => {
                        return Err(codec::protocol_error(
                            "unexpected reply to declined LOCAL INFILE",
                            &reply,
                        ));
                    }
                }
                self.set_state(SessionState::Ready);
                Err(Error::Unsupported(format!(
                    "LOCAL INFILE request for '{}' declined",
                    file
                )))
            }
        }
    }

    fn open_result(&mut self, header: ResultSetHeader) -> Result<ResultCursor> {
        let count = usize::try_from(header.column_count).map_err(|_| {
            codec::protocol_error(
                format!("column count {} out of range", header.column_count),
                &[],
            )
        })?;
        let mut columns = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let packet = self.read_packet()?;
            columns.push(codec::decode_column_definition(&packet)?);
        }
        if self.capabilities & CLIENT_DEPRECATE_EOF == 0 {
            let packet = self.read_packet()?;
            if !codec::is_eof_packet(&packet) {
                return Err(codec::protocol_error(
                    "expected EOF after column definitions",
                    &packet,
                ));
            }
        }

        self.cursor_serial += 1;
        let key = CursorKey {
            session_id: self.id,
            connection_id: self.connection_id().unwrap_or_default(),
            serial: self.cursor_serial,
        };
        self.active_cursor = Some(key);
        self.set_state(SessionState::ResultPending);
        tracing::debug!(columns = count, cursor = key.serial, "result set opened");
        Ok(ResultCursor::new(key, columns))
    }

    /// Like [`Session::query`], with `?` / `$n` placeholders replaced by
    /// escaped literals.
    pub fn query_with(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.query(&interpolate_params(sql, params))
    }

    /// Run a statement and return the number of affected rows.
    ///
    /// Rows produced by the statement are discarded and count as 0.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        match self.query(sql)? {
            QueryResult::Done(ok) => Ok(ok.affected_rows),
            QueryResult::Rows(mut cursor) => {
                self.discard(&mut cursor)?;
                Ok(0)
            }
        }
    }

    /// Run a statement and collect every row it returns.
    pub fn query_all(&mut self, sql: &str) -> Result<Vec<Row>> {
        match self.query(sql)? {
            QueryResult::Done(_) => Ok(Vec::new()),
            QueryResult::Rows(mut cursor) => self.fetch_all(&mut cursor),
        }
    }

    /// Is `cursor` the open result of this session?
    fn check_cursor(&self, operation: &'static str, cursor: &mut ResultCursor) -> Result<()> {
        if !cursor.is_open() {
            return Err(Error::State(StateError::new(
                operation,
                self.state.name(),
                format!("cursor is {}", cursor.state().name()),
            )));
        }
        if self.state == SessionState::ResultPending && self.active_cursor == Some(cursor.key()) {
            return Ok(());
        }
        if cursor.key().session_id == self.id
            && matches!(
                self.state,
                SessionState::Disconnected | SessionState::Closed
            )
        {
            cursor.set_state(CursorState::Invalidated);
        }
        Err(Error::State(StateError::new(
            operation,
            self.state.name(),
            "cursor is not the session's pending result",
        )))
    }

    /// Fetch the next row of `cursor`; `Ok(None)` once the result is
    /// exhausted, after which the session is `Ready` again.
    pub fn fetch_next(&mut self, cursor: &mut ResultCursor) -> Result<Option<Row>> {
        let result = self.next_row(cursor);
        if let Err(e) = &result {
            if e.is_terminal() {
                cursor.set_state(CursorState::Invalidated);
            }
        }
        self.finish(result)
    }

    fn next_row(&mut self, cursor: &mut ResultCursor) -> Result<Option<Row>> {
        self.check_cursor("fetch_next", cursor)?;
        let packet = self.read_packet()?;
        match codec::decode_row(&packet, cursor.columns(), self.capabilities)? {
            RowEvent::Row(values) => Ok(Some(cursor.make_row(values))),
            RowEvent::End(end) => {
                self.close_result(cursor, CursorState::Consumed);
                self.record_end(end, cursor.position());
                Ok(None)
            }
            RowEvent::Err(err) => {
                self.close_result(cursor, CursorState::Consumed);
                Err(Error::Server(err.into_server_error()))
            }
        }
    }

    fn close_result(&mut self, cursor: &mut ResultCursor, state: CursorState) {
        cursor.set_state(state);
        self.active_cursor = None;
        self.set_state(SessionState::Ready);
        tracing::debug!(rows = cursor.position(), "result set closed ({})", state.name());
    }

    /// Skip the rest of `cursor` without decoding it.
    pub fn discard(&mut self, cursor: &mut ResultCursor) -> Result<()> {
        let result = self.skip_rows(cursor);
        if let Err(e) = &result {
            if e.is_terminal() {
                cursor.set_state(CursorState::Invalidated);
            }
        }
        self.finish(result)
    }

    fn skip_rows(&mut self, cursor: &mut ResultCursor) -> Result<()> {
        self.check_cursor("discard", cursor)?;
        let mut skipped = 0_u64;
        loop {
            let packet = self.read_packet()?;
            if codec::is_row_packet(&packet, self.capabilities) {
                skipped += 1;
                continue;
            }
            let event = codec::decode_row(&packet, &[], self.capabilities)?;
            self.close_result(cursor, CursorState::Discarded);
            return match event {
                RowEvent::End(end) => {
                    tracing::trace!(skipped, "discarded remaining rows");
                    self.record_end(end, cursor.position() + skipped);
                    Ok(())
                }
                RowEvent::Err(err) => Err(Error::Server(err.into_server_error())),
                RowEvent::Row(_) => Err(codec::protocol_error("unexpected row", &packet)),
            };
        }
    }

    /// Drain `cursor` into a vector.
    pub fn fetch_all(&mut self, cursor: &mut ResultCursor) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_next(cursor)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Check that the server is alive (`COM_PING`).
    pub fn ping(&mut self) -> Result<()> {
        let result = self.simple_command("ping", Command::Ping, &[]);
        self.finish(result)
    }

    /// Change the default database (`COM_INIT_DB`).
    pub fn select_db(&mut self, database: &str) -> Result<()> {
        let result = self.simple_command("select_db", Command::InitDb, database.as_bytes());
        if result.is_ok() {
            self.config.database = Some(database.to_string());
        }
        self.finish(result)
    }

    /// A command whose only answer is OK or ERR.
    fn simple_command(
        &mut self,
        operation: &'static str,
        command: Command,
        argument: &[u8],
    ) -> Result<()> {
        self.expect_state(operation, SessionState::Ready)?;
        self.set_state(SessionState::Executing);
        self.send_command(command, argument)?;
        let packet = self.read_packet()?;
        match codec::decode_response(&packet)? {
            Response::Ok(ok) => {
                self.record_status(&ok);
                self.set_state(SessionState::Ready);
                Ok(())
            }
            Response::Err(err) => {
                self.set_state(SessionState::Ready);
                Err(Error::Server(err.into_server_error()))
            }
            _ => Err(codec::protocol_error(
                format!("unexpected response to {}", command.name()),
                &packet,
            )),
        }
    }

    /// Close the session. Never fails and may be called repeatedly.
    ///
    /// `COM_QUIT` is sent only from `Ready`; an open cursor is invalidated.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.state == SessionState::Ready {
            if let Err(e) = self.send_command(Command::Quit, &[]) {
                tracing::warn!(error = %e, "COM_QUIT failed");
            }
        }
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.active_cursor = None;
        self.set_state(SessionState::Closed);
        self.last_error = None;
    }
}

fn handshake_error(message: String) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Handshake,
        message,
        server: None,
        source: None,
    })
}

fn unsupported_plugin(name: &str) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::AuthPlugin,
        message: format!("authentication plugin '{}' is not supported", name),
        server: None,
        source: None,
    })
}

fn not_connected() -> Error {
    Error::Io(mariadb_core::error::IoError {
        message: "session has no transport".to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotConnected),
    })
}
