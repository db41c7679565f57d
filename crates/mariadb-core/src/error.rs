//! Error types for client operations.
//!
//! Every failure is represented by one [`Error`] value. Callers that want the
//! flat `(code, SQLSTATE, message)` triple the native client exposes can
//! convert any error with [`Error::error_state`].

use std::fmt;

/// The primary error type for all client operations.
#[derive(Debug)]
pub enum Error {
    /// Endpoint unreachable, handshake rejected or authentication failed
    Connection(ConnectionError),
    /// Malformed or unrecognized frame on the wire
    Protocol(ProtocolError),
    /// Transport failure in the middle of an operation
    Io(IoError),
    /// Operation not valid in the session's current state
    State(StateError),
    /// Well-formed failure reported by the server (bad SQL, constraint, ...)
    Server(ServerError),
    /// Feature the client deliberately does not implement
    Unsupported(String),
    /// Type conversion errors when reading row values
    Type(TypeError),
    /// Configuration errors
    Config(ConfigError),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    /// Present when the server itself refused the connection or the login
    pub server: Option<ServerError>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the TCP connection
    Connect,
    /// Connection refused by the remote host
    Refused,
    /// Host name could not be resolved
    DnsResolution,
    /// Local (Unix domain) socket could not be opened
    LocalSocket,
    /// Server greeting rejected or incompatible
    Handshake,
    /// Credentials rejected
    Authentication,
    /// Server requested an authentication plugin the client cannot run
    AuthPlugin,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct IoError {
    pub message: String,
    pub source: std::io::Error,
}

#[derive(Debug, Clone)]
pub struct StateError {
    /// Operation that was attempted (`"query"`, `"fetch_next"`, ...)
    pub operation: &'static str,
    /// Session state name at the time of the call
    pub state: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub kind: ServerErrorKind,
    pub code: u16,
    pub sqlstate: String,
    pub message: String,
    /// Statement that triggered the error, when known
    pub sql: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, not null, check)
    Constraint,
    /// Database, table, column or routine not found
    NotFound,
    /// Object already exists
    AlreadyExists,
    /// Permission denied
    Permission,
    /// Data too long for column
    DataTruncation,
    /// Deadlock detected
    Deadlock,
    /// Lock wait timeout exceeded
    LockTimeout,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Client-side error codes, numbered like the native client library's
/// `CR_*` constants so callers can match on familiar values.
pub mod client_codes {
    pub const CR_UNKNOWN_ERROR: u16 = 2000;
    pub const CR_CONNECTION_ERROR: u16 = 2002;
    pub const CR_CONN_HOST_ERROR: u16 = 2003;
    pub const CR_UNKNOWN_HOST: u16 = 2005;
    pub const CR_SERVER_HANDSHAKE_ERR: u16 = 2012;
    pub const CR_SERVER_LOST: u16 = 2013;
    pub const CR_COMMANDS_OUT_OF_SYNC: u16 = 2014;
    pub const CR_MALFORMED_PACKET: u16 = 2027;
    pub const CR_NOT_IMPLEMENTED: u16 = 2054;
    pub const CR_AUTH_PLUGIN_CANNOT_LOAD: u16 = 2059;
    pub const CR_AUTH_PLUGIN_ERR: u16 = 2061;
}

/// SQLSTATE used for client-side failures without a more specific class.
pub const GENERAL_SQLSTATE: &str = "HY000";

/// SQLSTATE for a broken communication link.
pub const LINK_FAILURE_SQLSTATE: &str = "08S01";

/// Length of a SQLSTATE string.
pub const SQLSTATE_LENGTH: usize = 5;

/// Maximum stored message length, matching the native `MYSQL_ERRMSG_SIZE`
/// buffer minus its terminator.
pub const MAX_ERROR_MESSAGE_LEN: usize = 511;

/// Flattened view of an error: numeric code, 5-character SQLSTATE and a
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub code: u16,
    pub sqlstate: String,
    pub message: String,
}

impl ErrorState {
    /// Build an error state, normalizing the SQLSTATE to exactly five
    /// characters and bounding the message length.
    pub fn new(code: u16, sqlstate: &str, message: impl Into<String>) -> Self {
        let sqlstate = if sqlstate.len() == SQLSTATE_LENGTH && sqlstate.is_ascii() {
            sqlstate.to_string()
        } else {
            GENERAL_SQLSTATE.to_string()
        };

        let mut message = message.into();
        if message.len() > MAX_ERROR_MESSAGE_LEN {
            let mut end = MAX_ERROR_MESSAGE_LEN;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }

        Self {
            code,
            sqlstate,
            message,
        }
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR {} ({}): {}", self.code, self.sqlstate, self.message)
    }
}

impl ServerError {
    /// Build a server error from the fields of an ERR packet.
    pub fn new(code: u16, sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServerErrorKind::from_code(code),
            code,
            sqlstate: sqlstate.into(),
            message: message.into(),
            sql: None,
        }
    }

    /// Attach the statement that produced this error.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Is this a unique key violation (ER_DUP_ENTRY)?
    pub fn is_duplicate_key(&self) -> bool {
        self.code == 1062
    }

    /// Is this a foreign key violation?
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self.code, 1216 | 1217 | 1451 | 1452)
    }
}

impl ServerErrorKind {
    /// Classify a server error code.
    pub fn from_code(code: u16) -> Self {
        match code {
            1064 | 1149 => ServerErrorKind::Syntax,
            1048 | 1062 | 1216 | 1217 | 1451 | 1452 | 1557 | 1586 | 3819 | 4025 => {
                ServerErrorKind::Constraint
            }
            1049 | 1051 | 1054 | 1146 | 1305 => ServerErrorKind::NotFound,
            1007 | 1050 | 1304 => ServerErrorKind::AlreadyExists,
            1044 | 1045 | 1142 | 1143 | 1227 | 1370 => ServerErrorKind::Permission,
            1406 => ServerErrorKind::DataTruncation,
            1213 => ServerErrorKind::Deadlock,
            1205 => ServerErrorKind::LockTimeout,
            _ => ServerErrorKind::Database,
        }
    }
}

impl StateError {
    pub fn new(operation: &'static str, state: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            state,
            message: message.into(),
        }
    }
}

impl Error {
    /// Does this error leave the session's stream untrustworthy?
    ///
    /// Connection, I/O and protocol failures force the session back to
    /// `Disconnected`; state, server and unsupported-feature errors leave it
    /// usable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Io(_) | Error::Protocol(_)
        )
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }

    /// Is this an error reported by the server for a well-formed request?
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server(_))
    }

    /// Is this a state machine violation?
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::State(_))
    }

    /// Is this a retryable error (deadlock or lock wait timeout)?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Server(s) => matches!(
                s.kind,
                ServerErrorKind::Deadlock | ServerErrorKind::LockTimeout
            ),
            _ => false,
        }
    }

    /// Server error payload, if the server was the one that failed.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Server(s) => Some(s),
            Error::Connection(c) => c.server.as_ref(),
            _ => None,
        }
    }

    /// Numeric error code (server code or client `CR_*` code).
    pub fn code(&self) -> u16 {
        self.error_state().code
    }

    /// Get SQLSTATE if the server supplied one.
    pub fn sqlstate(&self) -> Option<&str> {
        self.server_error()
            .map(|s| s.sqlstate.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Get the SQL that caused this error, if available.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Server(s) => s.sql.as_deref(),
            _ => None,
        }
    }

    /// Normalize this error into an [`ErrorState`].
    pub fn error_state(&self) -> ErrorState {
        use client_codes::*;

        if let Some(server) = self.server_error() {
            return ErrorState::new(server.code, &server.sqlstate, server.message.clone());
        }

        let (code, sqlstate) = match self {
            Error::Connection(c) => match c.kind {
                ConnectionErrorKind::Connect | ConnectionErrorKind::Refused => {
                    (CR_CONN_HOST_ERROR, GENERAL_SQLSTATE)
                }
                ConnectionErrorKind::DnsResolution => (CR_UNKNOWN_HOST, GENERAL_SQLSTATE),
                ConnectionErrorKind::LocalSocket => (CR_CONNECTION_ERROR, GENERAL_SQLSTATE),
                ConnectionErrorKind::Handshake => (CR_SERVER_HANDSHAKE_ERR, LINK_FAILURE_SQLSTATE),
                ConnectionErrorKind::Authentication => (CR_AUTH_PLUGIN_ERR, GENERAL_SQLSTATE),
                ConnectionErrorKind::AuthPlugin => (CR_AUTH_PLUGIN_CANNOT_LOAD, GENERAL_SQLSTATE),
            },
            Error::Io(_) => (CR_SERVER_LOST, LINK_FAILURE_SQLSTATE),
            Error::Protocol(_) => (CR_MALFORMED_PACKET, GENERAL_SQLSTATE),
            Error::State(_) => (CR_COMMANDS_OUT_OF_SYNC, GENERAL_SQLSTATE),
            Error::Unsupported(_) => (CR_NOT_IMPLEMENTED, GENERAL_SQLSTATE),
            Error::Server(_) | Error::Type(_) | Error::Config(_) => {
                (CR_UNKNOWN_ERROR, GENERAL_SQLSTATE)
            }
        };

        ErrorState::new(code, sqlstate, self.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::State(e) => write!(f, "State error: {}", e),
            Error::Server(e) => write!(f, "Server error: {}", e),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(&e.source),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.source)
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} not allowed while session is {}: {}",
            self.operation, self.state, self.message
        )
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sqlstate.is_empty() {
            write!(f, "{} ({})", self.message, self.code)
        } else {
            write!(
                f,
                "{} ({}, SQLSTATE {})",
                self.message, self.code, self.sqlstate
            )
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Error::Io(err)
    }
}

impl From<StateError> for Error {
    fn from(err: StateError) -> Self {
        Error::State(err)
    }
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        Error::Server(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(IoError {
            message: "stream failure".to_string(),
            source: err,
        })
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_keeps_server_fields() {
        let err = Error::Server(
            ServerError::new(1007, "HY000", "Can't create database 'testdb'; database exists")
                .with_sql("CREATE DATABASE testdb"),
        );

        let state = err.error_state();
        assert_eq!(state.code, 1007);
        assert_eq!(state.sqlstate, "HY000");
        assert!(state.message.contains("database exists"));
        assert_eq!(err.sql(), Some("CREATE DATABASE testdb"));
        assert!(!err.is_terminal());
    }

    #[test]
    fn server_error_kind_classification() {
        assert_eq!(ServerErrorKind::from_code(1064), ServerErrorKind::Syntax);
        assert_eq!(ServerErrorKind::from_code(1062), ServerErrorKind::Constraint);
        assert_eq!(ServerErrorKind::from_code(1146), ServerErrorKind::NotFound);
        assert_eq!(
            ServerErrorKind::from_code(1007),
            ServerErrorKind::AlreadyExists
        );
        assert_eq!(ServerErrorKind::from_code(1045), ServerErrorKind::Permission);
        assert_eq!(ServerErrorKind::from_code(1213), ServerErrorKind::Deadlock);
        assert_eq!(ServerErrorKind::from_code(9999), ServerErrorKind::Database);

        let dup = ServerError::new(1062, "23000", "Duplicate entry");
        assert!(dup.is_duplicate_key());
        assert!(!dup.is_foreign_key_violation());
    }

    #[test]
    fn terminal_policy() {
        let io = Error::from(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "eof",
        ));
        assert!(io.is_terminal());
        assert_eq!(io.code(), client_codes::CR_SERVER_LOST);
        assert_eq!(io.error_state().sqlstate, LINK_FAILURE_SQLSTATE);

        let proto = Error::Protocol(ProtocolError {
            message: "bad frame".to_string(),
            raw_data: None,
            source: None,
        });
        assert!(proto.is_terminal());
        assert_eq!(proto.code(), client_codes::CR_MALFORMED_PACKET);

        let state = Error::State(StateError::new("query", "ResultPending", "cursor open"));
        assert!(!state.is_terminal());
        assert!(state.is_state_error());
        assert_eq!(state.code(), client_codes::CR_COMMANDS_OUT_OF_SYNC);

        assert!(!Error::Unsupported("LOCAL INFILE".to_string()).is_terminal());
    }

    #[test]
    fn auth_rejection_reports_server_code() {
        let err = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Authentication,
            message: "Access denied for user 'root'@'localhost'".to_string(),
            server: Some(ServerError::new(
                1045,
                "28000",
                "Access denied for user 'root'@'localhost'",
            )),
            source: None,
        });
        assert!(err.is_terminal());
        assert_eq!(err.code(), 1045);
        assert_eq!(err.sqlstate(), Some("28000"));
    }

    #[test]
    fn error_state_normalizes_fields() {
        let state = ErrorState::new(2000, "", "x".repeat(600));
        assert_eq!(state.sqlstate, GENERAL_SQLSTATE);
        assert_eq!(state.message.len(), MAX_ERROR_MESSAGE_LEN);

        // Multi-byte characters are never split.
        let state = ErrorState::new(2000, "HY000", "é".repeat(300));
        assert!(state.message.len() <= MAX_ERROR_MESSAGE_LEN);
        assert!(state.message.chars().all(|c| c == 'é'));
    }

    #[test]
    fn error_state_display() {
        let state = ErrorState::new(1064, "42000", "You have an error in your SQL syntax");
        assert_eq!(
            state.to_string(),
            "ERROR 1064 (42000): You have an error in your SQL syntax"
        );
    }
}
