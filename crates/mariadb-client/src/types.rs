//! Column metadata and text-protocol value decoding.
//!
//! In the text protocol every non-NULL cell arrives as a length-prefixed
//! string; the column's declared type, flags and character set decide which
//! [`Value`] it becomes. The same module formats values back into SQL
//! literals for client-side placeholder interpolation.

#![allow(clippy::cast_possible_truncation)]

use mariadb_core::error::{Error, ProtocolError};
use mariadb_core::{Result, Value};

use crate::protocol::charset;

/// Column type tags (`MYSQL_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    NewDate = 0x0E,
    VarChar = 0x0F,
    Bit = 0x10,
    Timestamp2 = 0x11,
    DateTime2 = 0x12,
    Time2 = 0x13,
    Json = 0xF5,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    VarString = 0xFD,
    String = 0xFE,
    Geometry = 0xFF,
}

impl TryFrom<u8> for FieldType {
    type Error = u8;

    /// Unknown tags are handed back so the caller can report them.
    fn try_from(tag: u8) -> std::result::Result<Self, u8> {
        Ok(match tag {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0x0F => FieldType::VarChar,
            0x10 => FieldType::Bit,
            0x11 => FieldType::Timestamp2,
            0x12 => FieldType::DateTime2,
            0x13 => FieldType::Time2,
            0xF5 => FieldType::Json,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFE => FieldType::String,
            0xFF => FieldType::Geometry,
            other => return Err(other),
        })
    }
}

impl FieldType {
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }

    pub const fn is_string(self) -> bool {
        matches!(
            self,
            FieldType::VarChar
                | FieldType::VarString
                | FieldType::String
                | FieldType::Enum
                | FieldType::Set
        )
    }

    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob | FieldType::MediumBlob | FieldType::LongBlob | FieldType::Blob
        )
    }

    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date
                | FieldType::NewDate
                | FieldType::Time
                | FieldType::Time2
                | FieldType::DateTime
                | FieldType::DateTime2
                | FieldType::Timestamp
                | FieldType::Timestamp2
        )
    }

    /// SQL name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Decimal | FieldType::NewDecimal => "DECIMAL",
            FieldType::Tiny => "TINYINT",
            FieldType::Short => "SMALLINT",
            FieldType::Long => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Null => "NULL",
            FieldType::Timestamp | FieldType::Timestamp2 => "TIMESTAMP",
            FieldType::LongLong => "BIGINT",
            FieldType::Int24 => "MEDIUMINT",
            FieldType::Date | FieldType::NewDate => "DATE",
            FieldType::Time | FieldType::Time2 => "TIME",
            FieldType::DateTime | FieldType::DateTime2 => "DATETIME",
            FieldType::Year => "YEAR",
            FieldType::VarChar | FieldType::VarString => "VARCHAR",
            FieldType::Bit => "BIT",
            FieldType::Json => "JSON",
            FieldType::Enum => "ENUM",
            FieldType::Set => "SET",
            FieldType::TinyBlob => "TINYBLOB",
            FieldType::MediumBlob => "MEDIUMBLOB",
            FieldType::LongBlob => "LONGBLOB",
            FieldType::Blob => "BLOB",
            FieldType::String => "CHAR",
            FieldType::Geometry => "GEOMETRY",
        }
    }
}

/// Column definition flags.
pub mod column_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 2;
    pub const UNIQUE_KEY: u16 = 4;
    pub const MULTIPLE_KEY: u16 = 8;
    pub const BLOB: u16 = 16;
    pub const UNSIGNED: u16 = 32;
    pub const ZEROFILL: u16 = 64;
    pub const BINARY: u16 = 128;
    pub const ENUM: u16 = 256;
    pub const AUTO_INCREMENT: u16 = 512;
    pub const TIMESTAMP: u16 = 1024;
    pub const SET: u16 = 2048;
    pub const NUM: u16 = 32768;
}

/// Descriptor of one result-set column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Catalog name (always "def")
    pub catalog: String,
    pub schema: String,
    /// Table name or alias
    pub table: String,
    pub org_table: String,
    /// Column name or alias, as used for lookups by name
    pub name: String,
    pub org_name: String,
    /// Character set / collation id; 63 means binary
    pub charset: u16,
    pub column_length: u32,
    pub column_type: FieldType,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDef {
    /// Minimal descriptor with the given name and type.
    pub fn new(name: impl Into<String>, column_type: FieldType) -> Self {
        let name = name.into();
        Self {
            catalog: "def".to_string(),
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            org_name: name.clone(),
            name,
            charset: u16::from(charset::DEFAULT_CHARSET),
            column_length: 0,
            column_type,
            flags: 0,
            decimals: 0,
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_charset(mut self, charset: u16) -> Self {
        self.charset = charset;
        self
    }

    pub const fn is_not_null(&self) -> bool {
        self.flags & column_flags::NOT_NULL != 0
    }

    pub const fn is_primary_key(&self) -> bool {
        self.flags & column_flags::PRIMARY_KEY != 0
    }

    pub const fn is_unsigned(&self) -> bool {
        self.flags & column_flags::UNSIGNED != 0
    }

    pub const fn is_auto_increment(&self) -> bool {
        self.flags & column_flags::AUTO_INCREMENT != 0
    }

    /// BINARY flag; also set on `_bin` collations of text columns.
    pub const fn is_binary(&self) -> bool {
        self.flags & column_flags::BINARY != 0
    }

    /// Does the column carry raw bytes rather than text?
    pub fn is_binary_charset(&self) -> bool {
        self.charset == u16::from(charset::BINARY)
    }
}

fn malformed(col: &ColumnDef, data: &[u8], what: &str) -> Error {
    Error::Protocol(ProtocolError {
        message: format!(
            "malformed {} value for column '{}' ({})",
            what,
            col.name,
            col.column_type.name()
        ),
        raw_data: Some(data.to_vec()),
        source: None,
    })
}

fn parse_num<T: std::str::FromStr>(col: &ColumnDef, data: &[u8]) -> Result<T> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| malformed(col, data, "numeric"))
}

fn ascii<'a>(col: &ColumnDef, data: &'a [u8], what: &str) -> Result<&'a str> {
    std::str::from_utf8(data).map_err(|_| malformed(col, data, what))
}

/// Text for string-like columns; binary collations and non-UTF-8 payloads
/// stay raw bytes.
fn text_or_bytes(col: &ColumnDef, data: &[u8]) -> Value {
    if col.is_binary_charset() {
        return Value::Bytes(data.to_vec());
    }
    match std::str::from_utf8(data) {
        Ok(s) => Value::Text(s.to_string()),
        Err(_) => Value::Bytes(data.to_vec()),
    }
}

/// Decode one non-NULL text-protocol cell.
///
/// Unsigned integers are widened to the next signed variant so no value
/// wraps; an unsigned BIGINT above `i64::MAX` becomes a `Decimal`.
pub fn decode_text_value(col: &ColumnDef, data: &[u8]) -> Result<Value> {
    let unsigned = col.is_unsigned();
    let value = match col.column_type {
        FieldType::Tiny if unsigned => Value::SmallInt(i16::from(parse_num::<u8>(col, data)?)),
        FieldType::Tiny => Value::TinyInt(parse_num(col, data)?),
        FieldType::Short if unsigned => Value::Int(i32::from(parse_num::<u16>(col, data)?)),
        FieldType::Short => Value::SmallInt(parse_num(col, data)?),
        FieldType::Int24 | FieldType::Long if unsigned => {
            Value::BigInt(i64::from(parse_num::<u32>(col, data)?))
        }
        FieldType::Int24 | FieldType::Long => Value::Int(parse_num(col, data)?),
        FieldType::LongLong if unsigned => Value::from_unsigned(parse_num(col, data)?),
        FieldType::LongLong => Value::BigInt(parse_num(col, data)?),
        FieldType::Year => Value::SmallInt(parse_num(col, data)?),
        FieldType::Float => Value::Float(parse_num(col, data)?),
        FieldType::Double => Value::Double(parse_num(col, data)?),
        FieldType::Decimal | FieldType::NewDecimal => {
            let s = ascii(col, data, "decimal")?;
            if !is_decimal_literal(s) {
                return Err(malformed(col, data, "decimal"));
            }
            Value::Decimal(s.to_string())
        }
        FieldType::Date | FieldType::NewDate => {
            let s = ascii(col, data, "date")?;
            if lacks_calendar_value(s) {
                Value::Text(s.to_string())
            } else {
                Value::Date(parse_date(s).ok_or_else(|| malformed(col, data, "date"))?)
            }
        }
        FieldType::Time | FieldType::Time2 => {
            let s = ascii(col, data, "time")?;
            Value::Time(parse_time(s).ok_or_else(|| malformed(col, data, "time"))?)
        }
        FieldType::DateTime
        | FieldType::DateTime2
        | FieldType::Timestamp
        | FieldType::Timestamp2 => {
            let s = ascii(col, data, "datetime")?;
            if lacks_calendar_value(s) {
                Value::Text(s.to_string())
            } else {
                Value::Timestamp(parse_datetime(s).ok_or_else(|| malformed(col, data, "datetime"))?)
            }
        }
        FieldType::Json => match serde_json::from_slice(data) {
            Ok(json) => Value::Json(json),
            Err(_) => text_or_bytes(col, data),
        },
        FieldType::Bit | FieldType::Geometry => Value::Bytes(data.to_vec()),
        FieldType::VarChar
        | FieldType::VarString
        | FieldType::String
        | FieldType::Enum
        | FieldType::Set
        | FieldType::TinyBlob
        | FieldType::MediumBlob
        | FieldType::LongBlob
        | FieldType::Blob => text_or_bytes(col, data),
        FieldType::Null => Value::Null,
    };
    Ok(value)
}

fn is_decimal_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

/// `0000-00-00`, dates with a zero month or day, and days past the end of
/// their month (`2024-02-31` under `ALLOW_INVALID_DATES`) have no calendar
/// value.
fn lacks_calendar_value(s: &str) -> bool {
    let date = s.split([' ', 'T']).next().unwrap_or(s);
    if date.split('-').skip(1).any(|p| p.trim_start_matches('0').is_empty()) {
        return true;
    }
    let mut parts = date.splitn(3, '-').map(str::parse::<u32>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(year)), Some(Ok(month)), Some(Ok(day))) => {
            year <= MAX_YEAR
                && (1..=12).contains(&month)
                && day > days_in_month(year, month)
                && day <= 31
        }
        _ => false,
    }
}

const MAX_YEAR: u32 = 9999;

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

// Days since 1970-01-01, from http://howardhinnant.github.io/date_algorithms.html
fn days_from_civil(year: i32, month: u32, day: u32) -> i32 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i32 - 719_468
}

fn civil_from_days(days: i32) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe as i32 + era * 400 + i32::from(month <= 2);
    (year, month, day)
}

/// Parse `YYYY-MM-DD` into days since the Unix epoch.
pub fn parse_date(s: &str) -> Option<i32> {
    let mut parts = s.trim().splitn(3, '-');
    let year: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    if year > MAX_YEAR
        || !(1..=12).contains(&month)
        || !(1..=days_in_month(year, month)).contains(&day)
    {
        return None;
    }
    Some(days_from_civil(i32::try_from(year).ok()?, month, day))
}

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Parse `[-]H+:MM:SS[.ffffff]` into signed microseconds.
///
/// TIME is an interval type: hours may exceed 24 and the value may be
/// negative.
pub fn parse_time(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (clock, frac) = body.split_once('.').unwrap_or((body, ""));
    let mut fields = clock.split(':');
    let hours: i64 = fields.next()?.parse().ok()?;
    let minutes: i64 = fields.next()?.parse().ok()?;
    let seconds: i64 = fields.next().map_or(Some(0), |f| f.parse().ok())?;
    if fields.next().is_some() || minutes >= 60 || seconds >= 60 || hours < 0 {
        return None;
    }
    let micros = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .and_then(|secs| secs.checked_mul(MICROS_PER_SECOND))
        .and_then(|us| us.checked_add(parse_fraction(frac)?))?;
    Some(if negative { -micros } else { micros })
}

fn parse_fraction(frac: &str) -> Option<i64> {
    if frac.is_empty() {
        return Some(0);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = &frac[..frac.len().min(6)];
    let value: i64 = digits.parse().ok()?;
    Some(value * 10_i64.pow(6 - digits.len() as u32))
}

/// Parse `YYYY-MM-DD[ HH:MM:SS[.ffffff]]` into microseconds since the epoch.
pub fn parse_datetime(s: &str) -> Option<i64> {
    let s = s.trim();
    let (date, time) = s.split_once([' ', 'T']).unwrap_or((s, ""));
    let days = i64::from(parse_date(date)?);
    let time = if time.is_empty() { 0 } else { parse_time(time)? };
    if !(0..MICROS_PER_DAY).contains(&time) {
        return None;
    }
    Some(days * MICROS_PER_DAY + time)
}

fn format_date(days: i32) -> String {
    let (y, m, d) = civil_from_days(days);
    format!("{:04}-{:02}-{:02}", y, m, d)
}

fn format_clock(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let micros = micros.unsigned_abs();
    let secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let base = format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, secs / 60 % 60, secs % 60);
    if frac == 0 {
        base
    } else {
        format!("{}.{:06}", base, frac)
    }
}

/// Quote and escape a string literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn escape_bytes(data: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(data.len() * 2 + 3);
    out.push_str("X'");
    for byte in data {
        let _ = write!(out, "{:02X}", byte);
    }
    out.push('\'');
    out
}

fn format_float(f: f64) -> String {
    if f.is_finite() {
        f.to_string()
    } else {
        // NaN and infinities have no SQL literal.
        "NULL".to_string()
    }
}

/// Render a value as an SQL literal.
pub fn format_value_for_sql(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::TinyInt(i) => i.to_string(),
        Value::SmallInt(i) => i.to_string(),
        Value::Int(i) => i.to_string(),
        Value::BigInt(i) => i.to_string(),
        Value::Float(f) => format_float(f64::from(*f)),
        Value::Double(f) => format_float(*f),
        Value::Decimal(s) if is_decimal_literal(s) => s.clone(),
        Value::Decimal(s) | Value::Text(s) => escape_string(s),
        Value::Bytes(b) => escape_bytes(b),
        Value::Json(j) => escape_string(&j.to_string()),
        Value::Date(d) => format!("'{}'", format_date(*d)),
        Value::Time(t) => format!("'{}'", format_clock(*t)),
        Value::Timestamp(t) => {
            let days = t.div_euclid(MICROS_PER_DAY);
            let clock = t.rem_euclid(MICROS_PER_DAY);
            match i32::try_from(days) {
                Ok(days) => format!("'{} {}'", format_date(days), format_clock(clock)),
                Err(_) => "NULL".to_string(),
            }
        }
    }
}

/// Substitute `?` and `$n` placeholders with escaped literals.
///
/// `?` placeholders consume parameters in order; `$n` refers to the n-th
/// parameter (1-based). Placeholders inside quoted strings, double-quoted
/// or backtick identifiers are left alone, as are placeholders with no
/// matching parameter.
pub fn interpolate_params(sql: &str, params: &[Value]) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + params.len() * 16);
    let mut next_param = 0;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = skip_quoted(bytes, i, quote);
            }
            b'?' => {
                if let Some(param) = params.get(next_param) {
                    out.push_str(&sql[copied..i]);
                    out.push_str(&format_value_for_sql(param));
                    copied = i + 1;
                    next_param += 1;
                }
                i += 1;
            }
            b'$' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                let end = i + 1 + digits;
                let index = sql[i + 1..end].parse::<usize>().ok();
                if let Some(param) = index.and_then(|n| n.checked_sub(1)).and_then(|n| params.get(n)) {
                    out.push_str(&sql[copied..i]);
                    out.push_str(&format_value_for_sql(param));
                    copied = end;
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[copied..]);
    out
}

/// Index just past the closing quote of a literal starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote != b'`' {
            i += 2;
        } else if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}
