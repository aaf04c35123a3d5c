//! Reply parcel decoding.
//!
//! A reply starts with an exception marker. Zero means the payload follows;
//! a negative value is a remote exception carrying a message and an
//! optional remote stack trace. Two markers are headers rather than
//! exceptions and are skipped before the real marker:
//!
//! | Marker | Handling |
//! |--------|----------|
//! | `-127` noted app-ops | skip entries, read the next marker |
//! | `-128` strict mode | skip the sized header, payload follows |

use std::fmt;

use ptx_ipc::{exception, ExceptionCode};

use crate::error::ParcelError;
use crate::parcel::ParcelReader;

/// Exception raised by the remote side of a call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteException {
    /// Raw exception marker
    pub code: i32,
    pub message: Option<String>,
    pub remote_stack_trace: Option<String>,
    /// Error code attached to service-specific exceptions
    pub service_specific_code: Option<i32>,
}

impl RemoteException {
    /// Create an exception with a message, no trace
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            remote_stack_trace: None,
            service_specific_code: None,
        }
    }

    /// Decoded exception kind, `None` for markers this crate does not know
    pub fn kind(&self) -> Option<ExceptionCode> {
        ExceptionCode::from_i32(self.code)
    }

    /// Whether the remote rejected the caller for lacking authorization
    pub fn is_security(&self) -> bool {
        self.code == exception::EX_SECURITY
    }

    /// Exception class name, or `RemoteException` for unknown markers
    pub fn name(&self) -> &'static str {
        self.kind().map_or("RemoteException", |kind| kind.name())
    }
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(code) = self.service_specific_code {
            write!(f, " (service error {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteException {}

/// Successful reply payload with a read cursor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    data: Vec<u8>,
    position: usize,
}

impl Reply {
    /// Wrap a reply whose payload starts at `position`
    pub fn new(data: Vec<u8>, position: usize) -> Self {
        let position = position.min(data.len());
        Self { data, position }
    }

    /// Empty reply (one-way calls)
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// Full reply bytes, including the leading marker
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Unread payload bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn read_i32(&mut self) -> Result<i32, ParcelError> {
        self.read_with(|r| r.read_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64, ParcelError> {
        self.read_with(|r| r.read_i64())
    }

    pub fn read_bool(&mut self) -> Result<bool, ParcelError> {
        self.read_with(|r| r.read_bool())
    }

    pub fn read_string16(&mut self) -> Result<Option<String>, ParcelError> {
        self.read_with(|r| r.read_string16())
    }

    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>, ParcelError> {
        self.read_with(|r| r.read_byte_array())
    }

    fn read_with<T>(
        &mut self,
        read: impl FnOnce(&mut ParcelReader<'_>) -> Result<T, ParcelError>,
    ) -> Result<T, ParcelError> {
        let mut reader = ParcelReader::new(&self.data);
        reader.set_position(self.position);
        let value = read(&mut reader)?;
        self.position = reader.position();
        Ok(value)
    }
}

/// Decoded reply: payload or remote exception
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok(Reply),
    Exception(RemoteException),
}

/// Decode the leading marker of a reply parcel
///
/// An empty reply (one-way call) decodes as an empty payload.
pub fn decode_reply(data: Vec<u8>) -> Result<ReplyStatus, ParcelError> {
    if data.is_empty() {
        return Ok(ReplyStatus::Ok(Reply::empty()));
    }

    let mut reader = ParcelReader::new(&data);
    let mut code = reader.read_i32()?;

    if code == exception::EX_HAS_NOTED_APPOPS_REPLY_HEADER {
        skip_noted_app_ops(&mut reader)?;
        code = reader.read_i32()?;
    }

    if code == exception::EX_HAS_STRICTMODE_REPLY_HEADER {
        // Strict-mode headers are only sent on success
        skip_sized_header(&mut reader)?;
        let position = reader.position();
        return Ok(ReplyStatus::Ok(Reply::new(data, position)));
    }

    if code == exception::EX_NONE {
        let position = reader.position();
        return Ok(ReplyStatus::Ok(Reply::new(data, position)));
    }

    let message = reader.read_string16()?;
    let remote_stack_trace = read_stack_trace_header(&mut reader)?;
    let service_specific_code = if code == exception::EX_SERVICE_SPECIFIC {
        Some(reader.read_i32()?)
    } else {
        None
    };

    Ok(ReplyStatus::Exception(RemoteException {
        code,
        message,
        remote_stack_trace,
        service_specific_code,
    }))
}

// Entries of (attribution tag, noted-ops bitmask)
fn skip_noted_app_ops(reader: &mut ParcelReader<'_>) -> Result<(), ParcelError> {
    let count = reader.read_i32()?;
    for _ in 0..count.max(0) {
        reader.read_string16()?;
        reader.skip_i64_array()?;
    }
    Ok(())
}

// Size counts the size word itself
fn skip_sized_header(reader: &mut ParcelReader<'_>) -> Result<(), ParcelError> {
    let start = reader.position();
    let size = reader.read_i32()?;
    if size > 0 {
        reader.set_position(start + size as usize);
    }
    Ok(())
}

fn read_stack_trace_header(reader: &mut ParcelReader<'_>) -> Result<Option<String>, ParcelError> {
    let start = reader.position();
    let size = reader.read_i32()?;
    if size <= 0 {
        return Ok(None);
    }
    let trace = reader.read_string16()?;
    reader.set_position(start + size as usize);
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::Parcel;

    fn exception_reply(code: i32, message: &str, trace: Option<&str>) -> Parcel {
        let mut p = Parcel::new();
        p.write_i32(code);
        p.write_string16(Some(message));
        match trace {
            Some(trace) => {
                let start = p.position();
                let mut header = Parcel::new();
                header.write_string16(Some(trace));
                p.write_i32(4 + header.len() as i32);
                p.write_string16(Some(trace));
                assert_eq!(p.position(), start + 4 + header.len());
            }
            None => p.write_i32(0),
        }
        p
    }

    #[test]
    fn test_empty_reply_is_ok() {
        assert_eq!(decode_reply(Vec::new()), Ok(ReplyStatus::Ok(Reply::empty())));
    }

    #[test]
    fn test_ok_reply_payload() {
        let mut p = Parcel::new();
        p.write_i32(0);
        p.write_i32(42);
        p.write_string16(Some("value"));

        let ReplyStatus::Ok(mut reply) = decode_reply(p.into_bytes()).unwrap() else {
            panic!("Expected Ok reply");
        };
        assert_eq!(reply.read_i32().unwrap(), 42);
        assert_eq!(reply.read_string16().unwrap().as_deref(), Some("value"));
        assert_eq!(reply.remaining(), 0);
    }

    #[test]
    fn test_security_exception_message_intact() {
        let p = exception_reply(
            exception::EX_SECURITY,
            "Caller does not hold MANAGE_VOICE_KEYPHRASES",
            None,
        );
        let ReplyStatus::Exception(ex) = decode_reply(p.into_bytes()).unwrap() else {
            panic!("Expected exception");
        };
        assert!(ex.is_security());
        assert_eq!(
            ex.message.as_deref(),
            Some("Caller does not hold MANAGE_VOICE_KEYPHRASES")
        );
        assert_eq!(
            ex.to_string(),
            "SecurityException: Caller does not hold MANAGE_VOICE_KEYPHRASES"
        );
    }

    #[test]
    fn test_stack_trace_header() {
        let mut p = exception_reply(exception::EX_ILLEGAL_STATE, "bad", Some("at Foo.bar"));
        p.write_i32(99);
        let ReplyStatus::Exception(ex) = decode_reply(p.into_bytes()).unwrap() else {
            panic!("Expected exception");
        };
        assert_eq!(ex.kind(), Some(ExceptionCode::IllegalState));
        assert_eq!(ex.remote_stack_trace.as_deref(), Some("at Foo.bar"));
        assert!(!ex.is_security());
    }

    #[test]
    fn test_service_specific_code() {
        let mut p = exception_reply(exception::EX_SERVICE_SPECIFIC, "busy", None);
        p.write_i32(17);
        let ReplyStatus::Exception(ex) = decode_reply(p.into_bytes()).unwrap() else {
            panic!("Expected exception");
        };
        assert_eq!(ex.service_specific_code, Some(17));
        assert_eq!(ex.to_string(), "ServiceSpecificException: busy (service error 17)");
    }

    #[test]
    fn test_strict_mode_header_skipped() {
        let mut p = Parcel::new();
        p.write_i32(exception::EX_HAS_STRICTMODE_REPLY_HEADER);
        p.write_i32(12); // size word + 8 bytes of header
        p.write_i64(0x5555);
        p.write_i32(7);

        let ReplyStatus::Ok(mut reply) = decode_reply(p.into_bytes()).unwrap() else {
            panic!("Expected Ok reply");
        };
        assert_eq!(reply.read_i32().unwrap(), 7);
    }

    #[test]
    fn test_noted_app_ops_header_then_security() {
        let mut p = Parcel::new();
        p.write_i32(exception::EX_HAS_NOTED_APPOPS_REPLY_HEADER);
        p.write_i32(1);
        p.write_string16(Some("attribution"));
        p.write_i32(2);
        p.write_i64(1);
        p.write_i64(0);
        let tail = exception_reply(exception::EX_SECURITY, "denied", None);
        let mut bytes = p.into_bytes();
        bytes.extend_from_slice(tail.as_bytes());

        let ReplyStatus::Exception(ex) = decode_reply(bytes).unwrap() else {
            panic!("Expected exception");
        };
        assert!(ex.is_security());
        assert_eq!(ex.message.as_deref(), Some("denied"));
    }

    #[test]
    fn test_unknown_exception_code() {
        let p = exception_reply(-42, "odd", None);
        let ReplyStatus::Exception(ex) = decode_reply(p.into_bytes()).unwrap() else {
            panic!("Expected exception");
        };
        assert_eq!(ex.kind(), None);
        assert_eq!(ex.name(), "RemoteException");
    }

    #[test]
    fn test_truncated_exception_is_error() {
        let mut p = Parcel::new();
        p.write_i32(exception::EX_SECURITY);
        assert!(decode_reply(p.into_bytes()).is_err());
    }
}
