//! Call arguments and their encoders.
//!
//! Each argument kind has exactly one encoder, looked up in `ENCODERS` by
//! kind. Arguments are written in call order after the interface token.
//!
//! | Kind | Layout |
//! |------|--------|
//! | `Text` (String16 mode) | length, UTF-16 units, NUL, padding |
//! | `Text` (CharSequence mode) | `1` presence, `1` plain kind, String16 |
//! | `Int` | `i32` |
//! | `Long` | `i64` |
//! | `Bool` | `i32` 0 or 1 |
//! | `IntArray` | length, `i32` each |
//! | `Bytes` | length, bytes, padding |
//! | `Binder` | flat binder object |
//! | `Parcelable` | `1` presence, fields |
//! | `RemoteCallback` | `0` flag, fields |
//! | `TextArray` | length, String16 each |
//! | `Opaque` | nothing |

use std::fmt;

use ptx_hal::BinderObject;
use ptx_ipc::parcel as marker;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::parcelable::Parcelable;
use super::writer::Parcel;
use crate::registry::ApiLevel;

/// How `Arg::Text` is written
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Plain UTF-16 string
    #[default]
    String16,
    /// Char sequence, for operations declared to take `CharSequence`
    CharSequence,
}

/// One positional call argument
#[derive(Debug)]
pub enum Arg {
    Text(Option<String>),
    Int(i32),
    Long(i64),
    Bool(bool),
    IntArray(Option<Vec<i32>>),
    Bytes(Option<Vec<u8>>),
    Binder(Option<BinderObject>),
    Parcelable(Option<Box<dyn Parcelable>>),
    RemoteCallback(Box<dyn Parcelable>),
    TextArray(Option<Vec<String>>),
    /// A value with no known wire layout; skipped by the encoder
    Opaque(&'static str),
}

/// Discriminant of `Arg`, used as the encoder table key
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgKind {
    Text = 0,
    Int = 1,
    Long = 2,
    Bool = 3,
    IntArray = 4,
    Bytes = 5,
    Binder = 6,
    Parcelable = 7,
    RemoteCallback = 8,
    TextArray = 9,
    Opaque = 10,
}

/// Writes one argument. Only ever called with an argument of its own kind.
pub type EncodeFn = fn(&Arg, &mut Parcel, ApiLevel, TextMode);

/// Encoder table, indexed by `ArgKind`
const ENCODERS: [(ArgKind, EncodeFn); 11] = [
    (ArgKind::Text, encode_text),
    (ArgKind::Int, encode_int),
    (ArgKind::Long, encode_long),
    (ArgKind::Bool, encode_bool),
    (ArgKind::IntArray, encode_int_array),
    (ArgKind::Bytes, encode_bytes),
    (ArgKind::Binder, encode_binder),
    (ArgKind::Parcelable, encode_parcelable),
    (ArgKind::RemoteCallback, encode_remote_callback),
    (ArgKind::TextArray, encode_text_array),
    (ArgKind::Opaque, encode_opaque),
];

impl ArgKind {
    pub const ALL: [ArgKind; 11] = [
        ArgKind::Text,
        ArgKind::Int,
        ArgKind::Long,
        ArgKind::Bool,
        ArgKind::IntArray,
        ArgKind::Bytes,
        ArgKind::Binder,
        ArgKind::Parcelable,
        ArgKind::RemoteCallback,
        ArgKind::TextArray,
        ArgKind::Opaque,
    ];

    /// Encoder for this kind
    pub fn encoder(self) -> EncodeFn {
        ENCODERS[self as usize].1
    }

    /// Whether arguments of this kind produce any bytes
    pub fn is_encodable(self) -> bool {
        self != ArgKind::Opaque
    }
}

impl Arg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Arg::Text(_) => ArgKind::Text,
            Arg::Int(_) => ArgKind::Int,
            Arg::Long(_) => ArgKind::Long,
            Arg::Bool(_) => ArgKind::Bool,
            Arg::IntArray(_) => ArgKind::IntArray,
            Arg::Bytes(_) => ArgKind::Bytes,
            Arg::Binder(_) => ArgKind::Binder,
            Arg::Parcelable(_) => ArgKind::Parcelable,
            Arg::RemoteCallback(_) => ArgKind::RemoteCallback,
            Arg::TextArray(_) => ArgKind::TextArray,
            Arg::Opaque(_) => ArgKind::Opaque,
        }
    }

    /// Wrap a composite value
    pub fn parcelable(value: impl Parcelable + 'static) -> Self {
        Arg::Parcelable(Some(Box::new(value)))
    }

    /// Wrap a callback value
    pub fn remote_callback(value: impl Parcelable + 'static) -> Self {
        Arg::RemoteCallback(Box::new(value))
    }

    /// Null binder
    pub fn null_binder() -> Self {
        Arg::Binder(None)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Arg::Text(Some(value.into()))
    }

    pub fn text_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arg::TextArray(Some(values.into_iter().map(Into::into).collect()))
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Long(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(Some(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(Some(value))
    }
}

impl From<Vec<i32>> for Arg {
    fn from(value: Vec<i32>) -> Self {
        Arg::IntArray(Some(value))
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Bytes(Some(value))
    }
}

impl From<Vec<String>> for Arg {
    fn from(value: Vec<String>) -> Self {
        Arg::TextArray(Some(value))
    }
}

impl From<BinderObject> for Arg {
    fn from(value: BinderObject) -> Self {
        Arg::Binder(Some(value))
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Build the request parcel for one call
///
/// Writes the interface token header for `level`, then each argument in
/// order. `Opaque` arguments are skipped and reported at `warn` level; the
/// rest of the parcel is still written. Identical input always yields
/// identical bytes.
pub fn encode(token: &str, level: ApiLevel, args: &[Arg], mode: TextMode) -> Parcel {
    let mut parcel = Parcel::new();
    parcel.write_interface_token(token, level);
    for (index, arg) in args.iter().enumerate() {
        let kind = arg.kind();
        if !kind.is_encodable() {
            warn!(interface = token, index, arg = ?arg, "argument has no wire layout, skipped");
        }
        (kind.encoder())(arg, &mut parcel, level, mode);
    }
    parcel
}

fn encode_text(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, mode: TextMode) {
    let Arg::Text(value) = arg else { return };
    match (mode, value) {
        (TextMode::String16, value) => parcel.write_string16(value.as_deref()),
        (TextMode::CharSequence, Some(value)) => {
            parcel.write_i32(marker::PARCELABLE_PRESENT);
            parcel.write_char_sequence(value);
        }
        (TextMode::CharSequence, None) => parcel.write_i32(marker::PARCELABLE_ABSENT),
    }
}

fn encode_int(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::Int(value) = arg {
        parcel.write_i32(*value);
    }
}

fn encode_long(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::Long(value) = arg {
        parcel.write_i64(*value);
    }
}

fn encode_bool(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::Bool(value) = arg {
        parcel.write_bool(*value);
    }
}

fn encode_int_array(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::IntArray(value) = arg {
        parcel.write_i32_array(value.as_deref());
    }
}

fn encode_bytes(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::Bytes(value) = arg {
        parcel.write_byte_array(value.as_deref());
    }
}

fn encode_binder(arg: &Arg, parcel: &mut Parcel, level: ApiLevel, _mode: TextMode) {
    if let Arg::Binder(value) = arg {
        parcel.write_binder(value.as_ref(), level);
    }
}

fn encode_parcelable(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    let Arg::Parcelable(value) = arg else { return };
    match value {
        Some(value) => {
            parcel.write_i32(marker::PARCELABLE_PRESENT);
            value.write_to_parcel(parcel);
        }
        None => parcel.write_i32(marker::PARCELABLE_ABSENT),
    }
}

// Callbacks carry a zero flag ahead of their fields
fn encode_remote_callback(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::RemoteCallback(value) = arg {
        parcel.write_i32(marker::PARCELABLE_ABSENT);
        value.write_to_parcel(parcel);
    }
}

fn encode_text_array(arg: &Arg, parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {
    if let Arg::TextArray(value) = arg {
        parcel.write_string16_array(value.as_deref());
    }
}

fn encode_opaque(_arg: &Arg, _parcel: &mut Parcel, _level: ApiLevel, _mode: TextMode) {}
