//! Composite argument types that serialize themselves.

use std::fmt;

use ptx_ipc::parcel;
use uuid::Uuid;

use super::writer::Parcel;

/// A value that knows its own parcel layout
///
/// The presence flag (or callback flag) is written by the encoder;
/// implementations write only their fields.
pub trait Parcelable: fmt::Debug + Send + Sync {
    /// Type name used in diagnostics
    fn type_name(&self) -> &'static str;

    /// Append this value's fields to `parcel`
    fn write_to_parcel(&self, parcel: &mut Parcel);
}

/// Fully qualified component (package plus class)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    /// Parse `package/class`; a class starting with `.` is relative to the package
    pub fn unflatten(flat: &str) -> Option<Self> {
        let (package, class) = flat.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        let class = if class.starts_with('.') {
            format!("{}{}", package, class)
        } else {
            class.to_string()
        };
        Some(Self::new(package, class))
    }
}

impl Parcelable for ComponentName {
    fn type_name(&self) -> &'static str {
        "ComponentName"
    }

    fn write_to_parcel(&self, parcel: &mut Parcel) {
        parcel.write_string16(Some(&self.package));
        parcel.write_string16(Some(&self.class));
    }
}

/// Account identity (name plus authenticator type)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub account_type: String,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
        }
    }
}

impl Parcelable for Account {
    fn type_name(&self) -> &'static str {
        "Account"
    }

    fn write_to_parcel(&self, parcel: &mut Parcel) {
        parcel.write_string16(Some(&self.name));
        parcel.write_string16(Some(&self.account_type));
    }
}

/// UUID written as two 64-bit halves, most significant first
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParcelUuid(pub Uuid);

impl ParcelUuid {
    /// Random v4 UUID
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Parcelable for ParcelUuid {
    fn type_name(&self) -> &'static str {
        "ParcelUuid"
    }

    fn write_to_parcel(&self, parcel: &mut Parcel) {
        let (most, least) = self.0.as_u64_pair();
        parcel.write_i64(most as i64);
        parcel.write_i64(least as i64);
    }
}

/// URI in its string form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uri(pub String);

impl Uri {
    pub fn parse(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }
}

impl Parcelable for Uri {
    fn type_name(&self) -> &'static str {
        "Uri"
    }

    fn write_to_parcel(&self, parcel: &mut Parcel) {
        parcel.write_i32(parcel::URI_TYPE_STRING);
        parcel.write_string16(Some(&self.0));
    }
}

/// Pre-marshalled fields for composite types without a dedicated implementation
///
/// `bytes` are appended verbatim and must already be 4-byte aligned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawParcelable {
    pub type_name: &'static str,
    pub bytes: Vec<u8>,
}

impl Parcelable for RawParcelable {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn write_to_parcel(&self, parcel: &mut Parcel) {
        for word in self.bytes.chunks(4) {
            let mut buf = [0u8; 4];
            buf[..word.len()].copy_from_slice(word);
            parcel.write_i32(i32::from_le_bytes(buf));
        }
    }
}
