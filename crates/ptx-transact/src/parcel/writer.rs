//! Parcel builder.

use std::fmt::Write as _;

use ptx_hal::BinderObject;
use ptx_ipc::{binder, parcel};

use crate::registry::ApiLevel;

/// A request parcel being marshalled
///
/// Every write is little-endian and padded to a 4-byte boundary, matching
/// the layout the remote side unmarshals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parcel {
    data: Vec<u8>,
    /// Offsets of flat binder objects, passed to the driver out-of-band
    objects: Vec<usize>,
}

impl Parcel {
    /// Create an empty parcel
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write position
    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Offsets of the binder objects in this parcel
    pub fn object_offsets(&self) -> &[usize] {
        &self.objects
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    // === Primitives ===

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Booleans travel as a full `i32`
    pub fn write_bool(&mut self, value: bool) {
        self.write_i32(i32::from(value));
    }

    // === Strings and Arrays ===

    /// Write a UTF-16 string: unit count, units, NUL terminator, padding
    ///
    /// `None` writes the null length marker only.
    pub fn write_string16(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            self.write_i32(parcel::NULL_LENGTH);
            return;
        };

        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_length(units.len());
        for unit in units {
            self.data.extend_from_slice(&unit.to_le_bytes());
        }
        self.data.extend_from_slice(&0u16.to_le_bytes());
        self.pad();
    }

    /// Write a length-prefixed byte array, padded
    pub fn write_byte_array(&mut self, value: Option<&[u8]>) {
        let Some(value) = value else {
            self.write_i32(parcel::NULL_LENGTH);
            return;
        };
        self.write_length(value.len());
        self.data.extend_from_slice(value);
        self.pad();
    }

    /// Write a length-prefixed `i32` array
    pub fn write_i32_array(&mut self, value: Option<&[i32]>) {
        let Some(value) = value else {
            self.write_i32(parcel::NULL_LENGTH);
            return;
        };
        self.write_length(value.len());
        for v in value {
            self.write_i32(*v);
        }
    }

    /// Write a length-prefixed array of UTF-16 strings
    pub fn write_string16_array(&mut self, value: Option<&[String]>) {
        let Some(value) = value else {
            self.write_i32(parcel::NULL_LENGTH);
            return;
        };
        self.write_length(value.len());
        for s in value {
            self.write_string16(Some(s));
        }
    }

    /// Write text the way the text-utils char sequence writer does for plain
    /// text: kind tag, then the string
    pub fn write_char_sequence(&mut self, value: &str) {
        self.write_i32(parcel::CHAR_SEQUENCE_PLAIN);
        self.write_string16(Some(value));
    }

    // === Binder Objects ===

    /// Write a flat binder object; `None` writes a null local binder
    ///
    /// From R on the object is followed by its stability level.
    pub fn write_binder(&mut self, object: Option<&BinderObject>, level: ApiLevel) {
        self.objects.push(self.data.len());
        match object {
            Some(BinderObject::Local { ptr, cookie }) => {
                self.write_u32(binder::BINDER_TYPE_BINDER);
                self.write_u32(
                    binder::FLAT_BINDER_FLAG_ACCEPTS_FDS | binder::FLAT_BINDER_FLAG_PRIORITY_MASK,
                );
                self.write_u64(*ptr);
                self.write_u64(*cookie);
            }
            Some(BinderObject::Remote(handle)) => {
                self.write_u32(binder::BINDER_TYPE_HANDLE);
                self.write_u32(binder::FLAT_BINDER_FLAG_ACCEPTS_FDS);
                self.write_u64(u64::from(handle.id()));
                self.write_u64(0);
            }
            None => {
                self.write_u32(binder::BINDER_TYPE_BINDER);
                self.write_u32(binder::FLAT_BINDER_FLAG_ACCEPTS_FDS);
                self.write_u64(0);
                self.write_u64(0);
            }
        }
        if level.has_binder_stability() {
            self.write_i32(binder::STABILITY_UNDECLARED);
        }
    }

    // === Interface Token ===

    /// Write the interface token header for the given platform release
    ///
    /// | Level | Header |
    /// |-------|--------|
    /// | P | strict-mode policy |
    /// | Q | policy, work source |
    /// | R+ | policy, work source, `'SYST'` |
    ///
    /// followed by the token as a UTF-16 string.
    pub fn write_interface_token(&mut self, token: &str, level: ApiLevel) {
        self.write_i32(parcel::STRICT_MODE_PENALTY_GATHER);
        if level.has_work_source_header() {
            self.write_i32(parcel::WORK_SOURCE_UNSET);
        }
        if level.has_system_header() {
            self.write_i32(parcel::INTERFACE_HEADER_SYSTEM);
        }
        self.write_string16(Some(token));
    }

    // === Diagnostics ===

    /// Hex dump, one 4-byte word per group, 16 bytes per line
    pub fn hex_dump(&self) -> String {
        let mut out = String::new();
        for (line, chunk) in self.data.chunks(16).enumerate() {
            let _ = write!(out, "{:08x}:", line * 16);
            for word in chunk.chunks(4) {
                out.push(' ');
                for byte in word {
                    let _ = write!(out, "{:02x}", byte);
                }
            }
            out.push('\n');
        }
        out
    }

    fn write_length(&mut self, len: usize) {
        // Parcels are bounded far below i32::MAX by the driver
        self.write_i32(i32::try_from(len).unwrap_or(i32::MAX));
    }

    fn pad(&mut self) {
        let rem = self.data.len() % parcel::ALIGNMENT;
        if rem != 0 {
            self.data
                .resize(self.data.len() + parcel::ALIGNMENT - rem, 0);
        }
    }
}
