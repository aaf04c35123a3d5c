//! Parcel reader.

use ptx_ipc::parcel;

use crate::error::ParcelError;

/// Cursor over a received parcel
#[derive(Clone, Debug)]
pub struct ParcelReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ParcelReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor; positions past the end are clamped
    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Advance `len` bytes, rounded up to the parcel alignment
    pub fn skip(&mut self, len: usize) -> Result<(), ParcelError> {
        self.take(align(len)).map(|_| ())
    }

    pub fn read_i32(&mut self) -> Result<i32, ParcelError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParcelError> {
        self.read_i32().map(|v| v as u32)
    }

    pub fn read_i64(&mut self) -> Result<i64, ParcelError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    pub fn read_bool(&mut self) -> Result<bool, ParcelError> {
        Ok(self.read_i32()? != 0)
    }

    /// Read a UTF-16 string; `None` for the null marker
    pub fn read_string16(&mut self) -> Result<Option<String>, ParcelError> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        // Units plus NUL terminator, padded
        let byte_len = len
            .checked_add(1)
            .and_then(|n| n.checked_mul(2))
            .ok_or(ParcelError::InvalidLength(i32::MAX))?;
        let start = self.position;
        self.skip(byte_len)?;

        let units: Vec<u16> = self.data[start..start + len * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map(Some)
            .map_err(|_| ParcelError::InvalidUtf16)
    }

    /// Read a length-prefixed byte array; `None` for the null marker
    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>, ParcelError> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        let start = self.position;
        self.skip(len)?;
        Ok(Some(self.data[start..start + len].to_vec()))
    }

    /// Read a length-prefixed `i32` array; `None` for the null marker
    pub fn read_i32_array(&mut self) -> Result<Option<Vec<i32>>, ParcelError> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        if len.saturating_mul(4) > self.remaining() {
            return Err(self.eof(len.saturating_mul(4)));
        }
        (0..len).map(|_| self.read_i32()).collect::<Result<Vec<_>, _>>().map(Some)
    }

    /// Skip a length-prefixed `i64` array
    pub fn skip_i64_array(&mut self) -> Result<(), ParcelError> {
        if let Some(len) = self.read_length()? {
            self.skip(len.saturating_mul(8))?;
        }
        Ok(())
    }

    fn read_length(&mut self) -> Result<Option<usize>, ParcelError> {
        match self.read_i32()? {
            parcel::NULL_LENGTH => Ok(None),
            len if len < 0 => Err(ParcelError::InvalidLength(len)),
            len => Ok(Some(len as usize)),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ParcelError> {
        if len > self.remaining() {
            return Err(self.eof(len));
        }
        let data = self.data;
        let start = self.position;
        self.position += len;
        Ok(&data[start..start + len])
    }

    fn eof(&self, needed: usize) -> ParcelError {
        ParcelError::UnexpectedEof {
            position: self.position,
            needed,
            remaining: self.remaining(),
        }
    }
}

fn align(len: usize) -> usize {
    let rem = len % parcel::ALIGNMENT;
    if rem == 0 {
        len
    } else {
        len.saturating_add(parcel::ALIGNMENT - rem)
    }
}
