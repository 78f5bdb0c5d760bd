//! RDATA type definitions.
//!
//! Only the three record types the PSL zone actually uses are implemented:
//! [`PTR`], [`CNAME`], and [`TXT`]. Anything else decodes to [`Rdata::Unknown`].

use std::fmt::Display;
use std::io::{Cursor, Write};

use data_encoding::HEXUPPER;

use crate::error::{EncodeError, ParseError};
use crate::RecordType;

#[cfg(feature = "serde")]
use serde::Serialize;

pub mod cname;
pub mod ptr;
pub mod txt;

pub use cname::CNAME;
pub use ptr::PTR;
pub use txt::TXT;

/// The record data (RDATA) for a [`Record`][crate::Record].
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum Rdata {
    CNAME(CNAME),
    PTR(PTR),
    TXT(TXT),

    /// Unknown RDATA, containing the raw RDATA bytes.
    Unknown(Vec<u8>),
}

/// A trait for working with the different RDATA variants.
pub trait RdataTrait: Sized + Display {
    /// Parses the RDATA from the encoded bytes, starting at `rdata`'s current position in the
    /// slice.
    ///
    /// `rdata` is a [`Cursor`] wrapping the complete DNS message that contains the RDATA, which is
    /// needed for handling DNS message compression.
    ///
    /// `rdlength` is the byte count of the encoded RDATA that will be parsed.
    fn parse_rdata(rdata: &mut Cursor<&[u8]>, rdlength: u16) -> Result<Rdata, ParseError>;

    /// Encodes the RDATA into the given `buf` and returns the number of written bytes on success.
    fn encode_rdata_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError>;

    /// Encodes the RDATA and returns the encoded bytes.
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut rdata = Vec::new();
        self.encode_rdata_into(&mut rdata)?;
        Ok(rdata)
    }
}

impl From<CNAME> for Rdata {
    fn from(rdata: CNAME) -> Self {
        Self::CNAME(rdata)
    }
}

impl From<PTR> for Rdata {
    fn from(rdata: PTR) -> Self {
        Self::PTR(rdata)
    }
}

impl From<TXT> for Rdata {
    fn from(rdata: TXT) -> Self {
        Self::TXT(rdata)
    }
}

impl Rdata {
    /// See [`RdataTrait::encode()`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            Rdata::CNAME(r) => r.encode(),
            Rdata::PTR(r) => r.encode(),
            Rdata::TXT(r) => r.encode(),
            Rdata::Unknown(raw) => Ok(raw.clone()),
        }
    }

    /// See [`RdataTrait::encode_rdata_into()`].
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        match self {
            Rdata::CNAME(r) => r.encode_rdata_into(buf),
            Rdata::PTR(r) => r.encode_rdata_into(buf),
            Rdata::TXT(r) => r.encode_rdata_into(buf),
            Rdata::Unknown(raw) => {
                buf.write_all(raw)?;
                Ok(raw.len() as u16)
            }
        }
    }

    /// Returns the [`RecordType`] that matches this RDATA.
    ///
    /// As [`Rdata::Unknown`] does not know its type, calling this method on it returns
    /// [`RecordType::Unknown(0)`].
    pub fn rtype(&self) -> RecordType {
        match self {
            Rdata::CNAME(_) => RecordType::CNAME,
            Rdata::PTR(_) => RecordType::PTR,
            Rdata::TXT(_) => RecordType::TXT,
            Rdata::Unknown(_) => RecordType::Unknown(0),
        }
    }

    /// Returns a reference to the inner [`PTR`], if this is the `PTR` variant.
    pub fn as_ptr(&self) -> Option<&PTR> {
        match self {
            Self::PTR(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns a reference to the inner [`CNAME`], if this is the `CNAME` variant.
    pub fn as_cname(&self) -> Option<&CNAME> {
        match self {
            Self::CNAME(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns a reference to the inner [`TXT`], if this is the `TXT` variant.
    pub fn as_txt(&self) -> Option<&TXT> {
        match self {
            Self::TXT(inner) => Some(inner),
            _ => None,
        }
    }
}

impl Display for Rdata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rdata::CNAME(r) => write!(f, "{}", r),
            Rdata::PTR(r) => write!(f, "{}", r),
            Rdata::TXT(r) => write!(f, "{}", r),
            Rdata::Unknown(data) => write!(f, "\\# {} {}", data.len(), HEXUPPER.encode(data)),
        }
    }
}

/// Parses a character string as defined in [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035),
/// i.e. reads a length byte and then the number of ASCII characters specified by the length byte.
///
/// Returns the parsed string and the number of bytes read.
pub fn parse_string(msg: &mut Cursor<&[u8]>) -> Result<(String, usize), ParseError> {
    use byteorder::ReadBytesExt;
    use std::io::Read;

    let length = msg.read_u8()?;
    let mut string = vec![0; length as usize];
    msg.read_exact(&mut string)?;

    let string = String::from_utf8_lossy(&string).into_owned();
    if !string.is_ascii() {
        return Err(ParseError::NonAsciiString(string));
    }

    // + 1 because we also need to count the length byte
    let bytes_read = string.len() + 1;
    Ok((string, bytes_read))
}

/// Encodes a string as a character string as defined in
/// [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035), i.e. writes the length of the string as a
/// byte and then the string bytes, into the given `buf`.
///
/// `string` must consist of only ASCII characters.
pub fn encode_string_into(
    string: impl AsRef<str>,
    buf: &mut impl Write,
) -> Result<u16, EncodeError> {
    let string = string.as_ref();

    if !string.is_ascii() {
        return Err(EncodeError::NonAsciiString(string.to_string()));
    }

    let len = string.len();
    buf.write_all(&(len as u8).to_be_bytes())?;
    write!(buf, "{}", string)?;
    Ok(1 + len as u16)
}
