//! Text codecs between Rust strings and native character buffers.
//!
//! Three encodings are supported: ASCII (non-ASCII characters become
//! `?`), UTF-8, and UTF-16 in native byte order. Decoders accept either a
//! fixed length or scan for a terminator; encoders write into a
//! fixed-capacity destination and refuse to truncate.

#![allow(unsafe_code)]

use keel_core::MemoryError;

use crate::owned::OwnedPtr;
use crate::pointer::{MemoryBacked, WritePointer};
use crate::util::find_first_raw;

/// Character encoding of a native string buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// 7-bit ASCII, one byte per character.
    Ascii,
    /// UTF-8.
    Utf8,
    /// UTF-16, native byte order, two bytes per code unit.
    Utf16,
}

impl Encoding {
    /// Bytes per code unit, which is also the terminator width.
    pub const fn unit_size(self) -> usize {
        match self {
            Self::Ascii | Self::Utf8 => 1,
            Self::Utf16 => 2,
        }
    }

    /// Encode `text` without a terminator.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16 => text.encode_utf16().flat_map(u16::to_ne_bytes).collect(),
        }
    }

    /// Encode `text` followed by a zero terminator, unless `text` already
    /// ends with `'\0'`.
    pub fn encode_terminated(self, text: &str) -> Vec<u8> {
        let mut bytes = self.encode(text);
        if !text.ends_with('\0') {
            bytes.resize(bytes.len() + self.unit_size(), 0);
        }
        bytes
    }

    fn decode_units(self, bytes: &[u8]) -> String {
        match self {
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '?' })
                .collect(),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16 => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }
}

/// Decode ASCII bytes, stopping at the first zero when `null_terminated`.
pub fn decode_ascii(bytes: &[u8], null_terminated: bool) -> String {
    Encoding::Ascii.decode_units(terminated(bytes, null_terminated))
}

/// Decode UTF-8 bytes, stopping at the first zero when `null_terminated`.
/// Invalid sequences become U+FFFD.
pub fn decode_utf8(bytes: &[u8], null_terminated: bool) -> String {
    Encoding::Utf8.decode_units(terminated(bytes, null_terminated))
}

/// Decode UTF-16 code units, stopping at the first zero unit when
/// `null_terminated`. Unpaired surrogates become U+FFFD.
pub fn decode_utf16(units: &[u16], null_terminated: bool) -> String {
    let end = if null_terminated {
        units.iter().position(|&u| u == 0).unwrap_or(units.len())
    } else {
        units.len()
    };
    String::from_utf16_lossy(&units[..end])
}

fn terminated(bytes: &[u8], null_terminated: bool) -> &[u8] {
    if null_terminated {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        &bytes[..end]
    } else {
        bytes
    }
}

/// Decode a native string at a raw address. A null address yields `None`.
///
/// `length` counts code units. A negative length scans for the
/// terminator with no bound. A non-negative length is the exact length,
/// or the maximum length when `null_terminated`.
///
/// # Safety
///
/// `ptr` must be readable for `length` code units, or up to and including
/// a terminator when scanning.
pub unsafe fn decode_raw(
    ptr: *const u8,
    encoding: Encoding,
    length: isize,
    null_terminated: bool,
) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let units = match usize::try_from(length) {
        Err(_) => unsafe { terminator_index(ptr, encoding, None) }.unwrap_or(0),
        Ok(max) if null_terminated => {
            unsafe { terminator_index(ptr, encoding, Some(max)) }.unwrap_or(max)
        }
        Ok(exact) => exact,
    };
    // SAFETY: the range was bounded above.
    let bytes = unsafe { std::slice::from_raw_parts(ptr, units * encoding.unit_size()) };
    Some(encoding.decode_units(bytes))
}

unsafe fn terminator_index(
    ptr: *const u8,
    encoding: Encoding,
    max: Option<usize>,
) -> Option<usize> {
    // SAFETY: forwarded from `decode_raw`'s contract.
    unsafe {
        match encoding {
            Encoding::Ascii | Encoding::Utf8 => find_first_raw(ptr, 0u8, max),
            Encoding::Utf16 => find_first_raw(ptr.cast::<u16>(), 0u16, max),
        }
    }
}

/// Decode the string a byte pointer addresses.
///
/// As [`decode_raw`], except that a pointer with a known extent bounds
/// the terminator scan and the explicit length.
pub fn decode<P>(
    ptr: &P,
    encoding: Encoding,
    length: isize,
    null_terminated: bool,
) -> Option<String>
where
    P: MemoryBacked<Elem = u8>,
{
    let capacity = ptr.array_size().map(|bytes| bytes / encoding.unit_size());
    let (length, null_terminated) = match (capacity, usize::try_from(length)) {
        (Some(cap), Err(_)) => (cap as isize, true),
        (Some(cap), Ok(len)) => (len.min(cap) as isize, null_terminated),
        (None, _) => (length, null_terminated),
    };
    // SAFETY: the range is within the known extent, or covered by the
    // contract the pointer was constructed under.
    unsafe { decode_raw(ptr.as_ptr(), encoding, length, null_terminated) }
}

/// Encode `text` into `dst`, optionally terminated. Returns bytes written,
/// terminator included.
///
/// Fails with [`MemoryError::InvalidArgument`] if the encoded text or its
/// terminator does not fit. No terminator is added when `text` already
/// ends with `'\0'`.
pub fn encode_into(
    text: &str,
    encoding: Encoding,
    dst: &mut [u8],
    null_terminate: bool,
) -> Result<usize, MemoryError> {
    let encoded = encoding.encode(text);
    if encoded.len() > dst.len() {
        return Err(MemoryError::invalid_argument(format!(
            "{} encoded bytes do not fit in {} bytes",
            encoded.len(),
            dst.len()
        )));
    }
    dst[..encoded.len()].copy_from_slice(&encoded);
    let mut written = encoded.len();
    if null_terminate && !text.ends_with('\0') {
        let end = written + encoding.unit_size();
        if end > dst.len() {
            return Err(MemoryError::invalid_argument(
                "not enough space to append null terminator",
            ));
        }
        dst[written..end].fill(0);
        written = end;
    }
    Ok(written)
}

/// Encode `text` into at most `max_len` bytes at `ptr`.
///
/// A known extent caps `max_len`. Null and read-only pointers fail.
pub fn put<P>(
    text: &str,
    encoding: Encoding,
    ptr: &mut P,
    max_len: usize,
    null_terminate: bool,
) -> Result<usize, MemoryError>
where
    P: WritePointer<Elem = u8> + MemoryBacked,
{
    if !ptr.is_valid() {
        return Err(MemoryError::NullDereference);
    }
    if ptr.is_read_only() {
        return Err(MemoryError::ReadOnly);
    }
    let max_len = ptr.array_size().map_or(max_len, |n| n.min(max_len));
    // SAFETY: within the known extent, or covered by the contract the
    // pointer was constructed under.
    let dst = unsafe { std::slice::from_raw_parts_mut(ptr.as_mut_ptr(), max_len) };
    encode_into(text, encoding, dst, null_terminate)
}

/// Encode `text` into a fresh owned buffer.
pub fn alloc_text(text: &str, encoding: Encoding, null_terminate: bool) -> OwnedPtr<u8> {
    let bytes = if null_terminate {
        encoding.encode_terminated(text)
    } else {
        encoding.encode(text)
    };
    OwnedPtr::from_vec(bytes)
}
