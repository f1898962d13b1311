//! Reader for the obfuscated bytecode container.
//!
//! The wire format is a status byte, a pooled string table, a prototype
//! table (children before parents), and a trailing main-prototype index.
//! All counts and string references are LEB128 varints; instruction words
//! carry a per-opcode byte permutation that [`opcode::remap_table`]
//! inverts. Constants are promoted to AST expressions as they are read, so
//! later stages never see raw constant entries.

pub mod chunk;
pub mod constant;
pub mod error;
pub mod instruction;
pub mod opcode;

use nom::number::complete::le_u8;

use ember_ast::Ast;

pub use chunk::{Chunk, Proto};
pub use error::ReadError;

use error::{into_read_error, ByteResult, DecodeError};

/// Parse a LEB128-encoded unsigned integer (wrapping to 32 bits).
pub(crate) fn leb128_u32(input: &[u8]) -> ByteResult<'_, u32> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    let mut i = input;
    loop {
        let (rest, byte) = le_u8(i)?;
        if shift < 64 {
            result |= ((byte & 0x7F) as u64) << shift;
        }
        i = rest;
        if byte & 0x80 == 0 {
            return Ok((i, result as u32));
        }
        shift += 7;
    }
}

pub(crate) fn leb128_usize(input: &[u8]) -> ByteResult<'_, usize> {
    let (rest, value) = leb128_u32(input)?;
    Ok((rest, value as usize))
}

/// Parse a fixed-length list.
pub(crate) fn parse_list_len<'a, T>(
    input: &'a [u8],
    parser: impl Fn(&'a [u8]) -> ByteResult<'a, T>,
    length: usize,
) -> ByteResult<'a, Vec<T>> {
    let mut items = Vec::with_capacity(length.min(input.len()));
    let mut input = input;
    for _ in 0..length {
        let (rest, item) = parser(input)?;
        items.push(item);
        input = rest;
    }
    Ok((input, items))
}

/// Parse a length-prefixed list using a LEB128 length.
pub(crate) fn parse_list<'a, T>(
    input: &'a [u8],
    parser: impl Fn(&'a [u8]) -> ByteResult<'a, T>,
) -> ByteResult<'a, Vec<T>> {
    let (input, length) = leb128_usize(input)?;
    parse_list_len(input, parser, length)
}

/// Parse a length-prefixed byte string.
pub(crate) fn parse_string(input: &[u8]) -> ByteResult<'_, Vec<u8>> {
    let (input, length) = leb128_usize(input)?;
    let (rest, bytes) = nom::bytes::complete::take(length)(input)?;
    Ok((rest, bytes.to_owned()))
}

/// Read a compiled program.
///
/// Returns the prototype forest (with constants already promoted into
/// `ast`) or a [`ReadError`]. `Chunk::flagged` reports advisory conditions
/// met while reading; it is not an error.
pub fn read(bytes: &[u8], ast: &mut Ast) -> Result<Chunk, ReadError> {
    let (input, status) =
        le_u8::<_, DecodeError<'_>>(bytes).map_err(|e| into_read_error(bytes, e))?;

    if status == 0 {
        let message = String::from_utf8_lossy(&bytes[1..]).into_owned();
        return Err(ReadError::Rejected(message));
    }
    if status > 1 {
        return Err(ReadError::Version(status));
    }

    match Chunk::parse(input, ast) {
        Ok((_, chunk)) => Ok(chunk),
        Err(err) => Err(into_read_error(bytes, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_single_and_multi_byte() {
        assert_eq!(leb128_u32(&[0x00]).unwrap().1, 0);
        assert_eq!(leb128_u32(&[0x7F]).unwrap().1, 127);
        assert_eq!(leb128_u32(&[0x80, 0x01]).unwrap().1, 128);
        assert_eq!(leb128_u32(&[0xE5, 0x8E, 0x26]).unwrap().1, 624_485);
    }

    #[test]
    fn varint_five_bytes_covers_u32() {
        let (rest, value) = leb128_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x42]).unwrap();
        assert_eq!(value, u32::MAX);
        assert_eq!(rest, &[0x42]);
    }

    #[test]
    fn varint_truncated_is_an_error() {
        assert!(leb128_u32(&[0x80]).is_err());
    }

    #[test]
    fn status_zero_carries_the_compiler_message() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(b"compile error: x");
        let mut ast = Ast::new();
        assert_eq!(
            read(&bytes, &mut ast),
            Err(ReadError::Rejected("compile error: x".to_string()))
        );
    }

    #[test]
    fn unknown_status_is_a_version_mismatch() {
        let mut ast = Ast::new();
        assert_eq!(read(&[2u8], &mut ast), Err(ReadError::Version(2)));
    }

    #[test]
    fn empty_input_is_malformed() {
        let mut ast = Ast::new();
        assert!(matches!(
            read(&[], &mut ast),
            Err(ReadError::Malformed { offset: 0, .. })
        ));
    }
}
