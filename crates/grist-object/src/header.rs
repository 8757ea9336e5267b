use crate::{ObjectError, ObjectType};

/// Parse a typed envelope header from raw bytes.
///
/// The header format is `"<kind> <size>\0"`. Returns
/// `(kind, content_size, header_length)` where `header_length` includes
/// the null terminator.
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, usize, usize), ObjectError> {
    let null_pos = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ObjectError::InvalidHeader("missing null terminator".into()))?;

    let header = &data[..null_pos];
    let space_pos = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space in header".into()))?;

    let kind = ObjectType::from_bytes(&header[..space_pos])?;

    let size_str = std::str::from_utf8(&header[space_pos + 1..])
        .map_err(|_| ObjectError::InvalidHeader("non-ASCII size".into()))?;
    let content_size: usize = size_str
        .parse()
        .map_err(|_| ObjectError::InvalidHeader(format!("invalid size: {size_str}")))?;

    Ok((kind, content_size, null_pos + 1))
}

/// Write a typed envelope header: `"<kind> <size>\0"`.
pub fn write_header(kind: ObjectType, content_size: usize) -> Vec<u8> {
    format!("{} {}\0", kind, content_size).into_bytes()
}
