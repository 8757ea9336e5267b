use bstr::{BStr, BString, ByteSlice};
use grist_hash::ObjectId;

use crate::signature::Signature;
use crate::{ObjectError, ObjectType};

/// An annotated tag object.
///
/// The body mirrors the commit schema: `object`, `type`, `tag`, an
/// optional `tagger`, a blank line, then the message. Very old tags in
/// the wild omit the tagger, so it stays optional here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Id of the tagged object.
    pub target: ObjectId,
    /// Kind of the tagged object.
    pub target_type: ObjectType,
    /// Tag name.
    pub name: BString,
    pub tagger: Option<Signature>,
    pub message: BString,
}

fn take_line<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], ObjectError> {
    let rest = &data[*pos..];
    let nl = rest
        .find_byte(b'\n')
        .ok_or_else(|| ObjectError::InvalidHeader("unterminated header line".into()))?;
    let line = &rest[..nl];
    *pos += nl + 1;
    Ok(line)
}

fn header_value<'a>(line: &'a [u8], keyword: &'static str) -> Result<&'a [u8], ObjectError> {
    line.strip_prefix(keyword.as_bytes())
        .and_then(|rest| rest.strip_prefix(b" "))
        .ok_or(ObjectError::MissingTagField { field: keyword })
}

impl Tag {
    /// Parse tag content (no envelope header).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut pos = 0;

        let object_line = take_line(content, &mut pos)?;
        let hex = std::str::from_utf8(header_value(object_line, "object")?)
            .map_err(|_| ObjectError::InvalidHeader("non-UTF8 target id".into()))?;
        let target = ObjectId::from_hex(hex)?;

        let type_line = take_line(content, &mut pos)?;
        let target_type = ObjectType::from_bytes(header_value(type_line, "type")?)?;

        let tag_line = take_line(content, &mut pos)?;
        let name = BString::from(header_value(tag_line, "tag")?);

        // Optional tagger, then the blank separator.
        let mut tagger = None;
        let line = take_line(content, &mut pos)?;
        let separator = if let Some(value) = line.strip_prefix(b"tagger ") {
            tagger = Some(Signature::parse(BStr::new(value))?);
            take_line(content, &mut pos)?
        } else {
            line
        };
        if !separator.is_empty() {
            return Err(ObjectError::InvalidHeader(
                "missing blank line before message".into(),
            ));
        }

        Ok(Self {
            target,
            target_type,
            name,
            tagger,
            message: BString::from(&content[pos..]),
        })
    }

    /// Serialize tag content (no envelope header).
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"object ");
        out.extend_from_slice(self.target.to_hex().as_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"type ");
        out.extend_from_slice(self.target_type.as_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"tag ");
        out.extend_from_slice(&self.name);
        out.push(b'\n');

        if let Some(ref tagger) = self.tagger {
            out.extend_from_slice(b"tagger ");
            out.extend_from_slice(&tagger.to_bytes());
            out.push(b'\n');
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);

        out
    }
}
