use bstr::{BStr, BString, ByteSlice};

use crate::ObjectError;

/// Author/committer/tagger identity.
///
/// The `date` field is carried as a single opaque token (seconds plus
/// timezone, e.g. `"1112912053 -0700"`); this codec never interprets it.
/// Neither name nor email is escaped, so callers must keep `<` and `>`
/// out of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub date: BString,
}

impl Signature {
    /// Parse from the canonical format: `Name <email> date`.
    pub fn parse(input: &BStr) -> Result<Self, ObjectError> {
        let input = input.as_bytes();

        let lt_pos = input
            .find_byte(b'<')
            .ok_or_else(|| ObjectError::InvalidSignature("missing '<'".into()))?;
        let name = input[..lt_pos].trim_end_with(|c| c == ' ');

        let rest = &input[lt_pos + 1..];
        let gt_pos = rest
            .find_byte(b'>')
            .ok_or_else(|| ObjectError::InvalidSignature("missing '>'".into()))?;
        let email = &rest[..gt_pos];

        let after = &rest[gt_pos + 1..];
        let date = after
            .strip_prefix(b" ")
            .ok_or_else(|| ObjectError::InvalidSignature("missing space before date".into()))?;

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            date: BString::from(date),
        })
    }

    /// Serialize to the canonical format: `Name <email> date`.
    pub fn to_bytes(&self) -> BString {
        let mut out = Vec::with_capacity(self.name.len() + self.email.len() + self.date.len() + 4);
        out.extend_from_slice(&self.name);
        out.extend_from_slice(b" <");
        out.extend_from_slice(&self.email);
        out.extend_from_slice(b"> ");
        out.extend_from_slice(&self.date);
        BString::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical() {
        let sig = Signature::parse(BStr::new(
            b"A U Thor <author@example.com> 1112912053 -0700",
        ))
        .unwrap();
        assert_eq!(sig.name, "A U Thor");
        assert_eq!(sig.email, "author@example.com");
        assert_eq!(sig.date, "1112912053 -0700");
    }

    #[test]
    fn serialize_roundtrip() {
        let input: &[u8] = b"Jane Doe <jane@example.com> 1234567890 +0530";
        let sig = Signature::parse(BStr::new(input)).unwrap();
        assert_eq!(sig.to_bytes(), input);
    }

    #[test]
    fn empty_name() {
        let sig = Signature::parse(BStr::new(b"<nobody@example.com> 0 +0000")).unwrap();
        assert_eq!(sig.name, "");
        assert_eq!(sig.email, "nobody@example.com");
    }

    #[test]
    fn date_is_opaque() {
        // Whatever follows "> " is kept verbatim.
        let sig = Signature::parse(BStr::new(b"A <a@b> not-even-a-number")).unwrap();
        assert_eq!(sig.date, "not-even-a-number");
    }

    #[test]
    fn missing_angle_brackets() {
        assert!(Signature::parse(BStr::new(b"no email here")).is_err());
        assert!(Signature::parse(BStr::new(b"A <a@b 123 +0000")).is_err());
    }

    #[test]
    fn missing_space_after_email() {
        assert!(Signature::parse(BStr::new(b"A <a@b>123 +0000")).is_err());
    }
}
