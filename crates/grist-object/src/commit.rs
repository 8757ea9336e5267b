use bstr::{BStr, BString, ByteSlice};
use grist_hash::{CommitId, TreeId};

use crate::signature::Signature;
use crate::ObjectError;

/// A commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Id of the root tree.
    pub tree: TreeId,
    /// Parent commit ids: empty for a root commit, several for a merge.
    pub parents: Vec<CommitId>,
    pub author: Signature,
    pub committer: Signature,
    /// Everything after the blank separator line, verbatim (trailing
    /// newline included).
    pub message: BString,
}

/// Take the next newline-terminated line, advancing `pos` past it.
fn take_line<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], ObjectError> {
    let rest = &data[*pos..];
    let nl = rest
        .find_byte(b'\n')
        .ok_or_else(|| ObjectError::InvalidHeader("unterminated header line".into()))?;
    let line = &rest[..nl];
    *pos += nl + 1;
    Ok(line)
}

/// Strip `"<keyword> "` from a header line.
fn header_value<'a>(line: &'a [u8], keyword: &'static str) -> Result<&'a [u8], ObjectError> {
    line.strip_prefix(keyword.as_bytes())
        .and_then(|rest| rest.strip_prefix(b" "))
        .ok_or(ObjectError::MissingCommitField { field: keyword })
}

fn hex_value<'a>(value: &'a [u8], field: &'static str) -> Result<&'a str, ObjectError> {
    std::str::from_utf8(value)
        .map_err(|_| ObjectError::InvalidHeader(format!("non-UTF8 {field} id")))
}

impl Commit {
    /// Parse commit content (no envelope header).
    ///
    /// The schema is strict and ordered: `tree`, zero or more `parent`,
    /// `author`, `committer`, a blank line, then the raw message.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut pos = 0;

        let tree_line = take_line(content, &mut pos)?;
        let tree = TreeId::from_hex(hex_value(header_value(tree_line, "tree")?, "tree")?)?;

        let mut parents = Vec::new();
        let author_line = loop {
            let line = take_line(content, &mut pos)?;
            match line.strip_prefix(b"parent ") {
                Some(value) => {
                    parents.push(CommitId::from_hex(hex_value(value, "parent")?)?);
                }
                None => break line,
            }
        };

        let author = Signature::parse(BStr::new(header_value(author_line, "author")?))?;

        let committer_line = take_line(content, &mut pos)?;
        let committer =
            Signature::parse(BStr::new(header_value(committer_line, "committer")?))?;

        // Blank line separates headers from the message.
        match content.get(pos) {
            Some(b'\n') => pos += 1,
            _ => {
                return Err(ObjectError::InvalidHeader(
                    "missing blank line before message".into(),
                ))
            }
        }

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: BString::from(&content[pos..]),
        })
    }

    /// Serialize commit content (no envelope header).
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');

        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_bytes());
        out.push(b'\n');

        out.push(b'\n');
        out.extend_from_slice(&self.message);

        out
    }

    /// First parent, or `None` for a root commit.
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        out.extend_from_slice(b"parent 0000000000000000000000000000000000000001\n");
        out.extend_from_slice(b"author John Doe <john@example.com> 1234567890 +0000\n");
        out.extend_from_slice(b"committer Jane Doe <jane@example.com> 1234567890 +0000\n");
        out.extend_from_slice(b"\n");
        out.extend_from_slice(b"Initial commit\n");
        out
    }

    #[test]
    fn parse_commit() {
        let commit = Commit::parse(&sample_commit_bytes()).unwrap();
        assert_eq!(commit.tree.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(commit.parents.len(), 1);
        assert_eq!(commit.author.name, "John Doe");
        assert_eq!(commit.author.date, "1234567890 +0000");
        assert_eq!(commit.committer.email, "jane@example.com");
        assert_eq!(commit.message, "Initial commit\n");
    }

    #[test]
    fn parse_root_commit() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nroot\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.is_root());
        assert!(!commit.is_merge());
        assert!(commit.first_parent().is_none());
    }

    #[test]
    fn parse_merge_commit() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"parent 0000000000000000000000000000000000000001\n");
        data.extend_from_slice(b"parent 0000000000000000000000000000000000000002\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nMerge\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.is_merge());
        assert_eq!(commit.parents.len(), 2);
    }

    #[test]
    fn serialize_roundtrip() {
        let original_bytes = sample_commit_bytes();
        let commit = Commit::parse(&original_bytes).unwrap();
        assert_eq!(commit.serialize_content(), original_bytes);
        // Emit is deterministic.
        assert_eq!(commit.serialize_content(), commit.serialize_content());
    }

    #[test]
    fn message_tail_is_verbatim() {
        let mut data = sample_commit_bytes();
        data.extend_from_slice(b"\nbody with trailing blank\n\n");
        let commit = Commit::parse(&data).unwrap();
        assert_eq!(
            commit.message,
            "Initial commit\n\nbody with trailing blank\n\n"
        );
        assert_eq!(commit.serialize_content(), data);
    }

    #[test]
    fn missing_tree_errors() {
        let data =
            b"author A <a@b.com> 1 +0000\ncommitter A <a@b.com> 1 +0000\n\nmsg\n";
        assert!(matches!(
            Commit::parse(data).unwrap_err(),
            ObjectError::MissingCommitField { field: "tree" }
        ));
    }

    #[test]
    fn committer_before_author_errors() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"committer A <a@b.com> 1 +0000\n");
        data.extend_from_slice(b"author A <a@b.com> 1 +0000\n");
        data.extend_from_slice(b"\nmsg\n");
        assert!(Commit::parse(&data).is_err());
    }

    #[test]
    fn missing_blank_line_errors() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1 +0000\n");
        data.extend_from_slice(b"msg without separator\n");
        assert!(Commit::parse(&data).is_err());
    }

    #[test]
    fn empty_message_after_separator() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1 +0000\n");
        data.extend_from_slice(b"\n");
        let commit = Commit::parse(&data).unwrap();
        assert!(commit.message.is_empty());
        assert_eq!(commit.serialize_content(), data);
    }
}
