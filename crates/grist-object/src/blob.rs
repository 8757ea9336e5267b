use crate::ObjectError;

/// A blob: raw file content. Identity bytes in, identity bytes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        Ok(Self {
            data: content.to_vec(),
        })
    }

    pub fn serialize_content(&self) -> &[u8] {
        &self.data
    }
}
