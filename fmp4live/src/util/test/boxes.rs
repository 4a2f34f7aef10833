use crate::parse::{BoxHeader, FourCC};

/// A box written as a plain 8-byte header, followed by its fields, followed by its children.
#[derive(Clone, Debug)]
pub struct TestBox {
    box_type: FourCC,
    raw_length: Option<u32>,
    fields: Vec<u8>,
    children: Vec<TestBox>,
}

pub fn test_box(box_type: FourCC) -> TestBox {
    TestBox { box_type, raw_length: None, fields: vec![], children: vec![] }
}

impl TestBox {
    /// A box whose header declares `raw_length` regardless of what is actually written after it.
    pub fn with_raw_length(box_type: FourCC, raw_length: u32) -> Self {
        Self { raw_length: Some(raw_length), ..test_box(box_type) }
    }

    pub fn fields(mut self, write: impl FnOnce(&mut Vec<u8>)) -> Self {
        write(&mut self.fields);
        self
    }

    pub fn child(mut self, child: TestBox) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = TestBox>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn encoded_len(&self) -> usize {
        BoxHeader::ENCODED_LEN + self.fields.len() + self.children.iter().map(TestBox::encoded_len).sum::<usize>()
    }

    pub fn put_buf(&self, out: &mut Vec<u8>) {
        let length = self.raw_length.unwrap_or(self.encoded_len() as u32);
        out.extend_from_slice(&length.to_be_bytes());
        self.box_type.put_buf(&mut *out);
        out.extend_from_slice(&self.fields);
        for child in &self.children {
            child.put_buf(out);
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.put_buf(&mut out);
        out
    }
}

/// A full box header: one byte of version then 24 bits of flags.
pub fn write_full_box_header(out: &mut Vec<u8>, version: u8, flags: u32) {
    out.push(version);
    out.extend_from_slice(&flags.to_be_bytes()[1..]);
}
