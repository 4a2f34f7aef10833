use std::fmt;

use bytes::BufMut;

/// A four-byte character code, the type tag of an ISO Base Media File Format box.
///
/// No validation is performed that the bytes are printable ASCII.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FourCC {
    /// The character code, as an array of four bytes.
    pub value: [u8; 4],
}

macro_rules! box_types {
    ($($name:ident => $value:literal),+ $(,)?) => {
        impl FourCC {
            $(
                #[doc = concat!("The `", $value, "` box type.")]
                pub const $name: Self = Self::from_str($value);
            )+
        }
    };
}

box_types! {
    AVC1 => "avc1",
    AVCC => "avcC",
    FTYP => "ftyp",
    HDLR => "hdlr",
    MDAT => "mdat",
    MDHD => "mdhd",
    MDIA => "mdia",
    MFHD => "mfhd",
    MINF => "minf",
    MOOF => "moof",
    MOOV => "moov",
    MVHD => "mvhd",
    STBL => "stbl",
    STSD => "stsd",
    STYP => "styp",
    TFDT => "tfdt",
    TFHD => "tfhd",
    TKHD => "tkhd",
    TRAF => "traf",
    TRAK => "trak",
    TRUN => "trun",
}

impl FourCC {
    /// The encoded length of a [`FourCC`], in bytes.
    pub const ENCODED_LEN: usize = 4;

    /// Construct a [`FourCC`] from a string of at most four bytes, padding with spaces.
    pub const fn from_str(name: &str) -> Self {
        let name = name.as_bytes();
        let mut fourcc = [b' '; 4];
        let mut name_idx = 0;
        while name_idx < name.len() && name_idx < 4 {
            fourcc[name_idx] = name[name_idx];
            name_idx += 1;
        }
        FourCC { value: fourcc }
    }

    /// Writes `self` to the [`BufMut`] `out`.
    pub fn put_buf<B: BufMut>(&self, mut out: B) {
        out.put(&self.value[..])
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(value: [u8; 4]) -> Self {
        Self { value }
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.value) {
            Ok(string) => write!(f, "{}", string.trim()),
            Err(_) => write!(f, "0x{:08x}", u32::from_be_bytes(self.value)),
        }
    }
}
