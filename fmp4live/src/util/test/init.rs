use bytes::Bytes;
use derive_builder::Builder;

use crate::parse::FourCC;

use super::boxes::{test_box, write_full_box_header, TestBox};

const DINF: FourCC = FourCC::from_str("dinf");
const DREF: FourCC = FourCC::from_str("dref");
const MEHD: FourCC = FourCC::from_str("mehd");
const MVEX: FourCC = FourCC::from_str("mvex");
const STCO: FourCC = FourCC::from_str("stco");
const STSC: FourCC = FourCC::from_str("stsc");
const STSZ: FourCC = FourCC::from_str("stsz");
const STTS: FourCC = FourCC::from_str("stts");
const TREX: FourCC = FourCC::from_str("trex");
const URL: FourCC = FourCC::from_str("url");
const VMHD: FourCC = FourCC::from_str("vmhd");

/// An initialization segment laid out the way a live camera server writes it: a brand box, then a `moov` with a single
/// AVC video track and movie extends.
#[derive(Builder)]
#[builder(name = "TestInitBuilder", build_fn(name = "build_spec"))]
pub struct TestInitSpec {
    #[builder(default = "FourCC::STYP")]
    brand_box: FourCC,

    /// Profile, compatibility and level bytes.
    #[builder(default = "[0x64, 0x00, 0x1f]")]
    profile: [u8; 3],

    #[builder(default = "true")]
    avcc: bool,

    /// Truncate the `avcC` payload to this many bytes.
    #[builder(default)]
    #[builder(setter(strip_option))]
    avcc_len: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct TestInit {
    styp: Vec<u8>,
    moov: Vec<u8>,
}

impl TestInitBuilder {
    pub fn build(&self) -> TestInit {
        let spec = self.build_spec().unwrap();

        let styp = test_box(spec.brand_box)
            .fields(|out| {
                out.extend_from_slice(b"mp41"); // major brand
                out.extend_from_slice(&[0; 4]); // minor version
                out.extend_from_slice(b"isommp41"); // compatible brands
            })
            .to_vec();

        let mut avcc = vec![1]; // configuration version
        avcc.extend_from_slice(&spec.profile);
        avcc.extend_from_slice(&[0xff, 0xe0, 0x00]); // length size, no sps, no pps
        if let Some(len) = spec.avcc_len {
            avcc.truncate(len);
        }

        let mut avc1 = test_box(FourCC::AVC1).fields(write_avc1_fields);
        if spec.avcc {
            avc1 = avc1.child(test_box(FourCC::AVCC).fields(|out| out.extend_from_slice(&avcc)));
        }

        let stbl = test_box(FourCC::STBL).children([
            test_box(FourCC::STSD)
                .fields(|out| {
                    write_full_box_header(out, 0, 0);
                    out.extend_from_slice(&1u32.to_be_bytes()); // entry count
                })
                .child(avc1),
            empty_table(STTS),
            empty_table(STSC),
            test_box(STSZ).fields(|out| {
                write_full_box_header(out, 0, 0);
                out.extend_from_slice(&[0; 8]); // sample size, sample count
            }),
            empty_table(STCO),
        ]);

        let minf = test_box(FourCC::MINF).children([
            test_box(VMHD).fields(|out| {
                write_full_box_header(out, 0, 1);
                out.extend_from_slice(&[0; 8]); // graphics mode, opcolor
            }),
            test_box(DINF).child(
                test_box(DREF)
                    .fields(|out| {
                        write_full_box_header(out, 0, 0);
                        out.extend_from_slice(&1u32.to_be_bytes()); // entry count
                    })
                    .child(test_box(URL).fields(|out| write_full_box_header(out, 0, 1))),
            ),
            stbl,
        ]);

        let mdia = test_box(FourCC::MDIA).children([
            test_box(FourCC::MDHD).fields(|out| {
                write_full_box_header(out, 0, 0);
                out.extend_from_slice(&[0; 8]); // creation, modification time
                out.extend_from_slice(&90000u32.to_be_bytes()); // timescale
                out.extend_from_slice(&[0; 4]); // duration
                out.extend_from_slice(&[0x55, 0xc4, 0, 0]); // language, pre-defined
            }),
            test_box(FourCC::HDLR).fields(|out| {
                write_full_box_header(out, 0, 0);
                out.extend_from_slice(&[0; 4]); // pre-defined
                out.extend_from_slice(b"vide");
                out.extend_from_slice(&[0; 12]); // reserved
                out.extend_from_slice(b"VideoHandler\0");
            }),
            minf,
        ]);

        let trak = test_box(FourCC::TRAK).children([
            test_box(FourCC::TKHD).fields(|out| {
                write_full_box_header(out, 0, 3);
                out.extend_from_slice(&[0; 8]); // creation, modification time
                out.extend_from_slice(&1u32.to_be_bytes()); // track id
                out.extend_from_slice(&[0; 64]); // reserved, duration, layer, volume, matrix, ...
                out.extend_from_slice(&(1280u32 << 16).to_be_bytes()); // width
                out.extend_from_slice(&(720u32 << 16).to_be_bytes()); // height
            }),
            mdia,
        ]);

        let moov = test_box(FourCC::MOOV)
            .children([
                test_box(FourCC::MVHD).fields(|out| {
                    write_full_box_header(out, 0, 0);
                    out.extend_from_slice(&[0; 8]); // creation, modification time
                    out.extend_from_slice(&1000u32.to_be_bytes()); // timescale
                    out.extend_from_slice(&[0; 80]); // duration, rate, volume, matrix, ...
                    out.extend_from_slice(&2u32.to_be_bytes()); // next track id
                }),
                trak,
                test_box(MVEX).children([
                    test_box(MEHD).fields(|out| {
                        write_full_box_header(out, 0, 0);
                        out.extend_from_slice(&[0; 4]); // fragment duration
                    }),
                    test_box(TREX).fields(|out| {
                        write_full_box_header(out, 0, 0);
                        out.extend_from_slice(&1u32.to_be_bytes()); // track id
                        out.extend_from_slice(&1u32.to_be_bytes()); // default sample description index
                        out.extend_from_slice(&[0; 12]); // default duration, size, flags
                    }),
                ]),
            ])
            .to_vec();

        TestInit { styp, moov }
    }
}

impl TestInit {
    pub fn styp_bytes(&self) -> Vec<u8> {
        self.styp.clone()
    }

    pub fn moov_bytes(&self) -> Vec<u8> {
        self.moov.clone()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        [&self.styp[..], &self.moov[..]].concat()
    }

    pub fn to_bytes(&self) -> Bytes {
        self.to_vec().into()
    }
}

fn empty_table(box_type: FourCC) -> TestBox {
    test_box(box_type).fields(|out| {
        write_full_box_header(out, 0, 0);
        out.extend_from_slice(&[0; 4]); // entry count
    })
}

/// The 78 bytes of a visual sample entry preceding its child boxes.
fn write_avc1_fields(out: &mut Vec<u8>) {
    out.extend_from_slice(&[0; 6]); // reserved
    out.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    out.extend_from_slice(&[0; 16]); // pre-defined, reserved
    out.extend_from_slice(&1280u16.to_be_bytes()); // width
    out.extend_from_slice(&720u16.to_be_bytes()); // height
    out.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // horizontal resolution
    out.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // vertical resolution
    out.extend_from_slice(&[0; 4]); // reserved
    out.extend_from_slice(&1u16.to_be_bytes()); // frame count
    out.extend_from_slice(&[0; 32]); // compressor name
    out.extend_from_slice(&0x0018u16.to_be_bytes()); // depth
    out.extend_from_slice(&(-1i16).to_be_bytes()); // pre-defined
}
