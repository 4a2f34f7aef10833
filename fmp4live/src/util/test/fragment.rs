use bytes::Bytes;
use derive_builder::Builder;

use crate::parse::FourCC;

use super::boxes::{test_box, write_full_box_header, TestBox};

const UUID: FourCC = FourCC::from_str("uuid");

/// A media fragment laid out the way a live camera server writes it: `moof` with a single track fragment, then `mdat`.
#[derive(Builder)]
#[builder(name = "TestFragmentBuilder", build_fn(name = "build_spec"))]
pub struct TestFragmentSpec {
    /// Whether `trun` overrides the first sample's flags, marking a keyframe.
    #[builder(default = "true")]
    first_sample_flags: bool,

    #[builder(default = "true")]
    traf: bool,

    #[builder(default = "true")]
    trun: bool,

    #[builder(default = "1")]
    sequence: u32,

    #[builder(default = "vec![0x65; 16]")]
    #[builder(setter(into))]
    payload: Vec<u8>,
}

pub type TestFragment = Bytes;

impl TestFragmentBuilder {
    pub fn build(&self) -> TestFragment {
        let spec = self.build_spec().unwrap();

        // `data_offset` points past the `moof` into the `mdat` payload, so the `moof` length must be known first.
        let moof_len = spec.moof(0).encoded_len();
        let mut out = spec.moof(moof_len + 8).to_vec();
        test_box(FourCC::MDAT).fields(|out| out.extend_from_slice(&spec.payload)).put_buf(&mut out);
        out.into()
    }
}

impl TestFragmentSpec {
    fn moof(&self, data_offset: usize) -> TestBox {
        let mut traf = test_box(FourCC::TRAF).children([
            test_box(FourCC::TFDT).fields(|out| {
                write_full_box_header(out, 1, 0);
                out.extend_from_slice(&(u64::from(self.sequence) * 3000).to_be_bytes()); // base media decode time
            }),
            test_box(FourCC::TFHD).fields(|out| {
                write_full_box_header(out, 0, 0x020000); // default-base-is-moof
                out.extend_from_slice(&1u32.to_be_bytes()); // track id
            }),
        ]);
        if self.trun {
            let flags = if self.first_sample_flags { 0x000305 } else { 0x000301 };
            traf = traf.child(test_box(FourCC::TRUN).fields(|out| {
                write_full_box_header(out, 1, flags);
                out.extend_from_slice(&1u32.to_be_bytes()); // sample count
                out.extend_from_slice(&(data_offset as i32).to_be_bytes());
                if self.first_sample_flags {
                    out.extend_from_slice(&0x0200_0000u32.to_be_bytes()); // sample depends on no other
                }
                out.extend_from_slice(&3000u32.to_be_bytes()); // sample duration
                out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes()); // sample size
            }));
        }
        traf = traf.child(test_box(UUID).fields(|out| out.extend_from_slice(&[0; 16])));

        let mut moof = test_box(FourCC::MOOF).child(test_box(FourCC::MFHD).fields(|out| {
            write_full_box_header(out, 0, 0);
            out.extend_from_slice(&self.sequence.to_be_bytes());
        }));
        if self.traf {
            moof = moof.child(traf);
        }
        moof
    }
}
