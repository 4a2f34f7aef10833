//! Primitive types used when walking ISO Base Media File Format boxes.

mod fourcc;

pub use fourcc::FourCC;
