#![warn(missing_docs)]

//! `fmp4live-common` holds the pieces shared by the `fmp4live` crates: the four-character box code, and the
//! [`Report`] error stack used to say exactly where in a box walk something went wrong.

#[macro_use]
pub mod macros;

pub mod error;
pub mod parse;

//
// public types
//

pub use error::{Report, ReportStack, ReportableError, Result, ResultExt};
pub use parse::FourCC;
