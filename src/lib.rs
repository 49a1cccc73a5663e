#![warn(clippy::all)]

pub mod config;
pub mod datecode;
pub mod error;
pub mod listing;
pub mod reader;
#[cfg(test)]
mod test_utils;

pub use datecode::{DateBounds, DateCode, FilenameConvention};
pub use error::Error;
pub use listing::{list_files, list_files_with};
pub use reader::{FileListReader, Phase};

pub fn print_bytes(bytes: impl Into<f64>) -> String {
    pretty_bytes::converter::convert(bytes.into())
}
