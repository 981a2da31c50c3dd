//! File input and output for TIN surfaces.
//!
//! Every reader builds a fresh mesh and either returns it fully populated or
//! returns an error; a partially read mesh never escapes. Each codec has a
//! `_with_progress` twin whose reporter is polled between batches of records
//! and may cancel the operation.

use std::fs::File;
use std::io::{self, Read, Write};

pub mod adf;
pub mod dxf;
pub mod gms;
pub mod native;

/// Number of records between progress reports.
pub(crate) const PROGRESS_BATCH: usize = 128;

pub(crate) fn cancelled() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "cancelled by progress callback")
}

/// Reads a file to string.
pub fn read_to_string(path: &str) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Reads a file as a list of lines. Trailing carriage returns are stripped.
pub fn read_lines(path: &str) -> io::Result<Vec<String>> {
    Ok(read_to_string(path)?.lines().map(|l| l.to_string()).collect())
}

/// Writes a string to a file, replacing any existing content.
pub fn write_string(path: &str, data: &str) -> io::Result<()> {
    File::create(path)?.write_all(data.as_bytes())
}
