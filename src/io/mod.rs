//! FASTA/FASTQ record readers.
//!
//! These are deliberately thin: parsing and decompression sit at the edge of
//! the crate, outside the core classifier/builder, so a `Record` is the only
//! shape the rest of the crate needs to know about.

mod fasta;
mod fastq;

pub use fasta::FastaReader;
pub use fastq::FastqReader;

use std::fs::File;
use std::io::{BufReader, Read, Result, Seek};
use std::path::Path;

pub const BUFSIZE: usize = 8 * 1024 * 1024;

/// A single FASTA or FASTQ record.
///
/// `comment` is everything in the header after the first whitespace token
/// (the GTDB/SILVA lineage string for reference FASTA records); `qual` is
/// the raw Phred+33 quality string for FASTQ reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub comment: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

/// A record source, implemented by [`FastaReader`] and [`FastqReader`].
pub trait RecordReader {
    fn next_record(&mut self) -> Result<Option<Record>>;
}

fn is_gzipped(file: &mut File) -> Result<bool> {
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    file.rewind()?;
    Ok(n == 2 && magic == [0x1F, 0x8B])
}

/// Opens `path`, transparently wrapping it in a gzip decoder if its first two
/// bytes are the gzip magic number.
pub fn dyn_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read + Send>> {
    let mut file = open_file(path.as_ref())?;
    if is_gzipped(&mut file)? {
        Ok(Box::new(flate2::read::GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        } else {
            e
        }
    })
}

fn buffered(path: &Path) -> Result<BufReader<Box<dyn Read + Send>>> {
    Ok(BufReader::with_capacity(BUFSIZE, dyn_reader(path)?))
}

pub(crate) fn trim_end(buf: &mut Vec<u8>) {
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
}

pub(crate) fn split_header(header: &[u8]) -> (String, Option<String>) {
    let header = header.strip_prefix(b">").or_else(|| header.strip_prefix(b"@")).unwrap_or(header);
    let text = String::from_utf8_lossy(header);
    let text = text.trim_end();
    match text.split_once(char::is_whitespace) {
        Some((id, rest)) if !rest.trim().is_empty() => (id.to_string(), Some(rest.trim().to_string())),
        Some((id, _)) => (id.to_string(), None),
        None => (text.to_string(), None),
    }
}

/// Detects whether a file (by its first non-whitespace byte) is FASTA or
/// FASTQ, opening it with gzip transparency. Returns a boxed [`RecordReader`].
pub fn open_record_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn RecordReader>> {
    let path = path.as_ref();
    let mut probe = dyn_reader(path)?;
    let mut first = [0u8; 1];
    let n = probe.read(&mut first)?;
    drop(probe);
    let reader = buffered(path)?;
    if n == 1 && first[0] == b'@' {
        Ok(Box::new(fastq::FastqReader::new(reader)))
    } else {
        Ok(Box::new(fasta::FastaReader::new(reader)))
    }
}
