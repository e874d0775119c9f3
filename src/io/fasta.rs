use super::{split_header, trim_end, Record, RecordReader};
use std::io::{BufRead, BufReader, Read, Result};

/// Reads one FASTA record per call: a header line (`>id comment`) followed by
/// a sequence body that may span multiple lines, terminated by the next `>`
/// or end of input.
pub struct FastaReader<R: Read> {
    reader: BufReader<R>,
    header: Vec<u8>,
}

impl<R: Read> FastaReader<R> {
    pub fn new(reader: BufReader<R>) -> Self {
        Self { reader, header: Vec::new() }
    }
}

impl<R: Read> RecordReader for FastaReader<R> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        if self.header.is_empty() && self.reader.read_until(b'\n', &mut self.header)? == 0 {
            return Ok(None);
        }
        let mut seq = Vec::new();
        if self.reader.read_until(b'>', &mut seq)? == 0 && seq.is_empty() {
            return Ok(None);
        }
        let reached_next_header = seq.ends_with(b">");
        if reached_next_header {
            seq.pop();
        }
        trim_end(&mut seq);
        seq.retain(|&b| b != b'\n' && b != b'\r');

        let (id, comment) = split_header(&self.header);
        let record = Record { id, comment, seq, qual: None };

        self.header.clear();
        if reached_next_header {
            self.reader.read_until(b'\n', &mut self.header)?;
        }
        Ok(Some(record))
    }
}
