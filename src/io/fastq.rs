use super::{split_header, trim_end, Record, RecordReader};
use std::io::{BufRead, BufReader, Read, Result};

/// Reads one 4-line FASTQ record per call: `@id comment`, sequence, `+...`,
/// quality. Quality masking is a classifier concern, not a parsing concern,
/// so the raw quality string is passed through unmodified.
pub struct FastqReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FastqReader<R> {
    pub fn new(reader: BufReader<R>) -> Self {
        Self { reader }
    }
}

impl<R: Read> RecordReader for FastqReader<R> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let mut header = Vec::new();
        if self.reader.read_until(b'\n', &mut header)? == 0 {
            return Ok(None);
        }

        let mut seq = Vec::new();
        if self.reader.read_until(b'\n', &mut seq)? == 0 {
            return Ok(None);
        }
        trim_end(&mut seq);

        let mut plus = Vec::new();
        if self.reader.read_until(b'\n', &mut plus)? == 0 {
            return Ok(None);
        }

        let mut qual = Vec::new();
        if self.reader.read_until(b'\n', &mut qual)? == 0 {
            return Ok(None);
        }
        trim_end(&mut qual);

        let (id, comment) = split_header(&header);
        Ok(Some(Record { id, comment, seq, qual: Some(qual) }))
    }
}
