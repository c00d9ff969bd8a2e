use circular::Buffer;
use log::{debug, warn};
use nom::{Err, IResult, Offset};
use std::io::Read;

use crate::error::FramingError;
use crate::frame::Frame;
use crate::pcap::{
    parse_classic_header, parse_classic_record_be, parse_classic_record_le, ClassicHeader,
    ClassicRecord, RECORD_HEADER_SIZE,
};

type RecordParseFn = for<'a> fn(&'a [u8]) -> IResult<&'a [u8], ClassicRecord<'a>, FramingError>;

// Outcome of one parse attempt over the buffer, with no borrow kept on it
enum Step {
    Frame(Frame, usize),
    Hard(FramingError),
    NeedMore,
}

/// Streaming reader over classic capture data.
///
/// The reader is based on a circular buffer, so memory usage is constant and
/// any input providing `Read` can be parsed, including very large files. The
/// global header is consumed at construction; each call to [`next_frame`]
/// returns one owned [`Frame`], or `Ok(None)` at the normal end of stream.
///
/// A trailing record whose declared captured length exceeds the remaining
/// bytes does not fail the read: the payload is right-padded with zero bytes
/// up to the declared length and the [`recovered`] counter is incremented.
/// This bounds the blast radius of a single corrupt trailing record. The
/// strict variant ([`ClassicReader::new_strict`]) surfaces the same condition
/// as [`FramingError::UnexpectedEof`] instead.
///
/// The buffer capacity must be large enough for one complete record; a
/// record that cannot fit yields [`FramingError::BufferTooSmall`].
///
/// [`next_frame`]: ClassicReader::next_frame
/// [`recovered`]: ClassicReader::recovered
pub struct ClassicReader<R>
where
    R: Read,
{
    header: ClassicHeader,
    reader: R,
    buffer: Buffer,
    parse: RecordParseFn,
    big_endian: bool,
    /// fractional timestamp units per second (1e6 or 1e9)
    frac_per_sec: f64,
    reader_exhausted: bool,
    recovered: usize,
    strict: bool,
    index: usize,
}

impl<R> ClassicReader<R>
where
    R: Read,
{
    /// Create a reader with the lenient truncation policy (zero-padding).
    pub fn new(capacity: usize, reader: R) -> Result<ClassicReader<R>, FramingError> {
        Self::with_policy(capacity, reader, false)
    }

    /// Create a reader that surfaces truncated records as errors.
    pub fn new_strict(capacity: usize, reader: R) -> Result<ClassicReader<R>, FramingError> {
        Self::with_policy(capacity, reader, true)
    }

    fn with_policy(
        capacity: usize,
        mut reader: R,
        strict: bool,
    ) -> Result<ClassicReader<R>, FramingError> {
        let mut buffer = Buffer::with_capacity(capacity);
        let sz = reader
            .read(buffer.space())
            .or(Err(FramingError::ReadError))?;
        buffer.fill(sz);
        let (rem, header) = match parse_classic_header(buffer.data()) {
            Ok(x) => x,
            Err(e) => return Err(FramingError::from(e)),
        };
        let offset = buffer.data().offset(rem);
        buffer.consume(offset);
        let big_endian = header.is_bigendian();
        let parse: RecordParseFn = if big_endian {
            parse_classic_record_be
        } else {
            parse_classic_record_le
        };
        let frac_per_sec = if header.is_nanosecond() { 1e9 } else { 1e6 };
        Ok(ClassicReader {
            header,
            reader,
            buffer,
            parse,
            big_endian,
            frac_per_sec,
            reader_exhausted: sz == 0,
            recovered: 0,
            strict,
            index: 0,
        })
    }

    /// The global header consumed at construction
    pub fn header(&self) -> &ClassicHeader {
        &self.header
    }

    /// Number of truncated records recovered by zero-padding
    pub fn recovered(&self) -> usize {
        self.recovered
    }

    fn timestamp(&self, sec: u32, frac: u32) -> f64 {
        sec as f64 + frac as f64 / self.frac_per_sec
    }

    fn refill(&mut self) -> Result<(), FramingError> {
        self.buffer.shift();
        let space = self.buffer.space();
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space).or(Err(FramingError::ReadError))?;
        self.reader_exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }

    fn read_u32(&self, b: &[u8], offset: usize) -> u32 {
        let w = [b[offset], b[offset + 1], b[offset + 2], b[offset + 3]];
        if self.big_endian {
            u32::from_be_bytes(w)
        } else {
            u32::from_le_bytes(w)
        }
    }

    /// Return the next frame, or `None` at the normal end of stream.
    ///
    /// Running out of data in the middle of a record header (fewer than 16
    /// bytes remaining) is also a normal end of stream: the partial header is
    /// discarded and all previously returned frames stand.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FramingError> {
        loop {
            if self.buffer.available_data() == 0 && self.reader_exhausted {
                return Ok(None);
            }
            let step = {
                let data = self.buffer.data();
                match (self.parse)(data) {
                    Ok((rem, record)) => Step::Frame(
                        Frame {
                            payload: record.data.to_vec(),
                            timestamp: self.timestamp(record.ts_sec, record.ts_frac),
                            interface_id: 0,
                        },
                        data.offset(rem),
                    ),
                    Err(Err::Error(e)) | Err(Err::Failure(e)) => Step::Hard(e),
                    Err(Err::Incomplete(_)) => Step::NeedMore,
                }
            };
            match step {
                Step::Frame(frame, offset) => {
                    self.buffer.consume(offset);
                    self.index += 1;
                    return Ok(Some(frame));
                }
                Step::Hard(e) => return Err(e),
                Step::NeedMore => {
                    if !self.reader_exhausted {
                        if self.buffer.available_data() == self.buffer.capacity() {
                            return Err(FramingError::BufferTooSmall);
                        }
                        self.refill()?;
                        continue;
                    }
                    // the stream is exhausted: distinguish a clean end from a
                    // record cut off mid-payload
                    if self.buffer.available_data() < RECORD_HEADER_SIZE {
                        debug!(
                            "ignoring {} trailing bytes after record {}",
                            self.buffer.available_data(),
                            self.index
                        );
                        return Ok(None);
                    }
                    return self.salvage_truncated().map(Some);
                }
            }
        }
    }

    // The record header is complete but the payload is short: accept the
    // short read and right-pad with zeros up to the declared length.
    fn salvage_truncated(&mut self) -> Result<Frame, FramingError> {
        if self.strict {
            return Err(FramingError::UnexpectedEof);
        }
        let (frame, consumed) = {
            let data = self.buffer.data();
            let ts_sec = self.read_u32(data, 0);
            let ts_frac = self.read_u32(data, 4);
            let caplen = self.read_u32(data, 8) as usize;
            let mut payload = data[RECORD_HEADER_SIZE..].to_vec();
            let missing = caplen - payload.len();
            payload.resize(caplen, 0);
            warn!(
                "record {}: truncated payload, padded {} missing bytes with zeros",
                self.index, missing
            );
            let frame = Frame {
                payload,
                timestamp: self.timestamp(ts_sec, ts_frac),
                interface_id: 0,
            };
            (frame, data.len())
        };
        self.buffer.consume(consumed);
        self.recovered += 1;
        self.index += 1;
        Ok(frame)
    }
}

impl<R> Iterator for ClassicReader<R>
where
    R: Read,
{
    type Item = Result<Frame, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}
