//! Exact-length reads and writes over a byte stream.
//!
//! Every frame is either moved completely or reported as an error; callers
//! never see a partially filled buffer. Socket errors are classified with
//! [`Error::classify`] so a server can drop one connection and keep going.

use crate::error::{Error, Result};
use std::io::{self, ErrorKind, Read, Write};

/// Upper bound on one buffered read/write cycle of payload.
pub const MAX_BATCH_SIZE: usize = 1024 * 1024;

pub const HEADER_SIZE: usize = 4;

/// Write every byte of `buf`, retrying on partial writes.
pub fn write_all<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                return Err(Error::classify(io::Error::new(
                    ErrorKind::WriteZero,
                    format!("stream accepted {} of {} bytes", written, buf.len()),
                )))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::classify(e)),
        }
    }
    Ok(())
}

/// Fill `buf` completely. End of stream before that is a short read.
pub fn read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::classify(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("peer closed after {} of {} bytes", filled, buf.len()),
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::classify(e)),
        }
    }
    Ok(())
}

pub fn write_u32<W: Write + ?Sized>(writer: &mut W, value: u32) -> Result<()> {
    write_all(writer, &value.to_be_bytes())
}

pub fn read_u32<R: Read + ?Sized>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; HEADER_SIZE];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn batches(len: u32) -> impl Iterator<Item = usize> {
    let mut remaining = len as usize;
    std::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let batch = remaining.min(MAX_BATCH_SIZE);
        remaining -= batch;
        Some(batch)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_matches, assert_ok};
    use std::io::Cursor;

    /// Accepts at most `step` bytes per call and interrupts every other call.
    struct Trickle {
        data: Vec<u8>,
        step: usize,
        calls: usize,
    }

    impl Trickle {
        fn new(step: usize) -> Self {
            Trickle {
                data: Vec::new(),
                step,
                calls: 0,
            }
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(self.step);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(self.step).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }
    }

    struct Failing(ErrorKind);

    impl Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(self.0.into())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(self.0.into())
        }
    }

    #[test]
    fn write_all_survives_partial_writes() {
        let mut sink = Trickle::new(3);
        assert_ok!(write_all(&mut sink, b"hello, world"));
        assert_eq!(sink.data, b"hello, world");
    }

    #[test]
    fn read_exact_survives_partial_reads() {
        let mut source = Trickle::new(2);
        source.data = b"abcdefg".to_vec();
        let mut buf = [0u8; 7];
        assert_ok!(read_exact(&mut source, &mut buf));
        assert_eq!(&buf, b"abcdefg");
    }

    #[test]
    fn short_read_is_unusable() {
        let mut source = Cursor::new(vec![0u8, 1]);
        let err = read_u32(&mut source).unwrap_err();
        assert!(err.is_unusable());
    }

    #[test]
    fn zero_length_write_is_unusable() {
        let mut full = [0u8; 2];
        let mut sink = Cursor::new(&mut full[..]);
        let err = write_u32(&mut sink, 7).unwrap_err();
        assert!(err.is_unusable());
    }

    #[test]
    fn reset_is_unusable_and_permission_is_fatal() {
        let err = read_u32(&mut Failing(ErrorKind::ConnectionReset)).unwrap_err();
        assert!(err.is_unusable());
        let err = write_all(&mut Failing(ErrorKind::PermissionDenied), b"x").unwrap_err();
        assert_matches!(err, Error::Io(_));
    }

    #[test]
    fn u32_frames_are_big_endian() {
        let mut buf = Vec::new();
        assert_ok!(write_u32(&mut buf, 0x0102_0304));
        assert_eq!(buf, [1, 2, 3, 4]);

        for value in [0, 1, 0x00FF_FF00, u32::MAX] {
            let mut buf = Vec::new();
            assert_ok!(write_u32(&mut buf, value));
            assert_eq!(assert_ok!(read_u32(&mut Cursor::new(buf))), value);
        }
    }

    #[test]
    fn batches_partition_the_payload() {
        assert_eq!(batches(0).count(), 0);
        assert_eq!(batches(5).collect::<Vec<_>>(), [5]);
        assert_eq!(
            batches(MAX_BATCH_SIZE as u32).collect::<Vec<_>>(),
            [MAX_BATCH_SIZE]
        );
        assert_eq!(
            batches(MAX_BATCH_SIZE as u32 + 1).collect::<Vec<_>>(),
            [MAX_BATCH_SIZE, 1]
        );
        let total: usize = batches(3 * MAX_BATCH_SIZE as u32 + 17).sum();
        assert_eq!(total, 3 * MAX_BATCH_SIZE + 17);
    }
}
