use crate::error::{Error, Result};
use crate::frame::{self, MAX_BATCH_SIZE};
use anyhow::{anyhow, Context};
use log::{debug, info};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// One upload of a file to a counting server.
pub struct TransferTask {
    addr: SocketAddr,
    timeout: Option<Duration>,
}

impl TransferTask {
    pub fn new(server: &str, port: u16, timeout: Option<Duration>) -> anyhow::Result<TransferTask> {
        Ok(TransferTask {
            addr: (server, port)
                .to_socket_addrs()
                .context("Can't resolve IP address")?
                .next()
                .ok_or(anyhow!("Don't have IP address"))?,
            timeout,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Connect, upload `source` and return the server's printable count.
    pub fn run<F: Read + Seek>(&self, source: &mut F) -> anyhow::Result<u32> {
        let mut stream = match self.timeout {
            Some(timeout) => TcpStream::connect_timeout(&self.addr, timeout),
            None => TcpStream::connect(self.addr),
        }
        .with_context(|| format!("Connect to {} failed", self.addr))?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        info!("Connected to {}", self.addr);
        let count = send_file(&mut stream, source)
            .with_context(|| format!("Transfer to {} failed", self.addr))?;
        Ok(count)
    }
}

/// Drive the client side of the protocol over an established stream.
///
/// Sends the size of `source` as a length frame, streams its content in
/// batches of at most [`MAX_BATCH_SIZE`] bytes and reads back the count.
pub fn send_file<S, F>(stream: &mut S, source: &mut F) -> Result<u32>
where
    S: Read + Write,
    F: Read + Seek,
{
    let size = source.seek(SeekFrom::End(0)).map_err(Error::Io)?;
    source.seek(SeekFrom::Start(0)).map_err(Error::Io)?;
    let len = u32::try_from(size).map_err(|_| Error::TooLarge(size))?;

    frame::write_u32(stream, len)?;
    let mut buffer = vec![0u8; (len as usize).min(MAX_BATCH_SIZE)];
    let mut sent = 0u64;
    for batch in frame::batches(len) {
        let chunk = &mut buffer[..batch];
        let got = fill(source, chunk).map_err(Error::Io)?;
        if got < batch {
            return Err(Error::SourceShrunk {
                expected: size,
                read: sent + got as u64,
            });
        }
        frame::write_all(stream, chunk)?;
        sent += batch as u64;
        debug!("Sent {} of {} bytes", sent, size);
    }

    frame::read_u32(stream)
}

/// Read until `buf` is full or the source is exhausted.
fn fill<F: Read>(source: &mut F, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
