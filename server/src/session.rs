use crate::shutdown::Shutdown;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use pcc::frame::{self, MAX_BATCH_SIZE};
use pcc::{Error, Tally};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

/// Listen on `addr` with address reuse and a bounded accept queue.
pub fn bind(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

/// State of one accepted connection. Never outlives it.
#[derive(Debug, Default)]
pub struct Connection {
    pub len: u32,
    pub printable: u32,
    pub tally: Tally,
}

/// Outcome of one pass through the accept loop.
#[derive(Debug)]
pub enum Step {
    Served { peer: SocketAddr, len: u32, printable: u32 },
    Abandoned,
    Terminate,
}

/// Receive `len` payload bytes in batches, counting printable ones.
pub fn receive<R: Read + ?Sized>(reader: &mut R, len: u32) -> pcc::Result<Connection> {
    let mut conn = Connection {
        len,
        ..Connection::default()
    };
    let mut buffer = vec![0u8; (len as usize).min(MAX_BATCH_SIZE)];
    for batch in frame::batches(len) {
        let chunk = &mut buffer[..batch];
        frame::read_exact(reader, chunk)?;
        conn.printable += conn.tally.observe(chunk);
    }
    Ok(conn)
}

pub struct Server {
    listener: TcpListener,
    shutdown: Arc<Shutdown>,
    timeout: Option<Duration>,
}

impl Server {
    pub fn new(listener: TcpListener, shutdown: Arc<Shutdown>, timeout: Option<Duration>) -> Self {
        Server {
            listener,
            shutdown,
            timeout,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve clients one at a time until termination is requested.
    pub fn run(&self) -> Result<()> {
        info!("Listening on {}", self.local_addr()?);
        loop {
            match self.step()? {
                Step::Served {
                    peer,
                    len,
                    printable,
                } => info!("Served {}: {} bytes, {} printable", peer, len, printable),
                Step::Abandoned => {}
                Step::Terminate => {
                    info!("Shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Accept and serve a single connection.
    ///
    /// Errors returned from here are unrecoverable; a misbehaving peer only
    /// produces [`Step::Abandoned`].
    pub fn step(&self) -> Result<Step> {
        if self.shutdown.termination_requested() {
            return Ok(Step::Terminate);
        }

        let (mut stream, peer) = loop {
            match self.listener.accept() {
                Ok(accepted) => break accepted,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => match Error::classify(e) {
                    Error::Unusable { source } => {
                        warn!("Accept failed: {}", source);
                        return Ok(Step::Abandoned);
                    }
                    e => return Err(e).context("Accept failed"),
                },
            }
        };
        self.shutdown.begin();
        debug!("Connection from {}", peer);
        stream
            .set_read_timeout(self.timeout)
            .and_then(|_| stream.set_write_timeout(self.timeout))
            .context("Failed to set socket timeout")?;

        self.serve(&mut stream, peer)
    }

    /// HEADER, TRANSFER, RESPOND and MERGE for one accepted connection.
    fn serve<S: Read + Write>(&self, stream: &mut S, peer: SocketAddr) -> Result<Step> {
        let len = match frame::read_u32(stream) {
            Ok(len) => len,
            Err(e) => return self.abandon(peer, "header", e),
        };
        debug!("{} announced {} bytes", peer, len);
        let conn = match receive(stream, len) {
            Ok(conn) => conn,
            Err(e) => return self.abandon(peer, "transfer", e),
        };
        if let Err(e) = frame::write_u32(stream, conn.printable) {
            return self.abandon(peer, "response", e);
        }

        self.shutdown.finish(Some(&conn.tally));
        Ok(Step::Served {
            peer,
            len: conn.len,
            printable: conn.printable,
        })
    }

    fn abandon(&self, peer: SocketAddr, stage: &str, e: Error) -> Result<Step> {
        if !e.is_unusable() {
            return Err(e).with_context(|| format!("Serving {} failed during {}", peer, stage));
        }
        warn!("Dropping {} during {}: {}", peer, stage, e);
        self.shutdown.finish(None);
        Ok(Step::Abandoned)
    }
}
