//! One side of a tunnel and its socket ownership.
//!
//! An endpoint moves through `Vacant → Open → Relaying → Closed`, or straight
//! to `Closed` from any earlier state. The socket is released on the first
//! transition into `Closed` and never again.

use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

/// Streams a tunnel can carry.
pub trait TunnelStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> TunnelStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Which socket of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Target,
}

impl Side {
    /// The opposite side, where this side's bytes are written.
    pub fn peer(self) -> Side {
        match self {
            Side::Client => Side::Target,
            Side::Target => Side::Client,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => f.write_str("client"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Join handle that aborts when it's dropped.
#[derive(Debug)]
pub(crate) struct DroppableHandle<T>(pub(crate) JoinHandle<T>);

impl<T> Drop for DroppableHandle<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum State<S> {
    Vacant,
    Open(S),
    Relaying {
        writer: WriteHalf<S>,
        _reader: DroppableHandle<()>,
    },
    Closed,
}

/// A socket owned by a connection handler.
pub struct Endpoint<S> {
    side: Side,
    state: State<S>,
}

impl<S: TunnelStream> Endpoint<S> {
    /// An endpoint with no socket yet (the target before dialing).
    pub fn vacant(side: Side) -> Self {
        Self {
            side,
            state: State::Vacant,
        }
    }

    pub fn open(side: Side, stream: S) -> Self {
        Self {
            side,
            state: State::Open(stream),
        }
    }

    /// Install a freshly dialed socket. Refused unless vacant.
    pub fn attach(&mut self, stream: S) -> Result<(), S> {
        match self.state {
            State::Vacant => {
                self.state = State::Open(stream);
                Ok(())
            }
            _ => Err(stream),
        }
    }

    /// The whole stream, available before relaying starts.
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        match &mut self.state {
            State::Open(stream) => Some(stream),
            _ => None,
        }
    }

    /// Whether a socket is held (open or relaying).
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_) | State::Relaying { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Split the socket, handing the read half to `spawn_reader`.
    ///
    /// Returns `false` if the endpoint is not open.
    pub(crate) fn start_relay<F>(&mut self, spawn_reader: F) -> bool
    where
        F: FnOnce(ReadHalf<S>) -> JoinHandle<()>,
    {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(stream) => {
                let (reader, writer) = tokio::io::split(stream);
                self.state = State::Relaying {
                    writer,
                    _reader: DroppableHandle(spawn_reader(reader)),
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// The write half while relaying.
    pub(crate) fn writer_mut(&mut self) -> Option<&mut WriteHalf<S>> {
        match &mut self.state {
            State::Relaying { writer, .. } => Some(writer),
            _ => None,
        }
    }

    /// Release the socket. Returns `true` only on the call that closed it.
    ///
    /// While relaying, the reader task is aborted and both halves dropped.
    pub fn close(&mut self) -> bool {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(_) | State::Relaying { .. } => true,
            State::Vacant | State::Closed => false,
        }
    }
}

impl<S> fmt::Debug for Endpoint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Vacant => "vacant",
            State::Open(_) => "open",
            State::Relaying { .. } => "relaying",
            State::Closed => "closed",
        };
        f.debug_struct("Endpoint")
            .field("side", &self.side)
            .field("state", &state)
            .finish()
    }
}
