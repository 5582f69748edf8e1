//! Bidirectional relay with idle-timeout enforcement.
//!
//! # Data Flow
//! ```text
//! client reader task ──┐
//! target reader task ──┼─▶ event queue ─▶ coordinator ─▶ write to the other side
//! idle watchdog task ──┘                      │
//!                                             └─▶ touch idle timer on success
//! ```
//!
//! Readers and the watchdog only produce events; the coordinator performs
//! every write. The first error event from any source ends the relay.

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadHalf};
use tokio::sync::mpsc;

use crate::net::connection::CloseSignal;
use crate::observability::metrics;
use crate::resilience::timeouts::IdleTimer;
use crate::tunnel::endpoint::{DroppableHandle, Endpoint, Side, TunnelStream};

/// Events buffered between readers and the coordinator.
const EVENT_QUEUE: usize = 16;

/// Why a relay stopped.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{side} read error: {source}")]
    Read {
        side: Side,
        #[source]
        source: io::Error,
    },

    #[error("{side} closed the connection")]
    Eof { side: Side },

    #[error("forward to {side} error: {source}")]
    Write {
        side: Side,
        #[source]
        source: io::Error,
    },

    #[error("connection timeout")]
    IdleTimeout,

    #[error("{side} socket is not open")]
    NotOpen { side: Side },

    #[error("relay event sources exited")]
    SourcesExited,
}

impl RelayError {
    pub fn is_idle_timeout(&self) -> bool {
        matches!(self, RelayError::IdleTimeout)
    }
}

#[derive(Debug)]
enum RelayEvent {
    Data(Side, Vec<u8>),
    Failed(RelayError),
}

/// Relay tuning.
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Close after this long with nothing forwarded in either direction.
    pub idle_timeout: Duration,
    /// Capacity of each read.
    pub read_size: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            idle_timeout: crate::resilience::IDLE_TIMEOUT,
            read_size: 4096 * 4,
        }
    }
}

/// Relay bytes between `client` and `target` until an error, idle expiry, or
/// `close`.
///
/// Returns `Ok(())` when stopped through `close`. Both endpoints are left
/// relaying (or untouched if not open); the caller closes them.
pub async fn relay<C, T>(
    client: &mut Endpoint<C>,
    target: &mut Endpoint<T>,
    options: RelayOptions,
    close: &mut CloseSignal,
) -> Result<(), RelayError>
where
    C: TunnelStream,
    T: TunnelStream,
{
    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE);

    if !client.start_relay(spawn_reader::<ReadHalf<C>>(Side::Client, tx.clone(), options.read_size)) {
        return Err(RelayError::NotOpen { side: Side::Client });
    }
    if !target.start_relay(spawn_reader::<ReadHalf<T>>(Side::Target, tx.clone(), options.read_size)) {
        return Err(RelayError::NotOpen { side: Side::Target });
    }

    let timer = Arc::new(IdleTimer::new(options.idle_timeout));
    let _watchdog = {
        let timer = Arc::clone(&timer);
        DroppableHandle(tokio::spawn(async move {
            timer.expired().await;
            let _ = tx.send(RelayEvent::Failed(RelayError::IdleTimeout)).await;
        }))
    };

    loop {
        let event = tokio::select! {
            _ = close.closed() => return Ok(()),
            event = rx.recv() => event,
        };

        let (from, data) = match event {
            Some(RelayEvent::Data(side, data)) => (side, data),
            Some(RelayEvent::Failed(e)) => return Err(e),
            None => return Err(RelayError::SourcesExited),
        };

        let to = from.peer();
        let write = async {
            let result = match to {
                Side::Target => write_to(target, &data).await,
                Side::Client => write_to(client, &data).await,
            };
            result.map_err(|source| RelayError::Write { side: to, source })
        };

        tokio::select! {
            _ = close.closed() => return Ok(()),
            result = write => result?,
        }

        timer.touch();
        metrics::record_bytes(
            match from {
                Side::Client => "upstream",
                Side::Target => "downstream",
            },
            data.len(),
        );
    }
}

async fn write_to<S: TunnelStream>(endpoint: &mut Endpoint<S>, data: &[u8]) -> io::Result<()> {
    match endpoint.writer_mut() {
        Some(writer) => writer.write_all(data).await,
        None => Err(io::Error::from(io::ErrorKind::NotConnected)),
    }
}

fn spawn_reader<R>(
    side: Side,
    tx: mpsc::Sender<RelayEvent>,
    read_size: usize,
) -> impl FnOnce(R) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    move |reader| tokio::spawn(pump(side, reader, tx, read_size))
}

/// Read until EOF or error, pushing each chunk as an event.
async fn pump<R>(side: Side, mut reader: R, tx: mpsc::Sender<RelayEvent>, read_size: usize)
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut buf = vec![0u8; read_size];
        let event = match reader.read(&mut buf).await {
            Ok(0) => RelayEvent::Failed(RelayError::Eof { side }),
            Ok(n) => {
                buf.truncate(n);
                RelayEvent::Data(side, buf)
            }
            Err(source) => RelayEvent::Failed(RelayError::Read { side, source }),
        };

        let last = matches!(event, RelayEvent::Failed(_));
        if tx.send(event).await.is_err() || last {
            return;
        }
    }
}
