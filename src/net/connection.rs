//! Per-connection deadlines and identity.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Close connections that stay silent longer than the idle timeout
//! - Fail writes that cannot make progress within the write timeout
//!
//! `DeadlineAcceptor` sits underneath the TLS acceptor, so the deadlines
//! cover handshake bytes as well as HTTP traffic.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use axum_server::accept::Accept;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Acceptor that wraps every accepted stream in a [`DeadlineStream`].
#[derive(Debug, Clone, Copy)]
pub struct DeadlineAcceptor {
    write_timeout: Duration,
    idle_timeout: Duration,
}

impl DeadlineAcceptor {
    pub fn new(write_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            write_timeout,
            idle_timeout,
        }
    }
}

impl<I, S> Accept<I, S> for DeadlineAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin,
{
    type Stream = DeadlineStream<I>;
    type Service = S;
    type Future = std::future::Ready<io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let stream = DeadlineStream::new(stream, self.write_timeout, self.idle_timeout);
        tracing::trace!(connection_id = %stream.id(), "Connection accepted");
        std::future::ready(Ok((stream, service)))
    }
}

/// Stream wrapper enforcing an idle deadline and a stalled-write deadline.
///
/// Any successful read or write pushes the idle deadline forward. A write
/// that stays pending for `write_timeout` fails with `TimedOut`.
pub struct DeadlineStream<S> {
    inner: S,
    id: ConnectionId,
    write_timeout: Duration,
    idle_timeout: Duration,
    idle_deadline: Pin<Box<Sleep>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> DeadlineStream<S> {
    pub fn new(inner: S, write_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            inner,
            id: ConnectionId::new(),
            write_timeout,
            idle_timeout,
            idle_deadline: Box::pin(tokio::time::sleep(idle_timeout)),
            write_deadline: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn touch(&mut self) {
        let next = Instant::now() + self.idle_timeout;
        self.idle_deadline.as_mut().reset(next);
    }

    /// Called while a write is pending. Errors once the write deadline passes.
    fn poll_write_deadline(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        let timeout = self.write_timeout;
        let deadline = self
            .write_deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));

        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                tracing::debug!(connection_id = %self.id, ?timeout, "Write timed out");
                Poll::Ready(io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.touch();
                Poll::Ready(result)
            }
            Poll::Pending => match this.idle_deadline.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    tracing::debug!(connection_id = %this.id, timeout = ?this.idle_timeout, "Idle connection closed");
                    Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "connection idle")))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                this.touch();
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_write_deadline(cx).map(Err),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_write_deadline(cx).map(Err),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl<S> Drop for DeadlineStream<S> {
    fn drop(&mut self) {
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
