//! The transport handle: the one active stream of a link.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use relink_core::logging::targets;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use super::config::LinkConfig;
use crate::Result;
use crate::error::LinkError;

/// Write side of the current stream, shared with the link façade.
///
/// The supervisor installs and clears the writer; `send` only writes through
/// it. A failed write marks the stream dead so the supervisor replaces it.
#[derive(Debug, Default)]
pub(crate) struct WriteSlot {
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    live: AtomicBool,
    peer: Mutex<Option<SocketAddr>>,
    established: AtomicU64,
}

impl WriteSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_dead(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        *self.peer.lock()
    }

    /// Number of streams installed since the link started.
    pub(crate) fn established(&self) -> u64 {
        self.established.load(Ordering::SeqCst)
    }

    pub(crate) async fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(stream) = writer.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        if let Err(e) = stream.write_all(data).await {
            tracing::debug!(target: targets::TRANSPORT, error = %e, "write failed");
            self.mark_dead();
            return Err(e.into());
        }
        Ok(())
    }

    async fn install(&self, writer: OwnedWriteHalf, peer: SocketAddr) -> u64 {
        *self.writer.lock().await = Some(writer);
        *self.peer.lock() = Some(peer);
        self.live.store(true, Ordering::SeqCst);
        self.established.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn clear(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.writer.lock().await.take();
        self.peer.lock().take();
    }
}

/// Owner of the current stream pair and, for the listener role, the
/// listening socket.
///
/// Only the supervisor holds a `TransportHandle`; the façade reaches the
/// stream exclusively through the shared [`WriteSlot`].
pub(crate) struct TransportHandle {
    config: LinkConfig,
    listener: Option<TcpListener>,
    reader: Option<OwnedReadHalf>,
    slot: Arc<WriteSlot>,
}

impl TransportHandle {
    pub(crate) fn new(config: LinkConfig, slot: Arc<WriteSlot>) -> Self {
        Self {
            config,
            listener: None,
            reader: None,
            slot,
        }
    }

    /// Create the long-lived listening socket. Returns the bound address.
    pub(crate) async fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.socket_addr())
            .await
            .map_err(|e| LinkError::Bind(format!("{}: {e}", self.config.socket_addr())))?;
        let local = listener.local_addr()?;
        tracing::debug!(target: targets::TRANSPORT, %local, "listening");
        self.listener = Some(listener);
        Ok(local)
    }

    pub(crate) fn has_stream(&self) -> bool {
        self.reader.is_some()
    }

    pub(crate) fn is_live(&self) -> bool {
        self.reader.is_some() && self.slot.is_live()
    }

    pub(crate) fn mark_dead(&self) {
        self.slot.mark_dead();
    }

    /// Accept one peer on the listening socket and make it current.
    pub(crate) async fn accept(&mut self) -> Result<SocketAddr> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| LinkError::Io("listening socket is not bound".into()))?;
        let (stream, peer) = listener.accept().await?;
        self.install(stream, peer).await;
        Ok(peer)
    }

    /// Connect to the configured endpoint and make the new stream current.
    pub(crate) async fn connect(&mut self) -> Result<SocketAddr> {
        let stream = TcpStream::connect(self.config.socket_addr()).await?;
        let peer = stream.peer_addr()?;
        self.install(stream, peer).await;
        Ok(peer)
    }

    /// Read once from the current stream.
    pub(crate) async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buffer).await,
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    /// Drop the current stream, keeping the listening socket.
    pub(crate) async fn reset(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!(target: targets::TRANSPORT, "dropping current stream");
        }
        self.slot.clear().await;
    }

    /// Release everything, including the listening socket.
    pub(crate) async fn shutdown(&mut self) {
        self.reset().await;
        if self.listener.take().is_some() {
            tracing::debug!(target: targets::TRANSPORT, "listening socket closed");
        }
    }

    /// Initialize a freshly established stream and replace the current one.
    async fn install(&mut self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = apply_socket_options(&stream, &self.config) {
            tracing::warn!(target: targets::TRANSPORT, error = %e, "socket options not applied");
        }
        let (reader, writer) = stream.into_split();
        self.reader = Some(reader);
        let established = self.slot.install(writer, peer).await;
        tracing::debug!(target: targets::TRANSPORT, %peer, established, "stream installed");
    }
}

fn apply_socket_options(stream: &TcpStream, config: &LinkConfig) -> io::Result<()> {
    let socket = socket2::SockRef::from(stream);
    socket.set_send_buffer_size(config.buffer_size())?;
    socket.set_recv_buffer_size(config.buffer_size())?;
    stream.set_nodelay(config.no_delay())
}
