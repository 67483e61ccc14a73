//! Mock byte channel for testing
//!
//! This module provides an in-memory channel that can be used to test the
//! gateway session without a running gateway. Writes are recorded, reads are
//! replayed from queued reply bytes, and every wire touch is counted so
//! tests can assert that an operation performed no I/O at all.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock channel that simulates the gateway side of a session.
#[derive(Clone, Default)]
pub struct MockChannel {
    /// Data written to the channel (requests).
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the channel (replies).
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Simulated error returned by the next operation.
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    /// Number of read/write calls that reached the channel.
    io_ops: Arc<AtomicUsize>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes to be read from the channel.
    pub fn queue_rx_data(&self, data: &[u8]) {
        let mut rx = self.rx_buffer.lock().unwrap();
        rx.extend(data);
    }

    /// Queue a complete gateway reply: ack header plus optional body.
    pub fn queue_reply(&self, status: u8, code: u16, body: &[u8]) {
        let mut reply = Vec::with_capacity(3 + body.len());
        reply.push(status);
        reply.extend_from_slice(&code.to_be_bytes());
        reply.extend_from_slice(body);
        self.queue_rx_data(&reply);
    }

    /// Get the bytes written to the channel so far.
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Number of read/write calls that touched the channel.
    pub fn io_count(&self) -> usize {
        self.io_ops.load(Ordering::SeqCst)
    }

    /// Bytes queued for reading that nothing consumed.
    pub fn unread_len(&self) -> usize {
        self.rx_buffer.lock().unwrap().len()
    }

    /// Clear all buffers.
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
    }

    /// Set an error to be returned on the next operation.
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

impl AsyncRead for MockChannel {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.io_ops.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        let available = rx.len().min(buf.remaining());
        if available > 0 {
            let data: Vec<u8> = rx.drain(..available).collect();
            buf.put_slice(&data);
        }
        // An empty queue reads as end-of-stream, which the session surfaces
        // as a channel error.
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockChannel {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.io_ops.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut tx = self.tx_buffer.lock().unwrap();
        tx.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
