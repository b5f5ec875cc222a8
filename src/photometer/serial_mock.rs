//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test the
//! CL-200A protocol driver without requiring actual hardware.
//!
//! Replies are scripted per exchange: a queued reply only becomes readable
//! once the driver starts reading, the way a real device answers after the
//! settle delay. A mid-exchange buffer clear therefore discards stale bytes
//! but never a reply that has not "arrived" yet.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::photometer::frame;
use crate::photometer::serial::SerialLink;

/// Mock serial port that simulates the half-duplex CL-200A link.
///
/// Writes complete instantly, so `tx_buffer` is a capture of already-sent
/// bytes for test assertions, not pending output; a buffer clear leaves it
/// untouched.
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Everything written to the port, in write order.
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Bytes currently readable (a reply in flight).
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Scripted device replies, one per read exchange.
    pub reply_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Simulated I/O error for the next operation.
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    /// When set, each readable byte only arrives after this delay.
    read_delay: Arc<Mutex<Option<Duration>>>,
    /// Timer for the byte currently in flight.
    pending_byte: Arc<Mutex<Option<Pin<Box<tokio::time::Sleep>>>>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        MockSerialPort::default()
    }

    /// Queue a raw reply line to be served on a future read.
    pub fn queue_reply_raw(&self, data: &[u8]) {
        self.reply_queue.lock().unwrap().push_back(data.to_vec());
    }

    /// Queue a properly framed reply for the given payload.
    pub fn queue_reply(&self, payload: &str) {
        self.queue_reply_raw(&frame::encode(payload));
    }

    /// Get everything written to the port so far.
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Count how many times the given framed command was written.
    pub fn count_writes_of(&self, payload: &str) -> usize {
        let needle = frame::encode(payload);
        let tx = self.tx_buffer.lock().unwrap();
        tx.windows(needle.len()).filter(|w| *w == needle).count()
    }

    /// Set an error to be returned on the next operation.
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Make the device trickle: each readable byte arrives only after
    /// `delay`, one byte per delay.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    /// Clear all buffers and scripted replies.
    pub fn reset(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
        self.reply_queue.lock().unwrap().clear();
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        if rx.is_empty() {
            // The next scripted reply arrives at read time.
            if let Some(reply) = self.reply_queue.lock().unwrap().pop_front() {
                rx.extend(reply);
            }
        }

        // Trickle mode: one byte per elapsed delay.
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            if !rx.is_empty() {
                let mut pending = self.pending_byte.lock().unwrap();
                let timer =
                    pending.get_or_insert_with(|| Box::pin(tokio::time::sleep(delay)));
                match timer.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(()) => *pending = None,
                }
                if buf.remaining() > 0 {
                    if let Some(byte) = rx.pop_front() {
                        buf.put_slice(&[byte]);
                    }
                }
                return Poll::Ready(Ok(()));
            }
        }

        let available = rx.len().min(buf.remaining());
        if available > 0 {
            let data: Vec<u8> = rx.drain(..available).collect();
            buf.put_slice(&data);
        }

        // An empty ready read models the port timeout / silent device.
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
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

#[async_trait::async_trait]
impl SerialLink for MockSerialPort {
    async fn flush_output(&mut self) -> Result<(), io::Error> {
        Ok(())
    }

    async fn clear_buffers(&mut self) -> Result<(), io::Error> {
        // Only bytes already in flight are stale; scripted replies have not
        // arrived yet and survive the clear. There is no unsent output to
        // discard: mock writes complete instantly and tx_buffer is kept as
        // the test-side record of them.
        self.rx_buffer.lock().unwrap().clear();
        Ok(())
    }
}
