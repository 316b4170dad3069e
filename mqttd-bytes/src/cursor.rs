//! A budgeted byte reader for decoding packets from a connection.

use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Reads bytes from an underlying source while enforcing a byte budget.
///
/// The budget is the number of bytes that still belong to the region being
/// decoded, usually the remaining length of the current packet. Every read
/// decrements it, and a read that would take the budget below zero fails with
/// [`Error::Exhausted`] before touching the source.
///
/// A cursor is owned by a single connection. It starts with a budget of zero;
/// [`FixedHeader::read`](crate::FixedHeader::read) sets the budget while
/// parsing a packet.
///
/// The cursor reads the source one byte at a time, so wrap sockets and files in
/// a [`std::io::BufReader`] before handing them over.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
    remaining_length: usize,
}

impl<R: Read> ByteCursor<R> {
    /// Creates a cursor with a budget of zero
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            remaining_length: 0,
        }
    }

    /// Creates a cursor with the given budget
    pub fn with_remaining_length(inner: R, remaining_length: usize) -> Self {
        Self {
            inner,
            remaining_length,
        }
    }

    /// Resets the budget of bytes that may still be read
    pub fn set_remaining_length(&mut self, remaining_length: usize) {
        self.remaining_length = remaining_length;
    }

    /// Number of bytes that may still be read
    pub fn remaining_length(&self) -> usize {
        self.remaining_length
    }

    /// Gives back the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads a single byte, consuming one byte of the budget
    ///
    /// # Errors
    /// [`Error::Exhausted`] when the budget is zero, [`Error::Io`] when the
    /// source fails or reaches end of file.
    pub fn read_byte(&mut self) -> Result<u8, Error> {
        if self.remaining_length == 0 {
            return Err(Error::Exhausted);
        }

        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte)?;
        self.remaining_length -= 1;
        Ok(byte[0])
    }

    /// Reads exactly `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Bytes, Error> {
        let mut buf = BytesMut::with_capacity(count.min(self.remaining_length));
        for _ in 0..count {
            buf.put_u8(self.read_byte()?);
        }

        Ok(buf.freeze())
    }
}
