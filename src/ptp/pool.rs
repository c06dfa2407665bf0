use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("out of memory: all {0} read buffers are in use")]
    OutOfMemory(usize),
}

#[derive(Debug)]
struct PoolInner {
    buffer_size: usize,
    capacity: usize,
    outstanding: AtomicUsize,
    free: Mutex<Vec<Box<[u8]>>>,
}

/// Bounded lookaside pool of fixed size read buffers. Buffers handed out by
/// [BufferPool::acquire] go back to the pool when they are dropped, so every
/// exit path of a hardware read releases its buffer.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                buffer_size,
                capacity,
                outstanding: AtomicUsize::new(0),
                free: Mutex::new(Vec::with_capacity(capacity)),
            }),
        }
    }

    /// Take a zeroed buffer from the pool
    pub fn acquire(&self) -> Result<PooledBuffer, PoolError> {
        let capacity = self.inner.capacity;
        self.inner
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map_err(|_| PoolError::OutOfMemory(capacity))?;

        let recycled = match self.inner.free.lock() {
            Ok(mut free) => free.pop(),
            Err(_) => None,
        };
        let data = match recycled {
            Some(mut data) => {
                data.fill(0);
                data
            }
            None => vec![0; self.inner.buffer_size].into_boxed_slice(),
        };

        Ok(PooledBuffer {
            data: Some(data),
            pool: self.inner.clone(),
        })
    }

    /// Number of buffers currently handed out
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }
}

/// A read buffer on loan from a [BufferPool]
pub struct PooledBuffer {
    data: Option<Box<[u8]>>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data.as_deref_mut().unwrap_or_default()
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            if let Ok(mut free) = self.pool.free.lock() {
                free.push(data);
            }
        }
        self.pool.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}
