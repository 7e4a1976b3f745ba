//! Growable shared byte buffer with futex-style wait/notify.
//!
//! Waiters register on the absolute byte offset of the cell they watch.
//! Offsets are validated against the maximum capacity, not the current
//! length: a cell past the current length reads as zero, which is exactly
//! the value growth will give it, so waiting there is well defined.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Outcome of a wait call, matching the Atomics.wait result strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Ok,
    NotEqual,
    TimedOut,
}

impl WaitResult {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitResult::Ok => "ok",
            WaitResult::NotEqual => "not-equal",
            WaitResult::TimedOut => "timed-out",
        }
    }
}

#[derive(Debug, Default)]
struct WaitQueue {
    waiting: usize,
    wake_tokens: usize,
}

#[derive(Debug)]
struct SharedState {
    data: Vec<u8>,
    max_byte_length: usize,
    queues: FxHashMap<usize, WaitQueue>,
}

#[derive(Debug)]
struct SharedInner {
    state: Mutex<SharedState>,
    cond: Condvar,
}

/// Thread-shared growable byte buffer. Clones are handles to the same
/// storage; all access goes through one mutex, so every load and store is
/// sequentially consistent with every other.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<SharedInner>,
}

impl SharedBuffer {
    pub fn new(initial_length: usize, max_byte_length: usize) -> Result<Self> {
        if initial_length > max_byte_length {
            return Err(Error::range("initial length exceeds maxByteLength"));
        }
        let mut data = Vec::with_capacity(max_byte_length);
        data.resize(initial_length, 0);
        Ok(SharedBuffer {
            inner: Arc::new(SharedInner {
                state: Mutex::new(SharedState {
                    data,
                    max_byte_length,
                    queues: FxHashMap::default(),
                }),
                cond: Condvar::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn byte_length(&self) -> usize {
        self.lock().data.len()
    }

    pub fn max_byte_length(&self) -> usize {
        self.lock().max_byte_length
    }

    /// Shared buffers only grow. New bytes are zero-filled, so a value that
    /// compared as zero while beyond the length keeps comparing as zero.
    pub fn grow(&self, new_length: usize) -> Result<()> {
        let mut state = self.lock();
        if new_length > state.max_byte_length {
            return Err(Error::range("grow length exceeds maxByteLength"));
        }
        if new_length < state.data.len() {
            return Err(Error::range("shared buffers cannot shrink"));
        }
        state.data.resize(new_length, 0);
        Ok(())
    }

    pub fn load_i32(&self, byte_offset: usize) -> Result<i32> {
        let state = self.lock();
        check_access(&state, byte_offset, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&state.data[byte_offset..byte_offset + 4]);
        Ok(i32::from_le_bytes(raw))
    }

    pub fn store_i32(&self, byte_offset: usize, value: i32) -> Result<()> {
        let mut state = self.lock();
        check_access(&state, byte_offset, 4)?;
        state.data[byte_offset..byte_offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn load_i64(&self, byte_offset: usize) -> Result<i64> {
        let state = self.lock();
        check_access(&state, byte_offset, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&state.data[byte_offset..byte_offset + 8]);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn store_i64(&self, byte_offset: usize, value: i64) -> Result<()> {
        let mut state = self.lock();
        check_access(&state, byte_offset, 8)?;
        state.data[byte_offset..byte_offset + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn wait_i32(
        &self,
        byte_offset: usize,
        expected: i32,
        timeout: Option<Duration>,
    ) -> Result<WaitResult> {
        self.wait(byte_offset, 4, expected as i64, timeout)
    }

    pub fn wait_i64(
        &self,
        byte_offset: usize,
        expected: i64,
        timeout: Option<Duration>,
    ) -> Result<WaitResult> {
        self.wait(byte_offset, 8, expected, timeout)
    }

    fn wait(
        &self,
        byte_offset: usize,
        size: usize,
        expected: i64,
        timeout: Option<Duration>,
    ) -> Result<WaitResult> {
        let mut state = self.lock();
        check_wait_range(&state, byte_offset, size)?;
        if read_wire(&state, byte_offset, size) != expected {
            return Ok(WaitResult::NotEqual);
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        state.queues.entry(byte_offset).or_default().waiting += 1;
        loop {
            {
                let queue = state.queues.entry(byte_offset).or_default();
                if queue.wake_tokens > 0 {
                    queue.wake_tokens -= 1;
                    queue.waiting -= 1;
                    cleanup_queue(&mut state, byte_offset);
                    return Ok(WaitResult::Ok);
                }
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let queue = state.queues.entry(byte_offset).or_default();
                        queue.waiting -= 1;
                        cleanup_queue(&mut state, byte_offset);
                        return Ok(WaitResult::TimedOut);
                    }
                    let (guard, _) = self
                        .inner
                        .cond
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    state = guard;
                }
                None => {
                    state = self
                        .inner
                        .cond
                        .wait(state)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Hands out up to `count` wake tokens to threads currently waiting on
    /// `byte_offset` and returns how many will wake. Tokens never exceed
    /// the number of live waiters, so a notify with nobody waiting is a
    /// no-op rather than a banked wakeup.
    pub fn notify(&self, byte_offset: usize, count: usize) -> Result<usize> {
        let mut state = self.lock();
        check_wait_range(&state, byte_offset, 4)?;
        let woken = match state.queues.get_mut(&byte_offset) {
            Some(queue) => {
                let available = queue.waiting - queue.wake_tokens;
                let woken = count.min(available);
                queue.wake_tokens += woken;
                woken
            }
            None => 0,
        };
        drop(state);
        if woken > 0 {
            self.inner.cond.notify_all();
        }
        Ok(woken)
    }

    #[cfg(test)]
    fn waiting_on(&self, byte_offset: usize) -> usize {
        self.lock()
            .queues
            .get(&byte_offset)
            .map_or(0, |q| q.waiting)
    }
}

fn check_access(state: &SharedState, byte_offset: usize, size: usize) -> Result<()> {
    if byte_offset % size != 0 || byte_offset + size > state.data.len() {
        return Err(Error::range("index out of range"));
    }
    Ok(())
}

/// Wait and notify validate against the maximum capacity so a waiter can
/// park on a cell the buffer has not grown to yet.
fn check_wait_range(state: &SharedState, byte_offset: usize, size: usize) -> Result<()> {
    if byte_offset % size != 0 || byte_offset + size > state.max_byte_length {
        return Err(Error::range("index out of range"));
    }
    Ok(())
}

/// Reads the watched cell for the wait comparison. Bytes beyond the
/// current length are zero, matching what growth will write there.
fn read_wire(state: &SharedState, byte_offset: usize, size: usize) -> i64 {
    let mut raw = [0u8; 8];
    for (i, slot) in raw[..size].iter_mut().enumerate() {
        *slot = state.data.get(byte_offset + i).copied().unwrap_or(0);
    }
    if size == 4 {
        i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64
    } else {
        i64::from_le_bytes(raw)
    }
}

fn cleanup_queue(state: &mut SharedState, byte_offset: usize) {
    if state
        .queues
        .get(&byte_offset)
        .is_some_and(|q| q.waiting == 0)
    {
        state.queues.remove(&byte_offset);
    }
}
