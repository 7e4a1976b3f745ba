use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};

#[derive(Debug)]
pub(crate) struct BufferState {
    pub(crate) data: Vec<u8>,
    max_byte_length: usize,
}

impl BufferState {
    pub(crate) fn byte_length(&self) -> usize {
        self.data.len()
    }
}

/// A contiguous byte region whose logical length can grow and shrink within
/// a maximum fixed at construction. Storage for the full maximum is
/// reserved up front, so shrinking never deallocates and regrowth is cheap.
///
/// Mutation goes through `&self`: a re-entrant callback holding a shared
/// reference may resize the buffer out from under an in-progress view
/// operation, which is exactly the hazard views handle by re-deriving
/// bounds on every access.
#[derive(Debug)]
pub struct ResizableBuffer {
    state: Rc<RefCell<BufferState>>,
}

impl ResizableBuffer {
    pub fn new(initial_length: usize, max_byte_length: usize) -> Result<Self> {
        if initial_length > max_byte_length {
            return Err(Error::range("initial length exceeds maxByteLength"));
        }
        let mut data = Vec::with_capacity(max_byte_length);
        data.resize(initial_length, 0);
        Ok(ResizableBuffer {
            state: Rc::new(RefCell::new(BufferState {
                data,
                max_byte_length,
            })),
        })
    }

    pub fn byte_length(&self) -> usize {
        self.state.borrow().data.len()
    }

    pub fn max_byte_length(&self) -> usize {
        self.state.borrow().max_byte_length
    }

    /// Changes the logical length. Growth zero-fills `[old, new)`; shrink
    /// truncates. A failed resize mutates nothing.
    pub fn resize(&self, new_length: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if new_length > state.max_byte_length {
            return Err(Error::range("resize length exceeds maxByteLength"));
        }
        state.data.resize(new_length, 0);
        Ok(())
    }

    /// Non-owning handle for views. Dropping the buffer while handles are
    /// outstanding is legal; accesses through them then fail with a
    /// TypeError.
    pub fn handle(&self) -> BufferRef {
        BufferRef(Rc::downgrade(&self.state))
    }
}

/// Weak back-reference from a view to its buffer. Never keeps the buffer
/// alive; lifetime belongs to whoever holds the [`ResizableBuffer`].
#[derive(Debug, Clone)]
pub struct BufferRef(Weak<RefCell<BufferState>>);

impl BufferRef {
    pub(crate) fn upgrade(&self) -> Result<Rc<RefCell<BufferState>>> {
        self.0
            .upgrade()
            .ok_or_else(|| Error::ty("backing buffer has been released"))
    }

    pub(crate) fn try_upgrade(&self) -> Option<Rc<RefCell<BufferState>>> {
        self.0.upgrade()
    }

    pub(crate) fn same_buffer(&self, other: &BufferRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_validates_lengths() {
        let err = ResizableBuffer::new(10, 4).unwrap_err();
        assert!(matches!(err, Error::Range(_)));
        let buf = ResizableBuffer::new(4, 16).unwrap();
        assert_eq!(buf.byte_length(), 4);
        assert_eq!(buf.max_byte_length(), 16);
    }

    #[test]
    fn resize_within_capacity() {
        let buf = ResizableBuffer::new(4, 16).unwrap();
        buf.resize(12).unwrap();
        assert_eq!(buf.byte_length(), 12);
        buf.resize(0).unwrap();
        assert_eq!(buf.byte_length(), 0);
        assert_eq!(buf.max_byte_length(), 16);
    }

    #[test]
    fn failed_resize_mutates_nothing() {
        let buf = ResizableBuffer::new(4, 16).unwrap();
        let err = buf.resize(17).unwrap_err();
        assert!(matches!(err, Error::Range(_)));
        assert_eq!(buf.byte_length(), 4);
    }

    #[test]
    fn regrowth_zero_fills() {
        let buf = ResizableBuffer::new(4, 16).unwrap();
        {
            let state = buf.state.clone();
            state.borrow_mut().data.copy_from_slice(&[1, 2, 3, 4]);
        }
        buf.resize(0).unwrap();
        buf.resize(6).unwrap();
        assert_eq!(buf.state.borrow().data, vec![0; 6]);
    }

    #[test]
    fn handle_does_not_keep_buffer_alive() {
        let handle = {
            let buf = ResizableBuffer::new(4, 16).unwrap();
            buf.handle()
        };
        assert!(handle.try_upgrade().is_none());
        let err = handle.upgrade().unwrap_err();
        assert_eq!(err.to_string(), "backing buffer has been released");
    }
}
