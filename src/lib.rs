//! Arbitrary-precision integers and resizable typed-array buffers with the
//! observable semantics of their JavaScript counterparts.
//!
//! [`BigInt`] is a sign-magnitude big integer over base-2^32 limbs with
//! truncating division and infinite-bit two's-complement bitwise ops.
//! [`ResizableBuffer`] and [`TypedArrayView`] model ArrayBuffer and typed
//! arrays: views never cache bounds, they re-derive them from the buffer's
//! current length on every access. [`SharedBuffer`] adds the thread-shared
//! grow-only variant with Atomics-style wait and notify.

mod bigint;
mod bounds;
mod buffer;
mod error;
mod shared;
mod view;

pub use bigint::{BigInt, Sign};
pub use bounds::{effective_length, is_out_of_bounds, ViewLength};
pub use buffer::{BufferRef, ResizableBuffer};
pub use error::{Error, Result};
pub use shared::{SharedBuffer, WaitResult};
pub use view::{
    array_generic_filter, ElementKind, ElementSink, ElementValue, TypedArrayView, VecSink,
};
