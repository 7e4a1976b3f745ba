//! Out-of-bounds and effective-length queries for buffer views.
//!
//! These are pure functions of the view geometry and the buffer's current
//! length. Nothing here caches: a re-entrant callback may resize the
//! backing buffer between any two element accesses, so callers ask again
//! before every access.

/// Declared extent of a view: a fixed element count, or live tracking of
/// the buffer's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewLength {
    Fixed(usize),
    Tracking,
}

/// Element count the view exposes right now. Fixed views report their
/// declared count regardless of the buffer (they go out of bounds instead
/// of shrinking); tracking views derive it from the remaining bytes.
pub fn effective_length(
    byte_offset: usize,
    element_size: usize,
    length: ViewLength,
    buffer_len: usize,
) -> usize {
    match length {
        ViewLength::Fixed(count) => count,
        ViewLength::Tracking => buffer_len.saturating_sub(byte_offset) / element_size,
    }
}

/// Whether the view's required byte range currently exceeds the buffer.
pub fn is_out_of_bounds(
    byte_offset: usize,
    element_size: usize,
    length: ViewLength,
    buffer_len: usize,
) -> bool {
    if byte_offset > buffer_len {
        return true;
    }
    match length {
        ViewLength::Fixed(count) => byte_offset + count * element_size > buffer_len,
        ViewLength::Tracking => false,
    }
}
