use crate::bigint::BigInt;
use crate::bounds::{self, ViewLength};
use crate::buffer::{BufferRef, ResizableBuffer};
use crate::error::{Error, Result};

/// Element interpretation of a view's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl ElementKind {
    pub fn bytes_per_element(self) -> usize {
        match self {
            ElementKind::Int8 | ElementKind::Uint8 | ElementKind::Uint8Clamped => 1,
            ElementKind::Int16 | ElementKind::Uint16 => 2,
            ElementKind::Int32 | ElementKind::Uint32 | ElementKind::Float32 => 4,
            ElementKind::Float64 | ElementKind::BigInt64 | ElementKind::BigUint64 => 8,
        }
    }

    pub fn is_bigint(self) -> bool {
        matches!(self, ElementKind::BigInt64 | ElementKind::BigUint64)
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Int8 => "Int8",
            ElementKind::Uint8 => "Uint8",
            ElementKind::Uint8Clamped => "Uint8Clamped",
            ElementKind::Int16 => "Int16",
            ElementKind::Uint16 => "Uint16",
            ElementKind::Int32 => "Int32",
            ElementKind::Uint32 => "Uint32",
            ElementKind::Float32 => "Float32",
            ElementKind::Float64 => "Float64",
            ElementKind::BigInt64 => "BigInt64",
            ElementKind::BigUint64 => "BigUint64",
        }
    }
}

/// A value read from or written through a view. Numeric kinds carry `f64`,
/// the 64-bit integer kinds carry a [`BigInt`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Number(f64),
    BigInt(BigInt),
}

impl ElementValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ElementValue::Number(n) => Some(*n),
            ElementValue::BigInt(_) => None,
        }
    }

    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            ElementValue::BigInt(b) => Some(b),
            ElementValue::Number(_) => None,
        }
    }
}

/// Species-constructor seam: whatever builds the derived result of `map`,
/// `filter` or `slice` receives exactly one `define_element` per retained
/// element and one final `set_length`.
pub trait ElementSink {
    fn define_element(&mut self, index: usize, value: Option<ElementValue>) -> Result<()>;
    fn set_length(&mut self, length: usize) -> Result<()>;
}

/// Plain-array sink. `None` entries model holes left when the backing
/// buffer shrank mid-iteration.
#[derive(Debug, Default)]
pub struct VecSink {
    pub elements: Vec<Option<ElementValue>>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }
}

impl ElementSink for VecSink {
    fn define_element(&mut self, index: usize, value: Option<ElementValue>) -> Result<()> {
        if index >= self.elements.len() {
            self.elements.resize(index + 1, None);
        }
        self.elements[index] = value;
        Ok(())
    }

    fn set_length(&mut self, length: usize) -> Result<()> {
        self.elements.resize(length, None);
        Ok(())
    }
}

/// A typed window onto a [`ResizableBuffer`].
///
/// The view holds only a weak handle to the buffer and derives its bounds
/// from the buffer's current length on every access; there is no cached
/// length and no invalidation channel. Resizing the buffer is the only
/// thing that moves a view between in-bounds and out-of-bounds.
#[derive(Debug, Clone)]
pub struct TypedArrayView {
    buffer: BufferRef,
    kind: ElementKind,
    byte_offset: usize,
    length: ViewLength,
}

impl TypedArrayView {
    /// Binds a view to `buffer`. The extent check for fixed views is
    /// against `max_byte_length` and happens here only; the buffer may
    /// later shrink below the view's range, making it transiently OOB.
    pub fn new(
        buffer: &ResizableBuffer,
        kind: ElementKind,
        byte_offset: usize,
        length: ViewLength,
    ) -> Result<Self> {
        let size = kind.bytes_per_element();
        if byte_offset % size != 0 {
            return Err(Error::range(format!(
                "byte offset {byte_offset} is not a multiple of element size {size}"
            )));
        }
        let max = buffer.max_byte_length();
        match length {
            ViewLength::Fixed(count) => {
                if byte_offset + count * size > max {
                    return Err(Error::range(
                        "view extends beyond the buffer's maximum byte length",
                    ));
                }
            }
            ViewLength::Tracking => {
                if byte_offset > max {
                    return Err(Error::range(
                        "byte offset exceeds the buffer's maximum byte length",
                    ));
                }
            }
        }
        Ok(TypedArrayView {
            buffer: buffer.handle(),
            kind,
            byte_offset,
            length,
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn declared_length(&self) -> ViewLength {
        self.length
    }

    pub fn is_length_tracking(&self) -> bool {
        self.length == ViewLength::Tracking
    }

    /// Element count derived from the buffer's current length, recomputed
    /// on every call. A released buffer reports zero.
    pub fn effective_length(&self) -> usize {
        let Some(state) = self.buffer.try_upgrade() else {
            return 0;
        };
        let buffer_len = state.borrow().byte_length();
        bounds::effective_length(
            self.byte_offset,
            self.kind.bytes_per_element(),
            self.length,
            buffer_len,
        )
    }

    /// Recomputed on every call; a released buffer counts as out of bounds.
    pub fn is_out_of_bounds(&self) -> bool {
        let Some(state) = self.buffer.try_upgrade() else {
            return true;
        };
        let buffer_len = state.borrow().byte_length();
        bounds::is_out_of_bounds(
            self.byte_offset,
            self.kind.bytes_per_element(),
            self.length,
            buffer_len,
        )
    }

    /// Reads an element if its byte range is currently inside the buffer,
    /// `None` otherwise. This is the "undefined" an iteration callback sees
    /// for indices the buffer shrank out from under it.
    pub fn read_element(&self, index: usize) -> Option<ElementValue> {
        let state = self.buffer.try_upgrade()?;
        let state = state.borrow();
        let buffer_len = state.byte_length();
        let size = self.kind.bytes_per_element();
        if bounds::is_out_of_bounds(self.byte_offset, size, self.length, buffer_len) {
            return None;
        }
        if index >= bounds::effective_length(self.byte_offset, size, self.length, buffer_len) {
            return None;
        }
        let start = self.byte_offset + index * size;
        Some(decode_element(&state.data[start..start + size], self.kind))
    }

    pub fn get(&self, index: usize) -> Result<ElementValue> {
        self.read_element(index)
            .ok_or_else(|| Error::range("index out of bounds"))
    }

    pub fn set(&self, index: usize, value: &ElementValue) -> Result<()> {
        let encoded = encode_element(self.kind, value)?;
        let size = self.kind.bytes_per_element();
        let state = self.buffer.upgrade()?;
        let mut state = state.borrow_mut();
        let buffer_len = state.byte_length();
        if bounds::is_out_of_bounds(self.byte_offset, size, self.length, buffer_len)
            || index >= bounds::effective_length(self.byte_offset, size, self.length, buffer_len)
        {
            return Err(Error::range("index out of bounds"));
        }
        let start = self.byte_offset + index * size;
        state.data[start..start + size].copy_from_slice(&encoded[..size]);
        Ok(())
    }

    /// defineProperty-equivalent for an indexed element. Typed array
    /// elements are never configurable; out-of-range defines also fail.
    pub fn define_index(
        &self,
        index: usize,
        value: &ElementValue,
        configurable: bool,
    ) -> Result<()> {
        if configurable {
            return Err(Error::ty(format!(
                "Attempting to configure non-configurable property on a typed array at index: {index}"
            )));
        }
        if self.is_out_of_bounds() || index >= self.effective_length() {
            return Err(Error::ty(format!(
                "Attempting to store out-of-bounds property on a typed array at index: {index}"
            )));
        }
        self.set(index, value)
    }

    /// Bulk copy from another view (the typed-array `set` path). Both
    /// views are validated at entry and again immediately before the copy:
    /// the source snapshot is the only work in between, but the pattern
    /// keeps a re-entrant resize from invalidating either view unnoticed.
    /// Overlapping views on one buffer copy through the snapshot, so the
    /// source is never clobbered mid-copy.
    pub fn copy_from(&self, source: &TypedArrayView, dest_offset: usize) -> Result<()> {
        self.check_in_bounds_strict()?;
        source.check_in_bounds_strict()?;
        let count = source.effective_length();
        if dest_offset.checked_add(count).is_none_or(|end| end > self.effective_length()) {
            return Err(Error::range("offset is out of bounds"));
        }
        let snapshot: Vec<Option<ElementValue>> =
            (0..count).map(|i| source.read_element(i)).collect();
        self.check_in_bounds_strict()?;
        source.check_in_bounds_strict()?;
        if dest_offset + count > self.effective_length() {
            return Err(Error::range("offset is out of bounds"));
        }
        for (i, value) in snapshot.iter().enumerate() {
            let Some(value) = value else { continue };
            self.set(dest_offset + i, value)?;
        }
        Ok(())
    }

    /// Visits every index planned at entry. The callback may shrink the
    /// backing buffer; indices no longer readable are visited with `None`
    /// rather than terminating early.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(Option<ElementValue>, usize),
    {
        self.check_in_bounds_strict()?;
        let planned = self.effective_length();
        for index in 0..planned {
            f(self.read_element(index), index);
        }
        Ok(())
    }

    pub fn reduce<T, F>(&self, init: T, mut f: F) -> Result<T>
    where
        F: FnMut(T, Option<ElementValue>, usize) -> T,
    {
        self.check_in_bounds_strict()?;
        let planned = self.effective_length();
        let mut acc = init;
        for index in 0..planned {
            acc = f(acc, self.read_element(index), index);
        }
        Ok(acc)
    }

    pub fn reduce_right<T, F>(&self, init: T, mut f: F) -> Result<T>
    where
        F: FnMut(T, Option<ElementValue>, usize) -> T,
    {
        self.check_in_bounds_strict()?;
        let planned = self.effective_length();
        let mut acc = init;
        for index in (0..planned).rev() {
            acc = f(acc, self.read_element(index), index);
        }
        Ok(acc)
    }

    /// Strict typed-array `map`: one `define_element` per index plus a
    /// final `set_length`.
    pub fn map<F>(&self, sink: &mut dyn ElementSink, mut f: F) -> Result<()>
    where
        F: FnMut(Option<ElementValue>, usize) -> Option<ElementValue>,
    {
        self.check_in_bounds_strict()?;
        let planned = self.effective_length();
        for index in 0..planned {
            let mapped = f(self.read_element(index), index);
            sink.define_element(index, mapped)?;
        }
        sink.set_length(planned)
    }

    /// Strict typed-array `filter`: TypeError on a genuinely out-of-bounds
    /// fixed-length view. Contrast [`array_generic_filter`].
    pub fn filter<F>(&self, sink: &mut dyn ElementSink, mut pred: F) -> Result<()>
    where
        F: FnMut(Option<&ElementValue>, usize) -> bool,
    {
        self.check_in_bounds_strict()?;
        filter_into(self, sink, &mut pred)
    }

    /// Strict typed-array `slice` with JS negative-index clamping. Bounds
    /// are re-derived per element; a shrink mid-copy leaves `None` holes in
    /// the result rather than aborting.
    pub fn slice(
        &self,
        start: isize,
        end: Option<isize>,
        sink: &mut dyn ElementSink,
    ) -> Result<()> {
        self.check_in_bounds_strict()?;
        let planned = self.effective_length();
        let from = clamp_index(start, planned);
        let to = end.map_or(planned, |e| clamp_index(e, planned));
        let count = to.saturating_sub(from);
        for i in 0..count {
            sink.define_element(i, self.read_element(from + i))?;
        }
        sink.set_length(count)
    }

    /// Writes `value` over `[start, end)` with JS negative-index clamping.
    pub fn fill(&self, value: &ElementValue, start: isize, end: Option<isize>) -> Result<()> {
        self.check_in_bounds_strict()?;
        let len = self.effective_length();
        let from = clamp_index(start, len);
        let to = end.map_or(len, |e| clamp_index(e, len));
        for index in from..to {
            self.set(index, value)?;
        }
        Ok(())
    }

    /// A narrower view over the same buffer. A tracking view sub-viewed
    /// without an explicit end stays tracking; everything else is fixed.
    pub fn subarray(&self, start: isize, end: Option<isize>) -> TypedArrayView {
        let len = self.effective_length();
        let from = clamp_index(start, len);
        let size = self.kind.bytes_per_element();
        let length = match (self.length, end) {
            (ViewLength::Tracking, None) => ViewLength::Tracking,
            _ => {
                let to = end.map_or(len, |e| clamp_index(e, len));
                ViewLength::Fixed(to.saturating_sub(from))
            }
        };
        TypedArrayView {
            buffer: self.buffer.clone(),
            kind: self.kind,
            byte_offset: self.byte_offset + from * size,
            length,
        }
    }

    pub fn shares_buffer_with(&self, other: &TypedArrayView) -> bool {
        self.buffer.same_buffer(&other.buffer)
    }

    /// The strict-path OOB policy: fixed-length views raise TypeError,
    /// tracking views never do (they report zero effective length
    /// instead). A released buffer is a TypeError on both.
    fn check_in_bounds_strict(&self) -> Result<()> {
        self.buffer.upgrade()?;
        if matches!(self.length, ViewLength::Fixed(_)) && self.is_out_of_bounds() {
            return Err(Error::ty("typed array is out of bounds"));
        }
        Ok(())
    }
}

/// Lenient generic-array `filter`: an out-of-bounds view yields an empty
/// result instead of the strict path's TypeError. The two call paths have
/// deliberately different OOB contracts.
pub fn array_generic_filter<F>(
    view: &TypedArrayView,
    sink: &mut dyn ElementSink,
    mut pred: F,
) -> Result<()>
where
    F: FnMut(Option<&ElementValue>, usize) -> bool,
{
    if view.is_out_of_bounds() {
        return sink.set_length(0);
    }
    filter_into(view, sink, &mut pred)
}

fn filter_into(
    view: &TypedArrayView,
    sink: &mut dyn ElementSink,
    pred: &mut dyn FnMut(Option<&ElementValue>, usize) -> bool,
) -> Result<()> {
    let planned = view.effective_length();
    let mut kept = 0usize;
    for index in 0..planned {
        let value = view.read_element(index);
        if pred(value.as_ref(), index) {
            sink.define_element(kept, value)?;
            kept += 1;
        }
    }
    sink.set_length(kept)
}

fn clamp_index(index: isize, length: usize) -> usize {
    if index < 0 {
        length.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(length)
    }
}

// Element byte codecs. All access is little-endian; integer writes use the
// JS modular truncation, Uint8Clamped saturates with ties-to-even rounding.

fn decode_element(bytes: &[u8], kind: ElementKind) -> ElementValue {
    let mut raw = [0u8; 8];
    raw[..bytes.len()].copy_from_slice(bytes);
    match kind {
        ElementKind::Int8 => ElementValue::Number(raw[0] as i8 as f64),
        ElementKind::Uint8 | ElementKind::Uint8Clamped => ElementValue::Number(raw[0] as f64),
        ElementKind::Int16 => {
            ElementValue::Number(i16::from_le_bytes([raw[0], raw[1]]) as f64)
        }
        ElementKind::Uint16 => {
            ElementValue::Number(u16::from_le_bytes([raw[0], raw[1]]) as f64)
        }
        ElementKind::Int32 => {
            ElementValue::Number(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
        }
        ElementKind::Uint32 => {
            ElementValue::Number(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
        }
        ElementKind::Float32 => {
            ElementValue::Number(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
        }
        ElementKind::Float64 => ElementValue::Number(f64::from_le_bytes(raw)),
        ElementKind::BigInt64 => {
            ElementValue::BigInt(BigInt::from_i64(i64::from_le_bytes(raw)))
        }
        ElementKind::BigUint64 => {
            ElementValue::BigInt(BigInt::from_u64(u64::from_le_bytes(raw)))
        }
    }
}

fn encode_element(kind: ElementKind, value: &ElementValue) -> Result<[u8; 8]> {
    if kind.is_bigint() {
        let ElementValue::BigInt(b) = value else {
            return Err(Error::ty("Cannot convert a number to a BigInt"));
        };
        return Ok(b.to_u64_wrapping().to_le_bytes());
    }
    let ElementValue::Number(n) = value else {
        return Err(Error::ty("Cannot convert a BigInt to a number"));
    };
    let n = *n;
    let mut raw = [0u8; 8];
    match kind {
        ElementKind::Uint8Clamped => raw[0] = clamp_to_u8(n),
        ElementKind::Float32 => raw[..4].copy_from_slice(&(n as f32).to_le_bytes()),
        ElementKind::Float64 => raw = n.to_le_bytes(),
        _ => {
            let bytes = to_modular_i64(n).to_le_bytes();
            raw[..kind.bytes_per_element()].copy_from_slice(&bytes[..kind.bytes_per_element()]);
        }
    }
    Ok(raw)
}

/// JS ToIntegerish truncation: NaN/infinity/zero map to 0, everything else
/// truncates; the low bytes give the modular value for every integer kind.
fn to_modular_i64(n: f64) -> i64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return 0;
    }
    // fmod on the magnitude is exact and lands in [0, 2^64), where an
    // integer-valued f64 converts to u64 losslessly; a direct float to
    // int cast saturates at the i64 range instead of wrapping
    let magnitude = (n.trunc().abs() % 18446744073709551616.0) as u64;
    let wrapped = if n < 0.0 {
        magnitude.wrapping_neg()
    } else {
        magnitude
    };
    wrapped as i64
}

fn clamp_to_u8(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        0
    } else if n >= 255.0 {
        255
    } else {
        n.round_ties_even() as u8
    }
}
