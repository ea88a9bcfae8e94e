use crate::{ColumnType, RawStatement};
use std::{
    borrow::Cow,
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    marker::PhantomData,
    str::{self, Utf8Error},
};

/// What a slot reports after receiving one column of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Received {
    /// Engine-reported source length, except for blobs where it is the copied length.
    pub len: usize,
    pub null: bool,
    pub truncated: bool,
}

/// One column of the current row, as seen by a slot.
pub struct Column<'s, S: RawStatement + ?Sized> {
    statement: &'s mut S,
    index: usize,
}

impl<'s, S: RawStatement + ?Sized> Column<'s, S> {
    pub(crate) fn new(statement: &'s mut S, index: usize) -> Self {
        Self { statement, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn column_type(&self) -> ColumnType {
        self.statement.column_type(self.index)
    }

    pub fn is_null(&self) -> bool {
        self.column_type() == ColumnType::Null
    }

    pub fn bytes(&mut self) -> usize {
        self.statement.column_bytes(self.index)
    }

    pub fn int32(&mut self) -> i32 {
        self.statement.column_int32(self.index)
    }

    pub fn int64(&mut self) -> i64 {
        self.statement.column_int64(self.index)
    }

    pub fn double(&mut self) -> f64 {
        self.statement.column_double(self.index)
    }

    pub fn text(&mut self) -> &[u8] {
        self.statement.column_text(self.index)
    }

    pub fn blob(&mut self) -> &[u8] {
        self.statement.column_blob(self.index)
    }
}

/// Copy one column of the current row into the slot's storage.
pub trait Receive {
    fn receive<S: RawStatement + ?Sized>(&mut self, column: Column<'_, S>) -> Received;
}

macro_rules! numeric_slot {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            value: $ty,
            received: Received,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn value(&self) -> $ty {
                self.value
            }

            pub fn received(&self) -> Received {
                self.received
            }
        }

        impl Receive for $name {
            fn receive<S: RawStatement + ?Sized>(&mut self, mut column: Column<'_, S>) -> Received {
                let null = column.is_null();
                self.value = if null { Default::default() } else { column.$read() };
                self.received = Received {
                    len: column.bytes(),
                    null,
                    truncated: false,
                };
                self.received
            }
        }
    };
}

numeric_slot!(
    /// 32-bit integer result, the engine coerces whatever the column holds.
    Int32Slot,
    i32,
    int32
);
numeric_slot!(Int64Slot, i64, int64);
numeric_slot!(DoubleSlot, f64, double);

/// Fixed capacity, zero terminated text result.
///
/// At most `capacity - 1` bytes of text are kept, the rest of the buffer is zeroed.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTextSlot {
    buffer: Box<[u8]>,
    received: Received,
}

impl FixedTextSlot {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            received: Received::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The whole buffer, terminator and padding included.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes up to the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        let end = self
            .buffer
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.buffer.len());
        &self.buffer[..end]
    }

    /// Fails when truncation split a multi-byte character.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        str::from_utf8(self.as_bytes())
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    pub fn received(&self) -> Received {
        self.received
    }
}

impl Receive for FixedTextSlot {
    fn receive<S: RawStatement + ?Sized>(&mut self, mut column: Column<'_, S>) -> Received {
        self.received = if column.is_null() {
            if let Some(first) = self.buffer.first_mut() {
                *first = 0;
            }
            Received {
                len: 0,
                null: true,
                truncated: false,
            }
        } else {
            let text = column.text();
            let len = text.len();
            let copied = len.min(self.buffer.len().saturating_sub(1));
            self.buffer[..copied].copy_from_slice(&text[..copied]);
            self.buffer[copied..].fill(0);
            Received {
                len,
                null: false,
                truncated: len >= self.buffer.len(),
            }
        };
        self.received
    }
}

/// Growable text result, never truncates.
///
/// The bytes are kept as the engine returned them, even when they are not valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSlot {
    value: Vec<u8>,
    received: Received,
}

impl StringSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        str::from_utf8(&self.value)
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    pub fn received(&self) -> Received {
        self.received
    }
}

impl Receive for StringSlot {
    fn receive<S: RawStatement + ?Sized>(&mut self, mut column: Column<'_, S>) -> Received {
        self.value.clear();
        let null = column.is_null();
        if !null {
            self.value.extend_from_slice(column.text());
        }
        self.received = Received {
            len: self.value.len(),
            null,
            truncated: false,
        };
        self.received
    }
}

/// Fixed capacity binary result.
///
/// `received().len` is the number of bytes actually copied, not the source length.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobSlot {
    buffer: Box<[u8]>,
    received: Received,
}

impl BlobSlot {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            received: Received::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// The bytes written by the last row.
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.received.len]
    }

    pub fn received(&self) -> Received {
        self.received
    }
}

impl Receive for BlobSlot {
    fn receive<S: RawStatement + ?Sized>(&mut self, mut column: Column<'_, S>) -> Received {
        self.received = if column.is_null() {
            self.buffer.fill(0);
            Received {
                len: 0,
                null: true,
                truncated: false,
            }
        } else {
            let data = column.blob();
            let copied = data.len().min(self.buffer.len());
            self.buffer[..copied].copy_from_slice(&data[..copied]);
            Received {
                len: copied,
                null: false,
                truncated: data.len() > self.buffer.len(),
            }
        };
        self.received
    }
}

/// Closed set of result destinations.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSlot {
    Int32(Int32Slot),
    Int64(Int64Slot),
    Double(DoubleSlot),
    FixedText(FixedTextSlot),
    String(StringSlot),
    Blob(BlobSlot),
}

impl ResultSlot {
    pub fn received(&self) -> Received {
        match self {
            ResultSlot::Int32(v) => v.received(),
            ResultSlot::Int64(v) => v.received(),
            ResultSlot::Double(v) => v.received(),
            ResultSlot::FixedText(v) => v.received(),
            ResultSlot::String(v) => v.received(),
            ResultSlot::Blob(v) => v.received(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ResultSlot::Int32(..) => "int32",
            ResultSlot::Int64(..) => "int64",
            ResultSlot::Double(..) => "double",
            ResultSlot::FixedText(..) => "fixed-text",
            ResultSlot::String(..) => "string",
            ResultSlot::Blob(..) => "blob",
        }
    }
}

impl Receive for ResultSlot {
    fn receive<S: RawStatement + ?Sized>(&mut self, column: Column<'_, S>) -> Received {
        match self {
            ResultSlot::Int32(v) => v.receive(column),
            ResultSlot::Int64(v) => v.receive(column),
            ResultSlot::Double(v) => v.receive(column),
            ResultSlot::FixedText(v) => v.receive(column),
            ResultSlot::String(v) => v.receive(column),
            ResultSlot::Blob(v) => v.receive(column),
        }
    }
}

/// A concrete slot type that can be registered and looked up again through a [`SlotRef`].
pub trait SlotKind: Into<ResultSlot> {
    fn from_slot(slot: &ResultSlot) -> Option<&Self>;
}

macro_rules! slot_kind {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ResultSlot {
                fn from(value: $ty) -> Self {
                    ResultSlot::$variant(value)
                }
            }

            impl SlotKind for $ty {
                fn from_slot(slot: &ResultSlot) -> Option<&Self> {
                    match slot {
                        ResultSlot::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )+
    };
}

slot_kind!(
    Int32 => Int32Slot,
    Int64 => Int64Slot,
    Double => DoubleSlot,
    FixedText => FixedTextSlot,
    String => StringSlot,
    Blob => BlobSlot,
);

/// Typed handle to a registered slot.
///
/// Only valid for the registration it came from: once the statement is cleared or re-prepared the
/// handle no longer resolves.
pub struct SlotRef<S> {
    pub(crate) index: usize,
    pub(crate) generation: u64,
    kind: PhantomData<fn() -> S>,
}

impl<S> SlotRef<S> {
    pub(crate) fn new(index: usize, generation: u64) -> Self {
        Self {
            index,
            generation,
            kind: PhantomData,
        }
    }

    /// 0-based result column this slot receives.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S> Clone for SlotRef<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SlotRef<S> {}

impl<S> PartialEq for SlotRef<S> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<S> Eq for SlotRef<S> {}

impl<S> Hash for SlotRef<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<S> Debug for SlotRef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRef")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeStatement, FakeValue};

    fn receive_one<R: Receive>(slot: &mut R, value: FakeValue) -> Received {
        let mut statement = FakeStatement::with_row(vec![value]);
        slot.receive(Column::new(&mut statement, 0))
    }

    #[test]
    fn numeric_coercion() {
        let mut slot = Int32Slot::new();
        let received = receive_one(&mut slot, FakeValue::Integer(42));
        assert_eq!(slot.value(), 42);
        assert_eq!(received.len, 2);
        assert!(!received.null);
        receive_one(&mut slot, FakeValue::Text("17".into()));
        assert_eq!(slot.value(), 17);
        let mut slot = DoubleSlot::new();
        receive_one(&mut slot, FakeValue::Integer(3));
        assert_eq!(slot.value(), 3.0);
        let mut slot = Int64Slot::new();
        receive_one(&mut slot, FakeValue::Integer(9876543210));
        assert_eq!(slot.value(), 9876543210);
    }

    #[test]
    fn numeric_null_is_zero() {
        let mut slot = Int64Slot::new();
        receive_one(&mut slot, FakeValue::Integer(5));
        let received = receive_one(&mut slot, FakeValue::Null);
        assert_eq!(slot.value(), 0);
        assert!(received.null);
        assert_eq!(received.len, 0);
    }

    #[test]
    fn fixed_text_fits() {
        let mut slot = FixedTextSlot::new(8);
        let received = receive_one(&mut slot, FakeValue::Text("alice".into()));
        assert_eq!(slot.as_bytes(), b"alice");
        assert_eq!(slot.buffer(), b"alice\0\0\0");
        assert_eq!(received.len, 5);
        assert!(!received.truncated);
    }

    #[test]
    fn fixed_text_truncates() {
        let mut slot = FixedTextSlot::new(3);
        let received = receive_one(&mut slot, FakeValue::Text("alice".into()));
        assert_eq!(slot.buffer(), b"al\0");
        assert_eq!(slot.to_str(), Ok("al"));
        assert_eq!(received.len, 5);
        assert!(received.truncated);
    }

    #[test]
    fn fixed_text_exact_length_truncates() {
        let mut slot = FixedTextSlot::new(5);
        let received = receive_one(&mut slot, FakeValue::Text("alice".into()));
        assert_eq!(slot.as_bytes(), b"alic");
        assert!(received.truncated);
        let received = receive_one(&mut slot, FakeValue::Text("bob".into()));
        assert_eq!(slot.buffer(), b"bob\0\0");
        assert!(!received.truncated);
    }

    #[test]
    fn fixed_text_zero_capacity() {
        let mut slot = FixedTextSlot::new(0);
        let received = receive_one(&mut slot, FakeValue::Text("".into()));
        assert!(received.truncated);
        let received = receive_one(&mut slot, FakeValue::Null);
        assert!(received.null);
        assert!(!received.truncated);
    }

    #[test]
    fn fixed_text_split_character() {
        let mut slot = FixedTextSlot::new(3);
        receive_one(&mut slot, FakeValue::Text("aé".into()));
        assert!(slot.to_str().is_err());
        assert_eq!(slot.to_string_lossy(), "a\u{FFFD}");
    }

    #[test]
    fn fixed_text_null() {
        let mut slot = FixedTextSlot::new(4);
        receive_one(&mut slot, FakeValue::Text("abc".into()));
        let received = receive_one(&mut slot, FakeValue::Null);
        assert_eq!(slot.as_bytes(), b"");
        assert!(received.null);
    }

    #[test]
    fn string_slot() {
        let mut slot = StringSlot::new();
        let long = "x".repeat(10_000);
        let received = receive_one(&mut slot, FakeValue::Text(long.clone()));
        assert_eq!(slot.to_str(), Ok(long.as_str()));
        assert_eq!(received.len, 10_000);
        assert!(!received.truncated);
        let received = receive_one(&mut slot, FakeValue::Null);
        assert_eq!(slot.as_bytes(), b"");
        assert!(received.null);
        receive_one(&mut slot, FakeValue::Float(2.5));
        assert_eq!(slot.to_str(), Ok("2.5"));
    }

    #[test]
    fn string_slot_keeps_invalid_utf8() {
        let mut slot = StringSlot::new();
        let received = receive_one(&mut slot, FakeValue::Blob(vec![0xff, 0x61]));
        assert_eq!(slot.as_bytes(), &[0xff, 0x61]);
        assert_eq!(received.len, 2);
        assert!(slot.to_str().is_err());
        assert_eq!(slot.to_string_lossy(), "\u{fffd}a");
    }

    #[test]
    fn blob_slot() {
        let mut slot = BlobSlot::new(4);
        let received = receive_one(&mut slot, FakeValue::Blob(vec![1, 2]));
        assert_eq!(slot.data(), &[1, 2]);
        assert_eq!(received.len, 2);
        assert!(!received.truncated);
        let received = receive_one(&mut slot, FakeValue::Blob(vec![9, 8, 7, 6, 5, 4]));
        assert_eq!(slot.data(), &[9, 8, 7, 6]);
        assert_eq!(received.len, 4);
        assert!(received.truncated);
        let received = receive_one(&mut slot, FakeValue::Null);
        assert_eq!(slot.buffer(), &[0, 0, 0, 0]);
        assert_eq!(received.len, 0);
        assert!(received.null);
    }

    #[test]
    fn slot_kind_lookup() {
        let slot: ResultSlot = FixedTextSlot::new(3).into();
        assert_eq!(slot.type_name(), "fixed-text");
        assert!(FixedTextSlot::from_slot(&slot).is_some());
        assert!(BlobSlot::from_slot(&slot).is_none());
    }
}
