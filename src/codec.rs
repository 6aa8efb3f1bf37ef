//! Fixed layout record marshaling.
//!
//! Every record exchanged with the kernel is described once by a static
//! [`Layout`]: an ordered table of named fields with explicit offsets and
//! widths. [`Record::encode`] and [`Record::decode`] walk that table, so the
//! byte image handed to an ioctl always has the table's exact size no matter
//! how many array slots or string bytes are meaningful.
//!
//! Integers are written in host byte order, strings are NUL padded to their
//! capacity and reserved fields are always zero.

use crate::fixed_str::{FixedStr, FixedStrErr};

/// Integer types that may appear in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    U8,
    U32,
    I32,
    U64,
}

impl Scalar {
    pub const fn width(self) -> usize {
        match self {
            Scalar::U8 => 1,
            Scalar::U32 | Scalar::I32 => 4,
            Scalar::U64 => 8,
        }
    }
}

/// Semantic type of one field
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar(Scalar),
    /// NUL padded byte string of fixed capacity
    Str { capacity: usize },
    /// `len` integers, no length prefix
    Array { elem: Scalar, len: usize },
    /// Space kept for forward compatibility, encoded as zero and skipped on decode
    Reserved { elem: Scalar, len: usize },
    /// Another record embedded in place
    Nested(&'static Layout),
}

impl FieldKind {
    pub const fn width(&self) -> usize {
        match self {
            FieldKind::Scalar(s) => s.width(),
            FieldKind::Str { capacity } => *capacity,
            FieldKind::Array { elem, len } | FieldKind::Reserved { elem, len } => {
                elem.width() * *len
            }
            FieldKind::Nested(layout) => layout.size,
        }
    }

    pub const fn align(&self) -> usize {
        match self {
            FieldKind::Scalar(s) => s.width(),
            FieldKind::Str { .. } => 1,
            FieldKind::Array { elem, .. } | FieldKind::Reserved { elem, .. } => elem.width(),
            FieldKind::Nested(layout) => layout.align(),
        }
    }

    const fn is_reserved(&self) -> bool {
        matches!(self, FieldKind::Reserved { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub offset: usize,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind, offset: usize) -> Self {
        Self { name, kind, offset }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.kind.width()
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }
}

/// The byte image of one record kind
#[derive(Debug)]
pub struct Layout {
    pub name: &'static str,
    pub fields: &'static [Field],
    /// Total encoded length in bytes
    pub size: usize,
}

impl Layout {
    /// True if the fields tile `0..size` in order, with no gaps or overlaps,
    /// and every field sits at its natural alignment.
    pub const fn is_consistent(&self) -> bool {
        let mut pos = 0;
        let mut i = 0;
        while i < self.fields.len() {
            let field = &self.fields[i];
            if field.offset != pos || field.offset % field.kind.align() != 0 {
                return false;
            }
            pos += field.kind.width();
            i += 1;
        }
        pos == self.size
    }

    pub const fn align(&self) -> usize {
        let mut align = 1;
        let mut i = 0;
        while i < self.fields.len() {
            let a = self.fields[i].kind.align();
            if a > align {
                align = a;
            }
            i += 1;
        }
        align
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Failure to marshal a value into a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("{record}.{field}: {required} byte string exceeds capacity of {capacity}")]
    StringOverflow {
        record: &'static str,
        field: &'static str,
        capacity: usize,
        required: usize,
    },
    #[error("{record}.{field}: {required} elements exceed array length of {capacity}")]
    ArrayOverflow {
        record: &'static str,
        field: &'static str,
        capacity: usize,
        required: usize,
    },
    #[error("{record}.{field}: value {value} is out of range (max {max})")]
    OutOfRange {
        record: &'static str,
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("{record}.{field} was never written")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },
    #[error("{record} has no {field} field of that type at this position")]
    UnexpectedField {
        record: &'static str,
        field: &'static str,
    },
    #[error("{record} encodes to {expected} bytes, not {actual}")]
    BufferSize {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{values} values supplied but only {lines} lines are requested")]
    TooManyValues { lines: usize, values: usize },
    #[error("line {0} is requested more than once")]
    DuplicateOffset(u32),
    #[error("a request needs at least one line")]
    NoLines,
    #[error("line {0} is not part of this request")]
    UnknownOffset(u32),
    #[error(transparent)]
    Text(#[from] FixedStrErr),
}

/// A buffer too short to hold the record being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{record} requires {expected} bytes but only {actual} were supplied")]
pub struct LayoutError {
    pub record: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// A record with a fixed kernel layout
///
/// Implementors list their fields in table order; the table does the rest.
pub trait Record: Sized {
    const LAYOUT: &'static Layout;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError>;

    fn read_fields(r: &mut FieldReader<'_>) -> Self;

    /// Encode into a fresh buffer of exactly `LAYOUT.size` bytes.
    ///
    /// Nothing is returned on failure, never a partially written buffer.
    fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let mut buf = vec![0; Self::LAYOUT.size];
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Encode into `buf`, which must be exactly `LAYOUT.size` bytes long.
    fn encode_into(&self, buf: &mut [u8]) -> Result<(), EncodingError> {
        if buf.len() != Self::LAYOUT.size {
            return Err(EncodingError::BufferSize {
                record: Self::LAYOUT.name,
                expected: Self::LAYOUT.size,
                actual: buf.len(),
            });
        }
        buf.fill(0);
        let mut w = FieldWriter::new(Self::LAYOUT, buf);
        self.write_fields(&mut w)?;
        w.finish()
    }

    /// Decode the leading `LAYOUT.size` bytes of `buf`.
    fn decode(buf: &[u8]) -> Result<Self, LayoutError> {
        let size = Self::LAYOUT.size;
        if buf.len() < size {
            return Err(LayoutError {
                record: Self::LAYOUT.name,
                expected: size,
                actual: buf.len(),
            });
        }
        let mut r = FieldReader::new(Self::LAYOUT, &buf[..size]);
        Ok(Self::read_fields(&mut r))
    }
}

/// Writes fields in table order into a zeroed buffer
pub struct FieldWriter<'a> {
    layout: &'static Layout,
    buf: &'a mut [u8],
    next: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(layout: &'static Layout, buf: &'a mut [u8]) -> Self {
        Self {
            layout,
            buf,
            next: 0,
        }
    }

    fn skip_reserved(&mut self) {
        while let Some(field) = self.layout.fields.get(self.next) {
            if !field.kind.is_reserved() {
                break;
            }
            self.next += 1;
        }
    }

    fn take(&mut self, name: &'static str) -> Result<Field, EncodingError> {
        self.skip_reserved();
        match self.layout.fields.get(self.next) {
            Some(field) if field.name == name => {
                self.next += 1;
                Ok(*field)
            }
            _ => Err(self.unexpected(name)),
        }
    }

    fn unexpected(&self, field: &'static str) -> EncodingError {
        EncodingError::UnexpectedField {
            record: self.layout.name,
            field,
        }
    }

    fn slot(&mut self, field: &Field) -> &mut [u8] {
        &mut self.buf[field.offset..field.end()]
    }

    fn scalar(&mut self, name: &'static str, ty: Scalar, bytes: &[u8]) -> Result<(), EncodingError> {
        let field = self.take(name)?;
        match field.kind {
            FieldKind::Scalar(s) if s == ty => {
                self.slot(&field).copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(self.unexpected(name)),
        }
    }

    pub fn u8(&mut self, name: &'static str, value: u8) -> Result<(), EncodingError> {
        self.scalar(name, Scalar::U8, &[value])
    }

    pub fn u32(&mut self, name: &'static str, value: u32) -> Result<(), EncodingError> {
        self.scalar(name, Scalar::U32, &value.to_ne_bytes())
    }

    /// Write a `u32` that must not exceed `max`
    pub fn u32_max(&mut self, name: &'static str, value: u32, max: u32) -> Result<(), EncodingError> {
        if value > max {
            return Err(EncodingError::OutOfRange {
                record: self.layout.name,
                field: name,
                value: value.into(),
                max: max.into(),
            });
        }
        self.u32(name, value)
    }

    pub fn i32(&mut self, name: &'static str, value: i32) -> Result<(), EncodingError> {
        self.scalar(name, Scalar::I32, &value.to_ne_bytes())
    }

    pub fn u64(&mut self, name: &'static str, value: u64) -> Result<(), EncodingError> {
        self.scalar(name, Scalar::U64, &value.to_ne_bytes())
    }

    pub fn str(&mut self, name: &'static str, value: &[u8]) -> Result<(), EncodingError> {
        let field = self.take(name)?;
        let FieldKind::Str { capacity } = field.kind else {
            return Err(self.unexpected(name));
        };
        if value.len() > capacity {
            return Err(EncodingError::StringOverflow {
                record: self.layout.name,
                field: name,
                capacity,
                required: value.len(),
            });
        }
        self.slot(&field)[..value.len()].copy_from_slice(value);
        Ok(())
    }

    fn array<T: Copy, const W: usize>(
        &mut self,
        name: &'static str,
        ty: Scalar,
        values: &[T],
        to_bytes: impl Fn(T) -> [u8; W],
    ) -> Result<(), EncodingError> {
        let field = self.take(name)?;
        let len = match field.kind {
            FieldKind::Array { elem, len } if elem == ty => len,
            _ => return Err(self.unexpected(name)),
        };
        if values.len() > len {
            return Err(EncodingError::ArrayOverflow {
                record: self.layout.name,
                field: name,
                capacity: len,
                required: values.len(),
            });
        }
        let slot = self.slot(&field);
        for (chunk, value) in slot.chunks_exact_mut(W).zip(values) {
            chunk.copy_from_slice(&to_bytes(*value));
        }
        Ok(())
    }

    /// Write up to the array's length; remaining slots stay zero.
    pub fn u8_array(&mut self, name: &'static str, values: &[u8]) -> Result<(), EncodingError> {
        self.array(name, Scalar::U8, values, |v| [v])
    }

    /// Write up to the array's length; remaining slots stay zero.
    pub fn u32_array(&mut self, name: &'static str, values: &[u32]) -> Result<(), EncodingError> {
        self.array(name, Scalar::U32, values, u32::to_ne_bytes)
    }

    pub fn record<R: Record>(&mut self, name: &'static str, value: &R) -> Result<(), EncodingError> {
        let field = self.take(name)?;
        match field.kind {
            FieldKind::Nested(layout) if layout.name == R::LAYOUT.name => {
                value.encode_into(self.slot(&field))
            }
            _ => Err(self.unexpected(name)),
        }
    }

    fn finish(mut self) -> Result<(), EncodingError> {
        self.skip_reserved();
        match self.layout.fields.get(self.next) {
            Some(field) => Err(EncodingError::MissingField {
                record: self.layout.name,
                field: field.name,
            }),
            None => Ok(()),
        }
    }
}

/// Reads fields in table order out of a buffer of the layout's size
pub struct FieldReader<'a> {
    layout: &'static Layout,
    buf: &'a [u8],
    next: usize,
}

impl<'a> FieldReader<'a> {
    fn new(layout: &'static Layout, buf: &'a [u8]) -> Self {
        Self {
            layout,
            buf,
            next: 0,
        }
    }

    fn take(&mut self, name: &str) -> &'a [u8] {
        while self.layout.fields[self.next].kind.is_reserved() {
            self.next += 1;
        }
        let field = &self.layout.fields[self.next];
        debug_assert_eq!(field.name, name, "{} read out of table order", self.layout.name);
        self.next += 1;
        &self.buf[field.offset..field.end()]
    }

    pub fn u8(&mut self, name: &str) -> u8 {
        self.take(name)[0]
    }

    pub fn u32(&mut self, name: &str) -> u32 {
        u32::from_ne_bytes(ne(self.take(name)))
    }

    pub fn i32(&mut self, name: &str) -> i32 {
        i32::from_ne_bytes(ne(self.take(name)))
    }

    pub fn u64(&mut self, name: &str) -> u64 {
        u64::from_ne_bytes(ne(self.take(name)))
    }

    pub fn str<const N: usize>(&mut self, name: &str) -> FixedStr<N> {
        FixedStr::from_wire(self.take(name))
    }

    pub fn u8_array<const N: usize>(&mut self, name: &str) -> [u8; N] {
        ne(self.take(name))
    }

    pub fn u32_array<const N: usize>(&mut self, name: &str) -> [u32; N] {
        let bytes = self.take(name);
        let mut out = [0; N];
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = u32::from_ne_bytes(ne(chunk));
        }
        out
    }

    pub fn record<R: Record>(&mut self, name: &str) -> R {
        let bytes = self.take(name);
        let mut r = FieldReader::new(R::LAYOUT, bytes);
        R::read_fields(&mut r)
    }
}

#[inline]
fn ne<const W: usize>(bytes: &[u8]) -> [u8; W] {
    let mut out = [0; W];
    out.copy_from_slice(&bytes[..W]);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    const PAIR: Layout = Layout {
        name: "pair",
        fields: &[
            Field::new("id", FieldKind::Scalar(Scalar::U32), 0),
            Field::new("tag", FieldKind::Str { capacity: 4 }, 4),
            Field::new("_padding", FieldKind::Reserved { elem: Scalar::U32, len: 2 }, 8),
            Field::new("when", FieldKind::Scalar(Scalar::U64), 16),
        ],
        size: 24,
    };

    const SHIFTED: Layout = Layout {
        name: "shifted",
        fields: &[
            Field::new("flag", FieldKind::Scalar(Scalar::U8), 0),
            Field::new("value", FieldKind::Scalar(Scalar::U32), 1),
        ],
        size: 5,
    };

    #[derive(Debug, PartialEq)]
    struct Pair {
        id: u32,
        tag: FixedStr<4>,
        when: u64,
    }

    impl Record for Pair {
        const LAYOUT: &'static Layout = &PAIR;

        fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
            w.u32("id", self.id)?;
            w.str("tag", self.tag.as_bytes())?;
            w.u64("when", self.when)
        }

        fn read_fields(r: &mut FieldReader<'_>) -> Self {
            Self {
                id: r.u32("id"),
                tag: r.str("tag"),
                when: r.u64("when"),
            }
        }
    }

    struct Partial;

    impl Record for Partial {
        const LAYOUT: &'static Layout = &PAIR;

        fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
            w.u32("id", 1)
        }

        fn read_fields(_: &mut FieldReader<'_>) -> Self {
            Partial
        }
    }

    #[test]
    fn consistency() {
        assert!(PAIR.is_consistent());
        assert!(!SHIFTED.is_consistent());
        assert_eq!(PAIR.align(), 8);
        assert_eq!(PAIR.field("when").map(|f| f.offset), Some(16));
    }

    #[test]
    fn encodes_host_order_with_zeroed_reserved() {
        let pair = Pair {
            id: 0x0102_0304,
            tag: FixedStr::new("ab").unwrap(),
            when: 7,
        };
        let buf = pair.encode().unwrap();
        assert_eq!(buf.len(), 24);
        assert_eq!(&buf[0..4], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(&buf[4..8], b"ab\0\0");
        assert_eq!(&buf[8..16], &[0; 8]);
        assert_eq!(&buf[16..24], &7u64.to_ne_bytes());
        assert_eq!(Pair::decode(&buf).unwrap(), pair);
    }

    #[test]
    fn reserved_bytes_are_ignored_on_decode() {
        let mut buf = Pair {
            id: 3,
            tag: FixedStr::empty(),
            when: 0,
        }
        .encode()
        .unwrap();
        buf[8..16].fill(0xAA);
        assert_eq!(Pair::decode(&buf).unwrap().id, 3);
    }

    #[test]
    fn short_buffer_is_a_layout_error() {
        let err = Pair::decode(&[0; 23]).unwrap_err();
        assert_eq!(
            err,
            LayoutError {
                record: "pair",
                expected: 24,
                actual: 23
            }
        );
    }

    #[test]
    fn wrong_buffer_size() {
        let pair = Pair {
            id: 1,
            tag: FixedStr::empty(),
            when: 0,
        };
        for len in [16, 32] {
            let mut buf = vec![0; len];
            assert_eq!(
                pair.encode_into(&mut buf).unwrap_err(),
                EncodingError::BufferSize {
                    record: "pair",
                    expected: 24,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn missing_field() {
        assert_eq!(
            Partial.encode().unwrap_err(),
            EncodingError::MissingField {
                record: "pair",
                field: "tag"
            }
        );
    }

    #[test]
    fn string_overflow() {
        let mut buf = [0; 24];
        let mut w = FieldWriter::new(&PAIR, &mut buf);
        w.u32("id", 1).unwrap();
        assert_eq!(
            w.str("tag", b"abcde").unwrap_err(),
            EncodingError::StringOverflow {
                record: "pair",
                field: "tag",
                capacity: 4,
                required: 5
            }
        );
    }

    #[test]
    fn out_of_order_write() {
        let mut buf = [0; 24];
        let mut w = FieldWriter::new(&PAIR, &mut buf);
        assert_eq!(
            w.u64("when", 1).unwrap_err(),
            EncodingError::UnexpectedField {
                record: "pair",
                field: "when"
            }
        );
    }

    #[test]
    fn range_check() {
        let mut buf = [0; 24];
        let mut w = FieldWriter::new(&PAIR, &mut buf);
        assert!(matches!(
            w.u32_max("id", 65, 64),
            Err(EncodingError::OutOfRange { value: 65, max: 64, .. })
        ));
    }
}
