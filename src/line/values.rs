use crate::{codec::EncodingError, uapi::HandleData};

use super::LineSet;

/// Logical level of a line
///
/// With [`Active::Low`](super::options::Active::Low) the kernel inverts the
/// physical level, so `Active` always means "asserted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineValue {
    Active,
    Inactive,
}

impl LineValue {
    pub const fn new(is_active: bool) -> Self {
        if is_active {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self, LineValue::Active)
    }
}

impl From<bool> for LineValue {
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

/// The kernel reads anything other than 0 as 1
impl From<u8> for LineValue {
    fn from(v: u8) -> Self {
        Self::new(v != 0)
    }
}

impl From<LineValue> for u8 {
    fn from(v: LineValue) -> Self {
        v.is_active() as u8
    }
}

/// Values to drive, or to use as defaults, for the lines of a request
///
/// A single value applies to every line. A sequence is matched to the
/// lines by position and may be shorter than the request, in which case
/// the remaining lines get 0.
pub trait AsValues {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError>;
}

fn fill(lines: &LineSet, value: u8) -> HandleData {
    let mut data = HandleData::zeroed();
    data.values[..lines.len()].fill(value);
    data
}

fn positional(
    lines: &LineSet,
    values: impl ExactSizeIterator<Item = u8>,
) -> Result<HandleData, EncodingError> {
    if values.len() > lines.len() {
        return Err(EncodingError::TooManyValues {
            lines: lines.len(),
            values: values.len(),
        });
    }
    let mut data = HandleData::zeroed();
    for (slot, v) in data.values.iter_mut().zip(values) {
        *slot = v;
    }
    Ok(data)
}

impl AsValues for () {
    fn values(&self, _lines: &LineSet) -> Result<HandleData, EncodingError> {
        Ok(HandleData::zeroed())
    }
}

impl AsValues for u8 {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        Ok(fill(lines, *self))
    }
}

impl AsValues for bool {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        Ok(fill(lines, *self as u8))
    }
}

impl AsValues for LineValue {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        Ok(fill(lines, (*self).into()))
    }
}

impl AsValues for [u8] {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        positional(lines, self.iter().copied())
    }
}

impl<const N: usize> AsValues for [u8; N] {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        self.as_slice().values(lines)
    }
}

impl AsValues for Vec<u8> {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        self.as_slice().values(lines)
    }
}

impl AsValues for [LineValue] {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        positional(lines, self.iter().map(|v| u8::from(*v)))
    }
}

impl<const N: usize> AsValues for [LineValue; N] {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        self.as_slice().values(lines)
    }
}

/// Values keyed by line offset; lines left out get 0
impl AsValues for [(u32, LineValue)] {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        let mut data = HandleData::zeroed();
        for (offset, v) in self {
            let idx = lines
                .find_idx(*offset)
                .ok_or(EncodingError::UnknownOffset(*offset))?;
            data.values[idx] = (*v).into();
        }
        Ok(data)
    }
}

impl<const N: usize> AsValues for [(u32, LineValue); N] {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        self.as_slice().values(lines)
    }
}

impl<T: AsValues + ?Sized> AsValues for &T {
    fn values(&self, lines: &LineSet) -> Result<HandleData, EncodingError> {
        (**self).values(lines)
    }
}

/// Values read back from a line handle
pub struct LineValues<'a> {
    pub(crate) offsets: &'a LineSet,
    pub(crate) data: HandleData,
}

impl<'a> LineValues<'a> {
    pub(crate) fn new(offsets: &'a LineSet, data: HandleData) -> Self {
        Self { offsets, data }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Raw values, one byte per requested line in request order
    pub fn as_bytes(&self) -> &[u8] {
        &self.data.values[..self.offsets.len()]
    }

    /// Value of the line at `offset`, if it is part of the request
    pub fn get(&self, offset: u32) -> Option<LineValue> {
        let idx = self.offsets.find_idx(offset)?;
        Some(self.data.values[idx].into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, LineValue)> + '_ {
        self.offsets
            .iter()
            .copied()
            .zip(self.as_bytes().iter().map(|v| LineValue::from(*v)))
    }
}

impl std::fmt::Debug for LineValues<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        struct F<'a, 'b>(&'a LineValues<'b>);

        impl std::fmt::Debug for F<'_, '_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_map().entries(self.0.iter()).finish()
            }
        }

        f.debug_tuple("LineValues").field(&F(self)).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::line::AsLineSet;

    #[test]
    fn scalar_fills_every_line() {
        let lines = [4u32, 5, 6].as_line_set().unwrap();
        let data = 1u8.values(&lines).unwrap();
        assert_eq!(&data.values[..4], &[1, 1, 1, 0]);
        assert_eq!(LineValue::Active.values(&lines).unwrap(), data);
        assert_eq!(true.values(&lines).unwrap(), data);
        assert_eq!(().values(&lines).unwrap(), HandleData::zeroed());
    }

    #[test]
    fn sequence_is_positional() {
        let lines = [4u32, 5, 6].as_line_set().unwrap();
        let data = [1u8, 0].values(&lines).unwrap();
        assert_eq!(&data.values[..3], &[1, 0, 0]);

        let data = [LineValue::Inactive, LineValue::Active, LineValue::Active]
            .values(&lines)
            .unwrap();
        assert_eq!(&data.values[..3], &[0, 1, 1]);
    }

    #[test]
    fn more_values_than_lines() {
        let lines = [4u32].as_line_set().unwrap();
        assert_eq!(
            vec![1u8, 1].values(&lines),
            Err(EncodingError::TooManyValues { lines: 1, values: 2 })
        );
    }

    #[test]
    fn keyed_by_offset() {
        let lines = [4u32, 5, 6].as_line_set().unwrap();
        let data = [(6u32, LineValue::Active)].values(&lines).unwrap();
        assert_eq!(&data.values[..3], &[0, 0, 1]);

        assert_eq!(
            [(9u32, LineValue::Active)].values(&lines),
            Err(EncodingError::UnknownOffset(9))
        );
    }

    #[test]
    fn read_back_values() {
        let lines = [7u32, 3].as_line_set().unwrap();
        let mut data = HandleData::zeroed();
        data.values[0] = 1;
        data.values[2] = 1;
        let values = LineValues::new(&lines, data);

        assert_eq!(values.as_bytes(), &[1, 0]);
        assert_eq!(values.get(7), Some(LineValue::Active));
        assert_eq!(values.get(3), Some(LineValue::Inactive));
        assert_eq!(values.get(2), None);
        assert_eq!(
            format!("{values:?}"),
            "LineValues({7: Active, 3: Inactive})"
        );
    }
}
