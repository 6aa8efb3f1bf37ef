use itertools::Itertools;

use crate::{
    codec::EncodingError,
    uapi::{v1::checked_lines, GPIOHANDLES_MAX},
};

/// Anything that names the lines of a request
pub trait AsLineSet {
    fn as_line_set(&self) -> Result<LineSet, EncodingError>;
}

impl AsLineSet for u32 {
    fn as_line_set(&self) -> Result<LineSet, EncodingError> {
        LineSet::try_from_iter([*self])
    }
}

impl AsLineSet for [u32] {
    fn as_line_set(&self) -> Result<LineSet, EncodingError> {
        LineSet::try_from_iter(self.iter().copied())
    }
}

impl<const M: usize> AsLineSet for [u32; M] {
    fn as_line_set(&self) -> Result<LineSet, EncodingError> {
        LineSet::try_from_iter(*self)
    }
}

impl AsLineSet for Vec<u32> {
    fn as_line_set(&self) -> Result<LineSet, EncodingError> {
        self.as_slice().as_line_set()
    }
}

impl AsLineSet for LineSet {
    fn as_line_set(&self) -> Result<LineSet, EncodingError> {
        Ok(self.clone())
    }
}

impl<T: AsLineSet + ?Sized> AsLineSet for &T {
    fn as_line_set(&self) -> Result<LineSet, EncodingError> {
        (**self).as_line_set()
    }
}

/// Offsets of the lines in one request, in request order
///
/// The kernel pairs `default_values[i]` and `values[i]` with
/// `lineoffsets[i]`, so the order given by the caller is kept. Offsets are
/// unique and there are between 1 and [`GPIOHANDLES_MAX`] of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineSet(heapless::Vec<u32, GPIOHANDLES_MAX>);

impl LineSet {
    pub fn try_from_iter(iter: impl IntoIterator<Item = u32>) -> Result<Self, EncodingError> {
        let offsets: Vec<u32> = iter.into_iter().collect();
        checked_lines("gpiohandle_request", "lineoffsets", offsets.len())?;

        if offsets.is_empty() {
            return Err(EncodingError::NoLines);
        }
        if let Some(dup) = offsets.iter().duplicates().next() {
            return Err(EncodingError::DuplicateOffset(*dup));
        }

        Ok(Self(offsets.into_iter().collect()))
    }

    pub fn get_offset(&self, idx: usize) -> Option<u32> {
        self.0.get(idx).copied()
    }

    /// Position of `offset` within the request
    pub fn find_idx(&self, offset: u32) -> Option<usize> {
        self.0.iter().position(|o| *o == offset)
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.find_idx(offset).is_some()
    }
}

impl std::ops::Deref for LineSet {
    type Target = [u32];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for LineSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}
