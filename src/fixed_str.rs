//! Bounded, NUL padded strings as they appear in kernel records.

use bstr::{BStr, ByteSlice};

/// A string stored in a fixed `N` byte buffer.
///
/// The content occupies the leading bytes and every byte after it is zero.
/// A string that fills all `N` bytes has no terminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
    s: [u8; N],
}

impl<const N: usize> FixedStr<N> {
    #[inline]
    pub const fn empty() -> Self {
        Self { s: [0; N] }
    }

    /// Copy `s` into a new fixed string.
    ///
    /// Fails if `s` does not fit in `N` bytes or contains a NUL byte, which
    /// would end the string early once read back.
    pub fn new(s: &str) -> Result<Self, FixedStrErr> {
        let bytes = s.as_bytes();
        if bytes.len() > N {
            return Err(FixedStrErr::CapacityOverflow {
                capacity: N,
                required: bytes.len(),
            });
        }
        if let Some(position) = bytes.find_byte(0) {
            return Err(FixedStrErr::InteriorNul { position });
        }

        let mut f = Self::empty();
        f.s[..bytes.len()].copy_from_slice(bytes);
        Ok(f)
    }

    /// Read a string out of a wire buffer.
    ///
    /// Stops at the first NUL or after `N` bytes, whichever comes first.
    /// Anything after the terminator is discarded.
    pub fn from_wire(bytes: &[u8]) -> Self {
        let bytes = &bytes[..bytes.len().min(N)];
        let len = find_nul(bytes);

        let mut f = Self::empty();
        f.s[..len].copy_from_slice(&bytes[..len]);
        f
    }

    pub const fn into_byte_array(self) -> [u8; N] {
        self.s
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn len(&self) -> usize {
        find_nul(&self.s)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0 || self.s[0] == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.s[..self.len()]
    }

    #[inline]
    pub fn as_bstr(&self) -> &BStr {
        self.as_bytes().as_bstr()
    }

    /// The content as UTF-8, if it is valid UTF-8.
    pub fn to_str(&self) -> Result<&str, FixedStrErr> {
        Ok(core::str::from_utf8(self.as_bytes())?)
    }
}

impl<const N: usize> Default for FixedStr<N> {
    #[inline(always)]
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> std::fmt::Debug for FixedStr<N> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FixedStr").field(&self.as_bstr()).finish()
    }
}

impl<const N: usize> std::fmt::Display for FixedStr<N> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_bstr(), f)
    }
}

impl<const N: usize> AsRef<[u8]> for FixedStr<N> {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const N: usize> TryFrom<&str> for FixedStr<N> {
    type Error = FixedStrErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedStrErr {
    #[error(
        "Exceeded fixed string size: required {required} bytes with only {capacity} available"
    )]
    CapacityOverflow { capacity: usize, required: usize },
    #[error("String contains a NUL byte at position {position}")]
    InteriorNul { position: usize },
    #[error("UTF8 Error")]
    Utf8(#[from] core::str::Utf8Error),
}

#[inline]
fn find_nul(s: &[u8]) -> usize {
    s.find_byte(0).unwrap_or(s.len())
}

/// Generators for labels as the kernel stores them
#[cfg(test)]
pub(crate) mod strategy {
    use proptest::prelude::*;

    use super::FixedStr;

    /// Any printable label from empty up to the full `N` bytes
    pub(crate) fn label<const N: usize>() -> impl Strategy<Value = FixedStr<N>> {
        proptest::string::string_regex(&format!("[ -~]{{0,{N}}}"))
            .unwrap()
            .prop_map(|s| FixedStr::new(&s).unwrap())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fits_exactly() {
        let s = FixedStr::<4>::new("abcd").unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.as_bytes(), b"abcd");
        assert_eq!(s.into_byte_array(), *b"abcd");
    }

    #[test]
    fn rejects_overflow() {
        let err = FixedStr::<4>::new("abcde").unwrap_err();
        assert_eq!(
            err,
            FixedStrErr::CapacityOverflow {
                capacity: 4,
                required: 5
            }
        );
    }

    #[test]
    fn rejects_interior_nul() {
        let err = FixedStr::<8>::new("ab\0c").unwrap_err();
        assert_eq!(err, FixedStrErr::InteriorNul { position: 2 });
    }

    #[test]
    fn wire_read_stops_at_nul() {
        let s = FixedStr::<8>::from_wire(b"gpio\0junk");
        assert_eq!(s.as_bytes(), b"gpio");
        assert_eq!(s.into_byte_array(), *b"gpio\0\0\0\0");
    }

    #[test]
    fn wire_read_stops_at_capacity() {
        let s = FixedStr::<4>::from_wire(b"gpiochip");
        assert_eq!(s.to_str().unwrap(), "gpio");
    }

    #[test]
    fn empty_is_empty() {
        assert!(FixedStr::<32>::empty().is_empty());
        assert!(!FixedStr::<32>::new("x").unwrap().is_empty());
    }

    #[test]
    fn non_utf8_displays_lossy() {
        let s = FixedStr::<4>::from_wire(&[b'a', 0xff, 0]);
        assert!(s.to_str().is_err());
        assert_eq!(s.to_string(), "a\u{FFFD}");
    }

    mod property_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn wire_image_reads_back(s in "[ -~]{0,32}") {
                let f = FixedStr::<32>::new(&s).unwrap();
                prop_assert_eq!(f.len(), s.len());
                prop_assert_eq!(FixedStr::<32>::from_wire(&f.into_byte_array()), f);
            }

            #[test]
            fn overlong_is_rejected(s in "[a-z]{33,64}") {
                prop_assert!(FixedStr::<32>::new(&s).is_err());
            }
        }
    }
}
