// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Wide String
//!
//! `WideString` stores UTF-16 code units in a `SboVector` and always keeps a terminating zero
//! behind the text once anything has been written, so `as_wide_with_nul` can be handed straight to
//! platform calls.  Twenty units fit inline, which covers most labels and log fragments.
//!
//! ## Formatting
//!
//! `append_format` replaces each `%` with the next argument.  Arguments are anything implementing
//! `AppendWide`, which writes into the existing buffer instead of building a temporary string.
//!
//! ```
//! use keel_lib::string::WideString;
//!
//! let s = WideString::format("% of % frames, 100\\%", &[&3u32, &"60"]).unwrap();
//! assert_eq!(s, "3 of 60 frames, 100%");
//! ```
//!
//! A `\` escapes a following `%` or `\`.  Any other `\` is copied as-is.  Placeholders left over
//! after the arguments run out are copied verbatim and surplus arguments are ignored.

use std::fmt::{self, Write as _};

use keel_vector::{SboVector, VectorError};

pub type WideChar = u16;

pub const ESCAPE: WideChar = b'\\' as WideChar;
pub const PLACEHOLDER: WideChar = b'%' as WideChar;

const INLINE_UNITS: usize = 20;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct WideString {
    units: SboVector<WideChar, INLINE_UNITS>,
}

impl WideString {
    pub fn new() -> Self {
        WideString {
            units: SboVector::new(),
        }
    }

    /// Copies `units` up to the first zero, if any.
    pub fn from_wide(units: &[WideChar]) -> Result<Self, VectorError> {
        let mut s = Self::new();
        s.push_wide_str(units)?;
        Ok(s)
    }

    pub fn format(fmt: &str, args: &[&dyn AppendWide]) -> Result<Self, VectorError> {
        let mut s = Self::new();
        s.append_format(fmt, args)?;
        Ok(s)
    }

    /// Number of code units, not counting the terminator.
    pub fn length(&self) -> usize {
        self.units.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn as_wide(&self) -> &[WideChar] {
        &self.units[..self.length()]
    }

    /// The text followed by its terminator.  Never empty.
    pub fn as_wide_with_nul(&self) -> &[WideChar] {
        if self.units.is_empty() {
            &[0]
        } else {
            &self.units
        }
    }

    pub fn push(&mut self, c: char) -> Result<(), VectorError> {
        let mut buf = [0; 2];
        self.append_slice(c.encode_utf16(&mut buf))
    }

    pub fn push_wide(&mut self, unit: WideChar) -> Result<(), VectorError> {
        self.push_wide_str(&[unit])
    }

    pub fn push_str(&mut self, s: &str) -> Result<(), VectorError> {
        // A UTF-8 string never has more UTF-16 units than bytes.
        self.append_iter(s.len(), s.encode_utf16())
    }

    /// Appends `units` up to the first zero, if any.
    pub fn push_wide_str(&mut self, units: &[WideChar]) -> Result<(), VectorError> {
        let end = units.iter().position(|u| *u == 0).unwrap_or(units.len());
        self.append_slice(&units[..end])
    }

    pub fn append(&mut self, other: &WideString) -> Result<(), VectorError> {
        self.append_slice(other.as_wide())
    }

    /// Appends `len` units of `src` starting at `from`.  Panics if the region is out of range.
    #[track_caller]
    pub fn append_region(
        &mut self,
        src: &[WideChar],
        from: usize,
        len: usize,
    ) -> Result<(), VectorError> {
        let end = from.saturating_add(len);
        assert!(
            end <= src.len(),
            "append_region {from}..{end} out of bounds (len {})",
            src.len()
        );
        self.push_wide_str(&src[from..end])
    }

    pub fn find_not_escaped(&self, c: WideChar, from: usize) -> Option<usize> {
        find_not_escaped(self.as_wide(), c, from)
    }

    pub fn append_format(&mut self, fmt: &str, args: &[&dyn AppendWide]) -> Result<(), VectorError> {
        let src = WideString::try_from(fmt)?;
        let src = src.as_wide();

        let mut args = args.iter();
        let mut from = 0;
        while let Some(at) = find_not_escaped(src, PLACEHOLDER, from) {
            let Some(arg) = args.next() else {
                break;
            };
            self.append_unescaped(&src[from..at])?;
            arg.append_to(self)?;
            from = at + 1;
        }
        self.append_unescaped(&src[from..])
    }

    /// Appends `num` in `base` (2 to 36) with a leading `-` when negative.
    #[track_caller]
    pub fn append_int(
        &mut self,
        num: i64,
        base: u32,
        capitalize_hex: bool,
    ) -> Result<(), VectorError> {
        assert!((2..=36).contains(&base), "append_int base {base} not in 2..=36");

        // 64 binary digits and a sign.
        let mut digits = [0 as WideChar; 65];
        let mut at = digits.len();
        let mut n = num.unsigned_abs();
        let base = u64::from(base);
        loop {
            let d = (n % base) as u8;
            let c = match d {
                0..=9 => b'0' + d,
                _ if capitalize_hex => b'A' + d - 10,
                _ => b'a' + d - 10,
            };
            at -= 1;
            digits[at] = WideChar::from(c);
            n /= base;
            if n == 0 {
                break;
            }
        }
        if num < 0 {
            at -= 1;
            digits[at] = WideChar::from(b'-');
        }
        self.append_slice(&digits[at..])
    }

    /// Copies `units`, turning `\%` and `\\` into `%` and `\`.
    fn append_unescaped(&mut self, units: &[WideChar]) -> Result<(), VectorError> {
        let mut plain: SboVector<WideChar, 64> = SboVector::new();
        plain.reserve(units.len())?;
        let mut iter = units.iter().copied().peekable();
        while let Some(u) = iter.next() {
            match (u, iter.peek()) {
                (ESCAPE, Some(&next)) if next == PLACEHOLDER || next == ESCAPE => {
                    plain.push_back(next)?;
                    iter.next();
                }
                _ => plain.push_back(u)?,
            }
        }
        self.append_slice(&plain)
    }

    fn append_slice(&mut self, units: &[WideChar]) -> Result<(), VectorError> {
        self.append_iter(units.len(), units.iter().copied())
    }

    /// Reserves room for up to `max_count` units plus the terminator before writing anything, so
    /// a failed allocation leaves the old terminated text in place.
    fn append_iter(
        &mut self,
        max_count: usize,
        units: impl Iterator<Item = WideChar>,
    ) -> Result<(), VectorError> {
        if max_count == 0 {
            return Ok(());
        }
        let start = self.length();
        let needed = start
            .checked_add(max_count)
            .and_then(|n| n.checked_add(1))
            .ok_or(VectorError::CapacityOverflow)?;
        self.units.reserve_amortized(needed)?;

        self.units.truncate(start);
        for u in units.take(max_count) {
            self.units.push_back(u)?;
        }
        self.units.push_back(0)
    }
}

/// First `c` at or after `from` that is not preceded by an odd run of `ESCAPE` units.
pub fn find_not_escaped(units: &[WideChar], c: WideChar, from: usize) -> Option<usize> {
    (from..units.len()).find(|&i| {
        units[i] == c
            && units[..i]
                .iter()
                .rev()
                .take_while(|u| **u == ESCAPE)
                .count()
                % 2
                == 0
    })
}

impl TryFrom<&str> for WideString {
    type Error = VectorError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut w = WideString::new();
        w.push_str(s)?;
        Ok(w)
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        char::decode_utf16(self.as_wide().iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .try_for_each(|c| f.write_char(c))
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

impl PartialEq<&str> for WideString {
    fn eq(&self, other: &&str) -> bool {
        self.as_wide().iter().copied().eq(other.encode_utf16())
    }
}

/// Writes a value into an existing `WideString`.  Implement it to make a type usable as an
/// `append_format` argument.
pub trait AppendWide {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError>;
}

/// Shortcut for a fresh string holding one value.
pub fn to_wide(value: &dyn AppendWide) -> Result<WideString, VectorError> {
    let mut s = WideString::new();
    value.append_to(&mut s)?;
    Ok(s)
}

impl AppendWide for WideString {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
        dst.append(self)
    }
}

impl AppendWide for &str {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
        dst.push_str(self)
    }
}

impl AppendWide for String {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
        dst.push_str(self)
    }
}

impl AppendWide for char {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
        dst.push(*self)
    }
}

macro_rules! append_wide_int {
    ($($t:ty),*) => {
        $(impl AppendWide for $t {
            fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
                dst.append_int(i64::from(*self), 10, false)
            }
        })*
    };
}

append_wide_int!(i8, i16, i32, i64, u8, u16, u32);

impl AppendWide for usize {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
        match i64::try_from(*self) {
            Ok(n) => dst.append_int(n, 10, false),
            // NOTE beyond i64, decimal through the std formatter
            Err(_) => dst.push_str(&self.to_string()),
        }
    }
}

impl<T> AppendWide for *const T {
    fn append_to(&self, dst: &mut WideString) -> Result<(), VectorError> {
        dst.push_str(&format!("{:x}", self.addr()))
    }
}
