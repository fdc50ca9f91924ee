// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2022 WATANABE Yuki
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Field splitting
//!
//! The field splitting divides a field into smaller parts delimited by a field
//! separator character. As a side effect, this operation filters out empty
//! fields that are not resulting from the field splitting itself.
//!
//! Fields are delimited by a field separator character, usually obtained from
//! the `$IFS` variable. Every occurrence of a non-whitespace separator delimits
//! a new field (which may be an empty field). One or more adjacent whitespace
//! separators in the middle of a field further split the field. Any separator
//! does not remain in the final results.
//!
//! Only [unquoted characters](super::attr::AttrChar) having a `SoftExpansion`
//! [origin](super::attr::Origin) are considered for delimiting. Other
//! characters are not subject to field splitting.

mod ifs;

pub use self::ifs::{Class, Ifs};

use super::attr::AttrChar;
use super::attr::AttrField;
use super::attr::Origin;
use std::iter::FusedIterator;
use std::ops::Range;

/// State of a field-splitting iterator
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum State {
    Midfield { start_index: usize },
    AfterIfsWhitespace,
    #[default]
    AfterIfsNonWhitespace,
}

use State::*;

/// Classifies an `AttrChar` for the purpose of field splitting.
///
/// Only unquoted, non-quoting characters with a `SoftExpansion` origin are
/// eligible to be field separators.
fn classify(ifs: &Ifs<'_>, c: AttrChar) -> Class {
    if c.is_quoted || c.is_quoting || c.origin != Origin::SoftExpansion {
        Class::NonIfs
    } else {
        ifs.classify(c.value)
    }
}

/// Iterator that yields index ranges of separated fields
struct Ranges<'a, I: Iterator<Item = AttrChar>> {
    inner: I,
    next_index: usize,
    ifs: &'a Ifs<'a>,
    state: Option<State>,
}

impl<'a> Ifs<'a> {
    /// Creates a field-splitting iterator over the given characters.
    fn ranges<I>(&'a self, field_chars: I) -> Ranges<'a, I::IntoIter>
    where
        I: IntoIterator<Item = AttrChar>,
    {
        Ranges {
            inner: field_chars.into_iter(),
            next_index: 0,
            ifs: self,
            state: Some(State::default()),
        }
    }
}

impl<I> Iterator for Ranges<'_, I>
where
    I: Iterator<Item = AttrChar>,
{
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        while let Some(state) = self.state {
            let index = self.next_index;
            let class = self.inner.next().map(|c| classify(self.ifs, c));
            self.next_index += 1;

            let (next_state, field_range) = match (state, class) {
                (Midfield { start_index }, Some(Class::IfsNonWhitespace) | None) => {
                    (Some(AfterIfsNonWhitespace), Some(start_index..index))
                }
                (Midfield { start_index }, Some(Class::IfsWhitespace)) => {
                    (Some(AfterIfsWhitespace), Some(start_index..index))
                }
                (Midfield { .. }, Some(Class::NonIfs)) => (Some(state), None),
                (AfterIfsWhitespace, Some(Class::IfsNonWhitespace)) => {
                    (Some(AfterIfsNonWhitespace), None)
                }
                (AfterIfsNonWhitespace, Some(Class::IfsNonWhitespace)) => {
                    (Some(state), Some(index..index))
                }
                (_, Some(Class::NonIfs)) => (Some(Midfield { start_index: index }), None),
                (_, Some(Class::IfsWhitespace)) => (Some(state), None),
                (_, None) => (None, None),
            };

            self.state = next_state;
            if field_range.is_some() {
                return field_range;
            }
        }

        None
    }
}

impl<I> FusedIterator for Ranges<'_, I> where I: Iterator<Item = AttrChar> {}

/// Performs field splitting and appends the result to a collection.
///
/// The resultant fields share the same origin as the input field.
pub fn split_into<R>(field: AttrField, ifs: &Ifs<'_>, results: &mut R)
where
    R: Extend<AttrField>,
{
    let mut ranges = ifs.ranges(field.chars.iter().copied()).peekable();
    while let Some(range) = ranges.next() {
        if ranges.peek().is_some() {
            results.extend(std::iter::once(AttrField {
                chars: field.chars[range].to_vec(),
                origin: field.origin.clone(),
            }));
        } else {
            let mut field = field;
            field.chars.truncate(range.end);
            field.chars.drain(..range.start);
            results.extend(std::iter::once(field));
            break;
        }
    }
}

/// Performs field splitting and returns the result in a new collection.
pub fn split<R>(field: AttrField, ifs: &Ifs<'_>) -> R
where
    R: Default + Extend<AttrField>,
{
    let mut results = R::default();
    split_into(field, ifs, &mut results);
    results
}
