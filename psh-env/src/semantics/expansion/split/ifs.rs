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

//! Field separator characters

use super::super::attr::AttrChar;
use super::super::attr::Origin;

/// Classification of a character with respect to field splitting
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Class {
    /// Character is a whitespace field separator.
    IfsWhitespace,
    /// Character is a non-whitespace field separator.
    IfsNonWhitespace,
    /// Character is not a field separator.
    NonIfs,
}

/// Set of field separator characters
///
/// An `Ifs` instance wraps the characters taken from the `$IFS` variable
/// and knows how to classify each character as whitespace, non-whitespace,
/// or not a separator at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ifs<'a> {
    chars: &'a str,
}

/// The default value of `$IFS` is a space, a tab, and a newline.
const DEFAULT_IFS: &str = " \t\n";

impl Default for Ifs<'_> {
    fn default() -> Self {
        Ifs { chars: DEFAULT_IFS }
    }
}

impl<'a> Ifs<'a> {
    /// Creates an `Ifs` from the given characters.
    #[must_use]
    pub fn new(chars: &'a str) -> Self {
        Ifs { chars }
    }

    /// Returns the characters contained in this `Ifs`.
    #[must_use]
    pub fn chars(&self) -> &'a str {
        self.chars
    }

    /// Returns the non-whitespace characters contained in this `Ifs`.
    #[must_use]
    pub fn non_whitespaces(&self) -> String {
        self.chars.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Classifies a plain character.
    #[must_use]
    pub fn classify(&self, c: char) -> Class {
        if !self.chars.contains(c) {
            Class::NonIfs
        } else if c.is_whitespace() {
            Class::IfsWhitespace
        } else {
            Class::IfsNonWhitespace
        }
    }

    /// Classifies an `AttrChar`.
    ///
    /// Only unquoted, non-quoting characters with a
    /// [`SoftExpansion`](Origin::SoftExpansion) origin are eligible to be
    /// field separators; any other character is classified as
    /// [`NonIfs`](Class::NonIfs).
    #[must_use]
    pub fn classify_attr(&self, c: AttrChar) -> Class {
        if c.is_quoted || c.is_quoting || c.origin != Origin::SoftExpansion {
            Class::NonIfs
        } else {
            self.classify(c.value)
        }
    }
}
