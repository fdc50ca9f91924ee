//! Data types for turning a [`Location`](super::Location) plus an error
//! message into something a renderer (e.g. the `annotate-snippets` crate) can
//! print as a human-readable diagnostic.
//!
//! This module only builds the intermediate [`Message`]/[`Annotation`]
//! structures; turning them into actual ANSI/plain text is left to whoever
//! consumes them; the crate that owns the terminal (component C7's
//! [`message_to_string`]-style convenience function) is where a concrete
//! renderer crate gets pulled in.

use super::{Location, Source};
use std::borrow::Cow;

/// Severity of an [`Annotation`] or a whole [`Message`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnnotationType {
    Error,
    Warning,
    Info,
    Note,
    Help,
}

/// One source code fragment annotated with a label.
#[derive(Clone, Debug)]
pub struct Annotation<'a> {
    pub r#type: AnnotationType,
    pub label: Cow<'a, str>,
    pub location: &'a Location,
}

impl<'a> Annotation<'a> {
    pub fn new(r#type: AnnotationType, label: Cow<'a, str>, location: &'a Location) -> Self {
        Annotation { r#type, label, location }
    }
}

/// Additional text in a [`Message`] that is not tied to a source location.
#[derive(Clone, Debug)]
pub struct Footer<'a> {
    pub r#type: AnnotationType,
    pub label: Cow<'a, str>,
}

/// A complete diagnostic: one main caption plus every source fragment and
/// extra remark that explains it.
#[derive(Clone, Debug)]
pub struct Message<'a> {
    pub r#type: AnnotationType,
    pub title: Cow<'a, str>,
    pub annotations: Vec<Annotation<'a>>,
    pub footers: Vec<Footer<'a>>,
}

impl Source {
    /// Appends annotations describing where this source itself came from —
    /// e.g. if this is the body of a command substitution, an `Info`
    /// annotation pointing at the substitution in the enclosing source.
    pub fn complement_annotations<'a, 's: 'a, T: Extend<Annotation<'a>>>(&'s self, result: &mut T) {
        match self {
            Source::CommandString | Source::Script { .. } | Source::Unknown => (),
            Source::CommandSubstitution { original } => {
                result.extend(std::iter::once(Annotation::new(
                    AnnotationType::Info,
                    "command substitution appeared here".into(),
                    original,
                )));
                original.code.source.complement_annotations(result);
            }
            Source::Arithmetic { original } => {
                result.extend(std::iter::once(Annotation::new(
                    AnnotationType::Info,
                    "arithmetic expansion appeared here".into(),
                    original,
                )));
                original.code.source.complement_annotations(result);
            }
        }
    }
}

/// Helper for constructing a [`Message`] from an error type.
///
/// Implementors get `From<&T> for Message` for free from the blanket impl
/// below.
pub trait MessageBase {
    fn message_type(&self) -> AnnotationType {
        AnnotationType::Error
    }

    fn message_title(&self) -> Cow<'_, str>;

    fn main_annotation(&self) -> Annotation<'_>;

    fn additional_annotations<'a, T: Extend<Annotation<'a>>>(&'a self, results: &mut T) {
        let _ = results;
    }

    fn footers(&self) -> Vec<Footer<'_>> {
        Vec::new()
    }
}

impl<'a, T: MessageBase> From<&'a T> for Message<'a> {
    fn from(base: &'a T) -> Self {
        let main_annotation = base.main_annotation();
        let main_source = &main_annotation.location.code.source;
        let mut annotations = vec![main_annotation];

        main_source.complement_annotations(&mut annotations);
        base.additional_annotations(&mut annotations);

        Message {
            r#type: base.message_type(),
            title: base.message_title(),
            annotations,
            footers: base.footers(),
        }
    }
}
