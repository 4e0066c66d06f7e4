//! Error types for field access, building and parsing.

use std::fmt;

use prost::DecodeError;

use crate::{DynamicMessage, FieldDescriptor, Value};

/// An error returned when a field mutator or accessor is used in a way that
/// does not match the field's descriptor.
///
/// These are local programming errors; they are never produced by parsing.
#[derive(Debug)]
pub struct AccessError {
    kind: AccessErrorKind,
}

#[derive(Debug)]
enum AccessErrorKind {
    TypeMismatch {
        containing_type: Box<str>,
        field: Box<str>,
        value: &'static str,
    },
    NotRepeated {
        field: Box<str>,
    },
    NotSingular {
        field: Box<str>,
    },
    OutOfRange {
        field: Box<str>,
        index: usize,
        len: usize,
    },
}

impl AccessError {
    pub(crate) fn type_mismatch(field: &FieldDescriptor, value: &Value) -> Self {
        AccessError {
            kind: AccessErrorKind::TypeMismatch {
                containing_type: field.containing_message().full_name().into(),
                field: field_label(field),
                value: value.type_name(),
            },
        }
    }

    pub(crate) fn not_repeated(field: &FieldDescriptor) -> Self {
        AccessError {
            kind: AccessErrorKind::NotRepeated {
                field: field_label(field),
            },
        }
    }

    pub(crate) fn not_singular(field: &FieldDescriptor) -> Self {
        AccessError {
            kind: AccessErrorKind::NotSingular {
                field: field_label(field),
            },
        }
    }

    pub(crate) fn out_of_range(field: &FieldDescriptor, index: usize, len: usize) -> Self {
        AccessError {
            kind: AccessErrorKind::OutOfRange {
                field: field_label(field),
                index,
                len,
            },
        }
    }
}

/// Extensions are reported by full name since the short name is only
/// meaningful within the scope declaring them.
fn field_label(field: &FieldDescriptor) -> Box<str> {
    if field.is_extension() {
        field.full_name().into()
    } else {
        field.name().into()
    }
}

impl std::error::Error for AccessError {}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AccessErrorKind::TypeMismatch {
                containing_type,
                field,
                value,
            } => write!(
                f,
                "value of type {} is not valid for field '{}' of '{}'",
                value, field, containing_type
            ),
            AccessErrorKind::NotRepeated { field } => {
                write!(f, "field '{}' is not repeated", field)
            }
            AccessErrorKind::NotSingular { field } => {
                write!(f, "field '{}' is repeated", field)
            }
            AccessErrorKind::OutOfRange { field, index, len } => write!(
                f,
                "index {} is out of range for field '{}' with {} elements",
                index, field, len
            ),
        }
    }
}

/// An error returned by [`DynamicBuilder::build`][crate::DynamicBuilder::build]
/// when one or more required fields are unset.
///
/// The partially built message is retained for diagnostics.
#[derive(Debug)]
pub struct UninitializedMessage {
    partial: DynamicMessage,
    missing: Vec<String>,
}

impl UninitializedMessage {
    pub(crate) fn new(partial: DynamicMessage, missing: Vec<String>) -> Self {
        UninitializedMessage { partial, missing }
    }

    /// Gets the partially built message.
    pub fn partial(&self) -> &DynamicMessage {
        &self.partial
    }

    /// Consumes the error, returning the partially built message.
    pub fn into_partial(self) -> DynamicMessage {
        self.partial
    }

    /// Gets the paths of the required fields that are unset, relative to the
    /// built message.
    pub fn missing_fields(&self) -> &[String] {
        &self.missing
    }
}

impl std::error::Error for UninitializedMessage {}

impl fmt::Display for UninitializedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message '{}' is missing required fields: {}",
            self.partial.descriptor().full_name(),
            self.missing.join(", ")
        )
    }
}

/// An error returned when a protobuf message fails to parse.
///
/// All parse failures share this category: corrupt wire data and messages
/// whose required fields are unset.
#[derive(Debug)]
pub struct ParseError {
    kind: ParseErrorKind,
}

#[derive(Debug)]
enum ParseErrorKind {
    Malformed(DecodeError),
    Uninitialized(Box<UninitializedMessage>),
}

impl ParseError {
    /// Gets the underlying wire format error, if the input was malformed.
    pub fn as_malformed(&self) -> Option<&DecodeError> {
        match &self.kind {
            ParseErrorKind::Malformed(err) => Some(err),
            ParseErrorKind::Uninitialized(_) => None,
        }
    }

    /// Gets the underlying initialization error, if required fields were
    /// unset.
    pub fn as_uninitialized(&self) -> Option<&UninitializedMessage> {
        match &self.kind {
            ParseErrorKind::Malformed(_) => None,
            ParseErrorKind::Uninitialized(err) => Some(err),
        }
    }
}

impl From<DecodeError> for ParseError {
    fn from(err: DecodeError) -> Self {
        ParseError {
            kind: ParseErrorKind::Malformed(err),
        }
    }
}

impl From<UninitializedMessage> for ParseError {
    fn from(err: UninitializedMessage) -> Self {
        ParseError {
            kind: ParseErrorKind::Uninitialized(Box::new(err)),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrorKind::Malformed(err) => Some(err),
            ParseErrorKind::Uninitialized(err) => Some(err.as_ref()),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::Malformed(err) => write!(f, "failed to parse message: {}", err),
            ParseErrorKind::Uninitialized(err) => {
                write!(f, "failed to parse message: {}", err)
            }
        }
    }
}
