use odatakit_schema::SchemaError;
use thiserror::Error;

use crate::segment::SegmentKind;

/// Errors raised while composing a resource.
///
/// These are local programming errors: the caller asked for a path the
/// protocol does not allow. Nothing is retried.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("segment `{kind}` cannot follow {}", describe_tail(.after.as_ref()))]
    IllegalSegment {
        kind: SegmentKind,
        after: Option<SegmentKind>,
    },

    #[error("resource is not bound to a type")]
    Unbound,

    #[error("resource has no segment to operate on")]
    MissingSegment,

    #[error("`{type_name}` has no property `{property}`")]
    UnknownProperty { type_name: String, property: String },

    #[error("value does not carry every key of `{0}`")]
    IncompleteKey(String),

    #[error("segment `{0}` takes no parameters")]
    NoParameters(SegmentKind),

    #[error("`{name}` is not declared as {kind}")]
    OperationKind { name: String, kind: SegmentKind },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

fn describe_tail(after: Option<&SegmentKind>) -> String {
    after.map_or_else(|| "the service root".to_owned(), |k| format!("`{k}`"))
}
