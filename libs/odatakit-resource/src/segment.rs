use std::fmt;

use serde_json::{Map, Value};

/// Kinds of path segments a resource may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Metadata,
    Batch,
    EntitySet,
    Singleton,
    Key,
    NavigationProperty,
    Property,
    Function,
    Action,
    Count,
    Value,
    Ref,
}

impl SegmentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "$metadata",
            Self::Batch => "$batch",
            Self::EntitySet => "entitySet",
            Self::Singleton => "singleton",
            Self::Key => "key",
            Self::NavigationProperty => "navigationProperty",
            Self::Property => "property",
            Self::Function => "function",
            Self::Action => "action",
            Self::Count => "$count",
            Self::Value => "$value",
            Self::Ref => "$ref",
        }
    }

    /// Whether this kind may be appended after `prev` (`None` is the service root).
    ///
    /// Roots are entity sets, singletons, `$metadata`, `$batch` and unbound
    /// operations. Keys address entity sets, navigation properties and
    /// collection-returning functions. Actions and the `$` terminals end a path.
    #[must_use]
    pub fn can_follow(self, prev: Option<SegmentKind>) -> bool {
        use SegmentKind as K;

        let Some(prev) = prev else {
            return matches!(
                self,
                K::EntitySet | K::Singleton | K::Metadata | K::Batch | K::Function | K::Action
            );
        };
        match self {
            K::Metadata | K::Batch | K::EntitySet | K::Singleton => false,
            K::Key => matches!(prev, K::EntitySet | K::NavigationProperty | K::Function),
            K::Value | K::Count => prev.is_addressable() || prev == K::Property,
            K::NavigationProperty | K::Function | K::Action | K::Ref | K::Property => {
                prev.is_addressable()
            }
        }
    }

    /// Nothing may follow a terminal segment.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Metadata | Self::Batch | Self::Action | Self::Count | Self::Value | Self::Ref
        )
    }

    fn is_addressable(self) -> bool {
        matches!(
            self,
            Self::EntitySet
                | Self::Singleton
                | Self::Key
                | Self::NavigationProperty
                | Self::Function
        )
    }

    /// Fixed path text for the `$` segments.
    #[must_use]
    pub fn system_name(self) -> Option<&'static str> {
        match self {
            Self::Metadata | Self::Batch | Self::Count | Self::Value | Self::Ref => {
                Some(self.as_str())
            }
            _ => None,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a resource path together with its segment-local options.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    kind: SegmentKind,
    name: Option<String>,
    type_name: Option<String>,
    collection: bool,
    key: Option<Value>,
    parameters: Option<Map<String, Value>>,
    cast: Option<String>,
}

impl PathSegment {
    #[must_use]
    pub fn new(kind: SegmentKind, name: Option<String>, type_name: Option<String>) -> Self {
        Self {
            kind,
            name,
            type_name,
            collection: false,
            key: None,
            parameters: None,
            cast: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Type addressed once this segment is applied.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    #[must_use]
    pub fn with_collection(mut self, collection: bool) -> Self {
        self.collection = collection;
        self
    }

    /// Whether the path addresses a collection once this segment is applied.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    #[must_use]
    pub fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }

    /// `None` removes the option.
    pub fn set_key(&mut self, key: Option<Value>) {
        self.key = key;
    }

    #[must_use]
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.parameters.as_ref()
    }

    pub fn set_parameters(&mut self, parameters: Option<Map<String, Value>>) {
        self.parameters = parameters;
    }

    #[must_use]
    pub fn cast(&self) -> Option<&str> {
        self.cast.as_deref()
    }

    /// Casting narrows the addressed type as well.
    pub fn set_cast(&mut self, cast: Option<String>) {
        if let Some(ty) = &cast {
            self.type_name = Some(ty.clone());
        }
        self.cast = cast;
    }
}
