//! Typed field references for building `$filter`, `$select` and `$orderby`.
//!
//! - `Schema` trait: maps a field enum to property names of one entity type
//! - `FieldRef`: a property reference carrying the Rust type of its values, so
//!   only comparisons that make sense for that type compile
//! - `IntoODataValue`: conversion of Rust values into filter literals

use crate::ast::{CompareOperator, Expr, Value};
use bigdecimal::BigDecimal;
use std::marker::PhantomData;

/// Field enum to property name mapping for one entity type.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Copy, Clone, Eq, PartialEq)]
/// enum PersonField {
///     UserName,
///     Age,
/// }
///
/// struct PersonSchema;
///
/// impl Schema for PersonSchema {
///     type Field = PersonField;
///
///     fn field_name(field: Self::Field) -> &'static str {
///         match field {
///             PersonField::UserName => "UserName",
///             PersonField::Age => "Age",
///         }
///     }
/// }
/// ```
pub trait Schema {
    type Field: Copy + Eq;

    fn field_name(field: Self::Field) -> &'static str;
}

/// Typed reference to a property of `S` holding values of type `T`.
///
/// Equality and hashing only consider the schema field; `T` exists to restrict
/// which operations are available.
pub struct FieldRef<S: Schema, T> {
    field: S::Field,
    _phantom: PhantomData<(S, T)>,
}

impl<S: Schema, T> FieldRef<S, T> {
    #[must_use]
    pub const fn new(field: S::Field) -> Self {
        Self {
            field,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        S::field_name(self.field)
    }

    fn identifier(self) -> Expr {
        Expr::Identifier(self.name().to_owned())
    }

    fn compare<V: IntoODataValue>(self, op: CompareOperator, value: V) -> Expr {
        Expr::Compare(
            Box::new(self.identifier()),
            op,
            Box::new(Expr::Value(value.into_odata_value())),
        )
    }

    /// Property path into a complex value: `Address/City`.
    #[must_use]
    pub fn path(self, member: &str) -> Expr {
        Expr::Identifier(format!("{}/{member}", self.name()))
    }
}

impl<S: Schema, T> Clone for FieldRef<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Schema, T> Copy for FieldRef<S, T> {}

impl<S: Schema, T> std::fmt::Debug for FieldRef<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRef")
            .field("field", &self.name())
            .finish()
    }
}

impl<S: Schema, T> PartialEq for FieldRef<S, T> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
    }
}

impl<S: Schema, T> Eq for FieldRef<S, T> {}

impl<S: Schema, T> std::hash::Hash for FieldRef<S, T>
where
    S::Field: std::hash::Hash,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.field.hash(state);
    }
}

/// Lets `select`/`order_by` accept field references of mixed value types.
#[doc(hidden)]
pub trait AsFieldName {
    fn as_field_name(&self) -> &'static str;
}

impl<S: Schema, T> AsFieldName for FieldRef<S, T> {
    fn as_field_name(&self) -> &'static str {
        self.name()
    }
}

impl<T: AsFieldName + ?Sized> AsFieldName for &T {
    fn as_field_name(&self) -> &'static str {
        (*self).as_field_name()
    }
}

pub trait IntoODataValue {
    fn into_odata_value(self) -> Value;
}

impl IntoODataValue for Value {
    fn into_odata_value(self) -> Value {
        self
    }
}

impl IntoODataValue for bool {
    fn into_odata_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoODataValue for uuid::Uuid {
    fn into_odata_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl IntoODataValue for String {
    fn into_odata_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoODataValue for &str {
    fn into_odata_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl IntoODataValue for BigDecimal {
    fn into_odata_value(self) -> Value {
        Value::Number(self)
    }
}

macro_rules! integer_values {
    ($($ty:ty),*) => {
        $(
            impl IntoODataValue for $ty {
                fn into_odata_value(self) -> Value {
                    Value::Number(self.into())
                }
            }
        )*
    };
}

integer_values!(i16, i32, i64, u8, u16, u32, u64);

impl IntoODataValue for chrono::DateTime<chrono::Utc> {
    fn into_odata_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl IntoODataValue for chrono::NaiveDate {
    fn into_odata_value(self) -> Value {
        Value::Date(self)
    }
}

impl IntoODataValue for chrono::NaiveTime {
    fn into_odata_value(self) -> Value {
        Value::Time(self)
    }
}

impl<S: Schema, T> FieldRef<S, T> {
    /// `field eq value`
    #[must_use]
    pub fn eq<V: IntoODataValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Eq, value)
    }

    #[must_use]
    pub fn ne<V: IntoODataValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Ne, value)
    }

    #[must_use]
    pub fn gt<V: IntoODataValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Gt, value)
    }

    #[must_use]
    pub fn ge<V: IntoODataValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Ge, value)
    }

    #[must_use]
    pub fn lt<V: IntoODataValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Lt, value)
    }

    #[must_use]
    pub fn le<V: IntoODataValue>(self, value: V) -> Expr {
        self.compare(CompareOperator::Le, value)
    }

    /// `field in (v1,v2,...)`
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let filter = USER_NAME.is_in(["russellwhyte", "scottketchum"]);
    /// ```
    #[must_use]
    pub fn is_in<I>(self, values: I) -> Expr
    where
        I: IntoIterator,
        I::Item: IntoODataValue,
    {
        Expr::In(
            Box::new(self.identifier()),
            values
                .into_iter()
                .map(|v| Expr::Value(v.into_odata_value()))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_null(self) -> Expr {
        self.compare(CompareOperator::Eq, Value::Null)
    }

    #[must_use]
    pub fn is_not_null(self) -> Expr {
        self.compare(CompareOperator::Ne, Value::Null)
    }
}

/// String functions, only on `String` fields.
impl<S: Schema> FieldRef<S, String> {
    fn call(self, function: &str, argument: &str) -> Expr {
        Expr::Function(
            function.to_owned(),
            vec![
                self.identifier(),
                Expr::Value(Value::String(argument.to_owned())),
            ],
        )
    }

    /// `contains(field,'value')`
    #[must_use]
    pub fn contains(self, substring: &str) -> Expr {
        self.call("contains", substring)
    }

    #[must_use]
    pub fn startswith(self, prefix: &str) -> Expr {
        self.call("startswith", prefix)
    }

    #[must_use]
    pub fn endswith(self, suffix: &str) -> Expr {
        self.call("endswith", suffix)
    }
}
