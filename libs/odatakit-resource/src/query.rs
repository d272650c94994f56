//! Query options: the `$`-prefixed system options, parameter aliases and
//! custom parameters attached to a resource.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::ast::Expr;
use crate::literal::literal;
use crate::order::ODataOrderBy;

/// Value of `$filter`: either caller-written text or a typed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Raw(String),
    Expr(Expr),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Raw(text) => f.write_str(text),
            Filter::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

impl From<Expr> for Filter {
    fn from(expr: Expr) -> Self {
        Filter::Expr(expr)
    }
}

impl From<&str> for Filter {
    fn from(text: &str) -> Self {
        Filter::Raw(text.to_owned())
    }
}

impl From<String> for Filter {
    fn from(text: String) -> Self {
        Filter::Raw(text)
    }
}

/// One `$expand` item with its nested options: `Friends($select=Name;$top=5)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    pub path: String,
    pub options: QueryOptions,
}

impl Expand {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: QueryOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for Expand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        let nested = self.options.params();
        if nested.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, (name, value)) in nested.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

/// Canonical query option names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOptionName {
    Select,
    Expand,
    Filter,
    Search,
    OrderBy,
    Apply,
    Top,
    Skip,
    SkipToken,
    Count,
    Format,
    Alias,
    Custom,
}

impl QueryOptionName {
    /// Wire name; aliases and custom parameters carry their own.
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        Some(match self {
            Self::Select => "$select",
            Self::Expand => "$expand",
            Self::Filter => "$filter",
            Self::Search => "$search",
            Self::OrderBy => "$orderby",
            Self::Apply => "$apply",
            Self::Top => "$top",
            Self::Skip => "$skip",
            Self::SkipToken => "$skiptoken",
            Self::Count => "$count",
            Self::Format => "$format",
            Self::Alias | Self::Custom => return None,
        })
    }

    /// Options that change the shape of a result set invalidate paging state.
    #[must_use]
    pub fn resets_paging(self) -> bool {
        matches!(
            self,
            Self::Filter | Self::Search | Self::OrderBy | Self::Apply | Self::Alias
        )
    }
}

/// A single option assignment; `None` removes the option.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOption {
    Select(Option<Vec<String>>),
    Expand(Option<Vec<Expand>>),
    Filter(Option<Filter>),
    Search(Option<String>),
    OrderBy(Option<ODataOrderBy>),
    Apply(Option<String>),
    Top(Option<u64>),
    Skip(Option<u64>),
    SkipToken(Option<String>),
    Count(Option<bool>),
    Format(Option<String>),
    Alias(String, Option<Value>),
    Custom(String, Option<String>),
}

impl QueryOption {
    #[must_use]
    pub fn name(&self) -> QueryOptionName {
        match self {
            Self::Select(_) => QueryOptionName::Select,
            Self::Expand(_) => QueryOptionName::Expand,
            Self::Filter(_) => QueryOptionName::Filter,
            Self::Search(_) => QueryOptionName::Search,
            Self::OrderBy(_) => QueryOptionName::OrderBy,
            Self::Apply(_) => QueryOptionName::Apply,
            Self::Top(_) => QueryOptionName::Top,
            Self::Skip(_) => QueryOptionName::Skip,
            Self::SkipToken(_) => QueryOptionName::SkipToken,
            Self::Count(_) => QueryOptionName::Count,
            Self::Format(_) => QueryOptionName::Format,
            Self::Alias(..) => QueryOptionName::Alias,
            Self::Custom(..) => QueryOptionName::Custom,
        }
    }
}

/// Query options of a resource, stored by canonical name.
///
/// Cloning is deep: a cloned set never shares state with its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub select: Vec<String>,
    pub expand: Vec<Expand>,
    pub filter: Option<Filter>,
    pub search: Option<String>,
    pub order_by: ODataOrderBy,
    pub apply: Option<String>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub skiptoken: Option<String>,
    pub count: Option<bool>,
    pub format: Option<String>,
    /// Parameter aliases, rendered `@name=literal`.
    pub aliases: BTreeMap<String, String>,
    /// Caller-supplied parameters, rendered verbatim.
    pub custom: BTreeMap<String, String>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params().is_empty()
    }

    pub fn set(&mut self, option: QueryOption) {
        match option {
            QueryOption::Select(v) => self.select = v.unwrap_or_default(),
            QueryOption::Expand(v) => self.expand = v.unwrap_or_default(),
            QueryOption::Filter(v) => self.filter = v,
            QueryOption::Search(v) => self.search = v,
            QueryOption::OrderBy(v) => self.order_by = v.unwrap_or_default(),
            QueryOption::Apply(v) => self.apply = v,
            QueryOption::Top(v) => self.top = v,
            QueryOption::Skip(v) => self.skip = v,
            QueryOption::SkipToken(v) => self.skiptoken = v,
            QueryOption::Count(v) => self.count = v,
            QueryOption::Format(v) => self.format = v,
            QueryOption::Alias(name, v) => {
                let name = name.trim_start_matches('@').to_owned();
                match v {
                    Some(value) => {
                        self.aliases.insert(name, literal(&value, None));
                    }
                    None => {
                        self.aliases.remove(&name);
                    }
                }
            }
            QueryOption::Custom(name, v) => match v {
                Some(value) => {
                    self.custom.insert(name, value);
                }
                None => {
                    self.custom.remove(&name);
                }
            },
        }
    }

    #[must_use]
    pub fn with(mut self, option: QueryOption) -> Self {
        self.set(option);
        self
    }

    /// Store an arbitrary parameter verbatim.
    pub fn custom(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.custom.insert(name.into(), value.into());
    }

    /// Parameters in wire order, values not yet URL-encoded.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut push = |name: QueryOptionName, value: String| {
            if let Some(name) = name.as_str() {
                out.push((name.to_owned(), value));
            }
        };
        if !self.select.is_empty() {
            push(QueryOptionName::Select, self.select.join(","));
        }
        if !self.expand.is_empty() {
            let items: Vec<String> = self.expand.iter().map(ToString::to_string).collect();
            push(QueryOptionName::Expand, items.join(","));
        }
        if let Some(filter) = &self.filter {
            push(QueryOptionName::Filter, filter.to_string());
        }
        if let Some(search) = &self.search {
            push(QueryOptionName::Search, search.clone());
        }
        if !self.order_by.is_empty() {
            push(QueryOptionName::OrderBy, self.order_by.to_string());
        }
        if let Some(apply) = &self.apply {
            push(QueryOptionName::Apply, apply.clone());
        }
        if let Some(top) = self.top {
            push(QueryOptionName::Top, top.to_string());
        }
        if let Some(skip) = self.skip {
            push(QueryOptionName::Skip, skip.to_string());
        }
        if let Some(token) = &self.skiptoken {
            push(QueryOptionName::SkipToken, token.clone());
        }
        if let Some(count) = self.count {
            push(QueryOptionName::Count, count.to_string());
        }
        if let Some(format) = &self.format {
            push(QueryOptionName::Format, format.clone());
        }
        out.extend(self.aliases.iter().map(|(k, v)| (format!("@{k}"), v.clone())));
        out.extend(self.custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// `name=value` pairs joined with `&`, values URL-encoded.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.params()
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::order::OrderKey;
    use serde_json::json;

    #[test]
    fn test_params_order_and_removal() {
        let mut q = QueryOptions::new()
            .with(QueryOption::Top(Some(5)))
            .with(QueryOption::Select(Some(vec!["Name".to_owned(), "Age".to_owned()])))
            .with(QueryOption::OrderBy(Some(ODataOrderBy(vec![OrderKey::desc("Age")]))))
            .with(QueryOption::Alias("@p1".to_owned(), Some(json!("x"))));
        q.custom("sap-client", "100");

        let names: Vec<String> = q.params().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["$select", "$orderby", "$top", "@p1", "sap-client"]);
        assert_eq!(q.params()[3].1, "'x'");

        q.set(QueryOption::Top(None));
        q.set(QueryOption::Alias("p1".to_owned(), None));
        assert!(q.top.is_none());
        assert!(q.aliases.is_empty());
    }

    #[test]
    fn test_nested_expand() {
        let q = QueryOptions::new().with(QueryOption::Expand(Some(vec![
            Expand::new("Friends").with_options(
                QueryOptions::new()
                    .with(QueryOption::Select(Some(vec!["UserName".to_owned()])))
                    .with(QueryOption::Top(Some(5))),
            ),
            Expand::new("Trips"),
        ])));
        assert_eq!(
            q.params(),
            vec![(
                "$expand".to_owned(),
                "Friends($select=UserName;$top=5),Trips".to_owned()
            )]
        );
    }

    #[test]
    fn test_query_string_encodes_values() {
        let q = QueryOptions::new().with(QueryOption::Filter(Some("Name eq 'a b'".into())));
        assert_eq!(q.query_string(), "$filter=Name%20eq%20%27a%20b%27");
    }

    #[test]
    fn test_resets_paging() {
        assert!(QueryOptionName::Filter.resets_paging());
        assert!(QueryOptionName::Alias.resets_paging());
        assert!(!QueryOptionName::Top.resets_paging());
        assert!(!QueryOptionName::Expand.resets_paging());
    }
}
