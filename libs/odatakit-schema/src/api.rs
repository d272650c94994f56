//! APIs and the settings object that looks types up across them.
//!
//! `Settings` is built once at startup and shared by reference (usually behind
//! an `Arc`) with every component that needs type lookup.

use std::sync::Arc;
use tracing::debug;

use crate::callable::Callable;
use crate::config::{ApiConfig, ApiOptions, SettingsConfig};
use crate::container::EntitySet;
use crate::enum_type::EnumType;
use crate::error::SchemaError;
use crate::parser::AnyParser;
use crate::registry::TypeRegistry;
use crate::structured_type::StructuredParser;

/// One configured OData service.
#[derive(Debug)]
pub struct Api {
    name: Option<String>,
    service_root_url: String,
    default: bool,
    registry: TypeRegistry,
}

impl Api {
    /// Build and configure the API's type registry.
    ///
    /// # Errors
    /// Returns the first registration or configuration error.
    pub fn from_config(config: &ApiConfig) -> Result<Self, SchemaError> {
        let registry = TypeRegistry::from_schemas(config.options.clone(), &config.schemas)?;
        let mut service_root_url = config.service_root_url.clone();
        if !service_root_url.ends_with('/') {
            service_root_url.push('/');
        }
        debug!(api = ?config.name, root = %service_root_url, "api configured");
        Ok(Self {
            name: config.name.clone(),
            service_root_url,
            default: config.default,
            registry,
        })
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Always ends with `/`.
    #[must_use]
    pub fn service_root_url(&self) -> &str {
        &self.service_root_url
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.default
    }

    #[must_use]
    pub fn options(&self) -> &ApiOptions {
        self.registry.options()
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// True when a type or callable with this qualified name is declared here.
    #[must_use]
    pub fn declares(&self, type_name: &str) -> bool {
        self.registry.contains(type_name)
            || self
                .registry
                .callables()
                .iter()
                .any(|c| c.is_type_of(type_name))
    }

    fn label(&self) -> &str {
        self.name().unwrap_or(&self.service_root_url)
    }
}

/// Every configured API.
///
/// With several APIs each must be named and at most one may be the default;
/// when none is marked, the first one is.
#[derive(Debug, Clone)]
pub struct Settings {
    apis: Vec<Arc<Api>>,
    default_index: usize,
}

impl Settings {
    /// # Errors
    /// `SchemaError::NoApis`, `SchemaError::UnnamedApis` or
    /// `SchemaError::MultipleDefaultApis` when the rules above are broken, or
    /// any error from configuring an API.
    pub fn new(configs: &[ApiConfig]) -> Result<Self, SchemaError> {
        if configs.is_empty() {
            return Err(SchemaError::NoApis);
        }
        if configs.len() > 1 && configs.iter().any(|c| c.name.is_none()) {
            return Err(SchemaError::UnnamedApis);
        }
        let defaults: Vec<usize> = configs
            .iter()
            .enumerate()
            .filter(|(_, c)| c.default)
            .map(|(i, _)| i)
            .collect();
        if defaults.len() > 1 {
            return Err(SchemaError::MultipleDefaultApis);
        }
        let apis = configs
            .iter()
            .map(|c| Api::from_config(c).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            apis,
            default_index: defaults.first().copied().unwrap_or(0),
        })
    }

    /// # Errors
    /// See [`Settings::new`].
    pub fn from_config(config: &SettingsConfig) -> Result<Self, SchemaError> {
        Self::new(&config.apis)
    }

    #[must_use]
    pub fn apis(&self) -> &[Arc<Api>] {
        &self.apis
    }

    #[must_use]
    pub fn default_api(&self) -> &Arc<Api> {
        &self.apis[self.default_index]
    }

    /// # Errors
    /// `SchemaError::ApiNotFound` when no API has that name.
    pub fn api_by_name(&self, name: &str) -> Result<&Arc<Api>, SchemaError> {
        self.apis
            .iter()
            .find(|a| a.name() == Some(name))
            .ok_or_else(|| SchemaError::ApiNotFound(name.to_owned()))
    }

    /// The API declaring the qualified (or alias-qualified) `type_name`.
    ///
    /// # Errors
    /// `SchemaError::ApiNotFound` without a match, `SchemaError::AmbiguousType`
    /// when several APIs declare it.
    pub fn api_for_type(&self, type_name: &str) -> Result<&Arc<Api>, SchemaError> {
        let found: Vec<&Arc<Api>> = self
            .apis
            .iter()
            .filter(|api| api.declares(type_name))
            .collect();
        match found.as_slice() {
            [only] => Ok(*only),
            [] => Err(SchemaError::ApiNotFound(type_name.to_owned())),
            many => Err(SchemaError::AmbiguousType {
                name: type_name.to_owned(),
                candidates: many.iter().map(|a| a.label().to_owned()).collect(),
            }),
        }
    }

    /// The first API declaring any of `types`.
    #[must_use]
    pub fn find_for_types(&self, types: &[&str]) -> Option<&Arc<Api>> {
        self.apis
            .iter()
            .find(|api| types.iter().any(|t| api.registry.contains(t)))
    }

    /// # Errors
    /// Not found or ambiguous, as for [`Settings::api_for_type`].
    pub fn enum_type_for_type(&self, type_name: &str) -> Result<&EnumType, SchemaError> {
        self.single(type_name, |api| {
            api.registry
                .contains(type_name)
                .then(|| api.registry.enum_type(type_name).ok())
                .flatten()
        })
    }

    /// # Errors
    /// Not found or ambiguous, as for [`Settings::api_for_type`].
    pub fn structured_type_for_type(
        &self,
        type_name: &str,
    ) -> Result<StructuredParser<'_>, SchemaError> {
        self.single(type_name, |api| {
            api.registry
                .contains(type_name)
                .then(|| api.registry.structured(type_name).ok())
                .flatten()
        })
    }

    /// # Errors
    /// Not found or ambiguous, as for [`Settings::api_for_type`].
    pub fn callable_for_type(&self, type_name: &str) -> Result<&Callable, SchemaError> {
        self.single(type_name, |api| {
            api.registry
                .callables()
                .iter()
                .find(|c| c.is_type_of(type_name))
        })
    }

    /// # Errors
    /// Not found or ambiguous, as for [`Settings::api_for_type`].
    pub fn entity_set_for_type(&self, type_name: &str) -> Result<&EntitySet, SchemaError> {
        self.single(type_name, |api| {
            api.registry
                .contains(type_name)
                .then(|| api.registry.entity_set_for_type(type_name))
                .flatten()
        })
    }

    /// Parser for a qualified type name, `Edm.*` included.
    #[must_use]
    pub fn parser_for_type(&self, type_name: &str) -> Option<AnyParser<'_>> {
        if type_name.starts_with("Edm.") {
            return self.default_api().registry.find_parser(type_name);
        }
        self.apis
            .iter()
            .filter(|api| api.registry.contains(type_name))
            .find_map(|api| api.registry.find_parser(type_name))
    }

    /// # Errors
    /// Not found or ambiguous across all APIs and namespaces.
    pub fn enum_type_by_name(&self, name: &str) -> Result<&EnumType, SchemaError> {
        self.single_by_name(name, |api| {
            api.registry.enum_types().filter(|e| e.name == name).collect()
        })
    }

    /// # Errors
    /// Not found or ambiguous across all APIs and namespaces.
    pub fn structured_type_by_name(&self, name: &str) -> Result<StructuredParser<'_>, SchemaError> {
        self.single_by_name(name, |api| {
            api.registry
                .structured_types()
                .filter(|s| s.name() == name)
                .collect()
        })
    }

    /// # Errors
    /// Not found or ambiguous across all APIs and namespaces.
    pub fn callable_by_name(&self, name: &str) -> Result<&Callable, SchemaError> {
        self.single_by_name(name, |api| {
            api.registry
                .callables()
                .iter()
                .filter(|c| c.name == name)
                .collect()
        })
    }

    /// # Errors
    /// Not found or ambiguous across all APIs.
    pub fn entity_set_by_name(&self, name: &str) -> Result<&EntitySet, SchemaError> {
        self.single_by_name(name, |api| api.registry.entity_set(name).into_iter().collect())
    }

    /// Exactly one API must yield a match.
    fn single<'s, T, F>(&'s self, type_name: &str, find: F) -> Result<T, SchemaError>
    where
        F: Fn(&'s Api) -> Option<T>,
        T: Named,
    {
        let mut found: Vec<T> = self.apis.iter().filter_map(|a| find(a.as_ref())).collect();
        match found.len() {
            0 => Err(SchemaError::UnknownType(type_name.to_owned())),
            1 => found
                .pop()
                .ok_or_else(|| SchemaError::UnknownType(type_name.to_owned())),
            _ => Err(SchemaError::AmbiguousType {
                name: type_name.to_owned(),
                candidates: found.iter().map(Named::describe).collect(),
            }),
        }
    }

    fn single_by_name<'s, T, F>(&'s self, name: &str, find: F) -> Result<T, SchemaError>
    where
        F: Fn(&'s Api) -> Vec<T>,
        T: Named,
    {
        let mut found: Vec<T> = self.apis.iter().flat_map(|a| find(a.as_ref())).collect();
        match found.len() {
            0 => Err(SchemaError::UnknownType(name.to_owned())),
            1 => found
                .pop()
                .ok_or_else(|| SchemaError::UnknownType(name.to_owned())),
            _ => Err(SchemaError::AmbiguousType {
                name: name.to_owned(),
                candidates: found.iter().map(Named::describe).collect(),
            }),
        }
    }
}

/// Anything a lookup can return, described for ambiguity errors.
trait Named {
    fn describe(&self) -> String;
}

impl Named for &EnumType {
    fn describe(&self) -> String {
        self.qualified_name()
    }
}

impl Named for StructuredParser<'_> {
    fn describe(&self) -> String {
        self.qualified_name()
    }
}

impl Named for &Callable {
    fn describe(&self) -> String {
        self.qualified_name()
    }
}

impl Named for &EntitySet {
    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.entity_type)
    }
}
