//! Arena of every type declared by one API.
//!
//! Types are registered from configuration, then linked once by
//! [`TypeRegistry::configure`]: bases resolve to parent ids, parents learn their
//! children, and every field resolves its declared type name to a parser. After
//! that the registry is read-only.

use std::collections::HashMap;
use tracing::debug;

use crate::callable::Callable;
use crate::config::{ApiOptions, SchemaConfig};
use crate::container::{EntityContainer, EntitySet, Singleton};
use crate::edm::EdmType;
use crate::enum_type::EnumType;
use crate::error::SchemaError;
use crate::field::{Field, FieldParser, split_collection};
use crate::options::ParseContext;
use crate::parser::{AnyParser, Parser};
use crate::structured_type::{StructuredParser, StructuredType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuredId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Enum(EnumId),
    Structured(StructuredId),
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    options: ApiOptions,
    structured: Vec<StructuredType>,
    enums: Vec<EnumType>,
    callables: Vec<Callable>,
    containers: Vec<EntityContainer>,
    /// Qualified and alias-qualified names.
    index: HashMap<String, TypeRef>,
    /// Unqualified names, possibly declared in several namespaces.
    by_name: HashMap<String, Vec<TypeRef>>,
    configured: bool,
}

impl TypeRegistry {
    #[must_use]
    pub fn new(options: ApiOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Register and configure every schema in one step.
    ///
    /// # Errors
    /// Returns the first registration or configuration error.
    pub fn from_schemas(options: ApiOptions, schemas: &[SchemaConfig]) -> Result<Self, SchemaError> {
        let mut registry = Self::new(options);
        for schema in schemas {
            registry.register_schema(schema)?;
        }
        registry.configure()?;
        Ok(registry)
    }

    #[must_use]
    pub fn options(&self) -> &ApiOptions {
        &self.options
    }

    #[must_use]
    pub fn parse_context(&self) -> ParseContext<'_> {
        ParseContext::new(&self.options)
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Add a schema's types. Must happen before `configure`.
    ///
    /// # Errors
    /// Returns `SchemaError::DuplicateType` or `SchemaError::DuplicateField`.
    pub fn register_schema(&mut self, schema: &SchemaConfig) -> Result<(), SchemaError> {
        let namespace = schema.namespace.as_str();
        let alias = schema.alias.as_deref();

        for config in &schema.enums {
            let id = TypeRef::Enum(EnumId(self.enums.len()));
            self.insert_name(namespace, alias, &config.name, id)?;
            self.enums
                .push(EnumType::from_config(config, namespace, alias));
        }
        for config in &schema.entities {
            let ty = StructuredType::from_config(config, namespace, alias)?;
            let id = TypeRef::Structured(StructuredId(self.structured.len()));
            self.insert_name(namespace, alias, &config.name, id)?;
            self.structured.push(ty);
        }
        self.callables.extend(
            schema
                .callables
                .iter()
                .map(|c| Callable::from_config(c, namespace, alias)),
        );
        self.containers.extend(
            schema
                .containers
                .iter()
                .map(|c| EntityContainer::from_config(c, namespace)),
        );
        Ok(())
    }

    fn insert_name(
        &mut self,
        namespace: &str,
        alias: Option<&str>,
        name: &str,
        id: TypeRef,
    ) -> Result<(), SchemaError> {
        let qualified = format!("{namespace}.{name}");
        let aliased = alias
            .map(|alias| format!("{alias}.{name}"))
            .filter(|aliased| *aliased != qualified);
        for taken in std::iter::once(&qualified).chain(aliased.as_ref()) {
            if self.index.contains_key(taken) {
                return Err(SchemaError::DuplicateType(taken.clone()));
            }
        }
        if let Some(aliased) = aliased {
            self.index.insert(aliased, id);
        }
        self.index.insert(qualified, id);
        self.by_name.entry(name.to_owned()).or_default().push(id);
        Ok(())
    }

    /// Link the inheritance forest and resolve every field parser.
    ///
    /// Calling it again on a configured registry is a no-op, so an already
    /// linked base is never linked twice.
    ///
    /// # Errors
    /// Fails on unknown type names, bases that are not structured types and
    /// inheritance cycles.
    pub fn configure(&mut self) -> Result<(), SchemaError> {
        if self.configured {
            return Ok(());
        }
        self.link_bases()?;

        let mut field_parsers = Vec::with_capacity(self.structured.len());
        for ty in &self.structured {
            let resolved = ty
                .fields
                .iter()
                .map(|f| self.resolve_type_name(&f.type_name))
                .collect::<Result<Vec<_>, _>>()?;
            field_parsers.push(resolved);
        }
        let mut callable_parsers = Vec::with_capacity(self.callables.len());
        for callable in &self.callables {
            let params = callable
                .parameters
                .iter()
                .map(|f| self.resolve_type_name(&f.type_name))
                .collect::<Result<Vec<_>, _>>()?;
            let ret = callable
                .return_type
                .as_ref()
                .map(|r| self.resolve_type_name(&r.type_name))
                .transpose()?;
            callable_parsers.push((params, ret));
        }

        for (ty, parsers) in self.structured.iter_mut().zip(field_parsers) {
            for (field, parser) in ty.fields.iter_mut().zip(parsers) {
                field.parser = Some(parser);
            }
        }
        for (callable, (params, ret)) in self.callables.iter_mut().zip(callable_parsers) {
            for (field, parser) in callable.parameters.iter_mut().zip(params) {
                field.parser = Some(parser);
            }
            if let Some(r) = callable.return_type.as_mut() {
                r.parser = ret;
            }
        }
        self.configured = true;

        // Defaults are stored in native form, which needs the parsers bound above.
        let mut defaults = Vec::new();
        let ctx = ParseContext::new(&self.options);
        for (ti, ty) in self.structured.iter().enumerate() {
            for (fi, field) in ty.fields.iter().enumerate() {
                if let Some(default) = &field.default {
                    let parser = self.field_parser(field)?;
                    defaults.push((ti, fi, parser.deserialize(default, &ctx)?));
                }
            }
        }
        for (ti, fi, value) in defaults {
            if let Some(field) = self
                .structured
                .get_mut(ti)
                .and_then(|ty| ty.fields.get_mut(fi))
            {
                field.default = Some(value);
            }
        }

        debug!(
            structured = self.structured.len(),
            enums = self.enums.len(),
            callables = self.callables.len(),
            "type registry configured"
        );
        Ok(())
    }

    fn link_bases(&mut self) -> Result<(), SchemaError> {
        for idx in 0..self.structured.len() {
            let (base, linked) = {
                let ty = &self.structured[idx];
                (ty.base.clone(), ty.parent.is_some())
            };
            let Some(base) = base else { continue };
            if linked {
                continue;
            }
            let parent = match self.lookup(&base)? {
                TypeRef::Structured(id) => id,
                TypeRef::Enum(_) => return Err(SchemaError::NotStructured(base)),
            };
            self.structured[idx].parent = Some(parent);
            self.structured[parent.0].children.push(StructuredId(idx));
        }
        for idx in 0..self.structured.len() {
            let mut current = self.structured[idx].parent;
            let mut depth = 0;
            while let Some(id) = current {
                depth += 1;
                if id.0 == idx || depth > self.structured.len() {
                    return Err(SchemaError::InheritanceCycle(
                        self.structured[idx].qualified_name(),
                    ));
                }
                current = self.structured[id.0].parent;
            }
        }
        Ok(())
    }

    fn resolve_type_name(&self, type_name: &str) -> Result<FieldParser, SchemaError> {
        let (type_name, _) = split_collection(type_name);
        if type_name.starts_with("Edm.") {
            return EdmType::parse(type_name)
                .map(FieldParser::Edm)
                .ok_or_else(|| SchemaError::UnknownType(type_name.to_owned()));
        }
        Ok(match self.lookup(type_name)? {
            TypeRef::Enum(id) => FieldParser::Enum(id),
            TypeRef::Structured(id) => FieldParser::Structured(id),
        })
    }

    /// Resolve a type name: qualified or alias-qualified first, then unqualified.
    ///
    /// # Errors
    /// `SchemaError::UnknownType` when nothing matches, `SchemaError::AmbiguousType`
    /// when an unqualified name is declared in several namespaces.
    pub fn lookup(&self, type_name: &str) -> Result<TypeRef, SchemaError> {
        let type_name = type_name.trim_start_matches('#');
        if let Some(found) = self.index.get(type_name) {
            return Ok(*found);
        }
        match self.by_name.get(type_name).map(Vec::as_slice) {
            Some([only]) => Ok(*only),
            Some(many) if many.len() > 1 => Err(SchemaError::AmbiguousType {
                name: type_name.to_owned(),
                candidates: many.iter().map(|r| self.qualified_name_of(*r)).collect(),
            }),
            _ => Err(SchemaError::UnknownType(type_name.to_owned())),
        }
    }

    /// True when `type_name` is declared here under its qualified or alias name.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.index.contains_key(type_name.trim_start_matches('#'))
    }

    fn qualified_name_of(&self, id: TypeRef) -> String {
        match id {
            TypeRef::Enum(id) => self.enum_by_id(id).qualified_name(),
            TypeRef::Structured(id) => self.structured_type(id).qualified_name(),
        }
    }

    /// # Errors
    /// See [`TypeRegistry::lookup`]; unknown `Edm.*` names are also rejected.
    pub fn parser(&self, type_name: &str) -> Result<AnyParser<'_>, SchemaError> {
        self.resolve_type_name(type_name)
            .map(|p| self.resolve_parser(p))
    }

    #[must_use]
    pub fn find_parser(&self, type_name: &str) -> Option<AnyParser<'_>> {
        self.parser(type_name).ok()
    }

    /// # Errors
    /// `SchemaError::NotStructured` when the name resolves to an enum.
    pub fn structured(&self, type_name: &str) -> Result<StructuredParser<'_>, SchemaError> {
        match self.lookup(type_name)? {
            TypeRef::Structured(id) => Ok(self.structured_by_id(id)),
            TypeRef::Enum(_) => Err(SchemaError::NotStructured(type_name.to_owned())),
        }
    }

    /// # Errors
    /// `SchemaError::UnknownType` when the name is unknown or not an enum.
    pub fn enum_type(&self, type_name: &str) -> Result<&EnumType, SchemaError> {
        match self.lookup(type_name)? {
            TypeRef::Enum(id) => Ok(self.enum_by_id(id)),
            TypeRef::Structured(_) => Err(SchemaError::UnknownType(type_name.to_owned())),
        }
    }

    #[must_use]
    pub fn structured_by_id(&self, id: StructuredId) -> StructuredParser<'_> {
        StructuredParser::new(self, id)
    }

    #[must_use]
    pub fn structured_type(&self, id: StructuredId) -> &StructuredType {
        &self.structured[id.0]
    }

    #[must_use]
    pub fn enum_by_id(&self, id: EnumId) -> &EnumType {
        &self.enums[id.0]
    }

    pub fn structured_types(&self) -> impl Iterator<Item = StructuredParser<'_>> {
        (0..self.structured.len()).map(|i| StructuredParser::new(self, StructuredId(i)))
    }

    pub fn enum_types(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.iter()
    }

    #[must_use]
    pub fn callables(&self) -> &[Callable] {
        &self.callables
    }

    /// Find a callable by qualified, alias-qualified or bare name.
    ///
    /// # Errors
    /// `SchemaError::UnknownType` when nothing matches, `SchemaError::AmbiguousType`
    /// for overloads or same-named callables in several namespaces.
    pub fn callable(&self, name: &str) -> Result<&Callable, SchemaError> {
        self.callable_for(name, None)
    }

    /// Like [`TypeRegistry::callable`], with bound overloads narrowed to the
    /// one whose binding parameter is closest to `binding_type`: an exact
    /// match first, then the nearest ancestor.
    ///
    /// # Errors
    /// As for [`TypeRegistry::callable`] when the overloads stay ambiguous.
    pub fn callable_for(
        &self,
        name: &str,
        binding_type: Option<&str>,
    ) -> Result<&Callable, SchemaError> {
        let mut matches: Vec<&Callable> = self
            .callables
            .iter()
            .filter(|c| c.is_type_of(name) || c.name == name)
            .collect();
        if let Some(binding_type) = binding_type
            && matches.len() > 1
        {
            let distances: Vec<Option<usize>> = matches
                .iter()
                .map(|c| self.binding_distance(c, binding_type))
                .collect();
            if let Some(nearest) = distances.iter().flatten().min().copied() {
                matches = matches
                    .into_iter()
                    .zip(distances)
                    .filter_map(|(c, d)| (d == Some(nearest)).then_some(c))
                    .collect();
            }
        }
        match matches.as_slice() {
            [only] => Ok(only),
            [] => Err(SchemaError::UnknownType(name.to_owned())),
            many => Err(SchemaError::AmbiguousType {
                name: name.to_owned(),
                candidates: many.iter().map(|c| c.qualified_name()).collect(),
            }),
        }
    }

    /// Inheritance steps from `type_name` up to the binding parameter's type.
    fn binding_distance(&self, callable: &Callable, type_name: &str) -> Option<usize> {
        let declared = split_collection(&callable.binding_parameter()?.type_name).0;
        let addressed = split_collection(type_name).0;
        match (self.lookup(declared).ok()?, self.lookup(addressed).ok()?) {
            (TypeRef::Structured(declared), TypeRef::Structured(addressed)) => {
                let mut current = Some(addressed);
                let mut distance = 0;
                while let Some(id) = current {
                    if id == declared {
                        return Some(distance);
                    }
                    distance += 1;
                    current = self.structured_type(id).parent;
                }
                None
            }
            (declared, addressed) => (declared == addressed).then_some(0),
        }
    }

    #[must_use]
    pub fn containers(&self) -> &[EntityContainer] {
        &self.containers
    }

    #[must_use]
    pub fn entity_set(&self, name: &str) -> Option<&EntitySet> {
        self.containers
            .iter()
            .flat_map(|c| c.entity_sets.iter())
            .find(|s| s.name == name)
    }

    #[must_use]
    pub fn singleton(&self, name: &str) -> Option<&Singleton> {
        self.containers
            .iter()
            .flat_map(|c| c.singletons.iter())
            .find(|s| s.name == name)
    }

    /// The entity set whose entity type is `type_name`.
    #[must_use]
    pub fn entity_set_for_type(&self, type_name: &str) -> Option<&EntitySet> {
        let target = self.lookup(type_name).ok()?;
        self.containers
            .iter()
            .flat_map(|c| c.entity_sets.iter())
            .find(|s| self.lookup(&s.entity_type).ok() == Some(target))
    }

    /// # Errors
    /// `SchemaError::NotConfigured` when called before `configure`.
    pub fn field_parser(&self, field: &Field) -> Result<AnyParser<'_>, SchemaError> {
        field
            .parser
            .map(|p| self.resolve_parser(p))
            .ok_or_else(|| SchemaError::NotConfigured(field.name.clone()))
    }

    #[must_use]
    pub fn resolve_parser(&self, parser: FieldParser) -> AnyParser<'_> {
        match parser {
            FieldParser::Edm(edm) => AnyParser::Edm(edm),
            FieldParser::Enum(id) => AnyParser::Enum(self.enum_by_id(id)),
            FieldParser::Structured(id) => AnyParser::Structured(self.structured_by_id(id)),
        }
    }
}
