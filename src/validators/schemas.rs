//! Compiled schema model
//!
//! [`SchemaModel`] is the immutable result of compiling an XSD document.
//! Components live in arenas and refer to each other by index, so a type that
//! (indirectly) contains itself is an ordinary graph edge. The model is
//! `Send + Sync` and is meant to be shared as `Arc<SchemaModel>`.

use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use super::attributes::AttributeDeclaration;
use super::builtins::{XSD_ANY_SIMPLE_TYPE, XSD_ANY_TYPE, BUILTIN_TYPES};
use super::complex_types::{ComplexType, ContentType, TypeDefinition, TypeId};
use super::document_validation::{validate_document, ValidationOptions};
use super::elements::{ElementDeclaration, ElementId};
use super::exceptions::ValidationError;
use super::groups::{Compositor, GroupId, ModelGroup};
use super::parsing::SchemaCompiler;
use super::particles::{Occurs, Particle, Term};
use super::simple_types::{SimpleType, Variety};
use super::wildcards::Wildcard;

use crate::documents::Document;
use crate::error::CompileError;
use crate::loaders::Loader;
use crate::namespaces::{NamespaceContext, QName, XSD_NAMESPACE};

/// An immutable, fully resolved schema
#[derive(Debug, Clone)]
pub struct SchemaModel {
    /// Target namespace of the main schema document
    pub(crate) target_namespace: Option<String>,
    /// Namespace bindings of the main schema root
    pub(crate) namespaces: NamespaceContext,
    /// File the schema was loaded from, if any
    pub(crate) source: Option<PathBuf>,
    pub(crate) types: Vec<TypeDefinition>,
    pub(crate) elements: Vec<ElementDeclaration>,
    pub(crate) groups: Vec<ModelGroup>,
    /// Named types, built-ins included
    pub(crate) type_names: IndexMap<QName, TypeId>,
    pub(crate) global_elements: IndexMap<QName, ElementId>,
    pub(crate) global_attributes: IndexMap<QName, AttributeDeclaration>,
    pub(crate) named_groups: IndexMap<QName, GroupId>,
    /// Transitive substitution group members per head
    pub(crate) substitutes: HashMap<ElementId, Vec<ElementId>>,
    /// Namespaces with at least one user-declared element, attribute or type
    pub(crate) covered_namespaces: BTreeSet<Option<String>>,
}

impl SchemaModel {
    /// Compile a schema from its source bytes.
    ///
    /// `xs:include`/`xs:import` with a `schemaLocation` cannot be resolved
    /// without a base path and fail with [`CompileError::UnresolvedLocation`].
    pub fn compile(source: &[u8]) -> Result<Self, CompileError> {
        SchemaCompiler::new(Loader::new()).compile_bytes(source)
    }

    /// Compile a schema file, following includes and imports
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        Self::from_file_with_loader(path, Loader::new())
    }

    /// Compile a schema file with a configured loader
    pub fn from_file_with_loader(path: impl AsRef<Path>, loader: Loader) -> Result<Self, CompileError> {
        SchemaCompiler::new(loader).compile_file(path.as_ref())
    }

    /// An empty model holding only the built-in types
    pub(crate) fn with_builtins(target_namespace: Option<String>, namespaces: NamespaceContext) -> Self {
        let mut model = Self {
            target_namespace,
            namespaces,
            source: None,
            types: Vec::new(),
            elements: Vec::new(),
            groups: Vec::new(),
            type_names: IndexMap::new(),
            global_elements: IndexMap::new(),
            global_attributes: IndexMap::new(),
            named_groups: IndexMap::new(),
            substitutes: HashMap::new(),
            covered_namespaces: BTreeSet::new(),
        };

        // xs:anyType: mixed content of lax wildcards, any attributes
        let any_group = model.add_group(ModelGroup::new(
            Compositor::Sequence,
            vec![Particle::new(Term::Any(Wildcard::any_lax()), Occurs::zero_or_more())],
        ));
        let mut any_type = ComplexType::empty(Some(QName::xsd(XSD_ANY_TYPE)), None);
        any_type.content = ContentType::Mixed(Particle::new(Term::Group(any_group), Occurs::once()));
        any_type.attribute_wildcard = Some(Wildcard::any_lax());
        let any_type_id = model.add_type(TypeDefinition::Complex(any_type));
        model.type_names.insert(QName::xsd(XSD_ANY_TYPE), any_type_id);

        // Two passes: built-in bases and list items are referenced by name
        for builtin in BUILTIN_TYPES.iter() {
            let id = model.add_type(TypeDefinition::Simple(SimpleType::builtin(
                builtin,
                Some(any_type_id),
                Variety::Atomic,
            )));
            model.type_names.insert(QName::xsd(builtin.name), id);
        }
        for builtin in BUILTIN_TYPES.iter() {
            let base = builtin
                .base_type
                .and_then(|name| model.type_names.get(&QName::xsd(name)).copied())
                .unwrap_or(any_type_id);
            let item = builtin
                .item_type
                .and_then(|name| model.type_names.get(&QName::xsd(name)).copied());
            if let Some(id) = model.type_names.get(&QName::xsd(builtin.name)).copied() {
                if let TypeDefinition::Simple(simple) = &mut model.types[id.0] {
                    simple.base = Some(base);
                    if let Some(item) = item {
                        simple.variety = Variety::List(item);
                    }
                }
            }
        }

        model
    }

    // =========================================================================
    // Arena construction (compiler only)
    // =========================================================================

    pub(crate) fn add_type(&mut self, definition: TypeDefinition) -> TypeId {
        self.types.push(definition);
        TypeId(self.types.len() - 1)
    }

    pub(crate) fn add_element(&mut self, declaration: ElementDeclaration) -> ElementId {
        self.elements.push(declaration);
        ElementId(self.elements.len() - 1)
    }

    pub(crate) fn add_group(&mut self, group: ModelGroup) -> GroupId {
        self.groups.push(group);
        GroupId(self.groups.len() - 1)
    }

    pub(crate) fn type_mut(&mut self, id: TypeId) -> &mut TypeDefinition {
        &mut self.types[id.0]
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> &mut ElementDeclaration {
        &mut self.elements[id.0]
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut ModelGroup {
        &mut self.groups[id.0]
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Target namespace of the main schema document
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Namespace bindings of the schema root
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// File the schema was compiled from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Type definition by id
    pub fn type_definition(&self, id: TypeId) -> &TypeDefinition {
        &self.types[id.0]
    }

    /// Simple type by id, if the type is simple
    pub fn simple_type(&self, id: TypeId) -> Option<&SimpleType> {
        self.types.get(id.0).and_then(TypeDefinition::as_simple)
    }

    /// Complex type by id, if the type is complex
    pub fn complex_type(&self, id: TypeId) -> Option<&ComplexType> {
        self.types.get(id.0).and_then(TypeDefinition::as_complex)
    }

    /// Element declaration by id
    pub fn element(&self, id: ElementId) -> &ElementDeclaration {
        &self.elements[id.0]
    }

    /// Model group by id
    pub fn group(&self, id: GroupId) -> &ModelGroup {
        &self.groups[id.0]
    }

    /// Named type (user-defined or built-in) by qualified name
    pub fn get_type(&self, name: &QName) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Global element declaration by qualified name
    pub fn get_element(&self, name: &QName) -> Option<ElementId> {
        self.global_elements.get(name).copied()
    }

    /// Global attribute declaration by qualified name
    pub fn get_attribute(&self, name: &QName) -> Option<&AttributeDeclaration> {
        self.global_attributes.get(name)
    }

    /// Named model group by qualified name
    pub fn get_group(&self, name: &QName) -> Option<GroupId> {
        self.named_groups.get(name).copied()
    }

    /// Global element declarations in declaration order
    pub fn global_elements(&self) -> impl Iterator<Item = (&QName, &ElementDeclaration)> {
        self.global_elements
            .iter()
            .map(move |(name, id)| (name, &self.elements[id.0]))
    }

    /// User-defined global types in declaration order
    pub fn global_types(&self) -> impl Iterator<Item = (&QName, &TypeDefinition)> {
        self.type_names
            .iter()
            .filter(|(name, _)| !name.is_in(Some(XSD_NAMESPACE)))
            .map(move |(name, id)| (name, &self.types[id.0]))
    }

    /// Global attribute declarations in declaration order
    pub fn global_attributes(&self) -> impl Iterator<Item = (&QName, &AttributeDeclaration)> {
        self.global_attributes.iter()
    }

    /// The `xs:anyType` definition
    pub fn any_type(&self) -> TypeId {
        TypeId(0)
    }

    /// The `xs:anySimpleType` definition
    pub fn any_simple_type(&self) -> TypeId {
        self.get_type(&QName::xsd(XSD_ANY_SIMPLE_TYPE))
            .unwrap_or_else(|| self.any_type())
    }

    /// Elements that may substitute for `head`, transitively
    pub fn substitutes(&self, head: ElementId) -> &[ElementId] {
        self.substitutes.get(&head).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the schema declares any element, attribute or type in `namespace`
    pub fn covers_namespace(&self, namespace: Option<&str>) -> bool {
        self.covered_namespaces
            .contains(&namespace.map(String::from))
    }

    /// Whether `derived` is `base` or derives from it (by any method)
    pub fn is_derived_from(&self, derived: TypeId, base: TypeId) -> bool {
        if base == self.any_type() {
            return true;
        }
        let mut current = Some(derived);
        let mut steps = 0;
        while let Some(id) = current {
            if id == base {
                return true;
            }
            steps += 1;
            if steps > self.types.len() {
                return false;
            }
            current = self.types[id.0].base();
        }
        false
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate a parsed document with default options
    pub fn validate(&self, document: &Document) -> Vec<ValidationError> {
        validate_document(document, self, None, &ValidationOptions::default())
    }

    /// Validate a parsed document with explicit options
    pub fn validate_with(
        &self,
        document: &Document,
        root: Option<&QName>,
        options: &ValidationOptions,
    ) -> Vec<ValidationError> {
        validate_document(document, self, root, options)
    }

    /// Whether a parsed document conforms
    pub fn is_valid(&self, document: &Document) -> bool {
        self.validate(document).is_empty()
    }
}

impl fmt::Display for SchemaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schema(targetNamespace={}, elements={}, types={}, attributes={})",
            self.target_namespace().unwrap_or("<none>"),
            self.global_elements.len(),
            self.global_types().count(),
            self.global_attributes.len()
        )
    }
}
