//! XSD Document Parsing
//!
//! Compiles schema documents into a [`SchemaModel`].
//!
//! Compilation runs in three phases:
//! 1. load the main document and, when compiling from a file, every document
//!    it includes or imports (a worklist, not recursion);
//! 2. register every global component under its qualified name, allocating
//!    its arena slot up front so that references resolve by index;
//! 3. build each component on demand, tracking a per-component state so
//!    that derivation and attribute group cycles are detected; model group
//!    cycles are checked on the finished graph.

use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::attributes::{merge_attribute_uses, AttributeDeclaration, AttributeUse, AttributeUses, Form};
use super::builtins::{
    get_builtin_type, XsdValue, XSD_ANY_SIMPLE_TYPE, XSD_ENUMERATION, XSD_FRACTION_DIGITS,
    XSD_LENGTH, XSD_MAX_EXCLUSIVE, XSD_MAX_INCLUSIVE, XSD_MAX_LENGTH, XSD_MIN_EXCLUSIVE,
    XSD_MIN_INCLUSIVE, XSD_MIN_LENGTH, XSD_PATTERN, XSD_TOTAL_DIGITS, XSD_WHITE_SPACE,
};
use super::complex_types::{ComplexType, ContentType, DerivationMethod, TypeDefinition, TypeId};
use super::elements::{ElementDeclaration, ElementId, Scope, ValueConstraint};
use super::facets::{BoundFacet, EnumerationFacet, FacetSet, PatternFacet, WhiteSpace};
use super::groups::{Compositor, GroupId, ModelGroup};
use super::particles::{Occurs, Particle, Term};
use super::schemas::SchemaModel;
use super::simple_types::{SimpleType, Variety};
use super::wildcards::{NamespaceConstraint, ProcessContents, Wildcard};

use crate::documents::{Document, Element};
use crate::error::CompileError;
use crate::loaders::Loader;
use crate::names::{is_valid_ncname, is_valid_qname, split_qname};
use crate::namespaces::{NamespaceContext, QName, XML_NAMESPACE, XSD_NAMESPACE};

type CompileResult<T> = Result<T, CompileError>;

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const NOTATION: &str = "notation";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const FORM: &str = "form";
    pub const NILLABLE: &str = "nillable";
    pub const ABSTRACT: &str = "abstract";
    pub const MIXED: &str = "mixed";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const USE: &str = "use";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const NAMESPACE: &str = "namespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const PROCESS_CONTENTS: &str = "processContents";
}

use xsd_attrs::*;
use xsd_elements::*;

const FACET_NAMES: &[&str] = &[
    XSD_LENGTH,
    XSD_MIN_LENGTH,
    XSD_MAX_LENGTH,
    XSD_PATTERN,
    XSD_ENUMERATION,
    XSD_WHITE_SPACE,
    XSD_MAX_INCLUSIVE,
    XSD_MAX_EXCLUSIVE,
    XSD_MIN_INCLUSIVE,
    XSD_MIN_EXCLUSIVE,
    XSD_TOTAL_DIGITS,
    XSD_FRACTION_DIGITS,
];

/// A loaded schema document
struct SchemaDocument {
    root: Element,
    target_namespace: Option<String>,
    element_form: Form,
    attribute_form: Form,
    /// Included without a targetNamespace; unqualified references adopt the includer's
    chameleon: bool,
}

/// How a document was reached
#[derive(Debug, Clone)]
enum LoadKind {
    Include { namespace: Option<String> },
    Import { namespace: Option<String> },
}

/// Schema document waiting to be loaded
struct PendingLoad {
    path: PathBuf,
    kind: LoadKind,
    depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Pending,
    Building,
    Done,
}

/// A registered global component and its source
struct Entry {
    doc: usize,
    node: Element,
    name: QName,
    state: BuildState,
}

impl Entry {
    fn new(doc: usize, node: Element, name: QName) -> Self {
        Self {
            doc,
            node,
            name,
            state: BuildState::Pending,
        }
    }
}

/// Compiles XSD documents into a [`SchemaModel`]
pub struct SchemaCompiler {
    loader: Loader,
    documents: Vec<SchemaDocument>,
    model: SchemaModel,
    types: IndexMap<TypeId, Entry>,
    elements: IndexMap<ElementId, Entry>,
    groups: IndexMap<GroupId, Entry>,
    attributes: IndexMap<QName, Entry>,
    attribute_groups: IndexMap<QName, Entry>,
    attribute_group_cache: HashMap<QName, (AttributeUses, Option<Wildcard>)>,
}

impl SchemaCompiler {
    /// Create a compiler that loads included documents with `loader`
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            documents: Vec::new(),
            model: SchemaModel::with_builtins(None, NamespaceContext::new()),
            types: IndexMap::new(),
            elements: IndexMap::new(),
            groups: IndexMap::new(),
            attributes: IndexMap::new(),
            attribute_groups: IndexMap::new(),
            attribute_group_cache: HashMap::new(),
        }
    }

    /// Compile schema source bytes
    pub fn compile_bytes(mut self, source: &[u8]) -> CompileResult<SchemaModel> {
        let document = Document::parse_with_limits(source, self.loader.limits())?;
        self.load(document.root, None)?;
        self.finish()
    }

    /// Compile a schema file and the documents it includes or imports
    pub fn compile_file(mut self, path: &Path) -> CompileResult<SchemaModel> {
        let bytes = self.loader.load_bytes(path)?;
        let document = Document::parse_with_limits(&bytes, self.loader.limits())?;
        self.model.source = Some(path.to_path_buf());
        self.load(document.root, Some(path.to_path_buf()))?;
        self.finish()
    }

    // =========================================================================
    // Phase 1: loading
    // =========================================================================

    fn load(&mut self, root: Element, path: Option<PathBuf>) -> CompileResult<()> {
        let mut visited = HashSet::new();
        if let Some(path) = &path {
            visited.insert(self.loader.canonical(path));
        }

        let mut queue: VecDeque<PendingLoad> = self.add_document(root, path.as_deref(), None, 0)?.into();

        while let Some(pending) = queue.pop_front() {
            let max_depth = self.loader.limits().max_schema_depth;
            if pending.depth > max_depth {
                return Err(CompileError::Invalid(format!(
                    "schema include/import nesting exceeds {} at '{}'",
                    max_depth,
                    pending.path.display()
                )));
            }
            if !visited.insert(self.loader.canonical(&pending.path)) {
                continue;
            }

            debug!(path = %pending.path.display(), kind = ?pending.kind, "loading schema document");
            let bytes = self.loader.load_bytes(&pending.path)?;
            let document = Document::parse_with_limits(&bytes, self.loader.limits())?;
            let loads = self.add_document(
                document.root,
                Some(&pending.path),
                Some(pending.kind),
                pending.depth,
            )?;
            queue.extend(loads);
        }
        Ok(())
    }

    fn add_document(
        &mut self,
        root: Element,
        path: Option<&Path>,
        kind: Option<LoadKind>,
        depth: usize,
    ) -> CompileResult<Vec<PendingLoad>> {
        if root.name != QName::xsd(SCHEMA) {
            return Err(CompileError::NotASchema(root.name.to_string()));
        }

        let declared = root.attribute_local(TARGET_NAMESPACE).map(String::from);
        if declared.as_deref() == Some("") {
            return Err(CompileError::Invalid(
                "targetNamespace must not be empty".to_string(),
            ));
        }

        let (target_namespace, chameleon) = match (&kind, declared) {
            (Some(LoadKind::Include { namespace }), None) => (namespace.clone(), namespace.is_some()),
            (Some(LoadKind::Include { namespace }), Some(tns)) => {
                if namespace.as_deref() != Some(tns.as_str()) {
                    return Err(CompileError::Invalid(format!(
                        "included schema has targetNamespace '{}' but the including schema has {:?}",
                        tns, namespace
                    )));
                }
                (Some(tns), false)
            }
            (Some(LoadKind::Import { namespace }), declared) => {
                if namespace.is_some() && *namespace != declared {
                    return Err(CompileError::Invalid(format!(
                        "imported schema has targetNamespace {:?}, expected {:?}",
                        declared, namespace
                    )));
                }
                (declared, false)
            }
            (None, declared) => (declared, false),
        };

        let element_form = form_attr(&root, ELEMENT_FORM_DEFAULT)?.unwrap_or_default();
        let attribute_form = form_attr(&root, ATTRIBUTE_FORM_DEFAULT)?.unwrap_or_default();

        let mut loads = Vec::new();
        for child in root.child_elements().filter(|c| is_xsd(c)) {
            match child.local_name() {
                INCLUDE => {
                    let location = required_attr(child, SCHEMA_LOCATION)?;
                    let base = path.ok_or_else(|| CompileError::UnresolvedLocation(location.to_string()))?;
                    loads.push(PendingLoad {
                        path: self.loader.resolve(base, location),
                        kind: LoadKind::Include {
                            namespace: target_namespace.clone(),
                        },
                        depth: depth + 1,
                    });
                }
                IMPORT => {
                    let namespace = child.attribute_local(NAMESPACE).map(String::from);
                    match child.attribute_local(SCHEMA_LOCATION) {
                        Some(location) => {
                            let base = path
                                .ok_or_else(|| CompileError::UnresolvedLocation(location.to_string()))?;
                            loads.push(PendingLoad {
                                path: self.loader.resolve(base, location),
                                kind: LoadKind::Import { namespace },
                                depth: depth + 1,
                            });
                        }
                        None => debug!(namespace = ?namespace, "import without schemaLocation"),
                    }
                }
                REDEFINE => {
                    return Err(CompileError::Invalid(
                        "xs:redefine is not supported".to_string(),
                    ))
                }
                _ => {}
            }
        }

        self.documents.push(SchemaDocument {
            root,
            target_namespace,
            element_form,
            attribute_form,
            chameleon,
        });
        Ok(loads)
    }

    // =========================================================================
    // Phase 2: registration
    // =========================================================================

    fn register_globals(&mut self) -> CompileResult<()> {
        let any_type = self.model.any_type();

        for doc in 0..self.documents.len() {
            let children: Vec<Element> = self.documents[doc].root.child_elements().cloned().collect();
            for child in children {
                if !is_xsd(&child) {
                    return Err(CompileError::Invalid(format!(
                        "unexpected element {} in xs:schema",
                        child.name
                    )));
                }
                match child.local_name() {
                    ELEMENT => {
                        let name = self.component_name(doc, &child)?;
                        if self.model.global_elements.contains_key(&name) {
                            return Err(CompileError::Duplicate { component: "element", name });
                        }
                        let id = self.model.add_element(ElementDeclaration::new(
                            name.clone(),
                            any_type,
                            Scope::Global,
                        ));
                        self.model.global_elements.insert(name.clone(), id);
                        self.elements.insert(id, Entry::new(doc, child, name));
                    }
                    COMPLEX_TYPE | SIMPLE_TYPE => {
                        let name = self.component_name(doc, &child)?;
                        if self.model.type_names.contains_key(&name) {
                            return Err(CompileError::Duplicate { component: "type", name });
                        }
                        let placeholder = ComplexType::empty(Some(name.clone()), Some(any_type));
                        let id = self.model.add_type(TypeDefinition::Complex(placeholder));
                        self.model.type_names.insert(name.clone(), id);
                        self.types.insert(id, Entry::new(doc, child, name));
                    }
                    ATTRIBUTE => {
                        let name = self.component_name(doc, &child)?;
                        if self.attributes.contains_key(&name) {
                            return Err(CompileError::Duplicate { component: "attribute", name });
                        }
                        self.attributes.insert(name.clone(), Entry::new(doc, child, name));
                    }
                    ATTRIBUTE_GROUP => {
                        let name = self.component_name(doc, &child)?;
                        if self.attribute_groups.contains_key(&name) {
                            return Err(CompileError::Duplicate {
                                component: "attributeGroup",
                                name,
                            });
                        }
                        self.attribute_groups.insert(name.clone(), Entry::new(doc, child, name));
                    }
                    GROUP => {
                        let name = self.component_name(doc, &child)?;
                        if self.model.named_groups.contains_key(&name) {
                            return Err(CompileError::Duplicate { component: "group", name });
                        }
                        let id = self.model.add_group(ModelGroup::empty().with_name(name.clone()));
                        self.model.named_groups.insert(name.clone(), id);
                        self.groups.insert(id, Entry::new(doc, child, name));
                    }
                    INCLUDE | IMPORT | ANNOTATION | NOTATION => {}
                    other => {
                        return Err(CompileError::Invalid(format!(
                            "unexpected <{}> in xs:schema",
                            other
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    fn predeclare_xml_attributes(&mut self) {
        for (local, type_name) in [("lang", "language"), ("base", "anyURI"), ("id", "ID")] {
            if let Some(type_id) = self.model.get_type(&QName::xsd(type_name)) {
                let name = QName::namespaced(XML_NAMESPACE, local);
                self.model
                    .global_attributes
                    .insert(name.clone(), AttributeDeclaration::new(name, type_id));
            }
        }

        let ncname = self.model.get_type(&QName::xsd("NCName"));
        let base = ncname.and_then(|id| self.model.simple_type(id)).cloned();
        if let (Some(ncname), Some(mut space)) = (ncname, base) {
            let literals = vec!["default".to_string(), "preserve".to_string()];
            space.name = None;
            space.base = Some(ncname);
            space.facets.enumeration = Some(EnumerationFacet {
                values: literals.iter().cloned().map(XsdValue::String).collect(),
                literals,
            });
            let type_id = self.model.add_type(TypeDefinition::Simple(space));
            let name = QName::namespaced(XML_NAMESPACE, "space");
            self.model
                .global_attributes
                .insert(name.clone(), AttributeDeclaration::new(name, type_id));
        }
    }

    // =========================================================================
    // Phase 3: building
    // =========================================================================

    fn finish(mut self) -> CompileResult<SchemaModel> {
        if let Some(main) = self.documents.first() {
            self.model.target_namespace = main.target_namespace.clone();
            self.model.namespaces = (*main.root.namespaces).clone();
        }

        self.predeclare_xml_attributes();
        self.register_globals()?;

        let type_ids: Vec<TypeId> = self.types.keys().copied().collect();
        for id in type_ids {
            self.ensure_type(id)?;
        }
        let attribute_groups: Vec<QName> = self.attribute_groups.keys().cloned().collect();
        for name in attribute_groups {
            self.ensure_attribute_group(&name)?;
        }
        let attributes: Vec<QName> = self.attributes.keys().cloned().collect();
        for name in attributes {
            self.ensure_attribute(&name)?;
        }
        let element_ids: Vec<ElementId> = self.elements.keys().copied().collect();
        for id in element_ids {
            self.ensure_element(id)?;
        }
        let group_ids: Vec<GroupId> = self.groups.keys().copied().collect();
        for id in group_ids {
            self.build_named_group(id)?;
        }

        self.check_group_cycles()?;
        self.collect_substitutions()?;
        self.check_attribute_types()?;
        self.check_value_constraints()?;
        self.collect_covered_namespaces();

        debug!(
            target_namespace = ?self.model.target_namespace,
            documents = self.documents.len(),
            elements = self.model.global_elements.len(),
            types = self.types.len(),
            "schema compiled"
        );
        Ok(self.model)
    }

    fn ensure_type(&mut self, id: TypeId) -> CompileResult<()> {
        let (doc, node, name) = match self.types.get_mut(&id) {
            None => return Ok(()),
            Some(entry) => match entry.state {
                BuildState::Done => return Ok(()),
                BuildState::Building => {
                    return Err(CompileError::CircularDefinition {
                        component: "type",
                        name: entry.name.clone(),
                    })
                }
                BuildState::Pending => {
                    entry.state = BuildState::Building;
                    (entry.doc, entry.node.clone(), entry.name.clone())
                }
            },
        };

        let definition = if node.local_name() == SIMPLE_TYPE {
            TypeDefinition::Simple(self.build_simple_type(doc, &node, Some(name))?)
        } else {
            TypeDefinition::Complex(self.build_complex_type(doc, &node, Some(name))?)
        };
        *self.model.type_mut(id) = definition;

        if let Some(entry) = self.types.get_mut(&id) {
            entry.state = BuildState::Done;
        }
        Ok(())
    }

    fn ensure_element(&mut self, id: ElementId) -> CompileResult<()> {
        let (doc, node, name) = match self.elements.get_mut(&id) {
            None => return Ok(()),
            Some(entry) => match entry.state {
                BuildState::Done => return Ok(()),
                BuildState::Building => {
                    return Err(CompileError::CircularDefinition {
                        component: "element",
                        name: entry.name.clone(),
                    })
                }
                BuildState::Pending => {
                    entry.state = BuildState::Building;
                    (entry.doc, entry.node.clone(), entry.name.clone())
                }
            },
        };

        let head = match node.attribute_local(SUBSTITUTION_GROUP) {
            Some(reference) => {
                let head_name = self.resolve_reference(doc, &node, reference)?;
                let head = self.model.get_element(&head_name).ok_or(
                    CompileError::UnresolvedReference {
                        component: "element",
                        name: head_name,
                    },
                )?;
                Some(head)
            }
            None => None,
        };

        let type_id = match self.element_type(doc, &node)? {
            Some(type_id) => type_id,
            None => match head {
                Some(head) => {
                    self.ensure_element(head)?;
                    self.model.element(head).type_id
                }
                None => self.model.any_type(),
            },
        };

        let mut decl = ElementDeclaration::new(name, type_id, Scope::Global);
        decl.nillable = bool_attr(&node, NILLABLE)?.unwrap_or(false);
        decl.is_abstract = bool_attr(&node, ABSTRACT)?.unwrap_or(false);
        decl.value_constraint = value_constraint(&node)?;
        decl.substitution_group = head;
        *self.model.element_mut(id) = decl;

        if let Some(entry) = self.elements.get_mut(&id) {
            entry.state = BuildState::Done;
        }
        Ok(())
    }

    fn ensure_attribute(&mut self, name: &QName) -> CompileResult<AttributeDeclaration> {
        if let Some(decl) = self.model.global_attributes.get(name) {
            return Ok(decl.clone());
        }
        let (doc, node) = match self.attributes.get_mut(name) {
            None => {
                return Err(CompileError::UnresolvedReference {
                    component: "attribute",
                    name: name.clone(),
                })
            }
            Some(entry) if entry.state == BuildState::Building => {
                return Err(CompileError::CircularDefinition {
                    component: "attribute",
                    name: name.clone(),
                })
            }
            Some(entry) => {
                entry.state = BuildState::Building;
                (entry.doc, entry.node.clone())
            }
        };

        let type_id = self.attribute_type(doc, &node)?;
        let mut decl = AttributeDeclaration::new(name.clone(), type_id);
        decl.value_constraint = value_constraint(&node)?;
        self.model.global_attributes.insert(name.clone(), decl.clone());

        if let Some(entry) = self.attributes.get_mut(name) {
            entry.state = BuildState::Done;
        }
        Ok(decl)
    }

    fn ensure_attribute_group(&mut self, name: &QName) -> CompileResult<(AttributeUses, Option<Wildcard>)> {
        if let Some(cached) = self.attribute_group_cache.get(name) {
            return Ok(cached.clone());
        }
        let (doc, node) = match self.attribute_groups.get_mut(name) {
            None => {
                return Err(CompileError::UnresolvedReference {
                    component: "attributeGroup",
                    name: name.clone(),
                })
            }
            Some(entry) if entry.state == BuildState::Building => {
                return Err(CompileError::CircularDefinition {
                    component: "attributeGroup",
                    name: name.clone(),
                })
            }
            Some(entry) => {
                entry.state = BuildState::Building;
                (entry.doc, entry.node.clone())
            }
        };

        let result = self.attribute_uses(doc, &node)?;
        self.attribute_group_cache.insert(name.clone(), result.clone());

        if let Some(entry) = self.attribute_groups.get_mut(name) {
            entry.state = BuildState::Done;
        }
        Ok(result)
    }

    fn build_named_group(&mut self, id: GroupId) -> CompileResult<()> {
        let Some(entry) = self.groups.get(&id) else {
            return Ok(());
        };
        let (doc, node, name) = (entry.doc, entry.node.clone(), entry.name.clone());

        let child = significant_children(&node)
            .find(|c| Compositor::from_local_name(c.local_name()).is_some())
            .ok_or_else(|| CompileError::Invalid(format!("group {} has no sequence, choice or all", name)))?;
        let group = self.build_model_group(doc, child)?.with_name(name);
        *self.model.group_mut(id) = group;
        Ok(())
    }

    // =========================================================================
    // Simple types
    // =========================================================================

    fn build_simple_type(&mut self, doc: usize, node: &Element, name: Option<QName>) -> CompileResult<SimpleType> {
        let derivation = significant_children(node).next().ok_or_else(|| {
            CompileError::Invalid("xs:simpleType requires a restriction, list or union".to_string())
        })?;

        match derivation.local_name() {
            RESTRICTION => {
                let base = match derivation.attribute_local(BASE) {
                    Some(base) => self.simple_type_ref(doc, derivation, base)?,
                    None => {
                        let inline = child_named(derivation, SIMPLE_TYPE).ok_or_else(|| {
                            CompileError::MissingAttribute {
                                element: RESTRICTION.to_string(),
                                attribute: BASE.to_string(),
                            }
                        })?;
                        self.anonymous_simple_type(doc, inline)?
                    }
                };
                self.restrict_simple_type(derivation, base, name)
            }
            LIST => {
                let item = match derivation.attribute_local(ITEM_TYPE) {
                    Some(item) => self.simple_type_ref(doc, derivation, item)?,
                    None => {
                        let inline = child_named(derivation, SIMPLE_TYPE).ok_or_else(|| {
                            CompileError::MissingAttribute {
                                element: LIST.to_string(),
                                attribute: ITEM_TYPE.to_string(),
                            }
                        })?;
                        self.anonymous_simple_type(doc, inline)?
                    }
                };
                if self.model.simple_type(item).map_or(false, SimpleType::is_list) {
                    return Err(CompileError::Invalid(
                        "the item type of a list cannot itself be a list".to_string(),
                    ));
                }
                Ok(SimpleType {
                    name,
                    base: Some(self.model.any_simple_type()),
                    variety: Variety::List(item),
                    builtin: any_simple_builtin()?,
                    white_space: WhiteSpace::Collapse,
                    facets: FacetSet::default(),
                })
            }
            UNION => {
                let mut members = Vec::new();
                if let Some(member_types) = derivation.attribute_local(MEMBER_TYPES) {
                    for member in member_types.split_whitespace() {
                        members.push(self.simple_type_ref(doc, derivation, member)?);
                    }
                }
                for inline in derivation.child_elements().filter(|c| is_xsd(c) && c.local_name() == SIMPLE_TYPE) {
                    members.push(self.anonymous_simple_type(doc, inline)?);
                }
                if members.is_empty() {
                    return Err(CompileError::Invalid("xs:union has no member types".to_string()));
                }
                Ok(SimpleType {
                    name,
                    base: Some(self.model.any_simple_type()),
                    variety: Variety::Union(members),
                    builtin: any_simple_builtin()?,
                    white_space: WhiteSpace::Preserve,
                    facets: FacetSet::default(),
                })
            }
            other => Err(CompileError::Invalid(format!(
                "unexpected <{}> in xs:simpleType",
                other
            ))),
        }
    }

    fn anonymous_simple_type(&mut self, doc: usize, node: &Element) -> CompileResult<TypeId> {
        let simple = self.build_simple_type(doc, node, None)?;
        Ok(self.model.add_type(TypeDefinition::Simple(simple)))
    }

    /// Resolve a reference that must name a simple type, building it first
    fn simple_type_ref(&mut self, doc: usize, node: &Element, reference: &str) -> CompileResult<TypeId> {
        let id = self.lookup_type(doc, node, reference)?;
        self.ensure_type(id)?;
        if self.model.simple_type(id).is_none() {
            return Err(CompileError::Invalid(format!(
                "'{}' is not a simple type",
                reference.trim()
            )));
        }
        Ok(id)
    }

    fn restrict_simple_type(&mut self, node: &Element, base_id: TypeId, name: Option<QName>) -> CompileResult<SimpleType> {
        let base = self.model.simple_type(base_id).cloned().ok_or_else(|| {
            CompileError::Invalid("restriction base is not a simple type".to_string())
        })?;

        let step = self.parse_facets(node, &base)?;
        let white_space = step.white_space.unwrap_or(base.white_space);
        let facets = base.facets.restrict(step);
        facets
            .check_consistency()
            .map_err(|(facet, reason)| CompileError::Invalid(format!("conflicting {} facet: {}", facet, reason)))?;

        Ok(SimpleType {
            name,
            base: Some(base_id),
            variety: base.variety.clone(),
            builtin: base.builtin,
            white_space,
            facets,
        })
    }

    /// Facets declared by one restriction step
    fn parse_facets(&self, node: &Element, base: &SimpleType) -> CompileResult<FacetSet> {
        let admitted = base.admitted_facets();
        let mut step = FacetSet::default();
        let mut patterns = Vec::new();
        let mut literals = Vec::new();
        let mut values = Vec::new();

        for child in node.child_elements().filter(|c| is_xsd(c)) {
            let facet = child.local_name();
            match facet {
                ANNOTATION | SIMPLE_TYPE | ATTRIBUTE | ATTRIBUTE_GROUP | ANY_ATTRIBUTE => continue,
                _ if !FACET_NAMES.contains(&facet) => {
                    return Err(CompileError::Invalid(format!(
                        "unexpected <{}> in xs:restriction",
                        facet
                    )))
                }
                _ => {}
            }

            let value = child.attribute_local(VALUE).ok_or_else(|| CompileError::MissingAttribute {
                element: facet.to_string(),
                attribute: VALUE.to_string(),
            })?;
            if !admitted.contains(facet) {
                return Err(invalid_facet(
                    facet,
                    value,
                    format!("not applicable to {}", base.display_name()),
                ));
            }

            match facet {
                XSD_LENGTH => step.length = Some(parse_count(facet, value)?),
                XSD_MIN_LENGTH => step.min_length = Some(parse_count(facet, value)?),
                XSD_MAX_LENGTH => step.max_length = Some(parse_count(facet, value)?),
                XSD_PATTERN => patterns.push(value.to_string()),
                XSD_ENUMERATION => {
                    let parsed = base
                        .validate(&self.model, value, &child.namespaces)
                        .map_err(|failure| {
                            invalid_facet(
                                facet,
                                value,
                                format!("not valid for {}: expected {}", base.display_name(), failure.expected),
                            )
                        })?;
                    literals.push(value.to_string());
                    values.push(parsed);
                }
                XSD_WHITE_SPACE => {
                    let white_space: WhiteSpace = value.parse().map_err(|e| invalid_facet(facet, value, e))?;
                    if white_space < base.white_space {
                        return Err(invalid_facet(
                            facet,
                            value,
                            format!("cannot relax whiteSpace '{}' of the base type", base.white_space),
                        ));
                    }
                    step.white_space = Some(white_space);
                }
                XSD_MIN_INCLUSIVE | XSD_MIN_EXCLUSIVE | XSD_MAX_INCLUSIVE | XSD_MAX_EXCLUSIVE => {
                    if !base.is_ordered() {
                        return Err(invalid_facet(
                            facet,
                            value,
                            format!("values of {} are not totally ordered", base.display_name()),
                        ));
                    }
                    let normalized = base.white_space.normalize(value);
                    let parsed = base
                        .builtin
                        .parse(&normalized, &child.namespaces)
                        .map_err(|e| invalid_facet(facet, value, e))?;
                    let bound = Some(BoundFacet::new(normalized.as_ref(), parsed));
                    match facet {
                        XSD_MIN_INCLUSIVE => step.min_inclusive = bound,
                        XSD_MIN_EXCLUSIVE => step.min_exclusive = bound,
                        XSD_MAX_INCLUSIVE => step.max_inclusive = bound,
                        _ => step.max_exclusive = bound,
                    }
                }
                XSD_TOTAL_DIGITS => {
                    let digits = parse_count(facet, value)?;
                    if digits == 0 {
                        return Err(invalid_facet(facet, value, "must be a positive integer"));
                    }
                    step.total_digits = Some(digits as u32);
                }
                XSD_FRACTION_DIGITS => step.fraction_digits = Some(parse_count(facet, value)? as u32),
                _ => {}
            }
        }

        if !patterns.is_empty() {
            let joined = patterns.join(" | ");
            let pattern = PatternFacet::new(patterns).map_err(|e| invalid_facet(XSD_PATTERN, &joined, e))?;
            step.patterns.push(pattern);
        }
        if !literals.is_empty() {
            step.enumeration = Some(EnumerationFacet { literals, values });
        }
        Ok(step)
    }

    // =========================================================================
    // Complex types
    // =========================================================================

    fn build_complex_type(&mut self, doc: usize, node: &Element, name: Option<QName>) -> CompileResult<ComplexType> {
        let is_abstract = bool_attr(node, ABSTRACT)?.unwrap_or(false);
        let mixed = bool_attr(node, MIXED)?.unwrap_or(false);

        let first = significant_children(node).next();
        let mut complex = match first {
            Some(content) if content.local_name() == SIMPLE_CONTENT => {
                self.build_simple_content(doc, content, name)?
            }
            Some(content) if content.local_name() == COMPLEX_CONTENT => {
                self.build_complex_content(doc, content, name, mixed)?
            }
            _ => {
                let mut complex = ComplexType::empty(name, Some(self.model.any_type()));
                let particle = self.content_particle(doc, node)?;
                complex.content = self.make_content(particle, mixed);
                let (uses, wildcard) = self.attribute_uses(doc, node)?;
                complex.attributes = uses;
                complex.attribute_wildcard = wildcard;
                complex
            }
        };
        complex.is_abstract = is_abstract;
        Ok(complex)
    }

    fn build_simple_content(&mut self, doc: usize, node: &Element, name: Option<QName>) -> CompileResult<ComplexType> {
        let derivation = significant_children(node).next().ok_or_else(|| {
            CompileError::Invalid("xs:simpleContent requires a restriction or extension".to_string())
        })?;
        let base_ref = required_attr(derivation, BASE)?;
        let base_id = self.lookup_type(doc, derivation, base_ref)?;
        self.ensure_type(base_id)?;

        let (uses, wildcard) = self.attribute_uses(doc, derivation)?;
        let mut complex = ComplexType::empty(name, Some(base_id));

        match (derivation.local_name(), self.model.type_definition(base_id).clone()) {
            (EXTENSION, TypeDefinition::Simple(_)) => {
                complex.derivation = DerivationMethod::Extension;
                complex.content = ContentType::Simple(base_id);
                complex.attributes = uses;
                complex.attribute_wildcard = wildcard;
            }
            (EXTENSION, TypeDefinition::Complex(base)) => {
                let ContentType::Simple(simple) = base.content else {
                    return Err(simple_content_base_error(base_ref));
                };
                complex.derivation = DerivationMethod::Extension;
                complex.content = ContentType::Simple(simple);
                complex.attributes = merge_attribute_uses(&base.attributes, uses);
                complex.attribute_wildcard = union_wildcards(base.attribute_wildcard, wildcard);
            }
            (RESTRICTION, TypeDefinition::Complex(base)) => {
                let ContentType::Simple(simple) = base.content else {
                    return Err(simple_content_base_error(base_ref));
                };
                let simple_base = match child_named(derivation, SIMPLE_TYPE) {
                    Some(inline) => self.anonymous_simple_type(doc, inline)?,
                    None => simple,
                };
                let restricted = self.restrict_simple_type(derivation, simple_base, None)?;
                let content_type = self.model.add_type(TypeDefinition::Simple(restricted));
                complex.derivation = DerivationMethod::Restriction;
                complex.content = ContentType::Simple(content_type);
                complex.attributes = merge_attribute_uses(&base.attributes, uses);
                complex.attribute_wildcard = wildcard;
            }
            (RESTRICTION, TypeDefinition::Simple(_)) => {
                return Err(CompileError::Invalid(format!(
                    "simpleContent restriction requires a complex base type, '{}' is simple",
                    base_ref
                )))
            }
            (other, _) => {
                return Err(CompileError::Invalid(format!(
                    "unexpected <{}> in xs:simpleContent",
                    other
                )))
            }
        }
        Ok(complex)
    }

    fn build_complex_content(
        &mut self,
        doc: usize,
        node: &Element,
        name: Option<QName>,
        mixed: bool,
    ) -> CompileResult<ComplexType> {
        let mixed = bool_attr(node, MIXED)?.unwrap_or(mixed);
        let derivation = significant_children(node).next().ok_or_else(|| {
            CompileError::Invalid("xs:complexContent requires a restriction or extension".to_string())
        })?;
        let base_ref = required_attr(derivation, BASE)?;
        let base_id = self.lookup_type(doc, derivation, base_ref)?;
        self.ensure_type(base_id)?;
        let base = self.model.complex_type(base_id).cloned().ok_or_else(|| {
            CompileError::Invalid(format!("complexContent base '{}' is not a complex type", base_ref))
        })?;

        let particle = self.content_particle(doc, derivation)?;
        let (uses, wildcard) = self.attribute_uses(doc, derivation)?;
        let mut complex = ComplexType::empty(name, Some(base_id));

        match derivation.local_name() {
            EXTENSION => {
                complex.derivation = DerivationMethod::Extension;
                complex.content = if base_id == self.model.any_type() {
                    self.make_content(particle, mixed)
                } else {
                    match (base.content, particle) {
                        (ContentType::Empty, particle) => self.make_content(particle, mixed),
                        (content, None) => content,
                        (ContentType::ElementOnly(head), Some(tail)) => {
                            ContentType::ElementOnly(self.sequence_of(head, tail))
                        }
                        (ContentType::Mixed(head), Some(tail)) => ContentType::Mixed(self.sequence_of(head, tail)),
                        (ContentType::Simple(_), Some(_)) => {
                            return Err(CompileError::Invalid(format!(
                                "cannot add element content to simple content type '{}'",
                                base_ref
                            )))
                        }
                    }
                };
                complex.attributes = merge_attribute_uses(&base.attributes, uses);
                complex.attribute_wildcard = union_wildcards(base.attribute_wildcard, wildcard);
            }
            RESTRICTION => {
                complex.derivation = DerivationMethod::Restriction;
                complex.content = self.make_content(particle, mixed);
                complex.attributes = merge_attribute_uses(&base.attributes, uses);
                complex.attribute_wildcard = wildcard;
            }
            other => {
                return Err(CompileError::Invalid(format!(
                    "unexpected <{}> in xs:complexContent",
                    other
                )))
            }
        }
        Ok(complex)
    }

    fn make_content(&mut self, particle: Option<Particle>, mixed: bool) -> ContentType {
        match (particle, mixed) {
            (Some(particle), false) => ContentType::ElementOnly(particle),
            (Some(particle), true) => ContentType::Mixed(particle),
            (None, true) => {
                let empty = self.model.add_group(ModelGroup::empty());
                ContentType::Mixed(Particle::new(Term::Group(empty), Occurs::once()))
            }
            (None, false) => ContentType::Empty,
        }
    }

    fn sequence_of(&mut self, head: Particle, tail: Particle) -> Particle {
        let group = self
            .model
            .add_group(ModelGroup::new(Compositor::Sequence, vec![head, tail]));
        Particle::new(Term::Group(group), Occurs::once())
    }

    /// The model group particle declared directly under `parent`, if any
    fn content_particle(&mut self, doc: usize, parent: &Element) -> CompileResult<Option<Particle>> {
        let Some(child) = parent
            .child_elements()
            .find(|c| is_xsd(c) && matches!(c.local_name(), SEQUENCE | CHOICE | ALL | GROUP))
        else {
            return Ok(None);
        };

        let particle = self.build_particle(doc, child)?;
        if let Term::Group(group) = particle.term {
            if !self.groups.contains_key(&group) && self.model.group(group).is_empty() {
                return Ok(None);
            }
        }
        if particle.occurs.is_empty() {
            return Ok(None);
        }
        Ok(Some(particle))
    }

    // =========================================================================
    // Particles
    // =========================================================================

    fn build_particle(&mut self, doc: usize, node: &Element) -> CompileResult<Particle> {
        let occurs = Occurs::parse(node.attribute_local(MIN_OCCURS), node.attribute_local(MAX_OCCURS))
            .map_err(CompileError::InvalidOccurs)?;

        match node.local_name() {
            ELEMENT => {
                let id = self.element_particle(doc, node, occurs)?;
                Ok(Particle::new(Term::Element(id), occurs))
            }
            GROUP => {
                let reference = required_attr(node, REF)?;
                let name = self.resolve_reference(doc, node, reference)?;
                let group = self
                    .model
                    .get_group(&name)
                    .ok_or(CompileError::UnresolvedReference { component: "group", name })?;
                Ok(Particle::new(Term::Group(group), occurs))
            }
            ANY => Ok(Particle::new(Term::Any(self.wildcard(doc, node)?), occurs)),
            SEQUENCE | CHOICE | ALL => {
                let group = self.build_model_group(doc, node)?;
                let id = self.model.add_group(group);
                Ok(Particle::new(Term::Group(id), occurs))
            }
            other => Err(CompileError::Invalid(format!(
                "unexpected <{}> in a model group",
                other
            ))),
        }
    }

    fn build_model_group(&mut self, doc: usize, node: &Element) -> CompileResult<ModelGroup> {
        let compositor = Compositor::from_local_name(node.local_name()).ok_or_else(|| {
            CompileError::Invalid(format!("<{}> is not a model group", node.local_name()))
        })?;

        let mut particles = Vec::new();
        for child in node.child_elements() {
            if !is_xsd(child) {
                return Err(CompileError::Invalid(format!(
                    "unexpected element {} in xs:{}",
                    child.name, compositor
                )));
            }
            if child.local_name() == ANNOTATION {
                continue;
            }
            let particle = self.build_particle(doc, child)?;
            if compositor == Compositor::All
                && (!matches!(particle.term, Term::Element(_)) || particle.occurs.max.map_or(true, |m| m > 1))
            {
                return Err(CompileError::Invalid(
                    "xs:all may only contain element declarations with maxOccurs of at most 1".to_string(),
                ));
            }
            particles.push(particle);
        }
        Ok(ModelGroup::new(compositor, particles))
    }

    fn element_particle(&mut self, doc: usize, node: &Element, occurs: Occurs) -> CompileResult<ElementId> {
        if let Some(reference) = node.attribute_local(REF) {
            let name = self.resolve_reference(doc, node, reference)?;
            return self
                .model
                .get_element(&name)
                .ok_or(CompileError::UnresolvedReference { component: "element", name });
        }

        let local_name = local_component_name(node)?;
        let document = &self.documents[doc];
        let form = form_attr(node, FORM)?.unwrap_or(document.element_form);
        let namespace = match form {
            Form::Qualified => document.target_namespace.clone(),
            Form::Unqualified => None,
        };

        let type_id = match self.element_type(doc, node)? {
            Some(type_id) => type_id,
            None => self.model.any_type(),
        };

        let mut decl = ElementDeclaration::new(QName::new(namespace, local_name), type_id, Scope::Local);
        decl.occurs = occurs;
        decl.nillable = bool_attr(node, NILLABLE)?.unwrap_or(false);
        decl.value_constraint = value_constraint(node)?;
        Ok(self.model.add_element(decl))
    }

    /// Type of an element declaration: `type` attribute or inline definition
    fn element_type(&mut self, doc: usize, node: &Element) -> CompileResult<Option<TypeId>> {
        let inline = significant_children(node)
            .find(|c| matches!(c.local_name(), COMPLEX_TYPE | SIMPLE_TYPE));

        match (node.attribute_local(TYPE), inline) {
            (Some(_), Some(_)) => Err(CompileError::Invalid(format!(
                "element '{}' has both a type attribute and an inline type",
                node.attribute_local(NAME).unwrap_or_default()
            ))),
            (Some(reference), None) => Ok(Some(self.lookup_type(doc, node, reference)?)),
            (None, Some(inline)) if inline.local_name() == SIMPLE_TYPE => {
                Ok(Some(self.anonymous_simple_type(doc, inline)?))
            }
            (None, Some(inline)) => {
                let complex = self.build_complex_type(doc, inline, None)?;
                Ok(Some(self.model.add_type(TypeDefinition::Complex(complex))))
            }
            (None, None) => Ok(None),
        }
    }

    fn wildcard(&self, doc: usize, node: &Element) -> CompileResult<Wildcard> {
        let target_namespace = self.documents[doc].target_namespace.as_deref();
        let namespaces = NamespaceConstraint::from_namespace_attr(
            node.attribute_local(NAMESPACE).unwrap_or("##any"),
            target_namespace,
        )
        .map_err(CompileError::Invalid)?;
        let process_contents = match node.attribute_local(PROCESS_CONTENTS) {
            Some(value) => value.trim().parse::<ProcessContents>().map_err(CompileError::Invalid)?,
            None => ProcessContents::Strict,
        };
        Ok(Wildcard::new(namespaces, process_contents))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn attribute_uses(&mut self, doc: usize, parent: &Element) -> CompileResult<(AttributeUses, Option<Wildcard>)> {
        let mut uses = AttributeUses::new();
        let mut wildcard = None;

        for child in parent.child_elements().filter(|c| is_xsd(c)) {
            match child.local_name() {
                ATTRIBUTE => {
                    let decl = self.attribute_use(doc, child)?;
                    if uses.contains_key(&decl.name) {
                        return Err(CompileError::Duplicate {
                            component: "attribute use",
                            name: decl.name,
                        });
                    }
                    uses.insert(decl.name.clone(), decl);
                }
                ATTRIBUTE_GROUP => {
                    let reference = required_attr(child, REF)?;
                    let name = self.resolve_reference(doc, child, reference)?;
                    let (group_uses, group_wildcard) = self.ensure_attribute_group(&name)?;
                    uses.extend(group_uses);
                    wildcard = union_wildcards(wildcard, group_wildcard);
                }
                ANY_ATTRIBUTE => {
                    let any = self.wildcard(doc, child)?;
                    wildcard = union_wildcards(wildcard, Some(any));
                }
                _ => {}
            }
        }
        Ok((uses, wildcard))
    }

    fn attribute_use(&mut self, doc: usize, node: &Element) -> CompileResult<AttributeDeclaration> {
        let usage = match node.attribute_local(USE) {
            Some(value) => value.trim().parse::<AttributeUse>().map_err(CompileError::Invalid)?,
            None => AttributeUse::Optional,
        };
        let constraint = value_constraint(node)?;
        if usage == AttributeUse::Required && constraint.as_ref().map_or(false, |c| !c.is_fixed()) {
            return Err(CompileError::Invalid(
                "a required attribute cannot have a default value".to_string(),
            ));
        }

        let mut decl = match node.attribute_local(REF) {
            Some(reference) => {
                let name = self.resolve_reference(doc, node, reference)?;
                self.ensure_attribute(&name)?
            }
            None => {
                let local_name = local_component_name(node)?;
                let document = &self.documents[doc];
                let form = form_attr(node, FORM)?.unwrap_or(document.attribute_form);
                let namespace = match form {
                    Form::Qualified => document.target_namespace.clone(),
                    Form::Unqualified => None,
                };
                let type_id = self.attribute_type(doc, node)?;
                AttributeDeclaration::new(QName::new(namespace, local_name), type_id)
            }
        };

        decl.usage = usage;
        if constraint.is_some() {
            decl.value_constraint = constraint;
        }
        Ok(decl)
    }

    fn attribute_type(&mut self, doc: usize, node: &Element) -> CompileResult<TypeId> {
        let inline = child_named(node, SIMPLE_TYPE);
        match (node.attribute_local(TYPE), inline) {
            (Some(_), Some(_)) => Err(CompileError::Invalid(format!(
                "attribute '{}' has both a type attribute and an inline type",
                node.attribute_local(NAME).unwrap_or_default()
            ))),
            (Some(reference), None) => self.lookup_type(doc, node, reference),
            (None, Some(inline)) => self.anonymous_simple_type(doc, inline),
            (None, None) => Ok(self.model.any_simple_type()),
        }
    }

    // =========================================================================
    // Whole-schema checks
    // =========================================================================

    fn check_group_cycles(&self) -> CompileResult<()> {
        for (name, &id) in &self.model.named_groups {
            if self.group_reaches(id, id, &mut HashSet::new()) {
                return Err(CompileError::CircularDefinition {
                    component: "group",
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn group_reaches(&self, from: GroupId, target: GroupId, seen: &mut HashSet<GroupId>) -> bool {
        for particle in &self.model.group(from).particles {
            if let Term::Group(child) = particle.term {
                if child == target {
                    return true;
                }
                if seen.insert(child) && self.group_reaches(child, target, seen) {
                    return true;
                }
            }
        }
        false
    }

    fn collect_substitutions(&mut self) -> CompileResult<()> {
        let count = self.model.elements.len();
        let mut substitutes: HashMap<ElementId, Vec<ElementId>> = HashMap::new();

        for index in 0..count {
            let member = ElementId(index);
            let Some(direct_head) = self.model.element(member).substitution_group else {
                continue;
            };

            let member_type = self.model.element(member).type_id;
            let head_type = self.model.element(direct_head).type_id;
            if !self.model.is_derived_from(member_type, head_type) {
                return Err(CompileError::Invalid(format!(
                    "the type of {} does not derive from the type of its substitution group head {}",
                    self.model.element(member).name,
                    self.model.element(direct_head).name
                )));
            }

            let mut head = Some(direct_head);
            let mut steps = 0;
            while let Some(current) = head {
                if current == member || steps > count {
                    return Err(CompileError::CircularDefinition {
                        component: "substitutionGroup",
                        name: self.model.element(member).name.clone(),
                    });
                }
                substitutes.entry(current).or_default().push(member);
                head = self.model.element(current).substitution_group;
                steps += 1;
            }
        }

        self.model.substitutes = substitutes;
        Ok(())
    }

    fn check_attribute_types(&self) -> CompileResult<()> {
        let complex_uses = self
            .model
            .types
            .iter()
            .filter_map(TypeDefinition::as_complex)
            .flat_map(|t| t.attributes.values());

        for decl in self.model.global_attributes.values().chain(complex_uses) {
            if !self.model.type_definition(decl.type_id).is_simple() {
                return Err(CompileError::Invalid(format!(
                    "attribute {} must have a simple type",
                    decl.name
                )));
            }
        }
        Ok(())
    }

    fn check_value_constraints(&self) -> CompileResult<()> {
        for decl in &self.model.elements {
            if let Some(constraint) = &decl.value_constraint {
                self.check_value(constraint, decl.type_id, &decl.name)?;
            }
        }

        let complex_uses = self
            .model
            .types
            .iter()
            .filter_map(TypeDefinition::as_complex)
            .flat_map(|t| t.attributes.values());
        for decl in self.model.global_attributes.values().chain(complex_uses) {
            if let Some(constraint) = &decl.value_constraint {
                self.check_value(constraint, decl.type_id, &decl.name)?;
            }
        }
        Ok(())
    }

    fn check_value(&self, constraint: &ValueConstraint, type_id: TypeId, owner: &QName) -> CompileResult<()> {
        let simple = match self.model.type_definition(type_id) {
            TypeDefinition::Simple(simple) => simple,
            TypeDefinition::Complex(complex) => match &complex.content {
                ContentType::Simple(content) => match self.model.simple_type(*content) {
                    Some(simple) => simple,
                    None => return Ok(()),
                },
                ContentType::Mixed(_) => return Ok(()),
                _ => {
                    return Err(CompileError::Invalid(format!(
                        "{} has a value constraint but its type has {} content",
                        owner,
                        complex.content.label()
                    )))
                }
            },
        };

        simple
            .validate(&self.model, &constraint.literal, &constraint.namespaces)
            .map(|_| ())
            .map_err(|failure| {
                CompileError::Invalid(format!(
                    "value '{}' of {} does not satisfy {}: expected {}",
                    constraint.literal, owner, failure.facet, failure.expected
                ))
            })
    }

    /// Namespaces of every declared name, local declarations included
    fn collect_covered_namespaces(&mut self) {
        let globals = self
            .elements
            .values()
            .chain(self.types.values())
            .chain(self.attributes.values())
            .map(|entry| entry.name.namespace.clone());
        let local_elements = self.model.elements.iter().map(|decl| decl.name.namespace.clone());
        let local_attributes = self
            .model
            .types
            .iter()
            .filter_map(|definition| match definition {
                TypeDefinition::Complex(complex) => Some(complex.attributes.values()),
                TypeDefinition::Simple(_) => None,
            })
            .flatten()
            .filter(|decl| !decl.is_prohibited())
            .map(|decl| decl.name.namespace.clone());
        let names: BTreeSet<Option<String>> = globals.chain(local_elements).chain(local_attributes).collect();
        self.model.covered_namespaces = names;
    }

    // =========================================================================
    // Names and references
    // =========================================================================

    fn component_name(&self, doc: usize, node: &Element) -> CompileResult<QName> {
        let local_name = local_component_name(node)?;
        Ok(QName::new(self.documents[doc].target_namespace.clone(), local_name))
    }

    /// Resolve a QName-valued attribute in the scope of `node`
    fn resolve_reference(&self, doc: usize, node: &Element, value: &str) -> CompileResult<QName> {
        let value = value.trim();
        if !is_valid_qname(value) {
            return Err(CompileError::Invalid(format!("'{}' is not a valid QName", value)));
        }
        let mut name = node
            .namespaces
            .resolve(value)
            .ok_or_else(|| CompileError::UnknownPrefix(split_qname(value).0.unwrap_or_default().to_string()))?;

        let document = &self.documents[doc];
        if document.chameleon && name.namespace.is_none() {
            name.namespace = document.target_namespace.clone();
        }
        Ok(name)
    }

    fn lookup_type(&self, doc: usize, node: &Element, reference: &str) -> CompileResult<TypeId> {
        let name = self.resolve_reference(doc, node, reference)?;
        self.model
            .get_type(&name)
            .ok_or(CompileError::UndeclaredType(name))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_xsd(element: &Element) -> bool {
    element.name.is_in(Some(XSD_NAMESPACE))
}

/// XSD children other than annotations
fn significant_children(node: &Element) -> impl Iterator<Item = &Element> {
    node.child_elements()
        .filter(|c| is_xsd(c) && c.local_name() != ANNOTATION)
}

fn child_named<'a>(node: &'a Element, local_name: &str) -> Option<&'a Element> {
    node.child_elements()
        .find(|c| is_xsd(c) && c.local_name() == local_name)
}

fn required_attr<'a>(node: &'a Element, name: &str) -> CompileResult<&'a str> {
    node.attribute_local(name).ok_or_else(|| CompileError::MissingAttribute {
        element: node.local_name().to_string(),
        attribute: name.to_string(),
    })
}

fn local_component_name(node: &Element) -> CompileResult<String> {
    let name = required_attr(node, NAME)?.trim();
    if !is_valid_ncname(name) {
        return Err(CompileError::Invalid(format!(
            "'{}' is not a valid {} name",
            name,
            node.local_name()
        )));
    }
    Ok(name.to_string())
}

fn bool_attr(node: &Element, name: &str) -> CompileResult<Option<bool>> {
    match node.attribute_local(name).map(str::trim) {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(CompileError::Invalid(format!(
            "attribute '{}' must be a boolean, found '{}'",
            name, other
        ))),
    }
}

fn form_attr(node: &Element, name: &str) -> CompileResult<Option<Form>> {
    node.attribute_local(name)
        .map(|value| value.trim().parse::<Form>().map_err(CompileError::Invalid))
        .transpose()
}

fn value_constraint(node: &Element) -> CompileResult<Option<ValueConstraint>> {
    match (node.attribute_local(DEFAULT), node.attribute_local(FIXED)) {
        (Some(_), Some(_)) => Err(CompileError::Invalid(format!(
            "'{}' has both default and fixed values",
            node.attribute_local(NAME).unwrap_or_default()
        ))),
        (Some(value), None) => Ok(Some(ValueConstraint::default_value(value, node.namespaces.clone()))),
        (None, Some(value)) => Ok(Some(ValueConstraint::fixed(value, node.namespaces.clone()))),
        (None, None) => Ok(None),
    }
}

fn parse_count(facet: &str, value: &str) -> CompileResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid_facet(facet, value, "must be a non-negative integer"))
}

fn invalid_facet(facet: &str, value: &str, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidFacet {
        facet: facet.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn simple_content_base_error(base: &str) -> CompileError {
    CompileError::Invalid(format!(
        "simpleContent base '{}' does not have simple content",
        base
    ))
}

fn union_wildcards(a: Option<Wildcard>, b: Option<Wildcard>) -> Option<Wildcard> {
    match (a, b) {
        (Some(a), Some(b)) => Some(b.union(&a)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn any_simple_builtin() -> CompileResult<&'static super::builtins::BuiltinType> {
    get_builtin_type(XSD_ANY_SIMPLE_TYPE).ok_or_else(|| CompileError::UndeclaredType(QName::xsd(XSD_ANY_SIMPLE_TYPE)))
}
