//! Schema-Datenmodell für den Form-Generator.
//!
//! Ein geparstes XSD wird als Arena von [`SchemaNode`]s abgelegt. Knoten sind
//! nach dem Laden unveränderlich und werden über [`SchemaNodeId`] adressiert,
//! damit Add-Controls im Formular auf "ihr" Schema-Konstrukt zeigen können.
//!
//! Globale Definitionen (Elemente, Typen, Groups, AttributeGroups, Attribute)
//! sind zusätzlich per Local-Name indiziert.

use crate::FastIndexMap;

/// XML Schema Namespace.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Namespace (implizit an den Prefix `xml` gebunden).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Index eines Knotens in der [`Schema`]-Arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaNodeId(pub(crate) u32);

impl SchemaNodeId {
    /// Position in der Arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// XS-Konstrukt eines Schema-Knotens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Schema,
    Element,
    ComplexType,
    SimpleType,
    Sequence,
    Choice,
    All,
    Group,
    Attribute,
    AttributeGroup,
    AnyAttribute,
    Any,
    SimpleContent,
    ComplexContent,
    Extension,
    Restriction,
    Enumeration,
    List,
    Union,
}

impl SchemaKind {
    /// Mappt den Local-Name eines XS-Elements (None für nicht modellierte Konstrukte).
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "schema" => Self::Schema,
            "element" => Self::Element,
            "complexType" => Self::ComplexType,
            "simpleType" => Self::SimpleType,
            "sequence" => Self::Sequence,
            "choice" => Self::Choice,
            "all" => Self::All,
            "group" => Self::Group,
            "attribute" => Self::Attribute,
            "attributeGroup" => Self::AttributeGroup,
            "anyAttribute" => Self::AnyAttribute,
            "any" => Self::Any,
            "simpleContent" => Self::SimpleContent,
            "complexContent" => Self::ComplexContent,
            "extension" => Self::Extension,
            "restriction" => Self::Restriction,
            "enumeration" => Self::Enumeration,
            "list" => Self::List,
            "union" => Self::Union,
            _ => return None,
        })
    }

    /// Strukturelle Kinder machen aus einem Complex Type ein Fieldset.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Sequence
                | Self::Choice
                | Self::All
                | Self::Group
                | Self::SimpleContent
                | Self::ComplexContent
        )
    }

    /// Particles innerhalb eines Model-Group-Inhalts.
    pub fn is_particle(self) -> bool {
        matches!(
            self,
            Self::Element | Self::Sequence | Self::Choice | Self::All | Self::Group | Self::Any
        )
    }
}

/// maxOccurs (`"unbounded"` ist der Sentinel für unbeschränkt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl Default for MaxOccurs {
    fn default() -> Self {
        Self::Bounded(1)
    }
}

impl MaxOccurs {
    /// Ob nach `count` vorhandenen Instanzen noch eine weitere erlaubt ist.
    pub fn allows(self, count: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(max) => count < max as usize,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// Ob `max` mehr als `min` Instanzen zulässt.
    pub fn exceeds(self, min: u32) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(max) => max > min,
        }
    }
}

/// Deklarierte Occurrence-Bounds (None = nicht deklariert, erbt vom Kontext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Occurs {
    pub min: Option<u32>,
    pub max: Option<MaxOccurs>,
}

impl Occurs {
    pub const fn new(min: u32, max: MaxOccurs) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    /// Felder von `self` gewinnen, fehlende kommen aus `fallback`.
    pub fn or(self, fallback: Occurs) -> Occurs {
        Occurs {
            min: self.min.or(fallback.min),
            max: self.max.or(fallback.max),
        }
    }

    /// minOccurs mit XSD-Default 1.
    pub fn min_or_default(self) -> u32 {
        self.min.unwrap_or(1)
    }

    /// maxOccurs mit XSD-Default 1.
    pub fn max_or_default(self) -> MaxOccurs {
        self.max.unwrap_or_default()
    }

    pub fn is_declared(self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// Aufgelöste QName-Referenz (`type`, `ref`, `base`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub local_name: String,
    pub namespace: Option<String>,
}

impl TypeRef {
    /// Built-in XS-Typ (xs:string, xs:date, ...).
    pub fn is_builtin(&self) -> bool {
        self.namespace.as_deref() == Some(XS_NS)
    }

    /// Referenz in den XML-Namespace (xml:lang, xml:space, ...).
    pub fn is_xml_namespace(&self) -> bool {
        self.namespace.as_deref() == Some(XML_NS)
    }
}

/// Projektspezifische Annotation-Hinweise (`<disabled>`, `<hidden>`,
/// `<noinputfield>`). Werden als opake Flags durchgereicht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct AnnotationHints {
    pub disabled: bool,
    pub hidden: bool,
    pub no_input_field: bool,
}

/// `xs:documentation` Text mit optionalem `xml:lang`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documentation {
    pub lang: Option<String>,
    pub text: String,
}

/// Ein geparstes XS-Konstrukt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub name: Option<String>,
    pub type_ref: Option<TypeRef>,
    pub reference: Option<TypeRef>,
    pub base: Option<TypeRef>,
    pub occurs: Occurs,
    pub fixed: Option<String>,
    pub default: Option<String>,
    /// `value` einer Facette (enumeration).
    pub value: Option<String>,
    /// `use="required"`.
    pub required: bool,
    /// `use="prohibited"`.
    pub prohibited: bool,
    pub mixed: bool,
    pub documentation: Vec<Documentation>,
    pub hints: AnnotationHints,
    pub parent: Option<SchemaNodeId>,
    pub children: Vec<SchemaNodeId>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            name: None,
            type_ref: None,
            reference: None,
            base: None,
            occurs: Occurs::default(),
            fixed: None,
            default: None,
            value: None,
            required: false,
            prohibited: false,
            mixed: false,
            documentation: Vec::new(),
            hints: AnnotationHints::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Name oder Local-Name der Referenz (für Labels und Diagnosen).
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.reference.as_ref().map(|r| r.local_name.as_str()))
            .unwrap_or("")
    }
}

/// Geparstes Schema: Knoten-Arena plus globale Indizes.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    target_namespace: Option<String>,
    elements: FastIndexMap<String, SchemaNodeId>,
    complex_types: FastIndexMap<String, SchemaNodeId>,
    simple_types: FastIndexMap<String, SchemaNodeId>,
    groups: FastIndexMap<String, SchemaNodeId>,
    attribute_groups: FastIndexMap<String, SchemaNodeId>,
    attributes: FastIndexMap<String, SchemaNodeId>,
}

impl Schema {
    /// Erstellt ein leeres Schema mit `xs:schema`-Wurzelknoten.
    pub(crate) fn new(target_namespace: Option<String>) -> Self {
        Self {
            nodes: vec![SchemaNode::new(SchemaKind::Schema)],
            target_namespace,
            elements: FastIndexMap::default(),
            complex_types: FastIndexMap::default(),
            simple_types: FastIndexMap::default(),
            groups: FastIndexMap::default(),
            attribute_groups: FastIndexMap::default(),
            attributes: FastIndexMap::default(),
        }
    }

    /// Hängt einen Knoten unter `parent` an.
    pub(crate) fn push(&mut self, mut node: SchemaNode, parent: SchemaNodeId) -> SchemaNodeId {
        let id = SchemaNodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub(crate) fn node_mut(&mut self, id: SchemaNodeId) -> &mut SchemaNode {
        &mut self.nodes[id.index()]
    }

    /// Registriert eine globale Definition. Die erste Definition gewinnt.
    pub(crate) fn register_global(&mut self, id: SchemaNodeId) -> bool {
        let node = &self.nodes[id.index()];
        let Some(name) = node.name.clone() else {
            return false;
        };
        let index = match node.kind {
            SchemaKind::Element => &mut self.elements,
            SchemaKind::ComplexType => &mut self.complex_types,
            SchemaKind::SimpleType => &mut self.simple_types,
            SchemaKind::Group => &mut self.groups,
            SchemaKind::AttributeGroup => &mut self.attribute_groups,
            SchemaKind::Attribute => &mut self.attributes,
            _ => return false,
        };
        if index.contains_key(&name) {
            return false;
        }
        index.insert(name, id);
        true
    }

    pub(crate) fn set_target_namespace(&mut self, ns: Option<String>) {
        if self.target_namespace.is_none() {
            self.target_namespace = ns;
        }
    }

    /// Der `xs:schema`-Wurzelknoten.
    pub fn root(&self) -> SchemaNodeId {
        SchemaNodeId(0)
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    pub fn node(&self, id: SchemaNodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    /// Anzahl der Knoten inkl. Wurzel.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Direkte Kinder in Dokumentreihenfolge.
    pub fn children(&self, id: SchemaNodeId) -> impl Iterator<Item = (SchemaNodeId, &SchemaNode)> + '_ {
        self.nodes[id.index()]
            .children
            .iter()
            .map(move |&c| (c, &self.nodes[c.index()]))
    }

    /// Erstes direktes Kind einer bestimmten Art.
    pub fn child_of_kind(&self, id: SchemaNodeId, kind: SchemaKind) -> Option<SchemaNodeId> {
        self.children(id).find(|(_, n)| n.kind == kind).map(|(c, _)| c)
    }

    pub fn global_element(&self, name: &str) -> Option<SchemaNodeId> {
        self.elements.get(name).copied()
    }

    pub fn complex_type(&self, name: &str) -> Option<SchemaNodeId> {
        self.complex_types.get(name).copied()
    }

    pub fn simple_type(&self, name: &str) -> Option<SchemaNodeId> {
        self.simple_types.get(name).copied()
    }

    pub fn group(&self, name: &str) -> Option<SchemaNodeId> {
        self.groups.get(name).copied()
    }

    pub fn attribute_group(&self, name: &str) -> Option<SchemaNodeId> {
        self.attribute_groups.get(name).copied()
    }

    pub fn global_attribute(&self, name: &str) -> Option<SchemaNodeId> {
        self.attributes.get(name).copied()
    }

    /// Globale Elemente in Deklarationsreihenfolge.
    pub fn global_elements(&self) -> impl Iterator<Item = (&str, SchemaNodeId)> + '_ {
        self.elements.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Enumerationswerte eines Simple Types (bzw. einer Restriction).
    ///
    /// Folgt benannten Restriction-Bases, bis Werte gefunden werden.
    /// Unions und Listen liefern keine Werte (Freitext).
    pub fn enumeration_values(&self, id: SchemaNodeId) -> Vec<String> {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(node_id) = current {
            if hops > self.nodes.len() {
                break;
            }
            hops += 1;
            let restriction = match self.node(node_id).kind {
                SchemaKind::Restriction => Some(node_id),
                _ => self.child_of_kind(node_id, SchemaKind::Restriction),
            };
            let Some(restriction) = restriction else {
                return Vec::new();
            };
            let values: Vec<String> = self
                .children(restriction)
                .filter(|(_, n)| n.kind == SchemaKind::Enumeration)
                .filter_map(|(_, n)| n.value.clone())
                .collect();
            if !values.is_empty() {
                return values;
            }
            current = match &self.node(restriction).base {
                Some(base) if !base.is_builtin() => self.simple_type(&base.local_name),
                _ => self
                    .child_of_kind(restriction, SchemaKind::SimpleType),
            };
        }
        Vec::new()
    }

    /// Dokumentationstext in der gewünschten Sprache.
    pub fn label(&self, id: SchemaNodeId, lang: Option<&str>) -> Option<&str> {
        let lang = lang?;
        self.node(id)
            .documentation
            .iter()
            .find(|d| d.lang.as_deref() == Some(lang))
            .map(|d| d.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(kind: SchemaKind, name: &str) -> SchemaNode {
        let mut n = SchemaNode::new(kind);
        n.name = Some(name.to_string());
        n
    }

    #[test]
    fn occurs_inheritance() {
        let own = Occurs { min: Some(0), max: None };
        let inherited = Occurs::new(1, MaxOccurs::Unbounded);
        let eff = own.or(inherited);
        assert_eq!(eff.min, Some(0));
        assert_eq!(eff.max, Some(MaxOccurs::Unbounded));
        assert_eq!(Occurs::default().min_or_default(), 1);
        assert_eq!(Occurs::default().max_or_default(), MaxOccurs::Bounded(1));
    }

    #[test]
    fn max_occurs_allows() {
        assert!(MaxOccurs::Bounded(2).allows(1));
        assert!(!MaxOccurs::Bounded(2).allows(2));
        assert!(MaxOccurs::Unbounded.allows(10_000));
        assert!(MaxOccurs::Bounded(2).exceeds(1));
        assert!(!MaxOccurs::Bounded(1).exceeds(1));
    }

    #[test]
    fn first_global_definition_wins() {
        let mut schema = Schema::new(None);
        let root = schema.root();
        let a = schema.push(named(SchemaKind::ComplexType, "t"), root);
        let b = schema.push(named(SchemaKind::ComplexType, "t"), root);
        assert!(schema.register_global(a));
        assert!(!schema.register_global(b));
        assert_eq!(schema.complex_type("t"), Some(a));
    }

    #[test]
    fn enumeration_follows_named_base() {
        let mut schema = Schema::new(None);
        let root = schema.root();
        let base = schema.push(named(SchemaKind::SimpleType, "base"), root);
        schema.register_global(base);
        let r = schema.push(SchemaNode::new(SchemaKind::Restriction), base);
        for v in ["a", "b"] {
            let mut e = SchemaNode::new(SchemaKind::Enumeration);
            e.value = Some(v.into());
            schema.push(e, r);
        }
        let derived = schema.push(named(SchemaKind::SimpleType, "derived"), root);
        let mut r2 = SchemaNode::new(SchemaKind::Restriction);
        r2.base = Some(TypeRef { local_name: "base".into(), namespace: None });
        schema.push(r2, derived);

        assert_eq!(schema.enumeration_values(derived), vec!["a", "b"]);
    }

    #[test]
    fn label_requires_matching_language() {
        let mut schema = Schema::new(None);
        let root = schema.root();
        let mut n = named(SchemaKind::Element, "title");
        n.documentation.push(Documentation { lang: Some("sv".into()), text: "Titel".into() });
        let id = schema.push(n, root);
        assert_eq!(schema.label(id, Some("sv")), Some("Titel"));
        assert_eq!(schema.label(id, Some("en")), None);
        assert_eq!(schema.label(id, None), None);
    }
}
