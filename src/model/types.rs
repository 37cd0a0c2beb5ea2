//! Declaration types: elements, attributes, complex and simple types, particles

use serde::Serialize;

/// `elementFormDefault` / `attributeFormDefault` / `form`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Form {
    Qualified,
    Unqualified,
}

impl Form {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "qualified" => Some(Form::Qualified),
            "unqualified" => Some(Form::Unqualified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Form::Qualified => "qualified",
            Form::Unqualified => "unqualified",
        }
    }
}

/// Upper bound of `maxOccurs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    pub fn parse(value: &str) -> Option<Self> {
        if value == "unbounded" {
            return Some(MaxOccurs::Unbounded);
        }
        value.trim().parse().ok().map(MaxOccurs::Bounded)
    }

    pub fn to_xsd(&self) -> String {
        match self {
            MaxOccurs::Bounded(n) => n.to_string(),
            MaxOccurs::Unbounded => "unbounded".to_string(),
        }
    }

    /// More than one occurrence allowed
    pub fn is_repeated(&self) -> bool {
        match self {
            MaxOccurs::Bounded(n) => *n > 1,
            MaxOccurs::Unbounded => true,
        }
    }
}

/// Occurrence constraints as written in the markup.
///
/// `None` means the attribute was absent (XSD default of 1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Occurs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<MaxOccurs>,
}

impl Occurs {
    pub fn new(min: Option<u32>, max: Option<MaxOccurs>) -> Self {
        Self { min, max }
    }

    pub fn is_optional(&self) -> bool {
        self.min == Some(0)
    }

    pub fn is_array(&self) -> bool {
        self.max.is_some_and(|m| m.is_repeated())
    }
}

/// Unsupported construct kept verbatim so it survives a write/parse round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opaque {
    /// Local name of the construct (`annotation`, `key`, ...)
    pub name: String,
    /// Raw markup as found in the source document
    pub xml: String,
}

/// Element declaration, top-level or local.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub occurs: Occurs,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitution_group: Option<String>,
    pub nillable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<Form>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complex_type: Option<Box<ComplexType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<Box<SimpleType>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
    /// Namespace of the declaring schema, stamped by the resolver when a
    /// declaration is merged into a schema with a different target namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Element {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Name as written, or the local part of the reference
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.reference.as_deref().map(crate::util::local_name))
            .unwrap_or("")
    }
}

/// `use` of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeUse {
    Optional,
    Required,
    Prohibited,
}

impl AttributeUse {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "optional" => Some(AttributeUse::Optional),
            "required" => Some(AttributeUse::Required),
            "prohibited" => Some(AttributeUse::Prohibited),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeUse::Optional => "optional",
            AttributeUse::Required => "required",
            AttributeUse::Prohibited => "prohibited",
        }
    }
}

/// Attribute declaration, top-level or local
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub usage: Option<AttributeUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<Form>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<Box<SimpleType>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
    /// See [`Element::namespace`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Attribute {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.reference.as_deref().map(crate::util::local_name))
            .unwrap_or("")
    }

    pub fn is_required(&self) -> bool {
        self.usage == Some(AttributeUse::Required)
    }
}

/// `xs:any` / `xs:anyAttribute`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wildcard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_contents: Option<String>,
    pub occurs: Occurs,
}

/// Item of an attribute list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeItem {
    Attribute(Attribute),
    /// `<xs:attributeGroup ref="..."/>`
    Group(String),
    Any(Wildcard),
}

/// `<xs:group ref="..."/>` inside a content model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    #[serde(rename = "ref")]
    pub reference: String,
    pub occurs: Occurs,
}

/// Content of a `sequence`, `choice` or `all`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelGroup {
    pub occurs: Occurs,
    pub particles: Vec<Particle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

/// Item of a content model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Particle {
    Element(Element),
    Sequence(ModelGroup),
    Choice(ModelGroup),
    All(ModelGroup),
    Group(GroupRef),
    Any(Wildcard),
}

impl Particle {
    pub fn occurs(&self) -> &Occurs {
        match self {
            Particle::Element(e) => &e.occurs,
            Particle::Sequence(g) | Particle::Choice(g) | Particle::All(g) => &g.occurs,
            Particle::Group(g) => &g.occurs,
            Particle::Any(w) => &w.occurs,
        }
    }
}

/// Named model group (`<xs:group name="...">`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle: Option<Particle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

/// Named attribute group (`<xs:attributeGroup name="...">`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeGroup {
    pub name: String,
    pub attributes: Vec<AttributeItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DerivationMethod {
    Extension,
    Restriction,
}

impl DerivationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivationMethod::Extension => "extension",
            DerivationMethod::Restriction => "restriction",
        }
    }
}

/// Constraining facet (`enumeration`, `pattern`, `maxLength`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub kind: String,
    pub value: String,
}

/// Body of `complexContent` / `simpleContent`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivation {
    pub method: DerivationMethod,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle: Option<Particle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    /// Annotations and inline simple types of the extension/restriction body
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

impl Derivation {
    pub fn extension(base: impl Into<String>) -> Self {
        Self {
            method: DerivationMethod::Extension,
            base: base.into(),
            particle: None,
            attributes: Vec::new(),
            facets: Vec::new(),
            opaque: Vec::new(),
        }
    }
}

/// Content model of a complex type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeContent {
    #[default]
    Empty,
    Particle(Particle),
    Complex(Derivation),
    Simple(Derivation),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub mixed: bool,
    pub content: TypeContent,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

impl ComplexType {
    /// The `complexContent` extension this type derives through, if any
    pub fn extension(&self) -> Option<&Derivation> {
        match &self.content {
            TypeContent::Complex(d) if d.method == DerivationMethod::Extension => Some(d),
            _ => None,
        }
    }

    /// Base type name of a `complexContent` or `simpleContent` derivation
    pub fn base_name(&self) -> Option<&str> {
        match &self.content {
            TypeContent::Complex(d) | TypeContent::Simple(d) => Some(d.base.as_str()),
            _ => None,
        }
    }

    pub fn has_simple_content(&self) -> bool {
        matches!(self.content, TypeContent::Simple(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SimpleVariety {
    Restriction {
        #[serde(skip_serializing_if = "Option::is_none")]
        base: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        inline_base: Option<Box<SimpleType>>,
        facets: Vec<Facet>,
        /// Annotations inside the restriction body
        #[serde(skip_serializing_if = "Vec::is_empty")]
        opaque: Vec<Opaque>,
    },
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        item_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        item: Option<Box<SimpleType>>,
    },
    Union {
        member_types: Vec<String>,
        members: Vec<SimpleType>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub variety: SimpleVariety,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opaque: Vec<Opaque>,
}

impl SimpleType {
    /// Literal values of `enumeration` facets (empty for open types)
    pub fn enumeration(&self) -> Vec<&str> {
        match &self.variety {
            SimpleVariety::Restriction { facets, .. } => facets
                .iter()
                .filter(|f| f.kind == "enumeration")
                .map(|f| f.value.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}
