//! [`Schema`] -> XSD markup

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Result, XsdError};
use crate::model::{
    Attribute, AttributeGroup, AttributeItem, ComplexType, Derivation, Element, Facet, GroupRef,
    ModelGroup, NamedGroup, Occurs, Opaque, Particle, Schema, SimpleType, SimpleVariety,
    TypeContent, Wildcard, XS_NAMESPACE,
};

/// Output options for the schema writer
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`
    pub xml_decl: bool,
    /// Indent nested elements by two spaces
    pub pretty: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            xml_decl: true,
            pretty: true,
        }
    }
}

/// Serialize a schema model back into XSD markup.
///
/// Linked dependencies are not inlined; directives are written with their
/// original `schemaLocation`.
pub fn write_schema(schema: &Schema, options: &WriteOptions) -> Result<String> {
    let writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    let xs = schema
        .xmlns
        .iter()
        .find(|(_, uri)| uri.as_str() == XS_NAMESPACE)
        .map(|(prefix, _)| prefix.clone());
    let declare_xs = xs.is_none();

    let mut out = SchemaWriter {
        writer,
        xs: xs.unwrap_or_else(|| free_xs_prefix(schema)),
    };

    if options.xml_decl {
        out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    if declare_xs {
        attrs.push((format!("xmlns:{}", out.xs), XS_NAMESPACE.to_string()));
    }
    for (prefix, uri) in &schema.xmlns {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        attrs.push((key, uri.clone()));
    }
    let mut plain = Attrs::default();
    plain.opt("targetNamespace", &schema.target_namespace);
    plain.opt_str(
        "elementFormDefault",
        schema.element_form_default.map(|f| f.as_str()),
    );
    plain.opt_str(
        "attributeFormDefault",
        schema.attribute_form_default.map(|f| f.as_str()),
    );
    attrs.extend(plain.0.into_iter().map(|(k, v)| (k.to_string(), v)));

    let tag = out.tag("schema");
    let mut start = BytesStart::new(tag.as_str());
    for (k, v) in &attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    out.emit(Event::Start(start))?;

    out.opaque_leading(&schema.opaque)?;
    for import in &schema.imports {
        let mut a = Attrs::default();
        a.opt("namespace", &import.namespace);
        a.opt("schemaLocation", &import.schema_location);
        out.empty("import", a)?;
    }
    for include in &schema.includes {
        let mut a = Attrs::default();
        a.set("schemaLocation", &include.schema_location);
        out.empty("include", a)?;
    }
    for redefine in &schema.redefines {
        let mut a = Attrs::default();
        a.set("schemaLocation", &redefine.schema_location);
        out.open("redefine", a)?;
        out.opaque_leading(&redefine.opaque)?;
        for st in &redefine.simple_types {
            out.simple_type(st)?;
        }
        for ct in &redefine.complex_types {
            out.complex_type(ct)?;
        }
        for group in &redefine.groups {
            out.named_group(group)?;
        }
        for group in &redefine.attribute_groups {
            out.attribute_group(group)?;
        }
        out.opaque_trailing(&redefine.opaque)?;
        out.close("redefine")?;
    }
    for st in &schema.simple_types {
        out.simple_type(st)?;
    }
    for ct in &schema.complex_types {
        out.complex_type(ct)?;
    }
    for group in &schema.groups {
        out.named_group(group)?;
    }
    for group in &schema.attribute_groups {
        out.attribute_group(group)?;
    }
    for attribute in &schema.attributes {
        out.attribute(attribute)?;
    }
    for element in &schema.elements {
        out.element(element)?;
    }
    out.opaque_trailing(&schema.opaque)?;
    out.close("schema")?;

    String::from_utf8(out.writer.into_inner()).map_err(|e| XsdError::Write {
        message: e.to_string(),
    })
}

/// `xs`, or the first of `xsd`, `xs1`, `xs2`, ... the document leaves unbound
fn free_xs_prefix(schema: &Schema) -> String {
    ["xs".to_string(), "xsd".to_string()]
        .into_iter()
        .chain((1..).map(|n| format!("xs{n}")))
        .find(|candidate| !schema.xmlns.contains_key(candidate))
        .unwrap_or_default()
}

/// Ordered attribute list of one start tag
#[derive(Default)]
struct Attrs(Vec<(&'static str, String)>);

impl Attrs {
    fn set(&mut self, key: &'static str, value: &str) {
        self.0.push((key, value.to_string()));
    }

    fn opt(&mut self, key: &'static str, value: &Option<String>) {
        if let Some(v) = value {
            self.set(key, v);
        }
    }

    fn opt_str(&mut self, key: &'static str, value: Option<&str>) {
        if let Some(v) = value {
            self.set(key, v);
        }
    }

    fn flag(&mut self, key: &'static str, value: bool) {
        if value {
            self.set(key, "true");
        }
    }

    fn occurs(&mut self, occurs: &Occurs) {
        if let Some(min) = occurs.min {
            self.set("minOccurs", &min.to_string());
        }
        if let Some(max) = occurs.max {
            self.set("maxOccurs", &max.to_xsd());
        }
    }
}

struct SchemaWriter {
    writer: Writer<Vec<u8>>,
    xs: String,
}

impl SchemaWriter {
    fn tag(&self, local: &str) -> String {
        if self.xs.is_empty() {
            local.to_string()
        } else {
            format!("{}:{}", self.xs, local)
        }
    }

    fn emit(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| XsdError::Write {
                message: e.to_string(),
            })
    }

    fn start_tag(&self, local: &str, attrs: Attrs) -> BytesStart<'static> {
        let mut start = BytesStart::new(self.tag(local));
        for (k, v) in &attrs.0 {
            start.push_attribute((*k, v.as_str()));
        }
        start
    }

    fn open(&mut self, local: &str, attrs: Attrs) -> Result<()> {
        let start = self.start_tag(local, attrs);
        self.emit(Event::Start(start))
    }

    fn empty(&mut self, local: &str, attrs: Attrs) -> Result<()> {
        let start = self.start_tag(local, attrs);
        self.emit(Event::Empty(start))
    }

    fn close(&mut self, local: &str) -> Result<()> {
        let tag = self.tag(local);
        self.emit(Event::End(BytesEnd::new(tag)))
    }

    fn raw(&mut self, opaque: &Opaque) -> Result<()> {
        self.emit(Event::Text(BytesText::from_escaped(opaque.xml.as_str())))
    }

    fn opaque_leading(&mut self, opaque: &[Opaque]) -> Result<()> {
        for o in opaque.iter().filter(|o| o.name == "annotation") {
            self.raw(o)?;
        }
        Ok(())
    }

    fn opaque_trailing(&mut self, opaque: &[Opaque]) -> Result<()> {
        for o in opaque.iter().filter(|o| o.name != "annotation") {
            self.raw(o)?;
        }
        Ok(())
    }

    fn element(&mut self, element: &Element) -> Result<()> {
        let mut a = Attrs::default();
        a.opt("name", &element.name);
        a.opt("ref", &element.reference);
        a.opt("type", &element.type_name);
        a.opt("substitutionGroup", &element.substitution_group);
        a.flag("abstract", element.is_abstract);
        a.flag("nillable", element.nillable);
        a.opt("default", &element.default);
        a.opt("fixed", &element.fixed);
        a.opt_str("form", element.form.map(|f| f.as_str()));
        a.opt("targetNamespace", &element.namespace);
        a.occurs(&element.occurs);

        let has_body = element.complex_type.is_some()
            || element.simple_type.is_some()
            || !element.opaque.is_empty();
        if !has_body {
            return self.empty("element", a);
        }
        self.open("element", a)?;
        self.opaque_leading(&element.opaque)?;
        if let Some(ct) = &element.complex_type {
            self.complex_type(ct)?;
        }
        if let Some(st) = &element.simple_type {
            self.simple_type(st)?;
        }
        self.opaque_trailing(&element.opaque)?;
        self.close("element")
    }

    fn complex_type(&mut self, ct: &ComplexType) -> Result<()> {
        let mut a = Attrs::default();
        a.opt("name", &ct.name);
        a.flag("abstract", ct.is_abstract);
        a.flag("mixed", ct.mixed);

        let has_body = !matches!(ct.content, TypeContent::Empty)
            || !ct.attributes.is_empty()
            || !ct.opaque.is_empty();
        if !has_body {
            return self.empty("complexType", a);
        }
        self.open("complexType", a)?;
        self.opaque_leading(&ct.opaque)?;
        match &ct.content {
            TypeContent::Empty => {}
            TypeContent::Particle(p) => self.particle(p)?,
            TypeContent::Complex(d) => self.derivation("complexContent", d)?,
            TypeContent::Simple(d) => self.derivation("simpleContent", d)?,
        }
        self.attribute_items(&ct.attributes)?;
        self.opaque_trailing(&ct.opaque)?;
        self.close("complexType")
    }

    fn derivation(&mut self, wrapper: &str, d: &Derivation) -> Result<()> {
        self.open(wrapper, Attrs::default())?;
        let mut a = Attrs::default();
        a.set("base", &d.base);
        let method = d.method.as_str();
        if d.particle.is_none()
            && d.attributes.is_empty()
            && d.facets.is_empty()
            && d.opaque.is_empty()
        {
            self.empty(method, a)?;
        } else {
            self.open(method, a)?;
            // Annotation and inline simple type, both ahead of the content
            for o in &d.opaque {
                self.raw(o)?;
            }
            if let Some(p) = &d.particle {
                self.particle(p)?;
            }
            self.facets(&d.facets)?;
            self.attribute_items(&d.attributes)?;
            self.close(method)?;
        }
        self.close(wrapper)
    }

    fn facets(&mut self, facets: &[Facet]) -> Result<()> {
        for facet in facets {
            let mut a = Attrs::default();
            a.set("value", &facet.value);
            self.empty(&facet.kind, a)?;
        }
        Ok(())
    }

    fn particle(&mut self, particle: &Particle) -> Result<()> {
        match particle {
            Particle::Element(e) => self.element(e),
            Particle::Sequence(g) => self.model_group("sequence", g),
            Particle::Choice(g) => self.model_group("choice", g),
            Particle::All(g) => self.model_group("all", g),
            Particle::Group(g) => self.group_ref(g),
            Particle::Any(w) => self.wildcard("any", w),
        }
    }

    fn model_group(&mut self, local: &str, group: &ModelGroup) -> Result<()> {
        let mut a = Attrs::default();
        a.occurs(&group.occurs);
        if group.particles.is_empty() && group.opaque.is_empty() {
            return self.empty(local, a);
        }
        self.open(local, a)?;
        self.opaque_leading(&group.opaque)?;
        for p in &group.particles {
            self.particle(p)?;
        }
        self.opaque_trailing(&group.opaque)?;
        self.close(local)
    }

    fn group_ref(&mut self, group: &GroupRef) -> Result<()> {
        let mut a = Attrs::default();
        a.set("ref", &group.reference);
        a.occurs(&group.occurs);
        self.empty("group", a)
    }

    fn wildcard(&mut self, local: &str, w: &Wildcard) -> Result<()> {
        let mut a = Attrs::default();
        a.opt("namespace", &w.namespace);
        a.opt("processContents", &w.process_contents);
        a.occurs(&w.occurs);
        self.empty(local, a)
    }

    fn named_group(&mut self, group: &NamedGroup) -> Result<()> {
        let mut a = Attrs::default();
        a.set("name", &group.name);
        if group.particle.is_none() && group.opaque.is_empty() {
            return self.empty("group", a);
        }
        self.open("group", a)?;
        self.opaque_leading(&group.opaque)?;
        if let Some(p) = &group.particle {
            self.particle(p)?;
        }
        self.opaque_trailing(&group.opaque)?;
        self.close("group")
    }

    fn attribute_group(&mut self, group: &AttributeGroup) -> Result<()> {
        let mut a = Attrs::default();
        a.set("name", &group.name);
        if group.attributes.is_empty() && group.opaque.is_empty() {
            return self.empty("attributeGroup", a);
        }
        self.open("attributeGroup", a)?;
        self.opaque_leading(&group.opaque)?;
        self.attribute_items(&group.attributes)?;
        self.opaque_trailing(&group.opaque)?;
        self.close("attributeGroup")
    }

    fn attribute_items(&mut self, items: &[AttributeItem]) -> Result<()> {
        for item in items {
            match item {
                AttributeItem::Attribute(attr) => self.attribute(attr)?,
                AttributeItem::Group(reference) => {
                    let mut a = Attrs::default();
                    a.set("ref", reference);
                    self.empty("attributeGroup", a)?;
                }
                AttributeItem::Any(w) => self.wildcard("anyAttribute", w)?,
            }
        }
        Ok(())
    }

    fn attribute(&mut self, attr: &Attribute) -> Result<()> {
        let mut a = Attrs::default();
        a.opt("name", &attr.name);
        a.opt("ref", &attr.reference);
        a.opt("type", &attr.type_name);
        a.opt_str("use", attr.usage.map(|u| u.as_str()));
        a.opt("default", &attr.default);
        a.opt("fixed", &attr.fixed);
        a.opt_str("form", attr.form.map(|f| f.as_str()));
        a.opt("targetNamespace", &attr.namespace);
        if attr.simple_type.is_none() && attr.opaque.is_empty() {
            return self.empty("attribute", a);
        }
        self.open("attribute", a)?;
        self.opaque_leading(&attr.opaque)?;
        if let Some(st) = &attr.simple_type {
            self.simple_type(st)?;
        }
        self.opaque_trailing(&attr.opaque)?;
        self.close("attribute")
    }

    fn simple_type(&mut self, st: &SimpleType) -> Result<()> {
        let mut a = Attrs::default();
        a.opt("name", &st.name);
        self.open("simpleType", a)?;
        self.opaque_leading(&st.opaque)?;
        match &st.variety {
            SimpleVariety::Restriction {
                base,
                inline_base,
                facets,
                opaque,
            } => {
                let mut a = Attrs::default();
                a.opt("base", base);
                if inline_base.is_none() && facets.is_empty() && opaque.is_empty() {
                    self.empty("restriction", a)?;
                } else {
                    self.open("restriction", a)?;
                    self.opaque_leading(opaque)?;
                    if let Some(inner) = inline_base {
                        self.simple_type(inner)?;
                    }
                    self.facets(facets)?;
                    self.opaque_trailing(opaque)?;
                    self.close("restriction")?;
                }
            }
            SimpleVariety::List { item_type, item } => {
                let mut a = Attrs::default();
                a.opt("itemType", item_type);
                match item {
                    None => self.empty("list", a)?,
                    Some(inner) => {
                        self.open("list", a)?;
                        self.simple_type(inner)?;
                        self.close("list")?;
                    }
                }
            }
            SimpleVariety::Union {
                member_types,
                members,
            } => {
                let mut a = Attrs::default();
                if !member_types.is_empty() {
                    a.set("memberTypes", &member_types.join(" "));
                }
                if members.is_empty() {
                    self.empty("union", a)?;
                } else {
                    self.open("union", a)?;
                    for m in members {
                        self.simple_type(m)?;
                    }
                    self.close("union")?;
                }
            }
        }
        self.opaque_trailing(&st.opaque)?;
        self.close("simpleType")
    }
}
