//! XML Schema validation for XML queries.
//!
//! Understands the subset of XML Schema that query schemas use: global and
//! local `element` declarations (`name`, `ref`, `type`), named and inline
//! `complexType`s, `sequence`/`choice`/`all` groups with occurrence bounds,
//! `attribute` declarations with `use="required"`, `anyAttribute`, `any`,
//! `simpleContent` extensions and `mixed` content. Children must follow the
//! order of a `sequence` and pick a single branch of a `choice`, unless an
//! enclosing group repeats.

use super::{SchemaError, SchemaLoader, SchemaValidator, ValidationOutcome};
use crate::xml::{parse_document, XmlElement};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Validates XML input against an XML Schema document
pub struct XmlSchemaValidator {
    loader: Arc<dyn SchemaLoader>,
}

impl XmlSchemaValidator {
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl SchemaValidator for XmlSchemaValidator {
    fn name(&self) -> &'static str {
        "xml-schema"
    }

    async fn validate(
        &self,
        input: &str,
        reference: &str,
    ) -> Result<ValidationOutcome, SchemaError> {
        let document = self.loader.load(reference).await?;
        let schema = XsdSchema::parse(&document).map_err(|message| SchemaError::Invalid {
            reference: reference.to_string(),
            message,
        })?;
        let outcome = schema.validate(input);
        debug!(
            "XML schema check found {} violation(s)",
            outcome.violations().len()
        );
        Ok(outcome)
    }
}

// ============================================================================
// Schema model
// ============================================================================

#[derive(Debug, Clone)]
enum TypeRef {
    /// No type given: anything goes
    Any,
    /// Built-in or simple type: text only, no attributes, no children
    Simple,
    Named(String),
    Inline(Box<ComplexType>),
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    type_ref: TypeRef,
}

#[derive(Debug, Clone)]
enum ParticleTarget {
    Local(ElementDecl),
    Ref(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Sequence,
    Choice,
    All,
}

/// Position of a particle inside one of its enclosing groups
#[derive(Debug, Clone, Copy)]
struct GroupStep {
    group: usize,
    kind: GroupKind,
    slot: usize,
    /// The group, or one around it, may occur more than once
    repeated: bool,
}

#[derive(Debug, Clone)]
struct Particle {
    target: ParticleTarget,
    min: u32,
    /// `None` means unbounded
    max: Option<u32>,
    /// Enclosing groups, outermost first
    steps: Vec<GroupStep>,
}

enum Conflict {
    OutOfOrder,
    Exclusive,
}

impl Particle {
    /// How a child matching `self` clashes with a later child matching `later`
    fn conflict(&self, later: &Particle) -> Option<Conflict> {
        for (a, b) in self.steps.iter().zip(&later.steps) {
            if a.group != b.group {
                return None;
            }
            if a.slot == b.slot {
                continue;
            }
            if a.repeated {
                return None;
            }
            return match a.kind {
                GroupKind::Sequence if b.slot < a.slot => Some(Conflict::OutOfOrder),
                GroupKind::Choice => Some(Conflict::Exclusive),
                _ => None,
            };
        }
        None
    }
}

#[derive(Debug, Clone)]
struct AttributeDecl {
    name: String,
    required: bool,
}

#[derive(Debug, Clone, Default)]
struct ComplexType {
    attributes: Vec<AttributeDecl>,
    any_attribute: bool,
    particles: Vec<Particle>,
    any_children: bool,
    text_allowed: bool,
    groups: usize,
}

/// Occurrence context inherited from enclosing groups
#[derive(Debug, Clone, Copy)]
struct GroupContext {
    optional: bool,
    repeated: bool,
}

#[derive(Debug, Default)]
struct XsdSchema {
    elements: HashMap<String, ElementDecl>,
    types: HashMap<String, ComplexType>,
}

fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn parse_occurs(value: Option<&str>, default: u32) -> Result<Option<u32>, String> {
    match value {
        None => Ok(Some(default)),
        Some("unbounded") => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("invalid occurrence bound '{}'", v)),
    }
}

impl XsdSchema {
    fn parse(document: &str) -> Result<Self, String> {
        let root = parse_document(document).map_err(|e| e.to_string())?;
        if root.name != "schema" {
            return Err(format!("expected <schema> root element, found <{}>", root.name));
        }

        let mut schema = XsdSchema::default();
        for child in &root.children {
            match child.name.as_str() {
                "element" => {
                    let decl = parse_element_decl(child)?;
                    schema.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    let name = child
                        .attr("name")
                        .ok_or("top-level complexType without a name")?;
                    schema.types.insert(name.to_string(), parse_complex_type(child)?);
                }
                _ => {}
            }
        }
        if schema.elements.is_empty() {
            return Err("schema declares no elements".to_string());
        }
        Ok(schema)
    }

    fn validate(&self, input: &str) -> ValidationOutcome {
        let root = match parse_document(input) {
            Ok(root) => root,
            Err(e) => return ValidationOutcome::Invalid(vec![e.to_string()]),
        };

        let mut violations = Vec::new();
        match self.elements.get(&root.name) {
            Some(decl) => self.check_element(&root, decl, &mut violations),
            None => violations.push(format!(
                "line {}: Cannot find the declaration of element '{}'",
                root.line, root.name
            )),
        }
        ValidationOutcome::from_violations(violations)
    }

    fn resolve<'a>(&'a self, type_ref: &'a TypeRef) -> Option<&'a ComplexType> {
        match type_ref {
            TypeRef::Inline(ct) => Some(ct.as_ref()),
            TypeRef::Named(name) => self.types.get(name),
            TypeRef::Any | TypeRef::Simple => None,
        }
    }

    fn particle_decl<'a>(&'a self, particle: &'a Particle) -> Option<&'a ElementDecl> {
        match &particle.target {
            ParticleTarget::Local(decl) => Some(decl),
            ParticleTarget::Ref(name) => self.elements.get(name),
        }
    }

    fn check_element(&self, element: &XmlElement, decl: &ElementDecl, out: &mut Vec<String>) {
        let line = element.line;
        let name = &element.name;

        if matches!(decl.type_ref, TypeRef::Any) {
            return;
        }
        let Some(ct) = self.resolve(&decl.type_ref) else {
            // Simple content
            for (attr, _) in &element.attributes {
                out.push(format!(
                    "line {}: Attribute '{}' is not allowed to appear in element '{}'",
                    line, attr, name
                ));
            }
            if let Some(child) = element.children.first() {
                out.push(format!(
                    "line {}: Element '{}' must have no element children, but found '{}'",
                    child.line, name, child.name
                ));
            }
            return;
        };

        for (attr, _) in &element.attributes {
            let declared = ct.attributes.iter().any(|a| &a.name == attr);
            if !declared && !ct.any_attribute {
                out.push(format!(
                    "line {}: Attribute '{}' is not allowed to appear in element '{}'",
                    line, attr, name
                ));
            }
        }
        for required in ct.attributes.iter().filter(|a| a.required) {
            if element.attr(&required.name).is_none() {
                out.push(format!(
                    "line {}: Attribute '{}' must appear on element '{}'",
                    line, required.name, name
                ));
            }
        }

        if !ct.text_allowed && !element.text.trim().is_empty() {
            out.push(format!(
                "line {}: Element '{}' cannot have character children",
                line, name
            ));
        }

        let mut counts: Vec<u32> = vec![0; ct.particles.len()];
        let mut previous: Option<(usize, &XmlElement)> = None;
        for child in &element.children {
            let matched = ct.particles.iter().enumerate().find_map(|(i, p)| {
                self.particle_decl(p)
                    .filter(|d| d.name == child.name)
                    .map(|d| (i, d))
            });
            match matched {
                Some((i, child_decl)) => {
                    if let Some((j, before)) = previous {
                        match ct.particles[j].conflict(&ct.particles[i]) {
                            Some(Conflict::OutOfOrder) => out.push(format!(
                                "line {}: Invalid content: element '{}' must not appear after element '{}' in element '{}'",
                                child.line, child.name, before.name, name
                            )),
                            Some(Conflict::Exclusive) => out.push(format!(
                                "line {}: Invalid content: element '{}' cannot appear together with element '{}' in element '{}'",
                                child.line, child.name, before.name, name
                            )),
                            None => {}
                        }
                    }
                    previous = Some((i, child));
                    counts[i] += 1;
                    self.check_element(child, child_decl, out);
                }
                None if ct.any_children => {}
                None => out.push(format!(
                    "line {}: Invalid content: element '{}' is not allowed in element '{}'",
                    child.line, child.name, name
                )),
            }
        }

        for (particle, count) in ct.particles.iter().zip(counts) {
            let child_name = match self.particle_decl(particle) {
                Some(d) => d.name.as_str(),
                None => continue,
            };
            if let Some(max) = particle.max {
                if count > max {
                    out.push(format!(
                        "line {}: Element '{}' may appear at most {} time(s) in element '{}', found {}",
                        line, child_name, max, name, count
                    ));
                }
            }
            if count < particle.min {
                out.push(format!(
                    "line {}: Element '{}' is missing required child element '{}'",
                    line, name, child_name
                ));
            }
        }
    }
}

fn parse_element_decl(node: &XmlElement) -> Result<ElementDecl, String> {
    let name = node
        .attr("name")
        .ok_or("element declaration without a name")?
        .to_string();

    let type_ref = if let Some(type_name) = node.attr("type") {
        if type_name.starts_with("xs:") || type_name.starts_with("xsd:") {
            TypeRef::Simple
        } else {
            TypeRef::Named(local(type_name).to_string())
        }
    } else if let Some(ct) = node.children_named("complexType").next() {
        TypeRef::Inline(Box::new(parse_complex_type(ct)?))
    } else if node.children_named("simpleType").next().is_some() {
        TypeRef::Simple
    } else {
        TypeRef::Any
    };

    Ok(ElementDecl { name, type_ref })
}

fn parse_complex_type(node: &XmlElement) -> Result<ComplexType, String> {
    let mut ct = ComplexType {
        text_allowed: node.attr("mixed") == Some("true"),
        ..Default::default()
    };
    collect_type_content(node, &mut ct)?;
    Ok(ct)
}

fn collect_type_content(node: &XmlElement, ct: &mut ComplexType) -> Result<(), String> {
    let top = GroupContext {
        optional: false,
        repeated: false,
    };
    for child in &node.children {
        match child.name.as_str() {
            "attribute" => ct.attributes.push(AttributeDecl {
                name: child
                    .attr("name")
                    .or_else(|| child.attr("ref").map(local))
                    .ok_or("attribute declaration without a name")?
                    .to_string(),
                required: child.attr("use") == Some("required"),
            }),
            "anyAttribute" => ct.any_attribute = true,
            "sequence" => collect_particles(child, top, GroupKind::Sequence, &[], ct)?,
            "all" => collect_particles(child, top, GroupKind::All, &[], ct)?,
            "choice" => collect_particles(child, top, GroupKind::Choice, &[], ct)?,
            "simpleContent" => {
                ct.text_allowed = true;
                for ext in &child.children {
                    collect_type_content(ext, ct)?;
                }
            }
            "complexContent" => {
                for ext in &child.children {
                    collect_type_content(ext, ct)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn collect_particles(
    group: &XmlElement,
    outer: GroupContext,
    kind: GroupKind,
    steps: &[GroupStep],
    ct: &mut ComplexType,
) -> Result<(), String> {
    let group_min = parse_occurs(group.attr("minOccurs"), 1)?.unwrap_or(1);
    let group_max = parse_occurs(group.attr("maxOccurs"), 1)?;
    let context = GroupContext {
        optional: outer.optional || group_min == 0 || kind == GroupKind::Choice,
        repeated: outer.repeated || group_max.map_or(true, |m| m > 1),
    };
    let id = ct.groups;
    ct.groups += 1;

    for (slot, child) in group.children.iter().enumerate() {
        let mut here = steps.to_vec();
        here.push(GroupStep {
            group: id,
            kind,
            slot,
            repeated: context.repeated,
        });
        match child.name.as_str() {
            "element" => {
                let min = parse_occurs(child.attr("minOccurs"), 1)?.unwrap_or(1);
                let max = parse_occurs(child.attr("maxOccurs"), 1)?;
                let target = match child.attr("ref") {
                    Some(r) => ParticleTarget::Ref(local(r).to_string()),
                    None => ParticleTarget::Local(parse_element_decl(child)?),
                };
                ct.particles.push(Particle {
                    target,
                    min: if context.optional { 0 } else { min },
                    max: if context.repeated { None } else { max },
                    steps: here,
                });
            }
            "any" => ct.any_children = true,
            "sequence" => collect_particles(child, context, GroupKind::Sequence, &here, ct)?,
            "all" => collect_particles(child, context, GroupKind::All, &here, ct)?,
            "choice" => collect_particles(child, context, GroupKind::Choice, &here, ct)?,
            _ => {}
        }
    }
    Ok(())
}
