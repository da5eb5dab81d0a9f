//! Schema Walker.
//!
//! Interpretiert Schema-Konstrukte rekursiv und entscheidet pro Konstrukt,
//! ob ein Eingabefeld, ein Fieldset oder nur ein Add-Control entsteht.
//!
//! Regeln:
//! - `minOccurs="0"` und jede Choice-Alternative: nur Add-Control,
//!   Expansion erst bei Aktivierung.
//! - Pflicht-Elemente: `minOccurs` Instanzen, dazu ein Add-Control wenn
//!   `maxOccurs` mehr zulässt.
//! - sequence/group/choice reichen ihre Bounds an Kinder weiter; bereits
//!   gesetzte Bounds des Aufrufers gewinnen, eigene Bounds eines Elements
//!   gewinnen immer.
//! - extension/restriction: Base-Inhalt zuerst, dann eigener Inhalt.
//!
//! Nicht auflösbare Referenzen werden als Diagnose gemeldet; nur der
//! betroffene Zweig entfällt.

use crate::error::{Error, ReferenceKind, Result};
use crate::form::{ChoiceTag, Expansion, FieldId, FieldKind};
use crate::schema::{MaxOccurs, Occurs, SchemaKind, SchemaNodeId};
use crate::session::FormSession;

/// Kontext eines Walker-Aufrufs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WalkContext {
    /// Verschachtelungstiefe der Fieldsets.
    pub level: usize,
    /// Fieldset, unter dem gerendert wird (None = Wurzel).
    pub parent: Option<FieldId>,
    /// Geerbte Occurrence-Bounds.
    pub occurs: Occurs,
    /// Choice-Zugehörigkeit, wird an verschachtelte Konstrukte vererbt.
    pub choice: Option<ChoiceTag>,
    /// Einfügen hinter diesem Geschwister statt vor dem Add-Control.
    pub after: Option<FieldId>,
}

impl WalkContext {
    pub(crate) fn root() -> Self {
        Self {
            level: 0,
            parent: None,
            occurs: Occurs::new(1, MaxOccurs::Bounded(1)),
            choice: None,
            after: None,
        }
    }

    /// Kontext für den Inhalt eines neu gerenderten Fieldsets.
    fn inside(&self, field: FieldId) -> Self {
        Self {
            level: self.level + 1,
            parent: Some(field),
            occurs: Occurs::default(),
            choice: None,
            after: None,
        }
    }

    fn with_occurs(self, occurs: Occurs) -> Self {
        Self { occurs, ..self }
    }

    fn with_choice(self, choice: ChoiceTag) -> Self {
        Self { choice: Some(choice), ..self }
    }
}

/// Aufgelöster Typ einer Element-Deklaration.
enum ElementType {
    Builtin,
    Simple(SchemaNodeId),
    Complex(SchemaNodeId),
}

impl<'s> FormSession<'s> {
    /// Instanziiert das Root-Element (immer genau einmal, ohne Add-Control).
    pub(crate) fn walk_root(&mut self, element: SchemaNodeId, ctx: &WalkContext) -> Result<FieldId> {
        let before = self.diagnostics.len();
        match self.instantiate_element(element, ctx, None, (1, MaxOccurs::Bounded(1)), true) {
            Some(id) => Ok(id),
            None => Err(self
                .diagnostics
                .get(before)
                .cloned()
                .unwrap_or(Error::NoRootElement)),
        }
    }

    pub(crate) fn walk_particle(&mut self, id: SchemaNodeId, ctx: &WalkContext) {
        match self.schema.node(id).kind {
            SchemaKind::Element => self.walk_element(id, ctx),
            SchemaKind::Sequence | SchemaKind::All => self.walk_sequence(id, ctx),
            SchemaKind::Choice => self.walk_choice(id, ctx),
            SchemaKind::Group => self.walk_group(id, ctx),
            SchemaKind::Any => log::debug!("xs:any has no form representation, skipped"),
            _ => {}
        }
    }

    fn walk_element(&mut self, id: SchemaNodeId, ctx: &WalkContext) {
        let schema = self.schema;
        let Some(decl) = self.resolve_element(id) else {
            return;
        };
        if let Some(type_name) = self.ignored_type_of(decl) {
            log::debug!("element '{}' skipped (ignored type '{type_name}')", schema.node(decl).display_name());
            return;
        }

        let occurs = schema.node(id).occurs.or(ctx.occurs);
        let min = occurs.min_or_default();
        let max = occurs.max_or_default();

        if ctx.choice.is_some() || min == 0 {
            let expansion = Expansion { element: decl, min, max, floor: 0, level: ctx.level };
            self.render_add_control(decl, ctx, expansion);
            return;
        }

        let limit = self.options.max_instances();
        if min > limit {
            let element = schema.node(decl).display_name().to_string();
            self.report(Error::OccursLimit { element, min, limit });
            return;
        }

        let control = max.exceeds(min).then(|| {
            let expansion = Expansion { element: decl, min, max, floor: min, level: ctx.level };
            self.render_add_control(decl, ctx, expansion)
        });
        for _ in 0..min {
            if self.instantiate_element(decl, ctx, control, (min, max), true).is_none() {
                break;
            }
        }
        if let Some(control) = control {
            self.refresh_control(control);
        }
    }

    fn walk_sequence(&mut self, id: SchemaNodeId, ctx: &WalkContext) {
        let schema = self.schema;
        let inner = ctx.with_occurs(ctx.occurs.or(schema.node(id).occurs));
        for (child, node) in schema.children(id) {
            if node.kind.is_particle() {
                self.walk_particle(child, &inner);
            }
        }
    }

    /// Jede Alternative wird zum Add-Control mit Choice-Tag.
    fn walk_choice(&mut self, id: SchemaNodeId, ctx: &WalkContext) {
        let schema = self.schema;
        let group = self.next_choice_group();
        let inner = ctx.with_occurs(ctx.occurs.or(schema.node(id).occurs));
        let alternatives = schema.children(id).filter(|(_, n)| n.kind.is_particle());
        for (alternative, (child, _)) in alternatives.enumerate() {
            let tag = ctx.choice.unwrap_or(ChoiceTag { group, alternative: alternative as u32 });
            self.walk_particle(child, &inner.with_choice(tag));
        }
    }

    fn walk_group(&mut self, id: SchemaNodeId, ctx: &WalkContext) {
        let schema = self.schema;
        let site = schema.node(id);
        let definition = match &site.reference {
            Some(r) if self.options.is_ignored(&r.local_name) => {
                log::debug!("group '{}' skipped (ignored)", r.local_name);
                return;
            }
            Some(r) => match schema.group(&r.local_name) {
                Some(g) => g,
                None => {
                    self.report(Error::unresolved(ReferenceKind::Group, &r.local_name));
                    return;
                }
            },
            None => id,
        };
        if !self.enter(definition, site.display_name(), ctx.level) {
            return;
        }
        let inner = ctx.with_occurs(ctx.occurs.or(site.occurs));
        for (child, node) in schema.children(definition) {
            if node.kind.is_particle() {
                self.walk_particle(child, &inner);
            }
        }
        self.leave(definition);
    }

    /// Materialisiert eine Instanz eines Elements.
    pub(crate) fn instantiate_element(
        &mut self,
        decl: SchemaNodeId,
        ctx: &WalkContext,
        control: Option<FieldId>,
        bounds: (u32, MaxOccurs),
        required: bool,
    ) -> Option<FieldId> {
        let schema = self.schema;
        if ctx.level >= self.options.max_depth() {
            self.report(Error::RecursionLimit {
                element: schema.node(decl).display_name().to_string(),
                depth: ctx.level,
            });
            return None;
        }

        match self.element_type(decl) {
            Err(e) => {
                self.report(e);
                None
            }
            Ok(ElementType::Builtin) => {
                Some(self.render_terminal(decl, ctx, control, bounds, required, Vec::new()))
            }
            Ok(ElementType::Simple(st)) => {
                let options = schema.enumeration_values(st);
                Some(self.render_terminal(decl, ctx, control, bounds, required, options))
            }
            Ok(ElementType::Complex(ct)) => {
                self.expand_complex_type(decl, ct, ctx, control, bounds, required)
            }
        }
    }

    fn resolve_element(&mut self, id: SchemaNodeId) -> Option<SchemaNodeId> {
        let schema = self.schema;
        match &schema.node(id).reference {
            Some(r) => match schema.global_element(&r.local_name) {
                Some(decl) => Some(decl),
                None => {
                    self.report(Error::unresolved(ReferenceKind::Element, &r.local_name));
                    None
                }
            },
            None => Some(id),
        }
    }

    fn ignored_type_of(&self, decl: SchemaNodeId) -> Option<&'s str> {
        let type_ref = self.schema.node(decl).type_ref.as_ref()?;
        (!type_ref.is_builtin() && self.options.is_ignored(&type_ref.local_name))
            .then_some(type_ref.local_name.as_str())
    }

    /// Reihenfolge: inline complexType, inline simpleType, Built-in, benannter
    /// Complex Type, benannter Simple Type.
    fn element_type(&self, decl: SchemaNodeId) -> Result<ElementType> {
        let schema = self.schema;
        if let Some(ct) = schema.child_of_kind(decl, SchemaKind::ComplexType) {
            return Ok(ElementType::Complex(ct));
        }
        if let Some(st) = schema.child_of_kind(decl, SchemaKind::SimpleType) {
            return Ok(ElementType::Simple(st));
        }
        match &schema.node(decl).type_ref {
            None => Ok(ElementType::Builtin),
            Some(t) if t.is_builtin() => Ok(ElementType::Builtin),
            Some(t) => schema
                .complex_type(&t.local_name)
                .map(ElementType::Complex)
                .or_else(|| schema.simple_type(&t.local_name).map(ElementType::Simple))
                .ok_or_else(|| Error::unresolved(ReferenceKind::Type, &t.local_name)),
        }
    }

    /// Complex Types mit strukturellen Kindern werden zum Fieldset, alle
    /// anderen zu einem einzelnen Eingabefeld mit Attributen.
    fn expand_complex_type(
        &mut self,
        decl: SchemaNodeId,
        ct: SchemaNodeId,
        ctx: &WalkContext,
        control: Option<FieldId>,
        bounds: (u32, MaxOccurs),
        required: bool,
    ) -> Option<FieldId> {
        let schema = self.schema;
        let no_input = schema.node(decl).hints.no_input_field;
        let structural = schema.children(ct).any(|(_, n)| n.kind.is_structural());

        if !structural {
            let field = if no_input {
                self.render_fieldset(decl, ctx, control, bounds, required, false)
            } else {
                self.render_terminal(decl, ctx, control, bounds, required, Vec::new())
            };
            self.collect_attributes(ct, field, false);
            return Some(field);
        }

        let mixed = schema.node(ct).mixed && !no_input;
        let field = self.render_fieldset(decl, ctx, control, bounds, required, mixed);
        let inner = ctx.inside(field);
        self.expand_type_content(ct, field, &inner, no_input, true);
        self.collapse_text_only(field);
        Some(field)
    }

    /// Rendert Attribute und Particles eines Complex Types in `field`.
    fn expand_type_content(
        &mut self,
        type_id: SchemaNodeId,
        field: FieldId,
        inner: &WalkContext,
        no_input: bool,
        particles: bool,
    ) {
        let schema = self.schema;
        for (child, node) in schema.children(type_id) {
            match node.kind {
                SchemaKind::Sequence | SchemaKind::Choice | SchemaKind::All | SchemaKind::Group => {
                    if particles {
                        self.walk_particle(child, inner);
                    }
                }
                SchemaKind::SimpleContent | SchemaKind::ComplexContent => {
                    if node.mixed && !no_input {
                        self.enable_text(field, Vec::new());
                    }
                    let simple = node.kind == SchemaKind::SimpleContent;
                    let derivations: Vec<SchemaNodeId> = schema
                        .children(child)
                        .filter(|(_, n)| matches!(n.kind, SchemaKind::Extension | SchemaKind::Restriction))
                        .map(|(d, _)| d)
                        .collect();
                    for d in derivations {
                        self.expand_derivation(d, field, inner, simple, no_input, particles);
                    }
                }
                SchemaKind::Attribute | SchemaKind::AttributeGroup => {
                    self.collect_attribute(child, field, false);
                }
                _ => {}
            }
        }
    }

    /// extension/restriction: Base-Typ inline, danach eigener Inhalt.
    ///
    /// Eine complexContent-Restriction mit eigenen Particles ersetzt die
    /// Particles der Base; Attribute der Base bleiben erhalten.
    fn expand_derivation(
        &mut self,
        derivation: SchemaNodeId,
        field: FieldId,
        inner: &WalkContext,
        simple_content: bool,
        no_input: bool,
        particles: bool,
    ) {
        let schema = self.schema;
        let node = schema.node(derivation);
        let restriction = node.kind == SchemaKind::Restriction;
        let own_particles = schema.children(derivation).any(|(_, n)| n.kind.is_particle());

        if let Some(base) = &node.base {
            if base.is_builtin() {
                if simple_content && !no_input {
                    self.enable_text(field, Vec::new());
                }
            } else if self.options.is_ignored(&base.local_name) {
                log::debug!("base type '{}' skipped (ignored)", base.local_name);
            } else if let Some(base_ct) = schema.complex_type(&base.local_name) {
                if self.enter(base_ct, &base.local_name, inner.level) {
                    let base_particles = particles && !(restriction && own_particles);
                    self.expand_type_content(base_ct, field, inner, no_input, base_particles);
                    self.leave(base_ct);
                }
            } else if let Some(st) = schema.simple_type(&base.local_name) {
                if !no_input {
                    self.enable_text(field, schema.enumeration_values(st));
                }
            } else {
                self.report(Error::unresolved(ReferenceKind::Type, &base.local_name));
            }
        }

        if simple_content && restriction && !no_input {
            let facets = schema.enumeration_values(derivation);
            if !facets.is_empty() {
                self.enable_text(field, facets);
            }
        }

        for (child, n) in schema.children(derivation) {
            match n.kind {
                SchemaKind::Sequence | SchemaKind::Choice | SchemaKind::All | SchemaKind::Group => {
                    if particles {
                        self.walk_particle(child, inner);
                    }
                }
                SchemaKind::Attribute | SchemaKind::AttributeGroup => {
                    self.collect_attribute(child, field, restriction);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn collect_attributes(&mut self, owner: SchemaNodeId, field: FieldId, restriction: bool) {
        let schema = self.schema;
        for (child, node) in schema.children(owner) {
            if matches!(node.kind, SchemaKind::Attribute | SchemaKind::AttributeGroup) {
                self.collect_attribute(child, field, restriction);
            }
        }
    }

    fn collect_attribute(&mut self, id: SchemaNodeId, field: FieldId, restriction: bool) {
        let schema = self.schema;
        let node = schema.node(id);
        match node.kind {
            SchemaKind::Attribute => self.render_attribute(id, field, restriction),
            SchemaKind::AttributeGroup => {
                let definition = match &node.reference {
                    Some(r) if self.options.is_ignored(&r.local_name) => {
                        log::debug!("attributeGroup '{}' skipped (ignored)", r.local_name);
                        return;
                    }
                    Some(r) => match schema.attribute_group(&r.local_name) {
                        Some(g) => g,
                        None => {
                            self.report(Error::unresolved(ReferenceKind::AttributeGroup, &r.local_name));
                            return;
                        }
                    },
                    None => id,
                };
                let level = self.field(field).map(|f| f.level).unwrap_or_default();
                if self.enter(definition, node.display_name(), level) {
                    self.collect_attributes(definition, field, restriction);
                    self.leave(definition);
                }
            }
            _ => {}
        }
    }

    /// Gibt dem Feld einen Text-Slot (mixed oder simpleContent).
    fn enable_text(&mut self, field: FieldId, options: Vec<String>) {
        if let Ok(node) = self.field_mut(field) {
            node.text = true;
            if !options.is_empty() {
                node.options = options;
            }
        }
    }

    /// Ein Fieldset ohne Kinder, aber mit Text-Slot wird zum Input/Select.
    fn collapse_text_only(&mut self, field: FieldId) {
        if let Ok(node) = self.field_mut(field)
            && node.kind == FieldKind::Fieldset
            && node.text
            && node.children.is_empty()
        {
            node.kind = if node.options.is_empty() { FieldKind::Input } else { FieldKind::Select };
        }
    }

    /// Zyklus-Schutz für Groups, AttributeGroups und Base-Types.
    fn enter(&mut self, definition: SchemaNodeId, name: &str, level: usize) -> bool {
        if self.expanding.contains(&definition) {
            self.report(Error::RecursionLimit { element: name.to_string(), depth: level });
            return false;
        }
        self.expanding.push(definition);
        true
    }

    fn leave(&mut self, definition: SchemaNodeId) {
        if let Some(pos) = self.expanding.iter().rposition(|&d| d == definition) {
            self.expanding.remove(pos);
        }
    }
}
