//! Form Renderer: erzeugt Knoten im [`FormTree`](crate::form::FormTree).
//!
//! Der Walker entscheidet *was* gerendert wird, hier wird entschieden *wie*:
//! Label, Occurrence-Daten, Hints und die Position relativ zum Add-Control.

use crate::error::{Error, ReferenceKind};
use crate::form::{AttributeField, Expansion, FieldId, FieldKind, FieldNode};
use crate::schema::{MaxOccurs, SchemaKind, SchemaNodeId};
use crate::session::FormSession;
use crate::walker::WalkContext;

impl<'s> FormSession<'s> {
    /// Label in der konfigurierten Sprache, sonst der Schema-Name.
    fn label_for(&self, id: SchemaNodeId) -> String {
        let node = self.schema.node(id);
        self.schema
            .label(id, self.options.language())
            .unwrap_or_else(|| node.display_name())
            .to_string()
    }

    /// Schlüssel einer Occurrence-Gruppe: `parent/tag`.
    fn add_key(&self, ctx: &WalkContext, tag: &str) -> String {
        match ctx.parent.and_then(|p| self.tree.get(p)) {
            Some(parent) => format!("{}/{tag}", parent.xmlname),
            None => tag.to_string(),
        }
    }

    fn base_node(
        &self,
        kind: FieldKind,
        decl: SchemaNodeId,
        ctx: &WalkContext,
        control: Option<FieldId>,
        (min, max): (u32, MaxOccurs),
        required: bool,
    ) -> FieldNode {
        let schema_node = self.schema.node(decl);
        let mut node = FieldNode::new(kind, schema_node.display_name(), decl);
        node.label = self.label_for(decl);
        node.level = ctx.level;
        node.min_occurs = min;
        node.max_occurs = max;
        node.required = required;
        node.choice = ctx.choice;
        node.disabled = schema_node.hints.disabled;
        node.hidden = schema_node.hints.hidden;
        node.add_control = control;
        node.addxmlname = control
            .and_then(|c| self.tree.get(c))
            .and_then(|c| c.addxmlname.clone());
        node
    }

    /// Fügt hinter `ctx.after` ein, sonst vor dem verwaltenden Add-Control,
    /// sonst am Ende des Elternteils.
    fn place(&mut self, node: FieldNode, ctx: &WalkContext, control: Option<FieldId>) -> FieldId {
        match (ctx.parent, ctx.after) {
            (Some(parent), Some(after)) if self.tree.parent(after) == Some(parent) => {
                self.tree.insert_after(node, parent, after)
            }
            _ => self.tree.insert(node, ctx.parent, control),
        }
    }

    /// Rendert einen "Hinzufügen"-Button für eine Occurrence-Gruppe.
    pub(crate) fn render_add_control(
        &mut self,
        decl: SchemaNodeId,
        ctx: &WalkContext,
        expansion: Expansion,
    ) -> FieldId {
        let mut node = self.base_node(
            FieldKind::AddControl,
            decl,
            ctx,
            None,
            (expansion.min, expansion.max),
            false,
        );
        node.text = false;
        node.disabled = false;
        node.addxmlname = Some(self.add_key(ctx, &node.xmlname));
        node.expansion = Some(expansion);
        self.place(node, ctx, None)
    }

    /// Input (Freitext) oder Select (Enumeration).
    pub(crate) fn render_terminal(
        &mut self,
        decl: SchemaNodeId,
        ctx: &WalkContext,
        control: Option<FieldId>,
        bounds: (u32, MaxOccurs),
        required: bool,
        options: Vec<String>,
    ) -> FieldId {
        let kind = if options.is_empty() { FieldKind::Input } else { FieldKind::Select };
        let mut node = self.base_node(kind, decl, ctx, control, bounds, required);
        let schema_node = self.schema.node(decl);
        if let Some(fixed) = &schema_node.fixed {
            node.value = fixed.clone();
            node.disabled = true;
        } else if let Some(default) = &schema_node.default {
            node.value = default.clone();
        }
        node.options = options;
        self.place(node, ctx, control)
    }

    pub(crate) fn render_fieldset(
        &mut self,
        decl: SchemaNodeId,
        ctx: &WalkContext,
        control: Option<FieldId>,
        bounds: (u32, MaxOccurs),
        required: bool,
        text: bool,
    ) -> FieldId {
        let mut node = self.base_node(FieldKind::Fieldset, decl, ctx, control, bounds, required);
        node.text = text;
        self.place(node, ctx, control)
    }

    /// Rendert ein Attribut-Unterfeld.
    ///
    /// `fixed` Werte sind immer disabled und vorbelegt. Innerhalb einer
    /// Restriction sichtbar, sonst versteckt und nur geschrieben, wenn das
    /// Attribut Pflicht ist oder im Quelldokument stand.
    pub(crate) fn render_attribute(&mut self, id: SchemaNodeId, field: FieldId, restriction: bool) {
        let schema = self.schema;
        let site = schema.node(id);
        if site.prohibited {
            if let Ok(node) = self.field_mut(field) {
                let name = site.display_name();
                node.attributes.retain(|a| a.name != name);
            }
            return;
        }

        let (decl, name) = match &site.reference {
            Some(r) if r.is_xml_namespace() => (id, format!("xml:{}", r.local_name)),
            Some(r) => match schema.global_attribute(&r.local_name) {
                Some(global) => (global, r.local_name.clone()),
                None => {
                    self.report(Error::unresolved(ReferenceKind::Attribute, &r.local_name));
                    return;
                }
            },
            None => (id, site.display_name().to_string()),
        };
        let decl_node = schema.node(decl);

        if let Some(type_ref) = &decl_node.type_ref
            && !type_ref.is_builtin()
            && self.options.is_ignored(&type_ref.local_name)
        {
            log::debug!("attribute '{name}' skipped (ignored type '{}')", type_ref.local_name);
            return;
        }

        let fixed = site.fixed.as_ref().or(decl_node.fixed.as_ref());
        let mut attr = AttributeField::new(name);
        attr.label = schema
            .label(id, self.options.language())
            .or_else(|| schema.label(decl, self.options.language()))
            .map(str::to_string)
            .unwrap_or_else(|| attr.name.clone());
        attr.required = site.required || decl_node.required;
        attr.hidden = site.hints.hidden || decl_node.hints.hidden;
        attr.disabled = site.hints.disabled || decl_node.hints.disabled;
        attr.options = self.attribute_options(decl);
        if let Some(fixed) = fixed {
            attr.value = fixed.clone();
            attr.disabled = true;
            if !restriction {
                attr.hidden = true;
                attr.implied = !attr.required;
            }
        } else if let Some(default) = site.default.as_ref().or(decl_node.default.as_ref()) {
            attr.value = default.clone();
        }

        if let Ok(node) = self.field_mut(field) {
            node.upsert_attribute(attr);
        }
    }

    fn attribute_options(&self, decl: SchemaNodeId) -> Vec<String> {
        let schema = self.schema;
        if let Some(st) = schema.child_of_kind(decl, SchemaKind::SimpleType) {
            return schema.enumeration_values(st);
        }
        match &schema.node(decl).type_ref {
            Some(t) if !t.is_builtin() => schema
                .simple_type(&t.local_name)
                .map(|st| schema.enumeration_values(st))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}
