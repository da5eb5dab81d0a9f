//! Virtueller Formular-Baum.
//!
//! Ersetzt die direkte DOM-Manipulation: jedes gerenderte Eingabeelement ist
//! ein [`FieldNode`] in einer Arena, adressiert über [`FieldId`]. Eltern- und
//! Kind-Beziehungen sind explizite Indizes, entfernte Teilbäume hinterlassen
//! Tombstones, damit ausgegebene `FieldId`s nie auf fremde Knoten zeigen.

use std::fmt::Write as _;

use crate::schema::{MaxOccurs, SchemaNodeId};

/// Index eines Knotens im [`FormTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub(crate) u32);

impl FieldId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identität einer instanziierten `xs:choice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChoiceGroupId(pub(crate) u32);

/// Zugehörigkeit zu einer Choice: Gruppe + Index der Alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChoiceTag {
    pub group: ChoiceGroupId,
    pub alternative: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Container für strukturierten Inhalt (optional mit Text-Slot).
    Fieldset,
    /// Freitext-Eingabe.
    Input,
    /// Auswahl aus Enumerationswerten (`FieldNode::options`).
    Select,
    /// "Hinzufügen"-Button für optionale/wiederholbare Elemente.
    AddControl,
}

/// Was ein Add-Control beim Aktivieren instanziiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    /// Element-Deklaration (nach `ref`-Auflösung).
    pub element: SchemaNodeId,
    pub min: u32,
    pub max: MaxOccurs,
    /// Untergrenze für `remove` (0 bei optionalen Gruppen und Choices).
    pub floor: u32,
    pub level: usize,
}

/// Attribut-Unterfeld eines Elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeField {
    /// Serialisierungsname (`xml:lang` für Referenzen in den XML-Namespace).
    pub name: String,
    pub label: String,
    pub value: String,
    /// Enumerationswerte; leer = Freitext.
    pub options: Vec<String>,
    pub required: bool,
    pub disabled: bool,
    pub hidden: bool,
    pub invalid: bool,
    /// `fixed`-Wert aus dem Schema, wird nur geschrieben wenn das
    /// Quelldokument das Attribut enthielt.
    pub implied: bool,
}

impl AttributeField {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            value: String::new(),
            options: Vec::new(),
            required: false,
            disabled: false,
            hidden: false,
            invalid: false,
            implied: false,
        }
    }

    /// Ob das Attribut serialisiert wird.
    pub fn is_emitted(&self) -> bool {
        !self.value.is_empty() && !self.implied
    }
}

/// Ein gerendertes Formularelement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub kind: FieldKind,
    pub label: String,
    /// Tag-Name bei der Serialisierung.
    pub xmlname: String,
    /// Schlüssel der Occurrence-Gruppe (`parent/tag`), geteilt von Add-Control
    /// und den davon erzeugten Instanzen.
    pub addxmlname: Option<String>,
    pub schema: SchemaNodeId,
    pub level: usize,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub required: bool,
    pub choice: Option<ChoiceTag>,
    pub disabled: bool,
    /// Durch eine aktive Alternative derselben Choice markiert.
    pub excluded: bool,
    pub hidden: bool,
    pub invalid: bool,
    /// Aus einem Quelldokument materialisiert; wird auch leer serialisiert.
    pub keep_empty: bool,
    /// Nimmt Textinhalt auf (Input, Select, mixed/simpleContent-Fieldset).
    pub text: bool,
    pub value: String,
    /// Text hinter diesem Element im Mixed Content des Elternteils.
    pub tail: String,
    pub options: Vec<String>,
    pub attributes: Vec<AttributeField>,
    /// Add-Control, das die Occurrence-Gruppe dieser Instanz verwaltet.
    pub add_control: Option<FieldId>,
    /// Nur für Add-Controls gesetzt.
    pub expansion: Option<Expansion>,
    pub(crate) parent: Option<FieldId>,
    pub(crate) children: Vec<FieldId>,
}

impl FieldNode {
    pub fn new(kind: FieldKind, xmlname: impl Into<String>, schema: SchemaNodeId) -> Self {
        let xmlname = xmlname.into();
        let text = matches!(kind, FieldKind::Input | FieldKind::Select);
        Self {
            kind,
            label: xmlname.clone(),
            xmlname,
            addxmlname: None,
            schema,
            level: 0,
            min_occurs: 1,
            max_occurs: MaxOccurs::Bounded(1),
            required: false,
            choice: None,
            disabled: false,
            excluded: false,
            hidden: false,
            invalid: false,
            keep_empty: false,
            text,
            value: String::new(),
            tail: String::new(),
            options: Vec::new(),
            attributes: Vec::new(),
            add_control: None,
            expansion: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_add_control(&self) -> bool {
        self.kind == FieldKind::AddControl
    }

    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }

    pub fn children(&self) -> &[FieldId] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeField> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub(crate) fn attribute_mut(&mut self, name: &str) -> Option<&mut AttributeField> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Fügt ein Attribut hinzu oder ersetzt eine geerbte Deklaration gleichen Namens.
    pub(crate) fn upsert_attribute(&mut self, attr: AttributeField) {
        match self.attribute_mut(&attr.name) {
            Some(existing) => *existing = attr,
            None => self.attributes.push(attr),
        }
    }
}

/// Arena aller Formularknoten.
#[derive(Debug, Clone, Default)]
pub struct FormTree {
    nodes: Vec<Option<FieldNode>>,
    root: Option<FieldId>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<FieldId> {
        self.root
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: FieldId) -> Option<&mut FieldNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: FieldId) -> Option<FieldId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: FieldId) -> &[FieldId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Anzahl lebender Knoten.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Lebende Knoten in Arena-Reihenfolge.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (FieldId(i as u32), n)))
    }

    /// Fügt einen Knoten ein.
    ///
    /// Ohne `parent` wird der Knoten zur Wurzel. Mit `before` (einem Kind von
    /// `parent`) wird er davor eingefügt, sonst angehängt.
    pub(crate) fn insert(
        &mut self,
        mut node: FieldNode,
        parent: Option<FieldId>,
        before: Option<FieldId>,
    ) -> FieldId {
        let id = FieldId(self.nodes.len() as u32);
        node.parent = parent;
        self.nodes.push(Some(node));
        match parent.and_then(|p| self.get_mut(p)) {
            Some(parent_node) => {
                let pos = before
                    .and_then(|b| parent_node.children.iter().position(|&c| c == b))
                    .unwrap_or(parent_node.children.len());
                parent_node.children.insert(pos, id);
            }
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        id
    }

    /// Fügt einen Knoten direkt hinter `after` ein.
    ///
    /// Ist `after` kein Kind von `parent`, wird angehängt.
    pub(crate) fn insert_after(&mut self, node: FieldNode, parent: FieldId, after: FieldId) -> FieldId {
        let siblings = self.children(parent);
        match siblings.iter().position(|&c| c == after) {
            Some(pos) => {
                let next = siblings.get(pos + 1).copied();
                self.insert(node, Some(parent), next)
            }
            None => self.insert(node, Some(parent), None),
        }
    }

    /// Entfernt einen Teilbaum. Gibt die Anzahl entfernter Knoten zurück.
    pub(crate) fn remove_subtree(&mut self, id: FieldId) -> usize {
        let Some(parent) = self.get(id).map(|n| n.parent) else {
            return 0;
        };
        if let Some(p) = parent.and_then(|p| self.get_mut(p)) {
            p.children.retain(|&c| c != id);
        }
        if self.root == Some(id) {
            self.root = None;
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    /// Pre-Order-Liste des Teilbaums (inkl. `id`).
    pub fn descendants(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Lebende Instanzen, die von `control` verwaltet werden.
    pub fn instances_of(&self, control: FieldId) -> Vec<FieldId> {
        let Some(parent) = self.parent(control) else {
            return Vec::new();
        };
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.get(c).is_some_and(|n| n.add_control == Some(control)))
            .collect()
    }

    /// Add-Controls, die zu einer Choice-Gruppe gehören.
    pub fn controls_in_choice(&self, group: ChoiceGroupId) -> Vec<FieldId> {
        self.iter()
            .filter(|(_, n)| n.is_add_control() && n.choice.is_some_and(|t| t.group == group))
            .map(|(id, _)| id)
            .collect()
    }

    /// Eingerückte Textdarstellung des Baums.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            let indent = "  ".repeat(depth);
            let marker = match node.kind {
                FieldKind::Fieldset => "[fieldset]",
                FieldKind::Input => "[input]",
                FieldKind::Select => "[select]",
                FieldKind::AddControl => "[+]",
            };
            let mut flags = Vec::new();
            if node.required {
                flags.push("required");
            }
            if node.disabled {
                flags.push("disabled");
            }
            if node.excluded {
                flags.push("excluded");
            }
            if node.hidden {
                flags.push("hidden");
            }
            if node.text && node.kind == FieldKind::Fieldset {
                flags.push("text");
            }
            let _ = write!(out, "{indent}{marker} {}", node.xmlname);
            if node.label != node.xmlname {
                let _ = write!(out, " \"{}\"", node.label);
            }
            if !flags.is_empty() {
                let _ = write!(out, " ({})", flags.join(", "));
            }
            if !node.value.is_empty() {
                let _ = write!(out, " = {:?}", node.value);
            }
            out.push('\n');
            for attr in &node.attributes {
                let _ = write!(out, "{indent}    @{}", attr.name);
                if !attr.options.is_empty() {
                    let _ = write!(out, " {{{}}}", attr.options.join("|"));
                }
                if attr.required {
                    out.push_str(" (required)");
                }
                if !attr.value.is_empty() {
                    let _ = write!(out, " = {:?}", attr.value);
                }
                out.push('\n');
            }
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}
