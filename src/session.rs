//! Editier-Session: Kontextobjekt für Walker, Interaktion und Population.
//!
//! Eine [`FormSession`] bündelt alles, was früher als seitenglobaler Zustand
//! existierte: den Formular-Baum, die Optionen, gesammelte Diagnosen und den
//! Zähler für Choice-Gruppen. Das [`Schema`] wird nur geliehen.

use crate::error::{Error, Result};
use crate::form::{ChoiceGroupId, FieldId, FieldNode, FormTree};
use crate::options::FormOptions;
use crate::schema::{Schema, SchemaNodeId};
use crate::walker::WalkContext;

/// Ein generiertes Formular samt Zustand.
#[derive(Debug, Clone)]
pub struct FormSession<'s> {
    pub(crate) schema: &'s Schema,
    pub(crate) options: FormOptions,
    pub(crate) tree: FormTree,
    pub(crate) diagnostics: Vec<Error>,
    pub(crate) next_choice_group: u32,
    /// Gerade expandierte Groups/AttributeGroups/Base-Types (Zyklus-Schutz).
    pub(crate) expanding: Vec<SchemaNodeId>,
}

impl<'s> FormSession<'s> {
    /// Generiert das Formular für das Root-Element.
    ///
    /// Nicht auflösbare Referenzen brechen nur den betroffenen Zweig ab und
    /// landen in [`diagnostics()`](Self::diagnostics), außer im Strict-Modus.
    ///
    /// # Beispiel
    ///
    /// ```
    /// use xsdform::{FormOptions, FormSession};
    /// use xsdform::xsd::parse_xsd;
    ///
    /// let schema = parse_xsd(r#"
    ///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    ///         <xs:element name="title" type="xs:string"/>
    ///     </xs:schema>
    /// "#).unwrap();
    ///
    /// let session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    /// let root = session.root().unwrap();
    /// assert_eq!(session.field(root).unwrap().xmlname, "title");
    /// ```
    pub fn generate(schema: &'s Schema, options: FormOptions) -> Result<Self> {
        options.validate()?;

        let root_decl = match options.root_element() {
            Some(name) => schema
                .global_element(name)
                .ok_or_else(|| Error::UnknownRootElement(name.to_string()))?,
            None => schema
                .global_elements()
                .next()
                .map(|(_, id)| id)
                .ok_or(Error::NoRootElement)?,
        };

        let mut session = Self {
            schema,
            options,
            tree: FormTree::new(),
            diagnostics: Vec::new(),
            next_choice_group: 0,
            expanding: Vec::new(),
        };
        session.walk_root(root_decl, &WalkContext::root())?;

        if session.options.strict()
            && let Some(first) = session.diagnostics.first()
        {
            return Err(first.clone());
        }

        log::debug!(
            "generated form with {} fields ({} diagnostics)",
            session.tree.len(),
            session.diagnostics.len()
        );
        Ok(session)
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn tree(&self) -> &FormTree {
        &self.tree
    }

    /// Fehler, die beim Generieren oder bei `add` einzelne Zweige abgebrochen haben.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    pub fn root(&self) -> Result<FieldId> {
        self.tree.root().ok_or(Error::NoRootElement)
    }

    /// Namespace des serialisierten Root-Elements.
    pub fn root_namespace(&self) -> Option<&str> {
        self.options.root_namespace().or(self.schema.target_namespace())
    }

    pub fn field(&self, id: FieldId) -> Result<&FieldNode> {
        self.tree.get(id).ok_or(Error::UnknownField(id.0))
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> Result<&mut FieldNode> {
        self.tree.get_mut(id).ok_or(Error::UnknownField(id.0))
    }

    /// Findet das erste lebende Feld mit diesem Tag (Pre-Order).
    pub fn find(&self, xmlname: &str) -> Option<FieldId> {
        let root = self.tree.root()?;
        self.tree
            .descendants(root)
            .into_iter()
            .find(|&id| self.tree.get(id).is_some_and(|n| !n.is_add_control() && n.xmlname == xmlname))
    }

    /// Findet das Add-Control für ein Tag unterhalb von `parent`.
    pub fn find_add_control(&self, parent: FieldId, xmlname: &str) -> Option<FieldId> {
        self.tree
            .children(parent)
            .iter()
            .copied()
            .find(|&c| self.tree.get(c).is_some_and(|n| n.is_add_control() && n.xmlname == xmlname))
    }

    // --- Werte ---

    pub fn value(&self, id: FieldId) -> Result<&str> {
        Ok(&self.field(id)?.value)
    }

    /// Setzt den Textwert eines Feldes.
    ///
    /// Ein nicht-leerer Wert entfernt eine Fehlermarkierung aus `validate`.
    pub fn set_value(&mut self, id: FieldId, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let node = self.field_mut(id)?;
        if !node.text {
            return Err(Error::NoTextContent(node.xmlname.clone()));
        }
        if node.disabled {
            return Err(Error::FieldDisabled(node.xmlname.clone()));
        }
        if !node.options.is_empty() && !value.is_empty() && !node.options.contains(&value) {
            return Err(Error::InvalidOption { element: node.xmlname.clone(), value });
        }
        if !value.trim().is_empty() {
            node.invalid = false;
        }
        node.value = value;
        Ok(())
    }

    pub fn attribute(&self, id: FieldId, name: &str) -> Result<&str> {
        let node = self.field(id)?;
        node.attribute(name)
            .map(|a| a.value.as_str())
            .ok_or_else(|| Error::UnknownAttribute {
                element: node.xmlname.clone(),
                attribute: name.to_string(),
            })
    }

    /// Setzt den Wert eines Attribut-Unterfeldes.
    pub fn set_attribute(&mut self, id: FieldId, name: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let node = self.field_mut(id)?;
        let element = node.xmlname.clone();
        let Some(attr) = node.attribute_mut(name) else {
            return Err(Error::UnknownAttribute { element, attribute: name.to_string() });
        };
        if attr.disabled {
            return Err(Error::FieldDisabled(format!("{element}/@{name}")));
        }
        if !attr.options.is_empty() && !value.is_empty() && !attr.options.contains(&value) {
            return Err(Error::InvalidOption { element: format!("{element}/@{name}"), value });
        }
        if !value.trim().is_empty() {
            attr.invalid = false;
        }
        attr.value = value;
        Ok(())
    }

    // --- Validierung ---

    /// Markiert leere Pflichtfelder und -attribute als ungültig.
    ///
    /// Gibt alle Felder zurück, die selbst oder deren Attribute markiert sind.
    pub fn validate(&mut self) -> Vec<FieldId> {
        let ids: Vec<FieldId> = self.tree.iter().map(|(id, _)| id).collect();
        let mut flagged = Vec::new();
        for id in ids {
            let Some(node) = self.tree.get_mut(id) else { continue };
            if node.is_add_control() {
                continue;
            }
            node.invalid = node.required && node.text && !node.disabled && node.value.trim().is_empty();
            let mut any_attr = false;
            for attr in &mut node.attributes {
                attr.invalid = attr.required && !attr.disabled && attr.value.trim().is_empty();
                any_attr |= attr.invalid;
            }
            if node.invalid || any_attr {
                flagged.push(id);
            }
        }
        if !flagged.is_empty() {
            log::debug!("validation flagged {} fields", flagged.len());
        }
        flagged
    }

    /// Felder mit aktiver Fehlermarkierung.
    pub fn invalid_fields(&self) -> Vec<FieldId> {
        self.tree
            .iter()
            .filter(|(_, n)| n.invalid || n.attributes.iter().any(|a| a.invalid))
            .map(|(id, _)| id)
            .collect()
    }

    // --- intern ---

    /// Zeichnet einen zweig-lokalen Fehler auf.
    pub(crate) fn report(&mut self, err: Error) {
        log::warn!("{err}");
        self.diagnostics.push(err);
    }

    pub(crate) fn next_choice_group(&mut self) -> ChoiceGroupId {
        let id = ChoiceGroupId(self.next_choice_group);
        self.next_choice_group += 1;
        id
    }
}
