//! Interaction Layer: Add/Remove von Occurrence-Instanzen.
//!
//! Ein Add-Control verwaltet alle Instanzen seiner Occurrence-Gruppe (die
//! Geschwister mit `add_control == control`). Nach jeder Änderung wird der
//! Control-Zustand neu berechnet; gehört das Control zu einer Choice, die
//! ganze Choice-Gruppe.

use crate::error::{Error, Result};
use crate::form::{ChoiceGroupId, FieldId};
use crate::schema::Occurs;
use crate::session::FormSession;
use crate::walker::WalkContext;
use crate::FastHashSet;

/// Zustand einer Occurrence-Gruppe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceState {
    NotInstantiated,
    BelowMax,
    AtMax,
}

impl<'s> FormSession<'s> {
    /// Aktiviert ein Add-Control und materialisiert eine Instanz davor.
    ///
    /// Ein deaktiviertes Control (Maximum erreicht oder durch eine andere
    /// Choice-Alternative ausgeschlossen) ist ein No-Op: `Ok(None)`.
    pub fn add(&mut self, control: FieldId) -> Result<Option<FieldId>> {
        self.add_after(control, None)
    }

    /// Wie [`add`](Self::add), die Instanz landet aber direkt hinter `after`.
    ///
    /// `after` muss ein Geschwister des Controls sein, sonst wird wie bei
    /// `add` vor dem Control eingefügt. Der Populator hält so die
    /// Dokumentreihenfolge bei verschränkten Wiederholungen.
    pub fn add_after(&mut self, control: FieldId, after: Option<FieldId>) -> Result<Option<FieldId>> {
        let node = self.field(control)?;
        let Some(expansion) = node.expansion.filter(|_| node.is_add_control()) else {
            return Err(Error::NotAnAddControl(node.xmlname.clone()));
        };
        if node.disabled {
            log::debug!("add on disabled control '{}' ignored", node.xmlname);
            return Ok(None);
        }
        let count = self.tree.instances_of(control).len();
        if !expansion.max.allows(count) {
            return Ok(None);
        }

        let ctx = WalkContext {
            level: expansion.level,
            parent: node.parent(),
            occurs: Occurs::default(),
            choice: node.choice,
            after,
        };
        let choice = node.choice;
        let required = (count as u32) < expansion.floor;

        let before = self.diagnostics.len();
        let instance = self.instantiate_element(
            expansion.element,
            &ctx,
            Some(control),
            (expansion.min, expansion.max),
            required,
        );
        let Some(instance) = instance else {
            return Err(self
                .diagnostics
                .get(before)
                .cloned()
                .unwrap_or(Error::UnknownField(control.0)));
        };

        match choice {
            Some(tag) => self.refresh_choice_group(tag.group),
            None => self.refresh_control(control),
        }
        Ok(Some(instance))
    }

    /// Entfernt eine Instanz samt Teilbaum.
    ///
    /// Verweigert wird das Unterschreiten der Untergrenze der Gruppe
    /// (`minOccurs` bei Pflicht-Gruppen, 0 bei optionalen und Choices).
    pub fn remove(&mut self, field: FieldId) -> Result<()> {
        let node = self.field(field)?;
        let Some(control) = node.add_control else {
            return Err(Error::NotRemovable(node.xmlname.clone()));
        };
        let element = node.xmlname.clone();
        let control_node = self.field(control)?;
        let floor = control_node.expansion.map(|e| e.floor).unwrap_or_default();
        let choice = control_node.choice;

        let count = self.tree.instances_of(control).len();
        if count as u32 <= floor {
            return Err(Error::BelowMinOccurs { element, min: floor });
        }

        let removed = self.tree.remove_subtree(field);
        log::debug!("removed '{element}' ({removed} fields)");

        match choice {
            Some(tag) => self.refresh_choice_group(tag.group),
            None => self.refresh_control(control),
        }
        Ok(())
    }

    /// Ob `remove(field)` erlaubt wäre.
    pub fn is_removable(&self, field: FieldId) -> bool {
        let Some(control) = self.tree.get(field).and_then(|n| n.add_control) else {
            return false;
        };
        let floor = self
            .tree
            .get(control)
            .and_then(|c| c.expansion)
            .map(|e| e.floor)
            .unwrap_or_default();
        self.tree.instances_of(control).len() as u32 > floor
    }

    pub fn occurrence_state(&self, control: FieldId) -> Result<OccurrenceState> {
        let node = self.field(control)?;
        let Some(expansion) = node.expansion else {
            return Err(Error::NotAnAddControl(node.xmlname.clone()));
        };
        let count = self.tree.instances_of(control).len();
        Ok(if count == 0 {
            OccurrenceState::NotInstantiated
        } else if expansion.max.allows(count) {
            OccurrenceState::BelowMax
        } else {
            OccurrenceState::AtMax
        })
    }

    /// Lebende Instanzen einer Occurrence-Gruppe in Dokumentreihenfolge.
    pub fn instances(&self, control: FieldId) -> Result<Vec<FieldId>> {
        let node = self.field(control)?;
        if !node.is_add_control() {
            return Err(Error::NotAnAddControl(node.xmlname.clone()));
        }
        Ok(self.tree.instances_of(control))
    }

    /// Disabled = Maximum erreicht, oder ausgeschlossen und beschränkt.
    pub(crate) fn refresh_control(&mut self, control: FieldId) {
        let count = self.tree.instances_of(control).len();
        if let Some(node) = self.tree.get_mut(control)
            && let Some(expansion) = node.expansion
        {
            let at_max = !expansion.max.allows(count);
            node.disabled = at_max || (node.excluded && !expansion.max.is_unbounded());
        }
    }

    /// Markiert alle Alternativen außer den aktiven als ausgeschlossen.
    ///
    /// Ohne aktive Alternative werden alle Controls zurückgesetzt.
    pub(crate) fn refresh_choice_group(&mut self, group: ChoiceGroupId) {
        let controls = self.tree.controls_in_choice(group);
        let active: FastHashSet<u32> = controls
            .iter()
            .filter(|&&c| !self.tree.instances_of(c).is_empty())
            .filter_map(|&c| self.tree.get(c).and_then(|n| n.choice))
            .map(|tag| tag.alternative)
            .collect();

        for control in controls {
            if let Some(node) = self.tree.get_mut(control)
                && let Some(tag) = node.choice
            {
                node.excluded = !active.is_empty() && !active.contains(&tag.alternative);
            }
            self.refresh_control(control);
        }
    }
}
