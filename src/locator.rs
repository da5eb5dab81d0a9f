//! Positionsangaben für Formularfelder.
//!
//! Ein [`Locator`] beschreibt ein Feld über seinen Pfad ab der Wurzel:
//! als XPath-ähnlicher String mit 1-basierten Indizes pro Tag-Name
//! (`/ead/archdesc[1]/did[1]`) und als Kind-Index-Pfad.
//! Add-Controls tragen nicht zum Index bei.

use std::fmt;

use crate::form::{FieldId, FormTree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub xpath: String,
    /// Position in `children()` auf jeder Ebene unterhalb der Wurzel.
    pub index_path: Vec<usize>,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xpath)
    }
}

impl FormTree {
    /// Locator eines lebenden Feldes (None für Add-Controls und Tombstones).
    pub fn locator(&self, id: FieldId) -> Option<Locator> {
        let node = self.get(id)?;
        if node.is_add_control() {
            return None;
        }

        let mut segments = Vec::new();
        let mut index_path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let node = self.get(current)?;
            let siblings = self.children(parent);
            let position = siblings.iter().position(|&c| c == current)?;
            let nth = siblings[..position]
                .iter()
                .filter(|&&c| self.get(c).is_some_and(|n| !n.is_add_control() && n.xmlname == node.xmlname))
                .count();
            segments.push(format!("{}[{}]", node.xmlname, nth + 1));
            index_path.push(position);
            current = parent;
        }
        if Some(current) != self.root() {
            return None;
        }
        segments.push(self.get(current)?.xmlname.clone());
        segments.reverse();
        index_path.reverse();

        Some(Locator { xpath: format!("/{}", segments.join("/")), index_path })
    }

    /// Löst einen XPath-ähnlichen Pfad auf (`/a/b[2]/c`, fehlender Index = 1).
    pub fn resolve(&self, xpath: &str) -> Option<FieldId> {
        let mut segments = xpath.strip_prefix('/')?.split('/');
        let root = self.root()?;
        let (root_name, root_index) = parse_segment(segments.next()?)?;
        if root_index != 1 || self.get(root)?.xmlname != root_name {
            return None;
        }

        segments.try_fold(root, |current, segment| {
            let (name, index) = parse_segment(segment)?;
            self.nth_child(current, name, index)
        })
    }

    /// `index`-te (1-basiert) lebende Instanz mit diesem Tag unter `parent`.
    pub fn nth_child(&self, parent: FieldId, xmlname: &str, index: usize) -> Option<FieldId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.get(c).is_some_and(|n| !n.is_add_control() && n.xmlname == xmlname))
            .nth(index.checked_sub(1)?)
    }
}

fn parse_segment(segment: &str) -> Option<(&str, usize)> {
    match segment.split_once('[') {
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.parse().ok()?;
            (!name.is_empty()).then_some((name, index))
        }
        None => (!segment.is_empty()).then_some((segment, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FieldKind, FieldNode};
    use crate::schema::SchemaNodeId;

    fn node(kind: FieldKind, name: &str) -> FieldNode {
        FieldNode::new(kind, name, SchemaNodeId(0))
    }

    fn sample() -> (FormTree, [FieldId; 4]) {
        let mut tree = FormTree::new();
        let root = tree.insert(node(FieldKind::Fieldset, "ead"), None, None);
        let p1 = tree.insert(node(FieldKind::Input, "p"), Some(root), None);
        let control = tree.insert(node(FieldKind::AddControl, "p"), Some(root), None);
        let p2 = tree.insert(node(FieldKind::Input, "p"), Some(root), Some(control));
        let did = tree.insert(node(FieldKind::Fieldset, "did"), Some(root), None);
        (tree, [root, p1, p2, did])
    }

    #[test]
    fn xpath_counts_same_tag_siblings() {
        let (tree, [root, p1, p2, did]) = sample();
        assert_eq!(tree.locator(root).unwrap().xpath, "/ead");
        assert_eq!(tree.locator(p1).unwrap().xpath, "/ead/p[1]");
        assert_eq!(tree.locator(p2).unwrap().xpath, "/ead/p[2]");
        let loc = tree.locator(did).unwrap();
        assert_eq!(loc.xpath, "/ead/did[1]");
        assert_eq!(loc.index_path, vec![3]);
    }

    #[test]
    fn resolve_is_inverse_of_locator() {
        let (tree, ids) = sample();
        for id in ids {
            let loc = tree.locator(id).unwrap();
            assert_eq!(tree.resolve(&loc.xpath), Some(id), "{loc}");
        }
        assert_eq!(tree.resolve("/ead/did"), Some(ids[3]));
        assert_eq!(tree.resolve("/ead/p[3]"), None);
        assert_eq!(tree.resolve("/other"), None);
        assert_eq!(tree.resolve("ead"), None);
        assert_eq!(tree.resolve("/ead/p[0]"), None);
    }

    #[test]
    fn add_control_has_no_locator() {
        let (tree, [root, ..]) = sample();
        let control = tree.children(root)[2];
        assert!(tree.get(control).unwrap().is_add_control());
        assert!(tree.locator(control).is_none());
    }
}
