//! Loading documents from serialized layout snapshots, and the structural
//! fingerprint used to key cached extraction rules.
//!
//! A snapshot is the render tree as a host captured it: a viewport plus
//! nested element/text nodes with page-space rectangles. Elements without a
//! rectangle inherit their parent's.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::document::{Document, NodeId};
use super::geometry::{Rect, Viewport};

/// Depth at which the skeleton walk stops descending
pub const FINGERPRINT_DEPTH: usize = 5;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Snapshot root must be an element")]
    TextRoot,
}

/// Serialized document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Viewport at capture time; hosts supply one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    pub root: NodeSnapshot,
}

/// Serialized node: either a text run or an element
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSnapshot {
    Text {
        text: String,
    },
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, rename = "class", skip_serializing_if = "Vec::is_empty")]
        classes: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        /// `[left, top, right, bottom]` in page coordinates
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rect: Option<[f64; 4]>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeSnapshot>,
    },
}

impl Snapshot {
    /// Parse from YAML (JSON is accepted as a YAML subset)
    pub fn from_yaml(yaml: &str) -> Result<Self, SnapshotError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Build a live document from this snapshot
    pub fn into_document(self) -> Result<Document, SnapshotError> {
        self.into_document_with(Viewport::default())
    }

    /// Build a live document, using `fallback` when the snapshot has no viewport
    pub fn into_document_with(self, fallback: Viewport) -> Result<Document, SnapshotError> {
        let viewport = self.viewport.unwrap_or(fallback);
        let NodeSnapshot::Element {
            tag: _,
            id,
            classes,
            attrs,
            rect,
            children,
        } = self.root
        else {
            return Err(SnapshotError::TextRoot);
        };

        let mut doc = Document::new(viewport);
        let root = doc.root();
        let root_rect = rect
            .map(to_rect)
            .unwrap_or_else(|| Rect::new(0.0, 0.0, viewport.width, viewport.height));
        if let Some(el) = doc.element_mut(root) {
            el.id = id;
            el.classes = classes;
            el.attrs = attrs;
            el.rect = root_rect;
        }
        for child in children {
            build(&mut doc, root, root_rect, child);
        }
        Ok(doc)
    }
}

fn to_rect(r: [f64; 4]) -> Rect {
    Rect::new(r[0], r[1], r[2], r[3])
}

fn build(doc: &mut Document, parent: NodeId, parent_rect: Rect, node: NodeSnapshot) {
    match node {
        NodeSnapshot::Text { text } => {
            let t = doc.create_text(&text);
            doc.append_child(parent, t);
        }
        NodeSnapshot::Element {
            tag,
            id,
            classes,
            attrs,
            rect,
            children,
        } => {
            let el = doc.create_element(&tag);
            let rect = rect.map(to_rect).unwrap_or(parent_rect);
            if let Some(e) = doc.element_mut(el) {
                e.id = id;
                e.classes = classes;
                e.attrs = attrs;
                e.rect = rect;
            }
            doc.append_child(parent, el);
            for child in children {
                build(doc, el, rect, child);
            }
        }
    }
}

/// Tag skeleton of the element tree, e.g. `div>table>tr>td,td`
pub fn skeleton(doc: &Document, root: NodeId, max_depth: usize) -> String {
    fn walk(doc: &Document, id: NodeId, depth: usize, max_depth: usize) -> String {
        let tag = doc.tag(id).unwrap_or_default().to_string();
        if depth >= max_depth {
            return tag;
        }
        let children: Vec<String> = doc
            .children(id)
            .iter()
            .filter(|c| doc.element(**c).is_some())
            .map(|c| walk(doc, *c, depth + 1, max_depth))
            .collect();
        if children.is_empty() {
            tag
        } else {
            format!("{}>{}", tag, children.join(","))
        }
    }
    walk(doc, root, 0, max_depth)
}

/// SHA-256 of the skeleton as lowercase hex
pub fn fingerprint(doc: &Document, root: NodeId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(skeleton(doc, root, FINGERPRINT_DEPTH).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
viewport: { width: 1000, height: 600 }
root:
  tag: body
  rect: [0, 0, 1000, 2000]
  children:
    - tag: table
      rect: [0, 100, 800, 400]
      children:
        - tag: tr
          children:
            - tag: td
              children: [{ text: "목적" }]
            - tag: td
              class: [value]
              children: [{ text: "원가 절감" }]
"#;

    #[test]
    fn test_load_inherits_rects() {
        let doc = Snapshot::from_yaml(SNAPSHOT).unwrap().into_document().unwrap();
        let cells: Vec<_> = doc
            .elements_under(doc.root())
            .into_iter()
            .filter(|id| doc.tag(*id) == Some("td"))
            .collect();
        assert_eq!(cells.len(), 2);
        assert_eq!(doc.page_rect(cells[1]).unwrap().top, 100.0);
        assert!(doc.has_class(cells[1], "value"));
        assert_eq!(doc.text_content(doc.root()), "목적원가 절감");
    }

    #[test]
    fn test_skeleton_and_fingerprint() {
        let doc = Snapshot::from_yaml(SNAPSHOT).unwrap().into_document().unwrap();
        assert_eq!(skeleton(&doc, doc.root(), 5), "body>table>tr>td,td");
        assert_eq!(skeleton(&doc, doc.root(), 2), "body>table>tr");

        let fp = fingerprint(&doc, doc.root());
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint(&doc, doc.root()));
    }

    #[test]
    fn test_fallback_viewport() {
        let yaml = "root: { tag: body, children: [{ text: hi }] }";
        let small = Viewport {
            width: 640.0,
            height: 480.0,
            ..Viewport::default()
        };
        let doc = Snapshot::from_yaml(yaml).unwrap().into_document_with(small).unwrap();
        assert_eq!(doc.viewport().height, 480.0);

        let doc = Snapshot::from_yaml(SNAPSHOT).unwrap().into_document_with(small).unwrap();
        assert_eq!(doc.viewport().height, 600.0);
    }

    #[test]
    fn test_text_root_rejected() {
        let snap = Snapshot::from_yaml("root: { text: hi }").unwrap();
        assert!(matches!(snap.into_document(), Err(SnapshotError::TextRoot)));
    }
}
