//! Menu catalog
//!
//! The navigation tree is loaded once at startup and never mutated. Nodes
//! live in a flat arena addressed by [`NodeId`], so every button in the
//! transcript refers to a node that is known to exist. Label and question
//! mappings are checked when the catalog is built: a leaf without a
//! question or a branch without children is a [`CatalogError`], not a
//! silent no-op at click time.

mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Index of a node in the catalog arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn unchecked(index: usize) -> Self {
        Self(index)
    }
}

/// What a node does when it is selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Entering the node shows its children as buttons
    Branch {
        /// User-turn text echoed when the node is entered
        display_text: String,
        children: Vec<NodeId>,
    },
    /// Selecting the node asks the backend a canonical question
    Leaf { question: String },
}

/// An entry in the navigation tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    pub label: String,
    pub kind: NodeKind,
}

impl MenuNode {
    #[cfg(test)]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Branch { children, .. } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    #[cfg(test)]
    pub fn leaf_question(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { question } => Some(question),
            NodeKind::Branch { .. } => None,
        }
    }

    /// Bot prompt shown when the node is entered
    pub fn prompt_text(&self) -> String {
        format!("{} 항목을 선택하세요.", self.label)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has no top-level categories")]
    Empty,
    #[error("empty label under {parent}")]
    EmptyLabel { parent: String },
    #[error("duplicate label {label:?} under {parent}")]
    DuplicateLabel { label: String, parent: String },
    #[error("leaf {0:?} has no question")]
    MissingQuestion(String),
    #[error("{0:?} has both children and a question")]
    AmbiguousNode(String),
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Serialized catalog layout, used for the built-in table and override files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSource {
    pub categories: Vec<NodeSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSource {
    pub label: String,
    /// Defaults to `"{label} 관련 안내를 진행하겠습니다."` for branches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<NodeSource>,
}

/// Validated, immutable navigation tree
#[derive(Debug, Clone)]
pub struct Catalog {
    nodes: Vec<MenuNode>,
    roots: Vec<NodeId>,
}

impl Catalog {
    /// The built-in service catalog
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_source(&builtin::source())
    }

    /// Load a catalog override from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let source: CatalogSource = serde_json::from_str(raw)?;
        Self::from_source(&source)
    }

    pub fn from_source(source: &CatalogSource) -> Result<Self, CatalogError> {
        if source.categories.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut catalog = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        catalog.roots = catalog.insert_level(&source.categories, "<root>")?;
        Ok(catalog)
    }

    fn insert_level(
        &mut self,
        items: &[NodeSource],
        parent: &str,
    ) -> Result<Vec<NodeId>, CatalogError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let label = item.label.trim();
            if label.is_empty() {
                return Err(CatalogError::EmptyLabel {
                    parent: parent.to_string(),
                });
            }
            if !seen.insert(label) {
                return Err(CatalogError::DuplicateLabel {
                    label: label.to_string(),
                    parent: parent.to_string(),
                });
            }
            ids.push(self.insert_node(item, label)?);
        }
        Ok(ids)
    }

    fn insert_node(&mut self, item: &NodeSource, label: &str) -> Result<NodeId, CatalogError> {
        let kind = match (&item.question, item.items.is_empty()) {
            (Some(_), false) => return Err(CatalogError::AmbiguousNode(label.to_string())),
            (None, true) => return Err(CatalogError::MissingQuestion(label.to_string())),
            (Some(question), true) => NodeKind::Leaf {
                question: question.clone(),
            },
            (None, false) => {
                let children = self.insert_level(&item.items, label)?;
                NodeKind::Branch {
                    display_text: item
                        .display_text
                        .clone()
                        .unwrap_or_else(|| format!("{label} 관련 안내를 진행하겠습니다.")),
                    children,
                }
            }
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(MenuNode {
            label: label.to_string(),
            kind,
        });
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&MenuNode> {
        self.nodes.get(id.0)
    }

    /// Top-level categories in display order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[cfg(test)]
    pub fn root_labels(&self) -> Vec<String> {
        self.labels(&self.roots)
    }

    #[cfg(test)]
    pub fn labels(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.node(*id))
            .map(|node| node.label.clone())
            .collect()
    }

    #[cfg(test)]
    /// Find a node by label, searching top-level categories first
    pub fn find(&self, label: &str) -> Option<NodeId> {
        let label = label.trim();
        let mut queue: Vec<NodeId> = self.roots.clone();
        let mut cursor = 0;
        while let Some(id) = queue.get(cursor).copied() {
            cursor += 1;
            let node = self.node(id)?;
            if node.label == label {
                return Some(id);
            }
            queue.extend_from_slice(node.children());
        }
        None
    }

    #[cfg(test)]
    /// Deepest nesting level (top-level categories are depth 1)
    pub fn depth(&self) -> usize {
        fn walk(catalog: &Catalog, id: NodeId) -> usize {
            catalog
                .node(id)
                .map_or(0, |n| 1 + n.children().iter().map(|c| walk(catalog, *c)).max().unwrap_or(0))
        }
        self.roots.iter().map(|id| walk(self, *id)).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
