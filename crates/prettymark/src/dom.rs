//! A minimal in-memory element tree.
//!
//! [`Tree`] carries just enough of a DOM for the styler: tag names, class
//! lists and parent/child links. It is useful for embedding the styler in
//! hosts that already have their own document model, and for exercising
//! [`style_code`](crate::style_code) without parsing HTML.

use crate::styler::CodeDocument;

/// Handle to an element in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    tag: String,
    classes: Vec<String>,
    children: Vec<NodeId>,
}

/// An element tree with a single root.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only a `body` root element.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".to_string(),
                classes: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new `tag` element as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.append_with_classes(parent, tag, &[])
    }

    /// Append a new `tag` element with the given classes.
    pub fn append_with_classes(&mut self, parent: NodeId, tag: &str, classes: &[&str]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Tag name of `node`, lowercased.
    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    /// Classes of `node` in the order they were added.
    pub fn classes(&self, node: NodeId) -> &[String] {
        &self.nodes[node.0].classes
    }

    /// Direct children of `node`.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Whether `node` carries `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|c| c == class)
    }

    fn wraps_code(&self, node: &Node) -> bool {
        node.tag == "pre"
            && node
                .children
                .iter()
                .any(|child| self.nodes[child.0].tag == "code")
    }
}

impl CodeDocument for Tree {
    type Block = NodeId;

    fn code_blocks(&self) -> Vec<NodeId> {
        // Creation order; matches document order for trees built top-down.
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| self.wraps_code(node))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn has_class(&self, block: NodeId, class: &str) -> bool {
        Tree::has_class(self, block, class)
    }

    fn add_class(&mut self, block: NodeId, class: &str) {
        if !Tree::has_class(self, block, class) {
            self.nodes[block.0].classes.push(class.to_string());
        }
    }
}
