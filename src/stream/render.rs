//! Incremental block renderer.
//!
//! Reconciles the latest parse against a persistent node list the way a
//! minimal virtual-DOM diff would: positional, keyed by kind, updating in
//! place whenever the kind at a position is unchanged. The node list is
//! independent of any output target; callers replay the returned
//! [`RenderOp`]s onto a terminal, a web view, or nothing at all.

use serde::Serialize;

use super::parser::{Block, BlockKind};

/// Display name used when a fence label is empty.
pub const DEFAULT_CODE_NAME: &str = "file";

/// Stable identity of a rendered node across reconcile calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u64);

/// Application status shown on a code node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NodeStatus {
    Loading,
    Applied,
    Failed { reason: String },
}

impl NodeStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            NodeStatus::Loading => "…",
            NodeStatus::Applied => "✓",
            NodeStatus::Failed { .. } => "✗",
        }
    }
}

/// One visual element bound to the block at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNode {
    pub id: NodeId,
    pub kind: BlockKind,
    pub content: String,
    /// Raw fence label (code nodes only)
    pub lang: String,
    /// Derived display name (code nodes only)
    pub file_name: Option<String>,
    pub status: Option<NodeStatus>,
    /// Collapsible panel state; survives in-place updates
    pub expanded: bool,
    /// Number of content repaints since creation
    pub revision: u32,
}

/// Change applied to the node list at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "index", rename_all = "lowercase")]
pub enum RenderOp {
    Create(usize),
    Update(usize),
    Replace(usize),
    Remove(usize),
}

/// Display name for a code fence label: its first whitespace-delimited token.
pub fn display_name(lang: &str) -> String {
    lang.split_whitespace()
        .next()
        .unwrap_or(DEFAULT_CODE_NAME)
        .to_string()
}

/// Persistent node list plus per-pass bookkeeping.
#[derive(Debug, Default)]
pub struct BlockRenderer {
    nodes: Vec<RenderedNode>,
    next_id: u64,
    pass_code_nodes: Vec<NodeId>,
}

impl BlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new generation pass.
    pub fn begin_pass(&mut self) {
        self.pass_code_nodes.clear();
    }

    pub fn nodes(&self) -> &[RenderedNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Code nodes created or replaced during the current pass that still exist.
    pub fn pass_code_nodes(&self) -> &[NodeId] {
        &self.pass_code_nodes
    }

    /// Reconcile the node list with `blocks`.
    ///
    /// Afterwards the node count equals `blocks.len()`.
    pub fn reconcile(&mut self, blocks: &[Block]) -> Vec<RenderOp> {
        let mut ops = Vec::new();

        for (i, block) in blocks.iter().enumerate() {
            match self.nodes.get_mut(i) {
                Some(node) if node.kind == block.kind() => {
                    if node.content != block.content() {
                        node.content = block.content().to_string();
                        node.revision += 1;
                        ops.push(RenderOp::Update(i));
                    }
                    // A code label can keep growing while its body is still empty.
                    if let Block::Code { lang, .. } = block {
                        if node.lang != *lang {
                            node.lang = lang.clone();
                            node.file_name = Some(display_name(lang));
                            if !matches!(ops.last(), Some(RenderOp::Update(idx)) if *idx == i) {
                                node.revision += 1;
                                ops.push(RenderOp::Update(i));
                            }
                        }
                    }
                }
                Some(_) => {
                    let old_id = self.nodes[i].id;
                    self.pass_code_nodes.retain(|id| *id != old_id);
                    let node = self.create_node(block);
                    self.nodes[i] = node;
                    ops.push(RenderOp::Replace(i));
                }
                None => {
                    let node = self.create_node(block);
                    self.nodes.push(node);
                    ops.push(RenderOp::Create(i));
                }
            }
        }

        while self.nodes.len() > blocks.len() {
            if let Some(node) = self.nodes.pop() {
                self.pass_code_nodes.retain(|id| *id != node.id);
                ops.push(RenderOp::Remove(self.nodes.len()));
            }
        }

        ops
    }

    fn create_node(&mut self, block: &Block) -> RenderedNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        match block {
            Block::Text { content } => RenderedNode {
                id,
                kind: BlockKind::Text,
                content: content.clone(),
                lang: String::new(),
                file_name: None,
                status: None,
                expanded: false,
                revision: 0,
            },
            Block::Code { lang, content } => {
                self.pass_code_nodes.push(id);
                RenderedNode {
                    id,
                    kind: BlockKind::Code,
                    content: content.clone(),
                    lang: lang.clone(),
                    file_name: Some(display_name(lang)),
                    status: Some(NodeStatus::Loading),
                    expanded: false,
                    revision: 0,
                }
            }
        }
    }

    /// Stamp `status` onto every code node tracked for the current pass.
    pub fn stamp_pass(&mut self, status: &NodeStatus) -> usize {
        let mut stamped = 0;
        for node in &mut self.nodes {
            if self.pass_code_nodes.contains(&node.id) {
                node.status = Some(status.clone());
                stamped += 1;
            }
        }
        stamped
    }

    /// Flip the collapsible state of the node at `index`.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let node = self.nodes.get_mut(index)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Drop every node, e.g. when a new chat message starts.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.pass_code_nodes.clear();
    }
}
