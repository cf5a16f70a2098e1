//! Streaming response handling: fence parsing, incremental node
//! reconciliation and task-summary extraction.

mod parser;
mod render;
mod summary;

pub use parser::{parse_blocks, Block, BlockKind, FENCE};
pub use render::{
    display_name, BlockRenderer, NodeId, NodeStatus, RenderOp, RenderedNode, DEFAULT_CODE_NAME,
};
pub use summary::{split_summary, SplitResponse};
