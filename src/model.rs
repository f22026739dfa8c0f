pub mod tree;

pub use tree::{Group, Node, NodeData, NodeId, NodeStore};
