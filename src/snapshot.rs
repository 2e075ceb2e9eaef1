//! Graph snapshot file
//!
//! The only persistence in the system: a pretty-printed JSON array of node
//! records, written after construction and again after deduplication, and
//! readable back into an identical in-memory graph. File failures here are
//! the one class of error that is fatal to a run.

use crate::graph::{DebateGraph, UtteranceNode};
use std::fs;
use std::path::Path;

/// Errors reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the graph's record list to `path`.
pub fn write_snapshot(path: impl AsRef<Path>, graph: &DebateGraph) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(&graph.snapshot())?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a record list from `path` into a graph.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<DebateGraph, SnapshotError> {
    let data = fs::read_to_string(path)?;
    let records: Vec<UtteranceNode> = serde_json::from_str(&data)?;
    Ok(DebateGraph::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn snapshot_file_round_trips() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "c", 1.1, 1));
        graph.add_node(UtteranceNode::attack(
            NodeId::new(2),
            "Con",
            "a",
            NodeId::new(1),
            0.2,
            2,
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        write_snapshot(&path, &graph).unwrap();
        let reloaded = read_snapshot(&path).unwrap();

        assert_eq!(reloaded.snapshot(), graph.snapshot());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_snapshot(dir.path().join("absent.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not a snapshot").unwrap();

        let result = read_snapshot(&path);
        assert!(matches!(result, Err(SnapshotError::Json(_))));
    }
}
