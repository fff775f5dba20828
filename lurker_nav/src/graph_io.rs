// Text format for waypoint graphs.
//
// One line per node, comma separated, no header, no version field:
//
//     index,posX,posY,posZ,conn1,conn2,...
//
// Lines must appear in index order (line N describes node N). Blank lines and
// stray carriage returns are ignored, since graphs are often saved on Windows.
// Writing uses Rust's shortest round-trip float formatting, so
// `parse_graph(&format_graph(g))` reproduces `g` exactly.
//
// Parsing is strict: a malformed line is a `NavError::Format`, a structural
// problem (misplaced index, dangling connection) is a `NavError::Consistency`
// raised by `NavGraph::from_nodes`. There is no partial load.

use crate::error::{NavError, NavResult};
use crate::graph::{Connections, GraphNode, NavGraph};
use crate::types::{NodeId, Vec3};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Parse graph text into a validated `NavGraph`.
pub fn parse_graph(text: &str) -> NavResult<NavGraph> {
    let mut nodes = Vec::new();
    for (line_idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        nodes.push(parse_node(line, line_idx + 1)?);
    }
    NavGraph::from_nodes(nodes)
}

/// Read and parse a graph file.
pub fn load_graph(path: impl AsRef<Path>) -> NavResult<NavGraph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let graph = parse_graph(&text)?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        connections = graph.connection_count(),
        "loaded waypoint graph"
    );
    Ok(graph)
}

/// Render a graph in the line format.
pub fn format_graph(graph: &NavGraph) -> String {
    let mut out = String::new();
    for node in graph.nodes() {
        let p = node.position;
        // Writing to a String cannot fail.
        let _ = write!(out, "{},{},{},{}", node.index.0, p.x, p.y, p.z);
        for conn in &node.connections {
            let _ = write!(out, ",{}", conn.0);
        }
        out.push('\n');
    }
    out
}

/// Write a graph in the line format to any writer.
pub fn write_graph<W: Write>(writer: &mut W, graph: &NavGraph) -> NavResult<()> {
    writer.write_all(format_graph(graph).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Save a graph to a file, replacing any existing contents.
pub fn save_graph(path: impl AsRef<Path>, graph: &NavGraph) -> NavResult<()> {
    let mut file = std::fs::File::create(path)?;
    write_graph(&mut file, graph)
}

fn parse_node(line: &str, line_no: usize) -> NavResult<GraphNode> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(NavError::Format {
            line: line_no,
            reason: format!("expected at least 4 fields, found {}", fields.len()),
        });
    }

    let index = NodeId(parse_field(fields[0], "index", line_no)?);
    let position = Vec3::new(
        parse_field(fields[1], "x", line_no)?,
        parse_field(fields[2], "y", line_no)?,
        parse_field(fields[3], "z", line_no)?,
    );
    let connections = fields[4..]
        .iter()
        .map(|f| parse_field(f, "connection", line_no).map(NodeId))
        .collect::<NavResult<Connections>>()?;

    Ok(GraphNode {
        index,
        position,
        connections,
    })
}

fn parse_field<T: FromStr>(field: &str, what: &str, line_no: usize) -> NavResult<T> {
    field.parse().map_err(|_| NavError::Format {
        line: line_no,
        reason: format!("bad {what} value {field:?}"),
    })
}
