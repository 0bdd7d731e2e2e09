//! Human-readable layouts for `describe_db` and `describe_cluster`

use std::fmt::Write;

use crate::metadata::{ClusterTopology, DatabaseConfig};

/// Render a database's shard placement, one row per (node, shard)
pub fn render_database(config: &DatabaseConfig) -> String {
    let mut out = String::new();
    let rev = config.rev.as_ref().map_or("-", |r| r.as_str());
    let _ = writeln!(out, "database: {}", config.name());
    let _ = writeln!(out, "revision: {}", rev);
    let _ = writeln!(out, "shard suffix: {}", config.suffix());
    let _ = writeln!(
        out,
        "shards: {}  nodes: {}  changelog entries: {}",
        config.shards.by_range.len(),
        config.shards.by_node.len(),
        config.changelog.len()
    );

    let mut table = Table::new(["NODE", "SHARD", "REPLICAS"]);
    for (node, shards) in &config.shards.by_node {
        for shard in shards {
            let copies = config.shards.owners(shard).map_or(0, |o| o.len());
            table.row([node.to_string(), shard.clone(), copies.to_string()]);
        }
    }

    if table.is_empty() {
        out.push_str("no shard placement found\n");
    } else {
        table.render_into(&mut out);
    }
    out
}

/// Render cluster membership, one row per node
pub fn render_cluster(topology: &ClusterTopology) -> String {
    let mut table = Table::new(["NODE", "KNOWN", "JOINED"]);
    for node in topology.nodes() {
        table.row([
            node.to_string(),
            yes_no(topology.is_known(node)),
            yes_no(topology.cluster_nodes.contains(node)),
        ]);
    }

    let mut out = String::new();
    if table.is_empty() {
        out.push_str("no nodes reported\n");
    } else {
        table.render_into(&mut out);
    }
    out
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

/// Fixed-column text table, `N` columns wide
struct Table<const N: usize> {
    header: [String; N],
    rows: Vec<[String; N]>,
}

impl<const N: usize> Table<N> {
    fn new(header: [&str; N]) -> Self {
        Self {
            header: header.map(str::to_string),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: [String; N]) {
        self.rows.push(cells);
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> [usize; N] {
        let mut widths = [0; N];
        for line in std::iter::once(&self.header).chain(&self.rows) {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.len());
            }
        }
        widths
    }

    /// Append the bordered table to `out`
    fn render_into(&self, out: &mut String) {
        let widths = self.widths();
        let rule: String = widths
            .iter()
            .fold(String::from("+"), |acc, w| acc + &"-".repeat(w + 2) + "+");

        let _ = writeln!(out, "{rule}");
        Self::line(out, &self.header, &widths);
        let _ = writeln!(out, "{rule}");
        for row in &self.rows {
            Self::line(out, row, &widths);
        }
        let _ = writeln!(out, "{rule}");
    }

    fn line(out: &mut String, cells: &[String; N], widths: &[usize; N]) {
        out.push('|');
        for (cell, &width) in cells.iter().zip(widths) {
            let _ = write!(out, " {cell:<width$} |");
        }
        out.push('\n');
    }
}
