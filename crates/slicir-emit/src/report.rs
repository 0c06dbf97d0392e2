/*! Slice summaries for the command line. */

use serde::Serialize;
use std::io::Write;

use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};

/// Counts for one sliced procedure or subgraph.
#[derive(Debug, Clone, Serialize)]
pub struct SliceEntry {
    pub name: String,
    pub anchors: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// Summary of one slicing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SliceReport {
    pub entries: Vec<SliceEntry>,
}

impl SliceReport {
    pub fn new() -> SliceReport {
        SliceReport::default()
    }

    pub fn push(&mut self, entry: SliceEntry) {
        self.entries.push(entry);
    }

    pub fn total_anchors(&self) -> usize {
        self.entries.iter().map(|e| e.anchors).sum()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Renders a slice report as a readable table. Entries that anchored at least one sensitive
/// call render green.
pub struct ReportEmitter;

impl Emitter for ReportEmitter {
    type Item = SliceReport;

    fn emit<W: Write>(
        &self,
        report: &SliceReport,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_section(writer, context, "Slice Report")?;
        for entry in &report.entries {
            let line = format!(
                "{}  anchors={} nodes={} edges={}",
                entry.name, entry.anchors, entry.nodes, entry.edges
            );
            if entry.anchors > 0 {
                EmitHelper::write_colored_line(writer, context, &line, "green")?;
            } else {
                EmitHelper::write_line(writer, context, &line)?;
            }
        }
        EmitHelper::write_line(
            writer,
            context,
            &format!(
                "{} entries, {} sensitive call sites",
                report.entries.len(),
                report.total_anchors()
            ),
        )?;
        Ok(())
    }
}
