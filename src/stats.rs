//! Process-wide solve statistics (§4.9), written regardless of whether the
//! solve finished, hit a limit, or errored (§7).

use std::fmt;

/// Counters mirroring `PCBProcessor.cpp`'s own `stats_` block: per-node
/// outcome tallies plus handler/brancher/engine text blocks appended
/// verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessorStats {
    pub nodes_processed: u64,
    pub pruned_infeasible: u64,
    pub pruned_bound: u64,
    pub proven_optimal: u64,
    pub branched: u64,
    pub problems: u64,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub processor: ProcessorStats,
    component_reports: Vec<String>,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    pub fn record_component(&mut self, report: String) {
        self.component_reports.push(report);
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes processed   : {}", self.processor.nodes_processed)?;
        writeln!(f, "pruned (infeas)   : {}", self.processor.pruned_infeasible)?;
        writeln!(f, "pruned (bound)    : {}", self.processor.pruned_bound)?;
        writeln!(f, "proven optimal    : {}", self.processor.proven_optimal)?;
        writeln!(f, "branched          : {}", self.processor.branched)?;
        writeln!(f, "engine/handler problems: {}", self.processor.problems)?;
        for r in &self.component_reports {
            writeln!(f, "{r}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_all_counters() {
        let mut stats = Stats::new();
        stats.processor.nodes_processed = 3;
        stats.record_component("LinearHandler: ok".into());
        let rendered = stats.to_string();
        assert!(rendered.contains("nodes processed"));
        assert!(rendered.contains("LinearHandler"));
    }
}
