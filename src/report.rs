//! Report generation for simulation results.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use crate::simulation::SimulationReport;

/// Generate JSON report
pub fn generate_json_report(report: &SimulationReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &SimulationReport, output_path: &Path) -> Result<()> {
    let text = render_text_report(report);

    fs::write(output_path, text)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Render the text report without writing it anywhere
pub fn render_text_report(report: &SimulationReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    let meta = &report.metadata;

    // Header
    lines.push("=".repeat(80));
    lines.push("                   EXOR OPPORTUNISTIC ROUTING SIMULATION".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    // Metadata
    lines.push(format!("Generated: {}", meta.generated_at));
    lines.push(format!("Seed: {}", meta.seed));
    lines.push(format!("Forwarding policy: {}", meta.policy));
    lines.push(format!("Nodes: {}, Links: {}", meta.node_count, meta.link_count));
    lines.push(format!(
        "Batch {}: {} packets from {} to {}",
        meta.batch_id, meta.batch_size, meta.source, meta.destination
    ));
    lines.push(format!(
        "Forwarders (highest priority first): {}",
        meta.forwarders
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    lines.push(format!(
        "Round bound: {} (settles after {} quiet rounds)",
        meta.max_rounds, meta.settle_rounds
    ));
    lines.push(String::new());

    // Summary
    let summary = &report.summary;
    lines.push("=".repeat(80));
    lines.push("                                 SUMMARY".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());
    lines.push(format!(
        "Runs: {} ({} settled)",
        summary.runs, summary.settled_runs
    ));
    lines.push(format!(
        "Delivery ratio: mean {:.1}%, min {:.1}%, max {:.1}%",
        summary.mean_delivery_ratio * 100.0,
        summary.min_delivery_ratio * 100.0,
        summary.max_delivery_ratio * 100.0
    ));
    lines.push(format!(
        "Transmissions per run: {:.1} (mean rounds {:.1})",
        summary.mean_transmissions, summary.mean_rounds
    ));
    lines.push(String::new());

    // Per-run detail
    for run in &report.runs {
        lines.push(format!(
            "Run {} (seed {}): {}/{} delivered, {} rounds{}, {} transmissions ({} by forwarders)",
            run.run,
            run.seed,
            run.delivered.len(),
            meta.batch_size,
            run.rounds,
            if run.settled { "" } else { " [round bound]" },
            run.transmissions,
            run.forwarder_transmissions
        ));
        if !run.missing.is_empty() {
            lines.push(format!(
                "  Missing: {}",
                run.missing
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        for node in &run.nodes {
            let delay = node
                .forward_delay_ms
                .map(|ms| format!(", forward delay {:.2}ms", ms))
                .unwrap_or_default();
            lines.push(format!(
                "  {}: {} buffered, rate {:.1} pkt/s{}",
                node.id, node.buffered, node.rate, delay
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::simulation::Simulation;
    use tempfile::TempDir;

    fn report() -> SimulationReport {
        let yaml = r#"
network:
  nodes: [0, 1, 2]
  template: { kind: chain, probability: 1.0 }
batch: { source: 0, destination: 2, size: 4, forwarders: [1, 2] }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        Simulation::from_config(&config).unwrap().run().unwrap()
    }

    #[test]
    fn test_json_report_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let report = report();

        generate_json_report(&report, &path).unwrap();
        let parsed: SimulationReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.runs, report.runs);
        assert_eq!(parsed.metadata.policy, report.metadata.policy);
    }

    #[test]
    fn test_text_report_contents() {
        let text = render_text_report(&report());
        assert!(text.contains("Forwarding policy: best_holder"));
        assert!(text.contains("Batch 0: 4 packets from n0 to n2"));
        assert!(text.contains("4/4 delivered"));
        assert!(!text.contains("Missing"));
    }

    #[test]
    fn test_write_failure_has_context() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.txt");
        let err = generate_text_report(&report(), &path).unwrap_err();
        assert!(format!("{:?}", err).contains("Failed to write text report"));
    }
}
