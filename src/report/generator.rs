//! Report rendering.
//!
//! Turns a [`Report`] into plain text, Markdown, or pretty-printed JSON.

use super::{DemeSummary, RankedGenome, Report, ReportMetadata};
use crate::view::{PoolStats, Summary};

/// Generate a short plain-text report.
pub fn generate_text_report(report: &Report, precision: usize) -> String {
    let mut output = String::new();
    let meta = &report.metadata;

    output.push_str(&format!("fitview: {}\n", meta.source));
    output.push_str(&format!(
        "Genomes: {} | Demes: {} | Depth: {}\n",
        meta.genomes, meta.demes, meta.depth
    ));

    match &report.summary {
        Some(s) => {
            output.push_str(&format!(
                "Max: {:.p$} | Min: {:.p$} | SD: {:.p$}\n",
                s.max,
                s.min,
                s.std_deviation,
                p = precision
            ));
            output.push_str(&format!(
                "Mean: {:.p$} | Variance: {:.p$} | Range: {:.p$}\n",
                s.mean,
                s.variance,
                s.range,
                p = precision
            ));
        }
        None => output.push_str("No genomes found.\n"),
    }

    if let Some(best) = report.top.first() {
        output.push_str(&format!(
            "Best: {} ({:.p$})\n",
            best.id,
            best.fitness,
            p = precision
        ));
    }

    output.push_str(&format!("Pool: {}\n", pool_line(&report.pool)));
    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, precision: usize) -> String {
    let mut output = String::new();

    output.push_str("# Fitness Statistics Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(report.summary.as_ref(), precision));
    output.push_str(&generate_demes_section(&report.demes, precision));
    output.push_str(&generate_top_section(&report.top, precision));
    output.push_str(&generate_pool_section(&report.pool));
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Genomes:** {}\n", metadata.genomes));
    section.push_str(&format!("- **Demes:** {}\n", metadata.demes));
    section.push_str(&format!("- **Nesting Depth:** {}\n", metadata.depth));
    if metadata.generations > 0 {
        section.push_str(&format!(
            "- **Generations Replayed:** {} ({} workers)\n",
            metadata.generations, metadata.workers
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_summary_section(summary: Option<&Summary>, precision: usize) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    let Some(s) = summary else {
        section.push_str("The population holds no genomes.\n\n");
        return section;
    };

    section.push_str("| Statistic | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!("| Genomes | {} |\n", s.count));
    section.push_str(&format!("| Mean | {:.p$} |\n", s.mean, p = precision));
    section.push_str(&format!("| Variance | {:.p$} |\n", s.variance, p = precision));
    section.push_str(&format!(
        "| Std. Deviation | {:.p$} |\n",
        s.std_deviation,
        p = precision
    ));
    section.push_str(&format!(
        "| Max | {:.p$} (#{}) |\n",
        s.max,
        s.max_index,
        p = precision
    ));
    section.push_str(&format!(
        "| Min | {:.p$} (#{}) |\n",
        s.min,
        s.min_index,
        p = precision
    ));
    section.push_str(&format!("| Range | {:.p$} |\n", s.range, p = precision));
    section.push('\n');

    section
}

fn generate_demes_section(demes: &[DemeSummary], precision: usize) -> String {
    if demes.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Demes\n\n");
    section.push_str("| Deme | Genomes | Mean | SD | Max | Min |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|\n");

    for deme in demes {
        match &deme.summary {
            Some(s) => section.push_str(&format!(
                "| `{}` | {} | {:.p$} | {:.p$} | {:.p$} | {:.p$} |\n",
                deme.path,
                deme.genomes,
                s.mean,
                s.std_deviation,
                s.max,
                s.min,
                p = precision
            )),
            None => section.push_str(&format!("| `{}` | 0 | - | - | - | - |\n", deme.path)),
        }
    }
    section.push('\n');

    section
}

fn generate_top_section(top: &[RankedGenome], precision: usize) -> String {
    if top.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Top Genomes\n\n");
    section.push_str("| Rank | Genome | Fitness |\n");
    section.push_str("|:---:|:---|---:|\n");

    for genome in top {
        section.push_str(&format!(
            "| {} | `{}` | {:.p$} |\n",
            genome.rank,
            genome.id,
            genome.fitness,
            p = precision
        ));
    }
    section.push('\n');

    section
}

fn generate_pool_section(pool: &PoolStats) -> String {
    format!("## View Pool\n\n{}\n\n", pool_line(pool))
}

fn pool_line(pool: &PoolStats) -> String {
    format!(
        "{} views acquired, {} reused ({:.0}%), {} allocated, {} idle",
        pool.acquired,
        pool.reused,
        pool.reuse_ratio() * 100.0,
        pool.allocated,
        pool.idle
    )
}

fn generate_footer() -> String {
    "---\n\n*Report generated by fitview*\n".to_string()
}
