//! Bar chart generation for collected activity data.
//!
//! Charts are written as self-contained SVG files: a summary chart per
//! counter family plus one detail chart per principal and per region,
//! each limited to the highest-ranking entries.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::aggregate::{ActivitySummary, CounterFamily};

/// Entries drawn per chart, keeping the highest counts.
pub const CHART_MAX_ITEMS: usize = 50;

const CHART_MAX_LENGTH_FILE_STEM: usize = 250;
const CHART_MAX_LENGTH_AXIS_LABELS: usize = 85;
const TRUNCATION_SEQUENCE: &str = "[...]";

const CHART_WIDTH: f64 = 1400.0;
const CHART_HEIGHT: f64 = 800.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 300.0;
const BAR_COLOR: &str = "#e4af00";
const GRID_COLOR: &str = "#dddddd";

/// Writes all chart files for the given summary into the given
/// directory, with detail charts placed in `principals/` and
/// `regions/` subdirectories.
pub fn generate_chart_files(summary: &ActivitySummary, output_directory: &Path) -> Result<()> {
    let principals_directory = output_directory.join("principals");
    let regions_directory = output_directory.join("regions");
    for directory in [output_directory, &principals_directory, &regions_directory] {
        fs::create_dir_all(directory)
            .with_context(|| format!("Cannot create plot directory {}", directory.display()))?;
    }

    let principal_totals = ranked_totals(&summary.api_calls_by_principal);
    write_chart_file(
        &BarChart {
            title: format!("API calls per principal (max. entries: {})", CHART_MAX_ITEMS),
            bars: principal_totals,
        },
        &output_directory.join("summary_principals.svg"),
    )?;
    for (principal, api_calls) in &summary.api_calls_by_principal {
        write_chart_file(
            &BarChart {
                title: format!(
                    "Top API calls for principal '{}' (max. entries: {})",
                    principal, CHART_MAX_ITEMS
                ),
                bars: ranked_entries(api_calls),
            },
            &detail_chart_path(&principals_directory, principal),
        )?;
    }

    let region_totals = ranked_totals(&summary.api_calls_by_region);
    write_chart_file(
        &BarChart {
            title: format!("API calls per region (max. entries: {})", CHART_MAX_ITEMS),
            bars: region_totals,
        },
        &output_directory.join("summary_regions.svg"),
    )?;
    for (region, api_calls) in &summary.api_calls_by_region {
        write_chart_file(
            &BarChart {
                title: format!(
                    "Top API calls for region '{}' (max. entries: {})",
                    region, CHART_MAX_ITEMS
                ),
                bars: ranked_entries(api_calls),
            },
            &detail_chart_path(&regions_directory, region),
        )?;
    }

    Ok(())
}

struct BarChart {
    title: String,
    bars: Vec<(String, u64)>,
}

fn write_chart_file(chart: &BarChart, path: &Path) -> Result<()> {
    fs::write(path, chart.render_svg())
        .with_context(|| format!("Cannot write plot file {}", path.display()))
}

/// Sums each outer entry of a counter family and ranks the totals.
fn ranked_totals(family: &CounterFamily) -> Vec<(String, u64)> {
    let totals: BTreeMap<String, u64> = family
        .iter()
        .map(|(key, counts)| (key.clone(), counts.values().sum()))
        .collect();
    ranked_entries(&totals)
}

/// Ranks counter entries by descending count, ties resolved
/// alphabetically, capped at [`CHART_MAX_ITEMS`].
fn ranked_entries(counts: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts
        .iter()
        .map(|(key, count)| (key.clone(), *count))
        .collect();
    entries.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    entries.truncate(CHART_MAX_ITEMS);
    entries
}

/// Replaces characters that are invalid in many modern file systems.
fn sanitize_file_name(val: &str) -> String {
    val.chars()
        .map(|char| {
            if char.is_ascii_alphanumeric() || "_+=,.@-".contains(char) {
                char
            } else {
                '_'
            }
        })
        .collect()
}

/// Truncates a string at the given maximum length in characters,
/// marking applied truncation at the end.
fn truncate_label(val: &str, max_length: usize) -> String {
    if val.chars().count() > max_length {
        let kept = max_length.saturating_sub(TRUNCATION_SEQUENCE.chars().count());
        let mut truncated: String = val.chars().take(kept).collect();
        truncated.push_str(TRUNCATION_SEQUENCE);
        truncated
    } else {
        val.to_string()
    }
}

fn detail_chart_path(directory: &Path, name: &str) -> PathBuf {
    let stem = directory.join(sanitize_file_name(name));
    let stem = truncate_label(&stem.to_string_lossy(), CHART_MAX_LENGTH_FILE_STEM);
    PathBuf::from(format!("{}.svg", stem))
}

fn escape_xml(val: &str) -> String {
    let mut escaped = String::with_capacity(val.len());
    for char in val.chars() {
        match char {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Picks an integer y-axis tick step that yields at most ten ticks.
fn tick_step(max_value: u64) -> u64 {
    let mut magnitude = 1u64;
    loop {
        for multiplier in [1, 2, 5] {
            let candidate = magnitude * multiplier;
            if max_value / candidate <= 10 {
                return candidate;
            }
        }
        magnitude *= 10;
    }
}

impl BarChart {
    fn render_svg(&self) -> String {
        let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let axis_bottom = MARGIN_TOP + plot_height;

        let max_value = self.bars.iter().map(|(_, count)| *count).max().unwrap_or(0);
        let step = tick_step(max_value);
        let axis_max = (max_value.div_ceil(step).max(1)) * step;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
        );
        let _ = writeln!(
            svg,
            r#"<rect width="{}" height="{}" fill="white"/>"#,
            CHART_WIDTH, CHART_HEIGHT
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>"#,
            CHART_WIDTH / 2.0,
            MARGIN_TOP / 2.0,
            escape_xml(&self.title)
        );

        let mut tick = 0u64;
        while tick <= axis_max {
            let y = axis_bottom - (tick as f64 / axis_max as f64) * plot_height;
            let _ = writeln!(
                svg,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}"/>"#,
                MARGIN_LEFT,
                y,
                MARGIN_LEFT + plot_width,
                y,
                GRID_COLOR
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-family="sans-serif" font-size="11">{}</text>"#,
                MARGIN_LEFT - 8.0,
                y + 4.0,
                tick
            );
            tick += step;
        }

        let band_width = if self.bars.is_empty() {
            plot_width
        } else {
            plot_width / self.bars.len() as f64
        };
        for (index, (label, count)) in self.bars.iter().enumerate() {
            let bar_height = (*count as f64 / axis_max as f64) * plot_height;
            let x = MARGIN_LEFT + index as f64 * band_width + band_width * 0.1;
            let y = axis_bottom - bar_height;
            let _ = writeln!(
                svg,
                r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
                x,
                y,
                band_width * 0.8,
                bar_height,
                BAR_COLOR
            );
            let label_x = MARGIN_LEFT + (index as f64 + 0.5) * band_width;
            let label_y = axis_bottom + 12.0;
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-family="sans-serif" font-size="11" transform="rotate(-90, {:.1}, {:.1})">{}</text>"#,
                label_x,
                label_y,
                label_x,
                label_y,
                escape_xml(&truncate_label(label, CHART_MAX_LENGTH_AXIS_LABELS))
            );
        }

        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
            MARGIN_LEFT,
            axis_bottom,
            MARGIN_LEFT + plot_width,
            axis_bottom
        );
        svg.push_str("</svg>\n");
        svg
    }
}
