//! Histogram rendering to SVG.

use crate::stats::{Histogram, VectorSummary};
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);

/// Render a binned vector as a bar chart with the summary statistics
/// annotated near the top right of the plot.
pub fn render_histogram(
    hist: &Histogram,
    summary: &VectorSummary,
    title: &str,
    out: &Path,
) -> Result<()> {
    let root = SVGBackend::new(out, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let tallest = hist.counts.iter().max().copied().unwrap_or(0);
    let y_top = (tallest as f64 * 1.1).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(hist.min..hist.max, 0.0..y_top)?;

    chart
        .configure_mesh()
        .x_desc("Values")
        .y_desc("Frequency")
        .draw()?;

    chart.draw_series(hist.counts.iter().enumerate().map(|(i, &count)| {
        let x0 = hist.min + i as f64 * hist.bin_width;
        Rectangle::new(
            [(x0, 0.0), (x0 + hist.bin_width, count as f64)],
            SKY_BLUE.filled(),
        )
    }))?;
    chart.draw_series(hist.counts.iter().enumerate().map(|(i, &count)| {
        let x0 = hist.min + i as f64 * hist.bin_width;
        Rectangle::new([(x0, 0.0), (x0 + hist.bin_width, count as f64)], &BLACK)
    }))?;

    let text_x = hist.min + 0.78 * (hist.max - hist.min);
    let area = chart.plotting_area();
    area.draw(&Text::new(
        format!("Mean: {:.2}", summary.mean),
        (text_x, 0.90 * y_top),
        ("sans-serif", 16).into_font(),
    ))?;
    area.draw(&Text::new(
        format!("Variance: {:.2}", summary.variance),
        (text_x, 0.85 * y_top),
        ("sans-serif", 16).into_font(),
    ))?;
    area.draw(&Text::new(
        format!("Standard Deviation: {:.2}", summary.std_dev),
        (text_x, 0.80 * y_top),
        ("sans-serif", 16).into_font(),
    ))?;

    root.present()
        .with_context(|| format!("Failed to write the histogram to {}", out.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;

    #[test]
    fn renders_an_svg_with_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("histogram.svg");

        let values: Vec<f64> = (0..200).map(|i| (i % 17) as f64).collect();
        let hist = stats::histogram(&values, 20).unwrap();
        let summary = stats::summarize(&values).unwrap();

        render_histogram(&hist, &summary, "Histogram for 200 events", &out).unwrap();

        let svg = std::fs::read_to_string(&out).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Mean:"));
        assert!(svg.contains("Standard Deviation:"));
        assert!(svg.contains("Histogram for 200 events"));
    }

    #[test]
    fn renders_a_single_bin_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("flat.svg");

        let hist = stats::histogram(&[3.0, 3.0, 3.0], 100).unwrap();
        let summary = stats::summarize(&[3.0, 3.0, 3.0]).unwrap();
        render_histogram(&hist, &summary, "Histogram", &out).unwrap();
        assert!(out.is_file());
    }
}
