//! Summary statistics and binning for simulation value vectors.

use anyhow::{Context, Result};
use statrs::statistics::Statistics;

/// Population summary of one value vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorSummary {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
}

/// Population mean, variance and standard deviation (denominator `n`).
pub fn summarize(values: &[f64]) -> Result<VectorSummary> {
    anyhow::ensure!(!values.is_empty(), "Cannot summarize an empty value vector");
    Ok(VectorSummary {
        mean: values.iter().mean(),
        variance: values.iter().population_variance(),
        std_dev: values.iter().population_std_dev(),
    })
}

/// Fixed-width binning of a value vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub counts: Vec<usize>,
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
}

/// Count values into `bins` equal-width bins spanning `[min, max]`, with
/// the maximum value landing in the last bin. A constant vector gets a
/// unit range so its single occupied bin still has a width to draw.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram> {
    anyhow::ensure!(bins > 0, "Need at least one bin");
    anyhow::ensure!(!values.is_empty(), "Cannot bin an empty value vector");

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    anyhow::ensure!(min.is_finite() && max.is_finite(), "Values must be finite");
    if max == min {
        max = min + 1.0;
    }

    let bin_width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / bin_width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Histogram {
        counts,
        min,
        max,
        bin_width,
    })
}

/// Pull `<run_key>.vectors[0].value` out of a simulation result document.
pub fn extract_vector(doc: &serde_json::Value, run_key: &str) -> Result<Vec<f64>> {
    let run = doc
        .get(run_key)
        .with_context(|| format!("Run key '{run_key}' not present in the document"))?;
    let vectors = run
        .get("vectors")
        .and_then(|v| v.as_array())
        .context("Run entry has no 'vectors' array")?;
    let first = vectors.first().context("'vectors' is empty")?;
    let values = first
        .get("value")
        .and_then(|v| v.as_array())
        .context("First vector has no 'value' array")?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .with_context(|| format!("Non-numeric entry {v} in the value vector"))
        })
        .collect()
}
