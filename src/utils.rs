use gdal::Dataset;
use gdal::errors::GdalError;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSummary {
    pub valid: usize,
    pub total: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

/// Statistics over the non-NaN values of a band buffer.
pub fn summarize(values: &[f32]) -> RasterSummary {
    let valid_values: Vec<f32> = values.iter().filter(|v| !v.is_nan()).cloned().collect();

    RasterSummary {
        valid: valid_values.len(),
        total: values.len(),
        min: valid_values.iter().fold(f32::INFINITY, |a, &b| a.min(b)),
        max: valid_values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)),
        mean: if valid_values.is_empty() {
            f32::NAN
        } else {
            valid_values.iter().sum::<f32>() / valid_values.len() as f32
        },
    }
}

/// Logs the summary of the first band of `dataset`.
pub fn log_band_summary(dataset: &Dataset, label: &str) -> Result<RasterSummary, GdalError> {
    let band = dataset.rasterband(1)?;
    let (width, height) = dataset.raster_size();
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let summary = summarize(buffer.data());

    if summary.valid == 0 {
        info!("{}: no valid cells out of {}", label, summary.total);
    } else {
        info!(
            "{}: {} bands, valid cells {} / {} ({:.1}%), min {:.2}, max {:.2}, mean {:.2}",
            label,
            dataset.raster_count(),
            summary.valid,
            summary.total,
            100.0 * summary.valid as f32 / summary.total as f32,
            summary.min,
            summary.max,
            summary.mean
        );
    }

    Ok(summary)
}
