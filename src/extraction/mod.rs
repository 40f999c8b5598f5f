//! Area extraction driver.
//!
//! Selects the time layers of interest, composites them once, then runs the
//! mask → points → sample → export pipeline for every area and writes the
//! relabeled table. An area failure is logged and recorded in the
//! [`RunReport`]; the remaining areas still run.

use log::{error, info, warn};

use crate::config::{
    AreaSpec, Config, EXPORT_SUFFIX, MASK_SUFFIX, OUTPUT_SUFFIX, POINTS_SUFFIX,
};
use crate::error::{ExtractError, Result};
use crate::readers::{GriddedSource, TimeAxisReader};
use crate::table::{self, VALUE_COLUMN_OFFSET};
use crate::time_index::{self, Selection};
use crate::toolbox::{GeoToolbox, RasterArtifact, ToolboxSession};

pub mod report;
pub use report::{AreaFailure, AreaOutput, RunReport};

pub fn run<T, R>(config: &Config, toolbox: &mut T, reader: &R) -> Result<RunReport>
where
    T: GeoToolbox + ?Sized,
    R: TimeAxisReader + ?Sized,
{
    let source = config.dataset_source();
    info!("Reading time axis of {}", source.gdal_path());
    let axis = reader.read_time_axis(&source)?;

    let selection = time_index::select(
        &axis,
        config.months(),
        config.match_mode(),
        config.variable(),
    )?;
    info!(
        "{} of {} time steps fall in months {} ({} matching)",
        selection.len(),
        axis.len(),
        config.months(),
        config.match_mode()
    );

    if selection.is_empty() {
        warn!("Nothing to extract, no layer will be requested");
        return Err(ExtractError::NoMatchingMonths(config.months().to_string()));
    }

    let session = ToolboxSession::check_out(toolbox)?;
    let composite = build_composite(&*session, config, &source, &selection)?;

    let labels = selection.labels();
    let mut report = RunReport::new(composite.path.clone(), labels.clone());

    for area in config.areas() {
        info!(
            "Processing area {} ({})",
            area.output_name,
            area.boundary.display()
        );
        match extract_area(&*session, config, &composite, area, &labels) {
            Ok(output) => {
                info!(
                    "Area {} written to {}",
                    output.output_name,
                    output.csv.display()
                );
                report.outputs.push(output);
            }
            Err(e) => {
                error!("Area {} failed: {}", area.output_name, e);
                report.failures.push(AreaFailure {
                    output_name: area.output_name.clone(),
                    error: e,
                });
            }
        }
    }

    drop(session);
    report.log_summary();
    Ok(report)
}

/// Extracts one layer per selected index and stacks them into the composite.
pub fn build_composite<T: GeoToolbox + ?Sized>(
    toolbox: &T,
    config: &Config,
    source: &GriddedSource,
    selection: &Selection,
) -> Result<RasterArtifact> {
    let layers = selection
        .iter()
        .map(|entry| toolbox.make_layer(source, entry))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(toolbox.composite_bands(&layers, &config.composite_path())?)
}

pub fn extract_area<T: GeoToolbox + ?Sized>(
    toolbox: &T,
    config: &Config,
    composite: &RasterArtifact,
    area: &AreaSpec,
    labels: &[String],
) -> Result<AreaOutput> {
    let masked = toolbox.mask_by_boundary(
        composite,
        &config.boundary_path(area),
        &config.area_output(area, MASK_SUFFIX),
    )?;
    let points = toolbox.raster_to_points(&masked, &config.area_output(area, POINTS_SUFFIX))?;
    let sampled = toolbox.sample_to_points(&points, &masked)?;
    let exported = toolbox.export_table(&sampled, &config.area_output(area, EXPORT_SUFFIX))?;

    let mut table = table::read_csv(&exported)?;
    table.relabel_value_columns(VALUE_COLUMN_OFFSET, labels)?;

    let csv = config.area_output(area, OUTPUT_SUFFIX);
    table::write_csv(&table, &csv)?;

    Ok(AreaOutput {
        output_name: area.output_name.clone(),
        csv,
        rows: table.len(),
        columns: table.columns().to_vec(),
    })
}
