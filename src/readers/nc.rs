use gdal::errors::GdalError;
use gdal::{Dataset, Metadata};
use log::{debug, info};

use super::{GriddedSource, ReadError, TimeAxisReader};
use crate::time_index::TimeAxis;

const BAND_TIME_KEY: &str = "NETCDF_DIM_time";
const DATASET_TIME_VALUES_KEY: &str = "NETCDF_DIM_time_VALUES";
const TIME_UNITS_KEY: &str = "time#units";
const EXPECTED_UNITS: &str = "seconds since 1970-01-01";

/// Reads the `time` axis of a NetCDF variable through GDAL's netCDF driver.
///
/// Each band of the variable carries its time coordinate in the
/// `NETCDF_DIM_time` item; the dataset-level `NETCDF_DIM_time_VALUES` list is
/// used when band metadata is missing.
pub struct NcTimeReader;

impl TimeAxisReader for NcTimeReader {
    fn read_time_axis(&self, source: &GriddedSource) -> Result<TimeAxis, ReadError> {
        let gdal_path = source.gdal_path();
        let gdal_err = |source: GdalError| ReadError::Gdal {
            path: gdal_path.clone(),
            source,
        };

        let dataset = Dataset::open(&gdal_path).map_err(gdal_err)?;

        if let Some(units) = dataset.metadata_item(TIME_UNITS_KEY, "") {
            check_units(&units)?;
        }

        let count = dataset.raster_count() as usize;
        let mut raw: Vec<String> = Vec::with_capacity(count);
        for band_index in 1..=count {
            let band = dataset.rasterband(band_index).map_err(gdal_err)?;
            match band.metadata_item(BAND_TIME_KEY, "") {
                Some(value) => raw.push(value),
                None => {
                    debug!("Band {} has no {} item", band_index, BAND_TIME_KEY);
                    raw.clear();
                    break;
                }
            }
        }

        if raw.is_empty() {
            if let Some(values) = dataset.metadata_item(DATASET_TIME_VALUES_KEY, "") {
                raw = parse_dim_values(&values);
            }
        }

        if raw.is_empty() {
            return Err(ReadError::MissingTimeDimension {
                path: source.path.display().to_string(),
                variable: source.variable.clone(),
            });
        }

        let axis = TimeAxis::parse(&raw)?;
        info!(
            "Read {} time steps from {}",
            axis.len(),
            source.path.display()
        );

        Ok(axis)
    }
}

fn check_units(units: &str) -> Result<(), ReadError> {
    if units.trim().starts_with(EXPECTED_UNITS) {
        Ok(())
    } else {
        Err(ReadError::UnsupportedUnits(units.to_string()))
    }
}

/// Splits a GDAL dimension value list such as `{1556755200,1558310400}`.
fn parse_dim_values(values: &str) -> Vec<String> {
    values
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}
