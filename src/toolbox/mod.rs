//! Call contract for the external geospatial operations.
//!
//! The extraction driver never touches rasters or vectors directly. It asks a
//! [`GeoToolbox`] for each step and passes the returned artifacts along:
//!
//! 1. [`GeoToolbox::make_layer`] for every selected time index,
//! 2. [`GeoToolbox::composite_bands`] to stack the layers,
//! 3. [`GeoToolbox::mask_by_boundary`] per area,
//! 4. [`GeoToolbox::raster_to_points`] on the masked raster,
//! 5. [`GeoToolbox::sample_to_points`] for every band onto those points,
//! 6. [`GeoToolbox::export_table`] for the resulting attribute table.
//!
//! Operations must only be requested inside a [`ToolboxSession`].

use std::path::{Path, PathBuf};

use crate::readers::GriddedSource;
use crate::table::AttributeTable;
use crate::time_index::SelectedIndex;

pub mod error;
pub use error::{Operation, OperationContext, ToolboxError};

pub mod session;
pub use session::ToolboxSession;

pub mod gdal_toolbox;
pub use gdal_toolbox::GdalToolbox;

#[cfg(test)]
pub mod testing;

/// A single time layer of the gridded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHandle {
    pub name: String,
    pub source: GriddedSource,
    /// 1-based band of `source` holding the layer.
    pub band: usize,
    pub date_literal: String,
}

/// A raster written by the toolbox, with one name per band.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterArtifact {
    pub path: PathBuf,
    pub band_names: Vec<String>,
}

impl RasterArtifact {
    pub fn band_count(&self) -> usize {
        self.band_names.len()
    }
}

/// Center of a raster cell turned into a point feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    /// First-band value of the cell (`grid_code`).
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointArtifact {
    pub path: PathBuf,
    pub points: Vec<SamplePoint>,
}

pub trait GeoToolbox {
    /// Acquires the processing session. Called once by [`ToolboxSession`].
    fn check_out(&mut self) -> Result<(), ToolboxError>;

    /// Releases the processing session. Must not fail.
    fn check_in(&mut self);

    fn make_layer(
        &self,
        source: &GriddedSource,
        entry: &SelectedIndex,
    ) -> Result<LayerHandle, ToolboxError>;

    fn composite_bands(
        &self,
        layers: &[LayerHandle],
        output: &Path,
    ) -> Result<RasterArtifact, ToolboxError>;

    fn mask_by_boundary(
        &self,
        raster: &RasterArtifact,
        boundary: &Path,
        output: &Path,
    ) -> Result<RasterArtifact, ToolboxError>;

    fn raster_to_points(
        &self,
        raster: &RasterArtifact,
        output: &Path,
    ) -> Result<PointArtifact, ToolboxError>;

    /// Samples every band of `raster` onto `points`. Columns are
    /// [`crate::table::ID_COLUMNS`] followed by one column per band.
    fn sample_to_points(
        &self,
        points: &PointArtifact,
        raster: &RasterArtifact,
    ) -> Result<AttributeTable, ToolboxError>;

    fn export_table(&self, table: &AttributeTable, output: &Path) -> Result<PathBuf, ToolboxError>;
}
