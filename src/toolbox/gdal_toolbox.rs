use std::path::{Path, PathBuf};

use gdal::errors::GdalError;
use gdal::raster::{Buffer, rasterize};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, Geometry, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType};
use gdal::{Dataset, DriverManager, Metadata};
use log::{debug, info, warn};

use super::{
    GeoToolbox, LayerHandle, Operation, OperationContext, PointArtifact, RasterArtifact,
    SamplePoint, ToolboxError,
};
use crate::extent::{self, Extent};
use crate::readers::GriddedSource;
use crate::table::{self, AttributeTable, ID_COLUMNS};
use crate::time_index::SelectedIndex;
use crate::utils;

const REQUIRED_DRIVERS: [&str; 3] = ["GTiff", "MEM", "ESRI Shapefile"];
const GRIDDED_DRIVER: &str = "netCDF";
const SHAPEFILE_PARTS: [&str; 5] = ["shp", "shx", "dbf", "prj", "cpg"];

/// [`GeoToolbox`] backed by GDAL/OGR.
///
/// Rasters are written as float32 GeoTIFFs with NaN as nodata, points as ESRI
/// Shapefiles with `pointid` and `grid_code` fields.
#[derive(Debug, Default)]
pub struct GdalToolbox {
    checked_out: bool,
}

/// Shape and georeferencing shared by every band of a raster.
#[derive(Debug, Clone)]
struct Grid {
    width: usize,
    height: usize,
    geo_transform: [f64; 6],
    projection: String,
}

impl Grid {
    fn of(dataset: &Dataset) -> Result<Self, GdalError> {
        let (width, height) = dataset.raster_size();
        Ok(Self {
            width,
            height,
            geo_transform: dataset.geo_transform()?,
            projection: dataset.projection(),
        })
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn extent(&self) -> Extent {
        Extent::from_geo_transform(&self.geo_transform, self.width, self.height)
    }
}

impl GdalToolbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&self, operation: Operation) -> Result<(), ToolboxError> {
        if self.checked_out {
            Ok(())
        } else {
            Err(ToolboxError::NotCheckedOut(operation))
        }
    }
}

/// Reads band `index` as float32 with scale/offset applied and nodata as NaN.
fn read_band(dataset: &Dataset, index: usize, grid: &Grid) -> Result<Vec<f32>, GdalError> {
    let band = dataset.rasterband(index)?;
    let buffer = band.read_as::<f32>((0, 0), grid.size(), grid.size(), None)?;
    let nodata = band.no_data_value();
    let scale = band.scale().unwrap_or(1.0);
    let offset = band.offset().unwrap_or(0.0);

    Ok(buffer
        .data()
        .iter()
        .map(|&raw| {
            if raw.is_nan() || nodata.is_some_and(|nd| raw == nd as f32) {
                f32::NAN
            } else {
                (raw as f64 * scale + offset) as f32
            }
        })
        .collect())
}

fn write_bands(path: &Path, grid: &Grid, bands: &[(String, Vec<f32>)]) -> Result<(), GdalError> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset =
        driver.create_with_band_type::<f32, _>(path, grid.width, grid.height, bands.len())?;

    dataset.set_geo_transform(&grid.geo_transform)?;
    if !grid.projection.is_empty() {
        dataset.set_projection(&grid.projection)?;
    }

    for (i, (name, values)) in bands.iter().enumerate() {
        debug!("Writing band {} ({}) to {}", i + 1, name, path.display());
        let mut band = dataset.rasterband(i + 1)?;
        let mut buffer = Buffer::new(grid.size(), values.clone());
        band.write((0, 0), grid.size(), &mut buffer)?;
        band.set_description(name)?;
        band.set_no_data_value(Some(f64::NAN))?;
    }

    Ok(())
}

fn read_boundary(path: &Path) -> Result<Vec<Geometry>, GdalError> {
    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;
    let geometries = layer
        .features()
        .filter_map(|feature| feature.geometry().cloned())
        .collect();
    Ok(geometries)
}

fn boundary_extent(geometries: &[Geometry]) -> Option<Extent> {
    geometries
        .iter()
        .filter_map(|geometry| {
            let envelope = geometry.envelope();
            Extent::new(envelope.MinX, envelope.MaxX, envelope.MinY, envelope.MaxY).ok()
        })
        .reduce(|a, b| a.union(&b))
}

/// Burns `geometries` into an in-memory grid; `true` for cells whose center
/// falls inside a geometry.
fn rasterize_mask(grid: &Grid, geometries: &[Geometry]) -> Result<Vec<bool>, GdalError> {
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut mask = driver.create_with_band_type::<u8, _>("", grid.width, grid.height, 1)?;
    mask.set_geo_transform(&grid.geo_transform)?;

    let burn_values = vec![1.0; geometries.len()];
    rasterize(&mut mask, &[1], geometries, &burn_values, None)?;

    let buffer = mask
        .rasterband(1)?
        .read_as::<u8>((0, 0), grid.size(), grid.size(), None)?;
    Ok(buffer.data().iter().map(|&v| v > 0).collect())
}

/// One point per non-NaN cell, row-major, ids starting at 1.
fn cells_to_points(grid: &Grid, values: &[f32]) -> Vec<SamplePoint> {
    let mut points = Vec::new();
    for row in 0..grid.height {
        for col in 0..grid.width {
            let value = values[row * grid.width + col];
            if value.is_nan() {
                continue;
            }
            let (x, y) = extent::cell_center(&grid.geo_transform, col, row);
            points.push(SamplePoint {
                id: points.len() as u32 + 1,
                x,
                y,
                value,
            });
        }
    }
    points
}

fn remove_shapefile(path: &Path) -> std::io::Result<()> {
    for ext in SHAPEFILE_PARTS {
        let part = path.with_extension(ext);
        if part.exists() {
            std::fs::remove_file(&part)?;
        }
    }
    Ok(())
}

fn write_points(path: &Path, projection: &str, points: &[SamplePoint]) -> Result<(), GdalError> {
    let driver = DriverManager::get_driver_by_name("ESRI Shapefile")?;
    let mut dataset = driver.create_vector_only(path)?;

    let srs = if projection.is_empty() {
        None
    } else {
        Some(SpatialRef::from_wkt(projection)?)
    };
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "points".to_string());

    let mut layer = dataset.create_layer(LayerOptions {
        name: &name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbPoint,
        ..Default::default()
    })?;
    layer.create_defn_fields(&[
        ("pointid", OGRFieldType::OFTInteger),
        ("grid_code", OGRFieldType::OFTReal),
    ])?;

    for point in points {
        let geometry = Geometry::from_wkt(&format!("POINT ({} {})", point.x, point.y))?;
        layer.create_feature_fields(
            geometry,
            &["pointid", "grid_code"],
            &[
                FieldValue::IntegerValue(point.id as i32),
                FieldValue::RealValue(point.value as f64),
            ],
        )?;
    }

    Ok(())
}

fn format_value(value: f32) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

impl GeoToolbox for GdalToolbox {
    fn check_out(&mut self) -> Result<(), ToolboxError> {
        DriverManager::register_all();

        for name in REQUIRED_DRIVERS {
            DriverManager::get_driver_by_name(name).map_err(|e| {
                ToolboxError::CheckOut(format!("GDAL driver '{}' unavailable: {}", name, e))
            })?;
        }
        if DriverManager::get_driver_by_name(GRIDDED_DRIVER).is_err() {
            warn!(
                "GDAL driver '{}' unavailable, NetCDF layers cannot be extracted",
                GRIDDED_DRIVER
            );
        }

        self.checked_out = true;
        info!("GDAL toolbox checked out");
        Ok(())
    }

    fn check_in(&mut self) {
        if self.checked_out {
            info!("GDAL toolbox checked in");
        }
        self.checked_out = false;
    }

    fn make_layer(
        &self,
        source: &GriddedSource,
        entry: &SelectedIndex,
    ) -> Result<LayerHandle, ToolboxError> {
        let op = Operation::MakeLayer;
        self.ensure(op)?;

        let dataset = Dataset::open(source.gdal_path()).during(op)?;
        let band = entry.index + 1;
        let count = dataset.raster_count() as usize;
        if band > count {
            return Err(ToolboxError::failed(
                op,
                format!(
                    "{} has {} time layers, cannot extract {} ({})",
                    source.path.display(),
                    count,
                    entry.layer_name,
                    entry.date_literal
                ),
            ));
        }

        debug!(
            "Layer {} is band {} of {} at {}",
            entry.layer_name,
            band,
            source.gdal_path(),
            entry.date_literal
        );

        Ok(LayerHandle {
            name: entry.layer_name.clone(),
            source: source.clone(),
            band,
            date_literal: entry.date_literal.clone(),
        })
    }

    fn composite_bands(
        &self,
        layers: &[LayerHandle],
        output: &Path,
    ) -> Result<RasterArtifact, ToolboxError> {
        let op = Operation::CompositeBands;
        self.ensure(op)?;

        let first = layers
            .first()
            .ok_or_else(|| ToolboxError::failed(op, "no layers to composite"))?;
        let dataset = Dataset::open(first.source.gdal_path()).during(op)?;
        let grid = Grid::of(&dataset).during(op)?;

        let mut bands = Vec::with_capacity(layers.len());
        for layer in layers {
            if layer.source != first.source {
                return Err(ToolboxError::failed(
                    op,
                    format!(
                        "layer {} comes from {}, expected {}",
                        layer.name,
                        layer.source.path.display(),
                        first.source.path.display()
                    ),
                ));
            }
            debug!(
                "Reading {} ({}) from band {}",
                layer.name, layer.date_literal, layer.band
            );
            let values = read_band(&dataset, layer.band, &grid).during(op)?;
            bands.push((layer.name.clone(), values));
        }

        write_bands(output, &grid, &bands).during(op)?;
        info!(
            "Composite of {} layers ({}x{}) written to {}",
            bands.len(),
            grid.width,
            grid.height,
            output.display()
        );

        Ok(RasterArtifact {
            path: output.to_path_buf(),
            band_names: layers.iter().map(|l| l.name.clone()).collect(),
        })
    }

    fn mask_by_boundary(
        &self,
        raster: &RasterArtifact,
        boundary: &Path,
        output: &Path,
    ) -> Result<RasterArtifact, ToolboxError> {
        let op = Operation::MaskByBoundary;
        self.ensure(op)?;

        let geometries = read_boundary(boundary).during(op)?;
        if geometries.is_empty() {
            return Err(ToolboxError::failed(
                op,
                format!("{} has no features with geometry", boundary.display()),
            ));
        }

        let dataset = Dataset::open(&raster.path).during(op)?;
        let grid = Grid::of(&dataset).during(op)?;

        if let Some(area) = boundary_extent(&geometries) {
            if !grid.extent().intersects(&area) {
                return Err(ToolboxError::failed(
                    op,
                    format!(
                        "{} does not overlap {}",
                        boundary.display(),
                        raster.path.display()
                    ),
                ));
            }
        }

        let inside = rasterize_mask(&grid, &geometries).during(op)?;
        let inside_count = inside.iter().filter(|&&c| c).count();
        if inside_count == 0 {
            return Err(ToolboxError::failed(
                op,
                format!("no cell centers fall inside {}", boundary.display()),
            ));
        }
        debug!(
            "{} of {} cells inside {}",
            inside_count,
            inside.len(),
            boundary.display()
        );

        let mut bands = Vec::with_capacity(raster.band_count());
        for (i, name) in raster.band_names.iter().enumerate() {
            let mut values = read_band(&dataset, i + 1, &grid).during(op)?;
            for (value, &keep) in values.iter_mut().zip(&inside) {
                if !keep {
                    *value = f32::NAN;
                }
            }
            bands.push((name.clone(), values));
        }

        write_bands(output, &grid, &bands).during(op)?;

        let masked = Dataset::open(output).during(op)?;
        utils::log_band_summary(&masked, &format!("Masked raster {}", output.display()))
            .during(op)?;

        Ok(RasterArtifact {
            path: output.to_path_buf(),
            band_names: raster.band_names.clone(),
        })
    }

    fn raster_to_points(
        &self,
        raster: &RasterArtifact,
        output: &Path,
    ) -> Result<PointArtifact, ToolboxError> {
        let op = Operation::RasterToPoints;
        self.ensure(op)?;

        let dataset = Dataset::open(&raster.path).during(op)?;
        let grid = Grid::of(&dataset).during(op)?;
        let values = read_band(&dataset, 1, &grid).during(op)?;

        let points = cells_to_points(&grid, &values);
        if points.is_empty() {
            return Err(ToolboxError::failed(
                op,
                format!("{} has no valid cells", raster.path.display()),
            ));
        }

        remove_shapefile(output).map_err(|e| {
            ToolboxError::failed(op, format!("cannot replace {}: {}", output.display(), e))
        })?;
        write_points(output, &grid.projection, &points).during(op)?;
        info!("{} points written to {}", points.len(), output.display());

        Ok(PointArtifact {
            path: output.to_path_buf(),
            points,
        })
    }

    fn sample_to_points(
        &self,
        points: &PointArtifact,
        raster: &RasterArtifact,
    ) -> Result<AttributeTable, ToolboxError> {
        let op = Operation::SampleToPoints;
        self.ensure(op)?;

        let dataset = Dataset::open(&raster.path).during(op)?;
        let grid = Grid::of(&dataset).during(op)?;

        let count = dataset.raster_count() as usize;
        if count != raster.band_count() {
            return Err(ToolboxError::failed(
                op,
                format!(
                    "{} has {} bands, expected {}",
                    raster.path.display(),
                    count,
                    raster.band_count()
                ),
            ));
        }

        let bands = (1..=count)
            .map(|index| read_band(&dataset, index, &grid))
            .collect::<Result<Vec<_>, _>>()
            .during(op)?;

        let mut columns: Vec<String> = ID_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(raster.band_names.iter().cloned());
        let mut sampled = AttributeTable::new(columns);

        let mut outside = 0;
        for (fid, point) in points.points.iter().enumerate() {
            let cell = extent::pixel_of(&grid.geo_transform, grid.width, grid.height, point.x, point.y);
            if cell.is_none() {
                outside += 1;
            }

            let mut record = vec![
                fid.to_string(),
                point.id.to_string(),
                format_value(point.value),
            ];
            for band in &bands {
                let value = cell
                    .map(|(col, row)| band[row * grid.width + col])
                    .unwrap_or(f32::NAN);
                record.push(format_value(value));
            }
            sampled.push_row(record).during(op)?;
        }

        if outside > 0 {
            warn!(
                "{} of {} points fall outside {}, left empty",
                outside,
                points.points.len(),
                raster.path.display()
            );
        }
        debug!(
            "Sampled {} bands onto {} points",
            bands.len(),
            sampled.len()
        );

        Ok(sampled)
    }

    fn export_table(&self, table: &AttributeTable, output: &Path) -> Result<PathBuf, ToolboxError> {
        let op = Operation::TableExport;
        self.ensure(op)?;

        table::write_csv(table, output).during(op)?;
        info!("Exported {} rows to {}", table.len(), output.display());

        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const GT: [f64; 6] = [-82.0, 0.25, 0.0, 2.0, 0.0, -0.25];

    fn grid(width: usize, height: usize) -> Grid {
        Grid {
            width,
            height,
            geo_transform: GT,
            projection: String::new(),
        }
    }

    /// 4x4 raster, band `b` holds `10 * (b + 2) + cell index`.
    fn write_source(path: &Path, band_count: usize) {
        let bands: Vec<(String, Vec<f32>)> = (0..band_count)
            .map(|b| {
                let base = 10.0 * (b as f32 + 2.0);
                (format!("sst_{}", b), (0..16).map(|i| base + i as f32).collect())
            })
            .collect();
        write_bands(path, &grid(4, 4), &bands).unwrap();
    }

    // Covers the centers of the top-left 2x2 cells.
    const BOUNDARY: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "aoi"},
         "geometry": {"type": "Polygon", "coordinates": [[
            [-81.99, 1.51], [-81.51, 1.51], [-81.51, 1.99], [-81.99, 1.99], [-81.99, 1.51]
         ]]}}
    ]}"#;

    const FAR_BOUNDARY: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {},
         "geometry": {"type": "Polygon", "coordinates": [[
            [-91.0, -1.0], [-90.0, -1.0], [-90.0, 0.0], [-91.0, 0.0], [-91.0, -1.0]
         ]]}}
    ]}"#;

    fn checked_out() -> GdalToolbox {
        let mut toolbox = GdalToolbox::new();
        toolbox.check_out().unwrap();
        toolbox
    }

    fn entry(index: usize) -> SelectedIndex {
        SelectedIndex {
            index,
            layer_name: format!("sst_{}", index),
            date_literal: "time '16/05/2019 12:00:00'".to_string(),
            label: "May 2019".to_string(),
        }
    }

    #[test]
    fn test_requires_check_out() {
        let toolbox = GdalToolbox::new();
        let raster = RasterArtifact {
            path: PathBuf::from("missing.tif"),
            band_names: vec!["sst_0".to_string()],
        };

        let err = toolbox
            .raster_to_points(&raster, Path::new("points.shp"))
            .unwrap_err();
        assert!(matches!(
            err,
            ToolboxError::NotCheckedOut(Operation::RasterToPoints)
        ));
    }

    #[test]
    fn test_composite_selected_layers() {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("sst_series.tif");
        write_source(&source_path, 3);

        let toolbox = checked_out();
        let source = GriddedSource::new(&source_path, "sst");
        let layers = vec![
            toolbox.make_layer(&source, &entry(0)).unwrap(),
            toolbox.make_layer(&source, &entry(2)).unwrap(),
        ];
        assert_eq!(layers[1].band, 3);

        let output = dir.path().join("composite.tif");
        let composite = toolbox.composite_bands(&layers, &output).unwrap();
        assert_eq!(composite.band_names, vec!["sst_0", "sst_2"]);

        let dataset = Dataset::open(&output).unwrap();
        assert_eq!(dataset.raster_count() as usize, 2);
        let band = dataset.rasterband(2).unwrap();
        assert_eq!(band.description().unwrap(), "sst_2");

        let values = read_band(&dataset, 2, &grid(4, 4)).unwrap();
        assert_eq!(values[0], 40.0);
        assert_eq!(values[15], 55.0);
    }

    #[test]
    fn test_make_layer_out_of_range() {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("sst_series.tif");
        write_source(&source_path, 2);

        let toolbox = checked_out();
        let source = GriddedSource::new(&source_path, "sst");
        let err = toolbox.make_layer(&source, &entry(5)).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::MakeLayer));
    }

    #[test]
    fn test_mask_points_and_sample() {
        let dir = tempdir().unwrap();
        let composite_path = dir.path().join("composite.tif");
        write_source(&composite_path, 2);
        let boundary = dir.path().join("aoi.geojson");
        fs::write(&boundary, BOUNDARY).unwrap();

        let toolbox = checked_out();
        let composite = RasterArtifact {
            path: composite_path,
            band_names: vec!["sst_0".to_string(), "sst_1".to_string()],
        };

        let masked = toolbox
            .mask_by_boundary(&composite, &boundary, &dir.path().join("aoi_mask.tif"))
            .unwrap();
        assert_eq!(masked.band_names, composite.band_names);

        let points_path = dir.path().join("aoi_points.shp");
        let points = toolbox.raster_to_points(&masked, &points_path).unwrap();
        let grid_codes: Vec<f32> = points.points.iter().map(|p| p.value).collect();
        assert_eq!(grid_codes, vec![20.0, 21.0, 24.0, 25.0]);
        assert!(points_path.exists());

        let shapefile = Dataset::open(&points_path).unwrap();
        assert_eq!(shapefile.layer(0).unwrap().feature_count(), 4);

        let sampled = toolbox.sample_to_points(&points, &masked).unwrap();
        assert_eq!(
            sampled.columns(),
            vec!["FID", "pointid", "grid_code", "sst_0", "sst_1"]
        );
        assert_eq!(sampled.len(), 4);
        assert_eq!(sampled.rows()[0], vec!["0", "1", "20", "20", "30"]);
        assert_eq!(sampled.rows()[3], vec!["3", "4", "25", "25", "35"]);

        // Rewriting the point file replaces it.
        let again = toolbox.raster_to_points(&masked, &points_path).unwrap();
        assert_eq!(again.points.len(), 4);
    }

    #[test]
    fn test_grid_code_matches_band_value_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fractional.tif");
        let cells = vec![24.1, 26.35, f32::NAN, 23.7];
        write_bands(&path, &grid(2, 2), &[("sst_0".to_string(), cells)]).unwrap();

        let toolbox = checked_out();
        let raster = RasterArtifact {
            path,
            band_names: vec!["sst_0".to_string()],
        };
        let points = toolbox
            .raster_to_points(&raster, &dir.path().join("fractional_points.shp"))
            .unwrap();
        let sampled = toolbox.sample_to_points(&points, &raster).unwrap();

        assert_eq!(sampled.rows()[0], vec!["0", "1", "24.1", "24.1"]);
        assert_eq!(sampled.rows()[1], vec!["1", "2", "26.35", "26.35"]);
        assert_eq!(sampled.rows()[2], vec!["2", "3", "23.7", "23.7"]);
    }

    #[test]
    fn test_mask_outside_raster_fails() {
        let dir = tempdir().unwrap();
        let composite_path = dir.path().join("composite.tif");
        write_source(&composite_path, 1);
        let boundary = dir.path().join("galapagos.geojson");
        fs::write(&boundary, FAR_BOUNDARY).unwrap();

        let toolbox = checked_out();
        let composite = RasterArtifact {
            path: composite_path,
            band_names: vec!["sst_0".to_string()],
        };

        let err = toolbox
            .mask_by_boundary(&composite, &boundary, &dir.path().join("mask.tif"))
            .unwrap_err();
        assert_eq!(err.operation(), Some(Operation::MaskByBoundary));
        assert!(err.to_string().contains("does not overlap"));
    }

    #[test]
    fn test_unreadable_boundary_fails() {
        let dir = tempdir().unwrap();
        let composite_path = dir.path().join("composite.tif");
        write_source(&composite_path, 1);

        let toolbox = checked_out();
        let composite = RasterArtifact {
            path: composite_path,
            band_names: vec!["sst_0".to_string()],
        };

        let err = toolbox
            .mask_by_boundary(
                &composite,
                &dir.path().join("missing.shp"),
                &dir.path().join("mask.tif"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ToolboxError::Gdal {
                operation: Operation::MaskByBoundary,
                ..
            }
        ));
    }

    #[test]
    fn test_cells_to_points_skips_nan() {
        let values = vec![1.0, f32::NAN, f32::NAN, 4.0];
        let points = cells_to_points(&grid(2, 2), &values);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id, 1);
        assert_eq!((points[0].x, points[0].y), (-81.875, 1.875));
        assert_eq!(points[1].id, 2);
        assert_eq!((points[1].x, points[1].y), (-81.625, 1.625));
        assert_eq!(points[1].value, 4.0);
    }
}
