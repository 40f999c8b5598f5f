//! In-memory toolbox recording every request, for driver tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use super::{
    GeoToolbox, LayerHandle, Operation, OperationContext, PointArtifact, RasterArtifact,
    SamplePoint, ToolboxError,
};
use crate::readers::GriddedSource;
use crate::table::{self, AttributeTable, ID_COLUMNS};
use crate::time_index::SelectedIndex;

#[derive(Debug, Default)]
pub struct RecordingToolbox {
    pub calls: RefCell<Vec<String>>,
    pub check_outs: usize,
    pub check_ins: usize,
    pub refuse_check_out: bool,
    pub fail_composite: bool,
    /// Boundary file name whose mask request fails.
    pub fail_boundary: Option<String>,
    /// Extra value columns appended by sampling, to break alignment.
    pub extra_value_columns: usize,
    pub points_per_area: usize,
    pub checked_out: bool,
}

impl RecordingToolbox {
    pub fn is_checked_out(&self) -> bool {
        self.checked_out
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, operation: Operation, detail: String) -> Result<(), ToolboxError> {
        if !self.checked_out {
            return Err(ToolboxError::NotCheckedOut(operation));
        }
        self.calls
            .borrow_mut()
            .push(format!("{}:{}", operation, detail));
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl GeoToolbox for RecordingToolbox {
    fn check_out(&mut self) -> Result<(), ToolboxError> {
        if self.refuse_check_out {
            return Err(ToolboxError::CheckOut("license unavailable".to_string()));
        }
        self.check_outs += 1;
        self.checked_out = true;
        Ok(())
    }

    fn check_in(&mut self) {
        self.check_ins += 1;
        self.checked_out = false;
    }

    fn make_layer(
        &self,
        source: &GriddedSource,
        entry: &SelectedIndex,
    ) -> Result<LayerHandle, ToolboxError> {
        self.record(Operation::MakeLayer, entry.layer_name.clone())?;
        Ok(LayerHandle {
            name: entry.layer_name.clone(),
            source: source.clone(),
            band: entry.index + 1,
            date_literal: entry.date_literal.clone(),
        })
    }

    fn composite_bands(
        &self,
        layers: &[LayerHandle],
        output: &Path,
    ) -> Result<RasterArtifact, ToolboxError> {
        self.record(Operation::CompositeBands, layers.len().to_string())?;
        if self.fail_composite {
            return Err(ToolboxError::failed(
                Operation::CompositeBands,
                "disk full",
            ));
        }
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
        let name = file_name(boundary);
        self.record(Operation::MaskByBoundary, name.clone())?;
        if self.fail_boundary.as_deref() == Some(name.as_str()) {
            return Err(ToolboxError::failed(
                Operation::MaskByBoundary,
                format!("cannot open {}", name),
            ));
        }
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
        self.record(Operation::RasterToPoints, file_name(&raster.path))?;
        let points = (1..=self.points_per_area as u32)
            .map(|id| SamplePoint {
                id,
                x: -80.0 + id as f64 * 0.04,
                y: -1.5,
                value: 24.0 + id as f32 / 10.0,
            })
            .collect();
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
        self.record(Operation::SampleToPoints, file_name(&points.path))?;

        let mut columns: Vec<String> = ID_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(raster.band_names.iter().cloned());
        columns.extend((0..self.extra_value_columns).map(|i| format!("extra_{}", i)));

        let value_count = columns.len() - ID_COLUMNS.len();
        let mut sampled = AttributeTable::new(columns);
        for (fid, point) in points.points.iter().enumerate() {
            let mut row = vec![
                fid.to_string(),
                point.id.to_string(),
                point.value.to_string(),
            ];
            row.extend((0..value_count).map(|band| (point.value + band as f32).to_string()));
            sampled
                .push_row(row)
                .during(Operation::SampleToPoints)?;
        }
        Ok(sampled)
    }

    fn export_table(&self, table: &AttributeTable, output: &Path) -> Result<PathBuf, ToolboxError> {
        self.record(Operation::TableExport, file_name(output))?;
        table::write_csv(table, output).during(Operation::TableExport)?;
        Ok(output.to_path_buf())
    }
}
