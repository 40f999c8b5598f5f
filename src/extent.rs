/// Axis-aligned extent in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, String> {
        if ![xmin, xmax, ymin, ymax].iter().all(|v| v.is_finite()) {
            return Err("Extent coordinates must be finite".to_string());
        }

        if xmin > xmax || ymin > ymax {
            return Err("Min values must be <= max values".to_string());
        }

        Ok(Extent {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// Extent covered by a `width` x `height` raster with geotransform `gt`.
    ///
    /// geotransform: [top_left_x, pixel_width, 0, top_left_y, 0, -pixel_height]
    pub fn from_geo_transform(gt: &[f64; 6], width: usize, height: usize) -> Self {
        let x0 = gt[0];
        let x1 = gt[0] + gt[1] * width as f64;
        let y0 = gt[3];
        let y1 = gt[3] + gt[5] * height as f64;

        Extent {
            xmin: x0.min(x1),
            xmax: x0.max(x1),
            ymin: y0.min(y1),
            ymax: y0.max(y1),
        }
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
        }
    }
}

/// Map coordinates of the center of cell (`col`, `row`).
pub fn cell_center(gt: &[f64; 6], col: usize, row: usize) -> (f64, f64) {
    let px = col as f64 + 0.5;
    let py = row as f64 + 0.5;
    (
        gt[0] + px * gt[1] + py * gt[2],
        gt[3] + px * gt[4] + py * gt[5],
    )
}

/// Cell containing map point (`x`, `y`) for a north-up raster, if inside it.
pub fn pixel_of(gt: &[f64; 6], width: usize, height: usize, x: f64, y: f64) -> Option<(usize, usize)> {
    if gt[1] == 0.0 || gt[5] == 0.0 {
        return None;
    }

    let col = ((x - gt[0]) / gt[1]).floor();
    let row = ((y - gt[3]) / gt[5]).floor();

    if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
        return None;
    }

    Some((col as usize, row as usize))
}
