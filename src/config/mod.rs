use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::readers::{self, GriddedSource};
use crate::time_index::{MatchMode, MonthFilter};

pub mod error;
pub use error::ConfigError;

const DEFAULT_VARIABLE: &str = "sst";
const DEFAULT_COMPOSITE_NAME: &str = "SST_compMOI.tif";

pub const MASK_SUFFIX: &str = "_mask.tif";
pub const POINTS_SUFFIX: &str = "_points.shp";
pub const EXPORT_SUFFIX: &str = "_values.csv";
pub const OUTPUT_SUFFIX: &str = ".csv";

const AREA_OUTPUT_SUFFIXES: [&str; 4] = [MASK_SUFFIX, POINTS_SUFFIX, EXPORT_SUFFIX, OUTPUT_SUFFIX];

/// One area of interest: a boundary polygon file and the stem used for
/// every file written for it.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AreaSpec {
    pub boundary: PathBuf,
    pub output_name: String,
}

impl AreaSpec {
    pub fn new<P: AsRef<Path>>(boundary: P, output_name: &str) -> Self {
        Self {
            boundary: boundary.as_ref().to_path_buf(),
            output_name: output_name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    working_dir: PathBuf,
    dataset: PathBuf,
    variable: String,
    months: MonthFilter,
    match_mode: MatchMode,
    composite_name: String,
    areas: Vec<AreaSpec>,
}

// Deserializes a Config, validating month codes, file kinds and output names.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigHelper {
            working_dir: PathBuf,
            dataset: PathBuf,
            variable: Option<String>,
            months: Vec<String>,
            match_mode: Option<MatchMode>,
            composite_name: Option<String>,
            areas: Vec<AreaSpec>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let months = MonthFilter::parse(helper.months.as_slice())
            .map_err(|e| D::Error::custom(ConfigError::Months(e)))?;

        let mut config = Config::new(helper.working_dir, helper.dataset, months, helper.areas)
            .map_err(D::Error::custom)?;

        if let Some(variable) = helper.variable {
            config = config.with_variable(&variable).map_err(D::Error::custom)?;
        }

        if let Some(composite_name) = helper.composite_name {
            config = config
                .with_composite_name(&composite_name)
                .map_err(D::Error::custom)?;
        }

        Ok(config.with_match_mode(helper.match_mode.unwrap_or_default()))
    }
}

impl Config {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        working_dir: P,
        dataset: Q,
        months: MonthFilter,
        areas: Vec<AreaSpec>,
    ) -> Result<Self, ConfigError> {
        readers::require_gridded(dataset.as_ref())?;
        validate_areas(&areas)?;

        let config = Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            dataset: dataset.as_ref().to_path_buf(),
            variable: DEFAULT_VARIABLE.to_string(),
            months,
            match_mode: MatchMode::default(),
            composite_name: DEFAULT_COMPOSITE_NAME.to_string(),
            areas,
        };
        config.check_output_collisions()?;

        Ok(config)
    }

    pub fn with_variable(mut self, variable: &str) -> Result<Self, ConfigError> {
        let variable = variable.trim();
        if variable.is_empty() {
            return Err(ConfigError::EmptyVariable);
        }
        self.variable = variable.to_string();
        Ok(self)
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn with_composite_name(mut self, composite_name: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidCompositeName(composite_name.to_string());
        if has_separator(composite_name) {
            return Err(invalid());
        }
        match readers::file_type_from_path(Path::new(composite_name)) {
            Ok(readers::FileType::GeoTiff) => {
                self.composite_name = composite_name.to_string();
                self.check_output_collisions()?;
                Ok(self)
            }
            _ => Err(invalid()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn months(&self) -> &MonthFilter {
        &self.months
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn areas(&self) -> &[AreaSpec] {
        &self.areas
    }

    /// Resolves `path` against the working directory unless it is absolute.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    pub fn dataset_source(&self) -> GriddedSource {
        GriddedSource::new(self.resolve(&self.dataset), &self.variable)
    }

    pub fn composite_path(&self) -> PathBuf {
        self.working_dir.join(&self.composite_name)
    }

    pub fn boundary_path(&self, area: &AreaSpec) -> PathBuf {
        self.resolve(&area.boundary)
    }

    /// Path of an output file for `area`, e.g. `<working_dir>/<stem>_mask.tif`.
    pub fn area_output(&self, area: &AreaSpec, suffix: &str) -> PathBuf {
        self.working_dir
            .join(format!("{}{}", area.output_name, suffix))
    }
}

impl Config {
    /// Every file name written into the working directory, paired with
    /// what writes it.
    fn output_files(&self) -> Vec<(String, String)> {
        let mut files = vec![(self.composite_name.clone(), "the composite".to_string())];
        for area in &self.areas {
            for suffix in AREA_OUTPUT_SUFFIXES {
                files.push((
                    format!("{}{}", area.output_name, suffix),
                    format!("area '{}'", area.output_name),
                ));
            }
        }
        files
    }

    fn check_output_collisions(&self) -> Result<(), ConfigError> {
        let mut writers: HashMap<String, String> = HashMap::new();
        for (file, writer) in self.output_files() {
            if let Some(first) = writers.get(&file) {
                return Err(ConfigError::OutputCollision {
                    file,
                    first: first.clone(),
                    second: writer,
                });
            }
            writers.insert(file, writer);
        }
        Ok(())
    }
}

fn has_separator(name: &str) -> bool {
    name.contains(['/', '\\'])
}

fn validate_areas(areas: &[AreaSpec]) -> Result<(), ConfigError> {
    if areas.is_empty() {
        return Err(ConfigError::NoAreas);
    }

    let mut seen = HashSet::new();
    for (i, area) in areas.iter().enumerate() {
        readers::require_boundary(&area.boundary)?;

        let name = area.output_name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyOutputName(i));
        }
        if has_separator(name) {
            return Err(ConfigError::InvalidOutputName(area.output_name.clone()));
        }
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateOutputName(area.output_name.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, file_path)
    }

    #[test]
    fn test_from_file() {
        let (_dir, path) = write_config(
            r#"
    {
        "working_dir": "/data/gis",
        "dataset": "erdMBsstdmday_LonPM180.nc",
        "months": ["05", "07"],
        "areas": [
            { "boundary": "RM_Machalilla_GSF_WGS84.shp", "output_name": "SST_ValuesRMGSF_RMM" },
            { "boundary": "/abs/galapagos.geojson", "output_name": "SST_Galapagos" }
        ]
    }
    "#,
        );

        let config = Config::from_file(path).unwrap();

        assert_eq!(config.variable(), "sst");
        assert_eq!(config.match_mode(), MatchMode::Substring);
        assert_eq!(config.months().codes().len(), 2);
        assert_eq!(config.areas().len(), 2);

        assert_eq!(
            config.dataset_source().path,
            PathBuf::from("/data/gis/erdMBsstdmday_LonPM180.nc")
        );
        assert_eq!(
            config.composite_path(),
            PathBuf::from("/data/gis/SST_compMOI.tif")
        );
        assert_eq!(
            config.boundary_path(&config.areas()[0]),
            PathBuf::from("/data/gis/RM_Machalilla_GSF_WGS84.shp")
        );
        assert_eq!(
            config.boundary_path(&config.areas()[1]),
            PathBuf::from("/abs/galapagos.geojson")
        );
        assert_eq!(
            config.area_output(&config.areas()[0], ".csv"),
            PathBuf::from("/data/gis/SST_ValuesRMGSF_RMM.csv")
        );
    }

    #[test]
    fn test_optional_fields() {
        let (_dir, path) = write_config(
            r#"
    {
        "working_dir": "gis",
        "dataset": "sst.nc",
        "variable": "analysed_sst",
        "months": ["12"],
        "match_mode": "month_field",
        "composite_name": "december.tif",
        "areas": [{ "boundary": "aoi.gpkg", "output_name": "aoi" }]
    }
    "#,
        );

        let config = Config::from_file(path).unwrap();

        assert_eq!(config.variable(), "analysed_sst");
        assert_eq!(config.match_mode(), MatchMode::MonthField);
        assert_eq!(config.composite_path(), PathBuf::from("gis/december.tif"));
    }

    #[test]
    fn test_invalid_month_code() {
        let (_dir, path) = write_config(
            r#"
    {
        "working_dir": ".",
        "dataset": "sst.nc",
        "months": ["5"],
        "areas": [{ "boundary": "aoi.shp", "output_name": "aoi" }]
    }
    "#,
        );

        let err = Config::from_file(path).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("invalid month code"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/config.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_area_validation() {
        let months = MonthFilter::parse(&["05"]).unwrap();

        let no_areas = Config::new(".", "sst.nc", months.clone(), vec![]);
        assert!(matches!(no_areas, Err(ConfigError::NoAreas)));

        let duplicate = Config::new(
            ".",
            "sst.nc",
            months.clone(),
            vec![AreaSpec::new("a.shp", "out"), AreaSpec::new("b.shp", "out")],
        );
        assert!(matches!(duplicate, Err(ConfigError::DuplicateOutputName(_))));

        let empty_name = Config::new(".", "sst.nc", months.clone(), vec![AreaSpec::new("a.shp", " ")]);
        assert!(matches!(empty_name, Err(ConfigError::EmptyOutputName(0))));

        let nested = Config::new(".", "sst.nc", months.clone(), vec![AreaSpec::new("a.shp", "x/y")]);
        assert!(matches!(nested, Err(ConfigError::InvalidOutputName(_))));

        let raster_boundary = Config::new(".", "sst.nc", months.clone(), vec![AreaSpec::new("a.tif", "a")]);
        assert!(matches!(raster_boundary, Err(ConfigError::File(_))));

        let not_netcdf = Config::new(".", "sst.tif", months, vec![AreaSpec::new("a.shp", "a")]);
        assert!(matches!(not_netcdf, Err(ConfigError::File(_))));
    }

    #[test]
    fn test_derived_output_files_must_not_collide() {
        let months = MonthFilter::parse(&["05"]).unwrap();

        // "a" exports a_values.csv, which is the final table of "a_values"
        let export_clash = Config::new(
            ".",
            "sst.nc",
            months.clone(),
            vec![AreaSpec::new("a.shp", "a"), AreaSpec::new("b.shp", "a_values")],
        );
        match export_clash {
            Err(ConfigError::OutputCollision { file, first, second }) => {
                assert_eq!(file, "a_values.csv");
                assert_eq!(first, "area 'a'");
                assert_eq!(second, "area 'a_values'");
            }
            other => panic!("expected an output collision, got {:?}", other),
        }

        let config = Config::new(".", "sst.nc", months, vec![AreaSpec::new("x.shp", "x")]).unwrap();
        let composite_clash = config.clone().with_composite_name("x_mask.tif");
        assert!(matches!(
            composite_clash,
            Err(ConfigError::OutputCollision { ref file, .. }) if file == "x_mask.tif"
        ));

        assert!(config.with_composite_name("x_composite.tif").is_ok());
    }

    #[test]
    fn test_colliding_composite_rejected_from_file() {
        let (_dir, path) = write_config(
            r#"
    {
        "working_dir": ".",
        "dataset": "sst.nc",
        "months": ["05"],
        "composite_name": "aoi_mask.tif",
        "areas": [{ "boundary": "aoi.shp", "output_name": "aoi" }]
    }
    "#,
        );

        let err = Config::from_file(path).unwrap_err();
        assert!(err.to_string().contains("aoi_mask.tif"));
    }

    #[test]
    fn test_builder_validation() {
        let months = MonthFilter::parse(&["05"]).unwrap();
        let config = Config::new(".", "sst.nc", months, vec![AreaSpec::new("a.shp", "a")]).unwrap();

        assert!(matches!(
            config.clone().with_variable("  "),
            Err(ConfigError::EmptyVariable)
        ));
        assert!(matches!(
            config.clone().with_composite_name("composite.csv"),
            Err(ConfigError::InvalidCompositeName(_))
        ));
        assert!(matches!(
            config.with_composite_name("../composite.tif"),
            Err(ConfigError::InvalidCompositeName(_))
        ));
    }
}
