use crate::report::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_DIRECTORY: &str = "data";
pub const DEFAULT_REFERENDUM_FILE: &str = "referendum.csv";
pub const DEFAULT_REFERENDUM_DELIMITER: &str = ";";
pub const DEFAULT_REGIONS_FILE: &str = "regions.csv";
pub const DEFAULT_DEPARTMENTS_FILE: &str = "departments.csv";
pub const DEFAULT_GEOMETRY_FILE: &str = "regions.geojson";
pub const DEFAULT_MAP_PATH: &str = "referendum_map.svg";
pub const DEFAULT_TITLE: &str = "Ratio par région";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSources {
    pub directory: Option<String>,
    #[serde(rename = "referendumFile")]
    pub referendum_file: Option<String>,
    #[serde(rename = "referendumDelimiter")]
    pub referendum_delimiter: Option<String>,
    #[serde(rename = "regionsFile")]
    pub regions_file: Option<String>,
    #[serde(rename = "departmentsFile")]
    pub departments_file: Option<String>,
    #[serde(rename = "geometryFile")]
    pub geometry_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub title: Option<String>,
    #[serde(rename = "mapPath")]
    pub map_path: Option<String>,
    #[serde(rename = "summaryPath")]
    pub summary_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(rename = "dataSources", default)]
    pub data_sources: DataSources,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
}

/// The settings given on the command line. They take precedence over the
/// configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CommandLineOverrides {
    pub data_dir: Option<String>,
    pub map: Option<String>,
    pub title: Option<String>,
    pub out: Option<String>,
}

/// All the settings of a run, with the paths resolved.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportSettings {
    pub referendum_path: PathBuf,
    pub referendum_delimiter: u8,
    pub regions_path: PathBuf,
    pub departments_path: PathBuf,
    pub geometry_path: PathBuf,
    pub map_path: PathBuf,
    pub title: String,
    /// A file path, or 'stdout'.
    pub summary_path: Option<String>,
}

impl ReportConfig {
    /// Resolves the relative paths of the configuration against `root`, the
    /// directory of the configuration file.
    pub fn resolve(
        &self,
        root: &Path,
        overrides: &CommandLineOverrides,
    ) -> RefmapResult<ReportSettings> {
        let ds = &self.data_sources;
        let data_dir: PathBuf = match overrides.data_dir.as_deref() {
            Some(d) => PathBuf::from(d),
            None => root.join(
                ds.directory
                    .as_deref()
                    .unwrap_or(DEFAULT_DATA_DIRECTORY),
            ),
        };
        let data_file = |f: &Option<String>, default: &str| -> PathBuf {
            data_dir.join(f.as_deref().unwrap_or(default))
        };

        let os = &self.output_settings;
        let map_path = match overrides.map.as_deref() {
            Some(m) => PathBuf::from(m),
            None => root.join(os.map_path.as_deref().unwrap_or(DEFAULT_MAP_PATH)),
        };
        let summary_path = match (overrides.out.as_deref(), os.summary_path.as_deref()) {
            (Some(o), _) => Some(o.to_string()),
            (None, Some("stdout")) => Some("stdout".to_string()),
            (None, Some(s)) => Some(root.join(s).display().to_string()),
            (None, None) => None,
        };

        Ok(ReportSettings {
            referendum_path: data_file(&ds.referendum_file, DEFAULT_REFERENDUM_FILE),
            referendum_delimiter: read_delimiter(&ds.referendum_delimiter)?,
            regions_path: data_file(&ds.regions_file, DEFAULT_REGIONS_FILE),
            departments_path: data_file(&ds.departments_file, DEFAULT_DEPARTMENTS_FILE),
            geometry_path: data_file(&ds.geometry_file, DEFAULT_GEOMETRY_FILE),
            map_path,
            title: overrides
                .title
                .clone()
                .or_else(|| os.title.clone())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            summary_path,
        })
    }
}

pub fn read_config(path: &str) -> RefmapResult<ReportConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    debug!("read config: {:?}", contents);
    let config: ReportConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

fn read_delimiter(x: &Option<String>) -> RefmapResult<u8> {
    let s = x.as_deref().unwrap_or(DEFAULT_REFERENDUM_DELIMITER);
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => whatever!("The delimiter must be a single ASCII character, got {:?}", s),
    }
}
