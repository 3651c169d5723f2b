use clap::Parser;

/// This program reports the results of a referendum by region and draws them on a map.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the data sources and the outputs.
    /// For more information about the file format, read the manual of the referendum_map crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, default 'data') The directory containing referendum.csv, regions.csv,
    /// departments.csv and regions.geojson. Overrides the directory of the configuration file.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// (file path, default 'referendum_map.svg') Where to write the map, in SVG format.
    #[clap(short, long, value_parser)]
    pub map: Option<String>,

    /// (text) The title of the map.
    #[clap(long, value_parser)]
    pub title: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the results by region will be written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the results by region in JSON format. If provided,
    /// refmap will check that the computed results match the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
