use log::{debug, info, warn};

use referendum_map::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::report::config_reader::*;
use crate::report::io_common::simplify_file_name;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_geojson;
mod render_svg;

#[derive(Debug, Snafu)]
pub enum RefmapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of CSV file {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error parsing GeoJSON file {path}"))]
    ParsingGeoJson {
        source: geojson::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("{source}"))]
    Pipeline { source: ReportErrors },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RefmapResult<T> = Result<T, RefmapError>;

const TABLE_HEADER: [&str; 7] = [
    "code_reg",
    "name_reg",
    "Registered",
    "Abstentions",
    "Null",
    "Choice A",
    "Choice B",
];

/// The results by region, as an aligned text table.
pub fn format_results_table(results: &RegionalResults) -> String {
    let lines: Vec<[String; 7]> = results
        .rows()
        .iter()
        .map(|r| {
            [
                r.region_code.to_string(),
                r.region_name.clone(),
                r.counts.registered.to_string(),
                r.counts.abstentions.to_string(),
                r.counts.null.to_string(),
                r.counts.choice_a.to_string(),
                r.counts.choice_b.to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = TABLE_HEADER.iter().map(|h| h.chars().count()).collect();
    for line in lines.iter() {
        for (w, cell) in widths.iter_mut().zip(line.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| -> String {
        let mut s = String::new();
        for (idx, (cell, w)) in cells.iter().zip(widths.iter()).enumerate() {
            if idx > 0 {
                s.push_str("  ");
            }
            // The two text columns are aligned left, the counts to the right.
            if idx < 2 {
                s.push_str(&format!("{:<w$}", cell, w = w));
            } else {
                s.push_str(&format!("{:>w$}", cell, w = w));
            }
        }
        s.trim_end().to_string()
    };

    let header: Vec<String> = TABLE_HEADER.iter().map(|h| h.to_string()).collect();
    let mut out: Vec<String> = vec![format_line(&header[..])];
    for line in lines.iter() {
        out.push(format_line(&line[..]));
    }
    out.join("\n")
}

fn results_to_json(results: &RegionalResults) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for r in results.rows() {
        l.push(json!({
            "code_reg": r.region_code.as_str(),
            "name_reg": r.region_name,
            "Registered": r.counts.registered,
            "Abstentions": r.counts.abstentions,
            "Null": r.counts.null,
            "Choice A": r.counts.choice_a,
            "Choice B": r.counts.choice_b,
            "ratio": r.counts.ratio(),
        }));
    }
    l
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub title: String,
    pub referendum: String,
    pub regions: String,
    pub departments: String,
    pub geometry: String,
}

fn build_summary_js(settings: &ReportSettings, results: &RegionalResults) -> JSValue {
    let c = OutputConfig {
        title: settings.title.clone(),
        referendum: simplify_file_name(&settings.referendum_path),
        regions: simplify_file_name(&settings.regions_path),
        departments: simplify_file_name(&settings.departments_path),
        geometry: simplify_file_name(&settings.geometry_path),
    };
    json!({
        "config": c,
        "results": results_to_json(results) })
}

pub fn read_summary(path: &str) -> RefmapResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn write_summary(summary_path: &str, pretty_js: &str) -> RefmapResult<()> {
    if summary_path == "stdout" {
        println!("{}", pretty_js);
    } else {
        info!("Writing summary to {:?}", summary_path);
        fs::write(summary_path, pretty_js).context(WritingFileSnafu { path: summary_path })?;
    }
    Ok(())
}

/// Runs the whole report: reads the data, prints the results by region,
/// draws the map and optionally writes and checks the JSON summary.
pub fn run_report(
    config_path: Option<String>,
    overrides: &CommandLineOverrides,
    check_summary_path: Option<String>,
) -> RefmapResult<RegionalResults> {
    let (config, root_p): (ReportConfig, PathBuf) = match config_path {
        Some(p) => {
            let config = read_config(&p)?;
            let root = Path::new(p.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => (ReportConfig::default(), PathBuf::from(".")),
    };
    info!("config: {:?}", config);
    let settings = config.resolve(&root_p, overrides)?;
    debug!("settings: {:?}", settings);

    let tables = io_csv::read_reference_tables(&settings)?;
    let results = run_referendum_tables(&tables).context(PipelineSnafu {})?;

    println!("{}", format_results_table(&results));

    let features = io_geojson::read_region_geometries(&settings.geometry_path)?;
    let map = build_referendum_map(&features, &results).context(PipelineSnafu {})?;
    render_svg::write_svg(&map, &settings.title, &settings.map_path)?;
    info!("Map written to {}", settings.map_path.display());

    let result_js = build_summary_js(&settings, &results);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    if let Some(summary_p) = settings.summary_path.as_deref() {
        write_summary(summary_p, &pretty_js_stats)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("Summary matches the reference {:?}", summary_p);
    }

    Ok(results)
}

#[cfg(test)]
fn test_dir() -> String {
    option_env!("REFMAP_TEST_DIR")
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}/tests/data", env!("CARGO_MANIFEST_DIR")))
}

#[cfg(test)]
fn temp_map_path(test_name: &str) -> String {
    std::env::temp_dir()
        .join(format!("refmap_{}.svg", test_name))
        .display()
        .to_string()
}

#[cfg(test)]
fn run_report_test(
    test_name: &str,
    map_name: &str,
    summary: bool,
) -> RefmapResult<RegionalResults> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = format!("{}/{}", test_dir(), test_name);
    let config_path = format!("{}/config.json", dir);
    let has_config = Path::new(&config_path).exists();
    let overrides = CommandLineOverrides {
        data_dir: if has_config { None } else { Some(dir.clone()) },
        map: Some(temp_map_path(map_name)),
        title: None,
        out: None,
    };
    info!("Running test {}", test_name);
    run_report(
        if has_config { Some(config_path) } else { None },
        &overrides,
        if summary {
            Some(format!("{}/expected_summary.json", dir))
        } else {
            None
        },
    )
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    if let Err(e) = run_report_test(test_name, test_name, true) {
        panic!("An error occured in {}: {}", test_name, e);
    }
}
