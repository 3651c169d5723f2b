// Primitives for reading CSV files.

use std::fs::File;

use referendum_map::table::RawTable;
use referendum_map::ReferenceTables;

use crate::report::{io_common::display_path, *};

/// Reads a CSV file with a header row into a raw table.
///
/// Rows of different lengths are accepted here; the missing cells are
/// reported by the schema checks of the pipeline.
pub fn read_csv_table(path: &Path, name: &str, delimiter: u8) -> RefmapResult<RawTable> {
    let path_s = display_path(path);
    info!("Attempting to read {} file {:?}", name, path_s);
    let mut rdr = get_reader(path, delimiter)?;

    let columns: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu {
            path: path_s.clone(),
            lineno: 1usize,
        })?
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .collect();
    debug!("read_csv_table: {} columns: {:?}", name, columns);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {
            path: path_s.clone(),
            lineno,
        })?;
        rows.push(line.iter().map(|s| s.to_string()).collect());
    }
    debug!("read_csv_table: {} rows in {}", rows.len(), name);

    Ok(RawTable {
        name: name.to_string(),
        columns,
        rows,
    })
}

fn get_reader(path: &Path, delimiter: u8) -> RefmapResult<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: display_path(path),
        })
}

pub fn read_reference_tables(settings: &ReportSettings) -> RefmapResult<ReferenceTables> {
    Ok(ReferenceTables {
        referendum: read_csv_table(
            &settings.referendum_path,
            "referendum",
            settings.referendum_delimiter,
        )?,
        regions: read_csv_table(&settings.regions_path, "regions", b',')?,
        departments: read_csv_table(&settings.departments_path, "departments", b',')?,
    })
}
