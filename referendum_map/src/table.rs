//! Raw tables, as produced by the readers, and their conversion to typed rows.
//!
//! All the schema checks of the pipeline happen here: once a table has been
//! converted, the steps only deal with typed rows.

use log::debug;

use crate::config::*;

pub const COL_CODE: &str = "code";
pub const COL_NAME: &str = "name";
pub const COL_REGION_CODE: &str = "region_code";

pub const COL_DEPARTMENT_CODE: &str = "Department code";
pub const COL_DEPARTMENT_NAME: &str = "Department name";
pub const COL_TOWN_CODE: &str = "Town code";
pub const COL_TOWN_NAME: &str = "Town name";
pub const COL_REGISTERED: &str = "Registered";
pub const COL_ABSTENTIONS: &str = "Abstentions";
pub const COL_NULL: &str = "Null";
pub const COL_CHOICE_A: &str = "Choice A";
pub const COL_CHOICE_B: &str = "Choice B";

/// A table of strings with named columns.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    /// The name of the table, only used in error messages.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: &str, columns: &[&str]) -> RawTable {
        RawTable {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: &[&str]) {
        self.rows.push(row.iter().map(|c| c.to_string()).collect());
    }

    /// The position of a column. Leading and trailing whitespaces in the
    /// header are not significant.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == column)
    }

    fn require(&self, column: &str) -> Result<usize, ReportErrors> {
        self.column_index(column).ok_or_else(|| ReportErrors::Schema {
            table: self.name.clone(),
            column: column.to_string(),
            reason: "missing column".to_string(),
        })
    }

    fn cell<'a>(&self, row: &'a [String], idx: usize, lineno: usize) -> Result<&'a str, ReportErrors> {
        row.get(idx)
            .map(|s| s.trim())
            .ok_or_else(|| ReportErrors::Schema {
                table: self.name.clone(),
                column: self.columns[idx].clone(),
                reason: format!("row {lineno} is too short"),
            })
    }

    fn count(&self, row: &[String], idx: usize, lineno: usize) -> Result<u64, ReportErrors> {
        let s = self.cell(row, idx, lineno)?;
        s.parse::<u64>().map_err(|_| ReportErrors::Schema {
            table: self.name.clone(),
            column: self.columns[idx].clone(),
            reason: format!("row {lineno}: {s:?} is not a non-negative integer"),
        })
    }
}

pub fn regions_from_table(table: &RawTable) -> Result<Vec<Region>, ReportErrors> {
    let code_idx = table.require(COL_CODE)?;
    let name_idx = table.require(COL_NAME)?;
    let mut res: Vec<Region> = Vec::new();
    for (lineno, row) in table.rows.iter().enumerate() {
        res.push(Region {
            code: RegionCode(table.cell(row, code_idx, lineno)?.to_string()),
            name: table.cell(row, name_idx, lineno)?.to_string(),
        });
    }
    debug!("regions_from_table: {} regions", res.len());
    Ok(res)
}

pub fn departments_from_table(table: &RawTable) -> Result<Vec<Department>, ReportErrors> {
    let code_idx = table.require(COL_CODE)?;
    let name_idx = table.require(COL_NAME)?;
    let region_idx = table.require(COL_REGION_CODE)?;
    let mut res: Vec<Department> = Vec::new();
    for (lineno, row) in table.rows.iter().enumerate() {
        res.push(Department {
            code: DepartmentCode(table.cell(row, code_idx, lineno)?.to_string()),
            name: table.cell(row, name_idx, lineno)?.to_string(),
            region_code: RegionCode(table.cell(row, region_idx, lineno)?.to_string()),
        });
    }
    debug!("departments_from_table: {} departments", res.len());
    Ok(res)
}

/// Reads the ballot rows. The town columns are optional, all the others are
/// required.
pub fn ballots_from_table(table: &RawTable) -> Result<Vec<BallotRow>, ReportErrors> {
    let dep_code_idx = table.require(COL_DEPARTMENT_CODE)?;
    let dep_name_idx = table.require(COL_DEPARTMENT_NAME)?;
    let town_code_idx = table.column_index(COL_TOWN_CODE);
    let town_name_idx = table.column_index(COL_TOWN_NAME);
    let registered_idx = table.require(COL_REGISTERED)?;
    let abstentions_idx = table.require(COL_ABSTENTIONS)?;
    let null_idx = table.require(COL_NULL)?;
    let choice_a_idx = table.require(COL_CHOICE_A)?;
    let choice_b_idx = table.require(COL_CHOICE_B)?;

    let mut res: Vec<BallotRow> = Vec::new();
    for (lineno, row) in table.rows.iter().enumerate() {
        let department_code = table.cell(row, dep_code_idx, lineno)?;
        if department_code.is_empty() {
            return Err(ReportErrors::Schema {
                table: table.name.clone(),
                column: COL_DEPARTMENT_CODE.to_string(),
                reason: format!("row {lineno}: empty department code"),
            });
        }
        let optional = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i)).map(|s| s.trim().to_string())
        };
        res.push(BallotRow {
            department_code: DepartmentCode(department_code.to_string()),
            department_name: table.cell(row, dep_name_idx, lineno)?.to_string(),
            town_code: optional(town_code_idx),
            town_name: optional(town_name_idx),
            counts: VoteCounts {
                registered: table.count(row, registered_idx, lineno)?,
                abstentions: table.count(row, abstentions_idx, lineno)?,
                null: table.count(row, null_idx, lineno)?,
                choice_a: table.count(row, choice_a_idx, lineno)?,
                choice_b: table.count(row, choice_b_idx, lineno)?,
            },
        });
    }
    debug!("ballots_from_table: {} ballot rows", res.len());
    Ok(res)
}
