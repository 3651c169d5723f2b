// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use geo::MultiPolygon;

/// The code of a region, as found in the region reference table.
///
/// It is the index of the regional results and the join key of the map.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct RegionCode(pub String);

impl RegionCode {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RegionCode {
    fn from(s: &str) -> Self {
        RegionCode(s.to_string())
    }
}

/// The code of a department.
///
/// Codes are strings and not numbers: Corsica uses `2A` and `2B`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct DepartmentCode(pub String);

impl DepartmentCode {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Left-pads the code with zeros up to 2 characters.
    ///
    /// Longer codes are returned unchanged.
    pub fn padded(&self) -> DepartmentCode {
        let len = self.0.chars().count();
        if len >= 2 {
            self.clone()
        } else {
            DepartmentCode(format!("{}{}", "0".repeat(2 - len), self.0))
        }
    }
}

impl Display for DepartmentCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DepartmentCode {
    fn from(s: &str) -> Self {
        DepartmentCode(s.to_string())
    }
}

/// The counts reported for one ballot row, or summed over many of them.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct VoteCounts {
    pub registered: u64,
    pub abstentions: u64,
    pub null: u64,
    pub choice_a: u64,
    pub choice_b: u64,
}

impl VoteCounts {
    pub const EMPTY: VoteCounts = VoteCounts {
        registered: 0,
        abstentions: 0,
        null: 0,
        choice_a: 0,
        choice_b: 0,
    };

    /// The number of ballots cast for one of the two choices.
    pub fn expressed(&self) -> u64 {
        self.choice_a + self.choice_b
    }

    /// The share of Choice A over the expressed ballots.
    ///
    /// Returns None when no ballot was expressed: the ratio is undefined and
    /// is never reported as NaN.
    pub fn ratio(&self) -> Option<f64> {
        let expressed = self.expressed();
        if expressed == 0 {
            None
        } else {
            Some(self.choice_a as f64 / expressed as f64)
        }
    }
}

impl AddAssign for VoteCounts {
    fn add_assign(&mut self, rhs: VoteCounts) {
        self.registered += rhs.registered;
        self.abstentions += rhs.abstentions;
        self.null += rhs.null;
        self.choice_a += rhs.choice_a;
        self.choice_b += rhs.choice_b;
    }
}

impl Add for VoteCounts {
    type Output = VoteCounts;
    fn add(self: VoteCounts, rhs: VoteCounts) -> VoteCounts {
        let mut res = self;
        res += rhs;
        res
    }
}

impl Sum for VoteCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(VoteCounts::EMPTY, |acc, vc| acc + vc)
    }
}

/// One row of the referendum file: the tally of a town within a department.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotRow {
    pub department_code: DepartmentCode,
    pub department_name: String,
    pub town_code: Option<String>,
    pub town_name: Option<String>,
    pub counts: VoteCounts,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Region {
    pub code: RegionCode,
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Department {
    pub code: DepartmentCode,
    pub name: String,
    pub region_code: RegionCode,
}

// ******** Derived data structures *********

/// A department with the region it belongs to.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GeographyRow {
    pub region_code: RegionCode,
    pub region_name: String,
    pub department_code: DepartmentCode,
    pub department_name: String,
}

/// The identity of a region, as attached to a ballot row.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RegionRef {
    pub code: RegionCode,
    pub name: String,
}

/// A ballot row after exclusion, code padding and the geography join.
///
/// The region is None when the department was not found in the geography.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnnotatedBallot {
    pub ballot: BallotRow,
    pub region: Option<RegionRef>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionalResult {
    pub region_code: RegionCode,
    pub region_name: String,
    pub counts: VoteCounts,
}

/// The results by region, sorted by region name.
///
/// Every region code appears exactly once.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionalResults {
    pub(crate) rows: Vec<RegionalResult>,
}

impl RegionalResults {
    pub fn rows(&self) -> &[RegionalResult] {
        &self.rows
    }

    /// The region codes, in the order of the rows.
    pub fn index(&self) -> Vec<&RegionCode> {
        self.rows.iter().map(|r| &r.region_code).collect()
    }

    pub fn get(&self, code: &RegionCode) -> Option<&RegionalResult> {
        self.rows.iter().find(|r| r.region_code == *code)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> VoteCounts {
        self.rows.iter().map(|r| r.counts).sum()
    }
}

/// A feature read from the geometry source, before the join.
#[derive(PartialEq, Debug, Clone)]
pub struct GeometryFeature {
    /// The value of the region code property, if the feature had one.
    pub join_key: Option<String>,
    /// A human readable label for the region.
    pub label: Option<String>,
    pub geometry: Option<MultiPolygon<f64>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MapRow {
    pub region_code: RegionCode,
    pub label: Option<String>,
    pub geometry: MultiPolygon<f64>,
    pub result: Option<RegionalResult>,
    /// Choice A over the expressed ballots. None if the region has no result
    /// or no expressed ballot.
    pub ratio: Option<f64>,
}

/// The regional results joined to the region geometries, in geometry order.
#[derive(PartialEq, Debug, Clone)]
pub struct ReferendumMap {
    pub rows: Vec<MapRow>,
}

impl ReferendumMap {
    /// The smallest and largest defined ratios.
    pub fn ratio_range(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.ratio)
            .fold(None, |acc, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
            })
    }
}

/// Errors that prevent the pipeline from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ReportErrors {
    /// A required column is missing, or one of its values could not be read.
    Schema {
        table: String,
        column: String,
        reason: String,
    },
    /// A region name is associated with more than one region code, or the
    /// other way around.
    AmbiguousMapping { key: String, candidates: Vec<String> },
    /// The geometry source cannot be joined to the results.
    GeometryJoin { feature: usize, reason: String },
}

impl Error for ReportErrors {}

impl Display for ReportErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportErrors::Schema {
                table,
                column,
                reason,
            } => write!(f, "SchemaError in table {table}, column {column:?}: {reason}"),
            ReportErrors::AmbiguousMapping { key, candidates } => write!(
                f,
                "AmbiguousMappingError: {key:?} maps to several values: {candidates:?}"
            ),
            ReportErrors::GeometryJoin { feature, reason } => {
                write!(f, "GeometryJoinError on feature #{feature}: {reason}")
            }
        }
    }
}
