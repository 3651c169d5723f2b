pub use crate::config::*;

/// A builder for assembling the reference data in code.
///
/// It is the simplest entry point when the data does not come from files.
///
/// ```
/// use referendum_map::builder::Builder;
/// # use referendum_map::ReportErrors;
///
/// let mut builder = Builder::new()
///     .region("84", "Auvergne-Rhône-Alpes")
///     .department("01", "Ain", "84");
///
/// builder.add_ballot_simple("1", "AIN", [100, 10, 2, 50, 38])?;
///
/// let results = builder.run()?;
/// assert_eq!(results.rows()[0].counts.choice_a, 50);
/// # Ok::<(), ReportErrors>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _regions: Vec<Region>,
    pub(crate) _departments: Vec<Department>,
    pub(crate) _ballots: Vec<BallotRow>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn region(mut self, code: &str, name: &str) -> Builder {
        self._regions.push(Region {
            code: RegionCode::from(code),
            name: name.to_string(),
        });
        self
    }

    pub fn department(mut self, code: &str, name: &str, region_code: &str) -> Builder {
        self._departments.push(Department {
            code: DepartmentCode::from(code),
            name: name.to_string(),
            region_code: RegionCode::from(region_code),
        });
        self
    }

    /// Adds a ballot row.
    ///
    /// counts: registered, abstentions, null, choice A and choice B, in this order.
    pub fn add_ballot_simple(
        &mut self,
        department_code: &str,
        department_name: &str,
        counts: [u64; 5],
    ) -> Result<(), ReportErrors> {
        let [registered, abstentions, null, choice_a, choice_b] = counts;
        self.add_ballot(&BallotRow {
            department_code: DepartmentCode::from(department_code),
            department_name: department_name.to_string(),
            town_code: None,
            town_name: None,
            counts: VoteCounts {
                registered,
                abstentions,
                null,
                choice_a,
                choice_b,
            },
        })
    }

    pub fn add_ballot(&mut self, ballot: &BallotRow) -> Result<(), ReportErrors> {
        if ballot.department_code.as_str().trim().is_empty() {
            return Err(ReportErrors::Schema {
                table: "builder".to_string(),
                column: crate::table::COL_DEPARTMENT_CODE.to_string(),
                reason: "empty department code".to_string(),
            });
        }
        self._ballots.push(ballot.clone());
        Ok(())
    }

    pub fn ballots(&self) -> &[BallotRow] {
        &self._ballots
    }

    /// Runs the pipeline on the data added so far.
    pub fn run(&self) -> Result<RegionalResults, ReportErrors> {
        crate::run_referendum_stats(&self._ballots, &self._regions, &self._departments)
    }
}
