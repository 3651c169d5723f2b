mod config;
use log::{debug, info, warn};

use std::collections::{BTreeMap, HashMap, HashSet};

pub mod builder;
pub mod manual;
pub mod table;

pub use crate::config::*;
use crate::table::*;

/// Department names that are dropped from the report.
///
/// This list does not cover all the overseas territories. The other ones are
/// dropped by their code (see `is_abroad_code`).
pub const EXCLUDED_DEPARTMENTS: [&str; 3] = ["GUADELOUPE", "REUNION", "TAHITI"];

/// Codes containing this character mark overseas territories and French
/// people living abroad.
pub const ABROAD_CODE_MARKER: char = 'Z';

/// The three raw reference tables, as produced by a reader.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReferenceTables {
    pub referendum: RawTable,
    pub regions: RawTable,
    pub departments: RawTable,
}

/// Merges the regions and the departments in one table.
///
/// This is an inner join: the departments with an unknown region and the
/// regions without department are dropped. The rows follow the order of the
/// regions, then the order of the departments.
pub fn merge_regions_and_departments(
    regions: &[Region],
    departments: &[Department],
) -> Vec<GeographyRow> {
    let mut deps_by_region: HashMap<&RegionCode, Vec<&Department>> = HashMap::new();
    for dep in departments.iter() {
        deps_by_region.entry(&dep.region_code).or_default().push(dep);
    }

    let mut res: Vec<GeographyRow> = Vec::new();
    for region in regions.iter() {
        if let Some(deps) = deps_by_region.get(&region.code) {
            for dep in deps.iter() {
                res.push(GeographyRow {
                    region_code: region.code.clone(),
                    region_name: region.name.clone(),
                    department_code: dep.code.clone(),
                    department_name: dep.name.clone(),
                });
            }
        }
    }

    let region_codes: HashSet<&RegionCode> = regions.iter().map(|r| &r.code).collect();
    let orphans = departments
        .iter()
        .filter(|d| !region_codes.contains(&d.region_code))
        .count();
    if orphans > 0 {
        warn!(
            "merge_regions_and_departments: dropping {} departments with an unknown region",
            orphans
        );
    }
    debug!(
        "merge_regions_and_departments: {} regions, {} departments -> {} rows",
        regions.len(),
        departments.len(),
        res.len()
    );
    res
}

/// True if the row is dropped by the named-territory rule.
pub fn is_excluded_department(name: &str) -> bool {
    EXCLUDED_DEPARTMENTS.contains(&name)
}

/// True if the row is dropped by the code rule.
pub fn is_abroad_code(code: &DepartmentCode) -> bool {
    code.as_str().contains(ABROAD_CODE_MARKER)
}

/// Drops the excluded territories, pads the department codes and attaches
/// the region of each ballot row.
///
/// This is a left join: the rows for which no department is found are kept,
/// without region.
pub fn merge_referendum_and_areas(
    ballots: &[BallotRow],
    geography: &[GeographyRow],
) -> Vec<AnnotatedBallot> {
    let named: Vec<&BallotRow> = ballots
        .iter()
        .filter(|b| !is_excluded_department(&b.department_name))
        .collect();
    let in_scope: Vec<&BallotRow> = named
        .into_iter()
        .filter(|b| !is_abroad_code(&b.department_code))
        .collect();
    debug!(
        "merge_referendum_and_areas: {} of {} ballot rows in scope",
        in_scope.len(),
        ballots.len()
    );

    let mut geo_by_dep: HashMap<&DepartmentCode, Vec<&GeographyRow>> = HashMap::new();
    for g in geography.iter() {
        geo_by_dep.entry(&g.department_code).or_default().push(g);
    }

    let mut unmatched: HashSet<DepartmentCode> = HashSet::new();
    let mut res: Vec<AnnotatedBallot> = Vec::new();
    for b in in_scope.into_iter() {
        let mut ballot = b.clone();
        ballot.department_code = b.department_code.padded();
        match geo_by_dep.get(&ballot.department_code) {
            Some(matches) => {
                for g in matches.iter() {
                    res.push(AnnotatedBallot {
                        ballot: ballot.clone(),
                        region: Some(RegionRef {
                            code: g.region_code.clone(),
                            name: g.region_name.clone(),
                        }),
                    });
                }
            }
            None => {
                unmatched.insert(ballot.department_code.clone());
                res.push(AnnotatedBallot {
                    ballot,
                    region: None,
                });
            }
        }
    }
    if !unmatched.is_empty() {
        let mut codes: Vec<&DepartmentCode> = unmatched.iter().collect();
        codes.sort();
        warn!(
            "merge_referendum_and_areas: no region found for departments {:?}",
            codes
        );
    }
    res
}

/// Checks that region names and region codes correspond one to one, and
/// returns the (code, name) pairs sorted by name.
fn canonical_regions(rows: &[&AnnotatedBallot]) -> Result<Vec<RegionRef>, ReportErrors> {
    let mut code_by_name: BTreeMap<&str, &RegionCode> = BTreeMap::new();
    let mut name_by_code: HashMap<&RegionCode, &str> = HashMap::new();
    for region in rows.iter().filter_map(|r| r.region.as_ref()) {
        if let Some(code) = code_by_name.insert(region.name.as_str(), &region.code) {
            if *code != region.code {
                let mut candidates = vec![code.to_string(), region.code.to_string()];
                candidates.sort();
                return Err(ReportErrors::AmbiguousMapping {
                    key: region.name.clone(),
                    candidates,
                });
            }
        }
        if let Some(name) = name_by_code.insert(&region.code, region.name.as_str()) {
            if name != region.name {
                let mut candidates = vec![name.to_string(), region.name.clone()];
                candidates.sort();
                return Err(ReportErrors::AmbiguousMapping {
                    key: region.code.to_string(),
                    candidates,
                });
            }
        }
    }
    Ok(code_by_name
        .into_iter()
        .map(|(name, code)| RegionRef {
            code: code.clone(),
            name: name.to_string(),
        })
        .collect())
}

/// Sums the counts of the ballot rows by region.
///
/// The sums are grouped by region name and indexed by region code; the result
/// is sorted by region name. The rows without region are not counted.
pub fn compute_referendum_result_by_regions(
    annotated: &[AnnotatedBallot],
) -> Result<RegionalResults, ReportErrors> {
    let (located, orphans): (Vec<&AnnotatedBallot>, Vec<&AnnotatedBallot>) =
        annotated.iter().partition(|a| a.region.is_some());
    if !orphans.is_empty() {
        warn!(
            "compute_referendum_result_by_regions: {} ballot rows without region are not counted",
            orphans.len()
        );
    }

    let index_order = canonical_regions(&located)?;

    let mut sums: HashMap<&str, VoteCounts> = HashMap::new();
    for a in located.iter() {
        if let Some(region) = a.region.as_ref() {
            let e = sums.entry(region.name.as_str()).or_insert(VoteCounts::EMPTY);
            *e += a.ballot.counts;
        }
    }

    let mut rows: Vec<RegionalResult> = Vec::with_capacity(index_order.len());
    for region in index_order.into_iter() {
        let counts = sums
            .get(region.name.as_str())
            .cloned()
            .unwrap_or(VoteCounts::EMPTY);
        rows.push(RegionalResult {
            region_code: region.code,
            region_name: region.name,
            counts,
        });
    }
    rows.sort_by(|a, b| a.region_name.cmp(&b.region_name));
    debug!(
        "compute_referendum_result_by_regions: index {:?}",
        rows.iter().map(|r| r.region_code.as_str()).collect::<Vec<_>>()
    );
    Ok(RegionalResults { rows })
}

/// Joins the regional results to the geometries and computes the ratio of
/// Choice A over the expressed ballots.
///
/// This is a left join: every geometry is kept, in the order of the source.
pub fn build_referendum_map(
    features: &[GeometryFeature],
    results: &RegionalResults,
) -> Result<ReferendumMap, ReportErrors> {
    let by_code: HashMap<&RegionCode, &RegionalResult> =
        results.rows.iter().map(|r| (&r.region_code, r)).collect();

    let mut rows: Vec<MapRow> = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        let code = match feature.join_key.as_deref() {
            Some(k) if !k.trim().is_empty() => RegionCode(k.trim().to_string()),
            _ => {
                return Err(ReportErrors::GeometryJoin {
                    feature: idx,
                    reason: "missing region code".to_string(),
                })
            }
        };
        let geometry = feature
            .geometry
            .clone()
            .ok_or_else(|| ReportErrors::GeometryJoin {
                feature: idx,
                reason: format!("region {code} has no geometry"),
            })?;
        let result = by_code.get(&code).map(|r| (*r).clone());
        if result.is_none() {
            debug!("build_referendum_map: no result for region {}", code);
        }
        let ratio = result.as_ref().and_then(|r| r.counts.ratio());
        rows.push(MapRow {
            region_code: code,
            label: feature.label.clone(),
            geometry,
            result,
            ratio,
        });
    }

    let joined: HashSet<&RegionCode> = rows
        .iter()
        .filter(|r| r.result.is_some())
        .map(|r| &r.region_code)
        .collect();
    for r in results.rows.iter() {
        if !joined.contains(&r.region_code) {
            warn!(
                "build_referendum_map: region {} ({}) has no geometry",
                r.region_code, r.region_name
            );
        }
    }
    Ok(ReferendumMap { rows })
}

/// Runs the whole pipeline, from the typed reference rows to the results by
/// region.
pub fn run_referendum_stats(
    ballots: &[BallotRow],
    regions: &[Region],
    departments: &[Department],
) -> Result<RegionalResults, ReportErrors> {
    info!(
        "Processing {:?} ballot rows, {:?} regions, {:?} departments",
        ballots.len(),
        regions.len(),
        departments.len()
    );
    let geography = merge_regions_and_departments(regions, departments);
    info!("Geography: {} departments with a region", geography.len());
    let annotated = merge_referendum_and_areas(ballots, &geography);
    info!("Ballot rows in scope: {}", annotated.len());
    let results = compute_referendum_result_by_regions(&annotated)?;
    for r in results.rows.iter() {
        info!(
            "Region {}: {} -> {} / {}",
            r.region_code, r.region_name, r.counts.choice_a, r.counts.choice_b
        );
    }
    Ok(results)
}

/// Same as `run_referendum_stats`, starting from the raw tables.
pub fn run_referendum_tables(tables: &ReferenceTables) -> Result<RegionalResults, ReportErrors> {
    let regions = regions_from_table(&tables.regions)?;
    let departments = departments_from_table(&tables.departments)?;
    let ballots = ballots_from_table(&tables.referendum)?;
    run_referendum_stats(&ballots, &regions, &departments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn region(code: &str, name: &str) -> Region {
        Region {
            code: RegionCode::from(code),
            name: name.to_string(),
        }
    }

    fn department(code: &str, name: &str, region_code: &str) -> Department {
        Department {
            code: DepartmentCode::from(code),
            name: name.to_string(),
            region_code: RegionCode::from(region_code),
        }
    }

    fn ballot(code: &str, name: &str, counts: [u64; 5]) -> BallotRow {
        BallotRow {
            department_code: DepartmentCode::from(code),
            department_name: name.to_string(),
            town_code: None,
            town_name: None,
            counts: VoteCounts {
                registered: counts[0],
                abstentions: counts[1],
                null: counts[2],
                choice_a: counts[3],
                choice_b: counts[4],
            },
        }
    }

    fn square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]])
    }

    fn feature(code: &str) -> GeometryFeature {
        GeometryFeature {
            join_key: Some(code.to_string()),
            label: None,
            geometry: Some(square()),
        }
    }

    fn sample_regions() -> Vec<Region> {
        vec![
            region("84", "Auvergne-Rhône-Alpes"),
            region("11", "Île-de-France"),
            region("94", "Corse"),
            region("01", "Guadeloupe"),
        ]
    }

    fn sample_departments() -> Vec<Department> {
        vec![
            department("01", "Ain", "84"),
            department("75", "Paris", "11"),
            department("2A", "Corse-du-Sud", "94"),
            department("03", "Allier", "84"),
            department("971", "Guadeloupe", "01"),
            department("99", "Nowhere", "XX"),
        ]
    }

    fn sample_ballots() -> Vec<BallotRow> {
        vec![
            ballot("1", "AIN", [100, 20, 2, 40, 38]),
            ballot("1", "AIN", [50, 10, 0, 30, 10]),
            ballot("75", "PARIS", [1000, 200, 10, 500, 290]),
            ballot("2A", "CORSE SUD", [80, 10, 0, 20, 50]),
            ballot("3", "ALLIER", [60, 6, 4, 25, 25]),
            ballot("ZA", "GUADELOUPE", [70, 7, 0, 30, 33]),
            ballot("ZD", "REUNION", [70, 7, 0, 30, 33]),
            ballot("ZX", "SAINT-MARTIN", [10, 1, 0, 5, 4]),
            ballot("971Z", "MAYOTTE", [10, 1, 0, 5, 4]),
            ballot("44", "LOIRE ATLANTIQUE", [10, 1, 0, 5, 4]),
        ]
    }

    #[test]
    fn end_to_end_single_region() {
        init();
        let results = run_referendum_stats(
            &[ballot("01", "D1", [100, 10, 2, 50, 38])],
            &[region("1", "R1")],
            &[department("01", "D1", "1")],
        )
        .unwrap();
        assert_eq!(
            results.rows(),
            &[RegionalResult {
                region_code: RegionCode::from("1"),
                region_name: "R1".to_string(),
                counts: VoteCounts {
                    registered: 100,
                    abstentions: 10,
                    null: 2,
                    choice_a: 50,
                    choice_b: 38
                }
            }]
        );

        let map = build_referendum_map(&[feature("1")], &results).unwrap();
        let ratio = map.rows[0].ratio.unwrap();
        assert!((ratio - 50.0 / 88.0).abs() < 1e-12);
        assert!((ratio - 0.568).abs() < 1e-3);
    }

    #[test]
    fn geography_is_an_inner_join() {
        let regions = sample_regions();
        let departments = sample_departments();
        let geography = merge_regions_and_departments(&regions, &departments);
        let codes: Vec<&str> = geography.iter().map(|g| g.department_code.as_str()).collect();
        // Region order first, then department order.
        assert_eq!(codes, vec!["01", "03", "75", "2A", "971"]);
        for g in geography.iter() {
            assert!(departments.iter().any(|d| d.code == g.department_code));
            assert!(regions.iter().any(|r| r.code == g.region_code));
        }
        assert_eq!(geography[0].region_name, "Auvergne-Rhône-Alpes");
        assert_eq!(geography[0].department_name, "Ain");
    }

    #[test]
    fn geography_keeps_duplicate_regions() {
        let regions = vec![region("1", "R1"), region("1", "R1 bis")];
        let departments = vec![department("01", "D1", "1")];
        let geography = merge_regions_and_departments(&regions, &departments);
        assert_eq!(geography.len(), 2);
    }

    #[test]
    fn exclusions() {
        init();
        let geography = merge_regions_and_departments(&sample_regions(), &sample_departments());
        let annotated = merge_referendum_and_areas(&sample_ballots(), &geography);
        let names: Vec<&str> = annotated
            .iter()
            .map(|a| a.ballot.department_name.as_str())
            .collect();
        assert!(!names.contains(&"REUNION"));
        assert!(!names.contains(&"GUADELOUPE"));
        assert!(!names.contains(&"MAYOTTE"));
        assert!(!names.contains(&"SAINT-MARTIN"));
        assert_eq!(annotated.len(), 6);

        // Applying the rules again does not remove anything.
        let again: Vec<&AnnotatedBallot> = annotated
            .iter()
            .filter(|a| !is_excluded_department(&a.ballot.department_name))
            .filter(|a| !is_abroad_code(&a.ballot.department_code))
            .collect();
        assert_eq!(again.len(), annotated.len());
    }

    #[test]
    fn named_exclusion_is_case_sensitive() {
        let geography: Vec<GeographyRow> = vec![];
        let annotated = merge_referendum_and_areas(
            &[
                ballot("974", "REUNION", [1, 0, 0, 1, 0]),
                ballot("974", "Reunion", [1, 0, 0, 1, 0]),
            ],
            &geography,
        );
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].ballot.department_name, "Reunion");
    }

    #[test]
    fn codes_are_padded_as_strings() {
        let geography = merge_regions_and_departments(&sample_regions(), &sample_departments());
        let annotated = merge_referendum_and_areas(&sample_ballots(), &geography);
        let codes: Vec<&str> = annotated
            .iter()
            .map(|a| a.ballot.department_code.as_str())
            .collect();
        assert_eq!(codes, vec!["01", "01", "75", "2A", "03", "44"]);
        let corsica = &annotated[3];
        assert_eq!(corsica.region.as_ref().unwrap().name, "Corse");
    }

    #[test]
    fn unmatched_ballots_are_kept_without_region() {
        let geography = merge_regions_and_departments(&sample_regions(), &sample_departments());
        let annotated = merge_referendum_and_areas(&sample_ballots(), &geography);
        let loire = annotated
            .iter()
            .find(|a| a.ballot.department_code.as_str() == "44")
            .unwrap();
        assert_eq!(loire.region, None);
    }

    #[test]
    fn results_by_region() {
        init();
        let results =
            run_referendum_stats(&sample_ballots(), &sample_regions(), &sample_departments())
                .unwrap();
        let names: Vec<&str> = results.rows().iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(names, vec!["Auvergne-Rhône-Alpes", "Corse", "Île-de-France"]);
        let index: Vec<&str> = results.index().iter().map(|c| c.as_str()).collect();
        assert_eq!(index, vec!["84", "94", "11"]);

        let ara = results.get(&RegionCode::from("84")).unwrap();
        assert_eq!(
            ara.counts,
            VoteCounts {
                registered: 210,
                abstentions: 36,
                null: 6,
                choice_a: 95,
                choice_b: 73
            }
        );
        // The unmatched department is not counted anywhere.
        assert_eq!(results.total().registered, 210 + 1000 + 80);
    }

    #[test]
    fn sums_are_conserved() {
        let geography = merge_regions_and_departments(&sample_regions(), &sample_departments());
        let annotated = merge_referendum_and_areas(&sample_ballots(), &geography);
        let results = compute_referendum_result_by_regions(&annotated).unwrap();
        for r in results.rows() {
            let expected: u64 = annotated
                .iter()
                .filter(|a| a.region.as_ref().map(|x| &x.code) == Some(&r.region_code))
                .map(|a| a.ballot.counts.registered)
                .sum();
            assert_eq!(r.counts.registered, expected);
            // The name matches the name of the code in the geography.
            let g = geography.iter().find(|g| g.region_code == r.region_code).unwrap();
            assert_eq!(g.region_name, r.region_name);
        }
    }

    #[test]
    fn ambiguous_region_name() {
        let annotated = vec![
            AnnotatedBallot {
                ballot: ballot("01", "D1", [1, 0, 0, 1, 0]),
                region: Some(RegionRef {
                    code: RegionCode::from("1"),
                    name: "R".to_string(),
                }),
            },
            AnnotatedBallot {
                ballot: ballot("02", "D2", [1, 0, 0, 1, 0]),
                region: Some(RegionRef {
                    code: RegionCode::from("2"),
                    name: "R".to_string(),
                }),
            },
        ];
        assert_eq!(
            compute_referendum_result_by_regions(&annotated),
            Err(ReportErrors::AmbiguousMapping {
                key: "R".to_string(),
                candidates: vec!["1".to_string(), "2".to_string()]
            })
        );
    }

    #[test]
    fn ambiguous_region_code() {
        let regions = vec![region("1", "R1"), region("1", "R1 bis")];
        let departments = vec![department("01", "D1", "1")];
        let res = run_referendum_stats(
            &[ballot("01", "D1", [1, 0, 0, 1, 0])],
            &regions,
            &departments,
        );
        assert!(matches!(res, Err(ReportErrors::AmbiguousMapping { .. })));
    }

    #[test]
    fn map_is_a_left_join() {
        let results =
            run_referendum_stats(&sample_ballots(), &sample_regions(), &sample_departments())
                .unwrap();
        let features = vec![feature("11"), feature("53"), feature("84"), feature("94")];
        let map = build_referendum_map(&features, &results).unwrap();
        let codes: Vec<&str> = map.rows.iter().map(|r| r.region_code.as_str()).collect();
        assert_eq!(codes, vec!["11", "53", "84", "94"]);
        assert!(map.rows[1].result.is_none());
        assert_eq!(map.rows[1].ratio, None);
        for row in map.rows.iter() {
            if let Some(ratio) = row.ratio {
                assert!((0.0..=1.0).contains(&ratio));
            }
        }
        let (lo, hi) = map.ratio_range().unwrap();
        assert!(lo <= hi);
        assert!((lo - 20.0 / 70.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_is_undefined_without_expressed_ballots() {
        let results = run_referendum_stats(
            &[ballot("01", "D1", [10, 8, 2, 0, 0])],
            &[region("1", "R1")],
            &[department("01", "D1", "1")],
        )
        .unwrap();
        let map = build_referendum_map(&[feature("1")], &results).unwrap();
        assert!(map.rows[0].result.is_some());
        assert_eq!(map.rows[0].ratio, None);
        assert_eq!(map.ratio_range(), None);
    }

    #[test]
    fn geometry_without_code() {
        let results = run_referendum_stats(&[], &[], &[]).unwrap();
        let features = vec![
            feature("1"),
            GeometryFeature {
                join_key: None,
                label: Some("Somewhere".to_string()),
                geometry: Some(square()),
            },
        ];
        assert_eq!(
            build_referendum_map(&features, &results),
            Err(ReportErrors::GeometryJoin {
                feature: 1,
                reason: "missing region code".to_string()
            })
        );
    }

    #[test]
    fn raw_tables() {
        let mut referendum = RawTable::new(
            "referendum",
            &[
                COL_DEPARTMENT_CODE,
                COL_DEPARTMENT_NAME,
                COL_REGISTERED,
                COL_ABSTENTIONS,
                COL_NULL,
                COL_CHOICE_A,
                COL_CHOICE_B,
            ],
        );
        referendum.push_row(&["1", "D1", "100", "10", "2", "50", "38"]);
        let mut regions = RawTable::new("regions", &["code", "name"]);
        regions.push_row(&["1", "R1"]);
        let mut departments = RawTable::new("departments", &["code", "name", "region_code"]);
        departments.push_row(&["01", "D1", "1"]);
        let tables = ReferenceTables {
            referendum,
            regions,
            departments,
        };
        let results = run_referendum_tables(&tables).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.rows()[0].counts.choice_a, 50);

        let mut broken = tables;
        broken.regions = RawTable::new("regions", &["id", "name"]);
        assert!(matches!(
            run_referendum_tables(&broken),
            Err(ReportErrors::Schema { .. })
        ));
    }
}
