/*!

This is the long-form manual for `referendum_map` and `refmap`.

## Input formats

`refmap` reads four files from a data directory (`data` by default).

### `referendum.csv`

The results of the referendum, one row per town, separated by `;`:

```text
Department code;Department name;Town code;Town name;Registered;Abstentions;Null;Choice A;Choice B
1;AIN;1;L'Abergement-Clémenciat;592;94;9;216;273
```

The `Town code` and `Town name` columns are optional. All the counts must be
non-negative integers. Department codes may be written without their leading
zero (`1` for `01`); they are padded to two characters before the join.
Codes such as `2A` are kept as they are.

Two rules drop rows before the join:
- the department name is `GUADELOUPE`, `REUNION` or `TAHITI` (exact match);
- the department code contains a `Z` (overseas territories and French
  people living abroad).

The first list is known to be incomplete. It matches the reference dataset,
in which the other overseas territories are caught by the second rule.

### `regions.csv`

```text
id,code,name,slug
1,01,Guadeloupe,guadeloupe
```

Only `code` and `name` are used.

### `departments.csv`

```text
id,region_code,code,name,slug
1,84,01,Ain,ain
```

Only `region_code`, `code` and `name` are used.

### `regions.geojson`

A GeoJSON `FeatureCollection`. Every feature must have a `code` property
(a string or a number) matching the region codes, and a `Polygon` or
`MultiPolygon` geometry. The `nom` property (or `name`) is used as a label.

## Results

The results are summed by region. Rows of the referendum whose department is
not found in the geography are not counted (a warning is logged). The table is
sorted by region name and indexed by region code. A region name that
corresponds to several region codes (or a code with several names) stops
the run.

The map colors each region by the share of `Choice A` over the expressed
ballots (`Choice A` + `Choice B`). When a region has no expressed ballot, or
no result at all, the share is undefined: it is written as `null` in the JSON
summary and the region is drawn in gray.

## Configuration

`refmap` comes with defaults for all its settings. They can be changed with
a JSON configuration file passed with `--config`:

```json
{
  "dataSources": {
    "directory": "data",
    "referendumFile": "referendum.csv",
    "referendumDelimiter": ";",
    "regionsFile": "regions.csv",
    "departmentsFile": "departments.csv",
    "geometryFile": "regions.geojson"
  },
  "outputSettings": {
    "title": "Ratio par région",
    "mapPath": "referendum_map.svg",
    "summaryPath": null
  }
}
```

All the fields are optional. Relative paths are resolved against the
directory of the configuration file. The command line flags `--data-dir`,
`--map`, `--title` and `--out` take precedence over the file.

The `--reference` flag takes a JSON summary previously written with `--out`.
The run fails if the new summary differs, and the differences are printed.

 */
