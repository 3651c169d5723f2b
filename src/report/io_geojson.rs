// Primitives for reading the region boundaries.

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson, JsonValue};

use crate::report::{io_common::display_path, *};

/// The property holding the region code.
pub const CODE_PROPERTY: &str = "code";
/// The properties that may hold a label for the region, by preference.
pub const LABEL_PROPERTIES: [&str; 2] = ["nom", "name"];

pub fn read_region_geometries(path: &Path) -> RefmapResult<Vec<GeometryFeature>> {
    let path_s = display_path(path);
    info!("Attempting to read geometry file {:?}", path_s);
    let contents = fs::read_to_string(path).context(OpeningFileSnafu {
        path: path_s.clone(),
    })?;
    parse_region_geometries(&contents, &path_s)
}

pub fn parse_region_geometries(contents: &str, path: &str) -> RefmapResult<Vec<GeometryFeature>> {
    let gj: GeoJson = contents
        .parse::<GeoJson>()
        .context(ParsingGeoJsonSnafu { path })?;
    let fc = FeatureCollection::try_from(gj).context(ParsingGeoJsonSnafu { path })?;
    debug!("{} features in {}", fc.features.len(), path);

    let mut res: Vec<GeometryFeature> = Vec::new();
    for (idx, feature) in fc.features.into_iter().enumerate() {
        res.push(read_feature(idx, feature, path)?);
    }
    Ok(res)
}

// Numbers are accepted as codes, the other JSON types are not.
fn property_as_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key) {
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn read_feature(idx: usize, feature: Feature, path: &str) -> RefmapResult<GeometryFeature> {
    let join_key = property_as_string(&feature, CODE_PROPERTY);
    let label = LABEL_PROPERTIES
        .iter()
        .find_map(|k| property_as_string(&feature, k));
    let geometry = match feature.geometry {
        Some(g) => Some(to_multi_polygon(idx, g, path)?),
        None => None,
    };
    debug!(
        "read_feature: #{} code {:?} label {:?}",
        idx, join_key, label
    );
    Ok(GeometryFeature {
        join_key,
        label,
        geometry,
    })
}

fn to_multi_polygon(
    idx: usize,
    geometry: geojson::Geometry,
    path: &str,
) -> RefmapResult<MultiPolygon<f64>> {
    let g = Geometry::<f64>::try_from(geometry).context(ParsingGeoJsonSnafu { path })?;
    match g {
        Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        _ => whatever!(
            "Feature #{} of {}: only polygons and multipolygons are supported",
            idx,
            path
        ),
    }
}
