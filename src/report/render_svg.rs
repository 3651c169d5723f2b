// Drawing of the choropleth map, in SVG.

use std::fmt::Write as _;

use geo::{BoundingRect, Coord, LineString, Rect};

use crate::report::{io_common::display_path, *};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 700.0;
const MARGIN: f64 = 20.0;
const TITLE_HEIGHT: f64 = 40.0;
const LEGEND_WIDTH: f64 = 110.0;
const LEGEND_BAR_HEIGHT: f64 = 300.0;

/// Color of the regions without a defined ratio.
const MISSING_COLOR: &str = "#d9d9d9";

/// Sequential orange-red ramp, from low to high ratios.
const RAMP: [(f64, [u8; 3]); 5] = [
    (0.0, [0xff, 0xf7, 0xec]),
    (0.25, [0xfd, 0xd4, 0x9e]),
    (0.5, [0xfc, 0x8d, 0x59]),
    (0.75, [0xd7, 0x30, 0x1f]),
    (1.0, [0x7f, 0x00, 0x00]),
];

fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// The color of a position between 0 and 1 on the ramp.
fn ramp_color(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    for pair in RAMP.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let u = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let mut rgb = [0u8; 3];
            for i in 0..3 {
                let v = c0[i] as f64 + u * (c1[i] as f64 - c0[i] as f64);
                rgb[i] = v.round() as u8;
            }
            return hex(rgb);
        }
    }
    hex(RAMP[RAMP.len() - 1].1)
}

/// The color of a ratio, normalized over the range of the map.
fn ratio_color(ratio: Option<f64>, range: Option<(f64, f64)>) -> String {
    match (ratio, range) {
        (Some(r), Some((lo, hi))) if hi > lo => ramp_color((r - lo) / (hi - lo)),
        (Some(_), _) => ramp_color(0.5),
        (None, _) => MISSING_COLOR.to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Equirectangular projection of the bounding box onto the drawing area.
struct Projection {
    min_x: f64,
    max_y: f64,
    x_factor: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    fn new(bounds: Rect<f64>) -> Projection {
        let mid_lat = (bounds.min().y + bounds.max().y) / 2.0;
        // Longitudes shrink with the latitude.
        let x_factor = mid_lat.to_radians().cos().abs().max(0.1);
        let w = ((bounds.max().x - bounds.min().x) * x_factor).max(f64::EPSILON);
        let h = (bounds.max().y - bounds.min().y).max(f64::EPSILON);
        let area_w = WIDTH - LEGEND_WIDTH - 2.0 * MARGIN;
        let area_h = HEIGHT - TITLE_HEIGHT - 2.0 * MARGIN;
        let scale = (area_w / w).min(area_h / h);
        Projection {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            x_factor,
            scale,
            offset_x: MARGIN + (area_w - w * scale) / 2.0,
            offset_y: MARGIN + TITLE_HEIGHT + (area_h - h * scale) / 2.0,
        }
    }

    fn project(&self, c: &Coord<f64>) -> (f64, f64) {
        (
            self.offset_x + (c.x - self.min_x) * self.x_factor * self.scale,
            self.offset_y + (self.max_y - c.y) * self.scale,
        )
    }
}

fn ring_path(ring: &LineString<f64>, proj: &Projection, d: &mut String) {
    for (idx, c) in ring.coords().enumerate() {
        let (x, y) = proj.project(c);
        let cmd = if idx == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{}{:.2},{:.2} ", cmd, x, y);
    }
    d.push('Z');
}

fn map_bounds(map: &ReferendumMap) -> Option<Rect<f64>> {
    map.rows
        .iter()
        .filter_map(|r| r.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

fn legend(svg: &mut String, range: Option<(f64, f64)>, has_missing: bool) {
    let x = WIDTH - LEGEND_WIDTH;
    let y = MARGIN + TITLE_HEIGHT;
    svg.push_str("<defs><linearGradient id=\"ramp\" x1=\"0\" y1=\"1\" x2=\"0\" y2=\"0\">");
    for (t, rgb) in RAMP.iter() {
        let _ = write!(
            svg,
            "<stop offset=\"{}\" stop-color=\"{}\"/>",
            t,
            hex(*rgb)
        );
    }
    svg.push_str("</linearGradient></defs>\n");
    let _ = writeln!(
        svg,
        "<rect x=\"{x}\" y=\"{y}\" width=\"20\" height=\"{LEGEND_BAR_HEIGHT}\" fill=\"url(#ramp)\" stroke=\"#555555\"/>"
    );
    if let Some((lo, hi)) = range {
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" font-size=\"12\">{:.3}</text>",
            x + 26.0,
            y + 10.0,
            hi
        );
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" font-size=\"12\">{:.3}</text>",
            x + 26.0,
            y + LEGEND_BAR_HEIGHT,
            lo
        );
    }
    if has_missing {
        let my = y + LEGEND_BAR_HEIGHT + 20.0;
        let _ = writeln!(
            svg,
            "<rect x=\"{x}\" y=\"{my}\" width=\"20\" height=\"12\" fill=\"{MISSING_COLOR}\" stroke=\"#555555\"/>"
        );
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" font-size=\"12\">n/a</text>",
            x + 26.0,
            my + 11.0
        );
    }
}

/// Draws the regions colored by their ratio, with a legend and a title.
/// No axis is drawn.
pub fn render_svg(map: &ReferendumMap, title: &str) -> String {
    let range = map.ratio_range();
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\">"
    );
    let _ = writeln!(
        svg,
        "<rect width=\"{WIDTH}\" height=\"{HEIGHT}\" fill=\"white\"/>"
    );
    let _ = writeln!(
        svg,
        "<text x=\"{}\" y=\"{}\" font-size=\"20\" text-anchor=\"middle\">{}</text>",
        WIDTH / 2.0,
        MARGIN + 20.0,
        escape(title)
    );

    if let Some(bounds) = map_bounds(map) {
        let proj = Projection::new(bounds);
        for row in map.rows.iter() {
            let mut d = String::new();
            for polygon in row.geometry.0.iter() {
                ring_path(polygon.exterior(), &proj, &mut d);
                for interior in polygon.interiors() {
                    ring_path(interior, &proj, &mut d);
                }
            }
            let name = row
                .label
                .clone()
                .or_else(|| row.result.as_ref().map(|r| r.region_name.clone()))
                .unwrap_or_else(|| row.region_code.to_string());
            let ratio_s = row
                .ratio
                .map(|r| format!("{:.3}", r))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                svg,
                "<path d=\"{}\" fill=\"{}\" fill-rule=\"evenodd\" stroke=\"#333333\" stroke-width=\"0.5\"><title>{} ({}): {}</title></path>",
                d.trim_end(),
                ratio_color(row.ratio, range),
                escape(&name),
                escape(row.region_code.as_str()),
                ratio_s
            );
        }
    } else {
        warn!("render_svg: no geometry to draw");
    }

    let has_missing = map.rows.iter().any(|r| r.ratio.is_none());
    legend(&mut svg, range, has_missing);
    svg.push_str("</svg>\n");
    svg
}

pub fn write_svg(map: &ReferendumMap, title: &str, path: &Path) -> RefmapResult<()> {
    let svg = render_svg(map, title);
    fs::write(path, svg).context(WritingFileSnafu {
        path: display_path(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn row(code: &str, x: f64, ratio: Option<f64>) -> MapRow {
        MapRow {
            region_code: RegionCode::from(code),
            label: Some(format!("Region <{}>", code)),
            geometry: MultiPolygon(vec![polygon![
                (x: x, y: 45.0),
                (x: x + 1.0, y: 45.0),
                (x: x + 1.0, y: 46.0),
                (x: x, y: 45.0),
            ]]),
            result: None,
            ratio,
        }
    }

    #[test]
    fn ramp_ends() {
        assert_eq!(ramp_color(0.0), "#fff7ec");
        assert_eq!(ramp_color(1.0), "#7f0000");
        assert_eq!(ramp_color(0.5), "#fc8d59");
        assert_eq!(ratio_color(None, Some((0.2, 0.8))), MISSING_COLOR);
        assert_eq!(ratio_color(Some(0.8), Some((0.2, 0.8))), "#7f0000");
        assert_eq!(ratio_color(Some(0.4), Some((0.4, 0.4))), "#fc8d59");
    }

    #[test]
    fn draws_every_region() {
        let map = ReferendumMap {
            rows: vec![
                row("1", 0.0, Some(0.25)),
                row("2", 1.0, Some(0.75)),
                row("3", 2.0, None),
            ],
        };
        let svg = render_svg(&map, "Ratio & co");
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<path ").count(), 3);
        assert!(svg.contains("Ratio &amp; co"));
        assert!(svg.contains("Region &lt;1&gt;"));
        assert!(svg.contains(MISSING_COLOR));
        assert!(svg.contains("n/a"));
        assert!(svg.contains("0.750"));
        // No axis.
        assert!(!svg.contains("<line "));
    }

    #[test]
    fn empty_map() {
        let svg = render_svg(&ReferendumMap { rows: vec![] }, "Empty");
        assert_eq!(svg.matches("<path ").count(), 0);
        assert!(svg.contains("Empty"));
    }
}
