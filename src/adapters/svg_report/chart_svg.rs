//! Standalone SVG line and scatter charts.

use std::fmt::Write;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 480.0;
const PADDING: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    Dashed,
    /// Line with a dot on every point.
    LineMarkers,
    /// Dots only.
    Scatter,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: &'static str,
    pub style: SeriesStyle,
}

/// A highlighted point with guide lines to both axes.
#[derive(Debug, Clone)]
pub struct Highlight {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub highlights: Vec<Highlight>,
    /// Text for the left and right ends of the x axis, replacing the numeric bounds.
    pub x_bounds_text: Option<(String, String)>,
    /// Lines of text under the plot.
    pub notes: Vec<String>,
}

struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn of(chart: &Chart) -> Option<Self> {
        let xs = chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .chain(chart.highlights.iter().map(|h| (h.x, h.y)))
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        let mut bounds: Option<Bounds> = None;
        for (x, y) in xs {
            let b = bounds.get_or_insert(Bounds {
                min_x: x,
                max_x: x,
                min_y: y,
                max_y: y,
            });
            b.min_x = b.min_x.min(x);
            b.max_x = b.max_x.max(x);
            b.min_y = b.min_y.min(y);
            b.max_y = b.max_y.max(y);
        }
        bounds
    }

    fn x_scale(&self) -> f64 {
        let range = self.max_x - self.min_x;
        if range > 0.0 {
            (WIDTH - 2.0 * PADDING) / range
        } else {
            0.0
        }
    }

    fn y_scale(&self) -> f64 {
        let range = self.max_y - self.min_y;
        if range > 0.0 {
            (HEIGHT - 2.0 * PADDING) / range
        } else {
            0.0
        }
    }

    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let px = if self.x_scale() > 0.0 {
            PADDING + (x - self.min_x) * self.x_scale()
        } else {
            WIDTH / 2.0
        };
        let py = if self.y_scale() > 0.0 {
            HEIGHT - PADDING - (y - self.min_y) * self.y_scale()
        } else {
            HEIGHT / 2.0
        };
        (px, py)
    }
}

/// Escapes text for use inside SVG elements and attributes.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the chart, or an empty string when it has no finite points.
pub fn render_chart(chart: &Chart) -> String {
    let Some(bounds) = Bounds::of(chart) else {
        return String::new();
    };
    let notes_height = chart.notes.len() as f64 * 18.0;
    let total_height = HEIGHT + notes_height;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{total_height:.0}" viewBox="0 0 {WIDTH:.0} {total_height:.0}" font-family="sans-serif">"#
    );
    let _ = writeln!(
        svg,
        r##"<rect width="100%" height="100%" fill="#ffffff"/>"##
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="28" text-anchor="middle" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape(&chart.title)
    );

    write_axes(&mut svg, chart, &bounds);

    for series in &chart.series {
        write_series(&mut svg, series, &bounds);
    }
    for highlight in &chart.highlights {
        write_highlight(&mut svg, highlight, &bounds);
    }
    write_legend(&mut svg, chart);

    for (i, note) in chart.notes.iter().enumerate() {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"#,
            WIDTH / 2.0,
            HEIGHT + 14.0 + i as f64 * 18.0,
            escape(note)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn write_axes(svg: &mut String, chart: &Chart, bounds: &Bounds) {
    let bottom = HEIGHT - PADDING;
    let right = WIDTH - PADDING;
    let _ = writeln!(
        svg,
        r##"<line x1="{PADDING:.1}" y1="{PADDING:.1}" x2="{PADDING:.1}" y2="{bottom:.1}" stroke="#333333"/>"##
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{PADDING:.1}" y1="{bottom:.1}" x2="{right:.1}" y2="{bottom:.1}" stroke="#333333"/>"##
    );

    let (x_lo, x_hi) = match &chart.x_bounds_text {
        Some((lo, hi)) => (lo.clone(), hi.clone()),
        None => (format_tick(bounds.min_x), format_tick(bounds.max_x)),
    };
    let _ = writeln!(
        svg,
        r#"<text x="{PADDING:.1}" y="{:.1}" text-anchor="start" font-size="11">{}</text>"#,
        bottom + 16.0,
        escape(&x_lo)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{right:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
        bottom + 16.0,
        escape(&x_hi)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{bottom:.1}" text-anchor="end" font-size="11">{}</text>"#,
        PADDING - 4.0,
        format_tick(bounds.min_y)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
        PADDING - 4.0,
        PADDING + 4.0,
        format_tick(bounds.max_y)
    );

    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        WIDTH / 2.0,
        bottom + 36.0,
        escape(&chart.x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 16 {:.1})">{}</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0,
        escape(&chart.y_label)
    );
}

fn write_series(svg: &mut String, series: &Series, bounds: &Bounds) {
    let projected: Vec<(f64, f64)> = series
        .points
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|&(x, y)| bounds.project(x, y))
        .collect();
    if projected.is_empty() {
        return;
    }

    if series.style != SeriesStyle::Scatter {
        let points: Vec<String> = projected
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();
        let dash = if series.style == SeriesStyle::Dashed {
            r#" stroke-dasharray="6 4""#
        } else {
            ""
        };
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="2"{} points="{}"/>"#,
            series.color,
            dash,
            points.join(" ")
        );
    }

    if matches!(series.style, SeriesStyle::LineMarkers | SeriesStyle::Scatter) {
        let (radius, opacity) = if series.style == SeriesStyle::Scatter {
            (2.0, 0.35)
        } else {
            (3.0, 1.0)
        };
        for (x, y) in &projected {
            let _ = writeln!(
                svg,
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="{radius:.1}" fill="{}" fill-opacity="{opacity}"/>"#,
                series.color
            );
        }
    }
}

fn write_highlight(svg: &mut String, highlight: &Highlight, bounds: &Bounds) {
    if !(highlight.x.is_finite() && highlight.y.is_finite()) {
        return;
    }
    let (x, y) = bounds.project(highlight.x, highlight.y);
    let bottom = HEIGHT - PADDING;
    let _ = writeln!(
        svg,
        r#"<line x1="{x:.1}" y1="{PADDING:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="{c}" stroke-dasharray="4 4"/>"#,
        c = highlight.color
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{c}" stroke-dasharray="4 4"/>"#,
        WIDTH - PADDING,
        c = highlight.color
    );
    let _ = writeln!(
        svg,
        r#"<path d="M{:.1},{:.1} L{:.1},{:.1} M{:.1},{:.1} L{:.1},{:.1}" stroke="{}" stroke-width="3"/>"#,
        x - 6.0,
        y - 6.0,
        x + 6.0,
        y + 6.0,
        x - 6.0,
        y + 6.0,
        x + 6.0,
        y - 6.0,
        highlight.color
    );
}

fn write_legend(svg: &mut String, chart: &Chart) {
    let entries = chart
        .series
        .iter()
        .map(|s| (s.label.as_str(), s.color))
        .chain(chart.highlights.iter().map(|h| (h.label.as_str(), h.color)))
        .filter(|(label, _)| !label.is_empty());
    for (i, (label, color)) in entries.enumerate() {
        let y = PADDING + 8.0 + i as f64 * 16.0;
        let x = WIDTH - PADDING - 170.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{:.1}" width="10" height="10" fill="{color}"/>"#,
            y - 9.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{y:.1}" font-size="11">{}</text>"#,
            x + 16.0,
            escape(label)
        );
    }
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && (magnitude < 0.01 || magnitude >= 1e6) {
        format!("{value:.2e}")
    } else if magnitude >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.3}")
    }
}
