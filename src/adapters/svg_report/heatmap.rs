//! Annotated correlation heatmap on a blue-white-red scale, optionally with the
//! cluster dendrogram drawn to its right.

use super::chart_svg::escape;
use crate::domain::clustering::{AssetClusters, Linkage};
use nalgebra::DMatrix;
use std::fmt::Write;

const CELL: f64 = 56.0;
const MARGIN: f64 = 90.0;
const DENDROGRAM_GAP: f64 = 12.0;
const DENDROGRAM_WIDTH: f64 = 160.0;

/// Cluster structure drawn on top of the plain heatmap.
struct ClusterOverlay<'a> {
    assignments: &'a [usize],
    linkage: &'a Linkage,
}

/// Fill for a value in [-1, 1]: blue at -1, white at 0, red at 1.
pub fn diverging_color(value: f64) -> String {
    let v = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    let (cold, hot) = ((59.0, 76.0, 192.0), (180.0, 4.0, 38.0));
    let (target, t) = if v < 0.0 { (cold, -v) } else { (hot, v) };
    let mix = |c: f64| (255.0 + (c - 255.0) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(target.0), mix(target.1), mix(target.2))
}

/// Heatmap in dendrogram order with each flat cluster outlined and the merge tree
/// drawn beside the rows.
pub fn render_cluster_map(title: &str, clusters: &AssetClusters) -> String {
    if clusters.linkage.leaves() != clusters.labels.len() {
        return String::new();
    }
    let overlay = ClusterOverlay {
        assignments: &clusters.assignments,
        linkage: &clusters.linkage,
    };
    render_grid(
        title,
        &clusters.labels,
        &clusters.correlation,
        &clusters.order,
        Some(&overlay),
    )
}

/// Renders `matrix` with rows and columns in `order`, or an empty string if there is nothing to draw.
fn render_grid(
    title: &str,
    labels: &[String],
    matrix: &DMatrix<f64>,
    order: &[usize],
    overlay: Option<&ClusterOverlay<'_>>,
) -> String {
    let n = order.len();
    if n == 0 || matrix.nrows() != labels.len() || order.iter().any(|&i| i >= labels.len()) {
        return String::new();
    }

    let height = MARGIN + n as f64 * CELL + 20.0;
    let width = match overlay {
        Some(_) => height + DENDROGRAM_GAP + DENDROGRAM_WIDTH,
        None => height,
    };
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
        width / 2.0,
        escape(title)
    );

    for (row, &i) in order.iter().enumerate() {
        let y = MARGIN + row as f64 * CELL;
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            MARGIN - 6.0,
            y + CELL / 2.0 + 4.0,
            escape(&labels[i])
        );
        for (col, &j) in order.iter().enumerate() {
            let x = MARGIN + col as f64 * CELL;
            let value = matrix[(i, j)];
            let _ = writeln!(
                svg,
                r##"<rect x="{x:.1}" y="{y:.1}" width="{CELL:.1}" height="{CELL:.1}" fill="{}" stroke="#ffffff" stroke-width="0.5"/>"##,
                diverging_color(value)
            );
            let ink = if value.abs() > 0.6 { "#ffffff" } else { "#222222" };
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="{ink}">{value:.2}</text>"#,
                x + CELL / 2.0,
                y + CELL / 2.0 + 4.0
            );
        }
    }

    for (col, &j) in order.iter().enumerate() {
        let x = MARGIN + col as f64 * CELL + CELL / 2.0;
        let y = MARGIN - 8.0;
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="start" font-size="11" transform="rotate(-45 {x:.1} {y:.1})">{}</text>"#,
            escape(&labels[j])
        );
    }

    if let Some(overlay) = overlay {
        write_cluster_blocks(&mut svg, order, overlay.assignments);
        write_dendrogram(&mut svg, order, overlay.linkage);
    }

    svg.push_str("</svg>\n");
    svg
}

/// Runs of equal cluster labels along `order`, as `(first_row, row_count)`.
fn cluster_runs(order: &[usize], assignments: &[usize]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut previous = None;
    for (row, &leaf) in order.iter().enumerate() {
        let label = assignments.get(leaf).copied();
        match runs.last_mut() {
            Some(run) if label == previous => run.1 += 1,
            _ => runs.push((row, 1)),
        }
        previous = label;
    }
    runs
}

fn write_cluster_blocks(svg: &mut String, order: &[usize], assignments: &[usize]) {
    for (first, count) in cluster_runs(order, assignments) {
        let start = MARGIN + first as f64 * CELL;
        let side = count as f64 * CELL;
        let _ = writeln!(
            svg,
            r##"<rect class="cluster" x="{start:.1}" y="{start:.1}" width="{side:.1}" height="{side:.1}" fill="none" stroke="#000000" stroke-width="2"/>"##
        );
    }
}

/// Horizontal dendrogram: leaves at their heatmap rows, merge height growing to the right.
fn write_dendrogram(svg: &mut String, order: &[usize], linkage: &Linkage) {
    let n = linkage.leaves();
    let merges = linkage.merges();
    let top = merges.iter().map(|m| m.distance).fold(0.0_f64, f64::max);
    let left = MARGIN + order.len() as f64 * CELL + DENDROGRAM_GAP;
    let x_of = |distance: f64| {
        if top > 0.0 {
            left + distance / top * DENDROGRAM_WIDTH
        } else {
            left
        }
    };

    // (row centre, merge height) for every leaf and merged cluster id
    let mut nodes = vec![(0.0, 0.0); n + merges.len()];
    for (row, &leaf) in order.iter().enumerate() {
        if leaf < n {
            nodes[leaf] = (MARGIN + row as f64 * CELL + CELL / 2.0, 0.0);
        }
    }

    for (k, merge) in merges.iter().enumerate() {
        let (Some(&(y_left, d_left)), Some(&(y_right, d_right))) =
            (nodes.get(merge.left), nodes.get(merge.right))
        else {
            continue;
        };
        let x = x_of(merge.distance);
        let _ = writeln!(
            svg,
            r##"<path class="dendrogram" d="M{:.1},{y_left:.1} H{x:.1} V{y_right:.1} H{:.1}" fill="none" stroke="#333333" stroke-width="1.2"/>"##,
            x_of(d_left),
            x_of(d_right)
        );
        nodes[n + k] = ((y_left + y_right) / 2.0, merge.distance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clustering::cluster_assets;
    use crate::domain::returns::ReturnSeries;

    #[test]
    fn diverging_color_endpoints() {
        assert_eq!(diverging_color(0.0), "#ffffff");
        assert_eq!(diverging_color(1.0), "#b40426");
        assert_eq!(diverging_color(-1.0), "#3b4cc0");
        assert_eq!(diverging_color(5.0), diverging_color(1.0));
        assert_eq!(diverging_color(f64::NAN), "#ffffff");
    }

    #[test]
    fn heatmap_draws_one_cell_per_pair() {
        let labels = vec!["A".to_string(), "B".to_string()];
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, -0.5, -0.5, 1.0]);
        let svg = render_grid("Correlation", &labels, &corr, &[1, 0], None);

        assert_eq!(svg.matches("<rect x=").count(), 4);
        assert!(svg.contains("-0.50"));
        assert!(svg.contains(">B</text>"));
    }

    #[test]
    fn cluster_runs_follow_leaf_order() {
        assert_eq!(cluster_runs(&[0, 2, 1, 3], &[0, 1, 0, 1]), vec![(0, 2), (2, 2)]);
        assert_eq!(cluster_runs(&[1, 0], &[0, 0]), vec![(0, 2)]);
    }

    #[test]
    fn cluster_map_draws_dendrogram_and_blocks() {
        let series = ReturnSeries::from_rows(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            &[
                vec![0.02, 0.021, -0.01, -0.012],
                vec![-0.01, -0.011, 0.03, 0.028],
                vec![0.015, 0.014, 0.0, 0.002],
                vec![-0.02, -0.018, 0.01, 0.011],
                vec![0.01, 0.012, -0.02, -0.019],
            ],
        )
        .unwrap();
        let clusters = cluster_assets(&series, 2).unwrap();

        let svg = render_cluster_map("Clusters", &clusters);

        assert_eq!(svg.matches("<rect x=").count(), 16);
        assert_eq!(svg.matches(r#"class="cluster""#).count(), 2);
        assert_eq!(svg.matches(r#"class="dendrogram""#).count(), 3);
    }

    #[test]
    fn heatmap_rejects_bad_order() {
        let labels = vec!["A".to_string()];
        let corr = DMatrix::from_element(1, 1, 1.0);
        assert!(render_grid("t", &labels, &corr, &[3], None).is_empty());
        assert!(render_grid("t", &labels, &corr, &[], None).is_empty());
    }
}
