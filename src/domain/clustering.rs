//! Agglomerative clustering of assets by return correlation.
//!
//! Distances come from Pearson correlation as `sqrt((1 - ρ) / 2)`, and clusters
//! are merged with Ward's criterion using the Lance-Williams update. Merge ids
//! follow the usual linkage-matrix convention: leaves are `0..n`, the `k`-th
//! merge creates cluster `n + k`.

use crate::domain::error::FinlabError;
use crate::domain::returns::ReturnSeries;
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Upper bound on the default cluster count.
pub const DEFAULT_MAX_CLUSTERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Leaves under the new cluster.
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    leaves: usize,
    merges: Vec<Merge>,
}

impl Linkage {
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Dendrogram leaf order, left branch first.
    pub fn leaf_order(&self) -> Vec<usize> {
        if self.leaves == 0 {
            return Vec::new();
        }
        let root = self.leaves + self.merges.len() - 1;
        let mut order = Vec::with_capacity(self.leaves);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id < self.leaves {
                order.push(id);
            } else {
                let merge = &self.merges[id - self.leaves];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }

    /// Flat labels for `k` clusters, numbered by first appearance in leaf order.
    ///
    /// `k` is clamped to `1..=leaves`.
    pub fn cut_tree(&self, k: usize) -> Vec<usize> {
        let n = self.leaves;
        if n == 0 {
            return Vec::new();
        }
        let k = k.clamp(1, n);

        let mut owner: Vec<usize> = (0..n).collect();
        let mut members: HashMap<usize, Vec<usize>> = (0..n).map(|i| (i, vec![i])).collect();
        for (step, merge) in self.merges.iter().take(n - k).enumerate() {
            let id = n + step;
            let mut joined = members.remove(&merge.left).unwrap_or_default();
            joined.extend(members.remove(&merge.right).unwrap_or_default());
            for &leaf in &joined {
                owner[leaf] = id;
            }
            members.insert(id, joined);
        }

        let mut label_of: HashMap<usize, usize> = HashMap::new();
        let mut labels = vec![0; n];
        for leaf in self.leaf_order() {
            let next = label_of.len();
            let label = *label_of.entry(owner[leaf]).or_insert(next);
            labels[leaf] = label;
        }
        labels
    }
}

/// Correlation-to-distance map `sqrt((1 - ρ) / 2)`, zero on the diagonal.
pub fn codependence_distance(correlation: &DMatrix<f64>) -> DMatrix<f64> {
    let n = correlation.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            (0.5 * (1.0 - correlation[(i, j)])).max(0.0).sqrt().min(1.0)
        }
    })
}

/// Ward linkage over a symmetric distance matrix.
pub fn ward_linkage(distances: &DMatrix<f64>) -> Result<Linkage, FinlabError> {
    let n = distances.nrows();
    if distances.ncols() != n {
        return Err(FinlabError::DimensionMismatch {
            context: "distance matrix columns".into(),
            expected: n,
            found: distances.ncols(),
        });
    }
    if n == 0 {
        return Err(FinlabError::InsufficientData {
            what: "assets".into(),
            required: 1,
            actual: 0,
        });
    }

    let mut d = distances.clone();
    let mut active = vec![true; n];
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut merges = Vec::with_capacity(n - 1);

    for step in 0..n - 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in (i + 1..n).filter(|&j| active[j]) {
                if best.is_none_or(|(_, _, dist)| d[(i, j)] < dist) {
                    best = Some((i, j, d[(i, j)]));
                }
            }
        }
        let Some((i, j, dist)) = best else {
            break;
        };

        let (ni, nj) = (sizes[i] as f64, sizes[j] as f64);
        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let nk = sizes[k] as f64;
            let updated = ((ni + nk) * d[(i, k)].powi(2) + (nj + nk) * d[(j, k)].powi(2)
                - nk * dist.powi(2))
                / (ni + nj + nk);
            let updated = updated.max(0.0).sqrt();
            d[(i, k)] = updated;
            d[(k, i)] = updated;
        }

        merges.push(Merge {
            left: ids[i].min(ids[j]),
            right: ids[i].max(ids[j]),
            distance: dist,
            size: sizes[i] + sizes[j],
        });
        active[j] = false;
        ids[i] = n + step;
        sizes[i] += sizes[j];
    }

    Ok(Linkage { leaves: n, merges })
}

/// Result of clustering the assets of a return series.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetClusters {
    pub labels: Vec<String>,
    /// Cluster label per asset, in series column order.
    pub assignments: Vec<usize>,
    /// Asset indices in dendrogram leaf order.
    pub order: Vec<usize>,
    pub linkage: Linkage,
    pub correlation: DMatrix<f64>,
}

impl AssetClusters {
    /// Asset labels grouped by cluster.
    pub fn groups(&self) -> Vec<Vec<&str>> {
        let count = self.assignments.iter().max().map_or(0, |m| m + 1);
        let mut groups = vec![Vec::new(); count];
        for &i in &self.order {
            groups[self.assignments[i]].push(self.labels[i].as_str());
        }
        groups
    }
}

/// Default cluster count: `min(assets, 5)`.
pub fn default_cluster_count(assets: usize) -> usize {
    assets.min(DEFAULT_MAX_CLUSTERS)
}

pub fn cluster_assets(returns: &ReturnSeries, k: usize) -> Result<AssetClusters, FinlabError> {
    let correlation = returns.correlation()?;
    let linkage = ward_linkage(&codependence_distance(&correlation))?;
    Ok(AssetClusters {
        labels: returns.labels().to_vec(),
        assignments: linkage.cut_tree(k),
        order: linkage.leaf_order(),
        linkage,
        correlation,
    })
}
