//! CART regression trees (squared error) used as boosting stages.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Smallest improvement of the split criterion worth a new node.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// A node in preorder: children always come after their parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// `x[feature] <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Wraps hand-built or deserialized nodes after a structural check.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, ModelError> {
        let tree = Self { nodes };
        if !tree.is_well_formed(usize::MAX) {
            return Err(ModelError::InvalidConfig("malformed tree".into()));
        }
        Ok(tree)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Caller guarantees `x` is as wide as the model (checked by the ensemble).
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if x[feature] <= threshold { left } else { right },
            }
        }
    }

    /// Non-empty, children strictly after parents and in range, features below
    /// `n_features`, finite values. Guarantees `predict` terminates.
    pub fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(id, node)| match *node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    feature < n_features
                        && threshold.is_finite()
                        && left > id
                        && right > id
                        && left < self.nodes.len()
                        && right < self.nodes.len()
                }
            })
    }

    /// Fits one tree on `(x, y)`. Inputs are validated by the ensemble.
    pub(crate) fn fit(x: &[Vec<f64>], y: &[f64], config: &TreeConfig) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let sorted = (0..n_features)
            .map(|f| {
                let mut order: Vec<usize> = (0..x.len()).collect();
                order.sort_by(|&a, &b| x[a][f].total_cmp(&x[b][f]).then(a.cmp(&b)));
                order
            })
            .collect();

        let mut builder = Builder {
            x,
            y,
            config,
            nodes: Vec::new(),
            go_left: vec![false; x.len()],
        };
        builder.grow(sorted, 0);
        Self {
            nodes: builder.nodes,
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a TreeConfig,
    nodes: Vec<Node>,
    go_left: Vec<bool>,
}

impl Builder<'_> {
    /// `sorted[f]` holds this node's sample indices ordered by feature `f`.
    fn grow(&mut self, sorted: Vec<Vec<usize>>, depth: usize) -> usize {
        let members: &[usize] = sorted.first().map(Vec::as_slice).unwrap_or(&[]);
        let n = members.len();
        let total: f64 = members.iter().map(|&i| self.y[i]).sum();

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: if n == 0 { 0.0 } else { total / n as f64 },
        });

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < self.config.min_samples_leaf.saturating_mul(2)
        {
            return id;
        }
        let Some(split) = self.best_split(&sorted, total) else {
            return id;
        };

        for &i in members {
            self.go_left[i] = self.x[i][split.feature] <= split.threshold;
        }
        let go_left = &self.go_left;
        let (left, right): (Vec<Vec<usize>>, Vec<Vec<usize>>) = sorted
            .into_iter()
            .map(|order| order.into_iter().partition(|&i| go_left[i]))
            .unzip();

        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Maximises `sum_l^2 / n_l + sum_r^2 / n_r`; the first strictly better
    /// candidate wins, so ties go to the lowest feature and threshold.
    fn best_split(&self, sorted: &[Vec<usize>], total: f64) -> Option<Split> {
        let n = sorted.first()?.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best_score = total * total / n as f64;
        let mut best = None;

        for (feature, order) in sorted.iter().enumerate() {
            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += self.y[order[k - 1]];
                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let a = self.x[order[k - 1]][feature];
                let b = self.x[order[k]][feature];
                if a == b {
                    continue;
                }

                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
                if score - best_score > MIN_GAIN {
                    best_score = score;
                    let mid = a / 2.0 + b / 2.0;
                    let threshold = if mid >= b { a } else { mid };
                    best = Some(Split { feature, threshold });
                }
            }
        }
        best
    }
}
