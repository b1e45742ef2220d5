//! Ordered collections of shared point handles.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{DataError, PointHandle};

/// An ordered, append-only collection of points sharing a declared feature
/// dimensionality.
///
/// Insertion order is meaningful: for an SMBO history it records selection
/// order, and the surrogate's online state depends on it. Points are held by
/// handle, never copied — several sets may share the same points.
///
/// # Example
///
/// ```
/// use smbo::data::{Point, PointSet};
///
/// let mut set = PointSet::new(2);
/// set.push(Point::dense(0.7, vec![0.1, 0.9]).into_handle()).unwrap();
/// set.push(Point::sparse(0.4, vec![1], vec![0.5]).unwrap().into_handle()).unwrap();
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.targets(), vec![0.7, 0.4]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    points: Vec<PointHandle>,
    n_values: usize,
}

impl PointSet {
    /// Create an empty set with the given feature dimensionality.
    pub fn new(n_values: usize) -> Self {
        Self {
            points: Vec::new(),
            n_values,
        }
    }

    /// Create an empty set with capacity for `capacity` points.
    pub fn with_capacity(n_values: usize, capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            n_values,
        }
    }

    /// Declared feature dimensionality.
    #[inline]
    pub fn n_values(&self) -> usize {
        self.n_values
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a point.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::DimensionMismatch`] if the point addresses a
    /// feature index at or beyond the declared width.
    pub fn push(&mut self, point: PointHandle) -> Result<(), DataError> {
        if let Some(max_key) = point.max_key() {
            if max_key as usize >= self.n_values {
                return Err(DataError::DimensionMismatch {
                    max_key,
                    n_values: self.n_values,
                });
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Append a point already known to fit the declared width.
    pub(crate) fn push_trusted(&mut self, point: PointHandle) {
        debug_assert!(
            point
                .max_key()
                .map(|k| (k as usize) < self.n_values)
                .unwrap_or(true),
            "point exceeds the set's declared width"
        );
        self.points.push(point);
    }

    /// Append every point of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::DimensionMismatch`] on the first point that does
    /// not fit; points before it have already been appended.
    pub fn extend_from(&mut self, other: &PointSet) -> Result<(), DataError> {
        for point in other.iter() {
            self.push(point.clone())?;
        }
        Ok(())
    }

    /// Handle of the point at `index`.
    pub fn get(&self, index: usize) -> &PointHandle {
        &self.points[index]
    }

    /// Iterate over the handles in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, PointHandle> {
        self.points.iter()
    }

    /// The underlying handles as a slice.
    pub fn as_slice(&self) -> &[PointHandle] {
        &self.points
    }

    /// All targets in insertion order.
    pub fn targets(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.target()).collect()
    }

    /// Largest target, `None` if empty.
    pub fn max_target(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.target())
            .fold(None, |best, t| match best {
                Some(b) if b >= t => Some(b),
                _ => Some(t),
            })
    }

    /// Smallest target, `None` if empty.
    pub fn min_target(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.target())
            .fold(None, |best, t| match best {
                Some(b) if b <= t => Some(b),
                _ => Some(t),
            })
    }

    /// Mean and unbiased standard deviation of the targets.
    ///
    /// A set whose targets are all equal has standard deviation exactly 0;
    /// consumers scaling by it treat 0 as an identity scale. This case is
    /// short-circuited rather than computed, since `sum/n` residue would
    /// otherwise leave a spurious sd of ~1e-16. An empty set yields `(0, 0)`.
    pub fn target_mean_sd(&self) -> (f64, f64) {
        match self.points.len() {
            0 => (0.0, 0.0),
            1 => (self.points[0].target(), 0.0),
            n => {
                let first = self.points[0].target();
                if self.points.iter().all(|p| p.target() == first) {
                    return (first, 0.0);
                }
                let mean = self.points.iter().map(|p| p.target()).sum::<f64>() / n as f64;
                let sum_sq = self
                    .points
                    .iter()
                    .map(|p| {
                        let d = p.target() - mean;
                        d * d
                    })
                    .sum::<f64>();
                (mean, (sum_sq / (n - 1) as f64).sqrt())
            }
        }
    }

    /// Shuffle the points in place with a fixed seed.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.points.shuffle(&mut rng);
    }

    /// New set sharing the points at the given indices.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    pub fn subset(&self, indices: &[usize]) -> PointSet {
        let mut out = PointSet::with_capacity(self.n_values, indices.len());
        for &index in indices {
            out.points.push(self.points[index].clone());
        }
        out
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a PointHandle;
    type IntoIter = std::slice::Iter<'a, PointHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Point;
    use approx::assert_abs_diff_eq;

    fn set_of(targets: &[f64]) -> PointSet {
        let mut set = PointSet::new(1);
        for &t in targets {
            set.push_trusted(Point::dense(t, vec![0.0]).into_handle());
        }
        set
    }

    #[test]
    fn push_checks_dimensionality() {
        let mut set = PointSet::new(2);
        assert!(set.push(Point::dense(0.0, vec![1.0, 2.0]).into_handle()).is_ok());
        let wide = Point::dense(0.0, vec![1.0, 2.0, 3.0]).into_handle();
        assert!(matches!(
            set.push(wide),
            Err(DataError::DimensionMismatch { max_key: 2, n_values: 2 })
        ));

        let sparse = Point::sparse(0.0, vec![5], vec![1.0]).unwrap().into_handle();
        assert!(matches!(set.push(sparse), Err(DataError::DimensionMismatch { .. })));
    }

    #[test]
    fn target_stats_unbiased() {
        let set = set_of(&[1.0, 2.0, 3.0]);
        let (mean, sd) = set.target_mean_sd();
        assert_abs_diff_eq!(mean, 2.0);
        assert_abs_diff_eq!(sd, 1.0);

        let single = set_of(&[4.0]);
        assert_eq!(single.target_mean_sd(), (4.0, 0.0));
        assert_eq!(PointSet::new(1).target_mean_sd(), (0.0, 0.0));
    }

    #[test]
    fn all_equal_targets_have_exactly_zero_sd() {
        // 0.7 + 0.7 + 0.7 != 3 * 0.7 in floating point: without the
        // short-circuit the sd comes out ~1e-16 and downstream zero-sd
        // guards never fire.
        let set = set_of(&[0.7, 0.7, 0.7]);
        assert_eq!(set.target_mean_sd(), (0.7, 0.0));

        let larger = set_of(&[0.1; 7]);
        assert_eq!(larger.target_mean_sd(), (0.1, 0.0));
    }

    #[test]
    fn max_min_target() {
        let set = set_of(&[0.3, 0.9, 0.1]);
        assert_eq!(set.max_target(), Some(0.9));
        assert_eq!(set.min_target(), Some(0.1));
        assert_eq!(PointSet::new(1).max_target(), None);
    }

    #[test]
    fn shuffle_is_deterministic() {
        let mut a = set_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut b = a.clone();
        a.shuffle(42);
        b.shuffle(42);
        assert_eq!(a.targets(), b.targets());

        let mut c = set_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        c.shuffle(43);
        // Different seed permutes differently for this size (not guaranteed in
        // general, but stable for the fixed seeds used here).
        assert_ne!(a.targets(), c.targets());
    }

    #[test]
    fn subset_shares_handles() {
        let set = set_of(&[1.0, 2.0, 3.0]);
        let sub = set.subset(&[0, 2]);
        assert_eq!(sub.targets(), vec![1.0, 3.0]);
        sub.get(0).set_target(7.0);
        assert_eq!(set.get(0).target(), 7.0);
    }
}
