//! Labeled points with dense or sparse feature storage.

use std::cell::Cell;
use std::rc::Rc;

use super::DataError;

/// Shared owning handle to a [`Point`].
///
/// Shards, histories, candidate pools, and expert-internal storage all hold
/// handles to the same allocation. Mutating the target through one handle is
/// visible through every other one; the ensemble's relabeling protocol relies
/// on exactly that.
pub type PointHandle = Rc<Point>;

/// Feature storage for a [`Point`].
///
/// Sparse points keep parallel arrays of strictly ascending keys and their
/// values; every key not listed reads as zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Features {
    /// Contiguous values indexed `0..k`.
    Dense(Vec<f64>),
    /// Sorted `(key, value)` pairs; absent keys are implicitly zero.
    Sparse { keys: Vec<u32>, values: Vec<f64> },
}

/// One candidate configuration: a feature vector plus a scalar target.
///
/// The target is interior-mutable so that a point shared across containers
/// can be relabeled in place (see [`PointHandle`]). Feature values are fixed
/// after construction.
///
/// # Example
///
/// ```
/// use smbo::data::Point;
///
/// let dense = Point::dense(0.83, vec![0.5, 0.0, 1.0]);
/// let sparse = Point::sparse(0.83, vec![0, 2], vec![0.5, 1.0]).unwrap();
///
/// assert_eq!(dense.value(2), sparse.value(2));
/// assert_eq!(sparse.value(1), 0.0);
/// ```
#[derive(Debug)]
pub struct Point {
    target: Cell<f64>,
    features: Features,
}

impl Point {
    /// Create a dense point.
    pub fn dense(target: f64, values: Vec<f64>) -> Self {
        Self {
            target: Cell::new(target),
            features: Features::Dense(values),
        }
    }

    /// Create a sparse point.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the key and value arrays differ in length or
    /// the keys are not strictly ascending.
    pub fn sparse(target: f64, keys: Vec<u32>, values: Vec<f64>) -> Result<Self, DataError> {
        if keys.len() != values.len() {
            return Err(DataError::SparseLengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        for (position, window) in keys.windows(2).enumerate() {
            if window[1] <= window[0] {
                return Err(DataError::UnsortedSparseKeys {
                    key: window[1],
                    position: position + 1,
                });
            }
        }
        Ok(Self {
            target: Cell::new(target),
            features: Features::Sparse { keys, values },
        })
    }

    /// Wrap this point in a shared handle.
    pub fn into_handle(self) -> PointHandle {
        Rc::new(self)
    }

    /// The point's target value.
    #[inline]
    pub fn target(&self) -> f64 {
        self.target.get()
    }

    /// Overwrite the target in place.
    ///
    /// Visible through every handle to this point.
    #[inline]
    pub fn set_target(&self, target: f64) {
        self.target.set(target);
    }

    /// Read the value at a feature index; absent keys read as zero.
    pub fn value(&self, index: usize) -> f64 {
        match &self.features {
            Features::Dense(values) => values.get(index).copied().unwrap_or(0.0),
            Features::Sparse { keys, values } => {
                let key = match u32::try_from(index) {
                    Ok(key) => key,
                    Err(_) => return 0.0,
                };
                match keys.binary_search(&key) {
                    Ok(at) => values[at],
                    Err(_) => 0.0,
                }
            }
        }
    }

    /// Ordered iterator over stored `(key, value)` pairs.
    ///
    /// Dense points yield every index; sparse points yield only stored keys.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            point: self,
            at: 0,
        }
    }

    /// Number of stored entries.
    pub fn n_keys(&self) -> usize {
        match &self.features {
            Features::Dense(values) => values.len(),
            Features::Sparse { keys, .. } => keys.len(),
        }
    }

    /// Largest stored feature index, `None` for an empty vector.
    pub fn max_key(&self) -> Option<u32> {
        match &self.features {
            Features::Dense(values) => {
                if values.is_empty() {
                    None
                } else {
                    Some((values.len() - 1) as u32)
                }
            }
            Features::Sparse { keys, .. } => keys.last().copied(),
        }
    }

    /// Whether this point uses sparse storage.
    pub fn is_sparse(&self) -> bool {
        matches!(self.features, Features::Sparse { .. })
    }

    /// The raw feature storage.
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Capability-preserving copy with a fresh, unshared target cell.
    pub fn copy(&self) -> Self {
        self.copy_with_target(self.target())
    }

    /// Copy with the same features and a replaced target.
    ///
    /// The copy does not alias the source: used for issuing rescaled labels
    /// whose cells are shared among experts but not with the raw observation.
    pub fn copy_with_target(&self, target: f64) -> Self {
        Self {
            target: Cell::new(target),
            features: self.features.clone(),
        }
    }
}

/// Iterator over a point's stored `(key, value)` pairs in ascending key order.
pub struct Entries<'a> {
    point: &'a Point,
    at: usize,
}

impl Iterator for Entries<'_> {
    type Item = (u32, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &self.point.features {
            Features::Dense(values) => values.get(self.at).map(|&v| (self.at as u32, v)),
            Features::Sparse { keys, values } => keys
                .get(self.at)
                .map(|&k| (k, values[self.at])),
        };
        if item.is_some() {
            self.at += 1;
        }
        item
    }
}
