//! Vector algebra over points and column normalization over sets.
//!
//! Dense and sparse points share the same sparse-merge code path: both sides
//! are walked as ordered `(key, value)` streams and absent keys are treated
//! as zero.

use ndarray::Array2;

use super::{DataError, Point, PointHandle, PointSet};

/// Dot product of two points.
///
/// # Example
///
/// ```
/// use smbo::data::{ops, Point};
///
/// let a = Point::sparse(0.0, vec![0, 2], vec![1.0, 2.0]).unwrap();
/// let b = Point::sparse(0.0, vec![1, 2], vec![3.0, 4.0]).unwrap();
/// assert_eq!(ops::dot_product(&a, &b), 8.0); // only key 2 overlaps
/// ```
pub fn dot_product(a: &Point, b: &Point) -> f64 {
    dot_product_below(a, b, u32::MAX)
}

/// Dot product restricted to keys strictly below `cutoff`.
pub fn dot_product_below(a: &Point, b: &Point, cutoff: u32) -> f64 {
    let mut left = a.entries().peekable();
    let mut right = b.entries().peekable();
    let mut result = 0.0;
    while let (Some(&(ka, va)), Some(&(kb, vb))) = (left.peek(), right.peek()) {
        if ka >= cutoff || kb >= cutoff {
            break;
        }
        if ka < kb {
            left.next();
        } else if kb < ka {
            right.next();
        } else {
            result += va * vb;
            left.next();
            right.next();
        }
    }
    result
}

/// Euclidean distance between two points.
pub fn euclidean_distance(a: &Point, b: &Point) -> f64 {
    euclidean_distance_below(a, b, u32::MAX)
}

/// Euclidean distance restricted to keys strictly below `cutoff`.
///
/// Keys present on only one side contribute that side's squared value.
pub fn euclidean_distance_below(a: &Point, b: &Point, cutoff: u32) -> f64 {
    let mut left = a.entries().peekable();
    let mut right = b.entries().peekable();
    let mut sum = 0.0;
    loop {
        let ka = left.peek().map(|&(k, _)| k).filter(|&k| k < cutoff);
        let kb = right.peek().map(|&(k, _)| k).filter(|&k| k < cutoff);
        match (ka, kb) {
            (None, None) => break,
            (Some(_), None) => {
                let (_, va) = left.next().unwrap();
                sum += va * va;
            }
            (None, Some(_)) => {
                let (_, vb) = right.next().unwrap();
                sum += vb * vb;
            }
            (Some(ka), Some(kb)) => {
                if ka < kb {
                    let (_, va) = left.next().unwrap();
                    sum += va * va;
                } else if kb < ka {
                    let (_, vb) = right.next().unwrap();
                    sum += vb * vb;
                } else {
                    let (_, va) = left.next().unwrap();
                    let (_, vb) = right.next().unwrap();
                    let d = va - vb;
                    sum += d * d;
                }
            }
        }
    }
    sum.sqrt()
}

/// Z-normalize every column of a set on a copy.
///
/// See [`z_normalize_columns`].
pub fn z_normalize(set: &PointSet) -> Result<PointSet, DataError> {
    let all: Vec<usize> = (0..set.n_values()).collect();
    z_normalize_columns(set, &all)
}

/// Z-normalize the listed columns of a set on a copy.
///
/// Each listed column has its mean subtracted and is divided by the unbiased
/// (n-1) standard deviation. Columns with zero variance are left unscaled, as
/// are all columns of a set with fewer than two points.
///
/// # Errors
///
/// Returns [`DataError::UnsupportedRepresentation`] if the set contains a
/// sparse point: shifting a sparse column's mean would require materializing
/// its implicit zeros.
pub fn z_normalize_columns(set: &PointSet, columns: &[usize]) -> Result<PointSet, DataError> {
    for (index, point) in set.iter().enumerate() {
        if point.is_sparse() {
            return Err(DataError::UnsupportedRepresentation { index });
        }
    }

    let n = set.len();
    let width = set.n_values();
    let mut out = PointSet::with_capacity(width, n);
    if n < 2 {
        for point in set {
            out.push_trusted(point.copy().into_handle());
        }
        return Ok(out);
    }

    let mut matrix = Array2::<f64>::zeros((n, width));
    for (row, point) in set.iter().enumerate() {
        for col in 0..width {
            matrix[(row, col)] = point.value(col);
        }
    }
    let means = matrix
        .mean_axis(ndarray::Axis(0))
        .expect("set has at least two points");
    let variances = matrix.var_axis(ndarray::Axis(0), 1.0);

    for row in 0..n {
        let mut values: Vec<f64> = (0..width).map(|col| matrix[(row, col)]).collect();
        for &col in columns {
            if variances[col] != 0.0 {
                values[col] = (values[col] - means[col]) / variances[col].sqrt();
            }
        }
        out.push_trusted(Point::dense(set.get(row).target(), values).into_handle());
    }
    Ok(out)
}

/// Rank of a target among a set: 1 plus the number of points whose target is
/// strictly greater.
pub fn rank_of(set: &PointSet, target: f64) -> usize {
    1 + set.iter().filter(|p| p.target() > target).count()
}

/// Identity position of a handle within a slice of handles, if present.
pub fn position_of(pool: &[PointHandle], point: &PointHandle) -> Option<usize> {
    pool.iter().position(|c| std::rc::Rc::ptr_eq(c, point))
}
