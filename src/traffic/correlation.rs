//! Pearson correlation of every numeric column against a target

use crate::structs::{Correlation, CorrelationVector, DerivedTable, NumericColumn, Result, TrafficError};
use ndarray::{Array2, ArrayView1};

/// Rows x columns matrix of the given numeric columns
#[must_use]
pub fn numeric_matrix(table: &DerivedTable, columns: &[NumericColumn]) -> Array2<f64> {
    Array2::from_shape_fn((table.len(), columns.len()), |(i, j)| {
        columns[j].value(&table.rows[i])
    })
}

/// Calculate the Pearson coefficient between two variables.
///
/// Pairs where either value is not finite are excluded. Fewer than two usable pairs or
/// zero variance in either variable gives [`Correlation::Undefined`].
///
/// # Errors
/// Returns error if the vectors have different lengths
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<Correlation> {
    if x.len() != y.len() {
        return Err(TrafficError::Stats(format!(
            "Vectors must have same length ({} vs {})",
            x.len(),
            y.len()
        )));
    }

    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return Ok(Correlation::Undefined);
    }

    // A constant column has no variance, even when its computed mean is inexact
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|&(a, _)| a == x0) || pairs.iter().all(|&(_, b)| b == y0) {
        return Ok(Correlation::Undefined);
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Ok(Correlation::Undefined);
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    Ok(Correlation::Defined(r.clamp(-1.0, 1.0)))
}

/// Correlate `target` against every other numeric column over all rows of `table`
///
/// # Errors
/// Returns error if a coefficient cannot be computed
pub fn correlation_vector(table: &DerivedTable, target: NumericColumn) -> Result<CorrelationVector> {
    let columns: Vec<NumericColumn> = NumericColumn::ALL
        .into_iter()
        .filter(|&c| c != target)
        .collect();

    let matrix = numeric_matrix(table, &columns);
    let target_values = ndarray::Array1::from(table.values(target));

    let coefficients = columns
        .iter()
        .enumerate()
        .map(|(j, &column)| Ok((column, pearson(matrix.column(j), target_values.view())?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorrelationVector {
        target,
        coefficients,
    })
}
