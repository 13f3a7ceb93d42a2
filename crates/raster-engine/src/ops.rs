//! Elementwise block arithmetic.
//!
//! Every named operation routes through one elementwise-apply primitive
//! parameterized by a binary function; there is no operator-overload
//! dispatch to chase.

use crate::block::RasterBlock;
use grid_common::{GridError, GridResult};
use tracing::warn;

impl RasterBlock {
    /// Apply `f` to every unmasked cell, yielding a new block with the
    /// same geometry and mask. Masked cells pass through untouched.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> RasterBlock {
        let mut out = self.clone();
        for (value, &ok) in out.values.iter_mut().zip(&self.valid) {
            if ok {
                *value = f(*value);
            }
        }
        out
    }

    /// Combine two same-shape blocks cell by cell.
    ///
    /// The result is unmasked only where both operands are; everything
    /// else stays masked.
    pub fn zip_with(
        &self,
        other: &RasterBlock,
        f: impl Fn(f64, f64) -> f64,
    ) -> GridResult<RasterBlock> {
        if self.shape() != other.shape() {
            return Err(GridError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        let mut out = self.clone();
        let mut count = 0usize;
        for idx in 0..out.values.len() {
            let ok = self.valid[idx] && other.valid[idx];
            out.valid[idx] = ok;
            if ok {
                out.values[idx] = f(self.values[idx], other.values[idx]);
                count += 1;
            }
        }
        out.not_null = count;
        Ok(out)
    }

    pub fn add(&self, other: &RasterBlock) -> GridResult<RasterBlock> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &RasterBlock) -> GridResult<RasterBlock> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &RasterBlock) -> GridResult<RasterBlock> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Elementwise division. Cells where the divisor is exactly zero
    /// become zero instead of propagating infinity.
    pub fn div(&self, other: &RasterBlock) -> GridResult<RasterBlock> {
        self.zip_with(other, |a, b| if b == 0.0 { 0.0 } else { a / b })
    }

    pub fn pow(&self, other: &RasterBlock) -> GridResult<RasterBlock> {
        self.zip_with(other, |a, b| a.powf(b))
    }

    pub fn add_scalar(&self, v: f64) -> RasterBlock {
        self.map_values(|a| a + v)
    }

    pub fn sub_scalar(&self, v: f64) -> RasterBlock {
        self.map_values(|a| a - v)
    }

    pub fn mul_scalar(&self, v: f64) -> RasterBlock {
        self.map_values(|a| a * v)
    }

    /// Scalar division. Dividing by zero is a reported no-op: the result
    /// is an unchanged copy, never Inf/NaN cells.
    pub fn div_scalar(&self, v: f64) -> RasterBlock {
        if v == 0.0 {
            warn!("division by zero scalar skipped");
            return self.clone();
        }
        self.map_values(|a| a / v)
    }

    pub fn pow_scalar(&self, v: f64) -> RasterBlock {
        self.map_values(|a| a.powf(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_common::{GridHeader, RecordType};

    fn block(values: &[f64]) -> RasterBlock {
        let header = GridHeader::new(2, 2, 0.0, 0.0, 1.0, 1.0, RecordType::Float64).unwrap();
        RasterBlock::from_values(header, values.to_vec()).unwrap()
    }

    #[test]
    fn test_add_blocks() {
        let a = block(&[1.0, 2.0, 3.0, 4.0]);
        let b = block(&[10.0, 20.0, 30.0, 40.0]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.values, vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_mask_combines_on_block_ops() {
        let mut a = block(&[1.0, 2.0, 3.0, 4.0]);
        let mut b = block(&[1.0, 1.0, 1.0, 1.0]);
        a.set_masked(0, 0, true);
        b.set_masked(1, 1, true);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.not_null_count(), 2);
        assert!(sum.is_masked_at(0, 0));
        assert!(sum.is_masked_at(1, 1));
        assert_eq!(sum.get(1, 0), Some(3.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = block(&[1.0, 2.0, 3.0, 4.0]);
        let header = GridHeader::new(3, 1, 0.0, 0.0, 1.0, 1.0, RecordType::Float64).unwrap();
        let b = RasterBlock::from_values(header, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            a.add(&b),
            Err(GridError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_div_by_zero_scalar_is_noop() {
        let a = block(&[1.0, 2.0, 3.0, 4.0]);
        let out = a.div_scalar(0.0);
        assert_eq!(out.values, a.values);
        assert_eq!(out.not_null_count(), a.not_null_count());
    }

    #[test]
    fn test_div_by_zero_cell_yields_zero() {
        let a = block(&[8.0, 9.0, 10.0, 11.0]);
        let b = block(&[2.0, 0.0, 5.0, 0.0]);
        let q = a.div(&b).unwrap();
        assert_eq!(q.values, vec![4.0, 0.0, 2.0, 0.0]);
        assert_eq!(q.not_null_count(), 4);
    }

    #[test]
    fn test_scalar_ops_leave_masked_cells_alone() {
        let mut a = block(&[1.0, 2.0, 3.0, 4.0]);
        a.set_masked(1, 0, true);
        let out = a.add_scalar(100.0);
        assert_eq!(out.get(0, 0), Some(101.0));
        assert!(out.is_masked_at(1, 0));
        // the stored value behind the mask is untouched
        assert_eq!(out.values[1], 2.0);
    }

    #[test]
    fn test_pow() {
        let a = block(&[1.0, 2.0, 3.0, 4.0]);
        let squared = a.pow_scalar(2.0);
        assert_eq!(squared.values, vec![1.0, 4.0, 9.0, 16.0]);
    }
}
