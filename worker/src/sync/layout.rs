use std::ops::Range;

use super::Element;
use crate::error::{Result, WorkerErr};

/// Maps an ordered set of tensors into one flat buffer of the wire dtype.
///
/// Tensor `i` lives at `ranges()[i]` of the flat buffer, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    shapes: Vec<Vec<usize>>,
    ranges: Vec<Range<usize>>,
    len: usize,
}

impl ParamLayout {
    /// Records the shapes of a parameter set and their element counts.
    pub fn new(shapes: Vec<Vec<usize>>) -> Self {
        let mut len = 0;
        let ranges = shapes
            .iter()
            .map(|shape| {
                let start = len;
                len += shape.iter().product::<usize>();
                start..len
            })
            .collect();

        Self {
            shapes,
            ranges,
            len,
        }
    }

    /// Returns the total amount of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn shapes(&self) -> &[Vec<usize>] {
        &self.shapes
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Checks that a parameter set still has the element counts it was recorded with.
    ///
    /// Tensors may be reshaped as long as their element counts stay the same.
    pub fn check(&self, shapes: &[Vec<usize>]) -> Result<()> {
        let count = |shape: &Vec<usize>| shape.iter().product::<usize>();

        if shapes.len() != self.shapes.len() {
            return Err(WorkerErr::SizeMismatch {
                what: "tensor count",
                got: shapes.len(),
                expected: self.shapes.len(),
            });
        }

        let got: usize = shapes.iter().map(count).sum();
        if got != self.len {
            return Err(WorkerErr::SizeMismatch {
                what: "parameter set",
                got,
                expected: self.len,
            });
        }

        let changed = shapes
            .iter()
            .zip(&self.shapes)
            .map(|(got, expected)| (count(got), count(expected)))
            .find(|(got, expected)| got != expected);

        match changed {
            Some((got, expected)) => Err(WorkerErr::SizeMismatch {
                what: "parameter tensor",
                got,
                expected,
            }),
            None => Ok(()),
        }
    }

    /// Converts `values` into the wire dtype.
    ///
    /// # Returns
    /// A `SizeMismatch` if `values` doesn't match this layout, or a `Conversion` error naming
    /// the flat index of the first value that can't be represented.
    pub fn flatten<E: Element>(&self, values: &[E], out: &mut [f32]) -> Result<()> {
        self.check_len(values.len())?;
        self.check_len(out.len())?;

        for (index, (dst, &value)) in out.iter_mut().zip(values).enumerate() {
            *dst = value.to_wire().ok_or(WorkerErr::Conversion { index })?;
        }

        Ok(())
    }

    /// Converts flat wire values back into the local element type.
    pub fn unflatten<E: Element>(&self, values: &[f32], out: &mut Vec<E>) -> Result<()> {
        self.check_len(values.len())?;

        out.clear();
        out.extend(values.iter().map(|&v| E::from_wire(v)));
        Ok(())
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got != self.len {
            return Err(WorkerErr::SizeMismatch {
                what: "flat parameters",
                got,
                expected: self.len,
            });
        }

        Ok(())
    }
}
