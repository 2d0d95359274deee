use ndarray::ArrayD;

use super::Element;
use crate::error::{Result, WorkerErr};

/// An ordered collection of fixed-shape tensors owned by a training framework.
///
/// This is the only capability a `DeltaSync` needs from the framework: tensors are
/// concatenated in order, each one row major.
pub trait ParameterSet {
    type Elem: Element;

    /// Returns the shape of every tensor, in order.
    fn describe_shapes(&self) -> Vec<Vec<usize>>;

    /// Appends the current values of every tensor to `out`.
    fn read_current_values(&self, out: &mut Vec<Self::Elem>);

    /// Overwrites every tensor with `values`, laid out as `read_current_values` produces them.
    fn write_values(&mut self, values: &[Self::Elem]) -> Result<()>;
}

fn check_total(got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(WorkerErr::SizeMismatch {
            what: "parameter values",
            got,
            expected,
        });
    }

    Ok(())
}

impl<E: Element> ParameterSet for Vec<ArrayD<E>> {
    type Elem = E;

    fn describe_shapes(&self) -> Vec<Vec<usize>> {
        self.iter().map(|tensor| tensor.shape().to_vec()).collect()
    }

    fn read_current_values(&self, out: &mut Vec<E>) {
        for tensor in self {
            out.extend(tensor.iter().copied());
        }
    }

    fn write_values(&mut self, values: &[E]) -> Result<()> {
        check_total(values.len(), self.iter().map(|tensor| tensor.len()).sum())?;

        let mut rest = values;
        for tensor in self.iter_mut() {
            let (head, tail) = rest.split_at(tensor.len());
            tensor.iter_mut().zip(head).for_each(|(dst, &v)| *dst = v);
            rest = tail;
        }

        Ok(())
    }
}

impl<E: Element> ParameterSet for Vec<Vec<E>> {
    type Elem = E;

    fn describe_shapes(&self) -> Vec<Vec<usize>> {
        self.iter().map(|tensor| vec![tensor.len()]).collect()
    }

    fn read_current_values(&self, out: &mut Vec<E>) {
        for tensor in self {
            out.extend_from_slice(tensor);
        }
    }

    fn write_values(&mut self, values: &[E]) -> Result<()> {
        check_total(values.len(), self.iter().map(Vec::len).sum())?;

        let mut rest = values;
        for tensor in self.iter_mut() {
            let (head, tail) = rest.split_at(tensor.len());
            tensor.copy_from_slice(head);
            rest = tail;
        }

        Ok(())
    }
}

impl<P: ParameterSet + ?Sized> ParameterSet for &mut P {
    type Elem = P::Elem;

    fn describe_shapes(&self) -> Vec<Vec<usize>> {
        (**self).describe_shapes()
    }

    fn read_current_values(&self, out: &mut Vec<Self::Elem>) {
        (**self).read_current_values(out)
    }

    fn write_values(&mut self, values: &[Self::Elem]) -> Result<()> {
        (**self).write_values(values)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn};

    use super::*;

    #[test]
    fn arrays_are_read_row_major() {
        let params = vec![
            ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap(),
            ArrayD::from_elem(IxDyn(&[1]), 5.0f32),
        ];

        assert_eq!(params.describe_shapes(), [vec![2, 2], vec![1]]);

        let mut out = Vec::new();
        params.read_current_values(&mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn transposed_views_keep_logical_order() {
        let mut t = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        t.swap_axes(0, 1);
        let mut params = vec![t];

        let mut out = Vec::new();
        params.read_current_values(&mut out);
        assert_eq!(out, [1.0, 3.0, 2.0, 4.0]);

        params.write_values(&[9.0, 8.0, 7.0, 6.0]).unwrap();
        assert_eq!(params[0][[0, 1]], 8.0);
        assert_eq!(params[0][[1, 0]], 7.0);
    }

    #[test]
    fn write_splits_by_tensor() {
        let mut params = vec![vec![0.0f64; 2], vec![0.0; 3]];
        params.write_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert_eq!(params, [vec![1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        assert!(matches!(
            params.write_values(&[1.0]),
            Err(WorkerErr::SizeMismatch { got: 1, expected: 5, .. })
        ));
    }

    #[test]
    fn forwards_through_mut_refs() {
        fn overwrite<P: ParameterSet<Elem = f32>>(mut params: P) -> Vec<Vec<usize>> {
            params.write_values(&[2.0]).unwrap();
            params.describe_shapes()
        }

        let mut params = vec![vec![1.0f32]];
        assert_eq!(overwrite(&mut params), [vec![1]]);
        assert_eq!(params, [vec![2.0]]);
    }
}
