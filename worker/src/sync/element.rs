/// A numeric type parameters may be held in locally.
///
/// The wire dtype is fixed to `f32`, every other element type goes through an explicit,
/// validated conversion. Supporting another wire dtype requires extending the protocol.
pub trait Element: Copy + Send + 'static {
    /// Converts into the wire dtype, `None` if the value can't be represented.
    fn to_wire(self) -> Option<f32>;

    /// Converts back from the wire dtype.
    fn from_wire(value: f32) -> Self;
}

impl Element for f32 {
    #[inline]
    fn to_wire(self) -> Option<f32> {
        Some(self)
    }

    #[inline]
    fn from_wire(value: f32) -> Self {
        value
    }
}

impl Element for f64 {
    /// Finite values beyond the `f32` range are rejected instead of becoming infinities.
    #[inline]
    fn to_wire(self) -> Option<f32> {
        let narrowed = self as f32;
        (narrowed.is_finite() || !self.is_finite()).then_some(narrowed)
    }

    #[inline]
    fn from_wire(value: f32) -> Self {
        value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_narrowing() {
        assert_eq!(1.5f64.to_wire(), Some(1.5));
        assert_eq!(f64::INFINITY.to_wire(), Some(f32::INFINITY));
        assert_eq!(1e300f64.to_wire(), None);
        assert_eq!(f64::from_wire(0.25), 0.25);
    }
}
