/// Element types usable as the backing storage of a receive buffer.
///
/// Anything at least 4 bytes aligned keeps every numeric payload of a `Msg`
/// castable in place, since all of its sections are multiples of 4 bytes.
pub trait Align4: bytemuck::Pod {}

impl Align4 for u32 {}
impl Align4 for i32 {}
impl Align4 for u64 {}
impl Align4 for i64 {}
impl Align4 for f32 {}
impl Align4 for f64 {}
