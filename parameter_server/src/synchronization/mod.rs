mod barrier;

pub use barrier::GroupBarrier;
