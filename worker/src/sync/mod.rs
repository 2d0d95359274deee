mod delta;
mod element;
mod group;
mod layout;
mod param_set;
mod schedule;

pub use delta::DeltaSync;
pub use element::Element;
pub use group::{SyncGroup, Synchronize};
pub use layout::ParamLayout;
pub use param_set::ParameterSet;
pub use schedule::SyncSchedule;
