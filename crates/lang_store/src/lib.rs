mod ancestry;
mod constants;
mod snapshot;
mod store;

#[cfg(test)]
mod tests;

pub use ancestry::AncestorFrame;
pub use snapshot::{Snapshot, SnapshotCache};
pub use store::{Group, GroupId, Store};
