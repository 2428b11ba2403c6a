mod restic;
mod snapshot;

pub use restic::ResticClient;
pub use snapshot::Snapshot;
