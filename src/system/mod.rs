mod dependencies;

pub use dependencies::{required_for, DependencyChecker, RESTIC};
