pub mod orchestrator;
pub mod report;
pub mod scheduler;
pub mod workspace;

pub use orchestrator::Orchestrator;
pub use report::BackupReport;
pub use scheduler::run_scheduler;
