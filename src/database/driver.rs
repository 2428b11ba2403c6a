use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct DumpOutcome {
    pub artifacts: Vec<PathBuf>,
    pub db_errors: Vec<(String, String)>,
}

#[async_trait]
pub trait DumpAdapter: Send + Sync {
    async fn populate(&self, workspace: &Path) -> Result<DumpOutcome>;
    fn engine_name(&self) -> &'static str;
}

pub(crate) fn artifact_name(db_name: &str, extension: &str) -> String {
    let stem: String = db_name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("{}.{}", stem, extension)
}
