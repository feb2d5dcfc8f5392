use crate::domain::model::{FolderDefinition, RenderResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn collect(&self) -> Result<Vec<FolderDefinition>>;
    async fn render(&self, folders: Vec<FolderDefinition>) -> Result<RenderResult>;
    async fn emit(&self, result: RenderResult) -> Result<String>;
}
