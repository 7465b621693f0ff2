use async_trait::async_trait;
use reqwest::Client;

use crate::client::provider::SheetSync;
use crate::client::supabase::error_from_response;
use crate::client::types::UserRow;
use crate::shared::error::ServiceError;

/// Mirrors user rows into a spreadsheet through an HTTP webhook
#[derive(Debug, Clone)]
pub struct HttpSheetSync {
    http: Client,
    url: String,
}

impl HttpSheetSync {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SheetSync for HttpSheetSync {
    async fn sync_user(&self, row: &UserRow) -> Result<(), ServiceError> {
        tracing::debug!("Syncing user {} to sheets", row.id);
        let response = self.http.post(&self.url).json(row).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

/// Used when no sheet endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSheetSync;

#[async_trait]
impl SheetSync for DisabledSheetSync {
    async fn sync_user(&self, _row: &UserRow) -> Result<(), ServiceError> {
        Err(ServiceError::Disabled { service: "sheets" })
    }
}
