use super::MetadataSource;
use anyhow::Result;
use async_trait::async_trait;

pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";

/// Project attributes from the GCE metadata server.
pub struct GceMetadata {
    base_url: String,
    client: reqwest::Client,
}

impl Default for GceMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_URL)
    }
}

impl GceMetadata {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn attribute_url(&self, name: &str) -> String {
        format!(
            "{}/computeMetadata/v1/project/attributes/{}",
            self.base_url.trim_end_matches('/'),
            name
        )
    }
}

#[async_trait]
impl MetadataSource for GceMetadata {
    async fn project_attribute(&self, name: &str) -> Result<String> {
        let value = self
            .client
            .get(self.attribute_url(name))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(value.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_url_joins_base() {
        let metadata = GceMetadata::new("http://127.0.0.1:9000/");
        assert_eq!(
            metadata.attribute_url("repos"),
            "http://127.0.0.1:9000/computeMetadata/v1/project/attributes/repos"
        );
    }
}
