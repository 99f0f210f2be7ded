use std::path::PathBuf;

use log::info;
use reqwest::Client;
use url::Url;

use crate::error::{CidashError, Result};
use crate::models::MetricsDocument;

/// Where the pre-generated metrics document lives. Fetched once per
/// invocation, no retry on failure.
pub enum DocumentSource {
    Remote(Url),
    Local(PathBuf),
}

impl DocumentSource {
    pub fn parse(input: &str) -> Result<Self> {
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Remote(url)),
            Ok(url) => Err(CidashError::Config(format!(
                "Unsupported URL scheme '{}'",
                url.scheme()
            ))),
            Err(_) => Ok(Self::Local(PathBuf::from(input))),
        }
    }

    pub async fn load(&self) -> Result<MetricsDocument> {
        let text = match self {
            Self::Remote(url) => {
                info!("Fetching metrics document from {url}");

                let client = Client::builder()
                    .user_agent("cidash/0.1.0")
                    .build()
                    .map_err(|e| {
                        CidashError::Config(format!("Failed to create HTTP client: {e}"))
                    })?;

                let response = client.get(url.clone()).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(CidashError::Api(format!(
                        "Failed to fetch metrics document: {status} - {body}"
                    )));
                }

                response.text().await?
            }
            Self::Local(path) => {
                info!("Reading metrics document from {}", path.display());
                std::fs::read_to_string(path)?
            }
        };

        MetricsDocument::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_DOCUMENT: &str = r#"{
        "workflow_time": {
            "build-main": [
                {"date": "2024/01/01 00:00:00", "duration": 1.5}
            ]
        },
        "docker_images": {}
    }"#;

    #[test]
    fn test_parse_classifies_http_url_as_remote() {
        assert!(matches!(
            DocumentSource::parse("https://example.com/data.json"),
            Ok(DocumentSource::Remote(_))
        ));
    }

    #[test]
    fn test_parse_classifies_path_as_local() {
        assert!(matches!(
            DocumentSource::parse("data/github_action_data.json"),
            Ok(DocumentSource::Local(_))
        ));
        assert!(matches!(
            DocumentSource::parse("/var/data/github_action_data.json"),
            Ok(DocumentSource::Local(_))
        ));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(
            DocumentSource::parse("ftp://example.com/data.json"),
            Err(CidashError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_load_remote_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/github_action_data.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(MINIMAL_DOCUMENT)
            .create_async()
            .await;

        let source =
            DocumentSource::parse(&format!("{}/github_action_data.json", server.url())).unwrap();
        let document = source.load().await.unwrap();

        assert!(document.workflow_time.contains_key("build-main"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_load_remote_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/github_action_data.json")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let source =
            DocumentSource::parse(&format!("{}/github_action_data.json", server.url())).unwrap();

        assert!(matches!(source.load().await, Err(CidashError::Api(_))));
    }

    #[tokio::test]
    async fn test_load_remote_missing_top_level_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/github_action_data.json")
            .with_status(200)
            .with_body(r#"{"workflow_time": {}}"#)
            .create_async()
            .await;

        let source =
            DocumentSource::parse(&format!("{}/github_action_data.json", server.url())).unwrap();

        assert!(matches!(
            source.load().await,
            Err(CidashError::MissingData("docker_images"))
        ));
    }

    #[tokio::test]
    async fn test_load_local_file_not_found() {
        let source = DocumentSource::parse("/definitely/not/here.json").unwrap();
        assert!(matches!(source.load().await, Err(CidashError::Io(_))));
    }
}
