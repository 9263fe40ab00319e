//! Blob Storage over the REST API

use super::traits::ObjectStore;
use crate::adapters::credential::{TokenSource, STORAGE_SCOPE};
use crate::adapters::http::{build_client, check_status, rfc1123, send_error};
use crate::domain::{
    AzLearnError, BlobHttpHeaders, BlobMetadata, BlobProperties, ErrorKind, RequestError, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use url::Url;

/// Blob service REST API version
pub const API_VERSION: &str = "2023-11-03";

const META_PREFIX: &str = "x-ms-meta-";

/// Object store backed by an Azure Storage account
pub struct BlobRestStore {
    client: Client,
    endpoint: Url,
    credential: Arc<dyn TokenSource>,
}

impl BlobRestStore {
    /// Creates a store for the blob service at `endpoint`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the endpoint is not a valid URL
    pub fn new(
        endpoint: &str,
        credential: Arc<dyn TokenSource>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            AzLearnError::Configuration(format!("Invalid blob endpoint '{endpoint}': {e}"))
        })?;
        Ok(Self {
            client: build_client(timeout_seconds)?,
            endpoint,
            credential,
        })
    }

    fn url(&self, container: &str, key: Option<&str>, query: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AzLearnError::Configuration(format!(
                    "Blob endpoint {} cannot be a base",
                    self.endpoint
                ))
            })?;
            segments.pop_if_empty().push(container);
            if let Some(key) = key {
                segments.extend(key.split('/'));
            }
        }
        url.set_query(query);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.credential.token(STORAGE_SCOPE).await?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"))
            .header("x-ms-version", API_VERSION)
            .header("x-ms-date", rfc1123(Utc::now())))
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Reads blob properties from a HEAD response
///
/// Header names arrive lowercased, and so do the metadata names taken from
/// them.
fn properties_from_headers(headers: &HeaderMap) -> BlobProperties {
    let metadata: BlobMetadata = headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(META_PREFIX)?;
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();

    BlobProperties {
        headers: BlobHttpHeaders {
            content_type: header_str(headers, "content-type"),
            content_language: header_str(headers, "content-language"),
            cache_control: header_str(headers, "cache-control"),
            content_disposition: header_str(headers, "content-disposition"),
            content_encoding: header_str(headers, "content-encoding"),
            content_hash: header_str(headers, "content-md5"),
        },
        metadata,
        content_length: header_str(headers, "content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        last_modified: header_str(headers, "last-modified")
            .and_then(|v| DateTime::parse_from_rfc2822(&v).ok())
            .map(|d| d.with_timezone(&Utc)),
    }
}

/// Request headers for Set Blob Properties; absent fields clear the value
fn property_headers(headers: &BlobHttpHeaders) -> Vec<(&'static str, String)> {
    [
        ("x-ms-blob-content-type", &headers.content_type),
        ("x-ms-blob-content-language", &headers.content_language),
        ("x-ms-blob-cache-control", &headers.cache_control),
        ("x-ms-blob-content-disposition", &headers.content_disposition),
        ("x-ms-blob-content-encoding", &headers.content_encoding),
        ("x-ms-blob-content-md5", &headers.content_hash),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
    .collect()
}

#[async_trait]
impl ObjectStore for BlobRestStore {
    async fn ensure_container(&self, container: &str) -> Result<bool> {
        let url = self.url(container, None, Some("restype=container"))?;
        let response = self
            .request(Method::PUT, url)
            .await?
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| send_error("create container", e))?;

        match check_status("create container", response).await {
            Ok(_) => {
                tracing::info!(container, "Container created");
                Ok(true)
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!(container, "Container already exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool> {
        let url = self.url(container, Some(key), None)?;
        let response = self
            .request(Method::HEAD, url)
            .await?
            .send()
            .await
            .map_err(|e| send_error("blob exists", e))?;

        match check_status("blob exists", response).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        overwrite: bool,
    ) -> Result<()> {
        let url = self.url(container, Some(key), None)?;
        let mut request = self
            .request(Method::PUT, url)
            .await?
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Length", data.len().to_string())
            .body(data);
        if !overwrite {
            request = request.header("If-None-Match", "*");
        }

        let response = request.send().await.map_err(|e| send_error("upload blob", e))?;
        check_status("upload blob", response).await.map_err(|e| match e {
            // A failed If-None-Match is reported as 412 by some endpoints
            AzLearnError::Request(r) if r.kind == ErrorKind::PreconditionFailed => {
                RequestError {
                    kind: ErrorKind::Conflict,
                    ..r
                }
                .into()
            }
            other => other,
        })?;
        Ok(())
    }

    async fn download(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.url(container, Some(key), None)?;
        let response = self
            .request(Method::GET, url)
            .await?
            .send()
            .await
            .map_err(|e| send_error("download blob", e))?;
        let response = check_status("download blob", response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AzLearnError::Connection(format!("Blob body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn get_properties(&self, container: &str, key: &str) -> Result<BlobProperties> {
        let url = self.url(container, Some(key), None)?;
        let response = self
            .request(Method::HEAD, url)
            .await?
            .send()
            .await
            .map_err(|e| send_error("get blob properties", e))?;
        let response = check_status("get blob properties", response).await?;

        Ok(properties_from_headers(response.headers()))
    }

    async fn set_metadata(
        &self,
        container: &str,
        key: &str,
        metadata: &BlobMetadata,
    ) -> Result<()> {
        let url = self.url(container, Some(key), Some("comp=metadata"))?;
        let mut request = self
            .request(Method::PUT, url)
            .await?
            .header("Content-Length", "0");
        for (name, value) in metadata {
            request = request.header(format!("{META_PREFIX}{name}"), value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| send_error("set blob metadata", e))?;
        check_status("set blob metadata", response).await?;
        Ok(())
    }

    async fn set_headers(
        &self,
        container: &str,
        key: &str,
        headers: &BlobHttpHeaders,
    ) -> Result<()> {
        let url = self.url(container, Some(key), Some("comp=properties"))?;
        let mut request = self
            .request(Method::PUT, url)
            .await?
            .header("Content-Length", "0");
        for (name, value) in property_headers(headers) {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| send_error("set blob headers", e))?;
        check_status("set blob headers", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::credential::StaticTokenSource;
    use mockito::Matcher;

    fn store(url: &str) -> BlobRestStore {
        BlobRestStore::new(url, Arc::new(StaticTokenSource::new("st-token")), 5).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_container_existing_is_not_created() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/learn")
            .match_query(Matcher::UrlEncoded("restype".into(), "container".into()))
            .match_header("x-ms-version", API_VERSION)
            .with_status(409)
            .with_body("ContainerAlreadyExists")
            .create_async()
            .await;

        assert!(!store(&server.url()).ensure_container("learn").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_without_overwrite_conflicts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/learn/test-object.json")
            .match_header("if-none-match", "*")
            .match_header("x-ms-blob-type", "BlockBlob")
            .match_header("authorization", "Bearer st-token")
            .with_status(409)
            .with_body("BlobAlreadyExists")
            .create_async()
            .await;

        let err = store(&server.url())
            .upload("learn", "test-object.json", b"{}".to_vec(), false)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_with_overwrite_skips_condition() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/learn/test-object.json")
            .match_header("if-none-match", Matcher::Missing)
            .match_body("new")
            .with_status(201)
            .create_async()
            .await;

        store(&server.url())
            .upload("learn", "test-object.json", b"new".to_vec(), true)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_properties_reads_headers_and_metadata() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/learn/a.json")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_header("content-language", "en-us")
            .with_header("last-modified", "Tue, 05 Mar 2024 08:09:10 GMT")
            .with_header("x-ms-meta-docType", "text")
            .create_async()
            .await;

        let props = store(&server.url())
            .get_properties("learn", "a.json")
            .await
            .unwrap();
        assert_eq!(props.headers.content_type.as_deref(), Some("text/plain"));
        assert_eq!(props.headers.content_language.as_deref(), Some("en-us"));
        assert_eq!(props.metadata.get("doctype").map(String::as_str), Some("text"));
        assert!(props.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_set_metadata_sends_meta_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/learn/a.json")
            .match_query(Matcher::UrlEncoded("comp".into(), "metadata".into()))
            .match_header("x-ms-meta-category", "guidance")
            .with_status(200)
            .create_async()
            .await;

        let mut metadata = BlobMetadata::new();
        metadata.insert("category".to_string(), "guidance".to_string());
        store(&server.url())
            .set_metadata("learn", "a.json", &metadata)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_property_headers_skip_cleared_fields() {
        let headers = BlobHttpHeaders {
            content_type: Some("text/plain".to_string()),
            ..Default::default()
        };
        assert_eq!(
            property_headers(&headers),
            vec![("x-ms-blob-content-type", "text/plain".to_string())]
        );
    }
}
