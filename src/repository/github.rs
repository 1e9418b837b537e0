use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use spdlog::{debug, warn};

use crate::error::{Error, Result};
use crate::remote_config::RemoteConfig;
use crate::repository::{encode_content, ContentRepository, RepoEntry, RepoFile};

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("postdesk/", env!("CARGO_PKG_VERSION"));

/// Contents API client for one repository and branch.
pub struct GitHubClient {
    contents_url: String,
    branch: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct FileResponse {
    content: Option<String>,
    sha: String,
}

#[derive(Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Deserialize)]
struct WrittenContent {
    sha: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, remote: &RemoteConfig) -> Self {
        GitHubClient {
            contents_url: format!("{}/repos/{}/{}/contents",
                                  api_url.trim_end_matches('/'), remote.repo_owner, remote.repo_name),
            branch: remote.branch.clone(),
            token: remote.access_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.contents_url, path.trim_matches('/'))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<reqwest::Response> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), &url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);
        request = match body {
            Some(body) => request.json(&body),
            None => request.query(&[("ref", self.branch.as_str())]),
        };

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        warn!("{} {} failed: {} - {}", method, path, status, message);
        Err(classify_error(path, status, message))
    }
}

/// 409, and 422 complaining about the sha, mean the revision token is stale or missing.
fn classify_error(path: &str, status: StatusCode, message: String) -> Error {
    let sha_mismatch = status == StatusCode::UNPROCESSABLE_ENTITY && message.contains("sha");
    if status == StatusCode::CONFLICT || sha_mismatch {
        return Error::Conflict {
            path: path.to_string(),
            message,
        };
    }
    Error::api(status.as_u16(), message)
}

#[async_trait]
impl ContentRepository for GitHubClient {
    async fn read(&self, path: &str) -> Result<RepoFile> {
        let response = self.send(Method::GET, path, None).await?;
        let file: FileResponse = response.json().await?;
        let Some(content) = file.content else {
            return Err(Error::invalid_input(format!("{} is not a file", path)));
        };
        Ok(RepoFile {
            content,
            sha: file.sha,
        })
    }

    async fn write(&self, path: &str, text: &str, message: &str, sha: Option<&str>) -> Result<String> {
        let mut body = json!({
            "message": message,
            "content": encode_content(text),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self.send(Method::PUT, path, Some(body)).await?;
        let written: WriteResponse = response.json().await?;
        Ok(written.content.sha)
    }

    async fn delete(&self, path: &str, message: &str, sha: &str) -> Result<()> {
        let body = json!({
            "message": message,
            "sha": sha,
            "branch": self.branch,
        });
        self.send(Method::DELETE, path, Some(body)).await?;
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<RepoEntry>> {
        let response = self.send(Method::GET, dir, None).await?;
        let entries: Vec<RepoEntry> = response.json().await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn remote() -> RemoteConfig {
        RemoteConfig {
            repo_owner: "trips".to_string(),
            repo_name: "site".to_string(),
            branch: "main".to_string(),
            posts_path: "src/content/blog/".to_string(),
            access_token: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_read_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/trips/site/contents/src/content/blog/a.md"))
            .and(query_param("ref", "main"))
            .and(header("Authorization", "token secret"))
            .and(header("Accept", ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "a.md",
                "path": "src/content/blog/a.md",
                "sha": "abc",
                "type": "file",
                "content": "LS0tCnRpdGxlOiAi\nQSIKLS0tCgpCb2R5\n",
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), &remote());
        let (text, sha) = client.read_text("src/content/blog/a.md").await.unwrap();
        assert_eq!(text, "---\ntitle: \"A\"\n---\n\nBody");
        assert_eq!(sha, "abc");
    }

    #[tokio::test]
    async fn test_write_returns_new_sha() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/trips/site/contents/src/content/blog/a.md"))
            .and(body_partial_json(json!({
                "message": "Update a.md",
                "content": encode_content("hello"),
                "branch": "main",
                "sha": "old",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": {"name": "a.md", "sha": "new"},
                "commit": {"sha": "commit"}
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), &remote());
        let sha = client.write("src/content/blog/a.md", "hello", "Update a.md", Some("old")).await.unwrap();
        assert_eq!(sha, "new");
    }

    #[tokio::test]
    async fn test_write_without_sha_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Invalid request.\n\n\"sha\" wasn't supplied."
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), &remote());
        let err = client.write("src/content/blog/a.md", "hello", "Update a.md", None).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_stale_sha_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(409).set_body_string("does not match"))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), &remote());
        let err = client.delete("src/content/blog/a.md", "[ADMIN] Delete a.md", "stale").await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_list_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/trips/site/contents/src/content/blog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "a.md", "path": "src/content/blog/a.md", "sha": "1", "type": "file"},
                {"name": "img", "path": "src/content/blog/img", "sha": "2", "type": "dir"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/trips/site/contents/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let client = GitHubClient::new(&server.uri(), &remote());
        let entries = client.list("src/content/blog/").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_markdown());
        assert!(!entries[1].is_markdown());

        let err = client.list("missing").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }
}
