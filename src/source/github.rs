use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{Commit, Result, SourceHost, TreeEntry};
use crate::config::{Secret, SourceSection};
use crate::errors::SourceError;

/// Commit list entry as returned by `GET /repos/{repo}/commits`.
#[derive(Debug, Deserialize)]
struct GitHubCommit {
    #[serde(default)]
    sha: String,
    #[serde(default)]
    commit: GitHubCommitDetail,
}

#[derive(Debug, Default, Deserialize)]
struct GitHubCommitDetail {
    #[serde(default)]
    author: Option<GitHubSignature>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct GitHubSignature {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: String,
}

impl From<GitHubCommit> for Commit {
    fn from(c: GitHubCommit) -> Self {
        let author = c.commit.author.unwrap_or_default();
        Commit {
            sha: c.sha,
            author: author.name,
            date: author.date,
            message: c.commit.message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitHubTree {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

/// GitHub REST + raw-content client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    raw_base: String,
    token: Option<Secret>,
}

impl GitHubClient {
    pub fn new(config: &SourceSection) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build source host HTTP client")?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    async fn send(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let resp = self
            .authorized(self.http.get(url).query(query))
            .send()
            .await
            .map_err(|source| SourceError::Request {
                url: url.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.send(url, query)
            .await?
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn list_commits(&self, repo: &str, limit: usize) -> Result<Vec<Commit>> {
        let url = format!("{}/repos/{}/commits", self.api_base, repo);
        let per_page = limit.clamp(1, 100).to_string();
        let commits: Vec<GitHubCommit> = self.get_json(&url, &[("per_page", per_page)]).await?;
        Ok(commits.into_iter().take(limit).map(Commit::from).collect())
    }

    async fn default_branch(&self, repo: &str) -> Result<String> {
        let url = format!("{}/repos/{}", self.api_base, repo);
        let info: GitHubRepo = self.get_json(&url, &[]).await?;
        Ok(info.default_branch)
    }

    async fn list_tree(&self, repo: &str, reference: &str) -> Result<Vec<TreeEntry>> {
        let url = format!("{}/repos/{}/git/trees/{}", self.api_base, repo, reference);
        let tree: GitHubTree = self
            .get_json(&url, &[("recursive", "1".to_string())])
            .await?;
        Ok(tree.tree)
    }

    async fn read_file(&self, repo: &str, reference: &str, path: &str) -> Result<String> {
        let url = format!("{}/{}/{}/{}", self.raw_base, repo, reference, path);
        self.send(&url, &[])
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Decode {
                url,
                message: e.to_string(),
            })
    }
}
