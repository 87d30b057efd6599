//! Resource endpoints of the Drone API.
//!
//! Each method composes a path and hands it to
//! [`DroneClient::execute`]. Nothing here touches the network directly.
//!
//! | Resource | Paths |
//! |----------|-------|
//! | User | `/api/user`, `/api/user/repos`, `/api/user/feed`, `/api/user/token` |
//! | Repositories | `/api/repos/{owner}/{repo}` |
//! | Builds | `/api/repos/{owner}/{repo}/builds[/{number}[/...]]` |
//! | Logs | `/api/repos/{owner}/{repo}/logs/{build}/{proc}` |
//! | Artifacts | `/api/repos/{owner}/{repo}/files/{build}[/{proc}/{file}]` |
//! | Secrets | `/api/repos/{owner}/{repo}/secrets[/{name}]` |
//! | Registries | `/api/repos/{owner}/{repo}/registry[/{address}]` |

use crate::client::fetch::DroneClient;
use crate::client::utils::{with_query, QueryOptions};
use crate::error::Result;
use crate::types::Payload;
use serde::Serialize;
use serde_json::Value;

fn repo_path(owner: &str, repo: &str) -> String {
    format!("/api/repos/{}/{}", owner, repo)
}

/// Encode endpoint data as a request body. `null` means no body.
fn json_body<T: Serialize>(data: &T) -> Result<Option<Value>> {
    match serde_json::to_value(data)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

impl DroneClient {
    /// Returns the repositories of the current user.
    ///
    /// Common options: `all`, `flush`.
    pub async fn get_repo_list(&self, opts: &QueryOptions) -> Result<Payload> {
        self.get(&with_query("/api/user/repos", &opts.encode())).await
    }

    /// Returns the repository by owner and name.
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Payload> {
        self.get(&repo_path(owner, repo)).await
    }

    /// Activates the repository by owner and name.
    pub async fn activate_repo(&self, owner: &str, repo: &str) -> Result<Payload> {
        self.post(&repo_path(owner, repo), None).await
    }

    /// Updates the repository settings.
    pub async fn update_repo<T: Serialize>(&self, owner: &str, repo: &str, data: &T) -> Result<Payload> {
        let body = json_body(data)?;
        self.patch(&repo_path(owner, repo), body).await
    }

    /// Deletes the repository by owner and name.
    pub async fn delete_repo(&self, owner: &str, repo: &str) -> Result<Payload> {
        self.delete(&repo_path(owner, repo)).await
    }

    /// Returns the build list of the repository.
    pub async fn get_build_list(&self, owner: &str, repo: &str) -> Result<Payload> {
        self.get(&format!("{}/builds", repo_path(owner, repo))).await
    }

    /// Returns the build by number.
    pub async fn get_build(&self, owner: &str, repo: &str, number: u64) -> Result<Payload> {
        self.get(&format!("{}/builds/{}", repo_path(owner, repo), number))
            .await
    }

    /// Returns the build feed of the current user.
    ///
    /// Common options: `latest`.
    pub async fn get_build_feed(&self, opts: &QueryOptions) -> Result<Payload> {
        self.get(&with_query("/api/user/feed", &opts.encode())).await
    }

    /// Cancels one process of a running build.
    pub async fn cancel_build(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        ppid: u64,
    ) -> Result<Payload> {
        self.delete(&format!(
            "{}/builds/{}/{}",
            repo_path(owner, repo),
            number,
            ppid
        ))
        .await
    }

    /// Approves a build that is waiting for approval.
    pub async fn approve_build(&self, owner: &str, repo: &str, number: u64) -> Result<Payload> {
        self.post(
            &format!("{}/builds/{}/approve", repo_path(owner, repo), number),
            None,
        )
        .await
    }

    /// Declines a build that is waiting for approval.
    pub async fn decline_build(&self, owner: &str, repo: &str, number: u64) -> Result<Payload> {
        self.post(
            &format!("{}/builds/{}/decline", repo_path(owner, repo), number),
            None,
        )
        .await
    }

    /// Restarts the build.
    ///
    /// Common options: `fork`, `event`, `deploy_to`.
    pub async fn restart_build(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        opts: &QueryOptions,
    ) -> Result<Payload> {
        let path = format!("{}/builds/{}", repo_path(owner, repo), number);
        self.post(&with_query(&path, &opts.encode()), None).await
    }

    /// Returns the stored logs of one build process.
    pub async fn get_logs(&self, owner: &str, repo: &str, build: u64, proc: u64) -> Result<Payload> {
        self.get(&format!("{}/logs/{}/{}", repo_path(owner, repo), build, proc))
            .await
    }

    /// Returns the raw content of one build artifact.
    pub async fn get_artifact(
        &self,
        owner: &str,
        repo: &str,
        build: u64,
        proc: u64,
        file: &str,
    ) -> Result<Payload> {
        self.get(&format!(
            "{}/files/{}/{}/{}?raw=true",
            repo_path(owner, repo),
            build,
            proc,
            file
        ))
        .await
    }

    /// Returns the artifact list of the build.
    pub async fn get_artifact_list(&self, owner: &str, repo: &str, build: u64) -> Result<Payload> {
        self.get(&format!("{}/files/{}", repo_path(owner, repo), build))
            .await
    }

    /// Returns the secret list of the repository.
    pub async fn get_secret_list(&self, owner: &str, repo: &str) -> Result<Payload> {
        self.get(&format!("{}/secrets", repo_path(owner, repo))).await
    }

    /// Creates a repository secret.
    pub async fn create_secret<T: Serialize>(&self, owner: &str, repo: &str, secret: &T) -> Result<Payload> {
        let body = json_body(secret)?;
        self.post(&format!("{}/secrets", repo_path(owner, repo)), body)
            .await
    }

    /// Deletes the named repository secret.
    pub async fn delete_secret(&self, owner: &str, repo: &str, secret: &str) -> Result<Payload> {
        self.delete(&format!("{}/secrets/{}", repo_path(owner, repo), secret))
            .await
    }

    /// Returns the registry list of the repository.
    pub async fn get_registry_list(&self, owner: &str, repo: &str) -> Result<Payload> {
        self.get(&format!("{}/registry", repo_path(owner, repo))).await
    }

    /// Creates a registry entry.
    pub async fn create_registry<T: Serialize>(&self, owner: &str, repo: &str, registry: &T) -> Result<Payload> {
        let body = json_body(registry)?;
        self.post(&format!("{}/registry", repo_path(owner, repo)), body)
            .await
    }

    /// Deletes the registry by address.
    pub async fn delete_registry(&self, owner: &str, repo: &str, address: &str) -> Result<Payload> {
        self.delete(&format!("{}/registry/{}", repo_path(owner, repo), address))
            .await
    }

    /// Returns the currently authenticated user.
    pub async fn get_self(&self) -> Result<Payload> {
        self.get("/api/user").await
    }

    /// Returns the personal API token of the current user.
    pub async fn get_token(&self) -> Result<Payload> {
        self.post("/api/user/token", None).await
    }
}
