//! Byte transport for export and import.
//!
//! Supported locations are plain paths, `file://` URIs, and `http(s)://`
//! URIs (PUT to write, GET to read) with optional basic-auth credentials.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;
use url::Url;

use super::RegistryError;

/// `user:password` credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  pub user: String,
  pub password: String,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("user", &self.user)
      .field("password", &"***")
      .finish()
  }
}

impl FromStr for Credentials {
  type Err = RegistryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once(':') {
      Some((user, password)) if !user.is_empty() => Ok(Self {
        user: user.to_string(),
        password: password.to_string(),
      }),
      _ => Err(RegistryError::InvalidCredentials),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
  File(PathBuf),
  Http(Url),
}

impl Location {
  pub fn parse(uri: &str) -> Result<Self, RegistryError> {
    if !uri.contains("://") {
      return Ok(Self::File(PathBuf::from(uri)));
    }
    let url = Url::parse(uri).map_err(|_| RegistryError::UnsupportedTransport(uri.to_string()))?;
    match url.scheme() {
      "file" => url
        .to_file_path()
        .map(Self::File)
        .map_err(|_| RegistryError::UnsupportedTransport(uri.to_string())),
      "http" | "https" => Ok(Self::Http(url)),
      _ => Err(RegistryError::UnsupportedTransport(uri.to_string())),
    }
  }
}

pub async fn read(uri: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>, RegistryError> {
  match Location::parse(uri)? {
    Location::File(path) => {
      debug!(path = %path.display(), "reading package stream");
      Ok(tokio::fs::read(&path).await?)
    }
    Location::Http(url) => {
      debug!(url = %redacted(&url), "downloading package stream");
      let mut request = reqwest::Client::new().get(url.clone());
      if let Some(c) = credentials {
        request = request.basic_auth(&c.user, Some(&c.password));
      }
      let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| transfer_error(&url, e))?;
      let bytes = response.bytes().await.map_err(|e| transfer_error(&url, e))?;
      Ok(bytes.to_vec())
    }
  }
}

pub async fn write(uri: &str, bytes: Vec<u8>, credentials: Option<&Credentials>) -> Result<(), RegistryError> {
  match Location::parse(uri)? {
    Location::File(path) => {
      debug!(path = %path.display(), bytes = bytes.len(), "writing package stream");
      if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
      }
      tokio::fs::write(&path, bytes).await?;
      Ok(())
    }
    Location::Http(url) => {
      debug!(url = %redacted(&url), bytes = bytes.len(), "uploading package stream");
      let mut request = reqwest::Client::new().put(url.clone()).body(bytes);
      if let Some(c) = credentials {
        request = request.basic_auth(&c.user, Some(&c.password));
      }
      request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| transfer_error(&url, e))?;
      Ok(())
    }
  }
}

fn transfer_error(url: &Url, e: reqwest::Error) -> RegistryError {
  RegistryError::Transfer {
    uri: redacted(url),
    message: e.to_string(),
  }
}

fn redacted(url: &Url) -> String {
  let mut url = url.clone();
  let _ = url.set_password(None);
  url.to_string()
}
