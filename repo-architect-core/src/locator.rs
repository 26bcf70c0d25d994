use std::sync::LazyLock;

use regex::Regex;

use crate::error::InvalidReference;
use crate::model::RepositoryReference;

static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<scheme>https?)://)?(?P<host>[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?(?::\d+)?)/(?P<owner>[A-Za-z0-9_.-]+)/(?P<name>[A-Za-z0-9_.-]+?)(?:\.git)?/?$",
    )
    .unwrap()
});

impl RepositoryReference {
    /// Decompose `[scheme://]host/<owner>/<name>[.git]` into a reference.
    ///
    /// Pure; performs no I/O.
    pub fn parse(url: &str) -> Result<Self, InvalidReference> {
        let invalid = || InvalidReference {
            input: url.to_owned(),
        };
        let caps = REPO_URL_RE.captures(url.trim()).ok_or_else(invalid)?;

        let owner = &caps["owner"];
        let name = &caps["name"];
        if [owner, name].iter().any(|s| *s == "." || *s == "..") {
            return Err(invalid());
        }

        let scheme = caps.name("scheme").map_or("https", |m| m.as_str());
        Ok(Self {
            host_url: format!("{}://{}", scheme, &caps["host"]),
            owner: owner.to_owned(),
            name: name.to_owned(),
            access_token: None,
        })
    }

    /// Attach a credential. Blank tokens are ignored.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        if let Some(t) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(t);
        }
        self
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Clone URL, with the access token embedded as userinfo when present.
    pub fn clone_url(&self) -> String {
        match &self.access_token {
            Some(token) => self.clone_url_with_userinfo(token),
            None => format!("{}/{}/{}.git", self.host_url, self.owner, self.name),
        }
    }

    /// Clone URL safe to log.
    pub fn redacted_clone_url(&self) -> String {
        match self.access_token {
            Some(_) => self.clone_url_with_userinfo("***"),
            None => self.clone_url(),
        }
    }

    fn clone_url_with_userinfo(&self, userinfo: &str) -> String {
        let (scheme, host) = self
            .host_url
            .split_once("://")
            .unwrap_or(("https", self.host_url.as_str()));
        format!(
            "{}://{}@{}/{}/{}.git",
            scheme, userinfo, host, self.owner, self.name
        )
    }
}
