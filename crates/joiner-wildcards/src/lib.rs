// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use joiner_app::{CandidateSource, TriggerKind};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const TEXT_EXTENSION: &str = "txt";
const YAML_EXTENSION: &str = "yaml";

/// Anything that can produce the candidate list for one trigger kind.
pub trait CandidateFetcher {
    fn fetch(&self, kind: TriggerKind) -> Result<Vec<String>>;

    fn describe(&self) -> String;
}

/// Fetches every kind into `source`. Failures leave that kind empty.
pub fn load_candidates(fetcher: &dyn CandidateFetcher, source: &mut CandidateSource) -> usize {
    TriggerKind::ALL
        .into_iter()
        .map(|kind| source.populate(kind, fetcher.fetch(kind)))
        .sum()
}

pub const fn endpoint_path(kind: TriggerKind) -> &'static str {
    match kind {
        TriggerKind::Wildcard => "my_utils/wildcards",
        TriggerKind::Preset => "my_utils/presets",
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("wildcards.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("wildcards.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "wildcards.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn endpoint(&self, kind: TriggerKind) -> String {
        format!("{}/{}", self.base_url, endpoint_path(kind))
    }
}

impl CandidateFetcher for Client {
    fn fetch(&self, kind: TriggerKind) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.endpoint(kind))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let values: Vec<String> = response
            .json()
            .with_context(|| format!("decode {} list", kind.as_str()))?;
        log::debug!(
            "fetched {} {} candidates from {}",
            values.len(),
            kind.as_str(),
            self.base_url
        );
        Ok(values)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Offline source: wildcard names from a directory of `.txt` and `.yaml`
/// files. It has no presets.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    dir: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

}

impl CandidateFetcher for DirectoryFetcher {
    fn fetch(&self, kind: TriggerKind) -> Result<Vec<String>> {
        match kind {
            TriggerKind::Wildcard => scan_wildcard_dir(&self.dir),
            TriggerKind::Preset => Ok(Vec::new()),
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Wildcard names under `dir`, sorted and de-duplicated. Every `name.txt`
/// becomes `__name__`. In a `.yaml` file every key path that ends in a list
/// becomes `__key/subkey__`; the file name is not part of the path. A YAML
/// file that fails to parse is skipped. A missing directory yields an empty
/// list.
pub fn scan_wildcard_dir(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries =
        fs::read_dir(dir).with_context(|| format!("read wildcard dir {}", dir.display()))?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(TEXT_EXTENSION) => {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
                    && !stem.is_empty()
                {
                    names.insert(format!("__{stem}__"));
                }
            }
            Some(YAML_EXTENSION) => match read_yaml_wildcards(&path) {
                Ok(found) => names.extend(found),
                Err(error) => log::warn!("skipping wildcard file: {error:#}"),
            },
            _ => {}
        }
    }
    Ok(names.into_iter().collect())
}

fn read_yaml_wildcards(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let document: YamlValue =
        serde_yaml::from_str(&raw).with_context(|| format!("parse YAML {}", path.display()))?;
    let mut names = Vec::new();
    collect_yaml_keys(&document, "", &mut names);
    Ok(names)
}

fn collect_yaml_keys(node: &YamlValue, prefix: &str, names: &mut Vec<String>) {
    match node {
        YamlValue::Mapping(map) => {
            for (key, value) in map {
                let Some(key) = yaml_key(key) else {
                    continue;
                };
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}/{key}")
                };
                collect_yaml_keys(value, &path, names);
            }
        }
        YamlValue::Sequence(_) if !prefix.is_empty() => names.push(format!("__{prefix}__")),
        YamlValue::Tagged(tagged) => collect_yaml_keys(&tagged.value, prefix, names),
        _ => {}
    }
}

fn yaml_key(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(text) => Some(text.clone()),
        YamlValue::Number(number) => Some(number.to_string()),
        YamlValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the wildcard server running? ({} )",
        base_url,
        error
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::{
        CandidateFetcher, Client, DirectoryFetcher, clean_error_response, load_candidates,
        scan_wildcard_dir,
    };
    use anyhow::Result;
    use joiner_app::{CandidateSource, TriggerKind};
    use reqwest::StatusCode;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn client_rejects_bad_base_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
        assert!(Client::new("ftp://host", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn endpoints_follow_kind() -> Result<()> {
        let client = Client::new("http://127.0.0.1:8188/", Duration::from_secs(1))?;
        assert_eq!(
            client.endpoint(TriggerKind::Wildcard),
            "http://127.0.0.1:8188/my_utils/wildcards"
        );
        assert_eq!(
            client.endpoint(TriggerKind::Preset),
            "http://127.0.0.1:8188/my_utils/presets"
        );
        Ok(())
    }

    #[test]
    fn error_body_is_cleaned() {
        let json = clean_error_response(StatusCode::NOT_FOUND, r#"{"error":"no such route"}"#);
        assert_eq!(json.to_string(), "server error (404): no such route");

        let plain = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(plain.to_string(), "server error (502): upstream down");

        let html = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(html.to_string(), "server returned 500");
    }

    #[test]
    fn directory_scan_wraps_txt_stems() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("season.txt"), "spring\nsummer\n")?;
        fs::write(dir.path().join("colors.txt"), "red\n")?;
        fs::write(dir.path().join("notes.md"), "ignored")?;
        fs::create_dir(dir.path().join("nested.txt"))?;

        assert_eq!(
            scan_wildcard_dir(dir.path())?,
            vec!["__colors__".to_owned(), "__season__".to_owned()]
        );
        assert!(scan_wildcard_dir(&dir.path().join("missing"))?.is_empty());
        Ok(())
    }

    #[test]
    fn directory_scan_expands_nested_yaml_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("style.yaml"),
            "a:\n  b:\n    - x\n  c: plain\nscene:\n  - beach\n  - forest\n",
        )?;
        fs::write(dir.path().join("broken.yaml"), "a: [unclosed\n")?;
        fs::write(dir.path().join("mood.txt"), "calm\n")?;

        assert_eq!(
            scan_wildcard_dir(dir.path())?,
            vec![
                "__a/b__".to_owned(),
                "__mood__".to_owned(),
                "__scene__".to_owned()
            ]
        );

        let fetcher = DirectoryFetcher::new(dir.path());
        let mut source = CandidateSource::new();
        load_candidates(&fetcher, &mut source);
        assert_eq!(source.filter(TriggerKind::Wildcard, "a/b"), ["__a/b__".to_owned()]);
        Ok(())
    }

    #[test]
    fn directory_fetcher_fills_wildcards_only() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("mood.txt"), "calm\n")?;
        let fetcher = DirectoryFetcher::new(dir.path());
        let mut source = CandidateSource::new();

        assert_eq!(load_candidates(&fetcher, &mut source), 1);
        assert_eq!(source.candidates(TriggerKind::Wildcard), ["__mood__".to_owned()]);
        assert!(fetcher.fetch(TriggerKind::Preset)?.is_empty());
        Ok(())
    }
}
