//! Single best-effort submission of the manifest to the run-orchestration
//! service.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Pick the credentials for `host` out of a netrc-style file. A `default`
/// entry applies when no `machine` entry names the host.
pub fn netrc_credentials(netrc: &Path, host: &str) -> Result<Option<Credentials>> {
    let text = std::fs::read_to_string(netrc)
        .with_context(|| format!("failed to read netrc file {}", netrc.display()))?;
    Ok(parse_netrc(&text, host))
}

fn parse_netrc(text: &str, host: &str) -> Option<Credentials> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut matched: Option<Credentials> = None;
    let mut fallback: Option<Credentials> = None;
    let mut i = 0;
    while i < tokens.len() {
        let (entry_host, mut j) = match tokens[i] {
            "machine" if i + 1 < tokens.len() => (Some(tokens[i + 1]), i + 2),
            "default" => (None, i + 1),
            _ => {
                i += 1;
                continue;
            }
        };
        let mut login = None;
        let mut password = None;
        while j + 1 < tokens.len() {
            match tokens[j] {
                "login" => login = Some(tokens[j + 1].to_string()),
                "password" => password = Some(tokens[j + 1].to_string()),
                "machine" | "default" => break,
                _ => {
                    j += 1;
                    continue;
                }
            }
            j += 2;
        }
        if let (Some(login), Some(password)) = (login, password) {
            let creds = Credentials { login, password };
            match entry_host {
                Some(h) if h == host => {
                    matched.get_or_insert(creds);
                }
                None => {
                    fallback.get_or_insert(creds);
                }
                _ => {}
            }
        }
        i = j;
    }
    matched.or(fallback)
}

/// The curl invocation equivalent to what `submit` does, printed verbatim
/// in dry-run mode.
pub fn curl_command(netrc: Option<&Path>, json_path: &Path, url: &str) -> String {
    let netrc = match netrc {
        Some(p) => format!(" --netrc-file {}", p.display()),
        None => String::new(),
    };
    format!(
        "curl --request POST{netrc} --header \"Content-type: application/json\" -d @{} {url}",
        json_path.display()
    )
}

/// POST the already-written manifest to `url` in one blocking round trip.
/// No retries; the caller decides how loudly to report a failure. The file
/// on disk is never affected by the outcome.
pub fn submit(json_path: &Path, url: &str, netrc: Option<&Path>) -> Result<()> {
    let body = std::fs::read(json_path)
        .with_context(|| format!("failed to read {}", json_path.display()))?;
    let client = Client::builder()
        .timeout(SUBMIT_TIMEOUT)
        .build()
        .context("failed to build the http client")?;

    let mut request = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body);
    if let Some(netrc) = netrc {
        let parsed = Url::parse(url).with_context(|| format!("invalid submission url {url}"))?;
        let host = parsed.host_str().unwrap_or_default();
        if let Some(creds) = netrc_credentials(netrc, host)? {
            request = request.basic_auth(creds.login, Some(creds.password));
        }
    }

    let response = request
        .send()
        .with_context(|| format!("could not reach {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} responded with {status}");
    }
    Ok(())
}
