//! Endpoint URL handling.

use reqwest::Url;

/// Joins `endpoint` onto `base_url` with exactly one slash between them.
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

/// Checks that `raw` is an absolute http(s) URL.
pub fn validate_http_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|err| format!("invalid URL '{trimmed}': {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(format!(
            "unsupported URL scheme '{other}' in '{trimmed}' (expected http or https)"
        )),
    }
}
