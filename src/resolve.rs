use tracing::debug;
use url::Url;

use crate::config::ResolvedConfig;
use crate::domain::FileRecord;
use crate::metadata::{DEFAULT_API_BASE, DEFAULT_SITE_BASE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    candidates: Vec<String>,
}

impl ResolvedUrl {
    pub fn primary(&self) -> &str {
        &self.candidates[0]
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

#[derive(Debug, Clone)]
pub struct UrlResolver {
    api_base: String,
    site_base: String,
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_SITE_BASE)
    }
}

impl UrlResolver {
    pub fn new(api_base: &str, site_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            site_base: site_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(&config.api_base_url, &config.site_base_url)
    }

    pub fn primary_url(&self, record: &FileRecord) -> String {
        format!(
            "{}/query/data/?id.accession={}&file.file_name={}",
            self.api_base,
            record.dataset_id.as_str(),
            urlencoding::encode(&record.filename)
        )
    }

    pub fn resolve(&self, record: &FileRecord) -> ResolvedUrl {
        let primary = self.primary_url(record);
        let mut candidates = vec![primary];
        if let Some(fallback) = record
            .raw_url_hint
            .as_deref()
            .and_then(|hint| self.normalize_hint(hint))
        {
            if fallback != candidates[0] {
                candidates.push(fallback);
            }
        }
        ResolvedUrl { candidates }
    }

    fn normalize_hint(&self, hint: &str) -> Option<String> {
        let hint = hint.trim();
        if hint.is_empty() {
            return None;
        }
        let absolute = if hint.starts_with('/') {
            format!("{}{hint}", self.site_base)
        } else {
            hint.to_string()
        };
        match Url::parse(&absolute) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(absolute),
            _ => {
                debug!(hint, "ignoring malformed remote url hint");
                None
            }
        }
    }
}
