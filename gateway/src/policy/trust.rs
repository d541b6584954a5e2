use std::collections::HashMap;

use config::TrustedSource;
use lex_core::SourceTrust;
use url::Url;

#[derive(Debug, Clone)]
struct SourceRule {
    hosts: Vec<String>,
    trust: SourceTrust,
    citation_allowed: bool
}

/// Allow-list of citation sources and the hosts their URLs may point at.
#[derive(Debug, Clone, Default)]
pub struct SourceTrustPolicy {
    sources: HashMap<String, SourceRule>
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Host of an absolute http(s) URL, lowercased. `None` for anything else.
pub fn host_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().map(normalize_host)
}

impl SourceTrustPolicy {
    pub fn from_config(sources: &[TrustedSource]) -> Self {
        let sources = sources
            .iter()
            .map(|source| {
                (
                    source.source_id.clone(),
                    SourceRule {
                        hosts: source.hosts.iter().map(|h| normalize_host(h)).collect(),
                        trust: source.trust,
                        citation_allowed: source.citation_allowed
                    }
                )
            })
            .collect();
        Self { sources }
    }

    /// True when `host` equals, or is a dot-bounded subdomain of, one of the
    /// hosts registered for `source_id`. `evilfedlex.admin.ch.attacker.io`
    /// and `notbger.ch` do not match.
    pub fn is_trusted(&self, source_id: &str, host: &str) -> bool {
        let Some(rule) = self.sources.get(source_id) else {
            return false;
        };
        let host = normalize_host(host);
        if host.is_empty() {
            return false;
        }
        rule.hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn citation_allowed(&self, source_id: &str) -> bool {
        self.sources
            .get(source_id)
            .is_some_and(|rule| rule.citation_allowed)
    }

    pub fn trust_of(&self, source_id: &str) -> SourceTrust {
        self.sources
            .get(source_id)
            .map_or(SourceTrust::Unverified, |rule| rule.trust)
    }

    /// A URL may be exported only when it parses as http(s) and its host is
    /// trusted for the source.
    pub fn url_allowed(&self, source_id: &str, url: &str) -> bool {
        host_of(url).is_some_and(|host| self.is_trusted(source_id, &host))
    }
}
