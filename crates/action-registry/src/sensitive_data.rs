//! Sensitive Data Map: domain pattern → `{placeholder → real value}`,
//! matched glob-on-host. Distinct from `l6-privacy`'s one-way PII
//! masking — this substitution is bidirectional and reversible:
//! outbound (placeholder → real) is applied to action parameters right
//! before a handler touches the page, inbound (real → placeholder) is
//! applied to anything that will become LLM- or log-visible text, so a
//! real secret is never present in a prompt or a recorded event.

use std::collections::HashMap;

struct DomainEntry {
    pattern: String,
    values: HashMap<String, String>,
}

#[derive(Default)]
pub struct SensitiveDataMap {
    entries: Vec<DomainEntry>,
}

impl SensitiveDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_domain(&mut self, pattern: impl Into<String>, values: HashMap<String, String>) {
        self.entries.push(DomainEntry {
            pattern: pattern.into(),
            values,
        });
    }

    fn host_matches(pattern: &str, host: &str) -> bool {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(host))
            .unwrap_or(false)
    }

    fn entries_for_url<'a>(&'a self, url: &str) -> Vec<&'a DomainEntry> {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        self.entries
            .iter()
            .filter(|e| Self::host_matches(&e.pattern, &host))
            .collect()
    }

    /// Outbound: replace `{{placeholder}}` tokens with their real value,
    /// scoped to domains matching `url` (the active tab's URL when the
    /// action executes).
    pub fn resolve_placeholders(&self, text: &str, url: &str) -> String {
        let mut out = text.to_string();
        for entry in self.entries_for_url(url) {
            for (placeholder, real) in &entry.values {
                out = out.replace(&format!("{{{{{placeholder}}}}}"), real);
            }
        }
        out
    }

    /// Inbound: replace any occurrence of a real value with its
    /// placeholder token, across every known domain (a secret must never
    /// leak into LLM-visible text regardless of which site produced it).
    pub fn mask_real_values(&self, text: &str) -> String {
        let mut out = text.to_string();
        for entry in &self.entries {
            for (placeholder, real) in &entry.values {
                if real.is_empty() {
                    continue;
                }
                out = out.replace(real.as_str(), &format!("{{{{{placeholder}}}}}"));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.values.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_only_for_matching_domain() {
        let mut map = SensitiveDataMap::new();
        let mut values = HashMap::new();
        values.insert("password".to_string(), "hunter2".to_string());
        map.add_domain("*.example.com", values);

        let resolved = map.resolve_placeholders("pw={{password}}", "https://login.example.com/a");
        assert_eq!(resolved, "pw=hunter2");

        let untouched = map.resolve_placeholders("pw={{password}}", "https://other.com");
        assert_eq!(untouched, "pw={{password}}");
    }

    #[test]
    fn masks_real_values_back_to_placeholders() {
        let mut map = SensitiveDataMap::new();
        let mut values = HashMap::new();
        values.insert("password".to_string(), "hunter2".to_string());
        map.add_domain("*.example.com", values);

        let masked = map.mask_real_values("logged in with hunter2 just now");
        assert_eq!(masked, "logged in with {{password}} just now");
    }
}
