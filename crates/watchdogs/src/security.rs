//! Security Watchdog (§4.4): an allowlist of domain glob patterns.
//! Rejects disallowed navigations up front, redirects disallowed
//! completed navigations to `about:blank`, and closes disallowed tabs.
//!
//! Modeled on `soulbrowser-policy-center`'s watch-channel live-update
//! pattern (`PolicyCenter::subscribe`), but the allowlist itself is a
//! domain-glob concept the policy center's `PolicySnapshot` has no
//! field for, so it is its own small struct here rather than a reuse of
//! that crate's model.

use std::sync::Arc;

use async_trait::async_trait;
use browser_session::{BrowserErrorKind, BrowserEvent, BrowserSession};
use glob::Pattern;
use parking_lot::RwLock;
use soulbrowser_event_bus::{EventEnvelope, EventHandler};
use url::Url;

#[derive(Clone, Debug, Default)]
pub struct SecurityPolicy {
    pub allowed_domain_patterns: Vec<String>,
}

impl SecurityPolicy {
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.allowed_domain_patterns.is_empty() {
            return true;
        }
        let host = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().map(|h| h.to_string()),
            Err(_) => None,
        };
        let Some(host) = host else {
            return url.starts_with("about:") || url.starts_with("data:");
        };
        self.allowed_domain_patterns.iter().any(|pattern| {
            Pattern::new(pattern)
                .map(|p| p.matches(&host))
                .unwrap_or(false)
        })
    }
}

pub struct SecurityWatchdog {
    session: Arc<BrowserSession>,
    policy: RwLock<SecurityPolicy>,
}

impl SecurityWatchdog {
    pub fn new(session: Arc<BrowserSession>, policy: SecurityPolicy) -> Self {
        Self {
            session,
            policy: RwLock::new(policy),
        }
    }

    pub fn set_policy(&self, policy: SecurityPolicy) {
        *self.policy.write() = policy;
    }

    pub fn policy(&self) -> SecurityPolicy {
        self.policy.read().clone()
    }
}

#[async_trait]
impl EventHandler<BrowserEvent> for SecurityWatchdog {
    fn id(&self) -> &str {
        "security-watchdog"
    }

    async fn handle(&self, envelope: &EventEnvelope<BrowserEvent>) -> Result<(), String> {
        // The bus runs one drain task that awaits each handler to
        // completion before picking up the next queued event (§4.1).
        // A handler must never `dispatch(...).await` a child event
        // itself: that child just enqueues behind this very call, so
        // the await can only resolve once the *parent* event times out.
        // Every dispatch below is therefore fired on a spawned task
        // instead, so this handler returns immediately and the child
        // is free to be drained once the parent settles (§4.1 "events
        // dispatched from within a handler run after the triggering
        // event fully settles").
        match &envelope.payload {
            BrowserEvent::NavigateToUrl { url, .. } => {
                if !self.policy().is_allowed(url) {
                    let bus = self.session.bus().clone();
                    let url = url.clone();
                    tokio::spawn(async move {
                        bus.dispatch(BrowserEvent::BrowserError {
                            kind: BrowserErrorKind::NavigationBlocked,
                            message: format!("navigation to {url} blocked by security policy"),
                            details: serde_json::Value::Null,
                        })
                        .await;
                    });
                    return Err(format!("navigation to {url} blocked"));
                }
            }
            BrowserEvent::NavigationComplete { tab } => {
                if !self.policy().is_allowed(&tab.url) {
                    let session = Arc::clone(&self.session);
                    tokio::spawn(async move {
                        let _ = session
                            .navigate_to(
                                "about:blank",
                                browser_session::NavigateOptions {
                                    new_tab: false,
                                    ..Default::default()
                                },
                            )
                            .await;
                    });
                }
            }
            BrowserEvent::TabCreated { tab } => {
                if !self.policy().is_allowed(&tab.url) {
                    let bus = self.session.bus().clone();
                    let target_id = tab.target_id.clone();
                    tokio::spawn(async move {
                        bus.dispatch(BrowserEvent::CloseTab { target_id }).await;
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_subdomain_pattern_matches() {
        let policy = SecurityPolicy {
            allowed_domain_patterns: vec!["*.example.com".to_string()],
        };
        assert!(policy.is_allowed("https://docs.example.com/path"));
        assert!(!policy.is_allowed("https://evil.test/path"));
    }

    #[test]
    fn empty_allowlist_allows_everything() {
        let policy = SecurityPolicy::default();
        assert!(policy.is_allowed("https://anything.test"));
    }
}
