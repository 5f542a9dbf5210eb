//! Append-only, dedup-by-absolute-path download bookkeeping (§4.3 "PDF
//! auto-download", §8 Invariant 6). Shared between the session's direct
//! PDF fetch path and the downloads watchdog's `FileDownloaded` handling.

use std::collections::HashSet;

use parking_lot::RwLock;
use url::Url;

use crate::types::DownloadedFile;

#[derive(Default)]
pub struct DownloadedFiles {
    files: RwLock<Vec<DownloadedFile>>,
    seen_paths: RwLock<HashSet<String>>,
}

impl DownloadedFiles {
    /// Returns `true` if this is a new entry (appended), `false` if the
    /// path was already recorded.
    pub fn record(&self, file: DownloadedFile) -> bool {
        let mut seen = self.seen_paths.write();
        if !seen.insert(file.path.clone()) {
            return false;
        }
        self.files.write().push(file);
        true
    }

    pub fn list(&self) -> Vec<String> {
        self.files.read().iter().map(|f| f.path.clone()).collect()
    }

    pub fn all(&self) -> Vec<DownloadedFile> {
        self.files.read().clone()
    }
}

/// URL path with the query string stripped, used to dedup PDF auto-download
/// fetches that differ only by tracking params (§4.3 "Dedup cache is
/// per-session").
pub fn dedup_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// PDF content-type detection: CDP MIME primary, URL extension secondary
/// (§9 Open Question resolution). No byte-sniffing beyond an optional
/// `%PDF` guard on the fetched body, applied by the caller before writing
/// to disk.
pub fn looks_like_pdf(mime_type: Option<&str>, url: &str) -> bool {
    if let Some(mime) = mime_type {
        if mime.eq_ignore_ascii_case("application/pdf") {
            return true;
        }
    }
    Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or_else(|_| url.to_ascii_lowercase().ends_with(".pdf"))
}

pub fn is_attachment_download(
    mime_type: Option<&str>,
    content_disposition: Option<&str>,
) -> bool {
    let attachment = content_disposition
        .map(|v| v.to_ascii_lowercase().starts_with("attachment"))
        .unwrap_or(false);
    let octet_stream = mime_type
        .map(|m| m.eq_ignore_ascii_case("application/octet-stream"))
        .unwrap_or(false);
    attachment || octet_stream
}

/// Sanitizes a suggested filename to a restricted character set and
/// dedups against `existing` with a `_N` suffix (§6 "Downloaded files").
pub fn sanitize_filename(suggested: &str, existing: &HashSet<String>) -> String {
    let sanitized: String = suggested
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = if sanitized.trim_matches('_').is_empty() {
        "download".to_string()
    } else {
        sanitized
    };

    if !existing.contains(&sanitized) {
        return sanitized;
    }

    let (stem, ext) = match sanitized.rfind('.') {
        Some(idx) => (sanitized[..idx].to_string(), sanitized[idx..].to_string()),
        None => (sanitized.clone(), String::new()),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_ignores_query_string() {
        assert_eq!(
            dedup_key("https://example.com/report.pdf?token=abc"),
            dedup_key("https://example.com/report.pdf?token=xyz")
        );
    }

    #[test]
    fn pdf_detection_prefers_mime_over_extension() {
        assert!(looks_like_pdf(Some("application/pdf"), "https://x/y"));
        assert!(looks_like_pdf(None, "https://x/y.pdf"));
        assert!(!looks_like_pdf(Some("text/html"), "https://x/y"));
    }

    #[test]
    fn filename_dedup_appends_suffix() {
        let mut existing = HashSet::new();
        existing.insert("report.pdf".to_string());
        let name = sanitize_filename("report.pdf", &existing);
        assert_eq!(name, "report_1.pdf");
    }

    #[test]
    fn appending_same_path_twice_is_a_no_op() {
        let store = DownloadedFiles::default();
        let file = DownloadedFile {
            path: "/tmp/f.pdf".into(),
            url: "u".into(),
            suggested_filename: "f.pdf".into(),
            file_size: 128,
        };
        assert!(store.record(file.clone()));
        assert!(!store.record(file));
        assert_eq!(store.list(), vec!["/tmp/f.pdf".to_string()]);
    }
}
