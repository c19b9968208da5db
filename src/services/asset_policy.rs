// src/services/asset_policy.rs
//! Which remote locations the server may dereference on a client's behalf.
//!
//! Kits arrive from the browser, so any URL inside one is untrusted. Only
//! the configured blob store and the video vendor's media CDN are fetched.

use reqwest::Url;

const VENDOR_MEDIA_DOMAINS: [&str; 1] = ["fal.media"];

#[derive(Debug, Clone, Default)]
pub struct AssetPolicy {
    trusted_prefixes: Vec<String>,
}

impl AssetPolicy {
    /// `trusted_prefixes` are base URLs such as the blob store's public URL.
    pub fn new<I, S>(trusted_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trusted_prefixes = trusted_prefixes
            .into_iter()
            .filter_map(|prefix| Url::parse(prefix.as_ref().trim()).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|url| {
                let mut prefix = url.to_string();
                if !prefix.ends_with('/') {
                    prefix.push('/');
                }
                prefix
            })
            .collect();
        Self { trusted_prefixes }
    }

    pub fn allows(&self, location: &str) -> bool {
        let Ok(url) = Url::parse(location.trim()) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if self
            .trusted_prefixes
            .iter()
            .any(|prefix| url.as_str().starts_with(prefix.as_str()))
        {
            return true;
        }
        // IP literals have no domain, so they never match a vendor host
        url.scheme() == "https" && url.domain().is_some_and(is_vendor_media_domain)
    }
}

fn is_vendor_media_domain(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.');
    VENDOR_MEDIA_DOMAINS.iter().any(|vendor| {
        domain == *vendor
            || domain
                .strip_suffix(vendor)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AssetPolicy {
        AssetPolicy::new(["https://cdn.example.com/brandkits"])
    }

    #[test]
    fn blob_store_and_vendor_media_are_fetchable() {
        let policy = policy();
        assert!(policy.allows("https://cdn.example.com/brandkits/solara/a.mp3"));
        assert!(policy.allows("https://fal.media/files/clip.mp4"));
        assert!(policy.allows("https://v3.fal.media/files/clip.mp4"));
    }

    #[test]
    fn internal_and_lookalike_hosts_are_refused() {
        let policy = policy();
        for location in [
            "http://127.0.0.1:9/latest/meta-data/iam",
            "http://169.254.169.254/latest/meta-data/",
            "http://10.0.0.8/admin",
            "http://192.168.1.1/",
            "http://[::1]/",
            "http://0.0.0.0/",
            "http://localhost:6379/",
            "https://fal.media.evil.test/x.mp4",
            "https://notfal.media/x.mp4",
            "http://fal.media/files/clip.mp4",
            "https://cdn.example.com/brandkits-private/x",
            "https://cdn.example.com@127.0.0.1/brandkits/x",
            "https://cdn.example.com/other/x",
            "file:///etc/passwd",
            "not a url",
        ] {
            assert!(!policy.allows(location), "{} should be refused", location);
        }
    }

    #[test]
    fn no_blob_store_means_vendor_media_only() {
        let policy = AssetPolicy::default();
        assert!(!policy.allows("https://cdn.example.com/brandkits/a.mp3"));
        assert!(policy.allows("https://v3.fal.media/files/clip.mp4"));
    }
}
