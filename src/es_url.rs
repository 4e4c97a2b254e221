use std::sync::Arc;

/// Strip trailing slashes and assume `https://` for bare domain hosts.
pub fn normalize_base_url(base_url: impl Into<Arc<str>>) -> Arc<str> {
    let base_url: Arc<str> = base_url.into();
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        if trimmed.len() == base_url.len() {
            return base_url;
        }
        return Arc::<str>::from(trimmed);
    }
    Arc::<str>::from(format!("https://{trimmed}"))
}
