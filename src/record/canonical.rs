use url::Url;

/// Query parameters that never contribute to a resource's identity
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Resolves a listing href into the canonical detail URL used as the dedup key
///
/// # Canonicalization Steps
///
/// 1. Resolve `href` against the listing URL (relative hrefs are common)
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Remove the fragment
/// 4. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 5. Sort the remaining query parameters by key, keeping the order of repeated keys
/// 6. Drop an empty query string
///
/// The host is lowercased by the URL parser itself.
///
/// # Examples
///
/// ```
/// use kin_harvest::record::canonicalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://kin.naver.com/search/list.naver?query=x").unwrap();
/// let url = canonicalize_url("/qna/detail.naver?docId=7&dirId=4#answer", &base).unwrap();
/// assert_eq!(url, "https://kin.naver.com/qna/detail.naver?dirId=4&docId=7");
/// ```
pub fn canonicalize_url(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        // Stable sort keeps repeated keys in document order
        params.sort_by(|a, b| a.0.cmp(&b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Some(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
