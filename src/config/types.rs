use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Kin-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listing: ListingConfig,
    #[serde(default)]
    pub detail: DetailConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Where the listing lives and how its entries are located
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Fully constructed listing URL (query, section, period, sort)
    pub url: String,

    /// Selector matching one element per listed entry
    #[serde(rename = "item-selector", default = "default_item_selector")]
    pub item_selector: String,

    /// Selector for the title anchor inside an entry; its `href` is the detail URL
    #[serde(rename = "title-selector", default = "default_listing_title_selector")]
    pub title_selector: String,

    /// Selector for the listed date inside an entry
    #[serde(rename = "date-selector", default = "default_date_selector")]
    pub date_selector: String,

    /// Selector whose presence means the listing content has rendered
    #[serde(rename = "ready-selector", default = "default_ready_selector")]
    pub ready_selector: String,

    /// Boilerplate token stripped from listed titles
    #[serde(rename = "title-prefix", default = "default_title_prefix")]
    pub title_prefix: String,

    /// Upper bound on waiting for the listing content to appear
    #[serde(rename = "wait-timeout-secs", default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Pause between readiness checks
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl ListingConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Selectors for the detail page
#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    #[serde(rename = "title-selector", default = "default_detail_title_selector")]
    pub title_selector: String,

    /// Author/info block
    #[serde(rename = "author-selector", default = "default_author_selector")]
    pub author_selector: String,

    #[serde(rename = "views-selector", default = "default_views_selector")]
    pub views_selector: String,

    #[serde(rename = "created-at-selector", default = "default_created_at_selector")]
    pub created_at_selector: String,

    /// Label token removed from the creation date text
    #[serde(rename = "created-at-label", default = "default_created_at_label")]
    pub created_at_label: String,

    #[serde(rename = "description-selector", default = "default_description_selector")]
    pub description_selector: String,

    #[serde(rename = "tags-selector", default = "default_tags_selector")]
    pub tags_selector: String,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            title_selector: default_detail_title_selector(),
            author_selector: default_author_selector(),
            views_selector: default_views_selector(),
            created_at_selector: default_created_at_selector(),
            created_at_label: default_created_at_label(),
            description_selector: default_description_selector(),
            tags_selector: default_tags_selector(),
        }
    }
}

/// Network behavior for detail fetches
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Attempts per detail page, including the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts after a transient failure (seconds)
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_item_selector() -> String {
    "ul.basic1 li".to_string()
}

fn default_listing_title_selector() -> String {
    "dt a._searchListTitleAnchor".to_string()
}

fn default_date_selector() -> String {
    "dd.txt_inline".to_string()
}

fn default_ready_selector() -> String {
    "a._searchListTitleAnchor".to_string()
}

fn default_title_prefix() -> String {
    "질문".to_string()
}

fn default_wait_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_detail_title_selector() -> String {
    ".endTitleSection".to_string()
}

fn default_author_selector() -> String {
    ".userInfo__bullet".to_string()
}

fn default_views_selector() -> String {
    ".userInfo__bullet .infoItem:nth-of-type(2)".to_string()
}

fn default_created_at_selector() -> String {
    ".userInfo__bullet .infoItem:nth-of-type(3)".to_string()
}

fn default_created_at_label() -> String {
    "작성일".to_string()
}

fn default_description_selector() -> String {
    ".questionDetail".to_string()
}

fn default_tags_selector() -> String {
    ".tagList a".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("kin-harvest/{}", env!("CARGO_PKG_VERSION"))
}
