//! Shared fixtures: a mock Q&A site and test configurations

use kin_harvest::config::{parse_config, Config};
use kin_harvest::harvester::RetryPolicy;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LISTING_PATH: &str = "/search/list.naver";
pub const DETAIL_PATH: &str = "/qna/detail.naver";

/// One listed question on the mock site
pub struct Question {
    pub doc_id: u32,
    pub title: &'static str,
    pub views: &'static str,
    pub description: Option<&'static str>,
}

impl Question {
    pub fn new(doc_id: u32, title: &'static str) -> Self {
        Self {
            doc_id,
            title,
            views: "조회수 12",
            description: Some("질문 본문입니다."),
        }
    }
}

pub fn listing_url(server: &MockServer) -> String {
    format!("{}{}?query=%ED%95%80%EB%8B%A4", server.uri(), LISTING_PATH)
}

pub fn detail_url(server: &MockServer, doc_id: u32) -> String {
    format!("{}{}?docId={}", server.uri(), DETAIL_PATH, doc_id)
}

pub fn listing_page(questions: &[Question]) -> String {
    let mut html = String::from(r#"<html><body><ul class="basic1">"#);
    for q in questions {
        html.push_str(&format!(
            r#"<li><dl>
                <dt><a class="_searchListTitleAnchor" href="{}?docId={}&amp;utm_source=search">질문 {}</a></dt>
                <dd class="txt_inline">2024.09.01.</dd>
            </dl></li>"#,
            DETAIL_PATH, q.doc_id, q.title
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

pub fn detail_page(q: &Question) -> String {
    let description = q
        .description
        .map(|d| format!(r#"<div class="questionDetail">{}</div>"#, d))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <div class="endTitleSection">질문 {title} (detail)</div>
        <div class="userInfo__bullet">
            <span class="infoItem">writer{id}</span>
            <span class="infoItem">{views}</span>
            <span class="infoItem">작성일 2024.09.01.</span>
        </div>
        {description}
        <div class="tagList"><a>#핀다</a><a>#대출</a></div>
        </body></html>"#,
        title = q.title,
        id = q.doc_id,
        views = q.views,
        description = description
    )
}

/// Mounts the listing and every detail page
pub async fn mount_site(server: &MockServer, questions: &[Question]) {
    mount_listing(server, listing_page(questions)).await;
    mount_details(server, questions).await;
}

pub async fn mount_listing(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_details(server: &MockServer, questions: &[Question]) {
    for q in questions {
        mount_detail(server, q.doc_id, ResponseTemplate::new(200).set_body_string(detail_page(q)))
            .await;
    }
}

pub async fn mount_detail(server: &MockServer, doc_id: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("docId", doc_id.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Configuration pointed at `server`, with a database inside `dir`
pub fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    let db_path = dir.path().join("harvest.db");
    parse_config(&format!(
        r#"
[listing]
url = "{}"
wait-timeout-secs = 1
poll-interval-ms = 20

[fetch]
max-retries = 3
retry-delay-secs = 0
request-timeout-secs = 5

[output]
database-path = "{}"
"#,
        listing_url(server),
        db_path.display()
    ))
    .expect("test config is valid")
}

pub fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(20),
        attempt_timeout: Duration::from_secs(5),
    }
}
