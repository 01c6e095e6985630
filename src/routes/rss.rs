use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::db::models::Insight;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::store::ListFilter;

const FEED_LIMIT: usize = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn published(insight: &Insight) -> DateTime<Utc> {
    insight.published_at.unwrap_or(insight.created_at)
}

fn render_feed(config: &AppConfig, insights: &[Insight]) -> String {
    let base_url = config.site_url.trim_end_matches('/');
    let mut items = String::new();
    for insight in insights {
        let url = format!("{}/insights/{}", base_url, insight.slug);
        let mut categories = format!("      <category>{}</category>\n", escape_xml(&insight.category));
        for tag in &insight.tags {
            categories.push_str(&format!("      <category>{}</category>\n", escape_xml(tag)));
        }
        items.push_str(&format!(
            "    <item>\n\
             \x20     <title>{}</title>\n\
             \x20     <link>{}</link>\n\
             \x20     <description>{}</description>\n\
             \x20     <pubDate>{}</pubDate>\n\
             \x20     <guid isPermaLink=\"true\">{}</guid>\n\
             {}    </item>\n",
            escape_xml(&insight.title),
            escape_xml(&url),
            escape_xml(insight.summary.as_deref().unwrap_or("")),
            rfc822(&published(insight)),
            escape_xml(&url),
            categories,
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>HR insights and workplace research from ESHRM</description>
    <language>en</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&config.site_title),
        escape_xml(&format!("{}/insights", base_url)),
        escape_xml(&format!("{}/rss.xml", base_url)),
        insights.first().map(|i| rfc822(&published(i))).unwrap_or_default(),
        items,
    )
}

/// GET /rss.xml
/// Latest published insights
pub async fn rss_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let mut insights = state.store.insights.filtered(&ListFilter::default()).await?;
    insights.sort_by_key(|i| std::cmp::Reverse(published(i)));
    insights.truncate(FEED_LIMIT);

    let xml = render_feed(&state.config, &insights);
    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        xml,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::InsightDraft;
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn draft(slug: &str, published: bool) -> InsightDraft {
        InsightDraft {
            title: format!("Title {}", slug),
            slug: slug.to_string(),
            summary: Some("Pay & benefits <2025>".to_string()),
            content_html: None,
            category: "Compensation".to_string(),
            author: None,
            tags: vec!["payroll".to_string()],
            cover_image: None,
            published,
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<title>"), "&lt;title&gt;");
        assert_eq!(escape_xml("\"quote\""), "&quot;quote&quot;");
    }

    #[test]
    fn test_rfc822_format() {
        use chrono::TimeZone;
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(rfc822(&dt), "Mon, 15 Jan 2024 12:00:00 +0000");
    }

    #[tokio::test]
    async fn test_feed_lists_only_published() {
        let state = AppState::new(Store::memory(), AppConfig::for_tests("uploads".into()));
        state.store.insights.create(draft("live-post", true)).await.unwrap();
        state.store.insights.create(draft("hidden-post", false)).await.unwrap();
        let app = Router::new().route("/rss.xml", get(rss_feed)).with_state(state);

        let res = app
            .oneshot(Request::get("/rss.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains("/insights/live-post"));
        assert!(!xml.contains("hidden-post"));
        assert!(xml.contains("Pay &amp; benefits &lt;2025&gt;"));
    }
}
