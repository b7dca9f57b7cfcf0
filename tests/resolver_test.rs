//! Identifier resolution through the full fallback chain, against scripted replies.

mod common;

use common::{Reply, ScriptedTransport};
use lensloader::extractor::IdentifierResolver;
use lensloader::utils::{DownloaderSettings, LensError, ResolutionHint};
use proptest::prelude::*;
use std::sync::Arc;

const LESSON_URL: &str =
    "https://www.zhihu.com/xen/market/training/training-video/1973778517616523009/1973778517947865002";
const SECTION: &str = "1973778517947865002";

fn lesson_api(index: usize) -> String {
    DownloaderSettings::default().lesson_endpoints[index].replace("{section_id}", SECTION)
}

fn resolver(transport: &Arc<ScriptedTransport>) -> IdentifierResolver {
    IdentifierResolver::new(transport.clone(), &DownloaderSettings::default()).expect("resolver")
}

#[test]
fn strategies_run_in_fixed_order() {
    let transport = ScriptedTransport::new().shared();
    assert_eq!(
        resolver(&transport).strategy_ids(),
        vec!["direct", "single-video-path", "lesson-api", "page-scrape"]
    );
}

proptest! {
    #[test]
    fn direct_identifiers_resolve_without_network(
        id in prop_oneof!["[0-9]{1,25}", "[A-Za-z0-9_-]{31,80}"]
    ) {
        let transport = ScriptedTransport::new().shared();
        let resolved = futures::executor::block_on(resolver(&transport).resolve(&id)).unwrap();
        prop_assert_eq!(resolved.identifier.as_str(), id.as_str());
        prop_assert_eq!(resolved.source, "direct");
        prop_assert!(transport.calls().is_empty());
    }
}

#[tokio::test]
async fn zvideo_url_resolves_without_network() {
    let transport = ScriptedTransport::new().shared();
    let resolved = resolver(&transport)
        .resolve("https://www.zhihu.com/zvideo/1416432113451483136?utm_source=share")
        .await
        .unwrap();

    assert_eq!(resolved.identifier.as_str(), "1416432113451483136");
    assert_eq!(resolved.title, None);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn lesson_probes_run_in_order_until_a_video_resource() {
    let transport = ScriptedTransport::new()
        .reply(&lesson_api(0), Reply::Status(500, "oops".to_string()))
        .reply(
            &lesson_api(1),
            Reply::ok(r#"{"resource":{"type":"article","data":{"id":"not-a-video"}}}"#),
        )
        .reply(
            &lesson_api(2),
            Reply::ok(
                r#"{"title":"第三节 实战","resource":{"type":"video","data":{"id":"4zbweJq7bVyP6FeOy6FMVyqjFQ4ooFeo46bRe","duration":123000}}}"#,
            ),
        )
        .shared();

    let resolved = resolver(&transport).resolve(LESSON_URL).await.unwrap();

    assert_eq!(resolved.identifier.as_str(), "4zbweJq7bVyP6FeOy6FMVyqjFQ4ooFeo46bRe");
    assert_eq!(resolved.title.as_deref(), Some("第三节 实战"));
    assert_eq!(resolved.duration_ms, Some(123000));
    assert_eq!(resolved.source, "lesson-api");
    assert_eq!(transport.calls(), vec![lesson_api(0), lesson_api(1), lesson_api(2)]);
}

#[tokio::test]
async fn failed_lesson_probes_fall_through_to_page_scrape() {
    let page = r#"<script>{"title":"Lesson 7","resource":{"type":"video","data":{"id":"Zq8xKJ3vP0wYb6nR2sLt9mHcE4"}}}</script>"#;
    let transport = ScriptedTransport::new()
        .reply(&lesson_api(0), Reply::Unreachable("dns failure".to_string()))
        .reply(&lesson_api(1), Reply::ok("not json"))
        .reply(LESSON_URL, Reply::ok(page))
        .shared();

    let resolved = resolver(&transport).resolve(LESSON_URL).await.unwrap();

    assert_eq!(resolved.identifier.as_str(), "Zq8xKJ3vP0wYb6nR2sLt9mHcE4");
    assert_eq!(resolved.title.as_deref(), Some("Lesson 7"));
    assert_eq!(resolved.source, "page-scrape");
    assert_eq!(transport.calls().last().map(String::as_str), Some(LESSON_URL));
    assert_eq!(transport.calls().len(), 4);
}

#[tokio::test]
async fn page_fetch_failure_is_reported_as_such() {
    let url = "https://www.zhihu.com/question/1/answer/2";
    let transport = ScriptedTransport::new()
        .reply(url, Reply::Unreachable("connection refused".to_string()))
        .shared();

    let err = resolver(&transport).resolve(url).await.unwrap_err();
    match err {
        LensError::IdentifierNotFound { reference, hint } => {
            assert_eq!(reference, url);
            assert!(matches!(hint, ResolutionHint::PageFetchFailed(reason) if reason.contains("connection refused")));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn page_http_error_is_a_fetch_failure() {
    let url = "https://www.zhihu.com/question/1/answer/3";
    let transport = ScriptedTransport::new()
        .reply(url, Reply::Status(502, String::new()))
        .shared();

    let err = resolver(&transport).resolve(url).await.unwrap_err();
    assert!(matches!(
        err,
        LensError::IdentifierNotFound { hint: ResolutionHint::PageFetchFailed(_), .. }
    ));
}

#[tokio::test]
async fn page_without_tokens_reports_no_pattern() {
    let url = "https://www.zhihu.com/question/1/answer/4";
    let transport = ScriptedTransport::new()
        .reply(url, Reply::ok(r#"<html>{"video_id":"123"} {"title":"decoy"}</html>"#))
        .shared();

    let err = resolver(&transport).resolve(url).await.unwrap_err();
    assert!(matches!(
        err,
        LensError::IdentifierNotFound { hint: ResolutionHint::NoPatternMatched, .. }
    ));
}

#[tokio::test]
async fn unrecognized_plain_text_fails_without_network() {
    let transport = ScriptedTransport::new().shared();
    let err = resolver(&transport).resolve("not a video").await.unwrap_err();

    assert!(matches!(
        err,
        LensError::IdentifierNotFound { hint: ResolutionHint::NoPatternMatched, .. }
    ));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn custom_page_rules_replace_defaults() {
    let url = "https://www.zhihu.com/pin/9";
    let mut settings = DownloaderSettings::default();
    settings.page_rules = vec![lensloader::extractor::ExtractionRule {
        name: "player-attr".to_string(),
        pattern: r#"data-player-id='([A-Za-z0-9]+)'"#.to_string(),
        min_len: 12,
        with_title: false,
    }];
    let transport = ScriptedTransport::new()
        .reply(
            url,
            Reply::ok(r#"<div data-player-id='abc123def456' data-x='1'>{"title":"ignored"}</div>"#),
        )
        .shared();

    let resolver = IdentifierResolver::new(transport.clone(), &settings).unwrap();
    let resolved = resolver.resolve(url).await.unwrap();

    assert_eq!(resolved.identifier.as_str(), "abc123def456");
    assert_eq!(resolved.title, None);
}
