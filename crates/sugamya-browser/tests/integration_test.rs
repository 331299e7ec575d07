use sugamya_browser::{
    BrowserError, ChromiumSessionManager, NavigationProfile, PageSession, SessionProvider,
};
use sugamya_core::BrowserConfig;

const PAGE: &str = "data:text/html,<html lang=en><title>t</title><h1>hi</h1></html>";

#[tokio::test]
async fn test_data_url_is_not_a_scan_target() {
    let manager = ChromiumSessionManager::new(BrowserConfig::default());
    let result = manager.acquire(PAGE, NavigationProfile::Single).await;
    assert!(matches!(result, Err(BrowserError::InvalidUrl { .. })));
}

#[tokio::test]
#[ignore = "Requires Chrome browser - run with --ignored"]
async fn test_acquire_evaluate_release() {
    let manager = ChromiumSessionManager::new(BrowserConfig::default());
    let session = manager
        .acquire("https://example.com", NavigationProfile::Single)
        .await
        .expect("acquire session");

    let title = session
        .evaluate("document.title")
        .await
        .expect("evaluate title");
    assert!(title.as_str().is_some());
    assert!(!session.is_lost());

    manager.release(session).await;
}

#[tokio::test]
#[ignore = "Requires Chrome browser - run with --ignored"]
async fn test_pooled_sessions_reuse_browsers() {
    let config = BrowserConfig {
        pool_size: 2,
        ..BrowserConfig::default()
    };
    let manager = ChromiumSessionManager::new(config);
    manager.warm_up().await.expect("warm up pool");

    for _ in 0..4 {
        let session = manager
            .acquire("https://example.com", NavigationProfile::Batch)
            .await
            .expect("acquire pooled session");
        manager.release(session).await;
    }

    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "Requires Chrome browser - run with --ignored"]
async fn test_unresolvable_host_is_navigation_failure() {
    let manager = ChromiumSessionManager::new(BrowserConfig::default());
    let result = manager
        .acquire("https://does-not-exist.invalid", NavigationProfile::Batch)
        .await;
    assert!(matches!(
        result,
        Err(BrowserError::NavigationFailure { .. } | BrowserError::NavigationTimeout { .. })
    ));
}
