use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::error::CdpError;
use futures::{Stream, StreamExt};
use sugamya_core::BrowserConfig;
use tokio::task::JoinHandle;

/// Protocol messages that mean the target or its connection is gone.
///
/// The automation layer reports these only as text, so this list is the
/// single place they are recognised.
const SESSION_LOSS_MARKERS: [&str; 5] = [
    "Target closed",
    "target closed",
    "Session with given id not found",
    "No target with given id",
    "detached",
];

/// A launched browser together with its CDP event loop.
pub(crate) struct LaunchedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl LaunchedBrowser {
    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Whether the browser still answers protocol requests.
    pub(crate) async fn is_healthy(&self) -> bool {
        !self.handler.is_finished() && self.browser.version().await.is_ok()
    }

    /// Close the browser and stop its event loop. Errors are logged, not returned.
    pub(crate) async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed (already gone?): {}", e);
        }
        self.handler.abort();
    }
}

/// Launch a browser according to `config`.
pub(crate) async fn launch(config: &BrowserConfig) -> Result<LaunchedBrowser> {
    let mut builder = ChromeConfig::builder()
        .no_sandbox()
        .window_size(config.window_width, config.window_height)
        .args(config.args.clone());

    if !config.headless {
        builder = builder.with_head();
    }
    if let Some(executable) = &config.executable {
        builder = builder.chrome_executable(executable);
    }

    let chrome_config = builder.build().map_err(BrowserError::LaunchFailure)?;

    let (browser, mut handler) = Browser::launch(chrome_config)
        .await
        .map_err(|e| BrowserError::LaunchFailure(e.to_string()))?;

    // Spawn browser handler; it ends when the connection drops
    let handler = tokio::spawn(async move {
        let skipped = drive_events(&mut handler).await;
        tracing::debug!(skipped, "Browser event loop ended");
    });

    tracing::debug!("Browser launched");
    Ok(LaunchedBrowser { browser, handler })
}

/// Poll the CDP event stream until it ends, returning how many errors were
/// skipped. Errors for single messages do not stop the loop.
async fn drive_events<S, E>(events: &mut S) -> usize
where
    S: Stream<Item = std::result::Result<(), E>> + Unpin,
    E: std::fmt::Display,
{
    let mut skipped = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            skipped += 1;
            tracing::debug!("CDP handler error: {}", e);
        }
    }
    skipped
}

/// Map a CDP error onto the typed taxonomy.
///
/// Connection-level failures and detached targets become `SessionLost`;
/// everything else is an evaluation failure for the caller to reinterpret.
pub(crate) fn classify_cdp_error(err: &CdpError) -> BrowserError {
    match err {
        CdpError::Ws(_)
        | CdpError::ChannelSendError(_)
        | CdpError::NoResponse
        | CdpError::FrameNotFound(_) => BrowserError::SessionLost(err.to_string()),
        other => {
            let message = other.to_string();
            if SESSION_LOSS_MARKERS.iter().any(|m| message.contains(m)) {
                BrowserError::SessionLost(message)
            } else {
                BrowserError::Evaluation(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_loop_survives_message_errors() {
        let mut events = futures::stream::iter(vec![
            Ok(()),
            Err("data did not match any variant of untagged enum Message"),
            Ok(()),
            Err("unknown event"),
            Ok(()),
        ]);
        assert_eq!(drive_events(&mut events).await, 2);
        assert!(events.next().await.is_none());
    }

    #[test]
    fn test_no_response_is_session_loss() {
        assert!(classify_cdp_error(&CdpError::NoResponse).is_session_lost());
    }

    #[test]
    fn test_target_closed_message_is_session_loss() {
        let err = CdpError::ChromeMessage("Protocol error: Target closed".to_string());
        assert!(classify_cdp_error(&err).is_session_lost());
    }

    #[test]
    fn test_other_errors_are_evaluation_failures() {
        let err = CdpError::ChromeMessage("Cannot find context with specified id".to_string());
        assert!(matches!(
            classify_cdp_error(&err),
            BrowserError::Evaluation(_)
        ));
    }
}
