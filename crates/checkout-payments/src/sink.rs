//! Order & Lead Sinks
//!
//! Rows are posted to Google Apps Script web hooks that append to a sheet.
//! Delivery is best-effort: failures are logged and never reach the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::{PaymentError, Result};

/// Somewhere to send order/lead JSON
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Deliver one payload
    async fn submit(&self, payload: &serde_json::Value) -> Result<()>;

    /// Sink name for logs
    fn name(&self) -> &str;
}

/// Google Sheets script endpoint
pub struct SheetsSink {
    client: reqwest::Client,
    url: String,
}

impl SheetsSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Read the script URL from `var`; `None` when unset or blank
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LeadSink for SheetsSink {
    async fn submit(&self, payload: &serde_json::Value) -> Result<()> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Sink(format!(
                "sheets script answered {status}"
            )));
        }

        tracing::debug!(url = %self.url, "Row delivered to sheet");
        Ok(())
    }

    fn name(&self) -> &str {
        "google-sheets"
    }
}

/// Discards everything (sink not configured)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl LeadSink for NullSink {
    async fn submit(&self, _payload: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Send `payload` on a detached task. The caller is never blocked and
/// never sees the outcome; the handle is only useful to tests.
///
/// Returns `None` without spawning when `payload` does not serialize.
pub fn notify_detached<T: Serialize>(
    sink: Arc<dyn LeadSink>,
    payload: &T,
) -> Option<JoinHandle<()>> {
    let payload = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(sink = sink.name(), error = %e, "Could not serialize sink payload");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        if let Err(e) = sink.submit(&payload).await {
            tracing::warn!(
                sink = sink.name(),
                error = %e,
                retryable = e.is_retryable(),
                "Failed to forward payload; dropping it"
            );
        }
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Keeps everything it receives
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) received: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl LeadSink for RecordingSink {
        async fn submit(&self, payload: &serde_json::Value) -> Result<()> {
            self.received.lock().await.push(payload.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LeadSink for FailingSink {
        async fn submit(&self, _payload: &serde_json::Value) -> Result<()> {
            Err(PaymentError::Sink("sheet is full".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_notify_detached_delivers() {
        let sink = Arc::new(RecordingSink::default());
        let handle = notify_detached(sink.clone(), &serde_json::json!({"name": "Emma Wilson"}));
        handle.unwrap().await.unwrap();

        let received = sink.received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["name"], "Emma Wilson");
    }

    #[tokio::test]
    async fn test_notify_detached_swallows_failures() {
        let handle = notify_detached(Arc::new(FailingSink), &serde_json::json!({"x": 1}));
        assert!(handle.unwrap().await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_detached_skips_unserializable_payload() {
        use std::collections::HashMap;

        let sink = Arc::new(RecordingSink::default());
        let payload: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);

        assert!(notify_detached(sink.clone(), &payload).is_none());
        assert!(sink.received.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_null_sink() {
        assert!(NullSink.submit(&serde_json::json!({})).await.is_ok());
    }

    #[test]
    fn test_sheets_sink_from_env_ignores_blank() {
        assert!(SheetsSink::from_env("CHECKOUT_TEST_SURELY_UNSET_SHEETS_URL").is_none());
        let sink = SheetsSink::new("https://script.google.com/macros/s/abc/exec");
        assert_eq!(sink.url(), "https://script.google.com/macros/s/abc/exec");
    }
}
