use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder,
    WebPushClient as _, WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use crate::config::WebPushConfig;

/// Delivery failure, split so callers can tell "endpoint is dead, drop it"
/// apart from transient errors that should keep the subscription around.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("subscription endpoint gone")]
    Gone,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The endpoint triple a browser hands out on `pushManager.subscribe()`.
#[derive(Debug, Clone)]
pub struct SubscriptionKeys {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[async_trait]
pub trait PushClient: Send + Sync {
    async fn deliver(&self, sub: &SubscriptionKeys, payload: &[u8]) -> Result<(), PushError>;
}

/// VAPID-authenticated Web Push sender.
pub struct WebPushSender {
    client: IsahcWebPushClient,
    private_key: String,
    subject: String,
}

impl WebPushSender {
    pub fn new(config: &WebPushConfig) -> anyhow::Result<Self> {
        let client = IsahcWebPushClient::new().map_err(|e| anyhow::anyhow!(e))?;
        Ok(Self {
            client,
            private_key: config.private_key.clone(),
            subject: config.subject.clone(),
        })
    }
}

#[async_trait]
impl PushClient for WebPushSender {
    async fn deliver(&self, sub: &SubscriptionKeys, payload: &[u8]) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(&sub.endpoint, &sub.p256dh, &sub.auth);

        let mut sig_builder =
            VapidSignatureBuilder::from_base64(&self.private_key, URL_SAFE_NO_PAD, &info)
                .map_err(|e| anyhow::anyhow!(e))?;
        sig_builder.add_claim("sub", self.subject.clone());
        let signature = sig_builder.build().map_err(|e| anyhow::anyhow!(e))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(|e| anyhow::anyhow!(e))?;

        match self.client.send(message).await {
            Ok(()) => {
                debug!(endpoint = %sub.endpoint, "push delivered");
                Ok(())
            }
            // 410 Gone / 404 Not Found: the push service no longer knows this endpoint.
            Err(WebPushError::EndpointNotValid | WebPushError::EndpointNotFound) => {
                Err(PushError::Gone)
            }
            Err(e) => Err(PushError::Other(anyhow::anyhow!(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebPushConfig;

    fn sender(private_key: &str) -> WebPushSender {
        WebPushSender::new(&WebPushConfig {
            public_key: "unused".into(),
            private_key: private_key.into(),
            subject: "mailto:test@example.com".into(),
            send_secret: None,
        })
        .expect("client construction")
    }

    // Signature building happens before any network I/O, so a broken VAPID
    // key surfaces as a transient error without touching a push service.
    #[tokio::test]
    async fn bad_vapid_key_is_a_transient_error_not_a_dead_endpoint() {
        let sub = SubscriptionKeys {
            endpoint: "https://push.example.com/wpush/abc".into(),
            p256dh: "p256dh-key".into(),
            auth: "auth-secret".into(),
        };
        let err = sender("<definitely not base64url>")
            .deliver(&sub, b"{}")
            .await
            .expect_err("signature building must fail");
        assert!(matches!(err, PushError::Other(_)));
    }
}
