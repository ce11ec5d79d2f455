use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::engine::{DeliveryError, DeliverySink};
use crate::types::Release;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest release body forwarded, in characters.
const MAX_BODY_CHARS: usize = 3000;

const ATTACHMENT_COLOR: &str = "#2eb886";

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct Payload {
    text: String,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    color: &'static str,
    title: String,
    title_link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<String>,
    ts: i64,
}

impl Payload {
    pub(crate) fn for_release(release: &Release) -> Self {
        let label = if release.prerelease {
            "New pre-release"
        } else {
            "New release"
        };
        Self {
            text: format!(
                "{label} of <{}|{}>: *{}*",
                release.repo.html_url(),
                release.repo,
                release.tag
            ),
            attachments: vec![Attachment {
                color: ATTACHMENT_COLOR,
                title: release.title().to_owned(),
                title_link: release.url.clone(),
                text: truncate_chars(release.body.trim(), MAX_BODY_CHARS),
                footer: release.author.as_ref().map(|login| format!("released by {login}")),
                ts: release.published_at.timestamp(),
            }],
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Posts release notifications to a Slack incoming webhook.
///
/// Built without a hook it stays usable but every delivery fails with
/// [`DeliveryError::NotConfigured`].
pub struct SlackSink {
    hook: Option<String>,
    http: Client,
}

impl SlackSink {
    pub fn new(hook: Option<String>) -> Result<Self, DeliveryError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { hook, http })
    }

    pub fn is_configured(&self) -> bool {
        self.hook.is_some()
    }
}

impl DeliverySink for SlackSink {
    async fn deliver(&self, release: &Release) -> Result<(), DeliveryError> {
        let Some(hook) = self.hook.as_deref() else {
            return Err(DeliveryError::NotConfigured);
        };

        let response = self
            .http
            .post(hook)
            .json(&Payload::for_release(release))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
