//! Delivery notification: emails a post summary once its images are rendered.
//!
//! The pipeline carries an `Option<Arc<dyn Notifier>>`; `SmtpNotifier` is built only when
//! SMTP credentials are configured.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::SmtpSettings;
use crate::content::models::StructuredContent;
use crate::layout::controller::RenderedImage;
use crate::layout::filler::escape_xml;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

/// Proof of a sent notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyReceipt {
    pub recipient: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        content: &StructuredContent,
        images: &[RenderedImage],
    ) -> Result<NotifyReceipt, NotifyError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Message body
// ────────────────────────────────────────────────────────────────────────────

pub fn subject_line(content: &StructuredContent) -> String {
    format!("New carousel post ready: {}", content.headline())
}

/// HTML summary: headline, caption, hooks, image keys and sources.
pub fn summary_html(content: &StructuredContent, images: &[RenderedImage]) -> String {
    let mut html = String::from("<html><body>");
    html.push_str(&format!("<h2>{}</h2>", escape_xml(&content.headline())));
    if !content.cover.hashtag.is_empty() {
        html.push_str(&format!("<p>#{}</p>", escape_xml(&content.cover.hashtag)));
    }

    html.push_str("<h3>Caption</h3>");
    html.push_str(&format!("<p>{}</p>", escape_xml(&content.caption)));

    let hooks = &content.engagement_hooks;
    if !hooks.question_for_comments.is_empty() || !hooks.sharing_incentive.is_empty() {
        html.push_str("<h3>Engagement</h3><ul>");
        for hook in [&hooks.question_for_comments, &hooks.sharing_incentive] {
            if !hook.is_empty() {
                html.push_str(&format!("<li>{}</li>", escape_xml(hook)));
            }
        }
        html.push_str("</ul>");
    }

    html.push_str(&format!("<h3>Images ({})</h3><ol>", images.len()));
    for image in images {
        html.push_str(&format!(
            "<li>{}: {}</li>",
            image.template,
            escape_xml(&image.key)
        ));
    }
    html.push_str("</ol>");

    if !content.sources.is_empty() {
        html.push_str("<h3>Sources</h3><ul>");
        for source in &content.sources {
            html.push_str(&format!("<li>{}</li>", escape_xml(source)));
        }
        html.push_str("</ul>");
    }

    html.push_str("</body></html>");
    html
}

// ────────────────────────────────────────────────────────────────────────────
// SmtpNotifier
// ────────────────────────────────────────────────────────────────────────────

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_mailbox: Mailbox,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let from_mailbox = parse_mailbox(&settings.user)?;

        // 465 is implicit TLS; anything else upgrades with STARTTLS.
        let builder = if settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| NotifyError::Transport(format!("failed to create SMTP relay: {e}")))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .pool_config(PoolConfig::new().max_size(4))
            .timeout(Some(Duration::from_secs(30)))
            .build();

        info!(host = %settings.host, port = settings.port, "SMTP notifier initialized");
        Ok(Self {
            transport,
            from_mailbox,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(
        &self,
        recipient: &str,
        content: &StructuredContent,
        images: &[RenderedImage],
    ) -> Result<NotifyReceipt, NotifyError> {
        let subject = subject_line(content);
        let message = Message::builder()
            .from(self.from_mailbox.clone())
            .to(parse_mailbox(recipient)?)
            .subject(subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(summary_html(content, images))
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!(recipient, images = images.len(), "Notification email sent");
                Ok(NotifyReceipt {
                    recipient: recipient.to_string(),
                    subject,
                    sent_at: Utc::now(),
                })
            }
            Err(e) => {
                error!(recipient, "Failed to send notification email: {e}");
                Err(NotifyError::Transport(e.to_string()))
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::templates::TemplateId;
    use crate::test_support::sample_content;
    use std::collections::BTreeMap;

    fn image(template: TemplateId) -> RenderedImage {
        RenderedImage {
            template,
            key: format!("ns/{template}.png"),
            width: 1080,
            height: 1080,
            format: "png",
            attempts: 1,
            attempt_log: vec![],
            fields: BTreeMap::new(),
            font_sizes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_summary_lists_images_and_hooks() {
        let content = sample_content(2);
        let html = summary_html(
            &content,
            &[image(TemplateId::Cover), image(TemplateId::ContentPage(1))],
        );
        assert!(html.contains("<h3>Images (2)</h3>"));
        assert!(html.contains("cover: ns/cover.png"));
        assert!(html.contains("content_01: ns/content_01.png"));
        assert!(html.contains(&content.engagement_hooks.question_for_comments));
    }

    #[test]
    fn test_summary_escapes_markup() {
        let mut content = sample_content(1);
        content.caption = "<script>alert(1)</script>".to_string();
        let html = summary_html(&content, &[]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_subject_uses_headline() {
        let content = sample_content(1);
        assert_eq!(
            subject_line(&content),
            format!("New carousel post ready: {}", content.headline())
        );
    }

    #[test]
    fn test_parse_mailbox_rejects_garbage() {
        assert!(parse_mailbox("editor@example.org").is_ok());
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(NotifyError::InvalidAddress { .. })
        ));
    }
}
