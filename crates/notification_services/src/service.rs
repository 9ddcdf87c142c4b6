use crate::types::*;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ses::Client as SesClient;

/// Subject line of every availability email.
pub const EMAIL_SUBJECT: &str = "Vaccination slots are available";

/// Preamble placed ahead of the availability report in the email body.
pub const EMAIL_PREAMBLE: &str = "Vaccination slots are available at the following centers:\n\n";

/// A channel that can deliver an availability report.
///
/// Implementations own their transport details, including any body-size limits.
/// The scan engine treats `body` as opaque text.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `body` to the configured recipient.
    async fn send_message(&self, body: &str) -> Result<(), NotificationError>;
}

/// Email notifier backed by AWS SES.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    ses_client: SesClient,
    from_email: String,
    to_email: String,
}

impl EmailNotifier {
    /// Creates an email notifier with AWS clients initialized from the environment.
    ///
    /// `from_email` defaults to the recipient, so a user can notify themselves
    /// from their own verified SES identity.
    pub async fn new(to_email: &str, from_email: Option<&str>) -> Result<Self, NotificationError> {
        validate_email(to_email)?;
        let from_email = from_email.unwrap_or(to_email);
        validate_email(from_email)?;

        let config = aws_config::defaults(BehaviorVersion::latest())
            .load()
            .await;
        let ses_client = SesClient::new(&config);

        log::info!("📧 Email notifier ready, reports go to {}", to_email);

        Ok(Self {
            ses_client,
            from_email: from_email.to_string(),
            to_email: to_email.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_message(&self, body: &str) -> Result<(), NotificationError> {
        let text_body = compose_email_body(body);

        let subject_content = aws_sdk_ses::types::Content::builder()
            .data(EMAIL_SUBJECT)
            .build()
            .map_err(|e| NotificationError::SesError(format!("Failed to build subject: {}", e)))?;

        let text_content = aws_sdk_ses::types::Content::builder()
            .data(text_body)
            .build()
            .map_err(|e| {
                NotificationError::SesError(format!("Failed to build text body: {}", e))
            })?;

        let body = aws_sdk_ses::types::Body::builder()
            .text(text_content)
            .build();

        let message = aws_sdk_ses::types::Message::builder()
            .subject(subject_content)
            .body(body)
            .build();

        let destination = aws_sdk_ses::types::Destination::builder()
            .to_addresses(&self.to_email)
            .build();

        log::debug!("📧 Sending availability report via AWS SES...");

        let result = self
            .ses_client
            .send_email()
            .source(&self.from_email)
            .destination(destination)
            .message(message)
            .send()
            .await;

        match result {
            Ok(output) => {
                log::info!(
                    "✅ Availability report emailed to {} (SES message ID {})",
                    self.to_email,
                    output.message_id()
                );
                Ok(())
            }
            Err(e) => {
                let error_msg = if let Some(service_error) = e.as_service_error() {
                    format!("AWS SES service error: {:?}", service_error)
                } else {
                    format!("AWS SES error: {}", e)
                };
                Err(NotificationError::SesError(error_msg))
            }
        }
    }
}

/// Builds the plain-text email body for a report.
pub fn compose_email_body(report: &str) -> String {
    format!("{}{}", EMAIL_PREAMBLE, report)
}

fn validate_email(address: &str) -> Result<(), NotificationError> {
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(NotificationError::InvalidEmail),
    }
}
