//! SMTP notifier implementation using Lettre.

use crate::error::{InvitationError, Result};
use crate::providers::{FamilyInvitationEmail, GroupInvitationEmail, Notifier};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP notifier using Lettre.
///
/// Sends real invitation emails via SMTP, suitable for production use.
///
/// # Configuration
///
/// - `smtp_server`: SMTP server address (e.g., "smtp.gmail.com")
/// - `smtp_port`: SMTP server port (usually 587 for TLS, 465 for SSL)
/// - `smtp_username` / `smtp_password`: SMTP credentials
/// - `from_email` / `from_name`: Sender address and display name
///
/// # Examples
///
/// ```ignore
/// use carpool_invitations::providers::SmtpNotifier;
///
/// let notifier = SmtpNotifier::new(
///     "smtp.example.com".to_string(),
///     587,
///     "mailer".to_string(),
///     "app_password".to_string(),
///     "noreply@carpool.example".to_string(),
///     "Carpool".to_string(),
/// );
/// ```
#[derive(Clone)]
pub struct SmtpNotifier {
    /// SMTP server address.
    smtp_server: String,

    /// SMTP server port.
    smtp_port: u16,

    /// SMTP credentials.
    credentials: Credentials,

    /// Sender email address.
    from_email: String,

    /// Sender display name.
    from_name: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier.
    #[must_use]
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: String,
        from_name: String,
    ) -> Self {
        Self {
            smtp_server,
            smtp_port,
            credentials: Credentials::new(smtp_username, smtp_password),
            from_email,
            from_name,
        }
    }

    /// Build SMTP transport for sending emails.
    ///
    /// A new transport per email avoids holding pooled connections between
    /// the rare invitation sends.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| InvitationError::infrastructure(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    /// Build the "From" header.
    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    fn build_message(&self, to: &str, subject: &str, html_body: String) -> Result<Message> {
        Message::builder()
            .from(self.from_header().parse().map_err(|e| {
                InvitationError::infrastructure(format!("Invalid from address: {e}"))
            })?)
            .to(to
                .parse()
                .map_err(|e| InvitationError::infrastructure(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| InvitationError::infrastructure(format!("Failed to build email: {e}")))
    }

    async fn send(&self, email: Message) -> Result<()> {
        let mailer = self.build_transport()?;

        // Lettre's SMTP transport is blocking
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| InvitationError::infrastructure(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| InvitationError::infrastructure(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}

fn message_block(message: Option<&str>) -> String {
    message.map_or_else(String::new, |m| {
        format!(
            r#"<blockquote style="border-left: 3px solid #2563eb; padding-left: 12px; color: #555;">{}</blockquote>"#,
            escape_html(m)
        )
    })
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn family_invitation_html(data: &FamilyInvitationEmail) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>You're invited to join {family}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">{inviter} invited you to join {family}</h2>
        {message}
        <p>Your invitation code is <strong>{code}</strong>. It expires on {expires}.</p>
        <p style="margin: 30px 0;">
            <a href="{url}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                Join family
            </a>
        </p>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Or copy and paste this link into your browser:<br>
            {url}
        </p>
    </div>
</body>
</html>
"#,
        family = escape_html(&data.family_name),
        inviter = escape_html(&data.inviter_name),
        message = message_block(data.personal_message.as_deref()),
        code = data.invite_code,
        expires = data.expires_at.format("%B %-d, %Y"),
        url = data.accept_url,
    )
}

fn group_invitation_html(data: &GroupInvitationEmail) -> String {
    let addressee = data
        .target_family_name
        .as_deref()
        .map_or_else(|| "Your family".to_string(), escape_html);
    format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Carpool invitation: {group}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">{addressee} is invited to the carpool group {group}</h2>
        <p>{inviter} would like your family to join. A family administrator can accept.</p>
        {message}
        <p>Your invitation code is <strong>{code}</strong>. It expires on {expires}.</p>
        <p style="margin: 30px 0;">
            <a href="{url}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                View invitation
            </a>
        </p>
    </div>
</body>
</html>
"#,
        group = escape_html(&data.group_name),
        inviter = escape_html(&data.inviter_name),
        message = message_block(data.personal_message.as_deref()),
        code = data.invite_code,
        expires = data.expires_at.format("%B %-d, %Y"),
        url = data.accept_url,
    )
}

impl Notifier for SmtpNotifier {
    async fn send_family_invitation(&self, to: &str, data: &FamilyInvitationEmail) -> Result<()> {
        let subject = format!("{} invited you to join {}", data.inviter_name, data.family_name);
        let email = self.build_message(to, &subject, family_invitation_html(data))?;
        self.send(email).await
    }

    async fn send_group_invitation(&self, to: &str, data: &GroupInvitationEmail) -> Result<()> {
        let subject = format!("Carpool invitation: {}", data.group_name);
        let email = self.build_message(to, &subject, group_invitation_html(data))?;
        self.send(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpool_core::{FamilyRole, GroupRole};
    use chrono::{Duration, Utc};

    fn notifier() -> SmtpNotifier {
        SmtpNotifier::new(
            "smtp.example.com".to_string(),
            587,
            "user".to_string(),
            "secret".to_string(),
            "noreply@carpool.example".to_string(),
            "Carpool".to_string(),
        )
    }

    #[test]
    fn builds_message_for_valid_addresses() {
        let result = notifier().build_message("parent@example.com", "Hi", "<p>x</p>".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_invalid_recipient() {
        let err = notifier()
            .build_message("not an address", "Hi", String::new())
            .err();
        assert!(matches!(err, Some(InvitationError::Infrastructure(_))));
    }

    #[test]
    fn personal_message_is_escaped() {
        let data = FamilyInvitationEmail {
            family_name: "Smiths".to_string(),
            inviter_name: "Pat".to_string(),
            invite_code: "ABCD2345".to_string(),
            role: FamilyRole::Member,
            personal_message: Some("<script>alert(1)</script>".to_string()),
            expires_at: Utc::now() + Duration::days(7),
            accept_url: "https://carpool.example/invitations/ABCD2345".to_string(),
        };
        let html = family_invitation_html(&data);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn group_email_names_target_family() {
        let data = GroupInvitationEmail {
            group_name: "Elm Street Run".to_string(),
            inviter_name: "Sam".to_string(),
            target_family_name: Some("The Nguyens".to_string()),
            invite_code: "WXYZ6789".to_string(),
            role: GroupRole::Member,
            personal_message: None,
            expires_at: Utc::now() + Duration::days(7),
            accept_url: "https://carpool.example/invitations/WXYZ6789".to_string(),
        };
        let html = group_invitation_html(&data);
        assert!(html.contains("The Nguyens is invited"));
        assert!(html.contains("WXYZ6789"));
    }
}
