//! Console notifier for development.

use crate::error::Result;
use crate::providers::{FamilyInvitationEmail, GroupInvitationEmail, Notifier};
use chrono::Utc;
use tracing::info;

/// Console notifier.
///
/// Logs invitation emails instead of sending them. Useful for local
/// development where the accept link needs to be copied from the terminal.
///
/// # Examples
///
/// ```ignore
/// use carpool_invitations::providers::ConsoleNotifier;
///
/// let service = InvitationService::new(store, ConsoleNotifier::new(), SystemClock, config);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    async fn send_family_invitation(&self, to: &str, data: &FamilyInvitationEmail) -> Result<()> {
        let expires_in_hours = (data.expires_at - Utc::now()).num_hours();

        info!(
            to = %to,
            family = %data.family_name,
            inviter = %data.inviter_name,
            role = %data.role,
            code = %data.invite_code,
            expires_in_hours,
            "📧 Family invitation email (development mode)"
        );
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   FAMILY INVITATION                          ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ To: {to:<57}║");
        println!("║ Family: {:<53}║", data.family_name);
        println!("║ From: {:<55}║", data.inviter_name);
        println!("║ Code: {:<55}║", data.invite_code);
        println!("║ {:<61}║", data.accept_url);
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        Ok(())
    }

    async fn send_group_invitation(&self, to: &str, data: &GroupInvitationEmail) -> Result<()> {
        let expires_in_hours = (data.expires_at - Utc::now()).num_hours();

        info!(
            to = %to,
            group = %data.group_name,
            inviter = %data.inviter_name,
            target_family = data.target_family_name.as_deref().unwrap_or("-"),
            role = %data.role,
            code = %data.invite_code,
            expires_in_hours,
            "📧 Group invitation email (development mode)"
        );
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   CARPOOL GROUP INVITATION                   ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ To: {to:<57}║");
        println!("║ Group: {:<54}║", data.group_name);
        println!("║ From: {:<55}║", data.inviter_name);
        println!("║ Code: {:<55}║", data.invite_code);
        println!("║ {:<61}║", data.accept_url);
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpool_core::FamilyRole;

    #[tokio::test]
    async fn console_notifier_always_succeeds() {
        let notifier = ConsoleNotifier::new();
        let data = FamilyInvitationEmail {
            family_name: "The Okafors".to_string(),
            inviter_name: "Ada".to_string(),
            invite_code: "ABCD2345".to_string(),
            role: FamilyRole::Member,
            personal_message: None,
            expires_at: Utc::now() + chrono::Duration::days(7),
            accept_url: "http://localhost:3000/invitations/ABCD2345".to_string(),
        };
        assert!(notifier.send_family_invitation("kid@example.com", &data).await.is_ok());
    }
}
