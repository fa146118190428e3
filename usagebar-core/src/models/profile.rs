//! Account and organization metadata.

use serde::{Deserialize, Serialize};

/// Profile returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// The signed-in account.
    #[serde(default)]
    pub account: Option<Account>,
    /// The organization the account bills against.
    #[serde(default)]
    pub organization: Option<Organization>,
}

impl ProfileSnapshot {
    /// Returns the best available name for the signed-in user.
    pub fn display_name(&self) -> Option<&str> {
        let account = self.account.as_ref()?;
        account
            .display_name
            .as_deref()
            .or(account.full_name.as_deref())
            .or(account.email.as_deref())
    }
}

/// Account details.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Account UUID.
    #[serde(default)]
    pub uuid: Option<String>,
    /// Full legal name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Preferred display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Account email.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the account has a Max subscription.
    #[serde(default, rename = "has_claude_max")]
    pub has_max_plan: Option<bool>,
    /// Whether the account has a Pro subscription.
    #[serde(default, rename = "has_claude_pro")]
    pub has_pro_plan: Option<bool>,
}

impl Account {
    /// Human-readable plan name. Max wins when both flags are set.
    pub fn plan_label(&self) -> &'static str {
        if self.has_max_plan == Some(true) {
            "Max"
        } else if self.has_pro_plan == Some(true) {
            "Pro"
        } else {
            "Free"
        }
    }
}

/// Organization details.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Organization {
    /// Organization UUID.
    #[serde(default)]
    pub uuid: Option<String>,
    /// Organization name.
    #[serde(default)]
    pub name: Option<String>,
    /// Organization type (e.g. `claude_max`).
    #[serde(default, rename = "organization_type")]
    pub org_type: Option<String>,
    /// Rate limit tier (e.g. `default_claude_max_20x`).
    #[serde(default)]
    pub rate_limit_tier: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_label() {
        let mut account = Account::default();
        assert_eq!(account.plan_label(), "Free");

        account.has_pro_plan = Some(true);
        assert_eq!(account.plan_label(), "Pro");

        account.has_max_plan = Some(true);
        assert_eq!(account.plan_label(), "Max");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut profile = ProfileSnapshot::default();
        assert_eq!(profile.display_name(), None);

        profile.account = Some(Account {
            email: Some("user@example.com".to_string()),
            ..Default::default()
        });
        assert_eq!(profile.display_name(), Some("user@example.com"));

        if let Some(account) = profile.account.as_mut() {
            account.display_name = Some("Ada".to_string());
        }
        assert_eq!(profile.display_name(), Some("Ada"));
    }
}
