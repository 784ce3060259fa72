//! Shared data types for the Gambit chat command dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Display name reported by the chat network for identities it could not resolve.
pub const PLACEHOLDER_USER_NAME: &str = "Unknown";

/// Outgoing payload prefix that asks the transport to attach a local file.
pub const IMAGE_DIRECTIVE: &str = "/image";

/// Error returned when a persisted or user-supplied value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid title '{0}'")]
    Title(String),
}

/// Ordered permission level gating command execution.
///
/// `Unrestricted` dominates every `Level`; it is held by bootstrap admins and
/// required by admin-only built-in commands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Level(u32),
    Unrestricted,
}

impl Privilege {
    pub const ZERO: Privilege = Privilege::Level(0);

    /// Returns true when this privilege satisfies `required`.
    pub fn allows(self, required: Privilege) -> bool {
        self >= required
    }

    /// Returns true when this privilege is strictly higher than `other`.
    pub fn dominates(self, other: Privilege) -> bool {
        self > other
    }
}

impl Default for Privilege {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u32> for Privilege {
    fn from(level: u32) -> Self {
        Self::Level(level)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(level) => write!(f, "{level}"),
            Self::Unrestricted => f.write_str("unrestricted"),
        }
    }
}

/// Rank label derived from karma standing within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Title {
    Lord,
    King,
}

impl Title {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lord => "Lord",
            Self::King => "King",
        }
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Title {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "Lord" => Ok(Self::Lord),
            "King" => Ok(Self::King),
            other => Err(ParseError::Title(other.to_string())),
        }
    }
}

/// Conversation-scoped user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub conversation_id: String,
    pub full_name: String,
    pub nickname: Option<String>,
    pub title: Option<Title>,
    pub privilege: u32,
}

impl UserRecord {
    pub fn new(
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
            full_name: full_name.into(),
            nickname: None,
            title: None,
            privilege: 0,
        }
    }

    /// Nickname when one is assigned, otherwise the full name.
    pub fn display_nickname(&self) -> &str {
        self.nickname.as_deref().unwrap_or(self.full_name.as_str())
    }
}

/// Karma score attached to a target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaEntry {
    pub target: String,
    pub karma: i64,
}

/// Name-substitution rule applied before karma and quote lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub old: String,
    pub new: String,
}

/// Outstanding karma loan keyed by the ordered (lender, borrower) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtRecord {
    pub lender: String,
    pub borrower: String,
    pub amount: i64,
}

/// Outcome of one spot: how much paid down the reverse debt and how much
/// became a new loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpotSettlement {
    pub repaid: i64,
    pub lent: i64,
    /// What the lender still owes the borrower after repayment.
    pub still_owed: i64,
    /// What the borrower owes the lender after the new loan.
    pub receivable: i64,
}

impl SpotSettlement {
    /// Splits `amount` against the existing debts in both directions.
    pub fn compute(amount: i64, owed_to_borrower: i64, owed_by_borrower: i64) -> Self {
        let repaid = amount.min(owed_to_borrower.max(0));
        let lent = amount - repaid;
        Self {
            repaid,
            lent,
            still_owed: owed_to_borrower - repaid,
            receivable: owed_by_borrower + lent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub quote: String,
    pub said_by: String,
    pub said_at: DateTime<Utc>,
}

/// Stored execution threshold for a registry-governed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPrivilegeRecord {
    pub name: String,
    pub privilege: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JokeRecord {
    pub kind: String,
    pub joke: String,
}

/// Author of an inbound chat message as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: String,
    pub full_name: String,
    #[serde(default)]
    pub is_self: bool,
}

impl Sender {
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: full_name.into(),
            is_self: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.full_name == PLACEHOLDER_USER_NAME
    }
}

/// One chat message delivered to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub conversation_id: String,
    pub sender: Sender,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        conversation_id: impl Into<String>,
        sender: Sender,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            sender,
            text: text.into(),
        }
    }
}

/// Reply action produced by a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Text(String),
    Image(PathBuf),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(path: impl AsRef<Path>) -> Self {
        Self::Image(path.as_ref().to_path_buf())
    }

    /// Renders the reply as a transport payload; images use the `/image <path>` directive.
    pub fn to_payload(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Image(path) => format!("{IMAGE_DIRECTIVE} {}", path.display()),
        }
    }

    /// Interprets an outgoing payload, honoring the image directive when it carries
    /// exactly one path argument.
    pub fn from_payload(payload: &str) -> Self {
        let mut parts = payload.split(' ');
        if parts.next() == Some(IMAGE_DIRECTIVE) {
            if let (Some(path), None) = (parts.next(), parts.next()) {
                if !path.is_empty() {
                    return Self::Image(PathBuf::from(path));
                }
            }
        }
        Self::Text(payload.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_unrestricted_dominates_every_level() {
        assert!(Privilege::Unrestricted.dominates(Privilege::Level(u32::MAX)));
        assert!(Privilege::Level(5).allows(Privilege::Level(5)));
        assert!(!Privilege::Level(4).allows(Privilege::Level(5)));
        assert!(!Privilege::Level(u32::MAX).allows(Privilege::Unrestricted));
        assert!(Privilege::Level(10) > Privilege::ZERO);
    }

    #[test]
    fn unit_privilege_displays_level_or_unrestricted() {
        assert_eq!(Privilege::Level(12).to_string(), "12");
        assert_eq!(Privilege::Unrestricted.to_string(), "unrestricted");
    }

    #[test]
    fn unit_spot_settlement_repays_before_lending() {
        assert_eq!(
            SpotSettlement::compute(4, 10, 0),
            SpotSettlement {
                repaid: 4,
                lent: 0,
                still_owed: 6,
                receivable: 0,
            }
        );
        assert_eq!(
            SpotSettlement::compute(8, 6, 2),
            SpotSettlement {
                repaid: 6,
                lent: 2,
                still_owed: 0,
                receivable: 4,
            }
        );
        assert_eq!(SpotSettlement::compute(3, -1, 0).lent, 3);
    }

    #[test]
    fn unit_title_round_trips_through_text() {
        assert_eq!("King".parse::<Title>(), Ok(Title::King));
        assert_eq!(Title::Lord.to_string(), "Lord");
        assert!("Duke".parse::<Title>().is_err());
    }

    #[test]
    fn unit_reply_payload_honors_image_directive() {
        assert_eq!(
            Reply::from_payload("/image /tmp/wat.jpg"),
            Reply::Image(PathBuf::from("/tmp/wat.jpg"))
        );
        assert_eq!(
            Reply::from_payload("/image two words"),
            Reply::Text("/image two words".to_string())
        );
        assert_eq!(
            Reply::image("/tmp/grails.png").to_payload(),
            "/image /tmp/grails.png"
        );
    }

    #[test]
    fn unit_reply_serializes_with_kind_tag() {
        let encoded = serde_json::to_string(&Reply::text("hi")).expect("encode");
        assert_eq!(encoded, r#"{"kind":"text","value":"hi"}"#);
    }

    #[test]
    fn unit_display_nickname_falls_back_to_full_name() {
        let mut user = UserRecord::new("u-1", "c-1", "Brad Johns");
        assert_eq!(user.display_nickname(), "Brad Johns");
        user.nickname = Some("brad".to_string());
        assert_eq!(user.display_nickname(), "brad");
    }
}
