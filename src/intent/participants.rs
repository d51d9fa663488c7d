//! Participant extraction from `From` / `To` headers.

use std::sync::OnceLock;

use mailparse::MailAddr;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::threading::ThreadNode;

/// Fallback pattern for `Display Name <addr>` when the RFC parser gives up
static NAMED_ADDRESS_REGEX: OnceLock<Regex> = OnceLock::new();

fn named_address_regex() -> &'static Regex {
    NAMED_ADDRESS_REGEX.get_or_init(|| {
        Regex::new(r#"^\s*"?([^"<]*?)"?\s*<([^>]*)>"#).expect("Invalid named address regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantRole {
    /// Sent a message in the thread
    Requester,
    /// Was addressed by a message in the thread
    Collaborator,
}

/// A person involved in a thread, identified by lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: Option<String>,
    pub email: String,
    pub role: ParticipantRole,
}

/// Parse one address, either `Display Name <addr>` or a bare address.
pub fn parse_participant(raw: &str, role: ParticipantRole) -> Option<Participant> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (name, email) = parse_with_mailparse(raw).unwrap_or_else(|| parse_by_hand(raw));
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return None;
    }

    let name = name
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Some(Participant { name, email, role })
}

fn parse_with_mailparse(raw: &str) -> Option<(Option<String>, String)> {
    let parsed = mailparse::addrparse(raw).ok()?;
    parsed.iter().find_map(|addr| match addr {
        MailAddr::Single(info) => Some((info.display_name.clone(), info.addr.clone())),
        MailAddr::Group(group) => group
            .addrs
            .first()
            .map(|info| (info.display_name.clone(), info.addr.clone())),
    })
}

fn parse_by_hand(raw: &str) -> (Option<String>, String) {
    match named_address_regex().captures(raw) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_string()),
            caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        ),
        None => (None, raw.to_string()),
    }
}

/// Every unique participant across a thread, in first-seen order.
///
/// Each message contributes its sender as requester and every comma separated
/// `To` entry as collaborator. The first role seen for an address sticks.
pub fn collect_participants(node: &ThreadNode) -> Vec<Participant> {
    let mut participants: Vec<Participant> = Vec::new();

    for member in node.iter() {
        let sender = parse_participant(&member.message.from, ParticipantRole::Requester);
        let recipients = member
            .message
            .to
            .split(',')
            .filter_map(|entry| parse_participant(entry, ParticipantRole::Collaborator));

        for participant in sender.into_iter().chain(recipients) {
            if !participants.iter().any(|p| p.email == participant.email) {
                participants.push(participant);
            }
        }
    }

    participants
}
