//! Domain primitives shared by the permission matrix, audit log and registry.
//!
//! Entity kinds and actions are closed enums so permission keys and
//! public ID prefixes cannot drift apart between modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A business entity guarded by the permission matrix.
///
/// # Examples
///
/// ```rust
/// use eduflow::domain::EntityKind;
///
/// assert_eq!(EntityKind::Course.as_str(), "course");
/// assert_eq!(EntityKind::Invoice.public_id_prefix(), "INV");
/// assert_eq!("salary".parse::<EntityKind>(), Ok(EntityKind::Salary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Course,
    Class,
    Student,
    Professor,
    Invoice,
    Salary,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Course,
        Self::Class,
        Self::Student,
        Self::Professor,
        Self::Invoice,
        Self::Salary,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Class => "class",
            Self::Student => "student",
            Self::Professor => "professor",
            Self::Invoice => "invoice",
            Self::Salary => "salary",
        }
    }

    /// Prefix of the human-readable public ID, e.g. `C` in `C-12`.
    #[must_use]
    pub const fn public_id_prefix(&self) -> &'static str {
        match self {
            Self::Course => "C",
            Self::Class => "CL",
            Self::Student => "S",
            Self::Professor => "P",
            Self::Invoice => "INV",
            Self::Salary => "SAL",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    pub const ALL: [Self; 3] = [Self::Create, Self::Update, Self::Delete];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission matrix key, rendered as `entity.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub entity: EntityKind,
    pub action: ActionKind,
}

impl ActionKey {
    #[must_use]
    pub const fn new(entity: EntityKind, action: ActionKind) -> Self {
        Self { entity, action }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.action)
    }
}

impl FromStr for ActionKey {
    type Err = ();

    /// Accepts only known `entity.action` pairs such as `course.delete`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entity, action) = s.split_once('.').ok_or(())?;
        Ok(Self::new(entity.parse()?, action.parse()?))
    }
}

/// Settlement state of an invoice or a salary statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Due,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub const ALL: [Self; 3] = [Self::Due, Self::Partial, Self::Paid];

    /// Statuses whose paid amount counts as settled money in reports.
    pub const SETTLED: [Self; 2] = [Self::Partial, Self::Paid];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "due",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

/// Approval state of an admin account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    Active,
    Pending,
    Rejected,
}

impl AdminStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
        }
    }

    /// Unknown values are treated as active, matching rows created before
    /// registration requests existed.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "rejected" => Self::Rejected,
            _ => Self::Active,
        }
    }
}

/// Splits a public ID such as `INV-12` into its prefix and sequence number.
#[must_use]
pub fn parse_public_id(public_id: &str) -> Option<(&str, i64)> {
    let (prefix, number) = public_id.rsplit_once('-')?;
    if prefix.is_empty() {
        return None;
    }
    number.parse().ok().map(|n| (prefix, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_key_renders_entity_dot_action() {
        let key = ActionKey::new(EntityKind::Class, ActionKind::Delete);
        assert_eq!(key.to_string(), "class.delete");
    }

    #[test]
    fn entity_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(kind));
        }
        assert!("janitor".parse::<EntityKind>().is_err());
    }

    #[test]
    fn action_keys_parse_only_known_pairs() {
        assert_eq!(
            "course.delete".parse::<ActionKey>(),
            Ok(ActionKey::new(EntityKind::Course, ActionKind::Delete))
        );
        assert!("course.nuke".parse::<ActionKey>().is_err());
        assert!("foo.bar".parse::<ActionKey>().is_err());
        assert!("course".parse::<ActionKey>().is_err());
        assert!("course.delete.now".parse::<ActionKey>().is_err());
    }

    #[test]
    fn payment_status_parsing() {
        assert_eq!("partial".parse::<PaymentStatus>(), Ok(PaymentStatus::Partial));
        assert_eq!(" PAID ".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn prefixes_are_distinct() {
        let mut prefixes: Vec<_> = EntityKind::ALL
            .iter()
            .map(EntityKind::public_id_prefix)
            .collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), EntityKind::ALL.len());
    }

    #[test]
    fn public_id_parsing() {
        assert_eq!(parse_public_id("CL-7"), Some(("CL", 7)));
        assert_eq!(parse_public_id("C-x"), None);
        assert_eq!(parse_public_id("-3"), None);
        assert_eq!(parse_public_id("C12"), None);
    }

    #[test]
    fn admin_status_parsing() {
        assert_eq!(AdminStatus::parse("pending"), AdminStatus::Pending);
        assert_eq!(AdminStatus::parse("rejected"), AdminStatus::Rejected);
        assert_eq!(AdminStatus::parse("active"), AdminStatus::Active);
        assert_eq!(AdminStatus::parse(""), AdminStatus::Active);
    }
}
