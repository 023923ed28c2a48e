// src/domain/status.rs
//
// Status state machines for quotes and invoices.
//
// Quote:   draft --send--> sent --accept--> accepted
//                               --refuse--> refused
//          draft/sent read as expired once valid_until has passed (lazy,
//          computed at read time, never written back by a background job).
// Invoice: draft --send--> sent --mark_paid--> paid (terminal)
use chrono::{DateTime, Utc};
use std::fmt;

/// A transition was requested from a status that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub entity: &'static str,
    pub action: &'static str,
    pub current: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot {} a {} in status '{}'",
            self.action, self.entity, self.current
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Refused,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Refused => "refused",
            QuoteStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(QuoteStatus::Draft),
            "sent" => Some(QuoteStatus::Sent),
            "accepted" => Some(QuoteStatus::Accepted),
            "refused" => Some(QuoteStatus::Refused),
            "expired" => Some(QuoteStatus::Expired),
            _ => None,
        }
    }

    /// The status callers see: a draft or sent quote whose validity date has
    /// passed reads as expired.
    pub fn effective(self, valid_until: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match self {
            QuoteStatus::Draft | QuoteStatus::Sent if valid_until < now => QuoteStatus::Expired,
            other => other,
        }
    }

    pub fn apply(self, event: QuoteEvent) -> Result<QuoteStatus, InvalidTransition> {
        match (self, event) {
            (QuoteStatus::Draft, QuoteEvent::Send) => Ok(QuoteStatus::Sent),
            (QuoteStatus::Sent, QuoteEvent::Accept) => Ok(QuoteStatus::Accepted),
            (QuoteStatus::Sent, QuoteEvent::Refuse) => Ok(QuoteStatus::Refused),
            (current, event) => Err(InvalidTransition {
                entity: "quote",
                action: event.as_str(),
                current: current.as_str(),
            }),
        }
    }
}

/// A quote could not be converted to an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    NotAccepted { current: &'static str },
    AlreadyConverted,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::NotAccepted { current } => write!(
                f,
                "Only accepted quotes can be converted to an invoice (current status '{current}')"
            ),
            ConversionError::AlreadyConverted => {
                write!(f, "Quote has already been converted to an invoice")
            }
        }
    }
}

/// A quote converts exactly once, and only after acceptance.
pub fn check_convertible(
    status: QuoteStatus,
    linked_invoice_id: Option<i64>,
) -> Result<(), ConversionError> {
    if status != QuoteStatus::Accepted {
        return Err(ConversionError::NotAccepted { current: status.as_str() });
    }
    if linked_invoice_id.is_some() {
        return Err(ConversionError::AlreadyConverted);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteEvent {
    Send,
    Accept,
    Refuse,
}

impl QuoteEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteEvent::Send => "send",
            QuoteEvent::Accept => "accept",
            QuoteEvent::Refuse => "refuse",
        }
    }

    /// Maps a requested target status to the event that reaches it. Draft and
    /// expired are never valid targets: draft is the initial status and
    /// expiry is derived from valid_until.
    pub fn for_target(target: QuoteStatus) -> Option<Self> {
        match target {
            QuoteStatus::Sent => Some(QuoteEvent::Send),
            QuoteStatus::Accepted => Some(QuoteEvent::Accept),
            QuoteStatus::Refused => Some(QuoteEvent::Refuse),
            QuoteStatus::Draft | QuoteStatus::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }

    pub fn apply(self, event: InvoiceEvent) -> Result<InvoiceStatus, InvalidTransition> {
        match (self, event) {
            (InvoiceStatus::Draft, InvoiceEvent::Send) => Ok(InvoiceStatus::Sent),
            (InvoiceStatus::Sent, InvoiceEvent::MarkPaid) => Ok(InvoiceStatus::Paid),
            (current, event) => Err(InvalidTransition {
                entity: "invoice",
                action: event.as_str(),
                current: current.as_str(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceEvent {
    Send,
    MarkPaid,
}

impl InvoiceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceEvent::Send => "send",
            InvoiceEvent::MarkPaid => "mark paid",
        }
    }

    pub fn for_target(target: InvoiceStatus) -> Option<Self> {
        match target {
            InvoiceStatus::Sent => Some(InvoiceEvent::Send),
            InvoiceStatus::Paid => Some(InvoiceEvent::MarkPaid),
            InvoiceStatus::Draft => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn quote_happy_path() {
        let status = QuoteStatus::Draft;
        let status = status.apply(QuoteEvent::Send).unwrap();
        assert_eq!(status, QuoteStatus::Sent);
        assert_eq!(status.apply(QuoteEvent::Accept).unwrap(), QuoteStatus::Accepted);
        assert_eq!(status.apply(QuoteEvent::Refuse).unwrap(), QuoteStatus::Refused);
    }

    #[test]
    fn quote_rejects_invalid_transitions() {
        assert!(QuoteStatus::Draft.apply(QuoteEvent::Accept).is_err());
        assert!(QuoteStatus::Draft.apply(QuoteEvent::Refuse).is_err());
        assert!(QuoteStatus::Accepted.apply(QuoteEvent::Send).is_err());
        assert!(QuoteStatus::Accepted.apply(QuoteEvent::Refuse).is_err());
        assert!(QuoteStatus::Refused.apply(QuoteEvent::Accept).is_err());
        assert!(QuoteStatus::Expired.apply(QuoteEvent::Send).is_err());
        assert!(QuoteStatus::Expired.apply(QuoteEvent::Accept).is_err());
    }

    #[test]
    fn invalid_transition_message_names_current_status() {
        let err = QuoteStatus::Draft.apply(QuoteEvent::Accept).unwrap_err();
        assert_eq!(err.to_string(), "Cannot accept a quote in status 'draft'");
    }

    #[test]
    fn expiry_is_lazy_and_only_hits_open_statuses() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        let future = now + Duration::days(1);

        assert_eq!(QuoteStatus::Draft.effective(past, now), QuoteStatus::Expired);
        assert_eq!(QuoteStatus::Sent.effective(past, now), QuoteStatus::Expired);
        assert_eq!(QuoteStatus::Sent.effective(future, now), QuoteStatus::Sent);
        // Accepted/refused quotes never expire retroactively.
        assert_eq!(QuoteStatus::Accepted.effective(past, now), QuoteStatus::Accepted);
        assert_eq!(QuoteStatus::Refused.effective(past, now), QuoteStatus::Refused);
    }

    #[test]
    fn expired_quote_cannot_be_accepted() {
        let now = Utc::now();
        let effective = QuoteStatus::Sent.effective(now - Duration::hours(1), now);
        assert!(effective.apply(QuoteEvent::Accept).is_err());
    }

    #[test]
    fn racing_transitions_cannot_both_land() {
        // Two callers both read 'sent'; whichever lands second re-runs the
        // machine from the winner's status and must fail.
        let start = QuoteStatus::Sent;
        let winner = start.apply(QuoteEvent::Accept).unwrap();
        assert!(winner.apply(QuoteEvent::Refuse).is_err());

        let winner = start.apply(QuoteEvent::Refuse).unwrap();
        assert!(winner.apply(QuoteEvent::Accept).is_err());
    }

    #[test]
    fn only_accepted_unlinked_quotes_convert() {
        assert_eq!(check_convertible(QuoteStatus::Accepted, None), Ok(()));

        assert_eq!(
            check_convertible(QuoteStatus::Sent, None),
            Err(ConversionError::NotAccepted { current: "sent" })
        );
        assert!(check_convertible(QuoteStatus::Draft, None).is_err());
        assert!(check_convertible(QuoteStatus::Refused, None).is_err());
        assert!(check_convertible(QuoteStatus::Expired, None).is_err());
    }

    #[test]
    fn converted_quote_cannot_convert_again() {
        assert_eq!(
            check_convertible(QuoteStatus::Accepted, Some(42)),
            Err(ConversionError::AlreadyConverted)
        );
    }

    #[test]
    fn conversion_error_messages() {
        let err = check_convertible(QuoteStatus::Sent, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only accepted quotes can be converted to an invoice (current status 'sent')"
        );
        let err = check_convertible(QuoteStatus::Accepted, Some(1)).unwrap_err();
        assert_eq!(err.to_string(), "Quote has already been converted to an invoice");
    }

    #[test]
    fn draft_and_expired_are_not_valid_targets() {
        assert!(QuoteEvent::for_target(QuoteStatus::Draft).is_none());
        assert!(QuoteEvent::for_target(QuoteStatus::Expired).is_none());
        assert_eq!(QuoteEvent::for_target(QuoteStatus::Refused), Some(QuoteEvent::Refuse));
    }

    #[test]
    fn invoice_happy_path_and_terminal_paid() {
        let status = InvoiceStatus::Draft.apply(InvoiceEvent::Send).unwrap();
        let status = status.apply(InvoiceEvent::MarkPaid).unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
        // No reversal and no re-pay.
        assert!(status.apply(InvoiceEvent::Send).is_err());
        assert!(status.apply(InvoiceEvent::MarkPaid).is_err());
    }

    #[test]
    fn invoice_cannot_be_paid_from_draft() {
        assert!(InvoiceStatus::Draft.apply(InvoiceEvent::MarkPaid).is_err());
    }
}
