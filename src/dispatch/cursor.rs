use crate::recipient::Recipient;

/// Picks the recipient to present next: the first pending one in creation
/// order, or the first recipient when nothing is left to send.
///
/// Everything needed to resume is in the stored statuses, so no separate
/// position is ever persisted.
pub fn resolve_cursor(recipients: &[Recipient]) -> usize {
    recipients
        .iter()
        .position(|recipient| recipient.is_pending())
        .unwrap_or(0)
}
