use serde::{Deserialize, Serialize};

use crate::recipient::Recipient;

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Progress {
    pub sent_count: u32,
    pub total_count: u32,
    pub percent_complete: f64,
}

impl Progress {
    pub fn of(recipients: &[Recipient]) -> Progress {
        let sent_count = recipients.iter().filter(|r| r.is_sent()).count() as u32;
        Progress::from_counts(sent_count, recipients.len() as u32)
    }

    pub fn from_counts(sent_count: u32, total_count: u32) -> Progress {
        let percent_complete = if total_count == 0 {
            0.0
        } else {
            f64::from(sent_count) / f64::from(total_count) * 100.0
        };

        Progress {
            sent_count,
            total_count,
            percent_complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.sent_count == self.total_count
    }
}
