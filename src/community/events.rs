//! Church events and RSVPs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub attendees: u32,
    pub attending_by_me: bool,
}

impl Event {
    /// Flip `attending_by_me` and move `attendees` with it.
    pub fn toggle_rsvp(&mut self) {
        if self.attending_by_me {
            self.attendees = self.attendees.saturating_sub(1);
        } else {
            self.attendees = self.attendees.saturating_add(1);
        }
        self.attending_by_me = !self.attending_by_me;
    }
}
