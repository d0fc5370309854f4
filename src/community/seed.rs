//! Placeholder members, posts, prayer requests, and events.
//!
//! Every workspace starts from this data; nothing here survives a restart.

use chrono::{Duration, Utc};

use super::events::Event;
use super::feed::{Post, PrayerRequest};
use super::profile::Profile;

fn member(
    id: &str,
    name: &str,
    email: &str,
    ministry: Option<&str>,
    interests: &[&str],
) -> Profile {
    let mut profile = Profile::new(id, name);
    profile.email = Some(email.to_string());
    profile.ministry = ministry.map(ToString::to_string);
    profile.interests = interests.iter().map(ToString::to_string).collect();
    profile
}

pub(crate) fn members() -> Vec<Profile> {
    vec![
        member(
            "member-1",
            "Grace Adeyemi",
            "grace@kadda.church",
            Some("Worship"),
            &["Choir", "Bible Study"],
        ),
        member(
            "member-2",
            "Samuel Mensah",
            "samuel@kadda.church",
            Some("Deacons"),
            &["Outreach", "Football"],
        ),
        member(
            "member-3",
            "Ruth Okafor",
            "ruth@kadda.church",
            Some("Children"),
            &["Teaching", "Baking"],
        ),
        member(
            "member-4",
            "Daniel Kadda",
            "daniel@kadda.church",
            None,
            &["Media", "Photography"],
        ),
    ]
}

pub(crate) fn posts(members: &[Profile]) -> Vec<Post> {
    let now = Utc::now();
    let mut posts = Vec::new();
    if let [grace, samuel, ruth, ..] = members {
        let mut welcome = Post::new(
            grace.summary(),
            "So grateful for this morning's worship. See everyone at choir practice Thursday!",
            None,
        );
        welcome.likes = 12;
        welcome.created_at = now - Duration::hours(2);

        let mut outreach = Post::new(
            samuel.summary(),
            "Outreach team served 80 meals downtown on Saturday. Thank you volunteers!",
            Some("https://placehold.co/600x400.png".to_string()),
        );
        outreach.likes = 25;
        outreach.created_at = now - Duration::days(1);

        let mut kids = Post::new(
            ruth.summary(),
            "Children's church is looking for two more helpers this month.",
            None,
        );
        kids.likes = 4;
        kids.created_at = now - Duration::days(3);

        posts.extend([welcome, outreach, kids]);
    }
    posts
}

pub(crate) fn prayers(members: &[Profile]) -> Vec<PrayerRequest> {
    let mut prayers = Vec::new();
    if let [_, samuel, ruth, ..] = members {
        let mut healing = PrayerRequest::new(
            ruth.summary(),
            "Healing for my father",
            "He has surgery on Tuesday. Praying for the doctors and a quick recovery.",
            false,
        );
        healing.prayer_count = 18;

        let mut work = PrayerRequest::new(
            samuel.summary(),
            "Guidance at work",
            "Facing a difficult decision this week.",
            true,
        );
        work.prayer_count = 6;

        prayers.extend([healing, work]);
    }
    prayers
}

pub(crate) fn events() -> Vec<Event> {
    let now = Utc::now();
    vec![
        Event {
            id: "event-1".to_string(),
            title: "Sunday Worship Service".to_string(),
            description: "Weekly worship with the whole congregation.".to_string(),
            starts_at: now + Duration::days(3),
            location: "Main Sanctuary".to_string(),
            attendees: 150,
            attending_by_me: false,
        },
        Event {
            id: "event-2".to_string(),
            title: "Youth Game Night".to_string(),
            description: "Games, snacks, and a short devotional.".to_string(),
            starts_at: now + Duration::days(1),
            location: "Fellowship Hall".to_string(),
            attendees: 32,
            attending_by_me: false,
        },
        Event {
            id: "event-3".to_string(),
            title: "Community Cleanup".to_string(),
            description: "Neighbourhood park cleanup with the outreach team.".to_string(),
            starts_at: now - Duration::days(5),
            location: "Riverside Park".to_string(),
            attendees: 20,
            attending_by_me: false,
        },
    ]
}
