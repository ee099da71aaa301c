use crate::model::challenge::{Challenge, ChallengeDraft, Difficulty};
use crate::model::ids::ChallengeId;

const AUDIO_BASE: &str = "https://belong-dev-public2.s3.us-east-1.amazonaws.com/misc";

/// The built-in challenge catalog shipped with the app, all at zero progress.
#[must_use]
pub fn default_catalog() -> Vec<Challenge> {
    [
        (
            "challenge-1",
            "All Night",
            "Camo & Krooked",
            "Camo-Krooked-All-Night.mp3",
            "Listen to this drum & bass classic to earn points",
            Difficulty::Easy,
            219,
            150,
        ),
        (
            "challenge-2",
            "New Forms",
            "Roni Size",
            "New-Forms-Roni+Size.mp3",
            "Complete this legendary track for bonus points",
            Difficulty::Medium,
            464,
            300,
        ),
        (
            "challenge-3",
            "Bonus Challenge",
            "Camo & Krooked",
            "Camo-Krooked-All-Night.mp3",
            "Listen again for extra points - test repeat functionality",
            Difficulty::Hard,
            219,
            250,
        ),
    ]
    .into_iter()
    .filter_map(
        |(id, title, artist, file, description, difficulty, duration_secs, points)| {
            ChallengeDraft {
                id: ChallengeId::new(id).ok()?,
                title: title.to_owned(),
                artist: artist.to_owned(),
                audio_url: format!("{AUDIO_BASE}/{file}"),
                description: description.to_owned(),
                difficulty,
                duration_secs,
                points,
            }
            .validate()
            .ok()
        },
    )
    .collect()
}
