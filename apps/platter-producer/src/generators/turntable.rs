//! Mock IoT turntable play events

use bytes::Bytes;
use chrono::{Duration, SecondsFormat, Utc};
use platter_domain::ports::RecordSource;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::warn;

const FIRST_NAMES: &[&str] = &[
    "John", "Paul", "George", "Ringo", "Aretha", "Nina", "Miles", "Joni", "Carole", "Marvin",
];
const LAST_NAMES: &[&str] = &[
    "Lennon", "McCartney", "Harrison", "Starr", "Franklin", "Simone", "Davis", "Mitchell",
    "King", "Gaye",
];
const ALBUMS: &[&str] = &[
    "Abbey Road", "Blue", "Tapestry", "Kind of Blue", "What's Going On", "Lady Soul",
];
const SONGS: &[&str] = &[
    "Come Together", "A Case of You", "So Far Away", "So What", "Mercy Mercy Me", "Chain of Fools",
];
const SPEAKERS: &[&str] = &["headphones", "bookshelf", "floorstanding", "soundbar", "bluetooth"];
const WIFI_NAMES: &[&str] = &["home", "studio", "loft", "garage", "den"];
const WIFI_SPEEDS: &[&str] = &["25mbps", "100mbps", "300mbps", "1gbps"];

/// One play event reported by a turntable
#[derive(Debug, Clone, Serialize)]
pub struct TurntableEvent {
    #[serde(rename = "turntableId")]
    pub turntable_id: String,
    pub artist: String,
    pub album: String,
    pub song: String,
    pub play_timestamp: String,
    pub rpm: u32,
    pub volume: u32,
    pub speaker: String,
    pub owner: String,
    pub email: String,
    pub zip_code: String,
    pub wifi_name: String,
    pub wifi_speed: String,
}

fn pick<R: Rng>(rng: &mut R, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

impl TurntableEvent {
    /// Build a random event
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let first = pick(rng, FIRST_NAMES);
        let last = pick(rng, LAST_NAMES);
        let played_at = Utc::now() - Duration::seconds(rng.random_range(0..86_400));

        Self {
            turntable_id: uuid::Builder::from_random_bytes(rng.random())
                .into_uuid()
                .to_string(),
            artist: format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
            album: pick(rng, ALBUMS),
            song: pick(rng, SONGS),
            play_timestamp: played_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            rpm: rng.random_range(33..=45),
            volume: rng.random_range(0..=100),
            speaker: pick(rng, SPEAKERS),
            email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
            owner: format!("{} {}", first, last),
            zip_code: format!("{:05}", rng.random_range(501..99_951)),
            wifi_name: pick(rng, WIFI_NAMES),
            wifi_speed: pick(rng, WIFI_SPEEDS),
        }
    }
}

/// Yields `count` JSON-encoded turntable events
pub struct TurntableEventSource {
    remaining: u64,
    rng: StdRng,
}

impl TurntableEventSource {
    pub fn new(count: u64) -> Self {
        Self {
            remaining: count,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic source for reproducible runs
    pub fn with_seed(count: u64, seed: u64) -> Self {
        Self {
            remaining: count,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RecordSource for TurntableEventSource {
    fn next_payload(&mut self) -> Option<Bytes> {
        while self.remaining > 0 {
            self.remaining -= 1;
            let event = TurntableEvent::random(&mut self.rng);
            match serde_json::to_vec(&event) {
                Ok(json) => return Some(Bytes::from(json)),
                Err(err) => warn!(error = %err, "Skipping event that failed to encode"),
            }
        }
        None
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.remaining)
    }
}
