use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const MIN_DURATION_MINUTES: u8 = 1;
pub const MAX_DURATION_MINUTES: u8 = 10;

pub const GENRES: &[&str] = &[
    "Folk",
    "Baul",
    "Rabindra Sangeet",
    "Nazrul Geeti",
    "Bhatiali",
    "Adhunik",
    "Bangla Rock",
    "Pop",
    "Sufi",
    "Film",
];

pub const MOODS: &[&str] = &[
    "Joyful",
    "Romantic",
    "Melancholic",
    "Devotional",
    "Nostalgic",
    "Energetic",
    "Peaceful",
    "Rebellious",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Tempo {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Tempo {
    pub const ALL: [Tempo; 3] = [Tempo::Slow, Tempo::Medium, Tempo::Fast];

    /// Bilingual label handed to the generation prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Slow => "ধীর (Slow)",
            Self::Medium => "মাঝারি (Medium)",
            Self::Fast => "দ্রুত (Fast)",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Slow => "ধীর",
            Self::Medium => "মাঝারি",
            Self::Fast => "দ্রুত",
        }
    }
}

/// Prebuilt voice profiles offered by the speech endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Voice {
    #[default]
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
    Aoede,
}

impl Voice {
    pub const ALL: [Voice; 6] =
        [Voice::Kore, Voice::Puck, Voice::Charon, Voice::Fenrir, Voice::Zephyr, Voice::Aoede];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kore => "Kore",
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Fenrir => "Fenrir",
            Self::Zephyr => "Zephyr",
            Self::Aoede => "Aoede",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Voice::ALL
            .iter()
            .copied()
            .find(|voice| voice.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown voice '{trimmed}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    /// Base64 payload, standard alphabet.
    pub data: String,
    pub mime_type: String,
    pub file_name: String,
    /// Where the payload was read from; previews replay this file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRequest {
    pub genre: String,
    pub mood: String,
    pub tempo: Tempo,
    pub style_notes: String,
    pub target_duration: u8,
    pub custom_lyrics: Option<String>,
    pub voice: Option<Voice>,
    pub audio_sample: Option<AudioSample>,
}

impl SongRequest {
    pub fn uses_custom_lyrics(&self) -> bool {
        self.custom_lyrics.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongSection {
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: String,
    pub lyrics: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Arrangement {
    pub instruments: String,
    pub beat_pattern: String,
    pub bpm: String,
    pub vocal_style: String,
    pub energy_progression: String,
}

impl Arrangement {
    /// Localized label and value for every field, in display order.
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("বাদ্যযন্ত্রসমূহ", self.instruments.as_str()),
            ("তালের ধরন", self.beat_pattern.as_str()),
            ("বিপিএম (BPM)", self.bpm.as_str()),
            ("গায়কীর ধরন", self.vocal_style.as_str()),
            ("শক্তির ক্রমবিকাশ", self.energy_progression.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedSong {
    pub title: String,
    pub sections: Vec<SongSection>,
    pub arrangement: Arrangement,
}

impl GeneratedSong {
    pub fn section_vocal_text(&self, index: usize) -> Option<String> {
        self.sections.get(index).map(|section| format!("{}\n{}", section.kind, section.lyrics))
    }

    /// Every section's label and lyrics in song order, sent as one synthesis request.
    pub fn full_vocal_text(&self) -> String {
        self.sections
            .iter()
            .map(|section| format!("{}\n{}", section.kind, section.lyrics))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn set_lyrics(&mut self, index: usize, lyrics: String) -> bool {
        match self.sections.get_mut(index) {
            Some(section) => {
                section.lyrics = lyrics;
                true
            }
            None => false,
        }
    }
}
