use crate::{
    error::ValidationError,
    types::{
        AudioSample, SongRequest, Tempo, Voice, GENRES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
        MOODS,
    },
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use std::{fs, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Genre,
    Mood,
    Tempo,
    Duration,
    StyleNotes,
    SamplePath,
    LyricsMode,
    CustomLyrics,
    Voice,
}

impl FormField {
    pub const ORDER: [FormField; 9] = [
        FormField::Genre,
        FormField::Mood,
        FormField::Tempo,
        FormField::Duration,
        FormField::StyleNotes,
        FormField::SamplePath,
        FormField::LyricsMode,
        FormField::CustomLyrics,
        FormField::Voice,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Genre => "সংগীতের ধারা",
            Self::Mood => "আবেগ / মুড",
            Self::Tempo => "লয় / টেম্পো",
            Self::Duration => "সময়কাল (মিনিট)",
            Self::StyleNotes => "অতিরিক্ত নোট",
            Self::SamplePath => "অডিও নমুনা (ঐচ্ছিক)",
            Self::LyricsMode => "নিজস্ব লিরিক্স",
            Self::CustomLyrics => "গানের কথা",
            Self::Voice => "কণ্ঠস্বর",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::StyleNotes | Self::SamplePath | Self::CustomLyrics)
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    genre_index: usize,
    mood_index: usize,
    pub tempo: Tempo,
    target_duration: u8,
    pub style_notes: String,
    pub sample_path: String,
    audio_sample: Option<AudioSample>,
    pub custom_lyrics_mode: bool,
    pub custom_lyrics: String,
    pub voice: Voice,
    focus: FormField,
}

impl FormState {
    pub fn new(default_duration: u8, default_voice: Voice) -> Self {
        let target_duration = default_duration.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
        Self {
            genre_index: 0,
            mood_index: 0,
            tempo: Tempo::Medium,
            target_duration,
            style_notes: String::new(),
            sample_path: String::new(),
            audio_sample: None,
            custom_lyrics_mode: false,
            custom_lyrics: String::new(),
            voice: default_voice,
            focus: FormField::Genre,
        }
    }

    pub fn genre(&self) -> &'static str {
        GENRES[self.genre_index % GENRES.len()]
    }

    pub fn mood(&self) -> &'static str {
        MOODS[self.mood_index % MOODS.len()]
    }

    pub fn target_duration(&self) -> u8 {
        self.target_duration
    }

    pub fn audio_sample(&self) -> Option<&AudioSample> {
        self.audio_sample.as_ref()
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = self.step_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.step_focus(FormField::ORDER.len() - 1);
    }

    fn step_focus(&self, offset: usize) -> FormField {
        let len = FormField::ORDER.len();
        let mut idx = FormField::ORDER.iter().position(|f| *f == self.focus).unwrap_or(0);
        loop {
            idx = (idx + offset) % len;
            let candidate = FormField::ORDER[idx];
            // Lyrics editor only takes focus while custom-lyrics mode is on.
            if candidate != FormField::CustomLyrics || self.custom_lyrics_mode {
                return candidate;
            }
        }
    }

    pub fn select_genre(&mut self, name: &str) -> bool {
        match GENRES.iter().position(|g| g.eq_ignore_ascii_case(name)) {
            Some(idx) => {
                self.genre_index = idx;
                true
            }
            None => false,
        }
    }

    pub fn select_mood(&mut self, name: &str) -> bool {
        match MOODS.iter().position(|m| m.eq_ignore_ascii_case(name)) {
            Some(idx) => {
                self.mood_index = idx;
                true
            }
            None => false,
        }
    }

    /// Sets the duration, leaving it unchanged when outside 1–10 minutes.
    pub fn set_duration(&mut self, minutes: i32) -> Result<(), ValidationError> {
        let min = MIN_DURATION_MINUTES as i32;
        let max = MAX_DURATION_MINUTES as i32;
        if !(min..=max).contains(&minutes) {
            return Err(ValidationError::DurationOutOfRange { requested: minutes });
        }
        self.target_duration = minutes as u8;
        Ok(())
    }

    /// Left/Right on the focused selector. `forward` is Right.
    pub fn cycle(&mut self, forward: bool) -> Result<(), ValidationError> {
        match self.focus {
            FormField::Genre => {
                self.genre_index = cycle_index(self.genre_index, GENRES.len(), forward)
            }
            FormField::Mood => self.mood_index = cycle_index(self.mood_index, MOODS.len(), forward),
            FormField::Tempo => {
                let idx = Tempo::ALL.iter().position(|t| *t == self.tempo).unwrap_or(1);
                self.tempo = Tempo::ALL[cycle_index(idx, Tempo::ALL.len(), forward)];
            }
            FormField::Duration => {
                let delta = if forward { 1 } else { -1 };
                self.set_duration(self.target_duration as i32 + delta)?;
            }
            FormField::LyricsMode => self.custom_lyrics_mode = !self.custom_lyrics_mode,
            FormField::Voice => {
                let idx = Voice::ALL.iter().position(|v| *v == self.voice).unwrap_or(0);
                self.voice = Voice::ALL[cycle_index(idx, Voice::ALL.len(), forward)];
            }
            FormField::StyleNotes | FormField::SamplePath | FormField::CustomLyrics => {}
        }
        Ok(())
    }

    pub fn focused_text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::StyleNotes => Some(&mut self.style_notes),
            // Read-only while a sample is attached; remove it to pick another file.
            FormField::SamplePath if self.audio_sample.is_none() => Some(&mut self.sample_path),
            FormField::CustomLyrics => Some(&mut self.custom_lyrics),
            _ => None,
        }
    }

    pub fn attach_sample(&mut self, path: &Path) -> Result<&AudioSample, ValidationError> {
        let sample = load_audio_sample(path)?;
        self.sample_path = path.display().to_string();
        Ok(self.audio_sample.insert(sample))
    }

    pub fn remove_sample(&mut self) -> Option<AudioSample> {
        self.sample_path.clear();
        self.audio_sample.take()
    }

    /// Validates the form and snapshots it into an immutable request.
    pub fn build_request(&self) -> Result<SongRequest, ValidationError> {
        let min = MIN_DURATION_MINUTES;
        let max = MAX_DURATION_MINUTES;
        if !(min..=max).contains(&self.target_duration) {
            return Err(ValidationError::DurationOutOfRange {
                requested: self.target_duration as i32,
            });
        }
        let custom_lyrics = if self.custom_lyrics_mode {
            if self.custom_lyrics.trim().is_empty() {
                return Err(ValidationError::EmptyCustomLyrics);
            }
            Some(self.custom_lyrics.clone())
        } else {
            None
        };

        Ok(SongRequest {
            genre: self.genre().to_string(),
            mood: self.mood().to_string(),
            tempo: self.tempo,
            style_notes: self.style_notes.trim().to_string(),
            target_duration: self.target_duration,
            custom_lyrics,
            voice: Some(self.voice),
            audio_sample: self.audio_sample.clone(),
        })
    }
}

fn cycle_index(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (current + 1) % len
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}

pub fn load_audio_sample(path: &Path) -> Result<AudioSample, ValidationError> {
    let bytes = fs::read(path)
        .map_err(|err| ValidationError::SampleRead(format!("{}: {err}", path.display())))?;
    let mime_type = infer::get(&bytes)
        .map(|kind| kind.mime_type().to_string())
        .filter(|mime| mime.starts_with("audio/"))
        .ok_or_else(|| ValidationError::UnsupportedSample(path.display().to_string()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "sample".to_string());
    Ok(AudioSample { data: B64.encode(&bytes), mime_type, file_name, path: path.to_path_buf() })
}
