use crate::{
    config::AppConfig,
    error::ValidationError,
    form::{FormField, FormState},
    progress::ProgressSimulator,
    types::{GeneratedSong, SongRequest, Voice},
};
use chrono::{DateTime, Local};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

const MAX_STATUS_LINES: usize = 8;

pub const GENERATION_ERROR_MESSAGE: &str = "দুঃখিত, গান তৈরিতে সমস্যা হয়েছে। আবার চেষ্টা করুন।";
pub const VOCAL_ERROR_MESSAGE: &str = "দুঃখিত, কণ্ঠ তৈরি করা যায়নি। আবার চেষ্টা করুন।";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Generating,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VocalTarget {
    Section(usize),
    FullSong,
}

impl VocalTarget {
    pub fn describe(&self) -> String {
        match self {
            Self::Section(index) => format!("section #{}", index + 1),
            Self::FullSong => "full song".to_string(),
        }
    }

    /// Bengali name shown in the status log.
    pub fn label(&self) -> String {
        match self {
            Self::Section(index) => format!("অংশ #{}", index + 1),
            Self::FullSong => "পুরো গান".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Form,
    Sections,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct LyricEditor {
    pub index: usize,
    pub buffer: String,
}

#[derive(Debug)]
pub struct AppState {
    pub form: FormState,
    pub view: ViewState,
    pub song: Option<GeneratedSong>,
    pub progress: ProgressSimulator,
    pub pane: Pane,
    pub selected_section: usize,
    pub editor: Option<LyricEditor>,
    pub alert: Option<String>,
    pub status_lines: Vec<StatusLine>,
    pub should_quit: bool,
    vocal_busy: HashSet<VocalTarget>,
    /// Bumped on every submit; vocal results tagged with an older value are stale.
    song_serial: u64,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            form: FormState::new(config.default_duration_minutes(), config.default_voice()),
            view: ViewState::Idle,
            song: None,
            progress: ProgressSimulator::new(),
            pane: Pane::Form,
            selected_section: 0,
            editor: None,
            alert: None,
            status_lines: Vec::new(),
            should_quit: false,
            vocal_busy: HashSet::new(),
            song_serial: 0,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.view == ViewState::Generating
    }

    pub fn is_vocal_busy(&self, target: VocalTarget) -> bool {
        self.vocal_busy.contains(&target)
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Info(message) => self.push_status_line(message, false),
            AppEvent::Error(message) => self.push_status_line(message, true),
            AppEvent::ProgressTick => {
                if self.is_generating() {
                    self.progress.tick();
                }
            }
            AppEvent::StatusRotate => {
                if self.is_generating() {
                    self.progress.rotate_message();
                }
            }
            AppEvent::SongReady(song) => {
                if !self.is_generating() {
                    warn!("discarding song that arrived outside a generation");
                    return;
                }
                self.progress.complete();
                self.push_status_line(
                    format!("\"{}\" তৈরি হয়েছে ({} টি অংশ)", song.title, song.sections.len()),
                    false,
                );
                self.song = Some(song);
                self.selected_section = 0;
                self.editor = None;
                self.view = ViewState::Ready;
            }
            AppEvent::GenerationFailed(detail) => {
                self.song = None;
                self.editor = None;
                self.push_status_line(detail, true);
                self.view = ViewState::Failed(GENERATION_ERROR_MESSAGE.to_string());
            }
            AppEvent::VocalStarted { target, song } => {
                if song != self.song_serial {
                    return;
                }
                self.vocal_busy.remove(&target);
                let line = format!("কণ্ঠ বাজছে: {}", target.label());
                self.push_status_line(line, false);
            }
            AppEvent::VocalFailed { target, song, detail } => {
                if song != self.song_serial {
                    warn!("stale vocal guide failure: {detail}");
                    return;
                }
                self.vocal_busy.remove(&target);
                self.push_status_line(format!("{VOCAL_ERROR_MESSAGE} ({detail})"), true);
            }
            AppEvent::LyricsExported { path } => {
                self.push_status_line(format!("লিরিক্স সংরক্ষিত: {}", path.display()), false);
            }
        }
    }

    /// Validates the form and, on success, moves to `Generating`.
    pub fn submit(&mut self) -> Option<AppCommand> {
        if self.is_generating() {
            return None;
        }
        match self.form.build_request() {
            Ok(request) => {
                info!(
                    genre = %request.genre,
                    mood = %request.mood,
                    minutes = request.target_duration,
                    custom_lyrics = request.uses_custom_lyrics(),
                    has_sample = request.audio_sample.is_some(),
                    "submitting song request"
                );
                self.view = ViewState::Generating;
                self.song = None;
                self.song_serial += 1;
                self.vocal_busy.clear();
                self.selected_section = 0;
                self.editor = None;
                self.progress.reset();
                Some(AppCommand::Generate { request })
            }
            Err(err) => {
                self.raise_alert(&err);
                None
            }
        }
    }

    pub fn cycle_field(&mut self, forward: bool) {
        if let Err(err) = self.form.cycle(forward) {
            self.raise_alert(&err);
        }
    }

    pub fn set_duration(&mut self, minutes: i32) {
        if let Err(err) = self.form.set_duration(minutes) {
            self.raise_alert(&err);
        }
    }

    pub fn request_section_vocal(&mut self, index: usize) -> Option<AppCommand> {
        let text = self.song.as_ref()?.section_vocal_text(index)?;
        self.request_vocal(VocalTarget::Section(index), text)
    }

    pub fn request_full_vocal(&mut self) -> Option<AppCommand> {
        let song = self.song.as_ref()?;
        if song.sections.is_empty() {
            return None;
        }
        let text = song.full_vocal_text();
        self.request_vocal(VocalTarget::FullSong, text)
    }

    fn request_vocal(&mut self, target: VocalTarget, text: String) -> Option<AppCommand> {
        if !self.vocal_busy.insert(target) {
            return None;
        }
        self.push_status_line(format!("কণ্ঠ তৈরি হচ্ছে: {}", target.label()), false);
        let voice = self.form.voice;
        Some(AppCommand::PlayVocal { target, song: self.song_serial, text, voice })
    }

    pub fn request_export(&mut self) -> Option<AppCommand> {
        match &self.song {
            Some(song) => Some(AppCommand::ExportLyrics { song: song.clone() }),
            None => {
                self.push_status_line("এখনও কোনো গান তৈরি হয়নি।".to_string(), true);
                None
            }
        }
    }

    pub fn attach_sample_from_field(&mut self) {
        if self.form.audio_sample().is_some() {
            return;
        }
        let raw = self.form.sample_path.trim().to_string();
        if raw.is_empty() {
            return;
        }
        match self.form.attach_sample(Path::new(&raw)) {
            Ok(sample) => {
                let line = format!("সংযুক্ত অডিও: {} ({})", sample.file_name, sample.mime_type);
                self.push_status_line(line, false);
            }
            Err(err) => self.raise_alert(&err),
        }
    }

    pub fn remove_sample(&mut self) {
        if let Some(sample) = self.form.remove_sample() {
            self.push_status_line(format!("অডিও সরানো হয়েছে: {}", sample.file_name), false);
        }
    }

    pub fn preview_sample(&mut self) -> Option<AppCommand> {
        let path = self.form.audio_sample()?.path.clone();
        Some(AppCommand::PreviewSample { path })
    }

    pub fn select_next_section(&mut self) {
        let Some(song) = &self.song else { return };
        if song.sections.is_empty() {
            return;
        }
        self.selected_section = (self.selected_section + 1) % song.sections.len();
    }

    pub fn select_previous_section(&mut self) {
        let Some(song) = &self.song else { return };
        let len = song.sections.len();
        if len == 0 {
            return;
        }
        self.selected_section =
            if self.selected_section == 0 { len - 1 } else { self.selected_section - 1 };
    }

    pub fn begin_edit(&mut self) {
        let Some(section) = self.song.as_ref().and_then(|s| s.sections.get(self.selected_section))
        else {
            return;
        };
        let buffer = section.lyrics.clone();
        self.editor = Some(LyricEditor { index: self.selected_section, buffer });
    }

    pub fn commit_edit(&mut self) {
        let Some(editor) = self.editor.take() else { return };
        if let Some(song) = self.song.as_mut() {
            if song.set_lyrics(editor.index, editor.buffer) {
                let line = format!("অংশ #{} এর কথা হালনাগাদ হয়েছে", editor.index + 1);
                self.push_status_line(line, false);
            }
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editor = None;
    }

    pub fn toggle_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Form if self.song.is_some() => Pane::Sections,
            _ => Pane::Form,
        };
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn raise_alert(&mut self, err: &ValidationError) {
        warn!("input rejected: {err}");
        self.alert = Some(err.to_string());
    }

    pub fn push_status_line(&mut self, message: String, is_error: bool) {
        self.status_lines.push(StatusLine { timestamp: Local::now(), message, is_error });
        if self.status_lines.len() > MAX_STATUS_LINES {
            let overflow = self.status_lines.len() - MAX_STATUS_LINES;
            self.status_lines.drain(0..overflow);
        }
    }

    pub fn focused_field(&self) -> Option<FormField> {
        (self.pane == Pane::Form).then(|| self.form.focus())
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Info(String),
    Error(String),
    ProgressTick,
    StatusRotate,
    SongReady(GeneratedSong),
    GenerationFailed(String),
    VocalStarted { target: VocalTarget, song: u64 },
    VocalFailed { target: VocalTarget, song: u64, detail: String },
    LyricsExported { path: PathBuf },
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Generate { request: SongRequest },
    PlayVocal { target: VocalTarget, song: u64, text: String, voice: Voice },
    PreviewSample { path: PathBuf },
    ExportLyrics { song: GeneratedSong },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Arrangement, SongSection};

    fn state() -> AppState {
        AppState::new(&AppConfig::default())
    }

    fn song(sections: usize) -> GeneratedSong {
        GeneratedSong {
            title: "আলো".into(),
            sections: (0..sections)
                .map(|i| SongSection {
                    kind: format!("অংশ {}", i + 1),
                    duration: "৩০ সেকেন্ড".into(),
                    lyrics: format!("কথা {}", i + 1),
                })
                .collect(),
            arrangement: Arrangement {
                instruments: "তবলা".into(),
                beat_pattern: "তিনতাল".into(),
                bpm: "100".into(),
                vocal_style: "উদাত্ত".into(),
                energy_progression: "ক্রমশ উচ্চ".into(),
            },
        }
    }

    fn ready_state(sections: usize) -> AppState {
        let mut app = state();
        assert!(app.submit().is_some());
        app.handle_event(AppEvent::SongReady(song(sections)));
        app
    }

    #[test]
    fn submit_moves_to_generating_and_ignores_repeat() {
        let mut app = state();
        let command = app.submit();
        assert!(matches!(command, Some(AppCommand::Generate { .. })));
        assert_eq!(app.view, ViewState::Generating);
        assert!(app.submit().is_none());
    }

    #[test]
    fn invalid_form_raises_alert_without_command() {
        let mut app = state();
        app.form.custom_lyrics_mode = true;
        assert!(app.submit().is_none());
        assert_eq!(app.view, ViewState::Idle);
        assert!(app.alert.as_deref().unwrap().contains("গানের কথা"));
        app.dismiss_alert();
        assert!(app.alert.is_none());
    }

    #[test]
    fn duration_over_max_shows_alert() {
        let mut app = state();
        app.set_duration(15);
        assert_eq!(app.form.target_duration(), 4);
        assert!(app.alert.is_some());
    }

    #[test]
    fn progress_only_moves_while_generating() {
        let mut app = state();
        app.handle_event(AppEvent::ProgressTick);
        assert_eq!(app.progress.value(), 0.0);

        app.submit();
        app.handle_event(AppEvent::ProgressTick);
        assert!(app.progress.value() > 0.0);
        app.handle_event(AppEvent::SongReady(song(2)));
        assert_eq!(app.progress.percent(), 100);
        assert_eq!(app.view, ViewState::Ready);
    }

    #[test]
    fn failure_shows_generic_message_and_drops_song() {
        let mut app = ready_state(3);
        app.submit();
        assert!(app.song.is_none());
        app.handle_event(AppEvent::GenerationFailed("malformed song JSON".into()));
        assert_eq!(app.view, ViewState::Failed(GENERATION_ERROR_MESSAGE.to_string()));
        assert!(app.song.is_none());
        assert!(app.status_lines.last().unwrap().is_error);
    }

    #[test]
    fn vocal_busy_flags_refuse_same_control_only() {
        let mut app = ready_state(3);
        let first = app.request_section_vocal(1);
        assert!(matches!(
            first,
            Some(AppCommand::PlayVocal { target: VocalTarget::Section(1), .. })
        ));
        assert!(app.request_section_vocal(1).is_none());
        assert!(app.request_section_vocal(0).is_some());
        assert!(app.request_full_vocal().is_some());
        assert!(app.request_full_vocal().is_none());

        app.handle_event(AppEvent::VocalStarted { target: VocalTarget::Section(1), song: 1 });
        assert!(!app.is_vocal_busy(VocalTarget::Section(1)));
        app.handle_event(AppEvent::VocalFailed {
            target: VocalTarget::FullSong,
            song: 1,
            detail: "no audio".into(),
        });
        assert!(!app.is_vocal_busy(VocalTarget::FullSong));
        assert!(app.request_full_vocal().is_some());
    }

    #[test]
    fn full_vocal_text_uses_every_section() {
        let mut app = ready_state(2);
        let Some(AppCommand::PlayVocal { text, voice, .. }) = app.request_full_vocal() else {
            panic!("expected vocal command");
        };
        assert_eq!(text, "অংশ 1\nকথা 1\nঅংশ 2\nকথা 2");
        assert_eq!(voice, Voice::Kore);
    }

    #[test]
    fn edits_replace_lyrics_of_selected_section() {
        let mut app = ready_state(3);
        app.select_next_section();
        app.select_next_section();
        app.begin_edit();
        app.editor.as_mut().unwrap().buffer.push_str("\nনতুন লাইন");
        app.commit_edit();
        let song = app.song.as_ref().unwrap();
        assert_eq!(song.sections[2].lyrics, "কথা 3\nনতুন লাইন");
        assert_eq!(song.sections[0].lyrics, "কথা 1");

        app.begin_edit();
        app.editor.as_mut().unwrap().buffer.clear();
        app.cancel_edit();
        assert_eq!(app.song.as_ref().unwrap().sections[2].lyrics, "কথা 3\nনতুন লাইন");
    }

    #[test]
    fn section_selection_wraps() {
        let mut app = ready_state(3);
        app.select_previous_section();
        assert_eq!(app.selected_section, 2);
        app.select_next_section();
        assert_eq!(app.selected_section, 0);
    }

    #[test]
    fn export_requires_a_song() {
        let mut app = state();
        assert!(app.request_export().is_none());
        let mut app = ready_state(1);
        assert!(matches!(app.request_export(), Some(AppCommand::ExportLyrics { .. })));
    }

    #[test]
    fn preview_replays_the_attached_file_not_the_edited_field() {
        let dir = tempfile::tempdir().unwrap();
        let attached = dir.path().join("hum.wav");
        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&36u32.to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&[0u8; 24]);
        std::fs::write(&attached, &wav).unwrap();

        let mut app = state();
        while app.form.focus() != FormField::SamplePath {
            app.form.focus_next();
        }
        app.form.sample_path = attached.display().to_string();
        app.attach_sample_from_field();
        assert!(app.form.audio_sample().is_some());

        assert!(app.form.focused_text_mut().is_none());
        app.form.sample_path = dir.path().join("other.wav").display().to_string();
        app.attach_sample_from_field();
        assert!(app.alert.is_none());

        match app.preview_sample() {
            Some(AppCommand::PreviewSample { path }) => assert_eq!(path, attached),
            other => panic!("unexpected command {other:?}"),
        }
        let request = app.form.build_request().unwrap();
        assert_eq!(request.audio_sample.unwrap().path, attached);

        app.remove_sample();
        assert!(app.preview_sample().is_none());
        assert!(app.form.focused_text_mut().is_some());
    }

    #[test]
    fn new_song_resets_vocal_flags_and_ignores_stale_results() {
        let mut app = ready_state(3);
        let Some(AppCommand::PlayVocal { song: old, .. }) = app.request_section_vocal(2) else {
            panic!("expected vocal command");
        };
        assert!(app.is_vocal_busy(VocalTarget::Section(2)));

        assert!(app.submit().is_some());
        assert!(!app.is_vocal_busy(VocalTarget::Section(2)));
        app.handle_event(AppEvent::SongReady(song(3)));

        let Some(AppCommand::PlayVocal { song: current, .. }) = app.request_section_vocal(2) else {
            panic!("section of the new song should be free");
        };
        assert_ne!(old, current);

        let lines = app.status_lines.len();
        app.handle_event(AppEvent::VocalStarted { target: VocalTarget::Section(2), song: old });
        assert!(app.is_vocal_busy(VocalTarget::Section(2)));
        assert_eq!(app.status_lines.len(), lines);

        app.handle_event(AppEvent::VocalStarted { target: VocalTarget::Section(2), song: current });
        assert!(!app.is_vocal_busy(VocalTarget::Section(2)));
        assert_eq!(app.status_lines.last().unwrap().message, "কণ্ঠ বাজছে: অংশ #3");
    }

    #[test]
    fn status_lines_are_capped() {
        let mut app = state();
        for i in 0..20 {
            app.handle_event(AppEvent::Info(format!("line {i}")));
        }
        assert_eq!(app.status_lines.len(), MAX_STATUS_LINES);
        assert_eq!(app.status_lines.last().unwrap().message, "line 19");
    }
}
