use crate::{
    api::{SongGenerator, VocalSynthesizer},
    app::{AppCommand, AppEvent, VocalTarget},
    export::export_lyrics,
    pcm::{decode_base64_pcm, VOCAL_CHANNELS, VOCAL_SAMPLE_RATE},
    playback::AudioContext,
    progress::{MESSAGE_TICK, PROGRESS_TICK},
    types::{GeneratedSong, SongRequest, Voice},
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc};
use tokio::{
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{error, info};

pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    generator: Arc<dyn SongGenerator>,
    synthesizer: Arc<dyn VocalSynthesizer>,
    audio: Arc<AudioContext>,
    event_tx: UnboundedSender<AppEvent>,
    export_dir: PathBuf,
}

impl Controller {
    pub fn new(
        generator: Arc<dyn SongGenerator>,
        synthesizer: Arc<dyn VocalSynthesizer>,
        audio: Arc<AudioContext>,
        event_tx: UnboundedSender<AppEvent>,
        export_dir: PathBuf,
    ) -> Self {
        let inner = ControllerInner { generator, synthesizer, audio, event_tx, export_dir };
        Self { inner: Arc::new(inner) }
    }

    /// Runs every command on its own task; nothing is queued behind a slow request.
    pub fn spawn(self, mut command_rx: UnboundedReceiver<AppCommand>) -> JoinHandle<()> {
        let inner = self.inner;
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let inner = inner.clone();
                tokio::spawn(async move {
                    if let Err(err) = Controller::handle_command(inner.clone(), command).await {
                        error!("command error: {err:#}");
                        let _ = inner.event_tx.send(AppEvent::Error(format!("{err:#}")));
                    }
                });
            }
        })
    }

    async fn handle_command(inner: Arc<ControllerInner>, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::Generate { request } => {
                Controller::generate(inner, request).await;
            }
            AppCommand::PlayVocal { target, song, text, voice } => {
                Controller::play_vocal(inner, target, song, text, voice).await;
            }
            AppCommand::PreviewSample { path } => {
                Controller::preview_sample(inner, path).await?;
            }
            AppCommand::ExportLyrics { song } => {
                Controller::export(inner, song).await?;
            }
        }
        Ok(())
    }

    async fn generate(inner: Arc<ControllerInner>, request: SongRequest) {
        let (done_tx, done_rx) = oneshot::channel();
        let ticker = spawn_progress_ticker(inner.event_tx.clone(), done_rx);

        let result = inner.generator.generate(&request).await;

        let _ = done_tx.send(());
        let _ = ticker.await;

        match result {
            Ok(song) => {
                info!(title = %song.title, sections = song.sections.len(), "song generated");
                let _ = inner.event_tx.send(AppEvent::SongReady(song));
            }
            Err(err) => {
                error!("song generation failed: {err}");
                let _ = inner.event_tx.send(AppEvent::GenerationFailed(err.to_string()));
            }
        }
    }

    async fn play_vocal(
        inner: Arc<ControllerInner>,
        target: VocalTarget,
        song: u64,
        text: String,
        voice: Voice,
    ) {
        info!(
            vocal = %target.describe(),
            %voice,
            chars = text.chars().count(),
            "requesting vocal guide"
        );
        let outcome: Result<()> = async {
            let payload = inner.synthesizer.synthesize(&text, voice).await?;
            let buffer = decode_base64_pcm(&payload, VOCAL_SAMPLE_RATE, VOCAL_CHANNELS)?;
            info!(seconds = buffer.duration().as_secs_f32(), "vocal guide decoded");
            inner.audio.play_pcm(buffer).await
        }
        .await;

        match outcome {
            Ok(()) => {
                info!(active = inner.audio.active_playbacks(), "vocal guide playing");
                let _ = inner.event_tx.send(AppEvent::VocalStarted { target, song });
            }
            Err(err) => {
                error!("vocal guide for {} failed: {err:#}", target.describe());
                let _ = inner
                    .event_tx
                    .send(AppEvent::VocalFailed { target, song, detail: format!("{err:#}") });
            }
        }
    }

    async fn preview_sample(inner: Arc<ControllerInner>, path: PathBuf) -> Result<()> {
        inner
            .audio
            .play_file(path.clone())
            .await
            .with_context(|| format!("failed to preview {}", path.display()))?;
        let _ = inner.event_tx.send(AppEvent::Info(format!("নমুনা বাজছে: {}", path.display())));
        Ok(())
    }

    async fn export(inner: Arc<ControllerInner>, song: GeneratedSong) -> Result<()> {
        let dir = inner.export_dir.clone();
        let path = tokio::task::spawn_blocking(move || export_lyrics(&song, &dir))
            .await
            .context("lyrics export task panicked")??;
        let _ = inner.event_tx.send(AppEvent::LyricsExported { path });
        Ok(())
    }
}

fn spawn_progress_ticker(
    event_tx: UnboundedSender<AppEvent>,
    mut done: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress = interval(PROGRESS_TICK);
        let mut status = interval(MESSAGE_TICK);
        progress.set_missed_tick_behavior(MissedTickBehavior::Delay);
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Both intervals fire immediately on the first tick.
        progress.tick().await;
        status.tick().await;

        loop {
            tokio::select! {
                _ = &mut done => break,
                _ = progress.tick() => {
                    let _ = event_tx.send(AppEvent::ProgressTick);
                }
                _ = status.tick() => {
                    let _ = event_tx.send(AppEvent::StatusRotate);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::{AppState, ViewState, GENERATION_ERROR_MESSAGE},
        config::AppConfig,
        error::ClientError,
        extract::parse_song,
        types::Tempo,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    };
    use tokio::sync::mpsc::unbounded_channel;

    struct FakeGenerator {
        reply: String,
        delay: Duration,
        requests: Mutex<Vec<SongRequest>>,
    }

    impl FakeGenerator {
        fn new(reply: impl Into<String>) -> Self {
            Self { reply: reply.into(), delay: Duration::ZERO, requests: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SongGenerator for FakeGenerator {
        async fn generate(&self, request: &SongRequest) -> Result<GeneratedSong, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            tokio::time::sleep(self.delay).await;
            parse_song(&self.reply)
        }
    }

    struct FakeSynthesizer {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VocalSynthesizer for FakeSynthesizer {
        async fn synthesize(&self, _text: &str, _voice: Voice) -> Result<String, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(ClientError::MissingAudio)
        }
    }

    fn six_section_reply() -> String {
        let sections: Vec<_> = [
            ("সূচনা", "২০ সেকেন্ড"),
            ("স্তবক ১", "৪৫ সেকেন্ড"),
            ("স্থায়ী", "৩০ সেকেন্ড"),
            ("স্তবক ২", "৪৫ সেকেন্ড"),
            ("স্থায়ী", "৩০ সেকেন্ড"),
            ("শেষ স্থায়ী", "৪০ সেকেন্ড"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (kind, duration))| {
            json!({ "type": kind, "duration": duration, "lyrics": format!("line {}", i + 1) })
        })
        .collect();
        let body = json!({
            "title": "আনন্দের মেলা",
            "sections": sections,
            "arrangement": {
                "instruments": "দোতারা, খোল, বাঁশি",
                "beatPattern": "কাহারবা ৪/৪",
                "bpm": "108",
                "vocalStyle": "উচ্ছল লোকগীতি",
                "energyProgression": "শান্ত সূচনা থেকে উচ্ছ্বসিত সমাপ্তি"
            }
        });
        format!("Sure! Here is the song:\n```json\n{body}\n```")
    }

    fn controller(
        generator: Arc<FakeGenerator>,
        synthesizer: Arc<FakeSynthesizer>,
    ) -> (UnboundedSender<AppCommand>, UnboundedReceiver<AppEvent>) {
        let (event_tx, event_rx) = unbounded_channel();
        let (command_tx, command_rx) = unbounded_channel();
        let controller = Controller::new(
            generator,
            synthesizer,
            Arc::new(AudioContext::new()),
            event_tx,
            std::env::temp_dir(),
        );
        controller.spawn(command_rx);
        (command_tx, event_rx)
    }

    fn silent_synth() -> Arc<FakeSynthesizer> {
        Arc::new(FakeSynthesizer { reply: None, calls: AtomicUsize::new(0) })
    }

    async fn drive_until_settled(app: &mut AppState, events: &mut UnboundedReceiver<AppEvent>) {
        while app.is_generating() {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("controller stalled")
                .expect("event channel closed");
            app.handle_event(event);
        }
    }

    #[tokio::test]
    async fn folk_request_renders_six_sections_in_order() {
        let generator = Arc::new(FakeGenerator::new(six_section_reply()));
        let (command_tx, mut events) = controller(generator.clone(), silent_synth());

        let mut app = AppState::new(&AppConfig::default());
        assert!(app.form.select_genre("Folk"));
        assert!(app.form.select_mood("Joyful"));
        app.form.tempo = Tempo::Medium;
        app.set_duration(4);

        let command = app.submit().expect("valid form");
        command_tx.send(command).unwrap();
        drive_until_settled(&mut app, &mut events).await;

        assert_eq!(app.view, ViewState::Ready);
        let sent = generator.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.genre, "Folk");
        assert_eq!(sent.mood, "Joyful");
        assert_eq!(sent.tempo, Tempo::Medium);
        assert_eq!(sent.target_duration, 4);

        let song = app.song.as_ref().unwrap();
        assert_eq!(song.title, "আনন্দের মেলা");
        assert_eq!(song.sections.len(), 6);
        let kinds: Vec<_> = song.sections.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, ["সূচনা", "স্তবক ১", "স্থায়ী", "স্তবক ২", "স্থায়ী", "শেষ স্থায়ী"]);
        for (i, section) in song.sections.iter().enumerate() {
            assert_eq!(section.lyrics, format!("line {}", i + 1));
        }
        assert_eq!(song.arrangement.instruments, "দোতারা, খোল, বাঁশি");
        assert_eq!(song.arrangement.beat_pattern, "কাহারবা ৪/৪");
        assert_eq!(song.arrangement.bpm, "108");
        assert_eq!(song.arrangement.vocal_style, "উচ্ছল লোকগীতি");
        assert_eq!(song.arrangement.energy_progression, "শান্ত সূচনা থেকে উচ্ছ্বসিত সমাপ্তি");
        assert_eq!(app.progress.percent(), 100);
    }

    #[tokio::test]
    async fn malformed_reply_fails_without_partial_song() {
        let generator = Arc::new(FakeGenerator::new("{\"title\": \"অর্ধেক\""));
        let (command_tx, mut events) = controller(generator.clone(), silent_synth());

        let mut app = AppState::new(&AppConfig::default());
        command_tx.send(app.submit().unwrap()).unwrap();
        drive_until_settled(&mut app, &mut events).await;

        assert_eq!(app.view, ViewState::Failed(GENERATION_ERROR_MESSAGE.to_string()));
        assert!(app.song.is_none());
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn blank_custom_lyrics_never_reach_the_generator() {
        let generator = Arc::new(FakeGenerator::new(six_section_reply()));
        let (command_tx, _events) = controller(generator.clone(), silent_synth());

        let mut app = AppState::new(&AppConfig::default());
        app.form.custom_lyrics_mode = true;
        app.form.custom_lyrics = "   ".into();
        if let Some(command) = app.submit() {
            command_tx.send(command).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(generator.calls(), 0);
        assert!(app.alert.is_some());
        assert_eq!(app.view, ViewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_emits_progress_until_generation_resolves() {
        let mut generator = FakeGenerator::new(six_section_reply());
        generator.delay = Duration::from_secs(6);
        let generator = Arc::new(generator);
        let (command_tx, mut events) = controller(generator, silent_synth());

        let mut app = AppState::new(&AppConfig::default());
        command_tx.send(app.submit().unwrap()).unwrap();

        let mut ticks = 0;
        let mut rotations = 0;
        while app.is_generating() {
            let event = events.recv().await.unwrap();
            match &event {
                AppEvent::ProgressTick => ticks += 1,
                AppEvent::StatusRotate => rotations += 1,
                _ => {}
            }
            app.handle_event(event);
        }
        assert!(ticks >= 10, "expected regular progress ticks, got {ticks}");
        assert!(rotations >= 2, "expected rotating messages, got {rotations}");
        assert_eq!(app.view, ViewState::Ready);
    }

    #[tokio::test]
    async fn missing_audio_clears_busy_flag() {
        let generator = Arc::new(FakeGenerator::new(six_section_reply()));
        let synth = silent_synth();
        let (command_tx, mut events) = controller(generator, synth.clone());

        let mut app = AppState::new(&AppConfig::default());
        command_tx.send(app.submit().unwrap()).unwrap();
        drive_until_settled(&mut app, &mut events).await;

        command_tx.send(app.request_section_vocal(2).unwrap()).unwrap();
        assert!(app.is_vocal_busy(VocalTarget::Section(2)));
        loop {
            let event = events.recv().await.unwrap();
            let done = matches!(event, AppEvent::VocalFailed { .. });
            app.handle_event(event);
            if done {
                break;
            }
        }
        assert!(!app.is_vocal_busy(VocalTarget::Section(2)));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_pcm_is_reported_without_touching_the_device() {
        let generator = Arc::new(FakeGenerator::new(six_section_reply()));
        let synth =
            Arc::new(FakeSynthesizer { reply: Some("AA==".into()), calls: AtomicUsize::new(0) });
        let (command_tx, mut events) = controller(generator, synth);

        command_tx
            .send(AppCommand::PlayVocal {
                target: VocalTarget::FullSong,
                song: 1,
                text: "স্থায়ী\nline".into(),
                voice: Voice::Kore,
            })
            .unwrap();
        match events.recv().await.unwrap() {
            AppEvent::VocalFailed { target, detail, .. } => {
                assert_eq!(target, VocalTarget::FullSong);
                assert!(detail.contains("empty"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn export_writes_lyrics_file() {
        let dir = tempfile::tempdir().unwrap();
        let (event_tx, mut events) = unbounded_channel();
        let (command_tx, command_rx) = unbounded_channel();
        Controller::new(
            Arc::new(FakeGenerator::new(six_section_reply())),
            silent_synth(),
            Arc::new(AudioContext::new()),
            event_tx,
            dir.path().to_path_buf(),
        )
        .spawn(command_rx);

        let song = parse_song(&six_section_reply()).unwrap();
        command_tx.send(AppCommand::ExportLyrics { song }).unwrap();
        match events.recv().await.unwrap() {
            AppEvent::LyricsExported { path } => {
                assert_eq!(path, dir.path().join("আনন্দের_মেলা_lyrics.txt"));
                let text = std::fs::read_to_string(path).unwrap();
                assert!(text.contains("[শেষ স্থায়ী] (৪০ সেকেন্ড)\nline 6"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
