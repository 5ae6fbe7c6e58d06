use crate::pcm::PcmBuffer;
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use rodio::{buffer::SamplesBuffer, Decoder, OutputStream, OutputStreamHandle, Sink};
use std::{
    fs::File,
    io::BufReader,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

const PRUNE_INTERVAL: Duration = Duration::from_millis(250);

pub enum PlaybackSource {
    Pcm(PcmBuffer),
    File(PathBuf),
}

enum AudioMessage {
    Play { source: PlaybackSource, started: oneshot::Sender<Result<()>> },
    Shutdown,
}

struct AudioWorker {
    tx: Sender<AudioMessage>,
    handle: JoinHandle<()>,
}

/// Session-scoped audio output.
///
/// The device is opened by a dedicated thread on the first playback and
/// reused afterwards. Every playback gets its own sink, so triggering a new
/// one while another is sounding overlaps them; nothing is queued or
/// cancelled. Dropping the context (or calling [`AudioContext::shutdown`])
/// stops whatever is still playing and closes the device.
pub struct AudioContext {
    worker: Mutex<Option<AudioWorker>>,
    active: Arc<AtomicUsize>,
}

impl AudioContext {
    pub fn new() -> Self {
        Self { worker: Mutex::new(None), active: Arc::new(AtomicUsize::new(0)) }
    }

    pub async fn play_pcm(&self, buffer: PcmBuffer) -> Result<()> {
        if buffer.frames() == 0 || buffer.channel_count() == 0 {
            bail!("decoded audio buffer is empty");
        }
        debug!(
            frames = buffer.frames(),
            sample_rate = buffer.sample_rate(),
            "queueing pcm playback"
        );
        self.play(PlaybackSource::Pcm(buffer)).await
    }

    pub async fn play_file(&self, path: PathBuf) -> Result<()> {
        debug!(path = %path.display(), "queueing file playback");
        self.play(PlaybackSource::File(path)).await
    }

    /// Playbacks still producing sound.
    pub fn active_playbacks(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn is_open(&self) -> bool {
        self.worker.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    pub fn shutdown(&self) {
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            let _ = worker.tx.send(AudioMessage::Shutdown);
            if worker.handle.join().is_err() {
                error!("audio thread panicked during shutdown");
            }
            info!("audio context closed");
        }
    }

    async fn play(&self, source: PlaybackSource) -> Result<()> {
        let (started_tx, started_rx) = oneshot::channel();
        self.sender()?
            .send(AudioMessage::Play { source, started: started_tx })
            .map_err(|_| anyhow!("audio thread is not running"))?;
        started_rx.await.context("audio thread dropped the playback request")?
    }

    fn sender(&self) -> Result<Sender<AudioMessage>> {
        let mut guard = self.worker.lock().map_err(|_| anyhow!("audio context lock poisoned"))?;
        if let Some(worker) = guard.as_ref() {
            return Ok(worker.tx.clone());
        }
        let (tx, rx) = unbounded();
        let active = self.active.clone();
        let handle = thread::Builder::new()
            .name("surkar-audio".into())
            .spawn(move || run_audio_thread(rx, active))
            .context("failed to spawn audio thread")?;
        *guard = Some(AudioWorker { tx: tx.clone(), handle });
        Ok(tx)
    }
}

impl Default for AudioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_audio_thread(rx: Receiver<AudioMessage>, active: Arc<AtomicUsize>) {
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut sinks: Vec<Sink> = Vec::new();

    loop {
        match rx.recv_timeout(PRUNE_INTERVAL) {
            Ok(AudioMessage::Play { source, started }) => {
                let result = start_playback(&mut output, source).map(|sink| sinks.push(sink));
                if let Err(err) = &result {
                    error!("failed to start playback: {err:#}");
                }
                let _ = started.send(result);
            }
            Ok(AudioMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        sinks.retain(|sink| !sink.empty());
        active.store(sinks.len(), Ordering::Relaxed);
    }

    for sink in sinks.drain(..) {
        sink.stop();
    }
    active.store(0, Ordering::Relaxed);
}

fn start_playback(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    source: PlaybackSource,
) -> Result<Sink> {
    if output.is_none() {
        let opened = OutputStream::try_default().context("failed to open audio output")?;
        info!("audio output opened");
        *output = Some(opened);
    }
    let Some((_, handle)) = output.as_ref() else {
        bail!("audio output unavailable");
    };

    let sink = Sink::try_new(handle).context("failed to create audio sink")?;
    match source {
        PlaybackSource::Pcm(buffer) => {
            sink.append(SamplesBuffer::new(
                buffer.channel_count(),
                buffer.sample_rate(),
                buffer.interleaved(),
            ));
        }
        PlaybackSource::File(path) => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let decoder = Decoder::new(BufReader::new(file)).context("failed to decode audio")?;
            sink.append(decoder);
        }
    }
    sink.play();
    Ok(sink)
}
