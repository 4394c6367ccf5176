//! Per-session playback state machine.
//!
//! Each session owns one logical event queue: timers ("next ad", "program
//! boundary"), async store lookups and host calls (tune, pause, resume,
//! seek, ad-completed) all re-enter as messages and run one at a time.
//! Every session-mutating operation cancels previously scheduled timers
//! before computing new ones — the most recent request wins. Timer and
//! lookup events additionally carry the tune generation so a message that
//! raced a re-tune is dropped instead of acting on the wrong content.
//!
//! The player collaborator may be absent at any call site; the timeline
//! advances regardless.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::model::{
    Advertisement, ContentRating, Program, RecordedProgram, StoredChannel, StoredProgram,
};
use crate::playback::ad_tracker::ChannelAdTracker;
use crate::playback::player::{Player, PlayerEvent, RatingPolicy, SessionCallback};
use crate::playback::timeline::{self, LIVE};
use crate::store::ContentStore;

/// Collaborators and tunables a session is built from.
pub struct SessionContext {
    pub store: Arc<dyn ContentStore>,
    pub player: Option<Arc<dyn Player>>,
    pub callback: Arc<dyn SessionCallback>,
    pub ratings: Arc<dyn RatingPolicy>,
    pub ad_tracker: ChannelAdTracker,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
}

/// Closed message set of the session queue.
enum Event {
    Tune {
        channel_id: i64,
    },
    PlayRecorded {
        recording_id: i64,
    },
    ProgramResolved {
        generation: u64,
        channel: Option<StoredChannel>,
        program: Option<StoredProgram>,
    },
    RecordingResolved {
        generation: u64,
        recording: Option<RecordedProgram>,
    },
    PlayAd {
        generation: u64,
        ad: Advertisement,
    },
    ProgramBoundary {
        generation: u64,
    },
    Pause,
    Resume,
    SeekTo {
        position_ms: i64,
    },
    AdCompleted,
    Player(PlayerEvent),
    RatingsChanged,
    Unblock {
        rating: ContentRating,
    },
    Release,
}

/// Handle through which the host drives a session. Cloneable; dropping all
/// handles releases the session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl SessionHandle {
    pub fn tune(&self, channel_id: i64) {
        let _ = self.tx.send(Event::Tune { channel_id });
    }

    pub fn play_recorded(&self, recording_id: i64) {
        let _ = self.tx.send(Event::PlayRecorded { recording_id });
    }

    pub fn pause(&self) {
        let _ = self.tx.send(Event::Pause);
    }

    pub fn resume(&self) {
        let _ = self.tx.send(Event::Resume);
    }

    /// Time-shift seek to an absolute UTC time.
    pub fn seek_to(&self, position_ms: i64) {
        let _ = self.tx.send(Event::SeekTo { position_ms });
    }

    /// The host's ad sub-player finished the ad the session asked for.
    pub fn notify_ad_completed(&self) {
        let _ = self.tx.send(Event::AdCompleted);
    }

    pub fn on_player_event(&self, event: PlayerEvent) {
        let _ = self.tx.send(Event::Player(event));
    }

    /// Parental-control settings changed; re-evaluate the current content.
    pub fn notify_ratings_changed(&self) {
        let _ = self.tx.send(Event::RatingsChanged);
    }

    /// The user approved the given rating for this session.
    pub fn unblock(&self, rating: ContentRating) {
        let _ = self.tx.send(Event::Unblock { rating });
    }

    pub fn release(&self) {
        let _ = self.tx.send(Event::Release);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AdOrigin {
    /// On-tune ad attached to the channel.
    Channel,
    /// Mid-stream ad attached to the current program.
    Program,
}

struct SessionState {
    channel: Option<StoredChannel>,
    program: Option<StoredProgram>,
    recording: Option<RecordedProgram>,
    elapsed_program_ms: i64,
    elapsed_ad_ms: i64,
    timeshift_pos_ms: i64,
    paused: bool,
    /// Set on tune; the first content resolution checks the channel ad.
    tune_ad_pending: bool,
    current_ad: Option<(AdOrigin, Advertisement)>,
    last_blocked: Option<ContentRating>,
    unblocked: HashSet<ContentRating>,
    generation: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            channel: None,
            program: None,
            recording: None,
            elapsed_program_ms: 0,
            elapsed_ad_ms: 0,
            timeshift_pos_ms: LIVE,
            paused: false,
            tune_ad_pending: false,
            current_ad: None,
            last_blocked: None,
            unblocked: HashSet::new(),
            generation: 0,
        }
    }
}

/// The session actor. Create one with [`Session::spawn`].
pub struct Session {
    ctx: SessionContext,
    rx: mpsc::UnboundedReceiver<Event>,
    // Weak so that in-flight timers and lookups never keep a session alive
    // after the host dropped its last handle.
    self_tx: mpsc::WeakUnboundedSender<Event>,
    state: SessionState,
    ad_timer: Option<JoinHandle<()>>,
    boundary_timer: Option<JoinHandle<()>>,
    lookup: Option<JoinHandle<()>>,
}

impl Session {
    /// Spawn the session task and return its handle.
    pub fn spawn(ctx: SessionContext) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            ctx,
            rx,
            self_tx: tx.downgrade(),
            state: SessionState::new(),
            ad_timer: None,
            boundary_timer: None,
            lookup: None,
        };
        tokio::spawn(session.run());
        SessionHandle { tx }
    }

    async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            match event {
                Event::Tune { channel_id } => self.handle_tune(channel_id),
                Event::PlayRecorded { recording_id } => self.handle_play_recorded(recording_id),
                Event::ProgramResolved {
                    generation,
                    channel,
                    program,
                } => self.handle_program_resolved(generation, channel, program),
                Event::RecordingResolved {
                    generation,
                    recording,
                } => self.handle_recording_resolved(generation, recording),
                Event::PlayAd { generation, ad } => self.handle_play_ad(generation, ad),
                Event::ProgramBoundary { generation } => self.handle_boundary(generation),
                Event::Pause => self.handle_pause(),
                Event::Resume => self.handle_resume(),
                Event::SeekTo { position_ms } => self.handle_seek(position_ms),
                Event::AdCompleted => self.handle_ad_completed(),
                Event::Player(event) => self.handle_player_event(event),
                Event::RatingsChanged => self.play_current_content(),
                Event::Unblock { rating } => self.handle_unblock(rating),
                Event::Release => break,
            }
        }
        self.cancel_timers();
        self.cancel_lookup();
        if let Some(player) = &self.ctx.player {
            player.release();
        }
        debug!("Session released");
    }

    // ── Tune and content resolution ──────────────────────────────────────

    fn handle_tune(&mut self, channel_id: i64) {
        info!("Tuning to channel {}", channel_id);
        self.state.generation += 1;
        let generation = self.state.generation;
        self.cancel_timers();
        self.cancel_lookup();

        self.state = SessionState {
            generation,
            tune_ad_pending: true,
            ..SessionState::new()
        };
        self.ctx.callback.on_release_ad_player();

        let store = Arc::clone(&self.ctx.store);
        let clock = Arc::clone(&self.ctx.clock);
        let tx = self.self_tx.clone();
        self.lookup = Some(tokio::spawn(async move {
            let channel = store.channel(channel_id).await.ok().flatten();
            let program = store
                .program_at(channel_id, clock.now_utc_ms())
                .await
                .ok()
                .flatten();
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::ProgramResolved {
                    generation,
                    channel,
                    program,
                });
            }
        }));
    }

    fn handle_program_resolved(
        &mut self,
        generation: u64,
        channel: Option<StoredChannel>,
        program: Option<StoredProgram>,
    ) {
        if generation != self.state.generation {
            debug!("Dropping stale program resolution");
            return;
        }
        self.lookup = None;
        if let Some(channel) = channel {
            self.state.channel = Some(channel);
        }
        // Moving to different content resets the session's unblock grants.
        let changed = self.state.program.as_ref().map(|p| p.id) != program.as_ref().map(|p| p.id);
        if changed {
            self.state.unblocked.clear();
        }
        self.state.program = program;
        self.play_current_content();
    }

    /// Resolve what plays right now: rating gate, then the on-tune channel
    /// ad, then program content with its ad schedule and boundary timer.
    fn play_current_content(&mut self) {
        self.cancel_timers();
        let now = self.ctx.clock.now_utc_ms();

        let Some(stored) = self.state.program.clone() else {
            warn!("No current program for channel");
            self.ctx.callback.on_video_unavailable("no current program");
            return;
        };
        let program = stored.program;

        if let Some(rating) = self.first_blocked_rating(&program) {
            self.block_content(rating, program.end_utc_ms(), now);
            return;
        }
        if self.state.last_blocked.take().is_some() {
            self.ctx.callback.on_content_allowed();
        }

        if self.state.tune_ad_pending {
            self.state.tune_ad_pending = false;
            if let Some(ad) = self.pending_channel_ad(now) {
                info!("Playing on-tune channel ad");
                self.state.current_ad = Some((AdOrigin::Channel, ad.clone()));
                if let Some(player) = &self.ctx.player {
                    player.pause();
                }
                self.ctx.callback.on_play_ad(&ad, 0);
                return;
            }
        }

        let config = &self.ctx.config;
        let (t, live) = timeline::effective_time(
            now,
            self.state.timeshift_pos_ms,
            config.timeshift_threshold_ms,
        );
        if live {
            self.state.timeshift_pos_ms = LIVE;
        }

        let lookback = config.ad_lookback_ms;
        self.state.elapsed_ad_ms =
            timeline::elapsed_ad_ms(program.provider_data().ads(), t, lookback);
        self.state.elapsed_program_ms = timeline::elapsed_program_ms(&program, t, lookback);

        if let Some(ad) = timeline::next_ad(program.provider_data().ads(), t, lookback) {
            let delay = ad.start_utc_ms() - t;
            self.schedule_ad(ad.clone(), delay);
        }

        if let Some(player) = &self.ctx.player {
            let video = program.provider_data().video().or_else(|| {
                self.state
                    .channel
                    .as_ref()
                    .and_then(|c| c.channel.provider_data().video())
            });
            if let Some(video) = video {
                player.load(video);
            }
            player.seek_to(self.state.elapsed_program_ms);
            if self.state.paused {
                player.pause();
            } else {
                player.play();
            }
        }
        self.ctx
            .callback
            .on_play_program(&program, self.state.elapsed_program_ms);

        // Re-evaluate exactly on the program boundary.
        self.schedule_boundary(program.end_utc_ms() - t);
    }

    fn pending_channel_ad(&self, now: i64) -> Option<Advertisement> {
        let channel = self.state.channel.as_ref()?;
        let ad = channel.channel.provider_data().ads().first()?;
        if self
            .ctx
            .ad_tracker
            .due(channel.id, now, self.ctx.config.channel_ad_interval_ms)
        {
            Some(ad.clone())
        } else {
            None
        }
    }

    fn first_blocked_rating(&self, program: &Program) -> Option<ContentRating> {
        program
            .content_ratings()
            .iter()
            .find(|rating| {
                self.ctx.ratings.is_blocked(rating) && !self.state.unblocked.contains(rating)
            })
            .cloned()
    }

    fn block_content(&mut self, rating: ContentRating, program_end_ms: i64, now: i64) {
        // Reset the player before notifying: a blocked frame must never
        // render.
        if let Some(player) = &self.ctx.player {
            player.stop();
        }
        info!("Content blocked by rating {}", rating);
        self.state.last_blocked = Some(rating.clone());
        self.ctx.callback.on_content_blocked(&rating);

        let (t, _) = timeline::effective_time(
            now,
            self.state.timeshift_pos_ms,
            self.ctx.config.timeshift_threshold_ms,
        );
        self.schedule_boundary(program_end_ms - t);
    }

    // ── Ads ──────────────────────────────────────────────────────────────

    fn handle_play_ad(&mut self, generation: u64, ad: Advertisement) {
        if generation != self.state.generation {
            debug!("Dropping stale ad timer");
            return;
        }
        let now = self.ctx.clock.now_utc_ms();
        let threshold = self.ctx.config.timeshift_threshold_ms;
        let (t, _) = timeline::effective_time(now, self.state.timeshift_pos_ms, threshold);

        // Under time-shift an ad can fall behind the playback position. Count
        // it as watched without playing it, then re-derive the timeline.
        if self.state.timeshift_pos_ms != LIVE && t - ad.stop_utc_ms() > threshold {
            debug!("Skipping time-shifted ad, counting {} ms", ad.duration_ms());
            self.state.elapsed_ad_ms += ad.duration_ms();
            let new_pos = t + ad.duration_ms();
            if new_pos >= now {
                // Skipping past the live edge: snap back to live.
                self.state.timeshift_pos_ms = LIVE;
            } else {
                self.state.timeshift_pos_ms = new_pos;
            }
            self.play_current_content();
            return;
        }

        let clip_offset_ms = (t - ad.start_utc_ms()).max(0);
        self.state.current_ad = Some((AdOrigin::Program, ad.clone()));
        if let Some(player) = &self.ctx.player {
            player.pause();
        }
        self.ctx.callback.on_play_ad(&ad, clip_offset_ms);
    }

    fn handle_ad_completed(&mut self) {
        let Some((origin, _ad)) = self.state.current_ad.take() else {
            debug!("Ad completion with no ad in flight");
            return;
        };
        if origin == AdOrigin::Channel {
            if let Some(channel) = &self.state.channel {
                // Persisted so the minimum-interval check holds across
                // session restarts.
                self.ctx
                    .ad_tracker
                    .record_played(channel.id, self.ctx.clock.now_utc_ms());
            }
        }
        self.play_current_content();
    }

    // ── Transport ────────────────────────────────────────────────────────

    fn handle_pause(&mut self) {
        self.cancel_timers();
        if self.state.recording.is_none() {
            let now = self.ctx.clock.now_utc_ms();
            let (t, _) = timeline::effective_time(
                now,
                self.state.timeshift_pos_ms,
                self.ctx.config.timeshift_threshold_ms,
            );
            self.state.timeshift_pos_ms = t;
        }
        self.state.paused = true;
        if let Some(player) = &self.ctx.player {
            player.pause();
        }
    }

    fn handle_resume(&mut self) {
        self.state.paused = false;
        if self.state.recording.is_some() {
            if let Some(player) = &self.ctx.player {
                player.play();
            }
            return;
        }
        let Some(stored) = self.state.program.clone() else {
            if let Some(player) = &self.ctx.player {
                player.play();
            }
            return;
        };
        let program = stored.program;

        // The player's position is authoritative once it has been playing;
        // rebuild elapsed ad time and the virtual position from it.
        let player_pos = self
            .ctx
            .player
            .as_ref()
            .map(|p| p.position_ms())
            .unwrap_or(self.state.elapsed_program_ms);
        let lookback = self.ctx.config.ad_lookback_ms;
        let (elapsed_ads, virtual_t) =
            timeline::from_player_position(&program, player_pos, lookback);
        self.state.elapsed_program_ms = player_pos;
        self.state.elapsed_ad_ms = elapsed_ads;

        let now = self.ctx.clock.now_utc_ms();
        if now - virtual_t > self.ctx.config.timeshift_threshold_ms {
            self.state.timeshift_pos_ms = virtual_t;
        } else {
            self.state.timeshift_pos_ms = LIVE;
        }

        self.cancel_timers();
        if let Some(ad) = timeline::next_ad(program.provider_data().ads(), virtual_t, lookback) {
            self.schedule_ad(ad.clone(), ad.start_utc_ms() - virtual_t);
        }
        self.schedule_boundary(program.end_utc_ms() - virtual_t);

        if let Some(player) = &self.ctx.player {
            player.set_playback_speed(1.0);
            player.play();
        }
    }

    fn handle_seek(&mut self, position_ms: i64) {
        self.cancel_timers();

        if let Some(recording) = &self.state.recording {
            // Absolute seek target translates into player time through the
            // recording's start offset.
            if let Some(player) = &self.ctx.player {
                player.seek_to(position_ms - recording.recording_start_ms);
            }
            return;
        }
        let Some(stored) = self.state.program.clone() else {
            return;
        };
        let program = stored.program;
        let lookback = self.ctx.config.ad_lookback_ms;

        // Recompute as if freshly tuned at the target time.
        self.state.timeshift_pos_ms = position_ms;
        self.state.elapsed_ad_ms =
            timeline::elapsed_ad_ms(program.provider_data().ads(), position_ms, lookback);
        self.state.elapsed_program_ms = timeline::elapsed_program_ms(&program, position_ms, lookback);

        if let Some(ad) = timeline::next_ad(program.provider_data().ads(), position_ms, lookback) {
            self.schedule_ad(ad.clone(), ad.start_utc_ms() - position_ms);
        }
        self.schedule_boundary(program.end_utc_ms() - position_ms);

        if let Some(player) = &self.ctx.player {
            player.seek_to(self.state.elapsed_program_ms);
            if self.state.paused {
                player.pause();
            }
        }
    }

    // ── Boundaries, recordings, ratings ──────────────────────────────────

    fn handle_boundary(&mut self, generation: u64) {
        if generation != self.state.generation {
            debug!("Dropping stale boundary timer");
            return;
        }
        let Some(channel) = self.state.channel.clone() else {
            return;
        };

        // A shifted session enters the next program at the ended program's
        // boundary, not at the live edge.
        if self.state.timeshift_pos_ms != LIVE {
            if let Some(stored) = &self.state.program {
                self.state.timeshift_pos_ms = stored.program.end_utc_ms();
            }
        }
        let now = self.ctx.clock.now_utc_ms();
        let (at_ms, live) = timeline::effective_time(
            now,
            self.state.timeshift_pos_ms,
            self.ctx.config.timeshift_threshold_ms,
        );
        if live {
            self.state.timeshift_pos_ms = LIVE;
        }

        self.cancel_lookup();
        let store = Arc::clone(&self.ctx.store);
        let tx = self.self_tx.clone();
        self.lookup = Some(tokio::spawn(async move {
            let program = store.program_at(channel.id, at_ms).await.ok().flatten();
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::ProgramResolved {
                    generation,
                    channel: None,
                    program,
                });
            }
        }));
    }

    fn handle_play_recorded(&mut self, recording_id: i64) {
        info!("Playing recorded program {}", recording_id);
        self.state.generation += 1;
        let generation = self.state.generation;
        self.cancel_timers();
        self.cancel_lookup();
        self.state = SessionState {
            generation,
            ..SessionState::new()
        };
        self.ctx.callback.on_release_ad_player();

        let store = Arc::clone(&self.ctx.store);
        let tx = self.self_tx.clone();
        self.lookup = Some(tokio::spawn(async move {
            let recording = store.recorded_program(recording_id).await.ok().flatten();
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::RecordingResolved {
                    generation,
                    recording,
                });
            }
        }));
    }

    fn handle_recording_resolved(
        &mut self,
        generation: u64,
        recording: Option<RecordedProgram>,
    ) {
        if generation != self.state.generation {
            return;
        }
        self.lookup = None;
        let Some(recording) = recording else {
            self.ctx.callback.on_video_unavailable("recording not found");
            return;
        };
        if let Some(player) = &self.ctx.player {
            if let Some(video) = recording.provider_data.video() {
                player.load(video);
            }
            player.seek_to(0);
            player.play();
        }
        self.state.recording = Some(recording);
    }

    fn handle_unblock(&mut self, rating: ContentRating) {
        info!("Rating {} unblocked for this session", rating);
        self.state.unblocked.insert(rating);
        self.play_current_content();
    }

    fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Ended => {
                if self.state.current_ad.is_some() {
                    self.handle_ad_completed();
                } else if self.state.recording.is_some() {
                    debug!("Recorded playback ended");
                } else {
                    // Content ran past its slot; re-resolve.
                    let generation = self.state.generation;
                    self.handle_boundary(generation);
                }
            }
            PlayerEvent::Error(reason) => {
                warn!("Player error: {}", reason);
                self.ctx.callback.on_video_unavailable(&reason);
            }
            other => debug!("Player event: {:?}", other),
        }
    }

    // ── Timers ───────────────────────────────────────────────────────────

    fn schedule_ad(&mut self, ad: Advertisement, delay_ms: i64) {
        let generation = self.state.generation;
        if delay_ms <= 0 {
            // Mid-ad: dispatch straight back into the queue.
            if let Some(tx) = self.self_tx.upgrade() {
                let _ = tx.send(Event::PlayAd { generation, ad });
            }
            return;
        }
        let tx = self.self_tx.clone();
        self.ad_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::PlayAd { generation, ad });
            }
        }));
    }

    fn schedule_boundary(&mut self, delay_ms: i64) {
        let generation = self.state.generation;
        let tx = self.self_tx.clone();
        self.boundary_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms.max(0) as u64)).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::ProgramBoundary { generation });
            }
        }));
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.ad_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.boundary_timer.take() {
            timer.abort();
        }
    }

    fn cancel_lookup(&mut self) {
        if let Some(task) = self.lookup.take() {
            task.abort();
        }
    }
}
