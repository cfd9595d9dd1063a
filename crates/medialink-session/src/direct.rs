// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Direct backing: each session wraps a local audio primitive.
//
// Every status a direct session produces, whether it comes from a primitive
// event or from an operation, goes through one per-session queue drained by
// a pump task. Callbacks therefore see statuses in the order they were
// produced, and never run while the primitive is locked. Every primitive
// fault becomes an ERROR status; nothing here returns a primitive error to
// the caller.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use medialink_bridge::traits::{AudioPrimitive, EventSink, PrimitiveEvent, PrimitiveFactory};
use medialink_core::error::{MediaLinkError, Result};
use medialink_core::types::{
    MediaErrorCode, MediaErrorValue, MediaId, MediaState, PlayOptions, Status,
};

use crate::backend::{BackendKind, MediaBackend, MediaControl};
use crate::dispatcher::Dispatcher;
use crate::session::SessionCore;
use crate::signature::{self, Arg};

/// Text reported for operations a local primitive cannot perform.
pub const NOT_SUPPORTED: &str = "Not supported API";

/// Translate one primitive event into the status it produces.
pub fn translate_event(event: PrimitiveEvent) -> Status {
    match event {
        PrimitiveEvent::LoadStart => Status::State(MediaState::Starting),
        PrimitiveEvent::Playing => Status::State(MediaState::Running),
        PrimitiveEvent::DurationChange(duration) => {
            // Zero, NaN and missing durations all mean "unknown".
            let known = duration.filter(|d| d.is_finite() && *d != 0.0);
            Status::Duration(known.unwrap_or(-1.0))
        }
        PrimitiveEvent::Error(code) => {
            // A bad source must surface as an aborted load, not as an
            // unsupported format.
            let code = match code {
                MediaErrorCode::NoneSupported => MediaErrorCode::Aborted,
                other => other,
            };
            Status::Error(MediaErrorValue::code(code))
        }
        PrimitiveEvent::Ended => Status::State(MediaState::Stopped),
    }
}

/// Backing that builds primitives through a host-supplied factory.
pub struct DirectBackend {
    factory: Arc<dyn PrimitiveFactory>,
    dispatcher: Dispatcher,
    default_volume: f64,
}

impl DirectBackend {
    pub fn new(factory: Arc<dyn PrimitiveFactory>, dispatcher: Dispatcher, default_volume: f64) -> Self {
        Self {
            factory,
            dispatcher,
            default_volume,
        }
    }
}

impl MediaBackend for DirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    /// Fails with `RuntimeUnavailable` outside a Tokio runtime, since the
    /// status pump has to be spawned.
    fn open(&self, session: Arc<SessionCore>) -> Result<Arc<dyn MediaControl>> {
        let runtime = Handle::try_current().map_err(|_| MediaLinkError::RuntimeUnavailable)?;
        let id = session.id();
        let (statuses, rx) = mpsc::unbounded_channel();
        runtime.spawn(pump_statuses(self.dispatcher.clone(), id, rx));

        let control = DirectControl {
            session,
            factory: Arc::clone(&self.factory),
            default_volume: self.default_volume,
            statuses,
            primitive: Mutex::new(None),
        };
        if let Err(e) = control.ensure_primitive() {
            control.fault("create", &e);
        }
        control.emit(Status::State(MediaState::Starting));
        Ok(Arc::new(control))
    }
}

async fn pump_statuses(dispatcher: Dispatcher, id: MediaId, mut rx: mpsc::UnboundedReceiver<Status>) {
    while let Some(status) = rx.recv().await {
        debug!(media_id = %id, ?status, "direct status");
        dispatcher.emit(&id, status);
    }
    debug!(media_id = %id, "status pump finished");
}

struct DirectControl {
    session: Arc<SessionCore>,
    factory: Arc<dyn PrimitiveFactory>,
    default_volume: f64,
    statuses: mpsc::UnboundedSender<Status>,
    primitive: Mutex<Option<Box<dyn AudioPrimitive>>>,
}

impl DirectControl {
    fn id(&self) -> MediaId {
        self.session.id()
    }

    /// Queue a status behind everything this session has produced so far.
    fn emit(&self, status: Status) {
        if self.statuses.send(status).is_err() {
            warn!(media_id = %self.id(), "status pump gone, status dropped");
        }
    }

    /// Create the primitive if the slot is empty (first use, or after release).
    fn ensure_primitive(&self) -> Result<()> {
        let mut slot = self.primitive.lock().expect("primitive lock poisoned");
        if slot.is_some() {
            return Ok(());
        }
        let tx = self.statuses.clone();
        let sink: EventSink = Arc::new(move |event| {
            // The pump is gone only once the runtime shuts down.
            let _ = tx.send(translate_event(event));
        });
        let mut primitive = self.factory.create(self.session.src(), sink)?;
        primitive.set_volume(self.default_volume)?;
        debug!(media_id = %self.id(), src = self.session.src(), "audio primitive created");
        *slot = Some(primitive);
        Ok(())
    }

    /// Run `f` against the live primitive. The lock is released on return.
    fn with_primitive<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Box<dyn AudioPrimitive>) -> Result<T>,
    ) -> Result<T> {
        let mut slot = self.primitive.lock().expect("primitive lock poisoned");
        match slot.as_mut() {
            Some(primitive) => f(primitive),
            None => Err(MediaLinkError::Primitive(format!("{op}: no backing handle"))),
        }
    }

    /// Report a primitive fault as an ERROR status.
    fn fault(&self, op: &str, err: &MediaLinkError) {
        warn!(media_id = %self.id(), op, error = %err, "audio primitive fault");
        self.emit(Status::Error(MediaErrorValue::text(err.to_string())));
    }

    fn absorb(&self, op: &str, result: Result<()>) {
        if let Err(e) = result {
            self.fault(op, &e);
        }
    }

    fn not_supported(&self, op: &str) {
        debug!(media_id = %self.id(), op, "not supported by the direct backing");
        self.emit(Status::Error(MediaErrorValue::text(NOT_SUPPORTED)));
    }
}

#[async_trait]
impl MediaControl for DirectControl {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    async fn play(&self, options: PlayOptions, _cancel: &CancellationToken) -> Result<()> {
        if let Err(e) = self.ensure_primitive() {
            self.fault("play", &e);
            return Ok(());
        }
        let result = self.with_primitive("play", |p| {
            if let Some(loops) = options.number_of_loops {
                p.set_looping(loops > 1)?;
            }
            p.play()
        });
        self.absorb("play", result);
        Ok(())
    }

    async fn pause(&self, _cancel: &CancellationToken) -> Result<()> {
        let result = self.with_primitive("pause", |p| p.pause());
        self.absorb("pause", result);
        Ok(())
    }

    async fn stop(&self, _cancel: &CancellationToken) -> Result<()> {
        let result = self.with_primitive("stop", |p| {
            p.pause()?;
            p.set_current_time(0.0)
        });
        match result {
            Ok(()) => self.emit(Status::State(MediaState::Stopped)),
            Err(e) => self.fault("stop", &e),
        }
        Ok(())
    }

    async fn seek_to(&self, milliseconds: f64, _cancel: &CancellationToken) -> Result<()> {
        signature::check("N", &[Arg::Number(milliseconds)])?;
        let result = self.with_primitive("seekTo", |p| p.set_current_time(milliseconds / 1000.0));
        self.absorb("seekTo", result);
        Ok(())
    }

    async fn get_current_position(&self, _cancel: &CancellationToken) -> Result<f64> {
        match self.with_primitive("getCurrentPosition", |p| p.current_time()) {
            Ok(position) => {
                self.emit(Status::Position(position));
                Ok(position)
            }
            Err(e) => {
                // Report and fall back to the last known position.
                self.fault("getCurrentPosition", &e);
                Ok(self.session.position())
            }
        }
    }

    async fn set_volume(&self, level: f64, _cancel: &CancellationToken) -> Result<()> {
        signature::check("N", &[Arg::Number(level)])?;
        let result = self.with_primitive("setVolume", |p| p.set_volume(level));
        self.absorb("setVolume", result);
        Ok(())
    }

    async fn set_rate(&self, rate: f64, _cancel: &CancellationToken) -> Result<()> {
        signature::check("N", &[Arg::Number(rate)])?;
        let result = self.with_primitive("setRate", |p| p.set_playback_rate(rate));
        self.absorb("setRate", result);
        Ok(())
    }

    async fn get_current_amplitude(&self, _cancel: &CancellationToken) -> Result<f64> {
        self.not_supported("getCurrentAmplitude");
        Err(MediaLinkError::NotSupported("amplitude metering".into()))
    }

    async fn start_record(&self, _cancel: &CancellationToken) -> Result<()> {
        self.not_supported("startRecord");
        Ok(())
    }

    async fn stop_record(&self, _cancel: &CancellationToken) -> Result<()> {
        self.not_supported("stopRecord");
        Ok(())
    }

    async fn pause_record(&self, _cancel: &CancellationToken) -> Result<()> {
        self.not_supported("pauseRecord");
        Ok(())
    }

    async fn resume_record(&self, _cancel: &CancellationToken) -> Result<()> {
        self.not_supported("resumeRecord");
        Ok(())
    }

    async fn release(&self, _cancel: &CancellationToken) -> Result<()> {
        let released = self
            .primitive
            .lock()
            .expect("primitive lock poisoned")
            .take();
        if released.is_some() {
            debug!(media_id = %self.id(), "audio primitive released");
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scriptable primitive for exercising the direct backing.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    pub struct PrimitiveState {
        pub playing: bool,
        pub time: f64,
        pub volume: f64,
        pub rate: f64,
        pub looping: bool,
        pub fail_next: bool,
    }

    /// Factory that records every primitive it creates.
    #[derive(Default)]
    pub struct FakeFactory {
        pub created: AtomicUsize,
        pub state: Arc<Mutex<PrimitiveState>>,
        pub sink: Mutex<Option<EventSink>>,
        pub refuse: Mutex<bool>,
    }

    impl FakeFactory {
        pub fn fire(&self, event: PrimitiveEvent) {
            let sink = self.sink.lock().unwrap().clone().expect("no primitive yet");
            sink(event);
        }

        pub fn created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }
    }

    impl PrimitiveFactory for FakeFactory {
        fn create(&self, _src: &str, events: EventSink) -> Result<Box<dyn AudioPrimitive>> {
            if *self.refuse.lock().unwrap() {
                return Err(MediaLinkError::Primitive("decoder unavailable".into()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            *self.sink.lock().unwrap() = Some(events);
            Ok(Box::new(FakePrimitive {
                state: Arc::clone(&self.state),
            }))
        }
    }

    pub struct FakePrimitive {
        state: Arc<Mutex<PrimitiveState>>,
    }

    impl FakePrimitive {
        fn check(&self) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_next {
                state.fail_next = false;
                return Err(MediaLinkError::Primitive("device lost".into()));
            }
            Ok(())
        }
    }

    impl AudioPrimitive for FakePrimitive {
        fn play(&mut self) -> Result<()> {
            self.check()?;
            self.state.lock().unwrap().playing = true;
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.check()?;
            self.state.lock().unwrap().playing = false;
            Ok(())
        }

        fn current_time(&self) -> Result<f64> {
            self.check()?;
            Ok(self.state.lock().unwrap().time)
        }

        fn set_current_time(&mut self, seconds: f64) -> Result<()> {
            self.check()?;
            self.state.lock().unwrap().time = seconds;
            Ok(())
        }

        fn set_volume(&mut self, level: f64) -> Result<()> {
            self.check()?;
            self.state.lock().unwrap().volume = level;
            Ok(())
        }

        fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
            self.check()?;
            self.state.lock().unwrap().rate = rate;
            Ok(())
        }

        fn set_looping(&mut self, looping: bool) -> Result<()> {
            self.check()?;
            self.state.lock().unwrap().looping = looping;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeFactory;
    use super::*;
    use crate::registry::Registry;
    use crate::session::Callbacks;

    type Recorded = Arc<Mutex<Vec<String>>>;

    fn recording_callbacks() -> (Callbacks, Recorded) {
        let log: Recorded = Arc::new(Mutex::new(Vec::new()));
        let (s, e, ok) = (log.clone(), log.clone(), log.clone());
        let callbacks = Callbacks::new()
            .on_status(move |state| s.lock().unwrap().push(format!("state:{state}")))
            .on_error(move |err| e.lock().unwrap().push(format!("error:{err:?}")))
            .on_success(move || ok.lock().unwrap().push("success".into()));
        (callbacks, log)
    }

    fn open(factory: Arc<FakeFactory>, callbacks: Callbacks) -> (Arc<SessionCore>, Arc<dyn MediaControl>) {
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(registry.clone());
        let backend = DirectBackend::new(factory, dispatcher, 0.8);
        let core = Arc::new(SessionCore::new("clip.mp3", callbacks));
        registry.insert(core.clone()).unwrap();
        let control = backend.open(core.clone()).unwrap();
        (core, control)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn unsupported_format_surfaces_as_aborted() {
        let status = translate_event(PrimitiveEvent::Error(MediaErrorCode::NoneSupported));
        assert_eq!(status, Status::Error(MediaErrorValue::code(MediaErrorCode::Aborted)));

        let status = translate_event(PrimitiveEvent::Error(MediaErrorCode::Network));
        assert_eq!(status, Status::Error(MediaErrorValue::code(MediaErrorCode::Network)));
    }

    #[test]
    fn unknown_durations_become_minus_one() {
        assert_eq!(translate_event(PrimitiveEvent::DurationChange(None)), Status::Duration(-1.0));
        assert_eq!(translate_event(PrimitiveEvent::DurationChange(Some(f64::NAN))), Status::Duration(-1.0));
        assert_eq!(translate_event(PrimitiveEvent::DurationChange(Some(0.0))), Status::Duration(-1.0));
        assert_eq!(translate_event(PrimitiveEvent::DurationChange(Some(61.5))), Status::Duration(61.5));
    }

    #[tokio::test]
    async fn construction_creates_primitive_and_reports_starting() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (_core, _control) = open(factory.clone(), callbacks);

        assert_eq!(factory.created(), 1);
        assert_eq!(factory.state.lock().unwrap().volume, 0.8);
        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["state:Starting"]);
    }

    #[tokio::test]
    async fn primitive_events_reach_the_session() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (core, _control) = open(factory.clone(), callbacks);

        factory.fire(PrimitiveEvent::Playing);
        factory.fire(PrimitiveEvent::DurationChange(Some(42.0)));
        factory.fire(PrimitiveEvent::Error(MediaErrorCode::NoneSupported));
        factory.fire(PrimitiveEvent::Ended);
        settle().await;

        assert_eq!(core.duration(), 42.0);
        let log = log.lock().unwrap();
        assert_eq!(log[1], "state:Running");
        assert!(log[2].contains("Aborted"));
        assert_eq!(&log[3..], ["state:Stopped", "success"]);
    }

    #[tokio::test]
    async fn release_then_play_recreates_the_primitive() {
        let factory = Arc::new(FakeFactory::default());
        let (_core, control) = open(factory.clone(), Callbacks::new());
        let cancel = CancellationToken::new();

        control.release(&cancel).await.unwrap();
        control.play(PlayOptions::default(), &cancel).await.unwrap();

        assert_eq!(factory.created(), 2);
        assert!(factory.state.lock().unwrap().playing);
    }

    #[tokio::test]
    async fn stop_rewinds_and_reports_stopped() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (_core, control) = open(factory.clone(), callbacks);
        let cancel = CancellationToken::new();

        control.play(PlayOptions::default(), &cancel).await.unwrap();
        control.seek_to(2500.0, &cancel).await.unwrap();
        assert_eq!(factory.state.lock().unwrap().time, 2.5);

        control.stop(&cancel).await.unwrap();
        settle().await;
        let state = factory.state.lock().unwrap();
        assert!(!state.playing);
        assert_eq!(state.time, 0.0);
        assert_eq!(&log.lock().unwrap()[1..], ["state:Stopped", "success"]);
    }

    #[tokio::test]
    async fn current_position_is_read_and_cached() {
        let factory = Arc::new(FakeFactory::default());
        let (core, control) = open(factory.clone(), Callbacks::new());
        factory.state.lock().unwrap().time = 7.25;

        let position = control.get_current_position(&CancellationToken::new()).await.unwrap();
        assert_eq!(position, 7.25);
        settle().await;
        assert_eq!(core.position(), 7.25);
    }

    #[tokio::test]
    async fn primitive_faults_become_error_statuses() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (_core, control) = open(factory.clone(), callbacks);
        factory.state.lock().unwrap().fail_next = true;

        assert!(control.pause(&CancellationToken::new()).await.is_ok());
        settle().await;
        let log = log.lock().unwrap();
        assert!(log[1].starts_with("error:"));
        assert!(log[1].contains("device lost"));
    }

    #[tokio::test]
    async fn operations_on_a_released_session_report_errors() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (_core, control) = open(factory, callbacks);
        let cancel = CancellationToken::new();

        control.release(&cancel).await.unwrap();
        control.pause(&cancel).await.unwrap();
        assert_eq!(control.get_current_position(&cancel).await.unwrap(), -1.0);
        settle().await;

        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|l| l.contains("no backing handle")).count(), 2);
    }

    #[tokio::test]
    async fn recording_is_not_supported() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (_core, control) = open(factory, callbacks);
        let cancel = CancellationToken::new();

        control.start_record(&cancel).await.unwrap();
        control.stop_record(&cancel).await.unwrap();
        settle().await;
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|l| l.contains(NOT_SUPPORTED)).count(), 2);
    }

    #[tokio::test]
    async fn factory_failure_is_reported_not_raised() {
        let factory = Arc::new(FakeFactory::default());
        *factory.refuse.lock().unwrap() = true;
        let (callbacks, log) = recording_callbacks();
        let (_core, control) = open(factory.clone(), callbacks);

        assert!(control.play(PlayOptions::default(), &CancellationToken::new()).await.is_ok());
        settle().await;
        let log = log.lock().unwrap();
        assert!(log[0].contains("decoder unavailable"));
        assert_eq!(log[1], "state:Starting");
        assert!(log[2].contains("decoder unavailable"));
    }

    #[tokio::test]
    async fn loops_and_volume_reach_the_primitive() {
        let factory = Arc::new(FakeFactory::default());
        let (_core, control) = open(factory.clone(), Callbacks::new());
        let cancel = CancellationToken::new();

        let options = PlayOptions {
            number_of_loops: Some(3),
            ..Default::default()
        };
        control.play(options, &cancel).await.unwrap();
        control.set_volume(0.25, &cancel).await.unwrap();
        control.set_rate(1.5, &cancel).await.unwrap();

        let state = factory.state.lock().unwrap();
        assert!(state.looping);
        assert_eq!(state.volume, 0.25);
        assert_eq!(state.rate, 1.5);
        drop(state);
        assert!(control.seek_to(f64::NAN, &cancel).await.is_err());
    }

    #[tokio::test]
    async fn stop_is_reported_after_earlier_primitive_events() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (_core, control) = open(factory.clone(), callbacks);
        let cancel = CancellationToken::new();

        control.play(PlayOptions::default(), &cancel).await.unwrap();
        factory.fire(PrimitiveEvent::Playing);
        control.stop(&cancel).await.unwrap();
        settle().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["state:Starting", "state:Running", "state:Stopped", "success"]
        );
    }

    #[tokio::test]
    async fn position_and_faults_keep_their_place_in_line() {
        let factory = Arc::new(FakeFactory::default());
        let (callbacks, log) = recording_callbacks();
        let (core, control) = open(factory.clone(), callbacks);
        let cancel = CancellationToken::new();

        factory.fire(PrimitiveEvent::DurationChange(Some(30.0)));
        factory.state.lock().unwrap().fail_next = true;
        control.pause(&cancel).await.unwrap();
        factory.fire(PrimitiveEvent::Ended);
        settle().await;

        assert_eq!(core.duration(), 30.0);
        let log = log.lock().unwrap();
        assert_eq!(log[0], "state:Starting");
        assert!(log[1].contains("device lost"));
        assert_eq!(&log[2..], ["state:Stopped", "success"]);
    }

    #[test]
    fn open_outside_a_runtime_is_an_error() {
        let registry = Arc::new(Registry::new());
        let backend = DirectBackend::new(
            Arc::new(FakeFactory::default()),
            Dispatcher::new(registry),
            1.0,
        );
        let core = Arc::new(SessionCore::new("clip.mp3", Callbacks::new()));
        let err = backend.open(core).err().expect("open should fail");
        assert!(matches!(err, MediaLinkError::RuntimeUnavailable));
    }
}
