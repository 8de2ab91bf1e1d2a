//! Readiness gate and playback session lifecycle
//!
//! Playback may only start once both the render surface and the first layout
//! assignment exist, and either can arrive first, from different threads. The
//! coordinator holds both flags and the active session behind one mutex so
//! the check-and-start is a single critical section: a session starts at most
//! once per arm/disarm cycle.

use std::fmt;
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};

/// Handle to an active playback session owned by the host
///
/// The core never interprets session errors; its only obligation toward the
/// decoder collaborator is to stop the session on teardown or disconnect.
pub trait PlaybackSession: Send {
    /// Stop playback and release the session's resources
    fn stop(&mut self);
}

/// Creates a playback session when the gate opens
pub type SessionFactory = Box<dyn FnMut() -> anyhow::Result<Box<dyn PlaybackSession>> + Send>;

/// Lifecycle notifications for the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The gate opened and a session was created
    Started,
    /// The active session was stopped (disconnect or teardown)
    Stopped,
    /// Session creation failed; the gate stays armed
    Failed(String),
}

/// Observable gate phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    SurfaceOnly,
    LayoutOnly,
    Started,
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatePhase::Idle => "idle",
            GatePhase::SurfaceOnly => "surface-only",
            GatePhase::LayoutOnly => "layout-only",
            GatePhase::Started => "started",
        };
        write!(f, "{}", name)
    }
}

struct GateState {
    surface_ready: bool,
    layout_ready: bool,
    session: Option<Box<dyn PlaybackSession>>,
    factory: SessionFactory,
}

impl GateState {
    fn phase(&self) -> GatePhase {
        if self.session.is_some() {
            GatePhase::Started
        } else {
            match (self.surface_ready, self.layout_ready) {
                (true, false) => GatePhase::SurfaceOnly,
                (false, true) => GatePhase::LayoutOnly,
                // Both true without a session only exists transiently inside
                // the start critical section; observers never see it.
                _ => GatePhase::Idle,
            }
        }
    }
}

/// Gate coordinating surface readiness, layout readiness, and session start
pub struct ReadinessCoordinator {
    state: Mutex<GateState>,
    events_tx: Sender<SessionEvent>,
}

impl ReadinessCoordinator {
    /// Create a coordinator around the host's session factory.
    ///
    /// Returns the receiver for lifecycle events.
    pub fn new(factory: SessionFactory) -> (Self, Receiver<SessionEvent>) {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        (
            Self {
                state: Mutex::new(GateState {
                    surface_ready: false,
                    layout_ready: false,
                    session: None,
                    factory,
                }),
                events_tx,
            },
            events_rx,
        )
    }

    /// The render surface exists; fired once per GPU context lifetime
    pub fn surface_ready(&self) {
        let mut state = self.state.lock().expect("readiness state poisoned");
        state.surface_ready = true;
        log::debug!("Surface ready (phase: {})", state.phase());
        self.try_start(&mut state);
    }

    /// A layout assignment arrived from the network context
    pub fn layout_ready(&self) {
        let mut state = self.state.lock().expect("readiness state poisoned");
        state.layout_ready = true;
        log::debug!("Layout ready (phase: {})", state.phase());
        self.try_start(&mut state);
    }

    /// Start a session if both conditions hold and none is active.
    ///
    /// Runs inside the caller's lock so two contexts can never both observe
    /// "not started" and start twice.
    fn try_start(&self, state: &mut GateState) {
        if !(state.surface_ready && state.layout_ready) || state.session.is_some() {
            return;
        }

        match (state.factory)() {
            Ok(session) => {
                state.session = Some(session);
                log::info!("Playback session started");
                let _ = self.events_tx.send(SessionEvent::Started);
            }
            Err(e) => {
                log::error!("Failed to start playback session: {:#}", e);
                let _ = self.events_tx.send(SessionEvent::Failed(e.to_string()));
            }
        }
    }

    /// Network disconnect: stop the session and disarm the layout flag.
    ///
    /// The surface flag survives since the render surface persists across
    /// reconnects; a later layout assignment alone re-opens the gate.
    pub fn disconnect(&self) {
        let mut state = self.state.lock().expect("readiness state poisoned");
        state.layout_ready = false;
        self.stop_session(&mut state);
        log::info!("Disconnected (phase: {})", state.phase());
    }

    /// Full teardown: stop the session and reset both flags
    pub fn teardown(&self) {
        let mut state = self.state.lock().expect("readiness state poisoned");
        state.surface_ready = false;
        state.layout_ready = false;
        self.stop_session(&mut state);
        log::info!("Gate torn down");
    }

    fn stop_session(&self, state: &mut GateState) {
        if let Some(mut session) = state.session.take() {
            session.stop();
            let _ = self.events_tx.send(SessionEvent::Stopped);
        }
    }

    /// Current phase, for status display and tests
    pub fn phase(&self) -> GatePhase {
        self.state.lock().expect("readiness state poisoned").phase()
    }

    /// Whether a session is active
    pub fn is_started(&self) -> bool {
        self.phase() == GatePhase::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession;

    impl PlaybackSession for CountingSession {
        fn stop(&mut self) {}
    }

    fn counting_factory(starts: Arc<AtomicUsize>) -> SessionFactory {
        Box::new(move || {
            starts.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSession) as Box<dyn PlaybackSession>)
        })
    }

    #[test]
    fn test_either_order_starts_once() {
        for surface_first in [true, false] {
            let starts = Arc::new(AtomicUsize::new(0));
            let (gate, _events) = ReadinessCoordinator::new(counting_factory(starts.clone()));

            if surface_first {
                gate.surface_ready();
                assert_eq!(gate.phase(), GatePhase::SurfaceOnly);
                gate.layout_ready();
            } else {
                gate.layout_ready();
                assert_eq!(gate.phase(), GatePhase::LayoutOnly);
                gate.surface_ready();
            }

            assert_eq!(gate.phase(), GatePhase::Started);
            assert_eq!(starts.load(Ordering::SeqCst), 1);

            // Repeated events do not restart
            gate.layout_ready();
            gate.surface_ready();
            assert_eq!(starts.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_concurrent_delivery_starts_once() {
        for _ in 0..50 {
            let starts = Arc::new(AtomicUsize::new(0));
            let (gate, _events) = ReadinessCoordinator::new(counting_factory(starts.clone()));
            let gate = Arc::new(gate);

            let a = {
                let gate = gate.clone();
                std::thread::spawn(move || gate.surface_ready())
            };
            let b = {
                let gate = gate.clone();
                std::thread::spawn(move || gate.layout_ready())
            };
            a.join().unwrap();
            b.join().unwrap();

            assert_eq!(starts.load(Ordering::SeqCst), 1);
            assert!(gate.is_started());
        }
    }

    #[test]
    fn test_disconnect_rearms_on_layout_alone() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (gate, events) = ReadinessCoordinator::new(counting_factory(starts.clone()));

        gate.surface_ready();
        gate.layout_ready();
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        gate.disconnect();
        assert!(!gate.is_started());
        // Surface flag survives the disconnect
        assert_eq!(gate.phase(), GatePhase::SurfaceOnly);

        // Layout alone resumes playback
        gate.layout_ready();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert!(gate.is_started());

        let seen: Vec<_> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                SessionEvent::Started,
                SessionEvent::Stopped,
                SessionEvent::Started
            ]
        );
    }

    #[test]
    fn test_teardown_resets_surface_flag() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (gate, _events) = ReadinessCoordinator::new(counting_factory(starts.clone()));

        gate.surface_ready();
        gate.layout_ready();
        gate.teardown();
        assert_eq!(gate.phase(), GatePhase::Idle);

        // Layout alone is no longer enough after a full teardown
        gate.layout_ready();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(gate.phase(), GatePhase::LayoutOnly);
    }

    #[test]
    fn test_factory_failure_keeps_gate_armed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let factory_attempts = attempts.clone();
        let factory: SessionFactory = Box::new(move || {
            let n = factory_attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                anyhow::bail!("stream failed")
            }
            Ok(Box::new(CountingSession) as Box<dyn PlaybackSession>)
        });
        let (gate, events) = ReadinessCoordinator::new(factory);

        gate.surface_ready();
        gate.layout_ready();
        assert!(!gate.is_started());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Failed("stream failed".to_string())
        );

        // A fresh layout event retries the start
        gate.layout_ready();
        assert!(gate.is_started());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Started);
    }
}
