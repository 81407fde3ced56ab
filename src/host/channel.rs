//! Per-connection transport: stage pipeline and single-threaded event loop.
//!
//! Every connection owns one [`Channel`]: an ordered pipeline of named packet
//! stages ending at the host's terminal packet-processing stage, plus a
//! dedicated event loop thread that is the only place pipeline mutation is
//! allowed to happen.
//!
//! # Thread Safety
//!
//! [`EventLoop::submit`] is safe from any thread; the submitted closure runs on
//! the loop thread, in submission order, whenever that thread gets to it. There
//! is no completion signal and no timeout: a task submitted to a closed channel
//! is silently dropped, matching how a dead connection swallows late work.

use std::fmt;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

/// Name of the host's own terminal packet-processing stage.
///
/// Interception stages are always inserted immediately before this stage so
/// they observe every message before the host's logic does.
pub const TERMINAL_STAGE: &str = "packet_handler";

/// Direction of a message moving through the pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PacketDirection {
    /// Client → host
    Inbound,
    /// Host → client
    Outbound,
}

/// A named message-processing unit inside a connection pipeline.
pub trait PacketStage: Send {
    /// Observes one message passing through the pipeline.
    ///
    /// Runs on the connection's own event loop thread; the payload may be
    /// rewritten in place.
    fn on_packet(&mut self, direction: PacketDirection, payload: &mut Vec<u8>);
}

/// The host's terminal stage; a sentinel in this model.
struct TerminalStage;

impl PacketStage for TerminalStage {
    fn on_packet(&mut self, _direction: PacketDirection, _payload: &mut Vec<u8>) {}
}

struct NamedStage {
    name: String,
    stage: Box<dyn PacketStage>,
}

/// Ordered sequence of named stages, always ending with [`TERMINAL_STAGE`].
pub struct Pipeline {
    stages: Vec<NamedStage>,
}

impl Pipeline {
    fn new() -> Self {
        Pipeline {
            stages: vec![NamedStage {
                name: TERMINAL_STAGE.to_string(),
                stage: Box::new(TerminalStage),
            }],
        }
    }

    /// `true` if a stage with the given name is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    /// Inserts a stage immediately before the named anchor stage.
    ///
    /// Returns `false` (and drops the stage) when the anchor is absent.
    pub fn add_before(
        &mut self,
        anchor: &str,
        name: impl Into<String>,
        stage: Box<dyn PacketStage>,
    ) -> bool {
        match self.stages.iter().position(|s| s.name == anchor) {
            Some(idx) => {
                self.stages.insert(
                    idx,
                    NamedStage {
                        name: name.into(),
                        stage,
                    },
                );
                true
            }
            None => false,
        }
    }

    /// Removes the stage with the given name, returning whether one was present
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.stages.len();
        self.stages.retain(|s| s.name != name);
        before != self.stages.len()
    }

    /// Stage names in pipeline order
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name.clone()).collect()
    }

    /// Runs one message through every stage in order
    pub fn dispatch(&mut self, direction: PacketDirection, payload: &mut Vec<u8>) {
        for named in &mut self.stages {
            named.stage.on_packet(direction, payload);
        }
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

/// The connection's own single-threaded execution context.
pub struct EventLoop {
    tx: Mutex<Option<Sender<Task>>>,
}

impl EventLoop {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Task>();
        thread::spawn(move || {
            while let Ok(task) = rx.recv() {
                task();
            }
        });
        EventLoop {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Submits a task to run on the loop thread.
    ///
    /// Thread-safe from any caller thread. The task runs whenever the loop gets
    /// to it; once the channel has closed, the task is dropped without notice.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        if let Some(tx) = lock!(self.tx).as_ref() {
            let _ = tx.send(Box::new(task));
        }
    }

    fn close(&self) {
        lock!(self.tx).take();
    }

    fn is_open(&self) -> bool {
        lock!(self.tx).is_some()
    }
}

/// One connection's transport object: pipeline plus owning event loop.
pub struct Channel {
    pipeline: Mutex<Pipeline>,
    event_loop: EventLoop,
}

impl Channel {
    /// Creates an open channel whose pipeline holds only the terminal stage
    #[must_use]
    pub fn open() -> Arc<Self> {
        Arc::new(Channel {
            pipeline: Mutex::new(Pipeline::new()),
            event_loop: EventLoop::spawn(),
        })
    }

    /// The channel's own event loop
    #[must_use]
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub(crate) fn pipeline_mut(&self) -> MutexGuard<'_, Pipeline> {
        lock!(self.pipeline)
    }

    /// Stage names in pipeline order
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        lock!(self.pipeline).stage_names()
    }

    /// `true` if a stage with the given name is present
    #[must_use]
    pub fn contains_stage(&self, name: &str) -> bool {
        lock!(self.pipeline).contains(name)
    }

    /// Runs one message through the pipeline in stage order.
    ///
    /// This is the host's own read path; callers other than the owning event
    /// loop should schedule it there instead of calling directly.
    pub fn dispatch(&self, direction: PacketDirection, payload: &mut Vec<u8>) {
        lock!(self.pipeline).dispatch(direction, payload);
    }

    /// Closes the channel; later submissions are silently dropped
    pub fn close(&self) {
        self.event_loop.close();
    }

    /// `true` until [`Channel::close`] is called
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.event_loop.is_open()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    fn settle(channel: &Channel) {
        let (tx, rx) = mpsc::channel();
        channel.event_loop().submit(move || {
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    struct Tap;

    impl PacketStage for Tap {
        fn on_packet(&mut self, _direction: PacketDirection, _payload: &mut Vec<u8>) {}
    }

    #[test]
    fn test_pipeline_starts_with_terminal_stage() {
        let channel = Channel::open();
        assert_eq!(channel.stage_names(), vec![TERMINAL_STAGE.to_string()]);
    }

    #[test]
    fn test_add_before_positions_stage() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.add_before(TERMINAL_STAGE, "tap", Box::new(Tap)));
        assert_eq!(pipeline.stage_names(), vec!["tap", TERMINAL_STAGE]);

        assert!(!pipeline.add_before("missing_anchor", "other", Box::new(Tap)));
        assert!(pipeline.remove("tap"));
        assert!(!pipeline.remove("tap"));
        assert_eq!(pipeline.stage_names(), vec![TERMINAL_STAGE]);
    }

    #[test]
    fn test_event_loop_runs_tasks_in_order() {
        let channel = Channel::open();
        let (tx, rx) = mpsc::channel();
        for i in 0..4 {
            let tx = tx.clone();
            channel.event_loop().submit(move || {
                let _ = tx.send(i);
            });
        }
        let order: Vec<i32> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_submit_after_close_is_dropped() {
        let channel = Channel::open();
        settle(&channel);
        channel.close();
        assert!(!channel.is_open());

        let (tx, rx) = mpsc::channel();
        channel.event_loop().submit(move || {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_dispatch_visits_stages() {
        struct Marker(u8);
        impl PacketStage for Marker {
            fn on_packet(&mut self, _d: PacketDirection, payload: &mut Vec<u8>) {
                payload.push(self.0);
            }
        }

        let mut pipeline = Pipeline::new();
        pipeline.add_before(TERMINAL_STAGE, "b", Box::new(Marker(2)));
        pipeline.add_before("b", "a", Box::new(Marker(1)));

        let mut payload = Vec::new();
        pipeline.dispatch(PacketDirection::Inbound, &mut payload);
        assert_eq!(payload, vec![1, 2]);
    }
}
