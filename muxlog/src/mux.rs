//! Engine handle

use core::sync::atomic::{AtomicBool, Ordering};
use embassy_sync::blocking_mutex::raw::RawMutex;
use muxlog_driver::{Host, Sink};

use crate::chunk::ChunkBuilder;
use crate::config::Config;
use crate::core::{Format, TaskId, TaskRepresentation, Topic};
use crate::pump::Pump;
use crate::queue::SubmissionQueue;
use crate::registry::{NAME_CAPACITY, TaskRegistry, TopicRegistry};
use crate::writer::LineWriter;

/// The log multiplexing engine
///
/// Const parameters size every buffer at construction:
/// * `K` — chunk size in bytes, tag byte included. At least 2.
/// * `Q` — submission queue length in chunks.
/// * `R` — reorder ring length in chunks.
/// * `T` — transmit arena length in chunks (two arenas are kept).
///
/// `M` selects the mutex implementation guarding the registries and the
/// submission channel; use `CriticalSectionRawMutex` when producers include
/// interrupt handlers.
///
/// The engine is shared: producers call [`Mux::register_current_task`] once
/// and then [`Mux::line`] per message from any registered thread, while one
/// dedicated thread runs the [`Pump`] obtained from [`Mux::pump`]. Construct
/// it early, before memory pressure, and lend it out as `&'static` (leaked or
/// placed in a static cell) so completion interrupts can address its flags.
pub struct Mux<M: RawMutex, const K: usize, const Q: usize, const R: usize, const T: usize> {
    pub(crate) config: Config,
    pub(crate) queue: SubmissionQueue<M, K, Q>,
    pub(crate) registry: TaskRegistry<M>,
    pub(crate) topics: TopicRegistry<M>,
    pub(crate) in_flight: AtomicBool,
    pub(crate) refresh_needed: AtomicBool,
    keep_running: AtomicBool,
}

impl<M: RawMutex, const K: usize, const Q: usize, const R: usize, const T: usize>
    Mux<M, K, Q, R, T>
{
    pub fn new(config: Config) -> Self {
        Self {
            config,
            queue: SubmissionQueue::new(),
            registry: TaskRegistry::new(),
            topics: TopicRegistry::new(),
            in_flight: AtomicBool::new(false),
            refresh_needed: AtomicBool::new(false),
            keep_running: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers the calling thread as a producer, idempotently.
    ///
    /// Returns the assigned id, or [`TaskId::INVALID`] once all 254 regular
    /// ids are spent or when called from interrupt context; such callers'
    /// messages are discarded at submission. Interrupt handlers need no
    /// registration, they share [`TaskId::ISR`].
    pub fn register_current_task<H: Host>(&self, host: &H, name: Option<&str>) -> TaskId {
        if host.is_interrupt_context() {
            return TaskId::INVALID;
        }
        let (id, registered) = self.registry.register(host.current_thread_id(), name);
        if registered && self.config.announce_registration {
            let mut line = self.line(host);
            line.str("-=- Registered task: ");
            match name {
                Some(name) => line.str(name),
                None => line.chr('?'),
            };
            line.str(" (")
                .uint(u8::from(id).into(), Format::DEFAULT)
                .str(") -=-");
        }
        id
    }

    /// The name supplied when `id` was registered.
    pub fn task_name(&self, id: TaskId) -> Option<heapless::String<NAME_CAPACITY>> {
        self.registry.name_of(id)
    }

    pub fn register_topic(&self, topic: Topic, prefix: &'static str) {
        self.topics.register(topic, prefix);
    }

    /// Begins a message for the calling producer and emits its header.
    ///
    /// Dropping the returned writer terminates the message. The writer is
    /// inert when the caller may not log: interrupt context with interrupt
    /// logging disabled, or an unregistered/over-cap thread.
    pub fn line<'a, H: Host>(&'a self, host: &'a H) -> LineWriter<'a, H, M, K, Q> {
        let tag = self.submission_tag(host);
        let builder = ChunkBuilder::new(&self.queue, host, tag, self.config.blocking);
        let mut writer = LineWriter::new(builder, self.config.align_signed);
        if writer.is_active() {
            self.emit_header(host, &mut writer);
        }
        writer
    }

    /// Like [`Mux::line`], prefixed for a registered topic.
    ///
    /// The writer is inert when `topic` was never registered.
    pub fn line_for<'a, H: Host>(&'a self, host: &'a H, topic: Topic) -> LineWriter<'a, H, M, K, Q> {
        match self.topics.prefix_of(topic) {
            Some(prefix) => {
                let mut writer = self.line(host);
                writer.str(prefix).push(b' ');
                writer
            }
            None => LineWriter::new(
                ChunkBuilder::new(&self.queue, host, TaskId::INVALID, self.config.blocking),
                self.config.align_signed,
            ),
        }
    }

    /// Creates the consumer; the caller dedicates a thread to [`Pump::run`].
    pub fn pump<H, S>(&'static self, host: &'static H, sink: &'static S) -> Pump<H, S, M, K, Q, R, T>
    where
        H: Host,
        S: Sink,
        M: 'static,
    {
        Pump::new(self, host, sink)
    }

    /// Asks the pump to exit at its next iteration boundary. Chunks still
    /// queued or parked are dropped.
    pub fn shutdown(&self) {
        self.keep_running.store(false, Ordering::Relaxed);
    }

    pub(crate) fn keep_running(&self) -> bool {
        self.keep_running.load(Ordering::Relaxed)
    }

    fn submission_tag<H: Host>(&self, host: &H) -> TaskId {
        if host.is_interrupt_context() {
            if self.config.log_from_interrupt {
                TaskId::ISR
            } else {
                TaskId::INVALID
            }
        } else {
            self.registry.current(host.current_thread_id())
        }
    }

    fn emit_header<'a, H: Host>(&self, host: &H, writer: &mut LineWriter<'a, H, M, K, Q>) {
        let mut first = true;
        match self.config.task_representation {
            TaskRepresentation::None => {}
            TaskRepresentation::Id => {
                let tag = writer.tag();
                writer.uint(u8::from(tag).into(), self.config.task_id_format);
                self.separator(writer, &mut first);
            }
            TaskRepresentation::Name => {
                if host.is_interrupt_context() {
                    writer.chr('?');
                } else {
                    match self.registry.name_of(writer.tag()) {
                        Some(name) => writer.str(&name),
                        None => writer.chr('?'),
                    };
                }
                self.separator(writer, &mut first);
            }
        }
        if let Some(format) = self.config.time_format {
            writer.uint(host.now_millis(), format);
            self.separator(writer, &mut first);
        }
    }

    /// The first separator of a message turns into `@` when chunks were lost
    /// since the previous header; reading the marker clears it.
    fn separator<'a, H: Host>(&self, writer: &mut LineWriter<'a, H, M, K, Q>, first: &mut bool) {
        let marked = *first && self.queue.take_truncated();
        writer.push(if marked { b'@' } else { b' ' });
        *first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TestHost, collect_message};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type TestMux = Mux<CriticalSectionRawMutex, 8, 64, 8, 8>;

    fn quiet_config() -> Config {
        let mut config = Config::new();
        config.pause_millis = 0;
        config.time_format = None;
        config
    }

    #[test]
    fn test_header_and_payload_round_trip() {
        let mux = TestMux::new(quiet_config());
        let host = TestHost::new();
        mux.register_current_task(&host, Some("alpha"));

        mux.line(&host).str("hi");
        assert_eq!(collect_message(&mux.queue, &host).as_slice(), b"01 hi\n");
    }

    #[test]
    fn test_header_with_time_field() {
        let mut config = quiet_config();
        config.time_format = Some(Format::D5);
        let mux = TestMux::new(config);
        let host = TestHost::new();
        host.set_now(123);
        mux.register_current_task(&host, None);

        mux.line(&host).str("hi");
        assert_eq!(
            collect_message(&mux.queue, &host).as_slice(),
            b"01 00123 hi\n"
        );
    }

    #[test]
    fn test_name_representation() {
        let mut config = quiet_config();
        config.task_representation = TaskRepresentation::Name;
        let mux = TestMux::new(config);
        let host = TestHost::new();
        mux.register_current_task(&host, Some("alpha"));

        mux.line(&host).str("hi");
        assert_eq!(collect_message(&mux.queue, &host).as_slice(), b"alpha hi\n");
    }

    #[test]
    fn test_unregistered_thread_is_silent() {
        let mux = TestMux::new(quiet_config());
        let host = TestHost::new();

        mux.line(&host).str("lost");
        assert!(collect_message(&mux.queue, &host).is_empty());
    }

    #[test]
    fn test_interrupt_logging_gate() {
        let mux = TestMux::new(quiet_config());
        let host = TestHost::new();
        host.set_interrupt(true);

        mux.line(&host).str("isr");
        assert!(collect_message(&mux.queue, &host).is_empty());

        let mut config = quiet_config();
        config.log_from_interrupt = true;
        let mux = TestMux::new(config);
        mux.line(&host).str("isr");
        // the shared interrupt id renders as ff
        assert_eq!(collect_message(&mux.queue, &host).as_slice(), b"ff isr\n");
    }

    #[test]
    fn test_truncation_marks_first_separator() {
        let mux = TestMux::new(quiet_config());
        let host = TestHost::new();
        mux.register_current_task(&host, None);

        mux.queue.mark_truncated();
        mux.line(&host).str("after loss");
        assert_eq!(
            collect_message(&mux.queue, &host).as_slice(),
            b"01@after loss\n"
        );

        // the marker does not persist past one header
        mux.line(&host).str("clean");
        assert_eq!(collect_message(&mux.queue, &host).as_slice(), b"01 clean\n");
    }

    #[test]
    fn test_topic_lines() {
        let mux = TestMux::new(quiet_config());
        let host = TestHost::new();
        mux.register_current_task(&host, None);

        mux.line_for(&host, Topic::new(1)).str("dropped");
        assert!(collect_message(&mux.queue, &host).is_empty());

        mux.register_topic(Topic::new(1), "system");
        mux.line_for(&host, Topic::new(1)).str("up");
        assert_eq!(
            collect_message(&mux.queue, &host).as_slice(),
            b"01 system up\n"
        );
    }

    #[test]
    fn test_registration_announcement() {
        let mut config = quiet_config();
        config.announce_registration = true;
        let mux = TestMux::new(config);
        let host = TestHost::new();

        mux.register_current_task(&host, Some("alpha"));
        assert_eq!(
            collect_message(&mux.queue, &host).as_slice(),
            b"01 -=- Registered task: alpha (1) -=-\n"
        );

        // re-registration announces nothing
        mux.register_current_task(&host, Some("alpha"));
        assert!(collect_message(&mux.queue, &host).is_empty());
    }

    #[test]
    fn test_registration_rejected_in_interrupt_context() {
        let mux = TestMux::new(quiet_config());
        let host = TestHost::new();
        host.set_interrupt(true);
        assert_eq!(mux.register_current_task(&host, None), TaskId::INVALID);
    }
}
