use crate::core::{Format, TaskRepresentation};

/// Engine config struct
///
/// Capacities (chunk size, queue length, ring length, accumulator length) are
/// const parameters of [`Mux`](crate::Mux); this struct carries the runtime
/// knobs. All values are fixed at construction.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Whether submission may block when the queue is full. In non-blocking
    /// mode chunks are dropped instead and the loss is advertised through the
    /// `@` separator of a later message. Interrupt-context submissions never
    /// block regardless.
    pub blocking: bool,
    /// Pause in milliseconds used while waiting for the queue or for the
    /// in-flight buffer. Bounds pump shutdown latency.
    pub pause_millis: u32,
    /// Period in milliseconds after which a partially filled accumulator is
    /// transmitted anyway. The shorter the value the more prompt the output.
    pub refresh_millis: u32,
    /// Representation of the sending task in the message header.
    pub task_representation: TaskRepresentation,
    /// Rendering of the numeric producer id in the header.
    pub task_id_format: Format,
    /// Rendering of the monotonic-time header field, `None` to omit it.
    pub time_format: Option<Format>,
    /// If true, submissions from interrupt context are accepted and tagged
    /// with the shared interrupt id. If false they are discarded at the call
    /// site.
    pub log_from_interrupt: bool,
    /// If true, positive numbers are prepended with a space to align with
    /// negatives.
    pub align_signed: bool,
    /// If true, a successful first-time registration emits an announcement
    /// line through the regular pipeline.
    pub announce_registration: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            blocking: true,
            pause_millis: 100,
            refresh_millis: 1000,
            task_representation: TaskRepresentation::Id,
            task_id_format: Format::X2,
            time_format: Some(Format::D5),
            log_from_interrupt: false,
            align_signed: false,
            announce_registration: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
