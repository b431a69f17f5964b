use biometrics::{Collector, Counter, Moments};

pub(crate) static SEND_REQUESTS: Counter = Counter::new("chatterbox.send.requests");
pub(crate) static SEND_BUSY: Counter = Counter::new("chatterbox.send.busy");
pub(crate) static SEND_DURATION: Moments = Moments::new("chatterbox.send.duration_seconds");

pub(crate) static STREAM_OPENED: Counter = Counter::new("chatterbox.stream.opened");
pub(crate) static STREAM_CHUNKS: Counter = Counter::new("chatterbox.stream.chunks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatterbox.stream.bytes");
pub(crate) static STREAM_COMPLETED: Counter = Counter::new("chatterbox.stream.completed");
pub(crate) static STREAM_UNAVAILABLE: Counter = Counter::new("chatterbox.stream.unavailable");
pub(crate) static STREAM_TTFB: Moments = Moments::new("chatterbox.stream.ttfb_seconds");

pub(crate) static FALLBACK_REQUESTS: Counter = Counter::new("chatterbox.fallback.requests");
pub(crate) static FALLBACK_FAILURES: Counter = Counter::new("chatterbox.fallback.failures");

pub(crate) static CANCEL_REQUESTS: Counter = Counter::new("chatterbox.cancel.requests");
pub(crate) static CANCEL_OBSERVED: Counter = Counter::new("chatterbox.cancel.observed");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&SEND_REQUESTS);
    collector.register_counter(&SEND_BUSY);
    collector.register_moments(&SEND_DURATION);

    collector.register_counter(&STREAM_OPENED);
    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_COMPLETED);
    collector.register_counter(&STREAM_UNAVAILABLE);
    collector.register_moments(&STREAM_TTFB);

    collector.register_counter(&FALLBACK_REQUESTS);
    collector.register_counter(&FALLBACK_FAILURES);

    collector.register_counter(&CANCEL_REQUESTS);
    collector.register_counter(&CANCEL_OBSERVED);
}
