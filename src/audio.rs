//! Audio cue output

use tracing::debug;

/// Something that can play named audio cues
pub trait AudioSink {
    fn play(&mut self, cue: &str);
}

/// Headless sink: cues go to the log
#[derive(Debug, Default)]
pub struct TracingAudioSink;

impl AudioSink for TracingAudioSink {
    fn play(&mut self, cue: &str) {
        debug!(cue, "Audio cue");
    }
}

/// Discards every cue
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play(&mut self, _cue: &str) {}
}
