use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::transcript::Segment;

/// Model tier loaded for every invocation. There is deliberately no way to
/// override this from the command line.
pub const MODEL_TIER: &str = "base";

pub trait SpeechToText {
    fn transcribe(&self, audio_path: &Path) -> Result<Vec<Segment>>;
}

/// Obtains an engine for the fixed model tier and runs it against the given
/// audio file. The segment list is returned exactly as the engine produced
/// it; any failure propagates unchanged.
pub fn transcribe_file<E, F>(load: F, audio_path: &Path) -> Result<Vec<Segment>>
where
    F: FnOnce(&str) -> Result<E>,
    E: SpeechToText,
{
    debug!("Loading '{MODEL_TIER}' model");
    let engine = load(MODEL_TIER)?;
    engine.transcribe(audio_path)
}
