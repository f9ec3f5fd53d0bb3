use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quickscribe",
    about = "Quickscribe - Timestamped Audio Transcription",
    long_about = "Transcribes a single audio file with the Whisper base model and prints the timestamped transcript segments as JSON on standard output.",
    after_help = "EXAMPLES:\n    # Transcribe an audio file\n    quickscribe my_audio.wav\n\n    # Pipe the segments into jq\n    quickscribe my_audio.wav | jq '.[].text'"
)]
pub struct Cli {
    /// Path to the audio file to transcribe
    pub audio_file: PathBuf,
}
