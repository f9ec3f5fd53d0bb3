mod cli;
mod download;
mod runner;
mod transcript;
mod whisper;

use anyhow::Result;
use clap::Parser;
use log::info;

use cli::Cli;
use whisper::transcriber::WhisperEngine;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    info!("Transcribing {}", cli.audio_file.display());

    let segments = runner::transcribe_file(WhisperEngine::load, &cli.audio_file)?;
    info!("Transcription completed: {} segments", segments.len());

    // stdout carries exactly one line of JSON; diagnostics go to stderr
    println!("{}", serde_json::to_string(&segments)?);
    Ok(())
}
