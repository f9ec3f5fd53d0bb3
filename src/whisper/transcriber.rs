use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::download;
use crate::runner::SpeechToText;
use crate::transcript::{Segment, Word};
use crate::whisper::audio;
use crate::whisper::config::WhisperConfig;

pub struct WhisperEngine {
    ctx: WhisperContext,
    config: WhisperConfig,
}

/// Token text plus timing as reported by whisper.cpp. Timestamps are in
/// centiseconds.
struct TokenTiming {
    text: String,
    t0: i64,
    t1: i64,
    p: f32,
}

impl WhisperEngine {
    /// Obtains an engine for the given model tier, downloading the ggml
    /// weights into the cache on first use.
    pub fn load(tier: &str) -> Result<Self> {
        let model_path = download::ensure_model(tier)?;
        Self::from_model_file(&model_path, WhisperConfig::default())
    }

    pub fn from_model_file(model_path: &Path, config: WhisperConfig) -> Result<Self> {
        whisper_rs::install_whisper_log_trampoline();

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(config.use_gpu);

        let model = model_path
            .to_str()
            .context("Model path is not valid UTF-8")?;
        let ctx = WhisperContext::new_with_params(model, ctx_params)
            .map_err(|e| anyhow::anyhow!("Failed to load model: {}", e))?;

        Ok(Self { ctx, config })
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        params.set_translate(self.config.translate);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_token_timestamps(true);
        params.set_n_threads(self.config.num_threads);
        params
    }
}

impl SpeechToText for WhisperEngine {
    fn transcribe(&self, audio_path: &Path) -> Result<Vec<Segment>> {
        let mono_audio = audio::load_mono_16khz(audio_path)?;
        if mono_audio.len() < audio::WHISPER_SAMPLE_RATE as usize {
            return Err(anyhow::anyhow!("Audio is too short (less than 1 second)"));
        }

        info!("Running whisper inference on {} samples", mono_audio.len());

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow::anyhow!("Failed to create whisper state: {}", e))?;

        state
            .full(self.full_params(), &mono_audio)
            .map_err(|e| anyhow::anyhow!("Failed to run transcription: {}", e))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| anyhow::anyhow!("Failed to get segment count: {}", e))?;

        let mut segments = Vec::with_capacity(num_segments as usize);

        for i in 0..num_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| anyhow::anyhow!("Failed to get segment text: {}", e))?;
            let start = state
                .full_get_segment_t0(i)
                .map_err(|e| anyhow::anyhow!("Failed to get segment start: {}", e))?;
            let end = state
                .full_get_segment_t1(i)
                .map_err(|e| anyhow::anyhow!("Failed to get segment end: {}", e))?;

            let num_tokens = state.full_n_tokens(i)?;
            let mut tokens = Vec::with_capacity(num_tokens as usize);
            for token_i in 0..num_tokens {
                let token_data = state.full_get_token_data(i, token_i)?;
                tokens.push(TokenTiming {
                    text: state.full_get_token_text(i, token_i)?,
                    t0: token_data.t0,
                    t1: token_data.t1,
                    p: token_data.p,
                });
            }

            let words = group_words(&tokens);
            debug!("Segment {i}: {} tokens, {} words", tokens.len(), words.len());

            segments.push(Segment {
                start: centiseconds_to_seconds(start),
                end: centiseconds_to_seconds(end),
                text,
                words,
            });
        }

        Ok(segments)
    }
}

fn centiseconds_to_seconds(cs: i64) -> f64 {
    cs as f64 / 100.0
}

/// Reassembles whisper's sub-word tokens into word-level timing records.
/// A token with a leading space starts a new word; special tokens such as
/// `[_BEG_]` or `<|endoftext|>` are dropped.
fn group_words(tokens: &[TokenTiming]) -> Vec<Word> {
    struct WordInProgress {
        text: String,
        t0: i64,
        t1: i64,
        prob_sum: f32,
        token_count: u32,
    }

    impl WordInProgress {
        fn finish(self) -> Word {
            Word {
                word: self.text.trim().to_string(),
                start: centiseconds_to_seconds(self.t0),
                end: centiseconds_to_seconds(self.t1),
                probability: self.prob_sum / self.token_count as f32,
            }
        }
    }

    let mut words = Vec::new();
    let mut current: Option<WordInProgress> = None;

    for token in tokens {
        let trimmed = token.text.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('<') {
            continue;
        }

        let starts_new_word = token.text.starts_with(' ') || current.is_none();
        if starts_new_word {
            if let Some(word) = current.take() {
                words.push(word.finish());
            }
            current = Some(WordInProgress {
                text: token.text.trim_start().to_string(),
                t0: token.t0,
                t1: token.t1,
                prob_sum: token.p,
                token_count: 1,
            });
        } else if let Some(word) = current.as_mut() {
            word.text.push_str(&token.text);
            word.t1 = token.t1;
            word.prob_sum += token.p;
            word.token_count += 1;
        }
    }

    if let Some(word) = current.take() {
        words.push(word.finish());
    }

    words
}
