#[derive(Clone, Debug)]
pub struct WhisperConfig {
    pub use_gpu: bool,
    pub language: String,
    pub translate: bool,
    pub num_threads: i32,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            use_gpu: true,
            language: "auto".to_string(),
            translate: false,
            num_threads: default_thread_count(),
        }
    }
}

fn default_thread_count() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4) as i32
}
