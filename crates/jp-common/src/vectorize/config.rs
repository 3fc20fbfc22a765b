#[derive(Debug, Clone)]
pub struct VectorizerConfig {
    /// Embedding dimension (powers of two hash most evenly: 256, 512, 1024).
    pub dimension: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

impl VectorizerConfig {
    pub fn from_env() -> Self {
        Self {
            dimension: std::env::var("JP_VECTOR_DIMENSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(256),
        }
    }
}
