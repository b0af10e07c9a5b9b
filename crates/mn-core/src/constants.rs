/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Default admissible displacement per ingest (Euclidean norm).
pub const DEFAULT_MAX_VELOCITY: f64 = 1.0;

/// Smoothing factor for the buffer-pressure moving average.
/// pressure' = pressure * decay + residual * (1 - decay)
pub const DEFAULT_PRESSURE_DECAY: f64 = 0.9;

/// Decay weight below which a non-pinned event is pruned.
pub const DEFAULT_PRUNE_THRESHOLD: f64 = 0.2;

/// Conversation half-life in hours.
pub const CONVERSATION_HALF_LIFE_HOURS: f64 = 24.0;

/// Fact half-life in hours (30 days).
pub const FACT_HALF_LIFE_HOURS: f64 = 720.0;

/// Storage-strength multiplier applied on every retrieval boost.
pub const BOOST_FACTOR: f64 = 1.1;

/// Simulated context window, in tokens.
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Simulated token cost of one stored event.
pub const TOKENS_PER_EVENT: usize = 100;

/// Fraction of the context window that triggers a snapshot.
pub const DENSITY_RATIO: f64 = 0.8;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;
