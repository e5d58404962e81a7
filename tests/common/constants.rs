//! Shared constants for end-to-end tests
//!
//! Expected scores follow from the linear fixture model in `fixtures.rs`:
//! intercept 5.0, Episodes 0.01, studio_avg_score 0.3, source_avg_score 0.1,
//! Type_Movie 0.4, Action 0.2, Drama 0.15, Genre_Other -0.1.

// ============================================================================
// Fixture Model
// ============================================================================

/// Number of columns in the fixture feature schema
pub const SCHEMA_WIDTH: usize = 24;

/// Sources known to the fixture model, sorted
pub const KNOWN_SOURCES: [&str; 3] = ["Light novel", "Manga", "Original"];

/// Mean of the fixture studio score map
pub const GLOBAL_MEAN_SCORE: f64 = 7.725;

// ============================================================================
// Prediction Scenarios
// ============================================================================

/// Light novel by J.C.Staff with core genres only, defaults for the rest
pub const LIGHT_NOVEL_REQUEST: &str = r#"{"genres": ["Action", "Fantasy", "Adventure"], "source": "Light novel", "studios": "J.C.Staff"}"#;

/// 5.0 + 0.12 + 0.3 * 6.9 + 0.1 * 6.8 + 0.2
pub const LIGHT_NOVEL_SCORE: f64 = 8.07;

/// Single episode original movie from a studio outside the Top-N
pub const LONG_TAIL_MOVIE_REQUEST: &str = r#"{"type": "Movie", "episodes": 1, "duration_per_episode_sec": 6420, "genres": ["Drama", "Romance"], "source": "Original", "studios": "CoMix Wave Films"}"#;

/// 5.0 + 0.01 + 0.3 * 8.3 + 0.1 * 7.0 + 0.4 + 0.15
pub const LONG_TAIL_MOVIE_SCORE: f64 = 8.75;

/// Studio, source and genre never seen in training
pub const UNSEEN_REQUEST: &str = r#"{"genres": ["Mecha"], "source": "Web novel", "studios": "Trigger"}"#;

/// 5.0 + 0.12 + 0.3 * 7.725 + 0.1 * 7.725 - 0.1
pub const UNSEEN_SCORE: f64 = 8.11;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Cache age for the options endpoint in tests (seconds)
pub const OPTIONS_CACHE_AGE_SEC: usize = 120;
