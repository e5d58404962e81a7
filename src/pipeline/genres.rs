//! Long-tail genre bucketing.

use std::collections::BTreeSet;

/// Synthetic genre marking that at least one input genre is outside the core
/// vocabulary.
pub const GENRE_OTHER: &str = "Genre_Other";

#[derive(Debug, Clone)]
pub struct GenreBucketizer {
    core: BTreeSet<String>,
}

impl GenreBucketizer {
    pub fn new(core: BTreeSet<String>) -> Self {
        GenreBucketizer { core }
    }

    pub fn core_genres(&self) -> &BTreeSet<String> {
        &self.core
    }

    /// Reduces `genres` to the core vocabulary.
    ///
    /// The result holds the distinct core genres found in the input, sorted,
    /// followed by [`GENRE_OTHER`] if any input genre is not a core genre or if
    /// `force_other` is set. An empty input without `force_other` yields an
    /// empty result.
    pub fn bucketize<S: AsRef<str>>(&self, genres: &[S], force_other: bool) -> Vec<String> {
        let input: BTreeSet<&str> = genres.iter().map(AsRef::as_ref).collect();

        let mut has_other = force_other;
        let mut out: Vec<String> = Vec::with_capacity(input.len() + 1);
        for genre in input {
            if self.core.contains(genre) {
                out.push(genre.to_string());
            } else {
                has_other = true;
            }
        }
        if has_other {
            out.push(GENRE_OTHER.to_string());
        }
        out
    }
}
