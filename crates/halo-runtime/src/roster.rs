#![forbid(unsafe_code)]

//! Artist roster: the immutable records names are drawn from.

use std::fmt;
use std::sync::Arc;

use halo_core::rng::RandomSource;

/// Stable artist identifier supplied by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ArtistId(pub u32);

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One artist with its two name variants.
///
/// The JSON form accepts the site's record shape: `name` is the primary
/// (Hebrew) spelling and `englishName` the secondary one. Unknown fields such
/// as `category` or `image` are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Artist {
    pub id: ArtistId,
    #[cfg_attr(feature = "serde", serde(alias = "name"))]
    pub primary_name: String,
    #[cfg_attr(feature = "serde", serde(alias = "englishName"))]
    pub secondary_name: String,
}

impl Artist {
    /// Create an artist record.
    pub fn new(id: u32, primary_name: impl Into<String>, secondary_name: impl Into<String>) -> Self {
        Self {
            id: ArtistId(id),
            primary_name: primary_name.into(),
            secondary_name: secondary_name.into(),
        }
    }

    /// Pick one of the two spellings with a fair coin.
    pub fn pick_name<R: RandomSource + ?Sized>(&self, rng: &mut R) -> &str {
        if rng.coin() {
            &self.primary_name
        } else {
            &self.secondary_name
        }
    }
}

/// Shared, read-only list of artists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    artists: Arc<[Artist]>,
}

impl Roster {
    /// Wrap a list of artists.
    pub fn new(artists: impl Into<Vec<Artist>>) -> Self {
        let artists: Vec<Artist> = artists.into();
        Self {
            artists: artists.into(),
        }
    }

    /// Whether the roster has no artists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artists.len()
    }

    /// All artists in supplied order.
    #[must_use]
    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    /// Uniformly random artist. Repeats are allowed.
    pub fn pick<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<&Artist> {
        if self.artists.is_empty() {
            return None;
        }
        self.artists.get(rng.index(self.artists.len()))
    }
}

impl FromIterator<Artist> for Roster {
    fn from_iter<I: IntoIterator<Item = Artist>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}
