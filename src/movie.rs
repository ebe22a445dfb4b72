//! Movie payloads as the catalog service expects them.
//!
//! Two incompatible shapes are in circulation. Variant A is addressed by a
//! numeric `id`, variant B by a `slug`. Neither shape is validated here; the
//! server owns uniqueness and plausibility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Variant A: `{id, title, year, description}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub year: i32,
    pub description: String,
}

/// Variant B: `{name, slug, year, desc}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SluggedMovie {
    pub name: String,
    pub slug: String,
    pub year: i32,
    pub desc: String,
}

/// Either payload shape. On the wire there is no tag, only the four fields of
/// the chosen variant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum MoviePayload {
    Slugged(SluggedMovie),
    Numbered(Movie),
}

impl MoviePayload {
    /// Path segment addressing this movie under `/movies/`.
    pub fn key(&self) -> String {
        match self {
            Self::Numbered(movie) => movie.id.to_string(),
            Self::Slugged(movie) => movie.slug.clone(),
        }
    }

    pub fn variant(&self) -> PayloadVariant {
        match self {
            Self::Numbered(_) => PayloadVariant::A,
            Self::Slugged(_) => PayloadVariant::B,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Self::Numbered(movie) => movie.year,
            Self::Slugged(movie) => movie.year,
        }
    }

    /// The hardcoded "Test Movie A" payload used for one-off posts.
    pub fn sample(variant: PayloadVariant) -> Self {
        match variant {
            PayloadVariant::A => Self::Numbered(Movie {
                id: 0,
                title: "Test Movie A".to_string(),
                year: 2021,
                description: "This is test movie A".to_string(),
            }),
            PayloadVariant::B => Self::Slugged(SluggedMovie {
                name: "Test Movie A".to_string(),
                slug: slugify("Test Movie A"),
                year: 2021,
                desc: "This is test movie A".to_string(),
            }),
        }
    }
}

impl From<Movie> for MoviePayload {
    fn from(movie: Movie) -> Self {
        Self::Numbered(movie)
    }
}

impl From<SluggedMovie> for MoviePayload {
    fn from(movie: SluggedMovie) -> Self {
        Self::Slugged(movie)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadVariant {
    /// `id`/`title`/`year`/`description`
    #[default]
    A,
    /// `name`/`slug`/`year`/`desc`
    B,
}

impl fmt::Display for PayloadVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("a"),
            Self::B => f.write_str("b"),
        }
    }
}

impl FromStr for PayloadVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "id" => Ok(Self::A),
            "b" | "slug" => Ok(Self::B),
            other => Err(format!("unknown payload variant `{other}` (expected a or b)")),
        }
    }
}

/// Lowercases, keeps ASCII alphanumerics and folds every other run into one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_a_wire_shape() {
        let payload = MoviePayload::sample(PayloadVariant::A);
        let json = sonic_rs::to_string(&payload).expect("encode");
        assert_eq!(
            json,
            r#"{"id":0,"title":"Test Movie A","year":2021,"description":"This is test movie A"}"#
        );
    }

    #[test]
    fn variant_b_wire_shape() {
        let payload = MoviePayload::sample(PayloadVariant::B);
        let json = sonic_rs::to_string(&payload).expect("encode");
        assert_eq!(
            json,
            r#"{"name":"Test Movie A","slug":"test-movie-a","year":2021,"desc":"This is test movie A"}"#
        );
    }

    #[test]
    fn untagged_decode_picks_matching_variant() {
        let a: MoviePayload =
            sonic_rs::from_str(r#"{"id":7,"title":"T","year":1999,"description":"d"}"#)
                .expect("variant a");
        assert_eq!(a.variant(), PayloadVariant::A);
        assert_eq!(a.key(), "7");

        let b: MoviePayload =
            sonic_rs::from_str(r#"{"name":"N","slug":"n-1","year":1999,"desc":"d"}"#)
                .expect("variant b");
        assert_eq!(b.variant(), PayloadVariant::B);
        assert_eq!(b.key(), "n-1");
    }

    #[test]
    fn extra_fields_do_not_change_the_variant() {
        let b: MoviePayload =
            sonic_rs::from_str(r#"{"id":5,"name":"N","slug":"n-1","year":1999,"desc":"d"}"#)
                .expect("variant b with a server id");
        assert_eq!(b.variant(), PayloadVariant::B);
        assert_eq!(b.key(), "n-1");
        assert_eq!(b.year(), 1999);

        let a: MoviePayload = sonic_rs::from_str(
            r#"{"id":5,"title":"T","year":2001,"description":"d","created_at":1}"#,
        )
        .expect("variant a with an extra field");
        assert_eq!(a.variant(), PayloadVariant::A);
        assert_eq!(a.key(), "5");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("A--B__c"), "a-b-c");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn variant_parses_from_cli_spellings() {
        assert_eq!("A".parse::<PayloadVariant>(), Ok(PayloadVariant::A));
        assert_eq!("slug".parse::<PayloadVariant>(), Ok(PayloadVariant::B));
        assert!("c".parse::<PayloadVariant>().is_err());
    }
}
