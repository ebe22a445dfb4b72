use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::movie::{Movie, MoviePayload, PayloadVariant, SluggedMovie, slugify};

pub const DEFAULT_YEARS: RangeInclusive<i32> = 1967..=2023;
pub const DEFAULT_TITLE_WORDS: usize = 3;
pub const DEFAULT_DESCRIPTION_WORDS: usize = 20;

const WORDS: &[&str] = &[
    "ancient", "river", "silent", "storm", "city", "shadow", "golden", "night", "last", "journey",
    "broken", "crown", "winter", "garden", "hidden", "empire", "lonely", "star", "midnight", "dream",
    "fallen", "machine", "secret", "ocean", "burning", "road", "distant", "echo", "iron", "heart",
    "forgotten", "island", "crimson", "sky", "wild", "harbor", "paper", "moon", "endless", "summer",
    "glass", "tower", "quiet", "forest", "stolen", "letter", "northern", "light", "velvet", "ghost",
    "electric", "desert", "final", "promise", "lost", "signal", "bright", "horizon", "cold", "fire",
];

/// Random movie payloads for populating the catalog.
#[derive(Debug)]
pub struct MovieGenerator {
    rng: StdRng,
    years: RangeInclusive<i32>,
    title_words: usize,
    description_words: usize,
}

impl MovieGenerator {
    /// A seeded generator replays the same sequence; `None` draws from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            years: DEFAULT_YEARS,
            title_words: DEFAULT_TITLE_WORDS,
            description_words: DEFAULT_DESCRIPTION_WORDS,
        }
    }

    pub fn with_year_range(mut self, years: RangeInclusive<i32>) -> Self {
        self.years = years;
        self
    }

    pub fn with_word_counts(mut self, title_words: usize, description_words: usize) -> Self {
        self.title_words = title_words;
        self.description_words = description_words;
        self
    }

    /// `words` random words, first one capitalised, single-space separated.
    pub fn sentence(&mut self, words: usize) -> String {
        let mut sentence = String::new();
        for position in 0..words {
            let word = WORDS[self.rng.random_range(0..WORDS.len())];
            if position == 0 {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    sentence.extend(first.to_uppercase());
                    sentence.push_str(chars.as_str());
                }
            } else {
                sentence.push(' ');
                sentence.push_str(word);
            }
        }
        sentence
    }

    pub fn year(&mut self) -> i32 {
        self.rng.random_range(self.years.clone())
    }

    pub fn movie(&mut self, index: i32, variant: PayloadVariant) -> MoviePayload {
        let title = self.sentence(self.title_words);
        let year = self.year();
        let description = format!("{}.", self.sentence(self.description_words));
        match variant {
            PayloadVariant::A => Movie {
                id: index,
                title,
                year,
                description,
            }
            .into(),
            PayloadVariant::B => {
                let base = slugify(&title);
                let slug = if base.is_empty() {
                    index.to_string()
                } else {
                    format!("{base}-{index}")
                };
                SluggedMovie {
                    name: title,
                    slug,
                    year,
                    desc: description,
                }
                .into()
            }
        }
    }
}
