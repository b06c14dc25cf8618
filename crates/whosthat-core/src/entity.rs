// The guessable catalog entity and its hide/reveal lifecycle.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Obfuscation descriptor
// ---------------------------------------------------------------------------

/// How the entity's image should be rendered. Binary: there are no partial
/// reveal stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Obfuscation {
    /// Silhouette only; the image must not give the answer away.
    Obscured,
    /// The image is shown as-is.
    Visible,
}

impl Obfuscation {
    /// CSS filter equivalent, for presentation layers that render in a browser
    /// view.
    pub fn css_filter(self) -> &'static str {
        match self {
            Obfuscation::Obscured => "brightness(0%)",
            Obfuscation::Visible => "brightness(100%)",
        }
    }
}

// ---------------------------------------------------------------------------
// GuessableEntity
// ---------------------------------------------------------------------------

/// A single catalog entry the player has to identify.
///
/// Constructed hidden. `reveal()` is the only way to flip `hidden`, and it
/// only ever goes one way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessableEntity {
    id: u32,
    canonical_name: String,
    image_ref: String,
    category_tags: Vec<String>,
    trait_tags: Vec<String>,
    hidden: bool,
}

impl GuessableEntity {
    pub fn new(
        id: u32,
        canonical_name: impl Into<String>,
        image_ref: impl Into<String>,
        category_tags: Vec<String>,
        trait_tags: Vec<String>,
    ) -> Self {
        Self {
            id,
            canonical_name: canonical_name.into(),
            image_ref: image_ref.into(),
            category_tags,
            trait_tags,
            hidden: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    pub fn category_tags(&self) -> &[String] {
        &self.category_tags
    }

    pub fn trait_tags(&self) -> &[String] {
        &self.trait_tags
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// `Obscured` while hidden, `Visible` once revealed.
    pub fn visual_obfuscation(&self) -> Obfuscation {
        if self.hidden {
            Obfuscation::Obscured
        } else {
            Obfuscation::Visible
        }
    }

    /// Expose the entity. Calling it again is a no-op on the flag.
    pub fn reveal(&mut self) {
        self.hidden = false;
    }

    /// Uppercased first character of the canonical name, or `""` for an empty
    /// name. Available regardless of `hidden`; callers decide when to show it.
    pub fn first_letter_hint(&self) -> String {
        self.canonical_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// Uppercased last character of the canonical name, or `""` for an empty
    /// name.
    pub fn last_letter_hint(&self) -> String {
        self.canonical_name
            .chars()
            .next_back()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// Whether `guess` names this entity. See [`normalize_guess`].
    pub fn matches_guess(&self, guess: &str) -> bool {
        normalize_guess(guess) == normalize_guess(&self.canonical_name)
    }
}

/// Case-fold and trim surrounding whitespace. Interior whitespace and
/// punctuation are kept, so "mr. mime" and "mr mime" are different guesses.
pub fn normalize_guess(text: &str) -> String {
    text.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
