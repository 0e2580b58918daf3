use thiserror::Error;

use crate::models::{CommentForm, FormErrors, NoteDraft, NoteForm, SignupForm};

/// Words that block a comment from being saved, matched case-insensitively.
pub const DEFAULT_BANNED_WORDS: [&str; 2] = ["редиска", "негодяй"];

/// Shown on the comment form when a banned word is found.
pub const BANNED_WORD_WARNING: &str = "Не ругайтесь!";

/// Appended to the offending slug when it is already used by another note.
pub const SLUG_TAKEN_WARNING: &str = " - такой slug уже существует, придумайте уникальное значение!";

pub const NOTE_TITLE_MAX_LEN: usize = 100;
pub const NOTE_SLUG_MAX_LEN: usize = 100;
pub const USERNAME_MAX_LEN: usize = 150;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_SLUG: &str =
    "Enter a valid “slug” consisting of letters, numbers, underscores or hyphens.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

/// Rejected
///
/// The comment contains `word`; `message` is the warning for the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Rejected {
    pub word: String,
    pub message: String,
}

/// ModerationPolicy
///
/// The banned-word list and its warning. Loaded once at startup and shared
/// read-only by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    banned_words: Vec<String>,
    warning: String,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BANNED_WORDS, BANNED_WORD_WARNING)
    }
}

impl ModerationPolicy {
    /// Words are stored lowercased so the scan only lowercases the comment.
    pub fn new<I, S>(words: I, warning: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            banned_words: words
                .into_iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
            warning: warning.to_string(),
        }
    }

    /// Parses a comma separated list, e.g. the `BANNED_WORDS` variable.
    pub fn from_list(raw: &str) -> Self {
        Self::new(raw.split(','), BANNED_WORD_WARNING)
    }

    pub fn banned_words(&self) -> &[String] {
        &self.banned_words
    }

    pub fn warning(&self) -> &str {
        &self.warning
    }

    /// validate_comment_text
    ///
    /// Plain substring scan of the lowercased text; the first banned word found
    /// rejects the comment.
    pub fn validate_comment_text(&self, text: &str) -> Result<(), Rejected> {
        let lowered = text.to_lowercase();
        match self
            .banned_words
            .iter()
            .find(|word| lowered.contains(word.as_str()))
        {
            Some(word) => Err(Rejected {
                word: word.clone(),
                message: self.warning.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn add_error(errors: &mut FormErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// clean_comment
///
/// Returns the text to store, or the form errors to show next to the input.
pub fn clean_comment(policy: &ModerationPolicy, form: &CommentForm) -> Result<String, FormErrors> {
    let mut errors = FormErrors::new();
    let text = form.text.trim();
    if text.is_empty() {
        add_error(&mut errors, "text", REQUIRED);
    } else if let Err(rejected) = policy.validate_comment_text(text) {
        add_error(&mut errors, "text", rejected.message);
    }

    if errors.is_empty() {
        Ok(text.to_string())
    } else {
        Err(errors)
    }
}

/// clean_note
///
/// Validates the note form and settles the slug. An empty slug is derived from
/// the title. Uniqueness is not checked here since it needs the store.
pub fn clean_note(form: &NoteForm) -> Result<NoteDraft, FormErrors> {
    let mut errors = FormErrors::new();
    let title = form.title.trim();
    let text = form.text.trim();
    let slug = form.slug.trim();

    if title.is_empty() {
        add_error(&mut errors, "title", REQUIRED);
    } else if title.chars().count() > NOTE_TITLE_MAX_LEN {
        add_error(&mut errors, "title", too_long(NOTE_TITLE_MAX_LEN, title));
    }

    if text.is_empty() {
        add_error(&mut errors, "text", REQUIRED);
    }

    let slug = if slug.is_empty() {
        let derived = slugify(title);
        // A title made only of punctuation leaves nothing to derive from.
        if derived.is_empty() && !title.is_empty() {
            add_error(&mut errors, "slug", INVALID_SLUG);
        }
        derived
    } else {
        if slug.chars().count() > NOTE_SLUG_MAX_LEN {
            add_error(&mut errors, "slug", too_long(NOTE_SLUG_MAX_LEN, slug));
        }
        if !is_valid_slug(slug) {
            add_error(&mut errors, "slug", INVALID_SLUG);
        }
        slug.to_string()
    };

    if errors.is_empty() {
        Ok(NoteDraft {
            title: title.to_string(),
            text: text.to_string(),
            slug,
        })
    } else {
        Err(errors)
    }
}

/// The error shown when `slug` already belongs to another note.
pub fn slug_taken_message(slug: &str) -> String {
    format!("{slug}{SLUG_TAKEN_WARNING}")
}

pub fn clean_signup(form: &SignupForm) -> Result<String, FormErrors> {
    let mut errors = FormErrors::new();
    let username = form.username.trim();

    if username.is_empty() {
        add_error(&mut errors, "username", REQUIRED);
    } else {
        if username.chars().count() > USERNAME_MAX_LEN {
            add_error(&mut errors, "username", too_long(USERNAME_MAX_LEN, username));
        }
        if !username
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '@' | '+' | '-'))
        {
            add_error(&mut errors, "username", INVALID_USERNAME);
        }
    }

    if errors.is_empty() {
        Ok(username.to_string())
    } else {
        Err(errors)
    }
}

/// Letters, digits, underscores and hyphens only.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// slugify
///
/// Transliterates Cyrillic, lowercases, and joins runs of anything else with a
/// single hyphen. The result is cut to the slug column width.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.to_lowercase().chars() {
        let piece = match transliterate(ch) {
            Some(latin) => latin,
            None if ch.is_ascii_alphanumeric() => {
                push_piece(&mut slug, &mut pending_separator, ch.encode_utf8(&mut [0; 4]));
                continue;
            }
            None => {
                pending_separator = !slug.is_empty();
                continue;
            }
        };
        if !piece.is_empty() {
            push_piece(&mut slug, &mut pending_separator, piece);
        }
    }

    let truncated: String = slug.chars().take(NOTE_SLUG_MAX_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

fn push_piece(slug: &mut String, pending_separator: &mut bool, piece: &str) {
    if *pending_separator {
        slug.push('-');
        *pending_separator = false;
    }
    slug.push_str(piece);
}

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

fn too_long(limit: usize, value: &str) -> String {
    format!(
        "Ensure this value has at most {limit} characters (it has {}).",
        value.chars().count()
    )
}
