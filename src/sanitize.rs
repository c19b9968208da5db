// src/sanitize.rs
//! Pure text normalization for model output.
//!
//! Ad scripts come back with stage directions, speaker labels and markdown
//! emphasis mixed into the spoken lines. `voiceover_from_script` turns such a
//! script into plain sentences a TTS engine can read:
//!
//! 1. drop whole sound/music direction lines (`SFX: ...`, `**MUSIC:** ...`)
//! 2. strip emphasis markers (`**`, `*`, `__`) but keep the words
//! 3. strip bracketed directions (`(...)`, `[...]`)
//! 4. strip speaker labels (`Voiceover:`, `Narrator:`, `VO:` ...)
//! 5. collapse whitespace
//!
//! The result is never empty when the script is not.

use std::sync::LazyLock;

use regex::Regex;

static DIRECTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\*\*|__)?[ \t]*(?:sfx|fx|sound(?:[ \t]+effects?)?|music|ambience)[ \t]*(?:\*\*|__)?[ \t]*:.*$",
    )
    .expect("valid regex")
});
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{1,3}|_{2,3}").expect("valid regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex"));
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:voice[ -]?over|narrator|announcer|speaker(?:[ \t]*\d+)?|host|vo)[ \t]*:")
        .expect("valid regex")
});
static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new("[\"\u{201C}\u{201D}]").expect("valid regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.!?;:])").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Derives TTS-ready text from a full ad script.
pub fn voiceover_from_script(script: &str) -> String {
    let text = DIRECTION_LINE.replace_all(script, " ");
    let text = EMPHASIS.replace_all(&text, "");
    let text = BRACKETED.replace_all(&text, " ");
    let text = LABEL.replace_all(&text, " ");
    let text = QUOTES.replace_all(&text, "");
    let text = collapse_whitespace(&text);
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let cleaned = text.trim_start_matches([',', '.', ';', ':', ' ']).to_string();

    if !cleaned.is_empty() {
        return cleaned;
    }

    // Everything was a direction; reading the raw script beats reading nothing.
    let collapsed = collapse_whitespace(script);
    if collapsed.is_empty() {
        script.to_string()
    } else {
        collapsed
    }
}

/// Extracts a plausible font family from a possibly verbose model answer,
/// e.g. `"Montserrat (bold geometric sans-serif)"` -> `"Montserrat"`.
pub fn font_display_name(raw: &str) -> String {
    let mut text = raw.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`');

    if let Some((label, rest)) = text.split_once(':') {
        if label.to_ascii_lowercase().contains("font") {
            text = rest.trim();
        }
    }

    let cut = text
        .find(['(', ',', ';', '\n', '.'])
        .map(|i| &text[..i])
        .unwrap_or(text);
    let cut = [" - ", " \u{2013} ", " \u{2014} ", " for ", " with "]
        .iter()
        .filter_map(|sep| cut.find(sep))
        .min()
        .map(|i| &cut[..i])
        .unwrap_or(cut);

    let name = cut
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .to_string();

    if name.is_empty() {
        "Inter".to_string()
    } else {
        name
    }
}

/// Lowercase, dash-separated form for file and object names.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "brand".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directions_labels_and_emphasis() {
        let script = "(Upbeat music fades in)\n\
                      **VOICEOVER:** Wake up to *Solara* Coffee. [SFX: pour] Sustainably sourced, warmly roasted.\n\
                      SFX: Cup clink\n\
                      Voiceover: Visit solara.coffee today!";
        assert_eq!(
            voiceover_from_script(script),
            "Wake up to Solara Coffee. Sustainably sourced, warmly roasted. Visit solara.coffee today!"
        );
    }

    #[test]
    fn bold_direction_lines_are_dropped() {
        let script = "**SFX:** whoosh\n**MUSIC:** soft piano\nNarrator: Meet NovaFit.";
        assert_eq!(voiceover_from_script(script), "Meet NovaFit.");
    }

    #[test]
    fn plain_text_is_only_collapsed() {
        assert_eq!(
            voiceover_from_script("  Fresh coffee,\n\n  every   morning. "),
            "Fresh coffee, every morning."
        );
    }

    #[test]
    fn never_empty_for_non_empty_script() {
        for script in ["(music)", "[SFX: rain]", "SFX: thunder", "**", " \n ", "VO:"] {
            let out = voiceover_from_script(script);
            assert!(!out.is_empty(), "empty voiceover for {:?}", script);
        }
    }

    #[test]
    fn punctuation_is_reattached() {
        assert_eq!(
            voiceover_from_script("Hello (pause) , world (beat) !"),
            "Hello, world!"
        );
    }

    #[test]
    fn font_names_are_shortened() {
        assert_eq!(
            font_display_name("Montserrat (bold geometric sans-serif)"),
            "Montserrat"
        );
        assert_eq!(
            font_display_name("Heading font: Playfair Display - an elegant serif"),
            "Playfair Display"
        );
        assert_eq!(font_display_name("\"Lora\""), "Lora");
        assert_eq!(font_display_name("Open Sans"), "Open Sans");
        assert_eq!(font_display_name("   "), "Inter");
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Solara Coffee!"), "solara-coffee");
        assert_eq!(slugify("  --Lumen AI-- "), "lumen-ai");
        assert_eq!(slugify("???"), "brand");
    }
}
