//! Plain-text helpers used when comparing free-text answers.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Reduces authored rich text to the plain text a student would read:
/// markup is dropped and the common character entities are decoded.
pub fn to_plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    decode_entities(&out)
}

fn decode_entities(s: &str) -> String {
    const ENTITIES: [(&str, &str); 7] = [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&amp;", "&"),
    ];
    let mut out = s.to_string();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out
}

/// Trims and collapses every run of whitespace into a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and accent-insensitive form of a string: compatibility decomposition,
/// combining marks dropped, then lowercased.
pub fn fold_for_comparison(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Comparable form of an authored answer, which may carry markup.
pub fn comparable_answer(s: &str) -> String {
    fold_for_comparison(&collapse_whitespace(&to_plain_text(s)))
}

/// Comparable form of what a student typed. Taken literally: `<` is not markup here.
pub fn comparable_submission(s: &str) -> String {
    fold_for_comparison(&collapse_whitespace(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_decodes_entities() {
        assert_eq!(
            collapse_whitespace(&to_plain_text("<p>Fish &amp; <b>chips</b></p>")),
            "Fish & chips"
        );
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(collapse_whitespace("  a \t\n b   c "), "a b c");
    }

    #[test]
    fn comparison_ignores_case_and_accents() {
        assert_eq!(comparable_answer("  Canción  DEL  Año "), "cancion del ano");
        assert_eq!(comparable_answer("Élan"), comparable_answer("elan"));
    }

    #[test]
    fn decomposed_input_folds_like_precomposed() {
        assert_eq!(comparable_submission("cafe\u{301}"), comparable_answer("café"));
        assert_eq!(comparable_submission("Dvor\u{30c}a\u{301}k"), "dvorak");
        assert_eq!(comparable_submission("Erdős"), "erdos");
    }

    #[test]
    fn submissions_keep_angle_brackets() {
        assert_eq!(comparable_submission("  x <  y "), "x < y");
        assert_eq!(comparable_submission("5 <wrong junk"), "5 <wrong junk");
        assert_eq!(comparable_answer("x &lt; y"), "x < y");
    }
}
