//! Entity naming: a small English pluralizer.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
    ("datum", "data"),
    ("index", "indices"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "news",
    "data",
];

/// Pluralize the last word of `name`, keeping the prefix and the casing
/// of the first replaced letter.
pub fn pluralize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let lower = name.to_lowercase();

    if UNCOUNTABLE
        .iter()
        .any(|w| lower.ends_with(w) && word_boundary(name, w.len()))
    {
        return name.to_string();
    }

    for (singular, plural) in IRREGULAR {
        if lower.ends_with(singular) && word_boundary(name, singular.len()) {
            let stem = &name[..name.len() - singular.len()];
            return format!("{}{}", stem, match_case(&name[stem.len()..], plural));
        }
        if lower.ends_with(plural) && word_boundary(name, plural.len()) {
            return name.to_string();
        }
    }

    if is_plural(&lower) {
        return name.to_string();
    }

    let upper = name.chars().last().is_some_and(char::is_uppercase);
    let suffix = |s: &str| if upper { s.to_uppercase() } else { s.to_string() };

    if lower.ends_with('y') && !ends_with_vowel_before(&lower, 1) {
        return format!("{}{}", &name[..name.len() - 1], suffix("ies"));
    }
    if lower.ends_with("is") && lower.len() > 2 {
        return format!("{}{}", &name[..name.len() - 2], suffix("es"));
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|e| lower.ends_with(e)) {
        return format!("{}{}", name, suffix("es"));
    }
    if lower.ends_with("fe") {
        return format!("{}{}", &name[..name.len() - 2], suffix("ves"));
    }
    if lower.ends_with('f') && !lower.ends_with("ff") {
        return format!("{}{}", &name[..name.len() - 1], suffix("ves"));
    }

    format!("{}{}", name, suffix("s"))
}

/// Already-plural heuristics: `-ies`, `-es` after a sibilant, or a
/// plain trailing `s` that is not `ss`, `us` or `is`.
fn is_plural(lower: &str) -> bool {
    if lower.ends_with("ies") || lower.ends_with("ches") || lower.ends_with("shes") {
        return true;
    }
    lower.ends_with('s')
        && !lower.ends_with("ss")
        && !lower.ends_with("us")
        && !lower.ends_with("is")
        && lower.len() > 1
}

fn ends_with_vowel_before(lower: &str, offset: usize) -> bool {
    lower
        .chars()
        .rev()
        .nth(offset)
        .is_some_and(|c| "aeiou".contains(c))
}

/// The matched suffix must start a word: at the beginning, after `_`, or
/// at an uppercase letter in CamelCase.
fn word_boundary(name: &str, suffix_len: usize) -> bool {
    let start = name.len() - suffix_len;
    if start == 0 {
        return true;
    }
    let prev = name[..start].chars().last();
    let first = name[start..].chars().next();
    matches!(prev, Some('_')) || first.is_some_and(char::is_uppercase)
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    let mut chars = replacement.chars();
    match (original.chars().next(), chars.next()) {
        (Some(o), Some(r)) if o.is_uppercase() => r.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}
