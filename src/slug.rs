/// URL-safe slug: lowercase ASCII alphanumerics, runs of anything else
/// collapsed to one hyphen, no leading or trailing hyphen.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(slugify("Science Fiction"), "science-fiction");
        assert_eq!(slugify("  Rock & Roll!! "), "rock-roll");
        assert_eq!(slugify("--Sci--Fi--"), "sci-fi");
        assert_eq!(slugify("Film-Noir 1940s"), "film-noir-1940s");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(slugify("Comédie"), "com-die");
        assert_eq!(slugify("???"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn is_idempotent() {
        for input in ["Action", "Sci-Fi & Fantasy", "  a__b  ", "ÉLAN vital", "9 1/2 Weeks", "-"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "input: {input:?}");
        }
    }
}
