//! Field-level normalization rules shared by the dimension loaders.

use crate::models::Gender;

/// Trims, then upper-cases the first letter of every word and lower-cases the
/// rest. A word starts after any non-alphabetic character, so `o'neil`
/// becomes `O'Neil`.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;

    for c in raw.trim().chars() {
        out.push(if in_word { lower(c) } else { upper(c) });
        in_word = c.is_alphabetic();
    }

    out
}

// Multi-char case mappings (e.g. 'ß' -> "SS") would break idempotence, so
// those characters are kept as they are.
fn upper(c: char) -> char {
    let mut mapped = c.to_uppercase();
    match (mapped.next(), mapped.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

fn lower(c: char) -> char {
    let mut mapped = c.to_lowercase();
    match (mapped.next(), mapped.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Trims; blank becomes `None`.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First character decides: `m` is male, `f` is female, anything else is
/// other. Missing or blank input stays `None`.
pub fn normalize_gender(raw: Option<&str>) -> Option<Gender> {
    let first = raw?.trim().chars().next()?;
    Some(match first.to_ascii_lowercase() {
        'm' => Gender::Male,
        'f' => Gender::Female,
        _ => Gender::Other,
    })
}

pub fn normalize_vehicle_type(raw: &str) -> Option<String> {
    let vehicle = raw.trim().to_lowercase();
    let canonical = match vehicle.as_str() {
        "" => return None,
        "bike" | "bicycle" => "bicycle",
        "motorbike" | "motorcycle" => "motorcycle",
        "trike" => "trike",
        "car" => "car",
        _ => return Some(vehicle),
    };
    Some(canonical.to_string())
}

pub fn normalize_category(raw: &str) -> Option<String> {
    let category = raw.trim().to_lowercase();
    let canonical = match category.as_str() {
        "" => return None,
        "toy" | "toys" => "toys",
        "makeup" | "make up" => "makeup",
        "bag" | "bags" => "bags",
        "electronics" | "gadgets" | "laptops" => "electronics",
        "men's apparel" | "clothes" => "apparel",
        _ => return Some(category),
    };
    Some(canonical.to_string())
}

/// Keeps digits only; nothing left becomes `None`.
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Drops any extension (text after an `x`), keeps digits, drops a leading
/// country digit from 11-digit numbers and formats exactly 10 digits as
/// `NNN-NNN-NNNN`. Other lengths pass through as bare digits.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let number = match raw.find(|c: char| c == 'x' || c == 'X') {
        Some(ext) => &raw[..ext],
        None => raw,
    };

    let mut digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 {
        digits.remove(0);
    }

    match digits.len() {
        0 => None,
        10 => Some(format!(
            "{}-{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..]
        )),
        _ => Some(digits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cases_names() {
        assert_eq!(title_case("jOHN"), "John");
        assert_eq!(title_case("  mary-jane o'neil "), "Mary-Jane O'Neil");
        assert_eq!(title_case("east kobe"), "East Kobe");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn title_case_is_idempotent() {
        let samples = [
            "jOHN", "McDONALD", "  o'neil ", "3rd street", "ÉLODIE", "straße", "ǆemal",
            "ıstanbul", "x", "  ", "ALL CAPS WORDS", "hello\tworld", "ﬁsh",
        ];
        for sample in samples {
            let once = title_case(sample);
            assert_eq!(title_case(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn gender_policy() {
        assert_eq!(normalize_gender(Some("M")), Some(Gender::Male));
        assert_eq!(normalize_gender(Some("f")), Some(Gender::Female));
        assert_eq!(normalize_gender(Some("Female")), Some(Gender::Female));
        assert_eq!(normalize_gender(Some(" male ")), Some(Gender::Male));
        assert_eq!(normalize_gender(Some("non-binary")), Some(Gender::Other));
        assert_eq!(normalize_gender(Some("")), None);
        assert_eq!(normalize_gender(Some("   ")), None);
        assert_eq!(normalize_gender(None), None);
    }

    #[test]
    fn vehicle_synonyms() {
        assert_eq!(normalize_vehicle_type("Bike").as_deref(), Some("bicycle"));
        assert_eq!(normalize_vehicle_type(" BICYCLE ").as_deref(), Some("bicycle"));
        assert_eq!(normalize_vehicle_type("Motorbike").as_deref(), Some("motorcycle"));
        assert_eq!(normalize_vehicle_type("trike").as_deref(), Some("trike"));
        assert_eq!(normalize_vehicle_type("Car").as_deref(), Some("car"));
        assert_eq!(normalize_vehicle_type(" Scooter").as_deref(), Some("scooter"));
        assert_eq!(normalize_vehicle_type("  "), None);
    }

    #[test]
    fn category_synonyms() {
        assert_eq!(normalize_category("Toy").as_deref(), Some("toys"));
        assert_eq!(normalize_category("make up").as_deref(), Some("makeup"));
        assert_eq!(normalize_category("BAGS").as_deref(), Some("bags"));
        assert_eq!(normalize_category("Laptops").as_deref(), Some("electronics"));
        assert_eq!(normalize_category("gadgets").as_deref(), Some("electronics"));
        assert_eq!(normalize_category("Men's Apparel").as_deref(), Some("apparel"));
        assert_eq!(normalize_category("clothes").as_deref(), Some("apparel"));
        assert_eq!(normalize_category("  Garden Tools ").as_deref(), Some("garden tools"));
        assert_eq!(normalize_category(""), None);
    }

    #[test]
    fn postal_codes_keep_digits() {
        assert_eq!(normalize_postal_code("12345-6789").as_deref(), Some("123456789"));
        assert_eq!(normalize_postal_code(" 4000 ").as_deref(), Some("4000"));
        assert_eq!(normalize_postal_code("N/A"), None);
    }

    #[test]
    fn phone_numbers() {
        assert_eq!(normalize_phone("1-555-123-4567x89").as_deref(), Some("555-123-4567"));
        assert_eq!(normalize_phone("(555) 123 4567").as_deref(), Some("555-123-4567"));
        assert_eq!(normalize_phone("+1 555.123.4567 X12").as_deref(), Some("555-123-4567"));
        assert_eq!(normalize_phone("1234-5678").as_deref(), Some("12345678"));
        assert_eq!(normalize_phone("no phone"), None);
    }

    #[test]
    fn clean_text_blanks_become_none() {
        assert_eq!(clean_text(Some("  hi ")).as_deref(), Some("hi"));
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }
}
