//! Telling a customer name apart from an address.
//!
//! Label positions are unreliable in extracted text, so the value found for
//! `Customer Name` is sometimes the first address line and vice versa.

/// Keywords that only appear in addresses.
const ADDRESS_KEYWORDS: &[&str] = &[
    "street",
    "avenue",
    "road",
    "box",
    "p.o",
    "po box",
    "floor",
    "apt",
    "suite",
    "district",
    "region",
    "city",
    "zip",
    "postal code",
    "building",
];

/// Place names and postal words common in the invoices this targets.
const LOCATION_KEYWORDS: &[&str] = &[
    "country", "postal", "dar", "dar-es", "tanzania", "nairobi", "kenya",
];

/// Words that mark a business name.
const COMPANY_INDICATORS: &[&str] = &[
    "ltd",
    "inc",
    "corp",
    "co",
    "company",
    "llc",
    "limited",
    "enterprise",
    "trading",
    "group",
    "industries",
    "services",
    "solutions",
    "consulting",
];

/// Whether `text` reads like a company or person name.
///
/// Rejects anything with an address keyword. Otherwise the text must start
/// with a capital (or be all caps), be at least 4 characters long, and
/// either carry a company indicator or have at most five words.
pub fn is_likely_customer_name(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    let lower = text.to_lowercase();
    if ADDRESS_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return false;
    }

    let well_formed = text.chars().count() >= 4
        && (text.chars().next().is_some_and(char::is_uppercase) || is_all_caps(text));
    if !well_formed {
        return false;
    }

    has_company_indicator(&lower) || text.split_whitespace().count() <= 5
}

/// Whether `text` reads like a postal address.
///
/// True on an address or location keyword, or when the text holds a digit,
/// has several parts and is longer than 5 characters.
pub fn is_likely_address(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    let lower = text.to_lowercase();
    if ADDRESS_KEYWORDS
        .iter()
        .chain(LOCATION_KEYWORDS)
        .any(|kw| lower.contains(kw))
    {
        return true;
    }

    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let multipart = text.contains(',') || text.contains(' ');
    has_digit && multipart && text.chars().count() > 5
}

fn is_all_caps(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

// Indicators are whole words: "co" must not match "Coast".
fn has_company_indicator(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| COMPANY_INDICATORS.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_names() {
        assert!(is_likely_customer_name("ACME MOTORS LTD"));
        assert!(is_likely_customer_name("Juma Hassan"));
        assert!(is_likely_customer_name("Kilimanjaro Heavy Equipment Trading Co. Limited"));
    }

    #[test]
    fn test_address_keywords_reject_name() {
        assert!(!is_likely_customer_name("P.O. Box 123, Dar es Salaam"));
        assert!(!is_likely_customer_name("Plot 4 Nyerere Road"));
    }

    #[test]
    fn test_name_shape() {
        assert!(!is_likely_customer_name("abc motors"));
        assert!(!is_likely_customer_name("Abc"));
        assert!(!is_likely_customer_name("One Two Three Four Five Six"));
        assert!(is_likely_customer_name("One Two Three Four Five Six Ltd"));
    }

    #[test]
    fn test_addresses() {
        assert!(is_likely_address("P.O. Box 123, Dar es Salaam"));
        assert!(is_likely_address("Arusha, Tanzania"));
        assert!(is_likely_address("Plot 12 Block B"));
        assert!(!is_likely_address("ACME MOTORS LTD"));
        assert!(!is_likely_address("12345"));
    }
}
