/// Domain abbreviations and their expansions.
///
/// Lookup is by the upper-cased token, so keys containing spaces or lower-case
/// letters never match.
pub const ACRONYMS: &[(&str, &str)] = &[
    ("system BMS", "System-level battery management system"),
    ("EMS", "Energy management system"),
    ("PCS", "Power conversion system"),
    ("xHMI", "External human machine interface"),
    ("UPS", "Uninterruptible power supply"),
    ("HVAC", "Heating, ventilation, air conditioning"),
    ("PBMS", "Pack-level battery management system"),
    ("string BMS", "String-level battery management system"),
    ("ESM", "Energy storage module"),
    ("FSS", "fire suppression system"),
];

fn expand(token: &str) -> Option<&'static str> {
    let key = token.to_uppercase();
    ACRONYMS
        .iter()
        .find(|(acronym, _)| *acronym == key)
        .map(|(_, expansion)| *expansion)
}

/// Replaces known acronyms token by token and re-joins with single spaces.
pub fn rewrite_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| expand(token).unwrap_or(token))
        .collect::<Vec<_>>()
        .join(" ")
}
