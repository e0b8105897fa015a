use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `<name> <amount><unit>,? <form>`, anchored over the whole string.
///
/// Unit matching is case-sensitive and `µ` is the micro sign (U+00B5). The
/// boundary after the unit is ASCII-only, and name and form never span a line
/// terminator (`\n`, `\r`, U+2028, U+2029).
static PRODUCT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([^\n\r\x{2028}\x{2029}]+?)\s+([0-9]+)\s*(mg|g|mcg|µg|ml|IU)(?-u:\b),?\s*",
        r"([^\n\r\x{2028}\x{2029}]+)$"
    ))
    .unwrap()
});

/// Dose units recognised inside a product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoseUnit {
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "mcg")]
    Microgram,
    #[serde(rename = "µg")]
    MicrogramSymbol,
    #[serde(rename = "ml")]
    Millilitre,
    #[serde(rename = "IU")]
    InternationalUnit,
}

impl DoseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::Milligram => "mg",
            DoseUnit::Gram => "g",
            DoseUnit::Microgram => "mcg",
            DoseUnit::MicrogramSymbol => "µg",
            DoseUnit::Millilitre => "ml",
            DoseUnit::InternationalUnit => "IU",
        }
    }
}

impl FromStr for DoseUnit {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mg" => Ok(DoseUnit::Milligram),
            "g" => Ok(DoseUnit::Gram),
            "mcg" => Ok(DoseUnit::Microgram),
            "µg" => Ok(DoseUnit::MicrogramSymbol),
            "ml" => Ok(DoseUnit::Millilitre),
            "IU" => Ok(DoseUnit::InternationalUnit),
            other => Err(ParseFailure::new(other)),
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Structured fields pulled out of a free-text product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMedicationName {
    pub name: String,
    pub dose_amount: u64,
    pub dose_unit: DoseUnit,
    pub form: String,
}

/// The input did not have the `<name> <amount><unit>, <form>` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not extract a dose from '{input}'")]
pub struct ParseFailure {
    pub input: String,
}

impl ParseFailure {
    fn new(input: &str) -> Self {
        ParseFailure {
            input: input.to_string(),
        }
    }
}

/// Parse a product name such as
/// `"Kruidvat Cetirizine diHCl 10 mg Allergietabletten, filmomhulde tabletten"`.
///
/// Either all four fields are extracted or a `ParseFailure` is returned, so
/// the caller can fall back to manual dose entry.
pub fn parse_product_name(product_name: &str) -> Result<ParsedMedicationName, ParseFailure> {
    let caps = PRODUCT_NAME_RE
        .captures(product_name)
        .ok_or_else(|| ParseFailure::new(product_name))?;

    let name = caps[1].trim();
    let form = caps[4].trim();
    if name.is_empty() || form.is_empty() {
        return Err(ParseFailure::new(product_name));
    }

    // The capture is ASCII digits only, so the one way to fail is overflow.
    // Oversized amounts saturate instead of rejecting the name.
    let dose_amount = caps[2].parse::<u64>().unwrap_or(u64::MAX);
    let dose_unit = caps[3].parse::<DoseUnit>()?;

    Ok(ParsedMedicationName {
        name: name.to_string(),
        dose_amount,
        dose_unit,
        form: form.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_product() {
        let parsed = parse_product_name(
            "Kruidvat Cetirizine diHCl 10 mg Allergietabletten, filmomhulde tabletten",
        )
        .unwrap();
        assert_eq!(parsed.name, "Kruidvat Cetirizine diHCl");
        assert_eq!(parsed.dose_amount, 10);
        assert_eq!(parsed.dose_unit, DoseUnit::Milligram);
        assert_eq!(parsed.form, "Allergietabletten, filmomhulde tabletten");
    }

    #[test]
    fn test_parse_units() {
        let cases = [
            ("Paracetamol 500mg tabletten", DoseUnit::Milligram),
            ("Calcium 1 g bruistabletten", DoseUnit::Gram),
            ("Levothyroxine 25 mcg, tabletten", DoseUnit::Microgram),
            ("Levothyroxine 50 µg, tabletten", DoseUnit::MicrogramSymbol),
            ("Hoestdrank 5 ml stroop", DoseUnit::Millilitre),
            ("Vitamine D3 400 IU capsules", DoseUnit::InternationalUnit),
        ];
        for (input, unit) in cases {
            assert_eq!(parse_product_name(input).unwrap().dose_unit, unit, "{input}");
        }
    }

    #[test]
    fn test_parse_comma_after_unit() {
        let parsed = parse_product_name("Ibuprofen 400 mg, omhulde tabletten").unwrap();
        assert_eq!(parsed.name, "Ibuprofen");
        assert_eq!(parsed.form, "omhulde tabletten");
    }

    #[test]
    fn test_unit_boundary_is_ascii() {
        let parsed = parse_product_name("Middel 10 mgé tabletten").unwrap();
        assert_eq!(parsed.name, "Middel");
        assert_eq!(parsed.dose_unit, DoseUnit::Milligram);
        assert_eq!(parsed.form, "é tabletten");
    }

    #[test]
    fn test_parse_leading_zeros() {
        let parsed = parse_product_name("Testmiddel 007 mg tabletten").unwrap();
        assert_eq!(parsed.dose_amount, 7);
    }

    #[test]
    fn test_parse_first_dose_wins() {
        let parsed = parse_product_name("Combi 500 mg 20 mg tabletten").unwrap();
        assert_eq!(parsed.name, "Combi");
        assert_eq!(parsed.dose_amount, 500);
        assert_eq!(parsed.form, "20 mg tabletten");
    }

    #[test]
    fn test_parse_skips_numbers_without_unit() {
        let parsed = parse_product_name("Omega 3 visolie 1000 mg capsules").unwrap();
        assert_eq!(parsed.name, "Omega 3 visolie");
        assert_eq!(parsed.dose_amount, 1000);
    }

    #[test]
    fn test_parse_huge_amount_is_not_rejected() {
        let parsed = parse_product_name("Raar 99999999999999999999999 mg tabletten").unwrap();
        assert_eq!(parsed.dose_amount, u64::MAX);
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_product_name("").is_err());
        assert!(parse_product_name("Paracetamol").is_err());
        // unit matching is case-sensitive
        assert!(parse_product_name("Paracetamol 500 MG tabletten").is_err());
        // form is required
        assert!(parse_product_name("Vitamine D3 1000 IU").is_err());
        // name is required
        assert!(parse_product_name("500 mg tabletten").is_err());
        // unit must end at a word boundary
        assert!(parse_product_name("Middel 10 mgx tabletten").is_err());
        // no fractional amounts
        assert!(parse_product_name("Middel 2.5 mg tabletten").is_err());
        // whitespace-only name
        assert!(parse_product_name("  10 mg tabletten").is_err());
        // form cannot end in a line terminator
        assert!(parse_product_name("Middel 10 mg tabletten\r").is_err());
        assert!(parse_product_name("Middel 10 mg tabletten\u{2028}").is_err());
    }

    #[test]
    fn test_parse_failure_carries_input() {
        let err = parse_product_name("no dose here").unwrap_err();
        assert_eq!(err.input, "no dose here");
    }

    #[test]
    fn test_trimmed_fields_are_stable() {
        let parsed = parse_product_name("  Metoprolol   50 mg,  tabletten  ").unwrap();
        assert_eq!(parsed.name, "Metoprolol");
        assert_eq!(parsed.form, "tabletten");
        assert_eq!(parsed.name.trim(), parsed.name);
        assert_eq!(parsed.form.trim(), parsed.form);
    }

    #[test]
    fn test_dose_unit_round_trips_through_str() {
        for unit in ["mg", "g", "mcg", "µg", "ml", "IU"] {
            assert_eq!(unit.parse::<DoseUnit>().unwrap().to_string(), unit);
        }
        assert!("MG".parse::<DoseUnit>().is_err());
    }
}
