//! Trouble-code extraction from pruned payload data.

use crate::error::DecodeError;
use crate::tables::LookupTable;
use crate::value::TroubleCode;

/// Convert a pruned payload into trouble codes.
///
/// The payload is consumed in four-hex-digit groups. All-zero groups
/// are padding and are dropped. For the rest, the leading digit maps
/// through the prefix table (`0` → `P0`, `4` → `C0`, ...) and the
/// remaining three digits are copied verbatim, yielding the familiar
/// five-character codes.
pub(crate) fn data_to_trouble_codes(
    data: &str,
    prefixes: &LookupTable,
) -> Result<Vec<String>, DecodeError> {
    let mut codes = Vec::new();
    let mut rest = data;
    while rest.len() >= 4 {
        let (group, tail) = rest.split_at(4);
        rest = tail;
        let raw = u16::from_str_radix(group, 16)
            .map_err(|e| DecodeError::BadHex(format!("{group:?}: {e}")))?;
        if raw == 0 {
            continue;
        }
        let digit = group
            .chars()
            .next()
            .expect("group is four characters long");
        let prefix = prefixes
            .get(&digit.to_string())
            .ok_or(DecodeError::UnknownPrefix(digit))?;
        codes.push(format!("{prefix}{}", &group[1..]));
    }
    Ok(codes)
}

/// Pair each code with its description, if the tables know one.
pub(crate) fn describe_trouble_codes(
    codes: Vec<String>,
    descriptions: &LookupTable,
) -> Vec<TroubleCode> {
    codes
        .into_iter()
        .map(|code| {
            let description = descriptions.get(&code).map(str::to_string);
            TroubleCode { code, description }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> LookupTable {
        LookupTable::parse(
            "0 P0\n1 P1\n2 P2\n3 P3\n4 C0\n5 C1\n6 C2\n7 C3\n\
             8 B0\n9 B1\nA B2\nB B3\nC U0\nD U1\nE U2\nF U3\n",
        )
    }

    #[test]
    fn group_maps_prefix_and_copies_remainder() {
        let codes = data_to_trouble_codes("0101", &prefixes()).unwrap();
        assert_eq!(codes, vec!["P0101".to_string()]);
    }

    #[test]
    fn zero_groups_are_dropped() {
        let codes = data_to_trouble_codes("0000013300000301", &prefixes()).unwrap();
        assert_eq!(codes, vec!["P0133".to_string(), "P0301".to_string()]);
    }

    #[test]
    fn letter_ranges_map_through_the_table() {
        let codes = data_to_trouble_codes("4035C100", &prefixes()).unwrap();
        assert_eq!(codes, vec!["C0035".to_string(), "U0100".to_string()]);
    }

    #[test]
    fn trailing_partial_group_is_ignored() {
        let codes = data_to_trouble_codes("010133", &prefixes()).unwrap();
        assert_eq!(codes, vec!["P0101".to_string()]);
    }

    #[test]
    fn non_hex_group_is_an_error() {
        assert!(data_to_trouble_codes("01ZZ", &prefixes()).is_err());
    }

    #[test]
    fn missing_prefix_entry_is_an_error() {
        let empty = LookupTable::default();
        assert!(matches!(
            data_to_trouble_codes("0101", &empty),
            Err(DecodeError::UnknownPrefix('0'))
        ));
    }

    #[test]
    fn descriptions_are_optional() {
        let descriptions = LookupTable::parse("P0133 O2 Sensor Circuit Slow Response\n");
        let described = describe_trouble_codes(
            vec!["P0133".to_string(), "P0301".to_string()],
            &descriptions,
        );
        assert_eq!(
            described[0].description.as_deref(),
            Some("O2 Sensor Circuit Slow Response")
        );
        assert_eq!(described[1].description, None);
    }
}
