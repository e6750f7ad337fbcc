use regex::Regex;

/// Structured location parsed out of a listing URL.
///
/// Every field is optional; an unrecognized URL yields all-`None`, which is a
/// normal outcome rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingLocation {
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

/// Extracts a structured location from the listing URL alone, no fetch needed.
///
/// Two URL shapes are recognized, tried in order with the first match winning:
///
/// 1. Structured: `/<state>/<suburb>-<postcode>/<street>/<number>-pid-...`
///    e.g. `/nsw/marsden-park-2765/pratia-cres/46-pid-20583686/`
/// 2. Legacy: `/property/<slug>`, where the slug de-hyphenates into a
///    best-effort display address; a trailing `<suburb>-<state>-<postcode>`
///    on the URL additionally fills in the structured fields when present.
pub struct AddressExtractor {
    structured: Regex,
    legacy: Regex,
    trailing_location: Regex,
}

impl AddressExtractor {
    pub fn new() -> Self {
        Self {
            structured: Regex::new(r"/([a-z]{2,3})/([a-z-]+)-(\d{4})/([a-z-]+)/(\d+[a-z]?)-pid-")
                .expect("Invalid regex pattern"),
            legacy: Regex::new(r"/property/([^/]+)").expect("Invalid regex pattern"),
            trailing_location: Regex::new(r"(\w+)-(\w{2,3})-(\d{4})$")
                .expect("Invalid regex pattern"),
        }
    }

    pub fn extract(&self, url: &str) -> ListingLocation {
        let mut location = ListingLocation::default();

        // The structured shape is matched case-insensitively by lowercasing
        // the whole URL; captured tokens come back lowercase.
        let lowered = url.to_lowercase();
        if let Some(caps) = self.structured.captures(&lowered) {
            let state = caps[1].to_uppercase();
            let suburb = title_case(&caps[2].replace('-', " "));
            let postcode = caps[3].to_string();
            let street = title_case(&caps[4].replace('-', " "));
            let number = &caps[5];

            location.address = Some(format!("{number} {street}, {suburb} {state} {postcode}"));
            location.suburb = Some(suburb);
            location.state = Some(state);
            location.postcode = Some(postcode);
            return location;
        }

        if let Some(caps) = self.legacy.captures(url) {
            location.address = Some(title_case(&caps[1].replace('-', " ")));

            if let Some(caps) = self.trailing_location.captures(url.trim_end_matches('/')) {
                location.suburb = Some(title_case(&caps[1]));
                location.state = Some(caps[2].to_uppercase());
                location.postcode = Some(caps[3].to_string());
            }
        }

        location
    }
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Capitalize the first letter of each run of letters, lowercasing the rest.
/// A letter directly after a digit starts a new run, so "46a" becomes "46A".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_is_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(ch);
            prev_is_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(url: &str) -> ListingLocation {
        AddressExtractor::new().extract(url)
    }

    #[test]
    fn structured_url_yields_full_location() {
        let location = extract(
            "https://www.property.com.au/nsw/marsden-park-2765/pratia-cres/46-pid-20583686/",
        );
        assert_eq!(
            location.address.as_deref(),
            Some("46 Pratia Cres, Marsden Park NSW 2765")
        );
        assert_eq!(location.suburb.as_deref(), Some("Marsden Park"));
        assert_eq!(location.state.as_deref(), Some("NSW"));
        assert_eq!(location.postcode.as_deref(), Some("2765"));
    }

    #[test]
    fn structured_url_is_case_insensitive() {
        let location =
            extract("HTTPS://WWW.PROPERTY.COM.AU/VIC/FITZROY-3065/GERTRUDE-ST/120-PID-5551/");
        assert_eq!(location.state.as_deref(), Some("VIC"));
        assert_eq!(location.suburb.as_deref(), Some("Fitzroy"));
        assert_eq!(
            location.address.as_deref(),
            Some("120 Gertrude St, Fitzroy VIC 3065")
        );
    }

    #[test]
    fn structured_url_keeps_unit_letter_in_number() {
        let location =
            extract("https://www.property.com.au/qld/red-hill-4059/enoggera-tce/12a-pid-777/");
        assert_eq!(
            location.address.as_deref(),
            Some("12a Enoggera Tce, Red Hill QLD 4059")
        );
    }

    #[test]
    fn legacy_url_yields_display_address_and_trailing_location() {
        let location =
            extract("https://www.propertyvalue.com.au/property/123-smith-street-sydney-nsw-2000/");
        assert_eq!(
            location.address.as_deref(),
            Some("123 Smith Street Sydney Nsw 2000")
        );
        assert_eq!(location.suburb.as_deref(), Some("Sydney"));
        assert_eq!(location.state.as_deref(), Some("NSW"));
        assert_eq!(location.postcode.as_deref(), Some("2000"));
    }

    #[test]
    fn legacy_url_without_trailing_location_only_fills_address() {
        let location = extract("https://example.com/property/the-old-mill-house/");
        assert_eq!(location.address.as_deref(), Some("The Old Mill House"));
        assert_eq!(location.suburb, None);
        assert_eq!(location.state, None);
        assert_eq!(location.postcode, None);
    }

    #[test]
    fn unrecognized_url_yields_empty_location() {
        assert_eq!(extract("https://example.com/"), ListingLocation::default());
        assert_eq!(extract("not a url at all"), ListingLocation::default());
    }

    #[test]
    fn postcode_is_digits_from_url_and_state_is_uppercase() {
        for (url, state, postcode) in [
            (
                "https://x.com/nsw/suburbia-2000/main-st/1-pid-1/",
                "NSW",
                "2000",
            ),
            (
                "https://x.com/wa/south-perth-6151/mill-point-rd/100-pid-2/",
                "WA",
                "6151",
            ),
            (
                "https://x.com/tas/hobart-7000/murray-st/9-pid-3/",
                "TAS",
                "7000",
            ),
        ] {
            let location = extract(url);
            assert_eq!(location.state.as_deref(), Some(state));
            assert_eq!(location.postcode.as_deref(), Some(postcode));
        }
    }

    #[test]
    fn title_case_matches_slug_conventions() {
        assert_eq!(title_case("marsden park"), "Marsden Park");
        assert_eq!(title_case("o connor"), "O Connor");
        assert_eq!(title_case("46a"), "46A");
        assert_eq!(title_case(""), "");
    }
}
