/// Native maps deep link, address appended percent-encoded
const MAPS_TEMPLATE: &str = "https://maps.apple.com/?q=";

/// Street-level view deep link. `cbll=0,0` is a fixed placeholder
/// coordinate; the viewer resolves the location from `q`.
const STREET_VIEW_PREFIX: &str = "https://www.google.com/maps?q=";
const STREET_VIEW_SUFFIX: &str = "&layer=c&cbll=0,0";

/// External navigation links for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLinks {
    pub maps: String,
    pub street_view: String,
}

impl MapLinks {
    pub fn for_address(address: &str) -> Self {
        let encoded = urlencoding::encode(address);
        Self {
            maps: format!("{}{}", MAPS_TEMPLATE, encoded),
            street_view: format!("{}{}{}", STREET_VIEW_PREFIX, encoded, STREET_VIEW_SUFFIX),
        }
    }
}
