// src/symbology.rs
use std::fmt;

/// Barcode symbologies a pass can be scanned from and rendered back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Aztec,
    Ean13,
    Ean8,
    Qr,
    Pdf417,
    UpcE,
    DataMatrix,
    Code39,
    Code93,
    Itf14,
    Codabar,
    Code128,
    UpcA,
}

impl Symbology {
    pub const ALL: [Symbology; 13] = [
        Symbology::Aztec,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Qr,
        Symbology::Pdf417,
        Symbology::UpcE,
        Symbology::DataMatrix,
        Symbology::Code39,
        Symbology::Code93,
        Symbology::Itf14,
        Symbology::Codabar,
        Symbology::Code128,
        Symbology::UpcA,
    ];

    /// Parses a scanner tag such as `"qr"` or `"UPC_E"`. Case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lowered = tag.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|s| s.tag() == lowered)
    }

    /// The tag stored in a pass's `type` field.
    pub fn tag(self) -> &'static str {
        match self {
            Symbology::Aztec => "aztec",
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::Qr => "qr",
            Symbology::Pdf417 => "pdf417",
            Symbology::UpcE => "upc_e",
            Symbology::DataMatrix => "datamatrix",
            Symbology::Code39 => "code39",
            Symbology::Code93 => "code93",
            Symbology::Itf14 => "itf14",
            Symbology::Codabar => "codabar",
            Symbology::Code128 => "code128",
            Symbology::UpcA => "upc_a",
        }
    }

    /// Identifier the barcode renderer expects for this symbology.
    pub fn renderer_id(self) -> &'static str {
        match self {
            Symbology::Aztec => "azteccode",
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::Qr => "qrcode",
            Symbology::Pdf417 => "pdf417",
            Symbology::UpcE => "upce",
            Symbology::DataMatrix => "datamatrix",
            Symbology::Code39 => "code39",
            Symbology::Code93 => "code93",
            Symbology::Itf14 => "itf14",
            Symbology::Codabar => "rationalizedCodabar",
            Symbology::Code128 => "code128",
            Symbology::UpcA => "upca",
        }
    }

    /// Linear codes render wide and short; matrix codes render square.
    pub fn is_one_dimensional(self) -> bool {
        !matches!(
            self,
            Symbology::Aztec | Symbology::Qr | Symbology::Pdf417 | Symbology::DataMatrix
        )
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

/// Maps a stored tag to a renderer identifier, passing unknown tags through unchanged.
pub fn renderer_id_for(tag: &str) -> String {
    match Symbology::from_tag(tag) {
        Some(symbology) => symbology.renderer_id().to_string(),
        None => {
            log::debug!("renderer_id_for: unrecognised tag {:?}, using it verbatim", tag);
            tag.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_renderer_ids_are_distinct() {
        let ids: HashSet<&str> = Symbology::ALL.iter().map(|s| s.renderer_id()).collect();
        assert_eq!(ids.len(), Symbology::ALL.len());
    }

    #[test]
    fn test_tags_round_trip_through_from_tag() {
        for symbology in Symbology::ALL {
            assert_eq!(Symbology::from_tag(symbology.tag()), Some(symbology));
        }
    }

    #[test]
    fn test_renderer_id_for_known_tags() {
        assert_eq!(renderer_id_for("qr"), "qrcode");
        assert_eq!(renderer_id_for("aztec"), "azteccode");
        assert_eq!(renderer_id_for("codabar"), "rationalizedCodabar");
        assert_eq!(renderer_id_for("upc_e"), "upce");
        assert_eq!(renderer_id_for("UPC_A"), "upca");
    }

    #[test]
    fn test_renderer_id_for_unknown_tag_is_identity() {
        assert_eq!(renderer_id_for("maxicode"), "maxicode");
        assert_eq!(renderer_id_for(""), "");
    }

    #[test]
    fn test_display_is_tag_and_honours_width() {
        assert_eq!(Symbology::UpcE.to_string(), "upc_e");
        assert_eq!(format!("{:<8}|", Symbology::Qr), "qr      |");
    }

    #[test]
    fn test_one_dimensional_split() {
        assert!(Symbology::Ean13.is_one_dimensional());
        assert!(Symbology::Codabar.is_one_dimensional());
        assert!(!Symbology::Qr.is_one_dimensional());
        assert!(!Symbology::Pdf417.is_one_dimensional());
        let linear = Symbology::ALL.iter().filter(|s| s.is_one_dimensional()).count();
        assert_eq!(linear, 9);
    }
}
