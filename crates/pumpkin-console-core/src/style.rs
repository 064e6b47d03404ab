//! SGR style state machine
//!
//! [`AnsiStyle`] is a small `Copy` value. The line parser keeps one mutable
//! accumulator per line and copies it into every emitted segment, so later
//! SGR codes can never alter a segment that was already produced.

use serde::Serialize;

/// A 24-bit foreground color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Fixed 16-color palette for SGR 30–37 and 90–97.
pub const PALETTE: [(u16, Rgb); 16] = [
    (30, Rgb::new(0, 0, 0)),       // Black
    (31, Rgb::new(255, 0, 0)),     // Red
    (32, Rgb::new(0, 128, 0)),     // Green
    (33, Rgb::new(218, 165, 32)),  // Goldenrod
    (34, Rgb::new(30, 144, 255)),  // DodgerBlue
    (35, Rgb::new(255, 0, 255)),   // Magenta
    (36, Rgb::new(0, 255, 255)),   // Cyan
    (37, Rgb::new(255, 255, 255)), // White
    (90, Rgb::new(128, 128, 128)), // Gray
    (91, Rgb::new(250, 128, 114)), // Salmon
    (92, Rgb::new(144, 238, 144)), // LightGreen
    (93, Rgb::new(255, 255, 0)),   // Yellow
    (94, Rgb::new(173, 216, 230)), // LightBlue
    (95, Rgb::new(255, 192, 203)), // Pink
    (96, Rgb::new(224, 255, 255)), // LightCyan
    (97, Rgb::new(255, 255, 255)), // White
];

/// Look up the fixed palette color for an SGR foreground code.
pub fn palette_color(code: u16) -> Option<Rgb> {
    PALETTE
        .iter()
        .find(|(palette_code, _)| *palette_code == code)
        .map(|(_, rgb)| *rgb)
}

/// Text style accumulated from SGR codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AnsiStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub dim: bool,
    pub foreground: Option<Rgb>,
}

impl AnsiStyle {
    /// Whether every field is at its default
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Clear all fields at once (SGR 0)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Pure form of [`apply_sgr`](Self::apply_sgr).
    pub fn applied(mut self, params: &str) -> Self {
        self.apply_sgr(params);
        self
    }

    /// Apply a `;`-separated SGR parameter list.
    ///
    /// An empty list is an implicit reset. Non-numeric parameters are skipped
    /// without aborting the rest of the list. Extended colors consume their
    /// arguments: `38;2;r;g;b` sets the foreground, `38;5;n` and the `48`
    /// background forms are consumed and ignored.
    pub fn apply_sgr(&mut self, params: &str) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let parts: Vec<&str> = params.split(';').collect();
        let mut i = 0;
        while i < parts.len() {
            let Ok(code) = parts[i].parse::<u16>() else {
                i += 1;
                continue;
            };

            match code {
                38 | 48 => {
                    let consumed = extended_color_args(&parts[i + 1..]);
                    if code == 38 {
                        if let Some(ExtendedColor::Rgb(rgb)) = consumed {
                            self.foreground = Some(rgb);
                        }
                    }
                    i += match consumed {
                        Some(ExtendedColor::Rgb(_)) | Some(ExtendedColor::RgbInvalid) => 5,
                        Some(ExtendedColor::Indexed) => 3,
                        None => 1,
                    };
                    continue;
                }
                _ => self.apply_code(code),
            }
            i += 1;
        }
    }

    /// Apply a single SGR code that takes no extra arguments.
    ///
    /// Unrecognized codes are ignored.
    pub fn apply_code(&mut self, code: u16) {
        match code {
            0 => self.reset(),
            1 => self.bold = true,
            2 => self.dim = true,
            3 => self.italic = true,
            4 => self.underline = true,
            9 => self.strikethrough = true,
            22 => {
                self.bold = false;
                self.dim = false;
            }
            23 => self.italic = false,
            24 => self.underline = false,
            29 => self.strikethrough = false,
            30..=37 | 90..=97 => self.foreground = palette_color(code),
            39 => self.foreground = None,
            _ => {}
        }
    }
}

enum ExtendedColor {
    Rgb(Rgb),
    /// `2;r;g;b` present but a component was not numeric
    RgbInvalid,
    /// `5;n`
    Indexed,
}

/// Interpret the arguments following a 38/48 code.
fn extended_color_args(args: &[&str]) -> Option<ExtendedColor> {
    match args.first().copied() {
        Some("2") if args.len() >= 4 => {
            let component = |s: &str| s.parse::<u16>().ok().map(|v| v.min(255) as u8);
            match (component(args[1]), component(args[2]), component(args[3])) {
                (Some(r), Some(g), Some(b)) => Some(ExtendedColor::Rgb(Rgb::new(r, g, b))),
                _ => Some(ExtendedColor::RgbInvalid),
            }
        }
        Some("5") if args.len() >= 2 => Some(ExtendedColor::Indexed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_plain() {
        assert!(AnsiStyle::default().is_plain());
        assert!(!AnsiStyle::default().applied("1").is_plain());
    }

    #[test]
    fn test_attribute_codes() {
        let style = AnsiStyle::default().applied("1;2;3;4;9");
        assert!(style.bold);
        assert!(style.dim);
        assert!(style.italic);
        assert!(style.underline);
        assert!(style.strikethrough);
        assert_eq!(style.foreground, None);
    }

    #[test]
    fn test_unset_codes_clear_only_their_fields() {
        let style = AnsiStyle::default().applied("1;2;3;4;9;31");

        let s = style.applied("22");
        assert!(!s.bold && !s.dim);
        assert!(s.italic && s.underline && s.strikethrough);
        assert!(s.foreground.is_some());

        let s = style.applied("23");
        assert!(!s.italic && s.bold);

        let s = style.applied("24");
        assert!(!s.underline && s.bold);

        let s = style.applied("29");
        assert!(!s.strikethrough && s.bold);

        let s = style.applied("39");
        assert_eq!(s.foreground, None);
        assert!(s.bold && s.italic);
    }

    #[test]
    fn test_reset_clears_everything() {
        let style = AnsiStyle::default().applied("1;3;4;9;2;38;2;1;2;3");
        assert_eq!(style.applied("0"), AnsiStyle::default());
    }

    #[test]
    fn test_empty_params_is_reset() {
        let style = AnsiStyle::default().applied("1;31");
        assert_eq!(style.applied(""), AnsiStyle::default());
    }

    #[test]
    fn test_palette_colors() {
        assert_eq!(
            AnsiStyle::default().applied("31").foreground,
            Some(Rgb::new(255, 0, 0))
        );
        assert_eq!(
            AnsiStyle::default().applied("33").foreground,
            Some(Rgb::new(218, 165, 32))
        );
        assert_eq!(
            AnsiStyle::default().applied("90").foreground,
            Some(Rgb::new(128, 128, 128))
        );
        assert_eq!(
            AnsiStyle::default().applied("97").foreground,
            Some(Rgb::new(255, 255, 255))
        );
    }

    #[test]
    fn test_palette_covers_all_sixteen_codes() {
        for code in (30..=37).chain(90..=97) {
            assert!(palette_color(code).is_some(), "missing code {code}");
        }
        assert!(palette_color(38).is_none());
    }

    #[test]
    fn test_color_replaces_wholesale() {
        let style = AnsiStyle::default().applied("38;2;1;2;3").applied("32");
        assert_eq!(style.foreground, Some(Rgb::new(0, 128, 0)));
    }

    #[test]
    fn test_truecolor_foreground() {
        let style = AnsiStyle::default().applied("38;2;10;20;30");
        assert_eq!(style.foreground, Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn test_truecolor_consumes_arguments() {
        // The 1 after the color triple must still apply; the 2 and the
        // components must not be read as dim/underline codes.
        let style = AnsiStyle::default().applied("38;2;4;9;3;1");
        assert_eq!(style.foreground, Some(Rgb::new(4, 9, 3)));
        assert!(style.bold);
        assert!(!style.dim && !style.underline && !style.strikethrough && !style.italic);
    }

    #[test]
    fn test_truecolor_components_saturate() {
        let style = AnsiStyle::default().applied("38;2;300;0;999");
        assert_eq!(style.foreground, Some(Rgb::new(255, 0, 255)));
    }

    #[test]
    fn test_truecolor_missing_arguments_ignored() {
        let style = AnsiStyle::default().applied("38;2;10");
        assert_eq!(style.foreground, None);
        // The trailing args are processed as plain codes: 2 → dim
        assert!(style.dim);
    }

    #[test]
    fn test_indexed_and_background_colors_consumed() {
        let style = AnsiStyle::default().applied("38;5;31;48;2;1;2;3;4");
        assert_eq!(style.foreground, None);
        assert!(style.underline);
        assert!(!style.dim);
    }

    #[test]
    fn test_non_numeric_param_skipped() {
        let style = AnsiStyle::default().applied("1;x;4");
        assert!(style.bold);
        assert!(style.underline);
    }

    #[test]
    fn test_unknown_codes_ignored() {
        let style = AnsiStyle::default().applied("5;7;53;1");
        assert_eq!(
            style,
            AnsiStyle {
                bold: true,
                ..Default::default()
            }
        );
    }

    proptest! {
        #[test]
        fn prop_reset_always_yields_default(codes in prop::collection::vec(0u16..110, 0..20)) {
            let params = codes
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(";");
            let style = AnsiStyle::default().applied(&params).applied("0");
            prop_assert_eq!(style, AnsiStyle::default());
        }

        #[test]
        fn prop_apply_never_panics(params in "[0-9;a-z]{0,40}") {
            let _ = AnsiStyle::default().applied(&params);
        }
    }
}
