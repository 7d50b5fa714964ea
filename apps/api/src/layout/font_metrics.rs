//! Static glyph-width table for the carousel sans-serif face.
//!
//! Character widths are in em units (relative to font size). This is an approximation:
//! the rasterizer shapes real glyphs, but the table is close enough to place line breaks
//! in wrapped slots and to size text blocks in the basic raster backend.
//! ASCII 0x20..=0x7E come from the table; East Asian wide characters are one full em;
//! everything else falls back to `average_char_width`.

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table. `widths[i]` = width of ASCII character `(i + 32)`.
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII, non-wide characters.
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    pub fn char_width(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else if is_wide(c) {
            1.0
        } else {
            self.average_char_width
        }
    }

    /// Measures the rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    /// Greedy word-wrap at `max_width_em`. Returns the lines in order.
    ///
    /// Words wider than a whole line are broken between characters, which is also
    /// how unspaced CJK text wraps. An empty or all-whitespace string yields no lines.
    pub fn wrap_lines(&self, text: &str, max_width_em: f32) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        let mut flush = |current: &mut String, width: &mut f32| {
            let line = current.trim_end();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            current.clear();
            *width = 0.0;
        };

        for word in text.split_whitespace() {
            let word_w = self.measure_str(word);
            let space_w = if current.is_empty() {
                0.0
            } else {
                self.space_width
            };

            if current_width + space_w + word_w <= max_width_em {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width += space_w + word_w;
                continue;
            }

            if word_w <= max_width_em {
                flush(&mut current, &mut current_width);
                current.push_str(word);
                current_width = word_w;
                continue;
            }

            // Overlong word: continue the current line and break between characters.
            if !current.is_empty() {
                current.push(' ');
                current_width += self.space_width;
            }
            for c in word.chars() {
                let w = self.char_width(c);
                if !current.trim_end().is_empty() && current_width + w > max_width_em {
                    flush(&mut current, &mut current_width);
                }
                current.push(c);
                current_width += w;
            }
        }
        flush(&mut current, &mut current_width);

        lines
    }
}

/// East Asian wide and fullwidth ranges (Hangul, CJK, kana, fullwidth forms).
fn is_wide(c: char) -> bool {
    matches!(
        c,
        '\u{1100}'..='\u{115F}'
            | '\u{2E80}'..='\u{A4CF}'
            | '\u{AC00}'..='\u{D7A3}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FE30}'..='\u{FE4F}'
            | '\u{FF00}'..='\u{FF60}'
            | '\u{FFE0}'..='\u{FFE6}'
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Static width table  (95 ASCII printable characters)
// ────────────────────────────────────────────────────────────────────────────

/// Humanist sans-serif, close to Noto Sans / Inter.
static SANS_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
        // 0     1     2     3     4     5     6     7     8     9
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
        // [     \     ]     ^     _     `
        0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
        // {     |     }     ~
        0.33, 0.26, 0.33, 0.59,
    ],
    average_char_width: 0.52,
    space_width: 0.25,
};

/// Returns the metric table used for every template slot.
pub fn get_metrics() -> &'static FontMetricTable {
    &SANS_TABLE
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_str_empty_returns_zero() {
        assert_eq!(get_metrics().measure_str(""), 0.0);
    }

    #[test]
    fn test_measure_str_ascii_characters() {
        // "Rust" = R(0.61) + u(0.56) + s(0.44) + t(0.39) = 2.00
        let width = get_metrics().measure_str("Rust");
        assert!(
            (width - 2.00).abs() < 1e-3,
            "Rust width should be ~2.00, got {width}"
        );
    }

    #[test]
    fn test_cjk_is_full_em() {
        let width = get_metrics().measure_str("人工智慧");
        assert!((width - 4.0).abs() < 1e-4, "got {width}");
    }

    #[test]
    fn test_non_ascii_latin_falls_back_to_average() {
        let metrics = get_metrics();
        assert!((metrics.measure_str("é") - metrics.average_char_width).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_short_text_is_one_line() {
        let lines = get_metrics().wrap_lines("Models inherit bias", 40.0);
        assert_eq!(lines, vec!["Models inherit bias".to_string()]);
    }

    #[test]
    fn test_wrap_long_text_breaks_on_words() {
        let text = "Training data shapes every answer a model gives, so audit it before deployment";
        let lines = get_metrics().wrap_lines(text, 12.0);
        assert!(lines.len() > 1, "expected multiple lines, got {lines:?}");
        assert_eq!(lines.join(" "), text, "no words may be lost or split");
        for line in &lines {
            assert!(get_metrics().measure_str(line) <= 12.0 + 1e-3, "line too wide: {line:?}");
        }
    }

    #[test]
    fn test_wrap_unspaced_cjk_breaks_between_characters() {
        let text = "人工智慧如何改變數據分析的未來";
        let lines = get_metrics().wrap_lines(text, 5.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.concat(), text);
        assert!(lines.iter().all(|l| l.chars().count() <= 5));
    }

    #[test]
    fn test_wrap_blank_yields_no_lines() {
        assert!(get_metrics().wrap_lines("   ", 10.0).is_empty());
    }
}
