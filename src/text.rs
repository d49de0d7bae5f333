//! Text drawing.
//!
//! Uses a system font through skrifa glyph metrics when one is installed and
//! falls back to a 5x7 block font otherwise, so the dashboard always has
//! legible labels.

use skrifa::MetadataProvider;
use tracing::{info, warn};
use vello::kurbo::{Affine, Rect};
use vello::peniko::{Color, Fill, FontData};
use vello::{Glyph, Scene};

/// Horizontal anchoring of a run relative to its `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

pub struct TextPainter {
    font: Option<FontData>,
}

impl TextPainter {
    /// Load the first readable system font, or run with the block font.
    pub fn load() -> Self {
        match load_readable_font() {
            Some(font) => {
                info!(target: "text", "loaded system font");
                Self { font: Some(font) }
            }
            None => {
                warn!(target: "text", "no system font found, using block font fallback");
                Self::block_only()
            }
        }
    }

    pub fn block_only() -> Self {
        Self { font: None }
    }

    /// Advance width of `text` at `size` pixels.
    pub fn measure(&self, text: &str, size: f32) -> f64 {
        match &self.font {
            Some(font) => shape_line(font, text, size, 0.0, 0.0)
                .map(|(_, width)| width)
                .unwrap_or_else(|| block_width(text, size)),
            None => block_width(text, size),
        }
    }

    /// Draw a single line with its baseline at `y`.
    pub fn draw(&self, scene: &mut Scene, text: &str, x: f64, y: f64, size: f32, color: Color, align: Align) {
        let width = self.measure(text, size);
        let x = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        if let Some(font) = &self.font {
            if let Some((glyphs, _)) = shape_line(font, text, size, x, y) {
                if !glyphs.is_empty() {
                    scene
                        .draw_glyphs(font)
                        .font_size(size)
                        .brush(&color)
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
                return;
            }
        }
        draw_blocks(scene, text, x, y, size, color);
    }

    /// `text`, shortened with a trailing ellipsis until it fits `max_width`.
    pub fn fit(&self, text: &str, size: f32, max_width: f64) -> String {
        if self.measure(text, size) <= max_width {
            return text.to_string();
        }
        let mut chars: Vec<char> = text.chars().collect();
        while !chars.is_empty() {
            chars.pop();
            let candidate: String = chars.iter().collect::<String>() + "...";
            if self.measure(&candidate, size) <= max_width {
                return candidate;
            }
        }
        String::new()
    }

    /// Greedy word wrap into lines no wider than `max_width`. A single word
    /// wider than the limit gets a line of its own.
    pub fn wrap(&self, text: &str, size: f32, max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        for word in text.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if self.measure(&candidate, size) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }
}

// --- Font layout ---

/// Position glyphs for one unwrapped line. `None` if the font can't be parsed.
fn shape_line(font: &FontData, text: &str, size: f32, x: f64, y: f64) -> Option<(Vec<Glyph>, f64)> {
    let font_ref = skrifa::FontRef::from_index(font.data.as_ref(), font.index).ok()?;
    let charmap = font_ref.charmap();
    let metrics = font_ref.glyph_metrics(
        skrifa::instance::Size::new(size),
        skrifa::instance::LocationRef::default(),
    );

    let mut pen = x;
    let glyphs = text
        .chars()
        .map(|ch| {
            let gid = charmap.map(ch).unwrap_or_default();
            let glyph = Glyph {
                id: gid.to_u32(),
                x: pen as f32,
                y: y as f32,
            };
            pen += metrics.advance_width(gid).unwrap_or(size * 0.5) as f64;
            glyph
        })
        .collect();
    Some((glyphs, pen - x))
}

/// Try each family in `names` across the usual macOS and Linux font dirs.
fn load_system_font(names: &[&str]) -> Option<FontData> {
    const DIRS: [&str; 6] = [
        "/System/Library/Fonts/",
        "/System/Library/Fonts/Supplemental/",
        "/Library/Fonts/",
        "/usr/share/fonts/truetype/dejavu/",
        "/usr/share/fonts/truetype/liberation/",
        "/usr/share/fonts/truetype/",
    ];
    const EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

    names.iter().find_map(|name| {
        DIRS.iter().find_map(|dir| {
            EXTENSIONS.iter().find_map(|ext| {
                std::fs::read(format!("{dir}{name}.{ext}"))
                    .ok()
                    .map(|data| FontData::new(data.into(), 0))
            })
        })
    })
}

/// Sans-serif stack: Helvetica > Arial > DejaVu Sans > Liberation Sans.
fn load_readable_font() -> Option<FontData> {
    load_system_font(&["Helvetica", "Arial", "DejaVuSans", "LiberationSans-Regular"])
}

// --- Block font fallback ---

const BLOCK_W: f64 = 7.0;
const BLOCK_H: f64 = 12.0;
const BLOCK_GAP: f64 = 1.0;

fn block_scale(size: f32) -> f64 {
    size as f64 / 14.0
}

fn block_width(text: &str, size: f32) -> f64 {
    let n = text.chars().count() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let s = block_scale(size);
    n * (BLOCK_W + BLOCK_GAP) * s - BLOCK_GAP * s
}

fn draw_blocks(scene: &mut Scene, text: &str, x: f64, baseline: f64, size: f32, color: Color) {
    let s = block_scale(size);
    let (cw, ch) = (BLOCK_W * s, BLOCK_H * s);
    let (px, py) = (cw / 5.0, ch / 7.0);
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = block_glyph(c) else {
            continue;
        };
        let left = x + i as f64 * (cw + BLOCK_GAP * s);
        let top = baseline - ch;
        for row in 0..7 {
            let bits = (rows >> (8 * (6 - row))) & 0x1f;
            for col in 0..5 {
                if bits >> (4 - col) & 1 == 1 {
                    let x0 = left + col as f64 * px;
                    let y0 = top + row as f64 * py;
                    let cell = Rect::new(x0, y0, x0 + px, y0 + py);
                    scene.fill(Fill::NonZero, Affine::IDENTITY, color, None, &cell);
                }
            }
        }
    }
}

/// Seven 5-bit rows packed one per byte, top row in the high byte.
/// Lowercase letters render as uppercase.
fn block_glyph(c: char) -> Option<u64> {
    const GLYPHS: [(u8, u64); 47] = [
        (b'A', 0x0e11111f111111), (b'B', 0x1e11111e11111e), (b'C', 0x0e11101010110e), (b'D', 0x1c12111111121c),
        (b'E', 0x1f10101e10101f), (b'F', 0x1f10101e101010), (b'G', 0x0e11101711110e), (b'H', 0x1111111f111111),
        (b'I', 0x0e04040404040e), (b'J', 0x0702020202120c), (b'K', 0x11121418141211), (b'L', 0x1010101010101f),
        (b'M', 0x111b1515111111), (b'N', 0x11191513111111), (b'O', 0x0e11111111110e), (b'P', 0x1e11111e101010),
        (b'Q', 0x0e11111115120d), (b'R', 0x1e11111e141211), (b'S', 0x0e11100e01110e), (b'T', 0x1f040404040404),
        (b'U', 0x1111111111110e), (b'V', 0x111111110a0a04), (b'W', 0x11111115151b11), (b'X', 0x11110a040a1111),
        (b'Y', 0x11110a04040404), (b'Z', 0x1f01020408101f), (b'0', 0x0e11131519110e), (b'1', 0x040c040404040e),
        (b'2', 0x0e11010204081f), (b'3', 0x1f02040201110e), (b'4', 0x02060a121f0202), (b'5', 0x1f101e0101110e),
        (b'6', 0x0608101e11110e), (b'7', 0x1f010204080808), (b'8', 0x0e11110e11110e), (b'9', 0x0e11110f01020c),
        (b'.', 0x00000000000c0c), (b',', 0x00000000060408), (b':', 0x000c0c000c0c00), (b'!', 0x04040404040004),
        (b'?', 0x0e110102040004), (b'-', 0x0000001f000000), (b'+', 0x0004041f040400), (b'/', 0x01010204081010),
        (b'(', 0x02040808080402), (b')', 0x08040202020408), (b'%', 0x19190204081313),
    ];
    let key = u8::try_from(c.to_ascii_uppercase()).ok()?;
    GLYPHS.iter().find(|(k, _)| *k == key).map(|(_, rows)| *rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_width_scales_with_size_and_length() {
        assert_eq!(block_width("", 14.0), 0.0);
        assert!((block_width("A", 14.0) - 7.0).abs() < 1e-9);
        assert!((block_width("AB", 14.0) - 15.0).abs() < 1e-9);
        assert!((block_width("AB", 28.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn lowercase_maps_to_uppercase_glyph() {
        assert_eq!(block_glyph('a'), block_glyph('A'));
        assert!(block_glyph('%').is_some());
        assert!(block_glyph(' ').is_none());
        assert!(block_glyph('é').is_none());
    }

    #[test]
    fn fit_keeps_short_text_and_ellipsizes_long_text() {
        let painter = TextPainter::block_only();
        assert_eq!(painter.fit("Task 1", 14.0, 500.0), "Task 1");

        let fitted = painter.fit("Quarterly Access Review", 14.0, 80.0);
        assert!(fitted.ends_with("..."));
        assert!(painter.measure(&fitted, 14.0) <= 80.0);
        assert_eq!(painter.fit("Anything", 14.0, 1.0), "");
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let painter = TextPainter::block_only();
        // 8px per block glyph at size 14, so 10 glyphs is 79px.
        let lines = painter.wrap("one two three four", 14.0, 79.0);
        assert_eq!(lines, ["one two", "three four"]);
        assert_eq!(painter.wrap("   ", 14.0, 79.0), Vec::<String>::new());
        assert_eq!(painter.wrap("unbreakablewordhere", 14.0, 20.0), ["unbreakablewordhere"]);
    }

    #[test]
    fn drawing_without_font_does_not_panic() {
        let painter = TextPainter::block_only();
        let mut scene = Scene::new();
        painter.draw(&mut scene, "40% done", 10.0, 20.0, 14.0, Color::new([0.0, 0.0, 0.0, 1.0]), Align::Center);
        assert!(painter.font.is_none());
    }
}
