// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font resolver: loads the display typeface used for student names and falls
// back to Helvetica Bold when it cannot be used.
//
// The school typeface only carries a Windows-symbol (3,0) character map,
// which general-purpose glyph lookup ignores. The cmap subtables are therefore
// walked directly: each WinAnsi code is tried as its Unicode character in the
// Unicode subtables, then at U+F000 + code and at the bare code in the symbol
// subtables. The resulting code-to-glyph table drives PDF glyph widths and
// raster text, which is drawn by glyph id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use ab_glyph::{Font, FontVec, GlyphId};
use blattwerk_core::error::{BlattwerkError, Result};
use tracing::{debug, info, instrument, warn};
use ttf_parser::PlatformId;
use ttf_parser::cmap::{Subtable, Subtables};

/// First and last WinAnsi code covered by the glyph table.
pub const FIRST_CODE: u8 = 32;
pub const LAST_CODE: u8 = 255;
const TABLE_LEN: usize = (LAST_CODE - FIRST_CODE) as usize + 1;

/// Base font name of the standard fallback.
pub const FALLBACK_FONT_NAME: &str = "Helvetica-Bold";

/// Bold sans-serif TrueType files tried for raster text when the display
/// typeface is unavailable.
const SYSTEM_BOLD_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Windows-1252 code points 0x80..=0x9F. Zero marks an undefined code.
const WIN_ANSI_HIGH: [u16; 32] = [
    0x20AC, 0x0000, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
    0x2039, 0x0152, 0x0000, 0x017D, 0x0000, 0x0000, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022,
    0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x0000, 0x017E, 0x0178,
];

/// Unicode character for a WinAnsi code, if the code is defined.
pub fn win_ansi_to_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(char::from(code)),
        0x80..=0x9F => match WIN_ANSI_HIGH[usize::from(code - 0x80)] {
            0 => None,
            cp => char::from_u32(u32::from(cp)),
        },
        _ => None,
    }
}

/// WinAnsi code for a Unicode character, if the code page has it.
pub fn char_to_win_ansi(ch: char) -> Option<u8> {
    match ch {
        '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(ch)).ok(),
        _ => {
            let cp = u32::from(ch);
            WIN_ANSI_HIGH
                .iter()
                .position(|&high| high != 0 && u32::from(high) == cp)
                .and_then(|index| u8::try_from(index + 0x80).ok())
        }
    }
}

/// Horizontal extent of a text run, relative to the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    /// Advance width in em.
    pub width_em: f32,
    /// Distance from the top of the text box to the baseline, in em.
    pub ascent_em: f32,
}

// -- Embedded typeface --------------------------------------------------------

/// A TrueType display typeface with its corrected code table.
pub struct EmbeddedFont {
    name: String,
    data: Vec<u8>,
    face: FontVec,
    /// Glyph per WinAnsi code.
    glyphs: [Option<GlyphId>; TABLE_LEN],
    /// Advance widths in 1/1000 em, per WinAnsi code.
    widths: [u16; TABLE_LEN],
    symbolic: bool,
    ascent_em: f32,
    descent_em: f32,
}

impl EmbeddedFont {
    /// Load and validate a TrueType font file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| {
            BlattwerkError::FontLoad(format!("failed to read {}: {}", path.display(), err))
        })?;
        let name = path
            .file_stem()
            .map(|stem| pdf_font_name(&stem.to_string_lossy()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "DisplayFont".to_string());
        Self::from_bytes(name, data)
    }

    /// Build the font from raw TrueType bytes.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let face = FontVec::try_from_vec(data.clone()).map_err(|err| {
            BlattwerkError::FontLoad(format!("failed to parse font {}: {}", name, err))
        })?;
        let units_per_em = face
            .units_per_em()
            .filter(|upem| *upem > 0.0)
            .ok_or_else(|| BlattwerkError::FontLoad(format!("font {} has no em size", name)))?;

        let table = {
            let parsed = ttf_parser::Face::parse(&data, 0).map_err(|err| {
                BlattwerkError::FontLoad(format!("failed to parse font {}: {}", name, err))
            })?;
            code_table(&parsed)
        };

        let mut glyphs = [None; TABLE_LEN];
        let mut widths = [0u16; TABLE_LEN];
        let mut symbol_hits = 0usize;

        for (index, code) in (FIRST_CODE..=LAST_CODE).enumerate() {
            let Some((glyph, via_symbol)) = table[index] else {
                continue;
            };
            glyphs[index] = Some(glyph);
            let advance = face.h_advance_unscaled(glyph) * 1000.0 / units_per_em;
            widths[index] = advance.round().clamp(0.0, f32::from(u16::MAX)) as u16;
            if via_symbol && code.is_ascii_alphabetic() {
                symbol_hits += 1;
            }
        }

        let missing: String = (b'A'..=b'Z')
            .chain(b'a'..=b'z')
            .filter(|code| glyphs[usize::from(code - FIRST_CODE)].is_none())
            .map(char::from)
            .collect();
        if !missing.is_empty() {
            return Err(BlattwerkError::FontLoad(format!(
                "font {} has no glyphs for letters {:?}",
                name, missing
            )));
        }

        let ascent_em = face.ascent_unscaled() / units_per_em;
        let descent_em = face.descent_unscaled() / units_per_em;
        let symbolic = symbol_hits > 0;

        info!(font = %name, symbolic, units_per_em, "Display font loaded");

        Ok(Self {
            name,
            data,
            face,
            glyphs,
            widths,
            symbolic,
            ascent_em,
            descent_em,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw font program, embedded as FontFile2.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether glyphs were found only in the symbol area (PDF flag 4).
    pub fn is_symbolic(&self) -> bool {
        self.symbolic
    }

    /// Widths for codes FIRST_CODE..=LAST_CODE in 1/1000 em.
    pub fn widths(&self) -> &[u16] {
        &self.widths
    }

    pub fn ascent_em(&self) -> f32 {
        self.ascent_em
    }

    pub fn descent_em(&self) -> f32 {
        self.descent_em
    }

    fn glyph_of(&self, code: u8) -> Option<GlyphId> {
        if code < FIRST_CODE {
            return None;
        }
        self.glyphs[usize::from(code - FIRST_CODE)]
    }

    fn has_code(&self, code: u8) -> bool {
        self.glyph_of(code).is_some()
    }

    fn width_of(&self, code: u8) -> u16 {
        if code < FIRST_CODE {
            return 0;
        }
        self.widths[usize::from(code - FIRST_CODE)]
    }
}

/// Glyph and "found in a symbol subtable" flag for every WinAnsi code.
fn code_table(face: &ttf_parser::Face<'_>) -> [Option<(GlyphId, bool)>; TABLE_LEN] {
    let mut table = [None; TABLE_LEN];
    let Some(cmap) = face.tables().cmap else {
        return table;
    };
    for (index, code) in (FIRST_CODE..=LAST_CODE).enumerate() {
        table[index] = lookup_code(cmap.subtables, code);
    }
    table
}

/// Find a glyph for a WinAnsi code: the Unicode character first, then the
/// symbol-area code point, then the bare code in a symbol subtable.
fn lookup_code(subtables: Subtables<'_>, code: u8) -> Option<(GlyphId, bool)> {
    let glyph = |subtable: &Subtable<'_>, code_point: u32| {
        subtable
            .glyph_index(code_point)
            .filter(|id| id.0 != 0)
            .map(|id| GlyphId(id.0))
    };

    if let Some(ch) = win_ansi_to_char(code) {
        let unicode = subtables
            .into_iter()
            .filter(|subtable| subtable.is_unicode())
            .find_map(|subtable| glyph(&subtable, u32::from(ch)));
        if let Some(id) = unicode {
            return Some((id, false));
        }
    }

    subtables
        .into_iter()
        .filter(is_symbol_subtable)
        .find_map(|subtable| {
            glyph(&subtable, 0xF000 + u32::from(code)).or_else(|| glyph(&subtable, u32::from(code)))
        })
        .map(|id| (id, true))
}

fn is_symbol_subtable(subtable: &Subtable<'_>) -> bool {
    matches!(subtable.platform_id, PlatformId::Windows) && subtable.encoding_id == 0
}

/// Reduce a file stem to a valid PDF base font name.
fn pdf_font_name(stem: &str) -> String {
    stem.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect()
}

// -- Standard fallback --------------------------------------------------------

/// Helvetica Bold, referenced by name in PDFs and drawn with a system bold
/// face on raster worksheets.
pub struct StandardFont {
    raster: Option<FontVec>,
}

impl StandardFont {
    /// Ascender of Helvetica Bold in em.
    pub const ASCENT_EM: f32 = 0.718;
    pub const DESCENT_EM: f32 = -0.207;

    /// Locate a system bold face for raster output.
    pub fn discover() -> Self {
        Self::with_candidates(SYSTEM_BOLD_FONTS.iter().map(PathBuf::from))
    }

    /// Use the first candidate file that parses as a font.
    pub fn with_candidates(candidates: impl IntoIterator<Item = PathBuf>) -> Self {
        for path in candidates {
            if let Ok(data) = std::fs::read(&path)
                && let Ok(font) = FontVec::try_from_vec(data)
            {
                debug!(path = %path.display(), "System bold font found for raster text");
                return Self { raster: Some(font) };
            }
        }
        warn!("No system bold font found; names will be skipped on image worksheets");
        Self { raster: None }
    }

    pub fn raster_face(&self) -> Option<&FontVec> {
        self.raster.as_ref()
    }
}

/// Helvetica Bold advance width in 1/1000 em for a WinAnsi code.
pub fn helvetica_bold_width(code: u8) -> u16 {
    match code {
        b' ' | b',' | b'.' | b'/' | b'I' | b'\\' | b'i' | b'j' | b'l' => 278,
        b'!' | b'(' | b')' | b'-' | b':' | b';' | b'[' | b']' | b'`' | b'f' | b't' => 333,
        b'"' => 474,
        b'\'' => 238,
        b'#' | b'$' | b'0'..=b'9' | b'J' | b'_' | b'a' | b'c' | b'e' | b'k' | b's' | b'v'
        | b'x' | b'y' => 556,
        b'%' | b'm' => 889,
        b'&' | b'A' | b'B' | b'C' | b'D' | b'H' | b'K' | b'N' | b'R' | b'U' => 722,
        b'*' | b'r' | b'{' | b'}' => 389,
        b'+' | b'<' | b'=' | b'>' | b'^' | b'~' => 584,
        b'?' | b'F' | b'L' | b'T' | b'Z' => 611,
        b'b' | b'd' | b'g' | b'h' | b'n' | b'o' | b'p' | b'q' | b'u' => 611,
        b'@' => 975,
        b'E' | b'P' | b'S' | b'V' | b'X' | b'Y' => 667,
        b'G' | b'O' | b'Q' | b'w' => 778,
        b'M' => 833,
        b'W' => 944,
        b'z' => 500,
        b'|' => 280,
        0xA0 => 278,
        0xC6 => 1000,
        0xD7 | 0xF7 => 584,
        0xD8 => 778,
        0xDE => 667,
        0xDF | 0xF0 | 0xF8 | 0xFE => 611,
        0xE6 => 889,
        0xC0..=0xFF => latin1_base_letter(code).map_or(556, helvetica_bold_width),
        _ => 556,
    }
}

/// Unaccented ASCII letter for an accented Latin-1 letter.
fn latin1_base_letter(code: u8) -> Option<u8> {
    let base = match code {
        0xC0..=0xC5 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD0 => b'D',
        0xD1 => b'N',
        0xD2..=0xD6 => b'O',
        0xD9..=0xDC => b'U',
        0xDD => b'Y',
        0xE0..=0xE5 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF1 => b'n',
        0xF2..=0xF6 => b'o',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        _ => return None,
    };
    Some(base)
}

// -- Resolved font ------------------------------------------------------------

/// Outcome of font resolution: the display typeface, or the standard
/// fallback. Rendering never has to handle a load error.
pub enum ResolvedFont {
    Embedded(EmbeddedFont),
    Standard(StandardFont),
}

impl ResolvedFont {
    /// Encode text as WinAnsi bytes for a PDF string. Characters outside the
    /// code page, or without a glyph, become `?`.
    pub fn encode_win_ansi(&self, text: &str) -> Vec<u8> {
        text.chars()
            .map(|ch| match (char_to_win_ansi(ch), self) {
                (Some(code), Self::Embedded(font)) if font.has_code(code) => code,
                (Some(code), Self::Standard(_)) => code,
                _ => b'?',
            })
            .collect()
    }

    /// Extent of text as drawn into a PDF.
    pub fn pdf_extent(&self, text: &str) -> TextExtent {
        let encoded = self.encode_win_ansi(text);
        match self {
            Self::Embedded(font) => TextExtent {
                width_em: sum_widths(&encoded, |code| font.width_of(code)),
                ascent_em: font.ascent_em,
            },
            Self::Standard(_) => TextExtent {
                width_em: sum_widths(&encoded, helvetica_bold_width),
                ascent_em: StandardFont::ASCENT_EM,
            },
        }
    }

    /// Face used to draw text on raster worksheets, if any.
    pub fn raster_face(&self) -> Option<&FontVec> {
        match self {
            Self::Embedded(font) => Some(&font.face),
            Self::Standard(standard) => standard.raster_face(),
        }
    }

    /// Glyphs the raster face draws for `text`. Characters the display
    /// typeface cannot show are drawn as its `?`.
    pub fn raster_glyphs(&self, text: &str) -> Vec<GlyphId> {
        match self {
            Self::Embedded(font) => {
                let unknown = font.glyph_of(b'?').unwrap_or(GlyphId(0));
                text.chars()
                    .map(|ch| {
                        char_to_win_ansi(ch)
                            .and_then(|code| font.glyph_of(code))
                            .unwrap_or(unknown)
                    })
                    .collect()
            }
            Self::Standard(standard) => match standard.raster_face() {
                Some(face) => text.chars().map(|ch| face.glyph_id(ch)).collect(),
                None => Vec::new(),
            },
        }
    }

    /// Extent of text as drawn on a raster worksheet. `None` when there is
    /// no face to draw with.
    pub fn raster_extent(&self, text: &str) -> Option<TextExtent> {
        match self {
            Self::Embedded(_) => Some(self.pdf_extent(text)),
            Self::Standard(standard) => {
                let face = standard.raster_face()?;
                let upem = face.units_per_em().filter(|upem| *upem > 0.0)?;
                let width: f32 = text
                    .chars()
                    .map(|ch| face.h_advance_unscaled(face.glyph_id(ch)))
                    .sum();
                Some(TextExtent {
                    width_em: width / upem,
                    ascent_em: face.ascent_unscaled() / upem,
                })
            }
        }
    }
}

fn sum_widths(encoded: &[u8], width: impl Fn(u8) -> u16) -> f32 {
    encoded.iter().map(|code| f32::from(width(*code))).sum::<f32>() / 1000.0
}

// -- Resolution ---------------------------------------------------------------

/// Resolves the display typeface, substituting the fallback on any failure.
pub struct FontResolver;

impl FontResolver {
    /// Load without caching. Failures are logged and recovered.
    pub fn load(path: Option<&Path>) -> ResolvedFont {
        let Some(path) = path else {
            debug!("No display font configured, using {}", FALLBACK_FONT_NAME);
            return ResolvedFont::Standard(StandardFont::discover());
        };
        match EmbeddedFont::load(path) {
            Ok(font) => ResolvedFont::Embedded(font),
            Err(err) => {
                warn!(%err, fallback = FALLBACK_FONT_NAME, "Display font unusable, falling back");
                ResolvedFont::Standard(StandardFont::discover())
            }
        }
    }

    /// Resolve once per process and font path; later calls share the result.
    pub fn resolve(path: Option<&Path>) -> Arc<ResolvedFont> {
        static CACHE: OnceLock<Mutex<HashMap<Option<PathBuf>, Arc<ResolvedFont>>>> =
            OnceLock::new();

        let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
        let mut fonts = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = path.map(Path::to_path_buf);
        Arc::clone(
            fonts
                .entry(key)
                .or_insert_with(|| Arc::new(Self::load(path))),
        )
    }
}
