// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: a minimal TrueType font assembled in memory.
//
// Three glyphs: .notdef, a filled box (advance 600) used for every printable
// ASCII character except space, and an empty space (advance 250). With
// `symbol` set the only cmap is a Windows-symbol (3,0) subtable at
// U+F020..U+F07E, the layout of the school display typeface; otherwise it is
// a Windows Unicode BMP (3,1) subtable at U+0020..U+007E.

use std::collections::BTreeMap;

pub const UNITS_PER_EM: u16 = 1000;
pub const BOX_ADVANCE: u16 = 600;
pub const SPACE_ADVANCE: u16 = 250;
pub const ASCENDER: i16 = 800;
pub const DESCENDER: i16 = -200;

/// Box outline, in font units.
pub const BOX_X: (i16, i16) = (100, 500);
pub const BOX_TOP: i16 = 700;

const BOX_GLYPH: u16 = 1;
const SPACE_GLYPH: u16 = 2;
const GLYPH_COUNT: u16 = 3;

pub fn truetype_font(symbol: bool) -> Vec<u8> {
    let mut tables: BTreeMap<[u8; 4], Vec<u8>> = BTreeMap::new();
    tables.insert(*b"cmap", cmap(symbol));
    tables.insert(*b"glyf", glyf());
    tables.insert(*b"head", head());
    tables.insert(*b"hhea", hhea());
    tables.insert(*b"hmtx", hmtx());
    tables.insert(*b"loca", loca());
    tables.insert(*b"maxp", maxp());
    sfnt(tables)
}

/// Offset table plus table records, sorted by tag, each table 4-byte aligned.
fn sfnt(tables: BTreeMap<[u8; 4], Vec<u8>>) -> Vec<u8> {
    let count = tables.len() as u16;
    let mut out = Vec::new();
    put_u32(&mut out, 0x0001_0000);
    put_u16(&mut out, count);
    put_u16(&mut out, 64); // searchRange for 7 tables
    put_u16(&mut out, 2);
    put_u16(&mut out, count * 16 - 64);

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        out.extend_from_slice(tag);
        put_u32(&mut out, 0);
        put_u32(&mut out, offset as u32);
        put_u32(&mut out, data.len() as u32);

        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    out.extend_from_slice(&body);
    out
}

fn head() -> Vec<u8> {
    let mut t = Vec::new();
    put_u32(&mut t, 0x0001_0000);
    put_u32(&mut t, 0x0001_0000);
    put_u32(&mut t, 0);
    put_u32(&mut t, 0x5F0F_3CF5);
    put_u16(&mut t, 0x000B);
    put_u16(&mut t, UNITS_PER_EM);
    t.extend_from_slice(&[0; 16]); // created, modified
    put_i16(&mut t, 0);
    put_i16(&mut t, 0);
    put_i16(&mut t, BOX_X.1);
    put_i16(&mut t, BOX_TOP);
    put_u16(&mut t, 0);
    put_u16(&mut t, 8);
    put_i16(&mut t, 2);
    put_i16(&mut t, 0); // short loca
    put_i16(&mut t, 0);
    t
}

fn hhea() -> Vec<u8> {
    let mut t = Vec::new();
    put_u32(&mut t, 0x0001_0000);
    put_i16(&mut t, ASCENDER);
    put_i16(&mut t, DESCENDER);
    put_i16(&mut t, 0);
    put_u16(&mut t, BOX_ADVANCE);
    put_i16(&mut t, 0);
    put_i16(&mut t, 0);
    put_i16(&mut t, BOX_X.1);
    put_i16(&mut t, 1);
    put_i16(&mut t, 0);
    put_i16(&mut t, 0);
    t.extend_from_slice(&[0; 8]);
    put_i16(&mut t, 0);
    put_u16(&mut t, GLYPH_COUNT);
    t
}

fn maxp() -> Vec<u8> {
    let mut t = Vec::new();
    put_u32(&mut t, 0x0000_5000);
    put_u16(&mut t, GLYPH_COUNT);
    t
}

fn hmtx() -> Vec<u8> {
    let mut t = Vec::new();
    for (advance, lsb) in [(500, 0), (BOX_ADVANCE, BOX_X.0), (SPACE_ADVANCE, 0)] {
        put_u16(&mut t, advance);
        put_i16(&mut t, lsb);
    }
    t
}

/// Glyph 1 only; glyphs 0 and 2 have no outline.
fn glyf() -> Vec<u8> {
    let (left, right) = BOX_X;
    let mut t = Vec::new();
    put_i16(&mut t, 1);
    put_i16(&mut t, left);
    put_i16(&mut t, 0);
    put_i16(&mut t, right);
    put_i16(&mut t, BOX_TOP);
    put_u16(&mut t, 3); // last point of the contour
    put_u16(&mut t, 0); // no instructions
    t.extend_from_slice(&[0x01; 4]); // on-curve, full-width deltas
    for dx in [left, right - left, 0, left - right] {
        put_i16(&mut t, dx);
    }
    for dy in [0, 0, BOX_TOP, 0] {
        put_i16(&mut t, dy);
    }
    t.extend_from_slice(&[0, 0]);
    t
}

fn loca() -> Vec<u8> {
    let box_len = glyf().len() as u16;
    let mut t = Vec::new();
    for offset in [0, 0, box_len, box_len] {
        put_u16(&mut t, offset / 2);
    }
    t
}

/// One format 4 subtable: space by delta, `!`..`~` through the glyph array.
fn cmap(symbol: bool) -> Vec<u8> {
    let base: u16 = if symbol { 0xF000 } else { 0 };
    let space = base + 0x20;
    let (first, last) = (base + 0x21, base + 0x7E);
    let array_len = usize::from(last - first) + 1;
    let seg_count: u16 = 3;

    let mut sub = Vec::new();
    put_u16(&mut sub, 4);
    put_u16(&mut sub, 16 + 8 * seg_count + 2 * array_len as u16);
    put_u16(&mut sub, 0);
    put_u16(&mut sub, seg_count * 2);
    put_u16(&mut sub, 4);
    put_u16(&mut sub, 1);
    put_u16(&mut sub, seg_count * 2 - 4);
    for end in [space, last, 0xFFFF] {
        put_u16(&mut sub, end);
    }
    put_u16(&mut sub, 0);
    for start in [space, first, 0xFFFF] {
        put_u16(&mut sub, start);
    }
    for delta in [SPACE_GLYPH.wrapping_sub(space), 0, 1] {
        put_u16(&mut sub, delta);
    }
    // Segment 1 reads the array that starts right after the offsets.
    for range_offset in [0, 2 * (seg_count - 1), 0] {
        put_u16(&mut sub, range_offset);
    }
    for _ in 0..array_len {
        put_u16(&mut sub, BOX_GLYPH);
    }

    let mut t = Vec::new();
    put_u16(&mut t, 0);
    put_u16(&mut t, 1);
    put_u16(&mut t, 3); // Windows
    put_u16(&mut t, if symbol { 0 } else { 1 });
    put_u32(&mut t, 12);
    t.extend_from_slice(&sub);
    t
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
