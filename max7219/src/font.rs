//! Define a primitive font that works by setting the 7 segments in the 7 seg display to display
//! a subset of ASCII chars.
//!
//! With decode mode disabled, each digit register of the MAX7219 holds one bit per segment:
//!
//! ```text
//!   bit:   7  6  5  4  3  2  1  0
//!   seg:  DP  A  B  C  D  E  F  G
//! ```

/// Bit which lights the decimal point to the bottom right of a digit
pub const DOT_MASK: u8 = 0b1000_0000;

/// Lowest char of the punctuation range which is drawn as a dotted digit (`#`)
const DOTTED_DIGIT_FIRST: u8 = 35;

/// Highest char of the punctuation range which is drawn as a dotted digit (`,`)
const DOTTED_DIGIT_LAST: u8 = 44;

/// Distance from the dotted-digit punctuation range to `'0'..='9'`
const DOTTED_DIGIT_SHIFT: u8 = b'0' - DOTTED_DIGIT_FIRST;

/// Look up the segment pattern for `char`, without any decimal point.
///
/// Returns `None` if the font has no glyph for this char.
pub fn glyph(char: char) -> Option<u8> {
    if !char.is_ascii() {
        return None;
    }

    let ascii = char as u8;

    FONT_TABLE
        .binary_search_by_key(&ascii, |(code, _)| *code)
        .ok()
        .map(|index| FONT_TABLE[index].1)
}

/// Encode `char` as the byte to write to a digit register, lighting the decimal point if `dot`
/// is set.
///
/// The punctuation chars `#` through `,` share glyphs with the digits `0` through `9` and are
/// always drawn with the decimal point lit, whatever the value of `dot`.
///
/// Chars missing from the font are drawn blank, but still get the decimal point when `dot` is
/// set, so `encode(c, true) == encode(c, false) | 0x80` for every char.  The classic Arduino
/// driver returns 0 for these instead, dropping the dot.
pub fn encode(char: char, dot: bool) -> u8 {
    let (char, dot) =
        if char.is_ascii() && (DOTTED_DIGIT_FIRST..=DOTTED_DIGIT_LAST).contains(&(char as u8)) {
            ((char as u8 + DOTTED_DIGIT_SHIFT) as char, true)
        } else {
            (char, dot)
        };

    let segments = glyph(char).unwrap_or(0);

    if dot {
        segments | DOT_MASK
    } else {
        segments
    }
}

/// Font table mapping ASCII codes to segment patterns, sorted by ASCII code so it can be binary
/// searched.
///
/// Glyphs match the classic MAX7219 Arduino driver; chars with no legible 7 segment rendering
/// (`K`, `M`, `W`, ...) are left out and show as blanks.
const FONT_TABLE: &[(u8, u8)] = &[
    (b' ', 0b000_0000),
    (b'-', 0b000_0001),
    (b'0', 0b111_1110),
    (b'1', 0b011_0000),
    (b'2', 0b110_1101),
    (b'3', 0b111_1001),
    (b'4', 0b011_0011),
    (b'5', 0b101_1011),
    (b'6', 0b101_1111),
    (b'7', 0b111_0000),
    (b'8', 0b111_1111),
    (b'9', 0b111_1011),
    (b'A', 0b111_0111),
    (b'B', 0b111_1111),
    (b'C', 0b100_1110),
    (b'D', 0b111_1110),
    (b'E', 0b100_1111),
    (b'F', 0b100_0111),
    (b'G', 0b101_1110),
    (b'H', 0b011_0111),
    (b'I', 0b011_0000),
    (b'J', 0b011_1100),
    (b'L', 0b000_1110),
    (b'N', 0b111_0110),
    (b'O', 0b111_1110),
    (b'P', 0b110_0111),
    (b'R', 0b000_0101),
    (b'S', 0b101_1011),
    (b'T', 0b000_1111),
    (b'U', 0b011_1110),
    (b'Y', 0b010_0111),
    (b'[', 0b100_1110),
    (b']', 0b111_1000),
    (b'_', 0b000_1000),
    (b'a', 0b111_0111),
    (b'b', 0b001_1111),
    (b'c', 0b000_1101),
    (b'd', 0b011_1101),
    (b'e', 0b100_1111),
    (b'f', 0b100_0111),
    (b'g', 0b101_1110),
    (b'h', 0b001_0111),
    (b'i', 0b001_0000),
    (b'j', 0b011_1100),
    (b'l', 0b000_1110),
    (b'n', 0b001_0101),
    (b'o', 0b111_1110),
    (b'p', 0b110_0111),
    (b'r', 0b000_0101),
    (b's', 0b101_1011),
    (b't', 0b000_1111),
    (b'u', 0b001_1100),
    (b'y', 0b010_0111),
];
