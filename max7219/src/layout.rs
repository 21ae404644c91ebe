//! Lay a string of text out over a row of 7 segment digits.
//!
//! A `.` doesn't need a digit of its own when it follows some other char, because every digit
//! has its own decimal point.  So `"1.2.3"` takes up 3 digits, not 5.  A `.` with nothing in
//! front of it to attach to (at the start of the text, or following another `.` which already
//! used up the previous decimal point) is drawn as a blank digit with the decimal point lit.
//!
//! All of the counting here is in terms of these "logical units" rather than chars or bytes.

const DOT: char = '.';

/// How text shorter than the display is positioned, and which end of text longer than the
/// display is kept.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Justify {
    /// Text starts at the left-most digit.  Anything that doesn't fit is cut off the end.
    Left,

    /// Text ends at the right-most digit.  Anything that doesn't fit is cut off the start.
    ///
    /// Digits to the left of the text are not touched, so clear the display first if they
    /// might still show something from before.
    #[default]
    Right,
}

/// One char of text, resolved to the digit it is drawn on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Placement {
    /// Digit position, where `0` is the right-most digit of the first chip in the chain
    pub position: usize,

    /// The char to draw.  A `.` which can't be merged into a previous char comes out as `' '`
    /// with `dot` set.
    pub character: char,

    /// Light the decimal point of this digit
    pub dot: bool,
}

/// Byte index of the start of each logical unit in `text`.
fn unit_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    // Set once a char has been placed whose decimal point is still free
    let mut char_found = false;

    text.char_indices().filter_map(move |(index, char)| {
        if char == DOT {
            if char_found {
                // Merges into the previous char
                char_found = false;
                return None;
            }
        } else {
            char_found = true;
        }

        Some(index)
    })
}

/// The number of digits needed to show all of `text`.
pub fn logical_len(text: &str) -> usize {
    unit_starts(text).count()
}

/// Byte index in `text` where logical unit `n` starts, or `text.len()` if `text` has `n` or
/// fewer units.
pub fn logical_offset(text: &str, n: usize) -> usize {
    unit_starts(text).nth(n).unwrap_or(text.len())
}

/// Iterator over the [`Placement`]s needed to draw some text on `total_digits` digits.
///
/// Placements are produced left to right, so the digit positions count down.  Text that doesn't
/// fit is truncated according to the [`Justify`] setting; this never produces a position at or
/// past `total_digits`.
#[derive(Clone, Debug)]
pub struct Layout<'a> {
    chars: core::iter::Peekable<core::str::Chars<'a>>,
    total_digits: usize,
    /// Digits used so far, counting from the left-most digit
    counter: usize,
    /// The last placement was a char whose decimal point a following `.` can use
    char_found: bool,
}

impl<'a> Layout<'a> {
    pub fn new(text: &'a str, justify: Justify, total_digits: usize) -> Self {
        let len = logical_len(text);

        let (text, counter) = match justify {
            Justify::Right if len <= total_digits => (text, total_digits - len),
            // Keep only the last `total_digits` units
            Justify::Right => (&text[logical_offset(text, len - total_digits)..], 0),
            Justify::Left => (text, 0),
        };

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "layout: {=usize} units on {=usize} digits, first at {=usize}",
            len,
            total_digits,
            counter
        );

        Self {
            chars: text.chars().peekable(),
            total_digits,
            counter,
            char_found: false,
        }
    }
}

impl Iterator for Layout<'_> {
    type Item = Placement;

    fn next(&mut self) -> Option<Self::Item> {
        while self.counter < self.total_digits {
            let char = self.chars.next()?;

            let (character, dot) = if char == DOT {
                if self.char_found {
                    // The previous char was already placed with its dot lit
                    self.char_found = false;
                    continue;
                }

                (' ', true)
            } else {
                self.char_found = true;

                // Light the dot now rather than going back for it once the `.` is reached
                (char, self.chars.peek() == Some(&DOT))
            };

            let position = self.total_digits - 1 - self.counter;
            self.counter += 1;

            return Some(Placement {
                position,
                character,
                dot,
            });
        }

        None
    }
}
