//! LZ-string compression with the URI-safe alphabet.
//!
//! Tokens produced here are interchangeable with the `lz-string` JavaScript
//! library (`compressToEncodedURIComponent` /
//! `decompressFromEncodedURIComponent`), so a phone-side scanner built on it
//! can read them. Input is processed as UTF-16 code units, exactly like the
//! JavaScript implementation, and the bit stream is packed six bits per
//! output character.
//!
//! The code space starts with three reserved codes: `0` introduces a literal
//! 8-bit unit, `1` a literal 16-bit unit and `2` ends the stream. Code widths
//! grow by one bit whenever the dictionary outgrows the current width.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

/// Output alphabet; every character is safe in a URI component. Only the
/// first 64 are ever emitted; `$` is accepted on input.
const ALPHABET: &[u8; 65] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+-$";

const BITS_PER_CHAR: u32 = 6;

/// First bit read from each input character (MSB first).
const FIRST_BIT_MASK: u32 = 1 << (BITS_PER_CHAR - 1);

const CODE_LITERAL_8: u32 = 0;
const CODE_LITERAL_16: u32 = 1;
const CODE_END: u32 = 2;

/// Code widths are bounded well before this by any realistic input.
const MAX_CODE_BITS: u32 = 31;

/// Packs variable-width codes into alphabet characters.
struct BitWriter {
    out: String,
    value: u32,
    position: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            value: 0,
            position: 0,
        }
    }

    fn push_bit(&mut self, bit: u32) {
        self.value = (self.value << 1) | bit;
        if self.position == BITS_PER_CHAR - 1 {
            self.position = 0;
            self.flush_char();
        } else {
            self.position += 1;
        }
    }

    /// Write `count` bits of `value`, least significant bit first.
    fn push_bits(&mut self, mut value: u32, count: u32) {
        for _ in 0..count {
            self.push_bit(value & 1);
            value >>= 1;
        }
    }

    fn flush_char(&mut self) {
        self.out.push(char::from(ALPHABET[self.value as usize]));
        self.value = 0;
    }

    /// Pad the last character with zero bits. Always emits one more
    /// character, even when the stream ended on a character boundary.
    fn finish(mut self) -> String {
        loop {
            self.value <<= 1;
            if self.position == BITS_PER_CHAR - 1 {
                self.flush_char();
                break;
            }
            self.position += 1;
        }
        self.out
    }
}

/// Dictionary state on the compressing side.
struct Compressor {
    dictionary: HashMap<Vec<u16>, u32>,
    /// Single units added to the dictionary but not yet sent as literals.
    pending_literals: HashSet<u16>,
    next_code: u32,
    code_bits: u32,
    enlarge_in: u32,
    out: BitWriter,
}

impl Compressor {
    fn new() -> Self {
        Self {
            dictionary: HashMap::new(),
            pending_literals: HashSet::new(),
            next_code: 3,
            code_bits: 2,
            enlarge_in: 2,
            out: BitWriter::new(),
        }
    }

    /// Code for a single unit, registering it on first sight.
    fn unit_code(&mut self, unit: u16) -> u32 {
        if let Some(&code) = self.dictionary.get(&[unit][..]) {
            return code;
        }
        let code = self.allocate(vec![unit]);
        self.pending_literals.insert(unit);
        code
    }

    fn allocate(&mut self, phrase: Vec<u16>) -> u32 {
        let code = self.next_code;
        self.dictionary.insert(phrase, code);
        self.next_code += 1;
        code
    }

    fn tick(&mut self) {
        self.enlarge_in -= 1;
        if self.enlarge_in == 0 {
            self.enlarge_in = 1 << self.code_bits;
            self.code_bits += 1;
        }
    }

    fn emit(&mut self, phrase: &[u16], code: u32) {
        if let [unit] = phrase {
            if self.pending_literals.remove(unit) {
                if *unit < 256 {
                    self.out.push_bits(CODE_LITERAL_8, self.code_bits);
                    self.out.push_bits(u32::from(*unit), 8);
                } else {
                    self.out.push_bits(CODE_LITERAL_16, self.code_bits);
                    self.out.push_bits(u32::from(*unit), 16);
                }
                // A literal also claims the slot its unit took in the dictionary.
                self.tick();
                self.tick();
                return;
            }
        }
        self.out.push_bits(code, self.code_bits);
        self.tick();
    }

    fn finish(mut self) -> String {
        self.out.push_bits(CODE_END, self.code_bits);
        self.out.finish()
    }
}

/// Compress `input` into a URI-safe token.
///
/// The empty string compresses to `"Q"`, a lone end-of-stream marker.
#[must_use]
pub fn compress(input: &str) -> String {
    let mut compressor = Compressor::new();
    let mut phrase: Vec<u16> = Vec::new();
    let mut phrase_code = 0;

    for unit in input.encode_utf16() {
        let unit_code = compressor.unit_code(unit);

        let mut extended = phrase.clone();
        extended.push(unit);
        if let Some(&code) = compressor.dictionary.get(&extended) {
            phrase = extended;
            phrase_code = code;
        } else {
            compressor.emit(&phrase, phrase_code);
            compressor.allocate(extended);
            phrase = vec![unit];
            phrase_code = unit_code;
        }
    }

    if !phrase.is_empty() {
        compressor.emit(&phrase, phrase_code);
    }
    compressor.finish()
}

/// Reads variable-width codes back out of a token.
struct BitReader {
    values: Vec<u32>,
    index: usize,
    current: u32,
    mask: u32,
}

impl BitReader {
    fn new(token: &str) -> Result<Self> {
        let values = token
            .chars()
            // Form encoding may have turned '+' into a space on the way in.
            .map(|ch| if ch == ' ' { '+' } else { ch })
            .map(|ch| {
                ALPHABET
                    .iter()
                    .position(|&b| char::from(b) == ch)
                    .map(|pos| pos as u32)
                    .ok_or_else(|| Error::token(format!("invalid character {ch:?}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let current = *values.first().ok_or_else(|| Error::token("token is empty"))?;
        Ok(Self {
            values,
            index: 1,
            current,
            mask: FIRST_BIT_MASK,
        })
    }

    /// Read `count` bits, least significant first. Reading past the end
    /// yields zero bits; callers check [`Self::exhausted`] between codes.
    fn read_bits(&mut self, count: u32) -> u32 {
        let mut bits = 0;
        for power in 0..count {
            let bit = self.current & self.mask;
            self.mask >>= 1;
            if self.mask == 0 {
                self.mask = FIRST_BIT_MASK;
                self.current = self.values.get(self.index).copied().unwrap_or(0);
                self.index += 1;
            }
            if bit != 0 {
                bits |= 1 << power;
            }
        }
        bits
    }

    fn exhausted(&self) -> bool {
        self.index > self.values.len()
    }
}

fn literal_unit(bits: u32) -> Result<u16> {
    u16::try_from(bits).map_err(|_| Error::token(format!("literal {bits} out of range")))
}

fn into_string(units: &[u16]) -> Result<String> {
    String::from_utf16(units).map_err(|e| Error::token(format!("invalid UTF-16: {e}")))
}

/// Decompress a token produced by [`compress`].
///
/// Spaces are read as `+`.
///
/// # Errors
///
/// Returns [`Error::TokenDecode`] if the token is empty, contains characters
/// outside the alphabet, refers to unknown dictionary entries, ends before
/// the end-of-stream marker, or decodes to invalid UTF-16.
pub fn decompress(token: &str) -> Result<String> {
    let mut reader = BitReader::new(token)?;

    // Codes 0..=2 are reserved and never looked up.
    let mut dictionary: Vec<Vec<u16>> = vec![Vec::new(); 3];

    let first = match reader.read_bits(2) {
        CODE_LITERAL_8 => literal_unit(reader.read_bits(8))?,
        CODE_LITERAL_16 => literal_unit(reader.read_bits(16))?,
        CODE_END => return Ok(String::new()),
        other => return Err(Error::token(format!("invalid leading code {other}"))),
    };

    let mut previous = vec![first];
    dictionary.push(previous.clone());
    let mut output = previous.clone();
    let mut enlarge_in: u32 = 4;
    let mut code_bits: u32 = 3;

    loop {
        if reader.exhausted() {
            return Err(Error::token("unexpected end of token"));
        }
        if code_bits > MAX_CODE_BITS {
            return Err(Error::token("code width overflow"));
        }

        let code = match reader.read_bits(code_bits) {
            bits @ (CODE_LITERAL_8 | CODE_LITERAL_16) => {
                let width = if bits == CODE_LITERAL_8 { 8 } else { 16 };
                dictionary.push(vec![literal_unit(reader.read_bits(width))?]);
                enlarge_in -= 1;
                dictionary.len() - 1
            }
            CODE_END => return into_string(&output),
            bits => bits as usize,
        };

        if enlarge_in == 0 {
            enlarge_in = 1 << code_bits;
            code_bits += 1;
        }

        let entry = match dictionary.get(code) {
            Some(entry) => entry.clone(),
            // The one code the encoder can use before the decoder has built it.
            None if code == dictionary.len() => {
                let mut entry = previous.clone();
                entry.push(previous[0]);
                entry
            }
            None => return Err(Error::token(format!("unknown dictionary code {code}"))),
        };
        output.extend_from_slice(&entry);

        let mut added = previous;
        added.push(entry[0]);
        dictionary.push(added);
        enlarge_in -= 1;
        previous = entry;

        if enlarge_in == 0 {
            enlarge_in = 1 << code_bits;
            code_bits += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASHA_JSON: &str = r#"{"name":"Asha Rao","roll":"12B-07","classDivision":"B","rack":"R4","busRoute":"2","allergies":["Peanuts","Dairy","Dust"]}"#;
    const ASHA_TOKEN: &str = "N4IgdghgtgpiBcICCBnAFhABAJQgexABoQAnPAG3IRAEYAmAIQFoAGAdiJAGNyIUUAIgEsAbkJRC8Yag04kIXANbVsAFk4AjAK4pseLQBc4iOpwiUYJAOZCYKBAG0QABRgQwh+8QEQhJAJ6cAjoGIAC6AL5AA";

    #[test]
    fn test_compress_empty() {
        assert_eq!(compress(""), "Q");
    }

    #[test]
    fn test_compress_known_vectors() {
        assert_eq!(compress("a"), "IZA");
        assert_eq!(compress("aaaaaaaaaaaaaaaaaaaa"), "IY1-kA");
        assert_eq!(compress("abababababababab"), "IYI17SKA");
        assert_eq!(compress("hello world hello world"), "BYUwNmD2AEDukCcwBNqgjeTlA");
        assert_eq!(compress("Dust Dust Dust"), "CIVwzgLgBKk+Eg");
    }

    #[test]
    fn test_compress_matches_browser_token() {
        assert_eq!(compress(ASHA_JSON), ASHA_TOKEN);
    }

    #[test]
    fn test_compress_wide_units() {
        // Characters above U+00FF and surrogate pairs use 16-bit literals.
        assert_eq!(
            compress("Zoë ünïcode ✓ 名前 😀"),
            "Foew1wBAPwdg9wYxAEwKYUMjkFCwKoWSUKC8G4AB7QA"
        );
        assert_eq!(compress("Ā"), "gCAQ");
    }

    #[test]
    fn test_decompress_known_vectors() {
        assert_eq!(decompress("Q").unwrap(), "");
        assert_eq!(decompress("IZA").unwrap(), "a");
        assert_eq!(decompress(ASHA_TOKEN).unwrap(), ASHA_JSON);
        assert_eq!(
            decompress("Foew1wBAPwdg9wYxAEwKYUMjkFCwKoWSUKC8G4AB7QA").unwrap(),
            "Zoë ünïcode ✓ 名前 😀"
        );
    }

    #[test]
    fn test_decompress_reads_space_as_plus() {
        assert_eq!(decompress("CIVwzgLgBKk Eg").unwrap(), "Dust Dust Dust");
    }

    #[test]
    fn test_decompress_empty_token() {
        let err = decompress("").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_decompress_invalid_character() {
        let err = decompress("IZ#A").unwrap_err();
        assert!(err.to_string().contains("invalid character"));
    }

    #[test]
    fn test_decompress_truncated_token() {
        for len in [5, 10, 40] {
            assert!(decompress(&ASHA_TOKEN[..len]).is_err(), "prefix of {len}");
        }
    }

    #[test]
    fn test_round_trip_repetitive_and_mixed_input() {
        let inputs = [
            "x".repeat(5000),
            "Peanuts, Dairy, Dust".repeat(40),
            "Ärger über Öl 😀😀 名前名前".to_string(),
            (0u8..=127).map(char::from).collect::<String>(),
        ];
        for input in inputs {
            assert_eq!(decompress(&compress(&input)).unwrap(), input);
        }
    }

    #[test]
    fn test_tokens_use_uri_safe_alphabet() {
        let token = compress(ASHA_JSON);
        assert!(token.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_dollar_is_never_emitted() {
        let inputs = [ASHA_JSON.to_string(), "z".repeat(3000), "😀✓".repeat(500)];
        for input in inputs {
            assert!(!compress(&input).contains('$'));
        }
        assert_eq!(ALPHABET.len(), 65);
    }

    #[test]
    fn test_matches_reference_implementation() {
        let inputs = [
            String::new(),
            ASHA_JSON.to_string(),
            "x".repeat(5000),
            "Ärger über Öl 😀😀 名前名前".to_string(),
            (1u16..2048)
                .filter_map(|u| char::from_u32(u32::from(u)))
                .collect::<String>(),
        ];
        for input in inputs {
            let ours = compress(&input);
            assert_eq!(ours, lz_str::compress_to_encoded_uri_component(input.as_str()));
            assert_eq!(decompress(&ours).unwrap(), input);
        }
    }
}
