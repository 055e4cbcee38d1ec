//! Decoding of profile values stored in PHP `serialize()` form
//!
//! Multi-value profile fields (checkboxes, multi-selects) are stored as
//! serialized arrays such as `a:2:{i:0;s:3:"red";i:1;s:4:"blue";}`. Only
//! scalars, null and arrays are understood; anything else, including
//! serialized objects and malformed input, is left as the raw string.

use serde_json::{Map, Number, Value};

/// Deepest array nesting decoded before the input is treated as raw text
const MAX_DEPTH: usize = 64;

/// Decode `raw` when it is a serialized value, otherwise return it as a string
pub fn maybe_unserialize(raw: &str) -> Value {
    let trimmed = raw.trim();
    looks_serialized(trimmed)
        .then(|| unserialize(trimmed))
        .flatten()
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn looks_serialized(s: &str) -> bool {
    if s == "N;" {
        return true;
    }
    let bytes = s.as_bytes();
    bytes.len() >= 4
        && bytes[1] == b':'
        && matches!(bytes[0], b'a' | b's' | b'i' | b'b' | b'd')
        && matches!(bytes[bytes.len() - 1], b';' | b'}')
}

/// Strict decode; `None` when the input is not exactly one serialized value
pub fn unserialize(s: &str) -> Option<Value> {
    let mut parser = Parser {
        input: s.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    (parser.pos == parser.input.len()).then_some(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn value(&mut self) -> Option<Value> {
        let tag = self.byte()?;
        if tag == b'N' {
            self.expect(b';')?;
            return Some(Value::Null);
        }
        self.expect(b':')?;
        match tag {
            b'b' => match self.until(b';')? {
                "0" => Some(Value::Bool(false)),
                "1" => Some(Value::Bool(true)),
                _ => None,
            },
            b'i' => {
                let n: i64 = self.until(b';')?.parse().ok()?;
                Some(Value::Number(n.into()))
            }
            b'd' => {
                let f: f64 = self.until(b';')?.parse().ok()?;
                Number::from_f64(f).map(Value::Number)
            }
            b's' => self.string().map(Value::String),
            b'a' => {
                if self.depth >= MAX_DEPTH {
                    return None;
                }
                self.depth += 1;
                let array = self.array();
                self.depth -= 1;
                array
            }
            _ => None,
        }
    }

    fn string(&mut self) -> Option<String> {
        let len: usize = self.until(b':')?.parse().ok()?;
        self.expect(b'"')?;
        let end = self.pos.checked_add(len)?;
        let bytes = self.input.get(self.pos..end)?;
        let s = std::str::from_utf8(bytes).ok()?.to_string();
        self.pos = end;
        self.expect(b'"')?;
        self.expect(b';')?;
        Some(s)
    }

    fn array(&mut self) -> Option<Value> {
        let count: usize = self.until(b':')?.parse().ok()?;
        self.expect(b'{')?;

        let mut entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let key = match self.value()? {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                _ => return None,
            };
            let value = self.value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;

        let is_list = entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| *key == i.to_string());
        if is_list {
            Some(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
        } else {
            Some(Value::Object(entries.into_iter().collect::<Map<_, _>>()))
        }
    }

    fn byte(&mut self) -> Option<u8> {
        let b = *self.input.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, want: u8) -> Option<()> {
        (self.byte()? == want).then_some(())
    }

    /// Text up to (not including) `stop`, consuming the delimiter
    fn until(&mut self, stop: u8) -> Option<&str> {
        let rest = self.input.get(self.pos..)?;
        let len = rest.iter().position(|b| *b == stop)?;
        let text = std::str::from_utf8(&rest[..len]).ok()?;
        self.pos += len + 1;
        Some(text)
    }
}
