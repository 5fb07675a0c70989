// Lenient decoder for operator command lines
//
// Lines look like JSON objects but are not parsed as JSON: the serial link can
// drop or garble bytes, and a damaged line should still yield whatever fields
// survived. Each field is located independently:
//   "key"  ->  next ':'  ->  value up to the next ',' (or '}') for numbers,
//                           or between the next two '"' for strings.
// A field that cannot be located takes its default (0 or "").
//
// Accepted commands:
//   {"cmd":"drive","left":<int>,"right":<int>}
//   {"cmd":"action","name":"<STOP|PICKUP_BOX|DROP_BOX|SHOOT>"}

use tracing::debug;

use crate::messages::Command;

/// Decode the pending line, if there is one
pub fn decode(line: Option<&str>) -> Command {
    match line {
        Some(line) => decode_line(line),
        None => Command::NoCommand,
    }
}

/// Decode a single line. Never fails; anything unrecognised is `NoCommand`.
pub fn decode_line(line: &str) -> Command {
    let fields = Fields::new(line.trim());
    if fields.is_empty() {
        return Command::NoCommand;
    }

    let command = match fields.string("cmd", "") {
        "drive" => Command::Drive {
            left: fields.int("left", 0),
            right: fields.int("right", 0),
        },
        "action" => match fields.string("name", "") {
            "" => Command::NoCommand,
            name => Command::Action(name.to_string()),
        },
        _ => Command::NoCommand,
    };

    debug!("Decoded {:?} from {:?}", command, line);
    command
}

/// Key lookup over one raw line
struct Fields<'a> {
    line: &'a str,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self { line }
    }

    fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Everything after the colon that follows `"key"`
    fn value_after(&self, key: &str) -> Option<&'a str> {
        let quoted = format!("\"{key}\"");
        let key_at = self.line.find(&quoted)?;
        let rest = &self.line[key_at + quoted.len()..];
        let colon = rest.find(':')?;
        Some(&rest[colon + 1..])
    }

    fn int(&self, key: &str, default: i32) -> i32 {
        let Some(value) = self.value_after(key) else {
            return default;
        };
        let end = value.find(',').or_else(|| value.find('}'));
        match end {
            Some(end) => lenient_int(&value[..end]),
            None => default,
        }
    }

    fn string(&self, key: &str, default: &'a str) -> &'a str {
        let Some(value) = self.value_after(key) else {
            return default;
        };
        let Some(open) = value.find('"') else {
            return default;
        };
        let body = &value[open + 1..];
        match body.find('"') {
            Some(close) => &body[..close],
            None => default,
        }
    }
}

/// Leading-integer parse: optional sign then digits, stopping at the first
/// other character. No digits gives 0. Saturates at the i32 range.
fn lenient_int(text: &str) -> i32 {
    enum State {
        Start,
        Digits,
    }

    let mut state = State::Start;
    let mut negative = false;
    let mut magnitude: i64 = 0;

    for ch in text.trim().chars() {
        match (&state, ch) {
            (State::Start, '-') => {
                negative = true;
                state = State::Digits;
            }
            (State::Start, '+') => state = State::Digits,
            (_, '0'..='9') => {
                let digit = i64::from(ch as u8 - b'0');
                magnitude = magnitude.saturating_mul(10).saturating_add(digit);
                state = State::Digits;
            }
            _ => break,
        }
    }

    let signed = if negative { -magnitude } else { magnitude };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
