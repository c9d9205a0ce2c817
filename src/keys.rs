//! Pure, deterministic compiler from a requested keystroke into one or
//! more `Input.dispatchKeyEvent` payloads.
//!
//! The special-character tables, the modifier decomposition order (Alt,
//! then Ctrl, then Meta, then Shift), and the down/up event ordering
//! (modifier downs, main key down, modifier ups in the same order as the
//! downs, main key up) are fixed by this module.

use std::collections::HashMap;
use std::sync::OnceLock;

use cdp_session_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};

use crate::error::{CdpError, Result};

/// A bitmask of held modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(pub i64);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const ALT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const META: Modifiers = Modifiers(4);
    pub const SHIFT: Modifiers = Modifiers(8);

    fn has(self, bit: Modifiers) -> bool {
        self.0 & bit.0 != 0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

/// Non-character keys the compiler understands, including the four
/// modifier keys (which never appear standalone on the wire except as
/// their own down/up events when explicitly requested).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Space,
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Shift,
    Alt,
    Ctrl,
    Meta,
}

impl SpecialKey {
    fn name_and_code(self) -> (&'static str, i64) {
        match self {
            SpecialKey::Space => (" ", 32),
            SpecialKey::Enter => ("Enter", 13),
            SpecialKey::Tab => ("Tab", 9),
            SpecialKey::Backspace => ("Backspace", 8),
            SpecialKey::Escape => ("Escape", 27),
            SpecialKey::Delete => ("Delete", 46),
            SpecialKey::ArrowLeft => ("ArrowLeft", 37),
            SpecialKey::ArrowUp => ("ArrowUp", 38),
            SpecialKey::ArrowRight => ("ArrowRight", 39),
            SpecialKey::ArrowDown => ("ArrowDown", 40),
            SpecialKey::Shift => ("Shift", 16),
            SpecialKey::Alt => ("Alt", 18),
            SpecialKey::Ctrl => ("Control", 17),
            SpecialKey::Meta => ("Meta", 91),
        }
    }

    fn is_modifier(self) -> bool {
        matches!(
            self,
            SpecialKey::Shift | SpecialKey::Alt | SpecialKey::Ctrl | SpecialKey::Meta
        )
    }

    /// The display form used for `Space`/`Enter`/`Tab` in `text`/`key`.
    fn display_char(self) -> Option<char> {
        match self {
            SpecialKey::Space => Some(' '),
            SpecialKey::Enter => Some('\n'),
            SpecialKey::Tab => Some('\t'),
            _ => None,
        }
    }
}

/// A single requested keystroke: either a printable character or a named
/// special key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Special(SpecialKey),
}

const NUM_SHIFT: &str = ")!@#$%^&*(";

fn special_char_map() -> &'static HashMap<char, (&'static str, i64)> {
    static MAP: OnceLock<HashMap<char, (&'static str, i64)>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            (';', ("Semicolon", 186)),
            ('=', ("Equal", 187)),
            (',', ("Comma", 188)),
            ('-', ("Minus", 189)),
            ('.', ("Period", 190)),
            ('/', ("Slash", 191)),
            ('`', ("Backquote", 192)),
            ('[', ("BracketLeft", 219)),
            ('\\', ("Backslash", 220)),
            (']', ("BracketRight", 221)),
            ('\'', ("Quote", 222)),
        ])
    })
}

fn special_char_shift_map() -> &'static HashMap<char, char> {
    static MAP: OnceLock<HashMap<char, char>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            (':', ';'),
            ('+', '='),
            ('<', ','),
            ('_', '-'),
            ('>', '.'),
            ('?', '/'),
            ('~', '`'),
            ('{', '['),
            ('|', '\\'),
            ('}', ']'),
            ('"', '\''),
        ])
    })
}

/// The DOM `code`/virtual-key-code pair for a (normalized) key.
fn code_and_keycode(key: Key) -> Result<(String, i64)> {
    match key {
        Key::Special(sk) => {
            let (name, code) = sk.name_and_code();
            if sk.is_modifier() {
                Ok((format!("{name}Left"), code))
            } else {
                Ok((name.to_string(), code))
            }
        }
        Key::Char(ch) => {
            if ch.is_ascii_alphabetic() {
                let up = ch.to_ascii_uppercase();
                Ok((format!("Key{up}"), up as i64))
            } else if ch.is_ascii_digit() {
                Ok((format!("Digit{ch}"), ch as i64))
            } else if let Some(idx) = NUM_SHIFT.find(ch) {
                let digit = std::char::from_digit(idx as u32, 10).unwrap();
                Ok((format!("Digit{digit}"), digit as i64))
            } else if ch == '\n' || ch == '\r' {
                let (name, code) = SpecialKey::Enter.name_and_code();
                Ok((name.to_string(), code))
            } else if ch == '\t' {
                let (name, code) = SpecialKey::Tab.name_and_code();
                Ok((name.to_string(), code))
            } else if let Some(&(name, code)) = special_char_map().get(&ch) {
                Ok((name.to_string(), code))
            } else if let Some(&base) = special_char_shift_map().get(&ch) {
                let &(name, code) = special_char_map().get(&base).unwrap();
                Ok((name.to_string(), code))
            } else {
                Err(CdpError::KeyCompile(format!("unsupported key: {ch:?}")))
            }
        }
    }
}

/// Converts a shifted key (`A`, `!`, `+`) to its base key plus an implied
/// Shift modifier. Keys that don't need a shift transform pass through
/// unchanged, modifiers untouched.
fn normalise(key: Key, modifiers: Modifiers) -> Result<(Key, Modifiers)> {
    let ch = match key {
        Key::Special(_) => return Ok((key, modifiers)),
        Key::Char(c) => c,
    };
    if ch == '\n' || ch == '\r' {
        return Ok((Key::Special(SpecialKey::Enter), modifiers));
    }
    if ch == '\t' {
        return Ok((Key::Special(SpecialKey::Tab), modifiers));
    }
    if ch == ' ' {
        return Ok((Key::Special(SpecialKey::Space), modifiers));
    }

    let mut shifted = modifiers;
    let lowercase: Option<char> = if let Some(idx) = NUM_SHIFT.find(ch) {
        shifted |= Modifiers::SHIFT;
        Some(std::char::from_digit(idx as u32, 10).unwrap())
    } else if let Some(&base) = special_char_shift_map().get(&ch) {
        shifted |= Modifiers::SHIFT;
        Some(base)
    } else if ch.is_ascii_alphabetic() && ch.is_ascii_uppercase() {
        shifted |= Modifiers::SHIFT;
        Some(ch.to_ascii_lowercase())
    } else {
        None
    };

    match lowercase {
        None => Ok((key, modifiers)),
        Some(lc) => {
            if shifted != Modifiers::SHIFT {
                return Err(CdpError::KeyCompile(format!(
                    "key '{ch}' is not supported with modifiers {:?}",
                    shifted.0
                )));
            }
            Ok((Key::Char(lc), shifted))
        }
    }
}

/// The `key`/`text` fields shown for the main key's down/up events.
fn build_action_data(key: Key, modifiers: Modifiers) -> (Option<String>, Option<String>) {
    match key {
        Key::Char(ch) => {
            let shown = handle_printable_char(ch, modifiers);
            (Some(shown.clone()), Some(shown))
        }
        Key::Special(sk) => {
            if let Some(ch) = sk.display_char() {
                (Some(ch.to_string()), Some(ch.to_string()))
            } else {
                let (name, _) = sk.name_and_code();
                (Some(name.to_string()), None)
            }
        }
    }
}

fn handle_printable_char(ch: char, modifiers: Modifiers) -> String {
    if modifiers != Modifiers::SHIFT {
        return ch.to_string();
    }
    if ch.is_ascii_alphabetic() {
        return ch.to_ascii_uppercase().to_string();
    }
    if let Some(digit) = ch.to_digit(10) {
        return NUM_SHIFT.chars().nth(digit as usize).unwrap().to_string();
    }
    for (&shift_char, &orig) in special_char_shift_map() {
        if orig == ch {
            return shift_char.to_string();
        }
    }
    ch.to_string()
}

/// Modifier keys present in `modifiers`, in the fixed decomposition order
/// Alt, Ctrl, Meta, Shift.
fn decompose_modifiers(modifiers: Modifiers) -> Vec<(SpecialKey, Modifiers)> {
    let mut out = Vec::new();
    if modifiers.has(Modifiers::ALT) {
        out.push((SpecialKey::Alt, Modifiers::ALT));
    }
    if modifiers.has(Modifiers::CTRL) {
        out.push((SpecialKey::Ctrl, Modifiers::CTRL));
    }
    if modifiers.has(Modifiers::META) {
        out.push((SpecialKey::Meta, Modifiers::META));
    }
    if modifiers.has(Modifiers::SHIFT) {
        out.push((SpecialKey::Shift, Modifiers::SHIFT));
    }
    out
}

fn modifier_event(
    sk: SpecialKey,
    kind: DispatchKeyEventType,
    modifiers: Modifiers,
) -> Result<DispatchKeyEventParams> {
    let (code, keycode) = code_and_keycode(Key::Special(sk))?;
    let (name, _) = sk.name_and_code();
    Ok(DispatchKeyEventParams {
        kind: kind.as_str().to_string(),
        modifiers: modifiers.0,
        text: None,
        key: Some(name.to_string()),
        code: Some(code),
        windows_virtual_key_code: Some(keycode),
        native_virtual_key_code: Some(keycode),
    })
}

fn main_key_event(
    key: Key,
    kind: DispatchKeyEventType,
    modifiers: Modifiers,
) -> Result<DispatchKeyEventParams> {
    let (code, keycode) = code_and_keycode(key)?;
    let (k, text) = build_action_data(key, modifiers);
    Ok(DispatchKeyEventParams {
        kind: kind.as_str().to_string(),
        modifiers: modifiers.0,
        text,
        key: k,
        code: Some(code),
        windows_virtual_key_code: Some(keycode),
        native_virtual_key_code: Some(keycode),
    })
}

/// Compiles a key press into a down/up event sequence: modifier downs,
/// main key down, modifier ups (same order as the downs), main key up.
/// A key that is itself one of the requested modifiers is only emitted
/// once, as part of the modifier sequence.
fn compile_down_up(key: Key, modifiers: Modifiers) -> Result<Vec<DispatchKeyEventParams>> {
    let (key, modifiers) = normalise(key, modifiers)?;
    let decomposed = decompose_modifiers(modifiers);
    let is_modifier_key = match key {
        Key::Special(sk) => decomposed.iter().any(|(dsk, _)| *dsk == sk),
        Key::Char(_) => false,
    };

    let mut events = Vec::with_capacity(decomposed.len() * 2 + 2);
    let mut current = Modifiers::NONE;

    for (sk, flag) in &decomposed {
        current |= *flag;
        events.push(modifier_event(*sk, DispatchKeyEventType::KeyDown, current)?);
    }

    if !is_modifier_key {
        events.push(main_key_event(key, DispatchKeyEventType::KeyDown, current)?);
    }

    for (sk, flag) in &decomposed {
        current = Modifiers(current.0 & !flag.0);
        events.push(modifier_event(*sk, DispatchKeyEventType::KeyUp, current)?);
    }

    if !is_modifier_key {
        events.push(main_key_event(key, DispatchKeyEventType::KeyUp, current)?);
    }

    Ok(events)
}

/// Builds the single `char`-type payload used for a key that cannot be
/// expressed as a down/up sequence (non-ASCII text, emoji).
pub fn compile_char(ch: char) -> DispatchKeyEventParams {
    DispatchKeyEventParams {
        kind: DispatchKeyEventType::Char.as_str().to_string(),
        modifiers: 0,
        text: Some(ch.to_string()),
        key: None,
        code: None,
        windows_virtual_key_code: None,
        native_virtual_key_code: None,
    }
}

/// Compiles one requested keystroke into its CDP event sequence. Non-ASCII
/// characters are always routed through the `char` path, mirroring the
/// emoji special-case in the original implementation.
pub fn compile(key: Key, modifiers: Modifiers) -> Result<Vec<DispatchKeyEventParams>> {
    if let Key::Char(ch) = key {
        if !ch.is_ascii() {
            return Ok(vec![compile_char(ch)]);
        }
    }
    compile_down_up(key, modifiers)
}

/// Compiles a whole string into a flat sequence of dispatch payloads, one
/// keystroke at a time, in order.
pub fn compile_str(text: &str, modifiers: Modifiers) -> Result<Vec<DispatchKeyEventParams>> {
    let mut out = Vec::new();
    for ch in text.chars() {
        out.extend(compile(Key::Char(ch), modifiers)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_a_produces_shift_down_a_down_a_up_shift_up() {
        let events = compile(Key::Char('A'), Modifiers::NONE).unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, ["keyDown", "keyDown", "keyUp", "keyUp"]);
        assert_eq!(events[0].key.as_deref(), Some("Shift"));
        assert_eq!(events[0].code.as_deref(), Some("ShiftLeft"));
        assert_eq!(events[1].key.as_deref(), Some("A"));
        assert_eq!(events[1].code.as_deref(), Some("KeyA"));
        assert_eq!(events[1].modifiers, Modifiers::SHIFT.0);
        assert_eq!(events[2].key.as_deref(), Some("Shift"));
        assert_eq!(events[2].modifiers, 0);
        assert_eq!(events[3].key.as_deref(), Some("a"));
        assert_eq!(events[3].modifiers, 0);
    }

    #[test]
    fn lowercase_key_has_no_modifier_events() {
        let events = compile(Key::Char('a'), Modifiers::NONE).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "keyDown");
        assert_eq!(events[0].key.as_deref(), Some("a"));
        assert_eq!(events[1].kind, "keyUp");
    }

    #[test]
    fn equals_is_pass_through_and_plus_implies_shift() {
        let eq = compile(Key::Char('='), Modifiers::NONE).unwrap();
        assert_eq!(eq[0].code.as_deref(), Some("Equal"));
        assert_eq!(eq[0].key.as_deref(), Some("="));

        let plus = compile(Key::Char('+'), Modifiers::NONE).unwrap();
        assert_eq!(plus.len(), 4);
        assert_eq!(plus[0].key.as_deref(), Some("Shift"));
        assert_eq!(plus[1].code.as_deref(), Some("Equal"));
        assert_eq!(plus[1].key.as_deref(), Some("+"));
    }

    #[test]
    fn emoji_uses_char_path() {
        let events = compile(Key::Char('🙂'), Modifiers::NONE).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "char");
        assert_eq!(events[0].text.as_deref(), Some("🙂"));
    }

    #[test]
    fn conflicting_modifiers_on_a_shift_only_key_errors() {
        let err = compile(Key::Char('A'), Modifiers::CTRL);
        assert!(err.is_err());
    }

    #[test]
    fn explicit_modifier_key_itself_emits_once() {
        let events = compile(Key::Special(SpecialKey::Shift), Modifiers::SHIFT).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "keyDown");
        assert_eq!(events[1].kind, "keyUp");
    }

    #[test]
    fn enter_key_maps_to_named_special_key() {
        let events = compile(Key::Char('\n'), Modifiers::NONE).unwrap();
        assert_eq!(events[0].code.as_deref(), Some("Enter"));
        assert_eq!(events[0].key.as_deref(), Some("\n"));
    }
}
