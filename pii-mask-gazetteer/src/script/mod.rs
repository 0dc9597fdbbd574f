// pii-mask-gazetteer/src/script/mod.rs

/// Coarse script class used to segment untagged text into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Kanji,
    Hiragana,
    Katakana,
    Latin,
    Digit,
    Whitespace,
    Other,
}

/// Classifies a character by script.
///
/// Full-width Latin letters and digits fold into `Latin` / `Digit`; the
/// prolonged sound mark `ー` counts as katakana.
pub fn classify(c: char) -> Script {
    match c {
        c if c.is_whitespace() => Script::Whitespace,
        '0'..='9' | '０'..='９' => Script::Digit,
        'a'..='z' | 'A'..='Z' | 'ａ'..='ｚ' | 'Ａ'..='Ｚ' => Script::Latin,
        '\u{3041}'..='\u{309F}' => Script::Hiragana,
        '\u{30A0}'..='\u{30FF}' | '\u{FF66}'..='\u{FF9F}' => Script::Katakana,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '々' => Script::Kanji,
        _ => Script::Other,
    }
}
