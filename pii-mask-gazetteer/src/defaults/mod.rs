// pii-mask-gazetteer/src/defaults/mod.rs

/// Common Japanese surnames tagged as `PERSON`.
pub const PERSON_NAMES: &[&str] = &[
    "佐藤", "鈴木", "高橋", "田中", "山田", "渡辺", "伊藤", "中村",
    "小林", "加藤", "吉田", "山本", "松本", "井上", "木村", "清水",
];

/// Place names tagged as `LOCATION`.
pub const LOCATIONS: &[&str] = &["東京", "大阪", "京都", "北海道", "沖縄", "福岡"];

/// Organization names tagged as `ORGANIZATION`.
pub const ORGANIZATIONS: &[&str] = &["トヨタ", "ソニー", "任天堂", "東京大学", "NHK"];

/// Returns the built-in `(word, label)` entries in a stable order.
pub fn default_entries() -> impl Iterator<Item = (&'static str, &'static str)> {
    PERSON_NAMES
        .iter()
        .map(|w| (*w, "PERSON"))
        .chain(LOCATIONS.iter().map(|w| (*w, "LOCATION")))
        .chain(ORGANIZATIONS.iter().map(|w| (*w, "ORGANIZATION")))
}
