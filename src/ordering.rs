//! Display order for item names

const UNRANKED: u8 = 99;

/// Category ranks keyed by base name (digits and grade/stat markers removed)
const CATEGORY_PRIORITY: &[(&str, u8)] = &[
    ("強化石", 1),
    ("稀有強化石", 1),
    ("精良強化石", 1),
    ("2階進化石", 2),
    ("3階進化石", 2),
    ("4階進化石", 2),
    ("5階進化石", 2),
    ("3階進階結晶", 3),
    ("赤紅結晶", 3),
    ("界限晶幣", 3),
    ("細胞", 4),
    ("戰鬥秘典", 5),
    ("黃金兔寶寶", 6),
];

/// Characters dropped before the category lookup
const STRIPPED: &[char] = &['-', '力', '技', '速', '階', '進', '晶'];

/// Sort key: category, stone grade, tier, then the name itself
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemSortKey {
    pub priority: u8,
    pub stone_grade: u8,
    pub tier: u32,
    pub name: String,
}

pub fn base_name(item: &str) -> String {
    item.chars()
        .filter(|c| !c.is_ascii_digit() && !STRIPPED.contains(c))
        .collect()
}

/// First `<digits>階` tier number in the name, 0 if there is none
pub fn tier(item: &str) -> u32 {
    let mut digits = String::new();
    for c in item.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c == '階' && !digits.is_empty() {
            return digits.parse().unwrap_or(0);
        } else {
            digits.clear();
        }
    }
    0
}

pub fn stone_grade(item: &str) -> u8 {
    if item.contains("精良") {
        3
    } else if item.contains("稀有") {
        2
    } else if item.contains("強化石") {
        1
    } else {
        0
    }
}

pub fn item_sort_key(item: &str) -> ItemSortKey {
    let base = base_name(item);
    let priority = CATEGORY_PRIORITY
        .iter()
        .find(|(name, _)| *name == base)
        .map(|&(_, rank)| rank)
        .unwrap_or(UNRANKED);

    ItemSortKey {
        priority,
        stone_grade: stone_grade(item),
        tier: tier(item),
        name: item.to_string(),
    }
}

pub fn sort_items<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by_cached_key(|item| item_sort_key(item.as_ref()));
}
