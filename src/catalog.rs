//! Static query catalog used to parameterize scrape sweeps.

/// Store countries, in sweep priority order.
pub const COUNTRIES: &[&str] = &["us", "gb", "in", "de", "fr", "br", "jp", "kr", "au", "ca"];

/// Queries run against a single country when looking for new apps.
pub const NEW_APP_QUERIES: &[&str] = &["new apps 2025", "new apps 2026", "latest apps", "new free apps"];

/// Broad search terms for the query sweep.
pub const SEARCH_QUERIES: &[&str] = &[
    // General new apps
    "new apps 2025",
    "new apps 2026",
    "latest apps",
    "trending apps",
    "new free apps",
    "new paid apps",
    "best new apps",
    // Games
    "new games 2025",
    "new mobile games",
    "new free games",
    "indie games 2025",
    "new puzzle games",
    "new action games",
    "new racing games",
    "new rpg games",
    "new casual games",
    "new strategy games",
    "new simulation games",
    // Productivity & tools
    "productivity apps 2025",
    "new utility apps",
    "new tools apps",
    "note taking app",
    "calendar app",
    "task manager app",
    // Social
    "new social media apps",
    "new messaging apps",
    "new dating apps",
    // Entertainment
    "new streaming apps",
    "new music apps",
    "new video apps",
    "new podcast apps",
    // Lifestyle
    "new fitness apps",
    "new health apps",
    "meditation app",
    "workout app",
    "new food delivery apps",
    "new shopping apps",
    // Finance
    "new finance apps",
    "new banking apps",
    "crypto wallet app",
    "budget app",
    // Education
    "new education apps",
    "language learning app",
    "new coding apps",
    // Tech
    "ai apps 2025",
    "chatgpt apps",
    "new vpn apps",
    "password manager app",
    "new photo editor",
    "new video editor",
];

/// Play Store app categories.
pub const APP_CATEGORIES: &[&str] = &[
    "art and design",
    "auto and vehicles",
    "beauty",
    "books and reference",
    "business",
    "comics",
    "communication",
    "dating",
    "education",
    "entertainment",
    "events",
    "finance",
    "food and drink",
    "health and fitness",
    "house and home",
    "libraries and demo",
    "lifestyle",
    "maps and navigation",
    "medical",
    "music and audio",
    "news and magazines",
    "parenting",
    "personalization",
    "photography",
    "productivity",
    "shopping",
    "social",
    "sports",
    "tools",
    "travel and local",
    "video players",
    "watch face",
    "weather",
];

/// Play Store game categories.
pub const GAME_CATEGORIES: &[&str] = &[
    "action games",
    "adventure games",
    "arcade games",
    "board games",
    "card games",
    "casino games",
    "casual games",
    "educational games",
    "music games",
    "puzzle games",
    "racing games",
    "role playing games",
    "simulation games",
    "sports games",
    "strategy games",
    "trivia games",
    "word games",
];

/// App categories followed by game categories.
pub fn categories() -> Vec<&'static str> {
    APP_CATEGORIES.iter().chain(GAME_CATEGORIES).copied().collect()
}

/// Search string used when sweeping a category.
pub fn category_query(category: &str) -> String {
    format!("new {} apps", category)
}
