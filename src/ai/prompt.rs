//! Fixed text for the music advisor persona and the page around it.

/// Default system message that sets up the assistant's role. Can be
/// overridden with `ADVISOR_SYSTEM_MESSAGE`.
pub const SYSTEM_MESSAGE: &str = "You are a professional music advisor. You have deep knowledge of various music genres, artists, albums, and music history. You can recommend music based on users' moods, scenarios, or preferences, share music knowledge, and provide personalized music suggestions. Please communicate with users in a friendly and enthusiastic tone.";

/// What the user sees in place of the reply when anything goes wrong
/// during an exchange.
pub const APOLOGY: &str = "Sorry, I encountered some issues. Please try again later.";

pub const TITLE: &str = "🎵 Music Advisor AI";

pub const TAGLINE: &str = "Your Personal Music Recommendation Assistant - Tell me your mood, scenario, or preferences, and I'll recommend the perfect music for you!";

pub const ABOUT: [&str; 4] = [
    "🎧 Get music recommendations based on your mood",
    "🎼 Discover new artists and albums",
    "📚 Learn about music history and knowledge",
    "🎹 Receive personalized music suggestions",
];

pub const USAGE_TIPS: [&str; 4] = [
    "Recommend some music for working",
    "I'm feeling down, what songs should I listen to?",
    "Tell me about the history of jazz",
    "What are some classic rock albums?",
];
