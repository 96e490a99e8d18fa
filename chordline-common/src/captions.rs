//! Social media captions for upcoming shows
//!
//! Template captions are built locally; the AI path (see the client crate)
//! only needs [`build_prompt`] and falls back to [`template_caption`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
        }
    }

    /// Maximum caption length accepted by the platform
    pub fn character_limit(self) -> usize {
        match self {
            Platform::Twitter => 280,
            Platform::Instagram => 2200,
            Platform::Facebook => 63206,
            Platform::Linkedin => 3000,
        }
    }

    fn max_hashtags(self) -> usize {
        match self {
            Platform::Twitter => 5,
            Platform::Instagram => 10,
            _ => 7,
        }
    }

    fn length_guidance(self) -> &'static str {
        match self {
            Platform::Twitter => "Keep under 280 characters",
            Platform::Instagram => "Optimize for Instagram (can be longer)",
            _ => "Appropriate length for the platform",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Casual,
    Professional,
    Energetic,
    Elegant,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Casual => "casual",
            Tone::Professional => "professional",
            Tone::Energetic => "energetic",
            Tone::Elegant => "elegant",
        }
    }

    pub fn templates(self) -> &'static [&'static str] {
        match self {
            Tone::Casual => &CASUAL_TEMPLATES,
            Tone::Energetic => &ENERGETIC_TEMPLATES,
            Tone::Professional => &PROFESSIONAL_TEMPLATES,
            Tone::Elegant => &ELEGANT_TEMPLATES,
        }
    }

    fn emojis(self) -> &'static [&'static str] {
        match self {
            Tone::Casual => &["🎵", "🎸", "🎤", "😊", "🎶", "✨"],
            Tone::Energetic => &["🔥", "⚡", "🎸", "🤘", "🎵", "💥", "🎤"],
            Tone::Professional => &["🎵", "🎼", "🎹", "🎻", "🎺"],
            Tone::Elegant => &["✨", "🎵", "🎼", "🌟", "🎹", "🎻"],
        }
    }
}

/// Tones used for the three caption variations
pub const VARIATION_TONES: [Tone; 3] = [Tone::Casual, Tone::Energetic, Tone::Professional];

const CASUAL_TEMPLATES: [&str; 3] = [
    "Hey everyone! We're playing {show} at {venue} in {city} on {date} at {time}! Come hang out with us!",
    "Can't wait to see you all at {show}! We'll be at {venue} on {date} starting at {time}. It's going to be awesome!",
    "Mark your calendars! {show} is happening at {venue} on {date} at {time}. Hope to see you there!",
];

const ENERGETIC_TEMPLATES: [&str; 3] = [
    "GET READY TO ROCK! {show} is coming to {venue} in {city} on {date} at {time}! This is going to be EPIC!",
    "The energy is building! Join us for {show} at {venue} on {date} at {time}. Let's make some noise!",
    "SHOWTIME! We're bringing the heat to {venue} on {date} at {time} for {show}. Don't miss this!",
];

const PROFESSIONAL_TEMPLATES: [&str; 3] = [
    "We're pleased to announce our upcoming performance: {show} at {venue} in {city} on {date} at {time}.",
    "Join us for an evening of music at {venue} on {date} at {time} for {show}. Tickets available now.",
    "We cordially invite you to attend {show} at the prestigious {venue} on {date} beginning at {time}.",
];

const ELEGANT_TEMPLATES: [&str; 3] = [
    "An enchanting evening awaits at {venue} on {date} at {time} for {show}. We look forward to sharing this magical experience with you.",
    "Join us for a sophisticated musical journey at {venue} in {city} on {date} at {time} for {show}.",
    "Experience the artistry of live music at {venue} on {date} at {time}. {show} promises to be an unforgettable evening.",
];

const BASE_HASHTAGS: [&str; 5] = ["#livemusic", "#concert", "#music", "#band", "#show"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionOptions {
    pub platform: Platform,
    pub tone: Tone,
    pub include_hashtags: bool,
    pub include_emojis: bool,
    pub include_setlist: bool,
}

impl CaptionOptions {
    pub fn with_tone(self, tone: Tone) -> Self {
        Self { tone, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionVenue {
    pub name: String,
    pub city: String,
}

/// Show facts a caption is written about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowDetails {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub venue: Option<CaptionVenue>,
    #[serde(default)]
    pub setlist: Vec<String>,
}

impl ShowDetails {
    /// Venue name, if present and not blank
    pub fn venue_name(&self) -> Option<&str> {
        self.venue.as_ref().map(|v| v.name.trim()).filter(|n| !n.is_empty())
    }

    /// Venue city, if present and not blank
    pub fn venue_city(&self) -> Option<&str> {
        self.venue.as_ref().map(|v| v.city.trim()).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthCheck {
    pub is_valid: bool,
    pub length: usize,
    pub limit: usize,
}

/// Length in characters (not bytes) against the platform limit
pub fn validate_length(caption: &str, platform: Platform) -> LengthCheck {
    let length = caption.chars().count();
    let limit = platform.character_limit();
    LengthCheck {
        is_valid: length <= limit,
        length,
        limit,
    }
}

fn setlist_highlights(setlist: &[String]) -> String {
    setlist.iter().take(3).map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Prompt sent to the completion model
pub fn build_prompt(show: &ShowDetails, options: &CaptionOptions) -> String {
    let mut prompt = format!(
        "Generate a {tone} social media caption for {platform} about an upcoming music show with these details:\n\n\
         Show: {title}\n\
         Date: {date}\n\
         Time: {time}\n\
         Venue: {venue}\n\
         Location: {city}",
        tone = options.tone.as_str(),
        platform = options.platform.as_str(),
        title = show.title,
        date = show.date.format("%A, %B %-d, %Y"),
        time = show.time.as_deref().unwrap_or("TBD"),
        venue = show.venue_name().unwrap_or("TBD"),
        city = show.venue_city().unwrap_or("TBD"),
    );

    if options.include_setlist && !show.setlist.is_empty() {
        prompt.push_str(&format!("\nSetlist highlights: {}", setlist_highlights(&show.setlist)));
    }

    prompt.push_str(&format!(
        "\n\nRequirements:\n\
         - {tone} tone\n\
         - {emojis}\n\
         - {hashtags}\n\
         - Keep it engaging and encourage attendance\n\
         - {length}\n\n\
         Generate only the caption text, no additional commentary.",
        tone = options.tone.as_str(),
        emojis = if options.include_emojis { "Include relevant emojis" } else { "No emojis" },
        hashtags = if options.include_hashtags {
            "Include relevant hashtags at the end"
        } else {
            "No hashtags"
        },
        length = options.platform.length_guidance(),
    ));

    prompt
}

/// Hashtag line: base tags, city tag, month tag; cut to the platform maximum
pub fn hashtags(show: &ShowDetails, platform: Platform) -> String {
    let mut tags: Vec<String> = BASE_HASHTAGS.iter().map(|t| t.to_string()).collect();

    if let Some(city) = show.venue_city() {
        let tag: String = city.to_lowercase().split_whitespace().collect();
        tags.push(format!("#{}", tag));
    }
    tags.push(format!("#{}shows", show.date.format("%B").to_string().to_lowercase()));

    tags.truncate(platform.max_hashtags());
    tags.join(" ")
}

/// Caption from the tone's templates; `template_index` wraps around
pub fn template_caption(show: &ShowDetails, options: &CaptionOptions, template_index: usize) -> String {
    let templates = options.tone.templates();
    let template = templates[template_index % templates.len()];
    let mut caption = template
        .replacen("{show}", &show.title, 1)
        .replacen("{venue}", show.venue_name().unwrap_or("an amazing venue"), 1)
        .replacen("{city}", show.venue_city().unwrap_or("the city"), 1)
        .replacen("{date}", &show.date.format("%A, %B %-d").to_string(), 1)
        .replacen("{time}", show.time.as_deref().unwrap_or("8:00 PM"), 1);

    if options.include_emojis {
        let prefix = options.tone.emojis().iter().take(3).copied().collect::<Vec<_>>().join(" ");
        caption = format!("{} {}", prefix, caption);
    }

    if options.include_setlist && !show.setlist.is_empty() {
        caption.push_str(&format!(
            "\n\nSetlist includes: {} and more!",
            setlist_highlights(&show.setlist)
        ));
    }

    if options.include_hashtags {
        caption.push_str("\n\n");
        caption.push_str(&hashtags(show, options.platform));
    }

    caption
}

/// One template caption per variation tone
pub fn template_variations(show: &ShowDetails, options: &CaptionOptions, template_index: usize) -> Vec<String> {
    VARIATION_TONES
        .iter()
        .map(|tone| template_caption(show, &options.with_tone(*tone), template_index))
        .collect()
}
