//! Cosmetic storefront widgets: announcement bar, countdown timer and the
//! "people are viewing this" visitor counter.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How often the visitor counter is re-rolled in the browser.
pub const VISITOR_COUNT_REFRESH_SECS: u64 = 30;

/// Default announcement bar background.
pub const DEFAULT_BANNER_BACKGROUND: &str = "#ef4444";
/// Default announcement bar text colour.
pub const DEFAULT_BANNER_TEXT: &str = "#ffffff";
/// Default countdown background.
pub const DEFAULT_COUNTDOWN_BACKGROUND: &str = "#000000";
/// Default countdown text colour.
pub const DEFAULT_COUNTDOWN_TEXT: &str = "#ffffff";

const GRADIENT_PAN_IMAGE: &str = "linear-gradient(90deg, #667eea, #764ba2, #667eea)";

/// A CSS hex colour (`#rgb` or `#rrggbb`).
///
/// Colours are typed in by admins and end up in `style` attributes, so
/// anything else is replaced by a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexColor(String);

impl HexColor {
    /// Parse `input`, or use `fallback` when it is not a hex colour.
    #[must_use]
    pub fn parse_or(input: &str, fallback: &str) -> Self {
        let input = input.trim();
        let valid = input
            .strip_prefix('#')
            .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()));
        if valid {
            Self(input.to_ascii_lowercase())
        } else {
            Self(fallback.to_owned())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Announcement bar animation, stored by the backend as a kebab-case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnimationType {
    #[default]
    None,
    Pulse,
    TextGlow,
    GradientPan,
    Shake,
    Bounce,
    Tada,
    FlashUrgent,
    Marquee,
}

impl AnimationType {
    pub const ALL: &'static [Self] = &[
        Self::None,
        Self::Pulse,
        Self::TextGlow,
        Self::GradientPan,
        Self::Shake,
        Self::Bounce,
        Self::Tada,
        Self::FlashUrgent,
        Self::Marquee,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pulse => "pulse-custom",
            Self::TextGlow => "text-glow",
            Self::GradientPan => "gradient-pan",
            Self::Shake => "shake-custom",
            Self::Bounce => "bounce-custom",
            Self::Tada => "tada-custom",
            Self::FlashUrgent => "flash-urgent",
            Self::Marquee => "marquee",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Pulse => "Pulse",
            Self::TextGlow => "Text Glow",
            Self::GradientPan => "Gradient Shift",
            Self::Shake => "Shake",
            Self::Bounce => "Bounce",
            Self::Tada => "Tada",
            Self::FlashUrgent => "Urgent Flash",
            Self::Marquee => "Marquee",
        }
    }
}

impl FromStr for AnimationType {
    type Err = core::convert::Infallible;

    /// Unknown names fall back to [`AnimationType::None`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(Self::ALL
            .iter()
            .copied()
            .find(|animation| animation.as_str() == s)
            .unwrap_or_default())
    }
}

impl From<String> for AnimationType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<AnimationType> for String {
    fn from(value: AnimationType) -> Self {
        value.as_str().to_owned()
    }
}

/// Everything the layout needs to draw the announcement bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerStyle {
    /// CSS class for the animation, if any.
    pub class: Option<String>,
    /// Inline `style` attribute value.
    pub style: String,
    /// Render the text inside a scrolling marquee track.
    pub marquee: bool,
}

impl BannerStyle {
    #[must_use]
    pub fn new(background: &str, text: &str, animation: AnimationType) -> Self {
        let background = HexColor::parse_or(background, DEFAULT_BANNER_BACKGROUND);
        let text = HexColor::parse_or(text, DEFAULT_BANNER_TEXT);

        let mut style = format!("background-color: {background}; color: {text};");
        if animation == AnimationType::GradientPan {
            style.push_str(" background-image: ");
            style.push_str(GRADIENT_PAN_IMAGE);
            style.push_str("; background-size: 200% 100%;");
        }

        let (class, marquee) = match animation {
            AnimationType::None => (None, false),
            AnimationType::Marquee => (Some("marquee-container".to_owned()), true),
            other => (Some(format!("animate-{}", other.as_str())), false),
        };

        Self {
            class,
            style,
            marquee,
        }
    }
}

/// Time left on a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    /// Time from `now` until `end`, or `None` once `end` has passed.
    #[must_use]
    pub fn until(end: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let total = (end - now).num_seconds();
        if total <= 0 {
            return None;
        }
        Some(Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        })
    }
}

/// Visitor counter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorCounterSettings {
    pub enabled: bool,
    pub min: u32,
    pub max: u32,
}

impl Default for VisitorCounterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min: 10,
            max: 50,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VisitorCounterError {
    #[error("Minimum ({min}) must not exceed maximum ({max}).")]
    MinAboveMax { min: u32, max: u32 },
}

impl VisitorCounterSettings {
    /// Reject settings an admin should not be allowed to save.
    ///
    /// # Errors
    ///
    /// [`VisitorCounterError::MinAboveMax`] when the range is inverted.
    pub const fn validate(&self) -> Result<(), VisitorCounterError> {
        if self.min > self.max {
            return Err(VisitorCounterError::MinAboveMax {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// A uniformly random count in `[min, max]`, or `None` when disabled.
    ///
    /// An inverted range coming from the backend is read the other way round.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u32> {
        if !self.enabled {
            return None;
        }
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        Some(rng.random_range(low..=high))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_hex_color_fallback() {
        assert_eq!(HexColor::parse_or("#ABC", "#000000").as_str(), "#abc");
        assert_eq!(HexColor::parse_or("red; x:y", "#000000").as_str(), "#000000");
        assert_eq!(HexColor::parse_or("#12345", "#000000").as_str(), "#000000");
    }

    #[test]
    fn test_animation_names() {
        assert_eq!("pulse-custom".parse::<AnimationType>().unwrap(), AnimationType::Pulse);
        assert_eq!("wiggle".parse::<AnimationType>().unwrap(), AnimationType::None);
        let json = serde_json::to_string(&AnimationType::GradientPan).unwrap();
        assert_eq!(json, "\"gradient-pan\"");
    }

    #[test]
    fn test_banner_style_classes() {
        let none = BannerStyle::new("#ef4444", "#ffffff", AnimationType::None);
        assert_eq!(none.class, None);
        assert_eq!(none.style, "background-color: #ef4444; color: #ffffff;");

        let bounce = BannerStyle::new("#000", "#fff", AnimationType::Bounce);
        assert_eq!(bounce.class.as_deref(), Some("animate-bounce-custom"));

        let marquee = BannerStyle::new("#000", "#fff", AnimationType::Marquee);
        assert!(marquee.marquee);

        let gradient = BannerStyle::new("#000", "#fff", AnimationType::GradientPan);
        assert!(gradient.style.contains("linear-gradient(90deg, #667eea, #764ba2, #667eea)"));
    }

    #[test]
    fn test_remaining_breakdown() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = now + Duration::days(2) + Duration::hours(3) + Duration::minutes(4) + Duration::seconds(5);
        assert_eq!(
            Remaining::until(end, now),
            Some(Remaining {
                days: 2,
                hours: 3,
                minutes: 4,
                seconds: 5,
            })
        );
        assert_eq!(Remaining::until(now, now), None);
        assert_eq!(Remaining::until(now - Duration::seconds(1), now), None);
    }

    #[test]
    fn test_visitor_count_within_bounds() {
        let settings = VisitorCounterSettings {
            enabled: true,
            min: 10,
            max: 12,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let count = settings.sample(&mut rng).unwrap();
            assert!((10..=12).contains(&count));
        }
    }

    #[test]
    fn test_visitor_count_disabled_and_inverted() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(VisitorCounterSettings::default().sample(&mut rng), None);

        let single = VisitorCounterSettings {
            enabled: true,
            min: 9,
            max: 9,
        };
        assert_eq!(single.sample(&mut rng), Some(9));

        let bad = VisitorCounterSettings {
            enabled: true,
            min: 50,
            max: 10,
        };
        assert!(bad.validate().is_err());
        assert!((10..=50).contains(&bad.sample(&mut rng).unwrap()));
    }
}
