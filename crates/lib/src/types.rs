//! Closed value sets stored as TEXT columns.

use crate::errors::ZygoteError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Declares a string-backed enum with its stored text form, `FromStr` and `Display`.
/// Attributes pass through, so `#[derive(Default)]` plus a `#[default]` variant works.
macro_rules! text_enum {
    (
        $(#[$meta:meta])* $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ZygoteError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ZygoteError::Validation(format!(
                        "Invalid {} '{}'. Expected one of: {}.",
                        $label,
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

text_enum!(
    /// How a note or summary body is encoded.
    #[derive(Default)]
    ContentType, "content type" {
        #[default]
        Markdown => "markdown",
        Html => "html",
        PdfUrl => "pdf_url",
    }
);

text_enum!(
    #[derive(Default)]
    ImageType, "image type" {
        #[default]
        Png => "png",
        Jpg => "jpg",
        Svg => "svg",
    }
);

text_enum!(
    #[derive(Default)]
    Difficulty, "difficulty" {
        Easy => "easy",
        #[default]
        Moderate => "moderate",
        Hard => "hard",
    }
);

text_enum!(
    /// One of the four MCQ options.
    AnswerOption, "answer" { A => "A", B => "B", C => "C", D => "D" }
);

text_enum!(Theme, "theme" { Light => "light", Dark => "dark" });

text_enum!(
    FontSize, "font size" {
        Small => "small",
        Medium => "medium",
        Large => "large",
        ExtraLarge => "extra-large",
    }
);

text_enum!(
    PlanType, "plan type" {
        SixMonths => "6_months",
        TwelveMonths => "12_months",
        TwentyFourMonths => "24_months",
    }
);

text_enum!(
    SubscriptionStatus, "subscription status" {
        Active => "active",
        Cancelled => "cancelled",
        Expired => "expired",
        PastDue => "past_due",
    }
);

text_enum!(
    ActivityType, "activity type" {
        Opened => "opened",
        Completed => "completed",
        QuizAttempted => "quiz_attempted",
    }
);

impl AnswerOption {
    /// Accepts a single letter in either case, surrounding whitespace ignored.
    pub fn parse_letter(value: &str) -> Result<Self, ZygoteError> {
        value.trim().to_ascii_uppercase().parse()
    }
}
