//! Column and table names shared by the extract, transform and load stages.
//! The column names match the headers of the Google Play CSV exports.

// App metadata columns
pub const APP: &str = "App";
pub const CATEGORY: &str = "Category";
pub const RATING: &str = "Rating";
pub const SIZE: &str = "Size";
pub const INSTALLS: &str = "Installs";
pub const TYPE: &str = "Type";
pub const PRICE: &str = "Price";
pub const CONTENT_RATING: &str = "Content Rating";
pub const GENRES: &str = "Genres";
pub const LAST_UPDATED: &str = "Last Updated";
pub const CURRENT_VER: &str = "Current Ver";
pub const ANDROID_VER: &str = "Android Ver";

// Review columns
pub const TRANSLATED_REVIEW: &str = "Translated_Review";
pub const SENTIMENT: &str = "Sentiment";
pub const SENTIMENT_POLARITY: &str = "Sentiment_Polarity";
pub const SENTIMENT_SUBJECTIVITY: &str = "Sentiment_Subjectivity";

// Aggregated review columns
pub const AVG_SENTIMENT_POLARITY: &str = "Avg_Sentiment_Polarity";
pub const AVG_SENTIMENT_SUBJECTIVITY: &str = "Avg_Sentiment_Subjectivity";
pub const TOTAL_REVIEWS: &str = "Total_Reviews";
pub const POSITIVE_REVIEWS: &str = "Positive_Reviews";
pub const NEGATIVE_REVIEWS: &str = "Negative_Reviews";
pub const NEUTRAL_REVIEWS: &str = "Neutral_Reviews";

// Sentiment labels
pub const POSITIVE: &str = "Positive";
pub const NEGATIVE: &str = "Negative";
pub const NEUTRAL: &str = "Neutral";

// Raw-data sentinels
pub const INSTALLS_CORRUPT_SENTINEL: &str = "Free";
pub const SIZE_VARIES: &str = "Varies with device";

/// Rows missing any of these are dropped by the app cleaner.
pub const APP_REQUIRED_COLUMNS: [&str; 4] = [TYPE, CONTENT_RATING, CURRENT_VER, ANDROID_VER];

/// Rows missing any of these are dropped by the review cleaner.
pub const REVIEW_REQUIRED_COLUMNS: [&str; 4] = [
    TRANSLATED_REVIEW,
    SENTIMENT,
    SENTIMENT_POLARITY,
    SENTIMENT_SUBJECTIVITY,
];

// Output store
pub const SQLITE_FILE_NAME: &str = "googleplay_data_silver.sqlite";
pub const APPS_TABLE: &str = "googleplaystore_apps_silver";
pub const REVIEWS_TABLE: &str = "googleplaystore_user_reviews_silver";
pub const UNIFIED_TABLE: &str = "googleplay_data";

// Default input locations
pub const DEFAULT_APPS_CSV: &str = "googleplaystore.csv";
pub const DEFAULT_REVIEWS_CSV: &str = "googleplaystore_user_reviews.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Tokens the extractor reads as a missing value.
pub const NA_TOKENS: [&str; 15] = [
    "", "nan", "NaN", "-nan", "-NaN", "NA", "N/A", "n/a", "NULL", "null", "None", "<NA>",
    "#N/A", "#NA", "#N/A N/A",
];
