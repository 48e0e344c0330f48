// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_DATA_PATH: &str = "data";

// Token configuration
pub const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;
pub const MIN_TOKEN_SECRET_LENGTH: usize = 32;

// Pagination limits and defaults
pub const DEFAULT_POSTS_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;
pub const MAX_OFFSET: u32 = 1_000_000;

// Validation limits
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_PROFILE_NAME_LENGTH: usize = 100;
pub const MAX_EXPENSE_DESCRIPTION_LENGTH: usize = 255;
pub const MAX_MEAL_TEXT_LENGTH: usize = 1000;
pub const MAX_POST_TITLE_LENGTH: usize = 200;
pub const MAX_POST_CONTENT_LENGTH: usize = 10_000;
pub const MAX_SEARCH_TERM_LENGTH: usize = 100;

// Meal types accepted on food expenses
pub const MEAL_TYPES: [&str; 5] = ["breakfast", "lunch", "dinner", "snack", "other"];

// Default profile image assigned at registration
pub const DEFAULT_PROFILE_IMAGE: &str = "default.png";

// Error messages
pub const ERR_DATABASE_OPERATION: &str = "Database operation failed";
pub const ERR_INVALID_TOKEN: &str = "Invalid or expired token";
pub const ERR_MISSING_TOKEN: &str = "Missing bearer token";
