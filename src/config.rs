use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::OnceLock;

/// Global timezone setting for the application
static APP_TIMEZONE: OnceLock<Tz> = OnceLock::new();

/// Initialize the timezone from the given string
pub fn init_timezone(tz_str: &str) {
    let timezone: Tz = tz_str.parse().unwrap_or_else(|_| {
        eprintln!("Warning: Invalid timezone '{}', falling back to UTC", tz_str);
        chrono_tz::UTC
    });

    if APP_TIMEZONE.set(timezone).is_err() {
        eprintln!("Warning: Timezone already initialized");
    }
}

/// Get the configured timezone
pub fn get_timezone() -> Tz {
    *APP_TIMEZONE.get().unwrap_or(&chrono_tz::UTC)
}

/// Start of today in the configured timezone. All task date logic is
/// day-granular, so this date is the only clock anchor it needs.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&get_timezone()).date_naive()
}
