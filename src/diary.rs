use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tasks::{AppState, internal_error};

/// One diary entry per calendar day, kept in its stored wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    #[serde(rename = "diaryEntryId", default)]
    pub id: i64,
    #[serde(rename = "diaryEntryDate")]
    pub date: NaiveDate,
    #[serde(rename = "diaryEntry", default)]
    pub text: String,
}

impl DiaryEntry {
    /// Entry ids are the date itself with the hyphens dropped (20250114).
    pub fn date_id(date: NaiveDate) -> i64 {
        date.format("%Y%m%d").to_string().parse().unwrap_or(0)
    }
}

/// Rewrite the entry for `date`, or append a fresh one. At most one entry
/// per day.
pub fn upsert_entry(entries: &mut Vec<DiaryEntry>, date: NaiveDate, text: String) {
    match entries.iter_mut().find(|e| e.date == date) {
        Some(entry) => entry.text = text,
        None => entries.push(DiaryEntry {
            id: DiaryEntry::date_id(date),
            date,
            text,
        }),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/diary-entries", get(list_entries).post(replace_entries))
}

async fn list_entries(State(state): State<AppState>) -> Response {
    match state.diary.load::<DiaryEntry>().await {
        Ok(entries) => (
            [(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, private")],
            Json(entries),
        )
            .into_response(),
        Err(e) => internal_error("Failed to load diary entries", e),
    }
}

async fn replace_entries(
    State(state): State<AppState>,
    Json(entries): Json<Vec<DiaryEntry>>,
) -> Response {
    match state.diary.save(&entries).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => internal_error("Failed to save diary entries", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::day;

    #[test]
    fn test_date_id_drops_hyphens() {
        assert_eq!(DiaryEntry::date_id(day("2025-01-14")), 20_250_114);
    }

    #[test]
    fn test_upsert_keeps_one_entry_per_day() {
        let mut entries = Vec::new();
        upsert_entry(&mut entries, day("2025-01-14"), "slow morning".to_string());
        upsert_entry(&mut entries, day("2025-01-15"), "better".to_string());
        upsert_entry(&mut entries, day("2025-01-14"), "slow morning, good evening".to_string());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "slow morning, good evening");
        assert_eq!(entries[0].id, 20_250_114);
    }

    #[test]
    fn test_wire_shape_round_trips() {
        let json = r#"{"diaryEntryId":20250114,"diaryEntryDate":"2025-01-14","diaryEntry":"rain"}"#;
        let entry: DiaryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.date, day("2025-01-14"));
        assert_eq!(entry.text, "rain");

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["diaryEntryDate"], "2025-01-14");
    }
}
