use crate::{RecordingRecord, catalog::PersistedRecord};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

fn at(seconds: i64, nanos: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, nanos).unwrap()
}

/// WHAT: File references are reduced to a bare file name
/// WHY: Records must survive the storage directory moving
#[test]
fn given_legacy_absolute_path_when_creating_record_then_base_name_kept() {
    // Given: A reference carrying an old absolute path
    let reference = "/var/mobile/Containers/Data/Recording_1.m4a";

    // When: Building a record
    let record = RecordingRecord::new(Uuid::new_v4(), reference, at(0, 0), 1.0);

    // Then: Only the file name remains
    assert_eq!(record.file_name(), "Recording_1.m4a");
    assert_eq!(record.display_name(), "Recording_1");
}

/// WHAT: Timestamps survive persistence exactly
/// WHY: Reloading must not drift created_at by a rounding step
#[test]
fn given_sub_microsecond_timestamp_when_persisting_then_round_trip_exact() {
    // Given: A record created with nanosecond precision
    let record = RecordingRecord::new(Uuid::new_v4(), "a.wav", at(1_700_000_000, 123_456_789), 2.5);

    // When: Converting to the persisted shape and back through JSON
    let json = serde_json::to_value(record.to_persisted()).unwrap();
    let entry: PersistedRecord = serde_json::from_value(json).unwrap();
    let restored = RecordingRecord::from_persisted(entry).unwrap();

    // Then: Identical, at microsecond precision
    assert_eq!(restored, record);
    assert_eq!(record.created_at().timestamp_subsec_micros(), 123_456);
}

/// WHAT: Persisted shape uses the established field names
/// WHY: Existing catalogs on disk must keep loading
#[test]
fn given_record_when_persisting_then_field_names_match_format() {
    // Given: A record
    let id = Uuid::new_v4();
    let record = RecordingRecord::new(id, "a.wav", at(10, 500_000_000), 3.0);

    // When: Serializing
    let json = serde_json::to_value(record.to_persisted()).unwrap();

    // Then: Keys and encodings as expected
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["filename"], "a.wav");
    assert_eq!(json["createdAt"], 10.5);
    assert_eq!(json["durationSeconds"], 3.0);
}

/// WHAT: Unusable persisted entries are rejected
/// WHY: Invalid entries are dropped during reconciliation
#[test]
fn given_invalid_fields_when_validating_then_rejected() {
    // Given: Entries with a bad id, empty file name and negative duration
    let valid = PersistedRecord {
        id: Uuid::new_v4().to_string(),
        filename: "a.wav".to_string(),
        created_at: 1.0,
        duration_seconds: 1.0,
    };
    let bad_id = PersistedRecord {
        id: "not-a-uuid".to_string(),
        ..valid.clone()
    };
    let no_name = PersistedRecord {
        filename: String::new(),
        ..valid.clone()
    };
    let negative = PersistedRecord {
        duration_seconds: -1.0,
        ..valid.clone()
    };

    // When / Then: Only the valid entry passes
    assert!(RecordingRecord::from_persisted(valid).is_some());
    assert!(RecordingRecord::from_persisted(bad_id).is_none());
    assert!(RecordingRecord::from_persisted(no_name).is_none());
    assert!(RecordingRecord::from_persisted(negative).is_none());
}

/// WHAT: Duration formats as minutes and zero-padded seconds
/// WHY: Matches how the list displays lengths
#[test]
fn given_durations_when_formatting_then_m_ss() {
    let record = |secs| RecordingRecord::new(Uuid::new_v4(), "a.wav", at(0, 0), secs);

    assert_eq!(record(0.0).formatted_duration(), "0:00");
    assert_eq!(record(5.4).formatted_duration(), "0:05");
    assert_eq!(record(65.0).formatted_duration(), "1:05");
    assert_eq!(record(3600.0).formatted_duration(), "60:00");
    assert_eq!(record(-3.0).duration_seconds(), 0.0);
}

/// WHAT: Search matches the display name case-insensitively
/// WHY: Users type fragments without caring about case
#[test]
fn given_query_when_matching_then_case_insensitive_substring() {
    // Given: A record
    let record = RecordingRecord::new(Uuid::new_v4(), "Recording_20240131_1a2b.wav", at(0, 0), 1.0);

    // When / Then
    assert!(record.matches(""));
    assert!(record.matches("  "));
    assert!(record.matches("recording_2024"));
    assert!(record.matches("1A2B"));
    assert!(!record.matches("wav"));
    assert!(!record.matches("2023"));
}
