use super::*;

fn record_at(last_updated: i64) -> ConversationRecord {
    ConversationRecord::new(SessionId::new(), last_updated)
}

#[test]
fn title_is_first_forty_characters_with_ellipsis() {
    assert_eq!(derive_title("How many studies?"), "How many studies?");

    let exact = "a".repeat(TITLE_MAX_CHARS);
    assert_eq!(derive_title(&exact), exact);

    let long = "What genes are commonly mutated in lung adenocarcinoma samples?";
    let title = derive_title(long);
    assert_eq!(title, format!("{}...", &long[..40]));
}

#[test]
fn title_counts_characters_not_bytes() {
    let question = "ü".repeat(45);
    let title = derive_title(&question);
    assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    assert!(title.starts_with(&"ü".repeat(40)));
}

#[test]
fn title_is_derived_only_once() {
    let mut history = History::new();
    let id = SessionId::new();
    history.create(id, 1);

    assert!(history.derive_title_if_untitled(&id, "first question", 2));
    assert!(!history.derive_title_if_untitled(&id, "second question", 3));
    assert_eq!(history.get(&id).unwrap().title, "first question");
}

#[test]
fn question_matching_the_default_title_still_counts_as_titled() {
    let mut history = History::new();
    let id = SessionId::new();
    history.create(id, 1);

    assert!(history.derive_title_if_untitled(&id, DEFAULT_TITLE, 2));
    assert!(!history.derive_title_if_untitled(&id, "second question", 3));
    assert_eq!(history.get(&id).unwrap().title, DEFAULT_TITLE);
}

#[test]
fn records_without_title_flag_fall_back_to_the_title() {
    let id = SessionId::new();
    let legacy: ConversationRecord = serde_json::from_value(serde_json::json!({
        "id": id.to_string(),
        "title": "Old question",
        "lastUpdated": 1,
    }))
    .unwrap();
    assert_eq!(legacy.titled, None);
    assert!(!legacy.is_untitled());

    let fresh: ConversationRecord = serde_json::from_value(serde_json::json!({
        "id": id.to_string(),
        "title": DEFAULT_TITLE,
        "lastUpdated": 1,
    }))
    .unwrap();
    assert!(fresh.is_untitled());
}

#[test]
fn updates_move_record_to_front() {
    let mut history = History::new();
    let first = SessionId::new();
    let second = SessionId::new();
    history.create(first, 1);
    history.create(second, 2);
    assert_eq!(history.most_recent().unwrap().id, second);

    history.update_messages(first, &[Message::user("hi")], 3);
    assert_eq!(history.most_recent().unwrap().id, first);
    assert_eq!(history.get(&first).unwrap().messages.len(), 1);
    assert_eq!(history.get(&first).unwrap().last_updated, 3);
}

#[test]
fn from_records_orders_by_last_updated() {
    let history = History::from_records(vec![record_at(5), record_at(9), record_at(1)]);
    let stamps: Vec<i64> = history.records().iter().map(|r| r.last_updated).collect();
    assert_eq!(stamps, vec![9, 5, 1]);
}

#[test]
fn enforce_limit_drops_oldest_records() {
    let records: Vec<ConversationRecord> = (0..(HISTORY_LIMIT as i64 + 5)).map(record_at).collect();
    let oldest: Vec<SessionId> = records.iter().take(5).map(|r| r.id).collect();
    let mut history = History::from_records(records);

    let mut evicted = history.enforce_limit(None);
    evicted.sort();
    let mut expected = oldest.clone();
    expected.sort();

    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(evicted, expected);
    assert!(oldest.iter().all(|id| !history.contains(id)));
}

#[test]
fn enforce_limit_spares_the_kept_record() {
    let records: Vec<ConversationRecord> = (0..(HISTORY_LIMIT as i64 + 1)).map(record_at).collect();
    let oldest = records[0].id;
    let second_oldest = records[1].id;
    let mut history = History::from_records(records);

    let evicted = history.enforce_limit(Some(oldest));
    assert_eq!(evicted, vec![second_oldest]);
    assert!(history.contains(&oldest));
}

#[test]
fn save_truncates_to_limit_and_load_restores() {
    let store = MemoryStore::new();
    let persistence = HistoryPersistence::new(Box::new(store.clone()));
    let records: Vec<ConversationRecord> = (0..(HISTORY_LIMIT as i64 + 10)).map(record_at).collect();
    let history = History::from_records(records);

    assert!(persistence.save(&history));
    let loaded = persistence.load();
    assert_eq!(loaded.len(), HISTORY_LIMIT);
    assert_eq!(loaded.records(), history.persisted_view());
    assert_eq!(loaded.records().last().unwrap().last_updated, 10);
}

#[test]
fn durable_format_uses_camel_case_timestamp() {
    let store = MemoryStore::new();
    let persistence = HistoryPersistence::new(Box::new(store.clone()));
    let mut history = History::new();
    let id = SessionId::new();
    history.create(id, 1_700_000_000_000);
    history.update_messages(id, &[Message::user("q"), Message::assistant("a")], 1_700_000_000_001);
    persistence.save(&history);

    let raw = store.raw(HISTORY_KEY).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &value[0];
    assert_eq!(entry["id"], id.to_string());
    assert_eq!(entry["title"], DEFAULT_TITLE);
    assert_eq!(entry["lastUpdated"], 1_700_000_000_001_i64);
    assert_eq!(entry["messages"][1]["role"], "assistant");
}

#[test]
fn malformed_store_loads_as_empty() {
    let store = MemoryStore::new();
    store.insert_raw(HISTORY_KEY, "{ not json");
    let persistence = HistoryPersistence::new(Box::new(store));
    assert!(persistence.load().is_empty());
}

#[test]
fn failed_save_keeps_previous_durable_state() {
    let store = MemoryStore::with_quota(300);
    let persistence = HistoryPersistence::new(Box::new(store.clone()));
    let mut history = History::new();
    let id = SessionId::new();
    history.create(id, 1);
    assert!(persistence.save(&history));
    let before = store.raw(HISTORY_KEY).unwrap();

    history.update_messages(id, &[Message::assistant("x".repeat(500))], 2);
    assert!(!persistence.save(&history));
    assert_eq!(store.raw(HISTORY_KEY).unwrap(), before);
    assert_eq!(history.get(&id).unwrap().messages.len(), 1);
}

#[test]
fn resolve_by_position_id_and_prefix() {
    let mut history = History::new();
    let older = SessionId::new();
    let newer = SessionId::new();
    history.create(older, 1);
    history.create(newer, 2);

    assert_eq!(history.resolve("1"), Some(newer));
    assert_eq!(history.resolve("2"), Some(older));
    assert_eq!(history.resolve("3"), None);
    assert_eq!(history.resolve("0"), None);
    assert_eq!(history.resolve(&older.to_string()), Some(older));
    assert_eq!(history.resolve(&older.to_string()[..13]), Some(older));
    assert_eq!(history.resolve(""), None);
    assert_eq!(history.resolve(&SessionId::new().to_string()), None);
}
