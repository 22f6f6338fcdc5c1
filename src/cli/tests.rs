use super::*;
use crate::core::history::{History, DEFAULT_TITLE};
use crate::core::message::{Message, Role};
use crate::core::session::SessionId;
use crate::utils::test_utils::{ScriptedPeer, ScriptedTransport};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }

    pub(super) fn history_with_one_turn() -> (History, SessionId) {
        let id = SessionId::new();
        let mut history = History::new();
        history.create(id, 1_700_000_000_000);
        history.update_messages(
            id,
            &[
                Message {
                    role: Role::User,
                    content: "Which genes are mutated?".into(),
                },
                Message {
                    role: Role::Assistant,
                    content: "**TP53** and `KRAS`.".into(),
                },
            ],
            1_700_000_000_500,
        );
        history.derive_title_if_untitled(&id, "Which genes are mutated?", 1_700_000_000_500);
        (history, id)
    }

    pub(super) fn ask_options(stream: bool) -> ask::AskOptions {
        ask::AskOptions {
            stream,
            connect_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(10),
            ..ask::AskOptions::default()
        }
    }

    /// Waits for the client's question on `id`, answers with `frames` and
    /// returns the question together with the still-open peer.
    pub(super) async fn answer(
        transport: &ScriptedTransport,
        id: SessionId,
        frames: &[String],
    ) -> (serde_json::Value, ScriptedPeer) {
        let mut peer = loop {
            if let Some(peer) = transport.take_peer(id) {
                break peer;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        let question = peer.received.recv().await.expect("question frame");
        for frame in frames {
            peer.push_frame(frame);
        }
        (serde_json::from_str(&question).unwrap(), peer)
    }
}

use test_helpers::{answer, ask_options, history_with_one_turn, parse_args};

#[test]
fn chat_is_the_default_command() {
    let args = parse_args(&["askportal"]);
    assert!(args.command.is_none());
    assert!(!args.no_history);
}

#[test]
fn ask_joins_question_words() {
    let args = parse_args(&["askportal", "ask", "How", "many", "studies?", "--no-stream"]);
    match args.command {
        Some(Commands::Ask {
            question,
            no_stream,
        }) => {
            assert_eq!(question.join(" "), "How many studies?");
            assert!(no_stream);
        }
        _ => panic!("expected ask"),
    }
    assert!(Args::try_parse_from(["askportal", "ask"]).is_err());
}

#[test]
fn global_flags_parse_after_subcommands() {
    let args = parse_args(&["askportal", "history", "list", "--server", "http://ask:9000"]);
    assert_eq!(args.server.as_deref(), Some("http://ask:9000"));
    assert!(matches!(
        args.command,
        Some(Commands::History {
            action: HistoryCommand::List
        })
    ));
}

#[test]
fn history_show_accepts_html_flag() {
    let args = parse_args(&["askportal", "history", "show", "2", "--html"]);
    match args.command {
        Some(Commands::History {
            action: HistoryCommand::Show { id, html },
        }) => {
            assert_eq!(id, "2");
            assert!(html);
        }
        _ => panic!("expected history show"),
    }
}

#[test]
fn set_collects_multi_word_values() {
    let args = parse_args(&["askportal", "set", "model", "gpt", "4o"]);
    match args.command {
        Some(Commands::Set { key, value }) => {
            assert_eq!(key.as_deref(), Some("model"));
            assert_eq!(value, vec!["gpt".to_string(), "4o".to_string()]);
        }
        _ => panic!("expected set"),
    }
}

#[test]
fn cli_flags_override_config_values() {
    let args = parse_args(&["askportal", "-s", "http://flag:1", "-m", " "]);
    let config = Config {
        server_url: Some("http://file:1".into()),
        model: Some("from-file".into()),
        ..Config::default()
    };
    let config = apply_cli_overrides(config, &args);
    assert_eq!(config.server_url(), "http://flag:1");
    assert_eq!(config.model.as_deref(), Some("from-file"));
}

#[test]
fn renderer_follows_config() {
    let config = Config {
        download_prefix: Some("/files/".into()),
        ..Config::default()
    };
    assert_eq!(build_renderer(&config).download_prefix(), "/files/");
}

#[test]
fn set_and_unset_round_trip_through_the_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::load_from_path(&path).unwrap();
    let message = settings::set(&mut config, "reconnect-delay-ms", &["500".into()]).unwrap();
    assert_eq!(message, "Set reconnect-delay-ms to: 500");
    config.save_to_path(&path).unwrap();

    let mut reloaded = Config::load_from_path(&path).unwrap();
    assert_eq!(reloaded.reconnect_delay(), Duration::from_millis(500));

    settings::unset(&mut reloaded, "reconnect-delay-ms").unwrap();
    assert_eq!(reloaded.reconnect_delay_ms, None);
}

#[test]
fn settings_reject_bad_input() {
    let mut config = Config::default();
    assert!(matches!(
        settings::set(&mut config, "colour", &["red".into()]),
        Err(settings::SettingError::UnknownKey(_))
    ));
    assert!(matches!(
        settings::set(&mut config, "syntax", &["maybe".into()]),
        Err(settings::SettingError::InvalidBoolean(_))
    ));
    assert!(matches!(
        settings::set(&mut config, "model", &[]),
        Err(settings::SettingError::MissingValue { key: "model", .. })
    ));
    settings::set(&mut config, "syntax", &["OFF".into()]).unwrap();
    assert_eq!(config.syntax_highlighting, Some(false));
}

#[test]
fn describe_lists_every_setting() {
    let text = settings::describe(&Config::default());
    for setting in settings::SETTINGS {
        assert!(text.contains(setting.key));
    }
    assert!(text.contains("http://127.0.0.1:8000"));
}

#[test]
fn history_list_numbers_conversations() {
    let (history, id) = history_with_one_turn();
    let listing = history::list_conversations(&history);
    assert!(listing.starts_with(" 1. "));
    assert!(listing.contains(&id.short()));
    assert!(listing.contains("Which genes are mutated?"));
    assert!(listing.contains("(2 messages)"));

    assert_eq!(
        history::list_conversations(&History::new()),
        "No saved conversations."
    );
}

#[test]
fn history_show_prints_text_or_html() {
    let (history, _) = history_with_one_turn();
    let renderer = Renderer::default();

    let text = history::show_conversation(&history, "1", false, &renderer).unwrap();
    assert!(text.starts_with("# Which genes are mutated?"));
    assert!(text.contains("## Assistant\n\n**TP53** and `KRAS`."));

    let html = history::show_conversation(&history, "1", true, &renderer).unwrap();
    assert!(html.contains("<strong>TP53</strong>"));

    assert!(history::show_conversation(&history, "7", false, &renderer).is_err());
}

#[test]
fn history_delete_saves_the_remaining_list() {
    let (mut history, id) = history_with_one_turn();
    let other = SessionId::new();
    history.create(other, 1_800_000_000_000);

    let store = MemoryStore::new();
    let persistence = HistoryPersistence::new(Box::new(store.clone()));
    let title = history::delete_conversation(&mut history, &persistence, &id.to_string()).unwrap();

    assert_eq!(title, "Which genes are mutated?");
    let reloaded = persistence.load();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.records()[0].title, DEFAULT_TITLE);
}

#[test]
fn no_history_keeps_conversations_in_memory() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        history_path: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    let persistence = build_persistence(&config, true);
    let (history, _) = history_with_one_turn();
    assert!(persistence.save(&history));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn health_summary_mentions_agent_state() {
    let health = crate::api::HealthResponse {
        status: "healthy".into(),
        agent_initialized: false,
        backend: Some("mcp".into()),
    };
    assert_eq!(
        health::describe_health("http://ask", &health),
        "http://ask: healthy (agent not initialized)\nbackend: mcp"
    );
}

#[tokio::test]
async fn ask_streams_the_answer_and_saves_it() {
    let transport = Arc::new(ScriptedTransport::new());
    let store = MemoryStore::new();
    let persistence = HistoryPersistence::new(Box::new(store.clone()));
    let id = SessionId::new();
    let frames = [
        json!({"type": "chunk", "content": "There are "}).to_string(),
        json!({"type": "chunk", "content": "**12** studies."}).to_string(),
        json!({"type": "done"}).to_string(),
    ];
    let mut out = Vec::new();

    let (result, (question, _peer)) = tokio::join!(
        ask::ask(
            transport.clone(),
            &persistence,
            Renderer::default(),
            id,
            "  How many studies?  ",
            ask_options(true),
            &mut out,
        ),
        answer(&transport, id, &frames),
    );

    result.unwrap();
    assert_eq!(question["question"], "How many studies?");
    assert_eq!(String::from_utf8(out).unwrap(), "There are **12** studies.\n\n");

    let saved = persistence.load();
    let record = saved.get(&id).unwrap();
    assert_eq!(record.title, "How many studies?");
    assert_eq!(record.messages.len(), 2);
    assert_eq!(record.messages[1].content, "There are **12** studies.");
}

#[tokio::test]
async fn ask_without_streaming_prints_charts_as_lines() {
    let transport = Arc::new(ScriptedTransport::new());
    let persistence = HistoryPersistence::new(Box::new(MemoryStore::new()));
    let id = SessionId::new();
    let frames = [
        json!({"type": "chunk", "content": "Counts:\n```chart\n{\"data\":[1,2]}"}).to_string(),
        json!({"type": "chunk", "content": "\n```"}).to_string(),
        json!({"type": "done"}).to_string(),
    ];
    let mut out = Vec::new();

    let (result, _) = tokio::join!(
        ask::ask(
            transport.clone(),
            &persistence,
            Renderer::default(),
            id,
            "Plot it",
            ask_options(false),
            &mut out,
        ),
        answer(&transport, id, &frames),
    );

    result.unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Counts:\n[rendering chart...]\n[chart]\n\n"
    );
}

#[tokio::test]
async fn ask_reports_server_errors_after_saving() {
    let transport = Arc::new(ScriptedTransport::new());
    let persistence = HistoryPersistence::new(Box::new(MemoryStore::new()));
    let id = SessionId::new();
    let frames = [json!({"type": "error", "content": "Agent not initialized"}).to_string()];
    let mut out = Vec::new();

    let (result, _) = tokio::join!(
        ask::ask(
            transport.clone(),
            &persistence,
            Renderer::default(),
            id,
            "Hello",
            ask_options(false),
            &mut out,
        ),
        answer(&transport, id, &frames),
    );

    assert!(matches!(result, Err(ask::AskError::Server(ref content)) if content == "Agent not initialized"));
    let saved = persistence.load();
    assert_eq!(
        saved.get(&id).unwrap().messages[1].content,
        "**Error:** Agent not initialized"
    );
}

#[tokio::test]
async fn ask_gives_up_when_the_server_is_unreachable() {
    let persistence = HistoryPersistence::new(Box::new(MemoryStore::new()));
    let options = ask::AskOptions {
        connect_timeout: Duration::from_millis(50),
        ..ask_options(true)
    };
    let result = ask::ask(
        Arc::new(ScriptedTransport::refusing()),
        &persistence,
        Renderer::default(),
        SessionId::new(),
        "Hello",
        options,
        &mut Vec::<u8>::new(),
    )
    .await;

    assert!(matches!(result, Err(ask::AskError::ConnectTimeout(_))));
    assert!(persistence.load().is_empty());
}

#[tokio::test]
async fn ask_rejects_blank_questions() {
    let persistence = HistoryPersistence::new(Box::new(MemoryStore::new()));
    let result = ask::ask(
        Arc::new(ScriptedTransport::new()),
        &persistence,
        Renderer::default(),
        SessionId::new(),
        "   ",
        ask_options(true),
        &mut Vec::<u8>::new(),
    )
    .await;
    assert!(matches!(result, Err(ask::AskError::EmptyQuestion)));
}
