use super::*;
use crate::core::history::DEFAULT_TITLE;
use crate::utils::test_utils::create_test_app;
use tempfile::tempdir;

#[test]
fn plain_text_is_a_message() {
    assert_eq!(
        process_input("How many studies are there?"),
        CommandResult::ProcessAsMessage("How many studies are there?".into())
    );
}

#[test]
fn unknown_commands_are_sent_as_messages() {
    assert_eq!(
        process_input("/etc/hosts is a file"),
        CommandResult::ProcessAsMessage("/etc/hosts is a file".into())
    );
    assert_eq!(process_input("/"), CommandResult::ProcessAsMessage("/".into()));
}

#[test]
fn command_names_are_case_insensitive() {
    assert_eq!(process_input("/NEW"), CommandResult::NewConversation);
    assert_eq!(process_input("  /Quit  "), CommandResult::Quit);
}

#[test]
fn switch_requires_a_target() {
    assert_eq!(
        process_input("/switch"),
        CommandResult::Usage("Usage: /switch <number|id>")
    );
    assert_eq!(process_input("/switch 2"), CommandResult::Switch("2".into()));
}

#[test]
fn delete_defaults_to_the_current_conversation() {
    assert_eq!(process_input("/delete"), CommandResult::Delete(None));
    assert_eq!(
        process_input("/delete  3 "),
        CommandResult::Delete(Some("3".into()))
    );
}

#[test]
fn export_takes_a_path() {
    assert_eq!(
        process_input("/export chat.html"),
        CommandResult::Export(PathBuf::from("chat.html"))
    );
    assert_eq!(
        process_input("/export"),
        CommandResult::Usage("Usage: /export <file>")
    );
}

#[test]
fn help_lists_every_command() {
    let help = help_text();
    for command in all_commands() {
        assert!(help.contains(command.usage), "missing {}", command.usage);
    }
}

#[tokio::test]
async fn new_and_switch_move_between_conversations() {
    let mut app = create_test_app();
    let first = app.active_id();

    assert_eq!(execute(&mut app, CommandResult::NewConversation), None);
    let second = app.active_id();
    assert_ne!(first, second);

    let listing = execute(&mut app, CommandResult::ListConversations).unwrap();
    assert_eq!(listing.lines().count(), 2);
    let active_line = listing.lines().find(|line| line.starts_with('*')).unwrap();
    assert!(active_line.contains(&second.short()));

    let position = app.history().position(&first).unwrap() + 1;
    assert_eq!(
        execute(&mut app, CommandResult::Switch(position.to_string())),
        None
    );
    assert_eq!(app.active_id(), first);
}

#[tokio::test]
async fn switch_reports_unknown_targets() {
    let mut app = create_test_app();
    let feedback = execute(&mut app, CommandResult::Switch("9".into())).unwrap();
    assert!(feedback.contains("No conversation matches"));
}

#[tokio::test]
async fn delete_without_target_removes_the_active_conversation() {
    let mut app = create_test_app();
    let first = app.active_id();
    app.new_conversation();
    let second = app.active_id();

    let feedback = execute(&mut app, CommandResult::Delete(None)).unwrap();
    assert_eq!(feedback, format!("Deleted \"{DEFAULT_TITLE}\"."));
    assert!(!app.history().contains(&second));
    assert_eq!(app.active_id(), first);
}

#[tokio::test]
async fn empty_messages_give_no_feedback() {
    let mut app = create_test_app();
    assert_eq!(
        execute(&mut app, CommandResult::ProcessAsMessage("   ".into())),
        None
    );
}

#[tokio::test]
async fn export_refuses_to_overwrite() {
    let mut app = create_test_app();
    let dir = tempdir().unwrap();
    let path = dir.path().join("chat.html");

    let feedback = execute(&mut app, CommandResult::Export(path.clone())).unwrap();
    assert!(feedback.starts_with("Exported 0 messages"));
    assert!(path.exists());

    let feedback = execute(&mut app, CommandResult::Export(path.clone())).unwrap();
    assert!(feedback.ends_with("already exists."));
}
