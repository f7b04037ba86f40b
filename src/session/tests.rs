use super::*;

#[test]
fn new_conversation_is_empty() {
    let conversation = Conversation::new();

    assert!(conversation.is_empty());
    assert_eq!(conversation.len(), 0);
    assert!(conversation.all().is_empty());
}

#[test]
fn turns_are_kept_in_order() {
    let mut conversation = Conversation::new();

    conversation.append(Role::User, "What is in the report?");
    conversation.append(Role::Assistant, "Quarterly figures.");
    conversation.append(Role::User, "Thanks");

    let turns = conversation.all();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "What is in the report?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[2].content, "Thanks");
    assert!(turns[0].at <= turns[1].at);
    assert!(turns[1].at <= turns[2].at);
}

#[test]
fn append_returns_the_new_turn() {
    let mut conversation = Conversation::new();

    let turn = conversation.append(Role::Assistant, String::from("Hello"));

    assert_eq!(turn.role, Role::Assistant);
    assert_eq!(turn.content, "Hello");
}

#[test]
fn conversations_have_distinct_ids() {
    assert_ne!(Conversation::new().id(), Conversation::new().id());
}

#[test]
fn role_display() {
    assert_eq!(Role::User.to_string(), "user");
    assert_eq!(Role::Assistant.to_string(), "assistant");
}
