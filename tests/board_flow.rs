mod scenarii;

use chrono::Duration;

use scenarii::{titles, today, wait_for_board, Deck};
use taskdeck::{Category, Intent, Priority, TaskDraft, TaskId};

#[tokio::test]
async fn buy_milk() {
    let deck = Deck::new();
    let handle = deck.local_controller();

    handle.send(Intent::Create(TaskDraft::new("Walk the dog", today()))).unwrap();
    handle.send(Intent::Create(TaskDraft::new("Buy milk", today()).with_priority(Priority::High))).unwrap();
    let board = wait_for_board(&handle, |b| b.collection.len() == 2).await;
    assert_eq!(board.category, Category::Today);
    assert_eq!(titles(&board.visible), vec!["Buy milk", "Walk the dog"]);
    let milk = board.visible[0].clone();

    for (category, expected) in [(Category::All, true), (Category::Priority, true), (Category::Completed, false)] {
        handle.send(Intent::SelectCategory(category)).unwrap();
        let board = wait_for_board(&handle, |b| b.category == category).await;
        assert_eq!(board.visible.iter().any(|t| t.id() == milk.id()), expected, "in {}", category);
    }

    handle.send(Intent::ToggleComplete(milk.id().clone())).unwrap();
    let board = wait_for_board(&handle, |b| b.stats.completed == 1).await;
    assert_eq!(titles(&board.visible), vec!["Buy milk"]);
    assert!(board.visible[0].completed_at().is_some());

    handle.send(Intent::SelectCategory(Category::Today)).unwrap();
    let board = wait_for_board(&handle, |b| b.category == Category::Today).await;
    assert_eq!(titles(&board.visible), vec!["Walk the dog", "Buy milk"]);
    assert_eq!((board.stats.total, board.stats.completed, board.stats.pending), (2, 1, 1));
}

#[tokio::test]
async fn urgent_before_low() {
    let deck = Deck::new();
    let handle = deck.local_controller();
    let date = today() + Duration::days(3);

    handle.send(Intent::Create(TaskDraft::new("low", date).with_priority(Priority::Low))).unwrap();
    handle.send(Intent::Create(TaskDraft::new("urgent", date).with_priority(Priority::Urgent))).unwrap();
    handle.send(Intent::SelectCategory(Category::Week)).unwrap();

    let board = wait_for_board(&handle, |b| b.category == Category::Week).await;
    assert_eq!(board.title, "This Week's Tasks");
    assert_eq!(titles(&board.visible), vec!["urgent", "low"]);
    assert_eq!(titles(&board.collection), vec!["low", "urgent"]);
}

#[tokio::test]
async fn unknown_ids_change_nothing() {
    let deck = Deck::new();
    let handle = deck.local_controller();

    handle.send(Intent::Create(TaskDraft::new("keep me", today()))).unwrap();
    let before = wait_for_board(&handle, |b| b.collection.len() == 1).await;

    let unknown = TaskId::from("not-a-task");
    handle.send(Intent::Delete(unknown.clone())).unwrap();
    handle.send(Intent::ToggleComplete(unknown.clone())).unwrap();
    handle.send(Intent::Update(unknown, TaskDraft::new("nope", today()))).unwrap();
    handle.send(Intent::SelectCategory(Category::All)).unwrap();

    let after = wait_for_board(&handle, |b| b.category == Category::All).await;
    assert_eq!(after.collection, before.collection);
}

#[tokio::test]
async fn edits_keep_identity() {
    let deck = Deck::new();
    let handle = deck.local_controller();

    handle.send(Intent::Create(TaskDraft::new("draft", today()))).unwrap();
    let created = wait_for_board(&handle, |b| b.collection.len() == 1).await.collection[0].clone();
    handle.send(Intent::ToggleComplete(created.id().clone())).unwrap();
    wait_for_board(&handle, |b| b.stats.completed == 1).await;

    let draft = created.draft()
        .with_description("with a description")
        .with_priority(Priority::Urgent);
    handle.send(Intent::Update(created.id().clone(), draft)).unwrap();
    let board = wait_for_board(&handle, |b| b.collection[0].priority() == Priority::Urgent).await;

    let edited = &board.collection[0];
    assert_eq!(edited.id(), created.id());
    assert_eq!(edited.created_at(), created.created_at());
    assert_eq!(edited.description(), "with a description");
    assert!(edited.completed() == false);
}
