//! End-to-end lifecycle checks against the public library API with a
//! virtual clock: no wall-clock waits, no running server.

use std::{sync::Arc, time::Duration};

use promptdeck::{
    cards::CardStore,
    config::DeckConfig,
    dispatch::{Dispatcher, ResponseStatus, SIMULATED_LATENCY},
    patterns::PatternKey,
    scheduler::VirtualScheduler,
    templating::HandlebarsRenderer,
};

fn deck() -> (CardStore, Dispatcher, Arc<VirtualScheduler>) {
    let sched = VirtualScheduler::new();
    let dispatcher = Dispatcher::new(
        sched.clone(),
        sched.clone(),
        Arc::new(HandlebarsRenderer::new()),
        DeckConfig::default().dispatch_options(),
    );
    (CardStore::new(), dispatcher, sched)
}

#[test]
fn chain_of_thought_card_round_trip() {
    let (mut cards, dispatcher, sched) = deck();

    let card = cards.add_card(Some(PatternKey::Cot));
    assert_eq!(
        cards.get(card).unwrap().text,
        "Think step by step to solve this problem:\n\n"
    );

    let id = dispatcher.send(&cards, card, "gpt-4").expect("send accepted");
    let pending = dispatcher.get(id).unwrap();
    assert_eq!(pending.status, ResponseStatus::Pending);
    assert_eq!(pending.model, "gpt-4");

    sched.advance(SIMULATED_LATENCY);
    let done = dispatcher.get(id).unwrap();
    assert_eq!(done.status, ResponseStatus::Success);
    assert!(!done.reply.is_empty());
    assert!(done.reply.contains("gpt-4"));
}

#[test]
fn send_all_with_only_ineligible_cards_creates_nothing() {
    let (mut cards, dispatcher, sched) = deck();

    let disabled = cards.add_card(None);
    cards.set_text(disabled, "has text but is off");
    cards.set_enabled(disabled, false);
    cards.add_card(None); // enabled, empty text

    assert_eq!(dispatcher.send_all(&cards), 0);
    sched.advance(Duration::from_secs(30));
    assert!(dispatcher.responses().is_empty());
}

#[test]
fn mixed_deck_batch_settles_newest_first() {
    let (mut cards, dispatcher, sched) = deck();

    for pattern in [
        PatternKey::Cot,
        PatternKey::Persona,
        PatternKey::Alternatives,
    ] {
        cards.add_card(Some(pattern));
    }
    let off = cards.add_card(Some(PatternKey::Meta));
    cards.set_enabled(off, false);

    assert_eq!(dispatcher.send_all(&cards), 3);
    sched.advance(Duration::from_secs(30));

    let responses = dispatcher.responses();
    assert_eq!(responses.len(), 3);
    assert!(
        responses
            .iter()
            .all(|r| r.status == ResponseStatus::Success)
    );
    // Prepend ordering: the last-created response leads the list.
    let prompts: Vec<&str> = responses.iter().map(|r| r.prompt.as_str()).collect();
    assert_eq!(
        prompts,
        vec![
            PatternKey::Alternatives.template(),
            PatternKey::Persona.template(),
            PatternKey::Cot.template(),
        ]
    );
    // Batch sends always use the deck's default model.
    assert!(responses.iter().all(|r| r.model == "gpt-4"));
}
