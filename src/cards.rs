use serde::Serialize;
use uuid::Uuid;

use crate::patterns::PatternKey;

/// One user-editable unit of prompt text.
///
/// `pattern` records which template (if any) seeded the card; it is set at
/// creation and never changes, even as the text is edited away from it.
#[derive(Debug, Clone, Serialize)]
pub struct PromptCard {
    pub id: Uuid,
    pub text: String,
    pub pattern: Option<PatternKey>,
    pub enabled: bool,
}

impl PromptCard {
    fn new(pattern: Option<PatternKey>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: pattern.map(|p| p.template().to_string()).unwrap_or_default(),
            pattern,
            enabled: true,
        }
    }
}

/// Ordered collection of prompt cards; append order is display order.
///
/// All mutations are synchronous and total: unknown ids are ignored rather
/// than reported, matching a best-effort UI mutation model.
#[derive(Debug, Default)]
pub struct CardStore {
    cards: Vec<PromptCard>,
}

impl CardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a card, blank or seeded from a pattern template, and returns its id.
    pub fn add_card(&mut self, pattern: Option<PatternKey>) -> Uuid {
        let card = PromptCard::new(pattern);
        let id = card.id;
        tracing::debug!(card = %id, pattern = ?pattern, "card added");
        self.cards.push(card);
        id
    }

    pub fn delete_card(&mut self, id: Uuid) {
        self.cards.retain(|card| card.id != id);
    }

    pub fn set_text(&mut self, id: Uuid, text: impl Into<String>) {
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == id) {
            card.text = text.into();
        }
    }

    pub fn set_enabled(&mut self, id: Uuid, enabled: bool) {
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == id) {
            card.enabled = enabled;
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&PromptCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn cards(&self) -> &[PromptCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
