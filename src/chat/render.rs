//! Markdown rendering of conversation turns.
//!
//! Product lists become a two-column table of cards (link, brand, title,
//! price, rating); prose is passed through unchanged.

use super::conversation::{ChatTurn, Conversation, Role, TurnContent};
use crate::sql::ProductRecord;

const CARD_COLUMNS: usize = 2;

pub fn render_turn(turn: &ChatTurn) -> String {
    let speaker = match turn.role {
        Role::User => "**You**",
        Role::Assistant => "**Assistant**",
    };
    format!("{}: {}", speaker, render_content(&turn.content))
}

pub fn render_content(content: &TurnContent) -> String {
    match content {
        TurnContent::Text { text } => text.clone(),
        TurnContent::Products { summary, items } if items.is_empty() => summary.clone(),
        TurnContent::Products { summary, items } => {
            format!("{}\n\n{}", summary, render_product_grid(items))
        }
    }
}

pub fn render_conversation(conversation: &Conversation) -> String {
    conversation
        .turns()
        .iter()
        .map(render_turn)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_product_grid(items: &[ProductRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("|{}\n", " |".repeat(CARD_COLUMNS)));
    out.push_str(&format!("|{}\n", "---|".repeat(CARD_COLUMNS)));

    for row in items.chunks(CARD_COLUMNS) {
        let mut cells: Vec<String> = row.iter().map(render_card).collect();
        cells.resize(CARD_COLUMNS, String::new());
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.trim_end().to_string()
}

fn render_card(product: &ProductRecord) -> String {
    format!(
        "[{}]({})<br>**{}**<br>Rs. {}<br>{:.1} ★ ({} ratings)",
        escape_cell(&product.title),
        product.product_link,
        escape_cell(&product.brand),
        product.price,
        product.avg_rating,
        product.total_ratings
    )
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
