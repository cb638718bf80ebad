// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trigger-word detection and reply parsing.
//!
//! All comparisons run on folded text: lowercase with diacritics removed, so
//! `Presença`, `PRESENCA` and `presenca` are the same word.

use std::collections::HashSet;

use canteiro_core::{ClockType, TicketPriority};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// The whole-message word that ends any conversation.
pub const CANCEL_WORD: &str = "cancelar";

/// Words accepted in place of a client name to use the contact's default client.
const DEFAULT_CLIENT_WORDS: &[&str] = &["padrao", "predefinido"];

/// Lowercases and strips combining marks.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Folded word tokens of `text`.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(fold)
}

/// Folded reply with surrounding whitespace and punctuation removed.
fn answer(text: &str) -> String {
    fold(text.trim_matches(|c: char| !c.is_alphanumeric()))
}

/// Which dialogue a trigger word starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Flow {
    Ticket,
    Attendance,
}

/// Configured trigger vocabularies.
#[derive(Debug, Clone)]
pub struct TriggerWords {
    ticket: HashSet<String>,
    attendance: HashSet<String>,
}

impl TriggerWords {
    pub fn new(ticket: &[String], attendance: &[String]) -> Self {
        Self {
            ticket: ticket.iter().map(|w| fold(w)).collect(),
            attendance: attendance.iter().map(|w| fold(w)).collect(),
        }
    }

    /// Returns the flow a message triggers. Ticket words win over attendance words.
    pub fn detect(&self, text: &str) -> Option<Flow> {
        let tokens: Vec<String> = words(text).collect();
        if tokens.iter().any(|t| self.ticket.contains(t)) {
            Some(Flow::Ticket)
        } else if tokens.iter().any(|t| self.attendance.contains(t)) {
            Some(Flow::Attendance)
        } else {
            None
        }
    }
}

pub fn is_cancel(text: &str) -> bool {
    answer(text) == CANCEL_WORD
}

pub fn is_yes(text: &str) -> bool {
    matches!(answer(text).as_str(), "sim" | "s")
}

pub fn is_default_client(text: &str) -> bool {
    DEFAULT_CLIENT_WORDS.contains(&answer(text).as_str())
}

/// Maps a priority reply; anything unrecognized is medium.
pub fn parse_priority(text: &str) -> TicketPriority {
    match answer(text).as_str() {
        "1" | "baixa" => TicketPriority::Low,
        "3" | "alta" | "urgente" => TicketPriority::High,
        _ => TicketPriority::Medium,
    }
}

pub fn parse_clock_type(text: &str) -> Option<ClockType> {
    match answer(text).as_str() {
        "1" | "entrada" => Some(ClockType::In),
        "2" | "saida" => Some(ClockType::Out),
        _ => None,
    }
}

/// Parses a 1-based choice in `1..=count` into a 0-based index.
pub fn parse_choice(text: &str, count: usize) -> Option<usize> {
    let n: usize = text.trim().parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}

/// True when `candidate` shares the first three folded characters of `input`.
///
/// Inputs shorter than three characters compare on their full length.
pub fn shares_prefix(input: &str, candidate: &str) -> bool {
    let prefix: String = fold(input.trim()).chars().take(3).collect();
    !prefix.is_empty() && fold(candidate.trim()).starts_with(&prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggers() -> TriggerWords {
        TriggerWords::new(
            &["pedido".into(), "ticket".into(), "assistência".into(), "avaria".into()],
            &["ponto".into(), "presença".into()],
        )
    }

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold("Presença"), "presenca");
        assert_eq!(fold("SAÍDA"), "saida");
        assert_eq!(fold("Média"), "media");
    }

    #[test]
    fn detect_is_word_based() {
        let t = triggers();
        assert_eq!(t.detect("Quero fazer um PEDIDO"), Some(Flow::Ticket));
        assert_eq!(t.detect("pedido!"), Some(Flow::Ticket));
        assert_eq!(t.detect("marcar presenca"), Some(Flow::Attendance));
        assert_eq!(t.detect("Ponto."), Some(Flow::Attendance));
        assert_eq!(t.detect("pedidos"), None);
        assert_eq!(t.detect("apontamento"), None);
        assert_eq!(t.detect("ACME Lda"), None);
    }

    #[test]
    fn ticket_trigger_wins_over_attendance() {
        assert_eq!(triggers().detect("ponto e pedido"), Some(Flow::Ticket));
    }

    #[test]
    fn configured_accented_words_match_plain_input() {
        assert_eq!(triggers().detect("preciso de assistencia"), Some(Flow::Ticket));
    }

    #[test]
    fn cancel_must_be_the_whole_message() {
        assert!(is_cancel("cancelar"));
        assert!(is_cancel("  CANCELAR! "));
        assert!(!is_cancel("quero cancelar"));
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes("SIM"));
        assert!(is_yes("s"));
        assert!(is_yes("Sim."));
        assert!(!is_yes("não"));
        assert!(!is_yes("simples"));
    }

    #[test]
    fn priority_mapping() {
        assert_eq!(parse_priority("1"), TicketPriority::Low);
        assert_eq!(parse_priority("Baixa"), TicketPriority::Low);
        assert_eq!(parse_priority("2"), TicketPriority::Medium);
        assert_eq!(parse_priority("média"), TicketPriority::Medium);
        assert_eq!(parse_priority("3"), TicketPriority::High);
        assert_eq!(parse_priority("URGENTE"), TicketPriority::High);
        assert_eq!(parse_priority("whatever"), TicketPriority::Medium);
    }

    #[test]
    fn clock_type_mapping() {
        assert_eq!(parse_clock_type("1"), Some(ClockType::In));
        assert_eq!(parse_clock_type("Entrada"), Some(ClockType::In));
        assert_eq!(parse_clock_type("saída"), Some(ClockType::Out));
        assert_eq!(parse_clock_type("3"), None);
    }

    #[test]
    fn choice_is_one_based_and_bounded() {
        assert_eq!(parse_choice("1", 2), Some(0));
        assert_eq!(parse_choice(" 2 ", 2), Some(1));
        assert_eq!(parse_choice("3", 2), None);
        assert_eq!(parse_choice("0", 2), None);
        assert_eq!(parse_choice("abc", 2), None);
    }

    #[test]
    fn default_client_words() {
        assert!(is_default_client("padrão"));
        assert!(is_default_client("Padrao"));
        assert!(!is_default_client("ACME"));
    }

    #[test]
    fn prefix_suggestions() {
        assert!(shares_prefix("acm", "ACME Construções"));
        assert!(shares_prefix("Âncora", "ancoragem Lda"));
        assert!(!shares_prefix("bet", "ACME"));
        assert!(shares_prefix("ac", "ACME"));
        assert!(!shares_prefix("", "ACME"));
    }
}
