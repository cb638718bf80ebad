// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply texts (pt-PT, WhatsApp markdown).

use std::fmt::Write as _;
use std::time::Duration;

use canteiro_core::{
    AuthorizationFailure, CanteiroError, Capability, ClientRecord, ClockReceipt, ClockType,
    Contract, Site, TicketPriority,
};

use crate::location::{LocationSource, ResolvedLocation, StepOutcome};

pub fn welcome() -> String {
    "👷 Olá! Sou o assistente da obra.\n\n\
     • Escreva *pedido* para abrir um pedido de assistência.\n\
     • Escreva *ponto* para registar entrada ou saída.\n\
     • Escreva *cancelar* a qualquer momento para desistir."
        .to_string()
}

pub fn nothing_to_cancel() -> String {
    "Não há nenhuma operação em curso para cancelar.".to_string()
}

pub fn cancelled() -> String {
    "❌ Operação cancelada. Os dados introduzidos foram descartados.".to_string()
}

pub fn expired() -> String {
    "⌛ A conversa foi encerrada por inatividade. Escreva *pedido* ou *ponto* para recomeçar."
        .to_string()
}

pub fn unauthorized(capability: Capability, failure: &AuthorizationFailure) -> String {
    let action = match capability {
        Capability::CreateTickets => "abrir pedidos de assistência",
        Capability::RegisterAttendance => "registar ponto",
    };
    match failure {
        AuthorizationFailure::NotFound => format!(
            "🚫 Este número não está registado para {action}.\n\
             Peça ao escritório para o adicionar a uma lista de contactos."
        ),
        AuthorizationFailure::MissingCapability(_) => format!(
            "🚫 Este número não tem permissão para {action}.\n\
             Contacte o escritório se precisar desta permissão."
        ),
        AuthorizationFailure::MissingLinkedUser => "🚫 Este número não está associado a nenhum \
             utilizador interno.\nPeça ao escritório para associar o seu contacto ao seu \
             utilizador antes de registar ponto."
            .to_string(),
    }
}

pub fn failure(error: &CanteiroError) -> String {
    format!(
        "⚠️ Ocorreu um erro e a operação foi cancelada.\nDetalhe: {error}\n\nTente novamente mais tarde."
    )
}

// --- Ticket flow ---

pub fn ask_client(has_default: bool) -> String {
    let mut text = "📋 *Novo pedido de assistência*\n\nIndique o nome ou código do cliente.".to_string();
    if has_default {
        text.push_str("\nResponda *padrão* para usar o seu cliente habitual.");
    }
    text
}

pub fn client_not_found(input: &str, suggestions: &[String]) -> String {
    let mut text = format!("Não encontrei nenhum cliente para \"{input}\".");
    if !suggestions.is_empty() {
        text.push_str("\n\nQuis dizer:");
        for name in suggestions {
            let _ = write!(text, "\n• {name}");
        }
    }
    text.push_str("\n\nIndique novamente o nome ou código do cliente.");
    text
}

pub fn choose_contract(client: &ClientRecord, contracts: &[Contract]) -> String {
    let mut text = format!("Cliente: *{}*\n\nEscolha o contrato:", client.name);
    for (i, contract) in contracts.iter().enumerate() {
        let _ = write!(text, "\n{}. {}", i + 1, contract_label(contract));
    }
    text
}

pub fn invalid_choice(count: usize) -> String {
    format!("Opção inválida. Responda com um número entre 1 e {count}.")
}

pub fn ask_problem(client: &ClientRecord, contract: Option<&Contract>) -> String {
    let contract = match contract {
        Some(c) => format!("Contrato: {}", contract_label(c)),
        None => "Sem contrato ativo.".to_string(),
    };
    format!("Cliente: *{}*\n{contract}\n\nDescreva o problema.", client.name)
}

pub fn ask_priority() -> String {
    "Qual a prioridade?\n1. Baixa\n2. Média\n3. Alta".to_string()
}

pub fn confirm_ticket(
    client: &ClientRecord,
    priority: TicketPriority,
    description: &str,
    contract: Option<&Contract>,
) -> String {
    let contract = contract.map_or_else(|| "sem contrato".to_string(), contract_label);
    format!(
        "📝 *Resumo do pedido*\n\n\
         Cliente: {}\n\
         Prioridade: {}\n\
         Contrato: {contract}\n\
         Problema: {description}\n\n\
         Confirma? Responda *SIM* ou *NÃO*.",
        client.name,
        priority_label(priority),
    )
}

pub fn ticket_created(ticket_id: Option<&str>) -> String {
    match ticket_id {
        Some(id) => format!("✅ Pedido registado com o número *{id}*. O técnico será notificado."),
        None => "✅ Pedido registado. O técnico será notificado.".to_string(),
    }
}

// --- Attendance flow ---

pub fn choose_site(sites: &[Site]) -> String {
    let mut text = "🏗️ *Registo de ponto*\n\nEm que obra está?".to_string();
    for (i, site) in sites.iter().enumerate() {
        let _ = write!(text, "\n{}. {} ({})", i + 1, site.name, site.code);
    }
    text
}

pub fn ask_clock_type(site: Option<&Site>) -> String {
    let header = match site {
        Some(s) => format!("🏗️ *Registo de ponto*\nObra: {}", s.name),
        None => "🏗️ *Registo de ponto*\nNão há obras ativas; o registo fica sem obra.".to_string(),
    };
    format!("{header}\n\nO que pretende registar?\n1. Entrada\n2. Saída")
}

pub fn invalid_clock_type() -> String {
    "Opção inválida. Responda *1* (entrada) ou *2* (saída).".to_string()
}

pub fn ask_live_location(wait: Duration) -> String {
    format!(
        "📍 Partilhe a sua localização atual nos próximos {} segundos.",
        wait.as_secs()
    )
}

pub fn clock_registered(
    clock_type: ClockType,
    site: Option<&Site>,
    location: &ResolvedLocation,
    receipt: &ClockReceipt,
) -> String {
    let mut text = format!(
        "✅ {} registada às coordenadas {:.5}, {:.5}.",
        clock_label(clock_type),
        location.point.latitude,
        location.point.longitude
    );
    if let Some(s) = site {
        let _ = write!(text, "\nObra: {}", s.name);
    }
    let _ = write!(text, "\nRegisto: {}", receipt.record_id);
    let _ = write!(text, "\nOrigem da localização: {}", source_label(location.source));
    for attempt in &location.attempts {
        if attempt.outcome != StepOutcome::Found {
            let _ = write!(
                text,
                "\n  • {}: {}",
                source_label(attempt.source),
                outcome_label(&attempt.outcome)
            );
        }
    }
    text
}

pub fn clock_failed(error: &CanteiroError, user_id: i64, site_id: Option<i64>) -> String {
    let site = site_id.map_or_else(|| "sem obra".to_string(), |id| id.to_string());
    format!(
        "⚠️ Não foi possível registar o ponto.\nDetalhe: {error}\nUtilizador: {user_id}\nObra: {site}"
    )
}

fn contract_label(contract: &Contract) -> String {
    if contract.description.is_empty() {
        contract.id.clone()
    } else {
        format!("{} - {}", contract.id, contract.description)
    }
}

fn priority_label(priority: TicketPriority) -> &'static str {
    match priority {
        TicketPriority::Low => "Baixa",
        TicketPriority::Medium => "Média",
        TicketPriority::High => "Alta",
    }
}

fn clock_label(clock_type: ClockType) -> &'static str {
    match clock_type {
        ClockType::In => "Entrada",
        ClockType::Out => "Saída",
    }
}

fn source_label(source: LocationSource) -> &'static str {
    match source {
        LocationSource::ChatShare => "localização partilhada",
        LocationSource::IpLookup => "geolocalização por IP",
        LocationSource::LiveShare => "localização em tempo real",
        LocationSource::Site => "coordenadas da obra",
        LocationSource::Fallback => "coordenadas por omissão",
    }
}

fn outcome_label(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Found => "ok".to_string(),
        StepOutcome::Unavailable => "indisponível".to_string(),
        StepOutcome::TimedOut => "sem resposta".to_string(),
        StepOutcome::Failed(e) => format!("erro ({e})"),
    }
}
