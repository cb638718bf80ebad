// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalization shared by the dialogue and broadcast paths.

/// Suffix the WhatsApp bridge uses for individual chats.
pub const CHAT_SUFFIX: &str = "@c.us";

/// Strips a chat-id suffix such as `@c.us` and every non-digit character.
pub fn normalize_phone(raw: &str) -> String {
    let base = raw.split('@').next().unwrap_or(raw);
    base.chars().filter(char::is_ascii_digit).collect()
}

/// Chat address for a phone number in any format.
pub fn chat_address(phone: &str) -> String {
    format!("{}{CHAT_SUFFIX}", normalize_phone(phone))
}
