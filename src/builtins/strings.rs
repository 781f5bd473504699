// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::StringFcn;

use std::collections::HashMap;

pub fn register(m: &mut HashMap<&'static str, StringFcn>) {
    m.insert("toCamelCase", to_camel_case);
    m.insert("toPascalCase", to_pascal_case);
    m.insert("toSnakeCase", to_snake_case);
    m.insert("toKebabCase", to_kebab_case);
}

/// Splits an identifier into words.
///
/// Words are separated by `_`, `-`, `.` and whitespace, by a lowercase letter
/// or digit followed by an uppercase letter, and by the last capital of an
/// acronym that starts a new capitalized word (`HTTPServer` is `HTTP`,
/// `Server`).
pub fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = vec![];
    let mut word = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '_' || ch == '-' || ch == '.' || ch.is_whitespace() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        }

        if ch.is_uppercase() && !word.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut word));
            }
        }
        word.push(ch);
    }

    if !word.is_empty() {
        words.push(word);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn to_camel_case(s: &str) -> String {
    split_words(s)
        .iter()
        .enumerate()
        .map(|(i, w)| match i {
            0 => w.to_lowercase(),
            _ => capitalize(w),
        })
        .collect()
}

pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

pub fn to_snake_case(s: &str) -> String {
    join_lowercase(s, "_")
}

pub fn to_kebab_case(s: &str) -> String {
    join_lowercase(s, "-")
}

fn join_lowercase(s: &str, sep: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(sep)
}
