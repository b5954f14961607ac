fn digit_value(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn day_value(token: &str) -> Option<u64> {
    if token.starts_with('0') {
        return None;
    }
    digit_value(token).filter(|value| (1..=31).contains(value))
}

fn replace_standalone_ones(tokens: &[&str], connector: &str) -> Vec<String> {
    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            let previous = index.checked_sub(1).and_then(|i| tokens.get(i)).copied();
            let next = tokens.get(index + 1).copied();
            let larger = |neighbour: Option<&str>| {
                neighbour
                    .and_then(digit_value)
                    .is_some_and(|value| value > 1)
            };
            if *token == "1" && larger(previous) && larger(next) {
                connector.to_string()
            } else {
                (*token).to_string()
            }
        })
        .collect()
}

fn split_trailing_ones(tokens: Vec<String>, connector: &str) -> Vec<String> {
    let mut repaired = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        let next = tokens.get(index + 1).map(String::as_str).and_then(day_value);
        let splittable =
            token.len() >= 2 && digit_value(token).is_some() && day_value(token).is_none();
        let split = if splittable {
            token
                .strip_suffix('1')
                .and_then(|head| Some((head, day_value(head)?)))
        } else {
            None
        };

        match (split, next) {
            (Some((head, head_day)), Some(next_day)) if head_day < next_day => {
                repaired.push(head.to_string());
                repaired.push(connector.to_string());
            }
            _ => repaired.push(token.clone()),
        }
    }
    repaired
}

fn collapse_connectors(tokens: Vec<String>, connector: &str) -> Vec<String> {
    let mut collapsed: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let repeated = token.eq_ignore_ascii_case(connector)
            && collapsed
                .last()
                .is_some_and(|last| last.eq_ignore_ascii_case(connector));
        if !repeated {
            collapsed.push(token);
        }
    }
    collapsed
}

#[must_use]
pub fn repair_cell_text(text: &str, connector: &str) -> String {
    let tokens = text.split_whitespace().collect::<Vec<_>>();
    let tokens = replace_standalone_ones(&tokens, connector);
    let tokens = split_trailing_ones(tokens, connector);
    collapse_connectors(tokens, connector).join(" ")
}
