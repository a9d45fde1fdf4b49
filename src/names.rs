/// Collapses the per-season player name formats (`First_Last`, `First_Last_123`)
/// into a single lower-cased, space-joined key. A trailing token is dropped only
/// when it parses as an integer.
pub fn normalize_player_name(raw: &str) -> String {
    let tokens: Vec<&str> = raw.split('_').collect();
    let keep = match tokens.split_last() {
        Some((last, rest)) if !rest.is_empty() && last.parse::<i64>().is_ok() => rest,
        _ => &tokens[..],
    };
    keep.join(" ").to_lowercase()
}

/// Key used by the early-season `players_raw.csv` tables to address a player.
pub fn players_raw_key(first_name: &str, second_name: &str, id: Option<i64>) -> String {
    match id {
        Some(id) => format!("{first_name}_{second_name}_{id}"),
        None => format!("{first_name}_{second_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_numeric_suffix() {
        assert_eq!(
            normalize_player_name("Firstname_Lastname_123"),
            "firstname lastname"
        );
    }

    #[test]
    fn keeps_names_without_suffix() {
        assert_eq!(normalize_player_name("Firstname_Lastname"), "firstname lastname");
        assert_eq!(normalize_player_name("Name"), "name");
    }

    #[test]
    fn single_numeric_token_is_kept() {
        // Nothing would be left to join, so the token stays.
        assert_eq!(normalize_player_name("123"), "123");
    }

    #[test]
    fn non_ascii_lowercases() {
        assert_eq!(normalize_player_name("Çağlar_Söyüncü_215"), "çağlar söyüncü");
    }

    #[test]
    fn players_raw_key_formats() {
        assert_eq!(players_raw_key("Aaron", "Cresswell", Some(7)), "Aaron_Cresswell_7");
        assert_eq!(players_raw_key("Aaron", "Cresswell", None), "Aaron_Cresswell");
    }
}
