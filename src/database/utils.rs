use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?").expect("placeholder pattern is valid"));

/// Collapses whitespace and numbers `?` placeholders as `$1, $2, ...`.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let mut index = 0;
    PLACEHOLDER
        .replace_all(&cleaned, |_: &regex::Captures| {
            index += 1;
            format!("${}", index)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        assert_eq!(
            sql("SELECT *\n  FROM time_slots WHERE id = ? AND doctor_id = ?"),
            "SELECT * FROM time_slots WHERE id = $1 AND doctor_id = $2"
        );
    }
}
