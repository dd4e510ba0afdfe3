//! Tag extraction from model output
//!
//! The tagging prompt asks the model for a single comma-separated line.
//! Tags are stored verbatim apart from whitespace trimming.

/// Parse a comma-separated tag list into individual tags
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags("beach, sunset, palm tree"),
            vec!["beach", "sunset", "palm tree"]
        );
    }

    #[test]
    fn test_parse_tags_trims_and_drops_empties() {
        assert_eq!(
            parse_tags(" beach ,, sunset ,\n palm tree,"),
            vec!["beach", "sunset", "palm tree"]
        );
    }

    #[test]
    fn test_parse_tags_empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,\n").is_empty());
    }

    #[test]
    fn test_parse_tags_single() {
        assert_eq!(parse_tags("lighthouse"), vec!["lighthouse"]);
    }
}
