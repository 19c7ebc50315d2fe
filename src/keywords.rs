use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;

use crate::scanner::token::TokenType;

pub type Keywords = HashMap<String, TokenType>;

/// Builds the keyword table, optionally respelled from a JSON file that maps
/// concept words to source spellings, e.g. `{"print": "tulis"}`.
pub fn load_keywords(path: Option<&str>) -> Result<Keywords> {
    let mut spellings = default_spellings();

    if let Some(p) = path {
        let contents =
            fs::read_to_string(p).with_context(|| format!("reading keyword file '{}'", p))?;
        let overrides: HashMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing keyword file '{}'", p))?;
        for (concept, spelling) in overrides {
            if concept_to_token_type(&concept).is_some() {
                spellings.insert(concept, spelling);
            } else {
                tracing::warn!(concept = %concept, "ignoring unknown keyword concept");
            }
        }

        // Two concepts sharing a spelling would make the table ambiguous
        let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
        let mut concepts: Vec<&String> = spellings.keys().collect();
        concepts.sort();
        for concept in concepts {
            let spelling = spellings[concept].as_str();
            if let Some(other) = claimed.insert(spelling, concept.as_str()) {
                bail!(
                    "keyword file '{}' spells both '{}' and '{}' as '{}'",
                    p,
                    other,
                    concept,
                    spelling
                );
            }
        }
    }

    Ok(build(spellings))
}

pub fn default_keywords() -> Keywords {
    build(default_spellings())
}

fn build(spellings: HashMap<String, String>) -> Keywords {
    let mut keywords = HashMap::new();
    for (concept, spelling) in spellings {
        if let Some(token_type) = concept_to_token_type(&concept) {
            keywords.insert(spelling, token_type);
        }
    }
    keywords
}

fn default_spellings() -> HashMap<String, String> {
    // concept word -> keyword as written in source. By default they are the same.
    [
        "and", "class", "else", "false", "fun", "for", "if", "nil", "or", "print", "return",
        "super", "this", "true", "var", "while",
    ]
    .into_iter()
    .map(|word| (word.to_string(), word.to_string()))
    .collect()
}

fn concept_to_token_type(s: &str) -> Option<TokenType> {
    match s {
        "and" => Some(TokenType::And),
        "class" => Some(TokenType::Class),
        "else" => Some(TokenType::Else),
        "false" => Some(TokenType::False),
        "fun" => Some(TokenType::Fun),
        "for" => Some(TokenType::For),
        "if" => Some(TokenType::If),
        "nil" => Some(TokenType::Nil),
        "or" => Some(TokenType::Or),
        "print" => Some(TokenType::Print),
        "return" => Some(TokenType::Return),
        "super" => Some(TokenType::Super),
        "this" => Some(TokenType::This),
        "true" => Some(TokenType::True),
        "var" => Some(TokenType::Var),
        "while" => Some(TokenType::While),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_every_keyword() {
        let keywords = default_keywords();
        assert_eq!(keywords.len(), 16);
        assert_eq!(keywords.get("print"), Some(&TokenType::Print));
        assert_eq!(keywords.get("nil"), Some(&TokenType::Nil));
        assert_eq!(keywords.get("foo"), None);
    }

    #[test]
    fn respelled_keyword_replaces_default_spelling() {
        let path = std::env::temp_dir().join(format!("lox_keywords_{}.json", std::process::id()));
        fs::write(&path, r#"{"print": "tulis", "bogus": "x"}"#).unwrap();

        let keywords = load_keywords(path.to_str()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(keywords.get("tulis"), Some(&TokenType::Print));
        assert_eq!(keywords.get("print"), None);
        assert_eq!(keywords.get("x"), None);
        assert_eq!(keywords.get("var"), Some(&TokenType::Var));
    }

    #[test]
    fn colliding_spellings_are_rejected() {
        let path = std::env::temp_dir().join(format!("lox_keywords_dup_{}.json", std::process::id()));
        fs::write(&path, r#"{"print": "var"}"#).unwrap();
        let result = load_keywords(path.to_str());
        fs::remove_file(&path).unwrap();

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("'print' and 'var'"), "{}", message);
    }

    #[test]
    fn swapped_spellings_are_allowed() {
        let path = std::env::temp_dir().join(format!("lox_keywords_swap_{}.json", std::process::id()));
        fs::write(&path, r#"{"print": "var", "var": "print"}"#).unwrap();
        let keywords = load_keywords(path.to_str()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(keywords.get("var"), Some(&TokenType::Print));
        assert_eq!(keywords.get("print"), Some(&TokenType::Var));
    }

    #[test]
    fn missing_keyword_file_is_an_error() {
        assert!(load_keywords(Some("/definitely/not/here.json")).is_err());
    }
}
