/// A single `key="value"` pair on a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Why a token stream stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag { name: String, attrs: Vec<Attribute> },
    EndTag { name: String },
    Text(String),
    Error(ParseError),
}

#[cfg(test)]
impl Token {
    pub fn start(name: &str, attrs: &[(&str, &str)]) -> Self {
        Token::StartTag {
            name: name.to_string(),
            attrs: attrs.iter().map(|(k, v)| Attribute::new(*k, *v)).collect(),
        }
    }

    pub fn text(s: &str) -> Self {
        Token::Text(s.to_string())
    }
}

/// Look up `key` in a start tag's attributes. Repeated keys resolve to the last one.
pub fn find_attr<'t>(token: &'t Token, key: &str) -> Option<&'t str> {
    let Token::StartTag { attrs, .. } = token else {
        return None;
    };
    attrs
        .iter()
        .rev()
        .find(|a| a.key == key)
        .map(|a| a.value.as_str())
}
