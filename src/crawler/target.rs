use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unrecognized extraction target {0:?} (expected one of: a, li, h1, h2, h3, p, td)")]
pub struct UnrecognizedTarget(pub String);

/// The tag kind a scrape pulls values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionTarget {
    Link,
    ListItem,
    Heading1,
    Heading2,
    Heading3,
    Paragraph,
    TableCell,
}

impl ExtractionTarget {
    pub const ALL: [ExtractionTarget; 7] = [
        ExtractionTarget::Link,
        ExtractionTarget::ListItem,
        ExtractionTarget::Heading1,
        ExtractionTarget::Heading2,
        ExtractionTarget::Heading3,
        ExtractionTarget::Paragraph,
        ExtractionTarget::TableCell,
    ];

    pub fn tag_name(self) -> &'static str {
        match self {
            ExtractionTarget::Link => "a",
            ExtractionTarget::ListItem => "li",
            ExtractionTarget::Heading1 => "h1",
            ExtractionTarget::Heading2 => "h2",
            ExtractionTarget::Heading3 => "h3",
            ExtractionTarget::Paragraph => "p",
            ExtractionTarget::TableCell => "td",
        }
    }

    /// Links come from `href` on the start tag; everything else from text.
    pub fn is_link(self) -> bool {
        self == ExtractionTarget::Link
    }
}

impl FromStr for ExtractionTarget {
    type Err = UnrecognizedTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag_name() == s)
            .ok_or_else(|| UnrecognizedTarget(s.to_string()))
    }
}

impl fmt::Display for ExtractionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_tag() {
        for t in ExtractionTarget::ALL {
            assert_eq!(t.tag_name().parse::<ExtractionTarget>(), Ok(t));
        }
    }

    #[test]
    fn rejects_unknown_and_case_variants() {
        assert_eq!(
            "div".parse::<ExtractionTarget>(),
            Err(UnrecognizedTarget("div".into()))
        );
        assert!("LI".parse::<ExtractionTarget>().is_err());
        assert!("title".parse::<ExtractionTarget>().is_err());
        assert!("".parse::<ExtractionTarget>().is_err());
    }

    #[test]
    fn only_anchor_is_link() {
        assert!(ExtractionTarget::Link.is_link());
        assert!(!ExtractionTarget::Paragraph.is_link());
    }
}
