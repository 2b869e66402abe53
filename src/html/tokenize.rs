use std::collections::VecDeque;
use std::mem;

use html5gum::{naive_next_state, Emitter, Error as MarkupError, State, Tokenizer};
use tracing::trace;

use super::token::{Attribute, ParseError, Token};

/// Lazily tokenize a page body.
///
/// The sequence always ends with exactly one `Token::Error(ParseError::EndOfStream)`.
/// Comments and doctypes are dropped, recoverable markup errors are skipped, and
/// a text run split by character references comes out as one `Text`. The body of
/// `<script>`, `<style>`, `<title>` and similar elements is text, not markup.
pub fn tokenize(body: &str) -> impl Iterator<Item = Token> + '_ {
    Tokenizer::new_with_emitter(body, TokenEmitter::default())
        .infallible()
        .chain(std::iter::once(Token::Error(ParseError::EndOfStream)))
}

enum PendingTag {
    Start { name: Vec<u8>, attrs: Vec<Attribute> },
    End { name: Vec<u8> },
}

/// Builds `Token`s straight from tokenizer callbacks.
///
/// Start tag attributes stay in source order with repeats kept, so
/// `find_attr` sees every `href` on `<a href="A" href="B">`.
#[derive(Default)]
struct TokenEmitter {
    tag: Option<PendingTag>,
    attr: Option<(Vec<u8>, Vec<u8>)>,
    text: Vec<u8>,
    last_start_tag: Vec<u8>,
    ready: VecDeque<Token>,
}

impl TokenEmitter {
    fn push(&mut self, token: Token) {
        self.flush_text();
        self.ready.push_back(token);
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = mem::take(&mut self.text);
            self.ready.push_back(Token::Text(lossy(&text)));
        }
    }

    fn flush_attr(&mut self) {
        let Some((key, value)) = self.attr.take() else {
            return;
        };
        // End tag attributes are dropped.
        if let Some(PendingTag::Start { attrs, .. }) = self.tag.as_mut() {
            attrs.push(Attribute::new(lossy(&key), lossy(&value)));
        }
    }
}

impl Emitter for TokenEmitter {
    type Token = Token;

    fn set_last_start_tag(&mut self, last_start_tag: Option<&[u8]>) {
        self.last_start_tag.clear();
        self.last_start_tag
            .extend_from_slice(last_start_tag.unwrap_or_default());
    }

    fn emit_eof(&mut self) {
        self.flush_text();
    }

    fn emit_error(&mut self, error: MarkupError) {
        trace!(error = ?error, "skipping recoverable markup error");
    }

    fn should_emit_errors(&mut self) -> bool {
        false
    }

    fn pop_token(&mut self) -> Option<Token> {
        self.ready.pop_front()
    }

    fn emit_string(&mut self, s: &[u8]) {
        self.text.extend_from_slice(s);
    }

    fn init_start_tag(&mut self) {
        self.tag = Some(PendingTag::Start {
            name: Vec::new(),
            attrs: Vec::new(),
        });
    }

    fn init_end_tag(&mut self) {
        self.tag = Some(PendingTag::End { name: Vec::new() });
    }

    fn init_comment(&mut self) {
        self.tag = None;
    }

    fn emit_current_tag(&mut self) -> Option<State> {
        self.flush_attr();
        match self.tag.take() {
            Some(PendingTag::Start { name, attrs }) => {
                self.set_last_start_tag(Some(name.as_slice()));
                self.push(Token::StartTag {
                    name: lossy(&name),
                    attrs,
                });
                // script, style, title and friends hold raw text until their end tag.
                naive_next_state(&name)
            }
            Some(PendingTag::End { name }) => {
                self.set_last_start_tag(None);
                self.push(Token::EndTag { name: lossy(&name) });
                None
            }
            None => None,
        }
    }

    fn emit_current_comment(&mut self) {}

    fn emit_current_doctype(&mut self) {}

    fn set_self_closing(&mut self) {}

    fn set_force_quirks(&mut self) {}

    fn push_tag_name(&mut self, s: &[u8]) {
        match self.tag.as_mut() {
            Some(PendingTag::Start { name, .. } | PendingTag::End { name }) => {
                name.extend_from_slice(s)
            }
            None => {}
        }
    }

    fn push_comment(&mut self, _s: &[u8]) {}

    fn push_doctype_name(&mut self, _s: &[u8]) {}

    fn init_doctype(&mut self) {
        self.tag = None;
    }

    fn init_attribute(&mut self) {
        self.flush_attr();
        self.attr = Some(Default::default());
    }

    fn push_attribute_name(&mut self, s: &[u8]) {
        if let Some((key, _)) = self.attr.as_mut() {
            key.extend_from_slice(s);
        }
    }

    fn push_attribute_value(&mut self, s: &[u8]) {
        if let Some((_, value)) = self.attr.as_mut() {
            value.extend_from_slice(s);
        }
    }

    fn set_doctype_public_identifier(&mut self, _value: &[u8]) {}

    fn set_doctype_system_identifier(&mut self, _value: &[u8]) {}

    fn push_doctype_public_identifier(&mut self, _s: &[u8]) {}

    fn push_doctype_system_identifier(&mut self, _s: &[u8]) {}

    fn current_is_appropriate_end_tag_token(&mut self) -> bool {
        match &self.tag {
            Some(PendingTag::End { name }) => {
                !self.last_start_tag.is_empty() && self.last_start_tag == *name
            }
            _ => false,
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
