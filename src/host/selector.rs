use crate::foundation::error::{KineticError, KineticResult};
use crate::host::document::ElementData;

/// A compound selector: optional tag, `#id`, `.class` parts, and an
/// optional pseudo-element/-class tag.
///
/// Combinators are not part of this surface; selector resolution here only
/// serves stylesheet-rule matching against a single element.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Selector {
    /// Tag name, lowercased. `None` matches any tag (`*` or absent).
    pub tag: Option<String>,
    /// `#id` part.
    pub id: Option<String>,
    /// `.class` parts, all of which must be present on the element.
    pub classes: Vec<String>,
    /// Pseudo tag (without leading colons), e.g. `before`, `hover`.
    pub pseudo: Option<String>,
}

impl Selector {
    /// Parse a compound selector. Whitespace and combinators are rejected
    /// synchronously as unsupported syntax.
    pub fn parse(input: &str) -> KineticResult<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(KineticError::host("empty selector"));
        }
        if s.chars().any(|c| c.is_whitespace() || "<>+~[,".contains(c)) {
            return Err(KineticError::host(format!(
                "unsupported selector syntax \"{s}\""
            )));
        }
        let mut sel = Self::default();
        let mut rest = s;
        // Pseudo part first so `:` never leaks into class/id scanning.
        if let Some(pos) = rest.find(':') {
            let pseudo = rest[pos..].trim_start_matches(':');
            if pseudo.is_empty() {
                return Err(KineticError::host(format!("bad pseudo in \"{s}\"")));
            }
            sel.pseudo = Some(pseudo.to_owned());
            rest = &rest[..pos];
        }
        let mut chars = rest.char_indices().peekable();
        let mut token_start = 0usize;
        let mut token_kind = b' ';
        let flush = |sel: &mut Selector, kind: u8, text: &str| -> KineticResult<()> {
            if text.is_empty() {
                if kind != b' ' {
                    return Err(KineticError::host(format!("dangling token in \"{s}\"")));
                }
                return Ok(());
            }
            match kind {
                b' ' => {
                    if text != "*" {
                        sel.tag = Some(text.to_ascii_lowercase());
                    }
                }
                b'#' => sel.id = Some(text.to_owned()),
                b'.' => sel.classes.push(text.to_owned()),
                _ => unreachable!(),
            }
            Ok(())
        };
        while let Some((i, c)) = chars.next() {
            if c == '.' || c == '#' {
                flush(&mut sel, token_kind, &rest[token_start..i])?;
                token_kind = c as u8;
                token_start = i + 1;
            } else if chars.peek().is_none() {
                flush(&mut sel, token_kind, &rest[token_start..])?;
            }
        }
        if rest.is_empty() && sel.pseudo.is_none() {
            return Err(KineticError::host(format!("empty selector \"{s}\"")));
        }
        Ok(sel)
    }

    /// Whether this selector matches `el` when read in the given pseudo
    /// context (`None` = the element itself).
    pub fn matches(&self, el: &ElementData, pseudo: Option<&str>) -> bool {
        if self.pseudo.as_deref() != pseudo {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes
            .iter()
            .all(|c| el.classes.iter().any(|ec| ec == c))
    }
}
