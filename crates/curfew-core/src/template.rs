//! Warning message templating.
//!
//! Templates use printf-style placeholders: `%1$s`, `%2$s` ... pick
//! arguments by position, a bare `%s` takes the next argument in sequence,
//! and `%%` is a literal percent sign. After substitution the message goes
//! through a [`ContentFilter`], which is where storefront shortcodes expand.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::TemplateError;

static SHORTCODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([A-Za-z0-9_-]+)(?:\s[^\]]*)?\]").expect("Invalid shortcode pattern")
});

/// Substitutes `args` into `template`.
pub fn format_template(template: &str, args: &[&str]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut next_arg = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.next() {
            None => return Err(TemplateError::Truncated),
            Some((_, '%')) => out.push('%'),
            Some((_, 's')) => {
                out.push_str(argument(args, next_arg)?);
                next_arg += 1;
            }
            Some((_, d)) if d.is_ascii_digit() => {
                let mut position = d.to_digit(10).unwrap_or(0) as usize;
                loop {
                    match chars.next() {
                        Some((_, d)) if d.is_ascii_digit() => {
                            let digit = d.to_digit(10).unwrap_or(0) as usize;
                            position = position
                                .checked_mul(10)
                                .and_then(|p| p.checked_add(digit))
                                .ok_or(TemplateError::UnsupportedConversion(start))?;
                        }
                        Some((_, '$')) => break,
                        Some(_) => return Err(TemplateError::UnsupportedConversion(start)),
                        None => return Err(TemplateError::Truncated),
                    }
                }
                match chars.next() {
                    Some((_, 's')) => {}
                    Some(_) => return Err(TemplateError::UnsupportedConversion(start)),
                    None => return Err(TemplateError::Truncated),
                }
                if position == 0 {
                    return Err(TemplateError::UnsupportedConversion(start));
                }
                out.push_str(argument(args, position - 1)?);
            }
            Some(_) => return Err(TemplateError::UnsupportedConversion(start)),
        }
    }

    Ok(out)
}

fn argument<'a>(args: &[&'a str], index: usize) -> Result<&'a str, TemplateError> {
    args.get(index)
        .copied()
        .ok_or(TemplateError::MissingArgument {
            position: index + 1,
            available: args.len(),
        })
}

/// Post-processing the storefront applies to user-authored content.
pub trait ContentFilter: Send + Sync {
    fn apply(&self, content: &str) -> Result<String, TemplateError>;
}

/// Leaves content untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ContentFilter for PassThrough {
    fn apply(&self, content: &str) -> Result<String, TemplateError> {
        Ok(content.to_string())
    }
}

/// Expands `[tag]` shortcodes from a fixed table.
///
/// Attributes inside the brackets are accepted and ignored. Tags that are
/// not registered are left as written.
#[derive(Debug, Clone, Default)]
pub struct Shortcodes {
    tags: HashMap<String, String>,
}

impl Shortcodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tag and its replacement text.
    pub fn register(&mut self, tag: impl Into<String>, replacement: impl Into<String>) {
        self.tags.insert(tag.into(), replacement.into());
    }

    pub fn with(mut self, tag: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.register(tag, replacement);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl ContentFilter for Shortcodes {
    fn apply(&self, content: &str) -> Result<String, TemplateError> {
        let expanded = SHORTCODE_PATTERN.replace_all(content, |caps: &Captures| {
            match self.tags.get(&caps[1]) {
                Some(replacement) => replacement.clone(),
                None => caps[0].to_string(),
            }
        });
        Ok(expanded.into_owned())
    }
}
