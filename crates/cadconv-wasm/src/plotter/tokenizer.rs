//! Splits a photoplotter stream into block delimiters and commands.
//!
//! `%` toggles parameter-block mode and is kept as a [`Token::BlockDelimiter`];
//! `*` ends a command and is dropped, as is all whitespace. `IF<name>`
//! directives inside a block splice the tokens of the named stream right
//! after the block's closing `%`.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::TokenizeError;

/// One token of the command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A `%` opening or closing a parameter block.
    BlockDelimiter,
    /// A command with terminator and whitespace removed.
    Command(String),
}

/// Supplies the text of streams named by `IF` directives.
pub trait IncludeSource {
    /// Returns the text of `name`, or a human readable reason it is unavailable.
    ///
    /// # Errors
    ///
    /// Any failure to produce the stream; the include then inserts nothing.
    fn fetch(&self, name: &str) -> Result<String, String>;
}

/// An include source that has nothing to offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeSource for NoIncludes {
    fn fetch(&self, name: &str) -> Result<String, String> {
        Err(format!("no include source configured for `{name}`"))
    }
}

impl IncludeSource for HashMap<String, String> {
    fn fetch(&self, name: &str) -> Result<String, String> {
        self.get(name)
            .cloned()
            .ok_or_else(|| format!("`{name}` not found"))
    }
}

/// An include directive that inserted nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeFailure {
    /// Index of the `IF` command in the final token list.
    pub token_index: usize,
    /// The `IF` command text.
    pub command: String,
    /// Requested name.
    pub name: String,
    /// Why nothing was inserted.
    pub reason: String,
}

/// Tokens of a stream plus the include directives that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    /// Flat token list with includes spliced in.
    pub tokens: Vec<Token>,
    /// Failed includes in token order.
    pub include_failures: Vec<IncludeFailure>,
}

/// Stateless tokenizer bound to an include source and depth limit.
pub struct Tokenizer<'a> {
    includes: &'a dyn IncludeSource,
    max_include_depth: u32,
}

struct PendingInclude {
    token_index: usize,
    command: String,
    name: String,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer resolving includes through `includes`.
    pub fn new(includes: &'a dyn IncludeSource, max_include_depth: u32) -> Self {
        Self {
            includes,
            max_include_depth,
        }
    }

    /// Tokenizes a top-level stream.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizeError::UnterminatedBlock`] when a `%` block is never
    /// closed. Include problems are reported in
    /// [`Tokenized::include_failures`] instead.
    pub fn tokenize(&self, text: &str) -> Result<Tokenized, TokenizeError> {
        self.tokenize_at_depth(text, 0)
    }

    fn tokenize_at_depth(&self, text: &str, depth: u32) -> Result<Tokenized, TokenizeError> {
        let mut out = Tokenized::default();
        let mut current = String::new();
        let mut block_start: Option<usize> = None;
        let mut pending: Vec<PendingInclude> = Vec::new();

        for (offset, ch) in text.char_indices() {
            match ch {
                '%' => {
                    flush(&mut current, &mut out, block_start.is_some(), &mut pending);
                    out.tokens.push(Token::BlockDelimiter);
                    if block_start.take().is_none() {
                        block_start = Some(offset);
                    } else {
                        for include in pending.drain(..) {
                            self.splice(include, depth, &mut out);
                        }
                    }
                }
                '*' => flush(&mut current, &mut out, block_start.is_some(), &mut pending),
                ch if ch.is_whitespace() => {}
                ch => current.push(ch),
            }
        }

        if let Some(offset) = block_start {
            return Err(TokenizeError::UnterminatedBlock { offset });
        }
        flush(&mut current, &mut out, false, &mut pending);
        Ok(out)
    }

    fn splice(&self, include: PendingInclude, depth: u32, out: &mut Tokenized) {
        let nested_depth = depth.saturating_add(1);
        let result = if nested_depth > self.max_include_depth {
            Err(TokenizeError::RecursionLimitExceeded {
                depth: self.max_include_depth,
            }
            .to_string())
        } else {
            self.includes.fetch(&include.name).and_then(|text| {
                self.tokenize_at_depth(&text, nested_depth)
                    .map_err(|err| err.to_string())
            })
        };

        match result {
            Ok(nested) => {
                debug!(
                    "included `{}`: {} tokens at depth {nested_depth}",
                    include.name,
                    nested.tokens.len()
                );
                let base = out.tokens.len();
                out.tokens.extend(nested.tokens);
                out.include_failures
                    .extend(nested.include_failures.into_iter().map(|failure| IncludeFailure {
                        token_index: failure.token_index + base,
                        ..failure
                    }));
            }
            Err(reason) => {
                warn!("include `{}` inserted nothing: {reason}", include.name);
                out.include_failures.push(IncludeFailure {
                    token_index: include.token_index,
                    command: include.command,
                    name: include.name,
                    reason,
                });
            }
        }
    }
}

fn flush(
    current: &mut String,
    out: &mut Tokenized,
    in_block: bool,
    pending: &mut Vec<PendingInclude>,
) {
    if current.is_empty() {
        return;
    }

    let command = std::mem::take(current);
    if in_block {
        if let Some(name) = command.strip_prefix("IF") {
            pending.push(PendingInclude {
                token_index: out.tokens.len(),
                command: command.clone(),
                name: name.to_string(),
            });
        }
    }
    out.tokens.push(Token::Command(command));
}
