//! Statement grouping and classification
//!
//! Tokens are split into logical lines at newlines and semicolons outside
//! brackets. Indented lines and `else`/`elif` clauses belong to the
//! statement above them, which makes that statement compound.

use super::lexer::{self, LineIndex, Token, TokenKind};
use super::{Arg, CallExpr, ParseError, Stmt, Value};

pub(crate) fn parse_statements(file: &str, src: &str) -> Result<Vec<Stmt>, ParseError> {
    let lines = LineIndex::new(src);
    let tokens = lexer::tokenize(file, src, &lines)?;
    let error = |offset: usize, message: String| {
        let (line, column) = lines.position(offset);
        ParseError::new(file, line, column, &message)
    };

    let mut groups: Vec<Group> = Vec::new();
    let mut current: Vec<&Token> = Vec::new();
    let mut open: Vec<&Token> = Vec::new();
    let mut after_semicolon = false;

    for token in &tokens {
        match &token.kind {
            TokenKind::Comment => continue,
            TokenKind::Newline | TokenKind::Semicolon if open.is_empty() => {
                close_group(src, &mut groups, &mut current, &lines, after_semicolon);
                after_semicolon = token.kind == TokenKind::Semicolon;
                continue;
            }
            TokenKind::Newline => continue,
            kind if kind.closer().is_some() => open.push(token),
            kind if kind.is_closer() => match open.pop() {
                Some(opener) if opener.kind.closer().as_ref() == Some(kind) => {}
                Some(opener) => {
                    let (line, column) = lines.position(opener.span.start);
                    return Err(error(
                        token.span.start,
                        format!(
                            "'{}' does not close '{}' opened at {}:{}",
                            &src[token.span.clone()],
                            &src[opener.span.clone()],
                            line,
                            column
                        ),
                    ));
                }
                None => {
                    return Err(error(
                        token.span.start,
                        format!("unmatched '{}'", &src[token.span.clone()]),
                    ))
                }
            },
            _ => {}
        }
        current.push(token);
    }

    if let Some(opener) = open.first() {
        return Err(error(
            opener.span.start,
            format!("'{}' is never closed", &src[opener.span.clone()]),
        ));
    }
    close_group(src, &mut groups, &mut current, &lines, after_semicolon);

    groups
        .iter()
        .map(|group| classify(file, src, &lines, group))
        .collect()
}

struct Group<'t> {
    tokens: Vec<&'t Token>,
    compound: bool,
}

fn close_group<'t>(
    src: &str,
    groups: &mut Vec<Group<'t>>,
    current: &mut Vec<&'t Token>,
    lines: &LineIndex,
    after_semicolon: bool,
) {
    let Some(first) = current.first() else {
        return;
    };
    let indented = lines.column_offset(first.span.start) > 0 && !after_semicolon;
    let clause = first.kind == TokenKind::Ident && matches!(&src[first.span.clone()], "else" | "elif");

    match groups.last_mut() {
        Some(previous) if indented || clause => {
            previous.tokens.append(current);
            previous.compound = true;
        }
        _ => groups.push(Group {
            tokens: std::mem::take(current),
            compound: false,
        }),
    }
}

fn classify(file: &str, src: &str, lines: &LineIndex, group: &Group) -> Result<Stmt, ParseError> {
    let tokens = &group.tokens;
    let span = tokens[0].span.start..tokens[tokens.len() - 1].span.end;

    if group.compound {
        return Ok(Stmt::Other { span });
    }

    if let Some(call) = call_expr(file, src, lines, tokens)? {
        return Ok(Stmt::Call(call));
    }

    if tokens.len() >= 3 && tokens[0].kind == TokenKind::Ident && tokens[1].kind == TokenKind::Assign {
        return Ok(Stmt::Assign {
            target: src[tokens[0].span.clone()].to_string(),
            value: value_of(src, &tokens[2..]),
            span,
        });
    }

    if let [single] = tokens.as_slice() {
        if matches!(single.kind, TokenKind::Str(_) | TokenKind::Number) {
            return Ok(Stmt::Literal {
                value: value_of(src, tokens),
                span,
            });
        }
    }

    Ok(Stmt::Other { span })
}

/// Recognise `a.b.c(...)` spanning the whole statement.
fn call_expr(
    file: &str,
    src: &str,
    lines: &LineIndex,
    tokens: &[&Token],
) -> Result<Option<CallExpr>, ParseError> {
    if tokens[0].kind != TokenKind::Ident {
        return Ok(None);
    }
    let mut i = 1;
    while i + 1 < tokens.len() && tokens[i].kind == TokenKind::Dot && tokens[i + 1].kind == TokenKind::Ident {
        i += 2;
    }
    if tokens.get(i).map(|t| &t.kind) != Some(&TokenKind::LParen) {
        return Ok(None);
    }
    let open = i;
    let close = tokens.len() - 1;
    if matching_close(tokens, open) != Some(close) {
        return Ok(None);
    }

    let callee: String = tokens[..open].iter().map(|t| &src[t.span.clone()]).collect();
    let (args, trailing_comma) = arguments(file, src, lines, &tokens[open + 1..close])?;
    let open_paren = tokens[open].span.start;
    let close_paren = tokens[close].span.start;

    Ok(Some(CallExpr {
        callee,
        args,
        span: tokens[0].span.start..tokens[close].span.end,
        open_paren,
        close_paren,
        trailing_comma,
        multiline: src[open_paren..close_paren].contains('\n'),
    }))
}

fn matching_close(tokens: &[&Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.kind.closer().is_some() {
            depth += 1;
        } else if token.kind.is_closer() {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split the tokens between a call's parentheses into arguments.
fn arguments(
    file: &str,
    src: &str,
    lines: &LineIndex,
    tokens: &[&Token],
) -> Result<(Vec<Arg>, Option<usize>), ParseError> {
    let error = |offset: usize, message: &str| {
        let (line, column) = lines.position(offset);
        ParseError::new(file, line, column, message)
    };

    let mut pieces: Vec<&[&Token]> = Vec::new();
    let mut commas: Vec<usize> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind.closer().is_some() {
            depth += 1;
        } else if token.kind.is_closer() {
            depth = depth.saturating_sub(1);
        } else if token.kind == TokenKind::Comma && depth == 0 {
            if i == start {
                return Err(error(token.span.start, "unexpected ','"));
            }
            pieces.push(&tokens[start..i]);
            commas.push(token.span.end);
            start = i + 1;
        }
    }

    let trailing_comma = if start < tokens.len() {
        pieces.push(&tokens[start..]);
        None
    } else {
        commas.last().copied()
    };

    let mut args = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let named = piece.len() >= 2
            && piece[0].kind == TokenKind::Ident
            && piece[1].kind == TokenKind::Assign;

        let value_tokens = if named { &piece[2..] } else { piece };
        let (Some(first), Some(last)) = (value_tokens.first(), value_tokens.last()) else {
            return Err(error(
                piece[1].span.end,
                &format!("missing value for argument '{}'", &src[piece[0].span.clone()]),
            ));
        };
        let value_span = first.span.start..last.span.end;

        let (name, separator) = if named {
            (
                Some(src[piece[0].span.clone()].to_string()),
                Some(src[piece[0].span.end..value_span.start].to_string()),
            )
        } else {
            (None, None)
        };

        args.push(Arg {
            name,
            value: value_of(src, value_tokens),
            separator,
            span: piece[0].span.start..value_span.end,
            value_span,
        });
    }

    Ok((args, trailing_comma))
}

fn value_of(src: &str, tokens: &[&Token]) -> Value {
    if let [single] = tokens {
        if let TokenKind::Str(s) = &single.kind {
            return Value::String(s.clone());
        }
    }
    if let Some(items) = string_list(tokens) {
        return Value::StringList(items);
    }
    let span = tokens[0].span.start..tokens[tokens.len() - 1].span.end;
    Value::Other(src[span].to_string())
}

/// `["a", "b"]` with an optional trailing comma.
fn string_list(tokens: &[&Token]) -> Option<Vec<String>> {
    let (first, rest) = tokens.split_first()?;
    let (last, inner) = rest.split_last()?;
    if first.kind != TokenKind::LBracket || last.kind != TokenKind::RBracket {
        return None;
    }

    let mut items = Vec::new();
    let mut expect_item = true;
    for token in inner {
        match (&token.kind, expect_item) {
            (TokenKind::Str(s), true) => items.push(s.clone()),
            (TokenKind::Comma, false) => {}
            _ => return None,
        }
        expect_item = !expect_item;
    }
    Some(items)
}
