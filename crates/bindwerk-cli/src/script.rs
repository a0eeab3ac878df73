// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assembly script front end.
//
// Line-oriented syntax with nestable `input { ... }` and `output { ... }`
// blocks; entering a block opens a nested context and leaving it restores
// the parent. `#` starts a comment, trailing semicolons are tolerated.
//
//     output {
//         file "book.pdf"
//         title "Board minutes 1987"
//         bookmark "January"
//     }
//     input {
//         file "jan.tif"
//         rotation 90
//         odd
//         images 1..12
//     }
//
// Parsing produces a flat sequence of semantic calls which `apply` feeds to
// the assembler, so scripts can be validated without touching any file.

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use bindwerk_assembly::Assembler;
use bindwerk_core::error::BindwerkError;
use bindwerk_core::{PageModifier, PageRange};

/// One semantic call produced by the script parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCall {
    PushInput,
    PopInput,
    SetInputFile(PathBuf),
    SetRotation(u32),
    SetModifier(PageModifier),
    InputImages(PageRange),
    PushOutput,
    PopOutput,
    SetOutputFile(PathBuf),
    SetAuthor(String),
    SetCreator(String),
    SetTitle(String),
    SetSubject(String),
    SetKeywords(String),
    SetBookmark(String),
    SetLabelFormat(String),
    OutputPages(PageRange),
}

/// A malformed script aborts the run before any page is touched.
#[derive(Debug, Error)]
#[error("script line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

fn err(line: usize, message: impl Into<String>) -> ScriptError {
    ScriptError {
        line,
        message: message.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    Input,
    Output,
}

/// Parse a whole script into semantic calls.
pub fn parse_script(text: &str) -> Result<Vec<ScriptCall>, ScriptError> {
    let mut calls = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();
    let mut last_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let line = strip_comment(raw);
        let line = line.trim().trim_end_matches(';').trim_end();
        if line.is_empty() {
            continue;
        }

        if line == "}" {
            match blocks.pop() {
                Some(Block::Input) => calls.push(ScriptCall::PopInput),
                Some(Block::Output) => calls.push(ScriptCall::PopOutput),
                None => return Err(err(line_no, "unmatched '}'")),
            }
            continue;
        }

        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };

        match keyword {
            "input" | "output" => {
                if rest != "{" {
                    return Err(err(line_no, format!("expected '{keyword} {{'")));
                }
                if keyword == "input" {
                    blocks.push(Block::Input);
                    calls.push(ScriptCall::PushInput);
                } else {
                    blocks.push(Block::Output);
                    calls.push(ScriptCall::PushOutput);
                }
            }
            "file" => match blocks.last() {
                Some(Block::Input) => {
                    calls.push(ScriptCall::SetInputFile(parse_string(rest, line_no)?.into()));
                }
                Some(Block::Output) => {
                    calls.push(ScriptCall::SetOutputFile(parse_string(rest, line_no)?.into()));
                }
                None => return Err(err(line_no, "'file' outside input/output block")),
            },
            "rotation" => {
                require_block(&blocks, Block::Input, keyword, line_no)?;
                let degrees: u32 = rest
                    .parse()
                    .map_err(|_| err(line_no, format!("bad rotation '{rest}'")))?;
                calls.push(ScriptCall::SetRotation(degrees));
            }
            "all" | "odd" | "even" => {
                require_block(&blocks, Block::Input, keyword, line_no)?;
                if !rest.is_empty() {
                    return Err(err(line_no, format!("unexpected text after '{keyword}'")));
                }
                let modifier = match keyword {
                    "all" => PageModifier::All,
                    "odd" => PageModifier::Odd,
                    _ => PageModifier::Even,
                };
                calls.push(ScriptCall::SetModifier(modifier));
            }
            "images" => {
                require_block(&blocks, Block::Input, keyword, line_no)?;
                calls.push(ScriptCall::InputImages(parse_range(rest, line_no)?));
            }
            "pages" => {
                require_block(&blocks, Block::Output, keyword, line_no)?;
                calls.push(ScriptCall::OutputPages(parse_range(rest, line_no)?));
            }
            "author" | "creator" | "title" | "subject" | "keywords" | "bookmark" | "label" => {
                require_block(&blocks, Block::Output, keyword, line_no)?;
                let text = parse_string(rest, line_no)?;
                calls.push(match keyword {
                    "author" => ScriptCall::SetAuthor(text),
                    "creator" => ScriptCall::SetCreator(text),
                    "title" => ScriptCall::SetTitle(text),
                    "subject" => ScriptCall::SetSubject(text),
                    "keywords" => ScriptCall::SetKeywords(text),
                    "bookmark" => ScriptCall::SetBookmark(text),
                    _ => ScriptCall::SetLabelFormat(text),
                });
            }
            other => return Err(err(line_no, format!("unknown statement '{other}'"))),
        }
    }

    if !blocks.is_empty() {
        return Err(err(last_line, "unclosed block at end of script"));
    }
    Ok(calls)
}

/// Feed parsed calls to the assembler in script order.
///
/// Structural failures (context underflow — impossible for parsed scripts,
/// but the assembler enforces it anyway) abort; a rejected rotation only
/// abandons its statement, matching the run's partial-failure policy.
pub fn apply(calls: &[ScriptCall], assembler: &mut Assembler) -> Result<(), BindwerkError> {
    for call in calls {
        match call {
            ScriptCall::PushInput => assembler.push_input_context(),
            ScriptCall::PopInput => assembler.pop_input_context()?,
            ScriptCall::SetInputFile(path) => assembler.set_input_file(path.clone()),
            ScriptCall::SetRotation(degrees) => {
                if let Err(error) = assembler.set_rotation(*degrees) {
                    warn!(%error, "ignoring invalid rotation");
                }
            }
            ScriptCall::SetModifier(modifier) => assembler.set_modifier(*modifier),
            ScriptCall::InputImages(range) => assembler.input_images(*range),
            ScriptCall::PushOutput => assembler.push_output_context(),
            ScriptCall::PopOutput => assembler.pop_output_context()?,
            ScriptCall::SetOutputFile(path) => assembler.set_output_file(path.clone()),
            ScriptCall::SetAuthor(text) => assembler.set_author(text.clone()),
            ScriptCall::SetCreator(text) => assembler.set_creator(text.clone()),
            ScriptCall::SetTitle(text) => assembler.set_title(text.clone()),
            ScriptCall::SetSubject(text) => assembler.set_subject(text.clone()),
            ScriptCall::SetKeywords(text) => assembler.set_keywords(text.clone()),
            ScriptCall::SetBookmark(text) => assembler.set_bookmark(text.clone()),
            ScriptCall::SetLabelFormat(text) => assembler.set_page_number_format(text.clone()),
            ScriptCall::OutputPages(range) => assembler.output_pages(*range),
        }
    }
    Ok(())
}

/// Cut a `#` comment, ignoring `#` inside quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (pos, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..pos],
            _ => {}
        }
    }
    line
}

/// A double-quoted string argument.
fn parse_string(rest: &str, line_no: usize) -> Result<String, ScriptError> {
    let rest = rest.trim();
    let inner = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .ok_or_else(|| err(line_no, format!("expected a quoted string, got '{rest}'")))?;
    if inner.contains('"') {
        return Err(err(line_no, "embedded quotes are not supported"));
    }
    Ok(inner.to_string())
}

/// A page range: `first..last` or a single page number.
fn parse_range(rest: &str, line_no: usize) -> Result<PageRange, ScriptError> {
    let rest = rest.trim();
    let (first, last) = match rest.split_once("..") {
        Some((first, last)) => (first.trim(), last.trim()),
        None => (rest, rest),
    };
    let first: u32 = first
        .parse()
        .map_err(|_| err(line_no, format!("bad page number '{first}'")))?;
    let last: u32 = last
        .parse()
        .map_err(|_| err(line_no, format!("bad page number '{last}'")))?;
    PageRange::new(first, last).map_err(|error| err(line_no, error.to_string()))
}

fn require_block(
    blocks: &[Block],
    expected: Block,
    keyword: &str,
    line_no: usize,
) -> Result<(), ScriptError> {
    if blocks.last() == Some(&expected) {
        return Ok(());
    }
    let side = match expected {
        Block::Input => "input",
        Block::Output => "output",
    };
    Err(err(
        line_no,
        format!("'{keyword}' is only valid inside an {side} block"),
    ))
}
