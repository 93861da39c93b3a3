//! Patch text parser.
//!
//! Turns `*** Begin Patch` text plus the original contents of the files it
//! touches into a [`Patch`]: one [`PatchAction`] per path, in patch order.
//! Update hunks carry no line numbers; each one is located by searching the
//! original file for its context lines.

use crate::error::PatchError;
use indexmap::IndexMap;
use std::collections::HashMap;

pub const BEGIN_PATCH: &str = "*** Begin Patch";
pub const END_PATCH: &str = "*** End Patch";
pub const UPDATE_FILE: &str = "*** Update File: ";
pub const DELETE_FILE: &str = "*** Delete File: ";
pub const ADD_FILE: &str = "*** Add File: ";
pub const MOVE_TO: &str = "*** Move to: ";
const END_OF_FILE: &str = "*** End of File";
const HUNK_MARKER: &str = "@@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Add,
    Delete,
    Update,
}

/// A single delete+insert edit inside an updated file.
///
/// `orig_index` is an absolute line index into the original file once the
/// parser has located the hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub orig_index: usize,
    pub del_lines: Vec<String>,
    pub ins_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchAction {
    pub kind: ActionType,
    /// Content of an added file
    pub new_file: Option<String>,
    pub chunks: Vec<Chunk>,
    pub move_path: Option<String>,
}

/// A parsed patch, keyed by path in the order the sections appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub actions: IndexMap<String, PatchAction>,
}

fn normalize(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn is_file_header(line: &str) -> bool {
    [UPDATE_FILE, DELETE_FILE, ADD_FILE]
        .iter()
        .any(|h| line.starts_with(h))
}

/// Lines that end a run of hunk body lines.
fn is_section_boundary(line: &str) -> bool {
    line.starts_with(HUNK_MARKER) || line.starts_with("***")
}

/// Check the first and last lines of a patch.
///
/// Trailing blank lines are ignored so text ending in a newline still counts.
pub fn validate_sentinels(lines: &[&str]) -> bool {
    lines.len() >= 2
        && normalize(lines[0]).starts_with(BEGIN_PATCH)
        && lines.last().is_some_and(|l| normalize(l) == END_PATCH)
}

/// Split patch text into lines with trailing line breaks removed.
pub(crate) fn patch_lines(text: &str) -> Vec<&str> {
    text.trim_end_matches(['\n', '\r']).split('\n').collect()
}

/// Paths named by headers with the given prefix (e.g. [`UPDATE_FILE`]).
pub fn extract_paths(text: &str, prefix: &str) -> Vec<String> {
    text.split('\n')
        .map(normalize)
        .filter_map(|line| line.strip_prefix(prefix))
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `text` against the already-loaded `originals`.
pub fn parse_patch(text: &str, originals: &HashMap<String, String>) -> Result<Patch, PatchError> {
    let lines = patch_lines(text);
    if !validate_sentinels(&lines) {
        return Err(PatchError::MissingSentinels);
    }
    let mut parser = Parser {
        originals,
        lines,
        index: 1,
        patch: Patch::default(),
    };
    parser.parse()?;
    Ok(parser.patch)
}

struct Parser<'a> {
    originals: &'a HashMap<String, String>,
    lines: Vec<&'a str>,
    index: usize,
    patch: Patch,
}

impl<'a> Parser<'a> {
    fn parse(&mut self) -> Result<(), PatchError> {
        while self.index < self.lines.len() && normalize(self.lines[self.index]) != END_PATCH {
            self.parse_section()?;
        }

        if normalize(self.current_line()?) != END_PATCH {
            return Err(PatchError::MissingEndSentinel);
        }
        if self.index + 1 != self.lines.len() {
            return Err(PatchError::UnknownLine(self.lines[self.index + 1].to_string()));
        }
        Ok(())
    }

    fn parse_section(&mut self) -> Result<(), PatchError> {
        if let Some(path) = self.try_read(UPDATE_FILE)? {
            return self.parse_update(path);
        }
        if let Some(path) = self.try_read(DELETE_FILE)? {
            return self.parse_delete(path);
        }
        if let Some(path) = self.try_read(ADD_FILE)? {
            return self.parse_add(path);
        }
        Err(PatchError::UnknownLine(self.current_line()?.to_string()))
    }

    fn parse_update(&mut self, path: String) -> Result<(), PatchError> {
        if self.patch.actions.contains_key(&path) {
            return Err(PatchError::Duplicate { path });
        }
        let originals = self.originals;
        let Some(content) = originals.get(&path) else {
            return Err(PatchError::MissingFile { path });
        };

        let move_path = self.try_read(MOVE_TO)?;
        let chunks = self.parse_update_content(&path, content)?;
        self.patch.actions.insert(
            path,
            PatchAction {
                kind: ActionType::Update,
                new_file: None,
                chunks,
                move_path,
            },
        );
        Ok(())
    }

    fn parse_delete(&mut self, path: String) -> Result<(), PatchError> {
        if self.patch.actions.contains_key(&path) {
            return Err(PatchError::Duplicate { path });
        }
        if !self.originals.contains_key(&path) {
            return Err(PatchError::MissingFile { path });
        }
        self.patch.actions.insert(
            path,
            PatchAction {
                kind: ActionType::Delete,
                new_file: None,
                chunks: Vec::new(),
                move_path: None,
            },
        );
        Ok(())
    }

    fn parse_add(&mut self, path: String) -> Result<(), PatchError> {
        if self.patch.actions.contains_key(&path) {
            return Err(PatchError::Duplicate { path });
        }
        if self.originals.contains_key(&path) {
            return Err(PatchError::FileExists { path });
        }

        let mut body = Vec::new();
        while !self.at_section_end()? {
            let line = self.lines[self.index];
            let Some(content) = line.strip_prefix('+') else {
                return Err(PatchError::InvalidAddLine(line.to_string()));
            };
            body.push(content);
            self.index += 1;
        }

        self.patch.actions.insert(
            path,
            PatchAction {
                kind: ActionType::Add,
                new_file: Some(body.join("\n")),
                chunks: Vec::new(),
                move_path: None,
            },
        );
        Ok(())
    }

    /// Parse every hunk of an Update section and resolve it against `content`.
    fn parse_update_content(&mut self, path: &str, content: &str) -> Result<Vec<Chunk>, PatchError> {
        let file_lines: Vec<&str> = content.split('\n').collect();
        let mut resolved = Vec::new();
        let mut cursor = 0;

        while !self.at_section_end()? {
            let line = normalize(self.lines[self.index]);
            if line.starts_with(HUNK_MARKER) || line == END_OF_FILE {
                self.index += 1;
                continue;
            }
            if line.starts_with("***") {
                return Err(PatchError::UnknownLine(line.to_string()));
            }

            let (context, chunks) = self.parse_hunk()?;
            let position = find_context_position(path, &file_lines, &context, cursor)?;
            resolved.extend(chunks.into_iter().map(|mut chunk| {
                chunk.orig_index += position;
                chunk
            }));
            cursor = position + context.len();
        }
        Ok(resolved)
    }

    /// Read one hunk body. Returns the lines the hunk expects in the
    /// original file (context and deletions) plus its chunks, with
    /// `orig_index` relative to the first of those lines.
    fn parse_hunk(&mut self) -> Result<(Vec<&'a str>, Vec<Chunk>), PatchError> {
        let mut context: Vec<&'a str> = Vec::new();
        let mut chunks = Vec::new();
        let mut del: Vec<&'a str> = Vec::new();
        let mut ins: Vec<&'a str> = Vec::new();

        while let Some(&line) = self.lines.get(self.index) {
            if is_section_boundary(line) {
                break;
            }
            self.index += 1;

            // A bare (or CR-only) line is an empty context line
            if normalize(line).is_empty() {
                flush_chunk(&mut del, &mut ins, &mut chunks, &context);
                context.push("");
                continue;
            }

            let mut chars = line.chars();
            let tag = chars.next();
            let body = chars.as_str();
            match tag {
                Some(' ') => {
                    flush_chunk(&mut del, &mut ins, &mut chunks, &context);
                    context.push(body);
                }
                Some('-') => {
                    del.push(body);
                    context.push(body);
                }
                Some('+') => ins.push(body),
                _ => return Err(PatchError::InvalidDiffLine(line.to_string())),
            }
        }

        flush_chunk(&mut del, &mut ins, &mut chunks, &context);
        Ok((context, chunks))
    }

    fn current_line(&self) -> Result<&'a str, PatchError> {
        self.lines
            .get(self.index)
            .copied()
            .ok_or(PatchError::UnexpectedEnd)
    }

    /// Consume the current line if it starts with `prefix`, returning the rest.
    fn try_read(&mut self, prefix: &str) -> Result<Option<String>, PatchError> {
        let line = normalize(self.current_line()?);
        match line.strip_prefix(prefix) {
            Some(rest) if !rest.is_empty() => {
                self.index += 1;
                Ok(Some(rest.to_string()))
            }
            _ => Ok(None),
        }
    }

    /// Whether the current line ends the section being parsed.
    fn at_section_end(&self) -> Result<bool, PatchError> {
        let line = normalize(self.current_line()?);
        Ok(line == END_PATCH || is_file_header(line))
    }
}

fn flush_chunk<'a>(
    del: &mut Vec<&'a str>,
    ins: &mut Vec<&'a str>,
    chunks: &mut Vec<Chunk>,
    context: &[&'a str],
) {
    if del.is_empty() && ins.is_empty() {
        return;
    }
    chunks.push(Chunk {
        orig_index: context.len() - del.len(),
        del_lines: del.drain(..).map(str::to_string).collect(),
        ins_lines: ins.drain(..).map(str::to_string).collect(),
    });
}

/// First index at or after `start` where `context` matches `file_lines`
/// line for line, ignoring trailing carriage returns.
pub(crate) fn find_context_position(
    path: &str,
    file_lines: &[&str],
    context: &[&str],
    start: usize,
) -> Result<usize, PatchError> {
    if context.is_empty() {
        return Ok(start);
    }

    let last_start = file_lines.len().checked_sub(context.len());
    if let Some(last_start) = last_start {
        for i in start..=last_start {
            let matches = context
                .iter()
                .zip(&file_lines[i..])
                .all(|(want, have)| normalize(want) == normalize(have));
            if matches {
                return Ok(i);
            }
        }
    }

    Err(PatchError::ContextNotFound {
        path: path.to_string(),
        context: context.join("\n"),
        after_line: start,
    })
}
