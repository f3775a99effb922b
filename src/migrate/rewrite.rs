//! CI workflow branch-filter rewriting
//!
//! Matching is deliberately narrow. Only two shapes are rewritten:
//! items of inline `branches: [...]` / `branches-ignore: [...]` lists, and
//! lines that consist solely of a `- <branch>` sequence item. Anything else
//! that still names the source branch is reported as a remaining reference,
//! including fully qualified `refs/heads/<branch>` refs.

use crate::fs::FileSystem;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

/// Characters that may appear inside a branch name
const BRANCH_CHARS: &str = r"A-Za-z0-9_./-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub updated_files: Vec<PathBuf>,
    pub remaining_references: bool,
}

pub struct WorkflowRewriter {
    source: String,
    target: String,
    inline_list: Regex,
    sequence_item: Regex,
    mention: Regex,
}

impl WorkflowRewriter {
    pub fn new(source: &str, target: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(source);
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            inline_list: Regex::new(r"(?m)^([ \t]*branches(?:-ignore)?[ \t]*:[ \t]*\[)([^\]\n]*)(\])")?,
            sequence_item: Regex::new(&format!(
                r#"(?m)^([ \t]*-[ \t]+)("|')?{escaped}("|')?([ \t]*)$"#
            ))?,
            mention: Regex::new(&format!(
                r"(?m)(?:^|[^{BRANCH_CHARS}]|\brefs/heads/){escaped}(?:$|[^{BRANCH_CHARS}])"
            ))?,
        })
    }

    /// Rewrite one workflow document
    pub fn rewrite<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let inline = self.inline_list.replace_all(content, |caps: &Captures| {
            format!("{}{}{}", &caps[1], self.rewrite_list_items(&caps[2]), &caps[3])
        });
        let rewritten = self
            .sequence_item
            .replace_all(&inline, |caps: &Captures| {
                let open = caps.get(2).map(|m| m.as_str());
                let close = caps.get(3).map(|m| m.as_str());
                if open != close {
                    return caps[0].to_string();
                }
                let quote = open.unwrap_or_default();
                format!("{}{quote}{}{quote}{}", &caps[1], self.target, &caps[4])
            })
            .into_owned();

        if rewritten == content {
            Cow::Borrowed(content)
        } else {
            Cow::Owned(rewritten)
        }
    }

    fn rewrite_list_items(&self, items: &str) -> String {
        items
            .split(',')
            .map(|item| {
                let trimmed = item.trim();
                let quoted = [("", ""), ("\"", "\""), ("'", "'")]
                    .into_iter()
                    .find(|&(open, close)| {
                        trimmed
                            .strip_prefix(open)
                            .and_then(|rest| rest.strip_suffix(close))
                            .is_some_and(|name| name == self.source)
                    });
                match quoted {
                    Some((quote, _)) => item.replacen(trimmed, &format!("{quote}{}{quote}", self.target), 1),
                    None => item.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn mentions_source(&self, content: &str) -> bool {
        self.mention.is_match(content)
    }

    /// Rewrite every `*.yml`/`*.yaml` under `directory`, in file-name order.
    /// A missing directory has nothing to rewrite.
    pub async fn rewrite_directory(&self, file_system: &dyn FileSystem, directory: &Path) -> io::Result<RewriteSummary> {
        let mut summary = RewriteSummary::default();
        match file_system.stat(directory).await {
            Ok(stat) if stat.is_dir => {}
            Ok(_) => return Ok(summary),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(summary),
            Err(e) => return Err(e),
        }

        for path in file_system.list_files(directory).await? {
            if !is_workflow_file(&path) {
                continue;
            }
            let bytes = file_system.read_file(&path).await?;
            let content = String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let rewritten = self.rewrite(&content);
            if let Cow::Owned(updated) = &rewritten {
                let permissions = file_system.stat(&path).await?.permissions;
                file_system.write_file(&path, updated.as_bytes(), permissions).await?;
                tracing::debug!(path = %path.display(), "workflow branch filters rewritten");
                summary.updated_files.push(path);
            }
            if self.mentions_source(&rewritten) {
                summary.remaining_references = true;
            }
        }
        Ok(summary)
    }
}

fn is_workflow_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
}
