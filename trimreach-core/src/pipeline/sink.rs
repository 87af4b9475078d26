//! Report sinks: where reported chains go.
//!
//! Ungrouped runs call [`ChainSink::chain`] as each chain is classified.
//! Grouped runs call `begin_group`/`chain`/`end_group` in nesting order after
//! the queue is drained. [`ChainSink::finish`] is always called last.

use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;

use super::chain::ReportedChain;
use super::grouping::GroupKind;
use crate::error::{TrimreachError, TrimreachResult};

pub trait ChainSink {
    fn begin_group(&mut self, _kind: GroupKind, _label: &str, _count: usize) -> TrimreachResult<()> {
        Ok(())
    }

    fn chain(&mut self, chain: &ReportedChain) -> TrimreachResult<()>;

    fn end_group(&mut self) -> TrimreachResult<()> {
        Ok(())
    }

    fn finish(&mut self) -> TrimreachResult<()> {
        Ok(())
    }
}

impl<S: ChainSink + ?Sized> ChainSink for &mut S {
    fn begin_group(&mut self, kind: GroupKind, label: &str, count: usize) -> TrimreachResult<()> {
        (**self).begin_group(kind, label, count)
    }

    fn chain(&mut self, chain: &ReportedChain) -> TrimreachResult<()> {
        (**self).chain(chain)
    }

    fn end_group(&mut self) -> TrimreachResult<()> {
        (**self).end_group()
    }

    fn finish(&mut self) -> TrimreachResult<()> {
        (**self).finish()
    }
}

/// Plain text: a header line per chain followed by one frame per line.
pub struct TextSink<W: Write> {
    out: W,
    depth: usize,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&self) -> String {
        "    ".repeat(self.depth.saturating_sub(1))
    }
}

impl<W: Write> ChainSink for TextSink<W> {
    fn begin_group(&mut self, kind: GroupKind, label: &str, count: usize) -> TrimreachResult<()> {
        let (marker, prefix) = match kind {
            GroupKind::Assembly => ("###", "assembly: "),
            GroupKind::Category => ("@@@", "category: "),
            GroupKind::Dependency => ("---", ""),
            GroupKind::Method => ("---", "stacktraces for group: "),
        };
        self.depth += 1;
        let indent = self.indent();
        writeln!(self.out, "{indent}{marker}")?;
        writeln!(self.out, "{indent}{marker} {prefix}{label} ({count})")?;
        writeln!(self.out, "{indent}{marker}")?;
        Ok(())
    }

    fn chain(&mut self, chain: &ReportedChain) -> TrimreachResult<()> {
        let indent = self.indent();
        writeln!(self.out, "{indent}{}", chain.header())?;
        for frame in &chain.frames {
            writeln!(self.out, "{indent}{frame}")?;
        }
        Ok(())
    }

    fn end_group(&mut self) -> TrimreachResult<()> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn finish(&mut self) -> TrimreachResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonChain<'a> {
    annotation: String,
    category: &'a str,
    frames: &'a [String],
}

#[derive(Default)]
struct OpenGroup {
    kind: Option<GroupKind>,
    label: String,
    count: usize,
    chains: Vec<Value>,
    groups: Vec<Value>,
}

impl OpenGroup {
    fn into_value(self) -> Value {
        let mut value = json!({
            "kind": self.kind,
            "group": self.label,
            "count": self.count,
        });
        if self.groups.is_empty() {
            value["chains"] = Value::Array(self.chains);
        } else {
            value["groups"] = Value::Array(self.groups);
        }
        value
    }
}

/// JSON array of top-level items: chains when ungrouped, nested group
/// objects otherwise.
///
/// Top-level items are written as soon as they are complete, so ungrouped
/// chains stream. Only the group currently being emitted is held in memory.
pub struct JsonSink<W: Write> {
    out: W,
    /// Groups opened and not yet closed, innermost last
    open: Vec<OpenGroup>,
    written: usize,
    finished: bool,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            open: Vec::new(),
            written: 0,
            finished: false,
        }
    }

    /// The underlying writer, with everything written so far.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_item<T: Serialize>(&mut self, item: &T) -> TrimreachResult<()> {
        if self.finished {
            return Err(TrimreachError::internal("JSON sink used after finish"));
        }
        self.out
            .write_all(if self.written == 0 { b"[\n" } else { b",\n" })?;
        serde_json::to_writer_pretty(&mut self.out, item)
            .map_err(|e| TrimreachError::output(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write> ChainSink for JsonSink<W> {
    fn begin_group(&mut self, kind: GroupKind, label: &str, count: usize) -> TrimreachResult<()> {
        self.open.push(OpenGroup {
            kind: Some(kind),
            label: label.to_string(),
            count,
            ..OpenGroup::default()
        });
        Ok(())
    }

    fn chain(&mut self, chain: &ReportedChain) -> TrimreachResult<()> {
        let item = JsonChain {
            annotation: chain.annotation.to_string(),
            category: &chain.category,
            frames: &chain.frames,
        };
        match self.open.last_mut() {
            Some(group) => {
                let value =
                    serde_json::to_value(item).map_err(|e| TrimreachError::output(e.to_string()))?;
                group.chains.push(value);
                Ok(())
            }
            None => self.write_item(&item),
        }
    }

    fn end_group(&mut self) -> TrimreachResult<()> {
        let Some(group) = self.open.pop() else {
            return Err(TrimreachError::internal("unbalanced group in JSON sink"));
        };
        let value = group.into_value();
        match self.open.last_mut() {
            Some(parent) => {
                parent.groups.push(value);
                Ok(())
            }
            None => self.write_item(&value),
        }
    }

    fn finish(&mut self) -> TrimreachResult<()> {
        if !self.open.is_empty() {
            return Err(TrimreachError::internal("JSON sink finished with open groups"));
        }
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if self.written == 0 {
            self.out.write_all(b"[]\n")?;
        } else {
            self.out.write_all(b"\n]\n")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Collects everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub chains: Vec<ReportedChain>,
    /// `(depth, kind, label, count)` per opened group, in order
    pub groups: Vec<(usize, GroupKind, String, usize)>,
    depth: usize,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainSink for MemorySink {
    fn begin_group(&mut self, kind: GroupKind, label: &str, count: usize) -> TrimreachResult<()> {
        self.groups.push((self.depth, kind, label.to_string(), count));
        self.depth += 1;
        Ok(())
    }

    fn chain(&mut self, chain: &ReportedChain) -> TrimreachResult<()> {
        self.chains.push(chain.clone());
        Ok(())
    }

    fn end_group(&mut self) -> TrimreachResult<()> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn finish(&mut self) -> TrimreachResult<()> {
        self.finished = true;
        Ok(())
    }
}
