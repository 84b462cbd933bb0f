use std::io::{BufRead, Write};
use std::sync::LazyLock;

use log::{debug, error};
use regex::Regex;

use crate::config::FlowRateTable;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ResolverSession – run-scoped override memory
// ---------------------------------------------------------------------------

/// Remembers user-confirmed metadata for the remaining files of one run.
///
/// Created fresh at the start of every top-level invocation, written only by
/// the resolver, read by every subsequent parser call in the same run. Never
/// a process-wide singleton.
#[derive(Debug, Clone, Default)]
pub struct ResolverSession {
    pub flow_override: Option<f64>,
    pub channel_override: Option<String>,
}

impl ResolverSession {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// MetadataProvider – the interactive fallback seam
// ---------------------------------------------------------------------------

/// A prompt answer plus whether it should apply to the remaining files of
/// the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer<T> {
    pub value: T,
    pub remember: bool,
}

/// Last-resort metadata source, consulted only when the precedence chain
/// (explicit input, config lookup, filename heuristics, session memory) has
/// produced nothing. Production implementation blocks on the terminal; tests
/// use [`ScriptedProvider`] or [`NonInteractive`].
pub trait MetadataProvider {
    fn ask_flow_rate(&mut self, context: &str) -> Result<Answer<f64>>;
    fn ask_channel(&mut self, context: &str) -> Result<Answer<String>>;
}

/// Blocks on stdin. Flow-rate input loops until it parses as a float.
pub struct TerminalProvider;

impl TerminalProvider {
    fn read_line(prompt: &str) -> Result<String> {
        print!("{prompt}");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        let n = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|source| Error::Io {
                path: "<stdin>".into(),
                source,
            })?;
        if n == 0 {
            // stdin closed mid-prompt
            return Err(Error::MetadataMissing { field: "input" });
        }
        Ok(line.trim().to_string())
    }

    fn confirm(prompt: &str) -> Result<bool> {
        let line = Self::read_line(prompt)?;
        Ok(line.eq_ignore_ascii_case("y"))
    }
}

impl MetadataProvider for TerminalProvider {
    fn ask_flow_rate(&mut self, context: &str) -> Result<Answer<f64>> {
        loop {
            let line = Self::read_line(&format!("Flow rate for {context} (mL/min): "))?;
            match line.parse::<f64>() {
                Ok(value) => {
                    let remember = Self::confirm(&format!(
                        "Set flow rate to {value} for remaining files? Y/N "
                    ))?;
                    return Ok(Answer { value, remember });
                }
                Err(_) => error!("flow rate must be a number"),
            }
        }
    }

    fn ask_channel(&mut self, context: &str) -> Result<Answer<String>> {
        let value = Self::read_line(&format!("Channel name for {context}: "))?;
        let remember = Self::confirm(&format!(
            "Set channel to {value:?} for remaining files? Y/N "
        ))?;
        Ok(Answer { value, remember })
    }
}

/// Fails immediately instead of prompting. For batch/headless contexts.
pub struct NonInteractive;

impl MetadataProvider for NonInteractive {
    fn ask_flow_rate(&mut self, _context: &str) -> Result<Answer<f64>> {
        Err(Error::MetadataMissing { field: "flow rate" })
    }

    fn ask_channel(&mut self, _context: &str) -> Result<Answer<String>> {
        Err(Error::MetadataMissing { field: "channel" })
    }
}

/// Replays canned answers in order; errors when they run out.
pub struct ScriptedProvider {
    flow_rates: std::collections::VecDeque<Answer<f64>>,
    channels: std::collections::VecDeque<Answer<String>>,
}

impl ScriptedProvider {
    pub fn new(flow_rates: Vec<Answer<f64>>, channels: Vec<Answer<String>>) -> Self {
        ScriptedProvider {
            flow_rates: flow_rates.into(),
            channels: channels.into(),
        }
    }
}

impl MetadataProvider for ScriptedProvider {
    fn ask_flow_rate(&mut self, _context: &str) -> Result<Answer<f64>> {
        self.flow_rates
            .pop_front()
            .ok_or(Error::MetadataMissing { field: "flow rate" })
    }

    fn ask_channel(&mut self, _context: &str) -> Result<Answer<String>> {
        self.channels
            .pop_front()
            .ok_or(Error::MetadataMissing { field: "channel" })
    }
}

// ---------------------------------------------------------------------------
// Filename heuristics (Agilent exports carry metadata in the name)
// ---------------------------------------------------------------------------

static CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Channel([0-9]{3})").expect("static channel pattern"));
static FLOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Flow([0-9]*\.[0-9]*)").expect("static flow pattern"));

/// Pull a `Channel###` tag out of a working sample name. On a match the tag
/// is stripped from the name so it does not leak into the sample label.
pub fn channel_from_name(sample_name: &mut String) -> Option<String> {
    let caps = CHANNEL_RE.captures(sample_name)?;
    let whole = caps.get(0).map(|m| m.range())?;
    let channel = caps[1].to_string();
    sample_name.replace_range(whole, "");
    Some(channel)
}

/// Pull a `Flow<float>` tag out of a working sample name, stripping it on a
/// regex match even when the digits fail to parse (mirrors the tag being
/// consumed either way).
pub fn flow_rate_from_name(sample_name: &mut String) -> Option<f64> {
    let caps = FLOW_RE.captures(sample_name)?;
    let whole = caps.get(0).map(|m| m.range())?;
    let digits = caps[1].to_string();
    sample_name.replace_range(whole, "");
    match digits.parse::<f64>() {
        Ok(rate) => Some(rate),
        Err(_) => {
            debug!("bad flow-rate tag {digits:?} in sample name");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Precedence chains
// ---------------------------------------------------------------------------

/// Resolve a flow rate for one file.
///
/// Precedence: explicit input > config lookup by method name > session
/// override > interactive prompt. An explicit value short-circuits before
/// any lookup happens. Two config matches abort the run. A prompted value
/// is memoized for the rest of the run only when the user confirms it.
pub fn resolve_flow_rate(
    explicit: Option<f64>,
    method: Option<&str>,
    flow_table: Option<&FlowRateTable>,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
    context: &str,
) -> Result<f64> {
    if let Some(rate) = explicit {
        return Ok(rate);
    }

    if let (Some(method), Some(table)) = (method, flow_table) {
        if let Some(rate) = table.lookup(method)? {
            return Ok(rate);
        }
    }

    if let Some(rate) = session.flow_override {
        return Ok(rate);
    }

    let answer = provider.ask_flow_rate(context)?;
    if answer.remember {
        session.flow_override = Some(answer.value);
    }
    Ok(answer.value)
}

/// Resolve a detector channel for one file.
///
/// Precedence: explicit input > `Channel###` filename tag (stripped from the
/// working sample name) > session override > interactive prompt. A prompted
/// channel is memoized for subsequent files only when the user confirms it;
/// files already parsed are not revisited.
pub fn resolve_channel(
    explicit: Option<&str>,
    sample_name: &mut String,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
    context: &str,
) -> Result<String> {
    if let Some(channel) = explicit {
        return Ok(channel.to_string());
    }

    if let Some(channel) = channel_from_name(sample_name) {
        return Ok(channel);
    }

    if let Some(channel) = &session.channel_override {
        return Ok(channel.clone());
    }

    let answer = provider.ask_channel(context)?;
    if answer.remember {
        session.channel_override = Some(answer.value.clone());
    }
    Ok(answer.value)
}

/// Agilent-style flow resolution: explicit input > `Flow<float>` filename
/// tag > session override > interactive prompt.
pub fn resolve_flow_rate_from_name(
    explicit: Option<f64>,
    sample_name: &mut String,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
    context: &str,
) -> Result<f64> {
    if let Some(rate) = explicit {
        return Ok(rate);
    }

    if let Some(rate) = flow_rate_from_name(sample_name) {
        return Ok(rate);
    }

    if let Some(rate) = session.flow_override {
        return Ok(rate);
    }

    let answer = provider.ask_flow_rate(context)?;
    if answer.remember {
        session.flow_override = Some(answer.value);
    }
    Ok(answer.value)
}
