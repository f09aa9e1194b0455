//! Loading MCP server descriptors from `mcp-config.json`.
//!
//! The file uses the layout popularized by desktop MCP hosts:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": {
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-filesystem", "${HOME}"],
//!       "env": { "DEBUG": "1" }
//!     }
//!   }
//! }
//! ```
//!
//! `$NAME` and `${NAME}` references are replaced with environment values
//! in the raw text, before it is parsed. Values are inserted verbatim, so a
//! value containing `"` or `\` can break the JSON.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use mcp_chat_mcp::ServerDescriptor;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::console::display_chain;

/// The file read from the working directory.
pub const CONFIG_FILE: &str = "mcp-config.json";

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("the pattern is valid")
});

/// Error loading the configuration file.
#[derive(Debug)]
pub struct ConfigError {
    path: PathBuf,
    kind: ConfigErrorKind,
}

#[derive(Debug)]
enum ConfigErrorKind {
    Io(io::Error),
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl ConfigError {
    /// Returns the path of the offending file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.kind {
            ConfigErrorKind::Io(_) => write!(f, "failed to read {path}"),
            ConfigErrorKind::Parse(_) => write!(f, "failed to parse {path}"),
            ConfigErrorKind::Invalid(reason) => {
                write!(f, "invalid config {path}: {reason}")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ConfigErrorKind::Io(err) => Some(err),
            ConfigErrorKind::Parse(err) => Some(err),
            ConfigErrorKind::Invalid(_) => None,
        }
    }
}

/// Replaces `$NAME` and `${NAME}` with the values `lookup` returns.
///
/// References `lookup` doesn't know are left untouched.
pub fn substitute_env<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

/// Loads server descriptors from `path`, substituting process environment
/// variables.
///
/// A missing file is not an error and yields no servers.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<ServerDescriptor>, ConfigError> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Like [`load`], but logs errors and falls back to no servers.
pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Vec<ServerDescriptor> {
    load(path).unwrap_or_else(|err| {
        error!("error loading MCP server configurations: {}", display_chain(&err));
        vec![]
    })
}

/// Like [`load`], resolving variables with `lookup`.
pub fn load_with<P, F>(
    path: P,
    lookup: F,
) -> Result<Vec<ServerDescriptor>, ConfigError>
where
    P: AsRef<Path>,
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let error = |kind| ConfigError {
        path: path.to_owned(),
        kind,
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("{} not found, no MCP servers", path.display());
            return Ok(vec![]);
        }
        Err(err) => return Err(error(ConfigErrorKind::Io(err))),
    };
    let config: Value = serde_json::from_str(&substitute_env(&text, lookup))
        .map_err(|err| error(ConfigErrorKind::Parse(err)))?;

    let Some(config) = config.as_object() else {
        return Err(error(ConfigErrorKind::Invalid("expected a JSON object")));
    };
    let servers = match config.get("mcpServers") {
        None => return Ok(vec![]),
        Some(Value::Object(servers)) => servers,
        Some(_) => {
            return Err(error(ConfigErrorKind::Invalid(
                "`mcpServers` must be an object",
            )));
        }
    };

    let mut descriptors = Vec::with_capacity(servers.len());
    for (name, entry) in servers {
        match parse_entry(name, entry) {
            Some(descriptor) => {
                info!("loaded MCP server configuration: {name}");
                descriptors.push(descriptor);
            }
            None => warn!(
                "server '{name}' is missing required fields (command, args)"
            ),
        }
    }
    Ok(descriptors)
}

fn parse_entry(name: &str, entry: &Value) -> Option<ServerDescriptor> {
    let entry = entry.as_object()?;
    let command = entry.get("command")?.as_str()?;
    let args = entry
        .get("args")?
        .as_array()?
        .iter()
        .map(|arg| arg.as_str())
        .collect::<Option<Vec<_>>>()?;

    let descriptor = ServerDescriptor::new(name, command, args);
    match entry.get("env") {
        None | Some(Value::Null) => Some(descriptor),
        Some(Value::Object(env)) => match string_map(env) {
            Some(env) => Some(descriptor.with_env(env)),
            None => {
                warn!("server '{name}' has non-string `env` values, ignoring them");
                Some(descriptor)
            }
        },
        Some(_) => {
            warn!("server '{name}' has an `env` that is not an object, ignoring it");
            Some(descriptor)
        }
    }
}

fn string_map(map: &Map<String, Value>) -> Option<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| Some((k.clone(), v.as_str()?.to_owned())))
        .collect()
}
