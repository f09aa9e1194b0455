use std::collections::BTreeMap;
use std::process::Stdio;

use tokio::process::Command;

#[cfg(unix)]
const INHERITED_ENV_VARS: &[&str] =
    &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

#[cfg(windows)]
const INHERITED_ENV_VARS: &[&str] = &[
    "APPDATA",
    "HOMEDRIVE",
    "HOMEPATH",
    "LOCALAPPDATA",
    "PATH",
    "PROCESSOR_ARCHITECTURE",
    "SYSTEMDRIVE",
    "SYSTEMROOT",
    "TEMP",
    "USERNAME",
    "USERPROFILE",
];

#[cfg(not(any(unix, windows)))]
const INHERITED_ENV_VARS: &[&str] = &["PATH"];

/// Everything needed to launch one MCP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerDescriptor {
    name: String,
    command: String,
    args: Vec<String>,
    env: Option<BTreeMap<String, String>>,
}

impl ServerDescriptor {
    /// Creates a descriptor for `command` with `args`.
    ///
    /// `name` only identifies the server in logs and errors.
    pub fn new<N, C, I, A>(name: N, command: C, args: I) -> Self
    where
        N: Into<String>,
        C: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: None,
        }
    }

    /// Sets environment variables for the server, on top of the
    /// inherited defaults.
    #[inline]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Returns the server name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the executable to launch.
    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the command line arguments.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the environment overrides, if any.
    #[inline]
    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        self.env.as_ref()
    }

    /// Builds the command launching this server.
    ///
    /// The child only sees a small set of variables from this process
    /// (`PATH`, `HOME` and the like) plus the overrides. Its stdio is
    /// piped except for stderr, and it is killed when the handle drops.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .env_clear()
            .envs(default_environment())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(env) = &self.env {
            command.envs(env);
        }
        command
    }
}

fn default_environment() -> impl Iterator<Item = (&'static str, String)> {
    INHERITED_ENV_VARS.iter().filter_map(|&key| {
        let value = std::env::var(key).ok()?;
        // Exported shell functions.
        if value.starts_with("()") {
            return None;
        }
        Some((key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let descriptor = ServerDescriptor::new(
            "fs",
            "npx",
            ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
        )
        .with_env(BTreeMap::from([("DEBUG".to_owned(), "1".to_owned())]));

        assert_eq!(descriptor.name(), "fs");
        assert_eq!(descriptor.command(), "npx");
        assert_eq!(descriptor.args().len(), 3);
        assert_eq!(descriptor.env().unwrap()["DEBUG"], "1");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_environment() {
        let descriptor = ServerDescriptor::new("env", "env", Vec::<String>::new())
            .with_env(BTreeMap::from([
                ("API_TOKEN".to_owned(), "secret".to_owned()),
                ("PATH".to_owned(), "/opt/bin".to_owned()),
            ]));
        let command = descriptor.to_command();
        let envs: BTreeMap<_, _> = command
            .as_std()
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_str()?, v?.to_str()?)))
            .collect();

        assert_eq!(envs.get("API_TOKEN"), Some(&"secret"));
        // Overrides win over inherited values.
        assert_eq!(envs.get("PATH"), Some(&"/opt/bin"));
        assert!(
            envs.keys()
                .all(|k| *k == "API_TOKEN" || INHERITED_ENV_VARS.contains(k))
        );
    }
}
